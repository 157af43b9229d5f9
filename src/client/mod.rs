//! Typed convenience API over the protocol core.
//!
//! Each operation is a thin caller: it converts a typed record into a
//! generic request tree, issues the command over the session, and converts
//! the response tree back. Streamed commands pair an event registration
//! with the command and guarantee deregistration on every exit path.

mod types;

pub use types::{
    AuthConf, ChildSa, ChildSaConf, IkeConf, IkeSa, SharedKey, TerminateRequest,
    UnloadConnRequest, Version,
};

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::config::SessionConfig;
use crate::convert::{from_general, to_general};
use crate::error::{Error, Result};
use crate::protocol::Section;
use crate::session::Session;

/// A typed client for the IKE daemon's control socket.
pub struct Client {
    session: Session,
}

impl Client {
    /// Connect to the daemon socket at `path`.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            session: Session::connect(path).await?,
        })
    }

    /// Connect with explicit configuration.
    pub async fn connect_with_config(config: SessionConfig) -> Result<Self> {
        Ok(Self {
            session: Session::connect_with_config(config).await?,
        })
    }

    /// The underlying session, for commands this client does not wrap.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Close the connection. Idempotent.
    pub fn close(&self) {
        self.session.close();
    }

    /// Query the daemon version.
    pub async fn version(&self) -> Result<Version> {
        let response = self.session.request("version", Section::new()).await?;
        from_general(&response)
    }

    /// Load connection definitions into the daemon.
    pub async fn load_conn(&self, conns: &HashMap<String, IkeConf>) -> Result<()> {
        let request = to_general(conns)?;
        let response = self.session.request("load-conn", request).await?;
        check_success(&response, "load-conn")
    }

    /// Unload a named connection definition.
    pub async fn unload_conn(&self, request: &UnloadConnRequest) -> Result<()> {
        let request = to_general(request)?;
        let response = self.session.request("unload-conn", request).await?;
        check_success(&response, "unload-conn")
    }

    /// List loaded connection definitions, optionally filtered by name.
    pub async fn list_conns(&self, ike: &str) -> Result<Vec<HashMap<String, IkeConf>>> {
        let mut request = Section::new();
        if !ike.is_empty() {
            request.insert("ike", ike);
        }
        self.collect_stream("list-conn", "list-conns", request).await
    }

    /// List IKE SAs, optionally filtered by connection name or SA id.
    pub async fn list_sas(&self, ike: &str, ike_id: &str) -> Result<Vec<HashMap<String, IkeSa>>> {
        let mut request = Section::new();
        if !ike.is_empty() {
            request.insert("ike", ike);
        }
        if !ike_id.is_empty() {
            request.insert("ike-id", ike_id);
        }
        self.collect_stream("list-sa", "list-sas", request).await
    }

    /// Load a shared secret into the daemon.
    pub async fn load_shared(&self, key: &SharedKey) -> Result<()> {
        let request = to_general(key)?;
        let response = self.session.request("load-shared", request).await?;
        check_success(&response, "load-shared")
    }

    /// List the identifiers of loaded shared secrets.
    pub async fn get_shared(&self) -> Result<Vec<String>> {
        let response = self.session.request("get-shared", Section::new()).await?;
        Ok(response
            .list("keys")
            .map(|keys| keys.to_vec())
            .unwrap_or_default())
    }

    /// Terminate an SA.
    pub async fn terminate(&self, request: &TerminateRequest) -> Result<()> {
        let request = to_general(request)?;
        let response = self.session.request("terminate", request).await?;
        check_success(&response, "terminate")
    }

    /// Initiate a CHILD SA.
    pub async fn initiate(&self, child: &str, ike: &str) -> Result<()> {
        let request = Section::new().with("child", child).with("ike", ike);
        let response = self.session.request("initiate", request).await?;
        check_success(&response, "initiate")
    }

    /// Observe SA lifecycle events for at most `window`, delivering each to
    /// `callback`.
    ///
    /// All registrations are removed on the way out, on every exit path;
    /// a failed deregistration is reported but the monitor still returns.
    pub async fn monitor_sa<F>(&self, callback: F, window: Duration) -> Result<()>
    where
        F: Fn(&str, &Section) + Send + Sync + 'static,
    {
        const SA_EVENTS: [&str; 4] = ["ike-updown", "ike-rekey", "child-updown", "child-rekey"];

        let callback = Arc::new(callback);
        let mut registered = Vec::new();
        for event in SA_EVENTS {
            let callback = Arc::clone(&callback);
            let outcome = self
                .session
                .register_event(event, move |name, body| callback(name, body))
                .await;
            if let Err(e) = outcome {
                self.unregister_all(&registered).await;
                return Err(e);
            }
            registered.push(event);
        }

        tokio::time::sleep(window).await;

        let mut first_error = None;
        for event in SA_EVENTS {
            if let Err(e) = self.session.unregister_event(event).await {
                warn!(event, error = %e, "failed to unregister monitor event");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    async fn unregister_all(&self, events: &[&str]) {
        for event in events {
            if let Err(e) = self.session.unregister_event(event).await {
                warn!(event, error = %e, "failed to unregister event during cleanup");
            }
        }
    }

    /// Run a streaming command: register its event, issue the command,
    /// collect one converted record per event packet, and unregister.
    async fn collect_stream<T>(&self, event: &str, command: &str, body: Section) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        struct Collected<T> {
            items: Vec<T>,
            error: Option<Error>,
        }

        let collected = Arc::new(Mutex::new(Collected::<T> {
            items: Vec::new(),
            error: None,
        }));

        let sink = Arc::clone(&collected);
        self.session
            .register_event(event, move |_, body| {
                let mut sink = sink.lock().expect("stream sink lock poisoned");
                if sink.error.is_some() {
                    return;
                }
                match from_general::<T>(body) {
                    Ok(item) => sink.items.push(item),
                    Err(e) => sink.error = Some(e),
                }
            })
            .await?;

        let response = self.session.request(command, body).await;
        let unregistered = self.session.unregister_event(event).await;

        match (response, unregistered) {
            (Err(e), Err(unreg)) => {
                warn!(event, error = %unreg, "failed to unregister streaming event");
                return Err(e);
            }
            (Err(e), Ok(())) => return Err(e),
            (Ok(_), Err(unreg)) => return Err(unreg),
            (Ok(_), Ok(())) => {}
        }

        let mut collected = collected.lock().expect("stream sink lock poisoned");
        if let Some(e) = collected.error.take() {
            return Err(e);
        }
        Ok(std::mem::take(&mut collected.items))
    }
}

/// Interpret the daemon's in-band result reporting.
fn check_success(response: &Section, command: &str) -> Result<()> {
    match response.text("success") {
        Some("yes") => Ok(()),
        _ => Err(Error::Daemon {
            message: format!(
                "{command} failed: {}",
                response.text("errmsg").unwrap_or("no error message")
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_success() {
        let ok = Section::new().with("success", "yes");
        assert!(check_success(&ok, "load-conn").is_ok());

        let failed = Section::new()
            .with("success", "no")
            .with("errmsg", "invalid proposal");
        let err = check_success(&failed, "load-conn").unwrap_err();
        assert!(matches!(err, Error::Daemon { .. }));
        assert!(err.to_string().contains("invalid proposal"));

        let silent = Section::new();
        assert!(check_success(&silent, "terminate").is_err());
    }
}
