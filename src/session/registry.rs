//! The event subscription registry.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::protocol::Section;

/// Callback invoked for each received event, on the read-loop task.
///
/// A slow callback delays all subsequent packet processing, including any
/// in-flight command's response; hand off anything slow.
pub type EventCallback = Box<dyn FnMut(&str, &Section) + Send>;

/// A mutable set of named subscriptions, consulted by the read loop for
/// every inbound EVENT packet.
#[derive(Default)]
pub struct EventRegistry {
    subscriptions: Mutex<HashMap<String, EventCallback>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription. The daemon rejects duplicate registrations, and
    /// silently overwriting a live callback would be worse, so duplicates
    /// fail locally.
    pub fn try_insert(&self, name: &str, callback: EventCallback) -> Result<()> {
        let mut subscriptions = self.subscriptions.lock().expect("registry lock poisoned");
        if subscriptions.contains_key(name) {
            return Err(Error::AlreadyRegistered {
                name: name.to_string(),
            });
        }
        subscriptions.insert(name.to_string(), callback);
        Ok(())
    }

    /// Remove a subscription; returns whether it existed.
    pub fn remove(&self, name: &str) -> bool {
        self.subscriptions
            .lock()
            .expect("registry lock poisoned")
            .remove(name)
            .is_some()
    }

    /// Whether a subscription with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.subscriptions
            .lock()
            .expect("registry lock poisoned")
            .contains_key(name)
    }

    /// Deliver an event to its subscriber, if any; returns whether a
    /// subscriber was found. The lock is held across the callback so the
    /// subscription set cannot change mid-dispatch.
    pub fn dispatch(&self, name: &str, body: &Section) -> bool {
        let mut subscriptions = self.subscriptions.lock().expect("registry lock poisoned");
        match subscriptions.get_mut(name) {
            Some(callback) => {
                callback(name, body);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = EventRegistry::new();
        registry.try_insert("ike-updown", Box::new(|_, _| {})).unwrap();

        let err = registry
            .try_insert("ike-updown", Box::new(|_, _| {}))
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered { .. }));
    }

    #[test]
    fn test_dispatch_reaches_subscriber() {
        let registry = EventRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        registry
            .try_insert(
                "list-sa",
                Box::new(move |name, _| {
                    assert_eq!(name, "list-sa");
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert!(registry.dispatch("list-sa", &Section::new()));
        assert!(registry.dispatch("list-sa", &Section::new()));
        assert!(!registry.dispatch("other", &Section::new()));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_remove() {
        let registry = EventRegistry::new();
        registry.try_insert("log", Box::new(|_, _| {})).unwrap();
        assert!(registry.remove("log"));
        assert!(!registry.remove("log"));
        assert!(!registry.dispatch("log", &Section::new()));
    }
}
