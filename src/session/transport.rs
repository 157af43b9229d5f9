//! The connection transport: socket ownership, command/response
//! correlation, and event demultiplexing.
//!
//! One dedicated task (the read loop) owns the receive side of the socket
//! and decodes packets in wire order. Callers issue commands through a
//! mutual-exclusion gate that is held until the reply arrives: the protocol
//! is strictly half-duplex for commands, and a second caller blocks until
//! the first completes rather than failing. The gate also owns the write
//! half, so packet writes are never interleaved.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::{oneshot, Mutex, Notify};
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::{Error, ProtocolErrorKind, Result};
use crate::protocol::wire::{read_packet, write_packet};
use crate::protocol::{Packet, PacketKind, Section};
use crate::session::registry::{EventCallback, EventRegistry};

/// A connection to the daemon's control socket.
///
/// Dropping the session closes it; [`close`](Session::close) does so
/// explicitly and unblocks any in-flight request.
pub struct Session {
    shared: Arc<Shared>,
    /// The command gate. Holding it across the reply await enforces the
    /// one-outstanding-request rule and serializes packet writes.
    writer: Mutex<Option<OwnedWriteHalf>>,
}

struct Shared {
    registry: EventRegistry,
    /// Completion slot for the single outstanding request.
    pending: std::sync::Mutex<Option<oneshot::Sender<Result<Packet>>>>,
    closed: AtomicBool,
    shutdown: Notify,
    max_packet_size: usize,
}

impl Session {
    /// Connect to the daemon socket at `path`.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with_config(SessionConfig::with_socket_path(path.as_ref())).await
    }

    /// Connect with explicit configuration.
    pub async fn connect_with_config(config: SessionConfig) -> Result<Self> {
        let stream = UnixStream::connect(&config.socket_path).await?;
        debug!(path = %config.socket_path.display(), "connected to daemon socket");

        let (read_half, write_half) = stream.into_split();
        let shared = Arc::new(Shared {
            registry: EventRegistry::new(),
            pending: std::sync::Mutex::new(None),
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
            max_packet_size: config.max_packet_size,
        });

        tokio::spawn(read_loop(read_half, Arc::clone(&shared)));

        Ok(Self {
            shared,
            writer: Mutex::new(Some(write_half)),
        })
    }

    /// Whether the session is still connected.
    pub fn is_connected(&self) -> bool {
        !self.shared.closed.load(Ordering::SeqCst)
    }

    /// Issue a command and await its response.
    ///
    /// Blocks while another request is outstanding. A `CMD_UNKNOWN` answer
    /// surfaces as [`Error::UnknownCommand`]; the daemon's own
    /// success/failure reporting inside the response body is left to the
    /// caller to interpret.
    pub async fn request(&self, command: &str, body: Section) -> Result<Section> {
        let reply = self
            .roundtrip(Packet::named(PacketKind::CmdRequest, command, body))
            .await?;
        match reply.kind {
            PacketKind::CmdResponse => Ok(reply.body),
            PacketKind::CmdUnknown => Err(Error::UnknownCommand {
                name: command.to_string(),
            }),
            _ => Err(Error::protocol(ProtocolErrorKind::UnexpectedElement {
                what: "reply to command request",
            })),
        }
    }

    /// Register a callback for a named event stream.
    ///
    /// The callback runs on the read-loop task for every matching EVENT
    /// packet, in wire order. Fails with [`Error::AlreadyRegistered`] if a
    /// subscription with this name exists, and [`Error::UnknownEvent`] if
    /// the daemon does not know the event.
    pub async fn register_event<F>(&self, name: &str, callback: F) -> Result<()>
    where
        F: FnMut(&str, &Section) + Send + 'static,
    {
        self.register_event_boxed(name, Box::new(callback)).await
    }

    async fn register_event_boxed(&self, name: &str, callback: EventCallback) -> Result<()> {
        // Insert before sending: the daemon may emit the first event right
        // after the confirmation, ahead of this task resuming.
        self.shared.registry.try_insert(name, callback)?;

        let reply = self
            .roundtrip(Packet::named(PacketKind::EventRegister, name, Section::new()))
            .await;
        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                self.shared.registry.remove(name);
                return Err(e);
            }
        };

        match reply.kind {
            PacketKind::EventConfirm => {
                debug!(event = name, "event registered");
                Ok(())
            }
            PacketKind::EventUnknown => {
                self.shared.registry.remove(name);
                Err(Error::UnknownEvent {
                    name: name.to_string(),
                })
            }
            _ => {
                self.shared.registry.remove(name);
                Err(Error::protocol(ProtocolErrorKind::UnexpectedElement {
                    what: "reply to event registration",
                }))
            }
        }
    }

    /// Remove a named event subscription.
    ///
    /// The local subscription is removed even when the exchange fails; the
    /// failure is reported but does not resurrect the callback.
    pub async fn unregister_event(&self, name: &str) -> Result<()> {
        if !self.shared.registry.contains(name) {
            return Err(Error::NotRegistered {
                name: name.to_string(),
            });
        }

        let reply = self
            .roundtrip(Packet::named(
                PacketKind::EventUnregister,
                name,
                Section::new(),
            ))
            .await;
        self.shared.registry.remove(name);

        match reply?.kind {
            PacketKind::EventConfirm => {
                debug!(event = name, "event unregistered");
                Ok(())
            }
            PacketKind::EventUnknown => Err(Error::UnknownEvent {
                name: name.to_string(),
            }),
            _ => Err(Error::protocol(ProtocolErrorKind::UnexpectedElement {
                what: "reply to event deregistration",
            })),
        }
    }

    /// Close the session.
    ///
    /// Idempotent. Stops the read loop, fails any in-flight request with
    /// [`Error::Closed`], and releases the socket.
    pub fn close(&self) {
        self.shared.begin_close();
        // If no request is outstanding, release the write half now;
        // otherwise the unblocked requester drops it on its way out.
        if let Ok(mut writer) = self.writer.try_lock() {
            writer.take();
        }
    }

    /// Send one packet and await the single reply slot.
    async fn roundtrip(&self, packet: Packet) -> Result<Packet> {
        let mut writer = self.writer.lock().await;
        let (tx, rx) = oneshot::channel();
        {
            // Checking the flag and installing the slot under one lock
            // keeps the read loop's shutdown drain from missing us.
            let mut pending = self.shared.pending.lock().expect("pending lock poisoned");
            if self.shared.closed.load(Ordering::SeqCst) {
                return Err(Error::NotConnected);
            }
            *pending = Some(tx);
        }

        let half = match writer.as_mut() {
            Some(half) => half,
            None => {
                self.shared.pending.lock().expect("pending lock poisoned").take();
                return Err(Error::NotConnected);
            }
        };

        if let Err(e) = write_packet(half, &packet, self.shared.max_packet_size).await {
            self.shared.pending.lock().expect("pending lock poisoned").take();
            return Err(e);
        }

        match rx.await {
            Ok(result) => {
                if !self.is_connected() {
                    writer.take();
                }
                result
            }
            // Sender dropped without a verdict: the session went away.
            Err(_) => {
                writer.take();
                Err(Error::Closed)
            }
        }
    }

    /// Whether an event subscription with this name currently exists.
    pub fn is_registered(&self, name: &str) -> bool {
        self.shared.registry.contains(name)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shared.begin_close();
    }
}

impl Shared {
    /// Flag the session closed and wake the read loop. Safe to call more
    /// than once.
    fn begin_close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("closing session");
        }
        self.shutdown.notify_one();
    }
}

/// The single read loop: decodes packets in wire order and routes each one
/// to the pending request or the event registry.
async fn read_loop(mut reader: OwnedReadHalf, shared: Arc<Shared>) {
    let outcome = loop {
        tokio::select! {
            _ = shared.shutdown.notified() => break Ok(()),
            packet = read_packet(&mut reader, shared.max_packet_size) => match packet {
                Ok(packet) => route(&shared, packet),
                Err(e) => break Err(e),
            }
        }
    };

    shared.closed.store(true, Ordering::SeqCst);

    let pending = shared.pending.lock().expect("pending lock poisoned").take();
    match outcome {
        Ok(()) => {
            debug!("read loop stopped");
            complete_pending(pending, Error::Closed);
        }
        Err(e) if e.is_connection_closed() => {
            debug!("daemon closed the connection");
            complete_pending(pending, Error::Closed);
        }
        Err(e) => {
            warn!(error = %e, "read loop failed, connection unusable");
            complete_pending(pending, e);
        }
    }
}

fn complete_pending(pending: Option<oneshot::Sender<Result<Packet>>>, error: Error) {
    if let Some(tx) = pending {
        let _ = tx.send(Err(error));
    }
}

fn route(shared: &Shared, packet: Packet) {
    match packet.kind {
        PacketKind::CmdResponse
        | PacketKind::CmdUnknown
        | PacketKind::EventConfirm
        | PacketKind::EventUnknown => {
            let pending = shared.pending.lock().expect("pending lock poisoned").take();
            match pending {
                Some(tx) => {
                    let _ = tx.send(Ok(packet));
                }
                // Subscriptions and requests may race with in-flight
                // packets; a reply nobody waits for is not an error.
                None => debug!(kind = %packet.kind, "reply with no pending request dropped"),
            }
        }
        PacketKind::Event => {
            let name = packet.name.as_deref().unwrap_or_default();
            if !shared.registry.dispatch(name, &packet.body) {
                debug!(event = name, "event with no subscriber dropped");
            }
        }
        PacketKind::CmdRequest | PacketKind::EventRegister | PacketKind::EventUnregister => {
            warn!(kind = %packet.kind, "client-bound verb received from daemon, dropped");
        }
    }
}
