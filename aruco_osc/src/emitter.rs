//! Emission backends.
//!
//! [`EventEmitter`] is fire-and-forget: `emit` returns nothing, never
//! retries, and never blocks waiting for the far end.  Consumers don't
//! need to know whether messages hit the network or a test buffer.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::schema::Event;
use crate::OscMessage;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("cannot resolve OSC destination {host}:{port}")]
    Resolve {
        host:   String,
        port:   u16,
        #[source]
        source: io::Error,
    },
    #[error("OSC destination {host}:{port} resolved to no address")]
    NoAddress { host: String, port: u16 },
    #[error("cannot bind local UDP socket")]
    Bind(#[source] io::Error),
}

// ════════════════════════════════════════════════════════════════════════════
// EventEmitter trait
// ════════════════════════════════════════════════════════════════════════════

/// Messages handed to the transport, and those it refused.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub sent:    u64,
    pub dropped: u64,
}

pub trait EventEmitter: Send {
    /// Serialise and hand `message` to the transport immediately.
    fn emit(&mut self, message: &OscMessage);

    fn emit_event(&mut self, event: &Event<'_>) {
        self.emit(&event.to_message());
    }

    /// Running totals.  Backends without a transport report zeros.
    fn stats(&self) -> DeliveryStats { DeliveryStats::default() }
}

impl<E: EventEmitter + ?Sized> EventEmitter for Box<E> {
    fn emit(&mut self, message: &OscMessage) { (**self).emit(message) }
    fn stats(&self) -> DeliveryStats { (**self).stats() }
}

// ── UDP backend ───────────────────────────────────────────────────────────

/// One datagram per message to a fixed destination.
pub struct UdpEmitter {
    socket:  UdpSocket,
    target:  SocketAddr,
    stats:   DeliveryStats,
}

impl UdpEmitter {
    /// Resolve `host:port` and bind an ephemeral local socket of the same family.
    pub fn connect(host: &str, port: u16) -> Result<Self, EmitError> {
        let target = (host, port)
            .to_socket_addrs()
            .map_err(|source| EmitError::Resolve { host: host.to_string(), port, source })?
            .next()
            .ok_or_else(|| EmitError::NoAddress { host: host.to_string(), port })?;

        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).map_err(EmitError::Bind)?;
        // A full send buffer drops the datagram rather than stalling the frame loop.
        socket.set_nonblocking(true).map_err(EmitError::Bind)?;

        debug!(%target, "OSC emitter ready");
        Ok(UdpEmitter { socket, target, stats: DeliveryStats::default() })
    }

    pub fn target(&self) -> SocketAddr { self.target }
}

impl EventEmitter for UdpEmitter {
    fn emit(&mut self, message: &OscMessage) {
        match self.socket.send_to(&message.to_bytes(), self.target) {
            Ok(_)  => self.stats.sent += 1,
            Err(e) => {
                self.stats.dropped += 1;
                trace!(address = message.address(), error = %e, "OSC datagram dropped");
            }
        }
    }

    fn stats(&self) -> DeliveryStats { self.stats }
}

// ── recording backend (tests, dry runs) ───────────────────────────────────

/// Keeps every emitted message in order.
///
/// Clones share one log, so a test can hold a clone while the pipeline
/// owns the original.
#[derive(Clone, Default)]
pub struct RecordingEmitter {
    log: Arc<Mutex<Vec<OscMessage>>>,
}

impl RecordingEmitter {
    pub fn new() -> Self { Self::default() }

    pub fn messages(&self) -> Vec<OscMessage> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.messages().iter().map(|m| m.address().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl EventEmitter for RecordingEmitter {
    fn emit(&mut self, message: &OscMessage) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).push(message.clone());
    }

    fn stats(&self) -> DeliveryStats {
        DeliveryStats { sent: self.len() as u64, dropped: 0 }
    }
}

// ── discard backend ───────────────────────────────────────────────────────

/// Drops everything.  Pair with [`LoggingEmitter`] for a dry run.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEmitter;

impl EventEmitter for NullEmitter {
    fn emit(&mut self, _message: &OscMessage) {}
}

// ── logging decorator ─────────────────────────────────────────────────────

/// Logs each message before forwarding it, at `debug` or, when loud, `info`.
pub struct LoggingEmitter<E> {
    inner: E,
    loud:  bool,
}

impl<E: EventEmitter> LoggingEmitter<E> {
    pub fn new(inner: E) -> Self { LoggingEmitter { inner, loud: false } }

    /// Log at `info`, so messages show without `--verbose`.
    pub fn loud(inner: E) -> Self { LoggingEmitter { inner, loud: true } }

    pub fn into_inner(self) -> E { self.inner }
}

impl<E: EventEmitter> EventEmitter for LoggingEmitter<E> {
    fn emit(&mut self, message: &OscMessage) {
        if self.loud {
            info!(target: "osc", "{}", message);
        } else {
            debug!(target: "osc", "{}", message);
        }
        self.inner.emit(message);
    }

    fn stats(&self) -> DeliveryStats { self.inner.stats() }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
