//! # aruco_osc
//!
//! Minimal Open Sound Control 1.0 support for the hand/marker pipeline:
//! just `int32` and `float32` arguments, one message per UDP datagram,
//! no bundles, no timetags.
//!
//! No OSC crate is required; message bytes are written directly.
//!
//! ## Message schema
//!
//! | Address | Arguments |
//! |---|---|
//! | `/hands` | `i` hand index, then 21 × (`f` x, `f` y) normalized landmarks |
//! | `/aruco/marker` | `i` marker id, then 4 × (`f` x, `f` y) normalized corners |
//! | `/hand_detected` | `i` marker id under an index fingertip |
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use aruco_osc::{EventEmitter, OscArg, OscMessage, UdpEmitter};
//!
//! let mut out = UdpEmitter::connect("127.0.0.1", 8000).unwrap();
//! let msg = OscMessage::new("/hand_detected", vec![OscArg::Int(7)]).unwrap();
//! out.emit(&msg);
//! ```

use std::fmt;

use thiserror::Error;

pub mod emitter;
pub mod schema;

pub use emitter::{DeliveryStats, EmitError, EventEmitter, LoggingEmitter, NullEmitter, RecordingEmitter, UdpEmitter};
pub use schema::{Event, HANDS_ADDRESS, HAND_DETECTED_ADDRESS, MARKER_ADDRESS};

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OscError {
    #[error("invalid OSC address {0:?}: must be ASCII, start with '/', and contain no NUL")]
    InvalidAddress(String),
    #[error("datagram truncated at byte {0}")]
    Truncated(usize),
    #[error("message has no type-tag string")]
    MissingTypeTags,
    #[error("unsupported OSC type tag {0:?}")]
    UnsupportedTag(char),
    #[error("OSC string is not valid UTF-8")]
    InvalidString,
    #[error("OSC bundles are not supported")]
    Bundle,
}

// ════════════════════════════════════════════════════════════════════════════
// OscArg: the argument union
// ════════════════════════════════════════════════════════════════════════════

/// One typed scalar argument.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OscArg {
    Int(i32),
    Float(f32),
}

impl OscArg {
    /// Type-tag character for this argument.
    pub fn tag(self) -> u8 {
        match self {
            OscArg::Int(_)   => b'i',
            OscArg::Float(_) => b'f',
        }
    }

    fn write(self, buf: &mut Vec<u8>) {
        match self {
            OscArg::Int(v)   => buf.extend_from_slice(&v.to_be_bytes()),
            OscArg::Float(v) => buf.extend_from_slice(&v.to_be_bytes()),
        }
    }
}

impl From<i32> for OscArg {
    fn from(v: i32) -> Self { OscArg::Int(v) }
}

impl From<f32> for OscArg {
    fn from(v: f32) -> Self { OscArg::Float(v) }
}

impl fmt::Display for OscArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OscArg::Int(v)   => write!(f, "{}", v),
            OscArg::Float(v) => write!(f, "{:.4}", v),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// OscMessage
// ════════════════════════════════════════════════════════════════════════════

/// An address pattern plus its ordered argument list.
#[derive(Clone, Debug, PartialEq)]
pub struct OscMessage {
    address: String,
    args:    Vec<OscArg>,
}

impl OscMessage {
    pub fn new(address: impl Into<String>, args: Vec<OscArg>) -> Result<Self, OscError> {
        let address = address.into();
        if !is_valid_address(&address) {
            return Err(OscError::InvalidAddress(address));
        }
        Ok(OscMessage { address, args })
    }

    /// For the crate's own fixed addresses, which are known to be valid.
    pub(crate) fn with_static_address(address: &'static str, args: Vec<OscArg>) -> Self {
        debug_assert!(is_valid_address(address));
        OscMessage { address: address.to_string(), args }
    }

    pub fn address(&self) -> &str      { &self.address }
    pub fn args(&self)    -> &[OscArg] { &self.args }

    /// The type-tag string, e.g. `",iff"`.
    pub fn type_tags(&self) -> String {
        std::iter::once(',')
            .chain(self.args.iter().map(|a| a.tag() as char))
            .collect()
    }

    /// Serialise to one OSC 1.0 message datagram.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(padded_len(self.address.len()) + 4 * (self.args.len() + 2));

        // ── Address pattern ───────────────────────────────────────────────
        write_padded_str(&mut out, self.address.as_bytes());

        // ── Type tags ─────────────────────────────────────────────────────
        write_padded_str(&mut out, self.type_tags().as_bytes());

        // ── Arguments (big-endian) ────────────────────────────────────────
        for arg in &self.args {
            arg.write(&mut out);
        }
        out
    }

    /// Parse one OSC message datagram containing only `i` and `f` arguments.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, OscError> {
        if bytes.starts_with(b"#bundle\0") {
            return Err(OscError::Bundle);
        }

        let (address, mut pos) = read_padded_str(bytes, 0)?;
        if !is_valid_address(address) {
            return Err(OscError::InvalidAddress(address.to_string()));
        }

        if pos >= bytes.len() {
            return Err(OscError::MissingTypeTags);
        }
        let (tags, next) = read_padded_str(bytes, pos)?;
        pos = next;
        let tags = tags.strip_prefix(',').ok_or(OscError::MissingTypeTags)?;

        let mut args = Vec::with_capacity(tags.len());
        for tag in tags.chars() {
            let word = read_word(bytes, pos)?;
            pos += 4;
            args.push(match tag {
                'i' => OscArg::Int(i32::from_be_bytes(word)),
                'f' => OscArg::Float(f32::from_be_bytes(word)),
                other => return Err(OscError::UnsupportedTag(other)),
            });
        }

        Ok(OscMessage { address: address.to_string(), args })
    }
}

impl fmt::Display for OscMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.address, self.type_tags())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

fn is_valid_address(address: &str) -> bool {
    address.starts_with('/') && address.is_ascii() && !address.contains('\0')
}

// ────────────────────────────────────────────────────────────────────────────
// Padded-string helpers
// ────────────────────────────────────────────────────────────────────────────

/// Bytes occupied by a string of `len` bytes once NUL-terminated and padded to 4.
fn padded_len(len: usize) -> usize {
    (len + 4) & !3
}

fn write_padded_str(buf: &mut Vec<u8>, s: &[u8]) {
    buf.extend_from_slice(s);
    let pad = padded_len(s.len()) - s.len();
    buf.extend(std::iter::repeat(0u8).take(pad));
}

/// Read a NUL-terminated, 4-byte-padded string starting at `pos`.
/// Returns the string and the offset just past its padding.
fn read_padded_str(bytes: &[u8], pos: usize) -> Result<(&str, usize), OscError> {
    let rest = bytes.get(pos..).ok_or(OscError::Truncated(pos))?;
    let nul  = rest.iter().position(|&b| b == 0).ok_or(OscError::Truncated(bytes.len()))?;
    let s    = std::str::from_utf8(&rest[..nul]).map_err(|_| OscError::InvalidString)?;
    let end  = pos + padded_len(nul);
    if end > bytes.len() {
        return Err(OscError::Truncated(bytes.len()));
    }
    Ok((s, end))
}

fn read_word(bytes: &[u8], pos: usize) -> Result<[u8; 4], OscError> {
    bytes
        .get(pos..pos + 4)
        .and_then(|w| w.try_into().ok())
        .ok_or(OscError::Truncated(bytes.len()))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
