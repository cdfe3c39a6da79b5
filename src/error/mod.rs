//! Error types for async-snmp-trap.
//!
//! This module provides:
//!
//! - [`Error`] - The main error type for listener and normalizer failures
//! - [`ResolveError`] - Failures translating a numeric OID to a MIB name
//!
//! # Error Handling
//!
//! Errors are boxed for efficiency: `Result<T> = Result<T, Box<Error>>`.
//!
//! ```rust
//! use async_snmp_trap::{Error, Result};
//!
//! fn report(result: Result<()>) {
//!     match result {
//!         Ok(()) => {}
//!         Err(e) => match &*e {
//!             Error::Config(msg) => eprintln!("bad configuration: {msg}"),
//!             Error::Network { target, .. } => eprintln!("cannot listen on {target}"),
//!             _ => eprintln!("error: {e}"),
//!         },
//!     }
//! }
//! ```

pub(crate) mod internal;

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::listener::ListenerState;

/// Placeholder peer address used when no peer is known.
///
/// Decoders built without a peer (tests, re-decoding decrypted scoped PDUs
/// before the caller attaches context) report this address.
pub(crate) const UNKNOWN_PEER: SocketAddr =
    SocketAddr::new(IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)), 0);

// Detailed internal errors are logged, then collapsed into a public variant:
//
// tracing::debug!(
//     target: "async_snmp_trap::ber",
//     { snmp.offset = 42, kind = %DecodeErrorKind::ZeroLengthInteger },
//     "zero-length integer"
// );
// return Err(Error::MalformedPacket { peer }.boxed());

/// Result type alias using the crate's boxed Error type.
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// The main error type for the trap subsystem.
///
/// Only [`Error::Config`] and [`Error::Network`] are fatal, and only while
/// starting the listener. Everything else is per-datagram: the packet is
/// dropped and the listener keeps running.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid listener configuration.
    #[error("configuration error: {0}")]
    Config(Box<str>),

    /// Invalid OID string.
    #[error("invalid OID: {0}")]
    InvalidOid(Box<str>),

    /// Socket bind or receive failure.
    #[error("network error on {target}: {source}")]
    Network {
        target: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Datagram could not be decoded as an SNMP message.
    #[error("malformed packet from {peer}")]
    MalformedPacket { peer: SocketAddr },

    /// SNMPv3 message failed user, level or digest checks, or could not be decrypted.
    #[error("authentication failed for packet from {peer}")]
    Auth { peer: SocketAddr },

    /// An OID in the trap could not be translated.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The trap carried no variable naming the trap type.
    #[error("no trap OID found in packet from {peer}")]
    MalformedTrap { peer: IpAddr },

    /// Lifecycle call made in the wrong listener state.
    #[error("listener is {state}")]
    InvalidState { state: ListenerState },
}

impl Error {
    /// Box this error (convenience for constructing boxed errors).
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }
}

impl From<ResolveError> for Box<Error> {
    fn from(e: ResolveError) -> Self {
        Error::Resolve(e).boxed()
    }
}

/// Failure translating a numeric OID.
///
/// A failed translation is never cached, so the same OID is retried on
/// the next trap that carries it.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// The translator output had no `MIB::name` entry.
    #[error("OID {oid} not found")]
    NotFound { oid: Box<str> },

    /// The translator did not finish in time.
    #[error("translating {oid} timed out after {elapsed:?}")]
    Timeout { oid: Box<str>, elapsed: Duration },

    /// The translator could not be run or exited unsuccessfully.
    #[error("translating {oid} failed: {source}")]
    Exec {
        oid: Box<str>,
        #[source]
        source: std::io::Error,
    },
}

impl ResolveError {
    /// The OID whose translation failed.
    pub fn oid(&self) -> &str {
        match self {
            Self::NotFound { oid } | Self::Timeout { oid, .. } | Self::Exec { oid, .. } => oid,
        }
    }
}
