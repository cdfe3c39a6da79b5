//! SNMP message wrappers.
//!
//! - [`CommunityMessage`] - v1/v2c messages with a community string
//! - [`V3Message`] - v3 messages with USM security parameters

mod community;
mod v3;

pub use community::CommunityMessage;
pub use v3::{
    MsgFlags, MsgGlobalData, ScopedPdu, SecurityLevel, SecurityModel, V3Message, V3MessageData,
};

use std::net::SocketAddr;

use crate::ber::Decoder;
use crate::error::Result;
use crate::error::internal::DecodeErrorKind;
use crate::version::Version;
use bytes::Bytes;

/// Decoded SNMP message (any version).
#[derive(Debug)]
pub enum Message {
    /// SNMPv1 or SNMPv2c message
    Community(CommunityMessage),
    /// SNMPv3 message
    V3(V3Message),
}

impl Message {
    /// Decode a datagram, dispatching on the version field.
    ///
    /// Errors carry `peer` so the receiver can log who sent the garbage.
    pub fn decode(data: Bytes, peer: SocketAddr) -> Result<Self> {
        let mut decoder = Decoder::with_peer(data, peer);
        let mut seq = decoder.read_sequence()?;

        let version_num = seq.read_integer()?;
        match Version::from_i32(version_num) {
            Some(Version::V3) => Ok(Message::V3(V3Message::decode_from_sequence(&mut seq)?)),
            Some(version) => Ok(Message::Community(
                CommunityMessage::decode_from_sequence(&mut seq, version)?,
            )),
            None => Err(seq.malformed(DecodeErrorKind::UnknownVersion(version_num))),
        }
    }

    /// Get the SNMP version.
    pub fn version(&self) -> Version {
        match self {
            Message::Community(m) => m.version,
            Message::V3(_) => Version::V3,
        }
    }
}
