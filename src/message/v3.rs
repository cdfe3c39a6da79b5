//! SNMPv3 message format (RFC 3412).
//!
//! ```text
//! SEQUENCE {
//!     INTEGER version (3)
//!     SEQUENCE msgGlobalData {
//!         INTEGER msgID
//!         INTEGER msgMaxSize
//!         OCTET STRING msgFlags (1 byte)
//!         INTEGER msgSecurityModel
//!     }
//!     OCTET STRING msgSecurityParameters (opaque, USM-encoded)
//!     msgData (ScopedPDU or encrypted OCTET STRING)
//! }
//! ```

use bytes::Bytes;

use crate::ber::Decoder;
use crate::error::Result;
use crate::error::internal::DecodeErrorKind;
use crate::pdu::Pdu;
use crate::v3::ParseSecurityError;

/// Security model identifiers. Only USM is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum SecurityModel {
    /// User-based Security Model (RFC 3414)
    Usm = 3,
}

impl SecurityModel {
    /// Create from raw value.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            3 => Some(Self::Usm),
            _ => None,
        }
    }
}

/// SNMPv3 security level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SecurityLevel {
    /// No authentication, no privacy
    #[default]
    NoAuthNoPriv,
    /// Authentication only
    AuthNoPriv,
    /// Authentication and privacy
    AuthPriv,
}

impl SecurityLevel {
    /// Decode from the auth (0x01) and priv (0x02) msgFlags bits.
    ///
    /// Returns `None` for priv without auth, which RFC 3412 forbids.
    pub fn from_flags(flags: u8) -> Option<Self> {
        match (flags & 0x01 != 0, flags & 0x02 != 0) {
            (false, false) => Some(Self::NoAuthNoPriv),
            (true, false) => Some(Self::AuthNoPriv),
            (true, true) => Some(Self::AuthPriv),
            (false, true) => None,
        }
    }

    /// Check if authentication is required.
    pub fn requires_auth(self) -> bool {
        matches!(self, Self::AuthNoPriv | Self::AuthPriv)
    }

    /// Check if privacy is required.
    pub fn requires_priv(self) -> bool {
        matches!(self, Self::AuthPriv)
    }
}

impl std::fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAuthNoPriv => write!(f, "noAuthNoPriv"),
            Self::AuthNoPriv => write!(f, "authNoPriv"),
            Self::AuthPriv => write!(f, "authPriv"),
        }
    }
}

/// Case-insensitive; the empty string means noAuthNoPriv.
impl std::str::FromStr for SecurityLevel {
    type Err = ParseSecurityError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "noauthnopriv" => Ok(Self::NoAuthNoPriv),
            "authnopriv" => Ok(Self::AuthNoPriv),
            "authpriv" => Ok(Self::AuthPriv),
            _ => Err(ParseSecurityError::level(s)),
        }
    }
}

/// Message flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgFlags {
    /// Security level
    pub security_level: SecurityLevel,
    /// Reportable flag (never set on traps, set on informs)
    pub reportable: bool,
}

impl MsgFlags {
    fn decode(seq: &Decoder, byte: u8) -> Result<Self> {
        let security_level = SecurityLevel::from_flags(byte)
            .ok_or_else(|| seq.malformed(DecodeErrorKind::InvalidMsgFlags))?;
        Ok(Self {
            security_level,
            reportable: byte & 0x04 != 0,
        })
    }
}

/// Message global data (header).
#[derive(Debug, Clone)]
pub struct MsgGlobalData {
    /// Message identifier
    pub msg_id: i32,
    /// Sender's maximum message size
    pub msg_max_size: i32,
    /// Flags
    pub msg_flags: MsgFlags,
    /// Security model
    pub msg_security_model: SecurityModel,
}

impl MsgGlobalData {
    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        const MSG_MAX_SIZE_MINIMUM: i32 = 484;

        let mut seq = decoder.read_sequence()?;

        let msg_id = seq.read_integer()?;
        // RFC 3412 HeaderData: msgID INTEGER (0..2147483647)
        if msg_id < 0 {
            return Err(seq.malformed(DecodeErrorKind::NegativeValue {
                field: "msgID",
                value: msg_id,
            }));
        }

        let msg_max_size = seq.read_integer()?;
        if msg_max_size < MSG_MAX_SIZE_MINIMUM {
            return Err(seq.malformed(DecodeErrorKind::MsgMaxSizeTooSmall {
                value: msg_max_size,
                minimum: MSG_MAX_SIZE_MINIMUM,
            }));
        }

        let flags = seq.read_octet_string()?;
        if flags.len() != 1 {
            return Err(seq.malformed(DecodeErrorKind::InvalidMsgFlags));
        }
        let msg_flags = MsgFlags::decode(&seq, flags[0])?;

        // RFC 3412 Section 7.2: unknown security models are dropped
        let raw_model = seq.read_integer()?;
        let msg_security_model = SecurityModel::from_i32(raw_model)
            .ok_or_else(|| seq.malformed(DecodeErrorKind::UnknownSecurityModel(raw_model)))?;

        Ok(Self {
            msg_id,
            msg_max_size,
            msg_flags,
            msg_security_model,
        })
    }
}

/// Scoped PDU (contextEngineID, contextName, PDU).
#[derive(Debug, Clone)]
pub struct ScopedPdu {
    /// Context engine ID
    pub context_engine_id: Bytes,
    /// Context name
    pub context_name: Bytes,
    /// The PDU
    pub pdu: Pdu,
}

impl ScopedPdu {
    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_sequence()?;

        let context_engine_id = seq.read_octet_string()?;
        let context_name = seq.read_octet_string()?;
        let pdu = Pdu::decode(&mut seq)?;

        Ok(Self {
            context_engine_id,
            context_name,
            pdu,
        })
    }
}

/// SNMPv3 message.
#[derive(Debug, Clone)]
pub struct V3Message {
    /// Header
    pub global_data: MsgGlobalData,
    /// Raw USM security parameters, decoded separately
    pub security_params: Bytes,
    /// Plaintext or encrypted scoped PDU
    pub data: V3MessageData,
}

/// The msgData field.
#[derive(Debug, Clone)]
pub enum V3MessageData {
    /// Plaintext scoped PDU (noAuthNoPriv, authNoPriv)
    Plaintext(ScopedPdu),
    /// Encrypted scoped PDU (authPriv)
    Encrypted(Bytes),
}

impl V3Message {
    /// Security level from the header flags.
    pub fn security_level(&self) -> SecurityLevel {
        self.global_data.msg_flags.security_level
    }

    /// Decode the remainder after the version field has been read.
    pub(crate) fn decode_from_sequence(seq: &mut Decoder) -> Result<Self> {
        let global_data = MsgGlobalData::decode(seq)?;
        let security_params = seq.read_octet_string()?;

        let data = if global_data.msg_flags.security_level.requires_priv() {
            V3MessageData::Encrypted(seq.read_octet_string()?)
        } else {
            V3MessageData::Plaintext(ScopedPdu::decode(seq)?)
        };

        Ok(Self {
            global_data,
            security_params,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_level_from_flags() {
        assert_eq!(SecurityLevel::from_flags(0x00), Some(SecurityLevel::NoAuthNoPriv));
        assert_eq!(SecurityLevel::from_flags(0x01), Some(SecurityLevel::AuthNoPriv));
        assert_eq!(SecurityLevel::from_flags(0x03), Some(SecurityLevel::AuthPriv));
        assert_eq!(SecurityLevel::from_flags(0x07), Some(SecurityLevel::AuthPriv));
        assert_eq!(SecurityLevel::from_flags(0x02), None);
    }

    #[test]
    fn test_security_level_from_str() {
        assert_eq!("".parse::<SecurityLevel>().unwrap(), SecurityLevel::NoAuthNoPriv);
        assert_eq!(
            "noAuthNoPriv".parse::<SecurityLevel>().unwrap(),
            SecurityLevel::NoAuthNoPriv
        );
        assert_eq!(
            "AUTHNOPRIV".parse::<SecurityLevel>().unwrap(),
            SecurityLevel::AuthNoPriv
        );
        assert_eq!("authPriv".parse::<SecurityLevel>().unwrap(), SecurityLevel::AuthPriv);

        let err = "authpriv2".parse::<SecurityLevel>().unwrap_err();
        assert_eq!(err.to_string(), "unknown security level 'authpriv2'");
    }

    #[test]
    fn test_global_data_decode() {
        // SEQUENCE { msgID 1, msgMaxSize 65507, flags 0x03, model 3 }
        let data = [
            0x30, 0x0E, 0x02, 0x01, 0x01, 0x02, 0x03, 0x00, 0xFF, 0xE3, 0x04, 0x01, 0x03, 0x02,
            0x01, 0x03,
        ];
        let gd = MsgGlobalData::decode(&mut Decoder::from_slice(&data)).unwrap();
        assert_eq!(gd.msg_id, 1);
        assert_eq!(gd.msg_max_size, 65507);
        assert_eq!(gd.msg_flags.security_level, SecurityLevel::AuthPriv);
        assert!(!gd.msg_flags.reportable);
        assert_eq!(gd.msg_security_model, SecurityModel::Usm);
    }

    #[test]
    fn test_global_data_rejects_small_max_size() {
        // msgMaxSize 100
        let data = [
            0x30, 0x0C, 0x02, 0x01, 0x01, 0x02, 0x01, 0x64, 0x04, 0x01, 0x00, 0x02, 0x01, 0x03,
        ];
        assert!(MsgGlobalData::decode(&mut Decoder::from_slice(&data)).is_err());
    }

    #[test]
    fn test_global_data_rejects_unknown_model() {
        // model 2 (community-based, not valid in a v3 message)
        let data = [
            0x30, 0x0E, 0x02, 0x01, 0x01, 0x02, 0x03, 0x00, 0xFF, 0xE3, 0x04, 0x01, 0x00, 0x02,
            0x01, 0x02,
        ];
        assert!(MsgGlobalData::decode(&mut Decoder::from_slice(&data)).is_err());
    }

    #[test]
    fn test_global_data_rejects_priv_without_auth() {
        let data = [
            0x30, 0x0E, 0x02, 0x01, 0x01, 0x02, 0x03, 0x00, 0xFF, 0xE3, 0x04, 0x01, 0x02, 0x02,
            0x01, 0x03,
        ];
        assert!(MsgGlobalData::decode(&mut Decoder::from_slice(&data)).is_err());
    }
}
