//! SNMP Protocol Data Units (PDUs).
//!
//! Only the notification PDUs are decoded in full. Other request types are
//! recognised by tag so the receiver can log and drop them. The only PDU
//! ever encoded is the Response that acknowledges an InformRequest.

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::Result;
use crate::error::internal::DecodeErrorKind;
use crate::oid::Oid;
use crate::varbind::{VarBind, decode_varbind_list, encode_varbind_list};

/// PDU type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PduType {
    GetRequest = 0xA0,
    GetNextRequest = 0xA1,
    Response = 0xA2,
    SetRequest = 0xA3,
    TrapV1 = 0xA4,
    GetBulkRequest = 0xA5,
    InformRequest = 0xA6,
    TrapV2 = 0xA7,
    Report = 0xA8,
}

impl PduType {
    /// Create from tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0xA0 => Some(Self::GetRequest),
            0xA1 => Some(Self::GetNextRequest),
            0xA2 => Some(Self::Response),
            0xA3 => Some(Self::SetRequest),
            0xA4 => Some(Self::TrapV1),
            0xA5 => Some(Self::GetBulkRequest),
            0xA6 => Some(Self::InformRequest),
            0xA7 => Some(Self::TrapV2),
            0xA8 => Some(Self::Report),
            _ => None,
        }
    }

    /// Get the tag byte.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Trap or Inform.
    pub fn is_notification(self) -> bool {
        matches!(self, Self::TrapV1 | Self::TrapV2 | Self::InformRequest)
    }
}

impl std::fmt::Display for PduType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GetRequest => write!(f, "GetRequest"),
            Self::GetNextRequest => write!(f, "GetNextRequest"),
            Self::Response => write!(f, "Response"),
            Self::SetRequest => write!(f, "SetRequest"),
            Self::TrapV1 => write!(f, "TrapV1"),
            Self::GetBulkRequest => write!(f, "GetBulkRequest"),
            Self::InformRequest => write!(f, "InformRequest"),
            Self::TrapV2 => write!(f, "TrapV2"),
            Self::Report => write!(f, "Report"),
        }
    }
}

/// Standard PDU layout shared by SNMPv2-Trap, InformRequest and the
/// request/response types.
#[derive(Debug, Clone)]
pub struct Pdu {
    /// PDU type
    pub pdu_type: PduType,
    /// Request ID
    pub request_id: i32,
    /// Error status (always 0 in notifications)
    pub error_status: i32,
    /// Error index
    pub error_index: i32,
    /// Variable bindings
    pub varbinds: Vec<VarBind>,
}

impl Pdu {
    /// Decode a standard-layout PDU.
    ///
    /// A Trap-PDU (v1 layout) here is a framing error: use [`TrapV1Pdu::decode`].
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let tag = decoder.read_tag()?;
        let pdu_type = match PduType::from_tag(tag) {
            Some(t) if t != PduType::TrapV1 => t,
            _ => return Err(decoder.malformed(DecodeErrorKind::UnknownPduType(tag))),
        };

        let len = decoder.read_length()?;
        let mut pdu = decoder.sub_decoder(len)?;

        let request_id = pdu.read_integer()?;
        let error_status = pdu.read_integer()?;
        let error_index = pdu.read_integer()?;
        let varbinds = decode_varbind_list(&mut pdu)?;

        Ok(Pdu {
            pdu_type,
            request_id,
            error_status,
            error_index,
            varbinds,
        })
    }

    /// Response acknowledging this PDU: same request-id and varbinds,
    /// error-status and error-index 0 (RFC 3416 Section 4.2.7).
    pub fn to_response(&self) -> Self {
        Pdu {
            pdu_type: PduType::Response,
            request_id: self.request_id,
            error_status: 0,
            error_index: 0,
            varbinds: self.varbinds.clone(),
        }
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(self.pdu_type.tag(), |buf| {
            encode_varbind_list(buf, &self.varbinds);
            buf.push_integer(self.error_index);
            buf.push_integer(self.error_status);
            buf.push_integer(self.request_id);
        });
    }
}

/// SNMPv1 generic trap types (RFC 1157 Section 4.1.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum GenericTrap {
    /// coldStart(0)
    ColdStart = 0,
    /// warmStart(1)
    WarmStart = 1,
    /// linkDown(2)
    LinkDown = 2,
    /// linkUp(3)
    LinkUp = 3,
    /// authenticationFailure(4)
    AuthenticationFailure = 4,
    /// egpNeighborLoss(5)
    EgpNeighborLoss = 5,
    /// enterpriseSpecific(6) - vendor trap, see specific_trap
    EnterpriseSpecific = 6,
}

impl GenericTrap {
    /// Create from integer value.
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::ColdStart),
            1 => Some(Self::WarmStart),
            2 => Some(Self::LinkDown),
            3 => Some(Self::LinkUp),
            4 => Some(Self::AuthenticationFailure),
            5 => Some(Self::EgpNeighborLoss),
            6 => Some(Self::EnterpriseSpecific),
            _ => None,
        }
    }

    /// Get the integer value.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// SNMPv1 Trap PDU (RFC 1157 Section 4.1.6).
#[derive(Debug, Clone)]
pub struct TrapV1Pdu {
    /// Enterprise OID (sysObjectID of the sender)
    pub enterprise: Oid,
    /// Agent address
    pub agent_addr: [u8; 4],
    /// Generic trap type. Kept raw: out-of-range codes are passed through.
    pub generic_trap: i32,
    /// Specific trap code
    pub specific_trap: i32,
    /// sysUpTime of the sender, in hundredths of seconds
    pub time_stamp: u32,
    /// Variable bindings
    pub varbinds: Vec<VarBind>,
}

impl TrapV1Pdu {
    /// Get the generic trap type as an enum.
    pub fn generic_trap_enum(&self) -> Option<GenericTrap> {
        GenericTrap::from_i32(self.generic_trap)
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut pdu = decoder.read_constructed(tag::pdu::TRAP_V1)?;

        let enterprise = pdu.read_oid()?;
        // NetworkAddress is APPLICATION 0 IMPLICIT IpAddress
        let agent_addr = pdu.read_ip_address()?;
        let generic_trap = pdu.read_integer()?;
        let specific_trap = pdu.read_integer()?;
        let time_stamp = pdu.read_unsigned32(tag::application::TIMETICKS)?;
        let varbinds = decode_varbind_list(&mut pdu)?;

        Ok(TrapV1Pdu {
            enterprise,
            agent_addr,
            generic_trap,
            specific_trap,
            time_stamp,
            varbinds,
        })
    }
}

/// Either PDU layout, as found inside a message.
#[derive(Debug, Clone)]
pub enum AnyPdu {
    /// SNMPv1 Trap-PDU
    TrapV1(TrapV1Pdu),
    /// Any standard-layout PDU
    Standard(Pdu),
}

impl AnyPdu {
    /// Decode whichever layout the next tag announces.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        match decoder.peek_tag() {
            Some(tag::pdu::TRAP_V1) => Ok(Self::TrapV1(TrapV1Pdu::decode(decoder)?)),
            _ => Ok(Self::Standard(Pdu::decode(decoder)?)),
        }
    }

    /// The PDU type.
    pub fn pdu_type(&self) -> PduType {
        match self {
            Self::TrapV1(_) => PduType::TrapV1,
            Self::Standard(pdu) => pdu.pdu_type,
        }
    }
}
