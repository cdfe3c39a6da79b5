//! Community-based SNMP message format (v1/v2c).
//!
//! V1 and V2c messages share the same structure:
//! `SEQUENCE { version INTEGER, community OCTET STRING, pdu PDU }`
//!
//! A v1 message normally carries a Trap-PDU; v2c carries SNMPv2-Trap or
//! InformRequest. The layout is chosen by the PDU tag, not the version.

use crate::ber::{Decoder, EncodeBuf};
use crate::error::Result;
use crate::pdu::{AnyPdu, Pdu, PduType};
use crate::version::Version;
use bytes::Bytes;

/// Community message (v1 or v2c).
#[derive(Debug, Clone)]
pub struct CommunityMessage {
    /// V1 or V2c
    pub version: Version,
    /// Community string, not checked by the receiver
    pub community: Bytes,
    /// The PDU
    pub pdu: AnyPdu,
}

impl CommunityMessage {
    /// Decode a complete message.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;
        let version_num = seq.read_integer()?;
        let version = match Version::from_i32(version_num) {
            Some(v @ (Version::V1 | Version::V2c)) => v,
            _ => {
                return Err(seq.malformed(
                    crate::error::internal::DecodeErrorKind::UnknownVersion(version_num),
                ));
            }
        };
        Self::decode_from_sequence(&mut seq, version)
    }

    /// Decode the remainder after the version field has been read.
    pub(crate) fn decode_from_sequence(seq: &mut Decoder, version: Version) -> Result<Self> {
        let community = seq.read_octet_string()?;
        let pdu = AnyPdu::decode(seq)?;

        Ok(CommunityMessage {
            version,
            community,
            pdu,
        })
    }

    /// Encoded Response for an InformRequest, echoing version and community.
    ///
    /// `None` for every other PDU type.
    pub fn inform_response(&self) -> Option<Bytes> {
        match &self.pdu {
            AnyPdu::Standard(pdu) if pdu.pdu_type == PduType::InformRequest => {
                Some(encode(self.version, &self.community, &pdu.to_response()))
            }
            _ => None,
        }
    }
}

fn encode(version: Version, community: &[u8], pdu: &Pdu) -> Bytes {
    let mut buf = EncodeBuf::new();
    buf.push_sequence(|buf| {
        pdu.encode(buf);
        buf.push_octet_string(community);
        buf.push_integer(version.as_i32());
    });
    buf.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::PduType;

    #[test]
    fn test_decode_v1_trap_message() {
        // SEQUENCE { 0, "public", Trap-PDU { 1.3.6.1.4.1, 10.0.0.1, 0, 0, 0, {} } }
        let data = [
            0x30, 0x25, 0x02, 0x01, 0x00, 0x04, 0x06, b'p', b'u', b'b', b'l', b'i', b'c', //
            0xA4, 0x18, //
            0x06, 0x05, 0x2B, 0x06, 0x01, 0x04, 0x01, //
            0x40, 0x04, 10, 0, 0, 1, //
            0x02, 0x01, 0x00, //
            0x02, 0x01, 0x00, //
            0x43, 0x01, 0x00, //
            0x30, 0x00,
        ];
        let msg = CommunityMessage::decode(Bytes::copy_from_slice(&data)).unwrap();
        assert_eq!(msg.version, Version::V1);
        assert_eq!(msg.pdu.pdu_type(), PduType::TrapV1);
    }

    #[test]
    fn test_inform_response() {
        // SEQUENCE { 1, "public", InformRequest { 77, 0, 0, { { 1.3.6.1, NULL } } } }
        let data = [
            0x30, 0x21, 0x02, 0x01, 0x01, 0x04, 0x06, b'p', b'u', b'b', b'l', b'i', b'c', //
            0xA6, 0x14, 0x02, 0x01, 0x4D, 0x02, 0x01, 0x00, 0x02, 0x01, 0x00, //
            0x30, 0x09, 0x30, 0x07, 0x06, 0x03, 0x2B, 0x06, 0x01, 0x05, 0x00,
        ];
        let msg = CommunityMessage::decode(Bytes::copy_from_slice(&data)).unwrap();
        let response = msg.inform_response().unwrap();

        let mut expected = data;
        expected[13] = 0xA2;
        assert_eq!(response[..], expected[..]);

        let decoded = CommunityMessage::decode(response).unwrap();
        assert_eq!(decoded.version, Version::V2c);
        assert_eq!(decoded.pdu.pdu_type(), PduType::Response);
    }

    #[test]
    fn test_traps_get_no_response() {
        let data = [
            0x30, 0x18, 0x02, 0x01, 0x01, 0x04, 0x06, b'p', b'u', b'b', b'l', b'i', b'c', //
            0xA7, 0x0B, 0x02, 0x01, 0x01, 0x02, 0x01, 0x00, 0x02, 0x01, 0x00, 0x30, 0x00,
        ];
        let msg = CommunityMessage::decode(Bytes::copy_from_slice(&data)).unwrap();
        assert!(msg.inform_response().is_none());
    }

    #[test]
    fn test_decode_rejects_v3_version() {
        let data = [0x30, 0x05, 0x02, 0x01, 0x03, 0x04, 0x00];
        assert!(CommunityMessage::decode(Bytes::copy_from_slice(&data)).is_err());
    }
}
