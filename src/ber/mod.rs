//! BER (Basic Encoding Rules) encoding and decoding for SNMP.
//!
//! Encoding only covers what the receiver sends back, the Response that
//! acknowledges an InformRequest. Parsing is permissive where net-snmp is
//! (non-minimal integers and lengths are accepted) and strict where a
//! malformed length could cause over-reads.

mod decode;
mod encode;
mod length;

pub use decode::Decoder;
pub use encode::EncodeBuf;
pub(crate) use length::decode_length;
pub use length::MAX_LENGTH;

/// BER tag constants.
pub mod tag {
    /// Universal class tags.
    pub mod universal {
        pub const INTEGER: u8 = 0x02;
        pub const OCTET_STRING: u8 = 0x04;
        pub const NULL: u8 = 0x05;
        pub const OBJECT_IDENTIFIER: u8 = 0x06;
        pub const SEQUENCE: u8 = 0x30;
    }

    /// SNMP application class tags (RFC 2578).
    pub mod application {
        pub const IP_ADDRESS: u8 = 0x40;
        pub const COUNTER32: u8 = 0x41;
        pub const GAUGE32: u8 = 0x42;
        pub const TIMETICKS: u8 = 0x43;
        pub const OPAQUE: u8 = 0x44;
        pub const COUNTER64: u8 = 0x46;
    }

    /// PDU tags (context-specific, constructed).
    pub mod pdu {
        pub const RESPONSE: u8 = 0xA2;
        pub const TRAP_V1: u8 = 0xA4;
        pub const INFORM_REQUEST: u8 = 0xA6;
        pub const TRAP_V2: u8 = 0xA7;
        pub const REPORT: u8 = 0xA8;
    }

    /// Context-specific varbind exception tags (RFC 3416).
    pub mod context {
        pub const NO_SUCH_OBJECT: u8 = 0x80;
        pub const NO_SUCH_INSTANCE: u8 = 0x81;
        pub const END_OF_MIB_VIEW: u8 = 0x82;
    }
}
