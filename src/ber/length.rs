//! BER length encoding and decoding.
//!
//! Length encoding follows X.690 Section 8.1.3:
//! - Short form: Single byte, bit 8=0, value 0-127
//! - Long form: Initial byte (bit 8=1, bits 7-1=count), followed by length bytes
//! - Indefinite form (0x80): Rejected per net-snmp behavior

use std::net::SocketAddr;

use crate::error::internal::DecodeErrorKind;
use crate::error::{Error, Result, UNKNOWN_PEER};

/// Maximum length we'll accept (to prevent DoS).
///
/// A UDP datagram cannot exceed 64 KiB, so anything larger is garbage.
/// The 2 MiB ceiling is kept as a sanity check independent of transport.
pub const MAX_LENGTH: usize = 0x200000;

fn malformed(offset: usize, kind: DecodeErrorKind, peer: Option<SocketAddr>) -> Box<Error> {
    tracing::debug!(target: "async_snmp_trap::ber", { snmp.offset = %offset, kind = %kind }, "invalid length encoding");
    Error::MalformedPacket {
        peer: peer.unwrap_or(UNKNOWN_PEER),
    }
    .boxed()
}

/// Encode a length, returning the octets in reverse order for prepending.
///
/// Short form up to 127, minimal long form above.
pub(crate) fn encode_length(len: usize) -> ([u8; 5], usize) {
    let mut buf = [0u8; 5];
    if len <= 127 {
        buf[0] = len as u8;
        return (buf, 1);
    }

    let mut n = 0;
    let mut rest = len;
    while rest > 0 && n < 4 {
        buf[n] = rest as u8;
        rest >>= 8;
        n += 1;
    }
    buf[n] = 0x80 | n as u8;
    (buf, n + 1)
}

/// Decode a length from bytes, returning (length, bytes_consumed).
///
/// `base_offset` is only used for log context when called from a decoder.
pub(crate) fn decode_length(
    data: &[u8],
    base_offset: usize,
    peer: Option<SocketAddr>,
) -> Result<(usize, usize)> {
    let Some(&first) = data.first() else {
        return Err(malformed(base_offset, DecodeErrorKind::TruncatedData, peer));
    };

    if first == 0x80 {
        return Err(malformed(
            base_offset,
            DecodeErrorKind::IndefiniteLength,
            peer,
        ));
    }

    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }

    let num_octets = (first & 0x7F) as usize;
    if num_octets > 4 {
        return Err(malformed(
            base_offset,
            DecodeErrorKind::LengthTooLong { octets: num_octets },
            peer,
        ));
    }
    if data.len() < 1 + num_octets {
        return Err(malformed(base_offset, DecodeErrorKind::TruncatedData, peer));
    }

    let len = data[1..=num_octets]
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize);

    if len > MAX_LENGTH {
        return Err(malformed(
            base_offset,
            DecodeErrorKind::LengthExceedsMax {
                length: len,
                max: MAX_LENGTH,
            },
            peer,
        ));
    }

    Ok((len, 1 + num_octets))
}
