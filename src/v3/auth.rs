//! Authentication key derivation and HMAC verification (RFC 3414).
//!
//! Keys are derived in two steps. The password is expanded to 1MB and hashed
//! into a [`MasterKey`] once per user; the master key is then bound to each
//! sending engine's ID as a [`LocalizedKey`].

use digest::{Digest, KeyInit, Mac, OutputSizeUser};
use hmac::Hmac;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::AuthProtocol;

/// Minimum password length accepted by net-snmp.
///
/// Shorter passwords still work here but are logged at `WARN`.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Non-localized key (Ku), the hash of the 1MB password expansion.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    protocol: AuthProtocol,
}

impl MasterKey {
    /// Run the password-to-key transformation (RFC 3414 A.2.1).
    pub fn from_password(protocol: AuthProtocol, password: &[u8]) -> Self {
        if password.len() < MIN_PASSWORD_LENGTH {
            tracing::warn!(
                target: "async_snmp_trap::usm",
                password_len = password.len(),
                min_len = MIN_PASSWORD_LENGTH,
                "SNMPv3 password is shorter than net-snmp accepts"
            );
        }
        let key = match protocol {
            AuthProtocol::Md5 => password_to_key::<md5::Md5>(password),
            AuthProtocol::Sha => password_to_key::<sha1::Sha1>(password),
        };
        Self { key, protocol }
    }

    /// Bind this key to an engine ID (RFC 3414 A.2.2).
    pub fn localize(&self, engine_id: &[u8]) -> LocalizedKey {
        let key = match self.protocol {
            AuthProtocol::Md5 => localize::<md5::Md5>(&self.key, engine_id),
            AuthProtocol::Sha => localize::<sha1::Sha1>(&self.key, engine_id),
        };
        LocalizedKey {
            key,
            protocol: self.protocol,
        }
    }

    /// The protocol this key was derived with.
    pub fn protocol(&self) -> AuthProtocol {
        self.protocol
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("protocol", &self.protocol)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Localized key (Kul), usable for HMAC and as privacy key material.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct LocalizedKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    protocol: AuthProtocol,
}

impl LocalizedKey {
    /// Derive a localized key straight from a password.
    pub fn from_password(protocol: AuthProtocol, password: &[u8], engine_id: &[u8]) -> Self {
        MasterKey::from_password(protocol, password).localize(engine_id)
    }

    /// Wrap an already localized key.
    pub fn from_bytes(protocol: AuthProtocol, key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            protocol,
        }
    }

    /// The protocol this key is for.
    pub fn protocol(&self) -> AuthProtocol {
        self.protocol
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// HMAC over `data`, truncated to the protocol's MAC length.
    pub fn compute_hmac(&self, data: &[u8]) -> Option<Vec<u8>> {
        let mut mac = match self.protocol {
            AuthProtocol::Md5 => hmac_digest::<Hmac<md5::Md5>>(&self.key, data)?,
            AuthProtocol::Sha => hmac_digest::<Hmac<sha1::Sha1>>(&self.key, data)?,
        };
        mac.truncate(self.protocol.mac_len());
        Some(mac)
    }

    /// Constant-time comparison of the computed MAC against `expected`.
    pub fn verify_hmac(&self, data: &[u8], expected: &[u8]) -> bool {
        let Some(computed) = self.compute_hmac(data) else {
            return false;
        };
        if computed.len() != expected.len() {
            return false;
        }
        computed
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl std::fmt::Debug for LocalizedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalizedKey")
            .field("protocol", &self.protocol)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

fn password_to_key<D>(password: &[u8]) -> Vec<u8>
where
    D: Digest + Default,
{
    const EXPANSION_SIZE: usize = 1_048_576;

    if password.is_empty() {
        return vec![0u8; <D as OutputSizeUser>::output_size()];
    }

    // Repeat the password over 1MB, hashed in 64-byte chunks like net-snmp
    let mut hasher = D::new();
    let mut buf = [0u8; 64];
    let mut source = password.iter().cycle();
    for _ in 0..EXPANSION_SIZE / buf.len() {
        for (byte, &p) in buf.iter_mut().zip(&mut source) {
            *byte = p;
        }
        hasher.update(buf);
    }
    hasher.finalize().to_vec()
}

fn localize<D>(master_key: &[u8], engine_id: &[u8]) -> Vec<u8>
where
    D: Digest + Default,
{
    let mut hasher = D::new();
    hasher.update(master_key);
    hasher.update(engine_id);
    hasher.update(master_key);
    hasher.finalize().to_vec()
}

fn hmac_digest<M>(key: &[u8], data: &[u8]) -> Option<Vec<u8>>
where
    M: Mac + KeyInit,
{
    let mut mac = <M as KeyInit>::new_from_slice(key).ok()?;
    Mac::update(&mut mac, data);
    Some(mac.finalize().into_bytes().to_vec())
}

/// Verify the MAC of an incoming whole message.
///
/// The MAC is computed over the message with the `auth_len` bytes at
/// `auth_offset` zeroed, then compared with the bytes that were there.
pub fn verify_message(
    key: &LocalizedKey,
    message: &[u8],
    auth_offset: usize,
    auth_len: usize,
) -> bool {
    let Some(received) = auth_offset
        .checked_add(auth_len)
        .and_then(|end| message.get(auth_offset..end))
    else {
        return false;
    };

    let mut zeroed = message.to_vec();
    zeroed[auth_offset..auth_offset + auth_len].fill(0);
    key.verify_hmac(&zeroed, received)
}
