//! Privacy (decryption) for SNMPv3 (RFC 3414 Section 8, RFC 3826).
//!
//! # IV construction
//!
//! - DES-CBC: IV = pre-IV XOR salt, where the pre-IV is bytes 8..16 of the
//!   privacy key and the salt is msgPrivacyParameters.
//! - AES-CFB: IV = engineBoots (4) || engineTime (4) || salt (8). This is a
//!   concatenation, not an XOR.

use bytes::Bytes;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::auth::MasterKey;
use super::{KeyExtension, PrivProtocol};
use crate::error::internal::CryptoErrorKind;

/// Localized privacy key for one engine.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    protocol: PrivProtocol,
}

impl PrivKey {
    /// Derive the privacy key for `engine_id` from the master key of the
    /// privacy password.
    ///
    /// The localized key is extended to [`PrivProtocol::key_len`] when the
    /// auth digest is too short, using the protocol's [`KeyExtension`].
    pub fn from_master_key(master: &MasterKey, protocol: PrivProtocol, engine_id: &[u8]) -> Self {
        let need = protocol.key_len();
        let mut key = master.localize(engine_id).as_bytes().to_vec();

        match protocol.key_extension() {
            KeyExtension::None => {}
            KeyExtension::Blumenthal => {
                while key.len() < need {
                    let more = hash(master, &key);
                    key.extend_from_slice(&more);
                }
            }
            KeyExtension::Reeder => {
                let mut last = key.clone();
                while key.len() < need {
                    last = MasterKey::from_password(master.protocol(), &last)
                        .localize(engine_id)
                        .as_bytes()
                        .to_vec();
                    key.extend_from_slice(&last);
                }
                last.zeroize();
            }
        }

        key.truncate(need);
        Self { key, protocol }
    }

    /// Wrap raw key bytes (at least [`PrivProtocol::key_len`] long).
    pub fn from_bytes(protocol: PrivProtocol, key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            protocol,
        }
    }

    /// The privacy protocol.
    pub fn protocol(&self) -> PrivProtocol {
        self.protocol
    }

    /// Raw key bytes. For DES the second half is the pre-IV.
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Decrypt an encrypted scoped PDU.
    ///
    /// `priv_params` is the 8-byte salt from msgPrivacyParameters. Engine
    /// boots and time are only used by AES.
    pub(crate) fn decrypt(
        &self,
        ciphertext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        priv_params: &[u8],
    ) -> Result<Bytes, CryptoErrorKind> {
        if priv_params.len() != 8 {
            return Err(CryptoErrorKind::InvalidPrivParamsLength {
                expected: 8,
                actual: priv_params.len(),
            });
        }
        if self.key.len() < self.protocol.key_len() {
            return Err(CryptoErrorKind::InvalidKeyLength);
        }

        match self.protocol {
            PrivProtocol::Des => self.decrypt_des(ciphertext, priv_params),
            _ => self.decrypt_aes(ciphertext, engine_boots, engine_time, priv_params),
        }
    }

    fn decrypt_des(&self, ciphertext: &[u8], salt: &[u8]) -> Result<Bytes, CryptoErrorKind> {
        use cbc::cipher::{BlockDecryptMut, KeyIvInit};
        type DesCbc = cbc::Decryptor<des::Des>;

        if !ciphertext.len().is_multiple_of(8) {
            return Err(CryptoErrorKind::InvalidCiphertextLength {
                length: ciphertext.len(),
                block_size: 8,
            });
        }

        let (key, pre_iv) = self.key[..16].split_at(8);
        let mut iv = [0u8; 8];
        for ((iv, p), s) in iv.iter_mut().zip(pre_iv).zip(salt) {
            *iv = p ^ s;
        }

        let cipher =
            DesCbc::new_from_slices(key, &iv).map_err(|_| CryptoErrorKind::InvalidKeyLength)?;
        let mut buffer = ciphertext.to_vec();
        let plaintext = cipher
            .decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buffer)
            .map_err(|_| CryptoErrorKind::CipherError)?;

        Ok(Bytes::copy_from_slice(plaintext))
    }

    fn decrypt_aes(
        &self,
        ciphertext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        salt: &[u8],
    ) -> Result<Bytes, CryptoErrorKind> {
        use aes::{Aes128, Aes192, Aes256};
        use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};

        let key = &self.key[..self.protocol.key_len()];

        let mut iv = [0u8; 16];
        iv[..4].copy_from_slice(&engine_boots.to_be_bytes());
        iv[4..8].copy_from_slice(&engine_time.to_be_bytes());
        iv[8..].copy_from_slice(salt);

        let mut buffer = ciphertext.to_vec();
        match key.len() {
            16 => cfb_mode::Decryptor::<Aes128>::new_from_slices(key, &iv)
                .map_err(|_| CryptoErrorKind::InvalidKeyLength)?
                .decrypt(&mut buffer),
            24 => cfb_mode::Decryptor::<Aes192>::new_from_slices(key, &iv)
                .map_err(|_| CryptoErrorKind::InvalidKeyLength)?
                .decrypt(&mut buffer),
            32 => cfb_mode::Decryptor::<Aes256>::new_from_slices(key, &iv)
                .map_err(|_| CryptoErrorKind::InvalidKeyLength)?
                .decrypt(&mut buffer),
            _ => return Err(CryptoErrorKind::InvalidKeyLength),
        }

        Ok(Bytes::from(buffer))
    }
}

impl std::fmt::Debug for PrivKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivKey")
            .field("protocol", &self.protocol)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// H(data) with the master key's auth hash.
fn hash(master: &MasterKey, data: &[u8]) -> Vec<u8> {
    use digest::Digest;
    match master.protocol() {
        super::AuthProtocol::Md5 => md5::Md5::digest(data).to_vec(),
        super::AuthProtocol::Sha => sha1::Sha1::digest(data).to_vec(),
    }
}
