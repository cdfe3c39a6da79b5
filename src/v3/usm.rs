//! User-based Security Model (RFC 3414), receiver side.
//!
//! USM security parameters are an OCTET STRING wrapping a BER SEQUENCE:
//!
//! ```text
//! UsmSecurityParameters ::= SEQUENCE {
//!     msgAuthoritativeEngineID     OCTET STRING,
//!     msgAuthoritativeEngineBoots  INTEGER (0..2147483647),
//!     msgAuthoritativeEngineTime   INTEGER (0..2147483647),
//!     msgUserName                  OCTET STRING (SIZE(0..32)),
//!     msgAuthenticationParameters  OCTET STRING,
//!     msgPrivacyParameters         OCTET STRING
//! }
//! ```
//!
//! For notifications the authoritative engine is the sender, so keys are
//! localized once per sending engine ID and cached on the [`UsmUser`].

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use super::auth::{LocalizedKey, MasterKey, verify_message};
use super::privacy::PrivKey;
use super::{AuthProtocol, PrivProtocol};
use crate::ber::{Decoder, tag};
use crate::error::internal::{AuthErrorKind, CryptoErrorKind, DecodeErrorKind};
use crate::error::{Error, Result};
use crate::message::{ScopedPdu, SecurityLevel, V3Message, V3MessageData};

/// USM security parameters.
#[derive(Debug, Clone)]
pub struct UsmSecurityParams {
    /// Authoritative engine ID
    pub engine_id: Bytes,
    /// Engine boot count
    pub engine_boots: u32,
    /// Engine time (seconds since last boot)
    pub engine_time: u32,
    /// Username
    pub username: Bytes,
    /// Authentication parameters (HMAC digest, or empty)
    pub auth_params: Bytes,
    /// Privacy parameters (salt, or empty)
    pub priv_params: Bytes,
}

impl UsmSecurityParams {
    /// Decode from the contents of msgSecurityParameters.
    pub fn decode(data: Bytes, peer: SocketAddr) -> Result<Self> {
        let mut decoder = Decoder::with_peer(data, peer);
        let mut seq = decoder.read_sequence()?;

        let engine_id = seq.read_octet_string()?;
        let engine_boots = read_non_negative(&mut seq, "msgAuthoritativeEngineBoots")?;
        let engine_time = read_non_negative(&mut seq, "msgAuthoritativeEngineTime")?;
        let username = seq.read_octet_string()?;
        let auth_params = seq.read_octet_string()?;
        let priv_params = seq.read_octet_string()?;

        Ok(Self {
            engine_id,
            engine_boots,
            engine_time,
            username,
            auth_params,
            priv_params,
        })
    }

    /// Locate msgAuthenticationParameters in a whole encoded message.
    ///
    /// Returns `(offset, length)` of the parameter contents, relative to the
    /// start of `message`.
    pub fn find_auth_params_offset(message: &[u8]) -> Option<(usize, usize)> {
        let mut dec = Decoder::from_slice(message);

        dec.expect_tag(tag::universal::SEQUENCE).ok()?;
        dec.skip_tlv().ok()?; // msgVersion
        dec.skip_tlv().ok()?; // msgGlobalData
        dec.expect_tag(tag::universal::OCTET_STRING).ok()?;
        dec.expect_tag(tag::universal::SEQUENCE).ok()?;
        for _ in 0..4 {
            // engine ID, boots, time, user name
            dec.skip_tlv().ok()?;
        }
        let len = dec.expect_tag(tag::universal::OCTET_STRING).ok()?;
        let offset = dec.offset();

        (offset + len <= message.len()).then_some((offset, len))
    }
}

fn read_non_negative(seq: &mut Decoder, field: &'static str) -> Result<u32> {
    let value = seq.read_integer()?;
    u32::try_from(value).map_err(|_| seq.malformed(DecodeErrorKind::NegativeValue { field, value }))
}

/// Keys localized for one sending engine.
#[derive(Debug)]
struct EngineKeys {
    auth: LocalizedKey,
    privacy: Option<PrivKey>,
}

#[derive(Debug)]
struct Credentials {
    auth: Option<(AuthProtocol, MasterKey)>,
    privacy: Option<(PrivProtocol, MasterKey)>,
}

/// The SNMPv3 user the listener accepts notifications from.
///
/// Messages are accepted only when the user name equals the configured
/// security name and the message's security level equals the configured
/// level. Authenticated messages must carry a valid HMAC; encrypted ones
/// must decrypt with the user's privacy key.
#[derive(Debug)]
pub struct UsmUser {
    name: Bytes,
    level: SecurityLevel,
    credentials: Credentials,
    keys: Mutex<HashMap<Bytes, Arc<EngineKeys>>>,
}

impl UsmUser {
    /// Create a user. Passwords are expanded into master keys here, once.
    pub fn new(
        name: impl Into<Bytes>,
        level: SecurityLevel,
        auth: Option<(AuthProtocol, &[u8])>,
        privacy: Option<(PrivProtocol, &[u8])>,
    ) -> Self {
        let auth_master = auth.map(|(proto, pw)| (proto, MasterKey::from_password(proto, pw)));
        // Privacy keys are derived with the auth hash
        let privacy_master = match (auth, privacy) {
            (Some((auth_proto, _)), Some((priv_proto, pw))) => {
                Some((priv_proto, MasterKey::from_password(auth_proto, pw)))
            }
            _ => None,
        };

        Self {
            name: name.into(),
            level,
            credentials: Credentials {
                auth: auth_master,
                privacy: privacy_master,
            },
            keys: Mutex::new(HashMap::new()),
        }
    }

    /// The configured security name.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// The configured security level.
    pub fn level(&self) -> SecurityLevel {
        self.level
    }

    /// Number of engines with cached localized keys.
    pub fn cached_engines(&self) -> usize {
        self.keys.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Cached keys for `engine_id`, or freshly derived ones (second field
    /// `true`) that are not cached yet.
    fn engine_keys(&self, engine_id: &Bytes) -> Option<(Arc<EngineKeys>, bool)> {
        let (_, auth_master) = self.credentials.auth.as_ref()?;

        if let Some(keys) = self
            .keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(engine_id)
        {
            return Some((keys.clone(), false));
        }

        let keys = Arc::new(EngineKeys {
            auth: auth_master.localize(engine_id),
            privacy: self
                .credentials
                .privacy
                .as_ref()
                .map(|(proto, master)| PrivKey::from_master_key(master, *proto, engine_id)),
        });
        Some((keys, true))
    }

    /// Cache keys for an engine whose message authenticated.
    ///
    /// A concurrent first trap from the same engine derives twice and the
    /// second insert wins.
    fn remember(&self, engine_id: &Bytes, keys: Arc<EngineKeys>) {
        tracing::debug!(
            target: "async_snmp_trap::usm",
            engine_id_len = engine_id.len(),
            "localized keys for new engine"
        );
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(engine_id.clone(), keys);
    }

    /// Check a decoded v3 message against this user and return its scoped PDU.
    ///
    /// `raw` is the whole datagram the message was decoded from; the HMAC
    /// covers all of it.
    pub fn process(&self, message: V3Message, raw: &[u8], peer: SocketAddr) -> Result<ScopedPdu> {
        let params = UsmSecurityParams::decode(message.security_params.clone(), peer)?;

        if params.username != self.name {
            return Err(auth_error(
                peer,
                AuthErrorKind::UnknownUser {
                    username: String::from_utf8_lossy(&params.username).into_owned(),
                },
            ));
        }
        if message.security_level() != self.level {
            return Err(auth_error(peer, AuthErrorKind::LevelMismatch));
        }

        let keys = if self.level.requires_auth() {
            let (keys, derived) = self
                .engine_keys(&params.engine_id)
                .ok_or_else(|| auth_error(peer, AuthErrorKind::V3NotConfigured))?;
            verify(&keys.auth, &params, raw, peer)?;
            // Only engines that proved the key are cached
            if derived {
                self.remember(&params.engine_id, keys.clone());
            }
            Some(keys)
        } else {
            None
        };

        match message.data {
            V3MessageData::Plaintext(scoped) => Ok(scoped),
            V3MessageData::Encrypted(ciphertext) => {
                let Some(privacy) = keys.as_ref().and_then(|k| k.privacy.as_ref()) else {
                    return Err(auth_error(peer, AuthErrorKind::V3NotConfigured));
                };
                let plaintext = privacy
                    .decrypt(
                        &ciphertext,
                        params.engine_boots,
                        params.engine_time,
                        &params.priv_params,
                    )
                    .map_err(|kind| crypto_error(peer, kind))?;
                ScopedPdu::decode(&mut Decoder::with_peer(plaintext, peer))
                    .map_err(|_| crypto_error(peer, CryptoErrorKind::CipherError))
            }
        }
    }
}

fn verify(
    key: &LocalizedKey,
    params: &UsmSecurityParams,
    raw: &[u8],
    peer: SocketAddr,
) -> Result<()> {
    let mac_len = key.protocol().mac_len();
    if params.auth_params.len() != mac_len {
        return Err(auth_error(
            peer,
            AuthErrorKind::WrongMacLength {
                expected: mac_len,
                actual: params.auth_params.len(),
            },
        ));
    }

    let (offset, len) = UsmSecurityParams::find_auth_params_offset(raw)
        .ok_or_else(|| auth_error(peer, AuthErrorKind::AuthParamsNotFound))?;
    if len != mac_len {
        return Err(auth_error(peer, AuthErrorKind::AuthParamsNotFound));
    }

    if !verify_message(key, raw, offset, len) {
        return Err(auth_error(peer, AuthErrorKind::HmacMismatch));
    }
    Ok(())
}

fn auth_error(peer: SocketAddr, kind: AuthErrorKind) -> Box<Error> {
    tracing::debug!(target: "async_snmp_trap::usm", { snmp.source = %peer, kind = %kind }, "authentication failed");
    Error::Auth { peer }.boxed()
}

fn crypto_error(peer: SocketAddr, kind: CryptoErrorKind) -> Box<Error> {
    tracing::debug!(target: "async_snmp_trap::usm", { snmp.source = %peer, kind = %kind }, "decryption failed");
    Error::Auth { peer }.boxed()
}
