//! SNMPv3 User-based Security Model (RFC 3414, RFC 3826).
//!
//! The receiver side of USM only:
//!
//! - USM security parameter decoding
//! - Password-to-key derivation and key localization (MD5, SHA-1)
//! - HMAC-96 verification
//! - DES-CBC and AES-CFB decryption, with the two AES-192/256 key
//!   extension schemes net-snmp and Cisco devices use

mod auth;
mod privacy;
mod usm;

pub use auth::{LocalizedKey, MIN_PASSWORD_LENGTH, MasterKey, verify_message};
pub use privacy::PrivKey;
pub use usm::{UsmSecurityParams, UsmUser};

/// Error returned when parsing a security level or protocol name fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSecurityError {
    input: String,
    kind: SecurityParam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SecurityParam {
    Level,
    Auth,
    Priv,
}

impl ParseSecurityError {
    pub(crate) fn level(input: &str) -> Self {
        Self {
            input: input.to_string(),
            kind: SecurityParam::Level,
        }
    }
}

impl std::fmt::Display for ParseSecurityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let what = match self.kind {
            SecurityParam::Level => "security level",
            SecurityParam::Auth => "authentication protocol",
            SecurityParam::Priv => "privacy protocol",
        };
        write!(f, "unknown {} '{}'", what, self.input)
    }
}

impl std::error::Error for ParseSecurityError {}

/// Privacy key extension scheme for AES keys longer than the auth digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExtension {
    /// Use the localized key as is.
    None,
    /// draft-blumenthal-aes-usm-04: append H(key) until long enough.
    Blumenthal,
    /// draft-reeder-snmpv3-usm-3desede: localize the localized key again
    /// as if it were a password and append the result.
    Reeder,
}

/// Authentication protocol identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuthProtocol {
    /// HMAC-MD5-96 (RFC 3414)
    Md5,
    /// HMAC-SHA-96 (RFC 3414)
    Sha,
}

impl std::fmt::Display for AuthProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Md5 => write!(f, "MD5"),
            Self::Sha => write!(f, "SHA"),
        }
    }
}

/// Case-insensitive `md5` or `sha`.
impl std::str::FromStr for AuthProtocol {
    type Err = ParseSecurityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha" => Ok(Self::Sha),
            _ => Err(ParseSecurityError {
                input: s.to_string(),
                kind: SecurityParam::Auth,
            }),
        }
    }
}

impl AuthProtocol {
    /// Digest output length, which is also the localized key length.
    pub fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha => 20,
        }
    }

    /// Truncated MAC length carried in msgAuthenticationParameters.
    pub fn mac_len(self) -> usize {
        12
    }
}

/// Privacy protocol identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrivProtocol {
    /// DES-CBC (RFC 3414)
    Des,
    /// AES-128-CFB (RFC 3826)
    Aes,
    /// AES-192-CFB, Blumenthal key extension
    Aes192,
    /// AES-192-CFB, Reeder key extension (Cisco)
    Aes192C,
    /// AES-256-CFB, Blumenthal key extension
    Aes256,
    /// AES-256-CFB, Reeder key extension (Cisco)
    Aes256C,
}

impl std::fmt::Display for PrivProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Des => write!(f, "DES"),
            Self::Aes => write!(f, "AES"),
            Self::Aes192 => write!(f, "AES192"),
            Self::Aes192C => write!(f, "AES192C"),
            Self::Aes256 => write!(f, "AES256"),
            Self::Aes256C => write!(f, "AES256C"),
        }
    }
}

/// Case-insensitive `des`, `aes`, `aes192`, `aes192c`, `aes256` or `aes256c`.
impl std::str::FromStr for PrivProtocol {
    type Err = ParseSecurityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "des" => Ok(Self::Des),
            "aes" => Ok(Self::Aes),
            "aes192" => Ok(Self::Aes192),
            "aes192c" => Ok(Self::Aes192C),
            "aes256" => Ok(Self::Aes256),
            "aes256c" => Ok(Self::Aes256C),
            _ => Err(ParseSecurityError {
                input: s.to_string(),
                kind: SecurityParam::Priv,
            }),
        }
    }
}

impl PrivProtocol {
    /// Key length in bytes. DES uses 8 key bytes plus an 8 byte pre-IV.
    pub fn key_len(self) -> usize {
        match self {
            Self::Des | Self::Aes => 16,
            Self::Aes192 | Self::Aes192C => 24,
            Self::Aes256 | Self::Aes256C => 32,
        }
    }

    /// Key extension scheme used to reach [`key_len`](Self::key_len).
    pub fn key_extension(self) -> KeyExtension {
        match self {
            Self::Des | Self::Aes => KeyExtension::None,
            Self::Aes192 | Self::Aes256 => KeyExtension::Blumenthal,
            Self::Aes192C | Self::Aes256C => KeyExtension::Reeder,
        }
    }
}
