//! Listener configuration.
//!
//! [`ListenerConfig`] is the user-facing, string-typed configuration. It is
//! validated by [`ServiceAddress::parse`] and [`SecurityParams::from_config`]
//! when the listener starts; every unrecognized value is a
//! [`Error::Config`](crate::Error::Config).

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::message::SecurityLevel;
use crate::resolve::{OidCache, SnmpTranslate};
use crate::v3::{AuthProtocol, PrivProtocol, UsmUser};
use crate::version::Version;

/// Default listen address: UDP port 162 on all interfaces.
pub const DEFAULT_SERVICE_ADDRESS: &str = "udp://:162";

/// Default `snmptranslate` timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default version selector.
pub const DEFAULT_VERSION: &str = "2c";

/// Default bound on traps being normalized at once.
pub const DEFAULT_MAX_CONCURRENT_HANDLERS: usize = 1000;

fn config_error(msg: impl Into<String>) -> Box<Error> {
    Error::Config(msg.into().into_boxed_str()).boxed()
}

/// Trap listener configuration.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use async_snmp_trap::config::ListenerConfig;
///
/// let config = ListenerConfig::default()
///     .service_address("udp://127.0.0.1:1162")
///     .timeout(Duration::from_secs(2))
///     .version("3")
///     .sec_name("trapuser")
///     .sec_level("authPriv")
///     .auth("SHA", "authpassword")
///     .privacy("AES", "privpassword");
///
/// assert_eq!(config.service_address, "udp://127.0.0.1:1162");
/// ```
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ListenerConfig {
    /// `udp://[host]:port`; an empty host listens on all interfaces
    pub service_address: String,
    /// Timeout for each `snmptranslate` run
    pub timeout: Duration,
    /// `"1"`, `"2c"` or `"3"`; anything else means `"2c"`
    pub version: String,
    /// SNMPv3 security name
    pub sec_name: String,
    /// `noAuthNoPriv`, `authNoPriv` or `authPriv`, case-insensitive
    pub sec_level: String,
    /// `MD5`, `SHA` or empty
    pub auth_protocol: String,
    /// Authentication passphrase
    pub auth_password: String,
    /// `DES`, `AES`, `AES192`, `AES192C`, `AES256`, `AES256C` or empty
    pub priv_protocol: String,
    /// Privacy passphrase
    pub priv_password: String,
    /// Bound on cached OID names; unbounded when `None`
    pub cache_capacity: Option<usize>,
    /// Bound on traps normalized at once; unbounded when `None`
    pub max_concurrent_handlers: Option<usize>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            service_address: DEFAULT_SERVICE_ADDRESS.to_string(),
            timeout: DEFAULT_TIMEOUT,
            version: DEFAULT_VERSION.to_string(),
            sec_name: String::new(),
            sec_level: String::new(),
            auth_protocol: String::new(),
            auth_password: String::new(),
            priv_protocol: String::new(),
            priv_password: String::new(),
            cache_capacity: None,
            max_concurrent_handlers: Some(DEFAULT_MAX_CONCURRENT_HANDLERS),
        }
    }
}

impl fmt::Debug for ListenerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerConfig")
            .field("service_address", &self.service_address)
            .field("timeout", &self.timeout)
            .field("version", &self.version)
            .field("sec_name", &self.sec_name)
            .field("sec_level", &self.sec_level)
            .field("auth_protocol", &self.auth_protocol)
            .field("auth_password", &"[REDACTED]")
            .field("priv_protocol", &self.priv_protocol)
            .field("priv_password", &"[REDACTED]")
            .field("cache_capacity", &self.cache_capacity)
            .field("max_concurrent_handlers", &self.max_concurrent_handlers)
            .finish()
    }
}

impl ListenerConfig {
    /// Set the listen address.
    pub fn service_address(mut self, addr: impl Into<String>) -> Self {
        self.service_address = addr.into();
        self
    }

    /// Set the `snmptranslate` timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the version selector.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the SNMPv3 security name.
    pub fn sec_name(mut self, name: impl Into<String>) -> Self {
        self.sec_name = name.into();
        self
    }

    /// Set the SNMPv3 security level.
    pub fn sec_level(mut self, level: impl Into<String>) -> Self {
        self.sec_level = level.into();
        self
    }

    /// Set the authentication protocol and passphrase.
    pub fn auth(mut self, protocol: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth_protocol = protocol.into();
        self.auth_password = password.into();
        self
    }

    /// Set the privacy protocol and passphrase.
    pub fn privacy(mut self, protocol: impl Into<String>, password: impl Into<String>) -> Self {
        self.priv_protocol = protocol.into();
        self.priv_password = password.into();
        self
    }

    /// Bound the OID cache.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    /// Limit how many traps are normalized at once (default: 1000).
    ///
    /// When the limit is reached the socket stops being drained and the
    /// kernel receive buffer absorbs the burst. `None` removes the limit;
    /// zero counts as one.
    pub fn max_concurrent_handlers(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_handlers = limit;
        self
    }

    /// Build the `snmptranslate`-backed resolver this configuration describes.
    pub fn resolver(&self) -> OidCache<SnmpTranslate> {
        let translate = SnmpTranslate::new(self.timeout);
        match self.cache_capacity {
            Some(capacity) => OidCache::with_capacity(translate, capacity),
            None => OidCache::new(translate),
        }
    }
}

/// A parsed `udp://host:port` listen address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAddress {
    raw: String,
    host: String,
    port: u16,
}

impl ServiceAddress {
    /// Parse and validate a service address.
    ///
    /// ```rust
    /// use async_snmp_trap::config::ServiceAddress;
    ///
    /// let addr = ServiceAddress::parse("udp://:162").unwrap();
    /// assert_eq!(addr.port(), 162);
    /// assert_eq!(addr.host(), "");
    ///
    /// assert!(ServiceAddress::parse("tcp://:162").is_err());
    /// assert!(ServiceAddress::parse(":162").is_err());
    /// ```
    pub fn parse(addr: &str) -> Result<Self> {
        let Some((protocol, rest)) = addr.split_once("://") else {
            return Err(config_error(format!("invalid service address: {}", addr)));
        };
        if protocol != "udp" {
            return Err(config_error(format!(
                "unknown protocol '{}' in '{}'",
                protocol, addr
            )));
        }

        let Some((host, port)) = rest.rsplit_once(':') else {
            return Err(config_error(format!("missing port in address '{}'", addr)));
        };
        let port: u16 = port
            .parse()
            .map_err(|_| config_error(format!("invalid port '{}' in '{}'", port, addr)))?;

        let host = match host.strip_prefix('[') {
            Some(inner) => inner
                .strip_suffix(']')
                .ok_or_else(|| config_error(format!("invalid host in '{}'", addr)))?,
            None if host.contains(':') => {
                return Err(config_error(format!(
                    "IPv6 host must be bracketed in '{}'",
                    addr
                )));
            }
            None => host,
        };

        Ok(Self {
            raw: addr.to_string(),
            host: host.to_string(),
            port,
        })
    }

    /// Host part, brackets removed; empty means all interfaces.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve to a bindable socket address.
    ///
    /// IP literals are used as is and an empty host binds `0.0.0.0`. Names
    /// are looked up and the first result wins.
    pub async fn socket_addr(&self) -> std::io::Result<SocketAddr> {
        if self.host.is_empty() {
            return Ok(SocketAddr::new(
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                self.port,
            ));
        }
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no addresses for '{}'", self.host),
                )
            })
    }
}

impl fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Validated version and security settings.
#[derive(Debug, Clone)]
pub struct SecurityParams {
    /// Selected version
    pub version: Version,
    /// The one accepted SNMPv3 user; `Some` only for version 3
    pub usm_user: Option<Arc<UsmUser>>,
}

impl SecurityParams {
    /// Validate the version/security matrix of `config`.
    ///
    /// Security strings are only examined for version 3. Unknown strings and
    /// levels lacking the protocols or passphrases they need are rejected.
    pub fn from_config(config: &ListenerConfig) -> Result<Self> {
        let version = Version::from_selector(&config.version);
        if version != Version::V3 {
            return Ok(Self {
                version,
                usm_user: None,
            });
        }

        let level: SecurityLevel = config
            .sec_level
            .parse()
            .map_err(|e| config_error(format!("{}", e)))?;
        let auth = parse_optional::<AuthProtocol>(&config.auth_protocol)?;
        let privacy = parse_optional::<PrivProtocol>(&config.priv_protocol)?;

        let user = match level {
            SecurityLevel::NoAuthNoPriv => UsmUser::new(config.sec_name.clone(), level, None, None),
            SecurityLevel::AuthNoPriv => {
                let auth = require_auth(auth, config)?;
                UsmUser::new(config.sec_name.clone(), level, Some(auth), None)
            }
            SecurityLevel::AuthPriv => {
                let auth = require_auth(auth, config)?;
                let Some(privacy) = privacy else {
                    return Err(config_error("security level authPriv requires a privacy protocol"));
                };
                if config.priv_password.is_empty() {
                    return Err(config_error("privacy protocol set without a privacy password"));
                }
                UsmUser::new(
                    config.sec_name.clone(),
                    level,
                    Some(auth),
                    Some((privacy, config.priv_password.as_bytes())),
                )
            }
        };

        Ok(Self {
            version,
            usm_user: Some(Arc::new(user)),
        })
    }
}

fn parse_optional<T>(s: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    if s.is_empty() {
        return Ok(None);
    }
    s.parse()
        .map(Some)
        .map_err(|e: T::Err| config_error(e.to_string()))
}

fn require_auth(
    auth: Option<AuthProtocol>,
    config: &ListenerConfig,
) -> Result<(AuthProtocol, &[u8])> {
    let Some(auth) = auth else {
        return Err(config_error(format!(
            "security level {} requires an authentication protocol",
            config.sec_level
        )));
    };
    if config.auth_password.is_empty() {
        return Err(config_error(
            "authentication protocol set without an authentication password",
        ));
    }
    Ok((auth, config.auth_password.as_bytes()))
}
