//! Command-line arguments for `asnmp-trapd`.

use clap::{Parser, ValueEnum};
use std::time::Duration;

use crate::config::{DEFAULT_MAX_CONCURRENT_HANDLERS, DEFAULT_SERVICE_ADDRESS, ListenerConfig};

/// SNMP version for CLI argument parsing.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum SnmpVersion {
    /// SNMPv1
    #[value(name = "1")]
    V1,
    /// SNMPv2c (default)
    #[default]
    #[value(name = "2c")]
    V2c,
    /// SNMPv3
    #[value(name = "3")]
    V3,
}

impl SnmpVersion {
    fn selector(self) -> &'static str {
        match self {
            Self::V1 => "1",
            Self::V2c => "2c",
            Self::V3 => "3",
        }
    }
}

/// Listener arguments.
#[derive(Debug, Parser)]
pub struct ListenArgs {
    /// Listen address, `udp://[host]:port`.
    #[arg(short = 's', long = "service-address", default_value = DEFAULT_SERVICE_ADDRESS)]
    pub service_address: String,

    /// snmptranslate timeout in seconds.
    #[arg(short = 't', long = "timeout", default_value = "5")]
    pub timeout: f64,

    /// SNMP version: 1, 2c, or 3. v1 and v2c traps are accepted either way.
    #[arg(short = 'v', long = "snmp-version", default_value = "2c")]
    pub snmp_version: SnmpVersion,

    /// Maximum number of cached OID names (default: unbounded).
    #[arg(long = "cache-capacity")]
    pub cache_capacity: Option<usize>,

    /// Maximum number of traps normalized at once.
    #[arg(long = "max-concurrent-handlers", default_value_t = DEFAULT_MAX_CONCURRENT_HANDLERS)]
    pub max_concurrent_handlers: usize,
}

/// SNMPv3 security arguments.
#[derive(Debug, Parser)]
pub struct V3Args {
    /// Security name/username.
    #[arg(short = 'u', long = "username", default_value = "")]
    pub username: String,

    /// Security level: noAuthNoPriv, authNoPriv, or authPriv.
    #[arg(short = 'l', long = "level", default_value = "")]
    pub level: String,

    /// Authentication protocol: MD5 or SHA.
    #[arg(short = 'a', long = "auth-protocol", default_value = "")]
    pub auth_protocol: String,

    /// Authentication passphrase.
    #[arg(short = 'A', long = "auth-password", default_value = "")]
    pub auth_password: String,

    /// Privacy protocol: DES, AES, AES192, AES192C, AES256, or AES256C.
    #[arg(short = 'x', long = "priv-protocol", default_value = "")]
    pub priv_protocol: String,

    /// Privacy passphrase.
    #[arg(short = 'X', long = "priv-password", default_value = "")]
    pub priv_password: String,
}

/// Logging arguments.
#[derive(Debug, Parser)]
pub struct LogArgs {
    /// Enable debug logging (async_snmp_trap=debug).
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Enable trace logging (async_snmp_trap=trace).
    #[arg(short = 'D', long = "trace")]
    pub trace: bool,
}

impl LogArgs {
    /// Initialize tracing to stderr.
    ///
    /// `RUST_LOG` wins over the flags when set.
    pub fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;

        let default = if self.trace {
            "async_snmp_trap=trace"
        } else if self.debug {
            "async_snmp_trap=debug"
        } else {
            "async_snmp_trap=info"
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Build the listener configuration from parsed arguments.
pub fn listener_config(listen: &ListenArgs, v3: &V3Args) -> Result<ListenerConfig, String> {
    if !listen.timeout.is_finite() || listen.timeout <= 0.0 {
        return Err(format!("invalid timeout: {}", listen.timeout));
    }
    let timeout = Duration::try_from_secs_f64(listen.timeout)
        .map_err(|e| format!("invalid timeout {}: {}", listen.timeout, e))?;

    let mut config = ListenerConfig::default()
        .service_address(listen.service_address.clone())
        .timeout(timeout)
        .version(listen.snmp_version.selector())
        .sec_name(v3.username.clone())
        .sec_level(v3.level.clone())
        .auth(v3.auth_protocol.clone(), v3.auth_password.clone())
        .privacy(v3.priv_protocol.clone(), v3.priv_password.clone())
        .max_concurrent_handlers(Some(listen.max_concurrent_handlers));
    if let Some(capacity) = listen.cache_capacity {
        config = config.cache_capacity(capacity);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Parser)]
    struct TestArgs {
        #[command(flatten)]
        listen: ListenArgs,
        #[command(flatten)]
        v3: V3Args,
    }

    #[test]
    fn test_defaults_match_config_defaults() {
        let args = TestArgs::try_parse_from(["asnmp-trapd"]).unwrap();
        let config = listener_config(&args.listen, &args.v3).unwrap();
        let default = ListenerConfig::default();
        assert_eq!(config.service_address, default.service_address);
        assert_eq!(config.timeout, default.timeout);
        assert_eq!(config.version, default.version);
        assert_eq!(config.cache_capacity, None);
        assert_eq!(config.max_concurrent_handlers, default.max_concurrent_handlers);
    }

    #[test]
    fn test_v3_arguments() {
        let args = TestArgs::try_parse_from([
            "asnmp-trapd",
            "-s",
            "udp://127.0.0.1:1162",
            "-v",
            "3",
            "-u",
            "trapuser",
            "-l",
            "authNoPriv",
            "-a",
            "SHA",
            "-A",
            "authpassword",
            "--cache-capacity",
            "100",
        ])
        .unwrap();
        let config = listener_config(&args.listen, &args.v3).unwrap();
        assert_eq!(config.version, "3");
        assert_eq!(config.sec_name, "trapuser");
        assert_eq!(config.auth_protocol, "SHA");
        assert_eq!(config.cache_capacity, Some(100));
    }

    #[test]
    fn test_rejects_bad_timeout() {
        let args = TestArgs::try_parse_from(["asnmp-trapd", "-t", "0"]).unwrap();
        assert!(listener_config(&args.listen, &args.v3).is_err());
    }

    #[test]
    fn test_rejects_timeout_too_large_for_duration() {
        let args = TestArgs::try_parse_from(["asnmp-trapd", "-t", "1e30"]).unwrap();
        let err = listener_config(&args.listen, &args.v3).unwrap_err();
        assert!(err.starts_with("invalid timeout"), "{}", err);

        let args = TestArgs::try_parse_from(["asnmp-trapd", "-t", "0.25"]).unwrap();
        let config = listener_config(&args.listen, &args.v3).unwrap();
        assert_eq!(config.timeout, Duration::from_millis(250));
    }
}
