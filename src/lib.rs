//! # async-snmp-trap
//!
//! Async SNMP trap receiver for Rust.
//!
//! ## Features
//!
//! - SNMPv1, v2c and v3 (USM: MD5/SHA auth, DES/AES privacy) traps
//! - v1/v2c informs, acknowledged with a Response
//! - SNMPv1 traps mapped to SNMPv2 trap OIDs (RFC 2576 Section 3.1)
//! - Numeric OIDs resolved to `MIB::name` with `snmptranslate`, cached
//! - One `snmp_trap` metric per trap, pushed to a [`MetricSink`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use async_snmp_trap::{ListenerConfig, TrapListener};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> async_snmp_trap::Result<()> {
//!     let config = ListenerConfig::default().service_address("udp://:1162");
//!     let (tx, mut rx) = mpsc::unbounded_channel();
//!
//!     let mut listener = TrapListener::with_snmptranslate(config, tx);
//!     listener.start().await?;
//!
//!     // snmp_trap,mib=IF-MIB,oid=.1.3.6.1.6.3.1.1.5.3,source=10.0.0.1,version=2c linkDown=1i ...
//!     while let Some(metric) = rx.recv().await {
//!         println!("{}", metric);
//!     }
//!
//!     listener.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## SNMPv3
//!
//! ```rust,no_run
//! use async_snmp_trap::{ListenerConfig, TrapListener};
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> async_snmp_trap::Result<()> {
//! let config = ListenerConfig::default()
//!     .service_address("udp://:162")
//!     .version("3")
//!     .sec_name("trapuser")
//!     .sec_level("authPriv")
//!     .auth("SHA", "authpassword")
//!     .privacy("AES", "privpassword");
//!
//! let (tx, _rx) = mpsc::unbounded_channel();
//! let mut listener = TrapListener::with_snmptranslate(config, tx);
//! listener.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod ber;
pub mod config;
pub mod error;
pub mod listener;
pub mod message;
pub mod normalize;
pub mod oid;
pub mod pdu;
pub mod resolve;
pub mod sink;
pub mod trap;
pub mod v3;
pub mod value;
pub mod varbind;
pub mod version;

pub(crate) mod util;

#[cfg(feature = "cli")]
pub mod cli;

// Re-exports for convenience
pub use config::{ListenerConfig, SecurityParams, ServiceAddress};
pub use error::{Error, ResolveError, Result};
pub use listener::{ListenerState, TrapListener};
pub use message::SecurityLevel;
pub use normalize::{TrapNormalizer, v1_trap_oid};
pub use oid::Oid;
pub use pdu::{GenericTrap, Pdu, PduType, TrapV1Pdu};
pub use resolve::{MibEntry, OidCache, Resolve, SnmpTranslate, Translate};
pub use sink::{FieldValue, Metric, MetricSink};
pub use trap::{TrapEvent, V1Fields, Variable};
pub use v3::{AuthProtocol, ParseSecurityError, PrivProtocol, UsmUser};
pub use value::Value;
pub use varbind::VarBind;
pub use version::Version;
