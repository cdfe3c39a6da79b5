//! Trap normalization.
//!
//! Turns a [`TrapEvent`] of any version into one `snmp_trap` [`Metric`]:
//!
//! - SNMPv1 traps are first mapped to their SNMPv2 trap OID following
//!   RFC 2576 Section 3.1 ([`v1_trap_oid`]).
//! - Every variable is resolved to a MIB name. The value of `snmpTrapOID.0`
//!   names the metric's single field; other variables become tags.
//! - Any resolution failure drops the whole trap.

use crate::error::{Error, Result};
use crate::resolve::{MibEntry, Resolve};
use crate::sink::{FieldValue, Metric, MetricSink};
use crate::trap::TrapEvent;
use crate::value::Value;

/// Name of every emitted metric.
pub const METRIC_NAME: &str = "snmp_trap";

/// `sysUpTime.0`, skipped during the variable walk.
pub const SYS_UPTIME_OID: &str = ".1.3.6.1.2.1.1.3.0";

/// `snmpTrapOID.0`, whose value names the trap.
pub const SNMP_TRAP_OID: &str = ".1.3.6.1.6.3.1.1.4.1.0";

/// `snmpTraps`, parent of the generic trap OIDs.
pub const SNMP_TRAPS_PREFIX: &str = ".1.3.6.1.6.3.1.1.5";

/// SNMPv2 trap OID for an SNMPv1 trap (RFC 2576 Section 3.1).
///
/// Generic traps 0 to 5 map to `snmpTraps.(generic + 1)`; enterprise-specific
/// traps (6) map to `enterprise.0.specific`. Anything else has no mapping.
///
/// ```
/// use async_snmp_trap::normalize::v1_trap_oid;
///
/// assert_eq!(v1_trap_oid(".1.3.6.1.4.1.8072", 2, 0).as_deref(), Some(".1.3.6.1.6.3.1.1.5.3"));
/// assert_eq!(v1_trap_oid(".1.2.3", 6, 7).as_deref(), Some(".1.2.3.0.7"));
/// assert_eq!(v1_trap_oid(".1.2.3", -1, 0), None);
/// ```
pub fn v1_trap_oid(enterprise: &str, generic_trap: i32, specific_trap: i32) -> Option<String> {
    match generic_trap {
        0..6 => Some(format!("{}.{}", SNMP_TRAPS_PREFIX, generic_trap + 1)),
        6 => Some(format!("{}.0.{}", enterprise, specific_trap)),
        _ => None,
    }
}

fn set_trap_oid(metric: &mut Metric, oid: &str, entry: &MibEntry) {
    metric.tags.insert("oid".into(), oid.to_string());
    metric.tags.insert("name".into(), entry.oid_text.clone());
    metric.tags.insert("mib".into(), entry.mib_name.clone());
}

/// Normalizes trap events and emits them to a sink.
#[derive(Debug)]
pub struct TrapNormalizer<R, S> {
    resolver: R,
    sink: S,
}

impl<R: Resolve, S: MetricSink> TrapNormalizer<R, S> {
    /// Create a normalizer.
    pub fn new(resolver: R, sink: S) -> Self {
        Self { resolver, sink }
    }

    /// The resolver.
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// The sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Normalize and emit one event. Emits at most one metric.
    ///
    /// Failures are logged at error level and the event is dropped.
    pub async fn handle(&self, event: &TrapEvent) {
        match self.process(event).await {
            Ok(metric) => self.sink.emit(metric),
            Err(e) => match &*e {
                Error::MalformedTrap { .. } => {
                    tracing::error!(target: "async_snmp_trap::normalize", { snmp.source = %event.source, packet = ?event }, "no trap OID in packet, dropping")
                }
                _ => {
                    tracing::error!(target: "async_snmp_trap::normalize", { snmp.source = %event.source, error = %e }, "failed to resolve OID, dropping trap")
                }
            },
        }
    }

    /// Build the metric for `event` without emitting it.
    pub async fn process(&self, event: &TrapEvent) -> Result<Metric> {
        let mut metric = Metric::new(METRIC_NAME, event.received_at);
        metric
            .tags
            .insert("version".into(), event.version.to_string());
        metric
            .tags
            .insert("source".into(), event.source.to_string());

        if let Some(v1) = &event.v1 {
            if let Some(trap_oid) = v1_trap_oid(&v1.enterprise, v1.generic_trap, v1.specific_trap)
            {
                let entry = self.resolver.resolve(&trap_oid).await?;
                set_trap_oid(&mut metric, &trap_oid, &entry);
            }
            if !v1.agent_address.is_empty() {
                metric
                    .tags
                    .insert("agent_address".into(), v1.agent_address.clone());
            }
            metric.fields.insert(
                "sysUpTimeInstance".into(),
                FieldValue::Unsigned(u64::from(v1.uptime)),
            );
        }

        let mut metric_name: Option<String> = None;
        for var in &event.variables {
            if var.oid == SYS_UPTIME_OID {
                continue;
            }

            match &var.value {
                Value::ObjectIdentifier(value) => {
                    let value = value.to_string();
                    let entry = self.resolver.resolve(&value).await?;
                    if var.oid == SNMP_TRAP_OID && metric_name.is_none() {
                        metric_name = Some(entry.oid_text);
                        metric.tags.insert("oid".into(), value);
                        metric.tags.insert("mib".into(), entry.mib_name);
                    } else {
                        set_trap_oid(&mut metric, &value, &entry);
                    }
                }
                Value::OctetString(bytes) => {
                    let entry = self.resolver.resolve(&var.oid).await?;
                    metric
                        .tags
                        .insert(entry.oid_text, String::from_utf8_lossy(bytes).into_owned());
                }
                other => {
                    let entry = self.resolver.resolve(&var.oid).await?;
                    metric.tags.insert(entry.oid_text, other.to_string());
                }
            }
        }

        let Some(name) = metric_name else {
            return Err(Error::MalformedTrap { peer: event.source }.boxed());
        };
        metric.fields.insert(name, FieldValue::Integer(1));
        Ok(metric)
    }
}
