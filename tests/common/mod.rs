//! Shared test infrastructure for async-snmp-trap.
//!
//! Provides hand-built BER trap packets, translator doubles, a recording
//! metric sink and a tracing layer that counts error events.

// Not every test file uses every helper
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_snmp_trap::resolve::{MibEntry, Translate};
use async_snmp_trap::v3::{LocalizedKey, PrivKey, UsmSecurityParams};
use async_snmp_trap::{Metric, MetricSink, ResolveError};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

pub const SYS_UPTIME: &str = ".1.3.6.1.2.1.1.3.0";
pub const SNMP_TRAP_OID: &str = ".1.3.6.1.6.3.1.1.4.1.0";
pub const LINK_DOWN: &str = ".1.3.6.1.6.3.1.1.5.3";
pub const LINK_UP: &str = ".1.3.6.1.6.3.1.1.5.4";
pub const COLD_START: &str = ".1.3.6.1.6.3.1.1.5.1";
pub const IF_INDEX_2: &str = ".1.3.6.1.2.1.2.2.1.1.2";
pub const IF_DESCR_2: &str = ".1.3.6.1.2.1.2.2.1.2.2";
pub const UNKNOWN_OID: &str = ".1.3.6.1.4.1.99999.1";

// ============================================================================
// BER builders
// ============================================================================

pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else if len <= 0xFF {
        out.extend_from_slice(&[0x81, len as u8]);
    } else {
        out.extend_from_slice(&[0x82, (len >> 8) as u8, len as u8]);
    }
    out.extend_from_slice(content);
    out
}

pub fn integer(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let (b, next) = (bytes[start], bytes[start + 1]);
        if (b == 0x00 && next & 0x80 == 0) || (b == 0xFF && next & 0x80 != 0) {
            start += 1;
        } else {
            break;
        }
    }
    tlv(0x02, &bytes[start..])
}

/// Counter32 (0x41), Gauge32 (0x42) or TimeTicks (0x43).
pub fn unsigned(tag: u8, value: u32) -> Vec<u8> {
    let mut out = integer(i64::from(value));
    out[0] = tag;
    out
}

pub fn timeticks(value: u32) -> Vec<u8> {
    unsigned(0x43, value)
}

pub fn octets(bytes: &[u8]) -> Vec<u8> {
    tlv(0x04, bytes)
}

pub fn ip_address(addr: [u8; 4]) -> Vec<u8> {
    tlv(0x40, &addr)
}

pub fn oid(dotted: &str) -> Vec<u8> {
    let arcs: Vec<u32> = dotted
        .trim_start_matches('.')
        .split('.')
        .map(|arc| arc.parse().unwrap())
        .collect();
    let mut content = vec![(arcs[0] * 40 + arcs[1]) as u8];
    for &arc in &arcs[2..] {
        let mut encoded = vec![(arc & 0x7F) as u8];
        let mut rest = arc >> 7;
        while rest > 0 {
            encoded.push((rest & 0x7F) as u8 | 0x80);
            rest >>= 7;
        }
        encoded.reverse();
        content.extend_from_slice(&encoded);
    }
    tlv(0x06, &content)
}

pub fn seq(parts: &[Vec<u8>]) -> Vec<u8> {
    tlv(0x30, &parts.concat())
}

pub fn varbind(name: &str, value: Vec<u8>) -> Vec<u8> {
    seq(&[oid(name), value])
}

/// sysUpTime.0 and snmpTrapOID.0 followed by `extra`.
pub fn notification_varbinds(trap_oid: &str, extra: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let mut varbinds = vec![
        varbind(SYS_UPTIME, timeticks(12345)),
        varbind(SNMP_TRAP_OID, oid(trap_oid)),
    ];
    varbinds.extend_from_slice(extra);
    varbinds
}

/// SNMPv2-Trap (0xA7) or InformRequest (0xA6).
pub fn v2_pdu(tag: u8, request_id: i32, varbinds: &[Vec<u8>]) -> Vec<u8> {
    tlv(
        tag,
        &[
            integer(i64::from(request_id)),
            integer(0),
            integer(0),
            seq(varbinds),
        ]
        .concat(),
    )
}

pub fn v2c_trap(community: &[u8], varbinds: &[Vec<u8>]) -> Vec<u8> {
    seq(&[integer(1), octets(community), v2_pdu(0xA7, 1, varbinds)])
}

pub fn v1_trap(
    enterprise: &str,
    agent_addr: [u8; 4],
    generic_trap: i32,
    specific_trap: i32,
    time_stamp: u32,
    varbinds: &[Vec<u8>],
) -> Vec<u8> {
    let pdu = tlv(
        0xA4,
        &[
            oid(enterprise),
            ip_address(agent_addr),
            integer(i64::from(generic_trap)),
            integer(i64::from(specific_trap)),
            timeticks(time_stamp),
            seq(varbinds),
        ]
        .concat(),
    );
    seq(&[integer(0), octets(b"public"), pdu])
}

pub fn scoped_pdu(context_engine_id: &[u8], pdu: Vec<u8>) -> Vec<u8> {
    seq(&[octets(context_engine_id), octets(b""), pdu])
}

/// Sender side of an SNMPv3 message for tests.
pub struct V3Sender<'a> {
    pub user: &'a str,
    pub engine_id: &'a [u8],
    pub engine_boots: u32,
    pub engine_time: u32,
    pub auth: Option<&'a LocalizedKey>,
    /// AES-128 key and salt
    pub privacy: Option<(&'a PrivKey, [u8; 8])>,
}

impl V3Sender<'_> {
    pub fn message(&self, scoped: Vec<u8>) -> Vec<u8> {
        let mut flags = 0u8;
        if self.auth.is_some() {
            flags |= 0x01;
        }

        let (msg_data, salt) = match self.privacy {
            Some((key, salt)) => {
                flags |= 0x02;
                let ciphertext = self.encrypt_aes128(key, &salt, &scoped);
                (octets(&ciphertext), salt.to_vec())
            }
            None => (scoped, Vec::new()),
        };
        let auth_placeholder = if self.auth.is_some() {
            vec![0u8; 12]
        } else {
            Vec::new()
        };

        let usm = seq(&[
            octets(self.engine_id),
            integer(i64::from(self.engine_boots)),
            integer(i64::from(self.engine_time)),
            octets(self.user.as_bytes()),
            octets(&auth_placeholder),
            octets(&salt),
        ]);
        let header = seq(&[integer(42), integer(65507), octets(&[flags]), integer(3)]);
        let mut message = seq(&[integer(3), header, octets(&usm), msg_data]);

        if let Some(key) = self.auth {
            let (offset, len) = UsmSecurityParams::find_auth_params_offset(&message).unwrap();
            let mac = key.compute_hmac(&message).unwrap();
            message[offset..offset + len].copy_from_slice(&mac);
        }
        message
    }

    fn encrypt_aes128(&self, key: &PrivKey, salt: &[u8; 8], plaintext: &[u8]) -> Vec<u8> {
        use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};

        let mut iv = [0u8; 16];
        iv[..4].copy_from_slice(&self.engine_boots.to_be_bytes());
        iv[4..8].copy_from_slice(&self.engine_time.to_be_bytes());
        iv[8..].copy_from_slice(salt);

        let mut buf = plaintext.to_vec();
        cfb_mode::Encryptor::<aes::Aes128>::new_from_slices(&key.as_bytes()[..16], &iv)
            .unwrap()
            .encrypt(&mut buf);
        buf
    }
}

pub fn hex(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

// ============================================================================
// Translator doubles
// ============================================================================

/// Canned translations with a call counter and an optional delay.
#[derive(Clone, Default)]
pub struct CountingTranslate {
    entries: Arc<HashMap<String, MibEntry>>,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    delay: Duration,
}

impl CountingTranslate {
    /// Knows linkDown, linkUp, coldStart and ifIndex/ifDescr.2.
    pub fn standard() -> Self {
        Self::with_entries(&[
            (LINK_DOWN, "IF-MIB", "linkDown"),
            (LINK_UP, "IF-MIB", "linkUp"),
            (COLD_START, "SNMPv2-MIB", "coldStart"),
            (IF_INDEX_2, "IF-MIB", "ifIndex.2"),
            (IF_DESCR_2, "IF-MIB", "ifDescr.2"),
        ])
    }

    pub fn with_entries(entries: &[(&str, &str, &str)]) -> Self {
        Self {
            entries: Arc::new(
                entries
                    .iter()
                    .map(|(oid, mib, name)| (oid.to_string(), MibEntry::new(*mib, *name)))
                    .collect(),
            ),
            calls: Arc::default(),
            in_flight: Arc::default(),
            peak: Arc::default(),
            delay: Duration::ZERO,
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most translations ever running at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Translate for CountingTranslate {
    async fn translate(&self, oid: &str) -> Result<MibEntry, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.entries
            .get(oid)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound { oid: oid.into() })
    }
}

/// Times out on the first `failures` calls, then defers to `inner`.
#[derive(Clone)]
pub struct FlakyTranslate {
    inner: CountingTranslate,
    failures: Arc<AtomicUsize>,
}

impl FlakyTranslate {
    pub fn new(inner: CountingTranslate, failures: usize) -> Self {
        Self {
            inner,
            failures: Arc::new(AtomicUsize::new(failures)),
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls()
    }
}

impl Translate for FlakyTranslate {
    async fn translate(&self, oid: &str) -> Result<MibEntry, ResolveError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            self.inner.calls.fetch_add(1, Ordering::SeqCst);
            return Err(ResolveError::Timeout {
                oid: oid.into(),
                elapsed: Duration::from_secs(5),
            });
        }
        self.inner.translate(oid).await
    }
}

// ============================================================================
// Sink
// ============================================================================

/// Records every emitted metric.
#[derive(Clone, Default)]
pub struct RecordingSink {
    metrics: Arc<Mutex<Vec<Metric>>>,
}

impl RecordingSink {
    pub fn metrics(&self) -> Vec<Metric> {
        self.metrics.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.metrics.lock().unwrap().len()
    }

    /// Wait until at least `n` metrics were emitted.
    pub async fn wait_for(&self, n: usize) -> Vec<Metric> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if self.len() >= n {
                    return self.metrics();
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for metrics")
    }
}

impl MetricSink for RecordingSink {
    fn emit(&self, metric: Metric) {
        self.metrics.lock().unwrap().push(metric);
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Counts ERROR events, optionally only those under a target prefix.
#[derive(Clone, Default)]
pub struct ErrorCounter {
    count: Arc<AtomicUsize>,
    target_prefix: &'static str,
}

impl ErrorCounter {
    pub fn for_target(target_prefix: &'static str) -> Self {
        Self {
            count: Arc::default(),
            target_prefix,
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() == Level::ERROR && meta.target().starts_with(self.target_prefix) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Install `counter` as the thread's default subscriber.
///
/// Works with `#[tokio::test]`'s current-thread runtime, where spawned
/// tasks run on the test thread.
pub fn capture_errors(counter: &ErrorCounter) -> tracing::subscriber::DefaultGuard {
    use tracing_subscriber::layer::SubscriberExt;
    tracing::subscriber::set_default(tracing_subscriber::registry().with(counter.clone()))
}
