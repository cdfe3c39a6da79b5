//! Normalization of decoded traps into `snmp_trap` metrics.

mod common;

use std::net::IpAddr;
use std::time::{Duration, SystemTime};

use async_snmp_trap::normalize::{SNMP_TRAP_OID, SYS_UPTIME_OID};
use async_snmp_trap::{
    Error, FieldValue, Oid, OidCache, Resolve, ResolveError, TrapEvent, TrapNormalizer, V1Fields,
    Value, Variable, Version, v1_trap_oid,
};
use bytes::Bytes;
use common::{
    COLD_START, CountingTranslate, ErrorCounter, FlakyTranslate, IF_DESCR_2, IF_INDEX_2,
    LINK_DOWN, RecordingSink, UNKNOWN_OID, capture_errors,
};

fn source() -> IpAddr {
    "198.51.100.20".parse().unwrap()
}

fn oid_value(s: &str) -> Value {
    Value::ObjectIdentifier(Oid::parse(s).unwrap())
}

fn v2c(variables: Vec<Variable>) -> TrapEvent {
    TrapEvent {
        version: Version::V2c,
        source: source(),
        received_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        variables,
        v1: None,
    }
}

fn link_down_event() -> TrapEvent {
    v2c(vec![
        Variable::new(SYS_UPTIME_OID, Value::TimeTicks(12345)),
        Variable::new(SNMP_TRAP_OID, oid_value(LINK_DOWN)),
        Variable::new(IF_INDEX_2, Value::Integer(2)),
        Variable::new(IF_DESCR_2, Value::OctetString(Bytes::from_static(b"eth1"))),
    ])
}

fn v1(generic_trap: i32, specific_trap: i32, enterprise: &str) -> TrapEvent {
    TrapEvent {
        version: Version::V1,
        source: source(),
        received_at: SystemTime::UNIX_EPOCH,
        variables: vec![Variable::new(SNMP_TRAP_OID, oid_value(LINK_DOWN))],
        v1: Some(V1Fields {
            enterprise: enterprise.to_string(),
            generic_trap,
            specific_trap,
            agent_address: "10.1.2.3".to_string(),
            uptime: 500,
        }),
    }
}

#[test]
fn test_generic_traps_map_to_snmp_traps() {
    for (generic, expected) in [
        (0, ".1.3.6.1.6.3.1.1.5.1"),
        (1, ".1.3.6.1.6.3.1.1.5.2"),
        (2, ".1.3.6.1.6.3.1.1.5.3"),
        (3, ".1.3.6.1.6.3.1.1.5.4"),
        (4, ".1.3.6.1.6.3.1.1.5.5"),
        (5, ".1.3.6.1.6.3.1.1.5.6"),
    ] {
        assert_eq!(v1_trap_oid(".1.3.6.1.4.1.9", generic, 42).as_deref(), Some(expected));
    }
}

#[test]
fn test_enterprise_specific_trap_oid() {
    assert_eq!(v1_trap_oid(".1.2.3", 6, 7).as_deref(), Some(".1.2.3.0.7"));
}

#[tokio::test]
async fn test_link_down_emits_one_metric() {
    let sink = RecordingSink::default();
    let normalizer =
        TrapNormalizer::new(OidCache::new(CountingTranslate::standard()), sink.clone());

    normalizer.handle(&link_down_event()).await;

    let metrics = sink.metrics();
    assert_eq!(metrics.len(), 1);
    let m = &metrics[0];
    assert_eq!(m.name, "snmp_trap");
    assert_eq!(m.fields.len(), 1);
    assert_eq!(m.field("linkDown"), Some(&FieldValue::Integer(1)));
    assert_eq!(m.tag("version"), Some("2c"));
    assert_eq!(m.tag("source"), Some("198.51.100.20"));
    assert_eq!(m.tag("oid"), Some(LINK_DOWN));
    assert_eq!(m.tag("mib"), Some("IF-MIB"));
    assert_eq!(m.tag("ifIndex.2"), Some("2"));
    assert_eq!(m.tag("ifDescr.2"), Some("eth1"));
    assert_eq!(
        m.timestamp,
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    );
}

#[tokio::test]
async fn test_second_trap_uses_cache() {
    let translate = CountingTranslate::standard();
    let sink = RecordingSink::default();
    let normalizer = TrapNormalizer::new(OidCache::new(translate.clone()), sink.clone());

    normalizer.handle(&link_down_event()).await;
    // linkDown, ifIndex.2, ifDescr.2
    assert_eq!(translate.calls(), 3);

    normalizer.handle(&link_down_event()).await;
    assert_eq!(translate.calls(), 3);
    assert_eq!(sink.len(), 2);
}

#[tokio::test]
async fn test_missing_trap_oid_logs_one_error() {
    let errors = ErrorCounter::for_target("async_snmp_trap::normalize");
    let _guard = capture_errors(&errors);

    let sink = RecordingSink::default();
    let normalizer =
        TrapNormalizer::new(OidCache::new(CountingTranslate::standard()), sink.clone());
    let event = v2c(vec![
        Variable::new(SYS_UPTIME_OID, Value::TimeTicks(1)),
        Variable::new(IF_INDEX_2, Value::Integer(2)),
    ]);

    normalizer.handle(&event).await;

    assert_eq!(sink.len(), 0);
    assert_eq!(errors.count(), 1);
}

#[tokio::test]
async fn test_unresolvable_variable_drops_whole_trap() {
    let errors = ErrorCounter::for_target("async_snmp_trap::normalize");
    let _guard = capture_errors(&errors);

    let sink = RecordingSink::default();
    let normalizer =
        TrapNormalizer::new(OidCache::new(CountingTranslate::standard()), sink.clone());
    let event = v2c(vec![
        Variable::new(SNMP_TRAP_OID, oid_value(LINK_DOWN)),
        Variable::new(UNKNOWN_OID, Value::Counter32(9)),
    ]);

    normalizer.handle(&event).await;

    assert_eq!(sink.len(), 0);
    assert_eq!(errors.count(), 1);
}

#[tokio::test]
async fn test_timeout_is_retryable() {
    let translate = FlakyTranslate::new(CountingTranslate::standard(), 1);
    let sink = RecordingSink::default();
    let cache = OidCache::new(translate.clone());
    let normalizer = TrapNormalizer::new(cache, sink.clone());
    let event = v2c(vec![Variable::new(SNMP_TRAP_OID, oid_value(LINK_DOWN))]);

    let err = normalizer.process(&event).await.unwrap_err();
    assert!(matches!(
        *err,
        Error::Resolve(ResolveError::Timeout { .. })
    ));

    // Nothing was cached, so the next trap translates again and succeeds
    let metric = normalizer.process(&event).await.unwrap();
    assert!(metric.field("linkDown").is_some());
    assert_eq!(translate.calls(), 2);
}

#[tokio::test]
async fn test_v1_link_down_generic() {
    let sink = RecordingSink::default();
    let normalizer =
        TrapNormalizer::new(OidCache::new(CountingTranslate::standard()), sink.clone());

    let metric = normalizer.process(&v1(2, 0, ".1.3.6.1.4.1.8072")).await.unwrap();

    assert_eq!(metric.tag("version"), Some("1"));
    assert_eq!(metric.tag("agent_address"), Some("10.1.2.3"));
    assert_eq!(metric.tag("name"), Some("linkDown"));
    assert_eq!(metric.tag("oid"), Some(LINK_DOWN));
    assert_eq!(metric.field("sysUpTimeInstance"), Some(&FieldValue::Unsigned(500)));
    assert_eq!(metric.field("linkDown"), Some(&FieldValue::Integer(1)));
}

#[tokio::test]
async fn test_v1_enterprise_specific_resolves_derived_oid() {
    let translate = CountingTranslate::with_entries(&[
        (".1.3.6.1.4.1.8072.0.3", "NET-SNMP-AGENT-MIB", "nsNotifyShutdown"),
        (LINK_DOWN, "IF-MIB", "linkDown"),
    ]);
    let normalizer = TrapNormalizer::new(OidCache::new(translate), RecordingSink::default());

    let metric = normalizer.process(&v1(6, 3, ".1.3.6.1.4.1.8072")).await.unwrap();

    assert_eq!(metric.tag("name"), Some("nsNotifyShutdown"));
    assert_eq!(metric.tag("mib"), Some("IF-MIB"));
}

#[tokio::test]
async fn test_v1_unresolvable_trap_oid_is_dropped() {
    let sink = RecordingSink::default();
    let normalizer =
        TrapNormalizer::new(OidCache::new(CountingTranslate::standard()), sink.clone());

    normalizer.handle(&v1(6, 1, ".1.3.6.1.4.1.99999")).await;
    assert_eq!(sink.len(), 0);
}

#[tokio::test]
async fn test_other_oid_valued_variable_sets_name_tags() {
    let normalizer = TrapNormalizer::new(
        OidCache::new(CountingTranslate::standard()),
        RecordingSink::default(),
    );
    let event = v2c(vec![
        Variable::new(SNMP_TRAP_OID, oid_value(LINK_DOWN)),
        Variable::new(".1.3.6.1.2.1.1.2.0", oid_value(COLD_START)),
    ]);

    let metric = normalizer.process(&event).await.unwrap();
    assert!(metric.field("linkDown").is_some());
    assert_eq!(metric.tag("oid"), Some(COLD_START));
    assert_eq!(metric.tag("name"), Some("coldStart"));
    assert_eq!(metric.tag("mib"), Some("SNMPv2-MIB"));
}

#[tokio::test]
async fn test_preloaded_names_skip_translation() {
    let translate = CountingTranslate::with_entries(&[]);
    let cache = OidCache::new(translate.clone());
    cache
        .preload(LINK_DOWN, async_snmp_trap::MibEntry::new("IF-MIB", "linkDown"))
        .await;
    let normalizer = TrapNormalizer::new(cache, RecordingSink::default());

    let event = v2c(vec![Variable::new(SNMP_TRAP_OID, oid_value(LINK_DOWN))]);
    assert!(normalizer.process(&event).await.is_ok());
    assert_eq!(translate.calls(), 0);
}
