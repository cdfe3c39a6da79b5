//! Metric events and the sink they are emitted to.

use std::collections::BTreeMap;
use std::time::SystemTime;

use tokio::sync::mpsc;

/// A metric field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Signed integer
    Integer(i64),
    /// Unsigned integer
    Unsigned(u64),
    /// String
    String(String),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}i", v),
            Self::Unsigned(v) => write!(f, "{}u", v),
            Self::String(s) => write!(f, "\"{}\"", Escaped(s, &['"', '\\'])),
        }
    }
}

/// Backslash-escapes `special` characters on display.
struct Escaped<'a>(&'a str, &'a [char]);

impl std::fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut rest = self.0;
        while let Some(at) = rest.find(self.1) {
            let c = rest[at..].chars().next().unwrap_or_default();
            write!(f, "{}\\{}", &rest[..at], c)?;
            rest = &rest[at + c.len_utf8()..];
        }
        f.write_str(rest)
    }
}

const MEASUREMENT: &[char] = &[',', ' '];
const KEY_OR_TAG: &[char] = &[',', '=', ' '];

/// One emitted event: a name, fields, tags and a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    /// Measurement name
    pub name: String,
    /// Fields (at least one)
    pub fields: BTreeMap<String, FieldValue>,
    /// Tags
    pub tags: BTreeMap<String, String>,
    /// Event time
    pub timestamp: SystemTime,
}

impl Metric {
    /// Create a metric with no fields or tags.
    pub fn new(name: impl Into<String>, timestamp: SystemTime) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
            tags: BTreeMap::new(),
            timestamp,
        }
    }

    /// Look up a tag.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Look up a field.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}

/// Renders in line-protocol style: `name,tag=v field=1i <unix nanos>`.
///
/// Commas, spaces and `=` in names, keys and tag values are
/// backslash-escaped, as are quotes and backslashes in string fields.
impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Escaped(&self.name, MEASUREMENT))?;
        for (k, v) in &self.tags {
            write!(f, ",{}={}", Escaped(k, KEY_OR_TAG), Escaped(v, KEY_OR_TAG))?;
        }
        for (i, (k, v)) in self.fields.iter().enumerate() {
            let sep = if i == 0 { ' ' } else { ',' };
            write!(f, "{}{}={}", sep, Escaped(k, KEY_OR_TAG), v)?;
        }
        let nanos = self
            .timestamp
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        write!(f, " {}", nanos)
    }
}

/// Where normalized traps go.
pub trait MetricSink: Send + Sync + 'static {
    /// Accept one metric. Must not block.
    fn emit(&self, metric: Metric);
}

impl MetricSink for mpsc::UnboundedSender<Metric> {
    fn emit(&self, metric: Metric) {
        if self.send(metric).is_err() {
            tracing::debug!(target: "async_snmp_trap::normalize", "metric receiver dropped, discarding metric");
        }
    }
}

impl<S: MetricSink> MetricSink for std::sync::Arc<S> {
    fn emit(&self, metric: Metric) {
        (**self).emit(metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_display_line_protocol() {
        let mut m = Metric::new("snmp_trap", SystemTime::UNIX_EPOCH + Duration::from_secs(1));
        m.tags.insert("version".into(), "2c".into());
        m.tags.insert("source".into(), "10.0.0.1".into());
        m.fields.insert("linkDown".into(), FieldValue::Integer(1));
        m.fields
            .insert("sysUpTimeInstance".into(), FieldValue::Unsigned(100));

        assert_eq!(
            m.to_string(),
            "snmp_trap,source=10.0.0.1,version=2c linkDown=1i,sysUpTimeInstance=100u 1000000000"
        );
        assert_eq!(m.tag("version"), Some("2c"));
        assert_eq!(m.field("linkDown"), Some(&FieldValue::Integer(1)));
    }

    #[test]
    fn test_display_escapes_special_characters() {
        let mut m = Metric::new("snmp trap", SystemTime::UNIX_EPOCH);
        m.tags.insert("ifAlias.2".into(), "eth 1, uplink".into());
        m.tags.insert("a=b".into(), "x=y".into());
        m.fields.insert("link Down".into(), FieldValue::Integer(1));
        m.fields
            .insert("note".into(), FieldValue::String(r#"say "hi" \ bye"#.into()));

        assert_eq!(
            m.to_string(),
            concat!(
                r#"snmp\ trap,a\=b=x\=y,ifAlias.2=eth\ 1\,\ uplink "#,
                r#"link\ Down=1i,note="say \"hi\" \\ bye" 0"#
            )
        );
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.emit(Metric::new("snmp_trap", SystemTime::UNIX_EPOCH));
        assert_eq!(rx.recv().await.unwrap().name, "snmp_trap");

        drop(rx);
        // Closed receiver is not an error for the emitter
        tx.emit(Metric::new("snmp_trap", SystemTime::UNIX_EPOCH));
    }
}
