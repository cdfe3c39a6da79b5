//! Translation through net-snmp's `snmptranslate`.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use super::{MibEntry, Translate};
use crate::error::ResolveError;

/// Runs `snmptranslate -Td -Ob -m all <oid>` once per translation.
///
/// The child is killed if it outlives `timeout`.
#[derive(Debug, Clone)]
pub struct SnmpTranslate {
    program: String,
    timeout: Duration,
}

impl SnmpTranslate {
    /// Translator using `snmptranslate` from `PATH`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "snmptranslate".to_string(),
            timeout,
        }
    }

    /// Use a different executable (same arguments and output format).
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// The per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Translate for SnmpTranslate {
    async fn translate(&self, oid: &str) -> Result<MibEntry, ResolveError> {
        let started = Instant::now();
        let child = Command::new(&self.program)
            .args(["-Td", "-Ob", "-m", "all", oid])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ResolveError::Exec {
                oid: oid.into(),
                source,
            })?;

        // Dropping the wait future on timeout kills the child
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ResolveError::Timeout {
                oid: oid.into(),
                elapsed: started.elapsed(),
            })?
            .map_err(|source| ResolveError::Exec {
                oid: oid.into(),
                source,
            })?;

        if !output.status.success() {
            return Err(ResolveError::Exec {
                oid: oid.into(),
                source: std::io::Error::other(format!(
                    "{} exited with {}",
                    self.program, output.status
                )),
            });
        }

        parse_translate_output(oid, &output.stdout)
    }
}

/// Parse `snmptranslate` output: the first line, split on the first `::`.
///
/// ```
/// use async_snmp_trap::resolve::parse_translate_output;
///
/// let stdout = b"IF-MIB::linkDown\nlinkDown NOTIFICATION-TYPE\n";
/// let entry = parse_translate_output(".1.3.6.1.6.3.1.1.5.3", stdout).unwrap();
/// assert_eq!(entry.mib_name, "IF-MIB");
/// assert_eq!(entry.oid_text, "linkDown");
/// ```
pub fn parse_translate_output(oid: &str, stdout: &[u8]) -> Result<MibEntry, ResolveError> {
    let text = String::from_utf8_lossy(stdout);
    let first = text.lines().next().unwrap_or_default();

    first
        .split_once("::")
        .map(|(mib, name)| MibEntry::new(mib, name))
        .ok_or_else(|| ResolveError::NotFound { oid: oid.into() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_first_line_only() {
        let out = b"SNMPv2-MIB::coldStart\ncoldStart NOTIFICATION-TYPE\n  -- FROM SNMPv2-MIB\n";
        let entry = parse_translate_output(".1.3.6.1.6.3.1.1.5.1", out).unwrap();
        assert_eq!(entry, MibEntry::new("SNMPv2-MIB", "coldStart"));
    }

    #[test]
    fn test_parse_splits_on_first_separator() {
        let entry = parse_translate_output(".1", b"A-MIB::b::c\n").unwrap();
        assert_eq!(entry.mib_name, "A-MIB");
        assert_eq!(entry.oid_text, "b::c");
    }

    #[test]
    fn test_parse_keeps_instance_suffix() {
        let entry = parse_translate_output(".1.3.6.1.2.1.2.2.1.1.2", b"IF-MIB::ifIndex.2").unwrap();
        assert_eq!(entry.oid_text, "ifIndex.2");
    }

    #[test]
    fn test_parse_without_separator_is_not_found() {
        let err = parse_translate_output(".1.2.3", b".1.2.3\n").unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));
        assert_eq!(err.oid(), ".1.2.3");

        assert!(matches!(
            parse_translate_output(".1.2.3", b""),
            Err(ResolveError::NotFound { .. })
        ));
    }

    #[test]
    fn test_separator_on_second_line_is_ignored() {
        assert!(parse_translate_output(".1", b"garbage\nA-MIB::b\n").is_err());
    }

    #[tokio::test]
    async fn test_missing_program_is_exec_error() {
        let t = SnmpTranslate::new(Duration::from_secs(1)).program("/nonexistent/snmptranslate");
        let err = t.translate(".1.3.6.1").await.unwrap_err();
        assert!(matches!(err, ResolveError::Exec { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_exec_error() {
        let t = SnmpTranslate::new(Duration::from_secs(5)).program("false");
        let err = t.translate(".1.3.6.1").await.unwrap_err();
        assert!(matches!(err, ResolveError::Exec { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_output_parsed() {
        // `echo` prints its arguments: "-Td -Ob -m all .1", no separator
        let t = SnmpTranslate::new(Duration::from_secs(5)).program("echo");
        let err = t.translate(".1").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));
    }
}
