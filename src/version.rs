//! SNMP protocol version.

/// SNMP protocol version.
///
/// Displays as the tag value used on emitted metrics: `"1"`, `"2c"` or `"3"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Version {
    /// SNMPv1 (wire value 0)
    V1,
    /// SNMPv2c (wire value 1)
    #[default]
    V2c,
    /// SNMPv3 (wire value 3)
    V3,
}

impl Version {
    /// Create from the message version field.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::V1),
            1 => Some(Self::V2c),
            3 => Some(Self::V3),
            _ => None,
        }
    }

    /// Wire value of the message version field.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::V1 => 0,
            Self::V2c => 1,
            Self::V3 => 3,
        }
    }

    /// Parse a configured version selector.
    ///
    /// Unrecognised selectors fall back to v2c with a warning rather than
    /// failing: trap senders are usually v2c and this keeps old configs
    /// working.
    pub fn from_selector(s: &str) -> Self {
        match s {
            "1" => Self::V1,
            "2c" => Self::V2c,
            "3" => Self::V3,
            other => {
                tracing::warn!(target: "async_snmp_trap::config", { snmp.version = other }, "unknown SNMP version selector, using 2c");
                Self::V2c
            }
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V1 => write!(f, "1"),
            Self::V2c => write!(f, "2c"),
            Self::V3 => write!(f, "3"),
        }
    }
}
