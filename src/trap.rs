//! Decoded trap events, the normalizer's input.

use std::net::{IpAddr, Ipv4Addr};
use std::time::SystemTime;

use crate::pdu::{GenericTrap, Pdu, TrapV1Pdu};
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::Version;

/// One variable binding, with the OID in leading-dot numeric form.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// OID, e.g. `.1.3.6.1.2.1.2.2.1.1.2`
    pub oid: String,
    /// Value
    pub value: Value,
}

impl Variable {
    /// Create a variable.
    pub fn new(oid: impl Into<String>, value: Value) -> Self {
        Self {
            oid: oid.into(),
            value,
        }
    }
}

impl From<VarBind> for Variable {
    fn from(vb: VarBind) -> Self {
        Self {
            oid: vb.oid.to_string(),
            value: vb.value,
        }
    }
}

/// Fields only SNMPv1 Trap-PDUs carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct V1Fields {
    /// Enterprise OID, leading-dot form
    pub enterprise: String,
    /// Generic trap code, -1 when out of range
    pub generic_trap: i32,
    /// Specific trap code
    pub specific_trap: i32,
    /// Agent address, dotted quad; empty when unknown
    pub agent_address: String,
    /// sysUpTime of the agent, hundredths of seconds
    pub uptime: u32,
}

/// A received trap or inform, decoded and authenticated.
#[derive(Debug, Clone, PartialEq)]
pub struct TrapEvent {
    /// Message version
    pub version: Version,
    /// Sender address
    pub source: IpAddr,
    /// When the datagram was received
    pub received_at: SystemTime,
    /// Variable bindings, in received order
    pub variables: Vec<Variable>,
    /// Present for SNMPv1 traps
    pub v1: Option<V1Fields>,
}

impl TrapEvent {
    /// Event from an SNMPv2-Trap or InformRequest PDU (v2c or v3).
    pub fn from_pdu(version: Version, source: IpAddr, received_at: SystemTime, pdu: Pdu) -> Self {
        Self {
            version,
            source,
            received_at,
            variables: pdu.varbinds.into_iter().map(Variable::from).collect(),
            v1: None,
        }
    }

    /// Event from an SNMPv1 Trap-PDU.
    pub fn from_trap_v1(source: IpAddr, received_at: SystemTime, trap: TrapV1Pdu) -> Self {
        let generic_trap = trap
            .generic_trap_enum()
            .map_or(-1, GenericTrap::as_i32);
        Self {
            version: Version::V1,
            source,
            received_at,
            variables: trap.varbinds.into_iter().map(Variable::from).collect(),
            v1: Some(V1Fields {
                enterprise: trap.enterprise.to_string(),
                generic_trap,
                specific_trap: trap.specific_trap,
                agent_address: Ipv4Addr::from(trap.agent_addr).to_string(),
                uptime: trap.time_stamp,
            }),
        }
    }
}
