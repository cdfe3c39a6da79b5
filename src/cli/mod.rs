//! Command-line support for the `asnmp-trapd` binary.

pub mod args;
