//! Trace utilities

/// Trace category for fan-out of events to receivers.
pub const BROADCAST: &str = "broadcast";
/// Trace category for built-in output writers.
pub const OUTPUT: &str = "output";
/// Trace category for registry lifecycle (rounds, cases, teardown).
pub const REGISTRY: &str = "registry";
