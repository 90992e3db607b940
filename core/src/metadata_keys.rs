//! Reserved metadata key constants for HERALD envelopes
//!
//! Keys the publishing layer itself reads or writes. Callers may use any
//! other key freely.

/// Kind of operation that produced the event (e.g. "quality_assessment")
pub const OPERATION_TYPE: &str = "operation_type";

/// Distributed trace ID, copied into log fields when present
pub const TRACE_ID: &str = "trace_id";
