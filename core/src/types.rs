//! Shared primitive types used across the ingestion pipeline.

/// Row id of a persisted log file.
pub type FileId = i64;

/// Row id of a persisted risk check.
pub type RiskCheckId = i64;

/// Row id of a payment type (reference data).
pub type PaymentTypeId = i64;

/// Row id of a persisted timeout.
pub type TimeoutId = i64;

/// Storage format for request times. Always UTC.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
