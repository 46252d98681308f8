//! Risk-check log ingestion: parse risk-decision and timeout log entries,
//! reconcile them against stored state, and persist risk checks with their
//! applicable payment methods.

pub mod adapter;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod file_store;
pub mod parser;
pub mod resolver;
pub mod store;
pub mod types;
