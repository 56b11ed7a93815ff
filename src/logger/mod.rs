//! Scan event logging: non-blocking handle + JSONL append-only sink.

pub mod dual;
pub mod jsonl;

pub use dual::{ScanEvent, ScanLoggerConfig, ScanLoggerHandle, spawn_logger};
