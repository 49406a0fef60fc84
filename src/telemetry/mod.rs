//! # Telemetry Module
//!
//! Link health accounting and optional JSONL telemetry files.
//!
//! This module handles:
//! - Counting received, rejected and sent frames and reconnects
//! - Timestamped, serializable snapshots of those counters
//! - Writing snapshots to rotating JSONL files
//! - Retaining only the last N files

pub mod logger;
pub mod stats;

pub use logger::TelemetryLogger;
pub use stats::{LinkStats, LinkStatsSnapshot};
