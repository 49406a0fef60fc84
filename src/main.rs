//! # Gimbal Link
//!
//! Streams yaw corrections from the vision pipeline to the gimbal controller.
//!
//! The detection stage writes one yaw offset per line to this program's
//! standard input; each value is framed and sent to the gimbal as soon as it
//! arrives. The gimbal's reported mode is tracked in the background and
//! logged periodically.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::BufRead;
use std::thread;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use gimbal_link::config::{Config, LoggingConfig};
use gimbal_link::telemetry::{LinkStatsSnapshot, TelemetryLogger};
use gimbal_link::{GimbalLink, GimbalMode};

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Yaw offsets buffered between the input thread and the send loop
const INPUT_QUEUE_DEPTH: usize = 16;

/// Periodic status line, also written to telemetry files
#[derive(Debug, Serialize)]
struct StatusRecord<'a> {
    port: &'a str,
    mode: GimbalMode,
    connected: bool,
    #[serde(flatten)]
    stats: LinkStatsSnapshot,
}

/// Main entry point for the gimbal link application
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (path from the first argument)
///    - Set up logging (stdout, or a daily rolling file)
///    - Open the gimbal serial port and start the receiver thread;
///      failure here ends the process with an error
///
/// 2. **Main Loop**
///    - Send every yaw offset read from stdin
///    - Log mode and link statistics every `status_interval_ms`
///    - Handle Ctrl+C and end of input for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Drop the link: receiver thread joined, then the port closed
///
/// # Examples
///
/// ```bash
/// detector | cargo run --release -- config/default.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging);
    info!("Gimbal Link v{} starting...", env!("CARGO_PKG_VERSION"));

    let link = GimbalLink::open(&config.serial, &config.link)
        .with_context(|| format!("Failed to open gimbal serial port {}", config.serial.port))?;

    let mut telemetry = if config.telemetry.enabled {
        Some(TelemetryLogger::new(&config.telemetry).context("Failed to set up telemetry logging")?)
    } else {
        None
    };

    let (tx, mut yaw_rx) = mpsc::channel(INPUT_QUEUE_DEPTH);
    spawn_input_reader(tx).context("Failed to start input reader")?;

    let mut status_interval = interval(config.link.status_interval());
    status_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Reading yaw offsets from stdin, one per line");
    info!("Press Ctrl+C to exit");

    let shutdown_signal = tokio::signal::ctrl_c();
    tokio::pin!(shutdown_signal);

    loop {
        tokio::select! {
            yaw = yaw_rx.recv() => match yaw {
                Some(yaw_offset) => link.send(yaw_offset),
                None => {
                    info!("Input closed, shutting down...");
                    break;
                }
            },

            _ = status_interval.tick() => {
                report_status(&link, telemetry.as_mut());
            }

            // Handle Ctrl+C for graceful shutdown
            _ = &mut shutdown_signal => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    let stats = link.stats();
    drop(link);
    info!(
        "Total frames sent: {}, received: {}",
        stats.frames_sent, stats.frames_received
    );

    Ok(())
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides the configured level. The returned guard must be
/// held until exit so buffered file output is flushed.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "gimbal-link.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

/// Read yaw offsets from stdin on a plain thread
///
/// Blocking stdin reads are kept off the runtime so shutdown never waits on
/// them. The thread ends at end of input or when the receiver is dropped.
fn spawn_input_reader(tx: mpsc::Sender<f32>) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("yaw-input".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Failed to read input: {}", e);
                        break;
                    }
                };

                match parse_yaw_offset(&line) {
                    Some(yaw_offset) => {
                        if tx.blocking_send(yaw_offset).is_err() {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => warn!("Ignoring invalid yaw offset: {:?}", line),
                }
            }
        })
}

/// Parse one input line as a finite yaw offset
fn parse_yaw_offset(line: &str) -> Option<f32> {
    line.trim()
        .parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
}

fn report_status(link: &GimbalLink, telemetry: Option<&mut TelemetryLogger>) {
    let stats = link.stats();
    info!(
        "Gimbal mode: {} | rx {} | tx {} | rejected {} | read failures {} | reconnects {}",
        link.mode(),
        stats.frames_received,
        stats.frames_sent,
        stats.rejected_frames(),
        stats.read_failures,
        stats.reconnect_sequences
    );

    if let Some(logger) = telemetry {
        let port = link.port_name();
        let record = StatusRecord {
            port: &port,
            mode: link.mode(),
            connected: link.is_connected(),
            stats,
        };

        write_telemetry(logger, &record);
    }
}

/// Append a record without stalling the runtime's worker on file I/O
fn write_telemetry<T: Serialize>(logger: &mut TelemetryLogger, record: &T) {
    if let Err(e) = tokio::task::block_in_place(|| logger.log(record)) {
        warn!("Failed to write telemetry record: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaw_offset() {
        assert_eq!(parse_yaw_offset("-37.5"), Some(-37.5));
        assert_eq!(parse_yaw_offset("  12 \n"), Some(12.0));
        assert_eq!(parse_yaw_offset("0"), Some(0.0));
    }

    #[test]
    fn test_parse_yaw_offset_rejects_garbage() {
        assert_eq!(parse_yaw_offset(""), None);
        assert_eq!(parse_yaw_offset("left"), None);
        assert_eq!(parse_yaw_offset("1.0 2.0"), None);
    }

    #[test]
    fn test_parse_yaw_offset_rejects_non_finite() {
        assert_eq!(parse_yaw_offset("NaN"), None);
        assert_eq!(parse_yaw_offset("inf"), None);
        assert_eq!(parse_yaw_offset("-inf"), None);
    }

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "config/default.toml");
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml"));
        assert!(config.is_ok(), "{:?}", config.err());
    }

    #[test]
    fn test_status_record_flattens_stats() {
        let stats = gimbal_link::telemetry::LinkStats::new().snapshot();
        let record = StatusRecord {
            port: "/dev/ttyUSB0",
            mode: GimbalMode::Running,
            connected: true,
            stats,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["mode"], "RUNNING");
        assert_eq!(json["port"], "/dev/ttyUSB0");
        assert_eq!(json["frames_received"], 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_write_telemetry_inside_runtime() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut logger = TelemetryLogger::with_limits(tmp.path(), 10, 2).unwrap();
        let record = StatusRecord {
            port: "/dev/ttyUSB0",
            mode: GimbalMode::Idle,
            connected: false,
            stats: gimbal_link::telemetry::LinkStats::new().snapshot(),
        };

        write_telemetry(&mut logger, &record);
        write_telemetry(&mut logger, &record);

        let files: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let path = files.into_iter().next().unwrap().unwrap().path();
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("\"mode\":\"IDLE\""));
    }
}
