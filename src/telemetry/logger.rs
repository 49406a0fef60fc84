//! JSONL telemetry writer with size-based rotation.

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::TelemetryConfig;
use crate::error::Result;

const FILE_PREFIX: &str = "gimbal_";
const FILE_EXTENSION: &str = "jsonl";

/// Appends one JSON object per line, starting a new file every
/// `max_records_per_file` records and keeping only the newest
/// `max_files_to_keep` files in the directory.
pub struct TelemetryLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    active_path: Option<PathBuf>,
    records_in_file: usize,
    file_seq: u64,
}

impl std::fmt::Debug for TelemetryLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryLogger")
            .field("dir", &self.dir)
            .field("records_in_file", &self.records_in_file)
            .finish_non_exhaustive()
    }
}

impl TelemetryLogger {
    /// Create the log directory if needed. The first file is opened lazily.
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        Self::with_limits(&config.log_dir, config.max_records_per_file, config.max_files_to_keep)
    }

    pub fn with_limits(
        dir: impl AsRef<Path>,
        max_records_per_file: usize,
        max_files_to_keep: usize,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer: None,
            active_path: None,
            records_in_file: 0,
            file_seq: 0,
        })
    }

    /// Append a record as a single JSON line
    pub fn log<T: Serialize>(&mut self, record: &T) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, record).map_err(io::Error::from)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            self.records_in_file += 1;
        }

        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        self.file_seq += 1;
        let name = format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S%.3f"),
            self.file_seq,
            FILE_EXTENSION
        );
        let path = self.dir.join(name);
        debug!("Opening telemetry file {}", path.display());

        self.writer = Some(BufWriter::new(File::create(&path)?));
        self.active_path = Some(path);
        self.records_in_file = 0;

        self.prune()
    }

    /// Remove the oldest telemetry files beyond the retention limit
    ///
    /// The file being written always counts as kept, so a wall clock that
    /// steps backwards can never get it deleted.
    fn prune(&self) -> Result<()> {
        let mut files = self.telemetry_files()?;
        files.retain(|path| Some(path) != self.active_path.as_ref());

        let keep = self.max_files_to_keep - 1;
        if files.len() <= keep {
            return Ok(());
        }

        files.sort();
        let excess = files.len() - keep;
        for path in files.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove old telemetry file {}: {}", path.display(), e);
            }
        }

        Ok(())
    }

    fn telemetry_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_telemetry = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(FILE_PREFIX) && name.ends_with(FILE_EXTENSION))
                .unwrap_or(false);

            if is_telemetry {
                files.push(path);
            }
        }

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn read_lines(dir: &Path) -> Vec<String> {
        let mut files: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        files.sort();

        files
            .iter()
            .flat_map(|path| {
                fs::read_to_string(path)
                    .unwrap()
                    .lines()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    #[test]
    fn test_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("telemetry");

        TelemetryLogger::with_limits(&dir, 10, 2).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_writes_json_lines() {
        let tmp = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::with_limits(tmp.path(), 100, 2).unwrap();

        logger.log(&json!({"mode": "RUNNING", "frames_received": 3})).unwrap();
        logger.log(&json!({"mode": "ERROR", "frames_received": 4})).unwrap();

        let lines = read_lines(tmp.path());
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["mode"], "RUNNING");
        let second: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(second["frames_received"], 4);
    }

    #[test]
    fn test_rotates_after_max_records() {
        let tmp = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::with_limits(tmp.path(), 2, 10).unwrap();

        for i in 0..5 {
            logger.log(&json!({ "seq": i })).unwrap();
        }

        assert_eq!(logger.telemetry_files().unwrap().len(), 3);
        assert_eq!(read_lines(tmp.path()).len(), 5);
    }

    #[test]
    fn test_keeps_only_newest_files() {
        let tmp = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::with_limits(tmp.path(), 1, 2).unwrap();

        for i in 0..6 {
            logger.log(&json!({ "seq": i })).unwrap();
        }

        let files = logger.telemetry_files().unwrap();
        assert_eq!(files.len(), 2);

        let lines = read_lines(tmp.path());
        let seqs: Vec<i64> = lines
            .iter()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["seq"].as_i64().unwrap())
            .collect();
        assert_eq!(seqs, vec![4, 5]);
    }

    #[test]
    fn test_ignores_foreign_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("notes.txt"), "keep me").unwrap();

        let mut logger = TelemetryLogger::with_limits(tmp.path(), 1, 1).unwrap();
        logger.log(&json!({ "seq": 0 })).unwrap();
        logger.log(&json!({ "seq": 1 })).unwrap();

        assert!(tmp.path().join("notes.txt").exists());
        assert_eq!(logger.telemetry_files().unwrap().len(), 1);
    }

    #[test]
    fn test_clock_step_back_keeps_active_file() {
        let tmp = TempDir::new().unwrap();
        let future_old = tmp.path().join("gimbal_29990101_000000.000_0001.jsonl");
        let future_new = tmp.path().join("gimbal_29990101_000001.000_0002.jsonl");
        fs::write(&future_old, "{\"seq\":-2}\n").unwrap();
        fs::write(&future_new, "{\"seq\":-1}\n").unwrap();

        let mut logger = TelemetryLogger::with_limits(tmp.path(), 100, 2).unwrap();
        logger.log(&json!({ "seq": 0 })).unwrap();
        logger.log(&json!({ "seq": 1 })).unwrap();

        let active = logger.active_path.clone().unwrap();
        assert!(active.exists());
        assert_eq!(fs::read_to_string(&active).unwrap().lines().count(), 2);

        let files = logger.telemetry_files().unwrap();
        assert_eq!(files.len(), 2);
        assert!(!future_old.exists());
        assert!(future_new.exists());
    }
}
