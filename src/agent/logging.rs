//! JSONL run logger for post-hoc inspection of orchestration runs.
//!
//! Writes structured events to one file per run, named
//! `run-{ISO8601}-{run_id}.jsonl`, inside the configured log directory.
//!
//! Writes go through a blocking `BufWriter` flushed per event; a run emits a
//! handful of lines, so nothing here needs to be async.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use crate::orchestration::{RunResult, TraceEntry};

/// UTC timestamp with millisecond precision.
fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// One line of the run log, tagged with `event_type`.
#[derive(Debug, Serialize)]
#[serde(tag = "event_type")]
pub enum LogEntry {
    /// Marks the beginning of a run.
    #[serde(rename = "run_start")]
    RunStart {
        timestamp: String,
        run_id: String,
        model: String,
        flows: usize,
        workers: usize,
        message: String,
    },

    /// A failure that prevented the run from starting or finishing normally.
    #[serde(rename = "error")]
    Error {
        timestamp: String,
        run_id: String,
        message: String,
    },

    /// Marks the end of a run, with its full trace.
    #[serde(rename = "run_end")]
    RunEnd {
        timestamp: String,
        run_id: String,
        is_success: bool,
        response: String,
        trace: Vec<TraceEntry>,
    },
}

/// Append-only JSONL logger for a single run.
pub struct RunLogger {
    writer: BufWriter<fs::File>,
    log_path: PathBuf,
    run_id: String,
}

impl RunLogger {
    /// Create the log file for `run_id` inside `log_dir`, creating the
    /// directory if needed. Colons in the timestamp are replaced by dashes
    /// for filesystem safety.
    pub fn new(log_dir: &Path, run_id: &str) -> anyhow::Result<Self> {
        fs::create_dir_all(log_dir)?;

        let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let log_path = log_dir.join(format!("run-{stamp}-{run_id}.jsonl"));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            log_path,
            run_id: run_id.to_string(),
        })
    }

    /// Append one event and flush it to disk.
    pub fn log_event(&mut self, event: &LogEntry) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Return the path to the current run log file.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn log_run_start(
        &mut self,
        model: &str,
        flows: usize,
        workers: usize,
        message: &str,
    ) -> anyhow::Result<()> {
        self.log_event(&LogEntry::RunStart {
            timestamp: now_iso(),
            run_id: self.run_id.clone(),
            model: model.to_string(),
            flows,
            workers,
            message: message.to_string(),
        })
    }

    pub fn log_error(&mut self, message: &str) -> anyhow::Result<()> {
        self.log_event(&LogEntry::Error {
            timestamp: now_iso(),
            run_id: self.run_id.clone(),
            message: message.to_string(),
        })
    }

    pub fn log_run_end(&mut self, result: &RunResult) -> anyhow::Result<()> {
        self.log_event(&LogEntry::RunEnd {
            timestamp: now_iso(),
            run_id: self.run_id.clone(),
            is_success: result.is_success,
            response: result.response.clone(),
            trace: result.trace.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::BufRead;
    use tempfile::TempDir;

    fn make_logger() -> (RunLogger, TempDir) {
        let tmp = TempDir::new().expect("tempdir");
        let logger = RunLogger::new(&tmp.path().join("runs"), "run-42").expect("RunLogger::new");
        (logger, tmp)
    }

    fn read_lines(path: &Path) -> Vec<String> {
        let file = fs::File::open(path).expect("open log");
        std::io::BufReader::new(file)
            .lines()
            .collect::<Result<_, _>>()
            .expect("read lines")
    }

    #[test]
    fn creates_log_file_in_log_dir() {
        let (logger, tmp) = make_logger();
        let log_path = logger.log_path().to_owned();

        assert!(log_path.exists(), "log file should exist at {log_path:?}");
        assert!(log_path.starts_with(tmp.path().join("runs")));

        let name = log_path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("run-"));
        assert!(name.ends_with("-run-42.jsonl"));
    }

    #[test]
    fn run_start_and_end_write_valid_jsonl() {
        let (mut logger, _tmp) = make_logger();

        logger
            .log_run_start("gpt-4o-mini", 1, 2, "translate this")
            .unwrap();
        logger
            .log_run_end(&RunResult {
                trace: vec![TraceEntry::new("Translator", json!({"text": "hola"}), json!("hello"), true)],
                response: "done".to_string(),
                is_success: true,
            })
            .unwrap();

        let lines = read_lines(logger.log_path());
        assert_eq!(lines.len(), 2);

        let start: serde_json::Value = serde_json::from_str(&lines[0]).expect("valid JSON");
        assert_eq!(start["event_type"], "run_start");
        assert_eq!(start["run_id"], "run-42");
        assert_eq!(start["model"], "gpt-4o-mini");
        assert_eq!(start["flows"], 1);
        assert_eq!(start["workers"], 2);

        let end: serde_json::Value = serde_json::from_str(&lines[1]).expect("valid JSON");
        assert_eq!(end["event_type"], "run_end");
        assert_eq!(end["is_success"], true);
        assert_eq!(end["trace"][0]["name"], "Translator");
        assert_eq!(end["trace"][0]["output"], "hello");
    }

    #[test]
    fn error_event_carries_message() {
        let (mut logger, _tmp) = make_logger();
        logger.log_error("Malformed run request").unwrap();

        let lines = read_lines(logger.log_path());
        let entry: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(entry["event_type"], "error");
        assert_eq!(entry["message"], "Malformed run request");
        assert!(entry["timestamp"].is_string());
    }
}
