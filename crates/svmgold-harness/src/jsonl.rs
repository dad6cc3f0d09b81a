//! JSONL run event log.
//!
//! One JSON object per line:
//!
//! ```json
//! {"event":"run_start","run_id":"...","mode":"SmartUnrolling","os_family":"Unix","methods":12,"timestamp":"..."}
//! {"event":"method","run_id":"...","method":"Demo.Foo.Bar","state":"failed","digest":"blake3:...","candidate":"..."}
//! {"event":"run_complete","run_id":"...","succeeded":10,"failed":1,"skipped":1,"total_ms":812}
//! ```
//!
//! Observed outcomes can be large; method events carry a `blake3:` digest so
//! two runs can be compared line by line without storing full results.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::orchestrator::TestReport;

/// `blake3:<hex>` digest of an observed outcome.
#[must_use]
pub fn outcome_digest(observed: &str) -> String {
    format!("blake3:{}", blake3::hash(observed.as_bytes()).to_hex())
}

/// Append-only event writer; a no-op when disabled.
#[derive(Debug)]
pub struct EventLog {
    writer: Option<Mutex<BufWriter<File>>>,
    run_id: String,
    start_time: Instant,
}

impl EventLog {
    /// Append to `path`, creating parent directories.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| HarnessError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| HarnessError::io(path, e))?;
        Ok(Self {
            writer: Some(Mutex::new(BufWriter::new(file))),
            run_id: generate_run_id(),
            start_time: Instant::now(),
        })
    }

    pub fn noop() -> Self {
        Self {
            writer: None,
            run_id: generate_run_id(),
            start_time: Instant::now(),
        }
    }

    /// Log to `config.event_log` when set.
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        match &config.event_log {
            Some(path) => Self::new(path),
            None => Ok(Self::noop()),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    pub fn run_start(&self, config: &HarnessConfig, methods: usize) {
        self.write_event(json!({
            "event": "run_start",
            "run_id": self.run_id,
            "mode": config.mode.as_str(),
            "os_family": config.os_family.as_str(),
            "layout": config.layout.as_str(),
            "gold_root": config.gold_root.display().to_string(),
            "methods": methods,
            "timestamp": iso_timestamp(),
        }));
    }

    pub fn method(&self, report: &TestReport) {
        self.write_event(json!({
            "event": "method",
            "run_id": self.run_id,
            "method": report.method.qualified_name(),
            "signature": report.method.signature_text(),
            "state": report.state().as_str(),
            "digest": report.observed.as_deref().map(outcome_digest),
            "gold_path": report.gold_path.as_ref().map(|p| p.display().to_string()),
            "candidate": report.candidate.as_ref().map(|p| p.display().to_string()),
            "legacy_gold": report.legacy_gold,
            "fault": report.fault.as_ref().map(ToString::to_string),
        }));
    }

    pub fn run_complete(&self, succeeded: usize, failed: usize, skipped: usize) {
        let total_ms = u64::try_from(self.start_time.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.write_event(json!({
            "event": "run_complete",
            "run_id": self.run_id,
            "succeeded": succeeded,
            "failed": failed,
            "skipped": skipped,
            "total_ms": total_ms,
            "timestamp": iso_timestamp(),
        }));
    }

    fn write_event(&self, event: Value) {
        if let Some(writer) = &self.writer {
            let mut writer = writer.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = writeln!(writer, "{event}");
            let _ = writer.flush();
        }
    }
}

fn generate_run_id() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{:x}-{:x}", nanos, std::process::id())
}

fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Orchestrator;
    use crate::registry::RegisteredMethod;
    use crate::explorer::FnExplorer;
    use svmgold_core::{ExplorationMode, MethodDescriptor};

    #[test]
    fn digest_is_prefixed_and_stable() {
        let a = outcome_digest("42");
        assert!(a.starts_with("blake3:"));
        assert_eq!(a.len(), "blake3:".len() + 64);
        assert_eq!(a, outcome_digest("42"));
        assert_ne!(a, outcome_digest("41"));
    }

    #[test]
    fn noop_log_accepts_events() {
        let log = EventLog::noop();
        assert!(!log.is_enabled());
        log.run_start(&HarnessConfig::default(), 0);
        log.run_complete(0, 0, 0);
    }

    #[test]
    fn file_log_writes_parseable_lines() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("corpus");
        let path = dir.path().join("logs/events.jsonl");
        let config = HarnessConfig::default().with_gold_root(&root);
        {
            let log = EventLog::new(&path).unwrap();
            log.run_start(&config, 1);
            let explorer = FnExplorer(
                |_: &MethodDescriptor, _: ExplorationMode| -> std::result::Result<String, crate::explorer::Fault> {
                    Ok("42".to_string())
                },
            );
            let method = RegisteredMethod::new(MethodDescriptor::new(
                "Demo.Foo",
                "Bar",
                ["Int32"],
                "Int32",
            ));
            let report = Orchestrator::from_config(&config).execute(&method, &explorer);
            log.method(&report);
            log.run_complete(0, 1, 0);
        }
        let content = fs::read_to_string(&path).unwrap();
        let events: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["event"], "run_start");
        assert_eq!(events[0]["methods"], 1);
        assert_eq!(events[1]["event"], "method");
        assert_eq!(events[1]["state"], "failed");
        assert_eq!(events[1]["digest"], outcome_digest("42"));
        assert!(events[1]["candidate"].as_str().unwrap().ends_with(".gold.tmp"));
        assert_eq!(events[2]["event"], "run_complete");
        assert_eq!(events[2]["failed"], 1);
        let run_ids: Vec<&Value> = events.iter().map(|e| &e["run_id"]).collect();
        assert!(run_ids.iter().all(|id| *id == run_ids[0]));
    }
}
