//! Cross-run failure statistics.
//!
//! Faults are grouped by `(kind, message, location)`. Each group keeps its
//! occurrence count and the first method that produced it, so a developer has
//! one concrete reproduction per distinct failure.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::error::{HarnessError, Result};
use crate::explorer::Fault;

/// Header row of the CSV export.
pub const CSV_HEADER: &str = "Type,Message,Location,Count,ExampleMethod";
const RULE: &str =
    "<--------------------------------------------------------------------------------->";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupKey {
    kind: String,
    message: String,
    location: String,
}

#[derive(Debug, Clone)]
struct Group {
    count: usize,
    example: String,
}

/// Accumulates faults for one run.
#[derive(Debug, Default)]
pub struct ExceptionAggregator {
    methods_run: usize,
    methods_succeeded: usize,
    groups: HashMap<GroupKey, Group>,
}

impl ExceptionAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note_method_started(&mut self) {
        self.methods_run += 1;
    }

    pub fn note_method_succeeded(&mut self) {
        self.methods_succeeded += 1;
    }

    /// Count `fault` against its group; the first `originating_method` seen
    /// for a group stays its example.
    pub fn record(&mut self, fault: &Fault, originating_method: &str) {
        let key = GroupKey {
            kind: fault.kind.clone(),
            message: fault.message.clone(),
            location: fault.location(),
        };
        self.groups
            .entry(key)
            .and_modify(|g| g.count += 1)
            .or_insert_with(|| Group {
                count: 1,
                example: originating_method.to_string(),
            });
    }

    /// Sorted snapshot.
    #[must_use]
    pub fn report(&self) -> StatisticsReport {
        let mut exceptions: Vec<ExceptionInfo> = self
            .groups
            .iter()
            .map(|(key, group)| ExceptionInfo {
                kind: key.kind.clone(),
                message: key.message.clone(),
                location: key.location.clone(),
                count: group.count,
                example_method: group.example.clone(),
            })
            .collect();
        exceptions.sort();
        StatisticsReport {
            methods_run: self.methods_run,
            methods_succeeded: self.methods_succeeded,
            exceptions,
        }
    }
}

/// Aggregator handle shared by worker threads.
#[derive(Debug, Clone, Default)]
pub struct SharedAggregator(Arc<Mutex<ExceptionAggregator>>);

impl SharedAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with exclusive access.
    pub fn with<R>(&self, f: impl FnOnce(&mut ExceptionAggregator) -> R) -> R {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn record(&self, fault: &Fault, originating_method: &str) {
        self.with(|agg| agg.record(fault, originating_method));
    }

    #[must_use]
    pub fn report(&self) -> StatisticsReport {
        self.with(|agg| agg.report())
    }
}

/// One fault group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub location: String,
    pub count: usize,
    pub example_method: String,
}

impl Ord for ExceptionInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| other.count.cmp(&self.count))
            .then_with(|| self.message.cmp(&other.message))
            .then_with(|| self.location.cmp(&other.location))
            .then_with(|| self.example_method.cmp(&other.example_method))
    }
}

impl PartialOrd for ExceptionInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatisticsReport {
    pub methods_run: usize,
    pub methods_succeeded: usize,
    pub exceptions: Vec<ExceptionInfo>,
}

impl StatisticsReport {
    /// Console summary; every line is prefixed with `STATISTICS:` except the
    /// separators.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "STATISTICS: Total methods number: {}", self.methods_run);
        let _ = writeln!(
            out,
            "STATISTICS: Succeeded methods number: {}",
            self.methods_succeeded
        );
        let _ = writeln!(out, "{RULE}");
        for info in &self.exceptions {
            let _ = writeln!(out, "STATISTICS: {}: {}", info.kind, info.message);
            let _ = writeln!(out, "STATISTICS: Occurred in {}", info.location);
            let _ = writeln!(out, "STATISTICS: Number of occurrences: {}", info.count);
            let _ = writeln!(
                out,
                "STATISTICS: Method for debugging: {}",
                info.example_method
            );
            let _ = writeln!(out, "{RULE}");
        }
        out
    }

    /// Write the header plus one row per group. Fields are quoted only when
    /// they contain a delimiter, quote or line break.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> csv::Result<()> {
        let mut out = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);
        out.write_record(CSV_HEADER.split(','))?;
        for info in &self.exceptions {
            let count = info.count.to_string();
            out.write_record([
                info.kind.as_str(),
                info.message.as_str(),
                info.location.as_str(),
                count.as_str(),
                info.example_method.as_str(),
            ])?;
        }
        out.flush()?;
        Ok(())
    }

    /// CSV document as a string.
    pub fn to_csv(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)
            .map_err(|source| HarnessError::csv("<memory>", source))?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn export_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| HarnessError::io(parent, e))?;
        }
        let file = fs::File::create(path).map_err(|e| HarnessError::io(path, e))?;
        self.write_csv(io::BufWriter::new(file))
            .map_err(|source| HarnessError::csv(path, source))
    }

    /// Export to a fresh `.csv` file in the temp directory and return its path.
    pub fn export_csv_to_temp(&self) -> Result<PathBuf> {
        let temp_dir = std::env::temp_dir();
        let file = tempfile::Builder::new()
            .prefix("svmgold-statistics-")
            .suffix(".csv")
            .tempfile_in(&temp_dir)
            .map_err(|e| HarnessError::io(&temp_dir, e))?;
        let (_, path) = file
            .keep()
            .map_err(|e| HarnessError::io(&temp_dir, e.error))?;
        self.export_csv(&path)?;
        Ok(path)
    }
}
