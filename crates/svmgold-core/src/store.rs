//! Gold file I/O.
//!
//! A gold file holds two fields:
//!
//! ```text
//! METHOD: System.Int32 Demo.Foo.Bar(System.Int32)
//! RESULT: <canonical exploration result>
//! ```
//!
//! Only the first `RESULT: ` delimits the value, so recorded results may
//! themselves contain the marker. Reading never writes; candidates are only
//! written on request (the orchestrator asks on mismatch).

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GoldError, Result};
use crate::layout::GOLD_EXTENSION;

pub const METHOD_MARKER: &str = "METHOD: ";
pub const RESULT_MARKER: &str = "RESULT: ";
/// Extra extension appended to candidate files under [`CandidatePolicy::Suffixed`].
pub const CANDIDATE_EXTENSION: &str = "tmp";

/// Where candidate values go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidatePolicy {
    /// Next to the gold file with a `.tmp` suffix; the gold file is untouched.
    #[default]
    Suffixed,
    /// Over the gold file itself; version control shows the diff.
    InPlace,
}

impl CandidatePolicy {
    #[must_use]
    pub fn candidate_path(self, gold_path: &Path) -> PathBuf {
        match self {
            Self::Suffixed => {
                let mut name = gold_path.as_os_str().to_os_string();
                name.push(".");
                name.push(CANDIDATE_EXTENSION);
                PathBuf::from(name)
            }
            Self::InPlace => gold_path.to_path_buf(),
        }
    }
}

impl FromStr for CandidatePolicy {
    type Err = GoldError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "suffixed" | "tmp" => Ok(Self::Suffixed),
            "in-place" | "inplace" => Ok(Self::InPlace),
            _ => Err(GoldError::UnknownToken {
                what: "candidate policy",
                value: s.to_string(),
            }),
        }
    }
}

/// Parsed gold file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldEntry {
    /// Human-readable signature; documentation only.
    pub method: String,
    pub result: String,
}

impl GoldEntry {
    pub fn new(method: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            result: result.into(),
        }
    }

    /// Serialized file content.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "{METHOD_MARKER}{}\n{RESULT_MARKER}{}\n",
            self.method, self.result
        )
    }

    /// Parse file content. `Ok(None)` for empty content.
    pub fn parse(content: &str, path: &Path) -> Result<Option<Self>> {
        if content.is_empty() {
            return Ok(None);
        }
        let Some((head, result)) = content.split_once(RESULT_MARKER) else {
            return Err(GoldError::MalformedGold {
                path: path.to_path_buf(),
            });
        };
        let method = head
            .trim()
            .strip_prefix(METHOD_MARKER.trim_end())
            .unwrap_or(head.trim())
            .trim()
            .to_string();
        Ok(Some(Self {
            method,
            result: result.trim().to_string(),
        }))
    }
}

/// Read a gold file. Missing or empty files yield `None`.
pub fn read_gold(path: &Path) -> Result<Option<GoldEntry>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(GoldError::io(path, e)),
    };
    GoldEntry::parse(&content, path)
}

/// Load only the RESULT field.
pub fn load_gold(path: &Path) -> Result<Option<String>> {
    Ok(read_gold(path)?.map(|entry| entry.result))
}

/// Write `entry` to `path`, creating parent directories first.
pub fn write_gold(path: &Path, entry: &GoldEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| GoldError::io(parent, e))?;
    }
    fs::write(path, entry.render()).map_err(|e| GoldError::io(path, e))
}

/// Gold path a suffixed candidate belongs to.
pub fn gold_path_for_candidate(candidate: &Path) -> Result<PathBuf> {
    let not_candidate = || GoldError::NotACandidate {
        path: candidate.to_path_buf(),
    };
    let name = candidate
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(not_candidate)?;
    let gold_name = name
        .strip_suffix(&format!(".{CANDIDATE_EXTENSION}"))
        .filter(|stem| stem.ends_with(&format!(".{GOLD_EXTENSION}")))
        .ok_or_else(not_candidate)?;
    Ok(candidate.with_file_name(gold_name))
}

/// Gold store with per-path serialization of candidate writes.
///
/// Reads are lock-free. Candidate writes to the same path from concurrent
/// test threads are serialized; writes to distinct paths proceed in parallel.
#[derive(Debug, Default)]
pub struct GoldStore {
    policy: CandidatePolicy,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl GoldStore {
    #[must_use]
    pub fn new(policy: CandidatePolicy) -> Self {
        Self {
            policy,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> CandidatePolicy {
        self.policy
    }

    /// See [`load_gold`].
    pub fn load(&self, path: &Path) -> Result<Option<String>> {
        let value = load_gold(path)?;
        debug!(path = %path.display(), found = value.is_some(), "loaded gold value");
        Ok(value)
    }

    /// Persist a candidate for `gold_path` and return where it was written.
    pub fn store_candidate(
        &self,
        gold_path: &Path,
        signature_text: &str,
        observed: &str,
    ) -> Result<PathBuf> {
        let candidate = self.policy.candidate_path(gold_path);
        let lock = self.path_lock(&candidate);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        write_gold(&candidate, &GoldEntry::new(signature_text, observed))?;
        info!(candidate = %candidate.display(), "wrote gold candidate");
        Ok(candidate)
    }

    /// Replace a gold file with its suffixed candidate.
    pub fn promote(&self, candidate: &Path) -> Result<PathBuf> {
        let gold = gold_path_for_candidate(candidate)?;
        let lock = self.path_lock(candidate);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        // Validate before replacing so a broken candidate never becomes gold.
        if read_gold(candidate)?.is_none() {
            return Err(GoldError::MalformedGold {
                path: candidate.to_path_buf(),
            });
        }
        fs::rename(candidate, &gold).map_err(|e| GoldError::io(candidate, e))?;
        info!(gold = %gold.display(), "promoted gold candidate");
        Ok(gold)
    }

    fn path_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }
}
