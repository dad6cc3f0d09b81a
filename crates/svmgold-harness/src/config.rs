//! Harness configuration.
//!
//! Every field has an environment override so CI jobs can select the
//! exploration mode and corpus layout without code changes:
//!
//! ```sh
//! SVMGOLD_MODE=never-unroll SVMGOLD_ROOT=tests cargo test
//! ```

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;
use svmgold_core::{
    CandidatePolicy, ExplorationMode, GoldLayout, GoldLocator, GoldStore, HashSeed, OsFamily,
};

use crate::error::{HarnessError, Result};

pub const ENV_ROOT: &str = "SVMGOLD_ROOT";
pub const ENV_MODE: &str = "SVMGOLD_MODE";
pub const ENV_OS: &str = "SVMGOLD_OS";
pub const ENV_LAYOUT: &str = "SVMGOLD_LAYOUT";
pub const ENV_HASH_SEED: &str = "SVMGOLD_HASH_SEED";
pub const ENV_LEGACY_FALLBACK: &str = "SVMGOLD_LEGACY_FALLBACK";
pub const ENV_CANDIDATE: &str = "SVMGOLD_CANDIDATE";
pub const ENV_JOBS: &str = "SVMGOLD_JOBS";
pub const ENV_EVENT_LOG: &str = "SVMGOLD_EVENT_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarnessConfig {
    /// Directory containing `Golds/`.
    pub gold_root: PathBuf,
    pub mode: ExplorationMode,
    pub os_family: OsFamily,
    pub layout: GoldLayout,
    pub hash_seed: HashSeed,
    /// Read from the non-canonical layout when the canonical file is absent.
    pub legacy_fallback: bool,
    pub candidate_policy: CandidatePolicy,
    /// Worker threads; 1 runs tests sequentially.
    pub jobs: NonZeroUsize,
    /// Optional JSONL event log.
    pub event_log: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            gold_root: PathBuf::from("."),
            mode: ExplorationMode::SmartUnrolling,
            os_family: OsFamily::host(),
            layout: GoldLayout::default(),
            hash_seed: HashSeed::default(),
            legacy_fallback: true,
            candidate_policy: CandidatePolicy::default(),
            jobs: NonZeroUsize::MIN,
            event_log: None,
        }
    }
}

impl HarnessConfig {
    /// Defaults overridden by `SVMGOLD_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`HarnessConfig::from_env`] with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(root) = get(ENV_ROOT) {
            config.gold_root = PathBuf::from(root);
        }
        if let Some(v) = get(ENV_MODE) {
            config.mode = parse_token(ENV_MODE, &v)?;
        }
        if let Some(v) = get(ENV_OS) {
            config.os_family = parse_token(ENV_OS, &v)?;
        }
        if let Some(v) = get(ENV_LAYOUT) {
            config.layout = parse_token(ENV_LAYOUT, &v)?;
        }
        if let Some(v) = get(ENV_HASH_SEED) {
            config.hash_seed = parse_token(ENV_HASH_SEED, &v)?;
        }
        if let Some(v) = get(ENV_LEGACY_FALLBACK) {
            config.legacy_fallback = parse_bool(ENV_LEGACY_FALLBACK, &v)?;
        }
        if let Some(v) = get(ENV_CANDIDATE) {
            config.candidate_policy = parse_token(ENV_CANDIDATE, &v)?;
        }
        if let Some(v) = get(ENV_JOBS) {
            config.jobs = v.trim().parse().map_err(|e| HarnessError::Config {
                key: ENV_JOBS,
                value: v.clone(),
                message: format!("{e}"),
            })?;
        }
        if let Some(path) = get(ENV_EVENT_LOG) {
            config.event_log = Some(PathBuf::from(path));
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_gold_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.gold_root = root.into();
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ExplorationMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_os_family(mut self, os_family: OsFamily) -> Self {
        self.os_family = os_family;
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: GoldLayout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn with_hash_seed(mut self, seed: HashSeed) -> Self {
        self.hash_seed = seed;
        self
    }

    #[must_use]
    pub fn with_legacy_fallback(mut self, enabled: bool) -> Self {
        self.legacy_fallback = enabled;
        self
    }

    #[must_use]
    pub fn with_candidate_policy(mut self, policy: CandidatePolicy) -> Self {
        self.candidate_policy = policy;
        self
    }

    #[must_use]
    pub fn with_jobs(mut self, jobs: NonZeroUsize) -> Self {
        self.jobs = jobs;
        self
    }

    #[must_use]
    pub fn with_event_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.event_log = Some(path.into());
        self
    }

    /// Locator for this configuration's tokens.
    #[must_use]
    pub fn locator(&self) -> GoldLocator {
        GoldLocator::new(&self.gold_root, self.os_family.clone(), self.mode)
            .with_layout(self.layout)
            .with_legacy_fallback(self.legacy_fallback)
            .with_seed(self.hash_seed)
    }

    #[must_use]
    pub fn store(&self) -> GoldStore {
        GoldStore::new(self.candidate_policy)
    }
}

fn parse_token<T>(key: &'static str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| HarnessError::Config {
        key,
        value: value.to_string(),
        message: e.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(HarnessError::Config {
            key,
            value: value.to_string(),
            message: "expected a boolean".to_string(),
        }),
    }
}
