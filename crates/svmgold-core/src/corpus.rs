//! Whole-corpus views: scanning, pending candidates and layout migration.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{GoldError, Result};
use crate::layout::{DetectedGold, GOLDS_DIR, GoldLayout};
use crate::mode::{ExplorationMode, OsFamily};
use crate::store::{CANDIDATE_EXTENSION, read_gold, write_gold};

/// One file found under `Golds/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFile {
    /// Path relative to the base directory.
    pub relative: PathBuf,
    pub detected: Option<DetectedGold>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusScan {
    pub golds: Vec<CorpusFile>,
    pub candidates: Vec<PathBuf>,
    /// Files that are neither gold files nor candidates.
    pub other: Vec<PathBuf>,
}

impl CorpusScan {
    /// Count of recognised gold files in `layout`.
    #[must_use]
    pub fn count_in(&self, layout: GoldLayout) -> usize {
        self.golds
            .iter()
            .filter(|g| g.detected.as_ref().is_some_and(|d| d.layout == layout))
            .count()
    }
}

/// Walk `<base>/Golds` and classify every file. A missing `Golds` directory
/// is an empty corpus.
pub fn scan_corpus(base_directory: &Path) -> Result<CorpusScan> {
    let golds_dir = base_directory.join(GOLDS_DIR);
    let mut files = Vec::new();
    if golds_dir.is_dir() {
        collect_files(&golds_dir, &mut files)?;
    }
    files.sort();

    let candidate_suffix = format!(".{CANDIDATE_EXTENSION}");
    let mut scan = CorpusScan::default();
    for path in files {
        let relative = path
            .strip_prefix(base_directory)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.clone());
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name.ends_with(&candidate_suffix) {
            scan.candidates.push(relative);
        } else if name.ends_with(".gold") {
            let detected = GoldLayout::detect(&relative);
            scan.golds.push(CorpusFile { relative, detected });
        } else {
            scan.other.push(relative);
        }
    }
    Ok(scan)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(|e| GoldError::io(dir, e))? {
        let entry = entry.map_err(|e| GoldError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| GoldError::io(&path, e))?;
        if file_type.is_dir() {
            collect_files(&path, out)?;
        } else if file_type.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

/// One file move in a layout migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStep {
    pub from: PathBuf,
    pub to: PathBuf,
    /// The target already exists; the step is skipped on apply.
    pub conflict: bool,
}

/// Plan moving the mode-directory corpus for `mode` into the OS-qualified
/// layout for `os_family`. Nothing is written.
pub fn plan_migration(
    base_directory: &Path,
    mode: ExplorationMode,
    os_family: &OsFamily,
) -> Result<Vec<MigrationStep>> {
    let scan = scan_corpus(base_directory)?;
    let mut steps = Vec::new();
    for file in scan.golds {
        let Some(detected) = file.detected else {
            continue;
        };
        if detected.layout != GoldLayout::ModeDirectory || detected.mode != Some(mode) {
            continue;
        }
        let key = detected.into_key(os_family, mode);
        let to = key.path_under(base_directory, GoldLayout::OsQualified);
        steps.push(MigrationStep {
            conflict: to.exists(),
            from: base_directory.join(&file.relative),
            to,
        });
    }
    Ok(steps)
}

/// Copy each non-conflicting step's entry to its target. Sources are kept so
/// the other exploration mode (and older checkouts) still find them.
pub fn apply_migration(steps: &[MigrationStep]) -> Result<usize> {
    let mut applied = 0;
    for step in steps {
        if step.conflict {
            warn!(target = %step.to.display(), "migration target exists, skipping");
            continue;
        }
        let Some(entry) = read_gold(&step.from)? else {
            warn!(source = %step.from.display(), "empty gold file, skipping");
            continue;
        };
        write_gold(&step.to, &entry)?;
        applied += 1;
    }
    info!(applied, planned = steps.len(), "applied gold layout migration");
    Ok(applied)
}
