//! Gold path resolution and layout detection.
//!
//! Two on-disk layouts exist:
//!
//! ```text
//! OsQualified   Golds/<Type/segments>/<Method>.<OsFamily>.<hash>.gold
//! ModeDirectory Golds/<Mode>/<Type/segments>/<Method>.<hash>.gold
//! ```
//!
//! Resolution is pure: nothing here touches the filesystem except
//! [`GoldLocator::locate`], which only probes for existence.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::MethodDescriptor;
use crate::error::{GoldError, Result};
use crate::mode::{ExplorationMode, OsFamily};
use crate::signature::{HashSeed, SignatureHash, descriptor_hash};

/// Directory holding the gold corpus under a base directory.
pub const GOLDS_DIR: &str = "Golds";
/// Extension of checked-in gold files.
pub const GOLD_EXTENSION: &str = "gold";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoldLayout {
    /// OS token in the file name, no mode directory.
    #[default]
    OsQualified,
    /// Mode directory before the type segments, no OS token.
    ModeDirectory,
}

impl GoldLayout {
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::OsQualified => Self::ModeDirectory,
            Self::ModeDirectory => Self::OsQualified,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OsQualified => "os-qualified",
            Self::ModeDirectory => "mode-directory",
        }
    }

    /// Classify a gold file path by shape.
    ///
    /// `path` may be relative to the `Golds` directory or start with it.
    /// Returns `None` for anything that is not a `.gold` file in either
    /// layout.
    #[must_use]
    pub fn detect(path: &Path) -> Option<DetectedGold> {
        let mut parts: Vec<String> = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(os) => parts.push(os.to_str()?.to_string()),
                Component::CurDir => {}
                _ => return None,
            }
        }
        if parts.first().is_some_and(|p| p == GOLDS_DIR) {
            parts.remove(0);
        }
        let file_name = parts.pop()?;
        let stem = file_name.strip_suffix(&format!(".{GOLD_EXTENSION}"))?;
        // Method names may contain dots (`.ctor`, explicit interface
        // implementations), so tokens are peeled off the right.
        let (head, hash) = stem.rsplit_once('.')?;
        let hash = hash.parse::<SignatureHash>().ok()?;

        let mode = parts
            .first()
            .and_then(|dir| ExplorationMode::ALL.into_iter().find(|m| m.as_str() == dir.as_str()));
        match mode {
            Some(mode) if parts.len() >= 2 && !head.is_empty() => {
                parts.remove(0);
                Some(DetectedGold {
                    layout: Self::ModeDirectory,
                    mode: Some(mode),
                    os_family: None,
                    type_segments: parts,
                    method: head.to_string(),
                    hash,
                })
            }
            Some(_) => None,
            None => {
                let (method, os) = head.rsplit_once('.')?;
                if method.is_empty() || parts.is_empty() {
                    return None;
                }
                let os_family = os.parse::<OsFamily>().ok()?;
                Some(DetectedGold {
                    layout: Self::OsQualified,
                    mode: None,
                    os_family: Some(os_family),
                    type_segments: parts,
                    method: method.to_string(),
                    hash,
                })
            }
        }
    }
}

impl fmt::Display for GoldLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoldLayout {
    type Err = GoldError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "os-qualified" | "os" | "b" => Ok(Self::OsQualified),
            "mode-directory" | "mode" | "a" => Ok(Self::ModeDirectory),
            _ => Err(GoldError::UnknownToken {
                what: "gold layout",
                value: s.to_string(),
            }),
        }
    }
}

/// Everything needed to name a gold file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GoldKey {
    pub type_segments: Vec<String>,
    pub method: String,
    pub os_family: OsFamily,
    pub mode: ExplorationMode,
    pub hash: SignatureHash,
}

impl GoldKey {
    /// Build the key for `descriptor`, failing with
    /// [`GoldError::DescriptorUnresolved`] when the type or method name is
    /// unusable as a path. Dots are allowed in the method name.
    pub fn derive(
        descriptor: &MethodDescriptor,
        os_family: &OsFamily,
        mode: ExplorationMode,
        seed: HashSeed,
    ) -> Result<Self> {
        Self::with_hash(
            descriptor,
            os_family,
            mode,
            descriptor_hash(descriptor, seed),
        )
    }

    /// Same as [`GoldKey::derive`] with a precomputed hash.
    pub fn with_hash(
        descriptor: &MethodDescriptor,
        os_family: &OsFamily,
        mode: ExplorationMode,
        hash: SignatureHash,
    ) -> Result<Self> {
        let Some(segments) = descriptor.type_segments() else {
            return Err(GoldError::unresolved(
                descriptor.qualified_name(),
                "declaring type name is empty or malformed",
            ));
        };
        if segments.iter().any(|s| !is_path_safe(s)) {
            return Err(GoldError::unresolved(
                descriptor.qualified_name(),
                "declaring type name contains path separators",
            ));
        }
        let method = descriptor.method.trim();
        if !is_path_safe(method) {
            return Err(GoldError::unresolved(
                descriptor.qualified_name(),
                "method name is empty or not usable as a file name",
            ));
        }
        Ok(Self {
            type_segments: segments.into_iter().map(str::to_string).collect(),
            method: method.to_string(),
            os_family: os_family.clone(),
            mode,
            hash,
        })
    }

    #[must_use]
    pub fn file_name(&self, layout: GoldLayout) -> String {
        match layout {
            GoldLayout::OsQualified => format!(
                "{}.{}.{}.{GOLD_EXTENSION}",
                self.method, self.os_family, self.hash
            ),
            GoldLayout::ModeDirectory => {
                format!("{}.{}.{GOLD_EXTENSION}", self.method, self.hash)
            }
        }
    }

    /// Path relative to the base directory, starting with `Golds`.
    #[must_use]
    pub fn relative_path(&self, layout: GoldLayout) -> PathBuf {
        let mut path = PathBuf::from(GOLDS_DIR);
        if layout == GoldLayout::ModeDirectory {
            path.push(self.mode.as_str());
        }
        for segment in &self.type_segments {
            path.push(segment);
        }
        path.push(self.file_name(layout));
        path
    }

    #[must_use]
    pub fn path_under(&self, base_directory: &Path, layout: GoldLayout) -> PathBuf {
        base_directory.join(self.relative_path(layout))
    }
}

fn is_path_safe(s: &str) -> bool {
    !s.is_empty() && !s.contains(['/', '\\']) && s != "." && s != ".."
}

/// Resolve the gold path for a descriptor in one layout.
pub fn resolve(
    base_directory: &Path,
    descriptor: &MethodDescriptor,
    os_family: &OsFamily,
    mode: ExplorationMode,
    hash: SignatureHash,
    layout: GoldLayout,
) -> Result<PathBuf> {
    let key = GoldKey::with_hash(descriptor, os_family, mode, hash)?;
    Ok(key.path_under(base_directory, layout))
}

/// A gold file recognised by [`GoldLayout::detect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedGold {
    pub layout: GoldLayout,
    /// Present for the mode-directory layout.
    pub mode: Option<ExplorationMode>,
    /// Present for the OS-qualified layout.
    pub os_family: Option<OsFamily>,
    pub type_segments: Vec<String>,
    pub method: String,
    pub hash: SignatureHash,
}

impl DetectedGold {
    /// Dotted declaring-type name.
    #[must_use]
    pub fn type_name(&self) -> String {
        self.type_segments.join(".")
    }

    /// Complete the key with whichever token the layout does not encode.
    #[must_use]
    pub fn into_key(self, os_family: &OsFamily, mode: ExplorationMode) -> GoldKey {
        GoldKey {
            type_segments: self.type_segments,
            method: self.method,
            os_family: self.os_family.unwrap_or_else(|| os_family.clone()),
            mode: self.mode.unwrap_or(mode),
            hash: self.hash,
        }
    }
}

/// Where a method's gold value lives and where it should be read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldLocation {
    pub key: GoldKey,
    /// Path in the canonical layout; candidates are written relative to it.
    pub canonical: PathBuf,
    /// Existing file to read, if any (canonical first, then legacy).
    pub existing: Option<PathBuf>,
}

impl GoldLocation {
    /// Path to load from; the canonical path when nothing exists yet.
    #[must_use]
    pub fn read_path(&self) -> &Path {
        self.existing.as_deref().unwrap_or(&self.canonical)
    }

    /// True when the value was found only in the non-canonical layout.
    #[must_use]
    pub fn is_legacy(&self) -> bool {
        self.existing
            .as_deref()
            .is_some_and(|existing| existing != self.canonical.as_path())
    }
}

/// Resolves descriptors against a gold root using one canonical layout with
/// optional read-side fallback to the other.
#[derive(Debug, Clone)]
pub struct GoldLocator {
    base_directory: PathBuf,
    layout: GoldLayout,
    legacy_fallback: bool,
    os_family: OsFamily,
    mode: ExplorationMode,
    seed: HashSeed,
}

impl GoldLocator {
    pub fn new(
        base_directory: impl Into<PathBuf>,
        os_family: OsFamily,
        mode: ExplorationMode,
    ) -> Self {
        Self {
            base_directory: base_directory.into(),
            layout: GoldLayout::default(),
            legacy_fallback: true,
            os_family,
            mode,
            seed: HashSeed::default(),
        }
    }

    #[must_use]
    pub fn with_layout(mut self, layout: GoldLayout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn with_legacy_fallback(mut self, enabled: bool) -> Self {
        self.legacy_fallback = enabled;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: HashSeed) -> Self {
        self.seed = seed;
        self
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn layout(&self) -> GoldLayout {
        self.layout
    }

    pub fn mode(&self) -> ExplorationMode {
        self.mode
    }

    pub fn os_family(&self) -> &OsFamily {
        &self.os_family
    }

    pub fn seed(&self) -> HashSeed {
        self.seed
    }

    /// Key for `descriptor` under this locator's tokens.
    pub fn key(&self, descriptor: &MethodDescriptor) -> Result<GoldKey> {
        GoldKey::derive(descriptor, &self.os_family, self.mode, self.seed)
    }

    /// Canonical path without probing the filesystem.
    pub fn canonical_path(&self, descriptor: &MethodDescriptor) -> Result<PathBuf> {
        Ok(self.key(descriptor)?.path_under(&self.base_directory, self.layout))
    }

    /// Resolve and probe for an existing gold file.
    pub fn locate(&self, descriptor: &MethodDescriptor) -> Result<GoldLocation> {
        let key = self.key(descriptor)?;
        let canonical = key.path_under(&self.base_directory, self.layout);
        let existing = if canonical.is_file() {
            Some(canonical.clone())
        } else if self.legacy_fallback {
            let legacy = key.path_under(&self.base_directory, self.layout.other());
            legacy.is_file().then_some(legacy)
        } else {
            None
        };
        debug!(
            method = %descriptor.qualified_name(),
            canonical = %canonical.display(),
            existing = ?existing.as_ref().map(|p| p.display().to_string()),
            "resolved gold location"
        );
        Ok(GoldLocation {
            key,
            canonical,
            existing,
        })
    }
}
