use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GoldError {
    #[error("cannot derive a gold key for {descriptor}: {reason}")]
    DescriptorUnresolved { descriptor: String, reason: String },

    #[error("gold file {path} has content but no `RESULT: ` marker")]
    MalformedGold { path: PathBuf },

    #[error("{path} is not a gold candidate (expected a `.gold.tmp` file)")]
    NotACandidate { path: PathBuf },

    #[error("unknown {what} token `{value}`")]
    UnknownToken { what: &'static str, value: String },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GoldError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn unresolved(descriptor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DescriptorUnresolved {
            descriptor: descriptor.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that mean "no gold value can exist for this method".
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::DescriptorUnresolved { .. })
    }
}

pub type Result<T> = std::result::Result<T, GoldError>;
