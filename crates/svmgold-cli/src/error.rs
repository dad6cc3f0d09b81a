use std::path::PathBuf;

use svmgold_core::GoldError;
use svmgold_harness::HarnessError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

/// Exit code for runs with failing tests or missing values.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for bad arguments or configuration.
pub const EXIT_USAGE: i32 = 2;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Harness(#[from] HarnessError),

    #[error(transparent)]
    Gold(#[from] GoldError),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("{message}")]
    Exit { code: i32, message: String },
}

impl CliError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exit { code, .. } => *code,
            Self::InvalidArgument { .. } | Self::Harness(HarnessError::Config { .. }) => EXIT_USAGE,
            Self::Gold(GoldError::UnknownToken { .. }) => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }

    #[must_use]
    pub fn exit(code: i32, message: impl Into<String>) -> Self {
        Self::Exit {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
