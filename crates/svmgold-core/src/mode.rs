//! Environment tokens that partition the gold corpus.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GoldError;

/// How the engine unrolls recursive and looping constructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExplorationMode {
    SmartUnrolling,
    NeverUnroll,
}

impl ExplorationMode {
    pub const ALL: [Self; 2] = [Self::SmartUnrolling, Self::NeverUnroll];

    /// Directory / annotation token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SmartUnrolling => "SmartUnrolling",
            Self::NeverUnroll => "NeverUnroll",
        }
    }
}

impl fmt::Display for ExplorationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExplorationMode {
    type Err = GoldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "smartunrolling" | "smart" => Ok(Self::SmartUnrolling),
            "neverunroll" | "never" => Ok(Self::NeverUnroll),
            _ => Err(GoldError::UnknownToken {
                what: "exploration mode",
                value: s.to_string(),
            }),
        }
    }
}

/// Operating-system family token embedded in gold file names.
///
/// Tokens follow the platform names the recorded corpus was produced with
/// (`Unix`, `Win32NT`), but any non-empty token without dots or path
/// separators is accepted so corpora from other hosts can be addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OsFamily(String);

impl OsFamily {
    pub const UNIX: &'static str = "Unix";
    pub const WINDOWS: &'static str = "Win32NT";

    /// Family of the running host.
    #[must_use]
    pub fn host() -> Self {
        if cfg!(windows) {
            Self(Self::WINDOWS.to_string())
        } else {
            Self(Self::UNIX.to_string())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OsFamily {
    type Err = GoldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.is_empty() || token.contains(['.', '/', '\\']) {
            return Err(GoldError::UnknownToken {
                what: "os family",
                value: s.to_string(),
            });
        }
        Ok(Self(token.to_string()))
    }
}
