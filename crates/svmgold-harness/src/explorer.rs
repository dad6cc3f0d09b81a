//! Boundary to the symbolic-execution engine.
//!
//! The harness needs one operation from the engine: explore a method and
//! return a canonical string describing every discovered outcome. Failures
//! come back as a [`Fault`] carrying the engine's exception kind, message and
//! stack so they can be grouped in run statistics.

use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use serde::Serialize;
use svmgold_core::{ExplorationMode, MethodDescriptor};
use tracing::debug;

/// Location reported when a fault has no stack frames.
pub const UNKNOWN_LOCATION: &str = "<unknown location>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    /// `Type.method` of the frame.
    pub method: String,
    pub line: Option<u32>,
}

impl StackFrame {
    pub fn new(method: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            method: method.into(),
            line,
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} at line {line}", self.method),
            None => f.write_str(&self.method),
        }
    }
}

/// An exploration that did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fault {
    /// Category name, e.g. `InvalidOperationException` or `Panic`.
    pub kind: String,
    pub message: String,
    /// Innermost frame first.
    pub frames: Vec<StackFrame>,
}

impl Fault {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            frames: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_frame(mut self, frame: StackFrame) -> Self {
        self.frames.push(frame);
        self
    }

    /// Grouping location: the first frame, or [`UNKNOWN_LOCATION`].
    #[must_use]
    pub fn location(&self) -> String {
        self.frames
            .first()
            .map_or_else(|| UNKNOWN_LOCATION.to_string(), ToString::to_string)
    }

    /// Convert a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::new("Panic", message)
    }

    /// Parse an engine's stderr report.
    ///
    /// The first non-empty line is `Kind: message` (a line without a colon is
    /// taken as the message of an `EngineError`). Following lines of the form
    /// `at Type.method:line` or `at Type.method` become frames.
    #[must_use]
    pub fn parse_report(report: &str) -> Self {
        let mut lines = report.lines().map(str::trim).filter(|l| !l.is_empty());
        let mut fault = match lines.next() {
            Some(first) => match first.split_once(": ") {
                Some((kind, message)) if is_kind_token(kind) => Self::new(kind, message),
                _ => Self::new("EngineError", first),
            },
            None => Self::new("EngineError", "engine exited without a report"),
        };
        for line in lines {
            let Some(frame) = line.strip_prefix("at ") else {
                continue;
            };
            let frame = frame.trim();
            let parsed = match frame.rsplit_once(':') {
                Some((method, line)) => match line.trim().parse::<u32>() {
                    Ok(n) => StackFrame::new(method.trim(), Some(n)),
                    Err(_) => StackFrame::new(frame, None),
                },
                None => StackFrame::new(frame, None),
            };
            fault.frames.push(parsed);
        }
        fault
    }
}

fn is_kind_token(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '`'))
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(frame) = self.frames.first() {
            write!(f, " (at {frame})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Fault {}

/// The exploration engine.
///
/// Implementations must be deterministic for a fixed engine configuration;
/// the harness never retries.
pub trait Explorer: Send + Sync {
    fn explore(&self, method: &MethodDescriptor, mode: ExplorationMode) -> Result<String, Fault>;
}

/// Adapter for closures.
pub struct FnExplorer<F>(pub F);

impl<F> Explorer for FnExplorer<F>
where
    F: Fn(&MethodDescriptor, ExplorationMode) -> Result<String, Fault> + Send + Sync,
{
    fn explore(&self, method: &MethodDescriptor, mode: ExplorationMode) -> Result<String, Fault> {
        (self.0)(method, mode)
    }
}

/// Runs an external engine process per method.
///
/// The descriptor is passed as arguments after any fixed ones:
///
/// ```text
/// <program> <args...> --mode <Mode> --type <T> --method <M> [--param <P>]... --return <R>
/// ```
///
/// Trimmed stdout is the exploration result. A non-zero exit status is a
/// fault parsed from stderr with [`Fault::parse_report`].
#[derive(Debug, Clone)]
pub struct CommandExplorer {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandExplorer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Full argument vector for one invocation.
    #[must_use]
    pub fn arguments(&self, method: &MethodDescriptor, mode: ExplorationMode) -> Vec<String> {
        let mut args = self.args.clone();
        args.extend([
            "--mode".to_string(),
            mode.as_str().to_string(),
            "--type".to_string(),
            method.type_name.clone(),
            "--method".to_string(),
            method.method.clone(),
        ]);
        for param in &method.parameters {
            args.push("--param".to_string());
            args.push(param.clone());
        }
        args.push("--return".to_string());
        args.push(method.return_type.clone());
        args
    }
}

impl Explorer for CommandExplorer {
    fn explore(&self, method: &MethodDescriptor, mode: ExplorationMode) -> Result<String, Fault> {
        let mut command = Command::new(&self.program);
        command.args(self.arguments(method, mode));
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        debug!(program = %self.program.display(), method = %method.qualified_name(), "spawning engine");
        let output = command.output().map_err(|e| {
            Fault::new(
                "SpawnError",
                format!("failed to run {}: {e}", self.program.display()),
            )
        })?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let mut fault = Fault::parse_report(&String::from_utf8_lossy(&output.stderr));
            if fault.kind == "EngineError" && fault.frames.is_empty() {
                fault.message = format!("{} ({})", fault.message, output.status);
            }
            Err(fault)
        }
    }
}
