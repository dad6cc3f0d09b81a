//! Per-method verdicts.
//!
//! Each registered method moves through a small state machine:
//!
//! ```text
//! Pending ──► Skipped
//!    │
//!    └──────► Running ──► Succeeded
//!                  └────► Failed
//! ```
//!
//! Only the failure path touches the filesystem (one candidate file). Faults
//! raised by the engine, including panics from in-process explorers, are
//! returned in the report so the run driver can aggregate them.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;

use serde::Serialize;
use svmgold_core::{ExplorationMode, GoldLocation, GoldLocator, GoldStore, MethodDescriptor};
use tracing::{debug, error, info, info_span, warn};

use crate::config::HarnessConfig;
use crate::explorer::{Explorer, Fault};
use crate::registry::RegisteredMethod;

/// Reason given to the host when a method does not accept the active mode.
pub const SKIP_REASON: &str = "Test doesn't match exploration options";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodState {
    Pending,
    Skipped,
    Running,
    Succeeded,
    Failed,
}

impl MethodState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Skipped | Self::Succeeded | Self::Failed)
    }

    /// Whether `self -> next` is an edge of the state machine.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Skipped | Self::Running)
                | (Self::Running, Self::Succeeded | Self::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Skipped => "skipped",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for MethodState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the host test framework is told.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HostOutcome {
    Success { annotation: String },
    Failure { message: String },
    Ignored { reason: String },
}

impl HostOutcome {
    /// The annotation, failure message or skip reason.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Success { annotation } => annotation,
            Self::Failure { message } => message,
            Self::Ignored { reason } => reason,
        }
    }
}

/// Everything known about one method after it reached a terminal state.
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub method: MethodDescriptor,
    pub mode: ExplorationMode,
    /// Visited states, `Pending` first.
    pub transitions: Vec<MethodState>,
    pub outcome: HostOutcome,
    pub observed: Option<String>,
    /// File the gold value was read from, or the canonical path when none.
    pub gold_path: Option<PathBuf>,
    pub candidate: Option<PathBuf>,
    pub fault: Option<Fault>,
    /// The gold value came from the non-canonical layout.
    pub legacy_gold: bool,
}

impl TestReport {
    fn pending(method: &MethodDescriptor, mode: ExplorationMode) -> Self {
        Self {
            method: method.clone(),
            mode,
            transitions: vec![MethodState::Pending],
            outcome: HostOutcome::Ignored {
                reason: String::new(),
            },
            observed: None,
            gold_path: None,
            candidate: None,
            fault: None,
            legacy_gold: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> MethodState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(MethodState::Pending)
    }

    fn advance(&mut self, next: MethodState) {
        debug_assert!(
            self.state().can_transition_to(next),
            "illegal transition {} -> {next}",
            self.state()
        );
        self.transitions.push(next);
    }

    fn finish(mut self, state: MethodState, outcome: HostOutcome) -> Self {
        self.advance(state);
        self.outcome = outcome;
        self
    }
}

/// `// Explored in <Mode> mode` plus a newline.
#[must_use]
pub fn mode_annotation(mode: ExplorationMode) -> String {
    format!("// Explored in {mode} mode\n")
}

/// Diff message for a missing gold value.
#[must_use]
pub fn missing_gold_message(signature: &str, observed: &str) -> String {
    format!("There is no gold file for {signature}!\nGOT: {observed}")
}

/// Diff message for a gold value that differs from the observation.
#[must_use]
pub fn mismatch_message(signature: &str, expected: &str, observed: &str) -> String {
    format!("METHOD: {signature}\nEXPECTED: {expected}\nGOT: {observed}")
}

/// Decides and reports the verdict for single methods.
#[derive(Debug)]
pub struct Orchestrator {
    locator: GoldLocator,
    store: GoldStore,
}

impl Orchestrator {
    pub fn new(locator: GoldLocator, store: GoldStore) -> Self {
        Self { locator, store }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.locator(), config.store())
    }

    pub fn mode(&self) -> ExplorationMode {
        self.locator.mode()
    }

    pub fn locator(&self) -> &GoldLocator {
        &self.locator
    }

    pub fn store(&self) -> &GoldStore {
        &self.store
    }

    /// Drive `method` to a terminal state.
    pub fn execute(&self, method: &RegisteredMethod, explorer: &dyn Explorer) -> TestReport {
        let descriptor = &method.descriptor;
        let mode = self.mode();
        let _span = info_span!(
            "svmgold.method",
            type_name = %descriptor.type_name,
            method = %descriptor.method,
            mode = %mode
        )
        .entered();

        let mut report = TestReport::pending(descriptor, mode);
        if !method.accepts(mode) {
            debug!("method does not accept the active mode");
            return report.finish(
                MethodState::Skipped,
                HostOutcome::Ignored {
                    reason: SKIP_REASON.to_string(),
                },
            );
        }
        report.advance(MethodState::Running);
        let annotation = mode_annotation(mode);
        let signature = descriptor.signature_text();

        let location = match self.locator.locate(descriptor) {
            Ok(location) => Some(location),
            Err(err) if err.is_unresolved() => {
                warn!(%err, "no gold key; treating as missing gold");
                None
            }
            Err(err) => return fail(report, &annotation, err.to_string()),
        };
        if let Some(location) = &location {
            report.gold_path = Some(location.read_path().to_path_buf());
            report.legacy_gold = location.is_legacy();
        }

        let existing = location.as_ref().and_then(|l| l.existing.as_deref());
        let gold = match existing {
            Some(path) => match self.store.load(path) {
                Ok(gold) => gold,
                Err(err) => {
                    error!(%err, "unreadable gold file");
                    return fail(report, &annotation, err.to_string());
                }
            },
            None => None,
        };

        let explored = catch_unwind(AssertUnwindSafe(|| explorer.explore(descriptor, mode)))
            .unwrap_or_else(|payload| Err(Fault::from_panic(payload.as_ref())));
        let observed = match explored {
            Ok(observed) => observed,
            Err(fault) => {
                warn!(kind = %fault.kind, location = %fault.location(), "exploration failed");
                let message = fault.to_string();
                report.fault = Some(fault);
                return fail(report, &annotation, message);
            }
        };
        report.observed = Some(observed.clone());

        if gold.as_deref() == Some(observed.as_str()) {
            info!("matches gold");
            return report.finish(MethodState::Succeeded, HostOutcome::Success { annotation });
        }

        let diff = match &gold {
            Some(expected) => mismatch_message(&signature, expected, &observed),
            None => missing_gold_message(&signature, &observed),
        };
        warn!(has_gold = gold.is_some(), "gold mismatch");
        match location.as_ref().map(|l| self.write_candidate(l, &signature, &observed)) {
            Some(Ok(candidate)) => report.candidate = Some(candidate),
            Some(Err(err)) => {
                error!(%err, "failed to write gold candidate");
                return fail(report, &annotation, format!("{diff}\n{err}"));
            }
            None => {}
        }
        fail(report, &annotation, diff)
    }

    fn write_candidate(
        &self,
        location: &GoldLocation,
        signature: &str,
        observed: &str,
    ) -> svmgold_core::Result<PathBuf> {
        self.store
            .store_candidate(&location.canonical, signature, observed)
    }
}

fn fail(report: TestReport, annotation: &str, message: String) -> TestReport {
    report.finish(
        MethodState::Failed,
        HostOutcome::Failure {
            message: format!("{annotation}{message}"),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::FnExplorer;
    use std::fs;
    use svmgold_core::store::{GoldEntry, write_gold};
    use svmgold_core::{CandidatePolicy, OsFamily};
    use tempfile::tempdir;

    fn bar() -> MethodDescriptor {
        MethodDescriptor::new("Demo.Foo", "Bar", ["Int32"], "Int32")
    }

    fn orchestrator(root: &std::path::Path) -> Orchestrator {
        Orchestrator::new(
            GoldLocator::new(
                root,
                OsFamily::UNIX.parse().unwrap(),
                ExplorationMode::SmartUnrolling,
            ),
            GoldStore::new(CandidatePolicy::Suffixed),
        )
    }

    struct Constant(&'static str);

    impl Explorer for Constant {
        fn explore(&self, _: &MethodDescriptor, _: ExplorationMode) -> Result<String, Fault> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn transitions_follow_the_state_machine() {
        use MethodState::*;
        assert!(Pending.can_transition_to(Skipped));
        assert!(Pending.can_transition_to(Running));
        assert!(Running.can_transition_to(Succeeded));
        assert!(Running.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Succeeded));
        assert!(!Skipped.can_transition_to(Running));
        assert!(!Failed.can_transition_to(Running));
        assert!(Skipped.is_terminal() && !Running.is_terminal());
    }

    #[test]
    fn skipped_method_never_explores() {
        let dir = tempdir().unwrap();
        let method = RegisteredMethod::new(bar()).with_modes([ExplorationMode::NeverUnroll]);
        let explorer = FnExplorer(|_: &MethodDescriptor, _: ExplorationMode| -> Result<String, Fault> {
            panic!("must not explore")
        });
        let report = orchestrator(dir.path()).execute(&method, &explorer);
        assert_eq!(report.transitions, [MethodState::Pending, MethodState::Skipped]);
        assert_eq!(
            report.outcome,
            HostOutcome::Ignored {
                reason: SKIP_REASON.to_string()
            }
        );
    }

    #[test]
    fn success_carries_mode_annotation() {
        let dir = tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let gold = orch.locator().canonical_path(&bar()).unwrap();
        write_gold(&gold, &GoldEntry::new(bar().signature_text(), "42")).unwrap();

        let report = orch.execute(&RegisteredMethod::new(bar()), &Constant("42"));
        assert_eq!(report.state(), MethodState::Succeeded);
        assert_eq!(report.outcome.text(), "// Explored in SmartUnrolling mode\n");
        assert!(report.candidate.is_none());
    }

    #[test]
    fn fault_fails_and_is_reported() {
        let dir = tempdir().unwrap();
        let explorer =
            FnExplorer(|_: &MethodDescriptor, _: ExplorationMode| -> Result<String, Fault> {
                Err(Fault::new("InvalidOperation", "stuck"))
            });
        let report = orchestrator(dir.path()).execute(&RegisteredMethod::new(bar()), &explorer);
        assert_eq!(report.state(), MethodState::Failed);
        assert_eq!(report.fault.as_ref().unwrap().kind, "InvalidOperation");
        assert!(report.outcome.text().contains("InvalidOperation: stuck"));
        assert!(report.candidate.is_none());
    }

    #[test]
    fn panic_becomes_fault() {
        let dir = tempdir().unwrap();
        let explorer = FnExplorer(|_: &MethodDescriptor, _: ExplorationMode| -> Result<String, Fault> {
            panic!("engine bug")
        });
        let report = orchestrator(dir.path()).execute(&RegisteredMethod::new(bar()), &explorer);
        assert_eq!(report.state(), MethodState::Failed);
        let fault = report.fault.unwrap();
        assert_eq!(fault.kind, "Panic");
        assert_eq!(fault.message, "engine bug");
    }

    #[test]
    fn unresolved_descriptor_fails_without_candidate() {
        let dir = tempdir().unwrap();
        let anonymous = MethodDescriptor::new("", "Lambda", Vec::<String>::new(), "Int32");
        let report =
            orchestrator(dir.path()).execute(&RegisteredMethod::new(anonymous), &Constant("1"));
        assert_eq!(report.state(), MethodState::Failed);
        assert!(report.outcome.text().contains("There is no gold file for"));
        assert!(report.candidate.is_none());
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn constructor_mismatch_writes_a_candidate() {
        let dir = tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let ctor = MethodDescriptor::new("Demo.Foo", ".ctor", ["Int32"], "Int32");
        let report = orch.execute(&RegisteredMethod::new(ctor.clone()), &Constant("42"));
        assert_eq!(report.state(), MethodState::Failed);

        let candidate = report.candidate.expect("candidate for .ctor");
        let name = candidate.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".ctor.Unix."), "{name}");
        assert!(name.ends_with(".gold.tmp"), "{name}");
        assert_eq!(
            svmgold_core::store::load_gold(&candidate).unwrap().as_deref(),
            Some("42")
        );

        orch.store().promote(&candidate).unwrap();
        let report = orch.execute(&RegisteredMethod::new(ctor), &Constant("42"));
        assert_eq!(report.state(), MethodState::Succeeded);
    }

    #[test]
    fn malformed_gold_fails_before_exploring() {
        let dir = tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let gold = orch.locator().canonical_path(&bar()).unwrap();
        fs::create_dir_all(gold.parent().unwrap()).unwrap();
        fs::write(&gold, "METHOD: x\nno marker\n").unwrap();
        let explorer = FnExplorer(|_: &MethodDescriptor, _: ExplorationMode| -> Result<String, Fault> {
            panic!("must not explore")
        });
        let report = orch.execute(&RegisteredMethod::new(bar()), &explorer);
        assert_eq!(report.state(), MethodState::Failed);
        assert!(report.fault.is_none());
        assert!(report.outcome.text().contains("RESULT: "), "{}", report.outcome.text());
    }
}
