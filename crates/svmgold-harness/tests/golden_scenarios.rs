#![forbid(unsafe_code)]

//! End-to-end gold comparison scenarios.
//!
//! Covers:
//! - missing gold: Failed, "no gold file" message, exactly one candidate
//! - matching gold: Succeeded, no file written
//! - differing gold: Failed with EXPECTED/GOT lines
//! - legacy mode-directory gold read through fallback
//! - in-place candidate policy
//! - candidate write failure is loud
//!
//! Run:
//!   cargo test -p svmgold-harness --test golden_scenarios

use std::fs;
use std::path::{Path, PathBuf};

use svmgold_core::store::{GoldEntry, write_gold};
use svmgold_core::{
    CandidatePolicy, ExplorationMode, GoldKey, GoldLayout, HashSeed, MethodDescriptor, OsFamily,
};
use svmgold_harness::{
    Explorer, Fault, HarnessConfig, HostOutcome, MethodState, Orchestrator, RegisteredMethod,
};

struct Constant(&'static str);

impl Explorer for Constant {
    fn explore(&self, _: &MethodDescriptor, _: ExplorationMode) -> Result<String, Fault> {
        Ok(self.0.to_string())
    }
}

fn bar() -> MethodDescriptor {
    MethodDescriptor::new("Demo.Foo", "Bar", ["Int32"], "Int32")
}

fn config(root: &Path) -> HarnessConfig {
    HarnessConfig::default()
        .with_gold_root(root)
        .with_os_family(OsFamily::UNIX.parse().unwrap())
        .with_mode(ExplorationMode::SmartUnrolling)
}

fn all_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}

#[test]
fn missing_gold_fails_and_writes_one_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let orch = Orchestrator::from_config(&config(dir.path()));
    let report = orch.execute(&RegisteredMethod::new(bar()), &Constant("42"));

    assert_eq!(
        report.transitions,
        [MethodState::Pending, MethodState::Running, MethodState::Failed]
    );
    let HostOutcome::Failure { message } = &report.outcome else {
        panic!("expected failure, got {:?}", report.outcome);
    };
    assert!(message.contains("no gold file"), "{message}");
    assert!(message.starts_with("// Explored in SmartUnrolling mode\n"));
    assert!(message.ends_with("GOT: 42"));

    let files = all_files(dir.path());
    assert_eq!(files.len(), 1, "{files:?}");
    let candidate = report.candidate.clone().unwrap();
    assert_eq!(files[0], candidate);
    assert!(candidate.to_string_lossy().ends_with(".gold.tmp"));
    let content = fs::read_to_string(&candidate).unwrap();
    assert!(content.contains("Bar(Int32)\nRESULT: 42"), "{content}");
    assert!(content.starts_with("METHOD: Int32 Demo.Foo.Bar(Int32)"));
}

#[test]
fn matching_gold_succeeds_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let orch = Orchestrator::from_config(&config(dir.path()));
    let gold = orch.locator().canonical_path(&bar()).unwrap();
    write_gold(&gold, &GoldEntry::new(bar().signature_text(), "42")).unwrap();
    let before = fs::read_to_string(&gold).unwrap();

    let report = orch.execute(&RegisteredMethod::new(bar()), &Constant("42"));
    assert_eq!(report.state(), MethodState::Succeeded);
    assert_eq!(all_files(dir.path()), vec![gold.clone()]);
    assert_eq!(fs::read_to_string(&gold).unwrap(), before);
}

#[test]
fn differing_gold_reports_expected_and_got() {
    let dir = tempfile::tempdir().unwrap();
    let orch = Orchestrator::from_config(&config(dir.path()));
    let gold = orch.locator().canonical_path(&bar()).unwrap();
    write_gold(&gold, &GoldEntry::new(bar().signature_text(), "41")).unwrap();

    let report = orch.execute(&RegisteredMethod::new(bar()), &Constant("42"));
    assert_eq!(report.state(), MethodState::Failed);
    let message = report.outcome.text();
    assert!(message.contains("EXPECTED: 41"), "{message}");
    assert!(message.contains("GOT: 42"), "{message}");
    assert!(message.contains("METHOD: Int32 Demo.Foo.Bar(Int32)"));

    // Gold untouched; candidate alongside.
    assert_eq!(
        svmgold_core::store::load_gold(&gold).unwrap().as_deref(),
        Some("41")
    );
    let candidate = report.candidate.unwrap();
    assert_eq!(
        svmgold_core::store::load_gold(&candidate).unwrap().as_deref(),
        Some("42")
    );
    assert_eq!(all_files(dir.path()).len(), 2);
}

#[test]
fn legacy_layout_is_read_through_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let unix: OsFamily = OsFamily::UNIX.parse().unwrap();
    let key = GoldKey::derive(
        &bar(),
        &unix,
        ExplorationMode::SmartUnrolling,
        HashSeed::default(),
    )
    .unwrap();
    let legacy = key.path_under(dir.path(), GoldLayout::ModeDirectory);
    assert!(legacy.starts_with(dir.path().join("Golds").join("SmartUnrolling")));
    write_gold(&legacy, &GoldEntry::new(bar().signature_text(), "42")).unwrap();

    let orch = Orchestrator::from_config(&config(dir.path()));
    let report = orch.execute(&RegisteredMethod::new(bar()), &Constant("42"));
    assert_eq!(report.state(), MethodState::Succeeded);
    assert!(report.legacy_gold);
    assert_eq!(report.gold_path.as_deref(), Some(legacy.as_path()));

    // Without fallback the legacy file is invisible.
    let strict = Orchestrator::from_config(&config(dir.path()).with_legacy_fallback(false));
    let report = strict.execute(&RegisteredMethod::new(bar()), &Constant("42"));
    assert_eq!(report.state(), MethodState::Failed);
    let candidate = report.candidate.unwrap();
    assert_eq!(
        candidate,
        key.path_under(dir.path(), GoldLayout::OsQualified)
            .with_extension("gold.tmp")
    );
}

#[test]
fn in_place_policy_overwrites_gold() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path()).with_candidate_policy(CandidatePolicy::InPlace);
    let orch = Orchestrator::from_config(&cfg);
    let gold = orch.locator().canonical_path(&bar()).unwrap();
    write_gold(&gold, &GoldEntry::new(bar().signature_text(), "41")).unwrap();

    let report = orch.execute(&RegisteredMethod::new(bar()), &Constant("42"));
    assert_eq!(report.state(), MethodState::Failed);
    assert_eq!(report.candidate.as_deref(), Some(gold.as_path()));
    assert_eq!(
        svmgold_core::store::load_gold(&gold).unwrap().as_deref(),
        Some("42")
    );
}

#[test]
fn never_unroll_uses_its_own_gold() {
    let dir = tempfile::tempdir().unwrap();
    let smart = Orchestrator::from_config(&config(dir.path()));
    let never =
        Orchestrator::from_config(&config(dir.path()).with_mode(ExplorationMode::NeverUnroll));
    let smart_gold = smart.locator().canonical_path(&bar()).unwrap();
    write_gold(&smart_gold, &GoldEntry::new(bar().signature_text(), "42")).unwrap();

    // Layout B keys by OS, not mode: both modes share the canonical file.
    let report = never.execute(&RegisteredMethod::new(bar()), &Constant("42"));
    assert_eq!(report.state(), MethodState::Succeeded);
    assert_eq!(report.outcome.text(), "// Explored in NeverUnroll mode\n");

    // Layout A partitions by mode.
    let mode_dir = |mode| {
        Orchestrator::from_config(
            &config(dir.path())
                .with_mode(mode)
                .with_layout(GoldLayout::ModeDirectory)
                .with_legacy_fallback(false),
        )
    };
    let a_smart = mode_dir(ExplorationMode::SmartUnrolling)
        .locator()
        .canonical_path(&bar())
        .unwrap();
    let a_never = mode_dir(ExplorationMode::NeverUnroll)
        .locator()
        .canonical_path(&bar())
        .unwrap();
    assert_ne!(a_smart, a_never);
}

#[cfg(unix)]
#[test]
fn candidate_write_failure_fails_loudly() {
    let dir = tempfile::tempdir().unwrap();
    // A file where the Golds directory should be makes parent creation fail.
    fs::write(dir.path().join("Golds"), "not a directory").unwrap();
    let orch = Orchestrator::from_config(&config(dir.path()));
    let report = orch.execute(&RegisteredMethod::new(bar()), &Constant("42"));
    assert_eq!(report.state(), MethodState::Failed);
    assert!(report.candidate.is_none());
    let message = report.outcome.text();
    assert!(message.contains("There is no gold file"), "{message}");
    assert!(message.contains("Golds"), "{message}");
}
