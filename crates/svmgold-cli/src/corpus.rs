use std::path::PathBuf;

use clap::Args;
use svmgold_core::corpus::{CorpusScan, apply_migration, plan_migration, scan_corpus};
use svmgold_core::{GoldLayout, GoldStore};
use svmgold_harness::HarnessConfig;

use crate::cli::GoldArgs;
use crate::error::{CliError, Result};

#[derive(Debug, Clone, Args)]
pub struct CandidatesArgs {
    #[command(flatten)]
    pub gold: GoldArgs,
}

#[derive(Debug, Clone, Args)]
pub struct PromoteArgs {
    /// Candidate files to promote.
    pub paths: Vec<PathBuf>,

    /// Promote every candidate under the gold root.
    #[arg(long, conflicts_with = "paths")]
    pub all: bool,

    #[command(flatten)]
    pub gold: GoldArgs,
}

#[derive(Debug, Clone, Args)]
pub struct ScanArgs {
    /// Print every file, not just the totals.
    #[arg(long)]
    pub verbose: bool,

    #[command(flatten)]
    pub gold: GoldArgs,
}

#[derive(Debug, Clone, Args)]
pub struct MigrateArgs {
    /// Write the planned copies. Without it the plan is only printed.
    #[arg(long)]
    pub apply: bool,

    #[command(flatten)]
    pub gold: GoldArgs,
}

pub fn run_candidates(args: CandidatesArgs) -> Result<()> {
    let config = args.gold.config()?;
    let scan = scan_corpus(&config.gold_root)?;
    for candidate in &scan.candidates {
        println!("{}", candidate.display());
    }
    Ok(())
}

pub fn run_promote(args: PromoteArgs) -> Result<()> {
    let config = args.gold.config()?;
    promote(args, &config)
}

/// Promote the named candidates, or every candidate under the gold root.
pub fn promote(args: PromoteArgs, config: &HarnessConfig) -> Result<()> {
    let targets: Vec<PathBuf> = if args.all {
        scan_corpus(&config.gold_root)?
            .candidates
            .into_iter()
            .map(|relative| config.gold_root.join(relative))
            .collect()
    } else if args.paths.is_empty() {
        return Err(CliError::invalid("pass candidate paths or --all"));
    } else {
        args.paths
    };

    // Promotion is always a rename of a suffixed candidate.
    let store = GoldStore::default();
    for candidate in &targets {
        let gold = store.promote(candidate)?;
        println!("promoted {}", gold.display());
    }
    Ok(())
}

/// Totals line plus, when `verbose`, one line per file.
pub fn render_scan(scan: &CorpusScan, verbose: bool) -> String {
    let mut out = format!(
        "{}: {}\n{}: {}\ncandidates: {}\nunrecognised: {}\n",
        GoldLayout::OsQualified.as_str(),
        scan.count_in(GoldLayout::OsQualified),
        GoldLayout::ModeDirectory.as_str(),
        scan.count_in(GoldLayout::ModeDirectory),
        scan.candidates.len(),
        scan.golds.iter().filter(|g| g.detected.is_none()).count() + scan.other.len(),
    );
    if verbose {
        for file in &scan.golds {
            let kind = file
                .detected
                .as_ref()
                .map_or("unrecognised", |d| d.layout.as_str());
            out.push_str(&format!("{kind}\t{}\n", file.relative.display()));
        }
        for path in &scan.candidates {
            out.push_str(&format!("candidate\t{}\n", path.display()));
        }
        for path in &scan.other {
            out.push_str(&format!("unrecognised\t{}\n", path.display()));
        }
    }
    out
}

pub fn run_scan(args: ScanArgs) -> Result<()> {
    let config = args.gold.config()?;
    let scan = scan_corpus(&config.gold_root)?;
    print!("{}", render_scan(&scan, args.verbose));
    Ok(())
}

pub fn run_migrate(args: MigrateArgs) -> Result<()> {
    let config = args.gold.config()?;
    migrate(args.apply, &config)
}

/// Print the migration plan for `config`, writing it when `apply` is set.
pub fn migrate(apply: bool, config: &HarnessConfig) -> Result<()> {
    let steps = plan_migration(&config.gold_root, config.mode, &config.os_family)?;
    for step in &steps {
        let marker = if step.conflict { "exists" } else { "copy" };
        println!("{marker}\t{} -> {}", step.from.display(), step.to.display());
    }
    if apply {
        let applied = apply_migration(&steps)?;
        println!("migrated {applied} of {} gold files", steps.len());
    } else {
        println!("{} gold files planned; rerun with --apply to write", steps.len());
    }
    Ok(())
}
