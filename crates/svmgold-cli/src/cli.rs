use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use svmgold_core::{CandidatePolicy, ExplorationMode, GoldLayout, HashSeed, OsFamily};
use svmgold_harness::HarnessConfig;

use crate::corpus::{
    CandidatesArgs, MigrateArgs, PromoteArgs, ScanArgs, run_candidates, run_migrate, run_promote,
    run_scan,
};
use crate::error::Result;
use crate::inspect::{ResolveArgs, ShowArgs, run_resolve, run_show};
use crate::logging;
use crate::run::{ListArgs, RunArgs, run_list, run_manifest};
use crate::table::{TableArgs, run_table};

#[derive(Debug, Parser)]
#[command(
    name = "svmgold",
    about = "Golden-master regression harness for symbolic exploration",
    version
)]
pub struct Cli {
    /// Log filter (EnvFilter syntax).
    #[arg(
        long,
        global = true,
        env = "SVMGOLD_LOG",
        default_value = logging::DEFAULT_FILTER
    )]
    pub log: String,

    /// Emit logs as JSON lines.
    #[arg(long = "log-json", global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Explore every method of a manifest and compare against gold files.
    Run(RunArgs),

    /// Print the gold paths and signature hash of a method.
    Resolve(ResolveArgs),

    /// Print the recorded value of a gold file.
    Show(ShowArgs),

    /// List pending gold candidates.
    Candidates(CandidatesArgs),

    /// Replace gold files with their candidates.
    Promote(PromoteArgs),

    /// Classify every gold file by layout.
    Scan(ScanArgs),

    /// Copy a mode-directory corpus into the OS-qualified layout.
    Migrate(MigrateArgs),

    /// Tabulate solver results against the human reference.
    Table(TableArgs),

    /// Print the built-in fixture registry.
    List(ListArgs),
}

/// Gold corpus selection shared by most commands. Unset flags fall back to
/// the `SVMGOLD_*` environment, then to defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct GoldArgs {
    /// Directory containing `Golds/`.
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Exploration mode (`smart-unrolling` or `never-unroll`).
    #[arg(long)]
    pub mode: Option<ExplorationMode>,

    /// OS-family token used in gold file names (`Unix`, `Win32NT`).
    #[arg(long)]
    pub os: Option<OsFamily>,

    /// Canonical layout (`os-qualified` or `mode-directory`).
    #[arg(long)]
    pub layout: Option<GoldLayout>,

    /// Hash seed (`zero`, `parameter-count`, `name-length`).
    #[arg(long = "hash-seed")]
    pub hash_seed: Option<HashSeed>,

    /// Do not read gold files from the non-canonical layout.
    #[arg(long = "no-legacy-fallback")]
    pub no_legacy_fallback: bool,

    /// Candidate policy (`suffixed` or `in-place`).
    #[arg(long)]
    pub candidate: Option<CandidatePolicy>,
}

impl GoldArgs {
    /// Environment configuration with these flags applied on top.
    pub fn config(&self) -> Result<HarnessConfig> {
        Ok(self.apply(HarnessConfig::from_env()?))
    }

    pub fn apply(&self, mut config: HarnessConfig) -> HarnessConfig {
        if let Some(root) = &self.root {
            config.gold_root = root.clone();
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(os) = &self.os {
            config.os_family = os.clone();
        }
        if let Some(layout) = self.layout {
            config.layout = layout;
        }
        if let Some(seed) = self.hash_seed {
            config.hash_seed = seed;
        }
        if self.no_legacy_fallback {
            config.legacy_fallback = false;
        }
        if let Some(policy) = self.candidate {
            config.candidate_policy = policy;
        }
        config
    }
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    logging::init(&cli.log, cli.log_json);
    match cli.command {
        Commands::Run(args) => run_manifest(args),
        Commands::Resolve(args) => run_resolve(args),
        Commands::Show(args) => run_show(args),
        Commands::Candidates(args) => run_candidates(args),
        Commands::Promote(args) => run_promote(args),
        Commands::Scan(args) => run_scan(args),
        Commands::Migrate(args) => run_migrate(args),
        Commands::Table(args) => run_table(args),
        Commands::List(args) => run_list(args),
    }
}
