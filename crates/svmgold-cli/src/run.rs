use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Args;
use svmgold_harness::fixtures::builtin_registry;
use svmgold_harness::{CommandExplorer, MethodState, RunSession, RunSummary, TestRegistry};
use tracing::info;

use crate::cli::GoldArgs;
use crate::error::{CliError, EXIT_FAILURE, Result};

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Engine executable invoked once per method.
    #[arg(long)]
    pub engine: PathBuf,

    /// Extra argument passed to the engine before the method flags.
    #[arg(long = "arg", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    /// JSON manifest of test groups. Defaults to the built-in fixtures.
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Only run groups or methods whose name contains this text.
    #[arg(long)]
    pub filter: Option<String>,

    /// Worker threads.
    #[arg(long)]
    pub jobs: Option<NonZeroUsize>,

    /// Append JSONL run events to this file.
    #[arg(long = "event-log")]
    pub event_log: Option<PathBuf>,

    /// Write exception statistics as CSV here instead of a temp file.
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Print the run summary as JSON instead of text.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub gold: GoldArgs,
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    /// Print the registry as a JSON manifest.
    #[arg(long)]
    pub json: bool,
}

fn load_registry(args: &RunArgs) -> Result<TestRegistry> {
    let registry = match &args.manifest {
        Some(path) => TestRegistry::load_manifest(path)?,
        None => builtin_registry()?,
    };
    Ok(match &args.filter {
        Some(filter) => registry.filtered(filter),
        None => registry,
    })
}

/// Per-method lines, statistics and the headline.
pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    for report in &summary.reports {
        let tag = match report.state() {
            MethodState::Succeeded => "PASS",
            MethodState::Skipped => "SKIP",
            _ => "FAIL",
        };
        out.push_str(&format!("{tag} {}\n", report.method.qualified_name()));
        if report.state() == MethodState::Failed {
            for line in report.outcome.text().lines() {
                out.push_str(&format!("    {line}\n"));
            }
        }
    }
    out.push_str(&summary.statistics.render_text());
    out
}

pub fn run_manifest(args: RunArgs) -> Result<()> {
    let mut config = args.gold.config()?;
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if let Some(path) = &args.event_log {
        config.event_log = Some(path.clone());
    }

    let registry = load_registry(&args)?;
    if registry.is_empty() {
        return Err(CliError::invalid("no methods match the filter"));
    }
    let explorer = CommandExplorer::new(&args.engine).with_args(args.engine_args.iter().cloned());

    let mut session = RunSession::new(config)?;
    session.run(&registry, &explorer);
    let summary = session.finish();

    let csv_path = match &args.csv {
        Some(path) => {
            summary.statistics.export_csv(path)?;
            path.clone()
        }
        None => summary.statistics.export_csv_to_temp()?,
    };
    info!(csv = %csv_path.display(), "exported exception statistics");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render_summary(&summary));
        println!("STATISTICS: CSV written to {}", csv_path.display());
        println!("{}", summary.headline());
    }

    if summary.is_success() {
        Ok(())
    } else {
        Err(CliError::exit(EXIT_FAILURE, summary.headline()))
    }
}

pub fn run_list(args: ListArgs) -> Result<()> {
    let registry = builtin_registry()?;
    if args.json {
        println!("{}", registry.to_manifest_string());
        return Ok(());
    }
    for group in registry.groups() {
        println!("{} ({})", group.name, group.methods.len());
        for method in &group.methods {
            let modes = if method.modes.is_empty() {
                "all modes".to_string()
            } else {
                method
                    .modes
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            println!("  {} [{modes}]", method.descriptor.signature_text());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use svmgold_harness::HarnessConfig;
    use svmgold_harness::{Fault, FnExplorer};
    use svmgold_core::{ExplorationMode, MethodDescriptor};

    #[test]
    fn summary_lists_failures_with_their_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = TestRegistry::new();
        registry
            .register_method(
                "Demo",
                MethodDescriptor::new("Demo.Foo", "Bar", ["Int32"], "Int32"),
                &[],
            )
            .unwrap();
        let explorer = FnExplorer(|_: &MethodDescriptor, _: ExplorationMode| -> std::result::Result<String, Fault> {
            Ok("42".to_string())
        });
        let mut session =
            RunSession::new(HarnessConfig::default().with_gold_root(dir.path())).unwrap();
        session.run(&registry, &explorer);
        let summary = session.finish();

        let text = render_summary(&summary);
        assert!(text.contains("FAIL Demo.Foo.Bar"), "{text}");
        assert!(text.contains("    There is no gold file for"), "{text}");
        assert!(text.contains("STATISTICS: Total methods number: 1"), "{text}");
    }

    #[test]
    fn filter_narrows_the_builtin_registry() {
        let args = RunArgs {
            engine: PathBuf::from("engine"),
            engine_args: Vec::new(),
            manifest: None,
            filter: Some("Unsafe".to_string()),
            jobs: None,
            event_log: None,
            csv: None,
            json: false,
            gold: GoldArgs::default(),
        };
        let registry = load_registry(&args).unwrap();
        assert!(!registry.is_empty());
        assert!(registry.iter().all(|(group, _)| group == "Unsafe"));
    }
}
