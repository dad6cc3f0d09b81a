use std::fmt::Write as _;
use std::path::PathBuf;

use clap::Args;
use svmgold_core::store::read_gold;
use svmgold_core::{GoldKey, MethodDescriptor};
use svmgold_harness::HarnessConfig;

use crate::cli::GoldArgs;
use crate::error::{CliError, EXIT_FAILURE, Result};

#[derive(Debug, Clone, Args)]
pub struct ResolveArgs {
    /// Declaring type, fully qualified.
    #[arg(long = "type")]
    pub type_name: String,

    #[arg(long)]
    pub method: String,

    /// Parameter type, repeated in declaration order.
    #[arg(long = "param")]
    pub params: Vec<String>,

    #[arg(long = "return", default_value = "System.Void")]
    pub return_type: String,

    #[command(flatten)]
    pub gold: GoldArgs,
}

impl ResolveArgs {
    pub fn descriptor(&self) -> MethodDescriptor {
        MethodDescriptor::new(
            self.type_name.as_str(),
            self.method.as_str(),
            self.params.iter().map(String::as_str),
            self.return_type.as_str(),
        )
    }
}

#[derive(Debug, Clone, Args)]
pub struct ShowArgs {
    /// Gold file or candidate.
    pub path: PathBuf,

    /// Print the METHOD line as well.
    #[arg(long)]
    pub full: bool,
}

/// `key: value` lines describing where `args` resolves under `config`.
pub fn render_resolution(args: &ResolveArgs, config: &HarnessConfig) -> Result<String> {
    let locator = config.locator();
    let descriptor = args.descriptor();
    let key: GoldKey = locator.key(&descriptor)?;
    let location = locator.locate(&descriptor)?;
    let layout = locator.layout();
    let other = key.path_under(locator.base_directory(), layout.other());
    let existing = location
        .existing
        .as_ref()
        .map_or_else(|| "none".to_string(), |p| p.display().to_string());
    let fallback = if config.legacy_fallback { "fallback" } else { "ignored" };

    let mut out = String::new();
    let _ = writeln!(out, "signature: {}", descriptor.signature_text());
    let _ = writeln!(out, "hash: {}", key.hash);
    let _ = writeln!(out, "canonical ({}): {}", layout.as_str(), location.canonical.display());
    let _ = writeln!(out, "{fallback} ({}): {}", layout.other().as_str(), other.display());
    let _ = writeln!(out, "existing: {existing}");
    Ok(out)
}

pub fn run_resolve(args: ResolveArgs) -> Result<()> {
    let config = args.gold.config()?;
    print!("{}", render_resolution(&args, &config)?);
    Ok(())
}

pub fn run_show(args: ShowArgs) -> Result<()> {
    match read_gold(&args.path)? {
        Some(entry) if args.full => {
            print!("{}", entry.render());
            Ok(())
        }
        Some(entry) => {
            println!("{}", entry.result);
            Ok(())
        }
        None => Err(CliError::exit(
            EXIT_FAILURE,
            format!("no gold value in {}", args.path.display()),
        )),
    }
}
