//! Inscompare CLI
//!
//! Thin shell over `inscompare-core`: reads inputs from files or stdin,
//! prints results as pretty JSON on stdout and a status line on stderr.
//!
//! # Usage
//! ```bash
//! inscompare compile --mapping mapping.json --query "암수술비" --insurer KB --insurer DB
//! inscompare adapt payload.json
//! inscompare resolve < response.json
//! inscompare --config inscompare.toml run --mapping mapping.json --query "일반암진단비" --insurer KB --insurer DB
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use inscompare_core::{
    source_from_config, AdaptedPremium, CompareConfig, CompileOutcome, CompileRequest,
    ComparisonFocus, MappingTable, PremiumAdapter, QueryCompiler, SurgeryMethod, UiState,
    UserSelections,
};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Inscompare - Insurance comparison contract resolution
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (.toml or .json); defaults apply when omitted
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query and selections into a comparison request
    Compile(CompileArgs),

    /// Adapt a raw premium payload (stdin when no file is given)
    Adapt {
        /// Payload file
        path: Option<PathBuf>,
    },

    /// Resolve a compare response to a UI state (stdin when no file is given)
    Resolve {
        /// Compare response file
        path: Option<PathBuf>,
    },

    /// Compile, fetch from the configured premium source and adapt
    Run(CompileArgs),
}

#[derive(Args)]
struct CompileArgs {
    /// Mapping table (JSON)
    #[arg(short, long, value_name = "FILE")]
    mapping: PathBuf,

    /// Wire-level compile request (JSON); replaces the selection flags
    #[arg(short, long, value_name = "FILE", conflicts_with_all = ["query", "insurer", "surgery_method", "cancer_subtype", "focus", "basis"])]
    input: Option<PathBuf>,

    /// Free-text query
    #[arg(short, long, default_value = "")]
    query: String,

    /// Selected insurer code (repeatable)
    #[arg(long = "insurer", value_name = "CODE")]
    insurer: Vec<String>,

    /// Surgery method: robotic, laparoscopic or open
    #[arg(long, value_name = "METHOD")]
    surgery_method: Option<SurgeryMethod>,

    /// Cancer subtype (repeatable)
    #[arg(long = "cancer-subtype", value_name = "SUBTYPE")]
    cancer_subtype: Vec<String>,

    /// Comparison focus: premium, coverage_amount or coverage_terms
    #[arg(long, value_name = "FOCUS")]
    focus: Option<ComparisonFocus>,

    /// Comparison basis
    #[arg(long, value_name = "BASIS")]
    basis: Option<String>,
}

impl CompileArgs {
    fn load(&self) -> anyhow::Result<(String, UserSelections, MappingTable)> {
        let table = MappingTable::from_file(&self.mapping)?;

        if let Some(input) = &self.input {
            let content = read_input(Some(input))?;
            let request: CompileRequest = serde_json::from_str(&content)
                .with_context(|| format!("parsing compile request {}", input.display()))?;
            return Ok((request.user_query.clone(), request.selections(), table));
        }

        let mut selections = UserSelections::new()
            .with_insurers(&self.insurer)
            .with_cancer_subtypes(&self.cancer_subtype);
        selections.surgery_method = self.surgery_method;
        selections.comparison_focus = self.focus;
        selections.comparison_basis = self.basis.clone();
        Ok((self.query.clone(), selections, table))
    }
}

#[derive(Serialize)]
struct RunOutput<'a> {
    compile: &'a CompileOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    premiums: Option<AdaptedPremium>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => CompareConfig::from_file(path)?,
        None => CompareConfig::default(),
    };
    tracing::debug!(config = ?cli.config, source = ?config.source, "configuration loaded");

    match &cli.command {
        Commands::Compile(args) => {
            let outcome = compile(&config, args)?;
            print_json(&outcome)?;
            report_compile(&outcome);
        }
        Commands::Adapt { path } => {
            let payload = read_payload(path.as_deref())?;
            let premiums = PremiumAdapter::new(config.adapter.clone()).adapt(payload.as_ref());
            print_json(&premiums)?;
            report_premiums(&premiums);
        }
        Commands::Resolve { path } => {
            let content = read_input(path.as_deref())?;
            let raw: Value = serde_json::from_str(&content).context("parsing compare response")?;
            let state = inscompare_core::resolve_view_value(&raw);
            print_json(&state)?;
            report_view(&state);
        }
        Commands::Run(args) => {
            let outcome = compile(&config, args)?;
            report_compile(&outcome);

            let premiums = match outcome.compiled() {
                Some(output) => {
                    let source = source_from_config(&config.source);
                    tracing::info!(source = source.name(), "fetching premium payload");
                    let payload = source.fetch(&output.compiled_request)?;
                    let premiums =
                        PremiumAdapter::new(config.adapter.clone()).adapt(payload.as_ref());
                    report_premiums(&premiums);
                    Some(premiums)
                }
                None => None,
            };

            print_json(&RunOutput {
                compile: &outcome,
                premiums,
            })?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries JSON only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

fn compile(config: &CompareConfig, args: &CompileArgs) -> anyhow::Result<CompileOutcome> {
    let (query, selections, table) = args.load()?;
    let compiler = QueryCompiler::new(config.compiler.clone());
    Ok(compiler.compile(&query, &selections, &table))
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("reading stdin")?;
            Ok(content)
        }
    }
}

/// Empty input means the upstream sent nothing
fn read_payload(path: Option<&Path>) -> anyhow::Result<Option<Value>> {
    let content = read_input(path)?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    let payload = serde_json::from_str(&content).context("parsing premium payload")?;
    Ok(Some(payload))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_compile(outcome: &CompileOutcome) {
    match outcome {
        CompileOutcome::Compiled(output) => eprintln!(
            "{} {} codes, {} insurers (rule version {})",
            "compiled".green().bold(),
            output.compiled_request.coverage_codes.len(),
            output.compiled_request.insurers.len(),
            output.compiled_request.rule_version
        ),
        CompileOutcome::ClarificationNeeded(needed) => {
            let kinds: Vec<&str> = needed.kinds().iter().map(|k| k.as_str()).collect();
            eprintln!(
                "{} {}",
                "clarification needed:".yellow().bold(),
                kinds.join(", ")
            );
        }
    }
}

fn report_premiums(premiums: &AdaptedPremium) {
    match premiums.reason() {
        None => eprintln!(
            "{} {} premium items",
            "adapted".green().bold(),
            premiums.items().len()
        ),
        Some(reason) => eprintln!(
            "{} {}{}",
            "adapter failure:".red().bold(),
            reason,
            premiums
                .message()
                .map(|m| format!(" ({})", m))
                .unwrap_or_default()
        ),
    }
}

fn report_view(state: &UiState) {
    let view = state.view_name();
    if state.is_unknown() {
        eprintln!("{} {}", "view:".yellow().bold(), view);
    } else {
        eprintln!("{} {}", "view:".green().bold(), view);
    }
}
