mod report;

use anyhow::{Context, Result};
use argbind::{CommandSpec, ConverterRegistry, Parser as ArgParser, ParserConfig};
use argbind_metadata::CommandDoc;
use clap::{Parser, Subcommand};
use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};
use tracing_subscriber::{EnvFilter, fmt};

use crate::report::{CheckReport, ParseReport};

#[derive(Parser)]
#[command(name = "argbind")]
#[command(version, about = "Match and bind arguments against a JSON command document", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse arguments against a command document and print the bindings
    Parse(ParseArgs),

    /// Load and validate a command document
    Check(CheckArgs),
}

#[derive(Parser)]
struct ParseArgs {
    /// Path to the JSON command document
    #[arg(short, long, value_name = "FILE")]
    spec: PathBuf,

    /// Only output JSON (no human-readable output)
    #[arg(long)]
    json: bool,

    /// Report every error instead of stopping at the first
    #[arg(long)]
    collect_all: bool,

    /// Keep unknown arguments instead of failing
    #[arg(long)]
    allow_unmatched: bool,

    /// Do not expand clustered short options like -abc
    #[arg(long)]
    no_clustering: bool,

    /// Arguments to parse (pass them after `--`)
    #[arg(last = true, value_name = "ARGS", allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(Parser)]
struct CheckArgs {
    /// Path to the JSON command document
    #[arg(value_name = "FILE")]
    spec: PathBuf,

    /// Write the summary as JSON to this path
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Only output JSON (no human-readable output)
    #[arg(long)]
    json: bool,
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse(args) => parse_command(args),
        Commands::Check(args) => check_command(args).map(|()| ExitCode::SUCCESS),
    }
}

fn load_document(path: &Path) -> Result<CommandDoc> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read command document: {}", path.display()))?;
    CommandDoc::from_json(&text)
        .with_context(|| format!("invalid command document: {}", path.display()))
}

fn load_spec(doc: &CommandDoc, registry: &ConverterRegistry, path: &Path) -> Result<CommandSpec> {
    doc.to_spec(registry)
        .with_context(|| format!("invalid command spec in {}", path.display()))
}

fn parse_command(args: ParseArgs) -> Result<ExitCode> {
    tracing::debug!("executing parse command");

    let registry = ConverterRegistry::new();
    let doc = load_document(&args.spec)?;
    let spec = load_spec(&doc, &registry, &args.spec)?;

    // Flags only ever switch behavior on top of the document's config.
    let mut config: ParserConfig = doc.parser_config();
    if args.collect_all {
        config = config.collect_all_errors(true);
    }
    if args.allow_unmatched {
        config = config.allow_unmatched(true);
    }
    if args.no_clustering {
        config = config.allow_clustering(false);
    }

    let outcome = ArgParser::new(&spec, &registry)
        .with_config(config)
        .parse(&args.args);
    let report = match &outcome {
        Ok(result) => ParseReport::from_result(result),
        Err(failure) => ParseReport::from_failure(failure),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if outcome.is_ok() {
        report.print_human();
    }

    match outcome {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(failure) => {
            for error in failure.errors() {
                eprintln!("error: {error}");
            }
            Ok(ExitCode::from(2))
        }
    }
}

fn check_command(args: CheckArgs) -> Result<()> {
    tracing::debug!("executing check command");

    let registry = ConverterRegistry::new();
    let doc = load_document(&args.spec)?;
    let spec = load_spec(&doc, &registry, &args.spec)?;
    let report = CheckReport::from_spec(&spec);

    if let Some(output_path) = &args.output {
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(output_path, &json)
            .with_context(|| format!("failed to write report: {}", output_path.display()))?;
        if !args.json {
            eprintln!("Report: {}", output_path.display());
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print_human();
        tracing::info!(command = %report.command, "command document is valid");
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
