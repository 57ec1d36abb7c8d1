//! Run command implementation
//!
//! Instruments a file, executes it with the configured interpreter and
//! prints every captured step.
//!
//! @module cli/run

use super::extract::print_streams;
use super::instrument::options_for;
use super::{check_language, file_label, parse_region, read_source, OutputFormat};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::javascript;
use crate::runner::Runner;
use crate::text::LinePositionSpan;
use crate::wire;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Arguments for the run command
#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:
    stepwise run main.js                     Every statement of main.js
    stepwise run main.js --viewport demo     Only the //#region demo block
    stepwise run main.js --timeout 30        Allow 30 seconds
    stepwise run main.js --json              Streams as JSON

The interpreter defaults to `node`; set [runner] program/args in
$STEPWISE_HOME/config.toml to change it.")]
pub struct RunArgs {
    /// JavaScript file to run
    pub file: PathBuf,

    /// Restrict to a viewport (region name or <file>@<name>)
    #[arg(short, long)]
    pub viewport: Option<String>,

    /// Restrict to 1-based line ranges (START:END), repeatable
    #[arg(short, long, value_parser = parse_region)]
    pub region: Vec<LinePositionSpan>,

    /// Skip the variable location dump
    #[arg(long)]
    pub no_locations: bool,

    /// Timeout in seconds (default from config)
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// JSON output
    #[arg(long)]
    pub json: bool,
}

/// Run the run command
pub async fn run(args: RunArgs) -> Result<()> {
    let config = Config::load()?;
    check_language(&args.file)?;
    let source = read_source(&args.file)?;
    let options = options_for(
        &args.file,
        &source,
        args.viewport.as_deref(),
        &args.region,
        config.instrument.emit_locations && !args.no_locations,
    )?;

    let instrumentation = javascript::instrument(&file_label(&args.file), &source, &options)?;

    let mut runner = Runner::from_config(&config.runner);
    if let Some(seconds) = args.timeout {
        runner = runner.with_timeout(Duration::from_secs(seconds));
    }
    let scratch = config.ensure_scratch_dir()?;
    let output = runner.run_source(&scratch, &instrumentation.source).await?;

    if !output.success() {
        tracing::warn!(status = ?output.status.code(), "Program exited with failure");
        if !output.stderr.is_empty() {
            eprint!("{}", output.stderr);
        }
    }

    let streams = if config.instrument.require_instrumentation {
        wire::extract_instrumented(&output.stdout)?
    } else {
        wire::extract(&output.stdout)
    };

    match OutputFormat::from_flag(args.json) {
        OutputFormat::Human => print_streams(&streams),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&streams)?),
    }

    Ok(())
}
