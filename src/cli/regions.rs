//! Regions command implementation
//!
//! @module cli/regions

use super::{check_language, file_label, read_source, OutputFormat};
use crate::core::error::Result;
use crate::viewport::find_viewports;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the regions command
#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:
    stepwise regions main.js          List viewports
    stepwise regions main.js --json   Viewports with spans as JSON")]
pub struct RegionsArgs {
    /// JavaScript file to scan
    pub file: PathBuf,

    /// JSON output
    #[arg(long)]
    pub json: bool,
}

/// Run the regions command
pub fn run(args: RegionsArgs) -> Result<()> {
    check_language(&args.file)?;
    let source = read_source(&args.file)?;
    let viewports = find_viewports(&file_label(&args.file), &source)?;

    match OutputFormat::from_flag(args.json) {
        OutputFormat::Human => {
            if viewports.is_empty() {
                println!("No regions found.");
            }
            for viewport in &viewports {
                println!(
                    "{}  lines {}-{}",
                    viewport.id,
                    viewport.outer_span.start.line + 1,
                    viewport.outer_span.end.line + 1
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&viewports)?),
    }

    Ok(())
}
