//! Instrument command implementation
//!
//! @module cli/instrument

use super::{check_language, file_label, parse_region, read_source, OutputFormat};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::instrument::{Augmentation, InstrumentOptions, Instrumentation};
use crate::javascript;
use crate::text::LinePositionSpan;
use crate::viewport::{regions::find_viewport, Viewport};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Arguments for the instrument command
#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:
    stepwise instrument main.js                    Rewritten program on stdout
    stepwise instrument main.js -o out.js          Write it to a file
    stepwise instrument main.js --viewport demo    Only the //#region demo block
    stepwise instrument main.js --region 4:12      Only lines 4 to 12
    stepwise instrument main.js --json             Augmentations and source as JSON")]
pub struct InstrumentArgs {
    /// JavaScript file to instrument
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

    /// Write the rewritten program here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON output
    #[arg(long)]
    pub json: bool,
}

/// JSON report of one instrumentation
#[derive(Debug, Serialize)]
struct InstrumentReport<'a> {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    viewport: Option<&'a str>,
    augmentations: Vec<&'a Augmentation>,
    variables: usize,
    locations: usize,
    source: &'a str,
}

/// Build options from CLI flags and config
pub(crate) fn options_for(
    file: &Path,
    source: &str,
    viewport: Option<&str>,
    regions: &[LinePositionSpan],
    emit_locations: bool,
) -> Result<InstrumentOptions> {
    let viewport: Option<Viewport> = match viewport {
        Some(id) => Some(find_viewport(&file_label(file), source, id)?),
        None => None,
    };
    Ok(InstrumentOptions {
        regions: (!regions.is_empty()).then(|| regions.to_vec()),
        viewport,
        emit_locations,
    })
}

/// Run the instrument command
pub fn run(args: InstrumentArgs) -> Result<()> {
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

    let result = javascript::instrument(&file_label(&args.file), &source, &options)?;

    match OutputFormat::from_flag(args.json) {
        OutputFormat::Human => match &args.output {
            Some(path) => {
                std::fs::write(path, &result.source)?;
                eprintln!(
                    "Instrumented {} statements -> {}",
                    result.augmentations.len(),
                    path.display()
                );
            }
            None => print!("{}", result.source),
        },
        OutputFormat::Json => {
            let report = report(&args.file, &options, &result);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn report<'a>(file: &Path, options: &'a InstrumentOptions, result: &'a Instrumentation) -> InstrumentReport<'a> {
    InstrumentReport {
        file: file_label(file),
        viewport: options.viewport.as_ref().map(|v| v.id.as_str()),
        augmentations: result.augmentations.values().collect(),
        variables: result.locations.symbol_count(),
        locations: result.locations.location_count(),
        source: &result.source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "let a = 1;\n//#region body\na += 1;\n//#endregion\n";

    #[test]
    fn test_options_with_viewport() {
        let options = options_for(Path::new("dir/main.js"), SOURCE, Some("body"), &[], true).unwrap();

        let viewport = options.viewport.as_ref().unwrap();
        assert_eq!(viewport.id, "main.js@body");
        assert!(options.regions.is_none());
        assert_eq!(options.effective_regions(), Some(vec![viewport.inner_span]));
    }

    #[test]
    fn test_options_unknown_viewport() {
        let result = options_for(Path::new("main.js"), SOURCE, Some("nope"), &[], true);
        assert!(matches!(result, Err(crate::Error::ViewportNotFound { .. })));
    }

    #[test]
    fn test_report_lists_augmentations() {
        let options = InstrumentOptions::default();
        let result = javascript::instrument("main.js", SOURCE, &options).unwrap();
        let report = report(Path::new("main.js"), &options, &result);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["augmentations"].as_array().map(Vec::len), Some(2));
        assert!(json.get("viewport").is_none());
    }
}
