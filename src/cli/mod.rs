//! CLI command definitions and handlers

pub mod extract;
pub mod instrument;
pub mod regions;
pub mod run;

use crate::core::error::{Error, Result};
use crate::text::LinePositionSpan;
use clap::{Parser, Subcommand};
use std::path::Path;

const LONG_ABOUT: &str = r#"
Step through a JavaScript sample statement by statement.

Stepwise rewrites a program so that, right before each statement runs, it
prints the values of every variable that is safe to read. The captured
output is then split back into plain console output and state snapshots,
each snapshot tagged with the slice of output produced since the previous one.

PIPELINE:
    stepwise instrument main.js       Print the rewritten program
    stepwise run main.js              Instrument, execute and show every step
    stepwise extract output.txt       Split captured output into streams
    stepwise regions main.js          List //#region viewports

VIEWPORTS:
    Mark the part of a file readers should see with

        //#region demo
        ...
        //#endregion

    and pass --viewport demo. Only statements strictly between the markers are
    instrumented; lines are reported relative to the first inner line.

ENVIRONMENT:
    STEPWISE_HOME    Config and scratch directory (default: platform data dir)
    STEPWISE_LOG     Log filter, e.g. STEPWISE_LOG=stepwise=debug
"#;

/// Statement-level state capture for JavaScript samples
#[derive(Parser, Debug)]
#[command(name = "stepwise")]
#[command(author, version)]
#[command(about = "Statement-level state capture for JavaScript samples")]
#[command(long_about = LONG_ABOUT)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rewrite a program with state dumps before each statement
    #[command(visible_alias = "i")]
    Instrument(instrument::InstrumentArgs),

    /// Split captured program output into stdout and snapshots
    #[command(visible_alias = "x")]
    Extract(extract::ExtractArgs),

    /// Instrument, execute and report every step
    #[command(visible_alias = "r")]
    Run(run::RunArgs),

    /// List the viewports declared with //#region markers
    Regions(regions::RegionsArgs),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Human
        }
    }
}

/// Read a source file, mapping a missing path to [`Error::FileNotFound`]
pub(crate) fn read_source(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Reject files the JavaScript front end cannot handle
pub(crate) fn check_language(path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("js" | "mjs" | "cjs" | "jsx") | None => Ok(()),
        Some(other) => Err(Error::Unsupported {
            language: other.to_string(),
        }),
    }
}

/// File name used in positions and viewport ids
pub(crate) fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Parse a 1-based inclusive line range such as `3:8` or `5`
pub(crate) fn parse_region(value: &str) -> std::result::Result<LinePositionSpan, String> {
    let parse_line = |s: &str| -> std::result::Result<usize, String> {
        match s.trim().parse::<usize>() {
            Ok(0) | Err(_) => Err(format!("invalid line number '{}'", s)),
            Ok(line) => Ok(line - 1),
        }
    };

    let (first, last) = match value.split_once(':') {
        Some((first, last)) => (parse_line(first)?, parse_line(last)?),
        None => {
            let line = parse_line(value)?;
            (line, line)
        }
    };
    if last < first {
        return Err(format!("region '{}' ends before it starts", value));
    }
    Ok(LinePositionSpan::lines(first, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_region() {
        assert_eq!(parse_region("3:8").unwrap(), LinePositionSpan::lines(2, 7));
        assert_eq!(parse_region("5").unwrap(), LinePositionSpan::lines(4, 4));
        assert!(parse_region("0:2").is_err(), "Lines are 1-based");
        assert!(parse_region("9:2").is_err());
        assert!(parse_region("a").is_err());
    }

    #[test]
    fn test_read_missing_source() {
        let result = read_source(Path::new("/definitely/not/here.js"));
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
    }

    #[test]
    fn test_check_language() {
        assert!(check_language(Path::new("main.js")).is_ok());
        assert!(check_language(Path::new("sample")).is_ok());
        assert!(matches!(
            check_language(Path::new("main.py")),
            Err(Error::Unsupported { .. })
        ));
    }

    #[test]
    fn test_file_label() {
        assert_eq!(file_label(Path::new("samples/main.js")), "main.js");
    }
}
