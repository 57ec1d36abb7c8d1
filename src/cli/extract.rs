//! Extract command implementation
//!
//! @module cli/extract

use super::{read_source, OutputFormat};
use crate::core::error::Result;
use crate::wire::{self, ProgramOutputStreams, ProgramStateAtPosition, VariableState};
use clap::Args;
use std::io::Read;
use std::path::PathBuf;

/// Arguments for the extract command
#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:
    node out.js > captured.txt && stepwise extract captured.txt
    node out.js | stepwise extract -                 Read from stdin
    stepwise extract captured.txt --json             Streams as JSON
    stepwise extract captured.txt --strict           Fail without instrumentation")]
pub struct ExtractArgs {
    /// Captured output file, or - for stdin
    pub file: PathBuf,

    /// Fail when the output holds no instrumentation at all
    #[arg(long)]
    pub strict: bool,

    /// JSON output
    #[arg(long)]
    pub json: bool,
}

/// Run the extract command
pub fn run(args: ExtractArgs) -> Result<()> {
    let output = if args.file.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        read_source(&args.file)?
    };

    let streams = if args.strict {
        wire::extract_instrumented(&output)?
    } else {
        wire::extract(&output)
    };

    match OutputFormat::from_flag(args.json) {
        OutputFormat::Human => print_streams(&streams),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&streams)?),
    }

    Ok(())
}

/// Human-readable step listing
pub(crate) fn print_streams(streams: &ProgramOutputStreams) {
    for line in render_streams(streams) {
        println!("{}", line);
    }
}

/// Step lines, each followed by the program output produced before it
///
/// Output after the last step is listed at the end.
pub(crate) fn render_streams(streams: &ProgramOutputStreams) -> Vec<String> {
    let mut lines = Vec::new();
    let stdout = streams.ordered_std_out.join("\n");

    if let Some(dump) = streams.variable_locations() {
        lines.push(format!("Tracked variables: {}", dump.variable_locations.len()));
    }

    if streams.ordered_instrumentation.is_empty() {
        lines.extend(streams.ordered_std_out.iter().cloned());
        return lines;
    }

    // Byte offset of every char, plus the end of the text
    let offsets: Vec<usize> = stdout
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(stdout.len()))
        .collect();
    let byte_at = |chars: usize| offsets[chars.min(offsets.len() - 1)];

    let mut printed = 0;
    for (step, state) in streams.ordered_instrumentation.iter().enumerate() {
        lines.push(format_step(step + 1, state));
        if let Some(range) = state.output_range.filter(|r| r.end > printed) {
            push_output(&mut lines, &stdout[byte_at(printed)..byte_at(range.end)]);
            printed = range.end;
        }
    }
    push_output(&mut lines, &stdout[byte_at(printed)..]);

    lines
}

fn push_output(lines: &mut Vec<String>, text: &str) {
    let text = text.strip_prefix('\n').unwrap_or(text);
    if text.is_empty() {
        return;
    }
    lines.extend(text.lines().map(|line| format!("    | {}", line)));
}

fn format_variables(label: &str, variables: &[VariableState]) -> Option<String> {
    if variables.is_empty() {
        return None;
    }
    let rendered: Vec<String> = variables
        .iter()
        .map(|v| format!("{} = {}", v.name, v.value))
        .collect();
    Some(format!("{}: {}", label, rendered.join(", ")))
}

/// `#3 main.js:4:2  locals: a = 1  params: n = 2`
pub(crate) fn format_step(step: usize, state: &ProgramStateAtPosition) -> String {
    let position = &state.file_position;
    let mut line = format!(
        "#{} {}:{}:{}",
        step,
        position.file,
        position.line + 1,
        position.character + 1
    );
    let groups = [
        format_variables("locals", &state.locals),
        format_variables("params", &state.parameters),
        format_variables("fields", &state.fields),
    ];
    for group in groups.into_iter().flatten() {
        line.push_str("  ");
        line.push_str(&group);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::FilePosition;
    use crate::wire::OutputRange;
    use serde_json::json;

    #[test]
    fn test_format_step() {
        let state = ProgramStateAtPosition {
            file_position: FilePosition {
                line: 3,
                character: 2,
                file: "main.js".to_string(),
            },
            locals: vec![VariableState {
                name: "a".to_string(),
                value: json!(1),
                declared_at: None,
            }],
            parameters: vec![VariableState {
                name: "s".to_string(),
                value: json!("x"),
                declared_at: None,
            }],
            ..Default::default()
        };

        assert_eq!(
            format_step(3, &state),
            "#3 main.js:4:3  locals: a = 1  params: s = \"x\""
        );
    }

    fn snapshot(line: usize, start: usize, end: usize) -> ProgramStateAtPosition {
        ProgramStateAtPosition {
            file_position: FilePosition {
                line,
                character: 0,
                file: "main.js".to_string(),
            },
            output_range: Some(OutputRange { start, end }),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_shows_output_after_last_step() {
        let streams = ProgramOutputStreams {
            ordered_std_out: vec!["héllo".to_string(), "6".to_string(), "done".to_string()],
            ordered_instrumentation: vec![snapshot(0, 0, 0), snapshot(1, 0, 5)],
            program_descriptor: None,
        };

        assert_eq!(
            render_streams(&streams),
            vec!["#1 main.js:1:1", "#2 main.js:2:1", "    | héllo", "    | 6", "    | done"],
            "Output written after the last snapshot must still be listed"
        );
    }

    #[test]
    fn test_render_extracted_run() {
        let mut output = wire::frame(r#"{"variableLocations":[]}"#);
        output.push('\n');
        output.push_str(&wire::frame(r#"{"filePosition":{"line":0,"character":0,"file":"a.js"}}"#));
        output.push_str("\nfirst\n");
        output.push_str(&wire::frame(r#"{"filePosition":{"line":1,"character":0,"file":"a.js"}}"#));
        output.push_str("\nlast\n");

        let lines = render_streams(&wire::extract(&output));
        assert_eq!(
            lines,
            vec![
                "Tracked variables: 0",
                "#1 a.js:1:1",
                "#2 a.js:2:1",
                "    | first",
                "    | last",
            ]
        );
    }

    #[test]
    fn test_render_without_snapshots() {
        let streams = wire::extract("plain\noutput\n");
        assert_eq!(render_streams(&streams), vec!["plain", "output"]);
    }

    #[test]
    fn test_format_step_without_variables() {
        let state = ProgramStateAtPosition::default();
        assert_eq!(format_step(1, &state), "#1 :1:1");
    }
}
