//! Output Demultiplexer
//!
//! Splits captured program output back into plain stdout lines and state
//! snapshots. Tokens are folded through an immutable [`ExtractorState`]:
//! every transition consumes the old state and returns a new one.
//!
//! Recovery rules:
//! - a payload that is not valid JSON is dropped with a warning
//! - a payload still open when the output ends (crash mid-dump) is dropped
//!
//! @module wire/demux

use super::payload::{OutputRange, ProgramStateAtPosition, VariableLocationDump};
use super::SENTINEL;
use crate::core::error::{Error, Result};
use serde::Serialize;
use serde_json::Value;

// =============================================================================
// TOKENS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Sentinel,
    Text(&'a str),
}

/// Split on the sentinel, eating one line break after each occurrence
///
/// Empty and whitespace-only text between sentinels is dropped.
pub fn tokenize(output: &str) -> Vec<Token<'_>> {
    fn push_text<'a>(tokens: &mut Vec<Token<'a>>, text: &'a str) {
        if !text.trim().is_empty() {
            tokens.push(Token::Text(text));
        }
    }

    let mut tokens = Vec::new();
    let mut rest = output;

    while let Some(at) = rest.find(SENTINEL) {
        push_text(&mut tokens, &rest[..at]);
        tokens.push(Token::Sentinel);
        rest = &rest[at + SENTINEL.len()..];
        rest = rest
            .strip_prefix("\r\n")
            .or_else(|| rest.strip_prefix('\n'))
            .unwrap_or(rest);
    }
    push_text(&mut tokens, rest);

    tokens
}

fn strip_line_break(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}

// =============================================================================
// EXTRACTOR STATE
// =============================================================================

/// Fold state over the token stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractorState {
    pub is_instrumentation_mode: bool,
    /// First payload of the run (the location dump)
    pub program_descriptor: Option<Value>,
    /// State payloads already patched with their output range
    pub instrumentation_chunks: Vec<Value>,
    pub std_out_chunks: Vec<String>,
    /// Payload text waiting for its closing sentinel
    pub pending_chunk: Option<String>,
    /// End of the previous snapshot's output range
    pub output_end: usize,
    /// Length in characters of the stdout chunks joined with `\n`
    pub std_out_chars: usize,
    /// Length in characters of the last stdout chunk
    pub last_chunk_chars: usize,
}

impl ExtractorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one token
    pub fn apply(self, token: Token<'_>) -> Self {
        match (token, self.is_instrumentation_mode) {
            (Token::Sentinel, false) => Self {
                is_instrumentation_mode: true,
                pending_chunk: None,
                ..self
            },
            (Token::Sentinel, true) => {
                let pending = self.pending_chunk;
                let closed = Self {
                    is_instrumentation_mode: false,
                    pending_chunk: None,
                    ..self
                };
                match pending {
                    Some(payload) => closed.commit(&payload),
                    None => closed,
                }
            }
            (Token::Text(text), true) => {
                let pending = match self.pending_chunk {
                    Some(ref existing) => format!("{}{}", existing, text),
                    None => text.to_string(),
                };
                Self {
                    pending_chunk: Some(pending),
                    ..self
                }
            }
            (Token::Text(text), false) => {
                let chunk = strip_line_break(text);
                let chunk_chars = chunk.chars().count();
                let separator = usize::from(!self.std_out_chunks.is_empty());
                let mut std_out_chunks = self.std_out_chunks;
                std_out_chunks.push(chunk.to_string());
                Self {
                    std_out_chunks,
                    std_out_chars: self.std_out_chars + separator + chunk_chars,
                    last_chunk_chars: chunk_chars,
                    ..self
                }
            }
        }
    }

    /// Record a complete payload
    fn commit(self, payload: &str) -> Self {
        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, bytes = payload.len(), "Dropping malformed instrumentation chunk");
                return self;
            }
        };

        let is_first = self.program_descriptor.is_none() && self.instrumentation_chunks.is_empty();
        if is_first && value.get("filePosition").is_none() {
            return Self {
                program_descriptor: Some(value),
                ..self
            };
        }

        let Value::Object(mut fields) = value else {
            tracing::warn!("Dropping instrumentation chunk that is not an object");
            return self;
        };

        let total = self.std_out_chars;
        let range = if total > self.output_end {
            OutputRange {
                start: total - self.last_chunk_chars,
                end: total,
            }
        } else {
            OutputRange {
                start: total,
                end: total,
            }
        };
        fields.insert(
            "outputRange".to_string(),
            serde_json::json!({ "start": range.start, "end": range.end }),
        );

        let mut instrumentation_chunks = self.instrumentation_chunks;
        instrumentation_chunks.push(Value::Object(fields));
        Self {
            instrumentation_chunks,
            output_end: range.end,
            ..self
        }
    }

    /// Decode the folded state into its final streams
    pub fn finish(self) -> ProgramOutputStreams {
        if let Some(pending) = &self.pending_chunk {
            tracing::warn!(bytes = pending.len(), "Discarding unterminated instrumentation chunk");
        } else if self.is_instrumentation_mode {
            tracing::warn!("Output ended inside an instrumentation chunk");
        }

        let joined = self.std_out_chunks.join("\n");
        let ordered_std_out = joined.lines().map(str::to_string).collect();

        let ordered_instrumentation = self
            .instrumentation_chunks
            .into_iter()
            .filter_map(|chunk| match serde_json::from_value::<ProgramStateAtPosition>(chunk) {
                Ok(state) => Some(state),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping undecodable instrumentation chunk");
                    None
                }
            })
            .collect();

        ProgramOutputStreams {
            ordered_std_out,
            ordered_instrumentation,
            program_descriptor: self.program_descriptor,
        }
    }
}

// =============================================================================
// OUTPUT STREAMS
// =============================================================================

/// Program output split into its two streams
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramOutputStreams {
    pub ordered_std_out: Vec<String>,
    pub ordered_instrumentation: Vec<ProgramStateAtPosition>,
    pub program_descriptor: Option<Value>,
}

impl ProgramOutputStreams {
    /// The descriptor decoded as a location dump, when it is one
    pub fn variable_locations(&self) -> Option<VariableLocationDump> {
        self.program_descriptor
            .as_ref()
            .and_then(|d| serde_json::from_value(d.clone()).ok())
    }
}

/// Demultiplex captured output; never fails
pub fn extract(output: &str) -> ProgramOutputStreams {
    let tokens = tokenize(output);
    let sentinels = tokens.iter().filter(|t| **t == Token::Sentinel).count();

    let streams = tokens
        .into_iter()
        .fold(ExtractorState::new(), ExtractorState::apply)
        .finish();

    tracing::debug!(
        sentinels,
        stdout_lines = streams.ordered_std_out.len(),
        snapshots = streams.ordered_instrumentation.len(),
        "Extracted program output"
    );

    streams
}

/// Like [`extract`], but output without a single sentinel is an error
pub fn extract_instrumented(output: &str) -> Result<ProgramOutputStreams> {
    if !output.contains(SENTINEL) {
        return Err(Error::MissingInstrumentation {
            stdout_lines: output.lines().count(),
        });
    }
    Ok(extract(output))
}
