//! Wire Encoding
//!
//! Instrumented programs interleave their own output with JSON payloads on
//! a single stdout. A payload is framed as
//!
//! ```text
//! <SENTINEL>\n<json>\n<SENTINEL>
//! ```
//!
//! The first payload of a run is the variable location dump; every later
//! one is a [`ProgramStateAtPosition`]. The sentinel is never escaped, so
//! program output containing it verbatim will confuse the demultiplexer.
//!
//! @module wire

pub mod demux;
pub mod payload;

pub use demux::{extract, extract_instrumented, ExtractorState, ProgramOutputStreams};
pub use payload::{
    DeclarationSpan, LineRange, OutputRange, ProgramStateAtPosition, VariableLocationDump,
    VariableLocationEntry, VariableState,
};

/// Payload delimiter
pub const SENTINEL: &str = "6a2f74a2-f01d-423d-a40f-726aa7358a81";

/// Frame one payload the way instrumented programs print it
pub fn frame(json: &str) -> String {
    format!("{SENTINEL}\n{json}\n{SENTINEL}")
}
