//! Stepwise - statement-level state capture for JavaScript samples
//!
//! Rewrites a program so it prints the observable variables before every
//! statement, then splits the captured output back into console output and
//! per-step snapshots, optionally restricted to a displayed viewport.

pub mod cli;
pub mod core;
pub mod instrument;
pub mod javascript;
pub mod runner;
pub mod semantic;
pub mod syntax;
pub mod text;
pub mod viewport;
pub mod wire;

pub use core::config::Config;
pub use core::error::{Error, Result};
pub use instrument::{InstrumentOptions, Instrumentation};
pub use viewport::{remap_to_viewport, Viewport};
pub use wire::{extract, extract_instrumented, ProgramOutputStreams};
