//! Semantic model interface
//!
//! The analyzer and the location index never look at concrete syntax. They
//! ask a [`SemanticModel`] four questions:
//! - which symbols are visible at an offset
//! - which locals a statement range definitely assigns / reads from outside
//! - what syntax declares a symbol
//! - where a symbol is referenced
//!
//! @module semantic

use crate::syntax::Statement;
use crate::text::SourceSpan;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// SYMBOL KIND
// =============================================================================

/// Classification of observable variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Local,
    Field,
    Parameter,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Field => "field",
            Self::Parameter => "parameter",
        }
    }
}

// =============================================================================
// SYMBOL FLAGS
// =============================================================================

bitflags! {
    /// Flags for symbol metadata
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[repr(transparent)]
    pub struct SymbolFlags: u8 {
        /// Symbol is static/class-level
        const STATIC = 0b0000_0001;
        /// Binding cannot be reassigned
        const CONST = 0b0000_0010;
    }
}

impl Default for SymbolFlags {
    fn default() -> Self {
        Self::empty()
    }
}

// =============================================================================
// SYMBOL
// =============================================================================

/// Identity of a symbol inside one semantic model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

/// A variable the instrumentation may observe
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    pub flags: SymbolFlags,
    /// Span of the declaring identifier
    pub declared_at: SourceSpan,
    /// Owning class name, for fields
    pub container: Option<String>,
}

impl Symbol {
    #[inline]
    pub fn is_static(&self) -> bool {
        self.flags.contains(SymbolFlags::STATIC)
    }

    #[inline]
    pub fn is_local(&self) -> bool {
        self.kind == SymbolKind::Local
    }
}

// =============================================================================
// DATAFLOW
// =============================================================================

/// Dataflow facts for a contiguous statement range
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataFlow {
    /// Locals guaranteed assigned once the range completes normally
    pub always_assigned: BTreeSet<SymbolId>,
    /// Locals declared outside the range whose values are read inside it
    pub flows_in: BTreeSet<SymbolId>,
}

// =============================================================================
// DECLARING SYNTAX
// =============================================================================

/// The construct that introduces a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaringSyntax {
    /// `let x = ...`; the span is the identifier
    VariableDeclarator { identifier: SourceSpan },
    /// `for (const x of xs)`; the span is the loop variable
    ForEachVariable { identifier: SourceSpan },
    /// Anything else; the span is the whole declaring node
    Other { span: SourceSpan },
}

impl DeclaringSyntax {
    /// The span recorded as the declaration site
    pub fn declaration_span(&self) -> SourceSpan {
        match *self {
            Self::VariableDeclarator { identifier } => identifier,
            Self::ForEachVariable { identifier } => identifier,
            Self::Other { span } => span,
        }
    }
}

// =============================================================================
// SEMANTIC MODEL
// =============================================================================

/// Symbol table and dataflow queries over one document
pub trait SemanticModel: Sync {
    /// Symbols visible by lexical lookup at a byte offset
    fn lookup_symbols_at(&self, offset: usize) -> Vec<Symbol>;

    /// Dataflow facts for a contiguous run of statements from one block
    fn data_flow(&self, statements: &[Statement]) -> DataFlow;

    /// The construct that declares `symbol`
    fn declaring_syntax(&self, symbol: &Symbol) -> Option<DeclaringSyntax>;

    /// Every reference (read or write) to `symbol`, declaration excluded
    fn find_references(&self, symbol: &Symbol) -> Vec<SourceSpan>;
}
