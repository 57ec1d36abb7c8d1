//! Language-neutral statement tree
//!
//! A front end lowers its concrete syntax tree into blocks of statements.
//! The instrumentation stages only need to know where statement lists are,
//! which block kind owns them and which blocks nest inside a statement.
//!
//! @module syntax

use crate::text::{SourceSpan, SourceText};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a block or statement within one tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What owns a statement list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    /// Top-level program body
    Entry,
    /// Class method, constructor, accessor or static initialization block
    Method { is_static: bool },
    /// Function declaration or expression (rebinds the receiver)
    Function,
    /// Arrow function body (inherits the receiver)
    Lambda { expression_bodied: bool },
    /// Block nested in another statement (if/loop/try bodies, case bodies)
    Nested,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Method { .. } => "method",
            Self::Function => "function",
            Self::Lambda { .. } => "lambda",
            Self::Nested => "nested",
        }
    }

    pub fn is_expression_bodied(&self) -> bool {
        matches!(
            self,
            Self::Lambda {
                expression_bodied: true
            }
        )
    }
}

/// A statement inside a statement list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub id: NodeId,
    pub span: SourceSpan,
    /// Blocks directly nested in this statement
    pub nested: Vec<Block>,
}

/// A statement list forming one lexical region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: NodeId,
    pub kind: BlockKind,
    pub span: SourceSpan,
    pub statements: Vec<Statement>,
}

impl Block {
    /// Iterate every statement in this block and below, depth-first
    pub fn walk_statements(&self) -> Vec<&Statement> {
        let mut out = Vec::new();
        fn walk<'a>(block: &'a Block, out: &mut Vec<&'a Statement>) {
            for statement in &block.statements {
                out.push(statement);
                for nested in &statement.nested {
                    walk(nested, out);
                }
            }
        }
        walk(self, &mut out);
        out
    }

    /// Iterate every block in this subtree, this one included
    pub fn walk_blocks(&self) -> Vec<&Block> {
        let mut out = vec![self];
        for statement in &self.statements {
            for nested in &statement.nested {
                out.extend(nested.walk_blocks());
            }
        }
        out
    }
}

/// A lowered document
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub file: String,
    pub source: SourceText,
    pub entry: Block,
}

impl SyntaxTree {
    pub fn statements(&self) -> Vec<&Statement> {
        self.entry.walk_statements()
    }

    pub fn blocks(&self) -> Vec<&Block> {
        self.entry.walk_blocks()
    }

    pub fn text(&self, span: &SourceSpan) -> &str {
        &self.source.as_str()[span.start..span.end]
    }
}
