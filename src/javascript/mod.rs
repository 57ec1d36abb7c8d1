//! JavaScript Front End
//!
//! Parses JavaScript with tree-sitter and produces the two things the
//! instrumentation stages need:
//! - a [`SyntaxTree`] of blocks and statements
//! - a [`JsSemanticModel`] answering symbol and dataflow queries
//!
//! Programs with syntax errors are rejected before any analysis runs.
//!
//! @module javascript

pub(crate) mod binder;
pub(crate) mod blocks;
pub mod dialect;
pub(crate) mod flow;
pub mod model;

pub use dialect::JavaScriptDialect;
pub use model::JsSemanticModel;

use crate::core::error::{Error, Result};
use crate::instrument::{self, InstrumentOptions, Instrumentation};
use crate::syntax::SyntaxTree;
use crate::text::SourceText;
use binder::Binder;
use blocks::Lowerer;
use tree_sitter::{Language, Node, Parser, Tree};

// =============================================================================
// PARSING
// =============================================================================

pub(crate) fn language() -> Language {
    tree_sitter_javascript::LANGUAGE.into()
}

fn get_parser() -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&language())
        .map_err(|e| Error::Parse {
            message: e.to_string(),
        })?;
    Ok(parser)
}

/// Parse `source` into a raw tree-sitter tree (syntax errors allowed)
pub(crate) fn parse_tree(source: &str) -> Result<Tree> {
    get_parser()?
        .parse(source, None)
        .ok_or_else(|| Error::Parse {
            message: "Parser returned None".to_string(),
        })
}

/// First ERROR or MISSING node in document order
fn first_error(node: Node) -> Option<Node> {
    if !node.has_error() {
        return None;
    }
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error).or(Some(node))
}

fn syntax_error(file: &str, tree: &Tree) -> Option<Error> {
    first_error(tree.root_node()).map(|node| {
        let position = node.start_position();
        Error::Syntax {
            file: file.to_string(),
            line: position.row + 1,
            column: position.column + 1,
        }
    })
}

/// Fail with [`Error::Syntax`] unless `source` parses cleanly
pub fn check_syntax(file: &str, source: &str) -> Result<()> {
    let tree = parse_tree(source)?;
    match syntax_error(file, &tree) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

// =============================================================================
// DOCUMENT
// =============================================================================

/// A parsed and bound JavaScript document
#[derive(Debug)]
pub struct JsDocument {
    pub tree: SyntaxTree,
    pub model: JsSemanticModel,
}

/// Parse, bind and lower one JavaScript file
pub fn parse(file: &str, source: &str) -> Result<JsDocument> {
    let raw = parse_tree(source)?;
    if let Some(err) = syntax_error(file, &raw) {
        return Err(err);
    }

    let text = SourceText::new(source);
    let root = raw.root_node();
    let bindings = Binder::bind(root, &text);
    let (entry, assignments) = Lowerer::lower(root, &text, &bindings);

    tracing::debug!(
        file,
        statements = entry.walk_statements().len(),
        "Parsed JavaScript document"
    );

    Ok(JsDocument {
        tree: SyntaxTree {
            file: file.to_string(),
            source: text,
            entry,
        },
        model: JsSemanticModel::new(bindings, assignments),
    })
}

/// Instrument a JavaScript file end to end
///
/// The rewritten program is parsed again; a generator bug that breaks the
/// syntax surfaces as [`Error::Instrumentation`] instead of a runtime crash.
pub fn instrument(file: &str, source: &str, options: &InstrumentOptions) -> Result<Instrumentation> {
    let document = parse(file, source)?;
    let result = instrument::instrument(&document.tree, &document.model, &JavaScriptDialect, options)?;

    check_syntax(file, &result.source).map_err(|e| Error::Instrumentation {
        message: format!("Rewritten program does not parse: {}", e),
    })?;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::{SemanticModel, SymbolKind};
    use crate::syntax::BlockKind;

    #[test]
    fn test_parse_rejects_syntax_errors() {
        let err = parse("bad.js", "let x = 1;\nlet = ;\n").unwrap_err();

        match err {
            Error::Syntax { file, line, .. } => {
                assert_eq!(file, "bad.js");
                assert_eq!(line, 2, "Error should point at the broken line");
            }
            other => panic!("Expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_lowers_blocks() {
        let source = "\"use strict\";\nfunction f(a) {\n  return a;\n}\nconst g = x => x + 1;\n";
        let document = parse("main.js", source).unwrap();

        let kinds: Vec<BlockKind> = document.tree.blocks().iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Entry,
                BlockKind::Function,
                BlockKind::Lambda {
                    expression_bodied: true
                },
            ]
        );
        assert_eq!(
            document.tree.entry.statements.len(),
            2,
            "Directive prologue is not a statement"
        );
    }

    #[test]
    fn test_parse_binds_symbols() {
        let source = "let total = 0;\nfunction add(n) {\n  total += n;\n}\n";
        let document = parse("main.js", source).unwrap();

        let total = document.model.symbol_named("total").unwrap();
        let n = document.model.symbol_named("n").unwrap();
        assert_eq!(total.kind, SymbolKind::Local);
        assert_eq!(n.kind, SymbolKind::Parameter);
        assert_eq!(document.model.find_references(total).len(), 1);
    }

    #[test]
    fn test_check_syntax_accepts_valid_program() {
        assert!(check_syntax("ok.js", "for (const x of [1, 2]) console.log(x);").is_ok());
    }
}
