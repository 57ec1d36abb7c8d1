//! Instrumentation Code Generator
//!
//! Rewrites program text by inserting dump calls. Insertions never contain
//! line breaks, so every original line keeps its number and every
//! augmentation position stays valid for the rewritten program.
//!
//! Layout of the rewritten entry block:
//! ```text
//! <prelude><location dump><state dump>first statement ...
//! ```
//!
//! @module instrument/generator

use super::augmentation::{Augmentation, AugmentationMap};
use super::locations::VariableLocationMap;
use crate::core::error::{Error, Result};
use crate::semantic::Symbol;
use crate::syntax::{Block, BlockKind, NodeId, Statement, SyntaxTree};
use std::cmp::Reverse;
use std::collections::HashMap;

// =============================================================================
// DIALECT
// =============================================================================

/// Target-language snippets the generator splices into a program
pub trait Dialect {
    /// Helper definitions placed before the first entry statement
    fn prelude(&self) -> String;

    /// Statement printing a raw JSON payload between sentinels
    fn emit_payload(&self, json: &str) -> String;

    /// Statement filling `template` with `values` and printing it
    ///
    /// `values` holds one expression per variable, in the template's
    /// locals, parameters, fields order.
    fn emit_state(&self, template: &str, values: &[String]) -> String;

    /// Deferred expression reading the current value of `symbol`
    fn value_expression(&self, symbol: &Symbol) -> String;

    /// Text turning an expression body into a block that runs `dump` first
    fn expression_body_open(&self, dump: &str) -> String;

    fn expression_body_close(&self) -> String;
}

// =============================================================================
// GENERATOR
// =============================================================================

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    /// Closes an expression body; inner bodies first
    Close(Reverse<usize>),
    Open,
}

#[derive(Debug)]
struct Insertion {
    offset: usize,
    phase: Phase,
    text: String,
}

pub struct Generator<'a, D: Dialect + ?Sized> {
    tree: &'a SyntaxTree,
    dialect: &'a D,
}

impl<'a, D: Dialect + ?Sized> Generator<'a, D> {
    pub fn new(tree: &'a SyntaxTree, dialect: &'a D) -> Self {
        Self { tree, dialect }
    }

    /// Produce the rewritten program
    ///
    /// Fails when an augmentation names a statement the tree does not have.
    pub fn generate(
        &self,
        augmentations: &AugmentationMap,
        locations: &VariableLocationMap,
        emit_locations: bool,
    ) -> Result<String> {
        let index = self.statement_index();
        if let Some(missing) = augmentations.keys().find(|id| !index.contains_key(id)) {
            return Err(Error::Instrumentation {
                message: format!("Augmented statement {} is not in {}", missing, self.tree.file),
            });
        }

        let mut insertions = Vec::new();

        if let Some(first) = self.tree.entry.statements.first() {
            let mut header = self.dialect.prelude();
            if emit_locations && locations.has_locations() {
                let dump = serde_json::to_string(&locations.to_dump())?;
                header.push_str(&self.dialect.emit_payload(&dump));
            }
            insertions.push(Insertion {
                offset: first.span.start,
                phase: Phase::Open,
                text: header,
            });
        }

        for augmentation in augmentations.values() {
            let (statement, kind) = index[&augmentation.statement];
            let dump = self.state_dump(augmentation)?;

            if kind.is_expression_bodied() {
                insertions.push(Insertion {
                    offset: statement.span.start,
                    phase: Phase::Open,
                    text: self.dialect.expression_body_open(&dump),
                });
                insertions.push(Insertion {
                    offset: statement.span.end,
                    phase: Phase::Close(Reverse(statement.span.start)),
                    text: self.dialect.expression_body_close(),
                });
            } else {
                insertions.push(Insertion {
                    offset: statement.span.start,
                    phase: Phase::Open,
                    text: dump,
                });
            }
        }

        // stable: the header stays ahead of the first statement's own dump
        insertions.sort_by(|a, b| (a.offset, &a.phase).cmp(&(b.offset, &b.phase)));

        let source = self.tree.source.as_str();
        let extra: usize = insertions.iter().map(|i| i.text.len()).sum();
        let mut out = String::with_capacity(source.len() + extra);
        let mut copied = 0;
        for insertion in &insertions {
            out.push_str(&source[copied..insertion.offset]);
            out.push_str(&insertion.text);
            copied = insertion.offset;
        }
        out.push_str(&source[copied..]);

        tracing::debug!(
            file = %self.tree.file,
            insertions = insertions.len(),
            bytes = out.len(),
            "Generated instrumented program"
        );

        Ok(out)
    }

    fn state_dump(&self, augmentation: &Augmentation) -> Result<String> {
        let template = serde_json::to_string(&augmentation.state_template())?;
        let values: Vec<String> = augmentation
            .variables()
            .map(|symbol| self.dialect.value_expression(symbol))
            .collect();
        Ok(self.dialect.emit_state(&template, &values))
    }

    /// Statement id → statement and the kind of block holding it
    fn statement_index(&self) -> HashMap<NodeId, (&'a Statement, BlockKind)> {
        let mut index = HashMap::new();
        fn walk<'t>(block: &'t Block, index: &mut HashMap<NodeId, (&'t Statement, BlockKind)>) {
            for statement in &block.statements {
                index.insert(statement.id, (statement, block.kind));
                for nested in &statement.nested {
                    walk(nested, index);
                }
            }
        }
        walk(&self.tree.entry, &mut index);
        index
    }
}

/// Rewrite `tree` with a dump before every augmented statement
pub fn generate<D: Dialect + ?Sized>(
    tree: &SyntaxTree,
    dialect: &D,
    augmentations: &AugmentationMap,
    locations: &VariableLocationMap,
    emit_locations: bool,
) -> Result<String> {
    Generator::new(tree, dialect).generate(augmentations, locations, emit_locations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{analyzer, locations};
    use crate::javascript::{self, JavaScriptDialect};
    use crate::text::{FilePosition, LinePosition};
    use crate::wire::SENTINEL;
    use std::collections::BTreeSet;

    fn rewrite(source: &str, emit_locations: bool) -> String {
        let document = javascript::parse("main.js", source).unwrap();
        let analysis = analyzer::analyze(&document.tree, &document.model, None).unwrap();
        let index = locations::build_index(&analysis.visible_symbols, &document.model);
        generate(
            &document.tree,
            &JavaScriptDialect,
            &analysis.augmentations,
            &index,
            emit_locations,
        )
        .unwrap()
    }

    #[test]
    fn test_line_numbers_preserved() {
        let source = "let a = 1;\n\nfunction f(x) {\n  return x + a;\n}\nconsole.log(f(2));\n";
        let output = rewrite(source, true);

        assert_eq!(output.lines().count(), source.lines().count());
        for (original, rewritten) in source.lines().zip(output.lines()) {
            assert!(
                rewritten.ends_with(original),
                "Original text should survive at the end of its line: {:?}",
                rewritten
            );
        }
        assert!(javascript::check_syntax("out.js", &output).is_ok());
    }

    #[test]
    fn test_header_order() {
        let output = rewrite("let a = 1;\nconsole.log(a);\n", true);
        let first_line = output.lines().next().unwrap();

        let prelude = first_line.find("function __stepwise_emit").unwrap();
        let dump = first_line.find("__stepwise_emit({\"variableLocations\"").unwrap();
        let state = first_line.find("__stepwise_state({").unwrap();
        let statement = first_line.find("let a = 1;").unwrap();
        assert!(prelude < dump && dump < state && state < statement);
    }

    #[test]
    fn test_location_dump_optional() {
        let with = rewrite("let a = 1;\n", true);
        let without = rewrite("let a = 1;\n", false);

        assert!(with.contains("variableLocations"));
        assert!(!without.contains("variableLocations"));
        assert!(without.contains(SENTINEL), "Prelude still carries the sentinel");
    }

    #[test]
    fn test_no_location_dump_without_locations() {
        let output = rewrite("console.log(1);\n", true);
        assert!(!output.contains("variableLocations"), "No variables means no location dump");
    }

    #[test]
    fn test_expression_bodied_lambda_wrapped() {
        let output = rewrite("const inc = n => n + 1;\n", false);

        assert!(output.contains("n => { __stepwise_state("), "{}", output);
        assert!(output.contains("return (n + 1); };"), "{}", output);
        assert!(javascript::check_syntax("out.js", &output).is_ok());
    }

    #[test]
    fn test_nested_expression_bodies_close_inside_out() {
        let output = rewrite("const add = a => b => a + b;\n", false);

        assert!(output.contains("return (a + b); }); };"), "{}", output);
        assert!(javascript::check_syntax("out.js", &output).is_ok());
    }

    #[test]
    fn test_state_values_follow_template_order() {
        let source = "class C {\n  f = 1;\n  m(p) {\n    const l = 2;\n    return l;\n  }\n}\n";
        let output = rewrite(source, false);
        let line = output.lines().nth(4).unwrap();

        assert!(
            line.contains("[() => l, () => p, () => this.f]"),
            "Locals, then parameters, then fields: {}",
            line
        );
    }

    #[test]
    fn test_unknown_statement_rejected() {
        let document = javascript::parse("main.js", "let a = 1;\n").unwrap();
        let mut augmentations = AugmentationMap::new();
        augmentations
            .insert(Augmentation {
                statement: NodeId(999),
                locals: Vec::new(),
                fields: Vec::new(),
                parameters: Vec::new(),
                inner_scope_locals: BTreeSet::new(),
                position: FilePosition::new("main.js", LinePosition::new(0, 0)),
            })
            .unwrap();

        let result = generate(
            &document.tree,
            &JavaScriptDialect,
            &augmentations,
            &VariableLocationMap::new(),
            true,
        );
        assert!(matches!(result, Err(Error::Instrumentation { .. })));
    }
}
