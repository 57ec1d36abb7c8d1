//! Scope & Assignment Analyzer
//!
//! Decides, for every statement in an instrumented block, which variables can
//! be read right before it runs without observing an unassigned local.
//!
//! For a block with statements `s0..sn`:
//! - `parent_assigned` = locals of the enclosing statement's augmentation
//!   ∪ its inner-scope locals ∪ locals flowing into `s0`
//! - before `si`: `parent_assigned` ∪ locals always assigned by `s0..s(i-1)`
//! - locals are the visible locals in that set; parameters are every
//!   visible parameter; fields are static fields, plus instance fields when
//!   the enclosing method has a receiver
//!
//! @module instrument/analyzer

use super::augmentation::{Augmentation, AugmentationMap};
use crate::core::error::Result;
use crate::semantic::{SemanticModel, Symbol, SymbolId, SymbolKind};
use crate::syntax::{Block, BlockKind, Statement, SyntaxTree};
use crate::text::{FilePosition, LinePositionSpan};
use std::collections::BTreeSet;

/// Result of analyzing one document
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub augmentations: AugmentationMap,
    /// Every symbol visible at some instrumented statement
    pub visible_symbols: BTreeSet<Symbol>,
}

pub struct Analyzer<'a, M: SemanticModel + ?Sized> {
    tree: &'a SyntaxTree,
    model: &'a M,
    regions: Option<&'a [LinePositionSpan]>,
    augmentations: AugmentationMap,
    visible_symbols: BTreeSet<Symbol>,
}

impl<'a, M: SemanticModel + ?Sized> Analyzer<'a, M> {
    /// Analyze every block of `tree`
    ///
    /// With `regions`, only statements whose lines overlap one of the regions
    /// are recorded; statements outside still feed their nested blocks.
    pub fn analyze(tree: &'a SyntaxTree, model: &'a M, regions: Option<&'a [LinePositionSpan]>) -> Result<Analysis> {
        let mut analyzer = Analyzer {
            tree,
            model,
            regions,
            augmentations: AugmentationMap::new(),
            visible_symbols: BTreeSet::new(),
        };

        analyzer.visit_block(&tree.entry, None, false)?;

        tracing::debug!(
            file = %tree.file,
            augmentations = analyzer.augmentations.len(),
            symbols = analyzer.visible_symbols.len(),
            "Analyzed document"
        );

        Ok(Analysis {
            augmentations: analyzer.augmentations,
            visible_symbols: analyzer.visible_symbols,
        })
    }

    fn qualifies(&self, statement: &Statement) -> bool {
        match self.regions {
            None => true,
            Some(regions) => {
                let lines = statement.span.line_span();
                regions.iter().any(|region| region.overlaps(&lines))
            }
        }
    }

    fn visit_block(&mut self, block: &Block, parent: Option<&Augmentation>, receiver: bool) -> Result<()> {
        let receiver = match block.kind {
            BlockKind::Entry | BlockKind::Function => false,
            BlockKind::Method { is_static } => !is_static,
            BlockKind::Lambda { .. } | BlockKind::Nested => receiver,
        };

        let Some(first) = block.statements.first() else {
            return Ok(());
        };

        let mut parent_assigned: BTreeSet<SymbolId> = parent
            .map(|p| {
                p.locals
                    .iter()
                    .map(|s| s.id)
                    .chain(p.inner_scope_locals.iter().copied())
                    .collect()
            })
            .unwrap_or_default();
        parent_assigned.extend(self.model.data_flow(std::slice::from_ref(first)).flows_in);

        for (i, statement) in block.statements.iter().enumerate() {
            let mut assigned = parent_assigned.clone();
            if i > 0 {
                assigned.extend(self.model.data_flow(&block.statements[..i]).always_assigned);
            }

            let augmentation = self.augment(statement, &assigned, receiver);
            if self.qualifies(statement) {
                self.augmentations.insert(augmentation.clone())?;
            }

            for nested in &statement.nested {
                self.visit_block(nested, Some(&augmentation), receiver)?;
            }
        }

        Ok(())
    }

    fn augment(&mut self, statement: &Statement, assigned: &BTreeSet<SymbolId>, receiver: bool) -> Augmentation {
        let visible = self.model.lookup_symbols_at(statement.span.start);

        let select = |keep: &dyn Fn(&Symbol) -> bool| -> Vec<Symbol> {
            let mut out: Vec<Symbol> = visible.iter().filter(|s| keep(*s)).cloned().collect();
            out.sort_by_key(|s| s.id);
            out
        };
        let locals = select(&|s| s.kind == SymbolKind::Local && assigned.contains(&s.id));
        let fields = select(&|s| s.kind == SymbolKind::Field && (s.is_static() || receiver));
        let parameters = select(&|s| s.kind == SymbolKind::Parameter);

        let inner_scope_locals = statement
            .nested
            .iter()
            .flat_map(|block| {
                let flow = self.model.data_flow(&block.statements);
                flow.always_assigned.into_iter().chain(flow.flows_in)
            })
            .collect();

        if self.qualifies(statement) {
            self.visible_symbols.extend(visible.iter().cloned());
        }

        Augmentation {
            statement: statement.id,
            locals,
            fields,
            parameters,
            inner_scope_locals,
            position: FilePosition::new(self.tree.file.as_str(), statement.span.start_position),
        }
    }
}

/// Analyze `tree` against `model`
pub fn analyze<M: SemanticModel + ?Sized>(
    tree: &SyntaxTree,
    model: &M,
    regions: Option<&[LinePositionSpan]>,
) -> Result<Analysis> {
    Analyzer::analyze(tree, model, regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::javascript;

    fn names(symbols: &[Symbol]) -> Vec<&str> {
        symbols.iter().map(|s| s.name.as_str()).collect()
    }

    /// Augmentation of the statement starting on `line`
    fn at_line(analysis: &Analysis, line: usize) -> &Augmentation {
        analysis
            .augmentations
            .values()
            .find(|a| a.position.line == line)
            .unwrap_or_else(|| panic!("No augmentation on line {}", line))
    }

    #[test]
    fn test_locals_appear_after_assignment() {
        let source = "let a = 1;\nlet b;\nb = a + 1;\nconsole.log(a, b);\n";
        let document = javascript::parse("main.js", source).unwrap();
        let analysis = analyze(&document.tree, &document.model, None).unwrap();

        assert_eq!(analysis.augmentations.len(), 4);
        assert!(at_line(&analysis, 0).locals.is_empty());
        assert_eq!(names(&at_line(&analysis, 1).locals), vec!["a"]);
        assert_eq!(names(&at_line(&analysis, 2).locals), vec!["a"], "b is declared but unassigned");
        assert_eq!(names(&at_line(&analysis, 3).locals), vec!["a", "b"]);
    }

    #[test]
    fn test_conditional_assignment_is_not_definite() {
        let source = "let x;\nif (Math.random() > 0.5) { x = 1; }\nconsole.log(x);\n";
        let document = javascript::parse("main.js", source).unwrap();
        let analysis = analyze(&document.tree, &document.model, None).unwrap();

        assert!(
            at_line(&analysis, 2).locals.is_empty(),
            "x is only assigned on one branch"
        );
    }

    #[test]
    fn test_parameters_and_outer_locals_in_function() {
        let source = "const base = 10;\nfunction add(n) {\n  const sum = base + n;\n  return sum;\n}\nadd(1);\n";
        let document = javascript::parse("main.js", source).unwrap();
        let analysis = analyze(&document.tree, &document.model, None).unwrap();

        let first = at_line(&analysis, 2);
        assert_eq!(names(&first.parameters), vec!["n"]);
        assert_eq!(names(&first.locals), vec!["base"], "base flows into the body");

        let second = at_line(&analysis, 3);
        assert_eq!(names(&second.locals), vec!["base", "sum"]);
    }

    #[test]
    fn test_fields_follow_receiver() {
        let source = concat!(
            "class Counter {\n",
            "  static created = 0;\n",
            "  count = 0;\n",
            "  bump() {\n",
            "    this.count++;\n",
            "  }\n",
            "  static make() {\n",
            "    Counter.created++;\n",
            "  }\n",
            "}\n",
        );
        let document = javascript::parse("main.js", source).unwrap();
        let analysis = analyze(&document.tree, &document.model, None).unwrap();

        assert_eq!(names(&at_line(&analysis, 4).fields), vec!["created", "count"]);
        assert_eq!(
            names(&at_line(&analysis, 7).fields),
            vec!["created"],
            "Static methods only see static fields"
        );
    }

    #[test]
    fn test_function_does_not_inherit_receiver() {
        let source = concat!(
            "class Box {\n",
            "  value = 1;\n",
            "  run() {\n",
            "    const f = function () {\n",
            "      return 1;\n",
            "    };\n",
            "    const g = () => {\n",
            "      return 2;\n",
            "    };\n",
            "  }\n",
            "}\n",
        );
        let document = javascript::parse("main.js", source).unwrap();
        let analysis = analyze(&document.tree, &document.model, None).unwrap();

        assert!(at_line(&analysis, 4).fields.is_empty(), "function rebinds this");
        assert_eq!(names(&at_line(&analysis, 7).fields), vec!["value"], "arrow keeps this");
    }

    #[test]
    fn test_regions_restrict_statements() {
        let source = "let a = 1;\nlet b = 2;\nlet c = 3;\nlet d = 4;\n";
        let document = javascript::parse("main.js", source).unwrap();
        let regions = [LinePositionSpan::lines(1, 2)];
        let analysis = analyze(&document.tree, &document.model, Some(&regions)).unwrap();

        let lines: Vec<usize> = analysis.augmentations.values().map(|a| a.position.line).collect();
        assert_eq!(lines, vec![1, 2]);
        assert_eq!(names(&at_line(&analysis, 2).locals), vec!["a", "b"]);
    }

    #[test]
    fn test_region_without_statements_is_empty() {
        let source = "let a = 1;\n\n\n";
        let document = javascript::parse("main.js", source).unwrap();
        let regions = [LinePositionSpan::lines(2, 3)];
        let analysis = analyze(&document.tree, &document.model, Some(&regions)).unwrap();

        assert!(analysis.augmentations.is_empty());
        assert!(analysis.visible_symbols.is_empty());
    }

    #[test]
    fn test_every_statement_augmented_once() {
        let source = concat!(
            "const xs = [1, 2, 3];\n",
            "let total = 0;\n",
            "for (const x of xs) {\n",
            "  if (x > 1) {\n",
            "    total += x;\n",
            "  } else {\n",
            "    total -= x;\n",
            "  }\n",
            "}\n",
            "const double = v => v * 2;\n",
            "console.log(double(total));\n",
        );
        let document = javascript::parse("main.js", source).unwrap();
        let analysis = analyze(&document.tree, &document.model, None).unwrap();

        let statements = document.tree.statements().len();
        let keys: BTreeSet<_> = analysis.augmentations.keys().collect();
        assert_eq!(analysis.augmentations.len(), statements);
        assert_eq!(keys.len(), statements, "Statement keys must be distinct");
    }

    #[test]
    fn test_locals_are_always_assigned_before_statement() {
        let source = concat!(
            "let a = 1;\n",
            "let b;\n",
            "if (a) { b = 2; } else { b = 3; }\n",
            "let c;\n",
            "while (a < 3) { c = a; a++; }\n",
            "console.log(a, b, c);\n",
        );
        let document = javascript::parse("main.js", source).unwrap();
        let analysis = analyze(&document.tree, &document.model, None).unwrap();

        let entry = &document.tree.entry.statements;
        for (i, statement) in entry.iter().enumerate() {
            let augmentation = analysis.augmentations.get(statement.id).unwrap();
            let before = document.model.data_flow(&entry[..i]).always_assigned;
            for local in &augmentation.locals {
                assert!(
                    before.contains(&local.id),
                    "{} observed before it is definitely assigned",
                    local.name
                );
            }
        }
        assert_eq!(names(&at_line(&analysis, 5).locals), vec!["a", "b"], "c is assigned only in a loop");
    }

    /// Check every statement of `block` (and below) against the assignment rule
    fn check_assigned_before<M: SemanticModel>(
        block: &Block,
        parent: Option<&Augmentation>,
        analysis: &Analysis,
        model: &M,
    ) -> usize {
        let Some(first) = block.statements.first() else {
            return 0;
        };
        let mut parent_assigned: BTreeSet<SymbolId> = parent
            .map(|p| p.locals.iter().map(|s| s.id).chain(p.inner_scope_locals.iter().copied()).collect())
            .unwrap_or_default();
        parent_assigned.extend(model.data_flow(std::slice::from_ref(first)).flows_in);

        let mut checked = 0;
        for (i, statement) in block.statements.iter().enumerate() {
            let augmentation = analysis.augmentations.get(statement.id).unwrap();
            let mut assigned = parent_assigned.clone();
            assigned.extend(model.data_flow(&block.statements[..i]).always_assigned);
            for local in &augmentation.locals {
                assert!(
                    assigned.contains(&local.id),
                    "{} observed at line {} before it is assigned",
                    local.name,
                    augmentation.position.line
                );
            }
            checked += 1;
            for nested in &statement.nested {
                checked += check_assigned_before(nested, Some(augmentation), analysis, model);
            }
        }
        checked
    }

    #[test]
    fn test_nested_locals_are_assigned_before_statement() {
        let source = concat!(
            "let a = 1;\n",
            "function f(p) {\n",
            "  let x;\n",
            "  if (p) {\n",
            "    let y = 2;\n",
            "    x = y;\n",
            "    console.log(x, y);\n",
            "  }\n",
            "  let z = 3;\n",
            "  return z;\n",
            "}\n",
            "f(a);\n",
        );
        let document = javascript::parse("main.js", source).unwrap();
        let analysis = analyze(&document.tree, &document.model, None).unwrap();

        let checked = check_assigned_before(&document.tree.entry, None, &analysis, &document.model);
        assert_eq!(checked, document.tree.statements().len(), "Every statement is checked");

        let inner = names(&at_line(&analysis, 6).locals);
        assert!(inner.contains(&"x") && inner.contains(&"y"), "x and y are assigned in the if block");
        assert!(
            !names(&at_line(&analysis, 8).locals).contains(&"z"),
            "z is not observed before its own declaration"
        );
        assert!(names(&at_line(&analysis, 9).locals).contains(&"z"));
    }
}
