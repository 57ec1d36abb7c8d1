//! Definite Assignment
//!
//! Computes, for one statement, the locals guaranteed to hold a value once
//! the statement completes normally. The analysis is conservative: when a
//! construct may skip an assignment (loops, short-circuit operators, an `if`
//! without `else`) nothing inside it counts.
//!
//! @module javascript/flow

use super::binder::{pattern_identifiers, Bindings};
use crate::semantic::SymbolId;
use std::collections::BTreeSet;
use tree_sitter::Node;

type Assigned = BTreeSet<SymbolId>;

fn resolved(bindings: &Bindings, node: Node) -> Option<SymbolId> {
    bindings.resolved.get(&node.start_byte()).copied()
}

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    let children = node.named_children(&mut cursor).collect();
    children
}

fn intersect(a: &Assigned, b: &Assigned) -> Assigned {
    a.intersection(b).copied().collect()
}

/// Locals definitely assigned by running `statement` to completion
pub(crate) fn statement_assignments(bindings: &Bindings, statement: Node) -> Assigned {
    match statement.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut out = Assigned::new();
            for declarator in named_children(statement) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                let Some(value) = declarator.child_by_field_name("value") else {
                    continue;
                };
                out.extend(expression_assignments(bindings, value));
                if let Some(name) = declarator.child_by_field_name("name") {
                    out.extend(pattern_identifiers(name).into_iter().filter_map(|n| resolved(bindings, n)));
                }
            }
            out
        }
        "expression_statement" => named_children(statement)
            .into_iter()
            .flat_map(|e| expression_assignments(bindings, e))
            .collect(),
        "statement_block" => named_children(statement)
            .into_iter()
            .flat_map(|s| statement_assignments(bindings, s))
            .collect(),
        "if_statement" => {
            let mut out = statement
                .child_by_field_name("condition")
                .map(|c| expression_assignments(bindings, c))
                .unwrap_or_default();
            let consequence = statement
                .child_by_field_name("consequence")
                .map(|c| statement_assignments(bindings, c));
            let alternative = statement
                .child_by_field_name("alternative")
                .and_then(|else_clause| named_children(else_clause).into_iter().next())
                .map(|a| statement_assignments(bindings, a));
            if let (Some(consequence), Some(alternative)) = (consequence, alternative) {
                out.extend(intersect(&consequence, &alternative));
            }
            out
        }
        "do_statement" => statement
            .child_by_field_name("body")
            .map(|b| statement_assignments(bindings, b))
            .unwrap_or_default(),
        "while_statement" | "switch_statement" => statement
            .child_by_field_name(if statement.kind() == "while_statement" {
                "condition"
            } else {
                "value"
            })
            .map(|c| expression_assignments(bindings, c))
            .unwrap_or_default(),
        "for_statement" => statement
            .child_by_field_name("initializer")
            .map(|i| statement_assignments(bindings, i))
            .unwrap_or_default(),
        "try_statement" => {
            let body = statement
                .child_by_field_name("body")
                .map(|b| statement_assignments(bindings, b))
                .unwrap_or_default();
            let mut out = match statement
                .child_by_field_name("handler")
                .and_then(|h| h.child_by_field_name("body"))
            {
                Some(handler) => intersect(&body, &statement_assignments(bindings, handler)),
                None => body,
            };
            if let Some(finalizer) = statement
                .child_by_field_name("finalizer")
                .and_then(|f| f.child_by_field_name("body"))
            {
                out.extend(statement_assignments(bindings, finalizer));
            }
            out
        }
        "labeled_statement" => statement
            .child_by_field_name("body")
            .map(|b| statement_assignments(bindings, b))
            .unwrap_or_default(),
        "return_statement" | "throw_statement" => named_children(statement)
            .into_iter()
            .flat_map(|e| expression_assignments(bindings, e))
            .collect(),
        _ => Assigned::new(),
    }
}

/// Locals definitely assigned while evaluating `expression`
///
/// Function bodies inside the expression are not evaluated here and never
/// contribute.
pub(crate) fn expression_assignments(bindings: &Bindings, expression: Node) -> Assigned {
    match expression.kind() {
        "assignment_expression" | "augmented_assignment_expression" => {
            let mut out = expression
                .child_by_field_name("right")
                .map(|r| expression_assignments(bindings, r))
                .unwrap_or_default();
            if let Some(left) = expression.child_by_field_name("left") {
                let targets = if left.kind() == "identifier" {
                    vec![left]
                } else {
                    pattern_identifiers(left)
                };
                out.extend(targets.into_iter().filter_map(|n| resolved(bindings, n)));
            }
            out
        }
        "binary_expression" => {
            let short_circuit = expression
                .child_by_field_name("operator")
                .map(|op| matches!(op.kind(), "&&" | "||" | "??"))
                .unwrap_or(false);
            let left = expression
                .child_by_field_name("left")
                .map(|l| expression_assignments(bindings, l))
                .unwrap_or_default();
            if short_circuit {
                return left;
            }
            let right = expression
                .child_by_field_name("right")
                .map(|r| expression_assignments(bindings, r))
                .unwrap_or_default();
            left.union(&right).copied().collect()
        }
        "ternary_expression" => {
            let mut out = expression
                .child_by_field_name("condition")
                .map(|c| expression_assignments(bindings, c))
                .unwrap_or_default();
            let consequence = expression
                .child_by_field_name("consequence")
                .map(|c| expression_assignments(bindings, c))
                .unwrap_or_default();
            let alternative = expression
                .child_by_field_name("alternative")
                .map(|a| expression_assignments(bindings, a))
                .unwrap_or_default();
            out.extend(intersect(&consequence, &alternative));
            out
        }
        "sequence_expression" | "parenthesized_expression" | "await_expression" | "unary_expression"
        | "arguments" | "array" | "spread_element" => named_children(expression)
            .into_iter()
            .flat_map(|e| expression_assignments(bindings, e))
            .collect(),
        "call_expression" | "new_expression" => {
            let mut out = expression
                .child_by_field_name("function")
                .or_else(|| expression.child_by_field_name("constructor"))
                .map(|f| expression_assignments(bindings, f))
                .unwrap_or_default();
            if let Some(arguments) = expression.child_by_field_name("arguments") {
                out.extend(expression_assignments(bindings, arguments));
            }
            out
        }
        _ => Assigned::new(),
    }
}
