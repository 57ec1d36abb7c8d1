//! Statement-List Lowering
//!
//! Turns the tree-sitter tree into the crate's block/statement tree. Only
//! real statement lists (program, `{ ... }` blocks, `case` bodies) and
//! expression-bodied arrow functions become blocks; a statement that is the
//! bare body of an `if`/loop is not an insertion point, but blocks inside it
//! are still found.
//!
//! @module javascript/blocks

use super::binder::{has_keyword, Bindings};
use super::flow;
use crate::semantic::SymbolId;
use crate::syntax::{Block, BlockKind, NodeId, Statement};
use crate::text::{SourceSpan, SourceText};
use std::collections::{BTreeSet, HashMap};
use tree_sitter::Node;

/// Per-statement definite assignment facts keyed by statement id
pub(crate) type AssignmentFacts = HashMap<NodeId, BTreeSet<SymbolId>>;

pub(crate) struct Lowerer<'a> {
    source: &'a SourceText,
    bindings: &'a Bindings,
    next_id: u32,
    assignments: AssignmentFacts,
}

impl<'a> Lowerer<'a> {
    /// Lower a program root into its entry block
    pub fn lower(root: Node, source: &'a SourceText, bindings: &'a Bindings) -> (Block, AssignmentFacts) {
        let mut lowerer = Lowerer {
            source,
            bindings,
            next_id: 0,
            assignments: HashMap::new(),
        };
        let entry = lowerer.lower_list(root, BlockKind::Entry);
        (entry, lowerer.assignments)
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn span(&self, node: Node) -> SourceSpan {
        self.source.span(node.start_byte(), node.end_byte())
    }

    fn is_directive(&self, node: Node) -> bool {
        node.kind() == "expression_statement"
            && node.named_child_count() == 1
            && node.named_child(0).map(|c| c.kind() == "string").unwrap_or(false)
    }

    /// Statements of a list, minus comments, empty statements and (for
    /// program and function bodies) the directive prologue
    fn statement_nodes<'t>(&self, candidates: Vec<Node<'t>>, skip_directives: bool) -> Vec<Node<'t>> {
        let mut statements: Vec<Node<'t>> = candidates
            .into_iter()
            .filter(|n| !matches!(n.kind(), "comment" | "hash_bang_line" | "empty_statement"))
            .collect();
        if skip_directives {
            let prologue = statements
                .iter()
                .take_while(|n| self.is_directive(**n))
                .count();
            statements.drain(..prologue);
        }
        statements
    }

    fn lower_list(&mut self, node: Node, kind: BlockKind) -> Block {
        let id = self.next_id();
        let mut cursor = node.walk();
        let candidates: Vec<Node> = node.named_children(&mut cursor).collect();
        let nodes = self.statement_nodes(candidates, kind != BlockKind::Nested);
        let statements = nodes.into_iter().map(|n| self.lower_statement(n)).collect();
        Block {
            id,
            kind,
            span: self.span(node),
            statements,
        }
    }

    fn lower_case(&mut self, node: Node) -> Block {
        let id = self.next_id();
        let mut cursor = node.walk();
        let candidates: Vec<Node> = node.children_by_field_name("body", &mut cursor).collect();
        let nodes = self.statement_nodes(candidates, false);
        let statements = nodes.into_iter().map(|n| self.lower_statement(n)).collect();
        Block {
            id,
            kind: BlockKind::Nested,
            span: self.span(node),
            statements,
        }
    }

    /// `x => expr` becomes a block holding one implicit statement
    fn lower_expression_body(&mut self, body: Node) -> Block {
        let id = self.next_id();
        let statement_id = self.next_id();
        self.assignments
            .insert(statement_id, flow::expression_assignments(self.bindings, body));
        let nested = self.blocks_within(body);
        Block {
            id,
            kind: BlockKind::Lambda {
                expression_bodied: true,
            },
            span: self.span(body),
            statements: vec![Statement {
                id: statement_id,
                span: self.span(body),
                nested,
            }],
        }
    }

    fn lower_statement(&mut self, node: Node) -> Statement {
        let id = self.next_id();
        self.assignments
            .insert(id, flow::statement_assignments(self.bindings, node));
        let nested = self.blocks_within(node);
        Statement {
            id,
            span: self.span(node),
            nested,
        }
    }

    /// Owner of a `{ ... }` block
    fn block_kind(&self, block: Node) -> BlockKind {
        let Some(parent) = block.parent() else {
            return BlockKind::Nested;
        };
        match parent.kind() {
            "function_declaration"
            | "function_expression"
            | "function"
            | "generator_function_declaration"
            | "generator_function" => BlockKind::Function,
            "arrow_function" => BlockKind::Lambda {
                expression_bodied: false,
            },
            "method_definition" => {
                let in_class = parent
                    .parent()
                    .map(|p| p.kind() == "class_body")
                    .unwrap_or(false);
                if in_class {
                    BlockKind::Method {
                        is_static: has_keyword(parent, "static"),
                    }
                } else {
                    BlockKind::Function
                }
            }
            "class_static_block" => BlockKind::Method { is_static: true },
            _ => BlockKind::Nested,
        }
    }

    fn as_block(&mut self, node: Node) -> Option<Block> {
        match node.kind() {
            "statement_block" => {
                let kind = self.block_kind(node);
                Some(self.lower_list(node, kind))
            }
            "switch_case" | "switch_default" => Some(self.lower_case(node)),
            "arrow_function" => {
                let body = node.child_by_field_name("body")?;
                if body.kind() == "statement_block" {
                    None
                } else {
                    Some(self.lower_expression_body(body))
                }
            }
            _ => None,
        }
    }

    /// Blocks directly inside `node` (or `node` itself when it is one)
    fn blocks_within(&mut self, node: Node) -> Vec<Block> {
        if let Some(block) = self.as_block(node) {
            return vec![block];
        }
        let mut out = Vec::new();
        self.find_blocks(node, &mut out);
        out
    }

    fn find_blocks(&mut self, node: Node, out: &mut Vec<Block>) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            match self.as_block(child) {
                Some(block) => out.push(block),
                None => self.find_blocks(child, out),
            }
        }
    }
}
