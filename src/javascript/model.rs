//! JavaScript implementation of [`SemanticModel`]
//!
//! @module javascript/model

use super::binder::Bindings;
use super::blocks::AssignmentFacts;
use crate::semantic::{DataFlow, DeclaringSyntax, SemanticModel, Symbol, SymbolId};
use crate::syntax::Statement;
use crate::text::SourceSpan;
use std::collections::{BTreeMap, HashSet};

/// Symbol table and dataflow facts for one JavaScript document
#[derive(Debug)]
pub struct JsSemanticModel {
    bindings: Bindings,
    assignments: AssignmentFacts,
}

impl JsSemanticModel {
    pub(crate) fn new(bindings: Bindings, assignments: AssignmentFacts) -> Self {
        Self {
            bindings,
            assignments,
        }
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.bindings.symbol(id)
    }

    /// Every symbol the document declares, in declaration order
    pub fn symbols(&self) -> &[Symbol] {
        &self.bindings.symbols
    }

    /// Find a symbol by name (first declaration wins)
    pub fn symbol_named(&self, name: &str) -> Option<&Symbol> {
        self.bindings.symbols.iter().find(|s| s.name == name)
    }
}

impl SemanticModel for JsSemanticModel {
    fn lookup_symbols_at(&self, offset: usize) -> Vec<Symbol> {
        let mut shadowed: HashSet<&str> = HashSet::new();
        let mut visible = Vec::new();

        let mut scope = Some(self.bindings.scope_at(offset));
        while let Some(idx) = scope {
            let current = &self.bindings.scopes[idx];
            for id in &current.bindings {
                let symbol = &self.bindings.symbols[id.0 as usize];
                // An inner binding hides outer ones even before its declaration runs
                if !shadowed.insert(symbol.name.as_str()) {
                    continue;
                }
                if symbol.declared_at.start < offset {
                    visible.push(symbol.clone());
                }
            }
            scope = current.parent;
        }

        if let Some(class) = self.bindings.class_at(offset) {
            visible.extend(
                class
                    .fields
                    .iter()
                    .filter_map(|id| self.bindings.symbol(*id))
                    .cloned(),
            );
        }

        visible
    }

    fn data_flow(&self, statements: &[Statement]) -> DataFlow {
        let (Some(first), Some(last)) = (statements.first(), statements.last()) else {
            return DataFlow::default();
        };

        let always_assigned = statements
            .iter()
            .filter_map(|s| self.assignments.get(&s.id))
            .flatten()
            .copied()
            .collect();

        let (start, end) = (first.span.start, last.span.end);
        let references = &self.bindings.references;
        let from = references.partition_point(|r| r.span.start < start);

        // first access per symbol decides whether its incoming value is used
        let mut first_access: BTreeMap<SymbolId, bool> = BTreeMap::new();
        for reference in references[from..].iter().take_while(|r| r.span.start < end) {
            first_access
                .entry(reference.symbol)
                .or_insert(reference.is_write);
        }

        let flows_in = first_access
            .into_iter()
            .filter(|(_, is_write)| !is_write)
            .filter_map(|(id, _)| self.bindings.symbol(id))
            .filter(|s| s.is_local())
            .filter(|s| !(start <= s.declared_at.start && s.declared_at.start < end))
            .map(|s| s.id)
            .collect();

        DataFlow {
            always_assigned,
            flows_in,
        }
    }

    fn declaring_syntax(&self, symbol: &Symbol) -> Option<DeclaringSyntax> {
        self.bindings.declarations.get(symbol.id.0 as usize).copied()
    }

    fn find_references(&self, symbol: &Symbol) -> Vec<SourceSpan> {
        self.bindings
            .references
            .iter()
            .filter(|r| r.symbol == symbol.id)
            .map(|r| r.span)
            .collect()
    }
}
