//! Augmentation Model
//!
//! One [`Augmentation`] per instrumented statement, collected in an
//! [`AugmentationMap`] keyed by statement identity.
//!
//! @module instrument/augmentation

use crate::core::error::{Error, Result};
use crate::semantic::{Symbol, SymbolId};
use crate::syntax::NodeId;
use crate::text::FilePosition;
use crate::wire::payload::{DeclarationSpan, ProgramStateAtPosition, VariableState};
use serde::Serialize;
use std::collections::{btree_map, BTreeMap, BTreeSet};

/// Variables safe to observe right before one statement runs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Augmentation {
    pub statement: NodeId,
    pub locals: Vec<Symbol>,
    pub fields: Vec<Symbol>,
    pub parameters: Vec<Symbol>,
    /// Locals nested blocks of this statement assign or read from outside
    pub inner_scope_locals: BTreeSet<SymbolId>,
    pub position: FilePosition,
}

impl Augmentation {
    pub fn variable_count(&self) -> usize {
        self.locals.len() + self.fields.len() + self.parameters.len()
    }

    /// Observable variables in wire order: locals, parameters, fields
    pub fn variables(&self) -> impl Iterator<Item = &Symbol> {
        self.locals
            .iter()
            .chain(&self.parameters)
            .chain(&self.fields)
    }

    /// The state payload with every value left as `null`
    pub fn state_template(&self) -> ProgramStateAtPosition {
        let describe = |symbols: &[Symbol]| -> Vec<VariableState> {
            symbols
                .iter()
                .map(|s| VariableState {
                    name: s.name.clone(),
                    value: serde_json::Value::Null,
                    declared_at: Some(DeclarationSpan {
                        start: s.declared_at.start,
                        end: s.declared_at.end,
                    }),
                })
                .collect()
        };

        ProgramStateAtPosition {
            file_position: self.position.clone(),
            locals: describe(&self.locals),
            parameters: describe(&self.parameters),
            fields: describe(&self.fields),
            ..Default::default()
        }
    }
}

/// Statement id → augmentation, at most one entry per statement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AugmentationMap {
    entries: BTreeMap<NodeId, Augmentation>,
}

impl AugmentationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an augmentation; a second one for the same statement is an error
    pub fn insert(&mut self, augmentation: Augmentation) -> Result<()> {
        match self.entries.entry(augmentation.statement) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(augmentation);
                Ok(())
            }
            btree_map::Entry::Occupied(slot) => Err(Error::Instrumentation {
                message: format!("Statement {} augmented twice", slot.key()),
            }),
        }
    }

    pub fn get(&self, statement: NodeId) -> Option<&Augmentation> {
        self.entries.get(&statement)
    }

    pub fn contains(&self, statement: NodeId) -> bool {
        self.entries.contains_key(&statement)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = &Augmentation> {
        self.entries.values()
    }

    /// Keep the entries `f` maps to `Some`, replacing them with its result
    pub fn filter_map<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&Augmentation) -> Option<Augmentation>,
    {
        Self {
            entries: self
                .entries
                .iter()
                .filter_map(|(id, a)| f(a).map(|mapped| (*id, mapped)))
                .collect(),
        }
    }
}

impl IntoIterator for AugmentationMap {
    type Item = Augmentation;
    type IntoIter = btree_map::IntoValues<NodeId, Augmentation>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::{SymbolFlags, SymbolKind};
    use crate::text::{LinePosition, SourceSpan};

    fn augmentation(statement: u32, line: usize) -> Augmentation {
        Augmentation {
            statement: NodeId(statement),
            locals: Vec::new(),
            fields: Vec::new(),
            parameters: Vec::new(),
            inner_scope_locals: BTreeSet::new(),
            position: FilePosition::new("main.js", LinePosition::new(line, 0)),
        }
    }

    #[test]
    fn test_insert_rejects_duplicate_statement() {
        let mut map = AugmentationMap::new();

        map.insert(augmentation(1, 0)).unwrap();
        map.insert(augmentation(2, 1)).unwrap();
        let err = map.insert(augmentation(1, 5));

        assert!(err.is_err(), "Same statement must not be augmented twice");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(NodeId(1)).unwrap().position.line, 0);
    }

    #[test]
    fn test_state_template_orders_and_nulls_values() {
        let symbol = |id: u32, name: &str, kind: SymbolKind| Symbol {
            id: SymbolId(id),
            name: name.to_string(),
            kind,
            flags: SymbolFlags::empty(),
            declared_at: SourceSpan {
                start: 10,
                end: 11,
                ..Default::default()
            },
            container: None,
        };

        let mut aug = augmentation(3, 2);
        aug.locals.push(symbol(0, "x", SymbolKind::Local));
        aug.parameters.push(symbol(1, "n", SymbolKind::Parameter));

        let template = aug.state_template();
        let names: Vec<&str> = aug.variables().map(|s| s.name.as_str()).collect();

        assert_eq!(names, vec!["x", "n"]);
        assert_eq!(template.locals[0].value, serde_json::Value::Null);
        assert_eq!(template.parameters[0].declared_at, Some(DeclarationSpan { start: 10, end: 11 }));
        assert_eq!(template.file_position.line, 2);
        assert!(template.output_range.is_none(), "Generated code never fills the output range");
    }

    #[test]
    fn test_filter_map_keeps_keys() {
        let mut map = AugmentationMap::new();
        map.insert(augmentation(1, 3)).unwrap();
        map.insert(augmentation(2, 8)).unwrap();

        let kept = map.filter_map(|a| (a.position.line < 5).then(|| a.clone()));

        assert_eq!(kept.keys().collect::<Vec<_>>(), vec![NodeId(1)]);
    }
}
