//! Variable-Location Index
//!
//! Every place a variable is declared or mentioned, computed once per
//! document. Reference searches are independent per symbol and run on the
//! rayon pool.
//!
//! @module instrument/locations

use crate::semantic::{SemanticModel, Symbol};
use crate::text::SourceSpan;
use crate::wire::payload::{DeclarationSpan, LineRange, VariableLocationDump, VariableLocationEntry};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One mention of a variable (0-based lines and columns)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VariableLocation {
    pub variable: Symbol,
    pub start_line: usize,
    pub end_line: usize,
    pub start_column: usize,
    pub end_column: usize,
}

impl VariableLocation {
    pub fn new(variable: Symbol, span: &SourceSpan) -> Self {
        Self {
            variable,
            start_line: span.start_position.line,
            end_line: span.end_position.line,
            start_column: span.start_position.character,
            end_column: span.end_position.character,
        }
    }

    fn line_range(&self) -> LineRange {
        LineRange {
            start_line: self.start_line,
            end_line: self.end_line,
            start_column: self.start_column,
            end_column: self.end_column,
        }
    }
}

/// Symbol → every location of it; an unused symbol owns an empty set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableLocationMap {
    entries: BTreeMap<Symbol, BTreeSet<VariableLocation>>,
}

impl VariableLocationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `symbol` with no locations yet
    pub fn insert_symbol(&mut self, symbol: Symbol) {
        self.entries.entry(symbol).or_default();
    }

    pub fn insert(&mut self, location: VariableLocation) {
        self.entries
            .entry(location.variable.clone())
            .or_default()
            .insert(location);
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&BTreeSet<VariableLocation>> {
        self.entries.get(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &BTreeSet<VariableLocation>)> {
        self.entries.iter()
    }

    pub fn symbol_count(&self) -> usize {
        self.entries.len()
    }

    pub fn location_count(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    /// True when at least one location was recorded
    pub fn has_locations(&self) -> bool {
        self.entries.values().any(|set| !set.is_empty())
    }

    /// Keep the locations `f` maps to `Some`; symbols stay even when emptied
    pub fn filter_map<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&VariableLocation) -> Option<VariableLocation>,
    {
        let entries = self
            .entries
            .iter()
            .map(|(symbol, set)| (symbol.clone(), set.iter().filter_map(&mut f).collect()))
            .collect();
        Self { entries }
    }

    /// The payload printed once at program start
    pub fn to_dump(&self) -> VariableLocationDump {
        VariableLocationDump {
            variable_locations: self
                .entries
                .iter()
                .map(|(symbol, set)| VariableLocationEntry {
                    name: symbol.name.clone(),
                    declared_at: DeclarationSpan {
                        start: symbol.declared_at.start,
                        end: symbol.declared_at.end,
                    },
                    locations: set.iter().map(VariableLocation::line_range).collect(),
                })
                .collect(),
        }
    }
}

impl FromIterator<(Symbol, BTreeSet<VariableLocation>)> for VariableLocationMap {
    fn from_iter<I: IntoIterator<Item = (Symbol, BTreeSet<VariableLocation>)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (symbol, locations) in iter {
            map.entries.entry(symbol).or_default().extend(locations);
        }
        map
    }
}

/// Declaration plus every reference of each symbol
pub fn build_index<M: SemanticModel + ?Sized>(symbols: &BTreeSet<Symbol>, model: &M) -> VariableLocationMap {
    let symbols: Vec<&Symbol> = symbols.iter().collect();

    let map: VariableLocationMap = symbols
        .par_iter()
        .map(|symbol| {
            let mut locations = BTreeSet::new();
            if let Some(declaring) = model.declaring_syntax(symbol) {
                locations.insert(VariableLocation::new((*symbol).clone(), &declaring.declaration_span()));
            }
            for span in model.find_references(symbol) {
                locations.insert(VariableLocation::new((*symbol).clone(), &span));
            }
            ((*symbol).clone(), locations)
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect();

    tracing::debug!(
        symbols = map.symbol_count(),
        locations = map.location_count(),
        "Built variable location index"
    );

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::javascript;
    use crate::semantic::SemanticModel;

    fn index(source: &str) -> (javascript::JsDocument, VariableLocationMap) {
        let document = javascript::parse("main.js", source).unwrap();
        let symbols: BTreeSet<Symbol> = document.model.symbols().iter().cloned().collect();
        let map = build_index(&symbols, &document.model);
        (document, map)
    }

    #[test]
    fn test_declaration_and_references() {
        let (document, map) = index("let count = 0;\ncount += 1;\nconsole.log(count);\n");
        let count = document.model.symbol_named("count").unwrap();

        let lines: Vec<(usize, usize, usize)> = map
            .get(count)
            .unwrap()
            .iter()
            .map(|l| (l.start_line, l.start_column, l.end_column))
            .collect();
        assert_eq!(lines, vec![(0, 4, 9), (1, 0, 5), (2, 12, 17)]);
    }

    #[test]
    fn test_declaring_spans_by_construct() {
        let source = "for (const item of [1]) {}\nfunction f(a = 1) { return a; }\n";
        let (document, map) = index(source);

        let item = document.model.symbol_named("item").unwrap();
        let item_decl = map.get(item).unwrap().iter().next().unwrap();
        assert_eq!((item_decl.start_column, item_decl.end_column), (11, 15), "Loop variable identifier");

        let a = document.model.symbol_named("a").unwrap();
        let a_decl = map.get(a).unwrap().iter().next().unwrap();
        assert_eq!(
            (a_decl.start_column, a_decl.end_column),
            (11, 16),
            "Parameters record the whole declaring node"
        );
    }

    #[test]
    fn test_matches_sequential_search() {
        let source = "const a = 1;\nlet b = a;\nb = b + a;\nfunction g(c) { return c + a; }\n";
        let (document, map) = index(source);

        for symbol in document.model.symbols() {
            let expected = document.model.find_references(symbol).len() + 1;
            assert_eq!(
                map.get(symbol).map(BTreeSet::len),
                Some(expected),
                "{} should have its declaration plus every reference",
                symbol.name
            );
        }
    }

    #[test]
    fn test_dump_shape() {
        let (_, map) = index("let x = 1;\n");
        let dump = map.to_dump();

        assert!(map.has_locations());
        assert_eq!(dump.variable_locations.len(), 1);
        assert_eq!(dump.variable_locations[0].name, "x");
        assert_eq!(dump.variable_locations[0].declared_at, DeclarationSpan { start: 4, end: 5 });
    }

    #[test]
    fn test_unused_symbol_keeps_empty_set() {
        let (document, _) = index("let x = 1;\n");
        let x = document.model.symbol_named("x").unwrap().clone();

        let mut map = VariableLocationMap::new();
        map.insert_symbol(x.clone());

        assert_eq!(map.get(&x).map(BTreeSet::len), Some(0));
        assert!(!map.has_locations());
    }
}
