//! Scope and Symbol Binding
//!
//! Walks a tree-sitter JavaScript tree twice:
//! 1. declare: build the scope tree and bind every local, parameter and
//!    class field
//! 2. resolve: attach every identifier (and `this.x` / `Class.x` member
//!    access) to the symbol it names
//!
//! The output is plain data; no tree-sitter node outlives the walk.
//!
//! @module javascript/binder

use crate::semantic::{DeclaringSyntax, Symbol, SymbolFlags, SymbolId, SymbolKind};
use crate::text::{SourceSpan, SourceText};
use std::collections::{HashMap, HashSet};
use tree_sitter::Node;

// =============================================================================
// NODE CLASSIFICATION
// =============================================================================

/// Nodes that open a function scope (parameters + body)
pub(crate) fn is_function_like(kind: &str) -> bool {
    matches!(
        kind,
        "function_declaration"
            | "function_expression"
            | "function"
            | "generator_function_declaration"
            | "generator_function"
            | "arrow_function"
            | "method_definition"
            | "class_static_block"
    )
}

/// Nodes whose `name` field is a binding, not a reference
fn is_named_declaration(kind: &str) -> bool {
    matches!(
        kind,
        "function_declaration"
            | "function_expression"
            | "function"
            | "generator_function_declaration"
            | "generator_function"
            | "class_declaration"
            | "class"
    )
}

/// Destructuring shapes that may sit between an identifier and its assignment
fn is_pattern(kind: &str) -> bool {
    matches!(
        kind,
        "array_pattern"
            | "object_pattern"
            | "pair_pattern"
            | "assignment_pattern"
            | "object_assignment_pattern"
            | "rest_pattern"
    )
}

/// True when `node` has an anonymous child token `keyword`
pub(crate) fn has_keyword(node: Node, keyword: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind().starts_with(keyword));
    found
}

/// Collect the identifiers bound by a (possibly destructuring) pattern
pub(crate) fn pattern_identifiers(node: Node) -> Vec<Node> {
    let mut out = Vec::new();
    fn walk<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
        match node.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => out.push(node),
            "pair_pattern" => {
                if let Some(value) = node.child_by_field_name("value") {
                    walk(value, out);
                }
            }
            "assignment_pattern" | "object_assignment_pattern" => {
                if let Some(left) = node.child_by_field_name("left") {
                    walk(left, out);
                }
            }
            "object_pattern" | "array_pattern" | "rest_pattern" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    walk(child, out);
                }
            }
            _ => {}
        }
    }
    walk(node, &mut out);
    out
}

fn same_node(a: Option<Node>, b: Node) -> bool {
    a.map(|n| n.id()) == Some(b.id())
}

/// True when `node` is written by an assignment, update or for-in/of head
fn is_write_target(node: Node) -> bool {
    let mut current = node;
    while let Some(parent) = current.parent() {
        match parent.kind() {
            "assignment_expression" | "augmented_assignment_expression" | "for_in_statement" => {
                return same_node(parent.child_by_field_name("left"), current);
            }
            "update_expression" => return true,
            "assignment_pattern" | "object_assignment_pattern" => {
                if !same_node(parent.child_by_field_name("left"), current) {
                    return false;
                }
                current = parent;
            }
            kind if is_pattern(kind) => current = parent,
            _ => return false,
        }
    }
    false
}

// =============================================================================
// BINDING TABLES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    Program,
    Function,
    Block,
}

/// A lexical scope over a byte range (end exclusive)
#[derive(Debug, Clone)]
pub(crate) struct Scope {
    pub kind: ScopeKind,
    pub start: usize,
    pub end: usize,
    pub parent: Option<usize>,
    pub bindings: Vec<SymbolId>,
}

/// A class body and the fields it declares
#[derive(Debug, Clone)]
pub(crate) struct ClassInfo {
    pub name: Option<String>,
    pub start: usize,
    pub end: usize,
    pub fields: Vec<SymbolId>,
}

/// A resolved use of a symbol
#[derive(Debug, Clone, Copy)]
pub(crate) struct Reference {
    pub symbol: SymbolId,
    pub span: SourceSpan,
    pub is_write: bool,
}

/// Everything the binder learned about one document
#[derive(Debug, Default)]
pub(crate) struct Bindings {
    pub symbols: Vec<Symbol>,
    pub declarations: Vec<DeclaringSyntax>,
    pub scopes: Vec<Scope>,
    pub classes: Vec<ClassInfo>,
    /// Sorted by start offset
    pub references: Vec<Reference>,
    /// Identifier start offset → symbol, declarations included
    pub resolved: HashMap<usize, SymbolId>,
}

impl Bindings {
    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.0 as usize)
    }

    /// Innermost scope whose range contains `offset`
    ///
    /// Scopes are stored in pre-order, so the last containing one is the
    /// innermost.
    pub fn scope_at(&self, offset: usize) -> usize {
        self.scopes
            .iter()
            .rposition(|s| s.start <= offset && offset < s.end)
            .unwrap_or(0)
    }

    /// Innermost class body containing `offset`
    pub fn class_at(&self, offset: usize) -> Option<&ClassInfo> {
        self.classes
            .iter()
            .rev()
            .find(|c| c.start <= offset && offset < c.end)
    }

    /// Resolve `name` from the scope chain at `offset`
    pub fn lookup_name(&self, name: &str, offset: usize) -> Option<SymbolId> {
        let mut scope = Some(self.scope_at(offset));
        while let Some(idx) = scope {
            let current = &self.scopes[idx];
            let hit = current
                .bindings
                .iter()
                .copied()
                .find(|id| self.symbols[id.0 as usize].name == name);
            if hit.is_some() {
                return hit;
            }
            scope = current.parent;
        }
        None
    }
}

// =============================================================================
// BINDER
// =============================================================================

pub(crate) struct Binder<'a> {
    source: &'a SourceText,
    bytes: &'a [u8],
    out: Bindings,
    declaration_sites: HashSet<usize>,
}

impl<'a> Binder<'a> {
    /// Bind a whole program
    pub fn bind(root: Node, source: &'a SourceText) -> Bindings {
        let mut binder = Binder {
            source,
            bytes: source.as_str().as_bytes(),
            out: Bindings::default(),
            declaration_sites: HashSet::new(),
        };

        let program = binder.push_scope(ScopeKind::Program, 0, source.as_str().len() + 1, None);
        binder.declare_children(root, program);
        binder.resolve_in(root);
        binder.out.references.sort_by_key(|r| r.span.start);

        tracing::debug!(
            symbols = binder.out.symbols.len(),
            scopes = binder.out.scopes.len(),
            references = binder.out.references.len(),
            "Bound JavaScript document"
        );

        binder.out
    }

    fn span(&self, node: Node) -> SourceSpan {
        self.source.span(node.start_byte(), node.end_byte())
    }

    fn text(&self, node: Node) -> Option<&'a str> {
        node.utf8_text(self.bytes).ok()
    }

    fn push_scope(&mut self, kind: ScopeKind, start: usize, end: usize, parent: Option<usize>) -> usize {
        self.out.scopes.push(Scope {
            kind,
            start,
            end,
            parent,
            bindings: Vec::new(),
        });
        self.out.scopes.len() - 1
    }

    /// Nearest function or program scope (where `var` lands)
    fn hoist_target(&self, mut scope: usize) -> usize {
        loop {
            let current = &self.out.scopes[scope];
            match (current.kind, current.parent) {
                (ScopeKind::Block, Some(parent)) => scope = parent,
                _ => return scope,
            }
        }
    }

    fn add_symbol(
        &mut self,
        identifier: Node,
        kind: SymbolKind,
        flags: SymbolFlags,
        declaring: DeclaringSyntax,
        container: Option<String>,
    ) -> Option<SymbolId> {
        let name = self.text(identifier)?.to_string();
        let id = SymbolId(self.out.symbols.len() as u32);
        self.out.symbols.push(Symbol {
            id,
            name,
            kind,
            flags,
            declared_at: self.span(identifier),
            container,
        });
        self.out.declarations.push(declaring);
        self.out.resolved.insert(identifier.start_byte(), id);
        self.declaration_sites.insert(identifier.start_byte());
        Some(id)
    }

    fn declare(
        &mut self,
        identifier: Node,
        scope: usize,
        kind: SymbolKind,
        flags: SymbolFlags,
        declaring: DeclaringSyntax,
    ) {
        if let Some(id) = self.add_symbol(identifier, kind, flags, declaring, None) {
            self.out.scopes[scope].bindings.push(id);
        }
    }

    // -------------------------------------------------------------------------
    // Pass 1: declarations
    // -------------------------------------------------------------------------

    fn declare_children(&mut self, node: Node, scope: usize) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.declare_in(child, scope);
        }
    }

    fn declare_in(&mut self, node: Node, scope: usize) {
        let kind = node.kind();

        if is_function_like(kind) {
            let function = self.push_scope(
                ScopeKind::Function,
                node.start_byte(),
                node.end_byte(),
                Some(scope),
            );
            self.declare_parameters(node, function);
            self.declare_children(node, function);
            return;
        }

        match kind {
            "statement_block" => {
                let is_body = node
                    .parent()
                    .map(|p| is_function_like(p.kind()))
                    .unwrap_or(false);
                let inner = if is_body {
                    scope
                } else {
                    self.push_scope(ScopeKind::Block, node.start_byte(), node.end_byte(), Some(scope))
                };
                self.declare_children(node, inner);
            }
            "for_statement" | "switch_body" => {
                let inner =
                    self.push_scope(ScopeKind::Block, node.start_byte(), node.end_byte(), Some(scope));
                self.declare_children(node, inner);
            }
            "for_in_statement" => {
                let inner =
                    self.push_scope(ScopeKind::Block, node.start_byte(), node.end_byte(), Some(scope));
                self.declare_loop_variable(node, inner);
                self.declare_children(node, inner);
            }
            "catch_clause" => {
                let inner =
                    self.push_scope(ScopeKind::Block, node.start_byte(), node.end_byte(), Some(scope));
                if let Some(parameter) = node.child_by_field_name("parameter") {
                    let declaring = DeclaringSyntax::Other {
                        span: self.span(parameter),
                    };
                    for identifier in pattern_identifiers(parameter) {
                        self.declare(identifier, inner, SymbolKind::Local, SymbolFlags::empty(), declaring);
                    }
                }
                self.declare_children(node, inner);
            }
            "lexical_declaration" => {
                let flags = if has_keyword(node, "const") {
                    SymbolFlags::CONST
                } else {
                    SymbolFlags::empty()
                };
                self.declare_declarators(node, scope, flags);
                self.declare_children(node, scope);
            }
            "variable_declaration" => {
                let target = self.hoist_target(scope);
                self.declare_declarators(node, target, SymbolFlags::empty());
                self.declare_children(node, scope);
            }
            "class_declaration" | "class" => {
                self.declare_class(node);
                self.declare_children(node, scope);
            }
            _ => self.declare_children(node, scope),
        }
    }

    fn declare_parameters(&mut self, function: Node, scope: usize) {
        let parameters: Vec<Node> = match function.child_by_field_name("parameters") {
            Some(list) => {
                let mut cursor = list.walk();
                let params = list
                    .named_children(&mut cursor)
                    .filter(|p| p.kind() != "comment")
                    .collect();
                params
            }
            None => function.child_by_field_name("parameter").into_iter().collect(),
        };

        for parameter in parameters {
            let declaring = DeclaringSyntax::Other {
                span: self.span(parameter),
            };
            for identifier in pattern_identifiers(parameter) {
                self.declare(identifier, scope, SymbolKind::Parameter, SymbolFlags::empty(), declaring);
            }
        }
    }

    fn declare_declarators(&mut self, declaration: Node, scope: usize, flags: SymbolFlags) {
        let mut cursor = declaration.walk();
        let declarators: Vec<Node> = declaration
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "variable_declarator")
            .collect();

        for declarator in declarators {
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            if name.kind() == "identifier" {
                let declaring = DeclaringSyntax::VariableDeclarator {
                    identifier: self.span(name),
                };
                self.declare(name, scope, SymbolKind::Local, flags, declaring);
            } else {
                let declaring = DeclaringSyntax::Other {
                    span: self.span(declarator),
                };
                for identifier in pattern_identifiers(name) {
                    self.declare(identifier, scope, SymbolKind::Local, flags, declaring);
                }
            }
        }
    }

    /// `for (let x of xs)` / `for (var k in obj)`; bare `for (x of xs)` declares nothing
    fn declare_loop_variable(&mut self, statement: Node, loop_scope: usize) {
        let Some(left) = statement.child_by_field_name("left") else {
            return;
        };
        let keyword = statement
            .child_by_field_name("kind")
            .map(|k| k.kind())
            .or_else(|| {
                let mut cursor = statement.walk();
                let keyword = statement
                    .children(&mut cursor)
                    .take_while(|c| c.id() != left.id())
                    .map(|c| c.kind())
                    .find(|k| matches!(*k, "var" | "let" | "const"));
                keyword
            });
        let Some(keyword) = keyword else {
            return;
        };

        let (target, flags) = match keyword {
            "var" => (self.hoist_target(loop_scope), SymbolFlags::empty()),
            "const" => (loop_scope, SymbolFlags::CONST),
            _ => (loop_scope, SymbolFlags::empty()),
        };

        if left.kind() == "identifier" {
            let declaring = DeclaringSyntax::ForEachVariable {
                identifier: self.span(left),
            };
            self.declare(left, target, SymbolKind::Local, flags, declaring);
        } else {
            let declaring = DeclaringSyntax::Other {
                span: self.span(left),
            };
            for identifier in pattern_identifiers(left) {
                self.declare(identifier, target, SymbolKind::Local, flags, declaring);
            }
        }
    }

    /// Record a class body; only named classes expose their fields
    fn declare_class(&mut self, class: Node) {
        let Some(body) = class.child_by_field_name("body") else {
            return;
        };
        let name = class
            .child_by_field_name("name")
            .and_then(|n| self.text(n))
            .map(str::to_string);

        let mut fields = Vec::new();
        if let Some(class_name) = &name {
            let mut cursor = body.walk();
            let members: Vec<Node> = body
                .named_children(&mut cursor)
                .filter(|m| m.kind() == "field_definition")
                .collect();

            for member in members {
                let Some(property) = member.child_by_field_name("property") else {
                    continue;
                };
                if !matches!(
                    property.kind(),
                    "property_identifier" | "private_property_identifier"
                ) {
                    continue;
                }
                let flags = if has_keyword(member, "static") {
                    SymbolFlags::STATIC
                } else {
                    SymbolFlags::empty()
                };
                let declaring = DeclaringSyntax::Other {
                    span: self.span(member),
                };
                if let Some(id) =
                    self.add_symbol(property, SymbolKind::Field, flags, declaring, Some(class_name.clone()))
                {
                    fields.push(id);
                }
            }
        }

        self.out.classes.push(ClassInfo {
            name,
            start: body.start_byte(),
            end: body.end_byte(),
            fields,
        });
    }

    // -------------------------------------------------------------------------
    // Pass 2: references
    // -------------------------------------------------------------------------

    fn resolve_in(&mut self, node: Node) {
        match node.kind() {
            "identifier" | "shorthand_property_identifier" => self.resolve_identifier(node),
            "member_expression" => self.resolve_member(node),
            _ => {}
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.resolve_in(child);
        }
    }

    fn resolve_identifier(&mut self, node: Node) {
        let start = node.start_byte();
        if self.declaration_sites.contains(&start) {
            return;
        }
        if let Some(parent) = node.parent() {
            let parent_kind = parent.kind();
            if is_named_declaration(parent_kind) && same_node(parent.child_by_field_name("name"), node) {
                return;
            }
            if matches!(
                parent_kind,
                "import_specifier" | "import_clause" | "namespace_import" | "export_specifier"
            ) {
                return;
            }
        }
        let Some(name) = self.text(node) else {
            return;
        };
        if let Some(symbol) = self.out.lookup_name(name, start) {
            self.out.resolved.insert(start, symbol);
            self.out.references.push(Reference {
                symbol,
                span: self.span(node),
                is_write: is_write_target(node),
            });
        }
    }

    /// `this.x` resolves to the innermost class; `Name.x` to any enclosing class named `Name`
    fn resolve_member(&mut self, node: Node) {
        let (Some(object), Some(property)) = (
            node.child_by_field_name("object"),
            node.child_by_field_name("property"),
        ) else {
            return;
        };
        let Some(property_name) = self.text(property) else {
            return;
        };
        let offset = node.start_byte();
        let object_name = if object.kind() == "identifier" {
            self.text(object)
        } else {
            None
        };

        let mut found = None;
        for (depth, class) in self
            .out
            .classes
            .iter()
            .rev()
            .filter(|c| c.start <= offset && offset < c.end)
            .enumerate()
        {
            let field = class.fields.iter().copied().find(|id| {
                let symbol = &self.out.symbols[id.0 as usize];
                if symbol.name != property_name {
                    return false;
                }
                if object.kind() == "this" {
                    depth == 0
                } else {
                    symbol.is_static() && object_name.is_some() && object_name == class.name.as_deref()
                }
            });
            if field.is_some() {
                found = field;
                break;
            }
        }

        if let Some(symbol) = found {
            self.out.references.push(Reference {
                symbol,
                span: self.span(property),
                is_write: is_write_target(node),
            });
        }
    }
}
