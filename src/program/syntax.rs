//! Module-level facts extracted from a tree-sitter TypeScript syntax tree.
//!
//! One [`ModuleSyntax`] is built per file per snapshot. It records the
//! top-level import and export statements, lexical scopes with their
//! bindings, every identifier reference, and the set of identifier texts
//! used anywhere in the file.

use std::collections::{HashMap, HashSet};

use tree_sitter::{Node, Tree};

use crate::position::Span;

use super::Meaning;

pub type BindingId = usize;
pub type ScopeId = usize;

/// Name as written on the imported side of an import specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedName {
    Named(String),
    Default,
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTarget {
    pub specifier: String,
    pub imported: ImportedName,
    pub type_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    Value,
    Type,
    ValueAndType,
    Import(ImportTarget),
}

impl BindingKind {
    fn matches(&self, meaning: Meaning) -> bool {
        match (meaning, self) {
            (Meaning::All, _) => true,
            (Meaning::Value, BindingKind::Type) => false,
            (Meaning::Value, BindingKind::Import(target)) => !target.type_only,
            (Meaning::Value, _) => true,
            (Meaning::Type, BindingKind::Value) => false,
            (Meaning::Type, _) => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    /// Span of the declaring identifier
    pub span: Span,
    pub scope: ScopeId,
    pub kind: BindingKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Function,
    Block,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub span: Span,
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    names: HashMap<String, Vec<BindingId>>,
}

/// How an identifier occurrence uses the name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Usage {
    /// `name.property`, with the span of the property and of the whole access
    Member { property: String, property_span: Span, access: Span },
    /// Any other occurrence
    Bare,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub span: Span,
    pub usage: Usage,
}

/// A string literal naming a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpecifier {
    /// Unquoted text
    pub text: String,
    /// Text as written, quotes included
    pub raw: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub span: Span,
    pub specifier: Option<ModuleSpecifier>,
    pub default: Option<BindingId>,
    pub namespace: Option<BindingId>,
    pub named: Vec<BindingId>,
    pub type_only: bool,
    pub has_error: bool,
    pub semicolon: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpecifier {
    pub local: String,
    pub exported: String,
    pub span: Span,
    pub type_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedName {
    pub name: String,
    pub span: Span,
    pub kind: BindingKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportKind {
    /// `export * from 'm'`
    Star { specifier: ModuleSpecifier, type_only: bool },
    /// `export * as name from 'm'`
    StarAs { name: String, name_span: Span, specifier: ModuleSpecifier },
    /// `export { a, b as c }`, optionally `from 'm'`
    Named { specifiers: Vec<ExportSpecifier>, source: Option<ModuleSpecifier>, type_only: bool },
    /// `export const a = ..`, `export interface I {}`, ...
    Declaration { names: Vec<ExportedName> },
    /// `export default ..`
    Default { span: Span, kind: BindingKind },
    /// `export = ..`
    Assignment,
}

#[derive(Debug, Clone)]
pub struct ExportDecl {
    pub span: Span,
    pub kind: ExportKind,
    pub has_error: bool,
    pub semicolon: bool,
}

#[derive(Debug, Clone)]
pub enum Statement {
    Import(ImportDecl),
    Export(ExportDecl),
}

#[derive(Debug, Clone)]
pub struct ModuleSyntax {
    /// Whether the file has top-level imports or exports
    pub is_module: bool,
    pub statements: Vec<Statement>,
    pub scopes: Vec<Scope>,
    pub bindings: Vec<Binding>,
    pub references: Vec<Reference>,
    pub identifiers: HashSet<String>,
}

pub const MODULE_SCOPE: ScopeId = 0;

impl ModuleSyntax {
    pub fn from_tree(tree: &Tree, source: &str) -> Self {
        let root = tree.root_node();
        let mut builder = Builder {
            source,
            scopes: vec![Scope {
                span: Span::new(0, source.len().max(root.end_byte())),
                parent: None,
                kind: ScopeKind::Module,
                names: HashMap::new(),
            }],
            bindings: Vec::new(),
            references: Vec::new(),
            identifiers: HashSet::new(),
            statements: Vec::new(),
        };
        let mut is_module = false;

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "import_statement" => {
                    is_module = true;
                    let import = builder.import_statement(child);
                    builder.statements.push(Statement::Import(import));
                }
                "export_statement" => {
                    is_module = true;
                    if let Some(export) = builder.export_statement(child) {
                        builder.statements.push(Statement::Export(export));
                    }
                }
                _ => builder.visit(child, MODULE_SCOPE),
            }
        }

        ModuleSyntax {
            is_module,
            statements: builder.statements,
            scopes: builder.scopes,
            bindings: builder.bindings,
            references: builder.references,
            identifiers: builder.identifiers,
        }
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id]
    }

    /// Innermost scope whose span contains `offset`
    pub fn scope_at(&self, offset: usize) -> ScopeId {
        // scopes are recorded in pre-order, so the last container is the innermost
        self.scopes
            .iter()
            .rposition(|scope| scope.span.contains(offset))
            .unwrap_or(MODULE_SCOPE)
    }

    /// Binding that `name` refers to at `offset`, searching outwards from the innermost scope
    pub fn resolve(&self, name: &str, offset: usize, meaning: Meaning) -> Option<BindingId> {
        let mut scope = Some(self.scope_at(offset));
        while let Some(id) = scope {
            let found = self.scopes[id]
                .names
                .get(name)
                .and_then(|ids| ids.iter().copied().find(|&b| self.bindings[b].kind.matches(meaning)));
            if found.is_some() {
                return found;
            }
            scope = self.scopes[id].parent;
        }
        None
    }

    /// Bindings declared directly in the module scope under `name`
    pub fn module_bindings(&self, name: &str) -> &[BindingId] {
        self.scopes[MODULE_SCOPE]
            .names
            .get(name)
            .map(Vec::as_slice).unwrap_or_default()
    }

    /// All top-level bindings, in declaration order
    pub fn top_level_bindings(&self) -> impl Iterator<Item = (BindingId, &Binding)> {
        self.bindings
            .iter()
            .enumerate()
            .filter(|(_, binding)| binding.scope == MODULE_SCOPE)
    }

    /// References that resolve to `binding`, excluding its declaration
    pub fn references_to(&self, binding: BindingId) -> Vec<Reference> {
        let target = &self.bindings[binding];
        self.references
            .iter()
            .filter(|r| r.name == target.name && r.span != target.span)
            .filter(|r| self.resolve(&r.name, r.span.start, Meaning::All) == Some(binding))
            .cloned()
            .collect()
    }

    pub fn imports(&self) -> impl Iterator<Item = &ImportDecl> {
        self.statements.iter().filter_map(|stmt| match stmt {
            Statement::Import(import) => Some(import),
            Statement::Export(_) => None,
        })
    }

    pub fn exports(&self) -> impl Iterator<Item = &ExportDecl> {
        self.statements.iter().filter_map(|stmt| match stmt {
            Statement::Export(export) => Some(export),
            Statement::Import(_) => None,
        })
    }
}

fn span_of(node: Node) -> Span {
    Span::new(node.start_byte(), node.end_byte())
}

/// Whether `node` has a direct anonymous child token `token`
fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token);
    found
}

fn first_named_child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|child| child.kind() == kind);
    found
}

const IDENTIFIER_KINDS: &[&str] = &[
    "identifier",
    "type_identifier",
    "property_identifier",
    "shorthand_property_identifier",
    "shorthand_property_identifier_pattern",
    "statement_identifier",
];

struct Builder<'s> {
    source: &'s str,
    scopes: Vec<Scope>,
    bindings: Vec<Binding>,
    references: Vec<Reference>,
    identifiers: HashSet<String>,
    statements: Vec<Statement>,
}

impl<'s> Builder<'s> {
    fn text(&self, node: Node) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn push_scope(&mut self, node: Node, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        self.scopes.push(Scope {
            span: span_of(node),
            parent: Some(parent),
            kind,
            names: HashMap::new(),
        });
        self.scopes.len() - 1
    }

    /// Nearest enclosing function (or module) scope, where `var` lands
    fn hoisting_scope(&self, mut scope: ScopeId) -> ScopeId {
        while self.scopes[scope].kind == ScopeKind::Block {
            match self.scopes[scope].parent {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        scope
    }

    fn bind(&mut self, name_node: Node, scope: ScopeId, kind: BindingKind) -> BindingId {
        let name = self.text(name_node).to_string();
        let id = self.bindings.len();
        self.bindings.push(Binding {
            name: name.clone(),
            span: span_of(name_node),
            scope,
            kind,
        });
        self.scopes[scope].names.entry(name).or_default().push(id);
        id
    }

    /// Bind every identifier introduced by a declaration pattern
    fn bind_pattern(&mut self, pattern: Node, scope: ScopeId, kind: &BindingKind) {
        match pattern.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => {
                self.bind(pattern, scope, kind.clone());
            }
            "pair_pattern" => {
                if let Some(value) = pattern.child_by_field_name("value") {
                    self.bind_pattern(value, scope, kind);
                }
            }
            "assignment_pattern" | "object_assignment_pattern" => {
                if let Some(left) = pattern.child_by_field_name("left") {
                    self.bind_pattern(left, scope, kind);
                }
            }
            "object_pattern" | "array_pattern" | "rest_pattern" => {
                let mut cursor = pattern.walk();
                let children: Vec<Node> = pattern.named_children(&mut cursor).collect();
                for child in children {
                    self.bind_pattern(child, scope, kind);
                }
            }
            _ => {}
        }
    }

    fn record_identifier(&mut self, node: Node) {
        let text = self.text(node);
        if !text.is_empty() {
            self.identifiers.insert(text.to_string());
        }
    }

    fn record_reference(&mut self, node: Node) {
        let usage = node
            .parent()
            .filter(|parent| parent.kind() == "member_expression")
            .filter(|parent| parent.child_by_field_name("object") == Some(node))
            .and_then(|parent| {
                let property = parent.child_by_field_name("property")?;
                (property.kind() == "property_identifier").then(|| Usage::Member {
                    property: self.text(property).to_string(),
                    property_span: span_of(property),
                    access: span_of(parent),
                })
            })
            .unwrap_or(Usage::Bare);

        self.references.push(Reference {
            name: self.text(node).to_string(),
            span: span_of(node),
            usage,
        });
    }

    fn visit_children(&mut self, node: Node, scope: ScopeId) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        for child in children {
            self.visit(child, scope);
        }
    }

    /// Record identifier texts below `node` without treating them as references
    fn record_identifiers_only(&mut self, node: Node) {
        if IDENTIFIER_KINDS.contains(&node.kind()) {
            self.record_identifier(node);
            return;
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        for child in children {
            self.record_identifiers_only(child);
        }
    }

    fn visit(&mut self, node: Node, scope: ScopeId) {
        match node.kind() {
            "identifier" => {
                self.record_identifier(node);
                self.record_reference(node);
            }
            "shorthand_property_identifier" => {
                // `{ ns }` uses the binding as a value
                self.record_identifier(node);
                self.references.push(Reference {
                    name: self.text(node).to_string(),
                    span: span_of(node),
                    usage: Usage::Bare,
                });
            }
            kind if IDENTIFIER_KINDS.contains(&kind) => self.record_identifier(node),
            "import_statement" => self.record_identifiers_only(node),
            "export_specifier" => {
                // only the local side of `a as b` refers to a binding
                match node.child_by_field_name("name") {
                    Some(name) if name.kind() == "identifier" => self.visit(name, scope),
                    _ => {}
                }
                if let Some(alias) = node.child_by_field_name("alias") {
                    self.record_identifiers_only(alias);
                }
            }
            "statement_block" | "switch_body" | "for_statement" => {
                let inner = self.push_scope(node, scope, ScopeKind::Block);
                self.visit_children(node, inner);
            }
            "for_in_statement" => {
                let inner = self.push_scope(node, scope, ScopeKind::Block);
                if let (Some(kind), Some(left)) =
                    (node.child_by_field_name("kind"), node.child_by_field_name("left"))
                {
                    let target = if self.text(kind) == "var" { self.hoisting_scope(scope) } else { inner };
                    self.bind_pattern(left, target, &BindingKind::Value);
                }
                self.visit_children(node, inner);
            }
            "function_declaration" | "generator_function_declaration" | "function_signature" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind(name, scope, BindingKind::Value);
                }
                let inner = self.push_scope(node, scope, ScopeKind::Function);
                self.visit_function(node, inner);
            }
            "function_expression" | "function" | "generator_function" => {
                let inner = self.push_scope(node, scope, ScopeKind::Function);
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind(name, inner, BindingKind::Value);
                }
                self.visit_function(node, inner);
            }
            "arrow_function" | "method_definition" => {
                let inner = self.push_scope(node, scope, ScopeKind::Function);
                if let Some(parameter) = node.child_by_field_name("parameter") {
                    self.bind_pattern(parameter, inner, &BindingKind::Value);
                }
                self.visit_function(node, inner);
            }
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind(name, scope, BindingKind::ValueAndType);
                }
                let inner = self.push_scope(node, scope, ScopeKind::Block);
                self.visit_children(node, inner);
            }
            "class" => {
                let inner = self.push_scope(node, scope, ScopeKind::Block);
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind(name, inner, BindingKind::ValueAndType);
                }
                self.visit_children(node, inner);
            }
            "interface_declaration" | "type_alias_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind(name, scope, BindingKind::Type);
                }
                let inner = self.push_scope(node, scope, ScopeKind::Block);
                self.visit_children(node, inner);
            }
            "enum_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind(name, scope, BindingKind::ValueAndType);
                }
                self.visit_children(node, scope);
            }
            "internal_module" | "module" => {
                match node.child_by_field_name("name") {
                    Some(name) if name.kind() == "identifier" => {
                        self.bind(name, scope, BindingKind::ValueAndType);
                    }
                    Some(name) if name.kind() == "nested_identifier" => {
                        if let Some(head) = first_named_child_of_kind(name, "identifier") {
                            self.bind(head, scope, BindingKind::ValueAndType);
                        }
                    }
                    _ => {}
                }
                self.visit_children(node, scope);
            }
            "lexical_declaration" => {
                self.bind_declarators(node, scope);
                self.visit_children(node, scope);
            }
            "variable_declaration" => {
                let target = self.hoisting_scope(scope);
                self.bind_declarators(node, target);
                self.visit_children(node, scope);
            }
            "catch_clause" => {
                let inner = self.push_scope(node, scope, ScopeKind::Block);
                if let Some(parameter) = node.child_by_field_name("parameter") {
                    self.bind_pattern(parameter, inner, &BindingKind::Value);
                }
                self.visit_children(node, inner);
            }
            "type_parameter" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind(name, scope, BindingKind::Type);
                }
                self.visit_children(node, scope);
            }
            _ => self.visit_children(node, scope),
        }
    }

    fn bind_declarators(&mut self, declaration: Node, scope: ScopeId) {
        let mut cursor = declaration.walk();
        let declarators: Vec<Node> = declaration
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "variable_declarator")
            .collect();
        for declarator in declarators {
            if let Some(name) = declarator.child_by_field_name("name") {
                self.bind_pattern(name, scope, &BindingKind::Value);
            }
        }
    }

    /// Bind parameters into the function scope, then walk the whole function in it
    fn visit_function(&mut self, node: Node, scope: ScopeId) {
        if let Some(parameters) = node.child_by_field_name("parameters") {
            let mut cursor = parameters.walk();
            let params: Vec<Node> = parameters.named_children(&mut cursor).collect();
            for param in params {
                let pattern = param.child_by_field_name("pattern").unwrap_or(param);
                self.bind_pattern(pattern, scope, &BindingKind::Value);
            }
        }
        self.visit_children(node, scope);
    }

    fn module_specifier(&self, node: Node) -> Option<ModuleSpecifier> {
        let string = node.child_by_field_name("source")?;
        let raw = self.text(string);
        let text = raw.get(1..raw.len().saturating_sub(1)).unwrap_or(raw);
        Some(ModuleSpecifier {
            text: text.to_string(),
            raw: raw.to_string(),
            span: span_of(string),
        })
    }

    fn ends_with_semicolon(&self, node: Node) -> bool {
        self.text(node).trim_end().ends_with(';')
    }

    fn import_statement(&mut self, node: Node) -> ImportDecl {
        let specifier = self.module_specifier(node);
        let type_only = has_token(node, "type");
        let mut import = ImportDecl {
            span: span_of(node),
            specifier: specifier.clone(),
            default: None,
            namespace: None,
            named: Vec::new(),
            type_only,
            has_error: node.has_error(),
            semicolon: self.ends_with_semicolon(node),
        };
        let module = specifier.map(|s| s.text).unwrap_or_default();
        let target = |imported: ImportedName, type_only: bool| {
            BindingKind::Import(ImportTarget { specifier: module.clone(), imported, type_only })
        };

        if let Some(clause) = first_named_child_of_kind(node, "import_clause") {
            let mut cursor = clause.walk();
            let parts: Vec<Node> = clause.named_children(&mut cursor).collect();
            for part in parts {
                match part.kind() {
                    "identifier" => {
                        import.default = Some(self.bind(part, MODULE_SCOPE, target(ImportedName::Default, type_only)));
                    }
                    "namespace_import" => {
                        if let Some(name) = first_named_child_of_kind(part, "identifier") {
                            import.namespace =
                                Some(self.bind(name, MODULE_SCOPE, target(ImportedName::Namespace, type_only)));
                        }
                    }
                    "named_imports" => {
                        let mut inner = part.walk();
                        let specifiers: Vec<Node> = part
                            .named_children(&mut inner)
                            .filter(|child| child.kind() == "import_specifier")
                            .collect();
                        for spec in specifiers {
                            let Some(name) = spec.child_by_field_name("name") else { continue };
                            let local = spec.child_by_field_name("alias").unwrap_or(name);
                            let imported = match self.text(name).trim_matches(|c| c == '"' || c == '\'') {
                                "default" => ImportedName::Default,
                                other => ImportedName::Named(other.to_string()),
                            };
                            let spec_type_only = type_only || has_token(spec, "type");
                            import.named.push(self.bind(local, MODULE_SCOPE, target(imported, spec_type_only)));
                        }
                    }
                    _ => {}
                }
            }
        }

        self.record_identifiers_only(node);
        import
    }

    fn export_statement(&mut self, node: Node) -> Option<ExportDecl> {
        let is_default = has_token(node, "default");
        let has_error = node.has_error();
        let semicolon = self.ends_with_semicolon(node);
        let span = span_of(node);

        let first_binding = self.bindings.len();
        if node.child_by_field_name("source").is_some() {
            // names in `export { a } from 'm'` belong to `m`
            self.record_identifiers_only(node);
        } else {
            self.visit_children(node, MODULE_SCOPE);
        }
        let declared: Vec<ExportedName> = self.bindings[first_binding..]
            .iter()
            .filter(|binding| binding.scope == MODULE_SCOPE)
            .map(|binding| ExportedName {
                name: binding.name.clone(),
                span: binding.span,
                kind: binding.kind.clone(),
            })
            .collect();

        let kind = if let Some(declaration) = node.child_by_field_name("declaration") {
            if is_default {
                let kind = declared
                    .first()
                    .map(|name| name.kind.clone())
                    .unwrap_or_else(|| match declaration.kind() {
                        "interface_declaration" | "type_alias_declaration" => BindingKind::Type,
                        _ => BindingKind::Value,
                    });
                ExportKind::Default { span: span_of(declaration), kind }
            } else {
                ExportKind::Declaration { names: declared }
            }
        } else if let Some(value) = node.child_by_field_name("value") {
            ExportKind::Default { span: span_of(value), kind: BindingKind::Value }
        } else if let Some(namespace) = first_named_child_of_kind(node, "namespace_export") {
            let mut cursor = namespace.walk();
            let name = namespace.named_children(&mut cursor).next()?;
            ExportKind::StarAs {
                name: self.text(name).trim_matches(|c| c == '"' || c == '\'').to_string(),
                name_span: span_of(name),
                specifier: self.module_specifier(node)?,
            }
        } else if let Some(clause) = first_named_child_of_kind(node, "export_clause") {
            ExportKind::Named {
                specifiers: self.export_specifiers(clause),
                source: self.module_specifier(node),
                type_only: has_token(node, "type"),
            }
        } else if has_token(node, "*") {
            ExportKind::Star {
                specifier: self.module_specifier(node)?,
                type_only: has_token(node, "type"),
            }
        } else if has_token(node, "=") {
            ExportKind::Assignment
        } else {
            return None;
        };

        Some(ExportDecl { span, kind, has_error, semicolon })
    }

    fn export_specifiers(&self, clause: Node) -> Vec<ExportSpecifier> {
        let unquote = |text: &str| text.trim_matches(|c| c == '"' || c == '\'').to_string();
        let mut cursor = clause.walk();
        let specs: Vec<Node> = clause
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "export_specifier")
            .collect();
        specs
            .into_iter()
            .filter_map(|spec| {
                let name = spec.child_by_field_name("name")?;
                let local = unquote(self.text(name));
                let exported = spec
                    .child_by_field_name("alias")
                    .map_or_else(|| local.clone(), |alias| unquote(self.text(alias)));
                Some(ExportSpecifier {
                    local,
                    exported,
                    span: span_of(spec),
                    type_only: has_token(spec, "type"),
                })
            })
            .collect()
    }
}

/// Parse `source` with the TypeScript (or TSX) grammar
pub fn parse(source: &str, jsx: bool) -> Option<Tree> {
    let mut parser = tree_sitter::Parser::new();
    let language = if jsx {
        tree_sitter_typescript::LANGUAGE_TSX
    } else {
        tree_sitter_typescript::LANGUAGE_TYPESCRIPT
    };
    parser.set_language(&language.into()).ok()?;
    parser.parse(source, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn syntax(source: &str) -> ModuleSyntax {
        let tree = parse(source, false).unwrap();
        ModuleSyntax::from_tree(&tree, source)
    }

    fn offset_of(source: &str, needle: &str) -> usize {
        source.find(needle).unwrap()
    }

    #[test]
    fn test_script_without_imports_is_not_a_module() {
        assert!(!syntax("const a = 1;\n").is_module);
        assert!(syntax("export const a = 1;\n").is_module);
    }

    #[test]
    fn test_namespace_import_binding() {
        let source = "import D, * as ns from './b';\n";
        let syntax = syntax(source);
        let import = syntax.imports().next().unwrap();

        assert_eq!(import.specifier.as_ref().unwrap().raw, "'./b'");
        assert_eq!(import.specifier.as_ref().unwrap().text, "./b");
        assert!(import.semicolon);
        let namespace = syntax.binding(import.namespace.unwrap());
        assert_eq!(namespace.name, "ns");
        assert_eq!(syntax.binding(import.default.unwrap()).name, "D");
    }

    #[test]
    fn test_member_and_bare_references() {
        let source = "import * as ns from './b';\nns.x();\nfoo(ns);\nconst y = ns['z'];\n";
        let syntax = syntax(source);
        let namespace = syntax.imports().next().unwrap().namespace.unwrap();

        let refs = syntax.references_to(namespace);

        assert_eq!(refs.len(), 3);
        let access_start = offset_of(source, "ns.x");
        assert_eq!(
            refs[0].usage,
            Usage::Member {
                property: "x".to_string(),
                property_span: Span::new(access_start + 3, access_start + 4),
                access: Span::new(access_start, access_start + 4),
            }
        );
        assert_eq!(refs[1].usage, Usage::Bare);
        assert_eq!(refs[2].usage, Usage::Bare);
    }

    #[test]
    fn test_shadowed_name_is_not_a_reference() {
        let source = "import * as ns from './b';\nfunction f(ns) { return ns.x; }\nns.y;\n";
        let syntax = syntax(source);
        let namespace = syntax.imports().next().unwrap().namespace.unwrap();

        let refs = syntax.references_to(namespace);

        assert_eq!(refs.len(), 1);
        assert!(matches!(&refs[0].usage, Usage::Member { property, .. } if property == "y"));
    }

    #[test]
    fn test_resolve_respects_block_scope() {
        let source = "const x = 1;\n{ let y = 2; y; }\nfunction g() { var z = 3; if (z) { var w = 4; } }\n";
        let syntax = syntax(source);

        assert!(syntax.resolve("x", offset_of(source, "y;"), Meaning::All).is_some());
        assert!(syntax.resolve("y", offset_of(source, "y;"), Meaning::All).is_some());
        assert!(syntax.resolve("y", offset_of(source, "function"), Meaning::All).is_none());
        // `var` is hoisted out of the if-block to the function scope
        assert!(syntax.resolve("w", offset_of(source, "var z"), Meaning::All).is_some());
        assert!(syntax.resolve("w", 0, Meaning::All).is_none());
    }

    #[test]
    fn test_resolve_by_meaning() {
        let source = "interface Shape {}\nconst value = 1;\n";
        let syntax = syntax(source);
        let end = source.len() - 1;

        assert!(syntax.resolve("Shape", end, Meaning::Type).is_some());
        assert!(syntax.resolve("Shape", end, Meaning::Value).is_none());
        assert!(syntax.resolve("value", end, Meaning::Type).is_none());
    }

    #[test]
    fn test_export_kinds() {
        let source = concat!(
            "export * from './a';\n",
            "export * as all from './b';\n",
            "export { one, two as three } from './c';\n",
            "export type { Four } from './d';\n",
            "export const five = 5, six = 6;\n",
            "export interface Seven {}\n",
            "export default class Eight {}\n",
        );
        let syntax = syntax(source);
        let kinds: Vec<&ExportKind> = syntax.exports().map(|e| &e.kind).collect();

        assert_eq!(kinds.len(), 7);
        assert!(matches!(kinds[0], ExportKind::Star { specifier, type_only: false } if specifier.text == "./a"));
        assert!(matches!(kinds[1], ExportKind::StarAs { name, .. } if name == "all"));
        match kinds[2] {
            ExportKind::Named { specifiers, source, type_only } => {
                assert_eq!(specifiers[1].local, "two");
                assert_eq!(specifiers[1].exported, "three");
                assert_eq!(source.as_ref().unwrap().text, "./c");
                assert!(!type_only);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(kinds[3], ExportKind::Named { type_only: true, .. }));
        match kinds[4] {
            ExportKind::Declaration { names } => {
                let names: Vec<&str> = names.iter().map(|n| n.name.as_str()).collect();
                assert_eq!(names, vec!["five", "six"]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(kinds[5], ExportKind::Declaration { names } if names[0].kind == BindingKind::Type));
        assert!(matches!(kinds[6], ExportKind::Default { .. }));
    }

    #[test]
    fn test_identifiers_include_property_names() {
        let syntax = syntax("const a = { b: 1 };\na.c;\n");
        for name in ["a", "b", "c"] {
            assert!(syntax.identifiers.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_parse_error_is_flagged_on_statement() {
        let syntax = syntax("export * from ;\n");
        assert!(syntax.exports().all(|e| e.has_error) || syntax.exports().next().is_none());
    }
}
