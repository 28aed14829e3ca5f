//! Immutable program snapshots and the queries analyzers run against them.

pub mod syntax;
pub mod typescript;

use crate::alias::NameScope;
use crate::error::Result;
use crate::file::{FileKey, SourceSet};

pub use syntax::{BindingId, ModuleSyntax, Reference, Usage};
pub use typescript::{TsProgram, TsProgramBuilder};

/// Semantic capabilities of a symbol, computed once per snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SymbolFlags {
    pub is_value: bool,
    pub is_type_only: bool,
    /// The symbol re-exports or imports another symbol
    pub is_alias: bool,
}

impl SymbolFlags {
    pub const VALUE: SymbolFlags = SymbolFlags { is_value: true, is_type_only: false, is_alias: false };
    pub const TYPE: SymbolFlags = SymbolFlags { is_value: false, is_type_only: true, is_alias: false };

    pub fn as_alias(self) -> Self {
        SymbolFlags { is_alias: true, ..self }
    }

    /// Combine the meanings of two declarations merged under one name
    pub fn merge(self, other: SymbolFlags) -> Self {
        let is_value = self.is_value || other.is_value;
        SymbolFlags {
            is_value,
            is_type_only: !is_value && (self.is_type_only || other.is_type_only),
            is_alias: self.is_alias || other.is_alias,
        }
    }
}

/// Opaque symbol identity within one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolId {
    /// Declared (or re-exported) at `offset` in `file`
    Declaration { file: FileKey, offset: usize },
    /// Member `name` reached through one particular namespace import
    Member { namespace: Box<SymbolId>, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub flags: SymbolFlags,
}

/// Outcome of resolving a module specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleResolution {
    Resolved(FileKey),
    /// A package outside the project
    External,
    Unresolved,
}

/// Which declaration spaces a name lookup considers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meaning {
    Value,
    Type,
    All,
}

/// Read-only view of all source files plus symbol resolution, valid for one pass.
pub trait Program: Sync {
    fn source_files(&self) -> Vec<FileKey>;

    fn full_text(&self, file: &FileKey) -> Option<&str>;

    /// Statements, scopes and references extracted from the file's syntax tree
    fn syntax(&self, file: &FileKey) -> Option<&ModuleSyntax>;

    fn resolve_module_name(&self, specifier: &str, from: &FileKey) -> ModuleResolution;

    /// Symbol named by the identifier or member access property at `offset`
    fn symbol_at_location(&self, file: &FileKey, offset: usize) -> Option<Symbol>;

    /// Exports of a module file; `None` when the file is not a module
    fn exports_of_module(&self, file: &FileKey) -> Option<Vec<Symbol>>;

    fn resolve_name(
        &self,
        file: &FileKey,
        name: &str,
        location: usize,
        meaning: Meaning,
        exclude_globals: bool,
    ) -> Option<Symbol>;

    /// Every reference to `binding` within `file`, in source order
    fn references(&self, file: &FileKey, binding: BindingId) -> Vec<Reference>;
}

/// Produces a fresh snapshot from the current text of every file
pub trait ProgramBuilder {
    type Program: Program;

    fn build(&self, sources: &SourceSet) -> Result<Self::Program>;
}

/// [`NameScope`] over one file of a snapshot
pub struct FileScope<'a> {
    program: &'a dyn Program,
    file: &'a FileKey,
}

impl<'a> FileScope<'a> {
    pub fn new(program: &'a dyn Program, file: &'a FileKey) -> Self {
        Self { program, file }
    }
}

impl NameScope for FileScope<'_> {
    fn resolves(&self, name: &str, location: usize, exclude_globals: bool) -> bool {
        self.program
            .resolve_name(self.file, name, location, Meaning::All, exclude_globals)
            .is_some()
    }

    fn occurs_in_file(&self, name: &str) -> bool {
        self.program
            .syntax(self.file)
            .is_some_and(|syntax| syntax.identifiers.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_value() {
        let merged = SymbolFlags::TYPE.merge(SymbolFlags::VALUE);
        assert!(merged.is_value);
        assert!(!merged.is_type_only);
    }

    #[test]
    fn test_merge_of_types_stays_type_only() {
        let merged = SymbolFlags::TYPE.merge(SymbolFlags::TYPE.as_alias());
        assert_eq!(merged, SymbolFlags { is_value: false, is_type_only: true, is_alias: true });
    }
}
