//! Analyzers decide which rewrites to propose for one file of a snapshot.

mod export_star;
mod namespace_import;

use tracing::trace;

use crate::alias::AliasMap;
use crate::file::FileKey;
use crate::program::Program;
use crate::program::syntax::Statement;
use crate::tracker::ChangeTracker;

/// Proposes edits for a single file against an immutable snapshot.
///
/// Analyzers run once per file per pass and may run on several workers at
/// once. Every proposal goes through `tracker`; anything an analyzer cannot
/// resolve is skipped without an error.
pub trait Analyzer: Sync {
    fn analyze(&self, file: &FileKey, program: &dyn Program, tracker: &mut dyn ChangeTracker);
}

/// Rewrites `export * from` into explicit exports and namespace imports into named imports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportRewriter {
    pub expand_export_star: bool,
    pub convert_namespace_imports: bool,
}

impl Default for ImportRewriter {
    fn default() -> Self {
        Self { expand_export_star: true, convert_namespace_imports: true }
    }
}

impl Analyzer for ImportRewriter {
    fn analyze(&self, file: &FileKey, program: &dyn Program, tracker: &mut dyn ChangeTracker) {
        let Some(syntax) = program.syntax(file) else {
            return;
        };
        trace!(%file, statements = syntax.statements.len(), "analyzing");

        // one alias map for every namespace import of the file
        let mut aliases = AliasMap::new();
        for statement in &syntax.statements {
            match statement {
                Statement::Export(export) if self.expand_export_star => {
                    export_star::expand(file, export, program, tracker);
                }
                Statement::Import(import) if self.convert_namespace_imports => {
                    namespace_import::convert(file, import, program, &mut aliases, tracker);
                }
                _ => {}
            }
        }
    }
}
