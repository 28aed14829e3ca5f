use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::alias::partition_symbols;
use crate::file::FileKey;
use crate::program::syntax::{ExportDecl, ExportKind, ModuleSpecifier, ModuleSyntax};
use crate::program::{ModuleResolution, Program, Symbol, SymbolId};
use crate::tracker::{ChangeTracker, RangeOptions};

/// Replace `export * from 'm'` with named value and type exports of `m`
pub(super) fn expand(file: &FileKey, export: &ExportDecl, program: &dyn Program, tracker: &mut dyn ChangeTracker) {
    // `export * as ns` and `export { .. }` are left alone
    let ExportKind::Star { specifier, type_only } = &export.kind else {
        return;
    };
    if export.has_error {
        debug!(%file, span = %export.span, "skipping export *: statement has syntax errors");
        return;
    }

    let target = match program.resolve_module_name(&specifier.text, file) {
        ModuleResolution::Resolved(target) => target,
        other => {
            debug!(%file, specifier = %specifier.text, resolution = ?other, "skipping export *: module not in project");
            return;
        }
    };
    let Some(exports) = program.exports_of_module(&target) else {
        debug!(%file, target = %target, "skipping export *: target is not a module");
        return;
    };
    let exports = match program.syntax(file) {
        Some(syntax) => visible_exports(file, export, without_default(exports), syntax, program),
        None => without_default(exports),
    };
    if exports.is_empty() {
        debug!(%file, target = %target, "skipping export *: nothing reaches this module through it");
        return;
    }

    let mut buckets = partition_symbols(exports);
    if *type_only {
        buckets.types.append(&mut buckets.values);
    }

    let mut statements = Vec::new();
    if !buckets.values.is_empty() {
        statements.push(export_statement(&buckets.values, false, specifier, export.semicolon));
    }
    if !buckets.types.is_empty() {
        statements.push(export_statement(&buckets.types, true, specifier, export.semicolon));
    }
    debug!(
        %file,
        specifier = %specifier.text,
        values = buckets.values.len(),
        types = buckets.types.len(),
        "expanding export *"
    );
    tracker.replace_with_many(export.span, &statements, RangeOptions::default());
}

fn export_statement(symbols: &[Symbol], type_only: bool, specifier: &ModuleSpecifier, semicolon: bool) -> String {
    let names: Vec<&str> = symbols.iter().map(|symbol| symbol.name.as_str()).collect();
    format!(
        "export {}{{ {} }} from {}{}",
        if type_only { "type " } else { "" },
        names.join(", "),
        specifier.raw,
        if semicolon { ";" } else { "" },
    )
}

/// A star re-export never forwards `default`
fn without_default(exports: Vec<Symbol>) -> Vec<Symbol> {
    exports.into_iter().filter(|symbol| symbol.name != "default").collect()
}

/// Names `syntax` exports on its own, which shadow anything a star provides
fn local_export_names(syntax: &ModuleSyntax) -> HashSet<&str> {
    let mut names = HashSet::new();
    for export in syntax.exports() {
        match &export.kind {
            ExportKind::Declaration { names: declared } => {
                names.extend(declared.iter().map(|name| name.name.as_str()));
            }
            ExportKind::Named { specifiers, .. } => {
                names.extend(specifiers.iter().map(|spec| spec.exported.as_str()));
            }
            ExportKind::Default { .. } => {
                names.insert("default");
            }
            ExportKind::StarAs { name, .. } => {
                names.insert(name.as_str());
            }
            ExportKind::Star { .. } | ExportKind::Assignment => {}
        }
    }
    names
}

/// Drop what the expansion of `export` must not name explicitly.
///
/// A local export hides a star export of the same name. Two stars providing
/// different symbols under one name make it ambiguous, so neither exports it.
/// When several stars provide the same symbol only the first one names it.
fn visible_exports(
    file: &FileKey,
    export: &ExportDecl,
    exports: Vec<Symbol>,
    syntax: &ModuleSyntax,
    program: &dyn Program,
) -> Vec<Symbol> {
    let local = local_export_names(syntax);

    let mut siblings: HashMap<String, Vec<(SymbolId, bool)>> = HashMap::new();
    let mut earlier = true;
    for other in syntax.exports() {
        if other.span == export.span {
            earlier = false;
            continue;
        }
        let ExportKind::Star { specifier, .. } = &other.kind else {
            continue;
        };
        if other.has_error {
            continue;
        }
        let ModuleResolution::Resolved(target) = program.resolve_module_name(&specifier.text, file) else {
            continue;
        };
        for symbol in without_default(program.exports_of_module(&target).unwrap_or_default()) {
            siblings.entry(symbol.name).or_default().push((symbol.id, earlier));
        }
    }

    exports
        .into_iter()
        .filter(|symbol| {
            if local.contains(symbol.name.as_str()) {
                debug!(%file, name = %symbol.name, "not re-exporting: shadowed by a local export");
                return false;
            }
            let providers = siblings.get(&symbol.name).map(Vec::as_slice).unwrap_or_default();
            if providers.iter().any(|(id, _)| *id != symbol.id) {
                debug!(%file, name = %symbol.name, "not re-exporting: ambiguous between star exports");
                return false;
            }
            !providers.iter().any(|(_, earlier)| *earlier)
        })
        .collect()
}
