use indexmap::IndexMap;
use tracing::debug;

use crate::alias::AliasMap;
use crate::file::FileKey;
use crate::position::Span;
use crate::program::syntax::ImportDecl;
use crate::program::{FileScope, Program, Usage};
use crate::tracker::{ChangeTracker, RangeOptions};

/// Property accesses through the namespace, grouped by member name
type MemberAccesses = IndexMap<String, Vec<(Span, Span)>>;

/// Turn `import * as ns from 'm'` plus `ns.member` accesses into named imports.
///
/// The import edit and every access rewrite form one batch. The namespace
/// import survives, with the named import inserted after it, when `ns` is
/// also used other than through a property access.
pub(super) fn convert(
    file: &FileKey,
    import: &ImportDecl,
    program: &dyn Program,
    aliases: &mut AliasMap,
    tracker: &mut dyn ChangeTracker,
) {
    let Some(namespace) = import.namespace else {
        return;
    };
    let Some(specifier) = &import.specifier else {
        return;
    };
    if import.has_error {
        debug!(%file, span = %import.span, "skipping namespace import: statement has syntax errors");
        return;
    }
    if import.type_only && import.default.is_some() {
        debug!(%file, span = %import.span, "skipping type-only namespace import with a default");
        return;
    }

    let mut still_used = false;
    let mut members = MemberAccesses::new();
    for reference in program.references(file, namespace) {
        match reference.usage {
            Usage::Member { property, property_span, access } => {
                members.entry(property).or_default().push((access, property_span));
            }
            Usage::Bare => still_used = true,
        }
    }
    if members.is_empty() {
        debug!(%file, specifier = %specifier.text, "skipping namespace import: no member accesses");
        return;
    }

    let scope = FileScope::new(program, file);
    let mut rewrites: Vec<(Span, String)> = Vec::new();
    let mut specifiers = Vec::new();
    for (property, accesses) in &members {
        let Some(symbol) = program.symbol_at_location(file, accesses[0].1.start) else {
            debug!(%file, member = %property, "skipping namespace import: member has no symbol");
            return;
        };
        let use_sites: Vec<usize> = accesses.iter().map(|(access, _)| access.start).collect();
        let name = aliases.assign(&symbol, &use_sites, &scope);
        specifiers.push(if &name == property { name.clone() } else { format!("{property} as {name}") });
        rewrites.extend(accesses.iter().map(|(access, _)| (*access, name.clone())));
    }

    let named = format!(
        "import {}{{ {} }} from {}{}",
        if import.type_only { "type " } else { "" },
        specifiers.join(", "),
        specifier.raw,
        if import.semicolon { ";" } else { "" },
    );

    debug!(
        %file,
        specifier = %specifier.text,
        members = members.len(),
        accesses = rewrites.len(),
        keep_namespace = still_used,
        "converting namespace import"
    );

    tracker.atomic(&mut |t: &mut dyn ChangeTracker| {
        if still_used {
            t.insert_after(import.span, &named);
        } else {
            let replacement = match import.default {
                Some(default) => {
                    let default_name = program
                        .syntax(file)
                        .map(|syntax| syntax.binding(default).name.clone())
                        .unwrap_or_default();
                    named.replacen("import {", &format!("import {default_name}, {{"), 1)
                }
                None => named.clone(),
            };
            t.replace_one(import.span, &replacement, RangeOptions::default());
        }
        for (access, name) in &rewrites {
            t.replace_one(*access, name, RangeOptions::default());
        }
    });
}
