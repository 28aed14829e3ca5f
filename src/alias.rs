//! Collision-free replacement names for symbols rewritten within one file.
//!
//! An [`AliasMap`] lives for one file in one pass. The first request for a
//! symbol decides its name against the live scope; later requests return
//! the cached choice, so the declaration that introduces the name and every
//! reference that uses it agree.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use crate::program::{Symbol, SymbolId};

/// Scope queries needed to decide whether a name is free.
pub trait NameScope {
    /// Whether `name` resolves to an existing binding at byte `location`
    fn resolves(&self, name: &str, location: usize, exclude_globals: bool) -> bool;

    /// Whether `name` occurs as an identifier anywhere in the file
    fn occurs_in_file(&self, name: &str) -> bool;
}

/// Per-file, per-pass assignment of replacement names
#[derive(Debug, Default)]
pub struct AliasMap {
    chosen: IndexMap<SymbolId, String>,
    taken: HashSet<String>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name to use for `symbol` at `use_sites`.
    ///
    /// The symbol keeps its own name unless that name is a reserved word,
    /// already resolves at one of the use sites (globals ignored), or was
    /// handed to another symbol of this map. Otherwise a numeric suffix is
    /// appended and incremented until the candidate is free everywhere.
    pub fn assign(&mut self, symbol: &Symbol, use_sites: &[usize], scope: &dyn NameScope) -> String {
        if let Some(name) = self.chosen.get(&symbol.id) {
            return name.clone();
        }

        let base = symbol.name.as_str();
        let collides = is_reserved_word(base)
            || self.taken.contains(base)
            || use_sites.iter().any(|&site| scope.resolves(base, site, true));

        let name = if collides {
            let unique = self.unique_name(base, use_sites, scope);
            debug!(symbol = base, alias = %unique, "renaming to avoid a collision");
            unique
        } else {
            base.to_string()
        };

        self.taken.insert(name.clone());
        self.chosen.insert(symbol.id.clone(), name.clone());
        name
    }

    fn unique_name(&self, base: &str, use_sites: &[usize], scope: &dyn NameScope) -> String {
        let mut n: u64 = 2;
        loop {
            let candidate = format!("{base}{n}");
            if !self.taken.contains(&candidate)
                && !scope.occurs_in_file(&candidate)
                && !use_sites.iter().any(|&site| scope.resolves(&candidate, site, false))
            {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn get(&self, id: &SymbolId) -> Option<&str> {
        self.chosen.get(id).map(String::as_str)
    }

    /// Assigned names in the order they were first requested
    pub fn iter(&self) -> impl Iterator<Item = (&SymbolId, &str)> {
        self.chosen.iter().map(|(id, name)| (id, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.chosen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chosen.is_empty()
    }
}

/// Symbols split by whether a declaration for them may be type-only
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SymbolBuckets {
    pub values: Vec<Symbol>,
    pub types: Vec<Symbol>,
}

/// Partition symbols into the value and type-only channels.
///
/// Only symbols that are types and nothing else go to the type channel;
/// anything that is or might be a value stays a value.
pub fn partition_symbols(symbols: impl IntoIterator<Item = Symbol>) -> SymbolBuckets {
    let mut buckets = SymbolBuckets::default();
    for symbol in symbols {
        if symbol.flags.is_type_only && !symbol.flags.is_value {
            buckets.types.push(symbol);
        } else {
            buckets.values.push(symbol);
        }
    }
    buckets
}

const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Whether `name` cannot be used as a binding identifier
pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}
