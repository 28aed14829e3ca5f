//! Program snapshots over TypeScript sources, parsed with tree-sitter.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::file::{FileKey, SourceSet};
use crate::language::detect_script_kind;

use super::syntax::{self, Binding, BindingKind, ExportKind, ImportedName, ModuleSyntax, Usage};
use super::{
    BindingId, Meaning, ModuleResolution, Program, ProgramBuilder, Reference, Symbol, SymbolFlags,
    SymbolId,
};

/// Extensions tried, in order, when a specifier names a file without one
const RESOLUTION_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".d.ts", ".js", ".jsx"];

/// Compiler options that influence how a snapshot resolves modules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Directory non-relative specifiers are resolved against
    pub base_url: Option<FileKey>,
}

/// Builds [`TsProgram`] snapshots
#[derive(Debug, Clone, Default)]
pub struct TsProgramBuilder {
    options: CompilerOptions,
}

impl TsProgramBuilder {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }
}

impl ProgramBuilder for TsProgramBuilder {
    type Program = TsProgram;

    fn build(&self, sources: &SourceSet) -> Result<TsProgram> {
        let mut files = BTreeMap::new();
        for source in sources.iter() {
            let kind = detect_script_kind(source.key.as_path());
            let tree = syntax::parse(&source.content, kind.uses_jsx()).ok_or_else(|| Error::Parse {
                file: source.key.clone(),
                message: format!("tree-sitter could not parse {kind} source"),
            })?;
            let syntax = ModuleSyntax::from_tree(&tree, &source.content);
            trace!(
                file = %source.key,
                statements = syntax.statements.len(),
                bindings = syntax.bindings.len(),
                "parsed"
            );
            files.insert(
                source.key.clone(),
                ParsedFile { text: source.content.clone(), syntax },
            );
        }

        let mut globals: HashMap<String, Vec<(FileKey, BindingId)>> = HashMap::new();
        for (key, file) in &files {
            if file.syntax.is_module {
                continue;
            }
            for (id, binding) in file.syntax.top_level_bindings() {
                globals.entry(binding.name.clone()).or_default().push((key.clone(), id));
            }
        }

        debug!(files = files.len(), globals = globals.len(), "built program snapshot");
        Ok(TsProgram {
            files,
            base_url: self.options.base_url.clone(),
            globals,
        })
    }
}

#[derive(Debug)]
struct ParsedFile {
    text: String,
    syntax: ModuleSyntax,
}

/// Immutable snapshot of every project file with scope and export analysis
#[derive(Debug)]
pub struct TsProgram {
    files: BTreeMap<FileKey, ParsedFile>,
    base_url: Option<FileKey>,
    /// Top-level bindings of script files, visible from every file
    globals: HashMap<String, Vec<(FileKey, BindingId)>>,
}

fn is_relative(specifier: &str) -> bool {
    specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../")
}

fn flags_of_kind(kind: &BindingKind) -> SymbolFlags {
    match kind {
        BindingKind::Value => SymbolFlags::VALUE,
        BindingKind::Type => SymbolFlags::TYPE,
        BindingKind::ValueAndType => SymbolFlags { is_value: true, is_type_only: false, is_alias: false },
        BindingKind::Import(_) => SymbolFlags::VALUE.as_alias(),
    }
}

impl TsProgram {
    /// First snapshot file matching `base` under the resolution order
    fn probe(&self, base: &str) -> Option<FileKey> {
        let mut candidates = Vec::new();
        for js in [".js", ".jsx", ".mjs", ".cjs"] {
            if let Some(stem) = base.strip_suffix(js) {
                candidates.extend([".ts", ".tsx", ".d.ts"].iter().map(|ext| format!("{stem}{ext}")));
            }
        }
        candidates.push(base.to_string());
        candidates.extend(RESOLUTION_EXTENSIONS.iter().map(|ext| format!("{base}{ext}")));
        candidates.extend(RESOLUTION_EXTENSIONS.iter().map(|ext| format!("{base}/index{ext}")));

        candidates
            .into_iter()
            .map(FileKey::new)
            .find(|key| self.files.contains_key(key))
    }

    fn symbol_for_binding(&self, file: &FileKey, id: BindingId, stack: &mut Vec<FileKey>) -> Option<Symbol> {
        let binding = self.files.get(file)?.syntax.bindings.get(id)?;
        Some(Symbol {
            id: SymbolId::Declaration { file: file.clone(), offset: binding.span.start },
            name: binding.name.clone(),
            flags: self.binding_flags(file, binding, stack),
        })
    }

    /// Flags of a binding, following import aliases to what they import
    fn binding_flags(&self, file: &FileKey, binding: &Binding, stack: &mut Vec<FileKey>) -> SymbolFlags {
        let BindingKind::Import(target) = &binding.kind else {
            return flags_of_kind(&binding.kind);
        };
        if target.type_only {
            return SymbolFlags::TYPE.as_alias();
        }
        let ModuleResolution::Resolved(module) = self.resolve_module_name(&target.specifier, file) else {
            return SymbolFlags::VALUE.as_alias();
        };
        let wanted = match &target.imported {
            ImportedName::Namespace => return SymbolFlags::VALUE.as_alias(),
            ImportedName::Default => "default",
            ImportedName::Named(name) => name.as_str(),
        };
        self.export_flags(&module, wanted, stack).as_alias()
    }

    /// Flags of export `name` of `module`; unknown exports count as values
    fn export_flags(&self, module: &FileKey, name: &str, stack: &mut Vec<FileKey>) -> SymbolFlags {
        self.collect_exports(module, stack)
            .and_then(|exports| exports.get(name).map(|symbol| symbol.flags))
            .unwrap_or(SymbolFlags::VALUE)
    }

    /// Flags merged over every module-scope declaration of `name`
    fn local_flags(&self, file: &FileKey, name: &str, stack: &mut Vec<FileKey>) -> SymbolFlags {
        let Some(parsed) = self.files.get(file) else {
            return SymbolFlags::VALUE;
        };
        parsed
            .syntax
            .module_bindings(name)
            .iter()
            .map(|&id| self.binding_flags(file, parsed.syntax.binding(id), stack))
            .reduce(SymbolFlags::merge)
            .unwrap_or(SymbolFlags::VALUE)
    }

    /// Exports of `file` keyed by exported name, in declaration order.
    ///
    /// `stack` holds the modules currently being expanded; re-entering one of
    /// them yields no exports, which breaks `export *` and re-export cycles.
    fn collect_exports(&self, file: &FileKey, stack: &mut Vec<FileKey>) -> Option<IndexMap<String, Symbol>> {
        let parsed = self.files.get(file)?;
        if !parsed.syntax.is_module {
            return None;
        }
        if stack.contains(file) {
            trace!(%file, "export cycle");
            return Some(IndexMap::new());
        }
        stack.push(file.clone());

        let declared = |offset: usize| SymbolId::Declaration { file: file.clone(), offset };
        let mut exports: IndexMap<String, Symbol> = IndexMap::new();
        let mut stars = Vec::new();

        for export in parsed.syntax.exports() {
            match &export.kind {
                ExportKind::Declaration { names } => {
                    for exported in names {
                        let flags = parsed
                            .syntax
                            .module_bindings(&exported.name)
                            .iter()
                            .map(|&id| flags_of_kind(&parsed.syntax.binding(id).kind))
                            .reduce(SymbolFlags::merge)
                            .unwrap_or_else(|| flags_of_kind(&exported.kind));
                        exports.insert(
                            exported.name.clone(),
                            Symbol { id: declared(exported.span.start), name: exported.name.clone(), flags },
                        );
                    }
                }
                ExportKind::Named { specifiers, source, type_only } => {
                    let module = source
                        .as_ref()
                        .map(|source| self.resolve_module_name(&source.text, file));
                    for spec in specifiers {
                        let flags = if *type_only || spec.type_only {
                            SymbolFlags::TYPE
                        } else {
                            match &module {
                                None => self.local_flags(file, &spec.local, stack),
                                Some(ModuleResolution::Resolved(target)) => {
                                    self.export_flags(target, &spec.local, stack)
                                }
                                Some(_) => SymbolFlags::VALUE,
                            }
                        };
                        exports.insert(
                            spec.exported.clone(),
                            Symbol { id: declared(spec.span.start), name: spec.exported.clone(), flags: flags.as_alias() },
                        );
                    }
                }
                ExportKind::StarAs { name, name_span, .. } => {
                    exports.insert(
                        name.clone(),
                        Symbol { id: declared(name_span.start), name: name.clone(), flags: SymbolFlags::VALUE.as_alias() },
                    );
                }
                ExportKind::Default { span, kind } => {
                    exports.insert(
                        "default".to_string(),
                        Symbol { id: declared(span.start), name: "default".to_string(), flags: flags_of_kind(kind) },
                    );
                }
                ExportKind::Star { specifier, type_only } => stars.push((specifier.text.clone(), *type_only)),
                ExportKind::Assignment => {}
            }
        }

        for (specifier, type_only) in stars {
            let ModuleResolution::Resolved(target) = self.resolve_module_name(&specifier, file) else {
                continue;
            };
            let Some(reexported) = self.collect_exports(&target, stack) else {
                continue;
            };
            for (name, mut symbol) in reexported {
                if name == "default" || exports.contains_key(&name) {
                    continue;
                }
                if type_only {
                    symbol.flags = SymbolFlags::TYPE.as_alias();
                }
                exports.insert(name, symbol);
            }
        }

        stack.pop();
        Some(exports)
    }

    /// Symbol for `property` reached through the namespace import `namespace`
    fn member_symbol(&self, file: &FileKey, namespace: BindingId, property: &str) -> Option<Symbol> {
        let parsed = self.files.get(file)?;
        let binding = parsed.syntax.bindings.get(namespace)?;
        let BindingKind::Import(target) = &binding.kind else {
            return None;
        };
        if target.imported != ImportedName::Namespace {
            return None;
        }
        let flags = match self.resolve_module_name(&target.specifier, file) {
            ModuleResolution::Resolved(module) => self.export_flags(&module, property, &mut Vec::new()),
            _ => SymbolFlags::VALUE,
        };
        Some(Symbol {
            id: SymbolId::Member {
                namespace: Box::new(SymbolId::Declaration { file: file.clone(), offset: binding.span.start }),
                name: property.to_string(),
            },
            name: property.to_string(),
            flags: flags.as_alias(),
        })
    }
}

impl Program for TsProgram {
    fn source_files(&self) -> Vec<FileKey> {
        self.files.keys().cloned().collect()
    }

    fn full_text(&self, file: &FileKey) -> Option<&str> {
        self.files.get(file).map(|parsed| parsed.text.as_str())
    }

    fn syntax(&self, file: &FileKey) -> Option<&ModuleSyntax> {
        self.files.get(file).map(|parsed| &parsed.syntax)
    }

    fn resolve_module_name(&self, specifier: &str, from: &FileKey) -> ModuleResolution {
        if is_relative(specifier) {
            let base = FileKey::new(Path::new(from.parent_dir()).join(specifier));
            return match self.probe(base.as_str()) {
                Some(key) => ModuleResolution::Resolved(key),
                None => ModuleResolution::Unresolved,
            };
        }
        if specifier.starts_with('/') {
            return self.probe(specifier).map_or(ModuleResolution::Unresolved, ModuleResolution::Resolved);
        }
        self.base_url
            .as_ref()
            .and_then(|base_url| self.probe(FileKey::new(base_url.as_path().join(specifier)).as_str()))
            .map_or(ModuleResolution::External, ModuleResolution::Resolved)
    }

    fn symbol_at_location(&self, file: &FileKey, offset: usize) -> Option<Symbol> {
        let syntax = &self.files.get(file)?.syntax;

        if let Some(id) = syntax.bindings.iter().position(|b| b.span.contains(offset)) {
            return self.symbol_for_binding(file, id, &mut Vec::new());
        }

        for reference in &syntax.references {
            if let Usage::Member { property, property_span, .. } = &reference.usage {
                if property_span.contains(offset) {
                    let namespace = syntax.resolve(&reference.name, reference.span.start, Meaning::All)?;
                    return self.member_symbol(file, namespace, property);
                }
            }
            if reference.span.contains(offset) {
                return self.resolve_name(file, &reference.name, reference.span.start, Meaning::All, false);
            }
        }
        None
    }

    fn exports_of_module(&self, file: &FileKey) -> Option<Vec<Symbol>> {
        self.collect_exports(file, &mut Vec::new())
            .map(|exports| exports.into_values().collect())
    }

    fn resolve_name(
        &self,
        file: &FileKey,
        name: &str,
        location: usize,
        meaning: Meaning,
        exclude_globals: bool,
    ) -> Option<Symbol> {
        let syntax = &self.files.get(file)?.syntax;
        if let Some(id) = syntax.resolve(name, location, meaning) {
            let binding = syntax.binding(id);
            // a script file's own top-level bindings are globals
            if !(exclude_globals && !syntax.is_module && binding.scope == syntax::MODULE_SCOPE) {
                return self.symbol_for_binding(file, id, &mut Vec::new());
            }
        }
        if exclude_globals {
            return None;
        }
        self.globals.get(name)?.iter().find_map(|(owner, id)| {
            let binding = self.files.get(owner)?.syntax.bindings.get(*id)?;
            let visible = match meaning {
                Meaning::All => true,
                Meaning::Value => binding.kind != BindingKind::Type,
                Meaning::Type => binding.kind != BindingKind::Value,
            };
            if visible { self.symbol_for_binding(owner, *id, &mut Vec::new()) } else { None }
        })
    }

    fn references(&self, file: &FileKey, binding: BindingId) -> Vec<Reference> {
        self.files
            .get(file)
            .map(|parsed| parsed.syntax.references_to(binding))
            .unwrap_or_default()
    }
}
