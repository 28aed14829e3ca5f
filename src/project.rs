//! Loading a project from disk: configuration, file list and initial texts.
//!
//! Every error a run can hit before its first pass is raised here.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{ProjectConfig, find_config_file, load_config};
use crate::error::Result;
use crate::file::{FileKey, SourceSet, read_file};
use crate::language::detect_script_kind;
use crate::program::typescript::{CompilerOptions, TsProgramBuilder};

const GLOB_CHARS: &[char] = &['*', '?', '[', '{'];

/// Directories never searched for sources
fn is_ignored_dir(name: &str) -> bool {
    name == "node_modules" || (name.starts_with('.') && name != "." && name != "..")
}

/// A loaded project, ready to hand to the engine
#[derive(Debug)]
pub struct Project {
    /// Directory holding the config file
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub config: ProjectConfig,
    pub sources: SourceSet,
}

impl Project {
    /// Find the config for `path`, then read every file it includes
    pub fn load(path: &Path) -> Result<Project> {
        let config_path = find_config_file(path)?;
        let config = load_config(&config_path)?;
        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut sources = SourceSet::new();
        for file in collect_files(&root, &config)? {
            let text = read_file(&file)?;
            sources.insert(text.key, text.content);
        }
        info!(
            config = %config_path.display(),
            files = sources.len(),
            "loaded project"
        );
        Ok(Project { root, config_path, config, sources })
    }

    pub fn compiler_options(&self) -> CompilerOptions {
        CompilerOptions {
            base_url: self
                .config
                .compiler_options
                .base_url
                .as_ref()
                .map(|base| FileKey::new(self.root.join(base))),
        }
    }

    pub fn program_builder(&self) -> TsProgramBuilder {
        TsProgramBuilder::new(self.compiler_options())
    }
}

/// Portion of a pattern before its first glob character, cut back to a whole path segment
fn literal_prefix(pattern: &str) -> &str {
    match pattern.find(GLOB_CHARS) {
        None => pattern.trim_end_matches('/'),
        Some(idx) => pattern[..idx].rfind('/').map_or("", |slash| &pattern[..slash]),
    }
}

/// Paths named by `include`/`files`, filtered by kind and `exclude`, sorted and deduplicated
pub fn collect_files(root: &Path, config: &ProjectConfig) -> Result<Vec<PathBuf>> {
    let allow_js = config.compiler_options.allow_js;
    let excluded: Vec<PathBuf> = config
        .exclude
        .iter()
        .map(|pattern| root.join(literal_prefix(pattern)))
        .collect();
    let is_excluded = |path: &Path| excluded.iter().any(|prefix| path.starts_with(prefix));

    let mut found = Vec::new();
    for file in config.files.iter().flatten() {
        // `files` entries bypass `exclude`
        let path = root.join(file);
        if path.is_file() {
            found.push(path);
        }
    }

    let include: Vec<&str> = match (&config.include, &config.files) {
        (Some(include), _) => include.iter().map(String::as_str).collect(),
        (None, Some(_)) => Vec::new(),
        (None, None) => vec![""],
    };

    for pattern in include {
        let start = root.join(literal_prefix(pattern));
        let walker = WalkDir::new(&start)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !entry.file_name().to_str().is_some_and(is_ignored_dir)
            });
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.path() == Some(start.as_path()) => {
                    debug!(pattern, "include pattern matches nothing");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let path = entry.path();
            if entry.file_type().is_file()
                && detect_script_kind(path).is_supported(allow_js)
                && !is_excluded(path)
            {
                found.push(path.to_path_buf());
            }
        }
    }

    found.sort();
    found.dedup();
    debug!(root = %root.display(), files = found.len(), "collected project files");
    Ok(found)
}
