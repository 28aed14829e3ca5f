//! Project configuration: `tsconfig.json` discovery and the engine options.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "tsconfig.json";

/// Fields of `tsconfig.json` the rewriter understands; everything else is ignored
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub compiler_options: CompilerOptionsConfig,
    pub files: Option<Vec<String>>,
    pub include: Option<Vec<String>>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptionsConfig {
    pub base_url: Option<String>,
    #[serde(default)]
    pub allow_js: bool,
}

/// Limits and scheduling of the pass loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Passes allowed before a run that keeps conflicting is abandoned
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
    /// Analyze the files of a pass on the rayon pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_max_passes() -> usize {
    32
}

fn default_parallel() -> bool {
    true
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_passes: default_max_passes(),
            parallel: default_parallel(),
        }
    }
}

/// Find `tsconfig.json` at `start` or in the closest ancestor directory.
///
/// `start` may name the config file itself, a file inside the project, or a
/// directory.
pub fn find_config_file(start: &Path) -> Result<PathBuf> {
    if start.is_file() && start.file_name().is_some_and(|name| name == CONFIG_FILE_NAME) {
        return Ok(start.to_path_buf());
    }
    let first = if start.is_dir() { Some(start) } else { start.parent() };
    first
        .into_iter()
        .flat_map(Path::ancestors)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| Error::ConfigNotFound(start.to_path_buf()))
}

/// Read and parse a `tsconfig.json`
pub fn load_config(path: &Path) -> Result<ProjectConfig> {
    let raw = fs::read_to_string(path)?;
    let config = parse_config(&raw).map_err(|err| Error::Config {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    debug!(path = %path.display(), ?config, "loaded project configuration");
    Ok(config)
}

/// Parse tsconfig text, which may carry comments and trailing commas
pub fn parse_config(raw: &str) -> std::result::Result<ProjectConfig, serde_json::Error> {
    serde_json::from_str(&strip_trailing_commas(&strip_comments(raw)))
}

/// Remove `//` and `/* */` comments outside of string literals
pub fn strip_comments(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek().copied()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = ' ';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Drop commas that directly precede `}` or `]`
pub fn strip_trailing_commas(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut idx = 0;

    while idx < chars.len() {
        let c = chars[idx];
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&escaped) = chars.get(idx + 1) {
                    out.push(escaped);
                    idx += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            out.push(c);
        } else if c == ',' {
            let next = chars[idx + 1..].iter().copied().find(|n| !n.is_whitespace());
            if !matches!(next, Some('}') | Some(']')) {
                out.push(c);
            }
        } else {
            out.push(c);
        }
        idx += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_config_with_comments_and_trailing_commas() {
        let raw = r#"{
            // compiler settings
            "compilerOptions": {
                "baseUrl": "./src", /* resolved against the config dir */
                "allowJs": true,
            },
            "include": ["src/**/*", "types",],
            "exclude": ["src/generated"]
        }"#;

        let config = parse_config(raw).unwrap();

        assert_eq!(config.compiler_options.base_url.as_deref(), Some("./src"));
        assert!(config.compiler_options.allow_js);
        assert_eq!(config.include, Some(vec!["src/**/*".to_string(), "types".to_string()]));
        assert_eq!(config.exclude, vec!["src/generated".to_string()]);
        assert_eq!(config.files, None);
    }

    #[test]
    fn test_comment_markers_inside_strings_are_kept() {
        let raw = r#"{ "include": ["src//*", "a/*b*/c", "x,]"] }"#;
        let config = parse_config(raw).unwrap();
        assert_eq!(
            config.include,
            Some(vec!["src//*".to_string(), "a/*b*/c".to_string(), "x,]".to_string()])
        );
    }

    #[test]
    fn test_malformed_config_is_rejected() {
        assert!(parse_config("{ \"include\": [ }").is_err());
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config, "{}").unwrap();
        let nested = dir.path().join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config_file(&nested).unwrap(), config);
        assert_eq!(find_config_file(&config).unwrap(), config);
    }

    #[test]
    fn test_find_config_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        // tempdirs live outside any project, but an ancestor could still hold one
        if let Err(err) = find_config_file(dir.path()) {
            assert!(matches!(err, Error::ConfigNotFound(_)));
        }
    }

    #[test]
    fn test_engine_options_defaults() {
        let options: EngineOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, EngineOptions { max_passes: 32, parallel: true });
    }
}
