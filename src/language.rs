use serde::{Deserialize, Serialize};
use std::path::Path;

/// Kind of script a source file holds, derived from its extension
///
/// The kind decides which tree-sitter grammar parses the file and whether a
/// project includes it at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptKind {
    /// TypeScript (.ts, .mts, .cts)
    Ts,
    /// TypeScript with JSX (.tsx)
    Tsx,
    /// Declaration file (.d.ts, .d.mts, .d.cts)
    Declaration,
    /// JavaScript (.js, .mjs, .cjs)
    Js,
    /// JavaScript with JSX (.jsx)
    Jsx,
    /// Anything else
    Unknown,
}

impl ScriptKind {
    pub fn name(&self) -> &str {
        match self {
            ScriptKind::Ts => "TypeScript",
            ScriptKind::Tsx => "TSX",
            ScriptKind::Declaration => "Declaration",
            ScriptKind::Js => "JavaScript",
            ScriptKind::Jsx => "JSX",
            ScriptKind::Unknown => "Unknown",
        }
    }

    /// Whether the file must be parsed with the JSX-aware grammar
    pub fn uses_jsx(&self) -> bool {
        matches!(self, ScriptKind::Tsx | ScriptKind::Jsx)
    }

    /// Whether a project loads files of this kind
    pub fn is_supported(&self, allow_js: bool) -> bool {
        match self {
            ScriptKind::Unknown => false,
            ScriptKind::Js | ScriptKind::Jsx => allow_js,
            _ => true,
        }
    }
}

impl std::fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect the script kind from a file path
///
/// # Examples
/// ```
/// use import_rewrite::{ScriptKind, detect_script_kind};
/// assert_eq!(detect_script_kind("main.ts"), ScriptKind::Ts);
/// assert_eq!(detect_script_kind("types.d.ts"), ScriptKind::Declaration);
/// assert_eq!(detect_script_kind("view.tsx"), ScriptKind::Tsx);
/// assert_eq!(detect_script_kind("notes.md"), ScriptKind::Unknown);
/// ```
pub fn detect_script_kind<P: AsRef<Path>>(path: P) -> ScriptKind {
    let file_name = path
        .as_ref()
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("");

    if [".d.ts", ".d.mts", ".d.cts"]
        .iter()
        .any(|suffix| file_name.ends_with(suffix))
    {
        return ScriptKind::Declaration;
    }

    let extension = path
        .as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "ts" | "mts" | "cts" => ScriptKind::Ts,
        "tsx" => ScriptKind::Tsx,
        "js" | "mjs" | "cjs" => ScriptKind::Js,
        "jsx" => ScriptKind::Jsx,
        _ => ScriptKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_typescript() {
        assert_eq!(detect_script_kind("app.ts"), ScriptKind::Ts);
        assert_eq!(detect_script_kind("/path/to/module.mts"), ScriptKind::Ts);
        assert_eq!(detect_script_kind("component.tsx"), ScriptKind::Tsx);
    }

    #[test]
    fn test_detect_declaration() {
        assert_eq!(detect_script_kind("lib.d.ts"), ScriptKind::Declaration);
        assert_eq!(detect_script_kind("src/env.d.mts"), ScriptKind::Declaration);
    }

    #[test]
    fn test_detect_javascript() {
        assert_eq!(detect_script_kind("app.js"), ScriptKind::Js);
        assert_eq!(detect_script_kind("module.mjs"), ScriptKind::Js);
        assert_eq!(detect_script_kind("view.jsx"), ScriptKind::Jsx);
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(detect_script_kind("README"), ScriptKind::Unknown);
        assert_eq!(detect_script_kind("style.css"), ScriptKind::Unknown);
        assert_eq!(detect_script_kind(""), ScriptKind::Unknown);
    }

    #[test]
    fn test_is_supported() {
        assert!(ScriptKind::Ts.is_supported(false));
        assert!(ScriptKind::Declaration.is_supported(false));
        assert!(!ScriptKind::Js.is_supported(false));
        assert!(ScriptKind::Js.is_supported(true));
        assert!(!ScriptKind::Unknown.is_supported(true));
    }

    #[test]
    fn test_uses_jsx() {
        assert!(ScriptKind::Tsx.uses_jsx());
        assert!(ScriptKind::Jsx.uses_jsx());
        assert!(!ScriptKind::Ts.uses_jsx());
    }

    #[test]
    fn test_display() {
        assert_eq!(ScriptKind::Tsx.to_string(), "TSX");
        assert_eq!(ScriptKind::Unknown.to_string(), "Unknown");
    }
}
