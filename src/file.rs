use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Stable identity of a source file: its normalized path with `/` separators
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileKey(String);

impl FileKey {
    /// Build a key from a path, resolving `.` and `..` components lexically
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileKey(normalize_path(path.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Directory containing the file, as a normalized string (empty for bare names)
    pub fn parent_dir(&self) -> &str {
        self.0.rfind('/').map_or("", |idx| &self.0[..idx])
    }
}

impl std::fmt::Display for FileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileKey {
    fn from(path: &str) -> Self {
        FileKey::new(path)
    }
}

/// Lexically normalize a path to a `/`-separated string
pub fn normalize_path(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut absolute = false;
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => parts.push(prefix.as_os_str().to_string_lossy().into_owned()),
            Component::RootDir => absolute = true,
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(parts.last(), Some(last) if last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..".to_string());
                }
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
        }
    }
    let joined = parts.join("/");
    if absolute { format!("/{joined}") } else { joined }
}

/// Full text of one file as seen by a single pass
#[derive(Debug, Clone)]
pub struct SourceText {
    pub key: FileKey,
    /// File content as valid UTF-8
    pub content: String,
    /// BLAKE3 hash of the content (hex-encoded)
    pub checksum: String,
}

impl SourceText {
    pub fn new(key: FileKey, content: impl Into<String>) -> Self {
        let content = content.into();
        let checksum = compute_checksum(&content);
        Self { key, content, checksum }
    }
}

/// Hex-encoded BLAKE3 hash of `content`
pub fn compute_checksum(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Every source file of a program, ordered by key
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    files: BTreeMap<FileKey, SourceText>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file, returning the previous text if any
    pub fn insert(&mut self, key: FileKey, content: impl Into<String>) -> Option<SourceText> {
        let text = SourceText::new(key.clone(), content);
        self.files.insert(key, text)
    }

    pub fn get(&self, key: &FileKey) -> Option<&SourceText> {
        self.files.get(key)
    }

    pub fn content(&self, key: &FileKey) -> Option<&str> {
        self.files.get(key).map(|text| text.content.as_str())
    }

    pub fn contains(&self, key: &FileKey) -> bool {
        self.files.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &FileKey> {
        self.files.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceText> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<(FileKey, String)> for SourceSet {
    fn from_iter<I: IntoIterator<Item = (FileKey, String)>>(iter: I) -> Self {
        let mut set = SourceSet::new();
        for (key, content) in iter {
            set.insert(key, content);
        }
        set
    }
}

/// Error types for file operations
#[derive(Debug, Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("I/O error on {path}: {source}")]
    Io { path: String, source: io::Error },
    #[error("Invalid UTF-8 in file: {0}")]
    InvalidUtf8(String),
}

/// Read a file from disk with UTF-8 validation
///
/// # Arguments
/// * `path` - Path to the file to read
///
/// # Returns
/// * `Ok(SourceText)` - File content keyed by its normalized path
/// * `Err(FileError)` - File not found, I/O error, or invalid UTF-8
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<SourceText, FileError> {
    let path_ref = path.as_ref();

    if !path_ref.exists() {
        return Err(FileError::NotFound(path_ref.display().to_string()));
    }

    let bytes = fs::read(path_ref).map_err(|source| FileError::Io {
        path: path_ref.display().to_string(),
        source,
    })?;

    let content = String::from_utf8(bytes)
        .map_err(|_| FileError::InvalidUtf8(path_ref.display().to_string()))?;

    Ok(SourceText::new(FileKey::new(path_ref), content))
}

/// Write a patched text back to the path named by its key
pub fn write_file(text: &SourceText) -> Result<(), FileError> {
    let path: PathBuf = text.key.as_path().to_path_buf();
    fs::write(&path, text.content.as_bytes()).map_err(|source| FileError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_file_valid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("valid.ts");
        let content = "export const a = 1;\n";
        fs::write(&file_path, content).unwrap();

        let text = read_file(&file_path).unwrap();

        assert_eq!(text.content, content);
        assert_eq!(text.key, FileKey::new(&file_path));
        assert_eq!(text.checksum, compute_checksum(content));
        assert!(text.checksum.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_read_file_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("invalid.ts");
        fs::write(&file_path, [0xFF, 0xFE, 0xFD]).unwrap();

        match read_file(&file_path) {
            Err(FileError::InvalidUtf8(p)) => assert_eq!(p, file_path.display().to_string()),
            other => panic!("Expected FileError::InvalidUtf8, got {other:?}"),
        }
    }

    #[test]
    fn test_read_file_not_found() {
        match read_file("/nonexistent/path/that/does/not/exist.ts") {
            Err(FileError::NotFound(p)) => assert!(p.contains("nonexistent")),
            other => panic!("Expected FileError::NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_write_file_round_trips_through_key() {
        let dir = tempfile::tempdir().unwrap();
        let key = FileKey::new(dir.path().join("out.ts"));
        let text = SourceText::new(key.clone(), "export {};\n");

        write_file(&text).unwrap();

        assert_eq!(read_file(key.as_path()).unwrap().content, "export {};\n");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("src/./lib/../a.ts")), "src/a.ts");
        assert_eq!(normalize_path(Path::new("/root/x/../y.ts")), "/root/y.ts");
        assert_eq!(normalize_path(Path::new("../up.ts")), "../up.ts");
    }

    #[test]
    fn test_file_key_parent_dir() {
        assert_eq!(FileKey::from("src/lib/a.ts").parent_dir(), "src/lib");
        assert_eq!(FileKey::from("a.ts").parent_dir(), "");
    }

    #[test]
    fn test_source_set_replaces_text_and_checksum() {
        let key = FileKey::from("a.ts");
        let mut set = SourceSet::new();
        set.insert(key.clone(), "one");
        let old = set.insert(key.clone(), "two").unwrap();

        assert_eq!(old.content, "one");
        assert_eq!(set.content(&key), Some("two"));
        assert_ne!(set.get(&key).unwrap().checksum, old.checksum);
    }
}
