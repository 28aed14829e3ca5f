use thiserror::Error;

use crate::file::{FileKey, compute_checksum};
use crate::position::Span;

/// How an edit changes its range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    InsertBefore,
    InsertAfter,
    DeleteRange,
    ReplaceOne,
    ReplaceWithMany,
}

/// A text edit proposed against the pre-pass text of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub file: FileKey,
    /// Range in the pre-pass text; empty for insertions
    pub span: Span,
    pub kind: EditKind,
    /// Replacement text, already including any separators
    pub text: String,
}

impl Edit {
    pub fn new(file: FileKey, span: Span, kind: EditKind, text: impl Into<String>) -> Self {
        Self { file, span, kind, text: text.into() }
    }

    /// Byte shift introduced by this edit (positive = content grew)
    pub fn byte_shift(&self) -> i64 {
        self.text.len() as i64 - self.span.len() as i64
    }
}

/// Errors raised while patching a text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// Byte span is outside file bounds
    #[error("Byte span {start}..{end} out of bounds (content length: {content_len})")]
    OutOfBounds { start: usize, end: usize, content_len: usize },
    /// Span ends before it starts
    #[error("Invalid span: end ({end}) < start ({start})")]
    InvalidSpan { start: usize, end: usize },
    /// Span boundary splits a UTF-8 character
    #[error("Offset {offset} is not on a character boundary")]
    NotCharBoundary { offset: usize },
    /// Edits were computed against a different text
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

/// Outcome of patching one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchResult {
    pub content: String,
    pub checksum: String,
    pub applied_count: usize,
    pub total_byte_shift: i64,
}

/// Validate an edit's span against file content
pub fn validate_edit_span(edit: &Edit, content: &str) -> Result<(), EditError> {
    let Span { start, end } = edit.span;
    if end < start {
        return Err(EditError::InvalidSpan { start, end });
    }
    if end > content.len() {
        return Err(EditError::OutOfBounds { start, end, content_len: content.len() });
    }
    for offset in [start, end] {
        if !content.is_char_boundary(offset) {
            return Err(EditError::NotCharBoundary { offset });
        }
    }
    Ok(())
}

/// Verify that file content matches the expected checksum
pub fn verify_checksum(content: &str, expected_checksum: &str) -> Result<(), EditError> {
    let actual = compute_checksum(content);
    if actual == expected_checksum {
        Ok(())
    } else {
        Err(EditError::ChecksumMismatch {
            expected: expected_checksum.to_string(),
            actual,
        })
    }
}

/// Order edits for application, last position in the text first.
///
/// Within one position, insertions come before a range starting there and
/// insertions keep the order they were accepted in. Splicing in the
/// returned order therefore never moves an offset that is still pending.
pub fn sort_edits_descending(edits: &[Edit]) -> Vec<&Edit> {
    let mut ordered: Vec<(usize, &Edit)> = edits.iter().enumerate().collect();
    ordered.sort_by_key(|(seq, edit)| (edit.span.start, !edit.span.is_empty(), *seq));
    ordered.into_iter().rev().map(|(_, edit)| edit).collect()
}

/// Apply pairwise non-overlapping edits to the text they were computed against
///
/// Offsets are interpreted against the untouched `content`; edits are
/// spliced from the end of the file backwards so earlier offsets stay valid.
pub fn apply_edits(
    content: &str,
    base_checksum: &str,
    edits: &[Edit],
) -> Result<PatchResult, EditError> {
    verify_checksum(content, base_checksum)?;
    for edit in edits {
        validate_edit_span(edit, content)?;
    }

    let mut patched = content.to_string();
    let mut total_byte_shift = 0i64;
    for edit in sort_edits_descending(edits) {
        patched.replace_range(edit.span.start..edit.span.end, &edit.text);
        total_byte_shift += edit.byte_shift();
    }

    let checksum = compute_checksum(&patched);
    Ok(PatchResult {
        content: patched,
        checksum,
        applied_count: edits.len(),
        total_byte_shift,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn edit(start: usize, end: usize, kind: EditKind, text: &str) -> Edit {
        Edit::new(FileKey::from("a.ts"), Span::new(start, end), kind, text)
    }

    #[test]
    fn test_verify_checksum_invalid() {
        let content = "Hello, world!";
        match verify_checksum(content, "af1234567890abcdef") {
            Err(EditError::ChecksumMismatch { expected, actual }) => {
                assert_eq!(expected, "af1234567890abcdef");
                assert_eq!(actual, compute_checksum(content));
            }
            other => panic!("Expected EditError::ChecksumMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_apply_edits_multiple() {
        let content = "The quick brown fox jumps over the lazy dog.";
        let checksum = compute_checksum(content);
        let edits = vec![
            edit(4, 9, EditKind::ReplaceOne, "slow"),
            edit(35, 39, EditKind::ReplaceOne, "active"),
        ];

        let result = apply_edits(content, &checksum, &edits).unwrap();

        assert_eq!(result.content, "The slow brown fox jumps over the active dog.");
        assert_eq!(result.applied_count, 2);
        // "slow" -1, "active" +2
        assert_eq!(result.total_byte_shift, 1);
        assert_eq!(result.checksum, compute_checksum(&result.content));
    }

    #[test]
    fn test_insertions_at_same_point_keep_acceptance_order() {
        let content = "ab";
        let edits = vec![
            edit(1, 1, EditKind::InsertAfter, "1"),
            edit(1, 1, EditKind::InsertAfter, "2"),
            edit(1, 2, EditKind::ReplaceOne, "B"),
            edit(0, 1, EditKind::DeleteRange, ""),
        ];

        let result = apply_edits(content, &compute_checksum(content), &edits).unwrap();

        assert_eq!(result.content, "12B");
    }

    #[test]
    fn test_apply_edits_rejects_stale_text() {
        let edits = vec![edit(0, 1, EditKind::ReplaceOne, "x")];
        let stale = compute_checksum("old text");

        let result = apply_edits("new text", &stale, &edits);

        assert!(matches!(result, Err(EditError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_validate_edit_span() {
        let content = "héllo";
        assert_eq!(
            validate_edit_span(&edit(3, 2, EditKind::ReplaceOne, ""), content),
            Err(EditError::InvalidSpan { start: 3, end: 2 })
        );
        assert_eq!(
            validate_edit_span(&edit(0, 40, EditKind::ReplaceOne, ""), content),
            Err(EditError::OutOfBounds { start: 0, end: 40, content_len: 6 })
        );
        // 'é' occupies bytes 1..3
        assert_eq!(
            validate_edit_span(&edit(2, 3, EditKind::ReplaceOne, ""), content),
            Err(EditError::NotCharBoundary { offset: 2 })
        );
        assert!(validate_edit_span(&edit(6, 6, EditKind::InsertAfter, "!"), content).is_ok());
    }

    #[test]
    fn test_sort_edits_descending() {
        let edits = vec![
            edit(10, 20, EditKind::ReplaceOne, "a"),
            edit(50, 60, EditKind::ReplaceOne, "b"),
            edit(30, 40, EditKind::ReplaceOne, "c"),
        ];

        let sorted = sort_edits_descending(&edits);

        let starts: Vec<usize> = sorted.iter().map(|e| e.span.start).collect();
        assert_eq!(starts, vec![50, 30, 10]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn disjoint_replacements_match_forward_rebuild(
                cuts in proptest::collection::btree_set(0usize..64, 0..12),
                words in proptest::collection::vec("[a-z]{0,3}", 12),
            ) {
                let content: String = "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-_".to_string();
                let cuts: Vec<usize> = cuts.into_iter().collect();
                let edits: Vec<Edit> = cuts
                    .chunks(2)
                    .zip(words.iter())
                    .map(|(pair, word)| {
                        let end = pair.get(1).copied().unwrap_or(pair[0]);
                        edit(pair[0], end, EditKind::ReplaceOne, word)
                    })
                    .collect();

                let mut expected = String::new();
                let mut cursor = 0;
                for e in &edits {
                    expected.push_str(&content[cursor..e.span.start]);
                    expected.push_str(&e.text);
                    cursor = e.span.end;
                }
                expected.push_str(&content[cursor..]);

                let result = apply_edits(&content, &compute_checksum(&content), &edits).unwrap();
                prop_assert_eq!(result.content, expected);
            }
        }
    }
}
