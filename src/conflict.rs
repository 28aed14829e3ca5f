//! Per-pass conflict detection over proposed edit batches.

use std::collections::HashMap;

use tracing::debug;

use crate::edit::Edit;
use crate::file::FileKey;

/// Edits accepted for each file in the current pass.
///
/// Append-only within a pass; the entries of one file are pairwise
/// non-overlapping and kept in acceptance order.
#[derive(Debug, Default, Clone)]
pub struct AcceptedSet {
    files: HashMap<FileKey, Vec<Edit>>,
}

impl AcceptedSet {
    pub fn edits(&self, file: &FileKey) -> &[Edit] {
        self.files.get(file).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn files(&self) -> impl Iterator<Item = &FileKey> {
        self.files.keys()
    }

    pub fn total_edits(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.values().all(Vec::is_empty)
    }

    pub fn into_edits(mut self, file: &FileKey) -> Vec<Edit> {
        self.files.remove(file).unwrap_or_default()
    }

    fn conflicting(&self, edit: &Edit) -> Option<&Edit> {
        self.edits(&edit.file)
            .iter()
            .find(|accepted| accepted.span.overlaps(edit.span))
    }

    fn push(&mut self, edit: Edit) {
        self.files.entry(edit.file.clone()).or_default().push(edit);
    }
}

/// Classifies proposed batches as accepted or conflicting.
#[derive(Debug, Default)]
pub struct ConflictDetector {
    accepted: AcceptedSet,
    conflicted: bool,
    accepted_batches: usize,
    rejected_batches: usize,
}

impl ConflictDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `proposed` as a unit, or reject all of it.
    ///
    /// Every edit is compared against the ranges already accepted for its
    /// file and against the earlier edits of the same batch. A single
    /// overlap rejects the whole batch and raises the conflict flag. An
    /// empty batch succeeds without effect.
    pub fn try_accept(&mut self, proposed: &[Edit]) -> bool {
        if proposed.is_empty() {
            return true;
        }

        for (idx, edit) in proposed.iter().enumerate() {
            let clash = self.accepted.conflicting(edit).or_else(|| {
                proposed[..idx]
                    .iter()
                    .find(|earlier| earlier.file == edit.file && earlier.span.overlaps(edit.span))
            });
            if let Some(existing) = clash {
                debug!(
                    file = %edit.file,
                    proposed = %edit.span,
                    claimed = %existing.span,
                    "rejecting batch of {} edit(s)",
                    proposed.len()
                );
                self.conflicted = true;
                self.rejected_batches += 1;
                return false;
            }
        }

        for edit in proposed {
            self.accepted.push(edit.clone());
        }
        self.accepted_batches += 1;
        true
    }

    /// Whether any batch was rejected so far
    pub fn has_conflict(&self) -> bool {
        self.conflicted
    }

    pub fn accepted(&self) -> &AcceptedSet {
        &self.accepted
    }

    pub fn accepted_batches(&self) -> usize {
        self.accepted_batches
    }

    pub fn rejected_batches(&self) -> usize {
        self.rejected_batches
    }

    pub fn into_accepted(self) -> AcceptedSet {
        self.accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::EditKind;
    use crate::position::Span;

    fn replace(file: &str, start: usize, end: usize) -> Edit {
        Edit::new(FileKey::from(file), Span::new(start, end), EditKind::ReplaceOne, "x")
    }

    #[test]
    fn test_empty_batch_is_accepted() {
        let mut detector = ConflictDetector::new();
        assert!(detector.try_accept(&[]));
        assert!(!detector.has_conflict());
        assert!(detector.accepted().is_empty());
    }

    #[test]
    fn test_disjoint_batches_are_both_accepted() {
        let mut detector = ConflictDetector::new();
        assert!(detector.try_accept(&[replace("a.ts", 0, 5)]));
        assert!(detector.try_accept(&[replace("a.ts", 5, 9), replace("a.ts", 20, 25)]));

        assert!(!detector.has_conflict());
        assert_eq!(detector.accepted().edits(&FileKey::from("a.ts")).len(), 3);
        assert_eq!(detector.accepted_batches(), 2);
    }

    #[test]
    fn test_batch_with_one_overlap_is_rejected_whole() {
        let mut detector = ConflictDetector::new();
        assert!(detector.try_accept(&[replace("a.ts", 10, 20)]));

        // the first edit is clean, the second overlaps
        let batch = [replace("a.ts", 30, 40), replace("a.ts", 15, 16)];
        assert!(!detector.try_accept(&batch));

        assert!(detector.has_conflict());
        assert_eq!(detector.rejected_batches(), 1);
        let kept: Vec<Span> = detector
            .accepted()
            .edits(&FileKey::from("a.ts"))
            .iter()
            .map(|e| e.span)
            .collect();
        assert_eq!(kept, vec![Span::new(10, 20)]);
    }

    #[test]
    fn test_ranges_in_different_files_never_conflict() {
        let mut detector = ConflictDetector::new();
        assert!(detector.try_accept(&[replace("a.ts", 0, 10)]));
        assert!(detector.try_accept(&[replace("b.ts", 0, 10)]));
        assert!(!detector.has_conflict());
    }

    #[test]
    fn test_insert_inside_accepted_range_conflicts() {
        let mut detector = ConflictDetector::new();
        assert!(detector.try_accept(&[replace("a.ts", 10, 20)]));
        let insert = Edit::new(FileKey::from("a.ts"), Span::point(12), EditKind::InsertAfter, "y");
        assert!(!detector.try_accept(&[insert]));
        assert!(detector.has_conflict());
    }

    #[test]
    fn test_self_overlapping_batch_is_rejected() {
        let mut detector = ConflictDetector::new();
        assert!(!detector.try_accept(&[replace("a.ts", 0, 10), replace("a.ts", 5, 6)]));
        assert!(detector.accepted().is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn accepted_edits_never_overlap(
                batches in proptest::collection::vec(
                    proptest::collection::vec((0usize..100, 0usize..12), 1..4),
                    0..24,
                )
            ) {
                let mut detector = ConflictDetector::new();
                let mut rejected = 0;
                for batch in &batches {
                    let edits: Vec<Edit> = batch
                        .iter()
                        .map(|&(start, len)| replace("a.ts", start, start + len))
                        .collect();
                    if !detector.try_accept(&edits) {
                        rejected += 1;
                    }
                }

                let accepted = detector.accepted().edits(&FileKey::from("a.ts"));
                for (i, a) in accepted.iter().enumerate() {
                    for b in &accepted[i + 1..] {
                        prop_assert!(!a.span.overlaps(b.span), "{} overlaps {}", a.span, b.span);
                    }
                }
                prop_assert_eq!(detector.has_conflict(), rejected > 0);
                prop_assert_eq!(detector.rejected_batches(), rejected);
            }
        }
    }
}
