//! The edit surface offered to analyzers.
//!
//! [`TextChangeLog`] turns analyzer requests into [`Edit`]s against one
//! file's pre-pass text. [`ConflictTracker`] decorates any [`EditLog`] with
//! the same interface, routing every request through a [`ConflictDetector`]
//! and rolling the log back when the detector rejects the batch.

use tracing::{debug, trace};

use crate::conflict::ConflictDetector;
use crate::edit::{Edit, EditKind};
use crate::file::{FileKey, SourceText};
use crate::position::{Span, indentation_at, line_start, span_to_positions};

/// How much leading trivia a range operation swallows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeadingTrivia {
    /// Start exactly at the node
    #[default]
    Exclude,
    /// Start at the beginning of the line when only whitespace precedes the node
    StartLine,
}

/// How much trailing trivia a range operation swallows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingTrivia {
    /// End exactly at the node
    #[default]
    Exclude,
    /// Extend over trailing blanks and one line break
    Include,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeOptions {
    pub leading: LeadingTrivia,
    pub trailing: TrailingTrivia,
}

impl RangeOptions {
    /// Options that remove a statement together with its own line
    pub const WHOLE_LINE: RangeOptions = RangeOptions {
        leading: LeadingTrivia::StartLine,
        trailing: TrailingTrivia::Include,
    };
}

/// Operations an analyzer uses to propose edits to the file it is analyzing.
///
/// Spans are byte ranges of the pre-pass text. New syntax is passed as
/// already-printed text.
pub trait ChangeTracker {
    fn file(&self) -> &FileKey;

    /// Remove a node, together with its line when nothing else is on it
    fn delete(&mut self, node: Span);

    fn delete_range(&mut self, range: Span, options: RangeOptions);

    fn insert_before(&mut self, anchor: Span, text: &str);

    fn insert_after(&mut self, anchor: Span, text: &str);

    fn insert_at_top_of_file(&mut self, text: &str, blank_line_between: bool);

    fn replace_one(&mut self, old: Span, text: &str, options: RangeOptions);

    fn replace_with_many(&mut self, old: Span, texts: &[String], options: RangeOptions);

    /// Run `plan` so that every edit it proposes is kept or dropped as one batch
    fn atomic(&mut self, plan: &mut dyn FnMut(&mut dyn ChangeTracker));
}

/// A [`ChangeTracker`] that records its edits and can forget the newest ones
pub trait EditLog: ChangeTracker {
    /// Pre-pass text the logged edits are computed against
    fn source(&self) -> &SourceText;

    fn logged(&self) -> &[Edit];

    fn truncate(&mut self, len: usize);
}

/// Base change log for one file within one pass
#[derive(Debug)]
pub struct TextChangeLog<'a> {
    source: &'a SourceText,
    edits: Vec<Edit>,
}

impl<'a> TextChangeLog<'a> {
    pub fn new(source: &'a SourceText) -> Self {
        Self { source, edits: Vec::new() }
    }

    fn content(&self) -> &str {
        &self.source.content
    }

    fn push(&mut self, span: Span, kind: EditKind, text: String) {
        trace!(file = %self.source.key, %span, ?kind, "logging edit");
        self.edits.push(Edit::new(self.source.key.clone(), span, kind, text));
    }

    /// Widen `range` over the trivia selected by `options`
    fn adjust(&self, range: Span, options: RangeOptions) -> Span {
        let content = self.content();
        let mut start = range.start;
        let mut end = range.end;

        if options.leading == LeadingTrivia::StartLine {
            let line = line_start(content, start);
            if content[line..start].chars().all(|c| c == ' ' || c == '\t') {
                start = line;
            }
        }

        if options.trailing == TrailingTrivia::Include {
            let rest = &content[end..];
            let blanks = rest.len() - rest.trim_start_matches([' ', '\t']).len();
            end += blanks;
            let rest = &content[end..];
            if rest.starts_with("\r\n") {
                end += 2;
            } else if rest.starts_with('\n') {
                end += 1;
            }
        }

        Span::new(start, end)
    }

    fn indentation(&self, offset: usize) -> String {
        indentation_at(self.content(), offset).to_string()
    }
}

impl ChangeTracker for TextChangeLog<'_> {
    fn file(&self) -> &FileKey {
        &self.source.key
    }

    fn delete(&mut self, node: Span) {
        self.delete_range(node, RangeOptions::WHOLE_LINE);
    }

    fn delete_range(&mut self, range: Span, options: RangeOptions) {
        let span = self.adjust(range, options);
        self.push(span, EditKind::DeleteRange, String::new());
    }

    fn insert_before(&mut self, anchor: Span, text: &str) {
        let indent = self.indentation(anchor.start);
        self.push(
            Span::point(anchor.start),
            EditKind::InsertBefore,
            format!("{text}\n{indent}"),
        );
    }

    fn insert_after(&mut self, anchor: Span, text: &str) {
        let indent = self.indentation(anchor.start);
        self.push(
            Span::point(anchor.end),
            EditKind::InsertAfter,
            format!("\n{indent}{text}"),
        );
    }

    fn insert_at_top_of_file(&mut self, text: &str, blank_line_between: bool) {
        let content = self.content();
        let position = if content.starts_with("#!") {
            content.find('\n').map_or(content.len(), |idx| idx + 1)
        } else {
            0
        };
        let separator = if blank_line_between { "\n\n" } else { "\n" };
        self.push(
            Span::point(position),
            EditKind::InsertBefore,
            format!("{text}{separator}"),
        );
    }

    fn replace_one(&mut self, old: Span, text: &str, options: RangeOptions) {
        let span = self.adjust(old, options);
        self.push(span, EditKind::ReplaceOne, text.to_string());
    }

    fn replace_with_many(&mut self, old: Span, texts: &[String], options: RangeOptions) {
        let span = self.adjust(old, options);
        let separator = format!("\n{}", self.indentation(old.start));
        self.push(span, EditKind::ReplaceWithMany, texts.join(&separator));
    }

    fn atomic(&mut self, plan: &mut dyn FnMut(&mut dyn ChangeTracker)) {
        plan(self);
    }
}

impl EditLog for TextChangeLog<'_> {
    fn source(&self) -> &SourceText {
        self.source
    }

    fn logged(&self) -> &[Edit] {
        &self.edits
    }

    fn truncate(&mut self, len: usize) {
        self.edits.truncate(len);
    }
}

/// What one file's tracker produced during a pass
#[derive(Debug, Default)]
pub struct TrackedEdits {
    pub edits: Vec<Edit>,
    pub need_another_pass: bool,
    pub accepted_batches: usize,
    pub rejected_batches: usize,
}

/// Decorator that keeps only batches the [`ConflictDetector`] accepts
#[derive(Debug)]
pub struct ConflictTracker<L> {
    inner: L,
    detector: ConflictDetector,
}

impl<L: EditLog> ConflictTracker<L> {
    pub fn new(inner: L) -> Self {
        Self { inner, detector: ConflictDetector::new() }
    }

    /// Whether any batch was rejected for overlap in this pass
    pub fn need_another_pass(&self) -> bool {
        self.detector.has_conflict()
    }

    /// Hand everything logged since `before` to the detector, forgetting it on rejection
    fn settle(&mut self, before: usize) {
        let batch = &self.inner.logged()[before..];
        if !self.detector.try_accept(batch) {
            if let Some(first) = batch.first() {
                let (start, end) = span_to_positions(&self.inner.source().content, first.span);
                debug!(file = %first.file, %start, %end, "batch dropped, retrying next pass");
            }
            self.inner.truncate(before);
        }
    }

    fn checked(&mut self, op: impl FnOnce(&mut L)) {
        let before = self.inner.logged().len();
        op(&mut self.inner);
        self.settle(before);
    }

    pub fn finish(self) -> TrackedEdits {
        let need_another_pass = self.detector.has_conflict();
        let accepted_batches = self.detector.accepted_batches();
        let rejected_batches = self.detector.rejected_batches();
        let file = self.inner.file().clone();
        TrackedEdits {
            edits: self.detector.into_accepted().into_edits(&file),
            need_another_pass,
            accepted_batches,
            rejected_batches,
        }
    }
}

impl<L: EditLog> ChangeTracker for ConflictTracker<L> {
    fn file(&self) -> &FileKey {
        self.inner.file()
    }

    fn delete(&mut self, node: Span) {
        self.checked(|log| log.delete(node));
    }

    fn delete_range(&mut self, range: Span, options: RangeOptions) {
        self.checked(|log| log.delete_range(range, options));
    }

    fn insert_before(&mut self, anchor: Span, text: &str) {
        self.checked(|log| log.insert_before(anchor, text));
    }

    fn insert_after(&mut self, anchor: Span, text: &str) {
        self.checked(|log| log.insert_after(anchor, text));
    }

    fn insert_at_top_of_file(&mut self, text: &str, blank_line_between: bool) {
        self.checked(|log| log.insert_at_top_of_file(text, blank_line_between));
    }

    fn replace_one(&mut self, old: Span, text: &str, options: RangeOptions) {
        self.checked(|log| log.replace_one(old, text, options));
    }

    fn replace_with_many(&mut self, old: Span, texts: &[String], options: RangeOptions) {
        self.checked(|log| log.replace_with_many(old, texts, options));
    }

    fn atomic(&mut self, plan: &mut dyn FnMut(&mut dyn ChangeTracker)) {
        self.checked(|log| plan(log));
    }
}
