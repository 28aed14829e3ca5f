//! The pass loop: snapshot, analyze, patch, repeat until no batch conflicts.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::analyzer::Analyzer;
use crate::config::EngineOptions;
use crate::edit::apply_edits;
use crate::error::{Error, Result};
use crate::file::{FileKey, SourceSet};
use crate::program::{Program, ProgramBuilder};
use crate::tracker::{ConflictTracker, TextChangeLog, TrackedEdits};

type FileFilter = Box<dyn Fn(&FileKey) -> bool + Send + Sync>;

/// What happened during one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub pass: usize,
    pub files_analyzed: usize,
    pub accepted_batches: usize,
    pub rejected_batches: usize,
    pub edits_applied: usize,
    /// Files whose tracker rejected at least one batch
    pub conflicted_files: Vec<String>,
}

impl PassSummary {
    pub fn had_conflict(&self) -> bool {
        !self.conflicted_files.is_empty()
    }
}

/// Final texts of a converged run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub sources: SourceSet,
    pub passes: Vec<PassSummary>,
}

impl RunOutcome {
    pub fn edits_applied(&self) -> usize {
        self.passes.iter().map(|pass| pass.edits_applied).sum()
    }
}

enum PassState<P> {
    Idle,
    Analyzing(P),
    Patching(Vec<(FileKey, TrackedEdits)>),
    Converged,
}

/// Drives an [`Analyzer`] over successive snapshots until a pass is conflict-free
pub struct Orchestrator<B, A> {
    builder: B,
    analyzer: A,
    options: EngineOptions,
    filter: Option<FileFilter>,
}

impl<B, A> Orchestrator<B, A>
where
    B: ProgramBuilder + Sync,
    A: Analyzer,
{
    pub fn new(builder: B, analyzer: A, options: EngineOptions) -> Self {
        Self { builder, analyzer, options, filter: None }
    }

    /// Only analyze and patch files accepted by `filter`; all files still take part in resolution
    pub fn with_filter(mut self, filter: impl Fn(&FileKey) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Run passes until convergence, returning the final text of every file.
    ///
    /// Fails when snapshot construction fails, when patching detects an
    /// internal inconsistency, or when `max_passes` passes all conflicted.
    pub fn run(&self, sources: SourceSet) -> Result<RunOutcome> {
        let mut sources = sources;
        let mut passes: Vec<PassSummary> = Vec::new();
        let mut state = PassState::Idle;
        let mut span = tracing::Span::none();

        loop {
            if matches!(state, PassState::Idle) {
                span = info_span!("pass", number = passes.len() + 1);
            }
            let _entered = span.enter();

            state = match state {
                PassState::Idle => {
                    info!(files = sources.len(), "starting pass");
                    PassState::Analyzing(self.builder.build(&sources)?)
                }
                PassState::Analyzing(program) => PassState::Patching(self.analyze(&program, &sources)),
                PassState::Patching(tracked) => {
                    let summary = self.patch(&mut sources, tracked, passes.len() + 1)?;
                    info!(
                        accepted = summary.accepted_batches,
                        rejected = summary.rejected_batches,
                        edits = summary.edits_applied,
                        "finished pass"
                    );
                    let conflicted = summary.had_conflict();
                    passes.push(summary);

                    if !conflicted {
                        PassState::Converged
                    } else if passes.len() >= self.options.max_passes {
                        let files = passes.last().map(|p| p.conflicted_files.clone()).unwrap_or_default();
                        warn!(limit = self.options.max_passes, ?files, "pass limit reached with conflicts left");
                        return Err(Error::PassLimitExceeded { limit: self.options.max_passes, files });
                    } else {
                        PassState::Idle
                    }
                }
                PassState::Converged => {
                    info!(passes = passes.len(), "converged");
                    return Ok(RunOutcome { sources, passes });
                }
            };
        }
    }

    fn selected(&self, file: &FileKey) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter(file))
    }

    /// Run the analyzer over every selected file, each through its own conflict tracker
    fn analyze(&self, program: &B::Program, sources: &SourceSet) -> Vec<(FileKey, TrackedEdits)> {
        let files: Vec<FileKey> = program
            .source_files()
            .into_iter()
            .filter(|file| self.selected(file))
            .collect();

        let analyze_file = |file: &FileKey| -> Option<(FileKey, TrackedEdits)> {
            let source = sources.get(file)?;
            let mut tracker = ConflictTracker::new(TextChangeLog::new(source));
            self.analyzer.analyze(file, program, &mut tracker);
            Some((file.clone(), tracker.finish()))
        };

        if self.options.parallel {
            files.par_iter().filter_map(analyze_file).collect()
        } else {
            files.iter().filter_map(analyze_file).collect()
        }
    }

    /// Apply each file's accepted edits to its pre-pass text
    fn patch(&self, sources: &mut SourceSet, tracked: Vec<(FileKey, TrackedEdits)>, pass: usize) -> Result<PassSummary> {
        let mut summary = PassSummary { pass, files_analyzed: tracked.len(), ..PassSummary::default() };
        let mut patched = Vec::new();

        for (file, edits) in tracked {
            summary.accepted_batches += edits.accepted_batches;
            summary.rejected_batches += edits.rejected_batches;
            if edits.need_another_pass {
                summary.conflicted_files.push(file.to_string());
            }
            if edits.edits.is_empty() {
                continue;
            }
            let Some(source) = sources.get(&file) else {
                continue;
            };
            let result = apply_edits(&source.content, &source.checksum, &edits.edits)
                .map_err(|source| Error::Patch { file: file.clone(), source })?;
            debug!(%file, edits = result.applied_count, shift = result.total_byte_shift, "patched");
            summary.edits_applied += result.applied_count;
            patched.push((file, result.content));
        }

        for (file, content) in patched {
            sources.insert(file, content);
        }
        summary.conflicted_files.sort();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::ImportRewriter;
    use crate::position::Span;
    use crate::program::TsProgramBuilder;
    use crate::tracker::{ChangeTracker, RangeOptions};
    use pretty_assertions::assert_eq;

    fn sources(files: &[(&str, &str)]) -> SourceSet {
        files
            .iter()
            .map(|(path, text)| (FileKey::from(*path), text.to_string()))
            .collect()
    }

    /// Replaces the first `ab` with `b` and, in the same pass, the first `bc` with `c`
    struct Collapse;

    impl Analyzer for Collapse {
        fn analyze(&self, file: &FileKey, program: &dyn Program, tracker: &mut dyn ChangeTracker) {
            let Some(text) = program.full_text(file) else { return };
            for pattern in ["ab", "bc"] {
                if let Some(start) = text.find(pattern) {
                    let replacement = &pattern[1..];
                    tracker.replace_one(Span::new(start, start + 2), replacement, RangeOptions::default());
                }
            }
        }
    }

    #[test]
    fn test_conflict_forces_another_pass() {
        let orchestrator = Orchestrator::new(TsProgramBuilder::default(), Collapse, EngineOptions::default());

        let outcome = orchestrator.run(sources(&[("a.ts", "abc")])).unwrap();

        // pass 1: ab -> b, bc rejected; pass 2: bc -> c; pass 3: nothing left
        assert_eq!(outcome.sources.content(&FileKey::from("a.ts")), Some("c"));
        let conflicts: Vec<bool> = outcome.passes.iter().map(PassSummary::had_conflict).collect();
        assert_eq!(conflicts, vec![true, false]);
        assert_eq!(outcome.passes[0].rejected_batches, 1);
    }

    #[test]
    fn test_pass_limit_is_an_error() {
        let options = EngineOptions { max_passes: 1, parallel: false };
        let orchestrator = Orchestrator::new(TsProgramBuilder::default(), Collapse, options);

        let err = orchestrator.run(sources(&[("a.ts", "abc")])).unwrap_err();

        match err {
            Error::PassLimitExceeded { limit, files } => {
                assert_eq!(limit, 1);
                assert_eq!(files, vec!["a.ts".to_string()]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_filter_limits_patched_files() {
        let orchestrator = Orchestrator::new(TsProgramBuilder::default(), Collapse, EngineOptions::default())
            .with_filter(|file| file.as_str() == "a.ts");

        let outcome = orchestrator.run(sources(&[("a.ts", "ab"), ("b.ts", "ab")])).unwrap();

        assert_eq!(outcome.sources.content(&FileKey::from("a.ts")), Some("b"));
        assert_eq!(outcome.sources.content(&FileKey::from("b.ts")), Some("ab"));
    }

    #[test]
    fn test_import_rewriter_converges_in_one_pass() {
        let orchestrator = Orchestrator::new(
            TsProgramBuilder::default(),
            ImportRewriter::default(),
            EngineOptions { max_passes: 4, parallel: false },
        );
        let input = sources(&[
            ("index.ts", "export * from './a';\n"),
            ("a.ts", "export interface Foo {}\nexport const bar = 1;\n"),
            ("main.ts", "import * as ns from './a';\nns.bar;\n"),
        ]);

        let outcome = orchestrator.run(input).unwrap();

        assert_eq!(outcome.passes.len(), 1);
        assert_eq!(outcome.edits_applied(), 3);
        assert_eq!(
            outcome.sources.content(&FileKey::from("main.ts")),
            Some("import { bar } from './a';\nbar;\n")
        );
    }
}
