// Position tracking module
pub mod position;

// File operations module
pub mod file;

// Language detection module
pub mod language;

// Edit and patch module
pub mod edit;

// Conflict detection module
pub mod conflict;

// Analyzer-facing change trackers
pub mod tracker;

// Alias assignment module
pub mod alias;

// Program snapshots
pub mod program;

// Rewrite rules
pub mod analyzer;

// Pass loop
pub mod orchestrator;

// Configuration and project loading
pub mod config;
pub mod project;

// Run reports
pub mod report;

// Error types
pub mod error;

// Re-exports
pub use position::{Position, Span, byte_to_position, span_to_positions};
pub use file::{FileError, FileKey, SourceSet, SourceText, compute_checksum, read_file, write_file};
pub use language::{ScriptKind, detect_script_kind};
pub use edit::{Edit, EditError, EditKind, PatchResult, apply_edits, sort_edits_descending, validate_edit_span, verify_checksum};
pub use conflict::{AcceptedSet, ConflictDetector};
pub use tracker::{ChangeTracker, ConflictTracker, EditLog, RangeOptions, TextChangeLog, TrackedEdits};
pub use alias::{AliasMap, NameScope, SymbolBuckets, partition_symbols};
pub use program::{
    Meaning, ModuleResolution, Program, ProgramBuilder, Symbol, SymbolFlags, SymbolId, TsProgram,
    TsProgramBuilder,
};
pub use analyzer::{Analyzer, ImportRewriter};
pub use orchestrator::{Orchestrator, PassSummary, RunOutcome};
pub use config::{EngineOptions, ProjectConfig, find_config_file};
pub use project::Project;
pub use report::{FileReport, RunReport, generate_run_id};
pub use error::{Error, Result};
