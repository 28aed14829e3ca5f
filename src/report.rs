//! Serializable summary of a run, printed by the CLI.

use serde::Serialize;

use crate::file::{SourceSet, compute_checksum};
use crate::orchestrator::{PassSummary, RunOutcome};

/// Per-file outcome of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: String,
    pub changed: bool,
    pub original_checksum: String,
    pub final_checksum: String,
}

/// Report of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub success: bool,
    pub converged: bool,
    pub passes: Vec<PassSummary>,
    pub files: Vec<FileReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    /// Report for a converged run, comparing final texts against the originals
    pub fn success(run_id: String, original: &SourceSet, outcome: &RunOutcome) -> Self {
        let files = outcome
            .sources
            .iter()
            .map(|text| {
                let original_checksum = original
                    .get(&text.key)
                    .map_or_else(|| compute_checksum(""), |source| source.checksum.clone());
                FileReport {
                    path: text.key.to_string(),
                    changed: original_checksum != text.checksum,
                    original_checksum,
                    final_checksum: text.checksum.clone(),
                }
            })
            .collect();

        Self {
            run_id,
            success: true,
            converged: true,
            passes: outcome.passes.clone(),
            files,
            error: None,
        }
    }

    pub fn failure(run_id: String, error: String) -> Self {
        Self {
            run_id,
            success: false,
            converged: false,
            passes: Vec::new(),
            files: Vec::new(),
            error: Some(error),
        }
    }

    pub fn changed_files(&self) -> usize {
        self.files.iter().filter(|file| file.changed).count()
    }

    /// Human-readable rendering
    pub fn to_text(&self) -> String {
        if !self.success {
            return format!("Error: {}", self.error.as_deref().unwrap_or("Unknown error"));
        }
        let mut lines = vec![format!(
            "Converged after {} pass(es); {} file(s) changed",
            self.passes.len(),
            self.changed_files()
        )];
        for pass in &self.passes {
            lines.push(format!(
                "  pass {}: {} edit(s) applied, {} batch(es) accepted, {} rejected",
                pass.pass, pass.edits_applied, pass.accepted_batches, pass.rejected_batches
            ));
        }
        for file in self.files.iter().filter(|file| file.changed) {
            lines.push(format!("  changed {}", file.path));
        }
        lines.join("\n")
    }
}

/// Generate a unique run identifier (UUID v4)
pub fn generate_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileKey;

    fn outcome(files: &[(&str, &str)]) -> RunOutcome {
        RunOutcome {
            sources: files.iter().map(|(p, t)| (FileKey::from(*p), t.to_string())).collect(),
            passes: vec![PassSummary { pass: 1, files_analyzed: files.len(), edits_applied: 1, ..PassSummary::default() }],
        }
    }

    #[test]
    fn test_generate_run_id() {
        let id1 = generate_run_id();
        let id2 = generate_run_id();

        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 36);
    }

    #[test]
    fn test_success_marks_changed_files() {
        let original: SourceSet = [("a.ts", "old"), ("b.ts", "same")]
            .iter()
            .map(|(p, t)| (FileKey::from(*p), t.to_string()))
            .collect();
        let outcome = outcome(&[("a.ts", "new"), ("b.ts", "same")]);

        let report = RunReport::success("id".to_string(), &original, &outcome);

        assert_eq!(report.files.len(), 2);
        assert_eq!(report.changed_files(), 1);
        assert_eq!(report.files[0].path, "a.ts");
        assert!(report.files[0].changed);
        assert!(!report.files[1].changed);
        assert_eq!(report.files[0].original_checksum, compute_checksum("old"));
        assert_eq!(report.files[0].final_checksum, compute_checksum("new"));
        assert!(report.to_text().contains("changed a.ts"));
        assert!(!report.to_text().contains("changed b.ts"));
    }

    #[test]
    fn test_failure_serialization() {
        let report = RunReport::failure("id".to_string(), "boom".to_string());

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert_eq!(report.to_text(), "Error: boom");
    }

    #[test]
    fn test_success_omits_error_field() {
        let original: SourceSet = SourceSet::new();
        let report = RunReport::success("id".to_string(), &original, &outcome(&[]));

        let json = serde_json::to_string(&report).unwrap();

        assert!(!json.contains("\"error\""));
        assert!(json.contains("\"converged\":true"));
    }
}
