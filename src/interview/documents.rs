//! # Interview Document Store
//!
//! Filesystem-backed store for the documents that feed interview
//! personalization:
//!
//! - `{files_dir}/{skill}/{designation}/jd.txt`: job description for a role
//! - `{files_dir}/{skill}/{designation}/question_bank.txt`: one question per
//!   line, rendered into a numbered list
//! - `{files_dir}/{candidate_id}/resume.txt`: the candidate's resume text
//!
//! Missing files resolve to the empty string rather than an error; the
//! prerequisite check upstream decides whether an empty document is fatal.

use std::path::{Path, PathBuf};
use tracing::warn;

/// Document store rooted at a configured files directory.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    files_dir: PathBuf,
}

impl FsDocumentStore {
    pub fn new(files_dir: impl Into<PathBuf>) -> Self {
        Self {
            files_dir: files_dir.into(),
        }
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    /// Directory holding all artifacts for one candidate.
    pub fn candidate_dir(&self, candidate_id: i64) -> PathBuf {
        self.files_dir.join(candidate_id.to_string())
    }

    /// Job description for a skill/designation pair, or empty if absent.
    pub fn job_description(&self, skill_set: &str, designation: &str) -> String {
        self.read_or_empty(&self.files_dir.join(skill_set).join(designation).join("jd.txt"))
    }

    /// Candidate resume text, or empty if absent.
    pub fn resume(&self, candidate_id: i64) -> String {
        self.read_or_empty(&self.candidate_dir(candidate_id).join("resume.txt"))
    }

    /// Question bank rendered as a numbered list, one question per line.
    ///
    /// Blank lines in the source file are skipped, so numbering is always
    /// contiguous. Returns the empty string when the file is absent or holds
    /// no questions.
    pub fn question_bank(&self, skill_set: &str, designation: &str) -> String {
        let raw = self.read_or_empty(
            &self
                .files_dir
                .join(skill_set)
                .join(designation)
                .join("question_bank.txt"),
        );
        raw.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| format!("{}. {}", i + 1, line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn read_or_empty(&self, path: &Path) -> String {
        match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                String::new()
            }
        }
    }
}
