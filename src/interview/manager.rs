//! # Interview Session Management
//!
//! Per-session coordinator that owns everything about one candidate's
//! interview apart from the live connections themselves: prerequisite
//! checks, instruction rendering, lifecycle transitions, and transcript
//! persistence. Both WebSocket channels work through an `InterviewManager`
//! so neither touches the stores directly.

use crate::auth::TokenStore;
use crate::candidates::{CandidateDirectory, CandidateProfile};
use crate::interview::documents::FsDocumentStore;
use crate::interview::instructions::{build_instructions, InstructionContext};
use crate::interview::status::{InterviewRegistry, InterviewStatus};
use crate::interview::transcript::Transcript;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Session-scoped view over the interview stores for one candidate.
pub struct InterviewManager {
    candidate: CandidateProfile,
    documents: Arc<FsDocumentStore>,
    interviews: Arc<InterviewRegistry>,
    candidates: Arc<CandidateDirectory>,
    tokens: Arc<TokenStore>,
}

impl InterviewManager {
    pub fn new(
        candidate: CandidateProfile,
        documents: Arc<FsDocumentStore>,
        interviews: Arc<InterviewRegistry>,
        candidates: Arc<CandidateDirectory>,
        tokens: Arc<TokenStore>,
    ) -> Self {
        Self {
            candidate,
            documents,
            interviews,
            candidates,
            tokens,
        }
    }

    pub fn candidate_id(&self) -> i64 {
        self.candidate.id
    }

    pub fn candidate_name(&self) -> &str {
        &self.candidate.name
    }

    /// Directory holding this candidate's interview artifacts.
    pub fn qa_dir(&self) -> PathBuf {
        self.documents.candidate_dir(self.candidate.id)
    }

    /// Verify the documents this interview needs are in place: the role's
    /// job description and question bank, and the candidate's resume.
    pub fn check_prerequisites(&self) -> Result<(), String> {
        let jd = self
            .documents
            .job_description(&self.candidate.skill_set, &self.candidate.designation);
        let resume = self.documents.resume(self.candidate.id);
        let questions = self
            .documents
            .question_bank(&self.candidate.skill_set, &self.candidate.designation);

        if jd.trim().is_empty() || resume.trim().is_empty() || questions.trim().is_empty() {
            return Err("Interview pre-requisites not found".to_string());
        }
        Ok(())
    }

    /// Render the personalized agent instructions for this session.
    pub fn instructions(&self) -> String {
        let ctx = InstructionContext {
            candidate_name: self.candidate.name.clone(),
            skill_set: self.candidate.skill_set.clone(),
            job_description: self
                .documents
                .job_description(&self.candidate.skill_set, &self.candidate.designation),
            candidate_resume: self.documents.resume(self.candidate.id),
            important_questions: self
                .documents
                .question_bank(&self.candidate.skill_set, &self.candidate.designation),
        };
        build_instructions(&ctx)
    }

    /// Move the interview from Scheduled to In Progress, stamping the
    /// interview start time. Returns false if the interview is not currently
    /// Scheduled (e.g. a duplicate connection).
    pub fn mark_in_progress(&self) -> bool {
        let moved = self.interviews.transition(
            self.candidate.id,
            InterviewStatus::Scheduled,
            InterviewStatus::InProgress,
            chrono::Utc::now(),
        );
        if moved {
            info!("Interview for candidate {} is in progress", self.candidate.id);
        }
        moved
    }

    /// Persist the transcript as both plain text and Markdown under the
    /// candidate's directory.
    pub fn write_transcript(&self, transcript: &Transcript) -> std::io::Result<()> {
        let dir = self.qa_dir();
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("transcript.txt"), transcript.to_plain())?;
        let title = format!("Interview Transcript: {}", self.candidate.name);
        std::fs::write(dir.join("transcript.md"), transcript.to_markdown(&title))?;
        Ok(())
    }

    /// Close out the interview: mark it Completed, deactivate the candidate,
    /// and revoke their invite tokens so the session cannot be replayed.
    pub fn complete(&self) {
        self.interviews.transition(
            self.candidate.id,
            InterviewStatus::InProgress,
            InterviewStatus::Completed,
            chrono::Utc::now(),
        );
        self.candidates.deactivate(self.candidate.id);
        let revoked = self.tokens.revoke_candidate(self.candidate.id);
        info!(
            "Interview for candidate {} completed, {} token(s) revoked",
            self.candidate.id, revoked
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::transcript::Speaker;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        manager: InterviewManager,
        interviews: Arc<InterviewRegistry>,
        candidates: Arc<CandidateDirectory>,
        tokens: Arc<TokenStore>,
    }

    fn fixture(with_docs: bool) -> Fixture {
        let dir = TempDir::new().unwrap();
        if with_docs {
            let role = dir.path().join("rust").join("senior-engineer");
            fs::create_dir_all(&role).unwrap();
            fs::write(role.join("jd.txt"), "Build services.").unwrap();
            fs::write(role.join("question_bank.txt"), "Explain ownership\n").unwrap();
            let candidate_dir = dir.path().join("42");
            fs::create_dir_all(&candidate_dir).unwrap();
            fs::write(candidate_dir.join("resume.txt"), "Systems background.").unwrap();
        }

        let profile = CandidateProfile {
            id: 42,
            name: "Jordan".to_string(),
            skill_set: "rust".to_string(),
            designation: "senior-engineer".to_string(),
            active: true,
        };

        let documents = Arc::new(FsDocumentStore::new(dir.path()));
        let interviews = Arc::new(InterviewRegistry::new());
        let candidates = Arc::new(CandidateDirectory::new());
        let tokens = Arc::new(TokenStore::new());

        interviews.set(42, InterviewStatus::Scheduled);
        candidates.upsert(profile.clone());

        let manager = InterviewManager::new(
            profile,
            documents,
            interviews.clone(),
            candidates.clone(),
            tokens.clone(),
        );

        Fixture {
            _dir: dir,
            manager,
            interviews,
            candidates,
            tokens,
        }
    }

    #[test]
    fn test_prerequisites_present() {
        let f = fixture(true);
        assert!(f.manager.check_prerequisites().is_ok());
    }

    #[test]
    fn test_prerequisites_require_question_bank() {
        let f = fixture(true);
        fs::remove_file(
            f._dir
                .path()
                .join("rust")
                .join("senior-engineer")
                .join("question_bank.txt"),
        )
        .unwrap();
        assert!(f.manager.check_prerequisites().is_err());
    }

    #[test]
    fn test_prerequisites_missing() {
        let f = fixture(false);
        assert_eq!(
            f.manager.check_prerequisites(),
            Err("Interview pre-requisites not found".to_string())
        );
    }

    #[test]
    fn test_instructions_are_personalized() {
        let f = fixture(true);
        let instructions = f.manager.instructions();
        assert!(instructions.contains("Jordan"));
        assert!(instructions.contains("Build services."));
        assert!(instructions.contains("1. Explain ownership"));
    }

    #[test]
    fn test_in_progress_transition_once() {
        let f = fixture(true);
        assert!(f.manager.mark_in_progress());
        assert!(!f.manager.mark_in_progress());
        assert_eq!(f.interviews.get(42), Some(InterviewStatus::InProgress));
        assert!(f.interviews.record(42).unwrap().interview_at.is_some());
    }

    #[test]
    fn test_complete_deactivates_and_revokes() {
        let f = fixture(true);
        let token = f.tokens.issue(42, 48);
        f.manager.mark_in_progress();
        f.manager.complete();

        assert_eq!(f.interviews.get(42), Some(InterviewStatus::Completed));
        assert!(f.candidates.get_active(42).is_none());
        assert!(f.tokens.resolve(&token).is_err());
    }

    #[test]
    fn test_write_transcript_creates_both_renderings() {
        let f = fixture(true);
        let mut transcript = Transcript::new();
        transcript.push(Speaker::Agent, "Hello Jordan.");
        transcript.push(Speaker::Candidate, "Hi.");
        f.manager.write_transcript(&transcript).unwrap();

        let dir = f.manager.qa_dir();
        let plain = fs::read_to_string(dir.join("transcript.txt")).unwrap();
        assert_eq!(plain, "Agent: Hello Jordan.\nCandidate: Hi.");
        let md = fs::read_to_string(dir.join("transcript.md")).unwrap();
        assert!(md.contains("**Agent:** Hello Jordan."));
    }
}
