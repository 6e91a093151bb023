//! # Candidate Directory
//!
//! In-memory directory of candidate profiles. A profile carries everything
//! the interview pipeline needs to personalize a session: the candidate's
//! name, the skill and designation they are interviewing for, and whether
//! their account is still active.
//!
//! Completing an interview deactivates the candidate, which (together with
//! token revocation) prevents the same invite from being replayed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// A candidate registered for an interview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: i64,
    pub name: String,
    /// Skill track the candidate applied for, e.g. "rust" or "python"
    pub skill_set: String,
    /// Role level within the skill track, e.g. "senior-engineer"
    pub designation: String,
    pub active: bool,
}

/// Thread-safe lookup table of candidate profiles keyed by id.
#[derive(Debug, Default)]
pub struct CandidateDirectory {
    candidates: RwLock<HashMap<i64, CandidateProfile>>,
}

impl CandidateDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a candidate profile.
    pub fn upsert(&self, profile: CandidateProfile) {
        let mut candidates = self.candidates.write().unwrap();
        candidates.insert(profile.id, profile);
    }

    /// Look up an active candidate by id.
    ///
    /// Deactivated candidates are treated as absent, matching how the
    /// interview endpoints reject a candidate whose session already ran.
    pub fn get_active(&self, id: i64) -> Option<CandidateProfile> {
        let candidates = self.candidates.read().unwrap();
        candidates.get(&id).filter(|c| c.active).cloned()
    }

    /// Look up a candidate by id regardless of active state.
    pub fn get(&self, id: i64) -> Option<CandidateProfile> {
        let candidates = self.candidates.read().unwrap();
        candidates.get(&id).cloned()
    }

    /// Mark a candidate inactive. Returns false if the id is unknown.
    pub fn deactivate(&self, id: i64) -> bool {
        let mut candidates = self.candidates.write().unwrap();
        match candidates.get_mut(&id) {
            Some(profile) => {
                profile.active = false;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: i64) -> CandidateProfile {
        CandidateProfile {
            id,
            name: format!("Candidate {}", id),
            skill_set: "rust".to_string(),
            designation: "senior-engineer".to_string(),
            active: true,
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let dir = CandidateDirectory::new();
        dir.upsert(profile(1));
        let found = dir.get_active(1).unwrap();
        assert_eq!(found.name, "Candidate 1");
        assert!(dir.get_active(2).is_none());
    }

    #[test]
    fn test_deactivated_candidate_hidden_from_active_lookup() {
        let dir = CandidateDirectory::new();
        dir.upsert(profile(1));
        assert!(dir.deactivate(1));
        assert!(dir.get_active(1).is_none());
        // Still visible to the unfiltered lookup
        assert!(!dir.get(1).unwrap().active);
    }

    #[test]
    fn test_deactivate_unknown_id() {
        let dir = CandidateDirectory::new();
        assert!(!dir.deactivate(99));
    }
}
