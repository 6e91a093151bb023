//! # Interview Lifecycle Status
//!
//! Tracks each candidate's interview through its lifecycle. The audio
//! channel drives the two transitions that matter at runtime:
//! `Scheduled` -> `InProgress` when the realtime session comes up, and
//! `InProgress` -> `Completed` when the session finalizes.
//!
//! Transitions are expressed as an update-by-filter so that a stale or
//! duplicate connection cannot move a record that is no longer in the
//! expected state. Records carry two timestamps: when the invite was
//! issued, and when the interview actually started.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Lifecycle status of a candidate's interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterviewStatus {
    Scheduled,
    InProgress,
    Completed,
    NotScheduled,
    InviteExpired,
    Rejected,
    Selected,
    Hired,
}

impl InterviewStatus {
    /// Human-readable label used in stored records and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Scheduled => "Scheduled",
            InterviewStatus::InProgress => "In Progress",
            InterviewStatus::Completed => "Completed",
            InterviewStatus::NotScheduled => "Not Scheduled",
            InterviewStatus::InviteExpired => "Invite Expired",
            InterviewStatus::Rejected => "Rejected",
            InterviewStatus::Selected => "Selected",
            InterviewStatus::Hired => "Hired",
        }
    }
}

/// One candidate's interview record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewRecord {
    pub status: InterviewStatus,
    /// When the invite was issued (set by scheduling)
    pub invited_at: Option<DateTime<Utc>>,
    /// When the interview actually started (set on the move to InProgress)
    pub interview_at: Option<DateTime<Utc>>,
}

/// Thread-safe map of candidate id to interview record.
#[derive(Debug, Default)]
pub struct InterviewRegistry {
    records: RwLock<HashMap<i64, InterviewRecord>>,
}

impl InterviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a candidate's status unconditionally, keeping any timestamps an
    /// existing record carries.
    pub fn set(&self, candidate_id: i64, status: InterviewStatus) {
        let mut records = self.records.write().unwrap();
        records
            .entry(candidate_id)
            .and_modify(|record| record.status = status)
            .or_insert(InterviewRecord {
                status,
                invited_at: None,
                interview_at: None,
            });
    }

    /// Record a fresh invite: status Scheduled, invite timestamp now, any
    /// earlier interview timestamp cleared.
    pub fn schedule(&self, candidate_id: i64) {
        let mut records = self.records.write().unwrap();
        records.insert(
            candidate_id,
            InterviewRecord {
                status: InterviewStatus::Scheduled,
                invited_at: Some(Utc::now()),
                interview_at: None,
            },
        );
    }

    pub fn get(&self, candidate_id: i64) -> Option<InterviewStatus> {
        let records = self.records.read().unwrap();
        records.get(&candidate_id).map(|record| record.status)
    }

    /// Full record for a candidate, timestamps included.
    pub fn record(&self, candidate_id: i64) -> Option<InterviewRecord> {
        let records = self.records.read().unwrap();
        records.get(&candidate_id).cloned()
    }

    /// Move a candidate from `from` to `to` at `at`, only if the current
    /// status matches `from`. Returns whether the transition happened. The
    /// move into InProgress stamps the interview timestamp.
    pub fn transition(
        &self,
        candidate_id: i64,
        from: InterviewStatus,
        to: InterviewStatus,
        at: DateTime<Utc>,
    ) -> bool {
        let mut records = self.records.write().unwrap();
        match records.get_mut(&candidate_id) {
            Some(record) if record.status == from => {
                record.status = to;
                if to == InterviewStatus::InProgress {
                    record.interview_at = Some(at);
                }
                true
            }
            _ => false,
        }
    }

    /// Candidate ids currently in the given status.
    pub fn ids_with_status(&self, status: InterviewStatus) -> Vec<i64> {
        let records = self.records.read().unwrap();
        records
            .iter()
            .filter(|(_, record)| record.status == status)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(InterviewStatus::InProgress.as_str(), "In Progress");
        assert_eq!(InterviewStatus::InviteExpired.as_str(), "Invite Expired");
    }

    #[test]
    fn test_transition_requires_expected_state() {
        let registry = InterviewRegistry::new();
        registry.set(1, InterviewStatus::Scheduled);

        assert!(registry.transition(
            1,
            InterviewStatus::Scheduled,
            InterviewStatus::InProgress,
            Utc::now()
        ));
        assert_eq!(registry.get(1), Some(InterviewStatus::InProgress));

        // A second identical transition finds the wrong current state
        assert!(!registry.transition(
            1,
            InterviewStatus::Scheduled,
            InterviewStatus::InProgress,
            Utc::now()
        ));
        assert_eq!(registry.get(1), Some(InterviewStatus::InProgress));
    }

    #[test]
    fn test_transition_unknown_candidate() {
        let registry = InterviewRegistry::new();
        assert!(!registry.transition(
            5,
            InterviewStatus::Scheduled,
            InterviewStatus::InProgress,
            Utc::now()
        ));
    }

    #[test]
    fn test_schedule_stamps_invite_timestamp() {
        let registry = InterviewRegistry::new();
        registry.schedule(1);

        let record = registry.record(1).unwrap();
        assert_eq!(record.status, InterviewStatus::Scheduled);
        assert!(record.invited_at.is_some());
        assert!(record.interview_at.is_none());
    }

    #[test]
    fn test_in_progress_transition_stamps_interview_timestamp() {
        let registry = InterviewRegistry::new();
        registry.schedule(1);

        let started = Utc::now();
        assert!(registry.transition(
            1,
            InterviewStatus::Scheduled,
            InterviewStatus::InProgress,
            started
        ));
        assert_eq!(registry.record(1).unwrap().interview_at, Some(started));

        // Completion keeps the interview timestamp untouched
        assert!(registry.transition(
            1,
            InterviewStatus::InProgress,
            InterviewStatus::Completed,
            Utc::now()
        ));
        let record = registry.record(1).unwrap();
        assert_eq!(record.interview_at, Some(started));
        assert!(record.invited_at.is_some());
    }

    #[test]
    fn test_ids_with_status() {
        let registry = InterviewRegistry::new();
        registry.set(1, InterviewStatus::Scheduled);
        registry.set(2, InterviewStatus::Completed);
        registry.set(3, InterviewStatus::Scheduled);

        let mut ids = registry.ids_with_status(InterviewStatus::Scheduled);
        ids.sort();
        assert_eq!(ids, vec![1, 3]);
    }
}
