//! # Interview Scheduling
//!
//! `PATCH /api/v1/interview/schedule` marks a batch of candidates as
//! Scheduled and issues each one an invite token for the WebSocket
//! endpoints. Ids that cannot be scheduled (unknown, deactivated, or with
//! interview documents missing) are reported back in buckets rather than
//! failing the whole batch.

use crate::candidates::CandidateProfile;
use crate::error::AppError;
use crate::interview::status::InterviewStatus;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub id_list: Vec<i64>,
}

#[derive(Debug, Serialize)]
struct ScheduledInvite {
    candidate_id: i64,
    token: String,
    expires_in_hours: i64,
}

pub async fn schedule_interviews(
    state: web::Data<AppState>,
    body: web::Json<ScheduleRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    if request.id_list.is_empty() {
        return Err(AppError::BadRequest("id_list cannot be empty".to_string()));
    }

    let ttl_hours = state.get_config().interview.token_ttl_hours;
    let mut scheduled = Vec::new();
    let mut not_found = Vec::new();
    let mut ineligible = Vec::new();
    let mut missing_documents = Vec::new();

    for candidate_id in request.id_list {
        match state.candidates.get(candidate_id) {
            None => not_found.push(candidate_id),
            Some(CandidateProfile { active: false, .. }) => ineligible.push(candidate_id),
            Some(profile) if !documents_present(&state, &profile) => {
                missing_documents.push(candidate_id)
            }
            Some(_) => {
                state.interviews.schedule(candidate_id);
                let token = state.tokens.issue(candidate_id, ttl_hours);
                scheduled.push(ScheduledInvite {
                    candidate_id,
                    token,
                    expires_in_hours: ttl_hours,
                });
            }
        }
    }

    info!(
        "Scheduled {} interview(s), {} not found, {} ineligible, {} missing documents",
        scheduled.len(),
        not_found.len(),
        ineligible.len(),
        missing_documents.len()
    );

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "scheduled": scheduled,
        "not_found": not_found,
        "ineligible": ineligible,
        "missing_documents": missing_documents
    })))
}

/// A candidate can only be invited once every interview document exists:
/// the role's job description and question bank, and their resume.
fn documents_present(state: &AppState, profile: &CandidateProfile) -> bool {
    let jd = state
        .documents
        .job_description(&profile.skill_set, &profile.designation);
    let questions = state
        .documents
        .question_bank(&profile.skill_set, &profile.designation);
    let resume = state.documents.resume(profile.id);
    !jd.trim().is_empty() && !questions.trim().is_empty() && !resume.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use std::fs;
    use tempfile::TempDir;

    fn state_with_candidates(dir: &TempDir) -> web::Data<AppState> {
        let mut config = crate::config::AppConfig::default();
        config.storage.files_dir = dir.path().to_string_lossy().into_owned();
        let state = web::Data::new(AppState::new(config));

        let role = dir.path().join("rust").join("senior-engineer");
        fs::create_dir_all(&role).unwrap();
        fs::write(role.join("jd.txt"), "Build services.").unwrap();
        fs::write(role.join("question_bank.txt"), "Explain ownership\n").unwrap();
        let candidate_dir = dir.path().join("1");
        fs::create_dir_all(&candidate_dir).unwrap();
        fs::write(candidate_dir.join("resume.txt"), "Systems background.").unwrap();

        state.candidates.upsert(CandidateProfile {
            id: 1,
            name: "Jordan".to_string(),
            skill_set: "rust".to_string(),
            designation: "senior-engineer".to_string(),
            active: true,
        });
        state.candidates.upsert(CandidateProfile {
            id: 2,
            name: "Sam".to_string(),
            skill_set: "rust".to_string(),
            designation: "senior-engineer".to_string(),
            active: false,
        });
        // Active, but no resume on disk
        state.candidates.upsert(CandidateProfile {
            id: 3,
            name: "Alex".to_string(),
            skill_set: "rust".to_string(),
            designation: "senior-engineer".to_string(),
            active: true,
        });
        state
    }

    #[actix_web::test]
    async fn test_schedule_buckets_results() {
        let dir = TempDir::new().unwrap();
        let state = state_with_candidates(&dir);
        let body = web::Json(ScheduleRequest {
            id_list: vec![1, 2, 3, 99],
        });
        let response = schedule_interviews(state.clone(), body).await.unwrap();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(parsed["scheduled"].as_array().unwrap().len(), 1);
        assert_eq!(parsed["scheduled"][0]["candidate_id"], 1);
        assert_eq!(parsed["not_found"], json!([99]));
        assert_eq!(parsed["ineligible"], json!([2]));
        assert_eq!(parsed["missing_documents"], json!([3]));

        // The issued token resolves and the status moved
        let token = parsed["scheduled"][0]["token"].as_str().unwrap();
        assert_eq!(state.tokens.resolve(token), Ok(1));
        assert_eq!(state.interviews.get(1), Some(InterviewStatus::Scheduled));
        assert_eq!(state.interviews.get(3), None);

        // The invite carries its issue timestamp
        let record = state.interviews.record(1).unwrap();
        assert!(record.invited_at.is_some());
        assert!(record.interview_at.is_none());
    }

    #[actix_web::test]
    async fn test_schedule_rejects_empty_list() {
        let dir = TempDir::new().unwrap();
        let state = state_with_candidates(&dir);
        let body = web::Json(ScheduleRequest { id_list: vec![] });
        assert!(schedule_interviews(state, body).await.is_err());
    }
}
