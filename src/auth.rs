//! # Interview Invite Tokens
//!
//! Issues and resolves the opaque tokens that candidates present when
//! connecting to the interview WebSocket endpoints.
//!
//! ## Lifecycle:
//! 1. Scheduling an interview issues a token bound to a candidate id
//! 2. Both the audio and video connections present the token as a query
//!    parameter and are resolved back to the candidate id
//! 3. Tokens expire after a configurable TTL; completing an interview
//!    revokes every token for that candidate
//!
//! Tokens are random UUIDs, so resolving one requires the exact value; there
//! is nothing to guess or enumerate.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct TokenRecord {
    candidate_id: i64,
    expires_at: DateTime<Utc>,
}

/// Thread-safe store of active interview invite tokens.
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: RwLock<HashMap<String, TokenRecord>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token for a candidate, valid for `ttl_hours`.
    ///
    /// Issuing a new token does not invalidate earlier ones; a candidate may
    /// hold several live invites (for example after a reschedule).
    pub fn issue(&self, candidate_id: i64, ttl_hours: i64) -> String {
        let token = Uuid::new_v4().to_string();
        let record = TokenRecord {
            candidate_id,
            expires_at: Utc::now() + Duration::hours(ttl_hours),
        };
        let mut tokens = self.tokens.write().unwrap();
        tokens.insert(token.clone(), record);
        token
    }

    /// Resolve a token to its candidate id.
    ///
    /// Expired tokens are removed on sight and reported the same way as
    /// unknown ones, so a caller cannot distinguish "never existed" from
    /// "no longer valid".
    pub fn resolve(&self, token: &str) -> Result<i64, String> {
        let mut tokens = self.tokens.write().unwrap();
        match tokens.get(token) {
            Some(record) if record.expires_at > Utc::now() => Ok(record.candidate_id),
            Some(_) => {
                tokens.remove(token);
                Err("Invalid or expired interview token".to_string())
            }
            None => Err("Invalid or expired interview token".to_string()),
        }
    }

    /// Revoke every token issued for a candidate. Returns how many were
    /// removed.
    pub fn revoke_candidate(&self, candidate_id: i64) -> usize {
        let mut tokens = self.tokens.write().unwrap();
        let before = tokens.len();
        tokens.retain(|_, record| record.candidate_id != candidate_id);
        before - tokens.len()
    }
}
