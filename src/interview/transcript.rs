//! # Interview Transcript
//!
//! Accumulates the conversation between the agent and the candidate as an
//! ordered list of speaker-attributed entries, and renders it in plain text
//! and Markdown for downstream analysis and human review.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    Agent,
    Candidate,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Agent => "Agent",
            Speaker::Candidate => "Candidate",
        }
    }
}

/// One utterance in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
}

impl fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.speaker.as_str(), self.text)
    }
}

/// Ordered transcript of one interview session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an utterance. Empty or whitespace-only text is dropped, since
    /// transcription occasionally emits blank completions.
    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }
        self.entries.push(TranscriptEntry { speaker, text });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Plain-text rendering, one `Speaker: text` line per entry.
    pub fn to_plain(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Markdown rendering with a generation timestamp and bold speaker
    /// labels.
    pub fn to_markdown(&self, title: &str) -> String {
        let mut out = format!(
            "# {}\n\n_Generated {}_\n\n",
            title,
            chrono::Utc::now().to_rfc3339()
        );
        for entry in &self.entries {
            out.push_str(&format!(
                "**{}:** {}\n\n",
                entry.speaker.as_str(),
                entry.text
            ));
        }
        out
    }
}
