//! # Realtime Protocol Messages
//!
//! Serialization glue for the upstream realtime API: builders for the three
//! client messages the session sends, and a typed view over the server
//! events the session cares about. Every other server event deserializes to
//! `UpstreamEvent::Other` and is ignored.

use crate::config::RealtimeConfig;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

/// Text frame the browser sends on the audio channel to end the candidate's
/// current turn.
pub const END_QUESTION: &str = "END_QUESTION";

/// Text frame the browser sends on the video channel after the last chunk.
pub const TRANSFER_COMPLETE: &str = "TRANSFER_COMPLETE";

/// Server events the session loop reacts to.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum UpstreamEvent {
    /// Base64-encoded chunk of agent speech
    #[serde(rename = "response.audio.delta")]
    AudioDelta { delta: String },

    /// Incremental text of what the agent is saying
    #[serde(rename = "response.audio_transcript.delta")]
    AudioTranscriptDelta { delta: String },

    /// The agent finished a full response
    #[serde(rename = "response.done")]
    ResponseDone { response: Value },

    /// Transcription of the candidate's previous turn completed
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    InputTranscriptionCompleted { transcript: String },

    #[serde(rename = "error")]
    Error { error: Value },

    #[serde(other)]
    Other,
}

/// Final agent transcript carried in a `response.done` payload, if present.
pub fn agent_transcript(response: &Value) -> Option<&str> {
    response
        .get("output")?
        .get(0)?
        .get("content")?
        .get(0)?
        .get("transcript")?
        .as_str()
}

/// Session configuration message sent once after connecting.
pub fn session_update(instructions: &str, realtime: &RealtimeConfig) -> String {
    json!({
        "type": "session.update",
        "session": {
            "instructions": instructions,
            "temperature": realtime.temperature,
            "modalities": ["audio", "text"],
            "input_audio_transcription": {
                "model": realtime.input_transcription_model,
            },
            // Config validation pins the audio format to mono 16-bit PCM,
            // the only format the realtime API speaks
            "output_audio_format": "pcm16",
            "turn_detection": {
                "type": "server_vad",
                "silence_duration_ms": realtime.silence_duration_ms,
            },
        },
    })
    .to_string()
}

/// Ask the agent to produce its next response.
pub fn response_create() -> String {
    json!({ "type": "response.create" }).to_string()
}

/// Append candidate audio to the upstream input buffer.
pub fn input_audio_append(pcm: &[u8]) -> String {
    json!({
        "type": "input_audio_buffer.append",
        "audio": BASE64.encode(pcm),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_session_update_shape() {
        let cfg = AppConfig::default();
        let msg = session_update("Interview the candidate.", &cfg.realtime);
        let parsed: Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(parsed["type"], "session.update");
        assert_eq!(parsed["session"]["instructions"], "Interview the candidate.");
        assert_eq!(parsed["session"]["output_audio_format"], "pcm16");
        assert_eq!(parsed["session"]["turn_detection"]["type"], "server_vad");
        assert_eq!(
            parsed["session"]["turn_detection"]["silence_duration_ms"],
            1000
        );
    }

    #[test]
    fn test_input_audio_append_encodes_base64() {
        let msg = input_audio_append(&[0x01, 0x02, 0x03]);
        let parsed: Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(parsed["type"], "input_audio_buffer.append");
        let audio = parsed["audio"].as_str().unwrap();
        assert_eq!(BASE64.decode(audio).unwrap(), vec![0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_known_events_deserialize() {
        let event: UpstreamEvent =
            serde_json::from_str(r#"{"type": "response.audio.delta", "delta": "AAAA"}"#).unwrap();
        assert!(matches!(event, UpstreamEvent::AudioDelta { delta } if delta == "AAAA"));

        let event: UpstreamEvent = serde_json::from_str(
            r#"{"type": "conversation.item.input_audio_transcription.completed", "transcript": "hi"}"#,
        )
        .unwrap();
        assert!(matches!(
            event,
            UpstreamEvent::InputTranscriptionCompleted { transcript } if transcript == "hi"
        ));
    }

    #[test]
    fn test_unknown_event_falls_through() {
        let event: UpstreamEvent =
            serde_json::from_str(r#"{"type": "session.created", "session": {}}"#).unwrap();
        assert!(matches!(event, UpstreamEvent::Other));
    }

    #[test]
    fn test_agent_transcript_extraction() {
        let response = json!({
            "output": [{"content": [{"transcript": "Thanks for joining."}]}]
        });
        assert_eq!(agent_transcript(&response), Some("Thanks for joining."));
        assert_eq!(agent_transcript(&json!({"output": []})), None);
    }
}
