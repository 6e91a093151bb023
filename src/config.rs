//! # Configuration Management
//!
//! Loads and manages application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, APP_SERVER_PORT, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)
//!
//! A handful of bare environment variables (`HOST`, `PORT`, `FILES_DIR`) are
//! honored as well, since deployment platforms commonly inject those without
//! the APP_ prefix.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub realtime: RealtimeConfig,
    pub storage: StorageConfig,
    pub interview: InterviewConfig,
    pub audio: AudioFormatConfig,
    pub performance: PerformanceConfig,
    pub report: ReportConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Settings for the upstream realtime conversational-AI session.
///
/// ## Fields:
/// - `endpoint`: base WebSocket URL of the realtime API
/// - `model`: model name appended to the endpoint as a query parameter
/// - `api_key_env`: name of the environment variable holding the API key;
///   the key itself never lives in config files
/// - `temperature`: sampling temperature sent with the session configuration
/// - `input_transcription_model`: model used server-side to transcribe the
///   candidate's speech
/// - `silence_duration_ms`: server-VAD silence window before a candidate turn
///   is considered finished
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub temperature: f32,
    pub input_transcription_model: String,
    pub silence_duration_ms: u32,
}

/// Filesystem layout for interview artifacts.
///
/// All candidate artifacts (resume, recorded video, transcripts) live under
/// `files_dir/{candidate_id}/`; per-role documents (job description, question
/// bank) live under `files_dir/{skill}/{designation}/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub files_dir: String,
}

/// Interview session coordination settings.
///
/// ## Fields:
/// - `rendezvous_timeout_secs`: upper bound on how long the video channel
///   waits for the audio channel to finalize before skipping analysis
/// - `token_ttl_hours`: validity window of an interview invite token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewConfig {
    pub rendezvous_timeout_secs: u64,
    pub token_ttl_hours: i64,
}

/// Canonical audio format exchanged with the upstream endpoint.
///
/// The realtime API requires single-channel 16-bit linear PCM at 24 kHz in
/// little-endian byte order; candidate audio is transcoded to this format and
/// agent audio arrives in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFormatConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

/// Performance tuning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Maximum number of concurrently running interview sessions
    pub max_concurrent_sessions: usize,
}

/// Downstream analysis and media post-processing hooks.
///
/// ## Fields:
/// - `remux_program`: executable used for the lossless container remux of the
///   recorded video (stream copy, no re-encode)
/// - `analysis_command`: optional executable invoked with
///   `<candidate_id> <qa_dir>` once both channels of a session have finished;
///   empty string disables analysis triggering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub remux_program: String,
    pub analysis_command: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            realtime: RealtimeConfig {
                endpoint: "wss://api.openai.com/v1/realtime".to_string(),
                model: "gpt-4o-realtime-preview".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                temperature: 0.8,
                input_transcription_model: "whisper-1".to_string(),
                silence_duration_ms: 1000,
            },
            storage: StorageConfig {
                files_dir: "./files".to_string(),
            },
            interview: InterviewConfig {
                rendezvous_timeout_secs: 300,
                token_ttl_hours: 48,
            },
            audio: AudioFormatConfig {
                sample_rate: 24_000,
                channels: 1,
                bit_depth: 16,
            },
            performance: PerformanceConfig {
                max_concurrent_sessions: 10,
            },
            report: ReportConfig {
                remux_program: "ffmpeg".to_string(),
                analysis_command: String::new(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, config.toml, and the environment.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Deployment platforms commonly inject these without the APP_ prefix.
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }
        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }
        if let Ok(files_dir) = env::var("FILES_DIR") {
            settings = settings.set_override("storage.files_dir", files_dir)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// Catching configuration errors early prevents runtime failures and
    /// gives a clear message about what's wrong.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.performance.max_concurrent_sessions == 0 {
            return Err(anyhow::anyhow!(
                "Max concurrent sessions must be greater than 0"
            ));
        }

        if self.interview.rendezvous_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "Rendezvous timeout must be greater than 0 seconds"
            ));
        }

        if self.audio.channels != 1 || self.audio.bit_depth != 16 {
            return Err(anyhow::anyhow!(
                "Upstream audio format must be mono 16-bit PCM"
            ));
        }

        if self.audio.sample_rate == 0 {
            return Err(anyhow::anyhow!("Audio sample rate cannot be 0"));
        }

        if self.report.remux_program.trim().is_empty() {
            return Err(anyhow::anyhow!("Remux program cannot be empty"));
        }

        Ok(())
    }

    /// Update configuration from a JSON string (runtime config updates).
    ///
    /// Allows partial updates: `{"server": {"port": 9000}}` changes only the
    /// port. Only a safe subset of fields is updatable at runtime; storage
    /// layout and audio format are fixed for the process lifetime.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial: serde_json::Value = serde_json::from_str(json_str)?;

        if let Some(server) = partial.get("server") {
            if let Some(host) = server.get("host").and_then(|v| v.as_str()) {
                self.server.host = host.to_string();
            }
            if let Some(port) = server.get("port").and_then(|v| v.as_u64()) {
                self.server.port = port as u16;
            }
        }

        if let Some(realtime) = partial.get("realtime") {
            if let Some(model) = realtime.get("model").and_then(|v| v.as_str()) {
                self.realtime.model = model.to_string();
            }
            if let Some(temp) = realtime.get("temperature").and_then(|v| v.as_f64()) {
                self.realtime.temperature = temp as f32;
            }
            if let Some(silence) = realtime
                .get("silence_duration_ms")
                .and_then(|v| v.as_u64())
            {
                self.realtime.silence_duration_ms = silence as u32;
            }
        }

        if let Some(interview) = partial.get("interview") {
            if let Some(timeout) = interview
                .get("rendezvous_timeout_secs")
                .and_then(|v| v.as_u64())
            {
                self.interview.rendezvous_timeout_secs = timeout;
            }
            if let Some(ttl) = interview.get("token_ttl_hours").and_then(|v| v.as_i64()) {
                self.interview.token_ttl_hours = ttl;
            }
        }

        if let Some(performance) = partial.get("performance") {
            if let Some(sessions) = performance
                .get("max_concurrent_sessions")
                .and_then(|v| v.as_u64())
            {
                self.performance.max_concurrent_sessions = sessions as usize;
            }
        }

        self.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.audio.sample_rate, 24_000);
        assert_eq!(config.interview.rendezvous_timeout_secs, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.audio.channels = 2;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.interview.rendezvous_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_update() {
        let mut config = AppConfig::default();
        let json = r#"{"server": {"port": 9090}, "interview": {"rendezvous_timeout_secs": 60}}"#;
        assert!(config.update_from_json(json).is_ok());
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.interview.rendezvous_timeout_secs, 60);
        // Untouched fields keep their values
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_config_update_rejects_invalid() {
        let mut config = AppConfig::default();
        let json = r#"{"performance": {"max_concurrent_sessions": 0}}"#;
        assert!(config.update_from_json(json).is_err());
    }
}
