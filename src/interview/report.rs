//! # Analysis Triggering
//!
//! Once both channels of an interview have finished, the video channel
//! hands the session off to downstream analysis. The hook is a trait so
//! tests can observe the trigger, with two shipped implementations: one
//! that runs a configured command and one that does nothing.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{error, info};

/// Downstream hook invoked when an interview's audio and video are both
/// final.
pub trait ReportGenerator: Send + Sync {
    /// Kick off analysis for a candidate whose artifacts live in `qa_dir`.
    /// Must not block; implementations run their work in the background.
    fn trigger(&self, candidate_id: i64, qa_dir: &Path);
}

/// Runs a configured executable as `<command> <candidate_id> <qa_dir>`.
///
/// The command is fire-and-forget: its exit status is logged but never
/// propagated, since analysis failure should not affect the interview
/// session that already completed.
pub struct CommandReportGenerator {
    command: String,
}

impl CommandReportGenerator {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl ReportGenerator for CommandReportGenerator {
    fn trigger(&self, candidate_id: i64, qa_dir: &Path) {
        let command = self.command.clone();
        let qa_dir: PathBuf = qa_dir.to_path_buf();
        tokio::spawn(async move {
            info!(
                "Triggering analysis for candidate {} in {}",
                candidate_id,
                qa_dir.display()
            );
            let result = tokio::process::Command::new(&command)
                .arg(candidate_id.to_string())
                .arg(&qa_dir)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            match result {
                Ok(status) if status.success() => {
                    info!("Analysis finished for candidate {}", candidate_id);
                }
                Ok(status) => {
                    error!(
                        "Analysis for candidate {} exited with {}",
                        candidate_id, status
                    );
                }
                Err(e) => {
                    error!("Could not run analysis command {}: {}", command, e);
                }
            }
        });
    }
}

/// Used when no analysis command is configured.
pub struct NoopReportGenerator;

impl ReportGenerator for NoopReportGenerator {
    fn trigger(&self, candidate_id: i64, _qa_dir: &Path) {
        info!(
            "No analysis command configured, skipping candidate {}",
            candidate_id
        );
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every trigger for assertions.
    #[derive(Default)]
    pub struct RecordingReportGenerator {
        pub calls: Mutex<Vec<(i64, PathBuf)>>,
    }

    impl ReportGenerator for RecordingReportGenerator {
        fn trigger(&self, candidate_id: i64, qa_dir: &Path) {
            self.calls
                .lock()
                .unwrap()
                .push((candidate_id, qa_dir.to_path_buf()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingReportGenerator;
    use super::*;

    #[test]
    fn test_recording_generator_captures_calls() {
        let generator = RecordingReportGenerator::default();
        generator.trigger(7, Path::new("/files/7"));
        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (7, PathBuf::from("/files/7")));
    }

    #[tokio::test]
    async fn test_command_generator_survives_missing_binary() {
        let generator = CommandReportGenerator::new("definitely-not-an-analyzer");
        // Must not panic or block
        generator.trigger(1, Path::new("/tmp"));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}
