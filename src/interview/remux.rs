//! # Video Remux
//!
//! Browsers stream recorded media as a sequence of fragments, which leaves
//! the uploaded file without a proper container index (no seeking, unknown
//! duration). After the upload completes the file is remuxed in place with a
//! stream copy: no re-encode, just a rewritten container.
//!
//! Remux failure is never fatal. The fragmented file is still playable by
//! the analysis pipeline, so on any failure the original is kept untouched.

use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, warn};

/// Remux `video_path` in place using the configured program (ffmpeg by
/// default). Returns whether the remuxed file replaced the original.
pub async fn remux_in_place(program: &str, video_path: &Path) -> bool {
    let staging = staging_path(video_path);

    let status = Command::new(program)
        .arg("-y")
        .arg("-i")
        .arg(video_path)
        .arg("-c")
        .arg("copy")
        .arg(&staging)
        .output()
        .await;

    match status {
        Ok(output) if output.status.success() => {}
        Ok(output) => {
            warn!(
                "Remux of {} exited with {}: {}",
                video_path.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
            let _ = std::fs::remove_file(&staging);
            return false;
        }
        Err(e) => {
            warn!("Could not run {} for remux: {}", program, e);
            return false;
        }
    }

    match promote_output(video_path, &staging) {
        Ok(true) => {
            info!("Remuxed {} in place", video_path.display());
            true
        }
        Ok(false) => {
            warn!(
                "Remux of {} produced no usable output, keeping original",
                video_path.display()
            );
            false
        }
        Err(e) => {
            warn!("Could not promote remuxed {}: {}", video_path.display(), e);
            let _ = std::fs::remove_file(&staging);
            false
        }
    }
}

/// Replace `original` with `remuxed` if the remuxed file exists and is
/// non-empty. Returns whether the promotion happened.
fn promote_output(original: &Path, remuxed: &Path) -> std::io::Result<bool> {
    let metadata = match std::fs::metadata(remuxed) {
        Ok(m) => m,
        Err(_) => return Ok(false),
    };
    if metadata.len() == 0 {
        std::fs::remove_file(remuxed)?;
        return Ok(false);
    }
    std::fs::rename(remuxed, original)?;
    Ok(true)
}

fn staging_path(video_path: &Path) -> PathBuf {
    let mut name = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    name.push_str(".remux");
    if let Some(ext) = video_path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    video_path.with_file_name(name)
}
