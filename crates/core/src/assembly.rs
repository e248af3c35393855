//! FFmpeg command wrappers for final-video assembly.
//!
//! The video-ads pipeline produces one short video clip and one narration
//! audio track per script chunk. Assembly merges each pair (looping the clip
//! until the narration ends) and then concatenates the merged clips into a
//! single deliverable using ffmpeg's concat demuxer.

use std::path::{Path, PathBuf};

/// Error type for ffmpeg operations.
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("input file not found: {0}")]
    InputNotFound(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Merge one video clip with one audio track into `output_path`.
///
/// The clip is looped indefinitely and the merge stops with the shorter of
/// (looped video, audio), i.e. the audio track. Hosted image-to-video models
/// return fixed-length clips (typically 5s) while narration chunks run 8-10s,
/// so looping the clip to the narration length is the expected case.
pub async fn merge_clip(
    video_path: &Path,
    audio_path: &Path,
    output_path: &Path,
) -> Result<(), AssemblyError> {
    for input in [video_path, audio_path] {
        if !input.exists() {
            return Err(AssemblyError::InputNotFound(
                input.to_string_lossy().to_string(),
            ));
        }
    }

    let args = merge_clip_args(video_path, audio_path, output_path);
    run_ffmpeg(&args).await
}

/// Concatenate already-merged clips into `output_path` without re-encoding.
///
/// Writes a concat demuxer list file next to the output, then runs
/// `ffmpeg -f concat -c copy`. Clip order is the order of `clip_paths`.
pub async fn concat_clips(
    clip_paths: &[PathBuf],
    output_path: &Path,
) -> Result<(), AssemblyError> {
    for clip in clip_paths {
        if !clip.exists() {
            return Err(AssemblyError::InputNotFound(
                clip.to_string_lossy().to_string(),
            ));
        }
    }

    let list_path = output_path.with_extension("concat.txt");
    tokio::fs::write(&list_path, concat_list(clip_paths)).await?;

    let args = concat_args(&list_path, output_path);
    run_ffmpeg(&args).await
}

/// Build the argument list for a single clip merge.
fn merge_clip_args(video_path: &Path, audio_path: &Path, output_path: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-stream_loop".into(),
        "-1".into(),
        "-i".into(),
        video_path.to_string_lossy().into_owned(),
        "-i".into(),
        audio_path.to_string_lossy().into_owned(),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "1:a:0".into(),
        "-c:v".into(),
        "libx264".into(),
        "-c:a".into(),
        "aac".into(),
        "-shortest".into(),
        output_path.to_string_lossy().into_owned(),
    ]
}

/// Build the argument list for the concat pass.
fn concat_args(list_path: &Path, output_path: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list_path.to_string_lossy().into_owned(),
        "-c".into(),
        "copy".into(),
        output_path.to_string_lossy().into_owned(),
    ]
}

/// Render a concat demuxer list file.
///
/// The demuxer expects one `file '<path>'` line per input; single quotes in
/// paths are escaped with the `'\''` idiom.
fn concat_list(clip_paths: &[PathBuf]) -> String {
    let mut out = String::new();
    for clip in clip_paths {
        let escaped = clip.to_string_lossy().replace('\'', "'\\''");
        out.push_str(&format!("file '{escaped}'\n"));
    }
    out
}

/// Run ffmpeg with the given arguments, mapping a non-zero exit to an error.
async fn run_ffmpeg(args: &[String]) -> Result<(), AssemblyError> {
    let output = tokio::process::Command::new("ffmpeg")
        .args(args)
        .output()
        .await
        .map_err(AssemblyError::NotFound)?;

    if !output.status.success() {
        return Err(AssemblyError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(())
}
