//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Stderr lines kept in error messages.
const STDERR_TAIL_LINES: usize = 20;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set seek position (before input).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Set duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{:.3}", seconds))
    }

    /// Copy all streams without re-encoding.
    pub fn codec_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Shift timestamps so the output starts at zero.
    pub fn avoid_negative_ts(self) -> Self {
        self.output_arg("-avoid_negative_ts").output_arg("make_zero")
    }

    /// Treat the input as a concat demuxer manifest with absolute paths allowed.
    pub fn concat_input(self) -> Self {
        self.input_arg("-f")
            .input_arg("concat")
            .input_arg("-safe")
            .input_arg("0")
    }

    /// Build the command arguments. Existing output is overwritten.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-v".to_string(), "error".to_string()];

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runs FFmpeg commands and turns a non-zero exit into an error.
///
/// No timeout is applied here. A job that outlives its hard limit is
/// abandoned by the worker and the child is left to finish on its own.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    binary: PathBuf,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegRunner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run an FFmpeg command to completion.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", self.binary.display(), args.join(" "));

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => MediaError::FfmpegNotFound,
                _ => MediaError::Io(e),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = stderr_tail(&output.stderr);
            Err(MediaError::ffmpeg_failed(
                format!("FFmpeg exited with status {}: {}", output.status, stderr),
                Some(stderr),
                output.status.code(),
            ))
        }
    }
}

/// Last few lines of a process's stderr.
pub(crate) fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cut_command_args() {
        let cmd = FfmpegCommand::new("input.mp4", "output.mp4")
            .seek(10.0)
            .duration(30.5)
            .codec_copy()
            .avoid_negative_ts();

        let args = cmd.build_args();
        assert_eq!(
            args,
            vec![
                "-y", "-v", "error", "-ss", "10.000", "-t", "30.500", "-i", "input.mp4", "-c",
                "copy", "-avoid_negative_ts", "make_zero", "output.mp4"
            ]
        );
    }

    #[test]
    fn test_concat_command_args() {
        let args = FfmpegCommand::new("list.txt", "final.mp4")
            .concat_input()
            .codec_copy()
            .build_args();

        let i = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(&args[i - 4..i], &["-f", "concat", "-safe", "0"]);
        assert_eq!(args.last().unwrap(), "final.mp4");
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr: String = (0..30).map(|i| format!("line {i}\n")).collect();
        let tail = stderr_tail(stderr.as_bytes());
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 29"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let runner = FfmpegRunner::new("/nonexistent/ffmpeg-binary");
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4");
        assert!(matches!(runner.run(&cmd).await, Err(MediaError::FfmpegNotFound)));
    }
}
