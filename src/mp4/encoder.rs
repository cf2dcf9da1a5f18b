use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tokio::task;
use tracing::{debug, info, warn};

use crate::config::Mp4Config;
use crate::error::{EncodeError, Result, SourceError};

/// H.264/MP4 output through an external `ffmpeg` executable
///
/// The images are handed over as a concat list with one `duration` entry per
/// frame; scaling, colour conversion and muxing all happen inside ffmpeg.
pub struct Mp4Encoder {
    config: Mp4Config,
    fps: u32,
}

impl Mp4Encoder {
    pub fn new(config: Mp4Config, fps: u32) -> Self {
        Self { config, fps }
    }

    pub fn check_ffmpeg_available(&self) -> bool {
        Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Only `EncodeError::EncodingFailed` means ffmpeg ran and may have
    /// touched `output_path`; every other error leaves it alone.
    pub async fn encode<P: AsRef<Path>>(&self, paths: &[PathBuf], output_path: P) -> Result<()> {
        let output_path = output_path.as_ref();
        if paths.is_empty() {
            return Err(SourceError::EmptyInput.into());
        }

        if !self.check_ffmpeg_available() {
            return Err(EncodeError::ToolUnavailable {
                tool: self.config.ffmpeg_path.clone(),
            }
            .into());
        }

        let list_path = output_path.with_extension("frames.txt");
        self.create_frame_list(paths, &list_path)?;

        info!("Encoding {} images to {:?} with {}", paths.len(), output_path, self.config.codec);
        let result = self.run_ffmpeg(&list_path, output_path).await;

        if let Err(e) = std::fs::remove_file(&list_path) {
            warn!("Failed to remove frame list {:?}: {}", list_path, e);
        }
        result
    }

    fn create_frame_list(&self, paths: &[PathBuf], list_path: &Path) -> Result<()> {
        let mut file = BufWriter::new(File::create(list_path)?);
        let frame_duration = 1.0 / f64::from(self.fps);

        for path in paths {
            writeln!(file, "file '{}'", concat_escape(&absolute(path)))?;
            writeln!(file, "duration {:.6}", frame_duration)?;
        }

        // The concat demuxer ignores the duration of the final entry
        if let Some(last) = paths.last() {
            writeln!(file, "file '{}'", concat_escape(&absolute(last)))?;
        }

        file.flush()?;
        debug!("Frame list written to {:?}", list_path);
        Ok(())
    }

    fn build_command(&self, list_path: &Path, output_path: &Path) -> Command {
        let mut cmd = Command::new(&self.config.ffmpeg_path);
        cmd.arg("-f").arg("concat")
            .arg("-safe").arg("0")
            .arg("-i").arg(list_path)
            .arg("-c:v").arg(&self.config.codec)
            .arg("-r").arg(self.fps.to_string())
            .arg("-pix_fmt").arg(&self.config.pixel_format)
            .arg("-preset").arg(&self.config.preset)
            .arg("-crf").arg(quality_to_crf(self.config.quality).to_string())
            // yuv420p needs even dimensions
            .arg("-vf").arg("scale=trunc(iw/2)*2:trunc(ih/2)*2")
            .arg("-an")
            .arg("-y")
            .arg(output_path)
            .stdout(Stdio::null());
        cmd
    }

    async fn run_ffmpeg(&self, list_path: &Path, output_path: &Path) -> Result<()> {
        let mut cmd = self.build_command(list_path, output_path);

        let output = task::spawn_blocking(move || cmd.output()).await
            .map_err(|e| EncodeError::LaunchFailed {
                reason: format!("FFmpeg task did not complete: {}", e),
            })?
            .map_err(|e| EncodeError::LaunchFailed {
                reason: format!("Failed to spawn FFmpeg process: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EncodeError::EncodingFailed {
                reason: format!("FFmpeg exited with {}: {}", output.status, stderr.trim()),
            }.into());
        }

        Ok(())
    }
}

/// Map 0-100 quality onto x264's 51-0 CRF scale
fn quality_to_crf(quality: u8) -> u8 {
    (51 - ((quality.min(100) as f32 / 100.0) * 51.0) as u8).clamp(0, 51)
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn concat_escape(path: &Path) -> String {
    path.display().to_string().replace('\'', "'\\''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::ffi::OsString;
    use tempfile::tempdir;

    #[test]
    fn test_quality_to_crf() {
        assert_eq!(quality_to_crf(100), 0);
        assert_eq!(quality_to_crf(0), 51);
        assert_eq!(quality_to_crf(85), 51 - 43);
    }

    #[test]
    fn test_frame_list_repeats_last_image() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("it's.jpg");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        let encoder = Mp4Encoder::new(Mp4Config::default(), 25);
        let list = dir.path().join("list.txt");
        encoder.create_frame_list(&[a, b], &list).unwrap();

        let content = std::fs::read_to_string(&list).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("file '") && lines[0].ends_with("a.jpg'"));
        assert_eq!(lines[1], "duration 0.040000");
        assert!(lines[2].contains("it'\\''s.jpg"));
        assert_eq!(lines[2], lines[4]);
    }

    #[test]
    fn test_command_arguments() {
        let encoder = Mp4Encoder::new(Mp4Config::default(), 30);
        let cmd = encoder.build_command(Path::new("list.txt"), Path::new("out.mp4"));
        let args: Vec<OsString> = cmd.get_args().map(|a| a.to_os_string()).collect();

        let position = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[position("-c:v") + 1], "libx264");
        assert_eq!(args[position("-r") + 1], "30");
        assert_eq!(args[position("-preset") + 1], "veryslow");
        assert_eq!(args[position("-crf") + 1], "8");
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("a.jpg");
        std::fs::write(&image, b"a").unwrap();

        let config = Mp4Config {
            ffmpeg_path: dir.path().join("no-such-ffmpeg").display().to_string(),
            ..Mp4Config::default()
        };
        let encoder = Mp4Encoder::new(config, 24);
        let err = encoder.encode(&[image], dir.path().join("out.mp4")).await.unwrap_err();

        assert!(matches!(err, crate::error::ReelError::Encode(EncodeError::ToolUnavailable { .. })));
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let dir = tempdir().unwrap();
        let encoder = Mp4Encoder::new(Mp4Config::default(), 24);
        let err = encoder.encode(&[], dir.path().join("out.mp4")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
