use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use tokio::task;
use tracing::{debug, info, warn};

use crate::{
    avi::{AviMuxer, MuxerOptions},
    config::Config,
    error::{EncodeError, ReelError, Result, SourceError},
    mp4::Mp4Encoder,
    source::{probe_dimensions, FrameSourceAdapter},
};

/// Represents a finished output file
#[derive(Debug, Clone)]
pub struct EncodedVideo {
    pub path: PathBuf,
    pub frame_count: usize,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub file_size: u64,
}

/// Entry point for both output paths
///
/// Each call owns its output file from creation to close. When a build
/// fails the half-written file is removed if `output.remove_partial_on_error`
/// is set; otherwise it is left for the caller to discard.
pub struct ConversionEngine {
    config: Config,
}

impl ConversionEngine {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Mux JPEG images, in order, into a Motion-JPEG AVI file
    pub async fn encode_images_to_avi<P: AsRef<Path>>(
        &self,
        paths: &[PathBuf],
        output_path: P,
    ) -> Result<EncodedVideo> {
        let output_path = output_path.as_ref().to_path_buf();
        self.config.validate()?;
        if paths.is_empty() {
            return Err(SourceError::EmptyInput.into());
        }

        info!("Building AVI from {} images: {:?}", paths.len(), output_path);

        let config = self.config.clone();
        let paths = paths.to_vec();
        let target = output_path.clone();
        let outcome = task::spawn_blocking(move || write_avi(&config, &paths, &target)).await;
        let (result, created) = match outcome {
            Ok(build) => (build.result, build.created),
            Err(e) => (Err(ReelError::Io(io::Error::new(io::ErrorKind::Other, e.to_string()))), false),
        };

        self.finish(result, &output_path, created)
    }

    /// Encode images, in order, into an H.264 MP4 file through FFmpeg
    pub async fn encode_images_to_mp4<P: AsRef<Path>>(
        &self,
        paths: &[PathBuf],
        output_path: P,
    ) -> Result<EncodedVideo> {
        let output_path = output_path.as_ref().to_path_buf();
        self.config.validate()?;
        let first = paths.first().ok_or(SourceError::EmptyInput)?;
        let (width, height) = probe_dimensions(first)?;
        let fps = self.config.output.fps;

        let encoder = Mp4Encoder::new(self.config.mp4.clone(), fps);
        let (result, created) = match encoder.encode(paths, &output_path).await {
            Ok(()) => (output_info(&output_path, paths.len(), width, height, fps), true),
            Err(e) => {
                let ran = matches!(e, ReelError::Encode(EncodeError::EncodingFailed { .. }));
                (Err(e), ran)
            }
        };

        self.finish(result, &output_path, created)
    }

    /// `created` is true once this call has opened `output_path` for writing
    fn finish(&self, result: Result<EncodedVideo>, output_path: &Path, created: bool) -> Result<EncodedVideo> {
        match result {
            Ok(video) => {
                info!(
                    "Wrote {:?}: {} frames, {}x{} @ {} fps, {} KB",
                    video.path,
                    video.frame_count,
                    video.width,
                    video.height,
                    video.fps,
                    video.file_size / 1024
                );
                Ok(video)
            }
            Err(e) => {
                warn!("Conversion to {:?} failed: {}", output_path, e);
                if created && self.config.output.remove_partial_on_error && output_path.exists() {
                    if let Err(remove_err) = std::fs::remove_file(output_path) {
                        warn!("Failed to remove partial output {:?}: {}", output_path, remove_err);
                    } else {
                        debug!("Removed partial output {:?}", output_path);
                    }
                }
                Err(e)
            }
        }
    }
}

/// Result of a blocking AVI build
struct AviBuild {
    result: Result<EncodedVideo>,
    /// Whether the output file was created (and so truncated) by this build
    created: bool,
}

fn write_avi(config: &Config, paths: &[PathBuf], output_path: &Path) -> AviBuild {
    let options = match MuxerOptions::from_config(&config.avi) {
        Ok(options) => options,
        Err(e) => return AviBuild { result: Err(e), created: false },
    };

    let file = match File::create(output_path) {
        Ok(file) => file,
        Err(e) => return AviBuild { result: Err(e.into()), created: false },
    };

    AviBuild {
        result: mux_into(file, options, config, paths, output_path),
        created: true,
    }
}

fn mux_into(
    file: File,
    options: MuxerOptions,
    config: &Config,
    paths: &[PathBuf],
    output_path: &Path,
) -> Result<EncodedVideo> {
    let fps = config.output.fps;
    let mut muxer = AviMuxer::new(BufWriter::new(file), options);
    let report = FrameSourceAdapter::new(&config.source).run(paths, fps, &mut muxer)?;

    let file = muxer.into_inner().into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    drop(file);

    output_info(
        output_path,
        report.summary.frame_count,
        report.plan.width,
        report.plan.height,
        report.fps,
    )
}

fn output_info(path: &Path, frame_count: usize, width: u32, height: u32, fps: u32) -> Result<EncodedVideo> {
    let metadata = std::fs::metadata(path)?;
    Ok(EncodedVideo {
        path: path.to_path_buf(),
        frame_count,
        width,
        height,
        fps,
        file_size: metadata.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avi::{AviInspection, RiffSizing};
    use crate::error::ErrorKind;
    use crate::source::FrameLengthPolicy;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn write_jpegs(dir: &Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("frame_{:03}.jpg", i));
                RgbImage::from_pixel(40, 30, Rgb([i as u8 * 20, 90, 200])).save(&path).unwrap();
                path
            })
            .collect()
    }

    #[tokio::test]
    async fn test_avi_file_matches_sources() {
        let dir = tempdir().unwrap();
        let paths = write_jpegs(dir.path(), 4);
        let output = dir.path().join("out.avi");

        let mut config = Config::default();
        config.output.fps = 12;
        let engine = ConversionEngine::new(config);
        let video = engine.encode_images_to_avi(&paths, &output).await.unwrap();

        assert_eq!(video.frame_count, 4);
        assert_eq!((video.width, video.height, video.fps), (40, 30, 12));

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(video.file_size, bytes.len() as u64);

        let sources: Vec<Vec<u8>> = paths.iter().map(|p| std::fs::read(p).unwrap()).collect();
        let payload: usize = sources.iter().map(Vec::len).sum();
        assert_eq!(bytes.len(), 224 + 8 * 4 + payload + 8 + 16 * 4);

        let mut file = File::open(&output).unwrap();
        let info = AviInspection::read(&mut file).unwrap();
        assert_eq!(info.rate, 12);
        assert_eq!(info.read_frames(&mut file).unwrap(), sources);
    }

    #[tokio::test]
    async fn test_configured_policies_reach_the_file() {
        let dir = tempdir().unwrap();
        let paths = write_jpegs(dir.path(), 2);
        let output = dir.path().join("legacy.avi");

        let mut config = Config::default();
        config.avi.codec = "JPEG".to_string();
        config.avi.riff_sizing = RiffSizing::Canonical;
        config.source.frame_length = FrameLengthPolicy::FixedCapacity;
        let engine = ConversionEngine::new(config);
        engine.encode_images_to_avi(&paths, &output).await.unwrap();

        let bytes = std::fs::read(&output).unwrap();
        let info = AviInspection::read(&mut std::io::Cursor::new(&bytes)).unwrap();
        assert_eq!(info.codec.to_string(), "JPEG");
        assert_eq!(info.riff_size as usize, bytes.len() - 8);
        assert!(info.index.iter().all(|e| e.size % 4 == 0));
    }

    #[tokio::test]
    async fn test_failed_build_removes_partial_file() {
        let dir = tempdir().unwrap();
        let mut paths = write_jpegs(dir.path(), 2);
        paths.push(dir.path().join("missing.jpg"));
        let output = dir.path().join("broken.avi");

        let engine = ConversionEngine::new(Config::default());
        let err = engine.encode_images_to_avi(&paths, &output).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_failed_build_can_keep_partial_file() {
        let dir = tempdir().unwrap();
        let mut paths = write_jpegs(dir.path(), 1);
        paths.push(dir.path().join("missing.jpg"));
        let output = dir.path().join("kept.avi");

        let mut config = Config::default();
        config.output.remove_partial_on_error = false;
        let engine = ConversionEngine::new(config);
        assert!(engine.encode_images_to_avi(&paths, &output).await.is_err());
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_missing_tool_keeps_existing_output() {
        let dir = tempdir().unwrap();
        let paths = write_jpegs(dir.path(), 2);
        let output = dir.path().join("keep.mp4");
        std::fs::write(&output, b"user data").unwrap();

        let mut config = Config::default();
        config.mp4.ffmpeg_path = dir.path().join("no-ffmpeg").display().to_string();
        let engine = ConversionEngine::new(config);
        let err = engine.encode_images_to_mp4(&paths, &output).await.unwrap_err();

        assert!(matches!(err, ReelError::Encode(EncodeError::ToolUnavailable { .. })));
        assert_eq!(std::fs::read(&output).unwrap(), b"user data");
    }

    #[tokio::test]
    async fn test_unopenable_output_is_left_alone() {
        let dir = tempdir().unwrap();
        let paths = write_jpegs(dir.path(), 1);
        let output = dir.path().join("clips.avi");
        std::fs::create_dir(&output).unwrap();
        std::fs::write(output.join("inside.txt"), b"x").unwrap();

        let engine = ConversionEngine::new(Config::default());
        let err = engine.encode_images_to_avi(&paths, &output).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert!(output.join("inside.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_encoder_run_removes_its_output() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let paths = write_jpegs(dir.path(), 2);
        let output = dir.path().join("partial.mp4");

        // Answers the version check, then leaves a partial file and fails
        let tool = dir.path().join("fake-ffmpeg");
        std::fs::write(
            &tool,
            "#!/bin/sh\n[ \"$1\" = \"-version\" ] && exit 0\nfor last; do :; done\necho partial > \"$last\"\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = Config::default();
        config.mp4.ffmpeg_path = tool.display().to_string();
        let engine = ConversionEngine::new(config);
        let err = engine.encode_images_to_mp4(&paths, &output).await.unwrap_err();

        assert!(matches!(err, ReelError::Encode(EncodeError::EncodingFailed { .. })));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_empty_path_list() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("none.avi");
        let engine = ConversionEngine::new(Config::default());

        let err = engine.encode_images_to_avi(&[], &output).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(!output.exists());

        let err = engine.encode_images_to_mp4(&[], dir.path().join("none.mp4")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let dir = tempdir().unwrap();
        let paths = write_jpegs(dir.path(), 1);

        let mut config = Config::default();
        config.output.fps = 0;
        let engine = ConversionEngine::new(config);
        let err = engine.encode_images_to_avi(&paths, dir.path().join("x.avi")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
