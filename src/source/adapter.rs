use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use image::ImageFormat;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::avi::AviMuxer;
use crate::config::SourceConfig;
use crate::error::{Result, SourceError};
use crate::source::types::{FrameLengthPolicy, SourcePlan, SourceReport, VideoFrame};

/// Feeds an ordered list of encoded images into an [`AviMuxer`]
///
/// Images are read ahead in batches of `prefetch_depth` on the rayon pool;
/// each batch comes back in input order and is drained by the calling
/// thread, which is the only one touching the muxer.
#[derive(Debug, Clone)]
pub struct FrameSourceAdapter {
    policy: FrameLengthPolicy,
    prefetch_depth: usize,
    strict_dimensions: bool,
}

impl Default for FrameSourceAdapter {
    fn default() -> Self {
        Self::new(&SourceConfig::default())
    }
}

impl FrameSourceAdapter {
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            policy: config.frame_length,
            prefetch_depth: config.prefetch_depth.max(1),
            strict_dimensions: config.strict_dimensions,
        }
    }

    /// Inspect the first image: byte length, chunk capacity and dimensions
    pub fn plan<P: AsRef<Path>>(&self, paths: &[P]) -> Result<SourcePlan> {
        let first = paths.first().ok_or(SourceError::EmptyInput)?.as_ref();

        let first_len = file_len(first)?;
        if first_len == 0 {
            return Err(SourceError::EmptyFirstImage {
                path: first.display().to_string(),
            }
            .into());
        }

        let capacity = usize::try_from(first_len.next_multiple_of(4)).map_err(|_| {
            SourceError::ProbeFailed {
                path: first.display().to_string(),
                reason: format!("{} bytes does not fit in memory", first_len),
            }
        })?;
        let (width, height) = probe_dimensions(first)?;

        debug!(
            "First image {:?}: {} bytes (capacity {}), {}x{}",
            first, first_len, capacity, width, height
        );

        Ok(SourcePlan {
            first_len,
            capacity,
            width,
            height,
        })
    }

    /// Read one image according to the length policy
    pub fn read_frame(&self, index: usize, path: &Path, plan: &SourcePlan) -> Result<VideoFrame> {
        let read_failed = |source| SourceError::ReadFailed {
            path: path.display().to_string(),
            source,
        };

        let mut file = File::open(path).map_err(read_failed)?;
        let source_len = file.metadata().map_err(read_failed)?.len();

        let payload = match self.policy {
            FrameLengthPolicy::Exact => {
                let mut payload = Vec::with_capacity(source_len as usize);
                file.read_to_end(&mut payload).map_err(read_failed)?;
                payload
            }
            FrameLengthPolicy::FixedCapacity => {
                let mut payload = Vec::with_capacity(plan.capacity);
                (&mut file)
                    .take(plan.capacity as u64)
                    .read_to_end(&mut payload)
                    .map_err(read_failed)?;
                payload.resize(plan.capacity, 0);
                payload
            }
        };

        if !matches!(image::guess_format(&payload), Ok(ImageFormat::Jpeg)) {
            return Err(SourceError::UnsupportedFormat {
                path: path.display().to_string(),
                expected: "JPEG".to_string(),
            }
            .into());
        }

        let frame = VideoFrame {
            index,
            path: path.to_path_buf(),
            payload,
            source_len,
        };

        if frame.is_truncated() {
            warn!(
                "Frame {} ({:?}) is {} bytes, cut to {}",
                index,
                path,
                source_len,
                frame.declared_len()
            );
        }

        if index > 0 {
            self.check_dimensions(path, plan)?;
        }

        Ok(frame)
    }

    /// Init the muxer, append every image in order, then finalize
    pub fn run<P, W>(&self, paths: &[P], fps: u32, muxer: &mut AviMuxer<W>) -> Result<SourceReport>
    where
        P: AsRef<Path> + Sync,
        W: Write + Seek,
    {
        let plan = self.plan(paths)?;
        muxer.init()?;

        let batches = paths.len().div_ceil(self.prefetch_depth);
        for (batch_no, batch) in paths.chunks(self.prefetch_depth).enumerate() {
            let base = batch_no * self.prefetch_depth;

            let frames: Vec<Result<VideoFrame>> = batch
                .par_iter()
                .enumerate()
                .map(|(offset, path)| self.read_frame(base + offset, path.as_ref(), &plan))
                .collect();

            for frame in frames {
                let frame = frame?;
                muxer.append_frame(&frame.payload)?;
            }

            debug!("Batch {}/{} muxed ({} frames)", batch_no + 1, batches, batch.len());
        }

        let summary = muxer.finalize(plan.width, plan.height, fps)?;
        info!(
            "Muxed {} frames ({} payload bytes, {:?} lengths)",
            summary.frame_count, summary.payload_bytes, self.policy
        );

        Ok(SourceReport { plan, fps, summary })
    }

    fn check_dimensions(&self, path: &Path, plan: &SourcePlan) -> Result<()> {
        let actual = probe_dimensions(path)?;
        let expected = (plan.width, plan.height);
        if actual == expected {
            return Ok(());
        }

        if self.strict_dimensions {
            Err(SourceError::DimensionMismatch {
                path: path.display().to_string(),
                expected,
                actual,
            }
            .into())
        } else {
            warn!("Image {:?} is {:?}, header says {:?}", path, actual, expected);
            Ok(())
        }
    }
}

fn file_len(path: &Path) -> Result<u64> {
    std::fs::metadata(path)
        .map(|meta| meta.len())
        .map_err(|source| {
            SourceError::ReadFailed {
                path: path.display().to_string(),
                source,
            }
            .into()
        })
}

/// Width and height from the image header, without decoding pixels
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32)> {
    image::image_dimensions(path).map_err(|e| match e {
        image::ImageError::IoError(source) => SourceError::ReadFailed {
            path: path.display().to_string(),
            source,
        }
        .into(),
        other => SourceError::ProbeFailed {
            path: path.display().to_string(),
            reason: other.to_string(),
        }
        .into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avi::{AviInspection, MuxerOptions};
    use crate::error::ErrorKind;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    fn write_jpeg(dir: &TempDir, name: &str, width: u32, height: u32, seed: u8) -> PathBuf {
        let path = dir.path().join(name);
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([seed.wrapping_add(x as u8), seed ^ (y as u8), seed.wrapping_mul(3)])
        });
        img.save(&path).unwrap();
        path
    }

    fn adapter(policy: FrameLengthPolicy, prefetch_depth: usize) -> FrameSourceAdapter {
        FrameSourceAdapter::new(&SourceConfig {
            frame_length: policy,
            prefetch_depth,
            strict_dimensions: true,
        })
    }

    fn run(adapter: &FrameSourceAdapter, paths: &[PathBuf], fps: u32) -> Result<(SourceReport, Vec<u8>)> {
        let mut muxer = AviMuxer::new(Cursor::new(Vec::new()), MuxerOptions::default());
        let report = adapter.run(paths, fps, &mut muxer)?;
        Ok((report, muxer.into_inner().into_inner()))
    }

    #[test]
    fn test_exact_lengths_preserve_files() {
        let dir = tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..5)
            .map(|i| write_jpeg(&dir, &format!("{:02}.jpg", i), 24, 16, i as u8 * 40))
            .collect();

        let (report, bytes) = run(&adapter(FrameLengthPolicy::Exact, 2), &paths, 24).unwrap();
        assert_eq!(report.summary.frame_count, 5);
        assert_eq!((report.plan.width, report.plan.height), (24, 16));

        let mut cursor = Cursor::new(&bytes);
        let info = AviInspection::read(&mut cursor).unwrap();
        assert_eq!((info.width, info.height), (24, 16));
        let frames = info.read_frames(&mut cursor).unwrap();
        for (frame, path) in frames.iter().zip(&paths) {
            assert_eq!(frame, &std::fs::read(path).unwrap());
        }
    }

    #[test]
    fn test_fixed_capacity_uses_first_length() {
        let dir = tempdir().unwrap();
        let first = write_jpeg(&dir, "a.jpg", 32, 32, 1);
        let second = write_jpeg(&dir, "b.jpg", 32, 32, 200);
        let paths = vec![first.clone(), second.clone()];

        let plan = adapter(FrameLengthPolicy::FixedCapacity, 4).plan(&paths).unwrap();
        let first_len = std::fs::metadata(&first).unwrap().len();
        assert_eq!(plan.first_len, first_len);
        assert_eq!(plan.capacity % 4, 0);
        assert!(plan.capacity as u64 >= first_len && (plan.capacity as u64) < first_len + 4);

        let (_, bytes) = run(&adapter(FrameLengthPolicy::FixedCapacity, 4), &paths, 24).unwrap();
        let info = AviInspection::read(&mut Cursor::new(&bytes)).unwrap();
        assert!(info.index.iter().all(|e| e.size as usize == plan.capacity));

        let mut cursor = Cursor::new(&bytes);
        let frames = info.read_frames(&mut cursor).unwrap();
        let original = std::fs::read(&first).unwrap();
        assert_eq!(&frames[0][..original.len()], &original[..]);
        assert!(frames[0][original.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_fixed_capacity_cuts_longer_frames() {
        let dir = tempdir().unwrap();
        let small = dir.path().join("small.jpg");
        let large = dir.path().join("large.jpg");
        let jpeg_like = |len: usize, fill: u8| {
            let mut bytes = vec![0xFF, 0xD8, 0xFF];
            bytes.resize(len, fill);
            bytes
        };
        std::fs::write(&small, jpeg_like(10, 7)).unwrap();
        std::fs::write(&large, jpeg_like(50, 9)).unwrap();
        let plan = SourcePlan { first_len: 10, capacity: 12, width: 1, height: 1 };

        let frame = adapter(FrameLengthPolicy::FixedCapacity, 1).read_frame(0, &large, &plan).unwrap();
        assert_eq!(frame.payload, jpeg_like(12, 9));
        assert!(frame.is_truncated());

        let frame = adapter(FrameLengthPolicy::FixedCapacity, 1).read_frame(0, &small, &plan).unwrap();
        assert_eq!(&frame.payload[..10], &jpeg_like(10, 7)[..]);
        assert_eq!(&frame.payload[10..], &[0u8, 0u8]);
        assert!(!frame.is_truncated());
    }

    #[test]
    fn test_empty_input_is_invalid_argument() {
        let paths: Vec<PathBuf> = Vec::new();
        let err = run(&adapter(FrameLengthPolicy::Exact, 1), &paths, 24).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_empty_first_image_is_invalid_state() {
        let dir = tempdir().unwrap();
        let empty = dir.path().join("empty.jpg");
        std::fs::write(&empty, b"").unwrap();

        let err = adapter(FrameLengthPolicy::Exact, 1).plan(&[empty]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_missing_file_is_io_failure() {
        let dir = tempdir().unwrap();
        let first = write_jpeg(&dir, "a.jpg", 8, 8, 3);
        let paths = vec![first, dir.path().join("gone.jpg")];

        let err = run(&adapter(FrameLengthPolicy::Exact, 2), &paths, 24).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn test_non_jpeg_images_are_rejected() {
        let dir = tempdir().unwrap();
        let png = dir.path().join("a.png");
        RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])).save(&png).unwrap();
        let paths = vec![png.clone(), png];

        let mut muxer = AviMuxer::new(Cursor::new(Vec::new()), MuxerOptions::default());
        let err = adapter(FrameLengthPolicy::Exact, 2).run(&paths, 24, &mut muxer).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ReelError::Source(SourceError::UnsupportedFormat { .. })
        ));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(muxer.frame_count(), 0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let dir = tempdir().unwrap();
        let paths = vec![
            write_jpeg(&dir, "a.jpg", 16, 16, 1),
            write_jpeg(&dir, "b.jpg", 32, 16, 2),
        ];

        let err = run(&adapter(FrameLengthPolicy::Exact, 2), &paths, 24).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ReelError::Source(SourceError::DimensionMismatch { actual: (32, 16), .. })
        ));

        let lenient = FrameSourceAdapter::new(&SourceConfig {
            frame_length: FrameLengthPolicy::Exact,
            prefetch_depth: 2,
            strict_dimensions: false,
        });
        let (report, _) = run(&lenient, &paths, 24).unwrap();
        assert_eq!(report.summary.frame_count, 2);
        assert_eq!((report.plan.width, report.plan.height), (16, 16));
    }

    #[test]
    fn test_order_survives_parallel_prefetch() {
        let dir = tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..9)
            .map(|i| write_jpeg(&dir, &format!("{}.jpg", i), 8, 8, i as u8 * 25))
            .collect();

        let (_, bytes) = run(&adapter(FrameLengthPolicy::Exact, 4), &paths, 10).unwrap();
        let mut cursor = Cursor::new(&bytes);
        let info = AviInspection::read(&mut cursor).unwrap();
        let frames = info.read_frames(&mut cursor).unwrap();

        let expected: Vec<Vec<u8>> = paths.iter().map(|p| std::fs::read(p).unwrap()).collect();
        assert_eq!(frames, expected);
    }
}
