use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::{
    avi::{FourCC, RiffSizing},
    error::{ConfigError, Result},
    source::FrameLengthPolicy,
};

/// Main configuration for reelwright
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AVI container settings
    pub avi: AviConfig,

    /// Source image reading settings
    pub source: SourceConfig,

    /// Output settings shared by both paths
    pub output: OutputConfig,

    /// External encoder settings for the MP4 path
    pub mp4: Mp4Config,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.avi.validate()?;
        self.source.validate()?;
        self.output.validate()?;
        self.mp4.validate()?;
        Ok(())
    }
}

/// AVI container configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AviConfig {
    /// Codec FourCC written to strh.codec and strf.compression
    pub codec: String,

    /// How the top-level RIFF size is computed
    pub riff_sizing: RiffSizing,

    /// avih.maxBytesPerSec
    pub max_bytes_per_sec: u32,

    /// avih.suggestedBufferSize
    pub suggested_buffer_size: u32,
}

impl Default for AviConfig {
    fn default() -> Self {
        Self {
            codec: "MJPG".to_string(),
            riff_sizing: RiffSizing::Legacy,
            max_bytes_per_sec: 25_000,
            suggested_buffer_size: 100_000,
        }
    }
}

impl AviConfig {
    /// Codec tag as a FourCC. Only valid after `validate`.
    pub fn codec_fourcc(&self) -> Result<FourCC> {
        FourCC::parse(&self.codec).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "avi.codec".to_string(),
                value: self.codec.clone(),
            }
            .into()
        })
    }

    fn validate(&self) -> Result<()> {
        self.codec_fourcc()?;
        Ok(())
    }
}

/// Source image reading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Payload length policy for each frame
    pub frame_length: FrameLengthPolicy,

    /// Number of images read ahead of the writer
    pub prefetch_depth: usize,

    /// Reject images whose dimensions differ from the first one
    pub strict_dimensions: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            frame_length: FrameLengthPolicy::Exact,
            prefetch_depth: num_cpus::get(),
            strict_dimensions: true,
        }
    }
}

impl SourceConfig {
    fn validate(&self) -> Result<()> {
        if self.prefetch_depth == 0 {
            return Err(ConfigError::InvalidValue {
                key: "source.prefetch_depth".to_string(),
                value: self.prefetch_depth.to_string()
            }.into());
        }

        Ok(())
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Frames per second
    pub fps: u32,

    /// Delete a half-written output file when a build fails
    pub remove_partial_on_error: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            fps: 24,
            remove_partial_on_error: true,
        }
    }
}

impl OutputConfig {
    fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(ConfigError::InvalidValue {
                key: "output.fps".to_string(),
                value: self.fps.to_string()
            }.into());
        }

        Ok(())
    }
}

/// External encoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Mp4Config {
    /// Path or name of the ffmpeg executable
    pub ffmpeg_path: String,

    /// Video codec passed to `-c:v`
    pub codec: String,

    /// Encoder preset
    pub preset: String,

    /// Quality setting (0-100, higher is better)
    pub quality: u8,

    /// Output pixel format
    pub pixel_format: String,
}

impl Default for Mp4Config {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            codec: "libx264".to_string(),
            preset: "veryslow".to_string(),
            quality: 85,
            pixel_format: "yuv420p".to_string(),
        }
    }
}

impl Mp4Config {
    fn validate(&self) -> Result<()> {
        if self.quality > 100 {
            return Err(ConfigError::InvalidValue {
                key: "mp4.quality".to_string(),
                value: self.quality.to_string()
            }.into());
        }

        if self.ffmpeg_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "mp4.ffmpeg_path".to_string(),
                value: self.ffmpeg_path.clone()
            }.into());
        }

        Ok(())
    }
}
