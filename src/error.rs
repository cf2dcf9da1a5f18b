use thiserror::Error;

/// Main error type for the reelwright library
#[derive(Error, Debug)]
pub enum ReelError {
    #[error("AVI muxing error: {0}")]
    Mux(#[from] MuxError),

    #[error("Frame source error: {0}")]
    Source(#[from] SourceError),

    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Broad failure category every error maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidState,
    IoFailure,
    FormatInvariant,
}

/// Muxer state machine and argument errors
#[derive(Error, Debug)]
pub enum MuxError {
    #[error("Cannot {operation} while muxer is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Invalid muxer argument: {details}")]
    InvalidArgument { details: String },
}

/// Errors raised while reading source images
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("No source images were given")]
    EmptyInput,

    #[error("First image is empty: {path}")]
    EmptyFirstImage { path: String },

    #[error("Failed to read image {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to probe image {path}: {reason}")]
    ProbeFailed { path: String, reason: String },

    #[error("Image {path} is not a supported format (expected {expected})")]
    UnsupportedFormat { path: String, expected: String },

    #[error("Image {path} is {actual:?}, expected {expected:?}")]
    DimensionMismatch {
        path: String,
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// External encoder errors (MP4 path)
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Encoder tool not available: {tool}")]
    ToolUnavailable { tool: String },

    #[error("Failed to launch encoder: {reason}")]
    LaunchFailed { reason: String },

    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },
}

/// Binary layout violations
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("{field} value {value} does not fit in 32 bits")]
    SizeOverflow { field: &'static str, value: u64 },

    #[error("Writer is at byte {actual}, ledger expects {expected}")]
    PositionMismatch { expected: u64, actual: u64 },

    #[error("Malformed AVI file: {reason}")]
    Malformed { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using ReelError
pub type Result<T> = std::result::Result<T, ReelError>;

impl ReelError {
    /// Category of this failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Mux(MuxError::InvalidState { .. }) => ErrorKind::InvalidState,
            Self::Mux(MuxError::InvalidArgument { .. }) => ErrorKind::InvalidArgument,
            Self::Source(SourceError::EmptyInput) => ErrorKind::InvalidArgument,
            Self::Source(SourceError::EmptyFirstImage { .. }) => ErrorKind::InvalidState,
            Self::Source(SourceError::ReadFailed { .. }) => ErrorKind::IoFailure,
            Self::Source(SourceError::ProbeFailed { .. }) => ErrorKind::InvalidArgument,
            Self::Source(SourceError::UnsupportedFormat { .. }) => ErrorKind::InvalidArgument,
            Self::Source(SourceError::DimensionMismatch { .. }) => ErrorKind::InvalidArgument,
            Self::Encode(_) => ErrorKind::IoFailure,
            Self::Format(_) => ErrorKind::FormatInvariant,
            Self::Config(_) => ErrorKind::InvalidArgument,
            Self::Io(_) => ErrorKind::IoFailure,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Source(SourceError::EmptyInput) => {
                "No images to convert. Pass image files or a directory containing JPEG images.".to_string()
            }
            Self::Source(SourceError::ReadFailed { path, .. }) => {
                format!("Could not read image '{}'. Please check the file exists and is readable.", path)
            }
            Self::Encode(EncodeError::ToolUnavailable { tool }) => {
                format!("'{}' was not found. Install FFmpeg or set mp4.ffmpeg_path in the configuration.", tool)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
