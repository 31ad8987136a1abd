//! Error types for the depth overlay engine.
//!
//! Out-of-bounds samples are not errors: they surface as the depth sentinel
//! inside the sample sequence. Everything here is fatal to a single call.

use crate::core_modules::depth_buffer::DepthPixelFormat;
use thiserror::Error;

/// Result type alias using OverlayError
pub type OverlayResult<T> = Result<T, OverlayError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OverlayError {
    /// Non-positive grid dimensions or an inconsistent style.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A caller broke a call contract, e.g. point/value length mismatch.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The host delivered depth in a format the sampler cannot read.
    #[error("unsupported depth pixel format: {0:?}")]
    UnsupportedPixelFormat(DepthPixelFormat),
    /// Declared dimensions or stride do not fit the provided bytes.
    #[error("invalid depth buffer layout: {0}")]
    InvalidDepthLayout(String),
    /// The label font could not be parsed.
    #[error("label font unavailable: {0}")]
    Font(String),
}

/// Errors raised while loading a `PipelineConfig` from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] OverlayError),
}
