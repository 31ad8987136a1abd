//! Tunable configuration for the overlay pipeline.
//!
//! Every field has a default, so a JSON file only needs the keys it changes:
//!
//! ```json
//! { "grid": { "rows": 8, "cols": 8 }, "style": { "near_threshold_meters": 1.5 } }
//! ```

use crate::core_modules::grid::GridSpec;
use crate::core_modules::orientation::Orientation;
use crate::core_modules::style::OverlayStyle;
use crate::errors::{ConfigError, OverlayError, OverlayResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which image the annotations are drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayBase {
    /// The camera color frame.
    #[default]
    Color,
    /// A grayscale rendering of the depth map itself.
    DepthPreview,
}

/// Configuration for the DepthOverlayPipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub grid: GridSpec,
    pub orientation: Orientation,
    pub style: OverlayStyle,
    pub base: OverlayBase,
    /// Crop displayed frames to their centered square. Sampling follows the
    /// crop so markers stay over the depth they report.
    pub crop_to_square: bool,
    /// Depth rendered white in the depth preview, in meters.
    pub preview_max_depth: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            grid: GridSpec::default(),
            orientation: Orientation::Up,
            style: OverlayStyle::default(),
            base: OverlayBase::Color,
            crop_to_square: false,
            preview_max_depth: 5.0,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> OverlayResult<()> {
        self.grid.points()?;
        self.style.validate()?;
        if !self.preview_max_depth.is_finite() || self.preview_max_depth <= 0.0 {
            return Err(OverlayError::InvalidConfiguration(format!(
                "preview max depth must be positive, got {}",
                self.preview_max_depth
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
