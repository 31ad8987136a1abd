//! Visual configuration for markers and depth labels.

use crate::errors::{OverlayError, OverlayResult};
use image::Rgba;
use serde::{Deserialize, Serialize};

/// An RGBA color, serialized as `[r, g, b, a]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u8; 4]", into = "[u8; 4]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

impl From<[u8; 4]> for Color {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

impl From<Color> for [u8; 4] {
    fn from(color: Color) -> Self {
        [color.r, color.g, color.b, color.a]
    }
}

/// Which samples get a text label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPolicy {
    #[default]
    All,
    /// Only samples at or under the near threshold are labelled.
    NearOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// Marker radius in image pixels.
    pub marker_radius: f32,
    /// Marker fill when `color_by_distance` is off.
    pub marker_fill_color: Color,
    pub marker_stroke_color: Option<Color>,
    /// Label height in image pixels.
    pub font_size: f32,
    pub text_color: Color,
    pub near_color: Color,
    pub far_color: Color,
    pub near_threshold_meters: f32,
    /// Label origin relative to the marker center, in image pixels.
    pub text_offset: (f32, f32),
    pub color_by_distance: bool,
    pub show_unit: bool,
    pub label_policy: LabelPolicy,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            marker_radius: 0.75,
            marker_fill_color: Color::WHITE,
            marker_stroke_color: None,
            font_size: 7.5,
            text_color: Color::GREEN,
            near_color: Color::GREEN,
            far_color: Color::RED,
            near_threshold_meters: 5.0,
            text_offset: (-10.0, -15.0),
            color_by_distance: true,
            show_unit: true,
            label_policy: LabelPolicy::All,
        }
    }
}

impl OverlayStyle {
    pub fn validate(&self) -> OverlayResult<()> {
        if !self.marker_radius.is_finite() || self.marker_radius < 0.0 {
            return Err(OverlayError::InvalidConfiguration(format!(
                "marker radius must be a non-negative number, got {}",
                self.marker_radius
            )));
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(OverlayError::InvalidConfiguration(format!(
                "font size must be positive, got {}",
                self.font_size
            )));
        }
        if !self.near_threshold_meters.is_finite() || self.near_threshold_meters < 0.0 {
            return Err(OverlayError::InvalidConfiguration(format!(
                "near threshold must be a non-negative distance, got {}",
                self.near_threshold_meters
            )));
        }
        if !self.text_offset.0.is_finite() || !self.text_offset.1.is_finite() {
            return Err(OverlayError::InvalidConfiguration(format!(
                "text offset must be finite, got {:?}",
                self.text_offset
            )));
        }
        Ok(())
    }

    /// True when `depth` is classed as near. The sentinel is always far.
    pub fn is_near(&self, depth: f32) -> bool {
        (0.0..=self.near_threshold_meters).contains(&depth)
    }
}
