// THEORY:
// This file is the main entry point for the `depth_overlay` library crate.
// The public surface is the `DepthOverlayPipeline` and its configuration and
// report types, plus the `frame_loop` driver that connects the pipeline to a
// capture source and a display. The building blocks in `core_modules` (grid,
// sampler, renderer, drawing surface) are public too, for hosts that want to
// compose their own per-frame flow.

pub mod config;
pub mod core_modules;
pub mod errors;
pub mod frame_loop;
pub mod pipeline;

pub use crate::config::PipelineConfig;
pub use crate::errors::{ConfigError, OverlayError, OverlayResult};
pub use crate::pipeline::{DepthOverlayPipeline, Report};
