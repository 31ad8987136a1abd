pub mod depth_buffer;
pub mod grid;
pub mod orientation;
pub mod overlay;
pub mod sampler;
pub mod style;
pub mod surface;
pub mod utils;
