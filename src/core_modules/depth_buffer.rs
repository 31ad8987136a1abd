// THEORY:
// The `depth_buffer` module is the only place that touches raw depth memory.
// A depth sensor hands over a pixel buffer it owns: a base address, a stride
// (bytes per row) that may include padding, a declared pixel format, and a
// lock that must be held while the bytes are read.
//
// Key architectural principles:
// 1.  **Validated View**: `DepthBuffer` is built once per frame from a byte slice
//     and its declared layout. Construction rejects any layout that would let a
//     read run past the slice, so every later access is a plain bounds check.
// 2.  **Scoped Access**: `with_locked_depth` acquires the host lock through an
//     RAII guard, hands a borrowed view to a closure, and releases the lock when
//     the guard drops. The closure cannot return the view, so nothing keeps a
//     reference to host memory once the callback is over.
// 3.  **Read-Only**: The view never mutates the samples it reads.

use crate::errors::{OverlayError, OverlayResult};
use image::{Rgba, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Size in bytes of one `DepthFloat32` sample.
pub const BYTES_PER_SAMPLE: usize = std::mem::size_of::<f32>();

/// Pixel formats a host depth map can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthPixelFormat {
    /// 32-bit float distance in meters. The only format the sampler reads.
    DepthFloat32,
    /// 16-bit half float distance in meters.
    DepthFloat16,
    /// 32-bit float inverse distance.
    DisparityFloat32,
}

/// A bounds-checked, read-only view over one frame of depth samples (meters).
#[derive(Debug, Clone, Copy)]
pub struct DepthBuffer<'a> {
    bytes: &'a [u8],
    width: usize,
    height: usize,
    bytes_per_row: usize,
}

impl<'a> DepthBuffer<'a> {
    /// Validates a raw host layout and wraps it.
    pub fn new(
        bytes: &'a [u8],
        width: usize,
        height: usize,
        bytes_per_row: usize,
        format: DepthPixelFormat,
    ) -> OverlayResult<Self> {
        if format != DepthPixelFormat::DepthFloat32 {
            return Err(OverlayError::UnsupportedPixelFormat(format));
        }
        if width == 0 || height == 0 {
            return Err(OverlayError::InvalidDepthLayout(format!(
                "empty depth map ({width}x{height})"
            )));
        }
        let row_bytes = width
            .checked_mul(BYTES_PER_SAMPLE)
            .ok_or_else(|| OverlayError::InvalidDepthLayout("row size overflows".into()))?;
        if bytes_per_row < row_bytes {
            return Err(OverlayError::InvalidDepthLayout(format!(
                "stride {bytes_per_row} is smaller than a row of {width} samples ({row_bytes} bytes)"
            )));
        }
        let required = bytes_per_row
            .checked_mul(height - 1)
            .and_then(|padded| padded.checked_add(row_bytes))
            .ok_or_else(|| OverlayError::InvalidDepthLayout("buffer size overflows".into()))?;
        if bytes.len() < required {
            return Err(OverlayError::InvalidDepthLayout(format!(
                "{} bytes provided, {required} required for {width}x{height} with stride {bytes_per_row}",
                bytes.len()
            )));
        }

        Ok(Self {
            bytes,
            width,
            height,
            bytes_per_row,
        })
    }

    /// Wraps tightly packed samples in row-major order.
    pub fn from_samples(samples: &'a [f32], width: usize, height: usize) -> OverlayResult<Self> {
        let bytes: &'a [u8] = bytemuck::cast_slice(samples);
        Self::new(
            bytes,
            width,
            height,
            width.saturating_mul(BYTES_PER_SAMPLE),
            DepthPixelFormat::DepthFloat32,
        )
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Reads the sample at pixel `(x, y)`, or `None` outside the buffer.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y * self.bytes_per_row + x * BYTES_PER_SAMPLE;
        let raw = self.bytes.get(offset..offset + BYTES_PER_SAMPLE)?;
        Some(bytemuck::pod_read_unaligned::<f32>(raw))
    }

    /// Renders the depth map as grayscale: 0 m is black, `max_depth` and
    /// beyond are white. Invalid readings render black.
    pub fn to_preview(&self, max_depth: f32) -> RgbaImage {
        let scale = if max_depth > 0.0 { 1.0 / max_depth } else { 0.0 };
        RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let depth = self.get(x as usize, y as usize).unwrap_or(f32::NAN);
            let level = if depth.is_finite() && depth >= 0.0 {
                ((depth * scale).clamp(0.0, 1.0) * 255.0).round() as u8
            } else {
                0
            };
            Rgba([level, level, level, 255])
        })
    }
}

/// The host-side depth pixel buffer, as delivered by the capture subsystem.
///
/// `base_bytes` is only meaningful between `lock_base_address` and
/// `unlock_base_address`.
pub trait LockableDepthMap {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn bytes_per_row(&self) -> usize;
    fn pixel_format(&self) -> DepthPixelFormat;
    fn lock_base_address(&self);
    fn unlock_base_address(&self);
    fn base_bytes(&self) -> &[u8];
}

/// Holds the host base-address lock; releases it on drop.
pub struct BaseAddressLock<'a, M: LockableDepthMap + ?Sized> {
    map: &'a M,
}

impl<'a, M: LockableDepthMap + ?Sized> BaseAddressLock<'a, M> {
    pub fn acquire(map: &'a M) -> Self {
        map.lock_base_address();
        Self { map }
    }

    pub fn bytes(&self) -> &[u8] {
        self.map.base_bytes()
    }
}

impl<M: LockableDepthMap + ?Sized> Drop for BaseAddressLock<'_, M> {
    fn drop(&mut self) {
        self.map.unlock_base_address();
    }
}

/// Locks `map`, validates it into a `DepthBuffer`, and runs `read` on it.
///
/// The lock is released before this returns, whether validation failed or
/// `read` completed.
pub fn with_locked_depth<M, R, F>(map: &M, read: F) -> OverlayResult<R>
where
    M: LockableDepthMap + ?Sized,
    F: FnOnce(&DepthBuffer<'_>) -> R,
{
    let lock = BaseAddressLock::acquire(map);
    let buffer = DepthBuffer::new(
        lock.bytes(),
        map.width(),
        map.height(),
        map.bytes_per_row(),
        map.pixel_format(),
    )?;
    Ok(read(&buffer))
}

/// A Vec-backed depth map for host integrations that copy depth out of the
/// capture callback, and for tests.
#[derive(Debug)]
pub struct OwnedDepthMap {
    samples: Vec<f32>,
    width: usize,
    height: usize,
    active_locks: AtomicUsize,
    total_locks: AtomicUsize,
}

impl OwnedDepthMap {
    pub fn new(samples: Vec<f32>, width: usize, height: usize) -> OverlayResult<Self> {
        if samples.len() != width * height {
            return Err(OverlayError::InvalidDepthLayout(format!(
                "{} samples provided for a {width}x{height} map",
                samples.len()
            )));
        }
        Ok(Self {
            samples,
            width,
            height,
            active_locks: AtomicUsize::new(0),
            total_locks: AtomicUsize::new(0),
        })
    }

    /// Builds a map by evaluating `depth_at(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, mut depth_at: impl FnMut(usize, usize) -> f32) -> Self {
        let mut samples = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                samples.push(depth_at(x, y));
            }
        }
        Self {
            samples,
            width,
            height,
            active_locks: AtomicUsize::new(0),
            total_locks: AtomicUsize::new(0),
        }
    }

    /// Decodes a raw little-endian f32 dump, as written by depth recorders.
    pub fn from_le_bytes(bytes: &[u8], width: usize, height: usize) -> OverlayResult<Self> {
        if bytes.len() % BYTES_PER_SAMPLE != 0 {
            return Err(OverlayError::InvalidDepthLayout(format!(
                "{} bytes is not a whole number of f32 samples",
                bytes.len()
            )));
        }
        let samples = bytes
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|raw| f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
            .collect();
        Self::new(samples, width, height)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of locks currently held.
    pub fn active_locks(&self) -> usize {
        self.active_locks.load(Ordering::Acquire)
    }

    /// Number of times the map has been locked.
    pub fn total_locks(&self) -> usize {
        self.total_locks.load(Ordering::Acquire)
    }
}

impl LockableDepthMap for OwnedDepthMap {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn bytes_per_row(&self) -> usize {
        self.width * BYTES_PER_SAMPLE
    }

    fn pixel_format(&self) -> DepthPixelFormat {
        DepthPixelFormat::DepthFloat32
    }

    fn lock_base_address(&self) {
        self.active_locks.fetch_add(1, Ordering::AcqRel);
        self.total_locks.fetch_add(1, Ordering::AcqRel);
    }

    fn unlock_base_address(&self) {
        self.active_locks.fetch_sub(1, Ordering::AcqRel);
    }

    fn base_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.samples)
    }
}
