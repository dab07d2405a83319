// src/framebuffer.rs
//! Frame buffers and the surface that allocates them.
//!
//! A `FrameBuffer` is a plain RGBA8 pixel store. The processing loop asks a
//! `SurfaceFactory` for two of them at start-up and ping-pongs between them;
//! pixel data is never copied between the two.

use crate::color::Rgba;
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};

pub const BYTES_PER_PIXEL: usize = 4;

/// A half-open pixel rectangle: `x0..x1` by `y0..y1`.
///
/// Coordinates may lie outside any buffer; fills clip against the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

impl PixelRect {
    pub const fn new(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Returns the same rectangle with `x0 <= x1` and `y0 <= y1`.
    pub fn normalized(self) -> Self {
        Self {
            x0: self.x0.min(self.x1),
            y0: self.y0.min(self.y1),
            x1: self.x0.max(self.x1),
            y1: self.y0.max(self.y1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    /// Intersection with `other`; may be empty.
    pub fn intersect(&self, other: &PixelRect) -> PixelRect {
        PixelRect {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        }
    }
}

/// An RGBA8 drawing surface.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Box<[u8]>,
}

impl FrameBuffer {
    /// Allocates a zeroed (transparent black) buffer.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        Self {
            width,
            height,
            pixels: vec![0u8; len].into_boxed_slice(),
        }
    }

    /// Allocates a zeroed buffer, reporting sizes that overflow or cannot be
    /// allocated as errors.
    pub fn try_new(width: u32, height: u32) -> Result<Self> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| anyhow!("{}x{} frame buffer size overflows", width, height))?;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .with_context(|| format!("Failed to allocate {}x{} frame buffer", width, height))?;
        pixels.resize(len, 0u8);
        Ok(Self {
            width,
            height,
            pixels: pixels.into_boxed_slice(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The whole buffer as a rectangle.
    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width as i64, self.height as i64)
    }

    /// Raw RGBA bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Reads one pixel. Returns `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        Some(Rgba::from_bytes(&self.pixels[offset..offset + BYTES_PER_PIXEL]))
    }

    /// Fills `rect`, clipped to the buffer, with `color`.
    pub fn fill_rect(&mut self, rect: PixelRect, color: Rgba) {
        let clipped = rect.intersect(&self.bounds());
        if clipped.is_empty() {
            return;
        }
        let bytes = color.to_bytes();
        let stride = self.width as usize * BYTES_PER_PIXEL;
        for y in clipped.y0 as usize..clipped.y1 as usize {
            let row_start = y * stride + clipped.x0 as usize * BYTES_PER_PIXEL;
            let row_end = y * stride + clipped.x1 as usize * BYTES_PER_PIXEL;
            for px in self.pixels[row_start..row_end].chunks_exact_mut(BYTES_PER_PIXEL) {
                px.copy_from_slice(&bytes);
            }
        }
    }

    /// Fills every pixel with `color`.
    pub fn clear(&mut self, color: Rgba) {
        self.fill_rect(self.bounds(), color);
    }

    /// FNV-1a digest of the pixel contents, for logging and comparisons.
    pub fn digest(&self) -> u64 {
        const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
        self.pixels.iter().fold(FNV_OFFSET, |hash, &byte| {
            (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
        })
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("digest", &format_args!("{:016x}", self.digest()))
            .finish()
    }
}

/// Allocates frame buffers for the processing loop.
///
/// Implementations wrap whatever presentation layer owns the pixels. An
/// allocation failure must be reported as an error; the loop refuses to start
/// rather than run against a missing buffer.
pub trait SurfaceFactory {
    fn new_frame_buffer(&self, width: u32, height: u32) -> Result<FrameBuffer>;
}

/// Surface backed by plain heap memory, for running without a window system.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface;

impl HeadlessSurface {
    pub fn new() -> Self {
        info!("HeadlessSurface: created");
        Self
    }
}

impl SurfaceFactory for HeadlessSurface {
    fn new_frame_buffer(&self, width: u32, height: u32) -> Result<FrameBuffer> {
        if width == 0 || height == 0 {
            bail!("cannot allocate a {}x{} frame buffer", width, height);
        }
        debug!("HeadlessSurface: allocating {}x{} frame buffer", width, height);
        FrameBuffer::try_new(width, height)
    }
}
