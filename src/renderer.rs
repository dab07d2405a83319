// src/renderer.rs

//! This module defines the scene `Renderer`.
//!
//! Rendering is a pure projection from a [`Scene`] onto a [`FrameBuffer`]:
//! the scene is read, never mutated, and the whole buffer is repainted on every
//! call. Draw order is background, then the rectangle, then one glyph per
//! shape, so later layers occlude earlier ones.
//!
//! The renderer never decides whether a frame is ready for display. That is
//! the job of the operation being applied.

use crate::color::{Color, Rgba};
use crate::framebuffer::{FrameBuffer, PixelRect};
use crate::scene::{Rectangle, Scene, Shape};
use log::trace;
use serde::{Deserialize, Serialize};

/// Background used when a scene has none.
pub const DEFAULT_BACKGROUND: Color = Color::Rgb(0, 128, 0);

// T glyph proportions, relative to half the buffer size.
const GLYPH_BAR_WIDTH: f64 = 0.7;
const GLYPH_BAR_HEIGHT: f64 = 0.2;
const GLYPH_STEM_WIDTH: f64 = 0.2;
const GLYPH_STEM_HEIGHT: f64 = 0.7;

/// How scene coordinates map onto buffer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoordinateSpace {
    /// Scene values are pixel coordinates.
    #[default]
    Pixels,
    /// Scene values are fractions of the buffer width and height.
    Normalized,
}

/// Colors and coordinate mapping applied by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    pub coordinates: CoordinateSpace,
    /// Used when the scene has no background color.
    pub background: Color,
    pub rectangle: Color,
    pub shape: Color,
}

impl Default for RenderStyle {
    fn default() -> Self {
        RenderStyle {
            coordinates: CoordinateSpace::Pixels,
            background: DEFAULT_BACKGROUND,
            rectangle: Color::BLACK,
            shape: Color::YELLOW,
        }
    }
}

/// Stateless scene renderer.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    style: RenderStyle,
}

impl Renderer {
    pub fn new(style: RenderStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    /// Repaints `target` from `scene`.
    pub fn draw(&self, scene: &Scene, target: &mut FrameBuffer) {
        trace!(
            "Renderer: drawing scene (rectangle: {}, shapes: {}) onto {}x{}",
            scene.rectangle.is_some(),
            scene.shapes.len(),
            target.width(),
            target.height()
        );

        let background = scene.background.unwrap_or(self.style.background);
        target.clear(background.to_rgba());

        if let Some(rectangle) = &scene.rectangle {
            let rect = self.rectangle_to_pixels(rectangle, target);
            target.fill_rect(rect, self.style.rectangle.to_rgba());
        }

        let shape_color = self.style.shape.to_rgba();
        for shape in &scene.shapes {
            self.draw_shape(shape, target, shape_color);
        }
    }

    /// Converts rectangle bounds to a normalized pixel rectangle.
    fn rectangle_to_pixels(&self, rectangle: &Rectangle, target: &FrameBuffer) -> PixelRect {
        let (x1, y1) = self.to_pixels(rectangle.x1, rectangle.y1, target);
        let (x2, y2) = self.to_pixels(rectangle.x2, rectangle.y2, target);
        PixelRect::new(x1, y1, x2, y2).normalized()
    }

    /// Draws the T glyph centered at the shape's position.
    fn draw_shape(&self, shape: &Shape, target: &mut FrameBuffer, color: Rgba) {
        let (cx, cy) = self.to_pixels(shape.x, shape.y, target);
        for rect in t_glyph(cx, cy, target.width(), target.height()) {
            target.fill_rect(rect, color);
        }
    }

    /// Maps a scene point to pixels, clamped to one buffer size beyond each
    /// edge. Anything further out draws the same clipped pixels.
    fn to_pixels(&self, x: f64, y: f64, target: &FrameBuffer) -> (i64, i64) {
        let (w, h) = (target.width() as f64, target.height() as f64);
        let (x, y) = match self.style.coordinates {
            CoordinateSpace::Pixels => (x, y),
            CoordinateSpace::Normalized => (x * w, y * h),
        };
        (
            x.clamp(-w, 2.0 * w).round() as i64,
            y.clamp(-h, 2.0 * h).round() as i64,
        )
    }
}

/// The two rectangles (stem, bar) forming a T glyph centered at `(cx, cy)`.
///
/// Glyph size scales with the buffer: the stem spans 70% of half the buffer
/// height and the bar sits flush with the top of the stem.
pub fn t_glyph(cx: i64, cy: i64, width: u32, height: u32) -> [PixelRect; 2] {
    let half_w = (width / 2) as f64;
    let half_h = (height / 2) as f64;

    let bar_w = (half_w * GLYPH_BAR_WIDTH) as i64;
    let bar_h = (half_h * GLYPH_BAR_HEIGHT) as i64;
    let stem_w = (half_w * GLYPH_STEM_WIDTH) as i64;
    let stem_h = (half_h * GLYPH_STEM_HEIGHT) as i64;

    let top = cy.saturating_sub(stem_h / 2);
    let stem = PixelRect::new(
        cx.saturating_sub(stem_w / 2),
        top,
        cx.saturating_add(stem_w / 2),
        cy.saturating_add(stem_h / 2),
    );
    let bar = PixelRect::new(
        cx.saturating_sub(bar_w / 2),
        top,
        cx.saturating_add(bar_w / 2),
        top.saturating_add(bar_h),
    );
    [stem, bar]
}
