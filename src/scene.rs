// src/scene.rs

//! The `Scene`: what should be drawn next.
//!
//! A scene is only ever mutated by operations applied on the processing loop
//! thread. Producers hold a [`SceneHandle`] so they can build operations that
//! target it, but they never lock it themselves.

use crate::color::Color;
use crate::framebuffer::FrameBuffer;
use crate::renderer::Renderer;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Background rectangle bounds, stored exactly as supplied.
///
/// No ordering between the two corners is enforced; the renderer normalizes
/// inverted bounds when it draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// A positioned shape. Its glyph is centered on `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    /// `None` means the renderer's default background.
    pub background: Option<Color>,
    pub rectangle: Option<Rectangle>,
    pub shapes: Vec<Shape>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = Some(color);
    }

    pub fn set_rectangle(&mut self, rectangle: Rectangle) {
        self.rectangle = Some(rectangle);
    }

    pub fn add_shape(&mut self, x: f64, y: f64) {
        self.shapes.push(Shape { x, y });
    }

    /// Places every existing shape at `(x, y)`.
    ///
    /// NOTE: this does not translate shapes by an offset. All shapes collapse
    /// onto the same point, which is the observable behavior of the `move`
    /// command and is kept as-is.
    pub fn move_shapes(&mut self, x: f64, y: f64) {
        for shape in &mut self.shapes {
            *shape = Shape { x, y };
        }
    }

    /// Returns every field to its default.
    pub fn reset(&mut self) {
        *self = Scene::default();
    }
}

/// Shared reference to a `Scene` that operations close over.
///
/// The handle also carries the `Renderer` used to repaint a target after each
/// mutation, so every operation built against it draws the same way.
#[derive(Debug, Clone, Default)]
pub struct SceneHandle {
    inner: Arc<Mutex<Scene>>,
    renderer: Arc<Renderer>,
}

impl SceneHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_renderer(renderer: Renderer) -> Self {
        Self {
            inner: Arc::default(),
            renderer: Arc::new(renderer),
        }
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Applies `mutate` to the scene, then repaints `target` from the result.
    ///
    /// The lock is held across both steps so the rendered frame always matches
    /// the mutation that produced it.
    pub fn update_and_render<F>(&self, target: &mut FrameBuffer, mutate: F)
    where
        F: FnOnce(&mut Scene),
    {
        let mut scene = self.lock();
        mutate(&mut scene);
        self.renderer.draw(&scene, target);
    }

    /// Locks the scene for mutation.
    ///
    /// A poisoned lock is recovered: every `Scene` mutation leaves the struct
    /// valid, so a panic elsewhere cannot corrupt it.
    pub fn lock(&self) -> MutexGuard<'_, Scene> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clone of the current scene contents.
    pub fn snapshot(&self) -> Scene {
        self.lock().clone()
    }

    /// Whether two handles refer to the same scene.
    pub fn ptr_eq(&self, other: &SceneHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
