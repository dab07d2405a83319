// src/operation.rs

//! Operations: discrete, replayable changes applied by the processing loop.
//!
//! Every operation is applied to the frame buffer currently being built and
//! reports whether that buffer should now be handed to the receiver.
//!
//! - [`DrawOp`] covers the fixed set of scene mutations. Each one mutates the
//!   scene it targets, immediately repaints the buffer, and reports *not ready*.
//! - [`MarkReady`] changes nothing and reports *ready*.
//! - [`OperationList`] applies a sequence in order and reports ready if any
//!   member did.
//!
//! The [`Operation`] trait is the seam for anything else that wants to ride
//! the queue.

use crate::color::Color;
use crate::framebuffer::FrameBuffer;
use crate::scene::{Rectangle, SceneHandle};
use log::debug;

/// A unit of change applied to the frame buffer being built.
pub trait Operation: Send {
    /// Applies the operation to `target`.
    ///
    /// Returns `true` if `target` should now be considered ready for display.
    fn apply(&self, target: &mut FrameBuffer) -> bool;

    /// Short name used in log output.
    fn name(&self) -> &'static str {
        "operation"
    }
}

/// The scene mutations understood by the painter.
#[derive(Debug, Clone)]
pub enum DrawOp {
    /// Set the background color.
    Fill { scene: SceneHandle, color: Color },
    /// Replace the background rectangle. Bounds are kept as given.
    SetRectangle {
        scene: SceneHandle,
        rectangle: Rectangle,
    },
    /// Append a shape.
    AddShape { scene: SceneHandle, x: f64, y: f64 },
    /// Place every shape at `(x, y)`. See [`crate::scene::Scene::move_shapes`].
    MoveShapes { scene: SceneHandle, x: f64, y: f64 },
    /// Return the scene to its defaults.
    Reset { scene: SceneHandle },
}

impl DrawOp {
    pub fn fill_white(scene: &SceneHandle) -> Self {
        Self::fill_color(scene, Color::WHITE)
    }

    pub fn fill_green(scene: &SceneHandle) -> Self {
        Self::fill_color(scene, Color::GREEN)
    }

    pub fn fill_color(scene: &SceneHandle, color: Color) -> Self {
        DrawOp::Fill {
            scene: scene.clone(),
            color,
        }
    }

    pub fn set_rectangle(scene: &SceneHandle, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        DrawOp::SetRectangle {
            scene: scene.clone(),
            rectangle: Rectangle { x1, y1, x2, y2 },
        }
    }

    pub fn add_shape(scene: &SceneHandle, x: f64, y: f64) -> Self {
        DrawOp::AddShape {
            scene: scene.clone(),
            x,
            y,
        }
    }

    pub fn move_shapes(scene: &SceneHandle, x: f64, y: f64) -> Self {
        DrawOp::MoveShapes {
            scene: scene.clone(),
            x,
            y,
        }
    }

    pub fn reset(scene: &SceneHandle) -> Self {
        DrawOp::Reset {
            scene: scene.clone(),
        }
    }

    /// The scene this operation targets.
    pub fn scene(&self) -> &SceneHandle {
        match self {
            DrawOp::Fill { scene, .. }
            | DrawOp::SetRectangle { scene, .. }
            | DrawOp::AddShape { scene, .. }
            | DrawOp::MoveShapes { scene, .. }
            | DrawOp::Reset { scene } => scene,
        }
    }
}

impl Operation for DrawOp {
    fn apply(&self, target: &mut FrameBuffer) -> bool {
        debug!("DrawOp: applying {:?}", DrawOpSummary(self));
        self.scene().update_and_render(target, |scene| match self {
            DrawOp::Fill { color, .. } => scene.set_background(*color),
            DrawOp::SetRectangle { rectangle, .. } => scene.set_rectangle(*rectangle),
            DrawOp::AddShape { x, y, .. } => scene.add_shape(*x, *y),
            DrawOp::MoveShapes { x, y, .. } => scene.move_shapes(*x, *y),
            DrawOp::Reset { .. } => scene.reset(),
        });
        false
    }

    fn name(&self) -> &'static str {
        match self {
            DrawOp::Fill { .. } => "fill",
            DrawOp::SetRectangle { .. } => "set_rectangle",
            DrawOp::AddShape { .. } => "add_shape",
            DrawOp::MoveShapes { .. } => "move_shapes",
            DrawOp::Reset { .. } => "reset",
        }
    }
}

/// Debug view of a `DrawOp` without the scene handle.
struct DrawOpSummary<'a>(&'a DrawOp);

impl std::fmt::Debug for DrawOpSummary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            DrawOp::Fill { color, .. } => write!(f, "Fill({:?})", color),
            DrawOp::SetRectangle { rectangle: r, .. } => {
                write!(f, "SetRectangle({}, {}, {}, {})", r.x1, r.y1, r.x2, r.y2)
            }
            DrawOp::AddShape { x, y, .. } => write!(f, "AddShape({}, {})", x, y),
            DrawOp::MoveShapes { x, y, .. } => write!(f, "MoveShapes({}, {})", x, y),
            DrawOp::Reset { .. } => write!(f, "Reset"),
        }
    }
}

/// Signals that the buffer being built is ready, without drawing anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkReady;

impl Operation for MarkReady {
    fn apply(&self, _target: &mut FrameBuffer) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "mark_ready"
    }
}

/// A sequence of operations applied as one.
#[derive(Default)]
pub struct OperationList {
    ops: Vec<Box<dyn Operation>>,
}

impl OperationList {
    pub fn new(ops: Vec<Box<dyn Operation>>) -> Self {
        Self { ops }
    }

    pub fn push(&mut self, op: Box<dyn Operation>) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl From<Vec<Box<dyn Operation>>> for OperationList {
    fn from(ops: Vec<Box<dyn Operation>>) -> Self {
        Self::new(ops)
    }
}

impl Operation for OperationList {
    /// Applies every member in order; ready if any member reported ready.
    fn apply(&self, target: &mut FrameBuffer) -> bool {
        // Every member runs, even after one has reported ready.
        self.ops
            .iter()
            .fold(false, |ready, op| op.apply(target) || ready)
    }

    fn name(&self) -> &'static str {
        "operation_list"
    }
}
