// src/lang/commands.rs

//! Parsed script commands, independent of any scene.

use crate::operation::{DrawOp, MarkReady, Operation};
use crate::scene::SceneHandle;

/// One line of a script.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `white`
    White,
    /// `green`
    Green,
    /// `update`: hand the current frame to the receiver.
    Update,
    /// `bgrect x1 y1 x2 y2`
    BgRect { x1: f64, y1: f64, x2: f64, y2: f64 },
    /// `figure x y`
    Figure { x: f64, y: f64 },
    /// `move x y`: every shape ends up at `(x, y)`.
    Move { x: f64, y: f64 },
    /// `reset`
    Reset,
}

impl Command {
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::White => "white",
            Command::Green => "green",
            Command::Update => "update",
            Command::BgRect { .. } => "bgrect",
            Command::Figure { .. } => "figure",
            Command::Move { .. } => "move",
            Command::Reset => "reset",
        }
    }

    /// The operation this command stands for, bound to `scene`.
    pub fn into_operation(self, scene: &SceneHandle) -> Box<dyn Operation> {
        match self {
            Command::White => Box::new(DrawOp::fill_white(scene)),
            Command::Green => Box::new(DrawOp::fill_green(scene)),
            Command::Update => Box::new(MarkReady),
            Command::BgRect { x1, y1, x2, y2 } => {
                Box::new(DrawOp::set_rectangle(scene, x1, y1, x2, y2))
            }
            Command::Figure { x, y } => Box::new(DrawOp::add_shape(scene, x, y)),
            Command::Move { x, y } => Box::new(DrawOp::move_shapes(scene, x, y)),
            Command::Reset => Box::new(DrawOp::reset(scene)),
        }
    }
}
