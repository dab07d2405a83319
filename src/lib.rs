// src/lib.rs

//! A double-buffered painter.
//!
//! Producers post [`operation::Operation`]s to a [`painter_loop::PainterLoop`].
//! The loop applies them one per tick to the frame buffer being built, and
//! hands finished frames to a [`painter_loop::FrameReceiver`]. Scripts in the
//! painter command language are turned into operations by [`lang::Parser`].

pub mod color;
pub mod config;
pub mod framebuffer;
pub mod lang;
pub mod operation;
pub mod painter_loop;
pub mod queue;
pub mod renderer;
pub mod scene;
