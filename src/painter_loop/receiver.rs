// src/painter_loop/receiver.rs
//! Frame receivers: where finished frames go.

use crate::framebuffer::FrameBuffer;
use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

/// Accepts completed frames from the processing loop.
///
/// `update` runs on the loop thread, at most once per tick. The frame is only
/// borrowed for the duration of the call; a receiver that wants to keep the
/// pixels must copy them. A receiver that blocks stalls the whole loop.
pub trait FrameReceiver: Send + Sync {
    fn update(&self, frame: &FrameBuffer);
}

/// Headless receiver that logs each delivered frame.
#[derive(Debug, Default)]
pub struct FrameLogger {
    frames: AtomicU64,
}

impl FrameLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames received so far.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }
}

impl FrameReceiver for FrameLogger {
    fn update(&self, frame: &FrameBuffer) {
        let n = self.frames.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "Frame #{}: {}x{}, digest {:016x}",
            n,
            frame.width(),
            frame.height(),
            frame.digest()
        );
    }
}
