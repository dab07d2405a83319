// src/painter_loop/mod.rs
//! PainterLoop - Dedicated thread that applies queued operations to frames.
//!
//! Threading model:
//! - One consumer thread ("painter-loop") owns both frame buffers and is the
//!   only place operations are applied, so the scene is only mutated there.
//! - Any number of producers post through a clonable [`LoopHandle`]. The
//!   operation queue is the only structure they share with the loop.
//! - Operations may post further operations while being applied. Those land
//!   at the tail of the same queue, behind everything already queued.
//!
//! Lifecycle:
//!
//! ```text
//! NotStarted ──start()──► Running ──stop()──► Stopping ──(thread joined)──► Stopped
//!      └──────────────────────stop()────────────────────────────────────────┘
//! ```
//!
//! Each tick pulls at most one operation. When an operation reports ready the
//! buffer it was built in goes to the [`FrameReceiver`] and the two buffers
//! swap roles. Pixel data is never copied.

mod receiver;

pub use receiver::{FrameLogger, FrameReceiver};

use crate::config::LoopConfig;
use crate::framebuffer::{FrameBuffer, SurfaceFactory};
use crate::operation::Operation;
use crate::queue::OperationQueue;
use anyhow::{anyhow, Context, Result};
use log::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Observable lifecycle state of a `PainterLoop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    NotStarted,
    Running,
    /// `stop()` is waiting for the loop thread to exit.
    Stopping,
    Stopped,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::NotStarted => write!(f, "NotStarted"),
            LoopState::Running => write!(f, "Running"),
            LoopState::Stopping => write!(f, "Stopping"),
            LoopState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Lifecycle misuse and start-up errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopError {
    /// `start()` called on a loop that is not `NotStarted`.
    AlreadyStarted(LoopState),
    /// Operation posted while the loop is not `Running`. The operation was dropped.
    NotRunning(LoopState),
    /// The surface returned a buffer of the wrong size.
    BufferSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

impl std::fmt::Display for LoopError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopError::AlreadyStarted(state) => {
                write!(f, "painter loop cannot start from state {}", state)
            }
            LoopError::NotRunning(state) => {
                write!(f, "painter loop is {}; operation dropped", state)
            }
            LoopError::BufferSize { expected, actual } => write!(
                f,
                "surface returned a {}x{} buffer, expected {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
        }
    }
}

impl std::error::Error for LoopError {}

/// State shared between the loop thread and every producer.
struct Shared {
    queue: OperationQueue,
    state: Mutex<LoopState>,
    /// Operations accepted by `post`.
    posted: AtomicU64,
    /// Operations fully applied (and delivered, if ready).
    completed: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Self {
            queue: OperationQueue::new(),
            state: Mutex::new(LoopState::NotStarted),
            posted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LoopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> LoopState {
        *self.lock_state()
    }

    fn set_state(&self, state: LoopState) {
        let mut current = self.lock_state();
        debug!("PainterLoop: {} -> {}", *current, state);
        *current = state;
    }

    fn post(&self, op: Box<dyn Operation>) -> Result<(), LoopError> {
        // Held across the push so a post racing `stop()` is either queued
        // before the state leaves Running or rejected.
        let state = self.lock_state();
        if *state != LoopState::Running {
            warn!(
                "PainterLoop: dropping '{}' posted while loop is {}",
                op.name(),
                *state
            );
            return Err(LoopError::NotRunning(*state));
        }
        trace!("PainterLoop: queued '{}'", op.name());
        self.queue.push(op);
        self.posted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_idle(&self) -> bool {
        self.completed.load(Ordering::SeqCst) >= self.posted.load(Ordering::SeqCst)
    }
}

/// Clonable producer handle for posting operations to a `PainterLoop`.
///
/// Safe to use from any thread, including from inside an operation that the
/// loop is currently applying.
#[derive(Clone)]
pub struct LoopHandle {
    shared: Arc<Shared>,
}

impl LoopHandle {
    /// Enqueues `op` behind everything already queued.
    ///
    /// Returns `LoopError::NotRunning` (and drops `op`) unless the loop is running.
    pub fn post(&self, op: Box<dyn Operation>) -> Result<(), LoopError> {
        self.shared.post(op)
    }

    pub fn state(&self) -> LoopState {
        self.shared.state()
    }

    /// Number of operations waiting in the queue.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// Blocks until every accepted operation has been applied, or `timeout`
    /// elapses. Returns `true` if the loop went idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.shared.is_idle() {
            if self.shared.state() != LoopState::Running || Instant::now() >= deadline {
                return self.shared.is_idle();
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }
}

/// The "building" and "last delivered" buffers.
struct FrameBuffers {
    slots: [FrameBuffer; 2],
    building: usize,
}

impl FrameBuffers {
    fn allocate(surface: &dyn SurfaceFactory, width: u32, height: u32) -> Result<Self> {
        let allocate_one = |slot: &str| -> Result<FrameBuffer> {
            let buffer = surface
                .new_frame_buffer(width, height)
                .with_context(|| format!("Failed to allocate {} frame buffer", slot))?;
            let actual = (buffer.width(), buffer.height());
            if actual != (width, height) {
                return Err(LoopError::BufferSize {
                    expected: (width, height),
                    actual,
                }
                .into());
            }
            Ok(buffer)
        };
        let first = allocate_one("building")?;
        let second = allocate_one("last-delivered")?;
        Ok(Self {
            slots: [first, second],
            building: 0,
        })
    }

    fn building(&self) -> &FrameBuffer {
        &self.slots[self.building]
    }

    fn building_mut(&mut self) -> &mut FrameBuffer {
        &mut self.slots[self.building]
    }

    /// The buffer just delivered becomes "last delivered"; the other one is
    /// built next.
    fn swap(&mut self) {
        self.building ^= 1;
    }
}

/// Loop thread state. Lives entirely on the "painter-loop" thread.
struct LoopWorker {
    shared: Arc<Shared>,
    receiver: Arc<dyn FrameReceiver>,
    buffers: FrameBuffers,
    tick_interval: Duration,
    frames_delivered: u64,
}

impl LoopWorker {
    /// Ticks every `tick_interval` until a stop message arrives or the stop
    /// sender is dropped.
    fn run(mut self, stop_rx: Receiver<()>) {
        let _unwind = UnwindGuard(Arc::clone(&self.shared));
        info!(
            "PainterLoop: Thread started (tick every {:?})",
            self.tick_interval
        );

        loop {
            match stop_rx.recv_timeout(self.tick_interval) {
                Err(RecvTimeoutError::Timeout) => self.tick(),
                Ok(()) => {
                    debug!("PainterLoop: Stop requested");
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    info!("PainterLoop: Stop channel closed, exiting");
                    break;
                }
            }
        }

        info!(
            "PainterLoop: Thread stopped after delivering {} frames",
            self.frames_delivered
        );
    }

    /// Applies at most one queued operation.
    fn tick(&mut self) {
        let Some(op) = self.shared.queue.pull() else {
            return;
        };

        trace!("PainterLoop: applying '{}'", op.name());
        let ready = op.apply(self.buffers.building_mut());
        if ready {
            self.frames_delivered += 1;
            debug!(
                "PainterLoop: '{}' marked frame {} ready, delivering",
                op.name(),
                self.frames_delivered
            );
            self.receiver.update(self.buffers.building());
            self.buffers.swap();
        }
        drop(op);
        self.shared.completed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Takes the loop out of `Running` if the loop thread unwinds, so producers
/// get `NotRunning` instead of feeding a queue nobody drains.
struct UnwindGuard(Arc<Shared>);

impl Drop for UnwindGuard {
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }
        let mut state = self.0.lock_state();
        if *state == LoopState::Running {
            error!("PainterLoop: Thread panicked, no longer accepting operations");
            *state = LoopState::Stopping;
        }
    }
}

/// The processing loop.
///
/// Owns the loop thread. `stop()` takes `&mut self`, so exactly one owner can
/// shut the loop down. Dropping a running loop stops it.
pub struct PainterLoop {
    receiver: Arc<dyn FrameReceiver>,
    settings: LoopConfig,
    shared: Arc<Shared>,
    stop_tx: Option<Sender<()>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl PainterLoop {
    pub fn new(receiver: Arc<dyn FrameReceiver>, settings: LoopConfig) -> Self {
        Self {
            receiver,
            settings,
            shared: Arc::new(Shared::new()),
            stop_tx: None,
            thread_handle: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.shared.state()
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// See [`LoopHandle::post`].
    pub fn post(&self, op: Box<dyn Operation>) -> Result<(), LoopError> {
        self.shared.post(op)
    }

    /// Number of operations waiting in the queue.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// Allocates both frame buffers from `surface` and spawns the loop thread.
    ///
    /// Buffer allocation failure aborts start-up and leaves the loop
    /// `NotStarted`.
    pub fn start(&mut self, surface: &dyn SurfaceFactory) -> Result<()> {
        let state = self.shared.state();
        if state != LoopState::NotStarted {
            return Err(LoopError::AlreadyStarted(state).into());
        }

        let (width, height) = (self.settings.frame_width, self.settings.frame_height);
        info!("PainterLoop: Allocating two {}x{} frame buffers", width, height);
        let buffers = FrameBuffers::allocate(surface, width, height)
            .context("Failed to start painter loop")?;

        let worker = LoopWorker {
            shared: Arc::clone(&self.shared),
            receiver: Arc::clone(&self.receiver),
            buffers,
            tick_interval: self.settings.tick_interval(),
            frames_delivered: 0,
        };
        let (stop_tx, stop_rx) = mpsc::channel();

        // Running before the thread exists so posts made right after start()
        // returns are accepted.
        self.shared.set_state(LoopState::Running);
        let spawned = thread::Builder::new()
            .name("painter-loop".to_string())
            .spawn(move || worker.run(stop_rx));

        match spawned {
            Ok(handle) => {
                self.thread_handle = Some(handle);
                self.stop_tx = Some(stop_tx);
                info!("PainterLoop: Started");
                Ok(())
            }
            Err(e) => {
                self.shared.set_state(LoopState::NotStarted);
                self.shared.queue.clear();
                Err(e).context("Failed to spawn painter loop thread")
            }
        }
    }

    /// Signals the loop thread to exit after its current tick and blocks
    /// until it has.
    ///
    /// Operations still queued are discarded without being applied. Calling
    /// `stop` again, or before `start`, is harmless.
    pub fn stop(&mut self) -> Result<()> {
        match self.shared.state() {
            LoopState::Stopped => {
                debug!("PainterLoop: Already stopped");
                return Ok(());
            }
            LoopState::NotStarted => {
                info!("PainterLoop: Stopped before start");
                self.shared.set_state(LoopState::Stopped);
                return Ok(());
            }
            LoopState::Running | LoopState::Stopping => {}
        }

        self.shared.set_state(LoopState::Stopping);
        if let Some(stop_tx) = self.stop_tx.take() {
            // A send error means the thread already exited; join reports why.
            let _ = stop_tx.send(());
        }

        let joined = match self.thread_handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|e| anyhow!("painter loop thread panicked: {:?}", e)),
            None => Ok(()),
        };

        let discarded = self.shared.queue.clear();
        if discarded > 0 {
            debug!("PainterLoop: Discarded {} queued operations", discarded);
        }
        self.shared.set_state(LoopState::Stopped);
        info!("PainterLoop: Stopped");
        joined
    }
}

impl Drop for PainterLoop {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!("PainterLoop dropped while running, stopping");
            if let Err(e) = self.stop() {
                error!("PainterLoop: {:#}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests;
