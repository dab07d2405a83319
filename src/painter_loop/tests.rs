// src/painter_loop/tests.rs

use super::*;
use crate::color::{Color, Rgba};
use crate::framebuffer::HeadlessSurface;
use crate::operation::{DrawOp, MarkReady, OperationList};
use crate::scene::{SceneHandle, Shape};
use anyhow::bail;
use std::sync::atomic::AtomicUsize;
use test_log::test;

const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

// --- Test Doubles ---

/// Keeps a copy of every delivered frame and the address it came from.
#[derive(Default)]
struct RecordingReceiver {
    frames: Mutex<Vec<FrameBuffer>>,
    addresses: Mutex<Vec<usize>>,
}

impl RecordingReceiver {
    fn frames(&self) -> Vec<FrameBuffer> {
        self.frames.lock().unwrap().clone()
    }

    fn addresses(&self) -> Vec<usize> {
        self.addresses.lock().unwrap().clone()
    }
}

impl FrameReceiver for RecordingReceiver {
    fn update(&self, frame: &FrameBuffer) {
        self.addresses
            .lock()
            .unwrap()
            .push(frame as *const FrameBuffer as usize);
        self.frames.lock().unwrap().push(frame.clone());
    }
}

struct FailingSurface;

impl SurfaceFactory for FailingSurface {
    fn new_frame_buffer(&self, _width: u32, _height: u32) -> Result<FrameBuffer> {
        bail!("out of video memory")
    }
}

/// Returns a buffer smaller than requested.
struct ShrinkingSurface;

impl SurfaceFactory for ShrinkingSurface {
    fn new_frame_buffer(&self, width: u32, height: u32) -> Result<FrameBuffer> {
        Ok(FrameBuffer::new(width / 2, height / 2))
    }
}

type CallLog = Arc<Mutex<Vec<&'static str>>>;

/// Appends its label to a shared log when applied.
struct Record {
    label: &'static str,
    log: CallLog,
}

impl Operation for Record {
    fn apply(&self, _target: &mut FrameBuffer) -> bool {
        self.log.lock().unwrap().push(self.label);
        false
    }
}

fn record(label: &'static str, log: &CallLog) -> Box<dyn Operation> {
    Box::new(Record {
        label,
        log: Arc::clone(log),
    })
}

/// Records its label, then posts another operation through the loop handle.
struct RecordAndPost {
    label: &'static str,
    nested: &'static str,
    log: CallLog,
    handle: LoopHandle,
}

impl Operation for RecordAndPost {
    fn apply(&self, _target: &mut FrameBuffer) -> bool {
        self.log.lock().unwrap().push(self.label);
        self.handle
            .post(record(self.nested, &self.log))
            .expect("nested post while running");
        false
    }
}

/// Blocks the loop thread until released, so a test can queue several
/// operations before any of them is applied.
struct Gate(mpsc::Receiver<()>);

impl Operation for Gate {
    fn apply(&self, _target: &mut FrameBuffer) -> bool {
        let _ = self.0.recv();
        false
    }
}

fn gate() -> (Box<dyn Operation>, mpsc::Sender<()>) {
    let (tx, rx) = mpsc::channel();
    (Box::new(Gate(rx)), tx)
}

struct Count(Arc<AtomicUsize>);

impl Operation for Count {
    fn apply(&self, _target: &mut FrameBuffer) -> bool {
        self.0.fetch_add(1, Ordering::SeqCst);
        false
    }
}

struct Panics;

impl Operation for Panics {
    fn apply(&self, _target: &mut FrameBuffer) -> bool {
        panic!("operation failed");
    }
}

fn settings() -> LoopConfig {
    LoopConfig {
        tick_interval_ms: 1,
        frame_width: 400,
        frame_height: 400,
    }
}

fn started_loop() -> (PainterLoop, Arc<RecordingReceiver>) {
    let receiver = Arc::new(RecordingReceiver::default());
    let mut painter = PainterLoop::new(receiver.clone(), settings());
    painter.start(&HeadlessSurface::new()).unwrap();
    (painter, receiver)
}

// --- End-to-end Scenarios ---

#[test]
fn background_and_rectangle_are_delivered_in_one_frame() {
    let (mut painter, receiver) = started_loop();
    let scene = SceneHandle::new();

    painter.post(Box::new(DrawOp::fill_white(&scene))).unwrap();
    painter
        .post(Box::new(DrawOp::set_rectangle(&scene, 0.0, 0.0, 10.0, 10.0)))
        .unwrap();
    painter.post(Box::new(MarkReady)).unwrap();

    assert!(painter.handle().wait_idle(IDLE_TIMEOUT));
    painter.stop().unwrap();

    let frames = receiver.frames();
    assert_eq!(frames.len(), 1);
    let frame = &frames[0];
    assert_eq!(frame.pixel(0, 0), Some(Rgba::opaque(0, 0, 0)));
    assert_eq!(frame.pixel(9, 9), Some(Rgba::opaque(0, 0, 0)));
    assert_eq!(frame.pixel(10, 10), Some(Rgba::opaque(255, 255, 255)));
    assert_eq!(frame.pixel(399, 399), Some(Rgba::opaque(255, 255, 255)));
}

#[test]
fn moved_shapes_are_delivered_collapsed_onto_one_point() {
    let (mut painter, receiver) = started_loop();
    let scene = SceneHandle::new();

    painter.post(Box::new(DrawOp::add_shape(&scene, 5.0, 5.0))).unwrap();
    painter.post(Box::new(DrawOp::add_shape(&scene, 6.0, 6.0))).unwrap();
    painter.post(Box::new(DrawOp::move_shapes(&scene, 1.0, 1.0))).unwrap();
    painter.post(Box::new(MarkReady)).unwrap();

    assert!(painter.handle().wait_idle(IDLE_TIMEOUT));
    painter.stop().unwrap();

    // Two shapes, both at (1, 1): not offset by (1, 1).
    assert_eq!(scene.snapshot().shapes, vec![Shape { x: 1.0, y: 1.0 }; 2]);

    let frames = receiver.frames();
    assert_eq!(frames.len(), 1);
    let mut expected = FrameBuffer::new(400, 400);
    let mut single = crate::scene::Scene::new();
    single.add_shape(1.0, 1.0);
    scene.renderer().draw(&single, &mut expected);
    assert_eq!(frames[0].pixels(), expected.pixels());
    assert_eq!(frames[0].pixel(1, 1), Some(Color::YELLOW.to_rgba()));
}

#[test]
fn frame_reflects_every_mutation_in_submission_order() {
    let (mut painter, receiver) = started_loop();
    let scene = SceneHandle::new();

    painter.post(Box::new(DrawOp::fill_green(&scene))).unwrap();
    painter.post(Box::new(DrawOp::fill_white(&scene))).unwrap();
    painter.post(Box::new(DrawOp::add_shape(&scene, 200.0, 200.0))).unwrap();
    painter.post(Box::new(MarkReady)).unwrap();

    assert!(painter.handle().wait_idle(IDLE_TIMEOUT));
    painter.stop().unwrap();

    let frames = receiver.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].pixel(5, 5), Some(Color::WHITE.to_rgba()));
    assert_eq!(frames[0].pixel(200, 200), Some(Color::YELLOW.to_rgba()));
}

#[test]
fn operation_list_with_mark_ready_delivers_once() {
    let (mut painter, receiver) = started_loop();
    let scene = SceneHandle::new();

    let batch = OperationList::new(vec![
        Box::new(DrawOp::fill_white(&scene)),
        Box::new(MarkReady),
        Box::new(DrawOp::set_rectangle(&scene, 0.0, 0.0, 10.0, 10.0)),
    ]);
    painter.post(Box::new(batch)).unwrap();

    assert!(painter.handle().wait_idle(IDLE_TIMEOUT));
    painter.stop().unwrap();

    // One delivery per tick, carrying everything the list drew.
    let frames = receiver.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].pixel(5, 5), Some(Rgba::opaque(0, 0, 0)));
}

#[test]
fn mutations_without_mark_ready_deliver_nothing() {
    let (mut painter, receiver) = started_loop();
    let scene = SceneHandle::new();
    painter.post(Box::new(DrawOp::fill_white(&scene))).unwrap();
    painter.post(Box::new(DrawOp::add_shape(&scene, 1.0, 1.0))).unwrap();

    assert!(painter.handle().wait_idle(IDLE_TIMEOUT));
    painter.stop().unwrap();
    assert!(receiver.frames().is_empty());
}

// --- Ordering ---

#[test]
fn nested_posts_run_after_everything_already_queued() {
    let (mut painter, _receiver) = started_loop();
    let log: CallLog = Arc::default();
    let (gate_op, release) = gate();

    painter.post(gate_op).unwrap();
    painter.post(record("white fill", &log)).unwrap();
    painter.post(record("green fill", &log)).unwrap();
    painter.post(Box::new(MarkReady)).unwrap();
    painter
        .post(Box::new(RecordAndPost {
            label: "op 1",
            nested: "op 2",
            log: Arc::clone(&log),
            handle: painter.handle(),
        }))
        .unwrap();
    painter.post(record("op 3", &log)).unwrap();
    release.send(()).unwrap();

    assert!(painter.handle().wait_idle(IDLE_TIMEOUT));
    painter.stop().unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["white fill", "green fill", "op 1", "op 3", "op 2"]
    );
}

#[test]
fn concurrent_producers_all_get_applied() {
    let (mut painter, _receiver) = started_loop();
    let count = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let handle = painter.handle();
            let count = Arc::clone(&count);
            thread::spawn(move || {
                for _ in 0..25 {
                    handle.post(Box::new(Count(Arc::clone(&count)))).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    assert!(painter.handle().wait_idle(IDLE_TIMEOUT));
    painter.stop().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 100);
}

// --- Double Buffering ---

#[test]
fn deliveries_alternate_between_two_buffers() {
    let (mut painter, receiver) = started_loop();
    for _ in 0..4 {
        painter.post(Box::new(MarkReady)).unwrap();
    }
    assert!(painter.handle().wait_idle(IDLE_TIMEOUT));
    painter.stop().unwrap();

    let addresses = receiver.addresses();
    assert_eq!(addresses.len(), 4);
    assert_ne!(addresses[0], addresses[1]);
    assert_eq!(addresses[0], addresses[2]);
    assert_eq!(addresses[1], addresses[3]);
}

// --- Lifecycle ---

#[test]
fn start_surfaces_allocation_failure() {
    let receiver = Arc::new(RecordingReceiver::default());
    let mut painter = PainterLoop::new(receiver, settings());

    let err = painter.start(&FailingSurface).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Failed to start painter loop"), "{}", message);
    assert!(message.contains("out of video memory"), "{}", message);
    assert_eq!(painter.state(), LoopState::NotStarted);

    // A later start with a working surface still succeeds.
    painter.start(&HeadlessSurface::new()).unwrap();
    assert_eq!(painter.state(), LoopState::Running);
    painter.stop().unwrap();
}

#[test]
fn start_reports_unallocatable_buffer_size() {
    let receiver = Arc::new(RecordingReceiver::default());
    let huge = LoopConfig {
        frame_width: u32::MAX,
        frame_height: u32::MAX,
        ..settings()
    };
    let mut painter = PainterLoop::new(receiver, huge);

    let err = painter.start(&HeadlessSurface::new()).unwrap_err();
    assert!(
        format!("{:#}", err).contains("Failed to start painter loop"),
        "{:#}",
        err
    );
    assert_eq!(painter.state(), LoopState::NotStarted);
    assert!(painter.post(Box::new(MarkReady)).is_err());
}

#[test]
fn start_rejects_wrongly_sized_buffers() {
    let receiver = Arc::new(RecordingReceiver::default());
    let mut painter = PainterLoop::new(receiver, settings());

    let err = painter.start(&ShrinkingSurface).unwrap_err();
    assert_eq!(
        err.downcast_ref::<LoopError>(),
        Some(&LoopError::BufferSize {
            expected: (400, 400),
            actual: (200, 200),
        })
    );
    assert_eq!(painter.state(), LoopState::NotStarted);
}

#[test]
fn start_twice_is_an_error() {
    let (mut painter, _receiver) = started_loop();
    let err = painter.start(&HeadlessSurface::new()).unwrap_err();
    assert_eq!(
        err.downcast_ref::<LoopError>(),
        Some(&LoopError::AlreadyStarted(LoopState::Running))
    );
    painter.stop().unwrap();
}

#[test]
fn post_before_start_is_rejected() {
    let receiver = Arc::new(RecordingReceiver::default());
    let painter = PainterLoop::new(receiver, settings());
    assert_eq!(
        painter.post(Box::new(MarkReady)),
        Err(LoopError::NotRunning(LoopState::NotStarted))
    );
    assert_eq!(painter.pending(), 0);
}

#[test]
fn post_after_stop_is_rejected() {
    let (mut painter, _receiver) = started_loop();
    let handle = painter.handle();
    painter.stop().unwrap();

    assert_eq!(painter.state(), LoopState::Stopped);
    assert_eq!(
        handle.post(Box::new(MarkReady)),
        Err(LoopError::NotRunning(LoopState::Stopped))
    );
    assert_eq!(handle.pending(), 0);
}

#[test]
fn stop_is_idempotent() {
    let (mut painter, _receiver) = started_loop();
    painter.stop().unwrap();
    painter.stop().unwrap();
    assert_eq!(painter.state(), LoopState::Stopped);
}

#[test]
fn stop_before_start_moves_to_stopped() {
    let receiver = Arc::new(RecordingReceiver::default());
    let mut painter = PainterLoop::new(receiver, settings());
    painter.stop().unwrap();
    assert_eq!(painter.state(), LoopState::Stopped);
    assert!(painter.start(&HeadlessSurface::new()).is_err());
}

#[test]
fn stop_discards_operations_still_queued() {
    let (mut painter, receiver) = started_loop();
    let count = Arc::new(AtomicUsize::new(0));
    let (gate_op, release) = gate();

    painter.post(gate_op).unwrap();
    for _ in 0..5 {
        painter.post(Box::new(Count(Arc::clone(&count)))).unwrap();
    }
    painter.post(Box::new(MarkReady)).unwrap();

    // Release the gate only once stop() has signalled the thread. If the gate
    // was never pulled it is discarded with the queue and the send fails.
    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        let _ = release.send(());
    });
    painter.stop().unwrap();
    releaser.join().unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(receiver.frames().is_empty());
    assert_eq!(painter.pending(), 0);
    assert_eq!(painter.state(), LoopState::Stopped);
}

#[test]
fn stop_waits_for_the_in_flight_tick() {
    let (mut painter, _receiver) = started_loop();
    let log: CallLog = Arc::default();
    let (gate_op, release) = gate();

    painter.post(gate_op).unwrap();
    painter.post(record("after gate", &log)).unwrap();
    // Make sure the gate is being applied before stopping.
    while painter.pending() > 1 {
        thread::sleep(Duration::from_millis(1));
    }

    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        release.send(()).unwrap();
    });
    let started = Instant::now();
    painter.stop().unwrap();
    assert!(started.elapsed() >= Duration::from_millis(40));
    releaser.join().unwrap();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn stop_reports_a_panicked_loop_thread() {
    let (mut painter, _receiver) = started_loop();
    let handle = painter.handle();
    painter.post(Box::new(Panics)).unwrap();
    let deadline = Instant::now() + IDLE_TIMEOUT;
    while handle.state() == LoopState::Running && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }

    // A dead loop thread rejects further work instead of queueing it.
    assert_eq!(handle.state(), LoopState::Stopping);
    assert_eq!(
        handle.post(Box::new(MarkReady)),
        Err(LoopError::NotRunning(LoopState::Stopping))
    );
    assert_eq!(handle.pending(), 0);
    let started = Instant::now();
    assert!(!handle.wait_idle(IDLE_TIMEOUT));
    assert!(started.elapsed() < Duration::from_secs(1));

    let err = painter.stop().unwrap_err();
    assert!(format!("{}", err).contains("panicked"));
    assert_eq!(painter.state(), LoopState::Stopped);
}

#[test]
fn dropping_a_running_loop_stops_it() {
    let count = Arc::new(AtomicUsize::new(0));
    let handle = {
        let (painter, _receiver) = started_loop();
        painter.post(Box::new(Count(Arc::clone(&count)))).unwrap();
        painter.handle().wait_idle(IDLE_TIMEOUT);
        painter.handle()
    };
    assert_eq!(handle.state(), LoopState::Stopped);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn loop_error_messages_name_the_state() {
    assert_eq!(
        LoopError::NotRunning(LoopState::Stopped).to_string(),
        "painter loop is Stopped; operation dropped"
    );
    assert_eq!(
        LoopError::AlreadyStarted(LoopState::Running).to_string(),
        "painter loop cannot start from state Running"
    );
}
