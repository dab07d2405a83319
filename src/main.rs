// src/main.rs

//! `painter [SCRIPT]`: runs a painter script through the processing loop.
//!
//! The script is read from the given file, or stdin when no file is named.
//! Each blank-line separated batch is posted as one operation list; finished
//! frames are logged.

use painter::{
    config::CONFIG,
    framebuffer::HeadlessSurface,
    lang::BatchReader,
    operation::OperationList,
    painter_loop::{FrameLogger, PainterLoop},
    renderer::Renderer,
    scene::SceneHandle,
};

use anyhow::Context;
use log::{error, info, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::Arc;
use std::time::Duration;

/// How long to wait for queued operations to drain at end of input.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

fn main() -> anyhow::Result<()> {
    // Initialize the logger. Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting painter...");

    let script = std::env::args_os().nth(1);
    let input: Box<dyn BufRead> = match &script {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open script {}", path.to_string_lossy()))?;
            info!("Reading script from {}", path.to_string_lossy());
            Box::new(BufReader::new(file))
        }
        None => {
            info!("Reading script from stdin");
            Box::new(io::stdin().lock())
        }
    };

    // --- Core Components ---
    let scene = SceneHandle::with_renderer(Renderer::new(CONFIG.render));
    let frames = Arc::new(FrameLogger::new());
    let mut painter_loop = PainterLoop::new(frames.clone(), CONFIG.loop_settings);
    painter_loop
        .start(&HeadlessSurface::new())
        .context("Failed to start painter")?;
    let handle = painter_loop.handle();

    // --- Script Batches ---
    let mut posted = 0usize;
    for batch in BatchReader::new(input) {
        let batch = match batch {
            Ok(batch) => batch,
            Err(e) => {
                error!("Stopping at unreadable input: {}", e);
                break;
            }
        };
        match batch.parse(&scene) {
            Ok(ops) => {
                let list = OperationList::new(ops);
                info!(
                    "Posting batch from line {} ({} operations)",
                    batch.first_line,
                    list.len()
                );
                if let Err(e) = handle.post(Box::new(list)) {
                    error!("Failed to post batch from line {}: {}", batch.first_line, e);
                    break;
                }
                posted += 1;
            }
            Err(e) => error!("Bad script, skipping batch: {}", e),
        }
    }

    // --- Cleanup ---
    if !handle.wait_idle(DRAIN_TIMEOUT) {
        warn!(
            "Gave up waiting after {:?}; {} operations still queued",
            DRAIN_TIMEOUT,
            handle.pending()
        );
    }
    painter_loop.stop().context("Failed to stop painter")?;
    info!(
        "painter exited successfully ({} batches, {} frames).",
        posted,
        frames.frames()
    );

    Ok(())
}
