// THEORY:
// The frame loop sits between a capture callback and a display. Capture may
// deliver frames faster than they can be annotated; only the newest frame is
// worth drawing, so the handoff is a `watch` channel: pushing a frame replaces
// whatever the loop has not picked up yet.
//
// Key architectural principles:
// 1.  **Latest Frame Wins**: Frames overwritten before the loop reads them are
//     dropped and counted, never queued.
// 2.  **Keep Last Good Image**: When a frame carries no depth, or processing it
//     fails, the overlay channel is left alone. The display keeps showing the
//     last good overlay instead of going blank.
// 3.  **Off the Async Threads**: Annotation is CPU work, so each frame runs on
//     tokio's blocking pool while the loop task only waits.
// 4.  **Owned Shutdown**: Dropping the `FrameSource` ends the loop; the join
//     handle then yields the loop's counters.

use crate::core_modules::depth_buffer::OwnedDepthMap;
use crate::pipeline::{AnnotatedImage, DepthOverlayPipeline, Report};
use image::RgbaImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One frame as handed over by the capture side.
#[derive(Debug)]
pub struct CapturedFrame {
    /// Assigned by `FrameSource`, starting at 0.
    pub sequence: u64,
    pub color: RgbaImage,
    pub depth: Option<OwnedDepthMap>,
}

/// Capture-side handle: push frames in, newest first.
pub struct FrameSource {
    frames_tx: watch::Sender<Option<Arc<CapturedFrame>>>,
    next_sequence: AtomicU64,
}

impl FrameSource {
    /// Publishes a frame, replacing any frame the loop has not started yet.
    /// Returns `false` once the loop has exited.
    pub fn push(&self, color: RgbaImage, depth: Option<OwnedDepthMap>) -> bool {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let frame = CapturedFrame {
            sequence,
            color,
            depth,
        };
        self.frames_tx.send(Some(Arc::new(frame))).is_ok()
    }
}

/// Display-side handles. Each holds `None` until the first image arrives.
pub struct DisplayHandles {
    pub overlay: watch::Receiver<Option<Arc<AnnotatedImage>>>,
    pub live_feed: watch::Receiver<Option<Arc<RgbaImage>>>,
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameLoopStats {
    pub annotated: u64,
    pub without_depth: u64,
    pub failed: u64,
    /// Frames replaced before the loop got to them.
    pub dropped: u64,
}

/// Starts the loop on the current tokio runtime.
pub fn spawn_frame_loop(
    pipeline: DepthOverlayPipeline,
) -> (FrameSource, DisplayHandles, JoinHandle<FrameLoopStats>) {
    let (frames_tx, frames_rx) = watch::channel(None);
    let (overlay_tx, overlay_rx) = watch::channel(None);
    let (live_tx, live_rx) = watch::channel(None);

    let handle = tokio::spawn(run(Arc::new(pipeline), frames_rx, overlay_tx, live_tx));

    let source = FrameSource {
        frames_tx,
        next_sequence: AtomicU64::new(0),
    };
    let display = DisplayHandles {
        overlay: overlay_rx,
        live_feed: live_rx,
    };
    (source, display, handle)
}

async fn run(
    pipeline: Arc<DepthOverlayPipeline>,
    mut frames: watch::Receiver<Option<Arc<CapturedFrame>>>,
    overlay_tx: watch::Sender<Option<Arc<AnnotatedImage>>>,
    live_tx: watch::Sender<Option<Arc<RgbaImage>>>,
) -> FrameLoopStats {
    info!("frame loop started");
    let mut stats = FrameLoopStats::default();
    let mut expected_sequence = 0u64;

    while frames.changed().await.is_ok() {
        let Some(frame) = frames.borrow_and_update().clone() else {
            continue;
        };
        stats.dropped += frame.sequence.saturating_sub(expected_sequence);
        expected_sequence = frame.sequence + 1;

        let worker = Arc::clone(&pipeline);
        let sequence = frame.sequence;
        let result = tokio::task::spawn_blocking(move || {
            worker.process_frame(&frame.color, frame.depth.as_ref())
        })
        .await;

        match result {
            Ok(Ok(Report::Annotated(data))) => {
                stats.annotated += 1;
                // Overlay first: once the live feed moves, this frame is fully published.
                overlay_tx.send_replace(Some(Arc::new(data.overlay)));
                live_tx.send_replace(Some(Arc::new(data.live_feed)));
                debug!(sequence, "overlay published");
            }
            Ok(Ok(Report::NoDepthData { live_feed })) => {
                stats.without_depth += 1;
                live_tx.send_replace(Some(Arc::new(live_feed)));
                debug!(sequence, "no depth, keeping previous overlay");
            }
            Ok(Err(err)) => {
                stats.failed += 1;
                warn!(sequence, %err, "frame skipped, keeping previous overlay");
            }
            Err(err) => {
                stats.failed += 1;
                warn!(sequence, %err, "frame worker did not complete");
            }
        }
    }

    info!(
        annotated = stats.annotated,
        without_depth = stats.without_depth,
        failed = stats.failed,
        dropped = stats.dropped,
        "frame loop stopped"
    );
    stats
}
