//! Session – runs a frame source through the frame driver and prints every
//! frame's report.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use colored::Colorize;
use sonilize_audio::{ChannelPool, LoopedChannelPool};
use sonilize_runtime::{FrameDriver, FrameSender, Pipeline, PointCloudFrame, ProcessedFrame};
use sonilize_types::ChannelId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::Config;
use crate::demo::Sweep;

/// Longest pause honoured between two recorded frames.
const MAX_REPLAY_GAP: Duration = Duration::from_secs(1);
/// Frame interval of the synthetic sensor (~30 fps).
const DEMO_INTERVAL: Duration = Duration::from_millis(33);

/// Totals printed when a session ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub sent: usize,
    pub skipped: usize,
    pub processed: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame sources
// ─────────────────────────────────────────────────────────────────────────────

/// Feed `frames` synthetic sweep frames.
pub async fn demo(cfg: &Config, frames: usize, shutdown: Arc<AtomicBool>) -> Result<Summary, String> {
    let sweep = Sweep::new(frames, &cfg.pipeline);
    run(cfg, shutdown.clone(), move |tx: FrameSender| async move {
        let mut sent = 0;
        for i in 0..sweep.frames() {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            if tx.send(sweep.frame(i)).await.is_err() {
                break;
            }
            sent += 1;
            tokio::time::sleep(DEMO_INTERVAL).await;
        }
        Ok((sent, 0))
    })
    .await
}

/// Feed the frames recorded in `path`, one JSON frame per line, paced by
/// their timestamps.  Malformed lines are skipped with a warning.
pub async fn replay(cfg: &Config, path: &Path, shutdown: Arc<AtomicBool>) -> Result<Summary, String> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
    let display = path.display().to_string();

    run(cfg, shutdown.clone(), move |tx: FrameSender| async move {
        let mut lines = BufReader::new(file).lines();
        let mut last: Option<PointCloudFrame> = None;
        let (mut sent, mut skipped) = (0, 0);
        let mut line_no = 0;

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| format!("Failed to read {display}: {e}"))?
        {
            line_no += 1;
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            let frame = match PointCloudFrame::from_json_line(&line) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(line = line_no, error = %e, "skipping recorded frame");
                    skipped += 1;
                    continue;
                }
            };
            if let Some(prev) = &last {
                tokio::time::sleep(replay_gap(prev, &frame)).await;
            }
            if tx.send(frame.clone()).await.is_err() {
                break;
            }
            last = Some(frame);
            sent += 1;
        }
        Ok((sent, skipped))
    })
    .await
}

/// Time to wait between two recorded frames.
pub(crate) fn replay_gap(prev: &PointCloudFrame, next: &PointCloudFrame) -> Duration {
    (next.timestamp - prev.timestamp)
        .to_std()
        .unwrap_or(Duration::ZERO)
        .min(MAX_REPLAY_GAP)
}

// ─────────────────────────────────────────────────────────────────────────────
// Driver plumbing
// ─────────────────────────────────────────────────────────────────────────────

async fn run<F, Fut>(cfg: &Config, shutdown: Arc<AtomicBool>, feed: F) -> Result<Summary, String>
where
    F: FnOnce(FrameSender) -> Fut,
    Fut: Future<Output = Result<(usize, usize), String>>,
{
    let pool = LoopedChannelPool::new(cfg.sounds.iter().cloned());
    let pipeline = Pipeline::new(cfg.pipeline, pool).map_err(|e| e.to_string())?;

    let (reports_tx, mut reports_rx) = mpsc::unbounded_channel();
    let (driver, tx) = FrameDriver::spawn(pipeline, cfg.frame_queue, Some(reports_tx));

    let sounds = cfg.sounds.clone();
    let printer = tokio::spawn(async move {
        while let Some(frame) = reports_rx.recv().await {
            println!("{}", describe(&frame, &sounds));
        }
    });

    // The sender is moved into the feed and dropped when it returns, which
    // ends the driver loop.
    let fed = feed(tx).await;

    let pipeline = driver
        .finish()
        .await
        .map_err(|e| format!("Frame driver failed: {e}"))?;
    if let Err(e) = printer.await {
        warn!(error = %e, "report printer failed");
    }

    if shutdown.load(Ordering::SeqCst) {
        println!("{}", "  ✓ Interrupted; all channels released.".green());
    }
    let (sent, skipped) = fed?;
    let leased = pipeline.pool().leased();
    if leased > 0 {
        warn!(leased, "channels still leased after shutdown");
    }
    Ok(Summary {
        sent,
        skipped,
        processed: pipeline.frames(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn sound_name(sounds: &[String], id: ChannelId) -> &str {
    (id.get() as usize)
        .checked_sub(1)
        .and_then(|i| sounds.get(i))
        .map_or("?", String::as_str)
}

/// One line per processed frame: `+` created, `=` continued, `-` released,
/// `!` rejected.
pub(crate) fn describe(frame: &ProcessedFrame, sounds: &[String]) -> String {
    let report = &frame.report;
    let mut parts = vec![format!("frame {:>5}", frame.frame).dimmed().to_string()];

    for &id in &report.created {
        parts.push(format!("+{}({})", id, sound_name(sounds, id)).green().to_string());
    }
    for &id in &report.continued {
        parts.push(format!("={}", id));
    }
    for &id in &report.released {
        parts.push(format!("-{}", id).yellow().to_string());
    }
    for rejection in &report.rejected {
        parts.push(format!("!{}", rejection.error).red().to_string());
    }
    if frame.dropped > 0 {
        parts.push(format!("(dropped {})", frame.dropped).dimmed().to_string());
    }
    if parts.len() == 1 {
        parts.push("silence".dimmed().to_string());
    }
    parts.join("  ")
}
