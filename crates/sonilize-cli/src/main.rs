//! `sonilize` – command line front end for the Sonilize pipeline.
//!
//! ```text
//! sonilize demo [frames]    drive the pipeline with a synthetic sweep
//! sonilize replay <path>    replay a recorded session (JSON lines)
//! sonilize config           print the effective configuration
//! sonilize init             write the default config file
//! ```
//!
//! Ctrl-C stops the frame source; the pipeline then releases every audio
//! channel before the process exits.

mod config;
mod demo;
mod session;

use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

const DEFAULT_DEMO_FRAMES: usize = 150;

fn main() {
    // Held until exit so pending spans are flushed.
    let _telemetry = sonilize_runtime::init_tracing("sonilize");

    let args: Vec<String> = std::env::args().skip(1).collect();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – releasing all channels …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; Ctrl-C will terminate without releasing channels");
    }

    let result = match args.first().map(String::as_str) {
        Some("demo") => parse_frames(args.get(1)).and_then(|frames| cmd_demo(frames, shutdown)),
        Some("replay") => match args.get(1) {
            Some(path) => cmd_replay(PathBuf::from(path), shutdown),
            None => Err("Usage: sonilize replay <path>".to_string()),
        },
        Some("config") => cmd_config(),
        Some("init") => cmd_init(),
        None | Some("help" | "--help" | "-h") => {
            print_usage();
            Ok(())
        }
        Some(other) => {
            print_usage();
            Err(format!("Unknown command '{other}'"))
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_demo(frames: usize, shutdown: Arc<AtomicBool>) -> Result<(), String> {
    let cfg = config::effective()?;
    println!(
        "  Sweeping one object across the view over {} frames ({} sounds) …\n",
        frames.to_string().bold(),
        cfg.sounds.len()
    );
    let summary = block_on(session::demo(&cfg, frames, shutdown))??;
    print_summary(&summary);
    Ok(())
}

fn cmd_replay(path: PathBuf, shutdown: Arc<AtomicBool>) -> Result<(), String> {
    let cfg = config::effective()?;
    println!("  Replaying {} …\n", path.display().to_string().bold());
    let summary = block_on(session::replay(&cfg, &path, shutdown))??;
    print_summary(&summary);
    Ok(())
}

fn cmd_config() -> Result<(), String> {
    let path = config::config_path();
    let source = if path.exists() {
        path.display().to_string()
    } else {
        "defaults (no config file)".to_string()
    };
    let cfg = config::effective()?;
    let raw = toml::to_string_pretty(&cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    println!("  {} {}\n", "Effective configuration from".dimmed(), source.bold());
    println!("{raw}");
    Ok(())
}

fn cmd_init() -> Result<(), String> {
    let path = config::config_path();
    if config::load()?.is_some() {
        println!(
            "  {} Config already exists at {}",
            "•".yellow(),
            path.display().to_string().bold()
        );
        return Ok(());
    }
    config::save(&config::Config::default())?;
    println!(
        "  {} Config saved to {}",
        "✓".green().bold(),
        path.display().to_string().bold()
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn parse_frames(arg: Option<&String>) -> Result<usize, String> {
    match arg {
        None => Ok(DEFAULT_DEMO_FRAMES),
        Some(s) => s
            .parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| format!("Invalid frame count '{s}'")),
    }
}

/// Run `future` on a fresh multi-threaded runtime.
fn block_on<F: Future>(future: F) -> Result<F::Output, String> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start async runtime: {}", e))?;
    Ok(runtime.block_on(future))
}

fn print_summary(summary: &session::Summary) {
    println!();
    println!(
        "  {} {} frames sent, {} processed, {} skipped",
        "✓".green().bold(),
        summary.sent,
        summary.processed,
        summary.skipped
    );
}

fn print_usage() {
    println!("{} {}", "sonilize".bold(), format!("v{}", env!("CARGO_PKG_VERSION")).dimmed());
    println!("  Depth camera to spatial audio\n");
    println!("  {}", "Commands:".bold());
    println!("    {}   synthetic object sweep (default {DEFAULT_DEMO_FRAMES})", "demo [frames]".cyan());
    println!("    {}   replay recorded frames (JSON lines)", "replay <path>".cyan());
    println!("    {}          print the effective configuration", "config".cyan());
    println!("    {}            write {}", "init".cyan(), config::config_path().display());
}
