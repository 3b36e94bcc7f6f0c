//! Application entry point — Voice Coach.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the tokio runtime (multi-thread, 2 workers).
//! 4. Spawn the session controller task.
//! 5. Run [`eframe::run_native`] — blocks the main thread until the window
//!    is closed.

use std::sync::Arc;

use tokio::sync::mpsc;
use voice_coach::{
    app::CoachApp,
    config::AppConfig,
    session::{new_shared_status, run_controller, SessionCommand},
};

use eframe::egui;

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let mut vp = egui::ViewportBuilder::default()
        .with_inner_size([320.0, 360.0])
        .with_min_inner_size([280.0, 300.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    if let Some((x, y)) = config.ui.window_position {
        vp = vp.with_position(egui::pos2(x, y));
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Voice Coach starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime (2 workers — controller plus the session loop)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Session controller
    let (command_tx, command_rx) = mpsc::channel::<SessionCommand>(16);
    let status = new_shared_status();
    rt.spawn(run_controller(
        config.clone(),
        Arc::clone(&status),
        command_rx,
    ));

    // 5. Run the window (blocks until closed)
    let app = CoachApp::new(status, command_tx);
    let options = native_options(&config);

    eframe::run_native("Voice Coach", options, Box::new(move |_cc| Ok(Box::new(app))))
}
