mod app;
mod backend;
mod config;
mod event;
mod export;
mod preview;
mod session;
mod theme;

use anyhow::Context;
use app::PlayforgeApp;
use backend::BackendClient;
use config::AppConfig;
use eframe::egui;
use std::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env().context("loading configuration")?;
    info!("game backend: {}", config.backend_url);

    let (tx, rx) = mpsc::channel();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("playforge-runtime")
        .build()
        .context("building tokio runtime")?;

    let backend = runtime.block_on(async { BackendClient::new(&config, tx.clone()) })?;
    backend.start();

    let app = PlayforgeApp::new(rx, backend, &config);
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 860.0])
            .with_min_inner_size([1080.0, 660.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Playforge",
        native_options,
        Box::new(move |creation_context| {
            app.apply_theme(&creation_context.egui_ctx);
            Ok(Box::new(app))
        }),
    )
    .map_err(|err| anyhow::anyhow!("eframe exited with an error: {err}"))?;

    Ok(())
}
