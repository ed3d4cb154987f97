mod app;
mod color;
mod state;
mod ui;
mod worker;

use std::sync::Arc;

use anyhow::Context;
use app::DashboardApp;
use eframe::egui;

use rnaseq_viz::client::BackendClient;
use rnaseq_viz::config::Config;
use rnaseq_viz::logging;
use worker::Services;

fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    logging::init(&config.log_level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("rnaseq-viz-io")
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    let services = Services {
        runtime: Arc::new(runtime),
        store: config
            .build_store()
            .context("failed to configure blob storage")?,
        bucket: config.bucket.clone(),
        client: BackendClient::from_config(&config).context("failed to build backend client")?,
        poll_interval: config.frontend_poll_interval,
    };
    log::info!("Dashboard talking to backend at {}", services.client.base_url());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    let auth = config.authenticator();
    eframe::run_native(
        "RNA-Seq Data Visualization",
        options,
        Box::new(move |_cc| Ok(Box::new(DashboardApp::new(auth, services)))),
    )
    .map_err(|e| anyhow::anyhow!("dashboard exited with an error: {e}"))
}
