//! Backend service: task submission and status polling over HTTP.

use anyhow::Context;

use rnaseq_viz::config::Config;
use rnaseq_viz::logging;
use rnaseq_viz::server::{self, AppState};
use rnaseq_viz::tasks::TaskManager;

fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    logging::init(&config.log_level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.backend_workers)
        .thread_name("rnaseq-backend")
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let store = config
        .build_store()
        .context("failed to configure blob storage")?;
    let tasks = TaskManager::new(store, config.pipeline_settings());
    let state = AppState::new(tasks, config.authenticator());

    log::info!(
        "Starting backend with {} worker thread(s), identifier column '{}'",
        config.backend_workers,
        config.identifier_column
    );
    server::serve(addr, state)
        .await
        .with_context(|| format!("server on {addr} failed"))
}
