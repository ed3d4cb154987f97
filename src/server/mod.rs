//! HTTP surface of the backend.
//!
//! | method | path                        | body / reply                          |
//! |--------|-----------------------------|---------------------------------------|
//! | POST   | `/start-processing`         | `{storageKey, folder}` -> `{taskId}`  |
//! | GET    | `/check-status/:task_id`    | `{status, result?}` or 404            |
//! | POST   | `/login`                    | `{username, password}` -> `{token}`   |
//! | GET    | `/health`                   | `{status: "ok"}`                      |

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::auth::Authenticator;
use crate::tasks::TaskManager;

mod error;
mod routes;

pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub tasks: TaskManager,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    pub fn new(tasks: TaskManager, auth: Arc<dyn Authenticator>) -> Self {
        Self { tasks, auth }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/start-processing", post(routes::start_processing))
        .route("/start-processing/", post(routes::start_processing))
        .route("/check-status/:task_id", get(routes::check_status))
        .route("/login", post(routes::login))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("Backend listening on http://{}", listener.local_addr()?);
    serve_listener(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve_listener(
    listener: TcpListener,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
