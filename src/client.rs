//! Blocking client for the backend, used from the dashboard's worker thread.

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;

use crate::api::{
    LoginRequest, LoginResponse, StartProcessingRequest, StartProcessingResponse, StatusResponse,
};
use crate::config::Config;
use crate::error::ClientError;
use crate::tasks::{TaskId, TaskStatus};

#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http: Client,
    retry_count: u32,
    retry_delay: Duration,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            retry_count: 5,
            retry_delay: Duration::from_secs(2),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        Ok(Self::new(&config.backend_access_url)?
            .with_retry(config.frontend_retry_count, config.frontend_retry_delay))
    }

    /// How often, and how far apart, a 404 from `check_status` is retried.
    pub fn with_retry(mut self, retry_count: u32, retry_delay: Duration) -> Self {
        self.retry_count = retry_count;
        self.retry_delay = retry_delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `Ok(None)` when the backend rejects the credentials.
    pub fn login(&self, username: &str, password: &str) -> Result<Option<String>, ClientError> {
        let resp = self
            .http
            .post(self.url("/login"))
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let body: LoginResponse = expect_success(resp)?.json()?;
        Ok(Some(body.token))
    }

    pub fn start_processing(&self, storage_key: &str, folder: &str) -> Result<TaskId, ClientError> {
        log::info!("Requesting processing of {storage_key}");
        let resp = self
            .http
            .post(self.url("/start-processing"))
            .json(&StartProcessingRequest {
                storage_key: storage_key.to_string(),
                folder: folder.to_string(),
            })
            .send()?;
        let body: StartProcessingResponse = expect_success(resp)?.json()?;
        log::info!("Backend started task {}", body.task_id);
        Ok(body.task_id)
    }

    /// One status lookup. A 404 is retried `retry_count` times, `retry_delay`
    /// apart, in case the task is not visible yet.
    pub fn check_status(&self, task_id: &TaskId) -> Result<StatusResponse, ClientError> {
        let url = self.url(&format!("/check-status/{task_id}"));
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let resp = self.http.get(&url).send()?;
            if resp.status() != StatusCode::NOT_FOUND {
                return Ok(expect_success(resp)?.json()?);
            }
            if attempt > self.retry_count {
                log::error!("Task {task_id} not found after {attempt} attempts");
                return Err(ClientError::RetriesExhausted {
                    task_id: task_id.to_string(),
                    attempts: attempt,
                });
            }
            log::warn!(
                "Task {task_id} not found, retrying in {:?} ({attempt}/{})",
                self.retry_delay,
                self.retry_count
            );
            thread::sleep(self.retry_delay);
        }
    }

    /// Poll until the task reaches a terminal state. `on_poll` sees every
    /// status received, including the final one.
    pub fn wait_for_completion(
        &self,
        task_id: &TaskId,
        poll_interval: Duration,
        mut on_poll: impl FnMut(&StatusResponse),
    ) -> Result<StatusResponse, ClientError> {
        loop {
            let status = self.check_status(task_id)?;
            on_poll(&status);
            if status.status != TaskStatus::Processing {
                return Ok(status);
            }
            thread::sleep(poll_interval);
        }
    }
}

fn expect_success(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(ClientError::UnexpectedStatus {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;
    use crate::auth::StaticAuthenticator;
    use crate::server::{serve_listener, AppState};
    use crate::storage::{BlobStore, MemoryBlobStore};
    use crate::tasks::{PipelineSettings, TaskManager};

    /// Run the backend on its own runtime thread; the blocking client must not
    /// be driven from inside a Tokio runtime.
    fn spawn_backend(store: MemoryBlobStore) -> SocketAddr {
        let (tx, rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();
                let tasks = TaskManager::new(Arc::new(store), PipelineSettings::default());
                let state = AppState::new(tasks, Arc::new(StaticAuthenticator::new("ana", "pw")));
                serve_listener(listener, state, std::future::pending()).await.unwrap();
            });
        });
        rx.recv().unwrap()
    }

    fn seeded_store(key: &str, body: &'static str) -> MemoryBlobStore {
        let store = MemoryBlobStore::new();
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(store.upload(Bytes::from(body), "scratch", key))
            .unwrap();
        store
    }

    #[test]
    fn full_round_trip_reaches_completed() {
        let store = seeded_store("f/uploads/c.csv", "SYMBOL,s1,s2\nA,10,30\nB,20,40\n");
        let addr = spawn_backend(store);
        let client = BackendClient::new(&format!("http://{addr}"))
            .unwrap()
            .with_retry(2, Duration::from_millis(10));

        let id = client.start_processing("f/uploads/c.csv", "f").unwrap();
        let mut polls = 0;
        let done = client
            .wait_for_completion(&id, Duration::from_millis(20), |_| polls += 1)
            .unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(
            done.result.as_deref(),
            Some(format!("f/processed/{id}_processed.csv").as_str())
        );
        assert!(polls >= 1);
    }

    #[test]
    fn unknown_task_exhausts_retries() {
        let addr = spawn_backend(MemoryBlobStore::new());
        let client = BackendClient::new(&format!("http://{addr}"))
            .unwrap()
            .with_retry(2, Duration::from_millis(5));
        let err = client
            .check_status(&TaskId::from("task_nope"))
            .unwrap_err();
        assert!(matches!(err, ClientError::RetriesExhausted { attempts: 3, .. }));
    }

    #[test]
    fn login_distinguishes_rejection_from_errors() {
        let addr = spawn_backend(MemoryBlobStore::new());
        let client = BackendClient::new(&format!("http://{addr}")).unwrap();
        assert!(client.login("ana", "pw").unwrap().is_some());
        assert_eq!(client.login("ana", "nope").unwrap(), None);
        assert!(matches!(
            client.login("", "pw").unwrap_err(),
            ClientError::UnexpectedStatus { status: 400, .. }
        ));
    }
}
