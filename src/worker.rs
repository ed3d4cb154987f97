use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use eframe::egui;
use tokio::runtime::Runtime;

use rnaseq_viz::client::BackendClient;
use rnaseq_viz::data::SummaryTable;
use rnaseq_viz::storage::{unique_folder, upload_key, BlobStore};
use rnaseq_viz::tasks::{TaskId, TaskStatus};

// ---------------------------------------------------------------------------
// Background processing run
// ---------------------------------------------------------------------------

/// What a run reports back to the UI thread.
#[derive(Debug)]
pub enum WorkerEvent {
    Progress(String),
    TaskStarted(TaskId),
    Polled(TaskStatus),
    Finished(Result<SummaryTable, String>),
}

/// Everything a run needs to talk to storage and the backend.
#[derive(Clone)]
pub struct Services {
    pub runtime: Arc<Runtime>,
    pub store: Arc<dyn BlobStore>,
    pub bucket: String,
    pub client: BackendClient,
    pub poll_interval: Duration,
}

/// Channel end held by the app; polled once per frame.
pub struct WorkerHandle {
    rx: Receiver<WorkerEvent>,
}

impl WorkerHandle {
    pub fn drain(&self) -> Vec<WorkerEvent> {
        self.rx.try_iter().collect()
    }
}

/// Upload `file`, start a task for it and poll until it finishes, on a
/// background thread.
pub fn spawn_run(services: Services, file: PathBuf, ctx: egui::Context) -> WorkerHandle {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let events = Events { tx, ctx };
        let outcome = run(&services, &file, &events);
        if let Err(message) = &outcome {
            log::error!("Run for {} failed: {message}", file.display());
        }
        events.send(WorkerEvent::Finished(outcome));
    });
    WorkerHandle { rx }
}

struct Events {
    tx: Sender<WorkerEvent>,
    ctx: egui::Context,
}

impl Events {
    fn send(&self, event: WorkerEvent) {
        // The UI may be gone already; nothing left to report to.
        if self.tx.send(event).is_ok() {
            self.ctx.request_repaint();
        }
    }

    fn progress(&self, line: impl Into<String>) {
        self.send(WorkerEvent::Progress(line.into()));
    }
}

fn run(services: &Services, file: &Path, events: &Events) -> Result<SummaryTable, String> {
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("{} has no usable file name", file.display()))?;
    let data = std::fs::read(file).map_err(|e| format!("Failed to read {}: {e}", file.display()))?;

    let folder = unique_folder();
    let key = upload_key(&folder, name);
    events.progress(format!("Uploading {name} ({} bytes)...", data.len()));
    services
        .runtime
        .block_on(services.store.upload(Bytes::from(data), &services.bucket, &key))
        .map_err(|e| format!("Upload failed: {e}"))?;
    events.progress(format!("Uploaded to {}/{key}", services.bucket));

    let task_id = services
        .client
        .start_processing(&key, &folder)
        .map_err(|e| e.to_string())?;
    events.send(WorkerEvent::TaskStarted(task_id.clone()));

    let last = services
        .client
        .wait_for_completion(&task_id, services.poll_interval, |status| {
            events.send(WorkerEvent::Polled(status.status));
        })
        .map_err(|e| e.to_string())?;

    let result = last.result.unwrap_or_default();
    if last.status == TaskStatus::Failed {
        return Err(result);
    }

    events.progress(format!("Downloading {result}..."));
    let csv = services
        .runtime
        .block_on(services.store.get(&services.bucket, &result))
        .map_err(|e| format!("Failed to fetch result: {e}"))?;
    SummaryTable::from_csv_bytes(csv).map_err(|e| format!("Unreadable result: {e}"))
}
