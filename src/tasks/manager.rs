use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::data::{
    load_file_as, summarize, validate, TableFormat, TextColumns, DEFAULT_IDENTIFIER_COLUMN,
};
use crate::error::{Error, StorageError, TaskError};
use crate::storage::{processed_key, BlobStore};

use super::registry::{TaskId, TaskRecord, TaskRegistry, TaskStatus};

/// Static inputs of the processing pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Bucket holding both uploads and processed results.
    pub bucket: String,
    pub identifier_column: String,
    /// Where per-task scratch files go; the system temp dir if `None`.
    pub temp_dir: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            bucket: "scratch".to_string(),
            identifier_column: DEFAULT_IDENTIFIER_COLUMN.to_string(),
            temp_dir: None,
        }
    }
}

/// Owns the task registry and runs one background pipeline per submission.
///
/// Cloning is cheap; clones share the registry and the store.
#[derive(Clone)]
pub struct TaskManager {
    registry: Arc<TaskRegistry>,
    store: Arc<dyn BlobStore>,
    settings: Arc<PipelineSettings>,
}

/// Handle to a spawned pipeline.
///
/// Dropping it detaches the task; the registry still receives its final
/// state.
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    join: JoinHandle<TaskStatus>,
}

impl TaskHandle {
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// Let the pipeline run unobserved and keep only its id.
    pub fn detach(self) -> TaskId {
        self.id
    }

    /// Wait for the pipeline to reach a terminal state.
    pub async fn wait(self) -> Result<TaskStatus, Error> {
        self.join
            .await
            .map_err(|e| Error::Internal(format!("task {} panicked: {e}", self.id)))
    }
}

impl TaskManager {
    pub fn new(store: Arc<dyn BlobStore>, settings: PipelineSettings) -> Self {
        Self {
            registry: Arc::new(TaskRegistry::new()),
            store,
            settings: Arc::new(settings),
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Register a task for `storage_key` and start processing it in the
    /// background. Returns as soon as the task is visible as `processing`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_task(&self, storage_key: &str, folder: &str) -> Result<TaskHandle, TaskError> {
        let id = self.registry.register()?;
        log::info!("Starting task {id} for {storage_key}");

        let manager = self.clone();
        let task_id = id.clone();
        let storage_key = storage_key.to_string();
        let folder = folder.to_string();
        let pipeline = tokio::spawn(async move {
            manager.run_to_completion(&task_id, &storage_key, &folder).await
        });

        // A panic inside the pipeline must still leave a terminal record.
        let registry = Arc::clone(&self.registry);
        let task_id = id.clone();
        let join = tokio::spawn(async move {
            match pipeline.await {
                Ok(status) => status,
                Err(e) => {
                    log::error!("Task {task_id} aborted: {e}");
                    if let Err(err) = registry.fail(&task_id, format!("processing aborted: {e}")) {
                        log::error!("Could not record final state of task {task_id}: {err}");
                    }
                    TaskStatus::Failed
                }
            }
        });
        Ok(TaskHandle { id, join })
    }

    /// Current snapshot of a task.
    pub fn status(&self, id: &TaskId) -> Result<TaskRecord, TaskError> {
        self.registry.status(id)
    }

    async fn run_to_completion(&self, id: &TaskId, storage_key: &str, folder: &str) -> TaskStatus {
        let outcome = self.process_file(id, storage_key, folder).await;
        let (status, recorded) = match outcome {
            Ok(result_key) => {
                log::info!("Task {id} completed: {result_key}");
                (TaskStatus::Completed, self.registry.complete(id, result_key))
            }
            Err(e) => {
                log::error!("Task {id} failed: {e}");
                (TaskStatus::Failed, self.registry.fail(id, e.to_string()))
            }
        };
        if let Err(e) = recorded {
            log::error!("Could not record final state of task {id}: {e}");
        }
        status
    }

    /// download → validate → aggregate → upload. The scratch file is removed
    /// when this returns, whatever the outcome.
    async fn process_file(
        &self,
        id: &TaskId,
        storage_key: &str,
        folder: &str,
    ) -> Result<String, Error> {
        let settings = &self.settings;
        let format = TableFormat::from_key(storage_key);
        let scratch = scratch_file(settings.temp_dir.as_deref(), format)?;

        self.store
            .download(&settings.bucket, storage_key, scratch.path())
            .await?;

        let path = scratch.path().to_path_buf();
        let identifier_column = settings.identifier_column.clone();
        let csv = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, Error> {
            let table = load_file_as(&path, format, TextColumns::Named(&identifier_column))?;
            log::info!(
                "Loaded {} rows x {} columns",
                table.n_rows(),
                table.n_columns()
            );
            let matrix = validate(&table, &identifier_column)?;
            let summary = summarize(&matrix);
            Ok(summary.to_csv_bytes()?)
        })
        .await
        .map_err(|e| Error::Internal(format!("processing worker panicked: {e}")))??;

        let result_key = processed_key(folder, id.as_str());
        let stored = self
            .store
            .upload(csv.into(), &settings.bucket, &result_key)
            .await?;
        Ok(stored)
    }
}

fn scratch_file(
    temp_dir: Option<&Path>,
    format: TableFormat,
) -> Result<tempfile::NamedTempFile, Error> {
    let suffix = format!(".{}", format.extension());
    let mut builder = tempfile::Builder::new();
    builder.prefix("rnaseq-").suffix(&suffix);
    let file = match temp_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    };
    file.map_err(|source| {
        let path = temp_dir.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
        Error::Storage(StorageError::Io { path, source })
    })
}
