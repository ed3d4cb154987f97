use std::path::PathBuf;

use rnaseq_viz::data::histogram::Histogram;
use rnaseq_viz::data::{Statistic, SummaryTable};
use rnaseq_viz::tasks::{TaskId, TaskStatus};

use crate::color::ColorMap;
use crate::worker::WorkerEvent;

/// Bins of the statistic histogram.
pub const HISTOGRAM_BINS: usize = 30;
/// Values above this percentile are left out of the histogram.
pub const CUTOFF_PERCENTILE: f64 = 95.0;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Where the user is in the login → upload → results flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Login,
    Ready,
    Working,
    Done,
    Failed,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub stage: Stage,

    pub username: String,
    pub password: String,
    pub token: Option<String>,

    /// File picked in the upload dialog.
    pub selected_file: Option<PathBuf>,

    /// Progress lines of the current run, oldest first.
    pub progress: Vec<String>,
    pub task_id: Option<TaskId>,
    pub last_status: Option<TaskStatus>,

    /// Processed dataset (None until a task completes).
    pub summary: Option<SummaryTable>,

    /// Statistic shown in the histogram.
    pub statistic: Statistic,
    /// Histogram of `statistic` over `summary` (cached).
    pub histogram: Option<Histogram>,

    pub colors: ColorMap,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            stage: Stage::Login,
            username: String::new(),
            password: String::new(),
            token: None,
            selected_file: None,
            progress: Vec::new(),
            task_id: None,
            last_status: None,
            summary: None,
            statistic: Statistic::Mean,
            histogram: None,
            colors: ColorMap::for_statistics(),
            status_message: None,
        }
    }
}

impl AppState {
    pub fn logged_in(&mut self, token: String) {
        self.token = Some(token);
        self.password.clear();
        self.stage = Stage::Ready;
        self.status_message = None;
    }

    pub fn log_out(&mut self) {
        *self = AppState {
            username: std::mem::take(&mut self.username),
            ..AppState::default()
        };
    }

    /// Reset per-run state before a new upload.
    pub fn begin_run(&mut self) {
        self.stage = Stage::Working;
        self.progress.clear();
        self.task_id = None;
        self.last_status = None;
        self.summary = None;
        self.histogram = None;
        self.status_message = None;
    }

    pub fn apply(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Progress(line) => self.progress.push(line),
            WorkerEvent::TaskStarted(id) => {
                self.progress.push(format!("Task {id} started"));
                self.task_id = Some(id);
                self.last_status = Some(TaskStatus::Processing);
            }
            WorkerEvent::Polled(status) => self.last_status = Some(status),
            WorkerEvent::Finished(Ok(summary)) => {
                self.progress.push(format!("Processed {} rows", summary.len()));
                self.set_summary(summary);
                self.stage = Stage::Done;
            }
            WorkerEvent::Finished(Err(message)) => {
                self.progress.push(format!("Failed: {message}"));
                self.status_message = Some(message);
                self.stage = Stage::Failed;
            }
        }
    }

    /// Ingest a processed dataset and build its histogram.
    pub fn set_summary(&mut self, summary: SummaryTable) {
        self.summary = Some(summary);
        self.rebuild_histogram();
    }

    pub fn set_statistic(&mut self, statistic: Statistic) {
        if self.statistic != statistic {
            self.statistic = statistic;
            self.rebuild_histogram();
        }
    }

    fn rebuild_histogram(&mut self) {
        self.histogram = self.summary.as_ref().map(|s| {
            Histogram::with_cutoff(
                &s.statistic_values(self.statistic),
                HISTOGRAM_BINS,
                CUTOFF_PERCENTILE,
            )
        });
    }

    pub fn can_start(&self) -> bool {
        self.selected_file.is_some()
            && matches!(self.stage, Stage::Ready | Stage::Done | Stage::Failed)
    }
}
