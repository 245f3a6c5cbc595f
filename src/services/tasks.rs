//! In-progress report generation tasks
//!
//! The generation pipeline registers the task producing each report so that
//! deleting the report can abort it.

use std::collections::HashMap;
use std::future::Future;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};

type TaskKey = (String, i64);

/// Registry of running generation tasks keyed by `(db_name, report_id)`
#[derive(Default)]
pub struct ReportTasks {
    handles: Mutex<HashMap<TaskKey, AbortHandle>>,
}

impl ReportTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a task for a report, replacing any previous entry
    pub async fn register(&self, db_name: &str, report_id: i64, handle: AbortHandle) {
        let mut handles = self.handles.lock().await;
        handles.retain(|_, h| !h.is_finished());
        handles.insert((db_name.to_string(), report_id), handle);
    }

    /// Spawn a generation future and register it
    pub async fn spawn<F>(&self, db_name: &str, report_id: i64, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        self.register(db_name, report_id, handle.abort_handle()).await;
        handle
    }

    /// Abort the report's task. Returns true when a running task was aborted.
    pub async fn cancel(&self, db_name: &str, report_id: i64) -> bool {
        let removed = self
            .handles
            .lock()
            .await
            .remove(&(db_name.to_string(), report_id));

        match removed {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    #[cfg(test)]
    async fn running(&self) -> usize {
        self.handles
            .lock()
            .await
            .values()
            .filter(|h| !h.is_finished())
            .count()
    }
}
