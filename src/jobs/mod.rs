// src/jobs/mod.rs
//! In-process job runner for render jobs. Job state lives in the
//! render_jobs table; the runner tracks which jobs are currently executing
//! so the status endpoint can report on in-flight work.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub mod render_job;

pub struct JobRunner {
    active: RwLock<HashSet<Uuid>>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self {
            active: RwLock::new(HashSet::new()),
        }
    }

    /// Spawn a render job in the background. The job row must already exist
    /// in `queued` state.
    pub fn dispatch(self: &Arc<Self>, state: Arc<crate::AppState>, job_id: Uuid) {
        let runner = self.clone();
        tokio::spawn(async move {
            {
                let mut active = runner.active.write().await;
                active.insert(job_id);
            }
            tracing::info!(%job_id, "Processing render job");

            match render_job::execute_render_job(&state, job_id).await {
                Ok(output_url) => {
                    tracing::info!(%job_id, output_url, "Completed render job");
                }
                Err(e) => {
                    tracing::error!(%job_id, "Render job failed: {}", e);
                }
            }

            let mut active = runner.active.write().await;
            active.remove(&job_id);
        });
    }

    pub async fn active_count(&self) -> usize {
        self.active.read().await.len()
    }

    pub async fn is_active(&self, job_id: &Uuid) -> bool {
        self.active.read().await.contains(job_id)
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedJobRunner = Arc<JobRunner>;
