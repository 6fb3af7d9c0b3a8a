use crate::context::RequestContext;
use crate::models::{NewTimeEntry, TaskTimeSpent};
use crate::repositories::error::StorageResult;
use crate::repositories::TimeRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct TimeService {
    repo: Arc<dyn TimeRepository>,
}

impl TimeService {
    pub fn new(repo: Arc<dyn TimeRepository>) -> Self {
        Self { repo }
    }

    pub async fn start_time_entry(
        &self,
        ctx: &RequestContext,
        task_id: i32,
        start_time: DateTime<Utc>,
    ) -> StorageResult<()> {
        log::debug!("Starting task {} at {}", task_id, start_time);
        self.repo.start_time_entry(ctx, task_id, start_time).await
    }

    pub async fn end_time_entry(
        &self,
        ctx: &RequestContext,
        task_id: i32,
        end_time: DateTime<Utc>,
    ) -> StorageResult<()> {
        log::debug!("Ending task {} at {}", task_id, end_time);
        self.repo.end_time_entry(ctx, task_id, end_time).await
    }

    pub async fn add_time_entry(
        &self,
        ctx: &RequestContext,
        entry: NewTimeEntry,
    ) -> StorageResult<i32> {
        log::debug!("Adding time entry to task {}", entry.task_id);
        self.repo.add_time_entry(ctx, entry).await
    }

    pub async fn tasks_time_spent(
        &self,
        ctx: &RequestContext,
        people_id: i32,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> StorageResult<Vec<TaskTimeSpent>> {
        log::debug!(
            "Summing time of person {} between {} and {}",
            people_id,
            start_time,
            end_time
        );
        self.repo
            .tasks_time_spent(ctx, people_id, start_time, end_time)
            .await
    }
}
