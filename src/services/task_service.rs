use crate::context::RequestContext;
use crate::models::{NewTask, Task, TaskChangeset};
use crate::repositories::error::StorageResult;
use crate::repositories::TaskRepository;
use std::sync::Arc;

#[derive(Clone)]
pub struct TaskService {
    repo: Arc<dyn TaskRepository>,
}

impl TaskService {
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, ctx: &RequestContext, task: NewTask) -> StorageResult<i32> {
        log::debug!("Creating task '{}' for person {:?}", task.title, task.people_id);
        self.repo.create(ctx, task).await
    }

    pub async fn get_by_id(&self, ctx: &RequestContext, task_id: i32) -> StorageResult<Task> {
        log::debug!("Fetching task {}", task_id);
        self.repo.get_by_id(ctx, task_id).await
    }

    pub async fn list(&self, ctx: &RequestContext) -> StorageResult<Vec<Task>> {
        log::debug!("Listing tasks");
        self.repo.list(ctx).await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        task_id: i32,
        changes: TaskChangeset,
    ) -> StorageResult<()> {
        log::debug!("Updating task {} with {:?}", task_id, changes);
        self.repo.update(ctx, task_id, changes).await
    }

    pub async fn update_people(
        &self,
        ctx: &RequestContext,
        people_id: i32,
        task_id: i32,
    ) -> StorageResult<()> {
        log::debug!("Assigning task {} to person {}", task_id, people_id);
        self.repo.update_people(ctx, people_id, task_id).await
    }

    pub async fn delete(&self, ctx: &RequestContext, task_id: i32) -> StorageResult<()> {
        log::debug!("Deleting task {}", task_id);
        self.repo.delete(ctx, task_id).await
    }
}
