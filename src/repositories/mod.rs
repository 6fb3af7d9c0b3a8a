//! Repository contracts over the persisted people, tasks and time entries.
//!
//! Each capability set sits behind its own trait so the service layer can be
//! wired to PostgreSQL in production and to an in-memory store in tests.

pub mod error;
pub mod people_repository;
pub mod task_repository;
pub mod time_repository;
mod transaction;

#[cfg(test)]
pub(crate) mod in_memory;

use crate::context::RequestContext;
use crate::db::DbPool;
use crate::models::{
    NewPerson, NewTask, NewTimeEntry, Person, PersonChangeset, PersonFilter, Task, TaskChangeset,
    TaskTimeSpent,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use error::StorageResult;
use std::sync::Arc;

pub use people_repository::PgPeopleRepository;
pub use task_repository::PgTaskRepository;
pub use time_repository::PgTimeRepository;

#[async_trait]
pub trait PeopleRepository: Send + Sync {
    async fn create(&self, ctx: &RequestContext, person: NewPerson) -> StorageResult<i32>;
    async fn get_by_id(&self, ctx: &RequestContext, people_id: i32) -> StorageResult<Person>;
    /// `limit == 0` returns every matching row; see [`crate::models::Pagination`].
    async fn get_by_filter(
        &self,
        ctx: &RequestContext,
        filter: PersonFilter,
        limit: i64,
        offset: i64,
    ) -> StorageResult<Vec<Person>>;
    async fn list(&self, ctx: &RequestContext) -> StorageResult<Vec<Person>>;
    async fn update(
        &self,
        ctx: &RequestContext,
        people_id: i32,
        changes: PersonChangeset,
    ) -> StorageResult<()>;
    async fn delete(&self, ctx: &RequestContext, people_id: i32) -> StorageResult<()>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Inserts the task and its first time entry atomically.
    async fn create(&self, ctx: &RequestContext, task: NewTask) -> StorageResult<i32>;
    async fn get_by_id(&self, ctx: &RequestContext, task_id: i32) -> StorageResult<Task>;
    async fn list(&self, ctx: &RequestContext) -> StorageResult<Vec<Task>>;
    async fn update(
        &self,
        ctx: &RequestContext,
        task_id: i32,
        changes: TaskChangeset,
    ) -> StorageResult<()>;
    async fn update_people(
        &self,
        ctx: &RequestContext,
        people_id: i32,
        task_id: i32,
    ) -> StorageResult<()>;
    async fn delete(&self, ctx: &RequestContext, task_id: i32) -> StorageResult<()>;
}

#[async_trait]
pub trait TimeRepository: Send + Sync {
    async fn start_time_entry(
        &self,
        ctx: &RequestContext,
        task_id: i32,
        start_time: DateTime<Utc>,
    ) -> StorageResult<()>;
    async fn end_time_entry(
        &self,
        ctx: &RequestContext,
        task_id: i32,
        end_time: DateTime<Utc>,
    ) -> StorageResult<()>;
    async fn add_time_entry(&self, ctx: &RequestContext, entry: NewTimeEntry)
        -> StorageResult<i32>;
    async fn tasks_time_spent(
        &self,
        ctx: &RequestContext,
        people_id: i32,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> StorageResult<Vec<TaskTimeSpent>>;
}

/// The three repository capability sets grouped for the service layer.
#[derive(Clone)]
pub struct Storage {
    pub people: Arc<dyn PeopleRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub time: Arc<dyn TimeRepository>,
}

impl Storage {
    pub fn postgres(pool: DbPool) -> Self {
        Storage {
            people: Arc::new(PgPeopleRepository::new(pool.clone())),
            tasks: Arc::new(PgTaskRepository::new(pool.clone())),
            time: Arc::new(PgTimeRepository::new(pool)),
        }
    }
}
