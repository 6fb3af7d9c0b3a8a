use super::error::{StorageError, StorageResult};
use super::transaction::bounded_transaction;
use super::TaskRepository;
use crate::context::RequestContext;
use crate::db::DbPool;
use crate::models::{NewTask, NewTaskRecord, NewTimeEntry, Task, TaskChangeset, TaskRecord, TimeEntry};
use crate::schema::{tasks, time_entries};
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sql_query;
use diesel::sql_types::Integer;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::RunQueryDsl;

// The current time entry of a task is the most recently inserted one.
const REASSIGN_CURRENT_ENTRY: &str = "UPDATE time_entries SET people_id = $1 \
     WHERE id = (SELECT MAX(id) FROM time_entries WHERE task_id = $2)";

#[derive(Clone)]
pub struct PgTaskRepository {
    pool: DbPool,
}

impl PgTaskRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert_with_entry(&self, ctx: &RequestContext, task: NewTask) -> StorageResult<i32> {
        let people_id = task.people_id;

        // Both inserts commit together or not at all.
        let result = bounded_transaction(&self.pool, ctx, move |conn| {
            async move {
                let new_task_id = diesel::insert_into(tasks::table)
                    .values(&NewTaskRecord {
                        title: &task.title,
                        description: &task.description,
                    })
                    .returning(tasks::id)
                    .get_result::<i32>(conn)
                    .await?;

                let inserted = diesel::insert_into(time_entries::table)
                    .values(&NewTimeEntry {
                        task_id: new_task_id,
                        people_id: task.people_id,
                        start_time: task.start_time,
                        end_time: task.end_time,
                    })
                    .execute(conn)
                    .await?;

                if inserted == 0 {
                    log::error!("Time entry for new task {} was not inserted", new_task_id);
                    return Err(StorageError::Database(DieselError::RollbackTransaction));
                }

                Ok(new_task_id)
            }
            .scope_boxed()
        })
        .await;

        match result {
            Ok(new_task_id) => {
                log::debug!("Created task {} with its first time entry", new_task_id);
                Ok(new_task_id)
            }
            Err(err) if err.is_foreign_key_violation() => Err(StorageError::InvalidInput(format!(
                "person with id {:?} does not exist",
                people_id
            ))),
            Err(err) => Err(err),
        }
    }

    async fn find(&self, ctx: &RequestContext, task_id: i32) -> StorageResult<Task> {
        let row = bounded_transaction(&self.pool, ctx, move |conn| {
            async move {
                let row = tasks::table
                    .inner_join(time_entries::table)
                    .filter(tasks::id.eq(task_id))
                    .order(time_entries::id.desc())
                    .select((TaskRecord::as_select(), TimeEntry::as_select()))
                    .first::<(TaskRecord, TimeEntry)>(conn)
                    .await
                    .optional()?;
                Ok(row)
            }
            .scope_boxed()
        })
        .await?;

        row.map(Task::from)
            .ok_or_else(|| StorageError::NotFound(format!("task with id {} not found", task_id)))
    }

    async fn find_all(&self, ctx: &RequestContext) -> StorageResult<Vec<Task>> {
        let rows = bounded_transaction(&self.pool, ctx, |conn| {
            async move {
                let rows = tasks::table
                    .inner_join(time_entries::table)
                    .order((tasks::id.asc(), time_entries::id.desc()))
                    .select((TaskRecord::as_select(), TimeEntry::as_select()))
                    .load::<(TaskRecord, TimeEntry)>(conn)
                    .await?;
                Ok(rows)
            }
            .scope_boxed()
        })
        .await?;

        // Rows come grouped by task with the current entry first; keep that one.
        let mut task_list: Vec<Task> = Vec::new();
        for (task_db, entry) in rows {
            if task_list.last().is_some_and(|t| t.id == task_db.id) {
                continue;
            }
            task_list.push(Task::from((task_db, entry)));
        }

        Ok(task_list)
    }

    async fn apply_changes(
        &self,
        ctx: &RequestContext,
        task_id: i32,
        changes: TaskChangeset,
    ) -> StorageResult<()> {
        let num_updated = bounded_transaction(&self.pool, ctx, move |conn| {
            async move {
                let num_updated = diesel::update(tasks::table.find(task_id))
                    .set(&changes)
                    .execute(conn)
                    .await?;
                Ok(num_updated)
            }
            .scope_boxed()
        })
        .await?;

        if num_updated == 0 {
            return Err(StorageError::NotFound(format!(
                "task with id {} not found for update",
                task_id
            )));
        }
        Ok(())
    }

    async fn reassign(&self, ctx: &RequestContext, people_id: i32, task_id: i32) -> StorageResult<()> {
        let num_updated = bounded_transaction(&self.pool, ctx, move |conn| {
            async move {
                let num_updated = sql_query(REASSIGN_CURRENT_ENTRY)
                    .bind::<Integer, _>(people_id)
                    .bind::<Integer, _>(task_id)
                    .execute(conn)
                    .await?;
                Ok(num_updated)
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| {
            if err.is_foreign_key_violation() {
                StorageError::InvalidInput(format!("person with id {} does not exist", people_id))
            } else {
                err
            }
        })?;

        if num_updated == 0 {
            return Err(StorageError::NotFound(format!(
                "no time entry for task {}",
                task_id
            )));
        }
        log::debug!("Task {} reassigned to person {}", task_id, people_id);
        Ok(())
    }

    async fn remove(&self, ctx: &RequestContext, task_id: i32) -> StorageResult<()> {
        // time_entries rows go with the task (ON DELETE CASCADE).
        let num_deleted = bounded_transaction(&self.pool, ctx, move |conn| {
            async move {
                let num_deleted = diesel::delete(tasks::table.find(task_id))
                    .execute(conn)
                    .await?;
                Ok(num_deleted)
            }
            .scope_boxed()
        })
        .await?;

        if num_deleted == 0 {
            return Err(StorageError::NotFound(format!(
                "task with id {} not found to delete",
                task_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn create(&self, ctx: &RequestContext, task: NewTask) -> StorageResult<i32> {
        ctx.run("task.create", self.insert_with_entry(ctx, task)).await
    }

    async fn get_by_id(&self, ctx: &RequestContext, task_id: i32) -> StorageResult<Task> {
        ctx.run("task.get_by_id", self.find(ctx, task_id)).await
    }

    async fn list(&self, ctx: &RequestContext) -> StorageResult<Vec<Task>> {
        ctx.run("task.list", self.find_all(ctx)).await
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        task_id: i32,
        changes: TaskChangeset,
    ) -> StorageResult<()> {
        let changes = changes.normalized();
        if changes.is_empty() {
            return Err(StorageError::NoChangesRequested);
        }
        ctx.run("task.update", self.apply_changes(ctx, task_id, changes))
            .await
    }

    async fn update_people(
        &self,
        ctx: &RequestContext,
        people_id: i32,
        task_id: i32,
    ) -> StorageResult<()> {
        if people_id <= 0 || task_id <= 0 {
            return Err(StorageError::InvalidInput(format!(
                "people_id ({}) and task_id ({}) must be positive",
                people_id, task_id
            )));
        }
        ctx.run("task.update_people", self.reassign(ctx, people_id, task_id))
            .await
    }

    async fn delete(&self, ctx: &RequestContext, task_id: i32) -> StorageResult<()> {
        ctx.run("task.delete", self.remove(ctx, task_id)).await
    }
}
