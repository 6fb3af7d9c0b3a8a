use super::error::{StorageError, StorageResult};
use super::transaction::bounded_transaction;
use super::TimeRepository;
use crate::context::RequestContext;
use crate::db::DbPool;
use crate::models::{NewTimeEntry, TaskTimeSpent, TaskTimeSpentRow};
use crate::schema::time_entries;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{Integer, Timestamptz};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::RunQueryDsl;

// Both setters touch only the task's current (latest) entry and refuse to
// invert the span when the other end is already set.
const SET_CURRENT_START: &str = "UPDATE time_entries SET start_time = $1 \
     WHERE id = (SELECT MAX(id) FROM time_entries WHERE task_id = $2) \
     AND (end_time IS NULL OR end_time >= $1)";

const SET_CURRENT_END: &str = "UPDATE time_entries SET end_time = $1 \
     WHERE id = (SELECT MAX(id) FROM time_entries WHERE task_id = $2) \
     AND (start_time IS NULL OR start_time <= $1)";

// Open entries (NULL start or end) never satisfy the window predicate.
const TASKS_TIME_SPENT: &str = "SELECT p.id AS people_id, p.surname, p.name, p.patronymic, \
            t.id AS task_id, t.title AS task_title, \
            COALESCE(SUM(EXTRACT(EPOCH FROM (te.end_time - te.start_time))), 0)::BIGINT \
                AS time_spent_seconds \
     FROM tasks t \
     JOIN time_entries te ON t.id = te.task_id \
     JOIN people_info p ON te.people_id = p.id \
     WHERE p.id = $1 \
     AND te.start_time IS NOT NULL AND te.end_time IS NOT NULL \
     AND te.start_time >= $2 AND te.end_time <= $3 \
     GROUP BY p.id, p.surname, p.name, p.patronymic, t.id, t.title \
     ORDER BY time_spent_seconds DESC, t.id ASC";

#[derive(Clone, Copy, Debug)]
enum Boundary {
    Start,
    End,
}

#[derive(Clone)]
pub struct PgTimeRepository {
    pool: DbPool,
}

impl PgTimeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn set_boundary(
        &self,
        ctx: &RequestContext,
        boundary: Boundary,
        task_id: i32,
        at: DateTime<Utc>,
    ) -> StorageResult<()> {
        bounded_transaction(&self.pool, ctx, move |conn| {
            async move {
                let statement = match boundary {
                    Boundary::Start => SET_CURRENT_START,
                    Boundary::End => SET_CURRENT_END,
                };
                let num_updated = sql_query(statement)
                    .bind::<Timestamptz, _>(at)
                    .bind::<Integer, _>(task_id)
                    .execute(conn)
                    .await?;

                if num_updated > 0 {
                    log::debug!("Set {:?} of task {} to {}", boundary, task_id, at);
                    return Ok(());
                }

                // Nothing updated: either the task has no entry or the guard refused.
                let entries = time_entries::table
                    .filter(time_entries::task_id.eq(task_id))
                    .count()
                    .get_result::<i64>(conn)
                    .await?;

                if entries == 0 {
                    Err(StorageError::NotFound(format!(
                        "no time entry for task {}",
                        task_id
                    )))
                } else {
                    Err(StorageError::InvalidInput(match boundary {
                        Boundary::Start => format!(
                            "start time {} is after the end time of task {}",
                            at, task_id
                        ),
                        Boundary::End => format!(
                            "end time {} is before the start time of task {}",
                            at, task_id
                        ),
                    }))
                }
            }
            .scope_boxed()
        })
        .await
    }

    async fn insert_entry(&self, ctx: &RequestContext, entry: NewTimeEntry) -> StorageResult<i32> {
        let task_id = entry.task_id;
        let people_id = entry.people_id;

        let inserted = bounded_transaction(&self.pool, ctx, move |conn| {
            async move {
                let entry_id = diesel::insert_into(time_entries::table)
                    .values(&entry)
                    .returning(time_entries::id)
                    .get_result::<i32>(conn)
                    .await?;
                Ok(entry_id)
            }
            .scope_boxed()
        })
        .await;

        match inserted {
            Ok(entry_id) => {
                log::debug!("Appended time entry {} to task {}", entry_id, task_id);
                Ok(entry_id)
            }
            Err(err) => match err.violated_foreign_key() {
                Some(constraint) if constraint.contains("task_id") => Err(
                    StorageError::NotFound(format!("task with id {} not found", task_id)),
                ),
                Some(_) => Err(StorageError::InvalidInput(format!(
                    "person with id {:?} does not exist",
                    people_id
                ))),
                None => Err(err),
            },
        }
    }

    async fn aggregate(
        &self,
        ctx: &RequestContext,
        people_id: i32,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> StorageResult<Vec<TaskTimeSpent>> {
        let rows = bounded_transaction(&self.pool, ctx, move |conn| {
            async move {
                let query = sql_query(TASKS_TIME_SPENT)
                    .bind::<Integer, _>(people_id)
                    .bind::<Timestamptz, _>(start_time)
                    .bind::<Timestamptz, _>(end_time);

                log::debug!("Executing SQL for tasks_time_spent: {:?}", query);

                let rows = query.load::<TaskTimeSpentRow>(conn).await?;
                Ok(rows)
            }
            .scope_boxed()
        })
        .await?;

        Ok(rows.into_iter().map(TaskTimeSpent::from).collect())
    }
}

#[async_trait]
impl TimeRepository for PgTimeRepository {
    async fn start_time_entry(
        &self,
        ctx: &RequestContext,
        task_id: i32,
        start_time: DateTime<Utc>,
    ) -> StorageResult<()> {
        ctx.run(
            "time.start_time_entry",
            self.set_boundary(ctx, Boundary::Start, task_id, start_time),
        )
        .await
    }

    async fn end_time_entry(
        &self,
        ctx: &RequestContext,
        task_id: i32,
        end_time: DateTime<Utc>,
    ) -> StorageResult<()> {
        ctx.run(
            "time.end_time_entry",
            self.set_boundary(ctx, Boundary::End, task_id, end_time),
        )
        .await
    }

    async fn add_time_entry(
        &self,
        ctx: &RequestContext,
        entry: NewTimeEntry,
    ) -> StorageResult<i32> {
        validate_new_entry(&entry)?;
        ctx.run("time.add_time_entry", self.insert_entry(ctx, entry)).await
    }

    async fn tasks_time_spent(
        &self,
        ctx: &RequestContext,
        people_id: i32,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> StorageResult<Vec<TaskTimeSpent>> {
        validate_window(people_id, start_time, end_time)?;
        ctx.run(
            "time.tasks_time_spent",
            self.aggregate(ctx, people_id, start_time, end_time),
        )
        .await
    }
}

pub(crate) fn validate_new_entry(entry: &NewTimeEntry) -> StorageResult<()> {
    if entry.task_id <= 0 {
        return Err(StorageError::InvalidInput(format!(
            "task id must be positive, got {}",
            entry.task_id
        )));
    }
    if let (Some(start), Some(end)) = (entry.start_time, entry.end_time) {
        if end < start {
            return Err(StorageError::InvalidInput(format!(
                "end time {} is before start time {}",
                end, start
            )));
        }
    }
    Ok(())
}

pub(crate) fn validate_window(
    people_id: i32,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> StorageResult<()> {
    if people_id <= 0 {
        return Err(StorageError::InvalidInput(format!(
            "person id must be positive, got {}",
            people_id
        )));
    }
    if start_time > end_time {
        return Err(StorageError::InvalidInput(format!(
            "window start {} is after window end {}",
            start_time, end_time
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn inverted_window_is_rejected() {
        assert!(matches!(
            validate_window(1, at(10), at(8)),
            Err(StorageError::InvalidInput(_))
        ));
        assert!(validate_window(1, at(8), at(8)).is_ok());
    }

    #[test]
    fn non_positive_person_is_rejected() {
        assert!(matches!(
            validate_window(0, at(8), at(10)),
            Err(StorageError::InvalidInput(_))
        ));
    }

    #[test]
    fn new_entry_with_inverted_span_is_rejected() {
        let entry = NewTimeEntry {
            task_id: 1,
            people_id: Some(1),
            start_time: Some(at(12)),
            end_time: Some(at(9)),
        };
        assert!(matches!(
            validate_new_entry(&entry),
            Err(StorageError::InvalidInput(_))
        ));
    }

    #[test]
    fn open_new_entry_is_accepted() {
        let entry = NewTimeEntry {
            task_id: 3,
            people_id: None,
            start_time: Some(at(12)),
            end_time: None,
        };
        assert!(validate_new_entry(&entry).is_ok());
    }
}
