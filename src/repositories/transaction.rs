use super::error::{StorageError, StorageResult};
use crate::context::RequestContext;
use crate::db::DbPool;
use diesel::sql_query;
use diesel_async::scoped_futures::{ScopedBoxFuture, ScopedFutureExt};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use std::time::Duration;

/// Runs `callback` inside a transaction bounded by the context deadline.
///
/// The transaction starts with `SET LOCAL statement_timeout`, so the server
/// cancels a statement still running (or waiting on a lock) when the deadline
/// passes. Nothing commits unless `callback` returns `Ok`: a future dropped on
/// cancellation leaves an open transaction, the pool discards that connection
/// and the server rolls the work back.
pub(crate) async fn bounded_transaction<'a, R, F>(
    pool: &DbPool,
    ctx: &RequestContext,
    callback: F,
) -> StorageResult<R>
where
    F: for<'r> FnOnce(&'r mut AsyncPgConnection) -> ScopedBoxFuture<'a, 'r, StorageResult<R>>
        + Send
        + 'a,
    R: Send + 'a,
{
    let timeout_ms = ctx.remaining().map(statement_timeout_ms);
    let mut pooled = pool.get().await?;
    let conn: &mut AsyncPgConnection = &mut pooled;

    conn.transaction::<R, StorageError, _>(move |conn| {
        async move {
            if let Some(ms) = timeout_ms {
                sql_query(format!("SET LOCAL statement_timeout = {}", ms))
                    .execute(conn)
                    .await?;
            }
            callback(conn).await
        }
        .scope_boxed()
    })
    .await
}

// 0 turns the server timeout off, and the setting is an int4 of milliseconds.
fn statement_timeout_ms(remaining: Duration) -> u64 {
    let millis = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
    millis.clamp(1, i32::MAX as u64)
}
