use super::error::{StorageError, StorageResult};
use super::transaction::bounded_transaction;
use super::PeopleRepository;
use crate::context::RequestContext;
use crate::db::DbPool;
use crate::models::{NewPerson, Pagination, Person, PersonChangeset, PersonFilter};
use crate::schema::people_info;
use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::RunQueryDsl;

#[derive(Clone)]
pub struct PgPeopleRepository {
    pool: DbPool,
}

impl PgPeopleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, ctx: &RequestContext, person: NewPerson) -> StorageResult<i32> {
        let new_id = bounded_transaction(&self.pool, ctx, move |conn| {
            async move {
                let new_id = diesel::insert_into(people_info::table)
                    .values(&person)
                    .returning(people_info::id)
                    .get_result::<i32>(conn)
                    .await?;
                Ok(new_id)
            }
            .scope_boxed()
        })
        .await?;

        log::debug!("Inserted person {}", new_id);
        Ok(new_id)
    }

    async fn find(&self, ctx: &RequestContext, people_id: i32) -> StorageResult<Person> {
        let person = bounded_transaction(&self.pool, ctx, move |conn| {
            async move {
                let person = people_info::table
                    .find(people_id)
                    .select(Person::as_select())
                    .first::<Person>(conn)
                    .await
                    .optional()?;
                Ok(person)
            }
            .scope_boxed()
        })
        .await?;

        person.ok_or_else(|| StorageError::NotFound(format!("person with id {} not found", people_id)))
    }

    async fn find_filtered(
        &self,
        ctx: &RequestContext,
        filter: PersonFilter,
        page: Pagination,
    ) -> StorageResult<Vec<Person>> {
        let people = bounded_transaction(&self.pool, ctx, move |conn| {
            async move {
                // Natural order is the primary key so that pages are stable.
                let mut query = people_info::table
                    .select(Person::as_select())
                    .order(people_info::id.asc())
                    .into_boxed();

                if let Some(id) = filter.id {
                    query = query.filter(people_info::id.eq(id));
                }
                if let Some(series) = filter.passport_series {
                    query = query.filter(people_info::passport_series.eq(series));
                }
                if let Some(number) = filter.passport_number {
                    query = query.filter(people_info::passport_number.eq(number));
                }
                if let Some(surname) = filter.surname {
                    query = query.filter(people_info::surname.eq(surname));
                }
                if let Some(name) = filter.name {
                    query = query.filter(people_info::name.eq(name));
                }
                if let Some(patronymic) = filter.patronymic {
                    query = query.filter(people_info::patronymic.eq(patronymic));
                }
                if let Some(address) = filter.address {
                    query = query.filter(people_info::address.eq(address));
                }

                if let Some(limit) = page.limit {
                    query = query.limit(limit);
                }
                if let Some(offset) = page.offset {
                    query = query.offset(offset);
                }

                let people = query.load::<Person>(conn).await?;
                Ok(people)
            }
            .scope_boxed()
        })
        .await?;

        log::debug!("Filter matched {} people", people.len());
        Ok(people)
    }

    async fn find_all(&self, ctx: &RequestContext) -> StorageResult<Vec<Person>> {
        bounded_transaction(&self.pool, ctx, |conn| {
            async move {
                let people = people_info::table
                    .select(Person::as_select())
                    .order(people_info::id.asc())
                    .load::<Person>(conn)
                    .await?;
                Ok(people)
            }
            .scope_boxed()
        })
        .await
    }

    async fn apply_changes(
        &self,
        ctx: &RequestContext,
        people_id: i32,
        changes: PersonChangeset,
    ) -> StorageResult<()> {
        let num_updated = bounded_transaction(&self.pool, ctx, move |conn| {
            async move {
                let num_updated = diesel::update(people_info::table.find(people_id))
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
                "person with id {} not found for update",
                people_id
            )));
        }
        Ok(())
    }

    async fn remove(&self, ctx: &RequestContext, people_id: i32) -> StorageResult<()> {
        // Only the person row goes; time_entries.people_id is nulled by the
        // ON DELETE SET NULL foreign key.
        let num_deleted = bounded_transaction(&self.pool, ctx, move |conn| {
            async move {
                let num_deleted = diesel::delete(people_info::table.find(people_id))
                    .execute(conn)
                    .await?;
                Ok(num_deleted)
            }
            .scope_boxed()
        })
        .await?;

        if num_deleted == 0 {
            return Err(StorageError::NotFound(format!(
                "person with id {} not found to delete",
                people_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PeopleRepository for PgPeopleRepository {
    async fn create(&self, ctx: &RequestContext, person: NewPerson) -> StorageResult<i32> {
        ctx.run("people.create", self.insert(ctx, person)).await
    }

    async fn get_by_id(&self, ctx: &RequestContext, people_id: i32) -> StorageResult<Person> {
        ctx.run("people.get_by_id", self.find(ctx, people_id)).await
    }

    async fn get_by_filter(
        &self,
        ctx: &RequestContext,
        filter: PersonFilter,
        limit: i64,
        offset: i64,
    ) -> StorageResult<Vec<Person>> {
        let page = Pagination::from_raw(limit, offset).ok_or_else(|| {
            StorageError::InvalidInput(format!(
                "limit ({}) and offset ({}) must not be negative",
                limit, offset
            ))
        })?;
        ctx.run(
            "people.get_by_filter",
            self.find_filtered(ctx, filter.normalized(), page),
        )
        .await
    }

    async fn list(&self, ctx: &RequestContext) -> StorageResult<Vec<Person>> {
        ctx.run("people.list", self.find_all(ctx)).await
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        people_id: i32,
        changes: PersonChangeset,
    ) -> StorageResult<()> {
        let changes = changes.normalized();
        if changes.is_empty() {
            return Err(StorageError::NoChangesRequested);
        }
        if people_id <= 0 {
            return Err(StorageError::InvalidInput(format!(
                "person id must be positive, got {}",
                people_id
            )));
        }
        ctx.run("people.update", self.apply_changes(ctx, people_id, changes))
            .await
    }

    async fn delete(&self, ctx: &RequestContext, people_id: i32) -> StorageResult<()> {
        ctx.run("people.delete", self.remove(ctx, people_id)).await
    }
}
