use crate::context::RequestContext;
use crate::models::{NewPerson, Person, PersonChangeset, PersonFilter};
use crate::repositories::error::StorageResult;
use crate::repositories::PeopleRepository;
use std::sync::Arc;

#[derive(Clone)]
pub struct PeopleService {
    repo: Arc<dyn PeopleRepository>,
}

impl PeopleService {
    pub fn new(repo: Arc<dyn PeopleRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, ctx: &RequestContext, person: NewPerson) -> StorageResult<i32> {
        log::debug!("Creating person {} {}", person.surname, person.name);
        self.repo.create(ctx, person).await
    }

    pub async fn get_by_id(&self, ctx: &RequestContext, people_id: i32) -> StorageResult<Person> {
        log::debug!("Fetching person {}", people_id);
        self.repo.get_by_id(ctx, people_id).await
    }

    pub async fn get_by_filter(
        &self,
        ctx: &RequestContext,
        filter: PersonFilter,
        limit: i64,
        offset: i64,
    ) -> StorageResult<Vec<Person>> {
        log::debug!(
            "Filtering people by {:?} (limit {}, offset {})",
            filter,
            limit,
            offset
        );
        self.repo.get_by_filter(ctx, filter, limit, offset).await
    }

    pub async fn list(&self, ctx: &RequestContext) -> StorageResult<Vec<Person>> {
        log::debug!("Listing people");
        self.repo.list(ctx).await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        people_id: i32,
        changes: PersonChangeset,
    ) -> StorageResult<()> {
        log::debug!("Updating person {} with {:?}", people_id, changes);
        self.repo.update(ctx, people_id, changes).await
    }

    pub async fn delete(&self, ctx: &RequestContext, people_id: i32) -> StorageResult<()> {
        log::debug!("Deleting person {}", people_id);
        self.repo.delete(ctx, people_id).await
    }
}
