// In-process store with the same observable behaviour as the Postgres
// repositories. Used by service and handler tests.
use super::error::{StorageError, StorageResult};
use super::time_repository::{validate_new_entry, validate_window};
use super::{PeopleRepository, Storage, TaskRepository, TimeRepository};
use crate::context::RequestContext;
use crate::models::{
    format_time_spent, NewPerson, NewTask, NewTimeEntry, Pagination, Person, PersonChangeset,
    PersonFilter, Task, TaskChangeset, TaskRecord, TaskTimeSpent, TimeEntry,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Clone, Default)]
struct State {
    people: BTreeMap<i32, Person>,
    tasks: BTreeMap<i32, TaskRecord>,
    entries: BTreeMap<i32, TimeEntry>,
    next_person_id: i32,
    next_task_id: i32,
    next_entry_id: i32,
}

impl State {
    fn current_entry_id(&self, task_id: i32) -> Option<i32> {
        self.entries
            .values()
            .filter(|entry| entry.task_id == task_id)
            .map(|entry| entry.id)
            .max()
    }

    fn check_person(&self, people_id: Option<i32>) -> StorageResult<()> {
        match people_id {
            Some(id) if !self.people.contains_key(&id) => Err(StorageError::InvalidInput(
                format!("person with id {:?} does not exist", people_id),
            )),
            _ => Ok(()),
        }
    }

    fn push_entry(&mut self, entry: NewTimeEntry) -> i32 {
        self.next_entry_id += 1;
        let id = self.next_entry_id;
        self.entries.insert(
            id,
            TimeEntry {
                id,
                people_id: entry.people_id,
                task_id: entry.task_id,
                start_time: entry.start_time,
                end_time: entry.end_time,
                created: Utc::now(),
            },
        );
        id
    }
}

fn check_passport(series: Option<i32>, number: Option<i32>) -> StorageResult<()> {
    if series.is_some_and(|v| v <= 0) || number.is_some_and(|v| v <= 0) {
        return Err(StorageError::InvalidInput(
            "passport series and number must be positive".to_string(),
        ));
    }
    Ok(())
}

#[derive(Default)]
pub(crate) struct InMemoryStore {
    state: Mutex<State>,
    fail_next_entry_insert: AtomicBool,
    latency: Option<Duration>,
}

impl InMemoryStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every operation sleeps for `latency` before touching the state.
    pub(crate) fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(InMemoryStore {
            latency: Some(latency),
            ..Default::default()
        })
    }

    /// Makes the next time entry insert of a task creation fail.
    pub(crate) fn fail_next_entry_insert(&self) {
        self.fail_next_entry_insert.store(true, Ordering::SeqCst);
    }

    pub(crate) fn storage(self: &Arc<Self>) -> Storage {
        Storage {
            people: self.clone(),
            tasks: self.clone(),
            time: self.clone(),
        }
    }

    pub(crate) fn task_count(&self) -> usize {
        self.lock().tasks.len()
    }

    pub(crate) fn entries_of(&self, task_id: i32) -> Vec<TimeEntry> {
        self.lock()
            .entries
            .values()
            .filter(|entry| entry.task_id == task_id)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn with_state<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut State) -> StorageResult<T>,
    {
        self.pause().await;
        let mut state = self.lock();
        f(&mut state)
    }
}

#[async_trait]
impl PeopleRepository for InMemoryStore {
    async fn create(&self, ctx: &RequestContext, person: NewPerson) -> StorageResult<i32> {
        check_passport(Some(person.passport_series), Some(person.passport_number))?;
        ctx.run(
            "people.create",
            self.with_state(move |state| {
                state.next_person_id += 1;
                let id = state.next_person_id;
                state.people.insert(
                    id,
                    Person {
                        id,
                        passport_series: person.passport_series,
                        passport_number: person.passport_number,
                        surname: person.surname,
                        name: person.name,
                        patronymic: person.patronymic,
                        address: person.address,
                    },
                );
                Ok(id)
            }),
        )
        .await
    }

    async fn get_by_id(&self, ctx: &RequestContext, people_id: i32) -> StorageResult<Person> {
        ctx.run(
            "people.get_by_id",
            self.with_state(move |state| {
                state.people.get(&people_id).cloned().ok_or_else(|| {
                    StorageError::NotFound(format!("person with id {} not found", people_id))
                })
            }),
        )
        .await
    }

    async fn get_by_filter(
        &self,
        ctx: &RequestContext,
        filter: PersonFilter,
        limit: i64,
        offset: i64,
    ) -> StorageResult<Vec<Person>> {
        let page = Pagination::from_raw(limit, offset).ok_or_else(|| {
            StorageError::InvalidInput("limit and offset must not be negative".to_string())
        })?;
        let filter = filter.normalized();
        ctx.run(
            "people.get_by_filter",
            self.with_state(move |state| {
                let matching = state
                    .people
                    .values()
                    .filter(|person| filter.matches(person))
                    .cloned()
                    .collect();
                Ok(page.apply(matching))
            }),
        )
        .await
    }

    async fn list(&self, ctx: &RequestContext) -> StorageResult<Vec<Person>> {
        ctx.run(
            "people.list",
            self.with_state(|state| Ok(state.people.values().cloned().collect())),
        )
        .await
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
        check_passport(changes.passport_series, changes.passport_number)?;
        ctx.run(
            "people.update",
            self.with_state(move |state| {
                let person = state.people.get_mut(&people_id).ok_or_else(|| {
                    StorageError::NotFound(format!(
                        "person with id {} not found for update",
                        people_id
                    ))
                })?;
                if let Some(v) = changes.passport_series {
                    person.passport_series = v;
                }
                if let Some(v) = changes.passport_number {
                    person.passport_number = v;
                }
                if let Some(v) = changes.surname {
                    person.surname = v;
                }
                if let Some(v) = changes.name {
                    person.name = v;
                }
                if changes.patronymic.is_some() {
                    person.patronymic = changes.patronymic;
                }
                if let Some(v) = changes.address {
                    person.address = v;
                }
                Ok(())
            }),
        )
        .await
    }

    async fn delete(&self, ctx: &RequestContext, people_id: i32) -> StorageResult<()> {
        ctx.run(
            "people.delete",
            self.with_state(move |state| {
                if state.people.remove(&people_id).is_none() {
                    return Err(StorageError::NotFound(format!(
                        "person with id {} not found to delete",
                        people_id
                    )));
                }
                for entry in state.entries.values_mut() {
                    if entry.people_id == Some(people_id) {
                        entry.people_id = None;
                    }
                }
                Ok(())
            }),
        )
        .await
    }
}

#[async_trait]
impl TaskRepository for InMemoryStore {
    async fn create(&self, ctx: &RequestContext, task: NewTask) -> StorageResult<i32> {
        ctx.run(
            "task.create",
            self.with_state(move |state| {
                // Both rows go to a staged copy that replaces the state only on success.
                let mut staged = state.clone();
                staged.next_task_id += 1;
                let id = staged.next_task_id;
                staged.tasks.insert(
                    id,
                    TaskRecord {
                        id,
                        title: task.title,
                        description: task.description,
                    },
                );
                if self.fail_next_entry_insert.swap(false, Ordering::SeqCst) {
                    return Err(StorageError::Pool("injected entry insert failure".to_string()));
                }
                staged.check_person(task.people_id)?;
                staged.push_entry(NewTimeEntry {
                    task_id: id,
                    people_id: task.people_id,
                    start_time: task.start_time,
                    end_time: task.end_time,
                });
                *state = staged;
                Ok(id)
            }),
        )
        .await
    }

    async fn get_by_id(&self, ctx: &RequestContext, task_id: i32) -> StorageResult<Task> {
        ctx.run(
            "task.get_by_id",
            self.with_state(move |state| {
                let not_found =
                    || StorageError::NotFound(format!("task with id {} not found", task_id));
                let record = state.tasks.get(&task_id).ok_or_else(not_found)?;
                let entry_id = state.current_entry_id(task_id).ok_or_else(not_found)?;
                let entry = state.entries.get(&entry_id).ok_or_else(not_found)?;
                Ok(Task::from((record.clone(), entry.clone())))
            }),
        )
        .await
    }

    async fn list(&self, ctx: &RequestContext) -> StorageResult<Vec<Task>> {
        ctx.run(
            "task.list",
            self.with_state(|state| {
                let tasks = state
                    .tasks
                    .values()
                    .filter_map(|record| {
                        let entry_id = state.current_entry_id(record.id)?;
                        let entry = state.entries.get(&entry_id)?;
                        Some(Task::from((record.clone(), entry.clone())))
                    })
                    .collect();
                Ok(tasks)
            }),
        )
        .await
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
        ctx.run(
            "task.update",
            self.with_state(move |state| {
                let record = state.tasks.get_mut(&task_id).ok_or_else(|| {
                    StorageError::NotFound(format!("task with id {} not found for update", task_id))
                })?;
                if let Some(title) = changes.title {
                    record.title = title;
                }
                if let Some(description) = changes.description {
                    record.description = description;
                }
                Ok(())
            }),
        )
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
        ctx.run(
            "task.update_people",
            self.with_state(move |state| {
                let entry_id = state.current_entry_id(task_id).ok_or_else(|| {
                    StorageError::NotFound(format!("no time entry for task {}", task_id))
                })?;
                state.check_person(Some(people_id))?;
                if let Some(entry) = state.entries.get_mut(&entry_id) {
                    entry.people_id = Some(people_id);
                }
                Ok(())
            }),
        )
        .await
    }

    async fn delete(&self, ctx: &RequestContext, task_id: i32) -> StorageResult<()> {
        ctx.run(
            "task.delete",
            self.with_state(move |state| {
                if state.tasks.remove(&task_id).is_none() {
                    return Err(StorageError::NotFound(format!(
                        "task with id {} not found to delete",
                        task_id
                    )));
                }
                state.entries.retain(|_, entry| entry.task_id != task_id);
                Ok(())
            }),
        )
        .await
    }
}

#[async_trait]
impl TimeRepository for InMemoryStore {
    async fn start_time_entry(
        &self,
        ctx: &RequestContext,
        task_id: i32,
        start_time: DateTime<Utc>,
    ) -> StorageResult<()> {
        ctx.run(
            "time.start_time_entry",
            self.with_state(move |state| {
                let entry_id = state.current_entry_id(task_id).ok_or_else(|| {
                    StorageError::NotFound(format!("no time entry for task {}", task_id))
                })?;
                let entry = state.entries.get_mut(&entry_id).ok_or_else(|| {
                    StorageError::NotFound(format!("no time entry for task {}", task_id))
                })?;
                if entry.end_time.is_some_and(|end| end < start_time) {
                    return Err(StorageError::InvalidInput(format!(
                        "start time {} is after the end time of task {}",
                        start_time, task_id
                    )));
                }
                entry.start_time = Some(start_time);
                Ok(())
            }),
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
            self.with_state(move |state| {
                let entry_id = state.current_entry_id(task_id).ok_or_else(|| {
                    StorageError::NotFound(format!("no time entry for task {}", task_id))
                })?;
                let entry = state.entries.get_mut(&entry_id).ok_or_else(|| {
                    StorageError::NotFound(format!("no time entry for task {}", task_id))
                })?;
                if entry.start_time.is_some_and(|start| start > end_time) {
                    return Err(StorageError::InvalidInput(format!(
                        "end time {} is before the start time of task {}",
                        end_time, task_id
                    )));
                }
                entry.end_time = Some(end_time);
                Ok(())
            }),
        )
        .await
    }

    async fn add_time_entry(
        &self,
        ctx: &RequestContext,
        entry: NewTimeEntry,
    ) -> StorageResult<i32> {
        validate_new_entry(&entry)?;
        ctx.run(
            "time.add_time_entry",
            self.with_state(move |state| {
                if !state.tasks.contains_key(&entry.task_id) {
                    return Err(StorageError::NotFound(format!(
                        "task with id {} not found",
                        entry.task_id
                    )));
                }
                state.check_person(entry.people_id)?;
                Ok(state.push_entry(entry))
            }),
        )
        .await
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
            self.with_state(move |state| {
                let Some(person) = state.people.get(&people_id) else {
                    return Ok(Vec::new());
                };

                let mut seconds_by_task: BTreeMap<i32, i64> = BTreeMap::new();
                for entry in state.entries.values() {
                    if entry.people_id != Some(people_id) {
                        continue;
                    }
                    let (Some(start), Some(end)) = (entry.start_time, entry.end_time) else {
                        continue;
                    };
                    if start < start_time || end > end_time {
                        continue;
                    }
                    *seconds_by_task.entry(entry.task_id).or_default() +=
                        (end - start).num_seconds();
                }

                let mut rows: Vec<TaskTimeSpent> = seconds_by_task
                    .into_iter()
                    .filter_map(|(task_id, seconds)| {
                        let task = state.tasks.get(&task_id)?;
                        Some(TaskTimeSpent {
                            people_id,
                            surname: person.surname.clone(),
                            name: person.name.clone(),
                            patronymic: person.patronymic.clone(),
                            task_id,
                            task_title: task.title.clone(),
                            time_spent_seconds: seconds,
                            time_spent: format_time_spent(seconds),
                        })
                    })
                    .collect();
                rows.sort_by(|a, b| {
                    b.time_spent_seconds
                        .cmp(&a.time_spent_seconds)
                        .then(a.task_id.cmp(&b.task_id))
                });
                Ok(rows)
            }),
        )
        .await
    }
}
