use crate::schema::{people_info, tasks, time_entries};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Nullable, Text};
use serde::{Deserialize, Deserializer, Serialize};

// --- Deserialization helpers ---

// Empty strings coming from query strings or JSON bodies mean "not provided".
fn deserialize_non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

// --- Person Model ---
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = people_info)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Person {
    pub id: i32,
    pub passport_series: i32,
    pub passport_number: i32,
    pub surname: String,
    pub name: String,
    pub patronymic: Option<String>,
    pub address: String,
}

#[derive(Insertable, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = people_info)]
pub struct NewPerson {
    pub passport_series: i32,
    pub passport_number: i32,
    pub surname: String,
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_non_empty_string")]
    pub patronymic: Option<String>,
    pub address: String,
}

/// Partial update of a person. `None` leaves the column untouched, so a field
/// can never be cleared through this type.
#[derive(AsChangeset, Deserialize, Debug, Clone, Default, PartialEq)]
#[diesel(table_name = people_info)]
pub struct PersonChangeset {
    pub passport_series: Option<i32>,
    pub passport_number: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_non_empty_string")]
    pub surname: Option<String>,
    #[serde(default, deserialize_with = "deserialize_non_empty_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_non_empty_string")]
    pub patronymic: Option<String>,
    #[serde(default, deserialize_with = "deserialize_non_empty_string")]
    pub address: Option<String>,
}

impl PersonChangeset {
    /// Drops empty strings so they behave like absent fields.
    pub fn normalized(self) -> Self {
        PersonChangeset {
            passport_series: self.passport_series,
            passport_number: self.passport_number,
            surname: non_empty(self.surname),
            name: non_empty(self.name),
            patronymic: non_empty(self.patronymic),
            address: non_empty(self.address),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.passport_series.is_none()
            && self.passport_number.is_none()
            && self.surname.is_none()
            && self.name.is_none()
            && self.patronymic.is_none()
            && self.address.is_none()
    }
}

/// Conjunctive person search. Only present fields take part in the predicate;
/// `Some(0)` is a real predicate, not an omission.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct PersonFilter {
    pub id: Option<i32>,
    pub passport_series: Option<i32>,
    pub passport_number: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_non_empty_string")]
    pub surname: Option<String>,
    #[serde(default, deserialize_with = "deserialize_non_empty_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_non_empty_string")]
    pub patronymic: Option<String>,
    #[serde(default, deserialize_with = "deserialize_non_empty_string")]
    pub address: Option<String>,
}

impl PersonFilter {
    pub fn normalized(self) -> Self {
        PersonFilter {
            surname: non_empty(self.surname),
            name: non_empty(self.name),
            patronymic: non_empty(self.patronymic),
            address: non_empty(self.address),
            ..self
        }
    }

    /// In-process evaluation of the same predicate the SQL query builds.
    #[cfg(test)]
    pub(crate) fn matches(&self, person: &Person) -> bool {
        self.id.map_or(true, |v| person.id == v)
            && self.passport_series.map_or(true, |v| person.passport_series == v)
            && self.passport_number.map_or(true, |v| person.passport_number == v)
            && self.surname.as_ref().map_or(true, |v| &person.surname == v)
            && self.name.as_ref().map_or(true, |v| &person.name == v)
            && self
                .patronymic
                .as_ref()
                .map_or(true, |v| person.patronymic.as_ref() == Some(v))
            && self.address.as_ref().map_or(true, |v| &person.address == v)
    }
}

/// LIMIT/OFFSET pair resolved from the raw `limit`/`offset` arguments.
///
/// A positive limit always carries its offset (even 0); a zero limit means
/// "every matching row" and only keeps the offset when it is positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    /// Returns `None` when either value is negative.
    pub fn from_raw(limit: i64, offset: i64) -> Option<Self> {
        if limit < 0 || offset < 0 {
            return None;
        }
        let pagination = if limit > 0 {
            Pagination {
                limit: Some(limit),
                offset: Some(offset),
            }
        } else {
            Pagination {
                limit: None,
                offset: (offset > 0).then_some(offset),
            }
        };
        Some(pagination)
    }

    #[cfg(test)]
    pub(crate) fn apply<T>(&self, rows: Vec<T>) -> Vec<T> {
        let skip = self.offset.unwrap_or(0) as usize;
        let iter = rows.into_iter().skip(skip);
        match self.limit {
            Some(limit) => iter.take(limit as usize).collect(),
            None => iter.collect(),
        }
    }
}

// --- Task Model (Diesel Queryable) ---
// The `tasks` row alone; the API shape with its time entry is `Task`.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRecord {
    pub id: i32,
    pub title: String,
    pub description: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = tasks)]
pub struct NewTaskRecord<'a> {
    pub title: &'a str,
    pub description: &'a str,
}

#[derive(AsChangeset, Deserialize, Debug, Clone, Default, PartialEq)]
#[diesel(table_name = tasks)]
pub struct TaskChangeset {
    #[serde(default, deserialize_with = "deserialize_non_empty_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_non_empty_string")]
    pub description: Option<String>,
}

impl TaskChangeset {
    pub fn normalized(self) -> Self {
        TaskChangeset {
            title: non_empty(self.title),
            description: non_empty(self.description),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// A task as returned to callers: the task row plus its current time entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub time_entry: TimeEntry,
}

impl From<(TaskRecord, TimeEntry)> for Task {
    fn from((task_db, entry): (TaskRecord, TimeEntry)) -> Self {
        Task {
            id: task_db.id,
            title: task_db.title,
            description: task_db.description,
            time_entry: entry,
        }
    }
}

/// Everything needed to create a task together with its first time entry.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub people_id: Option<i32>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

// --- TimeEntry Model ---
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = time_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TimeEntry {
    pub id: i32,
    pub people_id: Option<i32>,
    pub task_id: i32,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
}

impl TimeEntry {
    /// `None` until both ends of the span are set.
    #[cfg(test)]
    pub(crate) fn duration(&self) -> Option<chrono::TimeDelta> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

#[derive(Insertable, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = time_entries)]
pub struct NewTimeEntry {
    pub task_id: i32,
    pub people_id: Option<i32>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

// --- Time spent aggregation ---

#[derive(QueryableByName, Debug, Clone)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskTimeSpentRow {
    #[diesel(sql_type = Integer)]
    pub people_id: i32,
    #[diesel(sql_type = Text)]
    pub surname: String,
    #[diesel(sql_type = Text)]
    pub name: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub patronymic: Option<String>,
    #[diesel(sql_type = Integer)]
    pub task_id: i32,
    #[diesel(sql_type = Text)]
    pub task_title: String,
    #[diesel(sql_type = BigInt)]
    pub time_spent_seconds: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskTimeSpent {
    pub people_id: i32,
    pub surname: String,
    pub name: String,
    pub patronymic: Option<String>,
    pub task_id: i32,
    pub task_title: String,
    pub time_spent_seconds: i64,
    pub time_spent: String,
}

impl From<TaskTimeSpentRow> for TaskTimeSpent {
    fn from(row: TaskTimeSpentRow) -> Self {
        TaskTimeSpent {
            people_id: row.people_id,
            surname: row.surname,
            name: row.name,
            patronymic: row.patronymic,
            task_id: row.task_id,
            task_title: row.task_title,
            time_spent: format_time_spent(row.time_spent_seconds),
            time_spent_seconds: row.time_spent_seconds,
        }
    }
}

/// Renders seconds as `H:MM:SS`; hours are not wrapped at 24.
pub fn format_time_spent(total_seconds: i64) -> String {
    let sign = if total_seconds < 0 { "-" } else { "" };
    let secs = total_seconds.unsigned_abs();
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

// --- PAYLOAD DTOs ---

#[derive(Deserialize, Debug)]
pub struct UpdatePersonPayload {
    #[serde(default)]
    pub id: Option<i32>,
    #[serde(flatten)]
    pub changes: PersonChangeset,
}

#[derive(Deserialize, Debug)]
pub struct UpdateTaskPayload {
    pub id: i32,
    #[serde(flatten)]
    pub changes: TaskChangeset,
}

// Query strings carry every value as text, so this one is spelled out
// instead of flattening `PersonFilter`.
#[derive(Deserialize, Debug, Default)]
pub struct PeopleFilterQuery {
    pub id: Option<i32>,
    pub passport_series: Option<i32>,
    pub passport_number: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_non_empty_string")]
    pub surname: Option<String>,
    #[serde(default, deserialize_with = "deserialize_non_empty_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_non_empty_string")]
    pub patronymic: Option<String>,
    #[serde(default, deserialize_with = "deserialize_non_empty_string")]
    pub address: Option<String>,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl PeopleFilterQuery {
    pub fn into_parts(self) -> (PersonFilter, i64, i64) {
        let filter = PersonFilter {
            id: self.id,
            passport_series: self.passport_series,
            passport_number: self.passport_number,
            surname: self.surname,
            name: self.name,
            patronymic: self.patronymic,
            address: self.address,
        };
        (filter, self.limit, self.offset)
    }
}

#[derive(Deserialize, Debug)]
pub struct UpdateTaskPeopleQuery {
    pub people_id: i32,
    pub task_id: i32,
}

#[derive(Deserialize, Debug)]
pub struct StartTimeEntryPayload {
    pub task_id: i32,
    pub start_time: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
pub struct EndTimeEntryPayload {
    pub task_id: i32,
    pub end_time: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
pub struct TimeSpentQuery {
    pub people_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct CreatedResponse {
    pub id: i32,
}
