//! Capability services the HTTP layer talks to.
//!
//! Each service wraps one repository trait object and forwards calls to it;
//! storage errors propagate unchanged.

pub mod people_service;
pub mod task_service;
pub mod time_service;

use crate::repositories::Storage;

pub use people_service::PeopleService;
pub use task_service::TaskService;
pub use time_service::TimeService;

#[derive(Clone)]
pub struct Service {
    pub people: PeopleService,
    pub tasks: TaskService,
    pub time: TimeService,
}

impl Service {
    pub fn new(storage: Storage) -> Self {
        Service {
            people: PeopleService::new(storage.people),
            tasks: TaskService::new(storage.tasks),
            time: TimeService::new(storage.time),
        }
    }
}
