pub mod people_handlers;
pub mod task_handlers;
pub mod time_handlers;

use crate::error_handler::ServiceError;
use actix_web::web;

/// Registers the `/people`, `/task` and `/time` scopes. Malformed JSON bodies
/// and query strings are answered with the same error body as storage errors.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ServiceError::BadRequest(format!("Invalid JSON body: {}", err)).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        ServiceError::BadRequest(format!("Invalid query string: {}", err)).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        ServiceError::BadRequest(format!("Invalid path parameter: {}", err)).into()
    }))
    .service(
        web::scope("/people")
            .service(people_handlers::create_person_handler)
            .service(people_handlers::list_people_handler)
            .service(people_handlers::filter_people_handler)
            .service(people_handlers::get_person_handler)
            .service(people_handlers::update_person_handler)
            .service(people_handlers::delete_person_handler),
    )
    .service(
        web::scope("/task")
            .service(task_handlers::create_task_handler)
            .service(task_handlers::list_tasks_handler)
            .service(task_handlers::update_task_people_handler)
            .service(task_handlers::get_task_handler)
            .service(task_handlers::update_task_handler)
            .service(task_handlers::delete_task_handler),
    )
    .service(
        web::scope("/time")
            .service(time_handlers::start_time_entry_handler)
            .service(time_handlers::end_time_entry_handler)
            .service(time_handlers::add_time_entry_handler)
            .service(time_handlers::tasks_time_spent_handler),
    );
}
