// TaskSync/backend-api/src/handlers/task_handlers.rs
use crate::context::RequestContext;
use crate::error_handler::ServiceError;
use crate::models::{CreatedResponse, NewTask, UpdateTaskPayload, UpdateTaskPeopleQuery};
use crate::services::Service;
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;

#[post("")]
pub async fn create_task_handler(
    service: web::Data<Service>,
    ctx: RequestContext,
    payload: web::Json<NewTask>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("Creating task '{}'", payload.title);

    let new_id = service.tasks.create(&ctx, payload.into_inner()).await?;

    Ok(HttpResponse::Created().json(CreatedResponse { id: new_id }))
}

#[get("")]
pub async fn list_tasks_handler(
    service: web::Data<Service>,
    ctx: RequestContext,
) -> Result<HttpResponse, ServiceError> {
    log::info!("Listing tasks");

    let task_list = service.tasks.list(&ctx).await?;

    Ok(HttpResponse::Ok().json(task_list))
}

// Registered ahead of the `/{task_id_path}` routes.
#[put("/update-people")]
pub async fn update_task_people_handler(
    service: web::Data<Service>,
    ctx: RequestContext,
    query: web::Query<UpdateTaskPeopleQuery>,
) -> Result<HttpResponse, ServiceError> {
    let UpdateTaskPeopleQuery { people_id, task_id } = query.into_inner();
    log::info!("Assigning task {} to person {}", task_id, people_id);

    service.tasks.update_people(&ctx, people_id, task_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": format!("Task {} assigned to person {}", task_id, people_id)
    })))
}

#[get("/{task_id_path}")]
pub async fn get_task_handler(
    service: web::Data<Service>,
    ctx: RequestContext,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("Fetching task {}", task_id);

    let task = service.tasks.get_by_id(&ctx, task_id).await?;

    Ok(HttpResponse::Ok().json(task))
}

#[put("")]
pub async fn update_task_handler(
    service: web::Data<Service>,
    ctx: RequestContext,
    payload: web::Json<UpdateTaskPayload>,
) -> Result<HttpResponse, ServiceError> {
    let UpdateTaskPayload { id, changes } = payload.into_inner();
    log::info!("Updating task {}", id);

    service.tasks.update(&ctx, id, changes).await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": format!("Task with id {} updated successfully", id)
    })))
}

#[delete("/{task_id_path}")]
pub async fn delete_task_handler(
    service: web::Data<Service>,
    ctx: RequestContext,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("Deleting task {}", task_id);

    service.tasks.delete(&ctx, task_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": format!("Task with id {} deleted successfully", task_id)
    })))
}
