// TaskSync/backend-api/src/handlers/time_handlers.rs
use crate::context::RequestContext;
use crate::error_handler::ServiceError;
use crate::models::{
    CreatedResponse, EndTimeEntryPayload, NewTimeEntry, StartTimeEntryPayload, TimeSpentQuery,
};
use crate::services::Service;
use actix_web::{get, post, web, HttpResponse};
use serde_json::json;

#[post("/start")]
pub async fn start_time_entry_handler(
    service: web::Data<Service>,
    ctx: RequestContext,
    payload: web::Json<StartTimeEntryPayload>,
) -> Result<HttpResponse, ServiceError> {
    let StartTimeEntryPayload {
        task_id,
        start_time,
    } = payload.into_inner();
    log::info!("Starting time entry of task {} at {}", task_id, start_time);

    service.time.start_time_entry(&ctx, task_id, start_time).await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": format!("Time entry of task {} started", task_id)
    })))
}

#[post("/end")]
pub async fn end_time_entry_handler(
    service: web::Data<Service>,
    ctx: RequestContext,
    payload: web::Json<EndTimeEntryPayload>,
) -> Result<HttpResponse, ServiceError> {
    let EndTimeEntryPayload { task_id, end_time } = payload.into_inner();
    log::info!("Ending time entry of task {} at {}", task_id, end_time);

    service.time.end_time_entry(&ctx, task_id, end_time).await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": format!("Time entry of task {} ended", task_id)
    })))
}

#[post("/entries")]
pub async fn add_time_entry_handler(
    service: web::Data<Service>,
    ctx: RequestContext,
    payload: web::Json<NewTimeEntry>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("Adding time entry to task {}", payload.task_id);

    let new_id = service.time.add_time_entry(&ctx, payload.into_inner()).await?;

    Ok(HttpResponse::Created().json(CreatedResponse { id: new_id }))
}

#[get("/spent")]
pub async fn tasks_time_spent_handler(
    service: web::Data<Service>,
    ctx: RequestContext,
    query: web::Query<TimeSpentQuery>,
) -> Result<HttpResponse, ServiceError> {
    let TimeSpentQuery {
        people_id,
        start_time,
        end_time,
    } = query.into_inner();
    log::info!(
        "Time spent by person {} between {} and {}",
        people_id,
        start_time,
        end_time
    );

    let spent = service
        .time
        .tasks_time_spent(&ctx, people_id, start_time, end_time)
        .await?;

    Ok(HttpResponse::Ok().json(spent))
}
