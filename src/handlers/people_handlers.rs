// TaskSync/backend-api/src/handlers/people_handlers.rs
use crate::context::RequestContext;
use crate::error_handler::ServiceError;
use crate::models::{CreatedResponse, NewPerson, PeopleFilterQuery, UpdatePersonPayload};
use crate::services::Service;
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;

#[post("")]
pub async fn create_person_handler(
    service: web::Data<Service>,
    ctx: RequestContext,
    payload: web::Json<NewPerson>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("Creating person {}", payload.surname);

    let new_id = service.people.create(&ctx, payload.into_inner()).await?;

    Ok(HttpResponse::Created().json(CreatedResponse { id: new_id }))
}

#[get("")]
pub async fn list_people_handler(
    service: web::Data<Service>,
    ctx: RequestContext,
) -> Result<HttpResponse, ServiceError> {
    log::info!("Listing people");

    let people = service.people.list(&ctx).await?;

    Ok(HttpResponse::Ok().json(people))
}

// Registered before `/{people_id_path}` so "filter" is never parsed as an id.
#[get("/filter")]
pub async fn filter_people_handler(
    service: web::Data<Service>,
    ctx: RequestContext,
    query: web::Query<PeopleFilterQuery>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("Filtering people with {:?}", query);

    let (filter, limit, offset) = query.into_inner().into_parts();
    let people = service
        .people
        .get_by_filter(&ctx, filter, limit, offset)
        .await?;

    Ok(HttpResponse::Ok().json(people))
}

#[get("/{people_id_path}")]
pub async fn get_person_handler(
    service: web::Data<Service>,
    ctx: RequestContext,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let people_id = path.into_inner();
    log::info!("Fetching person {}", people_id);

    let person = service.people.get_by_id(&ctx, people_id).await?;

    Ok(HttpResponse::Ok().json(person))
}

#[put("")]
pub async fn update_person_handler(
    service: web::Data<Service>,
    ctx: RequestContext,
    payload: web::Json<UpdatePersonPayload>,
) -> Result<HttpResponse, ServiceError> {
    let UpdatePersonPayload { id, changes } = payload.into_inner();
    let people_id =
        id.ok_or_else(|| ServiceError::BadRequest("Field 'id' is required.".to_string()))?;
    log::info!("Updating person {}", people_id);

    service.people.update(&ctx, people_id, changes).await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": format!("Person with id {} updated successfully", people_id)
    })))
}

#[delete("/{people_id_path}")]
pub async fn delete_person_handler(
    service: web::Data<Service>,
    ctx: RequestContext,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let people_id = path.into_inner();
    log::info!("Deleting person {}", people_id);

    service.people.delete(&ctx, people_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": format!("Person with id {} deleted successfully", people_id)
    })))
}
