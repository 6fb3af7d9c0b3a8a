// TaskSync/backend-api/src/error_handler.rs
use crate::repositories::error::StorageError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum ServiceError {
    InternalServerError(String),
    BadRequest(String),
    NotFound(String),
    DatabaseError(String), // already user-facing
    PoolError(String),     // already user-facing
    GatewayTimeout(String),
    ServiceUnavailable(String),
}

impl ServiceError {
    fn from_storage_error(error: StorageError) -> ServiceError {
        match error {
            StorageError::InvalidInput(msg) => ServiceError::BadRequest(msg),
            StorageError::NoChangesRequested => {
                ServiceError::BadRequest("No fields to update were provided.".to_string())
            }
            StorageError::NotFound(msg) => ServiceError::NotFound(msg),
            StorageError::Database(err) => {
                // Details were logged when the diesel error was converted.
                log::debug!("Database failure surfaced to client as 500: {}", err);
                ServiceError::DatabaseError("A database operation failed.".to_string())
            }
            StorageError::Pool(msg) => {
                log::debug!("Pool failure surfaced to client as 500: {}", msg);
                ServiceError::PoolError("Could not obtain connection from database pool.".to_string())
            }
            StorageError::DeadlineExceeded => ServiceError::GatewayTimeout(
                "The operation did not complete in time.".to_string(),
            ),
            StorageError::Cancelled => {
                ServiceError::ServiceUnavailable("The operation was cancelled.".to_string())
            }
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(error: StorageError) -> ServiceError {
        ServiceError::from_storage_error(error)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ServiceError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            ServiceError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ServiceError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ServiceError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            ServiceError::PoolError(msg) => write!(f, "Pool Error: {}", msg),
            ServiceError::GatewayTimeout(msg) => write!(f, "Gateway Timeout: {}", msg),
            ServiceError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match *self {
            ServiceError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::PoolError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        // 5xx bodies never carry internal details.
        let user_facing_message = match self {
            ServiceError::InternalServerError(_)
            | ServiceError::DatabaseError(_)
            | ServiceError::PoolError(_) => {
                "An internal server error occurred. Please try again later.".to_string()
            }
            _ => self.to_string(),
        };

        if status_code.is_server_error() {
            log::error!("Responding with server error ({}): {}", status_code, self);
        } else {
            log::warn!(
                "Responding with client error ({}): {}",
                status_code,
                user_facing_message
            );
        }

        HttpResponse::build(status_code).json(json!({
            "status": "error",
            "statusCode": status_code.as_u16(),
            "message": user_facing_message
        }))
    }
}
