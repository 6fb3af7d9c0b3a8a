// TaskSync/backend-api/src/main.rs
use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpResponse, HttpServer};
use std::io;
use task_sync::config::AppConfig;
use task_sync::db::{self, DbPool};
use task_sync::error_handler::ServiceError;
use task_sync::handlers;
use task_sync::repositories::Storage;
use task_sync::services::Service;

async fn health_check_handler(pool: web::Data<DbPool>) -> Result<HttpResponse, ServiceError> {
    match pool.get().await {
        Ok(_conn) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "message": "Backend is running and DB pool accessible"
        }))),
        Err(e) => {
            log::error!("Failed to get connection from pool: {:?}", e);
            Err(ServiceError::InternalServerError(
                "Failed to check DB pool".to_string(),
            ))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    if cfg!(debug_assertions) {
        match dotenvy::dotenv() {
            Ok(path) => log::info!(".env file loaded from path: {}", path.display()),
            Err(e) => log::warn!(
                "Could not load .env file: {}, using environment variables.",
                e
            ),
        }
    }

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    if config.run_migrations {
        db::run_migrations(&config.database_url).await.map_err(|e| {
            log::error!("{}", e);
            io::Error::new(io::ErrorKind::Other, e)
        })?;
    }

    let pool = db::create_pool(&config.database_url, &config.pool)
        .await
        .map_err(|e| {
            log::error!("{}", e);
            io::Error::new(io::ErrorKind::ConnectionRefused, e)
        })?;

    let service = Service::new(Storage::postgres(pool.clone()));

    log::info!("TaskSync backend starting...");
    log::info!(
        "Server will start at http://{}:{}",
        config.host,
        config.port
    );

    let bind_addr = (config.host.clone(), config.port);
    let app_config = web::Data::new(config);
    let service = web::Data::new(service);
    let pool = web::Data::new(pool);

    HttpServer::new(move || {
        let cors = app_config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(pool.clone())
            .app_data(service.clone())
            .app_data(app_config.clone())
            .service(web::resource("/health").route(web::get().to(health_check_handler)))
            .configure(handlers::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
