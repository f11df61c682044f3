use std::sync::{Arc, Mutex};

use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, web};

use crate::adapters::api::{ApiState, configure_routes};
use crate::adapters::db::{open_connection, run_migrations, schema_version};
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::services::SqliteWalletService;
use crate::domain::clock::SystemClock;

const CORS_MAX_AGE_SECONDS: usize = 3600;

pub fn run(config: AppConfig) -> Result<(), AppError> {
    let mut connection = open_connection(&config.db_path).map_err(AppError::database_init)?;
    run_migrations(&mut connection).map_err(AppError::database_init)?;

    let version = schema_version(&connection).map_err(AppError::database_init)?;
    tracing::info!(db_path = %config.db_path, schema_version = version, "database ready");

    let api_state = ApiState {
        wallets: SqliteWalletService::new(
            Arc::new(Mutex::new(connection)),
            Arc::new(SystemClock),
            config.refund_window_hours,
        ),
    };
    let allowed_origin = config.cors_allowed_origin.clone();

    tracing::info!(bind = %config.http_bind, "http server starting");

    let server_result = actix_web::rt::System::new().block_on(async move {
        HttpServer::new(move || {
            App::new()
                .wrap(build_cors(&allowed_origin))
                .app_data(web::Data::new(api_state.clone()))
                .configure(configure_routes)
        })
        .bind(&config.http_bind)?
        .run()
        .await
    });

    tracing::info!("http server stopped");

    server_result.map_err(AppError::runtime)
}

fn build_cors(allowed_origin: &str) -> Cors {
    Cors::default()
        .allowed_origin(allowed_origin)
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .max_age(CORS_MAX_AGE_SECONDS)
}
