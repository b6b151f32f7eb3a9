use actix_web::{web, App, HttpServer};
use api_starter::config::AppConfig;
use api_starter::infra::state::build_state;
use api_starter::middleware::catch_panic::CatchPanic;
use api_starter::middleware::cors::cors_middleware;
use api_starter::middleware::request_trace::RequestTrace;
use api_starter::middleware::structured_logger::StructuredLogger;
use api_starter::middleware::trace_span::TraceSpan;
use api_starter::routes;
use api_starter::services::users::ensure_admin_user;
use tracing::{error, info, warn};

mod telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    // Variables come from the runtime environment (container env, shell
    // exports). Nothing is read from disk.
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };
    info!(config = ?config, "configuration loaded");

    let app_state = match build_state().with_config(&config).build().await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to build application state");
            std::process::exit(1);
        }
    };

    match &config.admin_seed {
        Some(seed) => {
            if let Err(e) = ensure_admin_user(app_state.store(), &app_state.hasher, seed).await {
                error!(error = %e, "failed to seed admin account");
                std::process::exit(1);
            }
        }
        None => warn!("ADMIN_PASSWORD not set, admin seeding skipped"),
    }

    let data = web::Data::new(app_state);
    let origins = config.cors_origins.clone();

    info!(host = %config.host, port = config.port, "starting api-starter");

    HttpServer::new(move || {
        App::new()
            .wrap(CatchPanic)
            .wrap(StructuredLogger)
            .wrap(TraceSpan)
            .wrap(RequestTrace)
            .wrap(cors_middleware(&origins))
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
