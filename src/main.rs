// src/main.rs
mod config;
mod error;

use crate::config::Settings;
use crate::error::AppError;
use actix_web::{App, HttpResponse, HttpServer, Responder, middleware, web};
use serde::Serialize;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

// --- Health Check ---
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(Health { status: "ok" })
}

fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/healthz", web::get().to(health_check));
}

// --- Main Function ---
#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .json()
        .init();

    tracing::info!("Starting Drive/Custom GPT middleware");

    // Built once; handlers get it through `web::Data`.
    let settings = Arc::new(Settings::load()?);
    tracing::info!(
        host = %settings.host,
        port = settings.port,
        debug = settings.debug,
        gcp_project_id = %settings.gcp_project_id,
        workspace_domain = %settings.google_workspace_domain,
        drive_folder_configured = !settings.google_drive_folder_id.is_empty(),
        credentials_configured = !settings.google_application_credentials.is_empty(),
        openai_key_configured = !settings.openai_api_key.is_empty(),
        custom_gpt_id = %settings.custom_gpt_id,
        "Settings loaded"
    );

    let bind_addr = (settings.host.clone(), settings.port);
    let debug = settings.debug;

    tracing::info!("Starting HTTP server on {}:{}", bind_addr.0, bind_addr.1);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::from(settings.clone()))
            .wrap(middleware::Condition::new(debug, middleware::Logger::default()))
            .configure(app_config)
    })
    .bind(bind_addr)?
    .run()
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test};

    #[actix_web::test]
    async fn healthz_reports_ok() {
        let app = test::init_service(App::new().configure(app_config)).await;
        let req = test::TestRequest::get().uri("/healthz").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!({ "status": "ok" }));
    }
}
