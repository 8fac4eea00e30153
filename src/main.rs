use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use anyhow::{Context, Result};
use dotenv::dotenv;
use log::{info, warn};
use std::sync::Arc;

use contract_scanner::config::AppConfig;
use contract_scanner::handlers::session::{AppState, routes};
use contract_scanner::services::analysis::FallbackAnalyzer;
use contract_scanner::services::gemini::GeminiClient;
use contract_scanner::services::session::SessionHandle;
use contract_scanner::services::workflow::{ScanTimings, WorkflowController};

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env()?;
    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; scans will fail until it is configured");
    }

    let gemini_client = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.request_timeout,
    )
    .context("Failed to create Gemini client")?
    .with_base_url(config.gemini_base_url.clone());
    info!("Using Gemini model {}", gemini_client.model());

    let controller = WorkflowController::new(
        Arc::new(FallbackAnalyzer::new(gemini_client)),
        ScanTimings::default(),
    );
    let (session, _session_task) = SessionHandle::spawn(controller);

    let app_state = web::Data::new(AppState { session });

    let bind_addr = config.bind_addr();
    info!("Starting server on {}", bind_addr);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(routes)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await?;

    Ok(())
}
