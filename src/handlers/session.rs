use crate::services::report::{ReportView, render_text};
use crate::services::session::SessionHandle;
use crate::services::workflow::WorkflowError;
use actix_web::{HttpResponse, Result as ActixResult, web};
use log::{error, info, warn};
use serde::Deserialize;

pub struct AppState {
    pub session: SessionHandle,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub filename: String,
    /// File contents, base64 encoded.
    pub content: String,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .service(
            web::scope("/api")
                .route("/session", web::get().to(get_session))
                .route("/draft", web::put().to(put_draft))
                .route("/draft/upload", web::post().to(upload_draft))
                .route("/scan", web::post().to(start_scan))
                .route("/scan/cancel", web::post().to(cancel_scan))
                .route("/back", web::post().to(go_back))
                .route("/notice/dismiss", web::post().to(dismiss_notice))
                .route("/report", web::get().to(get_report))
                .route("/report.txt", web::get().to(get_report_text)),
        );
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "contract-scanner"
    }))
}

fn error_response(err: &WorkflowError) -> HttpResponse {
    let body = serde_json::json!({ "error": err.to_string() });
    match err {
        WorkflowError::Input(_) => HttpResponse::UnprocessableEntity().json(body),
        WorkflowError::ScanInProgress | WorkflowError::InvalidTransition { .. } => {
            HttpResponse::Conflict().json(body)
        }
        WorkflowError::SessionClosed => {
            error!("Session task is gone");
            HttpResponse::ServiceUnavailable().json(body)
        }
    }
}

fn session_response(data: &web::Data<AppState>, outcome: Result<(), WorkflowError>) -> HttpResponse {
    match outcome {
        Ok(()) => HttpResponse::Ok().json(data.session.snapshot()),
        Err(e) => error_response(&e),
    }
}

async fn get_session(data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(data.session.snapshot()))
}

async fn put_draft(
    body: web::Json<DraftRequest>,
    data: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let outcome = data.session.set_draft(body.into_inner().text).await;
    Ok(session_response(&data, outcome))
}

async fn upload_draft(
    body: web::Json<UploadRequest>,
    data: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let UploadRequest { filename, content } = body.into_inner();
    info!("Received upload {}", filename);

    match data.session.upload(filename, content).await {
        Ok(_) => Ok(HttpResponse::Ok().json(data.session.snapshot())),
        Err(e) => {
            warn!("Upload rejected: {}", e);
            Ok(error_response(&e))
        }
    }
}

/// An empty body scans the stored draft. Anything else must be a valid
/// `ScanRequest`.
fn parse_scan_body(body: &[u8]) -> Result<Option<String>, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let request: ScanRequest = serde_json::from_slice(body)?;
    Ok(request.text)
}

async fn start_scan(body: web::Bytes, data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let text = match parse_scan_body(&body) {
        Ok(text) => text,
        Err(e) => {
            warn!("Malformed scan request: {}", e);
            return Ok(HttpResponse::BadRequest()
                .json(serde_json::json!({ "error": format!("Invalid scan request: {}", e) })));
        }
    };
    match data.session.submit(text).await {
        Ok(()) => Ok(HttpResponse::Accepted().json(data.session.snapshot())),
        Err(e) => {
            info!("Scan not started: {}", e);
            Ok(error_response(&e))
        }
    }
}

async fn cancel_scan(data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let outcome = data.session.cancel().await;
    Ok(session_response(&data, outcome))
}

async fn go_back(data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let outcome = data.session.back().await;
    Ok(session_response(&data, outcome))
}

async fn dismiss_notice(data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let outcome = data.session.dismiss_notice().await;
    Ok(session_response(&data, outcome))
}

fn no_report() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({ "error": "No report available" }))
}

async fn get_report(data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let snapshot = data.session.snapshot();
    Ok(match snapshot.result {
        Some(ref result) => HttpResponse::Ok().json(ReportView::new(result)),
        None => no_report(),
    })
}

async fn get_report_text(data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let snapshot = data.session.snapshot();
    Ok(match snapshot.result {
        Some(ref result) => HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body(render_text(result)),
        None => no_report(),
    })
}
