//! HTTP Server for the csvwindow API.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                                |
//! |--------|-------------------|--------------------------------------------|
//! | GET    | `/health`         | Health check                               |
//! | POST   | `/api/process`    | Upload CSV, download the processed CSV     |
//! | POST   | `/api/preview`    | Upload CSV, get the processed file as JSON |
//! | GET    | `/api/logs`       | SSE stream for real-time logs              |
//!
//! Upload endpoints take a multipart form with a `file` part and optional
//! `startDate` / `endDate` text parts.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{header, HeaderName, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, ProcessResponse};
use crate::config::Config;
use crate::dates::parse_optional_bound;
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::models::DateWindow;
use crate::transform::pipeline::{is_accepted_upload, process_bytes, ProcessOptions, ProcessedFile};

const ROWS_IN: HeaderName = HeaderName::from_static("x-rows-in");
const ROWS_OUT: HeaderName = HeaderName::from_static("x-rows-out");

/// Multipart slack on top of the file size limit (boundaries, date fields).
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the application router.
pub fn router(config: Config) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION, ROWS_IN, ROWS_OUT]);

    let body_limit = config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/process", post(process_csv))
        .route("/api/preview", post(preview_csv))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(config)
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    eprintln!("🚀 csvwindow server running on http://localhost:{}", config.port);
    eprintln!("   POST /api/process - Upload CSV, download result");
    eprintln!("   POST /api/preview - Upload CSV, JSON result");
    eprintln!("   GET  /api/logs    - SSE log stream");
    eprintln!("   GET  /health      - Health check");

    let app = router(config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "csvwindow",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "process": "POST /api/process",
            "preview": "POST /api/preview",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Download endpoint: responds with the processed CSV as an attachment.
async fn process_csv(State(config): State<Config>, multipart: Multipart) -> ServerResult<Response> {
    let processed = handle_upload(&config, multipart).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        processed.name.replace(['"', '\\'], "_")
    );
    let headers = [
        (header::CONTENT_TYPE, processed.mime_type.clone()),
        (header::CONTENT_DISPOSITION, disposition),
        (ROWS_IN, processed.stats.input_rows.saturating_sub(1).to_string()),
        (ROWS_OUT, processed.stats.output_rows.saturating_sub(1).to_string()),
    ];

    Ok((StatusCode::OK, headers, processed.content).into_response())
}

/// Preview endpoint: responds with the processed file and stats as JSON.
async fn preview_csv(
    State(config): State<Config>,
    multipart: Multipart,
) -> ServerResult<Json<ProcessResponse>> {
    let processed = handle_upload(&config, multipart).await?;
    Ok(Json(ProcessResponse::from(processed)))
}

/// Fields collected from an upload form.
#[derive(Debug, Default)]
struct UploadForm {
    bytes: Option<Vec<u8>>,
    file_name: Option<String>,
    content_type: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> ServerResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Multipart error", e))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(str::to_string);
                form.content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error("Read error", e))?;
                form.bytes = Some(bytes.to_vec());
            }
            "startDate" | "endDate" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error("Read error", e))?;
                if name == "startDate" {
                    form.start = Some(text);
                } else {
                    form.end = Some(text);
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Keep the body limit rejection distinct from malformed forms.
fn multipart_error(context: &str, err: MultipartError) -> ServerError {
    let message = format!("{}: {}", context, err.body_text());
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(message)
    } else {
        ServerError::BadRequest(message)
    }
}

async fn handle_upload(config: &Config, multipart: Multipart) -> ServerResult<ProcessedFile> {
    let form = read_form(multipart).await?;

    let bytes = form
        .bytes
        .ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;
    let file_name = form.file_name.unwrap_or_else(|| "upload.csv".to_string());

    if !is_accepted_upload(&file_name, form.content_type.as_deref()) {
        return Err(PipelineError::UnsupportedFileType(file_name).into());
    }

    let window = DateWindow::new(
        parse_optional_bound(form.start.as_deref()).map_err(PipelineError::from)?,
        parse_optional_bound(form.end.as_deref()).map_err(PipelineError::from)?,
    );

    log_info(format!("New upload: {} ({} bytes)", file_name, bytes.len()));

    let options = ProcessOptions {
        window,
        ..ProcessOptions::from(config)
    };

    process_bytes(&bytes, &file_name, &options).map_err(|e| {
        log_error(format!("Processing failed: {}", e));
        ServerError::from(e)
    })
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge(_)
            | ServerError::Pipeline(PipelineError::FileTooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ServerError::Pipeline(PipelineError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Pipeline(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = match &self {
            ServerError::Pipeline(e) => e.to_string(),
            ServerError::BadRequest(m)
            | ServerError::PayloadTooLarge(m)
            | ServerError::Internal(m) => m.clone(),
        };
        (self.status(), Json(error_response(&message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    const BOUNDARY: &str = "csvwindow-test-boundary";
    const SAMPLE: &str = "No.,Date,Val\n100A,2024-01-05,x\n200B,2024-02-10,y\n300C,2024-03-01,z\n";

    fn multipart_body(file: Option<(&str, &str, &str)>, fields: &[(&str, &str)]) -> String {
        let mut body = String::new();
        if let Some((name, content_type, content)) = file {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: {content_type}\r\n\r\n{content}\r\n"
            ));
        }
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    fn upload(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(Config::default())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_process_returns_csv_attachment() {
        let body = multipart_body(
            Some(("ledger.csv", "text/csv", SAMPLE)),
            &[("startDate", "2024-01-01"), ("endDate", "2024-02-28")],
        );
        let response = router(Config::default())
            .oneshot(upload("/api/process", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"ledger_"));
        assert!(disposition.ends_with(".csv\""));
        assert_eq!(response.headers()[ROWS_IN], "3");
        assert_eq!(response.headers()[ROWS_OUT], "2");

        let text = body_string(response).await;
        assert_eq!(text, "No.,Date,Val\nA,2024-01-05,x\nB,2024-02-10,y\n");
    }

    #[tokio::test]
    async fn test_blank_dates_mean_no_bounds() {
        let body = multipart_body(
            Some(("ledger.csv", "text/csv", SAMPLE)),
            &[("startDate", ""), ("endDate", "")],
        );
        let response = router(Config::default())
            .oneshot(upload("/api/process", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ROWS_OUT], "3");
    }

    #[tokio::test]
    async fn test_preview_returns_json() {
        let body = multipart_body(Some(("ledger.csv", "text/csv", SAMPLE)), &[]);
        let response = router(Config::default())
            .oneshot(upload("/api/preview", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["status"], "ready");
        assert_eq!(json["file"]["mimeType"], "text/csv");
        assert_eq!(json["metadata"]["strippedIds"], 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_bad_request() {
        let body = multipart_body(None, &[("startDate", "2024-01-01")]);
        let response = router(Config::default())
            .oneshot(upload("/api/process", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "No file provided");
    }

    #[tokio::test]
    async fn test_invalid_bound_is_bad_request() {
        let body = multipart_body(
            Some(("ledger.csv", "text/csv", SAMPLE)),
            &[("startDate", "next tuesday")],
        );
        let response = router(Config::default())
            .oneshot(upload("/api/process", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("next tuesday"));
    }

    #[tokio::test]
    async fn test_unsupported_type_rejected() {
        let body = multipart_body(Some(("photo.png", "image/png", "not really")), &[]);
        let response = router(Config::default())
            .oneshot(upload("/api/process", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected() {
        let config = Config {
            max_upload_bytes: 8,
            ..Config::default()
        };
        let body = multipart_body(Some(("ledger.csv", "text/csv", SAMPLE)), &[]);
        let response = router(config)
            .oneshot(upload("/api/process", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_body_over_limit_is_payload_too_large() {
        let config = Config {
            max_upload_bytes: 8,
            ..Config::default()
        };
        let content = format!("No.,Date\n{}", "100A,2024-01-05\n".repeat(8_000));
        assert!(content.len() > MULTIPART_OVERHEAD + 8);

        let body = multipart_body(Some(("ledger.csv", "text/csv", &content)), &[]);
        let response = router(config)
            .oneshot(upload("/api/process", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["status"], "error");
    }
}
