//! HTTP server for the copylist API.
//!
//! # API Endpoints
//!
//! | Method | Path                 | Description                                      |
//! |--------|----------------------|--------------------------------------------------|
//! | GET    | `/health`            | Health check                                     |
//! | GET    | `/api/rules`         | Active rule set                                  |
//! | POST   | `/api/convert`       | Upload one CSV, download the Shift_JIS copy      |
//! | POST   | `/api/convert/batch` | Upload CSVs, get each converted file (base64)    |
//! | POST   | `/api/inspect`       | Upload CSVs, get a JSON report per file          |
//! | GET    | `/api/logs`          | SSE stream for real-time logs                    |

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, FileReport, InspectResponse};
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::transform::dsl::RuleSet;
use crate::transform::pipeline::{convert_bytes, ConvertOptions, ConvertResult};

/// Multipart field carrying an uploaded CSV
const FILE_FIELD: &str = "file";

/// Name used when an upload carries no file name
const FALLBACK_FILE_NAME: &str = "upload.csv";

/// Shared state for handlers
#[derive(Clone)]
struct AppState {
    options: Arc<ConvertOptions>,
}

type ApiError = (StatusCode, Json<Value>);

/// Build the router with every endpoint.
///
/// `max_upload_bytes` caps a whole request body, all files included.
pub fn router(options: ConvertOptions, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    let state = AppState {
        options: Arc::new(options),
    };

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/rules", get(active_rules))
        .route("/api/convert", post(convert_upload))
        .route("/api/convert/batch", post(convert_batch))
        .route("/api/inspect", post(inspect_uploads))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(
    port: u16,
    max_upload_bytes: usize,
    options: ConvertOptions,
) -> ServerResult<()> {
    let app = router(options, max_upload_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Copylist server running on http://localhost:{}", port);
    println!("   POST /api/convert       - Convert one CSV file");
    println!("   POST /api/convert/batch - Convert several CSV files");
    println!("   POST /api/inspect       - Conversion report for CSV files");
    println!("   GET  /api/rules         - Active rule set");
    println!("   GET  /api/logs          - SSE log stream");
    println!("   GET  /health            - Health check");
    println!("   Upload limit: {} bytes", max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "copylist",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "convert": "POST /api/convert",
            "batch": "POST /api/convert/batch",
            "inspect": "POST /api/inspect",
            "rules": "GET /api/rules",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn active_rules(State(state): State<AppState>) -> Json<RuleSet> {
    Json(state.options.rules.clone())
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers skip the entries they missed
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Convert a single upload and return the converted file as an attachment
async fn convert_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut files = read_files(multipart).await.map_err(reject)?;
    if files.len() > 1 {
        return Err(reject(ServerError::BadRequest(
            "Send exactly one file; use /api/convert/batch for several".to_string(),
        )));
    }
    let (name, bytes) = files
        .pop()
        .ok_or_else(|| reject(ServerError::BadRequest("No file provided".to_string())))?;

    log_info(format!("📄 NEW UPLOAD: {} ({} bytes)", name, bytes.len()));

    let result = run_conversion(state.options.clone(), name, bytes)
        .await
        .map_err(|e| {
            log_error(format!("Conversion failed: {}", e));
            reject(e)
        })?;

    attachment(result).map_err(reject)
}

/// Convert every upload and return each converted file, base64-encoded
async fn convert_batch(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<InspectResponse>, ApiError> {
    convert_all(&state, multipart, true).await.map(Json)
}

/// Convert every upload and report on each without returning the files
async fn inspect_uploads(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<InspectResponse>, ApiError> {
    convert_all(&state, multipart, false).await.map(Json)
}

/// Convert uploads in order; a failing file gets an error report, the rest continue
async fn convert_all(
    state: &AppState,
    multipart: Multipart,
    with_content: bool,
) -> Result<InspectResponse, ApiError> {
    let files = read_files(multipart).await.map_err(reject)?;
    if files.is_empty() {
        return Err(reject(ServerError::BadRequest("No file provided".to_string())));
    }

    let mut reports = Vec::with_capacity(files.len());
    for (name, bytes) in files {
        log_info(format!("📄 NEW UPLOAD: {} ({} bytes)", name, bytes.len()));
        let report = match run_conversion(state.options.clone(), name.clone(), bytes).await {
            Ok(result) if with_content => FileReport::with_content(name, result),
            Ok(result) => FileReport::from_result(name, result),
            Err(e) => {
                log_error(format!("{}: {}", name, e));
                FileReport::failed(name, e)
            }
        };
        reports.push(report);
    }

    Ok(InspectResponse::new(reports))
}

/// Collect every `file` field as (file name, bytes), in upload order
async fn read_files(mut multipart: Multipart) -> ServerResult<Vec<(String, Vec<u8>)>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Multipart error", e))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let name = field
            .file_name()
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_FILE_NAME)
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Read error", e))?;
        files.push((name, bytes.to_vec()));
    }

    Ok(files)
}

fn multipart_error(context: &str, error: MultipartError) -> ServerError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(error.body_text())
    } else {
        ServerError::BadRequest(format!("{}: {}", context, error))
    }
}

/// Run the blocking pipeline off the async workers
async fn run_conversion(
    options: Arc<ConvertOptions>,
    name: String,
    bytes: Vec<u8>,
) -> ServerResult<ConvertResult> {
    tokio::task::spawn_blocking(move || convert_bytes(&bytes, &name, &options))
        .await
        .map_err(|e| ServerError::Io(std::io::Error::other(e)))?
        .map_err(ServerError::from)
}

fn attachment(result: ConvertResult) -> ServerResult<Response> {
    let disposition = HeaderValue::from_str(&content_disposition(&result.output_name))
        .map_err(|e| ServerError::BadRequest(format!("Invalid output name: {}", e)))?;

    let mut response = result.bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=Shift_JIS"),
    );
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}

fn status_for(error: &ServerError) -> StatusCode {
    match error {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        ServerError::Pipeline(PipelineError::Csv(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        ServerError::Pipeline(_) | ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(error: ServerError) -> ApiError {
    (status_for(&error), Json(error_response(&error.to_string())))
}
