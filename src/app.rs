#![cfg(feature = "web")]

use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::auth::{Principal, require_token};
use crate::config::AppConfig;
use crate::error::{Result, VisualizerError};
use crate::ingest::parse_upload;
use crate::report::{render_report, report_file_name};
use crate::store::{DatasetStore, UploadedDataset};
use crate::summary::Summary;

/// Shared state handed to every handler
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<DatasetStore>,
}

#[derive(Serialize)]
struct UploadResponse {
    message: &'static str,
    summary: Summary,
    dataset_id: u64,
}

/// Open the store and serve the API until the process is stopped
///
/// # Arguments
/// * `config` - Injected runtime configuration
pub async fn run(config: AppConfig) -> Result<()> {
    let store = DatasetStore::open(&config.data_dir, config.retention_limit)?;
    let bind_addr = config.bind_addr.clone();

    let app_state = Arc::new(AppState {
        config,
        store: Arc::new(store),
    });
    let app = router(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    log::info!("listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router
///
/// Everything under `/api` requires a valid token; `/health` does not.
pub fn router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    let api = Router::new()
        .route("/upload", post(upload_dataset))
        .route("/summary/latest", get(latest_summary))
        .route("/history", get(history))
        .route("/report/:id", get(dataset_report))
        .route("/datasets/:id", delete(delete_dataset))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_token,
        ));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Accept a multipart CSV upload, summarize it and store it
async fn upload_dataset(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    mut multipart: Multipart,
) -> Result<Response> {
    let limit = state.config.max_upload_bytes;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.csv").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, limit))?;
        upload = Some((file_name, data.to_vec()));
        break;
    }

    let (file_name, data) = upload.ok_or(VisualizerError::NoFile)?;
    let store = Arc::clone(&state.store);

    let dataset = blocking(move || {
        let table = parse_upload(&data)?;
        let summary = Summary::from_table(&table);
        store.create(
            &data,
            &file_name,
            summary,
            table.row_count(),
            Some(principal.0.as_str()),
        )
    })
    .await?;

    let body = UploadResponse {
        message: "Uploaded successfully",
        summary: dataset.summary,
        dataset_id: dataset.id,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn latest_summary(State(state): State<Arc<AppState>>) -> Result<Json<UploadedDataset>> {
    let store = Arc::clone(&state.store);
    let latest = blocking(move || store.latest()).await?;
    latest.map(Json).ok_or(VisualizerError::NoDatasets)
}

async fn history(State(state): State<Arc<AppState>>) -> Result<Json<Vec<UploadedDataset>>> {
    let store = Arc::clone(&state.store);
    let datasets = blocking(move || store.list_recent(store.retention_limit())).await?;
    Ok(Json(datasets))
}

async fn dataset_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Response> {
    let store = Arc::clone(&state.store);
    let pdf = blocking(move || render_report(&store.get(id)?)).await?;

    let disposition = format!("attachment; filename=\"{}\"", report_file_name(id));
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}

async fn delete_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode> {
    let store = Arc::clone(&state.store);
    blocking(move || store.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Run store and parsing work off the async executor
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| VisualizerError::Storage(format!("worker task failed: {}", e)))?
}

fn multipart_error(e: MultipartError, limit: usize) -> VisualizerError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        VisualizerError::UploadTooLarge(limit)
    } else {
        VisualizerError::MalformedInput(e.body_text())
    }
}

impl IntoResponse for VisualizerError {
    fn into_response(self) -> Response {
        let (status, headline) = match &self {
            VisualizerError::NoFile => (StatusCode::BAD_REQUEST, "No file uploaded"),
            VisualizerError::MalformedInput(_) => (StatusCode::BAD_REQUEST, "Invalid CSV format"),
            VisualizerError::MissingColumns(_) => {
                (StatusCode::BAD_REQUEST, "Missing required columns")
            }
            VisualizerError::UploadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "File too large"),
            VisualizerError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found."),
            VisualizerError::NoDatasets => (StatusCode::NOT_FOUND, "No dataset found"),
            VisualizerError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, *message),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        if self.is_client_error() {
            log::warn!("request rejected: {}", self);
        } else {
            log::error!("request failed: {}", self);
        }

        let mut body = json!({ "error": headline, "code": self.code() });
        match &self {
            VisualizerError::MissingColumns(missing) => {
                body["detail"] = json!(self.to_string());
                body["missing"] = json!(missing);
            }
            VisualizerError::MalformedInput(detail) => body["detail"] = json!(detail),
            VisualizerError::UploadTooLarge(_) | VisualizerError::NotFound(_) => {
                body["detail"] = json!(self.to_string())
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}
