//! HTTP transport.
//!
//! Thin axum layer over the pipeline and the artifact store. Pipeline and
//! store calls block, so every handler hands them to
//! `tokio::task::spawn_blocking`; requests share nothing but the key and
//! the directory.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | `/` | index page |
//! | POST | `/` | create barcode (form) |
//! | GET | `/barcodes` | JSON list of filenames |
//! | POST | `/delete_image` | delete `{"filename": ...}` |
//! | GET | `/download/{filename}` | attachment download |
//! | GET | `/static/Barcodes/{filename}` | inline image |
//! | GET | `/healthz` | liveness |

pub mod page;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::{error, info};

use crate::core::PipelineOrchestrator;
use crate::domain::CreateRequest;
use crate::store::ArtifactStore;

use self::page::PageNotice;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<PipelineOrchestrator>,
    store: ArtifactStore,
}

impl AppState {
    pub fn new(orchestrator: PipelineOrchestrator, store: ArtifactStore) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            store,
        }
    }
}

/// Body of `POST /delete_image`
#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub filename: String,
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(create))
        .route("/barcodes", get(barcodes))
        .route("/delete_image", post(delete_image))
        .route("/download/:filename", get(download))
        .route("/static/Barcodes/:filename", get(view))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(%addr, "barcoder listening");
    axum::serve(listener, router(state))
        .await
        .context("HTTP server failed")
}

async fn blocking<T, F>(work: F) -> Result<T, StatusCode>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        error!(error = %e, "Blocking task failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

async fn index(State(state): State<AppState>) -> Response {
    let store = state.store.clone();
    match blocking(move || store.list()).await {
        Ok(Ok(barcodes)) => Html(page::render_index(&barcodes, &PageNotice::default())).into_response(),
        Ok(Err(e)) => {
            error!(error = %e, "Failed to list barcodes");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(status) => status.into_response(),
    }
}

async fn create(State(state): State<AppState>, Form(request): Form<CreateRequest>) -> Response {
    let outcome = blocking(move || {
        let result = state.orchestrator.create(&request);
        (result, state.store.list())
    })
    .await;

    let (result, listing) = match outcome {
        Ok(pair) => pair,
        Err(status) => return status.into_response(),
    };

    let mut barcodes = match listing {
        Ok(barcodes) => barcodes,
        Err(e) => {
            error!(error = %e, "Failed to list barcodes");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let notice = match result {
        Ok(artifact) => {
            if !barcodes.contains(&artifact.name) {
                barcodes.push(artifact.name.clone());
            }
            PageNotice {
                created: Some(artifact.name),
                error: None,
            }
        }
        Err(e) => PageNotice {
            created: None,
            error: Some(e.to_string()),
        },
    };

    Html(page::render_index(&barcodes, &notice)).into_response()
}

async fn barcodes(State(state): State<AppState>) -> Result<Json<Vec<String>>, StatusCode> {
    let store = state.store.clone();
    match blocking(move || store.list()).await? {
        Ok(barcodes) => Ok(Json(barcodes)),
        Err(e) => {
            error!(error = %e, "Failed to list barcodes");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn delete_image(
    State(state): State<AppState>,
    Json(request): Json<DeleteRequest>,
) -> (StatusCode, &'static str) {
    let store = state.store.clone();
    match blocking(move || store.delete(&request.filename)).await {
        Ok(Ok(())) => (StatusCode::OK, "OK"),
        Ok(Err(e)) if e.is_not_found() => (StatusCode::NOT_FOUND, "File not found"),
        Ok(Err(e)) => {
            error!(error = %e, "Barcode deletion error");
            (StatusCode::INTERNAL_SERVER_ERROR, "Delete failed")
        }
        Err(status) => (status, "Delete failed"),
    }
}

async fn download(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    send_file(state, filename, true).await
}

async fn view(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    send_file(state, filename, false).await
}

async fn send_file(state: AppState, filename: String, attachment: bool) -> Response {
    let store = state.store.clone();
    let name = filename.clone();

    match blocking(move || store.open(&name)).await {
        Ok(Ok(file)) => {
            let mut headers = HeaderMap::new();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(content_type_for(&filename)),
            );
            if let Ok(metadata) = file.metadata() {
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));
            }
            if attachment {
                headers.insert(header::CONTENT_DISPOSITION, attachment_header(&filename));
            }

            let stream = ReaderStream::new(tokio::fs::File::from_std(file));
            (headers, Body::from_stream(stream)).into_response()
        }
        Ok(Err(e)) if e.is_not_found() => {
            info!(%filename, "Requested barcode not found");
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
        Ok(Err(e)) => {
            error!(error = %e, %filename, "Failed to open barcode");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(status) => status.into_response(),
    }
}

async fn healthz(State(state): State<AppState>) -> Json<serde_json::Value> {
    let root = state.store.root();
    Json(json!({
        "status": "ok",
        "artifact_dir": root.display().to_string(),
        "artifact_dir_exists": root.is_dir(),
    }))
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

fn attachment_header(filename: &str) -> HeaderValue {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    let mut value = format!("attachment; filename=\"{}\"", fallback);
    if !filename.is_ascii() {
        value.push_str(&format!("; filename*=UTF-8''{}", urlencoding::encode(filename)));
    }

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
