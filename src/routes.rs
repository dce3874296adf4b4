use askama::Template;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, FromRef, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use headers::{ContentLength, ContentType, HeaderMapExt};
use http::{HeaderValue, header};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::errors::ApiError;
use crate::pages::IndexTemplate;
use crate::storage::{FileId, FileStore, FileSummary};
use crate::upload::{PdfUpload, UploadLimits};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FileStore>,
    pub limits: UploadLimits,
}

impl FromRef<AppState> for UploadLimits {
    fn from_ref(state: &AppState) -> Self {
        state.limits
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/files", get(list_files))
        .route("/file/{file_id}", get(get_file))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                // the upload stage enforces its own ceiling
                .layer(DefaultBodyLimit::disable()),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let files = state.store.list().await?;
    let page = IndexTemplate::new(&files).render().map_err(|e| {
        tracing::error!(error = %e, "failed to render index page");
        ApiError::Internal
    })?;
    Ok(Html(page))
}

async fn upload(
    State(state): State<AppState>,
    PdfUpload(file): PdfUpload,
) -> Result<Redirect, ApiError> {
    let stored = state.store.insert(file).await?;
    tracing::info!(
        id = %stored.id,
        name = %stored.original_name,
        size = stored.payload.len(),
        "stored upload"
    );
    Ok(Redirect::to("/"))
}

#[derive(Debug, Serialize)]
struct FileLink {
    #[serde(flatten)]
    summary: FileSummary,
    url: String,
}

async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<FileLink>>, ApiError> {
    let links = state
        .store
        .list()
        .await?
        .into_iter()
        .map(|summary| FileLink {
            url: format!("/file/{}", summary.id),
            summary,
        })
        .collect();
    Ok(Json(links))
}

async fn get_file(
    Path(file_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let id: FileId = file_id.parse().map_err(|_| ApiError::NotFound)?;
    let file = state.store.find(id).await?.ok_or(ApiError::NotFound)?;

    let size = file.payload.len() as u64;
    let mut response = file.payload.into_response();
    let headers = response.headers_mut();
    headers.typed_insert(ContentType::from(file.content_type));
    headers.typed_insert(ContentLength(size));
    if let Ok(disposition) = HeaderValue::from_str(&content_disposition(&file.original_name)) {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }

    Ok(response)
}

/// `inline` disposition with an ASCII `filename` fallback and the exact
/// name as an RFC 5987 `filename*`.
fn content_disposition(name: &str) -> String {
    format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback_name(name),
        urlencoding::encode(name)
    )
}

fn ascii_fallback_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect()
}
