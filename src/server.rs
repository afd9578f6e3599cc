//! HTTP server exposing a reader's library as linked-data JSON.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/readers/{id}/library` | Filtered, ordered, paginated publications |
//! | `GET`  | `/readers/{id}/tags` | The reader's tags |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Library query parameters: `title`, `author`, `attribution`, `role`, `type`,
//! `language`, `keyword`, `collection` (or `stack`), `workspace`, `search`,
//! `orderBy` (`title` | `datePublished`), `reverse`, `limit`, `offset`.
//!
//! Errors are `{ "error": { "code": "not_found", "message": "..." } }` with
//! codes `not_found` (404) and `internal` (500).

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::config::ShelfConfig;
use crate::db;
use crate::error::LibraryError;
use crate::library::store;
use crate::library::types::{Publication, Tag};
use crate::library::{Library, RawFilter};

const AS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";
const READER_NS: &str = "https://rebus.foundation/ns/reader";

/// Shared state handed to every route handler.
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    config: Arc<ShelfConfig>,
}

/// Build the router over an already-open connection.
pub fn router(db: Arc<Mutex<Connection>>, config: Arc<ShelfConfig>) -> Router {
    Router::new()
        .route("/readers/{reader_id}/library", get(handle_library))
        .route("/readers/{reader_id}/tags", get(handle_tags))
        .route("/health", get(handle_health))
        .with_state(AppState { db, config })
}

/// Open the configured database and serve until ctrl-c.
pub async fn serve(config: ShelfConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    let bind_addr = config.bind_addr();
    let app = router(Arc::new(Mutex::new(conn)), Arc::new(config));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "library server listening at http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down library server");
        })
        .await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "not_found",
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: message.into(),
        }
    }
}

impl From<LibraryError> for AppError {
    fn from(e: LibraryError) -> Self {
        tracing::error!(error = %e, "library query failed");
        Self::internal(e.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!(error = %e, "request failed");
        Self::internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

// ============ Handlers ============

/// A page of the library rendered as an ActivityStreams collection.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LibraryCollection {
    #[serde(rename = "@context")]
    context: serde_json::Value,
    #[serde(rename = "type")]
    kind: &'static str,
    id: String,
    total_items: u64,
    page_size: usize,
    offset: usize,
    items: Vec<Publication>,
    tags: Vec<Tag>,
}

fn ld_context() -> serde_json::Value {
    serde_json::json!([AS_CONTEXT, { "reader": READER_NS }])
}

async fn handle_library(
    State(state): State<AppState>,
    Path(reader_id): Path<String>,
    Query(raw): Query<RawFilter>,
) -> Result<Json<LibraryCollection>, AppError> {
    let collection = run_blocking(state.db.clone(), move |conn| {
        if store::get_reader(conn, &reader_id)?.is_none() {
            return Err(AppError::not_found(format!("reader not found: {reader_id}")));
        }

        let filter = raw.normalize();
        let page_size = state.config.library.page_size(filter.limit);
        let offset = filter.offset.unwrap_or(0);

        let library = Library::new(conn);
        let total_items = library.count(&reader_id, &raw)?;
        let page = library.page(&reader_id, page_size, Some(offset), &raw)?;

        Ok(LibraryCollection {
            context: ld_context(),
            kind: "Collection",
            id: format!("/readers/{reader_id}/library"),
            total_items,
            page_size,
            offset,
            items: page.publications,
            tags: page.reader_tags,
        })
    })
    .await?;

    Ok(Json(collection))
}

async fn handle_tags(
    State(state): State<AppState>,
    Path(reader_id): Path<String>,
) -> Result<Json<Vec<Tag>>, AppError> {
    let tags = run_blocking(state.db.clone(), move |conn| {
        if store::get_reader(conn, &reader_id)?.is_none() {
            return Err(AppError::not_found(format!("reader not found: {reader_id}")));
        }
        Ok(Library::new(conn).reader_tags(&reader_id)?)
    })
    .await?;

    Ok(Json(tags))
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Run synchronous database work on the blocking pool.
async fn run_blocking<T, F>(db: Arc<Mutex<Connection>>, f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|e| AppError::internal(format!("db lock poisoned: {e}")))?;
        f(&conn)
    })
    .await
    .map_err(|e| AppError::internal(format!("database task failed: {e}")))?
}
