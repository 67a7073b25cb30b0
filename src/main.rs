//! Archive taxonomy server - serves the render-ready archive tree to the admin console.

use archive_taxonomy::config::ArchiveConfig;
use archive_taxonomy::source::{self, ArchiveSource};
use archive_taxonomy::{ArchiveSession, Diagnostic, Document, RowView};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    session: Arc<RwLock<ArchiveSession>>,
    source: Arc<dyn ArchiveSource>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "archive_taxonomy=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ArchiveConfig::load()?;
    let source: Arc<dyn ArchiveSource> = Arc::from(source::from_config(&config)?);
    info!("Using {} source", source.name());

    let state = AppState {
        session: Arc::new(RwLock::new(ArchiveSession::default())),
        source,
    };

    // A failed initial fetch leaves an empty archive; POST /archive/refresh retries
    if let Err(e) = refresh_session(&state).await {
        error!("Initial archive load failed: {}", e);
    }

    let app = Router::new()
        .route("/health", get(health))
        .route("/archive/rows", get(list_rows))
        .route("/archive/categories/:id", get(get_category))
        .route("/archive/categories/:id/toggle", post(toggle_category))
        .route("/archive/expand-all", post(expand_all))
        .route("/archive/collapse-all", post(collapse_all))
        .route("/archive/documents/:id", get(get_document))
        .route("/archive/diagnostics", get(list_diagnostics))
        .route("/archive/refresh", post(refresh))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Server listening on http://{}", config.listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> &'static str {
    "ok"
}

/// Visible rows for the current expansion state.
async fn list_rows(State(state): State<AppState>) -> Json<Vec<RowView>> {
    Json(state.session.read().await.row_views())
}

/// One category with its direct children by id; subtrees are not inlined.
#[derive(Serialize)]
struct CategoryResponse {
    id: i64,
    name: String,
    order: f64,
    depth: usize,
    expanded: bool,
    children: Vec<i64>,
    documents: Vec<Document>,
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CategoryResponse>, StatusCode> {
    let session = state.session.read().await;
    let node = session.category(id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(CategoryResponse {
        id: node.id,
        name: node.name.clone(),
        order: node.order,
        depth: session.forest().depth_of(id).unwrap_or_default(),
        expanded: session.expansion().is_expanded(id),
        children: node.children.iter().map(|c| c.id).collect(),
        documents: session.buckets().documents_in(id).to_vec(),
    }))
}

#[derive(Serialize)]
struct ToggleResponse {
    id: i64,
    expanded: bool,
    rows: Vec<RowView>,
}

/// Flip one category and return the re-flattened rows.
async fn toggle_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ToggleResponse>, StatusCode> {
    let mut session = state.session.write().await;
    let expanded = session.toggle(id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(ToggleResponse {
        id,
        expanded,
        rows: session.row_views(),
    }))
}

async fn expand_all(State(state): State<AppState>) -> Json<Vec<RowView>> {
    let mut session = state.session.write().await;
    session.expand_all();
    Json(session.row_views())
}

async fn collapse_all(State(state): State<AppState>) -> Json<Vec<RowView>> {
    let mut session = state.session.write().await;
    session.collapse_all();
    Json(session.row_views())
}

async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Document>, StatusCode> {
    state
        .session
        .read()
        .await
        .document(id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn list_diagnostics(State(state): State<AppState>) -> Json<Vec<Diagnostic>> {
    Json(state.session.read().await.diagnostics())
}

#[derive(Serialize)]
struct RefreshSummary {
    categories_changed: bool,
    documents_changed: bool,
    categories: usize,
    documents: usize,
    uncategorized: usize,
}

/// Re-fetch both collections from the source.
async fn refresh(
    State(state): State<AppState>,
) -> Result<Json<RefreshSummary>, (StatusCode, String)> {
    refresh_session(&state).await.map(Json).map_err(|e| {
        error!("Archive refresh failed: {}", e);
        (StatusCode::BAD_GATEWAY, format!("Refresh failed: {}", e))
    })
}

// ============================================================================
// Helper functions
// ============================================================================

/// Fetch both collections, then load them under the write lock.
async fn refresh_session(state: &AppState) -> anyhow::Result<RefreshSummary> {
    let (categories, documents) =
        tokio::try_join!(state.source.categories(), state.source.documents())?;

    let mut session = state.session.write().await;
    let categories_changed = session.load_categories(&categories);
    let documents_changed = session.load_documents(&documents);

    let summary = RefreshSummary {
        categories_changed,
        documents_changed,
        categories: session.forest().len(),
        documents: session.buckets().total(),
        uncategorized: session.buckets().uncategorized().len(),
    };
    info!(
        "Archive refreshed: {} categories, {} documents ({} uncategorized)",
        summary.categories, summary.documents, summary.uncategorized
    );
    Ok(summary)
}
