use crate::config::Config;
use crate::omdb::{OmdbApi, OmdbClient};
use crate::runtime::{spawn_session, SessionHandle};
use crate::session::{Command, CommandError, Session, SessionView};
use crate::watched::WatchedStore;
use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const MAX_BODY_BYTES: usize = 16 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
}

impl AppState {
    /// Opens the watch list and starts the session task.
    pub fn start(api: Arc<dyn OmdbApi>, watched: WatchedStore) -> Self {
        let (session, _task) = spawn_session(Session::new(watched), api);
        Self { session }
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let omdb: Arc<dyn OmdbApi> = Arc::new(OmdbClient::from_config(&config)?);
    let watched = WatchedStore::open(&config.watched_path);
    info!("Using watch list at {:?}", watched.path());

    let app = build_router(AppState::start(omdb, watched));

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/state", get(current_state))
        .route("/query", put(set_query))
        .route("/query/clear", post(clear_query))
        .route("/page/next", post(next_page))
        .route("/page/previous", post(previous_page))
        .route("/select/:id", post(select_movie))
        .route("/close", post(close_movie))
        .route("/rating", post(rate_movie))
        .route("/watched", post(add_watched))
        .route("/watched/:id", delete(delete_watched))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    query: String,
}

#[derive(Debug, Deserialize)]
struct RatingBody {
    /// Wider than a star count so oversized values reach the range check.
    rating: u16,
}

async fn current_state(State(state): State<AppState>) -> Response {
    match state.session.snapshot().await {
        Ok(view) => Json(view).into_response(),
        Err(e) => session_unavailable(e),
    }
}

async fn set_query(State(state): State<AppState>, Json(body): Json<QueryBody>) -> Response {
    dispatch(&state, Command::SetQuery(body.query)).await
}

async fn clear_query(State(state): State<AppState>) -> Response {
    dispatch(&state, Command::ClearQuery).await
}

async fn next_page(State(state): State<AppState>) -> Response {
    dispatch(&state, Command::NextPage).await
}

async fn previous_page(State(state): State<AppState>) -> Response {
    dispatch(&state, Command::PreviousPage).await
}

async fn select_movie(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    dispatch(&state, Command::Select(id)).await
}

async fn close_movie(State(state): State<AppState>) -> Response {
    dispatch(&state, Command::Close).await
}

async fn rate_movie(State(state): State<AppState>, Json(body): Json<RatingBody>) -> Response {
    match u8::try_from(body.rating) {
        Ok(rating) => dispatch(&state, Command::Rate(rating)).await,
        Err(_) => command_rejected(CommandError::RatingOutOfRange(body.rating)),
    }
}

async fn add_watched(State(state): State<AppState>) -> Response {
    dispatch(&state, Command::AddWatched).await
}

async fn delete_watched(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    dispatch(&state, Command::DeleteWatched(id)).await
}

async fn dispatch(state: &AppState, command: Command) -> Response {
    match state.session.send(command).await {
        Ok(Ok(view)) => view_response(view),
        Ok(Err(e)) => command_rejected(e),
        Err(e) => session_unavailable(e),
    }
}

fn view_response(view: SessionView) -> Response {
    (StatusCode::OK, Json(view)).into_response()
}

fn command_rejected(err: CommandError) -> Response {
    let status = match err {
        CommandError::RatingOutOfRange(_) => StatusCode::BAD_REQUEST,
        CommandError::NoSelection
        | CommandError::DetailNotLoaded
        | CommandError::AlreadyWatched
        | CommandError::NotRated => StatusCode::CONFLICT,
    };
    warn!("Rejected command: {}", err);
    (
        status,
        Json(json!({"status": "error", "message": err.to_string()})),
    )
        .into_response()
}

fn session_unavailable(err: anyhow::Error) -> Response {
    error!("Session unavailable: {:#}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"status": "error", "message": "session unavailable"})),
    )
        .into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
