use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use server_api::{contact_route, health, submit_contact, ApiContext};
use shared::{
    error::{ContactRejected, ErrorCode},
    protocol::ContactRequest,
};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, prepare_database_url};

const INTERNAL_FAILURE_BODY: &str = "Something went wrong, please try again.";

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext { storage },
    };
    let app = build_router(Arc::new(state), settings.max_body_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(contact_route(), post(contact))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Response {
    match health(&state.api).await {
        Ok(()) => "ok".into_response(),
        Err(err) => {
            error!(error = %err.message, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable").into_response()
        }
    }
}

#[tracing::instrument(
    name = "Adding a new contact",
    skip(state, request),
    fields(
        contact_email = %request.email,
        contact_name = %request.name
    )
)]
async fn contact(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ContactRequest>,
) -> Response {
    match submit_contact(&state.api, request).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(err) => match err.code {
            ErrorCode::Validation => {
                (StatusCode::BAD_REQUEST, Json(ContactRejected::from(err))).into_response()
            }
            // Plain text on purpose: clients must cope with non-JSON failures.
            ErrorCode::Internal => {
                error!(error = %err.message, "failed to store contact");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_FAILURE_BODY).into_response()
            }
        },
    }
}
