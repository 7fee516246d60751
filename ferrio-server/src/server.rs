use crate::config::Config;
use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use ferrio_core::{BlobStorage, FerrioError, MemoryBackend, ObjectName, Result};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub struct ServerState {
    pub storage: BlobStorage,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct StoreResponse {
    name: String,
    checksum: String,
}

#[derive(Debug, Serialize)]
struct FetchLinkResponse {
    name: String,
    url: String,
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
    name: String,
    existed: bool,
}

#[derive(Debug, Serialize)]
struct ExistsResponse {
    name: String,
    exists: bool,
}

pub async fn run_server(config: Config) -> Result<()> {
    // The memory backend keeps local deployments self-contained; a hosted
    // backend plugs in through the same BlobBackend contract.
    let backend = Arc::new(MemoryBackend::new(
        config.storage.container.clone(),
        config.storage.connection_string.clone().into_bytes(),
    ));
    let storage = BlobStorage::connect(backend, &config.storage).await?;

    let app = router(Arc::new(ServerState { storage }));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!("Server listening on {}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/blobs/*name",
            get(fetch_link).put(store_blob).delete(delete_blob),
        )
        .route("/exists/*name", get(blob_exists))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness surface backed by the storage health monitor. Suspends until
/// the first poll has completed; non-blocking on every later call.
async fn health(State(state): State<Arc<ServerState>>) -> Response {
    if state.storage.health().healthy().await {
        (
            StatusCode::OK,
            axum::Json(serde_json::json!({
                "container": state.storage.container(),
                "healthy": true,
            })),
        )
            .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            axum::Json(serde_json::json!({
                "container": state.storage.container(),
                "healthy": false,
            })),
        )
            .into_response()
    }
}

async fn store_blob(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let result = async {
        let name = ObjectName::new(name)?;
        let checksum = state.storage.store(&mut body.as_ref(), &name).await?;
        Ok(StoreResponse {
            name: name.to_string(),
            checksum,
        })
    }
    .await;

    respond(StatusCode::CREATED, result)
}

async fn fetch_link(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Response {
    let result = async {
        let name = ObjectName::new(name)?;
        let url = state.storage.get(&name).await?;
        Ok(FetchLinkResponse {
            name: name.to_string(),
            url,
        })
    }
    .await;

    respond(StatusCode::OK, result)
}

async fn delete_blob(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Response {
    let result = async {
        let name = ObjectName::new(name)?;
        let existed = state.storage.delete(&name).await?;
        Ok(DeleteResponse {
            name: name.to_string(),
            existed,
        })
    }
    .await;

    respond(StatusCode::OK, result)
}

async fn blob_exists(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Response {
    let result = async {
        let name = ObjectName::new(name)?;
        let exists = state.storage.exists(&name).await?;
        Ok(ExistsResponse {
            name: name.to_string(),
            exists,
        })
    }
    .await;

    respond(StatusCode::OK, result)
}

fn respond<T: Serialize>(success_status: StatusCode, result: Result<T>) -> Response {
    match result {
        Ok(data) => (
            success_status,
            axum::Json(ApiResponse {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response(),
        Err(error) => {
            let status = match &error {
                FerrioError::InvalidReference(_) => StatusCode::BAD_REQUEST,
                FerrioError::NotFound(_) => StatusCode::NOT_FOUND,
                FerrioError::Backend { .. } => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                axum::Json(ApiResponse::<T> {
                    success: false,
                    data: None,
                    error: Some(error.to_string()),
                }),
            )
                .into_response()
        }
    }
}
