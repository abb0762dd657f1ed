//! Defines the Axum API routes and handlers.

use crate::reporter::wire::WireFormat;
use crate::web::board_channel::BoardRequest;
use crate::web::models::{BoardStatusResponse, SnapshotQuery};
use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::sync::mpsc::Sender;

pub type AppState = Sender<BoardRequest>;

/// Creates the Axum router with all the API endpoints.
pub fn create_router(board_tx: AppState) -> Router {
    Router::new()
        .route("/update", get(get_update))
        .route("/api/v1/snapshot", get(get_snapshot))
        .route("/api/v1/status", get(get_status))
        .with_state(board_tx)
}

/// Handler for the lab client's poll: the full grid as JSON.
async fn get_update(State(board_tx): State<AppState>) -> Result<Response, StatusCode> {
    query_snapshot(&board_tx, WireFormat::Json).await
}

/// Handler for the full grid in any wire format (`?format=binary|json|lines`).
async fn get_snapshot(
    State(board_tx): State<AppState>,
    Query(params): Query<SnapshotQuery>,
) -> Result<Response, StatusCode> {
    query_snapshot(&board_tx, params.format.unwrap_or(WireFormat::Json)).await
}

async fn query_snapshot(board_tx: &AppState, format: WireFormat) -> Result<Response, StatusCode> {
    let (resp_tx, resp_rx) = tokio::sync::oneshot::channel();
    if board_tx
        .send(BoardRequest::Query {
            format,
            respond_to: resp_tx,
        })
        .await
        .is_err()
    {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    match resp_rx.await {
        Ok(Ok(body)) => Ok(([(header::CONTENT_TYPE, format.content_type())], body).into_response()),
        Ok(Err(e)) => {
            tracing::error!("Snapshot query failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// Handler to get the current status of the board.
async fn get_status(
    State(board_tx): State<AppState>,
) -> Result<Json<BoardStatusResponse>, StatusCode> {
    let (resp_tx, resp_rx) = tokio::sync::oneshot::channel();
    if board_tx.send(BoardRequest::Status { respond_to: resp_tx }).await.is_err() {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    match resp_rx.await {
        Ok(status) => Ok(Json(status)),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
