//! Hospital bulk import endpoints

use axum::{
    body::Bytes,
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::{Sink, SinkExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::api::state::AppState;
use crate::api::types::{ApiError, BatchAccepted, BatchListResponse, BulkUploadParams};
use crate::domain::batch::{BatchProgress, ProgressEvent};
use crate::domain::hospital::parse_upload;
use crate::infrastructure::services::{BatchSubscription, ResumeOutcome};

const UPLOAD_FIELD: &str = "file";

/// Routes under `/hospitals`
pub fn create_hospitals_router() -> Router<AppState> {
    Router::new()
        .route("/bulk", post(bulk_create_hospitals))
        .route("/batches", get(list_batches))
        .route("/batch/{batch_id}/status", get(batch_status))
        .route("/batch/{batch_id}/resume", post(resume_batch))
        .route("/batch/{batch_id}/ws", get(batch_progress_ws))
}

/// POST /hospitals/bulk - Upload a CSV of hospitals
pub async fn bulk_create_hospitals(
    State(state): State<AppState>,
    Query(params): Query<BulkUploadParams>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let (filename, content) = read_upload(multipart).await?;
    let rows = parse_upload(filename.as_deref(), &content, state.max_hospitals)?;

    info!(
        filename = filename.as_deref().unwrap_or_default(),
        rows = rows.len(),
        wait = params.wait,
        "Accepted hospital upload"
    );

    if params.wait {
        let batch = state.batch_service.run_batch(rows).await?;
        return Ok((StatusCode::OK, Json(batch)).into_response());
    }

    let batch = state.batch_service.start_batch(rows).await?;
    Ok((StatusCode::ACCEPTED, Json(BatchAccepted::from(&batch))).into_response())
}

/// GET /hospitals/batches - List known batches
pub async fn list_batches(
    State(state): State<AppState>,
) -> Result<Json<BatchListResponse>, ApiError> {
    let batches = state.batch_service.list().await?;
    Ok(Json(BatchListResponse::from_batches(&batches)))
}

/// GET /hospitals/batch/{batch_id}/status - Current batch progress
pub async fn batch_status(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<BatchProgress>, ApiError> {
    state
        .batch_service
        .get_status(&batch_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Batch '{}' not found", batch_id)))
}

/// POST /hospitals/batch/{batch_id}/resume - Retry failed rows
pub async fn resume_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Response, ApiError> {
    let outcome = state.batch_service.resume_batch(&batch_id).await?;

    let status = match outcome {
        ResumeOutcome::Scheduled { .. } => StatusCode::ACCEPTED,
        ResumeOutcome::NothingToRetry { .. } => StatusCode::OK,
    };

    Ok((status, Json(outcome)).into_response())
}

/// GET /hospitals/batch/{batch_id}/ws - Stream progress events
pub async fn batch_progress_ws(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    // An unknown batch is a 404 whether or not the request is an upgrade
    let subscription = state
        .batch_service
        .subscribe(&batch_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Batch '{}' not found", batch_id)))?;

    match ws {
        Ok(ws) => Ok(ws.on_upgrade(move |socket| stream_progress(socket, subscription))),
        Err(rejection) => Ok(rejection.into_response()),
    }
}

async fn stream_progress(mut socket: WebSocket, subscription: BatchSubscription) {
    let batch_id = subscription.snapshot.batch_id().clone();

    if let Err(e) = forward_events(&mut socket, subscription).await {
        debug!(batch_id = %batch_id, error = %e, "Progress subscriber went away");
        return;
    }

    let _ = socket.send(Message::Close(None)).await;
}

/// Send the snapshot, then every event up to and including `completed`
async fn forward_events<S>(sink: &mut S, subscription: BatchSubscription) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
{
    let BatchSubscription {
        snapshot,
        mut events,
    } = subscription;

    let finished = !snapshot.is_processing();
    send_event(sink, &ProgressEvent::Snapshot(snapshot)).await?;

    if finished {
        return Ok(());
    }

    loop {
        match events.recv().await {
            Ok(event) => {
                send_event(sink, &event).await?;

                if event.is_terminal() {
                    return Ok(());
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Progress subscriber lagged behind");
            }
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}

async fn send_event<S>(sink: &mut S, event: &ProgressEvent) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
{
    match serde_json::to_string(event) {
        Ok(text) => sink.send(Message::Text(text.into())).await,
        Err(e) => {
            warn!(error = %e, "Failed to serialize progress event");
            Ok(())
        }
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<(Option<String>, Bytes), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().map(String::from);
        let content = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read uploaded file: {}", e)))?;

        return Ok((filename, content));
    }

    Err(ApiError::bad_request("No file provided").with_code("missing_file"))
}
