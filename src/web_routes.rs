use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AlbumError;
use crate::workflow::AlbumWorkflow;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

fn json_error(status: StatusCode, err: &AlbumError) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            message: err.user_message().to_string(),
        }),
    )
        .into_response()
}

fn status_for(err: &AlbumError) -> StatusCode {
    match err {
        AlbumError::PinNotFound(_) | AlbumError::PhotoNotFound(_) => StatusCode::NOT_FOUND,
        AlbumError::InvalidCoordinates { .. } => StatusCode::BAD_REQUEST,
        AlbumError::Download { .. } => StatusCode::BAD_GATEWAY,
        err if err.is_network() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn list_pins(State(workflow): State<Arc<AlbumWorkflow>>) -> Response {
    match workflow.list_pins().await {
        Ok(pins) => (StatusCode::OK, Json(pins)).into_response(),
        Err(err) => json_error(status_for(&err), &err),
    }
}

/// Serves a photo's image, downloading it first when it is not cached yet.
pub async fn photo_image(
    State(workflow): State<Arc<AlbumWorkflow>>,
    Path((pin_id, photo_id)): Path<(Uuid, Uuid)>,
) -> Response {
    match workflow.resolve(pin_id, photo_id).await {
        Ok(resolved) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, resolved.mime_type)],
            resolved.bytes,
        )
            .into_response(),
        Err(err) => json_error(status_for(&err), &err),
    }
}
