use rmcp::{
    ErrorData as McpError, handler::server::wrapper::Parameters, model::CallToolResult,
    schemars::JsonSchema,
};
use serde::{Deserialize, Serialize};

use crate::{
    cache::LocalFileStorage,
    model::AlbumPhoto,
    tools::{album_error, json_result, parse_id},
    workflow::{Album, AlbumStatus, AlbumWorkflow},
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PinRequest {
    #[schemars(description = "Id of the pin")]
    pub pin_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeletePhotoRequest {
    #[schemars(description = "Id of the pin owning the photo")]
    pub pin_id: String,
    #[schemars(description = "Id of the photo to delete")]
    pub photo_id: String,
}

#[derive(Debug, Serialize)]
struct PhotoView {
    id: String,
    image_url: String,
    cached_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct AlbumView {
    pin_id: String,
    latitude: f64,
    longitude: f64,
    status: AlbumStatus,
    next_page: i64,
    photos: Vec<PhotoView>,
}

fn photo_view(storage: &LocalFileStorage, photo: &AlbumPhoto) -> PhotoView {
    PhotoView {
        id: photo.id.to_string(),
        image_url: photo.image_url.clone(),
        cached_url: photo
            .image
            .as_ref()
            .map(|image| storage.get_public_url(&image.key)),
    }
}

fn album_view(storage: &LocalFileStorage, album: &Album) -> AlbumView {
    AlbumView {
        pin_id: album.pin.id.to_string(),
        latitude: album.pin.latitude,
        longitude: album.pin.longitude,
        status: album.status,
        next_page: album.next_page,
        photos: album
            .photos
            .iter()
            .map(|photo| photo_view(storage, photo))
            .collect(),
    }
}

pub async fn open_album(
    workflow: &AlbumWorkflow,
    Parameters(request): Parameters<PinRequest>,
) -> Result<CallToolResult, McpError> {
    let pin_id = parse_id("pin_id", &request.pin_id)?;
    let album = workflow
        .ensure_album(pin_id)
        .await
        .map_err(|err| album_error("load album failed", err))?;
    json_result(&album_view(workflow.store().storage(), &album))
}

pub async fn new_collection(
    workflow: &AlbumWorkflow,
    Parameters(request): Parameters<PinRequest>,
) -> Result<CallToolResult, McpError> {
    let pin_id = parse_id("pin_id", &request.pin_id)?;
    let album = workflow
        .refresh(pin_id)
        .await
        .map_err(|err| album_error("load new collection failed", err))?;
    json_result(&album_view(workflow.store().storage(), &album))
}

pub async fn delete_photo(
    workflow: &AlbumWorkflow,
    Parameters(request): Parameters<DeletePhotoRequest>,
) -> Result<CallToolResult, McpError> {
    let pin_id = parse_id("pin_id", &request.pin_id)?;
    let photo_id = parse_id("photo_id", &request.photo_id)?;
    workflow
        .delete_photo(pin_id, photo_id)
        .await
        .map_err(|err| album_error("delete photo failed", err))?;
    json_result(&serde_json::json!({ "deleted": photo_id }))
}
