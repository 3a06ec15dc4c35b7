use rmcp::{
    ErrorData as McpError, handler::server::wrapper::Parameters, model::CallToolResult,
    schemars::JsonSchema,
};
use serde::Deserialize;

use crate::{
    tools::{album_error, json_result, parse_id, validate_coordinates},
    workflow::AlbumWorkflow,
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddPinRequest {
    #[schemars(description = "Latitude in degrees, -90 to 90")]
    pub latitude: f64,
    #[schemars(description = "Longitude in degrees, -180 to 180")]
    pub longitude: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemovePinRequest {
    #[schemars(description = "Id of the pin to delete together with its album")]
    pub pin_id: String,
}

pub async fn add_pin(
    workflow: &AlbumWorkflow,
    Parameters(request): Parameters<AddPinRequest>,
) -> Result<CallToolResult, McpError> {
    validate_coordinates(request.latitude, request.longitude)?;
    let pin = workflow
        .create_pin(request.latitude, request.longitude)
        .await
        .map_err(|err| album_error("save pin failed", err))?;
    json_result(&pin)
}

pub async fn list_pins(workflow: &AlbumWorkflow) -> Result<CallToolResult, McpError> {
    let pins = workflow
        .list_pins()
        .await
        .map_err(|err| album_error("list pins failed", err))?;
    json_result(&pins)
}

pub async fn remove_pin(
    workflow: &AlbumWorkflow,
    Parameters(request): Parameters<RemovePinRequest>,
) -> Result<CallToolResult, McpError> {
    let pin_id = parse_id("pin_id", &request.pin_id)?;
    workflow
        .delete_pin(pin_id)
        .await
        .map_err(|err| album_error("delete pin failed", err))?;
    json_result(&serde_json::json!({ "deleted": pin_id }))
}
