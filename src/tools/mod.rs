pub mod album;
pub mod pins;
pub mod resolve_photos;
pub mod validation;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::AlbumError;

pub use album::{DeletePhotoRequest, PinRequest, delete_photo, new_collection, open_album};
pub use pins::{AddPinRequest, RemovePinRequest, add_pin, list_pins, remove_pin};
pub use resolve_photos::{ResolvePhotosRequest, resolve_photos};
pub use validation::{parse_id, validate_coordinates};

pub(crate) fn album_error(context: &'static str, err: AlbumError) -> McpError {
    let data = Some(serde_json::json!({
        "error": err.to_string(),
        "message": err.user_message(),
    }));
    if err.is_invalid_input() {
        McpError::invalid_params(context, data)
    } else {
        McpError::internal_error(context, data)
    }
}

pub(crate) fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string(value).map_err(|err| {
        McpError::internal_error(
            "serialize tool response failed",
            Some(serde_json::Value::String(err.to_string())),
        )
    })?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
