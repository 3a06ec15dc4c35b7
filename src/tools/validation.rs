use rmcp::ErrorData as McpError;
use serde_json::Value;
use uuid::Uuid;

pub fn parse_id(field: &'static str, raw: &str) -> Result<Uuid, McpError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(McpError::invalid_params(format!("{field} must not be empty"), None));
    }
    Uuid::parse_str(trimmed).map_err(|err| {
        McpError::invalid_params(
            format!("{field} is not a valid id"),
            Some(Value::String(err.to_string())),
        )
    })
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), McpError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(McpError::invalid_params(
            "latitude must be between -90 and 90",
            Some(Value::String(latitude.to_string())),
        ));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(McpError::invalid_params(
            "longitude must be between -180 and 180",
            Some(Value::String(longitude.to_string())),
        ));
    }
    Ok(())
}
