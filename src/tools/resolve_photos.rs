use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, handler::server::wrapper::Parameters, model::CallToolResult,
    schemars::JsonSchema,
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::{
    tools::{album_error, json_result, parse_id},
    workflow::AlbumWorkflow,
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ResolvePhotosRequest {
    #[schemars(description = "Id of the pin owning the photos")]
    pub pin_id: String,
    #[schemars(description = "Photo ids to download; all photos of the album when omitted")]
    pub photo_ids: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct ResolveOutcome {
    photo_id: String,
    ok: bool,
    cached_url: Option<String>,
    mime_type: Option<String>,
    size: Option<usize>,
    width: Option<u32>,
    height: Option<u32>,
    cache_hit: Option<bool>,
    error: Option<String>,
}

/// Resolves several photos at once. Each photo reports its own outcome so
/// one failed download does not hide the others.
pub async fn resolve_photos(
    workflow: &Arc<AlbumWorkflow>,
    Parameters(request): Parameters<ResolvePhotosRequest>,
) -> Result<CallToolResult, McpError> {
    let pin_id = parse_id("pin_id", &request.pin_id)?;
    let photo_ids: Vec<Uuid> = match request.photo_ids {
        Some(ids) => ids
            .iter()
            .map(|id| parse_id("photo_ids", id))
            .collect::<Result<_, _>>()?,
        None => workflow
            .store()
            .list(pin_id)
            .await
            .map_err(|err| album_error("list photos failed", err))?
            .into_iter()
            .map(|photo| photo.id)
            .collect(),
    };

    let total = photo_ids.len();
    let mut join_set = JoinSet::new();
    for (index, photo_id) in photo_ids.into_iter().enumerate() {
        let workflow = workflow.clone();
        join_set.spawn(async move {
            let result = workflow.resolve(pin_id, photo_id).await;
            (index, photo_id, result)
        });
    }

    let mut results: Vec<Option<ResolveOutcome>> =
        std::iter::repeat_with(|| None).take(total).collect();
    while let Some(task_result) = join_set.join_next().await {
        let (index, photo_id, result) = task_result.map_err(|err| {
            McpError::internal_error(
                "resolve photo task failed",
                Some(serde_json::Value::String(err.to_string())),
            )
        })?;
        let outcome = match result {
            Ok(resolved) => ResolveOutcome {
                photo_id: photo_id.to_string(),
                ok: true,
                cached_url: resolved
                    .photo
                    .image
                    .as_ref()
                    .map(|image| workflow.store().storage().get_public_url(&image.key)),
                mime_type: Some(resolved.mime_type),
                size: Some(resolved.bytes.len()),
                width: resolved.width,
                height: resolved.height,
                cache_hit: Some(resolved.cache_hit),
                error: None,
            },
            Err(err) => ResolveOutcome {
                photo_id: photo_id.to_string(),
                ok: false,
                cached_url: None,
                mime_type: None,
                size: None,
                width: None,
                height: None,
                cache_hit: None,
                error: Some(err.to_string()),
            },
        };
        results[index] = Some(outcome);
    }

    let responses: Vec<ResolveOutcome> = results.into_iter().flatten().collect();
    if responses.len() != total {
        return Err(McpError::internal_error(
            "resolve photo task missing result",
            None,
        ));
    }
    json_result(&responses)
}
