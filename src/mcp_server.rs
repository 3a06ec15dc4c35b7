use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};

use crate::tools::{
    AddPinRequest, DeletePhotoRequest, PinRequest, RemovePinRequest, ResolvePhotosRequest,
};
use crate::workflow::AlbumWorkflow;

#[derive(Clone)]
pub struct VirtualTouristServer {
    tool_router: ToolRouter<Self>,
    workflow: Arc<AlbumWorkflow>,
}

impl VirtualTouristServer {
    pub fn new(workflow: Arc<AlbumWorkflow>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            workflow,
        }
    }
}

#[tool_router]
impl VirtualTouristServer {
    #[tool(description = "Drop a pin at the given coordinates and return it")]
    async fn add_pin(
        &self,
        Parameters(request): Parameters<AddPinRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::add_pin(&self.workflow, Parameters(request)).await
    }

    #[tool(description = "List all pins, oldest first")]
    async fn list_pins(&self) -> Result<CallToolResult, McpError> {
        crate::tools::list_pins(&self.workflow).await
    }

    #[tool(description = "Delete a pin together with its photo album")]
    async fn remove_pin(
        &self,
        Parameters(request): Parameters<RemovePinRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::remove_pin(&self.workflow, Parameters(request)).await
    }

    #[tool(
        description = "Open the photo album of a pin. Searches Flickr around the pin when the album is empty; status no_photos_available means the search matched nothing"
    )]
    async fn open_album(
        &self,
        Parameters(request): Parameters<PinRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::open_album(&self.workflow, Parameters(request)).await
    }

    #[tool(description = "Discard the album of a pin and fetch a new collection")]
    async fn new_collection(
        &self,
        Parameters(request): Parameters<PinRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::new_collection(&self.workflow, Parameters(request)).await
    }

    #[tool(description = "Delete one photo from a pin's album")]
    async fn delete_photo(
        &self,
        Parameters(request): Parameters<DeletePhotoRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::delete_photo(&self.workflow, Parameters(request)).await
    }

    #[tool(
        description = "Download and cache photo images concurrently; reports each photo separately. Show images with ![](cached_url)"
    )]
    async fn resolve_photos(
        &self,
        Parameters(request): Parameters<ResolvePhotosRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::resolve_photos(&self.workflow, Parameters(request)).await
    }
}

#[tool_handler]
impl ServerHandler for VirtualTouristServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
