use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use tower_http::services::ServeDir;
use tracing::info;
use tracing_subscriber::EnvFilter;

use virtual_tourist_rmcp::{
    AlbumStore, AlbumWorkflow, FlickrClient, cache::LocalFileStorage, config::AppConfig,
    mcp_server::VirtualTouristServer, web_routes,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let storage = LocalFileStorage::new(config.cache_dir.clone(), config.cache_base_url.clone());
    let store = Arc::new(AlbumStore::new(storage));
    let client = Arc::new(
        FlickrClient::new(
            config.flickr_endpoint.clone(),
            config.flickr_api_key.clone(),
            config.request_timeout,
        )
        .context("failed to build http client")?,
    );
    let workflow = Arc::new(AlbumWorkflow::new(store, client));

    let workflow_for_service = workflow.clone();
    let service = StreamableHttpService::new(
        move || Ok(VirtualTouristServer::new(workflow_for_service.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let router = axum::Router::new()
        .route("/pins", get(web_routes::list_pins))
        .route(
            "/pins/{pin_id}/photos/{photo_id}",
            get(web_routes::photo_image),
        )
        .nest_service(&config.mcp_path, service)
        .nest_service("/cache", ServeDir::new(config.cache_dir.clone()))
        .with_state(workflow);
    let tcp_listener = tokio::net::TcpListener::bind(&config.bind_address).await?;

    info!(
        address = %config.bind_address,
        mcp_path = %config.mcp_path,
        cache_dir = %config.cache_dir.display(),
        "virtual tourist MCP server started"
    );

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
