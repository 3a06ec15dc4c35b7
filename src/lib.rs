pub mod cache;
pub mod config;
pub mod error;
pub mod flickr;
pub mod image_cache;
pub mod image_processing;
pub mod mcp_server;
pub mod model;
pub mod store;
pub mod tools;
pub mod web_routes;
pub mod workflow;

pub use error::{AlbumError, Result};
pub use flickr::{FlickrClient, PhotoSearch};
pub use model::{AlbumPhoto, Pin, PhotoSearchPage};
pub use store::AlbumStore;
pub use workflow::{Album, AlbumState, AlbumStatus, AlbumWorkflow};
