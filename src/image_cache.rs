use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AlbumError, Result};
use crate::flickr::PhotoSearch;
use crate::image_processing;
use crate::model::AlbumPhoto;
use crate::store::AlbumStore;

/// Image bytes resolved for a stub, with what could be learned about them.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedImage {
    pub photo: AlbumPhoto,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Whether the bytes came from the local cache rather than the network.
    pub cache_hit: bool,
}

/// Lazy, on-demand download of stub bytes.
pub struct ImageCache {
    store: Arc<AlbumStore>,
    client: Arc<dyn PhotoSearch>,
    in_flight: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl ImageCache {
    pub fn new(store: Arc<AlbumStore>, client: Arc<dyn PhotoSearch>) -> Self {
        Self {
            store,
            client,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the stub's bytes, downloading and persisting them on a miss.
    ///
    /// Overlapping calls for the same stub share one download. A failed
    /// download leaves the stub without bytes; nothing retries it until the
    /// next call.
    pub async fn resolve(&self, photo: &AlbumPhoto) -> Result<ResolvedImage> {
        if let Some(resolved) = self.cached(photo).await? {
            return Ok(resolved);
        }

        let flight = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight.entry(photo.id).or_default().clone()
        };
        let result = {
            let _guard = flight.lock().await;
            self.resolve_locked(photo).await
        };
        {
            let mut in_flight = self.in_flight.lock().await;
            if Arc::strong_count(&flight) <= 2 {
                in_flight.remove(&photo.id);
            }
        }
        result
    }

    async fn resolve_locked(&self, photo: &AlbumPhoto) -> Result<ResolvedImage> {
        // Another caller may have finished the download while we waited.
        let current = self.store.get_photo(photo.pin_id, photo.id).await?;
        if let Some(resolved) = self.cached(&current).await? {
            return Ok(resolved);
        }

        let bytes = match self.client.download(&current.image_url).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(photo = %photo.id, url = %current.image_url, error = %err, "photo download failed");
                return Err(AlbumError::Download {
                    photo_id: photo.id,
                    source: Box::new(err),
                });
            }
        };
        let updated = self.store.attach_bytes(&current, &bytes).await?;
        debug!(photo = %photo.id, size = bytes.len(), "resolved photo from network");
        Ok(self.describe(updated, bytes, false).await)
    }

    async fn cached(&self, photo: &AlbumPhoto) -> Result<Option<ResolvedImage>> {
        if !photo.has_bytes() {
            return Ok(None);
        }
        match self.store.read_bytes(photo).await? {
            Some(bytes) => Ok(Some(self.describe(photo.clone(), bytes, true).await)),
            None => {
                warn!(photo = %photo.id, "cached image missing on disk, downloading again");
                Ok(None)
            }
        }
    }

    async fn describe(&self, photo: AlbumPhoto, bytes: Vec<u8>, cache_hit: bool) -> ResolvedImage {
        let mime_type = photo
            .image
            .as_ref()
            .map(|image| image.mime_type.clone())
            .or_else(|| image_processing::detect_mime_type(&bytes).map(str::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let dimensions =
            image_processing::dimensions_blocking(bytes.clone(), mime_type.clone()).await;
        ResolvedImage {
            photo,
            bytes,
            mime_type,
            width: dimensions.map(|(width, _)| width),
            height: dimensions.map(|(_, height)| height),
            cache_hit,
        }
    }
}
