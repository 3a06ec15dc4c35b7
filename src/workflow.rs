use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AlbumError, Result};
use crate::flickr::PhotoSearch;
use crate::image_cache::{ImageCache, ResolvedImage};
use crate::model::{AlbumPhoto, Pin};
use crate::store::AlbumStore;

/// Where a pin's album stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlbumState {
    Empty,
    Loading,
    Populated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlbumStatus {
    /// The album already had stubs; no search was issued.
    Cached,
    /// A search ran and its results were stored.
    Fetched,
    /// The search matched nothing. Not an error.
    NoPhotosAvailable,
}

#[derive(Debug, Clone, Serialize)]
pub struct Album {
    pub pin: Pin,
    pub status: AlbumStatus,
    pub photos: Vec<AlbumPhoto>,
    /// Page the next refresh will request.
    pub next_page: i64,
}

/// Pin → album → photo synchronisation.
///
/// Calls touching one pin's album run one at a time; different pins proceed
/// independently. Photo resolution is not part of that queue so downloads for
/// the same pin can overlap.
pub struct AlbumWorkflow {
    store: Arc<AlbumStore>,
    client: Arc<dyn PhotoSearch>,
    images: ImageCache,
    queues: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    states: Mutex<HashMap<Uuid, AlbumState>>,
}

impl std::fmt::Debug for AlbumWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlbumWorkflow")
            .field("store", &self.store)
            .field("images", &self.images)
            .finish_non_exhaustive()
    }
}

impl AlbumWorkflow {
    pub fn new(store: Arc<AlbumStore>, client: Arc<dyn PhotoSearch>) -> Self {
        let images = ImageCache::new(store.clone(), client.clone());
        Self {
            store,
            client,
            images,
            queues: Mutex::new(HashMap::new()),
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<AlbumStore> {
        &self.store
    }

    async fn queue(&self, pin_id: Uuid) -> Arc<Mutex<()>> {
        self.queues.lock().await.entry(pin_id).or_default().clone()
    }

    /// Forgets the queue and state of a pin the store does not know.
    async fn settle<T>(&self, pin_id: Uuid, result: Result<T>) -> Result<T> {
        if matches!(&result, Err(AlbumError::PinNotFound(id)) if *id == pin_id) {
            self.queues.lock().await.remove(&pin_id);
            self.states.lock().await.remove(&pin_id);
        }
        result
    }

    async fn set_state(&self, pin_id: Uuid, state: AlbumState) {
        self.states.lock().await.insert(pin_id, state);
    }

    pub async fn album_state(&self, pin_id: Uuid) -> AlbumState {
        self.states
            .lock()
            .await
            .get(&pin_id)
            .copied()
            .unwrap_or(AlbumState::Empty)
    }

    pub async fn create_pin(&self, latitude: f64, longitude: f64) -> Result<Pin> {
        let pin = self.store.create_pin(latitude, longitude).await?;
        self.set_state(pin.id, AlbumState::Empty).await;
        Ok(pin)
    }

    pub async fn list_pins(&self) -> Result<Vec<Pin>> {
        self.store.list_pins().await
    }

    pub async fn delete_pin(&self, pin_id: Uuid) -> Result<()> {
        let queue = self.queue(pin_id).await;
        let _turn = queue.lock().await;
        let result = self.store.delete_pin(pin_id).await;
        if result.is_ok() {
            self.states.lock().await.remove(&pin_id);
            self.queues.lock().await.remove(&pin_id);
        }
        self.settle(pin_id, result).await
    }

    /// Returns the pin's album, searching for photos when it has none.
    pub async fn ensure_album(&self, pin_id: Uuid) -> Result<Album> {
        let queue = self.queue(pin_id).await;
        let _turn = queue.lock().await;
        let result = self.ensure_album_locked(pin_id).await;
        self.settle(pin_id, result).await
    }

    /// Discards the current album and fetches the stored next page.
    pub async fn refresh(&self, pin_id: Uuid) -> Result<Album> {
        let queue = self.queue(pin_id).await;
        let _turn = queue.lock().await;
        let result = match self.store.clear_all(pin_id).await {
            Ok(()) => {
                self.set_state(pin_id, AlbumState::Empty).await;
                info!(pin = %pin_id, "refreshing album");
                self.ensure_album_locked(pin_id).await
            }
            Err(err) => Err(err),
        };
        self.settle(pin_id, result).await
    }

    pub async fn delete_photo(&self, pin_id: Uuid, photo_id: Uuid) -> Result<()> {
        let queue = self.queue(pin_id).await;
        let _turn = queue.lock().await;
        let result = match self.store.get_photo(pin_id, photo_id).await {
            Ok(photo) => self.store.delete_one(&photo).await,
            Err(err) => Err(err),
        };
        self.settle(pin_id, result).await
    }

    pub async fn resolve(&self, pin_id: Uuid, photo_id: Uuid) -> Result<ResolvedImage> {
        let photo = self.store.get_photo(pin_id, photo_id).await?;
        self.images.resolve(&photo).await
    }

    async fn ensure_album_locked(&self, pin_id: Uuid) -> Result<Album> {
        let pin = self.store.get_pin(pin_id).await?;
        let photos = self.store.list(pin_id).await?;
        let next_page = self.store.next_page(pin_id).await?;
        if !photos.is_empty() {
            self.set_state(pin_id, AlbumState::Populated).await;
            return Ok(Album {
                pin,
                status: AlbumStatus::Cached,
                photos,
                next_page,
            });
        }

        let previous = self.album_state(pin_id).await;
        self.set_state(pin_id, AlbumState::Loading).await;
        match self.fetch(&pin, next_page).await {
            Ok(album) => {
                self.set_state(pin_id, AlbumState::Populated).await;
                Ok(album)
            }
            Err(err) => {
                self.set_state(pin_id, previous).await;
                Err(err)
            }
        }
    }

    async fn fetch(&self, pin: &Pin, page: i64) -> Result<Album> {
        let result = self
            .client
            .search(pin.latitude, pin.longitude, page)
            .await?;
        if result.is_empty_result() {
            info!(pin = %pin.id, page, "no photos available for pin");
            return Ok(Album {
                pin: pin.clone(),
                status: AlbumStatus::NoPhotosAvailable,
                photos: Vec::new(),
                next_page: page,
            });
        }

        // The random page only feeds the next refresh; this call keeps the
        // page it asked for.
        let next_page = rand::rng().random_range(1..=result.pages);
        let photos = self
            .store
            .create_stubs_with_next_page(pin.id, &result.image_urls(), Some(next_page))
            .await?;
        debug!(
            pin = %pin.id,
            page,
            next_page,
            stored = photos.len(),
            "stored album page"
        );
        Ok(Album {
            pin: pin.clone(),
            status: AlbumStatus::Fetched,
            photos,
            next_page,
        })
    }
}
