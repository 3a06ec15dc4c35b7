//! File-backed album repository.
//!
//! Layout under the storage root:
//!
//! ```text
//! pins/<pin>/pin.json            the pin
//! pins/<pin>/album.json          ordered stubs plus the next refresh page
//! pins/<pin>/images/<photo>.ext  cached image bytes
//! ```
//!
//! The album manifest is rewritten whole on every mutation, which makes
//! `create_stubs` all-or-nothing. Mutations for one pin are serialised by a
//! per-pin lock so concurrent downloads cannot drop each other's updates.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{LocalFileStorage, StorageError, compute_hash, get_extension_from_mime_type};
use crate::error::{AlbumError, Result};
use crate::image_processing;
use crate::model::{self, AlbumPhoto, CachedImage, Pin};

const PINS_DIR: &str = "pins";

#[derive(Debug, Default, Serialize, Deserialize)]
struct AlbumManifest {
    #[serde(default)]
    next_page: i64,
    #[serde(default)]
    photos: Vec<AlbumPhoto>,
}

#[derive(Debug, Default)]
struct PinLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl PinLocks {
    async fn acquire(&self, pin_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(pin_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    async fn forget(&self, pin_id: Uuid) {
        self.locks.lock().await.remove(&pin_id);
    }
}

#[derive(Debug)]
pub struct AlbumStore {
    storage: LocalFileStorage,
    locks: PinLocks,
}

impl AlbumStore {
    pub fn new(storage: LocalFileStorage) -> Self {
        Self {
            storage,
            locks: PinLocks::default(),
        }
    }

    pub fn storage(&self) -> &LocalFileStorage {
        &self.storage
    }

    fn pin_prefix(pin_id: Uuid) -> String {
        format!("{PINS_DIR}/{pin_id}")
    }

    fn pin_key(pin_id: Uuid) -> String {
        format!("{}/pin.json", Self::pin_prefix(pin_id))
    }

    fn album_key(pin_id: Uuid) -> String {
        format!("{}/album.json", Self::pin_prefix(pin_id))
    }

    fn images_prefix(pin_id: Uuid) -> String {
        format!("{}/images", Self::pin_prefix(pin_id))
    }

    fn image_key(pin_id: Uuid, photo_id: Uuid, ext: &str) -> String {
        format!("{}/{photo_id}.{ext}", Self::images_prefix(pin_id))
    }

    /// Locks the pin after checking it exists. A lock taken for an unknown
    /// pin is dropped again so the lock table only tracks stored pins.
    async fn lock_pin(&self, pin_id: Uuid) -> Result<OwnedMutexGuard<()>> {
        let guard = self.locks.acquire(pin_id).await;
        match self.get_pin(pin_id).await {
            Ok(_) => Ok(guard),
            Err(err) => {
                drop(guard);
                if err.is_not_found() {
                    self.locks.forget(pin_id).await;
                }
                Err(err)
            }
        }
    }

    async fn read_manifest(&self, pin_id: Uuid) -> Result<AlbumManifest> {
        Ok(self
            .storage
            .get_json::<AlbumManifest>(&Self::album_key(pin_id))
            .await?
            .unwrap_or_default())
    }

    async fn write_manifest(&self, pin_id: Uuid, manifest: &AlbumManifest) -> Result<()> {
        self.storage
            .put_json(&Self::album_key(pin_id), manifest)
            .await?;
        Ok(())
    }

    pub async fn create_pin(&self, latitude: f64, longitude: f64) -> Result<Pin> {
        if !model::coordinates_in_range(latitude, longitude) {
            return Err(AlbumError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }
        let pin = Pin {
            id: Uuid::new_v4(),
            latitude,
            longitude,
            created_at: Utc::now().to_rfc3339(),
        };
        let guard = self.locks.acquire(pin.id).await;
        let written = async {
            self.write_manifest(pin.id, &AlbumManifest::default()).await?;
            self.storage.put_json(&Self::pin_key(pin.id), &pin).await?;
            Ok::<_, AlbumError>(())
        }
        .await;
        drop(guard);
        if let Err(err) = written {
            self.locks.forget(pin.id).await;
            return Err(err);
        }
        info!(pin = %pin.id, latitude, longitude, "created pin");
        Ok(pin)
    }

    pub async fn get_pin(&self, pin_id: Uuid) -> Result<Pin> {
        self.storage
            .get_json::<Pin>(&Self::pin_key(pin_id))
            .await?
            .ok_or(AlbumError::PinNotFound(pin_id))
    }

    /// All pins, oldest first.
    pub async fn list_pins(&self) -> Result<Vec<Pin>> {
        let mut pins = Vec::new();
        for name in self.storage.list_children(PINS_DIR).await? {
            let Ok(pin_id) = Uuid::parse_str(&name) else {
                continue;
            };
            match self.storage.get_json::<Pin>(&Self::pin_key(pin_id)).await {
                Ok(Some(pin)) => pins.push(pin),
                Ok(None) => debug!(pin = %pin_id, "skipping pin directory without pin record"),
                Err(err @ StorageError::Corrupt { .. }) => {
                    warn!(pin = %pin_id, error = %err, "skipping unreadable pin record");
                }
                Err(err) => return Err(err.into()),
            }
        }
        pins.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pins)
    }

    /// Deletes the pin together with its album and cached images.
    pub async fn delete_pin(&self, pin_id: Uuid) -> Result<()> {
        {
            let _guard = self.lock_pin(pin_id).await?;
            // Without pin.json the album is unreachable.
            self.storage.delete(&Self::pin_key(pin_id)).await?;
            self.storage.delete_prefix(&Self::pin_prefix(pin_id)).await?;
        }
        self.locks.forget(pin_id).await;
        info!(pin = %pin_id, "deleted pin and its album");
        Ok(())
    }

    /// Stubs owned by the pin, in insertion order.
    pub async fn list(&self, pin_id: Uuid) -> Result<Vec<AlbumPhoto>> {
        self.get_pin(pin_id).await?;
        Ok(self.read_manifest(pin_id).await?.photos)
    }

    pub async fn get_photo(&self, pin_id: Uuid, photo_id: Uuid) -> Result<AlbumPhoto> {
        self.list(pin_id)
            .await?
            .into_iter()
            .find(|photo| photo.id == photo_id)
            .ok_or(AlbumError::PhotoNotFound(photo_id))
    }

    /// Persists one stub per URL with a single manifest write.
    pub async fn create_stubs(&self, pin_id: Uuid, urls: &[String]) -> Result<Vec<AlbumPhoto>> {
        self.create_stubs_with_next_page(pin_id, urls, None).await
    }

    /// [`create_stubs`](Self::create_stubs), also recording the page the next
    /// refresh should request in the same write.
    pub async fn create_stubs_with_next_page(
        &self,
        pin_id: Uuid,
        urls: &[String],
        next_page: Option<i64>,
    ) -> Result<Vec<AlbumPhoto>> {
        let _guard = self.lock_pin(pin_id).await?;
        let mut manifest = self.read_manifest(pin_id).await?;
        let created_at = Utc::now().to_rfc3339();
        let stubs: Vec<AlbumPhoto> = urls
            .iter()
            .map(|url| AlbumPhoto {
                id: Uuid::new_v4(),
                pin_id,
                image_url: url.clone(),
                created_at: created_at.clone(),
                image: None,
            })
            .collect();
        manifest.photos.extend(stubs.iter().cloned());
        if let Some(page) = next_page {
            manifest.next_page = page;
        }
        self.write_manifest(pin_id, &manifest).await?;
        debug!(pin = %pin_id, count = stubs.len(), "created photo stubs");
        Ok(stubs)
    }

    /// Stores image bytes for a stub. Attaching identical bytes again leaves
    /// the stub unchanged.
    pub async fn attach_bytes(&self, photo: &AlbumPhoto, bytes: &[u8]) -> Result<AlbumPhoto> {
        let pin_id = photo.pin_id;
        let _guard = self.lock_pin(pin_id).await?;
        let mut manifest = self.read_manifest(pin_id).await?;
        let Some(index) = manifest.photos.iter().position(|p| p.id == photo.id) else {
            return Err(AlbumError::PhotoNotFound(photo.id));
        };

        let digest = compute_hash(bytes);
        if let Some(existing) = &manifest.photos[index].image {
            if existing.digest == digest && self.storage.exists(&existing.key).await? {
                return Ok(manifest.photos[index].clone());
            }
        }

        let mime_type = image_processing::detect_mime_type(bytes)
            .unwrap_or("application/octet-stream")
            .to_string();
        let key = Self::image_key(
            pin_id,
            photo.id,
            get_extension_from_mime_type(&mime_type),
        );
        self.storage.put(&key, bytes).await?;
        let previous = manifest.photos[index].image.replace(CachedImage {
            key: key.clone(),
            mime_type,
            digest,
            size: bytes.len(),
        });
        if let Err(err) = self.write_manifest(pin_id, &manifest).await {
            if previous.as_ref().map(|image| image.key.as_str()) != Some(key.as_str()) {
                if let Err(cleanup) = self.storage.delete(&key).await {
                    warn!(key = %key, error = %cleanup, "failed to remove orphaned image");
                }
            }
            return Err(err);
        }
        if let Some(previous) = previous {
            if previous.key != key {
                if let Err(err) = self.storage.delete(&previous.key).await {
                    warn!(key = %previous.key, error = %err, "failed to remove replaced image");
                }
            }
        }
        debug!(pin = %pin_id, photo = %photo.id, size = bytes.len(), "cached photo bytes");
        Ok(manifest.photos[index].clone())
    }

    /// Cached bytes for the stub, if any are on disk.
    pub async fn read_bytes(&self, photo: &AlbumPhoto) -> Result<Option<Vec<u8>>> {
        match &photo.image {
            Some(image) => Ok(self.storage.get(&image.key).await?),
            None => Ok(None),
        }
    }

    pub async fn delete_one(&self, photo: &AlbumPhoto) -> Result<()> {
        let pin_id = photo.pin_id;
        let _guard = self.lock_pin(pin_id).await?;
        let mut manifest = self.read_manifest(pin_id).await?;
        let Some(index) = manifest.photos.iter().position(|p| p.id == photo.id) else {
            return Err(AlbumError::PhotoNotFound(photo.id));
        };
        let removed = manifest.photos.remove(index);
        self.write_manifest(pin_id, &manifest).await?;
        if let Some(image) = removed.image {
            if let Err(err) = self.storage.delete(&image.key).await {
                warn!(key = %image.key, error = %err, "failed to remove cached image");
            }
        }
        debug!(pin = %pin_id, photo = %photo.id, "deleted photo");
        Ok(())
    }

    /// Removes every stub of the pin; the stored next page is kept.
    pub async fn clear_all(&self, pin_id: Uuid) -> Result<()> {
        let _guard = self.lock_pin(pin_id).await?;
        let mut manifest = self.read_manifest(pin_id).await?;
        let removed = manifest.photos.len();
        manifest.photos.clear();
        self.write_manifest(pin_id, &manifest).await?;
        if let Err(err) = self.storage.delete_prefix(&Self::images_prefix(pin_id)).await {
            warn!(pin = %pin_id, error = %err, "failed to remove cached images");
        }
        debug!(pin = %pin_id, removed, "cleared album");
        Ok(())
    }

    pub async fn next_page(&self, pin_id: Uuid) -> Result<i64> {
        Ok(self.read_manifest(pin_id).await?.next_page)
    }

    pub async fn set_next_page(&self, pin_id: Uuid, page: i64) -> Result<()> {
        let _guard = self.lock_pin(pin_id).await?;
        let mut manifest = self.read_manifest(pin_id).await?;
        manifest.next_page = page;
        self.write_manifest(pin_id, &manifest).await
    }
}
