#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use virtual_tourist_rmcp::{
    AlbumError, AlbumStore, AlbumWorkflow, PhotoSearch, PhotoSearchPage, Result,
    cache::LocalFileStorage, model::Photo,
};

pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

/// Deterministic search client: page `n` returns URLs tagged with `n`.
#[derive(Default)]
pub struct StubSearch {
    pub pages: i64,
    pub total: i64,
    pub searches: Mutex<Vec<i64>>,
    pub downloads: AtomicUsize,
    pub failing_urls: Mutex<HashSet<String>>,
    pub search_failure: Mutex<Option<u16>>,
    pub bodies: Mutex<HashMap<String, Vec<u8>>>,
}

impl StubSearch {
    pub fn new(pages: i64, total: i64) -> Self {
        Self {
            pages,
            total,
            ..Default::default()
        }
    }

    pub fn search_count(&self) -> usize {
        self.searches.lock().unwrap().len()
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn fail_download(&self, url: &str) {
        self.failing_urls.lock().unwrap().insert(url.to_string());
    }

    /// Makes every following search answer with the given HTTP status.
    pub fn fail_search(&self, status: u16) {
        *self.search_failure.lock().unwrap() = Some(status);
    }

    pub fn recover_search(&self) {
        *self.search_failure.lock().unwrap() = None;
    }

    pub fn url(page: i64, index: i64) -> String {
        format!("https://live.staticflickr.com/65535/p{page}_{index}_s.jpg")
    }
}

pub fn photo(url: String, index: i64) -> Photo {
    Photo {
        id: index.to_string(),
        owner: "owner".into(),
        secret: "secret".into(),
        server: "65535".into(),
        farm: 66,
        title: format!("photo {index}"),
        ispublic: 1,
        isfriend: 0,
        isfamily: 0,
        url_sq: Some(url),
    }
}

#[async_trait]
impl PhotoSearch for StubSearch {
    async fn search(&self, _latitude: f64, _longitude: f64, page: i64) -> Result<PhotoSearchPage> {
        self.searches.lock().unwrap().push(page);
        if let Some(status) = *self.search_failure.lock().unwrap() {
            return Err(AlbumError::HttpStatus {
                status,
                url: "https://api.flickr.com/services/rest/".into(),
            });
        }
        let count = self.total.min(30);
        Ok(PhotoSearchPage {
            page,
            pages: self.pages,
            perpage: 30,
            total: self.total,
            photo: (0..count).map(|i| photo(Self::url(page, i), i)).collect(),
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.failing_urls.lock().unwrap().contains(url) {
            return Err(AlbumError::HttpStatus {
                status: 500,
                url: url.to_string(),
            });
        }
        let mut body = JPEG.to_vec();
        body.extend_from_slice(url.as_bytes());
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), body.clone());
        Ok(body)
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub client: Arc<StubSearch>,
    pub workflow: Arc<AlbumWorkflow>,
}

pub fn harness(client: StubSearch) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalFileStorage::new(dir.path().to_path_buf(), "http://localhost/cache".into());
    let store = Arc::new(AlbumStore::new(storage));
    let client = Arc::new(client);
    let workflow = Arc::new(AlbumWorkflow::new(store, client.clone()));
    Harness {
        dir,
        client,
        workflow,
    }
}
