use uuid::Uuid;

use crate::cache::StorageError;

/// Failures surfaced by the search client, the album store and the workflow.
///
/// Nothing in this crate retries: every variant reaches the caller as-is and
/// leaves persisted state untouched, so repeating the same call is safe.
#[derive(Debug, thiserror::Error)]
pub enum AlbumError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request to {url} failed with HTTP {status}")]
    HttpStatus { status: u16, url: String },
    #[error("unexpected response body: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("photo search rejected the request (code {code}): {message}")]
    Api { code: i64, message: String },
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("persistence error: {0}")]
    Persistence(#[from] StorageError),
    #[error("download failed for photo {photo_id}: {source}")]
    Download {
        photo_id: Uuid,
        #[source]
        source: Box<AlbumError>,
    },
    #[error("coordinates out of range: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
    #[error("pin {0} not found")]
    PinNotFound(Uuid),
    #[error("photo {0} not found")]
    PhotoNotFound(Uuid),
}

impl AlbumError {
    /// Short message suitable for showing to an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            AlbumError::Network(_) | AlbumError::HttpStatus { .. } => {
                "Error retrieving photos"
            }
            AlbumError::Decode(_) | AlbumError::Api { .. } => "Error retrieving photos",
            AlbumError::InvalidUrl { .. } => "Invalid photo address",
            AlbumError::Persistence(_) => "Error saving the collection",
            AlbumError::Download { .. } => "Error downloading photos",
            AlbumError::InvalidCoordinates { .. } => "Invalid pin location",
            AlbumError::PinNotFound(_) => "Pin not found",
            AlbumError::PhotoNotFound(_) => "Photo not found",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AlbumError::PinNotFound(_) | AlbumError::PhotoNotFound(_))
    }

    /// Transport failures and non-2xx replies from the photo service.
    pub fn is_network(&self) -> bool {
        matches!(self, AlbumError::Network(_) | AlbumError::HttpStatus { .. })
    }

    /// Errors caused by the caller's input rather than by the system.
    pub fn is_invalid_input(&self) -> bool {
        self.is_not_found() || matches!(self, AlbumError::InvalidCoordinates { .. })
    }
}

pub type Result<T> = std::result::Result<T, AlbumError>;
