use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// A user-placed geographic marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: String,
}

/// Finite latitude in [-90, 90] and longitude in [-180, 180].
pub fn coordinates_in_range(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

/// One entry of a photo search result. Only `url_sq` is used to build stubs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub server: String,
    #[serde(default, deserialize_with = "int_or_string")]
    pub farm: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "int_or_string")]
    pub ispublic: i64,
    #[serde(default, deserialize_with = "int_or_string")]
    pub isfriend: i64,
    #[serde(default, deserialize_with = "int_or_string")]
    pub isfamily: i64,
    #[serde(default)]
    pub url_sq: Option<String>,
}

/// A page of search results. `pages == 0` means the query matched nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoSearchPage {
    #[serde(deserialize_with = "int_or_string")]
    pub page: i64,
    #[serde(deserialize_with = "int_or_string")]
    pub pages: i64,
    #[serde(deserialize_with = "int_or_string")]
    pub perpage: i64,
    #[serde(deserialize_with = "int_or_string")]
    pub total: i64,
    #[serde(default)]
    pub photo: Vec<Photo>,
}

impl PhotoSearchPage {
    pub fn is_empty_result(&self) -> bool {
        self.pages <= 0
    }

    /// Square-thumbnail URLs in result order; photos without one are skipped.
    pub fn image_urls(&self) -> Vec<String> {
        self.photo
            .iter()
            .filter_map(|photo| photo.url_sq.clone())
            .filter(|url| !url.trim().is_empty())
            .collect()
    }
}

/// Bytes cached for a stub, kept next to the album manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedImage {
    pub key: String,
    pub mime_type: String,
    pub digest: String,
    pub size: usize,
}

/// A persisted photo stub belonging to exactly one pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumPhoto {
    pub id: Uuid,
    pub pin_id: Uuid,
    pub image_url: String,
    pub created_at: String,
    #[serde(default)]
    pub image: Option<CachedImage>,
}

impl AlbumPhoto {
    pub fn has_bytes(&self) -> bool {
        self.image.is_some()
    }
}

/// Flickr has served numeric fields both as numbers and as strings.
fn int_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("expected integer, got {text:?}"))),
    }
}
