use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{AlbumError, Result};
use crate::model::PhotoSearchPage;

pub const FLICKR_ENDPOINT: &str = "https://api.flickr.com/services/rest";
const SEARCH_METHOD: &str = "flickr.photos.search";
const SEARCH_EXTRAS: &str = "url_sq";
pub const PER_PAGE: u32 = 30;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Remote photo search plus raw image download.
#[async_trait]
pub trait PhotoSearch: Send + Sync {
    async fn search(&self, latitude: f64, longitude: f64, page: i64) -> Result<PhotoSearchPage>;

    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    stat: Option<String>,
    code: Option<i64>,
    message: Option<String>,
    photos: Option<PhotoSearchPage>,
}

#[derive(Debug, Clone)]
pub struct FlickrClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl FlickrClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    pub fn search_url(&self, latitude: f64, longitude: f64, page: i64) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint).map_err(|err| AlbumError::InvalidUrl {
            url: self.endpoint.clone(),
            reason: err.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("method", SEARCH_METHOD)
            .append_pair("extras", SEARCH_EXTRAS)
            .append_pair("api_key", &self.api_key)
            .append_pair("lat", &latitude.to_string())
            .append_pair("lon", &longitude.to_string())
            .append_pair("per_page", &PER_PAGE.to_string())
            .append_pair("page", &page.to_string())
            .append_pair("format", "json")
            .append_pair("nojsoncallback", "1");
        Ok(url)
    }

    async fn get_bytes(&self, url: Url) -> Result<Vec<u8>> {
        let response = self.client.get(url.clone()).send().await?;
        let response = assert_ok_response(response, &url).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

async fn assert_ok_response(response: reqwest::Response, url: &Url) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    warn!(%status, body = %text, "photo search request failed");
    Err(AlbumError::HttpStatus {
        status: status.as_u16(),
        url: redact_api_key(url),
    })
}

fn redact_api_key(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == "api_key" {
                "***".to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();
    if pairs.is_empty() {
        return redacted.to_string();
    }
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

/// Parses a search response body, distinguishing Flickr's error envelope
/// from a body that is simply malformed.
pub fn parse_search_response(body: &[u8]) -> Result<PhotoSearchPage> {
    let payload: SearchResponse = serde_json::from_slice(body).map_err(AlbumError::Decode)?;
    if payload.stat.as_deref() == Some("fail") {
        return Err(AlbumError::Api {
            code: payload.code.unwrap_or_default(),
            message: payload.message.unwrap_or_default(),
        });
    }
    payload.photos.ok_or_else(|| {
        AlbumError::Decode(serde::de::Error::missing_field("photos"))
    })
}

#[async_trait]
impl PhotoSearch for FlickrClient {
    async fn search(&self, latitude: f64, longitude: f64, page: i64) -> Result<PhotoSearchPage> {
        let url = self.search_url(latitude, longitude, page)?;
        debug!(latitude, longitude, page, "searching photos");
        let body = self.get_bytes(url).await?;
        let result = parse_search_response(&body)?;
        debug!(
            page = result.page,
            pages = result.pages,
            total = result.total,
            returned = result.photo.len(),
            "photo search finished"
        );
        Ok(result)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = validate_http_url(url)?;
        let bytes = self.get_bytes(parsed).await?;
        debug!(url, size = bytes.len(), "downloaded photo");
        Ok(bytes)
    }
}

pub fn validate_http_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AlbumError::InvalidUrl {
            url: raw.to_string(),
            reason: "url must not be empty".to_string(),
        });
    }
    let parsed = Url::parse(trimmed).map_err(|err| AlbumError::InvalidUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(AlbumError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {scheme}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> FlickrClient {
        FlickrClient::new(endpoint, "test-key", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn search_url_carries_fixed_parameters() {
        let url = client(FLICKR_ENDPOINT).search_url(19.43, -99.13, 3).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let get = |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(url.host_str(), Some("api.flickr.com"));
        assert_eq!(get("method"), Some("flickr.photos.search"));
        assert_eq!(get("extras"), Some("url_sq"));
        assert_eq!(get("api_key"), Some("test-key"));
        assert_eq!(get("lat"), Some("19.43"));
        assert_eq!(get("lon"), Some("-99.13"));
        assert_eq!(get("per_page"), Some("30"));
        assert_eq!(get("page"), Some("3"));
        assert_eq!(get("format"), Some("json"));
        assert_eq!(get("nojsoncallback"), Some("1"));
    }

    #[test]
    fn redacts_key_in_error_urls() {
        let url = client(FLICKR_ENDPOINT).search_url(1.0, 2.0, 0).unwrap();
        let redacted = redact_api_key(&url);
        assert!(!redacted.contains("test-key"));
        assert!(redacted.contains("api_key=***") || redacted.contains("api_key=%2A%2A%2A"));
    }

    #[test]
    fn parses_photos_envelope() {
        let page = parse_search_response(
            br#"{"photos":{"page":1,"pages":2,"perpage":30,"total":31,"photo":[]},"stat":"ok"}"#,
        )
        .unwrap();
        assert_eq!(page.pages, 2);
        assert_eq!(page.total, 31);
    }

    #[test]
    fn api_failure_is_not_a_decode_error() {
        let err = parse_search_response(
            br#"{"stat":"fail","code":100,"message":"Invalid API Key (Key has invalid format)"}"#,
        )
        .unwrap_err();
        match err {
            AlbumError::Api { code, message } => {
                assert_eq!(code, 100);
                assert!(message.starts_with("Invalid API Key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_body_is_decode_error() {
        assert!(matches!(
            parse_search_response(b"jsonFlickrApi({})"),
            Err(AlbumError::Decode(_))
        ));
        assert!(matches!(
            parse_search_response(br#"{"stat":"ok"}"#),
            Err(AlbumError::Decode(_))
        ));
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(validate_http_url("https://live.staticflickr.com/1/1_s.jpg").is_ok());
        assert!(matches!(
            validate_http_url("file:///etc/passwd"),
            Err(AlbumError::InvalidUrl { .. })
        ));
        assert!(matches!(validate_http_url("  "), Err(AlbumError::InvalidUrl { .. })));
    }

    mod http {
        use super::*;
        use axum::{Router, extract::Query, http::StatusCode, routing::get};
        use std::collections::HashMap;

        async fn serve(router: Router) -> String {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, router).await.unwrap();
            });
            format!("http://{addr}")
        }

        #[tokio::test]
        async fn search_and_download_against_local_server() {
            let router = Router::new()
                .route(
                    "/services/rest",
                    get(|Query(params): Query<HashMap<String, String>>| async move {
                        let page = params.get("page").cloned().unwrap_or_default();
                        format!(
                            r#"{{"photos":{{"page":{page},"pages":1,"perpage":30,"total":1,"photo":[
                                {{"id":"7","owner":"o","secret":"s","server":"1","farm":1,"title":"t",
                                  "ispublic":1,"isfriend":0,"isfamily":0,"url_sq":"http://x/7.jpg"}}]}},"stat":"ok"}}"#
                        )
                    }),
                )
                .route("/img.jpg", get(|| async { vec![0xFFu8, 0xD8, 0xFF, 0x00] }))
                .route("/missing.jpg", get(|| async { StatusCode::NOT_FOUND }));
            let base = serve(router).await;
            let client = client(&format!("{base}/services/rest"));

            let page = client.search(10.0, 20.0, 1).await.unwrap();
            assert_eq!(page.page, 1);
            assert_eq!(page.image_urls(), vec!["http://x/7.jpg".to_string()]);

            let bytes = client.download(&format!("{base}/img.jpg")).await.unwrap();
            assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF, 0x00]);

            let err = client
                .download(&format!("{base}/missing.jpg"))
                .await
                .unwrap_err();
            assert!(matches!(err, AlbumError::HttpStatus { status: 404, .. }));
        }

        #[tokio::test]
        async fn unreachable_host_is_network_error() {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);
            let client = client(&format!("http://{addr}/services/rest"));
            let err = client.search(0.0, 0.0, 0).await.unwrap_err();
            assert!(matches!(err, AlbumError::Network(_)));
        }
    }
}
