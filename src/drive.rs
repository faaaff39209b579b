use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::DriveConfig;
use crate::error::Error;
use crate::photos::PhotoItem;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const UPLOAD_BOUNDARY: &str = "photo-kiosk-upload";

type DriveResult<T> = std::result::Result<T, Error>;

/// Client for the remote photo folder (Google Drive v3).
///
/// Listing degrades to a fixed placeholder set instead of propagating errors,
/// so a display polling through this client is never left with nothing to
/// show.
pub struct DriveClient {
    http: reqwest::Client,
    cfg: DriveConfig,
}

/// Result of one listing call: the ordered photos (most recent first, as
/// reported by the remote) and an optional user-facing warning.
#[derive(Debug, Clone)]
pub struct Listing {
    pub photos: Vec<PhotoItem>,
    pub warning: Option<String>,
}

impl Listing {
    /// True when the listing contains nothing better than the built-in
    /// placeholder set.
    pub fn is_fallback(&self) -> bool {
        self.warning.is_some() && self.photos.iter().all(|p| p.placeholder)
    }
}

/// Identity of a freshly uploaded photo, as reported by the remote.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    #[serde(default)]
    mime_type: String,
}

impl DriveClient {
    pub fn new(cfg: DriveConfig) -> DriveResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, cfg })
    }

    pub fn share_url(&self) -> Option<&str> {
        self.cfg.share_url.as_deref()
    }

    /// List the image files in the configured folder, most recent first,
    /// capped at the configured page size.
    ///
    /// This call cannot fail: missing configuration and remote failures both
    /// yield the placeholder set plus a warning, so a caller always has
    /// something to show.
    pub async fn list_photos(&self) -> Listing {
        let (Some(api_key), Some(folder_id)) = (&self.cfg.api_key, &self.cfg.folder_id) else {
            debug!("listing credentials not configured; serving placeholder set");
            let err = Error::ConfigurationMissing("listing credentials are not set");
            return Listing {
                photos: placeholder_photos(),
                warning: Some(err.user_message().to_string()),
            };
        };

        match self.fetch_file_list(api_key, folder_id).await {
            Ok(photos) => Listing {
                photos,
                warning: None,
            },
            Err(err) => {
                warn!(error = %err, "photo listing failed; serving placeholder set");
                Listing {
                    photos: placeholder_photos(),
                    warning: Some(err.user_message().to_string()),
                }
            }
        }
    }

    async fn fetch_file_list(&self, api_key: &str, folder_id: &str) -> DriveResult<Vec<PhotoItem>> {
        let query = format!(
            "'{folder_id}' in parents and mimeType contains 'image/' and trashed = false"
        );
        let page_size = self.cfg.page_size.to_string();
        let url = format!("{}/files", self.cfg.api_base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", query.as_str()),
                ("key", api_key),
                ("fields", "files(id,name,mimeType)"),
                ("orderBy", "createdTime desc"),
                ("pageSize", page_size.as_str()),
                ("corpora", "user"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::RemoteUnavailable(format!(
                "listing returned {status}"
            )));
        }

        let list: FileList = response.json().await?;
        let photos = list
            .files
            .into_iter()
            .filter(|f| f.mime_type.starts_with("image/"))
            .map(|f| PhotoItem {
                display_url: format!("https://drive.google.com/uc?export=view&id={}", f.id),
                thumbnail_url: format!("https://drive.google.com/thumbnail?id={}&sz=w1920", f.id),
                id: f.id,
                name: f.name,
                placeholder: false,
            })
            .collect();
        Ok(photos)
    }

    /// Upload one image into the configured folder.
    ///
    /// Non-image content is rejected before any network I/O.
    pub async fn upload(
        &self,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> DriveResult<UploadReceipt> {
        if !content_type.starts_with("image/") {
            return Err(Error::InvalidInput(format!(
                "only image files are allowed, got {content_type}"
            )));
        }
        let token = self
            .cfg
            .upload_token
            .as_deref()
            .ok_or(Error::ConfigurationMissing("upload token is not set"))?;
        let folder_id = self
            .cfg
            .folder_id
            .as_deref()
            .ok_or(Error::ConfigurationMissing("folder id is not set"))?;

        let metadata = serde_json::json!({
            "name": name,
            "parents": [folder_id],
        });
        let body = multipart_related(&metadata, content_type, &bytes);
        let url = format!("{}/files", self.cfg.upload_base_url);
        let response = self
            .http
            .post(&url)
            .query(&[("uploadType", "multipart"), ("fields", "id,name")])
            .bearer_auth(token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={UPLOAD_BOUNDARY}"),
            )
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::RemoteUnavailable(format!("upload returned {status}")));
        }
        Ok(response.json().await?)
    }
}

/// The Drive multipart upload wants `multipart/related`: a JSON metadata part
/// followed by the media part.
fn multipart_related(metadata: &serde_json::Value, content_type: &str, media: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(media.len() + 512);
    body.extend_from_slice(format!("--{UPLOAD_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{UPLOAD_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{UPLOAD_BOUNDARY}--\r\n").as_bytes());
    body
}

/// Fixed fallback set shown when no real photos are configured or reachable.
pub fn placeholder_photos() -> Vec<PhotoItem> {
    (1..=3)
        .map(|n| PhotoItem {
            id: format!("placeholder-{n}"),
            name: format!("Sample photo {n}"),
            display_url: String::new(),
            thumbnail_url: String::new(),
            placeholder: true,
        })
        .collect()
}
