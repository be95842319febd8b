//! Image hosting for avatars and post attachments.
//!
//! Clients send images as base64 data URLs. The host stores them and hands
//! back a public URL; destroying takes that URL again.

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// 10 MB decoded image limit
const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0}")]
    InvalidPayload(String),

    #[error("Image uploads are not configured")]
    Disabled,

    #[error("Media host error: {0}")]
    Upstream(#[from] anyhow::Error),
}

pub enum MediaHost {
    Disabled,
    Local(LocalMedia),
    Cloudinary(CloudinaryMedia),
}

impl MediaHost {
    /// Store a data-URL image and return its public URL.
    pub async fn upload(&self, data_url: &str) -> Result<String, MediaError> {
        match self {
            Self::Disabled => Err(MediaError::Disabled),
            Self::Local(local) => local.upload(data_url).await,
            Self::Cloudinary(cloud) => cloud.upload(data_url).await,
        }
    }

    /// Remove a previously uploaded image by its public URL.
    pub async fn destroy(&self, url: &str) -> Result<(), MediaError> {
        match self {
            Self::Disabled => Ok(()),
            Self::Local(local) => local.destroy(url).await,
            Self::Cloudinary(cloud) => cloud.destroy(url).await,
        }
    }
}

/// A decoded `data:<mime>;base64,<payload>` URL.
#[derive(Debug)]
pub struct DataUrl {
    pub ext: &'static str,
    pub bytes: Vec<u8>,
}

pub fn decode_data_url(data_url: &str) -> Result<DataUrl, MediaError> {
    let invalid = || MediaError::InvalidPayload("Image must be a base64 data URL".into());

    let rest = data_url.strip_prefix("data:").ok_or_else(invalid)?;
    let (meta, payload) = rest.split_once(',').ok_or_else(invalid)?;
    let mime = meta.strip_suffix(";base64").ok_or_else(invalid)?;

    let ext = match mime {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        other => {
            return Err(MediaError::InvalidPayload(format!(
                "Unsupported image type '{}'",
                other
            )));
        }
    };

    let bytes = B64
        .decode(payload.trim())
        .map_err(|_| MediaError::InvalidPayload("Image is not valid base64".into()))?;

    if bytes.is_empty() {
        return Err(MediaError::InvalidPayload("Image is empty".into()));
    }
    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(MediaError::InvalidPayload("Image exceeds the 10 MB limit".into()));
    }

    Ok(DataUrl { ext, bytes })
}

/// Last path segment of `url` up to its first `.`.
pub fn asset_id(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let segment = path.rsplit('/').next()?;
    let id = segment.split('.').next()?;
    (!id.is_empty()).then_some(id)
}

// -- Local directory --

pub struct LocalMedia {
    dir: PathBuf,
    public_url: String,
}

impl LocalMedia {
    /// `public_url` is the externally visible server origin; files are
    /// served from `<public_url>/media/`.
    pub fn new(dir: impl Into<PathBuf>, public_url: &str) -> Self {
        Self {
            dir: dir.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    async fn upload(&self, data_url: &str) -> Result<String, MediaError> {
        let image = decode_data_url(data_url)?;
        let file_name = format!("{}.{}", Uuid::new_v4(), image.ext);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create media directory: {}", e))?;

        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, &image.bytes)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))?;

        debug!("Stored {} ({} bytes)", file_name, image.bytes.len());
        Ok(format!("{}/media/{}", self.public_url, file_name))
    }

    async fn destroy(&self, url: &str) -> Result<(), MediaError> {
        // Only ever touch files this host named, to prevent path traversal
        let id = asset_id(url)
            .and_then(|id| id.parse::<Uuid>().ok())
            .ok_or_else(|| MediaError::InvalidPayload(format!("Not a hosted image: {}", url)))?;

        for ext in ["png", "jpg", "gif", "webp"] {
            let path = self.dir.join(format!("{}.{}", id, ext));
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    info!("Removed media {}", path.display());
                    return Ok(());
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(anyhow::anyhow!("Failed to remove {}: {}", path.display(), e).into());
                }
            }
        }

        debug!("Media {} already gone", id);
        Ok(())
    }
}

// -- Cloudinary --

pub struct CloudinaryMedia {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Deserialize)]
struct UploadResult {
    secure_url: String,
}

#[derive(Deserialize)]
struct DestroyResult {
    result: String,
}

impl CloudinaryMedia {
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            cloud_name,
            api_key,
            api_secret,
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/{}",
            self.cloud_name, action
        )
    }

    async fn upload(&self, data_url: &str) -> Result<String, MediaError> {
        // Validate locally so bad input is a 400, not an upstream failure
        decode_data_url(data_url)?;

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(&[("timestamp", timestamp.as_str())], &self.api_secret);

        let response = self
            .client
            .post(self.endpoint("upload"))
            .form(&[
                ("file", data_url),
                ("api_key", self.api_key.as_str()),
                ("timestamp", timestamp.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| anyhow::anyhow!("Upload request failed: {}", e))?;

        let result: UploadResult = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Malformed upload response: {}", e))?;

        Ok(result.secure_url)
    }

    async fn destroy(&self, url: &str) -> Result<(), MediaError> {
        let public_id = asset_id(url)
            .ok_or_else(|| MediaError::InvalidPayload(format!("Not a hosted image: {}", url)))?;

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            &self.api_secret,
        );

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id),
                ("api_key", self.api_key.as_str()),
                ("timestamp", timestamp.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| anyhow::anyhow!("Destroy request failed: {}", e))?;

        let result: DestroyResult = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Malformed destroy response: {}", e))?;
        debug!("Cloudinary destroy {}: {}", public_id, result.result);

        Ok(())
    }
}

/// SHA-1 over the `&`-joined, key-sorted params followed by the secret.
fn sign(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by_key(|(k, _)| *k);

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
