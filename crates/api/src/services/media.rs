//! Cloudinary API client for avatar storage.
//!
//! Uploads use an unsigned preset, so no signature dance is needed on
//! the hot path; deletes go through the admin API with basic auth.

use reqwest::multipart;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::config::CloudinaryConfig;

/// Cloudinary API base URL.
const BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// Folder avatars are stored under.
const AVATAR_FOLDER: &str = "avatars";

/// Errors that can occur when interacting with the Cloudinary API.
#[derive(Debug, Error)]
pub enum MediaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A stored asset: the handle needed to delete it, and its serving URL.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedAsset {
    pub public_id: String,
    pub secure_url: String,
}

/// Cloudinary API client.
#[derive(Clone)]
pub struct CloudinaryClient {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    upload_preset: String,
}

impl CloudinaryClient {
    /// Create a new Cloudinary API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CloudinaryConfig) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.expose_secret().to_string(),
            upload_preset: config.upload_preset.clone(),
        })
    }

    /// Upload an avatar image.
    ///
    /// `image` is a base64 data URI (`data:image/...;base64,...`) as sent
    /// by the client. The image is cropped to 150px wide on upload.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn upload_avatar(&self, image: &str) -> Result<UploadedAsset, MediaError> {
        let url = format!("{BASE_URL}/{}/image/upload", self.cloud_name);

        let form = multipart::Form::new()
            .text("file", image.to_string())
            .text("upload_preset", self.upload_preset.clone())
            .text("folder", AVATAR_FOLDER.to_string())
            .text("transformation", "w_150,c_scale".to_string());

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MediaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| MediaError::Parse(e.to_string()))
    }

    /// Delete a stored asset by its public id.
    ///
    /// Used to reclaim the old avatar when a user uploads a new one.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn delete_asset(&self, public_id: &str) -> Result<(), MediaError> {
        let url = format!(
            "{BASE_URL}/{}/resources/image/upload?public_ids[]={}",
            self.cloud_name,
            urlencoding::encode(public_id)
        );

        let response = self
            .client
            .delete(&url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MediaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}
