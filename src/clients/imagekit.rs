use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::{ClientError, ClientResult, ImageStore, UploadFile, check_status, endpoint};
use crate::{config::ImageConfig, models::ProductImage};

const SERVICE: &str = "imagekit";

/// ImageKit client; both endpoints authenticate with the private key as the
/// basic-auth user name and an empty password.
#[derive(Clone)]
pub struct ImageKitClient {
    http: reqwest::Client,
    upload_url: String,
    api_url: String,
    folder: String,
    private_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    file_id: String,
    name: String,
    url: String,
    thumbnail_url: Option<String>,
}

impl ImageKitClient {
    pub fn new(http: reqwest::Client, config: &ImageConfig) -> Self {
        Self {
            http,
            upload_url: config.upload_url.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            folder: config.folder.clone(),
            private_key: config.private_key.clone(),
        }
    }
}

fn transport(source: reqwest::Error) -> ClientError {
    ClientError::Transport {
        service: SERVICE,
        source,
    }
}

#[async_trait]
impl ImageStore for ImageKitClient {
    async fn upload(&self, file: UploadFile) -> ClientResult<ProductImage> {
        let mut part = Part::bytes(file.bytes).file_name(file.file_name.clone());
        if let Some(content_type) = file.content_type.as_deref() {
            part = part.mime_str(content_type).map_err(transport)?;
        }

        let form = Form::new()
            .part("file", part)
            .text("fileName", file.file_name)
            .text("folder", self.folder.clone())
            .text("useUniqueFileName", "true");

        let response = self
            .http
            .post(&self.upload_url)
            .basic_auth(&self.private_key, Some(""))
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;

        let uploaded = check_status(SERVICE, response)
            .await?
            .json::<UploadResponse>()
            .await
            .map_err(transport)?;

        tracing::debug!(file_id = %uploaded.file_id, "image uploaded");

        Ok(ProductImage {
            file_id: uploaded.file_id,
            name: uploaded.name,
            url: uploaded.url,
            thumbnail_url: uploaded.thumbnail_url,
        })
    }

    async fn delete(&self, file_id: &str) -> ClientResult<()> {
        let response = self
            .http
            .delete(endpoint(SERVICE, &self.api_url, &["files", file_id])?)
            .basic_auth(&self.private_key, Some(""))
            .send()
            .await
            .map_err(transport)?;

        check_status(SERVICE, response).await?;
        Ok(())
    }
}
