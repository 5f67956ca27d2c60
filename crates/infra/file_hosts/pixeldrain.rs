use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use reqwest::{
    Client, RequestBuilder, Response, StatusCode,
    header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::domain::{
    repositories::file_host::{FileHostClient, FileHostError},
    value_objects::file_host::{DownloadedFile, FileId, FileInfo, UploadPayload, UploadedFile},
};

const ERROR_BODY_PREVIEW_CHARS: usize = 512;

#[derive(Clone, Debug)]
pub struct PixeldrainConfig {
    pub api_url: String,
    pub share_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

pub struct PixeldrainClient {
    client: Client,
    api_url: Url,
    share_url: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    id: String,
    name: String,
    size: u64,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    views: Option<u64>,
    #[serde(default)]
    date_upload: Option<DateTime<Utc>>,
    #[serde(default)]
    hash_sha256: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl PixeldrainClient {
    pub fn new(config: PixeldrainConfig) -> Result<Self> {
        let api_url = Url::parse(config.api_url.trim_end_matches('/'))
            .with_context(|| format!("invalid pixeldrain api url: {}", config.api_url))?;
        if api_url.cannot_be_a_base() {
            bail!("pixeldrain api url cannot be used as a base: {}", api_url);
        }

        let share_url = config.share_url.trim_end_matches('/').to_string();
        if share_url.is_empty() {
            bail!("pixeldrain share url is empty");
        }

        let request_timeout = Duration::from_secs(config.timeout_secs);
        // Downloads are bounded per read so long transfers keep going while
        // bytes flow. Uploads and lookups also get a total deadline.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(request_timeout)
            .build()
            .context("failed to build pixeldrain http client")?;

        let api_key = config.api_key.filter(|key| !key.trim().is_empty());

        Ok(Self {
            client,
            api_url,
            share_url,
            api_key,
            request_timeout,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        // Checked in `new`: the base url always has path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.basic_auth("", Some(key)),
            None => request,
        }
    }

    fn share_link(&self, file_id: &FileId) -> String {
        format!("{}/{}", self.share_url, file_id)
    }
}

#[async_trait]
impl FileHostClient for PixeldrainClient {
    async fn upload_file(&self, payload: UploadPayload) -> Result<UploadedFile, FileHostError> {
        let url = self.endpoint(&["file", payload.file_name.as_str()]);
        debug!(
            file_name = %payload.file_name,
            size_bytes = payload.bytes.len(),
            "pixeldrain: PUT file"
        );

        // Pixeldrain upload reference:
        // https://pixeldrain.com/api (PUT /file/{name})
        let response = self
            .authorize(self.client.put(url))
            .timeout(self.request_timeout)
            .header(CONTENT_TYPE, payload.content_type.as_str())
            .body(payload.bytes)
            .send()
            .await
            .map_err(map_transport_error)?;

        let response = ensure_success(response).await?;
        let body: UploadResponse = response
            .json()
            .await
            .map_err(|err| FileHostError::InvalidResponse(err.to_string()))?;

        let id = FileId::parse(&body.id).map_err(|err| {
            FileHostError::InvalidResponse(format!("upload returned bad id {:?}: {}", body.id, err))
        })?;

        Ok(UploadedFile {
            url: self.share_link(&id),
            id,
        })
    }

    async fn file_info(&self, file_id: &FileId) -> Result<FileInfo, FileHostError> {
        let url = self.endpoint(&["file", file_id.as_str(), "info"]);

        let response = self
            .authorize(self.client.get(url))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(map_transport_error)?;

        let response = ensure_success(response).await?;
        let body: InfoResponse = response
            .json()
            .await
            .map_err(|err| FileHostError::InvalidResponse(err.to_string()))?;

        let id = FileId::parse(&body.id).unwrap_or_else(|_| file_id.clone());

        Ok(FileInfo {
            id,
            name: body.name,
            size: body.size,
            mime_type: body.mime_type.filter(|m| !m.is_empty()),
            views: body.views,
            date_upload: body.date_upload,
            hash_sha256: body.hash_sha256.filter(|h| !h.is_empty()),
        })
    }

    async fn download_file(&self, file_id: &FileId) -> Result<DownloadedFile, FileHostError> {
        let url = self.download_url(file_id);

        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(map_transport_error)?;

        let response = ensure_success(response).await?;
        let headers = response.headers();

        let file_name = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition);
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_transport_error))
            .boxed();

        Ok(DownloadedFile {
            file_name,
            content_type,
            content_length,
            body,
        })
    }

    fn download_url(&self, file_id: &FileId) -> String {
        let mut url = self.endpoint(&["file", file_id.as_str()]);
        url.set_query(Some("download"));
        url.to_string()
    }
}

async fn ensure_success(response: Response) -> Result<Response, FileHostError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .map(|b| b.trim().to_owned())
        .unwrap_or_default();

    Err(map_error_response(status, &body))
}

fn map_error_response(status: StatusCode, body: &str) -> FileHostError {
    let parsed = serde_json::from_str::<ErrorResponse>(body).ok();
    let code = parsed.as_ref().and_then(|p| p.value.clone());

    let message = parsed
        .and_then(|p| p.message.or(p.value))
        .filter(|m| !m.trim().is_empty())
        .or_else(|| {
            // Keep a short preview of the response body for debugging.
            Some(body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect::<String>())
                .filter(|b| !b.is_empty())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

    if status == StatusCode::NOT_FOUND {
        return FileHostError::NotFound(message);
    }

    FileHostError::Rejected {
        status: status.as_u16(),
        code,
        message,
    }
}

fn map_transport_error(err: reqwest::Error) -> FileHostError {
    if err.is_timeout() {
        return FileHostError::Timeout;
    }

    FileHostError::Network(err.without_url().to_string())
}

fn filename_from_disposition(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}
