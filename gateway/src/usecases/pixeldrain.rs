use std::sync::Arc;

use crates::domain::{
    repositories::file_host::{FileHostClient, FileHostError},
    value_objects::file_host::{
        DownloadedFile, FileId, FileInfo, ResolvedDownload, UploadPayload, UploadedFile,
    },
};
use tracing::{error, info, warn};

use super::retry::{RetryPolicy, run_with_retry};

/// Relays uploads and lookups to the configured file host.
pub struct PixeldrainUseCase<C>
where
    C: FileHostClient + Send + Sync + 'static,
{
    client: Arc<C>,
    retry_policy: RetryPolicy,
}

impl<C> PixeldrainUseCase<C>
where
    C: FileHostClient + Send + Sync + 'static,
{
    pub fn new(client: Arc<C>, retry_policy: RetryPolicy) -> Self {
        Self {
            client,
            retry_policy,
        }
    }

    pub async fn upload(&self, payload: UploadPayload) -> Result<UploadedFile, FileHostError> {
        let file_name = payload.file_name.clone();
        let size_bytes = payload.bytes.len();
        info!(%file_name, size_bytes, "pixeldrain_upload: forwarding file");

        let uploaded = run_with_retry(&self.retry_policy, "upload", || {
            self.client.upload_file(payload.clone())
        })
        .await
        .inspect_err(|err| log_failure("pixeldrain_upload", err, file_name.as_str()))?;

        info!(
            %file_name,
            size_bytes,
            file_id = %uploaded.id,
            url = %uploaded.url,
            "pixeldrain_upload: file uploaded"
        );
        Ok(uploaded)
    }

    pub async fn file_info(&self, file_id: &FileId) -> Result<FileInfo, FileHostError> {
        run_with_retry(&self.retry_policy, "file_info", || {
            self.client.file_info(file_id)
        })
        .await
        .inspect_err(|err| log_failure("pixeldrain_info", err, file_id.as_str()))
    }

    pub async fn resolve(&self, file_id: &FileId) -> Result<ResolvedDownload, FileHostError> {
        let info = self.file_info(file_id).await?;

        Ok(ResolvedDownload {
            url: self.client.download_url(&info.id),
            id: info.id,
            name: info.name,
            size: info.size,
        })
    }

    pub async fn download(&self, file_id: &FileId) -> Result<DownloadedFile, FileHostError> {
        let download = run_with_retry(&self.retry_policy, "download", || {
            self.client.download_file(file_id)
        })
        .await
        .inspect_err(|err| log_failure("pixeldrain_download", err, file_id.as_str()))?;

        info!(
            %file_id,
            content_length = ?download.content_length,
            "pixeldrain_download: streaming file"
        );
        Ok(download)
    }
}

fn log_failure(operation: &str, err: &FileHostError, subject: &str) {
    match err {
        FileHostError::NotFound(_) | FileHostError::Rejected { status: 400..=499, .. } => {
            warn!(operation, subject, error = %err, "file host refused request");
        }
        _ => {
            error!(operation, subject, error = ?err, "file host request failed");
        }
    }
}
