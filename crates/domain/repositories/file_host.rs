use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

use crate::domain::value_objects::file_host::{
    DownloadedFile, FileId, FileInfo, UploadPayload, UploadedFile,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileHostError {
    #[error("file host rejected the request (status {status}): {message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file host did not respond in time")]
    Timeout,

    #[error("could not reach file host: {0}")]
    Network(String),

    #[error("unexpected response from file host: {0}")]
    InvalidResponse(String),
}

impl FileHostError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Network(_) => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::NotFound(_) | Self::InvalidResponse(_) => false,
        }
    }
}

/// Remote file hosting provider the gateway relays to.
#[automock]
#[async_trait]
pub trait FileHostClient {
    async fn upload_file(&self, payload: UploadPayload) -> Result<UploadedFile, FileHostError>;

    async fn file_info(&self, file_id: &FileId) -> Result<FileInfo, FileHostError>;

    async fn download_file(&self, file_id: &FileId) -> Result<DownloadedFile, FileHostError>;

    fn download_url(&self, file_id: &FileId) -> String;
}
