use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::domain::repositories::file_host::FileHostError;

const MAX_FILE_ID_LEN: usize = 64;
const MAX_FILE_NAME_CHARS: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileIdError {
    #[error("file id is empty")]
    Empty,
    #[error("file id is too long")]
    TooLong,
    #[error("file id contains invalid characters")]
    InvalidCharacters,
    #[error("not a valid url: {0}")]
    InvalidUrl(String),
    #[error("url does not point to pixeldrain: {0}")]
    ForeignHost(String),
    #[error("url does not contain a pixeldrain file id")]
    MissingId,
}

/// Identifier of a file stored on the remote host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn parse(raw: &str) -> Result<Self, FileIdError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(FileIdError::Empty);
        }
        if raw.len() > MAX_FILE_ID_LEN {
            return Err(FileIdError::TooLong);
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(FileIdError::InvalidCharacters);
        }

        Ok(Self(raw.to_string()))
    }

    /// Extracts the id from a share link, an API link or a bare id.
    pub fn from_url(input: &str) -> Result<Self, FileIdError> {
        let input = input.trim();
        if !input.contains("://") {
            return Self::parse(input);
        }

        let url = Url::parse(input).map_err(|err| FileIdError::InvalidUrl(err.to_string()))?;
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        if !is_pixeldrain_host(&host) {
            return Err(FileIdError::ForeignHost(host));
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            ["u", id, ..] => Self::parse(id),
            ["api", "file", id, ..] => Self::parse(id),
            ["l", ..] | ["api", ..] => Err(FileIdError::MissingId),
            [id] => Self::parse(id),
            _ => Err(FileIdError::MissingId),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_pixeldrain_host(host: &str) -> bool {
    host == "pixeldrain.com"
        || host.ends_with(".pixeldrain.com")
        || host == "pixeldrain.net"
        || host.ends_with(".pixeldrain.net")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileNameError {
    #[error("file name is empty")]
    Empty,
    #[error("file name is not allowed: {0}")]
    Reserved(String),
}

/// Name under which an uploaded file is stored. Only the last path component
/// of whatever the caller sent is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFileName(String);

impl UploadFileName {
    pub fn new(raw: &str) -> Result<Self, FileNameError> {
        let base = raw
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim()
            .trim_matches(char::is_control);

        if base.is_empty() {
            return Err(FileNameError::Empty);
        }
        if base == "." || base == ".." {
            return Err(FileNameError::Reserved(base.to_string()));
        }

        Ok(Self(base.chars().take(MAX_FILE_NAME_CHARS).collect()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UploadFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub file_name: UploadFileName,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub id: FileId,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_upload: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_sha256: Option<String>,
}

/// Direct download location for a file, with whatever metadata the host gave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDownload {
    pub id: FileId,
    pub url: String,
    pub name: String,
    pub size: u64,
}

pub struct DownloadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes, FileHostError>>,
}

impl fmt::Debug for DownloadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadedFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_share_link() {
        let id = FileId::from_url("https://pixeldrain.com/u/aBc123").unwrap();
        assert_eq!(id.as_str(), "aBc123");
    }

    #[test]
    fn parses_api_links() {
        assert_eq!(
            FileId::from_url("https://pixeldrain.com/api/file/xyz789?download")
                .unwrap()
                .as_str(),
            "xyz789"
        );
        assert_eq!(
            FileId::from_url("https://pixeldrain.com/api/file/xyz789/info")
                .unwrap()
                .as_str(),
            "xyz789"
        );
    }

    #[test]
    fn parses_root_level_id_and_bare_id() {
        assert_eq!(
            FileId::from_url("https://pixeldrain.com/Qw3rTy").unwrap().as_str(),
            "Qw3rTy"
        );
        assert_eq!(FileId::from_url("  Qw3rTy ").unwrap().as_str(), "Qw3rTy");
    }

    #[test]
    fn rejects_foreign_host() {
        assert!(matches!(
            FileId::from_url("https://example.com/u/abc"),
            Err(FileIdError::ForeignHost(_))
        ));
        assert!(matches!(
            FileId::from_url("https://notpixeldrain.com/u/abc"),
            Err(FileIdError::ForeignHost(_))
        ));
    }

    #[test]
    fn rejects_list_links() {
        assert_eq!(
            FileId::from_url("https://pixeldrain.com/l/list01"),
            Err(FileIdError::MissingId)
        );
    }

    #[test]
    fn rejects_bad_characters() {
        assert_eq!(
            FileId::parse("../etc"),
            Err(FileIdError::InvalidCharacters)
        );
        assert_eq!(FileId::parse(""), Err(FileIdError::Empty));
        assert_eq!(FileId::parse(&"a".repeat(65)), Err(FileIdError::TooLong));
    }

    #[test]
    fn file_name_keeps_last_component() {
        assert_eq!(
            UploadFileName::new("C:\\Users\\me\\game.zip").unwrap().as_str(),
            "game.zip"
        );
        assert_eq!(
            UploadFileName::new("/tmp/dir/save.7z").unwrap().as_str(),
            "save.7z"
        );
        assert_eq!(UploadFileName::new("  notes.txt ").unwrap().as_str(), "notes.txt");
    }

    #[test]
    fn file_name_rejects_empty_and_dots() {
        assert_eq!(UploadFileName::new(""), Err(FileNameError::Empty));
        assert_eq!(UploadFileName::new("dir/"), Err(FileNameError::Empty));
        assert!(matches!(
            UploadFileName::new(".."),
            Err(FileNameError::Reserved(_))
        ));
    }

    #[test]
    fn file_name_is_capped() {
        let long = "x".repeat(400);
        assert_eq!(UploadFileName::new(&long).unwrap().as_str().chars().count(), 255);
    }
}
