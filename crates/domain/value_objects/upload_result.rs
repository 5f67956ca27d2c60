use serde::{Deserialize, Serialize};

const FALLBACK_ERROR: &str = "upload failed";

/// Outcome of one upload request as returned to the caller.
///
/// Serializes to `{"ok":true,"url":...}` or `{"ok":false,"error":...}`; the
/// two fields never appear together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "UploadResultWire", try_from = "UploadResultWire")]
pub enum UploadResult {
    Uploaded { url: String },
    Failed { error: String },
}

impl UploadResult {
    pub fn uploaded(url: impl Into<String>) -> Self {
        Self::Uploaded { url: url.into() }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        let error = if error.trim().is_empty() {
            FALLBACK_ERROR.to_string()
        } else {
            error
        };

        Self::Failed { error }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Uploaded { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Uploaded { url } => Some(url),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Uploaded { .. } => None,
            Self::Failed { error } => Some(error),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct UploadResultWire {
    ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<UploadResult> for UploadResultWire {
    fn from(result: UploadResult) -> Self {
        match result {
            UploadResult::Uploaded { url } => Self {
                ok: true,
                url: Some(url),
                error: None,
            },
            UploadResult::Failed { error } => Self {
                ok: false,
                url: None,
                error: Some(error),
            },
        }
    }
}

impl TryFrom<UploadResultWire> for UploadResult {
    type Error = String;

    fn try_from(wire: UploadResultWire) -> Result<Self, Self::Error> {
        match (wire.ok, wire.url, wire.error) {
            (true, Some(url), None) if !url.is_empty() => Ok(Self::Uploaded { url }),
            (false, None, Some(error)) if !error.is_empty() => Ok(Self::Failed { error }),
            (ok, url, error) => Err(format!(
                "inconsistent upload result (ok={ok}, url present={}, error present={})",
                url.is_some(),
                error.is_some()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn uploaded_serializes_without_error_field() {
        let value = serde_json::to_value(UploadResult::uploaded("https://pixeldrain.com/u/abc"))
            .unwrap();

        assert_eq!(value, json!({ "ok": true, "url": "https://pixeldrain.com/u/abc" }));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn failed_serializes_without_url_field() {
        let value = serde_json::to_value(UploadResult::failed("file too large")).unwrap();

        assert_eq!(value, json!({ "ok": false, "error": "file too large" }));
        assert!(value.get("url").is_none());
    }

    #[test]
    fn blank_failure_message_is_replaced() {
        let result = UploadResult::failed("   ");

        assert_eq!(result.error(), Some(FALLBACK_ERROR));
        assert!(!result.is_ok());
    }

    #[test]
    fn deserialize_rejects_both_fields() {
        let raw = json!({ "ok": true, "url": "https://x", "error": "boom" });

        assert!(serde_json::from_value::<UploadResult>(raw).is_err());
    }

    #[test]
    fn deserialize_rejects_flag_mismatch() {
        let raw = json!({ "ok": false, "url": "https://x" });

        assert!(serde_json::from_value::<UploadResult>(raw).is_err());
    }

    #[test]
    fn exactly_one_of_url_or_error_is_present() {
        for result in [UploadResult::uploaded("https://x/u/1"), UploadResult::failed("nope")] {
            let value: Value = serde_json::to_value(&result).unwrap();
            let has_url = value.get("url").is_some();
            let has_error = value.get("error").is_some();

            assert!(has_url ^ has_error);
            assert_eq!(value["ok"], Value::Bool(has_url));
        }
    }
}
