use std::sync::Arc;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{
        Multipart, Path, Query, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
    },
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use crates::domain::{
    repositories::file_host::FileHostClient,
    value_objects::{
        file_host::{FileId, UploadFileName, UploadPayload},
        upload_result::UploadResult,
    },
};
use serde::{Deserialize, Serialize};

use crate::{axum_http::error_responses::GatewayError, usecases::pixeldrain::PixeldrainUseCase};

// Run example
//   curl -X POST "http://127.0.0.1:$GATEWAY_PORT/pixeldrain/upload" \
//     -H "Authorization: Bearer $GATEWAY_TOKEN" \
//     -F "file=@./save.7z"

const FILE_FIELD: &str = "file";
const NAME_FIELD: &str = "name";
const DEFAULT_FILE_NAME: &str = "upload.bin";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Serialize)]
struct Success<T> {
    ok: bool,
    #[serde(flatten)]
    data: T,
}

fn success<T: Serialize>(data: T) -> Response {
    Json(Success { ok: true, data }).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    url: Option<String>,
}

pub fn routes<C>(usecase: Arc<PixeldrainUseCase<C>>) -> Router
where
    C: FileHostClient + Send + Sync + 'static,
{
    Router::new()
        .route("/upload", post(upload::<C>))
        .route("/info/:id", get(file_info::<C>))
        .route("/resolve", get(resolve::<C>))
        .route("/download/:id", get(download::<C>))
        .with_state(usecase)
}

pub async fn upload<C>(
    State(usecase): State<Arc<PixeldrainUseCase<C>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response
where
    C: FileHostClient + Send + Sync + 'static,
{
    let payload = match read_upload(multipart).await {
        Ok(payload) => payload,
        Err(err) => return upload_failure(err),
    };

    match usecase.upload(payload).await {
        Ok(uploaded) => (StatusCode::OK, Json(UploadResult::uploaded(uploaded.url))).into_response(),
        Err(err) => upload_failure(GatewayError::from(err)),
    }
}

fn upload_failure(err: GatewayError) -> Response {
    let status = err.status_code();
    err.report();

    (status, Json(UploadResult::failed(err.to_string()))).into_response()
}

pub async fn file_info<C>(
    State(usecase): State<Arc<PixeldrainUseCase<C>>>,
    Path(id): Path<String>,
) -> Result<Response, GatewayError>
where
    C: FileHostClient + Send + Sync + 'static,
{
    let file_id = parse_file_id(&id)?;
    let info = usecase.file_info(&file_id).await?;

    Ok(success(info))
}

pub async fn resolve<C>(
    State(usecase): State<Arc<PixeldrainUseCase<C>>>,
    query: Result<Query<ResolveQuery>, QueryRejection>,
) -> Result<Response, GatewayError>
where
    C: FileHostClient + Send + Sync + 'static,
{
    let Query(query) = query.map_err(|rejection| GatewayError::BadRequest(rejection.body_text()))?;
    let url = query
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| GatewayError::BadRequest("missing `url` query parameter".to_string()))?;

    let file_id = FileId::from_url(&url)
        .map_err(|err| GatewayError::BadRequest(format!("unsupported url: {}", err)))?;
    let resolved = usecase.resolve(&file_id).await?;

    Ok(success(resolved))
}

pub async fn download<C>(
    State(usecase): State<Arc<PixeldrainUseCase<C>>>,
    Path(id): Path<String>,
) -> Result<Response, GatewayError>
where
    C: FileHostClient + Send + Sync + 'static,
{
    let file_id = parse_file_id(&id)?;
    let download = usecase.download(&file_id).await?;

    let content_type = download
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    let disposition = download
        .file_name
        .as_deref()
        .and_then(|name| HeaderValue::from_str(&content_disposition(name)).ok());
    let content_length = download.content_length;

    let mut response = Body::from_stream(download.body).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, content_type);
    if let Some(disposition) = disposition {
        headers.insert(CONTENT_DISPOSITION, disposition);
    }
    if let Some(length) = content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }

    Ok(response)
}

/// `filename` carries an ASCII fallback, `filename*` the exact UTF-8 name
/// (RFC 6266 / RFC 5987).
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if fallback == name {
        return format!("attachment; filename=\"{}\"", fallback);
    }

    let mut encoded = String::with_capacity(name.len() * 3);
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

fn parse_file_id(raw: &str) -> Result<FileId, GatewayError> {
    FileId::parse(raw).map_err(|err| GatewayError::BadRequest(format!("invalid file id: {}", err)))
}

struct FilePart {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Bytes,
    named_field: bool,
}

async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadPayload, GatewayError> {
    let mut multipart =
        multipart.map_err(|rejection| GatewayError::BadRequest(rejection.body_text()))?;

    let mut file: Option<FilePart> = None;
    let mut name_override: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(map_multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        if field_name == NAME_FIELD && file_name.is_none() {
            name_override = Some(field.text().await.map_err(map_multipart_error)?);
            continue;
        }

        let named_field = field_name == FILE_FIELD;
        if !named_field && file_name.is_none() {
            continue;
        }
        // The `file` field wins over any other part carrying a filename.
        if file.as_ref().is_some_and(|f| f.named_field || !named_field) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(map_multipart_error)?;

        file = Some(FilePart {
            file_name,
            content_type,
            bytes,
            named_field,
        });
    }

    let file = file.ok_or_else(|| {
        GatewayError::BadRequest("multipart body does not contain a file".to_string())
    })?;

    if file.bytes.is_empty() {
        return Err(GatewayError::BadRequest("uploaded file is empty".to_string()));
    }

    let raw_name = name_override
        .filter(|name| !name.trim().is_empty())
        .or(file.file_name)
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
    let file_name = UploadFileName::new(&raw_name)
        .map_err(|err| GatewayError::BadRequest(format!("invalid file name: {}", err)))?;

    let content_type = file
        .content_type
        .filter(|ct| !ct.trim().is_empty())
        .or_else(|| {
            mime_guess::from_path(file_name.as_str())
                .first_raw()
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    Ok(UploadPayload {
        file_name,
        content_type,
        bytes: file.bytes,
    })
}

fn map_multipart_error(err: MultipartError) -> GatewayError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::PayloadTooLarge(format!("file exceeds the upload size limit: {}", err.body_text()))
    } else {
        GatewayError::BadRequest(format!("malformed multipart body: {}", err.body_text()))
    }
}
