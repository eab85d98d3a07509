//! Route table and request handlers.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;

use burrow_core::{StoreError, store_path};
use burrow_ops::FileOperation;
use hyper::body::Incoming;
use hyper::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::form_urlencoded;

use crate::body::{ResponseBody, body_reader, json_response, read_json, status_response, stream};
use crate::error::ApiError;
use crate::state::AppState;

/// Header naming the destination folder of a raw upload.
pub const UPLOAD_PATH_HEADER: &str = "x-upload-path";
/// Header naming the file of a raw upload.
pub const FILE_NAME_HEADER: &str = "x-file-name";

type ApiResult = Result<Response<ResponseBody>, ApiError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Files,
    Upload,
    CreateFolder,
    FolderTree,
    Delete,
    Copy,
    Move,
    Rename,
    Decompress,
    Categorize,
    DownloadFile,
}

impl Endpoint {
    fn from_path(path: &str) -> Option<Self> {
        let endpoint = match path.trim_end_matches('/') {
            "/files" => Self::Files,
            "/upload" => Self::Upload,
            "/create-folder" => Self::CreateFolder,
            "/folder-tree" => Self::FolderTree,
            "/delete" => Self::Delete,
            "/copy" => Self::Copy,
            "/move" => Self::Move,
            "/rename" => Self::Rename,
            "/decompress" => Self::Decompress,
            "/categorize" => Self::Categorize,
            "/download-file" => Self::DownloadFile,
            _ => return None,
        };
        Some(endpoint)
    }

    fn method(self) -> Method {
        match self {
            Self::Files | Self::FolderTree | Self::DownloadFile => Method::GET,
            _ => Method::POST,
        }
    }

    fn allow(self) -> &'static str {
        match self.method() {
            Method::GET => "GET",
            _ => "POST",
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonUpload {
    path: String,
    file_name: String,
    content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateFolderRequest {
    path: String,
    folder_name: String,
}

#[derive(Deserialize)]
struct PathsRequest {
    paths: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferRequest {
    paths: Vec<String>,
    destination_path: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameRequest {
    entry_path: String,
    new_name: String,
}

#[derive(Deserialize)]
struct PathRequest {
    path: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategorizeRequest {
    paths: Vec<String>,
    current_path: String,
}

/// Serve one request.
pub async fn handle(state: &AppState, request: Request<Incoming>) -> Response<ResponseBody> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = match route(state, request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };
    debug!(%method, %path, status = %response.status(), "Handled request");
    response
}

async fn route(state: &AppState, request: Request<Incoming>) -> ApiResult {
    let endpoint = Endpoint::from_path(request.uri().path()).ok_or(ApiError::NoRoute)?;
    if request.method() != endpoint.method() {
        return Err(ApiError::MethodNotAllowed {
            allow: endpoint.allow(),
        });
    }

    let (parts, body) = request.into_parts();
    let limit = state.max_body_bytes;
    match endpoint {
        Endpoint::Files => list_files(state, &parts).await,
        Endpoint::Upload => upload(state, &parts, body).await,
        Endpoint::CreateFolder => {
            let req: CreateFolderRequest = read_json(body, limit).await?;
            let entry = state.engine.create_folder(&req.path, &req.folder_name).await?;
            Ok(json_response(StatusCode::CREATED, &entry))
        }
        Endpoint::FolderTree => {
            let trees = state.trees.clone();
            let label = state.root_label.clone();
            let tree = blocking(move || trees.build_tree(store_path::ROOT, &label)).await?;
            Ok(json_response(StatusCode::OK, &tree))
        }
        Endpoint::Delete => {
            let req: PathsRequest = read_json(body, limit).await?;
            run(state, FileOperation::delete(req.paths)).await
        }
        Endpoint::Copy => {
            let req: TransferRequest = read_json(body, limit).await?;
            run(state, FileOperation::copy(req.paths, req.destination_path)).await
        }
        Endpoint::Move => {
            let req: TransferRequest = read_json(body, limit).await?;
            run(state, FileOperation::move_to(req.paths, req.destination_path)).await
        }
        Endpoint::Rename => {
            let req: RenameRequest = read_json(body, limit).await?;
            run(state, FileOperation::rename(req.entry_path, req.new_name)).await
        }
        Endpoint::Decompress => {
            let req: PathRequest = read_json(body, limit).await?;
            run(state, FileOperation::decompress(req.path)).await
        }
        Endpoint::Categorize => {
            let req: CategorizeRequest = read_json(body, limit).await?;
            run(state, FileOperation::categorize(req.paths, req.current_path)).await
        }
        Endpoint::DownloadFile => download(state, &parts).await,
    }
}

async fn run(state: &AppState, operation: FileOperation) -> ApiResult {
    state.engine.execute(operation).await?;
    Ok(status_response(StatusCode::NO_CONTENT))
}

/// `GET /files?path=...[&query=...]`
async fn list_files(state: &AppState, parts: &Parts) -> ApiResult {
    let params = query_params(parts);
    let path = params
        .get("path")
        .cloned()
        .unwrap_or_else(|| store_path::ROOT.to_string());
    let query = params.get("query").cloned();

    let reader = state.reader.clone();
    let entries = blocking(move || match query {
        Some(query) => reader.search(&path, &query),
        None => reader.list(&path),
    })
    .await?;
    Ok(json_response(StatusCode::OK, &entries))
}

/// `POST /upload`, either as JSON or as a raw streamed body.
async fn upload(state: &AppState, parts: &Parts, body: Incoming) -> ApiResult {
    let is_json = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    let entry = if is_json {
        let req: JsonUpload = read_json(body, state.max_body_bytes).await?;
        let bytes = req.content.into_bytes();
        let len = bytes.len() as u64;
        state
            .engine
            .upload(&req.path, &req.file_name, bytes.as_slice(), Some(len), None)
            .await?
    } else {
        let parent = decoded_header(&parts.headers, UPLOAD_PATH_HEADER)?;
        let name = decoded_header(&parts.headers, FILE_NAME_HEADER)?;
        let total_len = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        state
            .engine
            .upload(&parent, &name, body_reader(body), total_len, None)
            .await?
    };
    Ok(json_response(StatusCode::CREATED, &entry))
}

/// `GET /download-file?path=...`
async fn download(state: &AppState, parts: &Parts) -> ApiResult {
    let params = query_params(parts);
    let path = params
        .get("path")
        .ok_or_else(|| StoreError::invalid("Missing 'path' parameter"))?;
    let absolute: PathBuf = state.engine.resolver().resolve(path)?;

    let meta = tokio::fs::metadata(&absolute)
        .await
        .map_err(|e| StoreError::io(&absolute, e))?;
    if meta.is_dir() {
        return Err(StoreError::invalid("Folders cannot be downloaded").into());
    }
    let file = tokio::fs::File::open(&absolute)
        .await
        .map_err(|e| StoreError::io(&absolute, e))?;

    let mut response = Response::new(stream(file));
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(CONTENT_LENGTH, HeaderValue::from(meta.len()));
    if let Ok(value) = HeaderValue::from_str(&content_disposition(store_path::file_name(path))) {
        headers.insert(CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

fn query_params(parts: &Parts) -> HashMap<String, String> {
    let query = parts.uri.query().unwrap_or_default();
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// Read a form-urlencoded header value.
fn decoded_header(headers: &HeaderMap, name: &str) -> Result<String, ApiError> {
    let raw = headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| StoreError::invalid(format!("Missing '{name}' header")))?;
    Ok(decode_form_value(raw).into_owned())
}

fn decode_form_value(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['%', '+']) {
        return Cow::Borrowed(raw);
    }
    let decoded: String = form_urlencoded::parse(format!("v={raw}").as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();
    Cow::Owned(decoded)
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 name.
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut encoded = String::with_capacity(name.len() * 3);
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StoreError::Io {
            path: PathBuf::new(),
            source: std::io::Error::other(e),
        })?;
    Ok(result?)
}
