//! Request and response body helpers.

use std::io;

use bytes::Bytes;
use futures::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, BodyStream, Empty, Full, LengthLimitError, Limited, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncRead;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::error::ApiError;

/// Body type of every response the server sends.
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

pub fn full(bytes: impl Into<Bytes>) -> ResponseBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn empty() -> ResponseBody {
    Empty::new().map_err(|never| match never {}).boxed_unsync()
}

/// Stream an async reader as the response body.
pub fn stream<R>(reader: R) -> ResponseBody
where
    R: AsyncRead + Send + 'static,
{
    StreamBody::new(ReaderStream::new(reader).map_ok(Frame::data)).boxed_unsync()
}

/// Response with no content and the given status.
pub fn status_response(status: StatusCode) -> Response<ResponseBody> {
    let mut response = Response::new(empty());
    *response.status_mut() = status;
    response
}

/// Serialize `value` as a JSON response.
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<ResponseBody> {
    let (status, bytes) = match serde_json::to_vec(value) {
        Ok(bytes) => (status, bytes),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!(r#"{{"message":"Failed to encode response: {e}"}}"#).into_bytes(),
        ),
    };

    let mut response = Response::new(full(bytes));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Buffer a JSON request body of at most `limit` bytes.
pub async fn read_json<T: DeserializeOwned>(body: Incoming, limit: usize) -> Result<T, ApiError> {
    let collected = Limited::new(body, limit).collect().await.map_err(|e| {
        if e.downcast_ref::<LengthLimitError>().is_some() {
            ApiError::BodyTooLarge { limit }
        } else {
            ApiError::BadRequest(e.to_string())
        }
    })?;

    serde_json::from_slice(&collected.to_bytes()).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// View a request body as an async byte reader.
///
/// Non-data frames such as trailers are skipped.
pub fn body_reader(body: Incoming) -> impl AsyncRead + Send + Unpin {
    let frames = BodyStream::new(body).map_ok(|frame| frame.into_data().unwrap_or_default());
    StreamReader::new(frames.map_err(io::Error::other))
}
