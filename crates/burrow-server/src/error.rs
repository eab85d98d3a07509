//! Mapping from store errors to HTTP responses.

use std::io;

use burrow_core::{ErrorKind, StoreError};
use hyper::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::body::{ResponseBody, json_response};

/// Errors raised while bringing the server up.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The store could not be opened.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Binding or accepting failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Failure of a single request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Request body too large (limit {limit} bytes)")]
    BodyTooLarge { limit: usize },

    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("Not found")]
    NoRoute,

    #[error("Method not allowed")]
    MethodNotAllowed { allow: &'static str },
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(err) => status_for(err.kind()),
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NoRoute => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Render as a JSON `{"message": ...}` response.
    pub fn into_response(self) -> hyper::Response<ResponseBody> {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            warn!(%status, %message, "Request failed");
        } else {
            debug!(%status, %message, "Request rejected");
        }

        let mut response = json_response(status, &ErrorBody { message: &message });
        if let Self::MethodNotAllowed { allow } = self {
            response
                .headers_mut()
                .insert(hyper::header::ALLOW, hyper::header::HeaderValue::from_static(allow));
        }
        response
    }
}

/// Status code for a store error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::AccessDenied => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Unsupported => StatusCode::NOT_IMPLEMENTED,
        ErrorKind::PartialFailure | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
