//! HTTP API for burrow stores.
//!
//! A small hyper server exposing listing, search, the folder tree, uploads,
//! downloads, and every batch operation of [`burrow_ops`]. Errors are sent
//! as JSON `{"message": ...}` bodies with a status derived from the
//! store's error taxonomy.

mod body;
mod error;
mod routes;
mod server;
mod state;

pub use error::{ApiError, ServerError, status_for};
pub use routes::{FILE_NAME_HEADER, UPLOAD_PATH_HEADER};
pub use server::ApiServer;
pub use state::AppState;
