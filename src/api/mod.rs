//! Granola API client and models
//!
//! `client` drives credentials and pagination, `transport` talks HTTP,
//! `models` holds the request/response shapes.

pub mod client;
pub mod models;
pub mod transport;

pub use client::{GranolaApiClient, DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_LIMIT};
pub use models::{Document, DocumentsRequest, DocumentsResponse};
pub use transport::{DocumentTransport, HttpTransport};
