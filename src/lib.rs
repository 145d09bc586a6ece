pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod search_filter;
pub mod utils;

pub use api::{Document, GranolaApiClient, DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_LIMIT};
pub use credentials::{CredentialStatus, CredentialStore};
pub use error::{GranolaError, Result};
