use tracing::{debug, error, info, warn};

use crate::api::models::{Document, DocumentsRequest};
use crate::api::transport::{DocumentTransport, HttpTransport};
use crate::config::config::PaginationConfig;
use crate::config::Config;
use crate::credentials::{Clock, CredentialStore, SystemClock};
use crate::error::{GranolaError, Result};
use crate::search_filter::SearchFilter;

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Client for Granola's `get-documents` endpoint.
///
/// Every operation runs sequentially on the caller's thread. The credential
/// cache belongs to this instance, which is why fetches take `&mut self`.
pub struct GranolaApiClient<T = HttpTransport, C = SystemClock> {
    transport: T,
    credentials: CredentialStore<C>,
    page_size: usize,
    max_offset: usize,
}

impl GranolaApiClient {
    /// Build a client from the user's config file and environment
    pub fn new() -> Result<Self> {
        let config = Config::load().map_err(|e| GranolaError::Config(e.to_string()))?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        if config.pagination.page_size == 0 {
            return Err(GranolaError::Config(
                "pagination.page_size must be greater than zero".to_string(),
            ));
        }

        let transport = HttpTransport::new(&config.api)?;
        let credentials = CredentialStore::from_config(&config.credentials)?;
        Ok(Self::with_parts(transport, credentials, &config.pagination))
    }
}

impl<T: DocumentTransport, C: Clock> GranolaApiClient<T, C> {
    /// A zero page size is bumped to one so aggregation always advances
    pub fn with_parts(
        transport: T,
        credentials: CredentialStore<C>,
        pagination: &PaginationConfig,
    ) -> Self {
        Self {
            transport,
            credentials,
            page_size: pagination.page_size.max(1),
            max_offset: pagination.max_offset,
        }
    }

    pub fn credentials(&self) -> &CredentialStore<C> {
        &self.credentials
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch a single page of documents
    pub fn fetch_documents(&mut self, limit: usize, offset: usize) -> Result<Vec<Document>> {
        let token = self
            .credentials
            .get_valid()
            .ok_or(GranolaError::AuthUnavailable)?;

        let request = DocumentsRequest::page(limit, offset);
        debug!(limit, offset, "Requesting documents page");

        match self.transport.post_documents(&token, &request) {
            Ok(response) => {
                let docs = response.into_docs();
                debug!(offset, count = docs.len(), "Received documents page");
                Ok(docs)
            }
            Err(e) => {
                error!(offset, "Error fetching documents from Granola API: {}", e);
                Err(e)
            }
        }
    }

    /// Page through the whole corpus.
    ///
    /// Stops at the first empty page, or once the offset passes `max_offset`.
    /// Any page error aborts the walk and the pages gathered so far are dropped.
    pub fn get_all_documents(&mut self) -> Result<Vec<Document>> {
        let mut all_docs = Vec::new();
        let mut offset = 0;

        loop {
            let docs = self.fetch_documents(self.page_size, offset)?;
            if docs.is_empty() {
                break;
            }
            all_docs.extend(docs);

            offset += self.page_size;
            if offset > self.max_offset {
                warn!(
                    offset,
                    max_offset = self.max_offset,
                    "Stopped paging at the offset ceiling; later documents were not fetched"
                );
                break;
            }
        }

        info!(count = all_docs.len(), "Fetched all documents");
        Ok(all_docs)
    }

    /// Case-insensitive substring search over title, markdown and content
    pub fn search_documents(&mut self, query: &str, limit: usize) -> Result<Vec<Document>> {
        let all_docs = self.get_all_documents()?;
        let found = SearchFilter::filter_documents(all_docs, query, limit);
        debug!(query, matches = found.len(), "Searched documents");
        Ok(found)
    }

    /// `Ok(None)` when no fetched document carries this id
    pub fn get_document_by_id(&mut self, id: &str) -> Result<Option<Document>> {
        let all_docs = self.get_all_documents()?;
        Ok(SearchFilter::find_by_id(all_docs, id))
    }
}
