use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};

use crate::api::models::{DocumentsRequest, DocumentsResponse};
use crate::config::config::ApiConfig;
use crate::error::{GranolaError, Result};

/// Delivers one `get-documents` request. The client drives pagination and
/// credentials on top of this.
pub trait DocumentTransport {
    fn post_documents(&self, token: &str, request: &DocumentsRequest)
        -> Result<DocumentsResponse>;
}

/// Blocking HTTP transport that impersonates the Granola desktop client
#[derive(Clone)]
pub struct HttpTransport {
    url: String,
    client_version: String,
    user_agent: String,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            url: config.url.clone(),
            client_version: config.client_version.clone(),
            user_agent: config.user_agent(),
            client,
        })
    }
}

impl DocumentTransport for HttpTransport {
    fn post_documents(
        &self,
        token: &str,
        request: &DocumentsRequest,
    ) -> Result<DocumentsResponse> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "*/*")
            .header(USER_AGENT, &self.user_agent)
            .header("X-Client-Version", &self.client_version)
            .json(request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(GranolaError::Api {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response.text()?;
        let parsed: DocumentsResponse = serde_json::from_str(&body)?;
        Ok(parsed)
    }
}
