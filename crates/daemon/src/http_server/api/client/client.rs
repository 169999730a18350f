use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use url::Url;

use super::error::ApiError;
use super::ApiRequest;
use crate::http_server::api::error::ErrorBody;

#[derive(Debug, Clone)]
pub struct ApiClient {
    remote: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(remote: &Url) -> Result<Self, ApiError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder().default_headers(default_headers).build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    pub async fn call<T: ApiRequest>(&self, request: T) -> Result<T::Response, ApiError> {
        let response = request.build_request(&self.remote, &self.client)?.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T::Response>().await?);
        }

        let text = response.text().await?;
        Err(match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => ApiError::Rejected {
                status,
                kind: body.kind,
                message: body.message,
            },
            Err(_) => ApiError::HttpStatus(status, text),
        })
    }

    /// Probe a status endpoint such as `/_status/livez`
    pub async fn probe(&self, path: &str) -> Result<reqwest::StatusCode, ApiError> {
        let url = self.remote.join(path)?;
        Ok(self.client.get(url).send().await?.status())
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }
}
