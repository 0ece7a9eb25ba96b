use async_trait::async_trait;
use pacstrack_config::ClientConfig;
use pacstrack_model::{
    DataEnvelope, Device, DiscoveryQuery, DiscoveryResponse, ProgressReport, Record,
    StudySearchQuery, TaskActionRequest, TaskRecord, TransferRequest, TransferResponse,
};
use reqwest::{Client, RequestBuilder};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ApiService, routes};
use crate::error::{ApiError, ApiResult};

/// How long a request may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deadline {
    /// Polls and short commands.
    Bounded,
    /// Job requests; they finish when the server finishes the job.
    Unbounded,
}

/// HTTP client for the storage server
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    request_timeout: Option<Duration>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: impl Into<String>, request_timeout: Option<Duration>) -> ApiResult<Self> {
        // "localhost:5000" is rejected by reqwest; add a scheme and trim the
        // trailing slash so joined paths never double up.
        fn normalize(raw: String) -> String {
            let trimmed = raw.trim().trim_end_matches('/').to_string();
            let with_scheme = if trimmed.starts_with("http://")
                || trimmed.starts_with("https://")
            {
                trimmed
            } else {
                format!("http://{}", trimmed)
            };
            if with_scheme != raw {
                warn!(
                    "[ApiClient] Normalized base URL from '{}' to '{}'",
                    raw, with_scheme
                );
            }
            with_scheme
        }

        let base_url = normalize(base_url.into());
        let client = Client::builder()
            .build()
            .map_err(|err| ApiError::transport(&base_url, err.to_string()))?;

        info!(
            "[ApiClient] Creating new API client with base URL: {}",
            base_url
        );

        Ok(Self {
            client,
            base_url,
            request_timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> ApiResult<Self> {
        Self::new(config.server_url.clone(), config.request_timeout())
    }

    pub fn build_url(&self, path: impl AsRef<str>) -> String {
        let p = path.as_ref();
        if p.starts_with("http://") || p.starts_with("https://") {
            return p.to_string();
        }
        format!("{}/{}", self.base_url, p.trim_start_matches('/'))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn with_deadline(&self, request: RequestBuilder, deadline: Deadline) -> RequestBuilder {
        match (deadline, self.request_timeout) {
            (Deadline::Bounded, Some(timeout)) => request.timeout(timeout),
            _ => request,
        }
    }

    /// Send a request and hand back the successful body.
    async fn send(&self, url: &str, request: RequestBuilder) -> ApiResult<Vec<u8>> {
        let response = request
            .send()
            .await
            .map_err(|err| ApiError::transport(url, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| ApiError::transport(url, err.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn execute_request<T: DeserializeOwned>(
        &self,
        url: &str,
        request: RequestBuilder,
    ) -> ApiResult<T> {
        let body = self.send(url, request).await?;
        serde_json::from_slice(&body)
            .map_err(|err| ApiError::malformed(url, err.to_string()))
    }

    /// GET a resource wrapped in the `{"data": ...}` envelope.
    pub async fn get_data<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.build_url(path);
        debug!("GET request to: {}", url);

        let request = self.with_deadline(self.client.get(&url), Deadline::Bounded);
        let envelope: DataEnvelope<T> = self.execute_request(&url, request).await?;
        Ok(envelope.data)
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        deadline: Deadline,
    ) -> ApiResult<R> {
        let url = self.build_url(path);
        debug!("POST request to: {}", url);

        let request = self.with_deadline(self.client.post(&url).json(body), deadline);
        self.execute_request(&url, request).await
    }
}

#[async_trait]
impl ApiService for ApiClient {
    async fn fetch_devices(&self) -> ApiResult<Vec<Device>> {
        self.get_data(routes::DEVICES).await
    }

    async fn find_missing_series(&self, query: &DiscoveryQuery) -> ApiResult<DiscoveryResponse> {
        self.post(routes::FIND_MISSING_SERIES, query, Deadline::Unbounded)
            .await
    }

    async fn check_storage_progress(&self) -> ApiResult<ProgressReport> {
        self.get_data(routes::STORAGE_PROGRESS).await
    }

    async fn search_studies(&self, query: &StudySearchQuery) -> ApiResult<Vec<Record>> {
        let envelope: DataEnvelope<Vec<Record>> = self
            .post(routes::SEARCH_STUDIES, query, Deadline::Unbounded)
            .await?;
        Ok(envelope.data)
    }

    async fn fetch_study_series(&self, study: &Record) -> ApiResult<Vec<Record>> {
        let envelope: DataEnvelope<Vec<Record>> = self
            .post(routes::STUDY_SERIES, study, Deadline::Unbounded)
            .await?;
        Ok(envelope.data)
    }

    async fn fetch_tasks(&self) -> ApiResult<Vec<TaskRecord>> {
        self.get_data(routes::TASKS).await
    }

    async fn task_action(&self, request: &TaskActionRequest) -> ApiResult<()> {
        let url = self.build_url(routes::TASK_ACTION);
        debug!("POST request to: {}", url);

        let builder = self.with_deadline(
            self.client.post(&url).json(request),
            Deadline::Bounded,
        );
        self.send(&url, builder).await.map(|_| ())
    }

    async fn transfer(&self, request: &TransferRequest) -> ApiResult<TransferResponse> {
        self.post(routes::MOVE, request, Deadline::Bounded).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_scheme_and_loses_trailing_slash() {
        let client = ApiClient::new("localhost:5000/", None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(
            client.build_url(routes::TASKS),
            "http://localhost:5000/get_tasks_table"
        );
    }

    #[test]
    fn absolute_urls_pass_through() {
        let client = ApiClient::new("https://storage.local", None).unwrap();
        assert_eq!(
            client.build_url("https://other.local/move"),
            "https://other.local/move"
        );
    }
}
