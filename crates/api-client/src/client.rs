//! Main API client implementation

use crate::config::ClientConfig;
use crate::endpoints::{GeocodingApi, SmsApi};
use crate::error::{ApiError, ApiResult};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, Span};
use uuid::Uuid;

/// Request correlation ID header
const X_REQUEST_ID: &str = "X-Request-ID";

/// HTTP client shared by the SMS and geocoding endpoints.
///
/// Failed requests are reported, never retried.
#[derive(Clone)]
pub struct GeoremindClient {
    inner: Client,
    config: Arc<ClientConfig>,
}

impl GeoremindClient {
    /// Create a new client with default configuration
    pub fn new() -> ApiResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with specific configuration
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|_| ApiError::config("user_agent contains invalid header characters"))?;
        default_headers.insert(USER_AGENT, user_agent);

        let inner = Client::builder()
            .default_headers(default_headers)
            .build()
            .map_err(ApiError::Request)?;

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Access the SMS relay
    #[must_use]
    pub fn sms(&self) -> SmsApi {
        SmsApi::new(self.clone())
    }

    /// Access place-name lookup
    #[must_use]
    pub fn geocoding(&self) -> GeocodingApi {
        GeocodingApi::new(self.clone())
    }

    /// GET an absolute URL with query parameters
    #[instrument(skip(self, query), fields(request_id))]
    pub async fn get_url<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> ApiResult<T> {
        let request = self.inner.get(url).query(query);
        self.execute(request, timeout).await
    }

    /// POST a JSON body to an absolute URL
    #[instrument(skip(self, body), fields(request_id))]
    pub async fn post_url<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
        timeout: Duration,
    ) -> ApiResult<T> {
        let request = self.inner.post(url).json(body);
        self.execute(request, timeout).await
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder, timeout: Duration) -> ApiResult<T> {
        let request_id = Uuid::new_v4().to_string();
        Span::current().record("request_id", request_id.as_str());

        let start = Instant::now();
        let result = request
            .header(X_REQUEST_ID, &request_id)
            .timeout(timeout)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                debug!(request_id = %request_id, error = %e, "Request failed");
                return Err(ApiError::Request(e));
            }
        };

        debug!(
            request_id = %request_id,
            status = response.status().as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Response received"
        );
        handle_response(response).await
    }
}

/// Deserialize a success body, or turn an error status into [`ApiError::ApiResponse`]
async fn handle_response<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();

    if status.is_success() {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    } else {
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ApiError::api_response(status.as_u16(), error_message(&text)))
    }
}

/// Prefer a JSON `{"error": "..."}` message over the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
