use std::time::Duration;

use reqwest::Client;

use super::error::WavespeedError;
use super::types::{ApiEnvelope, PredictionData, SubmitRequest};

pub const DEFAULT_API_BASE: &str = "https://api.wavespeed.ai/api/v3";
const SUBMIT_PATH: &str = "/wavespeed-ai/wan-2.2/image-to-video-lora";

/// Thin HTTP client for the WaveSpeed prediction API.
///
/// One method per wire call; retry and state bookkeeping live in the
/// callers. The base URL is injectable so tests can point at a mock server.
pub struct WavespeedClient {
    api_key: String,
    client: Client,
    base_url: String,
}

impl WavespeedClient {
    pub fn new(api_key: String, base_url: String, request_timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(request_timeout)
            .build()
            .expect("failed to build HTTP client");
        Self {
            api_key,
            client,
            base_url,
        }
    }

    /// POST one generation request. Returns the prediction id.
    ///
    /// Maps HTTP 429 to [`WavespeedError::RateLimited`], any other non-2xx
    /// to [`WavespeedError::ApiError`], and a 2xx body without an id to
    /// [`WavespeedError::MissingRequestId`]. Never retries.
    pub async fn submit(&self, req: &SubmitRequest) -> Result<String, WavespeedError> {
        let url = format!("{}{SUBMIT_PATH}", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return Err(WavespeedError::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(WavespeedError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let envelope = response.json::<ApiEnvelope>().await?;
        envelope
            .request_id()
            .ok_or(WavespeedError::MissingRequestId)
    }

    /// GET the current state of one prediction.
    pub async fn poll(&self, request_id: &str) -> Result<PredictionData, WavespeedError> {
        let url = format!("{}/predictions/{request_id}/result", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(WavespeedError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let envelope = response.json::<ApiEnvelope>().await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// Fetch a produced artifact from its (absolute) result URL.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, WavespeedError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WavespeedError::ApiError {
                status: status.as_u16(),
                message: "download failed".to_string(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> WavespeedClient {
        WavespeedClient::new(
            "test-key".into(),
            server.uri(),
            Duration::from_secs(5),
        )
    }

    fn sample_request() -> SubmitRequest {
        SubmitRequest {
            image: "data:image/jpeg;base64,aGk=".into(),
            prompt: "slow pan".into(),
            duration: 5,
            loras: vec![],
            high_noise_loras: vec![],
            low_noise_loras: vec![],
        }
    }

    #[tokio::test]
    async fn submit_returns_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SUBMIT_PATH))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"duration": 5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": "req-42"}
            })))
            .mount(&server)
            .await;

        let id = test_client(&server).submit(&sample_request()).await.unwrap();
        assert_eq!(id, "req-42");
    }

    #[tokio::test]
    async fn submit_maps_429_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SUBMIT_PATH))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .submit(&sample_request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WavespeedError::RateLimited {
                retry_after_ms: 3000
            }
        ));
    }

    #[tokio::test]
    async fn submit_maps_500_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SUBMIT_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .submit(&sample_request())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 500: boom");
    }

    #[tokio::test]
    async fn submit_without_id_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SUBMIT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .submit(&sample_request())
            .await
            .unwrap_err();
        assert!(matches!(err, WavespeedError::MissingRequestId));
    }

    #[tokio::test]
    async fn poll_parses_completed_prediction() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/predictions/req-42/result"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "id": "req-42",
                    "status": "completed",
                    "outputs": ["https://cdn.example.com/a.mp4"]
                }
            })))
            .mount(&server)
            .await;

        let data = test_client(&server).poll("req-42").await.unwrap();
        assert_eq!(data.status.as_deref(), Some("completed"));
        assert_eq!(data.outputs[0], "https://cdn.example.com/a.mp4");
    }

    #[tokio::test]
    async fn download_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/video.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4data".to_vec()))
            .mount(&server)
            .await;

        let url = format!("{}/video.mp4", server.uri());
        let bytes = test_client(&server).download(&url).await.unwrap();
        assert_eq!(bytes, b"mp4data");
    }

    #[tokio::test]
    async fn download_non_2xx_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/gone.mp4", server.uri());
        let err = test_client(&server).download(&url).await.unwrap_err();
        assert!(matches!(err, WavespeedError::ApiError { status: 404, .. }));
    }
}
