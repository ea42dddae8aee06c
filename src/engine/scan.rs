use crate::abstractions::Scanner;
use crate::domain::{
    HealthStatus, ReportRequestBody, ScanRequestBody, ScanResponseBody, ScanVerdict, Vote,
};
use crate::error::{GuardError, Result};
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

/// Client for the reputation service (`/scan`, `/report`, `/health`).
///
/// No retries: one failed round trip is one failed scan.
#[derive(Debug, Clone)]
pub struct HttpScanClient {
    client: Client,
    base_url: String,
}

impl HttpScanClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().redirect(reqwest::redirect::Policy::limited(10));

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|err| GuardError::Network(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    pub async fn scan_url(&self, url: &str) -> Result<ScanVerdict> {
        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint("scan"))
            .json(&ScanRequestBody { url })
            .send()
            .await
            .map_err(|err| GuardError::Network(format!("Scan request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error("scan", status));
        }

        let body: ScanResponseBody = response
            .json()
            .await
            .map_err(|err| GuardError::Network(format!("Invalid scan response: {err}")))?;

        tracing::debug!(
            url = %url,
            safe = body.safe,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "scan result"
        );
        Ok(body.into())
    }

    pub async fn report_url(&self, url: &str, vote: Vote) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("report"))
            .json(&ReportRequestBody { url, vote })
            .send()
            .await
            .map_err(|err| GuardError::Network(format!("Report request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(url = %url, status = status.as_u16(), body = %body, "report rejected");
            return Err(status_error("report", status));
        }
        Ok(())
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self
            .client
            .get(self.endpoint("health"))
            .send()
            .await
            .map_err(|err| GuardError::Network(format!("Health request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error("health", status));
        }

        response
            .json()
            .await
            .map_err(|err| GuardError::Network(format!("Invalid health response: {err}")))
    }
}

fn status_error(endpoint: &str, status: StatusCode) -> GuardError {
    GuardError::Network(format!(
        "{endpoint} returned {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    ))
}

impl Scanner for HttpScanClient {
    fn scan(&self, url: &str) -> Pin<Box<dyn Future<Output = Result<ScanVerdict>> + Send + '_>> {
        let url = url.to_string();
        Box::pin(async move { self.scan_url(&url).await })
    }

    fn report(
        &self,
        url: &str,
        vote: Vote,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let url = url.to_string();
        Box::pin(async move { self.report_url(&url, vote).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ReasonCategory;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn scan_posts_url_and_parses_verdict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scan"))
            .and(body_json(json!({"url": "http://evil.example/"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "safe": false,
                "reason": "malware",
                "score": 0.93
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpScanClient::new(&server.uri(), None).unwrap();
        let verdict = client.scan("http://evil.example/").await.unwrap();

        assert!(!verdict.safe);
        assert_eq!(verdict.score, Some(0.93));
        assert_eq!(verdict.reason.unwrap().category, ReasonCategory::Malware);
    }

    #[tokio::test]
    async fn scan_without_reason_is_safe() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scan"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"safe": true})))
            .mount(&server)
            .await;

        let client = HttpScanClient::new(&format!("{}/", server.uri()), None).unwrap();
        let verdict = client.scan("https://ok.example/").await.unwrap();
        assert_eq!(verdict, ScanVerdict::safe());
    }

    #[tokio::test]
    async fn scan_non_success_status_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scan"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = HttpScanClient::new(&server.uri(), None).unwrap();
        let err = client.scan("https://x.example/").await.unwrap_err();
        assert!(matches!(err, GuardError::Network(msg) if msg.contains("500")));
    }

    #[tokio::test]
    async fn scan_malformed_body_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scan"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = HttpScanClient::new(&server.uri(), None).unwrap();
        assert!(matches!(
            client.scan("https://x.example/").await,
            Err(GuardError::Network(_))
        ));
    }

    #[tokio::test]
    async fn scan_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scan"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"safe": true}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = HttpScanClient::new(&server.uri(), Some(Duration::from_millis(50))).unwrap();
        assert!(matches!(
            client.scan("https://slow.example/").await,
            Err(GuardError::Network(_))
        ));
    }

    #[tokio::test]
    async fn transport_failure_is_network_error() {
        // Nothing listens on this port once the server is dropped.
        let uri = {
            let server = MockServer::start().await;
            server.uri()
        };
        let client = HttpScanClient::new(&uri, Some(Duration::from_secs(2))).unwrap();
        assert!(matches!(
            client.scan("http://slow.example/").await,
            Err(GuardError::Network(_))
        ));
    }

    #[tokio::test]
    async fn report_sends_safe_vote() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/report"))
            .and(body_json(json!({"url": "http://evil.example/", "vote": "safe"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "recorded",
                "vote": "safe"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpScanClient::new(&server.uri(), None).unwrap();
        client.report("http://evil.example/", Vote::Safe).await.unwrap();
    }

    #[tokio::test]
    async fn health_reads_model_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "model_loaded": true
            })))
            .mount(&server)
            .await;

        let client = HttpScanClient::new(&server.uri(), None).unwrap();
        let health = client.health().await.unwrap();
        assert_eq!(health.status, "ok");
        assert!(health.model_loaded);
    }
}
