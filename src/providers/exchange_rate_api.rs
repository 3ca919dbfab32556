use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use tracing::{debug, error, instrument};

use crate::core::currency::{BASE_CURRENCY, RateError, RateSource};

/// Rate source backed by the ExchangeRate-API pair endpoint.
pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PairResponse {
    conversion_rate: Option<f64>,
}

#[async_trait]
impl RateSource for ExchangeRateApiProvider {
    #[instrument(name = "ExchangeRateFetch", skip(self))]
    async fn fetch_rate(&self, currency: &str) -> Result<Decimal, RateError> {
        let api_key = self.api_key.as_deref().ok_or(RateError::MissingApiKey)?;

        let url = format!(
            "{}/{}/pair/{}/{}",
            self.base_url, api_key, BASE_CURRENCY, currency
        );
        debug!("Requesting exchange rate");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RateError::Upstream(format!("Request error: {}", e.without_url())))?;

        let status = response.status();
        debug!(%status, "Received exchange rate response");
        if !status.is_success() {
            return Err(RateError::Upstream(format!("HTTP error: {status}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| {
                RateError::Upstream(format!("Failed to read response: {}", e.without_url()))
            })?;

        let data: PairResponse = match serde_json::from_str(&text) {
            Ok(data) => data,
            Err(e) => {
                error!(error = ?e, "Failed to parse exchange rate response");
                return Err(RateError::Upstream(format!("Invalid JSON response: {e}")));
            }
        };

        data.conversion_rate
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .and_then(Decimal::from_f64)
            .ok_or_else(|| RateError::Upstream(format!("{currency} rate not available")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const API_KEY: &str = "test-key";

    async fn create_mock_server(target: &str, response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/{API_KEY}/pair/USD/{target}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_response = r#"{
            "result": "success",
            "base_code": "USD",
            "target_code": "TTD",
            "conversion_rate": 6.72
        }"#;
        let mock_server = create_mock_server(
            "TTD",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), Some(API_KEY.to_string()));
        let rate = provider.fetch_rate("TTD").await.expect("Failed to get rate");
        assert_eq!(rate.round_dp(6), Decimal::from_str("6.72").unwrap());
    }

    #[tokio::test]
    async fn test_missing_api_key_skips_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), None);
        let result = provider.fetch_rate("TTD").await;
        assert_eq!(result.unwrap_err(), RateError::MissingApiKey);
    }

    #[tokio::test]
    async fn test_api_error_response() {
        let mock_server = create_mock_server("EUR", ResponseTemplate::new(500)).await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), Some(API_KEY.to_string()));
        let result = provider.fetch_rate("EUR").await;
        assert_eq!(
            result.unwrap_err(),
            RateError::Upstream("HTTP error: 500 Internal Server Error".to_string())
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server = create_mock_server(
            "EUR",
            ResponseTemplate::new(200).set_body_string("<html>oops</html>"),
        )
        .await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), Some(API_KEY.to_string()));
        let err = provider.fetch_rate("EUR").await.unwrap_err();
        assert!(err.to_string().contains("Invalid JSON response"));
    }

    #[tokio::test]
    async fn test_missing_or_non_positive_rate() {
        for body in [
            r#"{"result": "error", "error-type": "unsupported-code"}"#,
            r#"{"conversion_rate": 0}"#,
            r#"{"conversion_rate": -1.5}"#,
        ] {
            let mock_server =
                create_mock_server("XYZ", ResponseTemplate::new(200).set_body_string(body)).await;

            let provider =
                ExchangeRateApiProvider::new(&mock_server.uri(), Some(API_KEY.to_string()));
            let err = provider.fetch_rate("XYZ").await.unwrap_err();
            assert_eq!(err, RateError::Upstream("XYZ rate not available".to_string()));
        }
    }

    #[tokio::test]
    async fn test_unreachable_provider() {
        let mock_server = MockServer::start().await;
        let uri = mock_server.uri();
        drop(mock_server);

        let provider = ExchangeRateApiProvider::new(&uri, Some(API_KEY.to_string()));
        let err = provider.fetch_rate("TTD").await.unwrap_err();
        assert!(matches!(err, RateError::Upstream(_)));
    }
}
