use super::util::with_retry;
use crate::core::currency::CurrencyCode;
use crate::core::error::{FxError, Result};
use crate::core::rates::{RateTable, RateTableProvider};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, error, instrument};

/// Rate tables from exchangerate-api.com.
///
/// Without an API key the open `v4` endpoint is used; with one, the keyed
/// `v6` endpoint.
pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("cambio/1.0")
            .build()
            .map_err(FxError::upstream)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
            client,
        })
    }

    fn latest_url(&self, base: &CurrencyCode) -> String {
        match &self.api_key {
            Some(key) => format!("{}/v6/{}/latest/{}", self.base_url, key, base),
            None => format!("{}/v4/latest/{}", self.base_url, base),
        }
    }
}

/// Both envelope versions; `v6` field names are accepted as aliases.
#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default, rename = "error-type")]
    error_type: Option<String>,
    #[serde(default, alias = "base_code")]
    base: Option<String>,
    #[serde(default, alias = "time_last_update_unix")]
    time_last_updated: Option<i64>,
    #[serde(default, alias = "conversion_rates")]
    rates: Option<BTreeMap<String, f64>>,
}

fn parse_table(base: &CurrencyCode, data: LatestResponse) -> Result<RateTable> {
    if data.result.as_deref() == Some("error") {
        return match data.error_type.as_deref() {
            Some("unsupported-code") => Err(FxError::InvalidBaseCurrency(base.clone())),
            other => Err(FxError::UpstreamUnavailable(format!(
                "API error: {}",
                other.unwrap_or("unknown")
            ))),
        };
    }

    let reported_base = data
        .base
        .ok_or_else(|| FxError::upstream(format!("No base currency in response for {base}")))?;
    if reported_base.parse::<CurrencyCode>().ok().as_ref() != Some(base) {
        return Err(FxError::UpstreamUnavailable(format!(
            "Requested base {base} but received {reported_base}"
        )));
    }

    let raw_rates = data
        .rates
        .ok_or_else(|| FxError::upstream(format!("No rates in response for {base}")))?;
    let rates = raw_rates
        .into_iter()
        .map(|(code, rate)| Ok((code.parse::<CurrencyCode>()?, rate)))
        .collect::<Result<BTreeMap<_, _>>>()
        .map_err(FxError::upstream)?;

    let fetched_at: DateTime<Utc> = data
        .time_last_updated
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .unwrap_or_else(Utc::now);

    RateTable::new(base.clone(), rates, fetched_at).map_err(FxError::upstream)
}

#[async_trait]
impl RateTableProvider for ExchangeRateApiProvider {
    #[instrument(name = "ExchangeRateFetch", skip(self), fields(base = %base))]
    async fn fetch(&self, base: &CurrencyCode) -> Result<RateTable> {
        let url = self.latest_url(base);
        debug!("Requesting rate table from {}", self.base_url);

        let response = with_retry(|| async { self.client.get(&url).send().await }, 3, 500)
            .await
            .map_err(|e| FxError::UpstreamUnavailable(format!("Request error for {base}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FxError::InvalidBaseCurrency(base.clone()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| FxError::UpstreamUnavailable(format!("Failed to read response: {e}")))?;

        // v6 reports unsupported codes with a 4xx status and an error envelope.
        let parsed = serde_json::from_str::<LatestResponse>(&text);
        if !status.is_success() {
            if let Ok(data) = parsed {
                if data.error_type.as_deref() == Some("unsupported-code") {
                    return Err(FxError::InvalidBaseCurrency(base.clone()));
                }
            }
            return Err(FxError::UpstreamUnavailable(format!(
                "HTTP error: {status} for base: {base}"
            )));
        }

        let data = parsed.map_err(|e| {
            error!(error = ?e, response = %text, "Failed to parse rate response");
            FxError::UpstreamUnavailable(format!("Failed to parse JSON response for {base}: {e}"))
        })?;
        parse_table(base, data)
    }

    fn name(&self) -> &str {
        "exchangerate-api"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::tests::code;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(request_path: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_v4_fetch() {
        let mock_response = r#"{
            "provider": "https://www.exchangerate-api.com",
            "base": "USD",
            "date": "2024-05-01",
            "time_last_updated": 1714521601,
            "rates": {"USD": 1, "EUR": 0.92, "GBP": 0.79}
        }"#;
        let mock_server = create_mock_server("/v4/latest/USD", 200, mock_response).await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), None).unwrap();
        let table = provider.fetch(&code("USD")).await.unwrap();

        assert_eq!(table.base(), &code("USD"));
        assert_eq!(table.rates().len(), 3);
        assert_eq!(table.rate_of(&code("EUR")), Some(0.92));
        assert_eq!(table.fetched_at().timestamp(), 1714521601);
    }

    #[tokio::test]
    async fn test_successful_v6_fetch() {
        let mock_response = r#"{
            "result": "success",
            "base_code": "EUR",
            "time_last_update_unix": 1714521601,
            "conversion_rates": {"EUR": 1, "USD": 1.08, "JPY": 161.12}
        }"#;
        let mock_server =
            create_mock_server("/v6/test-key/latest/EUR", 200, mock_response).await;

        let provider =
            ExchangeRateApiProvider::new(&mock_server.uri(), Some("test-key")).unwrap();
        let table = provider.fetch(&code("EUR")).await.unwrap();

        assert_eq!(table.base(), &code("EUR"));
        assert_eq!(table.rate_of(&code("JPY")), Some(161.12));
    }

    #[tokio::test]
    async fn test_v6_unsupported_code() {
        let mock_response = r#"{"result": "error", "error-type": "unsupported-code"}"#;
        let mock_server =
            create_mock_server("/v6/test-key/latest/XYZ", 404, mock_response).await;

        let provider =
            ExchangeRateApiProvider::new(&mock_server.uri(), Some("test-key")).unwrap();
        let result = provider.fetch(&code("XYZ")).await;
        assert_eq!(result, Err(FxError::InvalidBaseCurrency(code("XYZ"))));

        let mock_server =
            create_mock_server("/v6/test-key/latest/XYZ", 200, mock_response).await;
        let provider =
            ExchangeRateApiProvider::new(&mock_server.uri(), Some("test-key")).unwrap();
        let result = provider.fetch(&code("XYZ")).await;
        assert_eq!(result, Err(FxError::InvalidBaseCurrency(code("XYZ"))));
    }

    #[tokio::test]
    async fn test_v6_other_api_error() {
        let mock_response = r#"{"result": "error", "error-type": "quota-reached"}"#;
        let mock_server =
            create_mock_server("/v6/test-key/latest/USD", 200, mock_response).await;

        let provider =
            ExchangeRateApiProvider::new(&mock_server.uri(), Some("test-key")).unwrap();
        let result = provider.fetch(&code("USD")).await;
        assert_eq!(
            result,
            Err(FxError::UpstreamUnavailable(
                "API error: quota-reached".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_unknown_base_is_not_found() {
        let mock_server = create_mock_server("/v4/latest/ABC", 404, "Not Found").await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), None).unwrap();
        let result = provider.fetch(&code("ABC")).await;
        assert_eq!(result, Err(FxError::InvalidBaseCurrency(code("ABC"))));
    }

    #[tokio::test]
    async fn test_server_error() {
        let mock_server = create_mock_server("/v4/latest/USD", 500, "").await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), None).unwrap();
        let result = provider.fetch(&code("USD")).await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Rate source unavailable: HTTP error: 500 Internal Server Error for base: USD"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server = create_mock_server("/v4/latest/USD", 200, "<html>oops</html>").await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), None).unwrap();
        let err = provider.fetch(&code("USD")).await.unwrap_err();
        assert!(matches!(err, FxError::UpstreamUnavailable(_)));
        assert!(
            err.to_string()
                .contains("Failed to parse JSON response for USD")
        );
    }

    #[tokio::test]
    async fn test_invalid_rate_values() {
        let mock_response = r#"{"base": "USD", "rates": {"USD": 1, "EUR": -0.92}}"#;
        let mock_server = create_mock_server("/v4/latest/USD", 200, mock_response).await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), None).unwrap();
        let result = provider.fetch(&code("USD")).await;
        assert!(matches!(result, Err(FxError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_mismatched_base() {
        let mock_response = r#"{"base": "EUR", "rates": {"EUR": 1, "USD": 1.08}}"#;
        let mock_server = create_mock_server("/v4/latest/USD", 200, mock_response).await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), None).unwrap();
        let err = provider.fetch(&code("USD")).await.unwrap_err();
        assert_eq!(
            err,
            FxError::UpstreamUnavailable("Requested base USD but received EUR".to_string())
        );
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // Nothing listens on port 9 on the loopback interface.
        let provider = ExchangeRateApiProvider::new("http://127.0.0.1:9", None).unwrap();
        let result = provider.fetch(&code("USD")).await;
        assert!(matches!(result, Err(FxError::UpstreamUnavailable(_))));
    }
}
