use crate::domain::model::{CurrencyCode, RateMap};
use crate::domain::ports::RateProvider;
use crate::utils::error::{Result, WizardError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

/// Rate provider for frankfurter-style endpoints: `GET <endpoint>?from=GBP&to=EUR,USD`.
#[derive(Debug, Clone)]
pub struct HttpRateProvider {
    client: Client,
    endpoint: Url,
}

impl HttpRateProvider {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| WizardError::InvalidConfigValueError {
            field: "rates.endpoint".to_string(),
            value: endpoint.to_string(),
            reason: format!("Invalid URL format: {}", e),
        })?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    fn request_url(&self, base: &CurrencyCode, targets: &[CurrencyCode]) -> Url {
        let to = targets
            .iter()
            .map(CurrencyCode::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("from", base.as_str())
            .append_pair("to", &to);
        url
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn fetch_rates(&self, base: &CurrencyCode, targets: &[CurrencyCode]) -> Result<RateMap> {
        let url = self.request_url(base, targets);
        tracing::debug!("Making rate request to: {}", url);

        let response = self.client.get(url).send().await?;
        tracing::debug!("Rate response status: {}", response.status());

        if !response.status().is_success() {
            return Err(WizardError::RateProviderError {
                message: format!("rate endpoint returned {}", response.status()),
            });
        }

        let body: RatesResponse = response.json().await?;
        Ok(body
            .rates
            .into_iter()
            .map(|(code, rate)| (CurrencyCode::new(code), rate))
            .collect())
    }
}
