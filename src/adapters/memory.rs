use crate::domain::model::{CurrencyCode, RateMap};
use crate::domain::ports::RateProvider;
use crate::utils::error::{Result, WizardError};
use crate::utils::validation::validate_currency_code;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serves a fixed rate table, or always fails.
///
/// Like the HTTP service, it rejects a base that is not a currency code.
#[derive(Debug, Default)]
pub struct FixedRateProvider {
    rates: RateMap,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl FixedRateProvider {
    pub fn new(rates: RateMap) -> Self {
        Self {
            rates,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            rates: RateMap::new(),
            failure: Some(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RateProvider for FixedRateProvider {
    async fn fetch_rates(&self, base: &CurrencyCode, targets: &[CurrencyCode]) -> Result<RateMap> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if let Some(message) = &self.failure {
            return Err(WizardError::RateProviderError {
                message: message.clone(),
            });
        }

        if validate_currency_code("base", base.as_str()).is_err() {
            return Err(WizardError::RateProviderError {
                message: format!("invalid base currency '{}'", base),
            });
        }

        tracing::debug!("Serving fixed rates from {} for {:?}", base, targets);
        Ok(targets
            .iter()
            .filter_map(|code| self.rates.get(code).map(|rate| (code.clone(), *rate)))
            .collect())
    }
}
