use crate::core::pricing::PriceTable;
use crate::domain::model::{Amount, BillingCycle, CurrencyCode, ItemId, RateMap};
use crate::domain::ports::RateProvider;
use crate::utils::error::{Result, WizardError};
use serde::{Deserialize, Serialize};

/// Shown in place of any price whose exchange rate is still unknown.
pub const PENDING_PLACEHOLDER: &str = "Loading...";

const NO_BREAK_SPACE: char = '\u{a0}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolPlacement {
    #[default]
    Prefix,
    Suffix,
}

fn default_group_separator() -> String {
    ",".to_string()
}

/// Display rules for one currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencySettings {
    pub code: CurrencyCode,
    pub locale: String,
    pub symbol: String,
    #[serde(default)]
    pub placement: SymbolPlacement,
    #[serde(default = "default_group_separator")]
    pub group_separator: String,
}

impl CurrencySettings {
    pub fn new(code: &str, locale: &str, symbol: &str) -> Self {
        Self {
            code: code.into(),
            locale: locale.to_string(),
            symbol: symbol.to_string(),
            placement: SymbolPlacement::Prefix,
            group_separator: default_group_separator(),
        }
    }

    pub fn with_placement(mut self, placement: SymbolPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_group_separator(mut self, separator: &str) -> Self {
        self.group_separator = separator.to_string();
        self
    }

    /// Formats `amount` rounded to whole units, half away from zero.
    pub fn format_whole(&self, amount: Amount) -> String {
        let rounded = amount.round();
        let digits = group_digits(rounded.abs() as u64, &self.group_separator);
        let sign = if rounded < 0.0 { "-" } else { "" };

        match self.placement {
            SymbolPlacement::Prefix => format!("{}{}{}", sign, self.symbol, digits),
            SymbolPlacement::Suffix => {
                format!("{}{}{}{}", sign, digits, NO_BREAK_SPACE, self.symbol)
            }
        }
    }
}

fn group_digits(value: u64, separator: &str) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3 * separator.len());
    for (i, ch) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}

/// Stock GBP, EUR and USD settings.
pub fn default_currency_settings() -> Vec<CurrencySettings> {
    vec![
        CurrencySettings::new("GBP", "en-GB", "£"),
        CurrencySettings::new("EUR", "de-DE", "€")
            .with_placement(SymbolPlacement::Suffix)
            .with_group_separator("."),
        CurrencySettings::new("USD", "en-US", "$"),
    ]
}

#[derive(Debug, Clone)]
pub struct CurrencyConverter {
    reference: CurrencyCode,
    rates: RateMap,
    settings: Vec<CurrencySettings>,
}

impl CurrencyConverter {
    pub fn new(reference: CurrencyCode, settings: Vec<CurrencySettings>) -> Result<Self> {
        if !settings.iter().any(|s| s.code == reference) {
            return Err(WizardError::ConfigError {
                message: format!("reference currency {} has no display settings", reference),
            });
        }

        let mut rates = RateMap::new();
        rates.insert(reference.clone(), 1.0);

        Ok(Self {
            reference,
            rates,
            settings,
        })
    }

    pub fn reference(&self) -> &CurrencyCode {
        &self.reference
    }

    pub fn currencies(&self) -> Vec<CurrencyCode> {
        self.settings.iter().map(|s| s.code.clone()).collect()
    }

    /// Every known currency except the reference, in configured order.
    pub fn foreign_currencies(&self) -> Vec<CurrencyCode> {
        self.settings
            .iter()
            .filter(|s| s.code != self.reference)
            .map(|s| s.code.clone())
            .collect()
    }

    pub fn is_known(&self, code: &CurrencyCode) -> bool {
        self.settings.iter().any(|s| &s.code == code)
    }

    pub fn settings(&self, code: &CurrencyCode) -> Option<&CurrencySettings> {
        self.settings.iter().find(|s| &s.code == code)
    }

    /// `None` until a refresh has delivered a rate for `code`.
    pub fn rate(&self, code: &CurrencyCode) -> Option<f64> {
        if code == &self.reference {
            return Some(1.0);
        }
        self.rates.get(code).copied()
    }

    pub fn price(
        &self,
        prices: &PriceTable,
        item: &ItemId,
        billing: BillingCycle,
        currency: &CurrencyCode,
    ) -> Result<Option<Amount>> {
        let base = prices.base_price(item, billing)?;
        if currency == &self.reference {
            return Ok(Some(base));
        }
        Ok(self.rate(currency).map(|rate| base * rate))
    }

    pub fn format(
        &self,
        amount: Option<Amount>,
        billing: BillingCycle,
        currency: &CurrencyCode,
        with_suffix: bool,
    ) -> String {
        let Some(amount) = amount else {
            return PENDING_PLACEHOLDER.to_string();
        };

        let formatted = match self.settings(currency) {
            Some(settings) => settings.format_whole(amount),
            None => {
                tracing::warn!("No display settings for {}, using plain format", currency);
                format!("{} {}", amount.round(), currency)
            }
        };

        if with_suffix {
            format!("{}/{}", formatted, billing.suffix())
        } else {
            formatted
        }
    }

    /// Forgets every fetched rate. The reference keeps its rate of 1.
    pub fn clear_rates(&mut self) {
        self.rates.retain(|code, _| code == &self.reference);
    }

    /// Merges `incoming` into the known rates and returns how many were taken.
    ///
    /// Unknown codes, the reference currency and rates that are not finite and
    /// positive are skipped.
    pub fn merge_rates(&mut self, incoming: RateMap) -> usize {
        let mut merged = 0;
        for (code, rate) in incoming {
            if code == self.reference {
                continue;
            }
            if !self.is_known(&code) {
                tracing::debug!("Ignoring rate for unknown currency {}", code);
                continue;
            }
            if !rate.is_finite() || rate <= 0.0 {
                tracing::warn!("Ignoring invalid rate {} for {}", rate, code);
                continue;
            }
            self.rates.insert(code, rate);
            merged += 1;
        }
        merged
    }

    /// Fetches rates for every foreign currency and merges them.
    ///
    /// On failure the known rates are left as they were.
    pub async fn refresh(&mut self, provider: &dyn RateProvider) -> Result<&RateMap> {
        let targets = self.foreign_currencies();
        tracing::debug!("Refreshing rates from {} for {:?}", self.reference, targets);

        match provider.fetch_rates(&self.reference, &targets).await {
            Ok(incoming) => {
                let merged = self.merge_rates(incoming);
                tracing::info!("Merged {} exchange rates", merged);
                Ok(&self.rates)
            }
            Err(e) => {
                tracing::error!("Failed to fetch exchange rates: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubProvider {
        outcome: std::result::Result<Vec<(&'static str, f64)>, String>,
    }

    #[async_trait]
    impl RateProvider for StubProvider {
        async fn fetch_rates(
            &self,
            _base: &CurrencyCode,
            _targets: &[CurrencyCode],
        ) -> Result<RateMap> {
            match &self.outcome {
                Ok(rates) => Ok(rates.iter().map(|(c, r)| (CurrencyCode::from(*c), *r)).collect()),
                Err(message) => Err(WizardError::RateProviderError {
                    message: message.clone(),
                }),
            }
        }
    }

    fn converter() -> CurrencyConverter {
        CurrencyConverter::new(CurrencyCode::from("GBP"), default_currency_settings()).unwrap()
    }

    #[test]
    fn test_reference_rate_is_always_one() {
        let converter = converter();
        assert_eq!(converter.rate(&"GBP".into()), Some(1.0));
        assert_eq!(converter.rate(&"EUR".into()), None);
    }

    #[test]
    fn test_new_requires_reference_settings() {
        let result = CurrencyConverter::new(CurrencyCode::from("JPY"), default_currency_settings());
        assert!(result.is_err());
    }

    #[test]
    fn test_price_conversion() {
        let mut converter = converter();
        let prices = PriceTable::default();
        let arcade = ItemId::from("Arcade");

        assert_eq!(
            converter.price(&prices, &arcade, BillingCycle::Monthly, &"GBP".into()).unwrap(),
            Some(9.0)
        );
        assert_eq!(
            converter.price(&prices, &arcade, BillingCycle::Monthly, &"EUR".into()).unwrap(),
            None
        );

        converter.merge_rates(RateMap::from([(CurrencyCode::from("EUR"), 1.16)]));
        let eur = converter
            .price(&prices, &arcade, BillingCycle::Monthly, &"EUR".into())
            .unwrap()
            .unwrap();
        assert!((eur - 10.44).abs() < 1e-9);
    }

    #[test]
    fn test_format_per_locale() {
        let converter = converter();
        assert_eq!(
            converter.format(Some(9.0), BillingCycle::Monthly, &"GBP".into(), true),
            "£9/mo"
        );
        assert_eq!(
            converter.format(Some(10.44), BillingCycle::Monthly, &"EUR".into(), true),
            "10\u{a0}€/mo"
        );
        assert_eq!(
            converter.format(Some(1234.5), BillingCycle::Yearly, &"USD".into(), true),
            "$1,235/yr"
        );
        assert_eq!(
            converter.format(Some(1200.0), BillingCycle::Yearly, &"EUR".into(), false),
            "1.200\u{a0}€"
        );
    }

    #[test]
    fn test_format_pending() {
        let converter = converter();
        assert_eq!(
            converter.format(None, BillingCycle::Yearly, &"EUR".into(), true),
            PENDING_PLACEHOLDER
        );
    }

    #[test]
    fn test_merge_skips_invalid_rates() {
        let mut converter = converter();
        let merged = converter.merge_rates(RateMap::from([
            (CurrencyCode::from("GBP"), 2.0),
            (CurrencyCode::from("EUR"), -1.0),
            (CurrencyCode::from("USD"), f64::NAN),
            (CurrencyCode::from("JPY"), 190.0),
        ]));

        assert_eq!(merged, 0);
        assert_eq!(converter.rate(&"GBP".into()), Some(1.0));
        assert_eq!(converter.rate(&"EUR".into()), None);
        assert_eq!(converter.rate(&"JPY".into()), None);
    }

    #[tokio::test]
    async fn test_refresh_merges_additively() {
        let mut converter = converter();
        converter.merge_rates(RateMap::from([(CurrencyCode::from("USD"), 1.27)]));

        let provider = StubProvider {
            outcome: Ok(vec![("EUR", 1.16)]),
        };
        let rates = converter.refresh(&provider).await.unwrap();

        assert_eq!(rates.get(&CurrencyCode::from("EUR")), Some(&1.16));
        assert_eq!(rates.get(&CurrencyCode::from("USD")), Some(&1.27));
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_rates() {
        let mut converter = converter();
        converter.merge_rates(RateMap::from([(CurrencyCode::from("EUR"), 1.16)]));

        let provider = StubProvider {
            outcome: Err("status 404".to_string()),
        };
        assert!(converter.refresh(&provider).await.is_err());
        assert_eq!(converter.rate(&"EUR".into()), Some(1.16));
        assert_eq!(converter.rate(&"GBP".into()), Some(1.0));
    }
}
