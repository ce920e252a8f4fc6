use crate::core::currency::{default_currency_settings, CurrencySettings};
use crate::core::pricing::PriceTable;
use crate::core::render::DEFAULT_FREE_PERIOD_LABEL;
use crate::domain::model::{BillingCycle, CurrencyCode, ItemId, RateMap};
use crate::utils::error::{Result, WizardError};
use crate::utils::validation::{
    validate_amount, validate_currency_code, validate_non_empty_string, validate_number_range,
    validate_positive_number, validate_required_field, validate_unique, validate_url, Validate,
};
use chrono::TimeDelta;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

pub const DEFAULT_RATES_ENDPOINT: &str = "https://api.frankfurter.app/latest";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_NOTICE_SECONDS: u64 = 3;
pub const MAX_NOTICE_SECONDS: u64 = 3600;

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env pattern compiles"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardConfig {
    pub currency: CurrencyConfig,
    #[serde(default)]
    pub rates: RatesConfig,
    pub catalog: CatalogConfig,
    pub prices: PriceTable,
    #[serde(default)]
    pub wizard: WizardDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    pub reference: CurrencyCode,
    pub options: Vec<CurrencySettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesConfig {
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
    /// Rates served by the offline provider.
    pub fixed: Option<HashMap<CurrencyCode, f64>>,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_RATES_ENDPOINT.to_string(),
            timeout_seconds: None,
            fixed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub plans: Vec<ItemId>,
    pub addons: Vec<ItemId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WizardDefaults {
    pub default_plan: Option<ItemId>,
    #[serde(default)]
    pub default_billing: BillingCycle,
    pub default_currency: Option<CurrencyCode>,
    pub default_addons: Option<Vec<ItemId>>,
    pub notice_seconds: Option<u64>,
    pub free_period_label: Option<String>,
}

impl Default for WizardConfig {
    fn default() -> Self {
        let prices = PriceTable::default();
        let plans = ["Arcade", "Advanced", "Pro"].map(ItemId::from).to_vec();
        let addons = ["Online service", "Larger storage", "Customizable Profile"]
            .map(ItemId::from)
            .to_vec();

        Self {
            currency: CurrencyConfig {
                reference: "GBP".into(),
                options: default_currency_settings(),
            },
            rates: RatesConfig::default(),
            catalog: CatalogConfig { plans, addons },
            prices,
            wizard: WizardDefaults::default(),
        }
    }
}

impl WizardConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration, substituting `${VAR}` from the environment first.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed)?)
    }

    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_PATTERN
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn default_plan(&self) -> ItemId {
        self.wizard
            .default_plan
            .clone()
            .or_else(|| self.catalog.plans.first().cloned())
            .unwrap_or_else(|| ItemId::new(""))
    }

    pub fn default_currency(&self) -> CurrencyCode {
        self.wizard
            .default_currency
            .clone()
            .unwrap_or_else(|| self.currency.reference.clone())
    }

    /// Defaults to every add-on selected.
    pub fn default_addons(&self) -> Vec<ItemId> {
        self.wizard
            .default_addons
            .clone()
            .unwrap_or_else(|| self.catalog.addons.clone())
    }

    pub fn notice_seconds(&self) -> u64 {
        self.wizard.notice_seconds.unwrap_or(DEFAULT_NOTICE_SECONDS)
    }

    /// How long a notice stays up before it is dismissed automatically.
    pub fn notice_duration(&self) -> Result<TimeDelta> {
        let seconds = self.notice_seconds();
        validate_number_range("wizard.notice_seconds", seconds, 1, MAX_NOTICE_SECONDS)?;
        i64::try_from(seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| WizardError::InvalidConfigValueError {
                field: "wizard.notice_seconds".to_string(),
                value: seconds.to_string(),
                reason: "Duration out of range".to_string(),
            })
    }

    pub fn free_period_label(&self) -> String {
        self.wizard
            .free_period_label
            .clone()
            .unwrap_or_else(|| DEFAULT_FREE_PERIOD_LABEL.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.rates.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    pub fn fixed_rates(&self) -> RateMap {
        self.rates.fixed.clone().unwrap_or_default()
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("rates.endpoint", &self.rates.endpoint)?;
        if let Some(timeout) = self.rates.timeout_seconds {
            validate_positive_number("rates.timeout_seconds", timeout, 1)?;
        }

        validate_currency_code("currency.reference", self.currency.reference.as_str())?;
        for option in &self.currency.options {
            validate_currency_code("currency.options.code", option.code.as_str())?;
            validate_non_empty_string("currency.options.symbol", &option.symbol)?;
        }
        validate_unique(
            "currency.options.code",
            self.currency.options.iter().map(|o| o.code.as_str()),
        )?;
        let reference_settings = self
            .currency
            .options
            .iter()
            .find(|o| o.code == self.currency.reference);
        validate_required_field("currency.options (reference currency)", &reference_settings)?;

        if self.catalog.plans.is_empty() {
            return Err(WizardError::MissingConfigError {
                field: "catalog.plans".to_string(),
            });
        }
        validate_unique("catalog.plans", self.catalog.plans.iter().map(ItemId::as_str))?;
        validate_unique("catalog.addons", self.catalog.addons.iter().map(ItemId::as_str))?;

        for billing in BillingCycle::ALL {
            for (item, amount) in self.prices.cycle(billing) {
                validate_amount(&format!("prices.{}.{}", billing.label().to_lowercase(), item), *amount)?;
            }
        }
        for item in self.catalog.plans.iter().chain(&self.catalog.addons) {
            if !self.prices.is_priced(item) {
                return Err(WizardError::InvalidConfigValueError {
                    field: "prices".to_string(),
                    value: item.to_string(),
                    reason: "Item needs both a monthly and a yearly price".to_string(),
                });
            }
        }

        let plan = self.default_plan();
        if !self.catalog.plans.contains(&plan) {
            return Err(WizardError::InvalidConfigValueError {
                field: "wizard.default_plan".to_string(),
                value: plan.to_string(),
                reason: "Not one of catalog.plans".to_string(),
            });
        }
        for addon in self.default_addons() {
            if !self.catalog.addons.contains(&addon) {
                return Err(WizardError::InvalidConfigValueError {
                    field: "wizard.default_addons".to_string(),
                    value: addon.to_string(),
                    reason: "Not one of catalog.addons".to_string(),
                });
            }
        }
        validate_unique(
            "wizard.default_addons",
            self.default_addons().iter().map(ItemId::as_str),
        )?;

        let currency = self.default_currency();
        if !self.currency.options.iter().any(|o| o.code == currency) {
            return Err(WizardError::InvalidConfigValueError {
                field: "wizard.default_currency".to_string(),
                value: currency.to_string(),
                reason: "Not one of currency.options".to_string(),
            });
        }

        if let Some(seconds) = self.wizard.notice_seconds {
            validate_number_range("wizard.notice_seconds", seconds, 1, MAX_NOTICE_SECONDS)?;
        }

        Ok(())
    }
}

impl Validate for WizardConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC_TOML: &str = r#"
[currency]
reference = "GBP"

[[currency.options]]
code = "GBP"
locale = "en-GB"
symbol = "£"

[[currency.options]]
code = "EUR"
locale = "de-DE"
symbol = "€"
placement = "suffix"
group_separator = "."

[rates]
endpoint = "https://rates.example.com/latest"
timeout_seconds = 5

[catalog]
plans = ["Arcade", "Pro"]
addons = ["Online service"]

[prices.monthly]
"Arcade" = 9
"Pro" = 15
"Online service" = 1

[prices.yearly]
"Arcade" = 90
"Pro" = 150
"Online service" = 10

[wizard]
default_plan = "Pro"
default_billing = "yearly"
default_addons = []
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = WizardConfig::from_toml_str(BASIC_TOML).unwrap();

        assert_eq!(config.currency.reference.as_str(), "GBP");
        assert_eq!(config.currency.options.len(), 2);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.default_plan().as_str(), "Pro");
        assert_eq!(config.wizard.default_billing, BillingCycle::Yearly);
        assert!(config.default_addons().is_empty());
        assert_eq!(config.default_currency().as_str(), "GBP");
        assert_eq!(config.notice_seconds(), DEFAULT_NOTICE_SECONDS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = WizardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_plan().as_str(), "Arcade");
        assert_eq!(config.default_addons().len(), 3);
        assert_eq!(config.free_period_label(), DEFAULT_FREE_PERIOD_LABEL);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SIGNUP_WIZARD_TEST_ENDPOINT", "https://test.rates.com/latest");
        let content = BASIC_TOML.replace(
            "https://rates.example.com/latest",
            "${SIGNUP_WIZARD_TEST_ENDPOINT}",
        );

        let config = WizardConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.rates.endpoint, "https://test.rates.com/latest");

        std::env::remove_var("SIGNUP_WIZARD_TEST_ENDPOINT");
    }

    #[test]
    fn test_config_validation() {
        let content = BASIC_TOML.replace("https://rates.example.com/latest", "invalid-url");
        let config = WizardConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());

        let content = BASIC_TOML.replace("\"Pro\" = 150\n", "");
        let config = WizardConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());

        let content = BASIC_TOML.replace("default_plan = \"Pro\"", "default_plan = \"Gold\"");
        let config = WizardConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_reference_settings() {
        let mut config = WizardConfig::default();
        config.currency.reference = "JPY".into();
        assert!(matches!(
            config.validate(),
            Err(WizardError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC_TOML.as_bytes()).unwrap();

        let config = WizardConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.catalog.plans.len(), 2);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            WizardConfig::from_toml_str("[currency\nreference = 1"),
            Err(WizardError::TomlError(_))
        ));
    }

    #[test]
    fn test_notice_seconds_bounds() {
        let mut config = WizardConfig::default();
        assert_eq!(config.notice_duration().unwrap(), TimeDelta::seconds(3));

        config.wizard.notice_seconds = Some(MAX_NOTICE_SECONDS);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.notice_duration().unwrap(),
            TimeDelta::seconds(MAX_NOTICE_SECONDS as i64)
        );

        config.wizard.notice_seconds = Some(1_000_000_000_000_000);
        assert!(matches!(
            config.validate(),
            Err(WizardError::InvalidConfigValueError { .. })
        ));
        assert!(config.notice_duration().is_err());

        config.wizard.notice_seconds = Some(u64::MAX);
        assert!(config.notice_duration().is_err());
    }
}
