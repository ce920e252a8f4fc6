use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::utils::error::WizardError;

/// Amount of money, in reference-currency units unless converted.
pub type Amount = f64;

/// Exchange rates relative to the reference currency.
pub type RateMap = HashMap<CurrencyCode, f64>;

pub const IDENTITY_STEP: usize = 0;
pub const PLAN_STEP: usize = 1;
pub const SUMMARY_STEP: usize = 3;
pub const CONFIRMATION_STEP: usize = 4;
pub const MAX_STEP: usize = CONFIRMATION_STEP;

pub const STEP_TITLES: [&str; MAX_STEP + 1] =
    ["Your info", "Select plan", "Add-ons", "Summary", "Thank you"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Yearly,
}

impl BillingCycle {
    pub const ALL: [BillingCycle; 2] = [BillingCycle::Monthly, BillingCycle::Yearly];

    pub fn suffix(self) -> &'static str {
        match self {
            BillingCycle::Monthly => "mo",
            BillingCycle::Yearly => "yr",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BillingCycle::Monthly => "Monthly",
            BillingCycle::Yearly => "Yearly",
        }
    }

    pub fn period(self) -> &'static str {
        match self {
            BillingCycle::Monthly => "month",
            BillingCycle::Yearly => "year",
        }
    }
}

impl FromStr for BillingCycle {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(BillingCycle::Monthly),
            "yearly" => Ok(BillingCycle::Yearly),
            other => Err(WizardError::ConfigError {
                message: format!("unknown billing cycle '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityField {
    Name,
    Email,
    Phone,
}

impl IdentityField {
    pub const ALL: [IdentityField; 3] =
        [IdentityField::Name, IdentityField::Email, IdentityField::Phone];

    pub fn as_str(self) -> &'static str {
        match self {
            IdentityField::Name => "name",
            IdentityField::Email => "email",
            IdentityField::Phone => "phone",
        }
    }
}

impl FromStr for IdentityField {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IdentityField::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| WizardError::ConfigError {
                message: format!("unknown identity field '{}'", s.trim()),
            })
    }
}

/// Identity fields as entered, either raw (draft) or accepted (form data).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Identity {
    pub fn get(&self, field: IdentityField) -> &str {
        match field {
            IdentityField::Name => &self.name,
            IdentityField::Email => &self.email,
            IdentityField::Phone => &self.phone,
        }
    }

    pub fn set(&mut self, field: IdentityField, value: impl Into<String>) {
        let slot = match field {
            IdentityField::Name => &mut self.name,
            IdentityField::Email => &mut self.email,
            IdentityField::Phone => &mut self.phone,
        };
        *slot = value.into();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormData {
    pub identity: Identity,
    pub plan: ItemId,
    pub billing: BillingCycle,
    pub currency: CurrencyCode,
    /// Selected add-ons in the order they were picked.
    pub addons: Vec<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: IdentityField,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardState {
    pub current_step: usize,
    pub form: FormData,
    /// Raw identity inputs; copied into `form.identity` once they validate.
    pub draft: Identity,
    pub field_errors: Vec<FieldError>,
    pub notice: Option<Notice>,
    /// Set after a failed rate refresh; only the reference currency stays selectable.
    pub currency_locked: bool,
}

impl WizardState {
    pub fn new(form: FormData) -> Self {
        Self {
            current_step: IDENTITY_STEP,
            form,
            draft: Identity::default(),
            field_errors: Vec::new(),
            notice: None,
            currency_locked: false,
        }
    }
}

/// Input events produced by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UserEvent {
    EditField(IdentityField, String),
    Advance,
    Retreat,
    JumpToPlanStep,
    Confirm,
    SelectPlan(ItemId),
    ToggleAddon(ItemId),
    ChangeBilling(BillingCycle),
    ChangeCurrency(CurrencyCode),
    RequestRefresh,
    /// Requests rates for a base currency the provider rejects.
    SimulateRateFailure,
    DismissNotice,
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billing_cycle_parsing() {
        assert_eq!("monthly".parse::<BillingCycle>().unwrap(), BillingCycle::Monthly);
        assert_eq!(" Yearly ".parse::<BillingCycle>().unwrap(), BillingCycle::Yearly);
        assert!("weekly".parse::<BillingCycle>().is_err());
    }

    #[test]
    fn test_identity_get_set() {
        let mut identity = Identity::default();
        identity.set(IdentityField::Email, "ada@example.com");
        assert_eq!(identity.get(IdentityField::Email), "ada@example.com");
        assert_eq!(identity.get(IdentityField::Name), "");
        assert_eq!("EMAIL".parse::<IdentityField>().unwrap(), IdentityField::Email);
    }

    #[test]
    fn test_billing_cycle_serde() {
        let json = serde_json::to_string(&BillingCycle::Yearly).unwrap();
        assert_eq!(json, "\"yearly\"");
    }
}
