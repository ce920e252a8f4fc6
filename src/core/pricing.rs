use crate::domain::model::{
    Amount, BillingCycle, CurrencyCode, ItemId, WizardState, MAX_STEP,
};
use crate::utils::error::{Result, WizardError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Base prices in the reference currency, per billing cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    pub monthly: HashMap<ItemId, Amount>,
    pub yearly: HashMap<ItemId, Amount>,
}

impl PriceTable {
    pub fn new(monthly: HashMap<ItemId, Amount>, yearly: HashMap<ItemId, Amount>) -> Self {
        Self { monthly, yearly }
    }

    pub fn cycle(&self, billing: BillingCycle) -> &HashMap<ItemId, Amount> {
        match billing {
            BillingCycle::Monthly => &self.monthly,
            BillingCycle::Yearly => &self.yearly,
        }
    }

    pub fn base_price(&self, item: &ItemId, billing: BillingCycle) -> Result<Amount> {
        self.cycle(billing)
            .get(item)
            .copied()
            .ok_or_else(|| WizardError::UnknownItem {
                id: item.to_string(),
            })
    }

    /// An item is priced when both cycles carry it.
    pub fn is_priced(&self, item: &ItemId) -> bool {
        BillingCycle::ALL
            .into_iter()
            .all(|billing| self.cycle(billing).contains_key(item))
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        let monthly = [
            ("Arcade", 9.0),
            ("Advanced", 12.0),
            ("Pro", 15.0),
            ("Online service", 1.0),
            ("Larger storage", 2.0),
            ("Customizable Profile", 2.0),
        ];
        let yearly = [
            ("Arcade", 90.0),
            ("Advanced", 120.0),
            ("Pro", 150.0),
            ("Online service", 10.0),
            ("Larger storage", 20.0),
            ("Customizable Profile", 20.0),
        ];

        Self::new(
            monthly.into_iter().map(|(id, p)| (ItemId::from(id), p)).collect(),
            yearly.into_iter().map(|(id, p)| (ItemId::from(id), p)).collect(),
        )
    }
}

/// Closed sets of plans, add-ons and currencies the wizard knows about.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    plans: Vec<ItemId>,
    addons: Vec<ItemId>,
    currencies: Vec<CurrencyCode>,
    reference: CurrencyCode,
}

impl Catalog {
    pub fn new(
        plans: Vec<ItemId>,
        addons: Vec<ItemId>,
        currencies: Vec<CurrencyCode>,
        reference: CurrencyCode,
        prices: &PriceTable,
    ) -> Result<Self> {
        if !currencies.contains(&reference) {
            return Err(WizardError::ConfigError {
                message: format!("reference currency {} is not a catalog currency", reference),
            });
        }

        if plans.is_empty() {
            return Err(WizardError::ConfigError {
                message: "catalog needs at least one plan".to_string(),
            });
        }

        for item in plans.iter().chain(addons.iter()) {
            if !prices.is_priced(item) {
                return Err(WizardError::ConfigError {
                    message: format!("item '{}' has no monthly and yearly price", item),
                });
            }
        }

        Ok(Self {
            plans,
            addons,
            currencies,
            reference,
        })
    }

    pub fn plans(&self) -> &[ItemId] {
        &self.plans
    }

    pub fn addons(&self) -> &[ItemId] {
        &self.addons
    }

    pub fn is_plan(&self, id: &ItemId) -> bool {
        self.plans.contains(id)
    }

    pub fn is_addon(&self, id: &ItemId) -> bool {
        self.addons.contains(id)
    }

    pub fn is_currency(&self, code: &CurrencyCode) -> bool {
        self.currencies.contains(code)
    }

    /// Checks the invariants every committed state must hold.
    pub fn check(&self, state: &WizardState) -> Result<()> {
        if state.current_step > MAX_STEP {
            return Err(WizardError::InvariantViolation {
                message: format!("step {} is past the last step {}", state.current_step, MAX_STEP),
            });
        }

        if !self.is_plan(&state.form.plan) {
            return Err(WizardError::UnknownItem {
                id: state.form.plan.to_string(),
            });
        }

        if !self.is_currency(&state.form.currency) {
            return Err(WizardError::UnknownCurrency {
                code: state.form.currency.to_string(),
            });
        }

        if state.currency_locked && state.form.currency != self.reference {
            return Err(WizardError::CurrencyLocked {
                code: state.form.currency.to_string(),
            });
        }

        let mut seen = HashSet::new();
        for addon in &state.form.addons {
            if !self.is_addon(addon) {
                return Err(WizardError::UnknownItem {
                    id: addon.to_string(),
                });
            }
            if !seen.insert(addon) {
                return Err(WizardError::InvariantViolation {
                    message: format!("add-on '{}' selected twice", addon),
                });
            }
        }

        Ok(())
    }
}
