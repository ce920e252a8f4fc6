//! Projection of wizard state onto view-facing data.
//!
//! [`RenderEngine::render`] is a pure function of the state snapshot, the
//! currency converter and the price table. It derives, in order: step
//! visibility, plan cards, add-on rows, then the summary (summary step only).
//! A price whose rate is unknown renders as the pending placeholder.

use crate::core::currency::CurrencyConverter;
use crate::core::pricing::{Catalog, PriceTable};
use crate::domain::model::{
    Amount, BillingCycle, CurrencyCode, FieldError, ItemId, WizardState, CONFIRMATION_STEP,
    STEP_TITLES, SUMMARY_STEP,
};
use crate::utils::error::Result;
use serde::Serialize;

pub const DEFAULT_FREE_PERIOD_LABEL: &str = "2 months free";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepView {
    pub index: usize,
    pub title: String,
    pub visible: bool,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepIndicator {
    pub text: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingView {
    pub cycle: BillingCycle,
    pub monthly_emphasized: bool,
    pub yearly_emphasized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanView {
    pub id: ItemId,
    pub selected: bool,
    pub price: String,
    pub amount: Option<Amount>,
    pub free_period: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddonView {
    pub id: ItemId,
    pub selected: bool,
    pub price: String,
    pub amount: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyOptionView {
    pub code: CurrencyCode,
    pub selected: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryLine {
    pub label: String,
    pub price: String,
    pub amount: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryView {
    pub plan: SummaryLine,
    pub addons: Vec<SummaryLine>,
    pub total: SummaryLine,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub steps: Vec<StepView>,
    pub step_indicator: StepIndicator,
    pub billing: BillingView,
    pub plans: Vec<PlanView>,
    pub addons: Vec<AddonView>,
    pub currencies: Vec<CurrencyOptionView>,
    pub summary: Option<SummaryView>,
    pub field_errors: Vec<FieldError>,
    pub notice: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RenderEngine {
    catalog: Catalog,
    free_period_label: String,
}

impl RenderEngine {
    pub fn new(catalog: Catalog, free_period_label: impl Into<String>) -> Self {
        Self {
            catalog,
            free_period_label: free_period_label.into(),
        }
    }

    pub fn render(
        &self,
        state: &WizardState,
        converter: &CurrencyConverter,
        prices: &PriceTable,
    ) -> Result<Projection> {
        let (steps, step_indicator) = Self::render_steps(state.current_step);
        let plans = self.render_plans(state, converter, prices)?;
        let addons = self.render_addons(state, converter, prices)?;
        let summary = if state.current_step == SUMMARY_STEP {
            Some(Self::render_summary(state, converter, prices)?)
        } else {
            None
        };

        let billing = state.form.billing;
        Ok(Projection {
            steps,
            step_indicator,
            billing: BillingView {
                cycle: billing,
                monthly_emphasized: billing == BillingCycle::Monthly,
                yearly_emphasized: billing == BillingCycle::Yearly,
            },
            plans,
            addons,
            currencies: Self::render_currencies(state, converter),
            summary,
            field_errors: state.field_errors.clone(),
            notice: state.notice.as_ref().map(|n| n.message.clone()),
        })
    }

    fn render_steps(current: usize) -> (Vec<StepView>, StepIndicator) {
        let steps = STEP_TITLES
            .iter()
            .enumerate()
            .map(|(index, title)| StepView {
                index,
                title: title.to_string(),
                visible: index == current,
                active: index == current,
            })
            .collect();

        // The sidebar only lists the four input steps.
        let indicator = StepIndicator {
            text: format!("STEP {}", (current + 1).min(CONFIRMATION_STEP)),
            visible: current < CONFIRMATION_STEP,
        };

        (steps, indicator)
    }

    fn render_plans(
        &self,
        state: &WizardState,
        converter: &CurrencyConverter,
        prices: &PriceTable,
    ) -> Result<Vec<PlanView>> {
        let form = &state.form;
        self.catalog
            .plans()
            .iter()
            .map(|plan| {
                let amount = converter.price(prices, plan, form.billing, &form.currency)?;
                Ok(PlanView {
                    id: plan.clone(),
                    selected: *plan == form.plan,
                    price: converter.format(amount, form.billing, &form.currency, true),
                    amount,
                    free_period: (form.billing == BillingCycle::Yearly)
                        .then(|| self.free_period_label.clone()),
                })
            })
            .collect()
    }

    fn render_addons(
        &self,
        state: &WizardState,
        converter: &CurrencyConverter,
        prices: &PriceTable,
    ) -> Result<Vec<AddonView>> {
        let form = &state.form;
        self.catalog
            .addons()
            .iter()
            .map(|addon| {
                let amount = converter.price(prices, addon, form.billing, &form.currency)?;
                Ok(AddonView {
                    id: addon.clone(),
                    selected: form.addons.contains(addon),
                    price: format!(
                        "+{}",
                        converter.format(amount, form.billing, &form.currency, true)
                    ),
                    amount,
                })
            })
            .collect()
    }

    fn render_currencies(
        state: &WizardState,
        converter: &CurrencyConverter,
    ) -> Vec<CurrencyOptionView> {
        converter
            .currencies()
            .into_iter()
            .map(|code| CurrencyOptionView {
                selected: code == state.form.currency,
                enabled: !state.currency_locked || &code == converter.reference(),
                code,
            })
            .collect()
    }

    fn render_summary(
        state: &WizardState,
        converter: &CurrencyConverter,
        prices: &PriceTable,
    ) -> Result<SummaryView> {
        let form = &state.form;
        let display = |amount| converter.format(amount, form.billing, &form.currency, true);

        let plan_amount = converter.price(prices, &form.plan, form.billing, &form.currency)?;
        let plan = SummaryLine {
            label: format!("{} ({})", form.plan, form.billing.label()),
            price: display(plan_amount),
            amount: plan_amount,
        };

        let mut total = plan_amount;
        let mut addons = Vec::with_capacity(form.addons.len());
        for addon in &form.addons {
            let amount = converter.price(prices, addon, form.billing, &form.currency)?;
            total = total.zip(amount).map(|(sum, price)| sum + price);
            addons.push(SummaryLine {
                label: addon.to_string(),
                price: format!("+{}", display(amount)),
                amount,
            });
        }

        let total = SummaryLine {
            label: format!("Total (per {})", form.billing.period()),
            price: format!("+{}", display(total)),
            amount: total,
        };

        Ok(SummaryView {
            plan,
            addons,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::{default_currency_settings, PENDING_PLACEHOLDER};
    use crate::domain::model::{FormData, Identity, RateMap};

    struct Fixture {
        engine: RenderEngine,
        converter: CurrencyConverter,
        prices: PriceTable,
        state: WizardState,
    }

    fn fixture() -> Fixture {
        let prices = PriceTable::default();
        let catalog = Catalog::new(
            vec!["Arcade".into(), "Advanced".into(), "Pro".into()],
            vec![
                "Online service".into(),
                "Larger storage".into(),
                "Customizable Profile".into(),
            ],
            vec!["GBP".into(), "EUR".into(), "USD".into()],
            "GBP".into(),
            &prices,
        )
        .unwrap();
        let converter =
            CurrencyConverter::new(CurrencyCode::from("GBP"), default_currency_settings()).unwrap();
        let state = WizardState::new(FormData {
            identity: Identity::default(),
            plan: "Arcade".into(),
            billing: BillingCycle::Monthly,
            currency: "GBP".into(),
            addons: vec![],
        });

        Fixture {
            engine: RenderEngine::new(catalog, DEFAULT_FREE_PERIOD_LABEL),
            converter,
            prices,
            state,
        }
    }

    impl Fixture {
        fn render(&self) -> Projection {
            self.engine
                .render(&self.state, &self.converter, &self.prices)
                .unwrap()
        }
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut fx = fixture();
        fx.state.current_step = SUMMARY_STEP;
        fx.state.form.addons = vec!["Larger storage".into()];

        assert_eq!(fx.render(), fx.render());
    }

    #[test]
    fn test_step_visibility() {
        let mut fx = fixture();
        fx.state.current_step = 2;
        let projection = fx.render();

        let visible: Vec<usize> = projection
            .steps
            .iter()
            .filter(|s| s.visible)
            .map(|s| s.index)
            .collect();
        assert_eq!(visible, vec![2]);
        assert_eq!(projection.step_indicator.text, "STEP 3");
        assert!(projection.step_indicator.visible);

        fx.state.current_step = CONFIRMATION_STEP;
        let projection = fx.render();
        assert_eq!(projection.step_indicator.text, "STEP 4");
        assert!(!projection.step_indicator.visible);
    }

    #[test]
    fn test_free_period_marker_follows_billing() {
        let mut fx = fixture();
        let monthly = fx.render();
        assert!(monthly.plans.iter().all(|p| p.free_period.is_none()));

        fx.state.form.billing = BillingCycle::Yearly;
        let yearly = fx.render();
        assert!(yearly
            .plans
            .iter()
            .all(|p| p.free_period.as_deref() == Some(DEFAULT_FREE_PERIOD_LABEL)));

        fx.state.form.billing = BillingCycle::Monthly;
        assert_eq!(fx.render().plans, monthly.plans);
    }

    #[test]
    fn test_plan_selection_and_prices() {
        let mut fx = fixture();
        fx.state.form.plan = "Pro".into();
        let projection = fx.render();

        let selected: Vec<&str> = projection
            .plans
            .iter()
            .filter(|p| p.selected)
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(selected, vec!["Pro"]);
        assert_eq!(projection.plans[0].price, "£9/mo");
        assert_eq!(projection.plans[2].price, "£15/mo");
    }

    #[test]
    fn test_addon_rows() {
        let mut fx = fixture();
        fx.state.form.addons = vec!["Larger storage".into()];
        let projection = fx.render();

        assert!(!projection.addons[0].selected);
        assert!(projection.addons[1].selected);
        assert_eq!(projection.addons[1].price, "+£2/mo");
    }

    #[test]
    fn test_summary_only_on_summary_step() {
        let mut fx = fixture();
        fx.state.current_step = 2;
        assert!(fx.render().summary.is_none());

        fx.state.current_step = SUMMARY_STEP;
        assert!(fx.render().summary.is_some());
    }

    #[test]
    fn test_summary_total() {
        let mut fx = fixture();
        fx.state.current_step = SUMMARY_STEP;
        fx.state.form.plan = "Advanced".into();
        fx.state.form.billing = BillingCycle::Yearly;
        fx.state.form.addons = vec!["Online service".into(), "Larger storage".into()];

        let summary = fx.render().summary.unwrap();
        assert_eq!(summary.plan.label, "Advanced (Yearly)");
        assert_eq!(summary.plan.price, "£120/yr");
        assert_eq!(summary.addons.len(), 2);
        assert_eq!(summary.addons[0].label, "Online service");
        assert_eq!(summary.addons[0].price, "+£10/yr");
        assert_eq!(summary.total.label, "Total (per year)");
        assert_eq!(summary.total.amount, Some(150.0));
        assert_eq!(summary.total.price, "+£150/yr");
    }

    #[test]
    fn test_pending_prices_never_partially_summed() {
        let mut fx = fixture();
        fx.state.current_step = SUMMARY_STEP;
        fx.state.form.currency = "EUR".into();
        fx.state.form.addons = vec!["Online service".into()];

        let projection = fx.render();
        assert!(projection.plans.iter().all(|p| p.price == PENDING_PLACEHOLDER));
        let summary = projection.summary.unwrap();
        assert_eq!(summary.total.amount, None);
        assert_eq!(summary.total.price, format!("+{}", PENDING_PLACEHOLDER));
    }

    #[test]
    fn test_converted_prices_after_rates_known() {
        let mut fx = fixture();
        fx.converter
            .merge_rates(RateMap::from([(CurrencyCode::from("EUR"), 1.16)]));
        fx.state.form.currency = "EUR".into();

        let projection = fx.render();
        let arcade = &projection.plans[0];
        assert!((arcade.amount.unwrap() - 10.44).abs() < 1e-9);
        assert_eq!(arcade.price, "10\u{a0}€/mo");
    }

    #[test]
    fn test_locked_currencies_disabled() {
        let mut fx = fixture();
        fx.state.currency_locked = true;
        let projection = fx.render();

        let enabled: Vec<&str> = projection
            .currencies
            .iter()
            .filter(|c| c.enabled)
            .map(|c| c.code.as_str())
            .collect();
        assert_eq!(enabled, vec!["GBP"]);
    }
}
