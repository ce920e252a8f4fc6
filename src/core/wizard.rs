use crate::config::toml_config::WizardConfig;
use crate::core::controller::{StepController, StepOutcome, Transition};
use crate::core::currency::CurrencyConverter;
use crate::core::pricing::{Catalog, PriceTable};
use crate::core::render::{Projection, RenderEngine};
use crate::core::state::StateStore;
use crate::domain::model::{
    BillingCycle, CurrencyCode, FormData, IdentityField, ItemId, Notice, RateMap, UserEvent,
    WizardState,
};
use crate::domain::ports::{RateProvider, ViewSink};
use crate::utils::error::{Result, WizardError};
use chrono::{DateTime, TimeDelta, Utc};

pub const CURRENCY_UNAVAILABLE_MESSAGE: &str = "Sorry, currency unavailable.";

/// Base currency sent by [`UserEvent::SimulateRateFailure`]; no provider accepts it.
pub const INVALID_BASE_CURRENCY: &str = "INVALID";

/// An outstanding rate refresh. Hand it back to [`SignupWizard::complete_refresh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub id: u64,
    pub base: CurrencyCode,
    pub targets: Vec<CurrencyCode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Step(StepOutcome),
    Updated,
    RefreshRequested(RefreshRequest),
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    Merged(usize),
    /// The failure policy ran: reference currency restored, others locked.
    Failed,
    /// A newer refresh was requested after this one; its failure is dropped.
    StaleFailure,
}

/// Top-level context: owns the state, pricing and view sinks.
///
/// Every committed mutation renders exactly once and the projection is handed
/// to each registered [`ViewSink`] before the call returns.
pub struct SignupWizard {
    store: StateStore,
    converter: CurrencyConverter,
    prices: PriceTable,
    renderer: RenderEngine,
    sinks: Vec<Box<dyn ViewSink>>,
    initial: WizardState,
    projection: Projection,
    notice_duration: TimeDelta,
    next_refresh_id: u64,
    latest_refresh: Option<u64>,
}

impl SignupWizard {
    pub fn new(config: &WizardConfig) -> Result<Self> {
        let prices = config.prices.clone();
        let converter =
            CurrencyConverter::new(config.currency.reference.clone(), config.currency.options.clone())?;
        let catalog = Catalog::new(
            config.catalog.plans.clone(),
            config.catalog.addons.clone(),
            converter.currencies(),
            converter.reference().clone(),
            &prices,
        )?;

        let initial = WizardState::new(FormData {
            identity: Default::default(),
            plan: config.default_plan(),
            billing: config.wizard.default_billing,
            currency: config.default_currency(),
            addons: config.default_addons(),
        });

        let renderer = RenderEngine::new(catalog.clone(), config.free_period_label());
        let store = StateStore::new(initial.clone(), catalog)?;
        let projection = renderer.render(store.state(), &converter, &prices)?;

        Ok(Self {
            store,
            converter,
            prices,
            renderer,
            sinks: Vec::new(),
            initial,
            projection,
            notice_duration: config.notice_duration()?,
            next_refresh_id: 0,
            latest_refresh: None,
        })
    }

    pub fn subscribe(&mut self, sink: Box<dyn ViewSink>) {
        self.sinks.push(sink);
    }

    pub fn state(&self) -> &WizardState {
        self.store.state()
    }

    pub fn converter(&self) -> &CurrencyConverter {
        &self.converter
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    /// The projection of the last render.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    pub fn dispatch(&mut self, event: UserEvent) -> Result<Dispatch> {
        tracing::debug!("Dispatching {:?}", event);
        match event {
            UserEvent::EditField(field, value) => self.edit_field(field, value),
            UserEvent::Advance => self.transition(Transition::Advance),
            UserEvent::Retreat => self.transition(Transition::Retreat),
            UserEvent::JumpToPlanStep => self.transition(Transition::JumpToPlanStep),
            UserEvent::Confirm => self.transition(Transition::Confirm),
            UserEvent::SelectPlan(plan) => self.select_plan(plan),
            UserEvent::ToggleAddon(addon) => self.toggle_addon(addon),
            UserEvent::ChangeBilling(cycle) => self.change_billing(cycle),
            UserEvent::ChangeCurrency(code) => self.change_currency(code),
            UserEvent::RequestRefresh => Ok(Dispatch::RefreshRequested(self.begin_refresh())),
            UserEvent::SimulateRateFailure => Ok(Dispatch::RefreshRequested(
                self.request_rates(CurrencyCode::new(INVALID_BASE_CURRENCY)),
            )),
            UserEvent::DismissNotice => self.dismiss_notice(),
            UserEvent::Reset => self.reset(),
        }
    }

    /// Dispatches `event` and, if it asks for fresh rates, fetches them from `provider`.
    pub async fn handle(
        &mut self,
        event: UserEvent,
        provider: &dyn RateProvider,
    ) -> Result<Dispatch> {
        let dispatch = self.dispatch(event)?;
        if let Dispatch::RefreshRequested(request) = &dispatch {
            let outcome = provider.fetch_rates(&request.base, &request.targets).await;
            self.complete_refresh(request, outcome)?;
        }
        Ok(dispatch)
    }

    pub fn edit_field(&mut self, field: IdentityField, value: String) -> Result<Dispatch> {
        self.commit(|s| s.draft.set(field, value))?;
        Ok(Dispatch::Updated)
    }

    pub fn transition(&mut self, transition: Transition) -> Result<Dispatch> {
        if !StepController::permits(self.state(), transition) {
            tracing::debug!(
                "{:?} not available from step {}",
                transition,
                self.state().current_step
            );
            return Ok(Dispatch::Ignored);
        }

        let outcome = self.commit(|s| StepController::apply(s, transition))?;
        match &outcome {
            StepOutcome::Moved { from, to } => tracing::info!("Step {} -> {}", from, to),
            StepOutcome::Blocked { errors } => {
                tracing::info!("Advance blocked by {} invalid field(s)", errors.len())
            }
            StepOutcome::Ignored => {}
        }
        Ok(Dispatch::Step(outcome))
    }

    pub fn select_plan(&mut self, plan: ItemId) -> Result<Dispatch> {
        tracing::debug!("Selecting plan {}", plan);
        self.commit(|s| StepController::select_plan(s, plan))?;
        Ok(Dispatch::Updated)
    }

    pub fn toggle_addon(&mut self, addon: ItemId) -> Result<Dispatch> {
        let selected = self.commit(|s| StepController::toggle_addon(s, &addon))?;
        tracing::debug!("Add-on {} selected: {}", addon, selected);
        Ok(Dispatch::Updated)
    }

    pub fn change_billing(&mut self, cycle: BillingCycle) -> Result<Dispatch> {
        self.commit(|s| s.form.billing = cycle)?;
        Ok(Dispatch::Updated)
    }

    /// Switches the display currency; foreign currencies also request fresh rates.
    pub fn change_currency(&mut self, code: CurrencyCode) -> Result<Dispatch> {
        if !self.converter.is_known(&code) {
            return Err(WizardError::UnknownCurrency {
                code: code.to_string(),
            });
        }

        let is_reference = &code == self.converter.reference();
        if self.state().currency_locked && !is_reference {
            return Err(WizardError::CurrencyLocked {
                code: code.to_string(),
            });
        }

        tracing::info!("Currency changed to {}", code);
        self.commit(|s| s.form.currency = code)?;

        if is_reference {
            Ok(Dispatch::Updated)
        } else {
            Ok(Dispatch::RefreshRequested(self.begin_refresh()))
        }
    }

    pub fn dismiss_notice(&mut self) -> Result<Dispatch> {
        if self.state().notice.is_none() {
            return Ok(Dispatch::Ignored);
        }
        self.commit(|s| s.notice = None)?;
        Ok(Dispatch::Updated)
    }

    /// Clears the notice once its display time has passed. Returns true if cleared.
    pub fn dismiss_expired_notice(&mut self, now: DateTime<Utc>) -> Result<bool> {
        let expired = matches!(&self.state().notice, Some(notice) if notice.expires_at <= now);
        if expired {
            self.commit(|s| s.notice = None)?;
        }
        Ok(expired)
    }

    /// Starts the session over: initial form, no fetched rates, currencies unlocked.
    ///
    /// Refreshes still in flight can merge rates but their failures are stale.
    pub fn reset(&mut self) -> Result<Dispatch> {
        tracing::info!("Resetting wizard session");
        self.latest_refresh = None;
        self.converter.clear_rates();
        let initial = self.initial.clone();
        self.commit(|s| *s = initial)?;
        Ok(Dispatch::Updated)
    }

    /// Starts a refresh for every foreign currency. Newer requests supersede older ones.
    pub fn begin_refresh(&mut self) -> RefreshRequest {
        let base = self.converter.reference().clone();
        self.request_rates(base)
    }

    fn request_rates(&mut self, base: CurrencyCode) -> RefreshRequest {
        self.next_refresh_id += 1;
        self.latest_refresh = Some(self.next_refresh_id);

        let request = RefreshRequest {
            id: self.next_refresh_id,
            base,
            targets: self.converter.foreign_currencies(),
        };
        tracing::debug!("Refresh #{} requested for {:?}", request.id, request.targets);
        request
    }

    /// Applies the outcome of `request`.
    ///
    /// Successful rates are always merged, even from superseded requests. A
    /// failure only applies the currency policy for the latest request.
    pub fn complete_refresh(
        &mut self,
        request: &RefreshRequest,
        outcome: Result<RateMap>,
    ) -> Result<RefreshStatus> {
        match outcome {
            Ok(rates) => {
                let merged = self.converter.merge_rates(rates);
                tracing::info!("Refresh #{} merged {} rate(s)", request.id, merged);
                self.publish()?;
                Ok(RefreshStatus::Merged(merged))
            }
            Err(e) if self.latest_refresh != Some(request.id) => {
                tracing::debug!("Dropping failure of superseded refresh #{}: {}", request.id, e);
                Ok(RefreshStatus::StaleFailure)
            }
            Err(e) => {
                tracing::warn!("Refresh #{} failed, locking foreign currencies: {}", request.id, e);
                let reference = self.converter.reference().clone();
                let expires_at = Utc::now()
                    .checked_add_signed(self.notice_duration)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                let notice = Notice {
                    message: CURRENCY_UNAVAILABLE_MESSAGE.to_string(),
                    expires_at,
                };
                self.commit(|s| {
                    s.form.currency = reference;
                    s.currency_locked = true;
                    s.notice = Some(notice);
                })?;
                Ok(RefreshStatus::Failed)
            }
        }
    }

    /// Runs a full refresh against `provider`.
    pub async fn refresh_with(&mut self, provider: &dyn RateProvider) -> Result<RefreshStatus> {
        let request = self.begin_refresh();
        let outcome = provider.fetch_rates(&request.base, &request.targets).await;
        self.complete_refresh(&request, outcome)
    }

    fn commit<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WizardState) -> T,
    {
        let output = self.store.mutate(f)?;
        self.publish()?;
        Ok(output)
    }

    fn publish(&mut self) -> Result<()> {
        let projection = self
            .renderer
            .render(self.store.state(), &self.converter, &self.prices)?;
        for sink in &mut self.sinks {
            sink.present(&projection);
        }
        self.projection = projection;
        Ok(())
    }
}
