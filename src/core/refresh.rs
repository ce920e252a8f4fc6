use crate::core::wizard::RefreshRequest;
use crate::domain::model::RateMap;
use crate::domain::ports::RateProvider;
use crate::utils::error::Result;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Runs rate fetches as background tasks so the caller keeps handling input.
///
/// Completions come back in the order they finish, which may differ from the
/// order they were requested. Hand each one to
/// [`SignupWizard::complete_refresh`](crate::core::wizard::SignupWizard::complete_refresh).
pub struct RefreshQueue {
    provider: Arc<dyn RateProvider>,
    tasks: JoinSet<(RefreshRequest, Result<RateMap>)>,
}

impl RefreshQueue {
    pub fn new(provider: Arc<dyn RateProvider>) -> Self {
        Self {
            provider,
            tasks: JoinSet::new(),
        }
    }

    /// Starts fetching rates for `request`. Must be called inside a tokio runtime.
    pub fn spawn(&mut self, request: RefreshRequest) {
        let provider = Arc::clone(&self.provider);
        tracing::debug!("Fetching rates for refresh #{} in the background", request.id);
        self.tasks.spawn(async move {
            let outcome = provider.fetch_rates(&request.base, &request.targets).await;
            (request, outcome)
        });
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Waits for the next fetch to finish. `None` once nothing is outstanding.
    pub async fn next(&mut self) -> Option<(RefreshRequest, Result<RateMap>)> {
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(completed) => return Some(completed),
                Err(e) => tracing::error!("Rate fetch task failed: {}", e),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::WizardConfig;
    use crate::core::wizard::{Dispatch, RefreshStatus, SignupWizard, INVALID_BASE_CURRENCY};
    use crate::domain::model::{BillingCycle, CurrencyCode, UserEvent};
    use crate::utils::error::WizardError;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Fails slowly for the invalid base, answers at once otherwise.
    struct SlowFailureProvider;

    #[async_trait]
    impl RateProvider for SlowFailureProvider {
        async fn fetch_rates(
            &self,
            base: &CurrencyCode,
            _targets: &[CurrencyCode],
        ) -> Result<RateMap> {
            if base.as_str() == INVALID_BASE_CURRENCY {
                tokio::time::sleep(Duration::from_millis(50)).await;
                return Err(WizardError::RateProviderError {
                    message: "status 404".to_string(),
                });
            }
            Ok(RateMap::from([(CurrencyCode::from("EUR"), 1.16)]))
        }
    }

    fn requested(dispatch: Dispatch) -> RefreshRequest {
        match dispatch {
            Dispatch::RefreshRequested(request) => request,
            other => panic!("expected a refresh request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_events_handled_while_fetch_outstanding() {
        let mut wizard = SignupWizard::new(&WizardConfig::default()).unwrap();
        let mut queue = RefreshQueue::new(Arc::new(SlowFailureProvider));

        queue.spawn(requested(wizard.dispatch(UserEvent::SimulateRateFailure).unwrap()));
        assert_eq!(queue.len(), 1);

        wizard
            .dispatch(UserEvent::ChangeBilling(BillingCycle::Yearly))
            .unwrap();
        assert_eq!(wizard.state().form.billing, BillingCycle::Yearly);
        assert!(!wizard.state().currency_locked);

        let (request, outcome) = queue.next().await.unwrap();
        assert_eq!(
            wizard.complete_refresh(&request, outcome).unwrap(),
            RefreshStatus::Failed
        );
        assert!(wizard.state().currency_locked);
        assert!(queue.is_empty());
        assert!(queue.next().await.is_none());
    }

    #[tokio::test]
    async fn test_slow_superseded_failure_arrives_stale() {
        let mut wizard = SignupWizard::new(&WizardConfig::default()).unwrap();
        let mut queue = RefreshQueue::new(Arc::new(SlowFailureProvider));

        queue.spawn(requested(wizard.dispatch(UserEvent::SimulateRateFailure).unwrap()));
        queue.spawn(requested(wizard.dispatch(UserEvent::ChangeCurrency("EUR".into())).unwrap()));

        let mut statuses = Vec::new();
        while let Some((request, outcome)) = queue.next().await {
            statuses.push(wizard.complete_refresh(&request, outcome).unwrap());
        }

        assert_eq!(
            statuses,
            vec![RefreshStatus::Merged(1), RefreshStatus::StaleFailure]
        );
        assert_eq!(wizard.state().form.currency.as_str(), "EUR");
        assert!(!wizard.state().currency_locked);
        assert_eq!(wizard.converter().rate(&"EUR".into()), Some(1.16));
    }
}
