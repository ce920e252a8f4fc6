use crate::core::render::Projection;
use crate::domain::model::{CurrencyCode, RateMap};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Source of exchange rates relative to a reference currency.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_rates(&self, base: &CurrencyCode, targets: &[CurrencyCode]) -> Result<RateMap>;
}

/// Receives the projection produced after every committed mutation.
pub trait ViewSink {
    fn present(&mut self, projection: &Projection);
}
