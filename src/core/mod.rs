pub mod controller;
pub mod currency;
pub mod pricing;
pub mod refresh;
pub mod render;
pub mod state;
pub mod validation;
pub mod wizard;

pub use crate::domain::model::{BillingCycle, CurrencyCode, ItemId, UserEvent, WizardState};
pub use crate::domain::ports::{RateProvider, ViewSink};
pub use crate::utils::error::Result;
