pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, OutputFormat};

pub use adapters::{FixedRateProvider, HttpRateProvider, JsonViewSink, TextViewSink};
pub use config::WizardConfig;
pub use crate::core::{
    currency::CurrencyConverter,
    pricing::PriceTable,
    refresh::RefreshQueue,
    render::{Projection, RenderEngine},
    wizard::{Dispatch, RefreshStatus, SignupWizard},
};
pub use utils::error::{Result, WizardError};
