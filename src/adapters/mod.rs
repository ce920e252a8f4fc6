// Adapters layer: concrete implementations of the domain ports (rate providers, view sinks).

pub mod console;
pub mod http;
pub mod memory;

pub use console::{parse_command, Command, JsonViewSink, TextViewSink};
pub use http::HttpRateProvider;
pub use memory::FixedRateProvider;
