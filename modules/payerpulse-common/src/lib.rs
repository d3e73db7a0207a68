pub mod config;
pub mod error;
pub mod rules;
pub mod types;

pub use config::Config;
pub use error::PayerPulseError;
pub use rules::RuleBook;
pub use types::*;
