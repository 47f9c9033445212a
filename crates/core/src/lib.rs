pub mod config;
pub mod error;
pub mod experimentation;
pub mod types;

pub use config::AppConfig;
pub use error::{MarketError, MarketResult};
