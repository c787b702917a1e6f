pub mod config;
pub mod error;
pub mod watchdog_client;

pub use config::*;
pub use error::*;
pub use watchdog_client::*;
