pub mod chart_service;
pub mod config;
pub mod use_cases;

pub use chart_service::*;
pub use config::*;
pub use use_cases::*;
