//! Time/price to pixel conversion.

pub mod mapper;
pub mod price_scale;
pub mod range_preset;
pub mod time_scale;

pub use mapper::*;
pub use price_scale::*;
pub use range_preset::*;
pub use time_scale::*;
