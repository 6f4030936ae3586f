pub mod http;
pub mod polling;
pub mod services;
