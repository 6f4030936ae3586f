use wasm_bindgen::prelude::*;

use crate::domain::logging::{get_logger, LogComponent};

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

/// Installs the panic hook, the console logger and the browser clock.
#[wasm_bindgen(start)]
pub fn initialize() {
    console_error_panic_hook::set_once();

    let console_logger = if cfg!(debug_assertions) {
        infrastructure::services::ConsoleLogger::new_development()
    } else {
        infrastructure::services::ConsoleLogger::new_production()
    };
    domain::logging::init_logger(Box::new(console_logger));

    let browser_time_provider = Box::new(infrastructure::services::BrowserTimeProvider::new());
    domain::logging::init_time_provider(browser_time_provider);

    get_logger().info(LogComponent::Presentation("Initialize"), "floor chart ready");
}
