use crate::domain::logging::{get_logger, LogComponent};
use gloo_timers::future::TimeoutFuture;
use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

/// Stops a polling loop started with [`start_polling`].
#[derive(Debug, Clone)]
pub struct PollingHandle {
    stopped: Rc<Cell<bool>>,
}

impl PollingHandle {
    /// The loop exits at its next wake-up; a round already running finishes.
    pub fn stop(&self) {
        self.stopped.set(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }
}

/// Runs `round` every `interval_ms` on the browser event loop until the
/// returned handle is stopped. Rounds never overlap.
pub fn start_polling<F, Fut>(interval_ms: u32, mut round: F) -> PollingHandle
where
    F: FnMut() -> Fut + 'static,
    Fut: Future<Output = ()> + 'static,
{
    let stopped = Rc::new(Cell::new(false));
    let flag = Rc::clone(&stopped);
    wasm_bindgen_futures::spawn_local(async move {
        get_logger().debug(LogComponent::Infrastructure("Polling"), &format!("every {} ms", interval_ms));
        loop {
            TimeoutFuture::new(interval_ms).await;
            if flag.get() {
                break;
            }
            round().await;
        }
        get_logger().debug(LogComponent::Infrastructure("Polling"), "stopped");
    });
    PollingHandle { stopped }
}
