//! Fan-out of updates to registered handlers.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};

use crate::update::Update;

/// An error a handler may return; logged and otherwise ignored.
#[derive(Debug)]
pub struct HandlerError(pub String);

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for HandlerError {}

type Handler = Arc<dyn Fn(&Update) -> Result<(), HandlerError> + Send + Sync>;

/// Delivers every update to all subscribed handlers in registration order.
///
/// A handler that returns an error or panics is logged and skipped; later
/// handlers still run and the connection state is unaffected.
#[derive(Default)]
pub struct UpdateDispatcher {
    handlers: Mutex<Vec<Handler>>,
}

impl UpdateDispatcher {
    /// Register a handler. Handlers run in subscription order.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&Update) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.handlers.lock().unwrap().push(Arc::new(handler));
    }

    /// Deliver `update` to every handler.
    ///
    /// The handler list is snapshotted up front, so a handler may subscribe
    /// further handlers; those see the next update, not the current one.
    pub fn dispatch(&self, update: &Update) {
        let handlers: Vec<Handler> = self.handlers.lock().unwrap().clone();
        for (i, handler) in handlers.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| handler(update))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("update handler #{i} failed: {e}"),
                Err(_) => log::error!("update handler #{i} panicked"),
            }
        }
    }

    /// Number of subscribed handlers.
    pub fn len(&self) -> usize {
        self.handlers.lock().unwrap().len()
    }

    /// Whether any handler is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
