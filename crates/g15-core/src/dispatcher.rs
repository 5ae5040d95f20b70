//! Drains the shared command queue into the controller.

use std::sync::Arc;

use g15_types::input::ButtonEvent;
use g15_types::queue::CommandQueue;
use g15_types::surface::DrawingSurface;

use crate::context::AppContext;
use crate::controller::{Controller, InputResult};

/// Decodes queued `BUTTON <NAME>` lines and hands them to the controller.
pub struct InputDispatcher {
    queue: Arc<CommandQueue>,
}

impl InputDispatcher {
    pub fn new(queue: Arc<CommandQueue>) -> Self {
        Self { queue }
    }

    /// Dispatcher over the queue the context's listeners feed.
    pub fn from_context(ctx: &AppContext) -> Self {
        Self::new(Arc::clone(&ctx.queue))
    }

    pub fn queue(&self) -> &Arc<CommandQueue> {
        &self.queue
    }

    /// Handle queued commands until the queue is empty or one of them
    /// quits. Malformed lines are dropped.
    pub fn drain<S: DrawingSurface>(&self, controller: &mut Controller<S>) -> InputResult {
        self.queue.take_pending();
        while let Some(line) = self.queue.pop() {
            let Some(event) = ButtonEvent::parse(&line) else {
                log::debug!("dropping malformed command {line:?}");
                continue;
            };
            log::debug!("dispatching {event:?}");
            if controller.handle_event(event) == InputResult::Quit {
                return InputResult::Quit;
            }
        }
        InputResult::Continue
    }
}
