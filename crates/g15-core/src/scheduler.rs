//! The control loop.
//!
//! A ticker thread and the command queue both feed one channel of
//! [`LoopEvent`]s. The loop blocks on that channel, folds together whatever
//! has arrived, then drains commands and runs the tick on the calling
//! thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use g15_types::error::Result;
use g15_types::queue::LoopEvent;
use g15_types::surface::DrawingSurface;

use crate::controller::{Controller, InputResult};
use crate::dispatcher::InputDispatcher;

/// Work run right before every tick.
pub trait TickHook<S: DrawingSurface> {
    fn before_tick(&mut self, controller: &mut Controller<S>);
}

/// Hook that does nothing.
pub struct NoHook;

impl<S: DrawingSurface> TickHook<S> for NoHook {
    fn before_tick(&mut self, _controller: &mut Controller<S>) {}
}

/// What became due during one wait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Due {
    pub tick: bool,
    pub command: bool,
    pub shutdown: bool,
}

impl Due {
    fn add(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::Tick => self.tick = true,
            LoopEvent::Command => self.command = true,
            LoopEvent::Shutdown => self.shutdown = true,
        }
    }
}

struct Ticker {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

/// Blocking event loop over the controller.
pub struct RedrawScheduler {
    events: Receiver<LoopEvent>,
    ticker: Option<Ticker>,
}

impl RedrawScheduler {
    /// Scheduler with a ticker thread sending [`LoopEvent::Tick`] every
    /// `interval` through `waker`.
    pub fn new(
        events: Receiver<LoopEvent>,
        waker: Sender<LoopEvent>,
        interval: Duration,
    ) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let thread = std::thread::Builder::new()
            .name("g15-ticker".into())
            .spawn(move || {
                loop {
                    std::thread::sleep(interval);
                    if thread_stop.load(Ordering::Acquire) || waker.send(LoopEvent::Tick).is_err() {
                        break;
                    }
                }
            })?;
        log::debug!("ticking every {interval:?}");
        Ok(Self {
            events,
            ticker: Some(Ticker {
                stop,
                thread: Some(thread),
            }),
        })
    }

    /// Scheduler without a ticker; ticks must be sent by the caller.
    pub fn manual(events: Receiver<LoopEvent>) -> Self {
        Self {
            events,
            ticker: None,
        }
    }

    /// Block for the next event, then fold in anything else already
    /// queued. `None` once every sender is gone.
    pub fn wait(&self) -> Option<Due> {
        let mut due = Due::default();
        due.add(self.events.recv().ok()?);
        while let Ok(event) = self.events.try_recv() {
            due.add(event);
        }
        Some(due)
    }

    /// Run until the user quits, a shutdown event arrives, or every event
    /// source is gone.
    pub fn run<S, H>(&self, controller: &mut Controller<S>, dispatcher: &InputDispatcher, hook: &mut H)
    where
        S: DrawingSurface,
        H: TickHook<S>,
    {
        while let Some(due) = self.wait() {
            if due.command && dispatcher.drain(controller) == InputResult::Quit {
                log::info!("quit from menu");
                return;
            }
            if due.tick {
                hook.before_tick(controller);
                controller.tick();
            }
            if due.shutdown {
                log::info!("shutdown requested");
                controller.shutdown();
                return;
            }
        }
        log::info!("event sources closed");
    }
}

impl Drop for RedrawScheduler {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.as_mut() {
            ticker.stop.store(true, Ordering::Release);
            if let Some(thread) = ticker.thread.take() {
                let _ = thread.join();
            }
        }
    }
}
