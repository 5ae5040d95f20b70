//! The shared command queue.
//!
//! Input threads push raw `BUTTON <NAME>` lines; the control thread pops
//! them. Every push also sends a [`LoopEvent::Command`] wakeup so the
//! scheduler can block instead of polling.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

/// Events that wake the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    /// The periodic redraw interval elapsed.
    Tick,
    /// At least one command was queued.
    Command,
    /// Stop the loop.
    Shutdown,
}

/// FIFO of raw command lines shared between threads.
#[derive(Debug)]
pub struct CommandQueue {
    lines: Mutex<VecDeque<String>>,
    pending: AtomicBool,
    wake: Sender<LoopEvent>,
}

impl CommandQueue {
    /// Create a queue together with the receiving end of its wakeup channel.
    pub fn new() -> (Arc<Self>, Receiver<LoopEvent>) {
        let (wake, events) = mpsc::channel();
        let queue = Self {
            lines: Mutex::new(VecDeque::new()),
            pending: AtomicBool::new(false),
            wake,
        };
        (Arc::new(queue), events)
    }

    /// Append a line and wake the control loop.
    pub fn push(&self, line: impl Into<String>) {
        let line = line.into();
        log::debug!("queued command: {line}");
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(line);
        self.pending.store(true, Ordering::Release);
        // The receiver is gone only once the loop has exited.
        let _ = self.wake.send(LoopEvent::Command);
    }

    /// Take the oldest line, if any.
    pub fn pop(&self) -> Option<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Read and reset the pending flag.
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn len(&self) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A sender for other event sources (the tick thread, shutdown hooks).
    pub fn waker(&self) -> Sender<LoopEvent> {
        self.wake.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let (queue, _events) = CommandQueue::new();
        queue.push("BUTTON G1");
        queue.push("BUTTON G2");
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().as_deref(), Some("BUTTON G1"));
        assert_eq!(queue.pop().as_deref(), Some("BUTTON G2"));
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn push_sets_pending_and_wakes() {
        let (queue, events) = CommandQueue::new();
        assert!(!queue.take_pending());
        queue.push("BUTTON M1");
        assert_eq!(events.try_recv(), Ok(LoopEvent::Command));
        assert!(queue.take_pending());
        assert!(!queue.take_pending());
    }

    #[test]
    fn push_after_receiver_dropped_does_not_panic() {
        let (queue, events) = CommandQueue::new();
        drop(events);
        queue.push("BUTTON CHG");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn concurrent_pushes_all_arrive() {
        let (queue, _events) = CommandQueue::new();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let q = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        q.push(format!("BUTTON G{t}-{i}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(queue.len(), 100);
    }

    #[test]
    fn waker_feeds_same_channel() {
        let (queue, events) = CommandQueue::new();
        queue.waker().send(LoopEvent::Tick).unwrap();
        assert_eq!(events.recv().unwrap(), LoopEvent::Tick);
    }
}
