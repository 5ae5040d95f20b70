//! Networking for g15control.

pub mod listener;

pub use listener::{ListenerConfig, ListenerHandle, RemoteListener};
