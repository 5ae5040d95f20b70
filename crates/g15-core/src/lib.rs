//! g15control core: the controller state machine, built-in menu, screen
//! plugin lifecycle, command dispatch, and the redraw scheduler.

pub mod context;
pub mod controller;
pub mod dispatcher;
pub mod home;
pub mod menu;
pub mod plugin;
pub mod scheduler;

#[cfg(test)]
mod test_utils;

pub use context::AppContext;
pub use controller::{Controller, InputResult, MMode};
pub use dispatcher::InputDispatcher;
pub use menu::{MenuAction, MenuItem, MenuModel};
pub use plugin::{
    PluginCatalog, PluginContext, PluginFactory, PluginManager, PluginState, ScreenPlugin,
};
pub use scheduler::{NoHook, RedrawScheduler, TickHook};
