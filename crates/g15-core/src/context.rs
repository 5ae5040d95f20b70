//! Everything the controller needs besides its drawing surface.

use std::path::PathBuf;
use std::sync::Arc;

use g15_platform::process::{ProcessLauncher, StdProcessLauncher};
use g15_platform::services::{LocalClock, TimeService};
use g15_types::config::ControlConfig;
use g15_types::queue::CommandQueue;

use crate::plugin::PluginCatalog;

/// Configuration plus injected services.
pub struct AppContext {
    pub config: ControlConfig,
    /// Where `config` came from. `None` disables "Reload Config".
    pub config_path: Option<PathBuf>,
    pub catalog: PluginCatalog,
    pub launcher: Box<dyn ProcessLauncher>,
    pub clock: Box<dyn TimeService>,
    pub queue: Arc<CommandQueue>,
}

impl AppContext {
    /// Context with the desktop launcher and the local clock.
    pub fn new(config: ControlConfig, catalog: PluginCatalog, queue: Arc<CommandQueue>) -> Self {
        Self {
            config,
            config_path: None,
            catalog,
            launcher: Box::new(StdProcessLauncher::new()),
            clock: Box::new(LocalClock),
            queue,
        }
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_launcher(mut self, launcher: Box<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn TimeService>) -> Self {
        self.clock = clock;
        self
    }
}
