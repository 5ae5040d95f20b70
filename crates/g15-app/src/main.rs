//! g15control entry point.
//!
//! Loads the TOML config, opens the configured LCD backend, starts the
//! remote command listener, and runs the control loop until the user picks
//! "Exit G15 Control" from the menu.
//!
//! Usage: `g15control [CONFIG]`. Without an argument the path comes from
//! `G15CONTROL_CONFIG`, then `$HOME/.g15control.toml`.

mod backend;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use backend::BackendSupervisor;
use g15_core::{AppContext, Controller, InputDispatcher, RedrawScheduler};
use g15_net::{ListenerConfig, RemoteListener};
use g15_platform::StdProcessLauncher;
use g15_plugins::builtin_catalog;
use g15_types::config::{ControlConfig, default_config_path};
use g15_types::queue::CommandQueue;
use g15_types::surface::DrawingSurface;

const CONFIG_ENV: &str = "G15CONTROL_CONFIG";

fn config_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os(CONFIG_ENV))
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path)
}

fn main() -> Result<()> {
    let path = config_path();
    if !path.exists() {
        ControlConfig::write_template(&path)
            .with_context(|| format!("cannot write a config template to {}", path.display()))?;
        bail!(
            "no configuration found; a template was written to {}. Edit it and start again",
            path.display()
        );
    }
    let config = ControlConfig::load(&path)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;

    let level = if config.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    log::info!("g15control {} using {}", env!("CARGO_PKG_VERSION"), path.display());

    let (queue, events) = CommandQueue::new();
    let launcher = StdProcessLauncher::new();

    let mut supervisor = BackendSupervisor::new(
        config.backend.clone(),
        config.debug,
        Arc::clone(&queue),
        launcher.clone(),
    );
    let surface = supervisor.open().context("cannot open the LCD backend")?;
    log::info!("drawing to the {} backend", surface.backend_name());

    let _listener = if config.remote.enabled {
        match RemoteListener::new(ListenerConfig::from(&config.remote), Arc::clone(&queue)).spawn() {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("remote commands disabled: {e}");
                None
            },
        }
    } else {
        None
    };

    let interval = Duration::from_millis(config.tick_interval_ms);
    let scheduler = RedrawScheduler::new(events, queue.waker(), interval)?;

    let ctx = AppContext::new(config, builtin_catalog(), queue)
        .with_config_path(&path)
        .with_launcher(Box::new(launcher));
    let dispatcher = InputDispatcher::from_context(&ctx);
    let mut controller = Controller::new(surface, ctx);
    controller.start();

    scheduler.run(&mut controller, &dispatcher, &mut supervisor);

    supervisor.shutdown();
    log::info!("g15control stopped");
    Ok(())
}
