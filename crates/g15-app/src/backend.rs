//! Backend selection and renderer supervision.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};

use g15_core::{Controller, TickHook};
use g15_platform::process::{ProcessHandle, ProcessLauncher, split_args};
use g15_surface::{ComposerSurface, DaemonSurface, MemorySurface};
use g15_types::config::BackendConfig;
use g15_types::queue::{CommandQueue, LoopEvent};
use g15_types::surface::DrawingSurface;

pub type BoxedSurface = Box<dyn DrawingSurface>;

/// How long a renderer gets to create its pipe and start reading it.
const PIPE_WAIT: Duration = Duration::from_secs(5);
const PIPE_POLL: Duration = Duration::from_millis(50);

/// Opens the configured surface and restarts an owned renderer that dies.
pub struct BackendSupervisor<L: ProcessLauncher> {
    config: BackendConfig,
    debug: bool,
    queue: Arc<CommandQueue>,
    launcher: L,
    renderer: Option<ProcessHandle>,
}

impl<L: ProcessLauncher> BackendSupervisor<L> {
    pub fn new(config: BackendConfig, debug: bool, queue: Arc<CommandQueue>, launcher: L) -> Self {
        Self {
            config,
            debug,
            queue,
            launcher,
            renderer: None,
        }
    }

    /// Build the configured surface, starting the renderer first when the
    /// composer backend has an `exec` line.
    pub fn open(&mut self) -> Result<BoxedSurface> {
        match self.config.clone() {
            BackendConfig::Composer {
                pipe,
                exec,
                type3_workaround,
            } => {
                let renderer = match exec {
                    Some(command) => {
                        let handle = self.start_renderer(&command)?;
                        self.renderer = Some(handle.clone());
                        Some(handle)
                    },
                    None => None,
                };
                let launcher = &self.launcher;
                let alive = || renderer.as_ref().is_none_or(|h| launcher.is_alive(h));
                if renderer.is_some() {
                    wait_for_pipe(&pipe, alive)?;
                }
                let surface = open_pipe(&pipe, alive)
                    .with_context(|| format!("composer pipe {}", pipe.display()))?
                    .with_type3_workaround(type3_workaround);
                Ok(Box::new(surface))
            },
            BackendConfig::Daemon { host, port } => {
                let surface = DaemonSurface::connect(&host, port, Arc::clone(&self.queue))
                    .with_context(|| format!("LCD daemon at {host}:{port}"))?;
                Ok(Box::new(surface))
            },
            BackendConfig::Headless => Ok(Box::new(MemorySurface::new().with_frame_dump(self.debug))),
        }
    }

    fn start_renderer(&self, command: &str) -> Result<ProcessHandle> {
        let mut args = split_args(command);
        if args.is_empty() {
            bail!("backend.exec is empty");
        }
        let program = args.remove(0);
        let handle = self
            .launcher
            .launch(&program, &args)
            .with_context(|| format!("cannot start renderer {program}"))?;
        log::info!("renderer started as {handle}");
        Ok(handle)
    }

    /// Kill the renderer if we started one.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.renderer.take() {
            if self.launcher.terminate(&handle) {
                log::info!("renderer {handle} stopped");
            }
        }
    }
}

fn wait_for_pipe(pipe: &Path, renderer_alive: impl Fn() -> bool) -> Result<()> {
    let start = Instant::now();
    while !pipe.exists() {
        if !renderer_alive() {
            bail!("renderer exited before creating {}", pipe.display());
        }
        if start.elapsed() >= PIPE_WAIT {
            bail!("renderer never created {}", pipe.display());
        }
        std::thread::sleep(PIPE_POLL);
    }
    Ok(())
}

/// Open the pipe on a helper thread. Opening a FIFO for writing blocks until
/// a reader shows up; the control thread gives up after [`PIPE_WAIT`] or as
/// soon as the renderer is gone.
fn open_pipe(pipe: &Path, renderer_alive: impl Fn() -> bool) -> Result<ComposerSurface<File>> {
    let (tx, rx) = mpsc::channel();
    let path = pipe.to_path_buf();
    std::thread::Builder::new()
        .name("g15-pipe-open".into())
        .spawn(move || {
            let _ = tx.send(ComposerSurface::open(&path));
        })?;
    let start = Instant::now();
    loop {
        match rx.recv_timeout(PIPE_POLL) {
            Ok(opened) => return Ok(opened?),
            Err(RecvTimeoutError::Disconnected) => bail!("pipe opener thread died"),
            Err(RecvTimeoutError::Timeout) => {},
        }
        if !renderer_alive() {
            bail!("renderer exited before reading {}", pipe.display());
        }
        if start.elapsed() >= PIPE_WAIT {
            bail!("nothing is reading {}", pipe.display());
        }
    }
}

impl<L: ProcessLauncher> TickHook<BoxedSurface> for BackendSupervisor<L> {
    fn before_tick(&mut self, controller: &mut Controller<BoxedSurface>) {
        let Some(handle) = &self.renderer else {
            return;
        };
        if self.launcher.is_alive(handle) {
            return;
        }
        log::warn!("renderer {handle} exited, restarting backend");
        self.renderer = None;
        match self.open() {
            Ok(surface) => {
                controller.replace_surface(surface);
            },
            Err(e) => {
                log::error!("backend restart failed: {e:#}");
                let _ = self.queue.waker().send(LoopEvent::Shutdown);
            },
        }
    }
}
