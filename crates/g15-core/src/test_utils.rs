//! Shared test helpers: a probe plugin that records its lifecycle calls and
//! a launcher that records instead of spawning.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use g15_platform::process::{ProcessHandle, ProcessLauncher};
use g15_types::error::{G15Error, Result};
use g15_types::geometry::{Alignment, FontSize, Point};
use g15_types::input::LcdButton;
use g15_types::surface::DrawingSurface;

use crate::plugin::{PluginCatalog, PluginContext, ScreenPlugin};

#[derive(Default)]
struct Inner {
    events: Vec<String>,
    fail_load: HashSet<String>,
    focus: HashMap<String, u32>,
}

/// Shared event log written by every [`ProbePlugin`].
#[derive(Clone, Default)]
pub struct ProbeLog(Arc<Mutex<Inner>>);

impl ProbeLog {
    fn push(&self, event: String) {
        self.0.lock().unwrap().events.push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().events.clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| *e == event)
            .count()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().events.clear();
    }

    /// Make `on_load` fail for plugins named `name`.
    pub fn fail_load(&self, name: &str) {
        self.0.lock().unwrap().fail_load.insert(name.to_string());
    }

    /// Make `poll_focus` return `priority` once for `name`.
    pub fn want_focus(&self, name: &str, priority: u32) {
        self.0.lock().unwrap().focus.insert(name.to_string(), priority);
    }
}

/// Plugin that records every callback as `name:event`.
pub struct ProbePlugin {
    name: String,
    log: ProbeLog,
}

impl ProbePlugin {
    pub fn boxed(name: &str, log: &ProbeLog) -> Box<dyn ScreenPlugin> {
        Box::new(Self {
            name: name.to_string(),
            log: log.clone(),
        })
    }

    fn record(&self, event: &str) {
        self.log.push(format!("{}:{event}", self.name));
    }
}

impl ScreenPlugin for ProbePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_load(&mut self, _settings: Option<&toml::Table>) -> Result<()> {
        self.record("load");
        if self.log.0.lock().unwrap().fail_load.contains(&self.name) {
            return Err(G15Error::Plugin("probe told to fail".into()));
        }
        Ok(())
    }

    fn on_screen_changed(&mut self, _surface: &dyn DrawingSurface) {
        self.record("screen_changed");
    }

    fn on_activate(&mut self, ctx: &mut PluginContext<'_>) {
        self.record("activate");
        ctx.surface.clear(false);
        ctx.surface
            .draw_text(FontSize::Small, Point::new(0, 0), Alignment::Left, &self.name);
        ctx.surface.commit_silently();
    }

    fn on_deactivate(&mut self) {
        self.record("deactivate");
    }

    fn on_redraw(&mut self, _ctx: &mut PluginContext<'_>) {
        self.record("redraw");
    }

    fn on_button(&mut self, button: LcdButton, _ctx: &mut PluginContext<'_>) {
        self.record(&format!("button{}", button.number()));
    }

    fn poll_focus(&mut self) -> Option<u32> {
        self.log.0.lock().unwrap().focus.remove(&self.name)
    }

    fn on_unload(&mut self) {
        self.record("unload");
    }
}

/// Catalog with one probe plugin per name, all sharing `log`.
pub fn probe_catalog(log: &ProbeLog, names: &[&str]) -> PluginCatalog {
    let mut catalog = PluginCatalog::new();
    for &name in names {
        let log = log.clone();
        let owned = name.to_string();
        catalog.register(name, move || ProbePlugin::boxed(&owned, &log));
    }
    catalog
}

/// Launcher that records requests instead of spawning anything.
#[derive(Clone, Default)]
pub struct RecordingLauncher {
    launches: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    fail: bool,
}

impl RecordingLauncher {
    /// A launcher whose every launch fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn launches(&self) -> Vec<(String, Vec<String>)> {
        self.launches.lock().unwrap().clone()
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn launch(&self, program: &str, args: &[String]) -> Result<ProcessHandle> {
        self.launches
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));
        if self.fail {
            return Err(G15Error::Process(format!("cannot start {program}")));
        }
        Ok(ProcessHandle::new(format!("{program}-0")))
    }

    fn is_alive(&self, _handle: &ProcessHandle) -> bool {
        !self.fail
    }

    fn terminate(&self, _handle: &ProcessHandle) -> bool {
        true
    }
}
