//! Screen plugins: the trait, the static catalog, and lifecycle tracking.
//!
//! Plugins are compiled in and registered by name in a [`PluginCatalog`].
//! Loading a plugin constructs a fresh instance from its factory; reloading
//! is unload followed by load. The [`PluginManager`] owns loaded instances
//! and enforces the lifecycle:
//!
//! ```text
//! Unloaded -> Loaded -> Active <-> Inactive -> Unloaded
//! ```

use g15_platform::services::{TimeService, WallTime};
use g15_types::error::{G15Error, Result};
use g15_types::input::LcdButton;
use g15_types::surface::DrawingSurface;

/// What a plugin gets to work with during a callback.
pub struct PluginContext<'a> {
    pub surface: &'a mut dyn DrawingSurface,
    pub clock: &'a dyn TimeService,
}

impl<'a> PluginContext<'a> {
    pub fn new(surface: &'a mut dyn DrawingSurface, clock: &'a dyn TimeService) -> Self {
        Self { surface, clock }
    }

    /// Current wall time, or midnight if the clock is unavailable.
    pub fn now(&self) -> WallTime {
        self.clock.now().unwrap_or_default()
    }
}

/// A full-screen UI unit.
pub trait ScreenPlugin {
    /// Stable plugin name.
    fn name(&self) -> &str;

    /// Called once after construction. Must not draw.
    fn on_load(&mut self, _settings: Option<&toml::Table>) -> Result<()> {
        Ok(())
    }

    /// The surface implementation was replaced. Rebind, do not draw.
    fn on_screen_changed(&mut self, _surface: &dyn DrawingSurface) {}

    /// Gained the screen. The buffer is in an unknown state: redraw fully.
    fn on_activate(&mut self, ctx: &mut PluginContext<'_>);

    /// Lost the screen. Stop background work; pixels may be left as-is.
    fn on_deactivate(&mut self) {}

    /// One scheduler tick while active.
    fn on_redraw(&mut self, ctx: &mut PluginContext<'_>);

    /// A soft button was pressed while active.
    fn on_button(&mut self, _button: LcdButton, _ctx: &mut PluginContext<'_>) {}

    /// Asked once per tick while loaded but not active. Returning a
    /// priority asks the controller to bring this plugin to the front.
    fn poll_focus(&mut self) -> Option<u32> {
        None
    }

    /// Release resources before destruction.
    fn on_unload(&mut self) {}
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Constructor for a plugin instance.
pub type PluginFactory = Box<dyn Fn() -> Box<dyn ScreenPlugin>>;

/// Name to factory registry of every plugin the binary knows about.
#[derive(Default)]
pub struct PluginCatalog {
    entries: Vec<(String, PluginFactory)>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory. A later registration under the same name
    /// (case-insensitive) replaces the earlier one.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn ScreenPlugin> + 'static,
    {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.entries.push((name.to_string(), Box::new(factory)));
    }

    /// Canonical registered name for `name`.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(n, _)| n.as_str())
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn ScreenPlugin>> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, f)| f())
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Lifecycle state of a loaded plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// Constructed and loaded, never activated.
    Loaded,
    Active,
    Inactive,
}

struct Slot {
    handle: String,
    plugin: Box<dyn ScreenPlugin>,
    state: PluginState,
}

/// Owner of every loaded plugin instance.
#[derive(Default)]
pub struct PluginManager {
    slots: Vec<Slot>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, handle: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.handle.eq_ignore_ascii_case(handle))
    }

    fn slot_mut(&mut self, handle: &str) -> Option<&mut Slot> {
        self.slots
            .iter_mut()
            .find(|s| s.handle.eq_ignore_ascii_case(handle))
    }

    /// Construct and load a plugin. Returns its canonical handle.
    pub fn load(
        &mut self,
        catalog: &PluginCatalog,
        name: &str,
        settings: Option<&toml::Table>,
    ) -> Result<String> {
        let handle = catalog
            .resolve(name)
            .ok_or_else(|| G15Error::Plugin(format!("unknown plugin: {name}")))?
            .to_string();
        if self.contains(&handle) {
            return Err(G15Error::Plugin(format!("{handle} is already loaded")));
        }
        let mut plugin = catalog
            .create(&handle)
            .ok_or_else(|| G15Error::Plugin(format!("unknown plugin: {name}")))?;
        plugin
            .on_load(settings)
            .map_err(|e| G15Error::Plugin(format!("{handle} failed to load: {e}")))?;
        log::info!("loaded plugin {handle}");
        self.slots.push(Slot {
            handle: handle.clone(),
            plugin,
            state: PluginState::Loaded,
        });
        Ok(handle)
    }

    /// Deactivate if needed, run `on_unload`, and drop the instance.
    pub fn unload(&mut self, handle: &str) -> Result<()> {
        let idx = self
            .slots
            .iter()
            .position(|s| s.handle.eq_ignore_ascii_case(handle))
            .ok_or_else(|| G15Error::Plugin(format!("{handle} is not loaded")))?;
        let mut slot = self.slots.remove(idx);
        if slot.state == PluginState::Active {
            slot.plugin.on_deactivate();
        }
        slot.plugin.on_unload();
        log::info!("unloaded plugin {}", slot.handle);
        Ok(())
    }

    /// Unload and construct a fresh instance.
    pub fn reload(
        &mut self,
        catalog: &PluginCatalog,
        handle: &str,
        settings: Option<&toml::Table>,
    ) -> Result<String> {
        self.unload(handle)?;
        self.load(catalog, handle, settings)
    }

    /// Unload everything, in load order.
    pub fn unload_all(&mut self) {
        for handle in self.handles() {
            if let Err(e) = self.unload(&handle) {
                log::warn!("{e}");
            }
        }
    }

    /// Give `handle` the screen. False if not loaded or already active.
    pub fn activate(&mut self, handle: &str, ctx: &mut PluginContext<'_>) -> bool {
        let Some(slot) = self.slot_mut(handle) else {
            return false;
        };
        if slot.state == PluginState::Active {
            return false;
        }
        slot.state = PluginState::Active;
        slot.plugin.on_activate(ctx);
        true
    }

    /// Take the screen away. A no-op (false) unless the plugin is active.
    pub fn deactivate(&mut self, handle: &str) -> bool {
        match self.slot_mut(handle) {
            Some(slot) if slot.state == PluginState::Active => {
                slot.state = PluginState::Inactive;
                slot.plugin.on_deactivate();
                true
            },
            _ => false,
        }
    }

    /// Tick an active plugin.
    pub fn redraw(&mut self, handle: &str, ctx: &mut PluginContext<'_>) {
        if let Some(slot) = self.slot_mut(handle).filter(|s| s.state == PluginState::Active) {
            slot.plugin.on_redraw(ctx);
        }
    }

    /// Forward a soft button to an active plugin.
    pub fn button(&mut self, handle: &str, button: LcdButton, ctx: &mut PluginContext<'_>) {
        if let Some(slot) = self.slot_mut(handle).filter(|s| s.state == PluginState::Active) {
            slot.plugin.on_button(button, ctx);
        }
    }

    /// Tell every plugin the surface implementation changed.
    pub fn screen_changed(&mut self, surface: &dyn DrawingSurface) {
        for slot in &mut self.slots {
            slot.plugin.on_screen_changed(surface);
        }
    }

    /// Focus requests from loaded, inactive plugins.
    pub fn poll_focus(&mut self) -> Vec<(String, u32)> {
        self.slots
            .iter_mut()
            .filter(|s| s.state != PluginState::Active)
            .filter_map(|s| s.plugin.poll_focus().map(|p| (s.handle.clone(), p)))
            .collect()
    }

    pub fn state(&self, handle: &str) -> Option<PluginState> {
        self.slot(handle).map(|s| s.state)
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.slot(handle).is_some()
    }

    /// Handles in load order.
    pub fn handles(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.handle.clone()).collect()
    }

    /// Handle of the active plugin, if any.
    pub fn active(&self) -> Option<&str> {
        self.slots
            .iter()
            .find(|s| s.state == PluginState::Active)
            .map(|s| s.handle.as_str())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ProbeLog, probe_catalog};
    use g15_platform::services::FixedClock;
    use g15_surface::MemorySurface;

    fn ctx<'a>(surface: &'a mut MemorySurface, clock: &'a FixedClock) -> PluginContext<'a> {
        PluginContext::new(surface, clock)
    }

    #[test]
    fn catalog_is_case_insensitive() {
        let log = ProbeLog::default();
        let catalog = probe_catalog(&log, &["Alpha"]);
        assert_eq!(catalog.resolve("alpha"), Some("Alpha"));
        assert!(catalog.create("ALPHA").is_some());
        assert!(catalog.create("beta").is_none());
        assert_eq!(catalog.names(), vec!["Alpha"]);
    }

    #[test]
    fn catalog_register_replaces() {
        let log = ProbeLog::default();
        let mut catalog = probe_catalog(&log, &["a"]);
        let log2 = log.clone();
        catalog.register("A", move || crate::test_utils::ProbePlugin::boxed("A", &log2));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.resolve("a"), Some("A"));
    }

    #[test]
    fn load_calls_on_load_once() {
        let log = ProbeLog::default();
        let catalog = probe_catalog(&log, &["p1"]);
        let mut mgr = PluginManager::new();
        assert_eq!(mgr.load(&catalog, "P1", None).unwrap(), "p1");
        assert_eq!(mgr.state("p1"), Some(PluginState::Loaded));
        assert_eq!(log.events(), vec!["p1:load"]);
    }

    #[test]
    fn load_unknown_or_twice_fails() {
        let log = ProbeLog::default();
        let catalog = probe_catalog(&log, &["p1"]);
        let mut mgr = PluginManager::new();
        assert!(mgr.load(&catalog, "nope", None).is_err());
        mgr.load(&catalog, "p1", None).unwrap();
        assert!(mgr.load(&catalog, "p1", None).is_err());
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn failing_on_load_is_dropped() {
        let log = ProbeLog::default();
        let catalog = probe_catalog(&log, &["broken"]);
        log.fail_load("broken");
        let mut mgr = PluginManager::new();
        let err = mgr.load(&catalog, "broken", None).unwrap_err();
        assert!(format!("{err}").contains("failed to load"));
        assert!(mgr.is_empty());
    }

    #[test]
    fn activate_deactivate_cycle() {
        let log = ProbeLog::default();
        let catalog = probe_catalog(&log, &["p1"]);
        let mut mgr = PluginManager::new();
        let mut surface = MemorySurface::new();
        let clock = FixedClock::default();
        mgr.load(&catalog, "p1", None).unwrap();

        assert!(mgr.activate("p1", &mut ctx(&mut surface, &clock)));
        assert!(!mgr.activate("p1", &mut ctx(&mut surface, &clock)));
        assert_eq!(mgr.active(), Some("p1"));
        mgr.redraw("p1", &mut ctx(&mut surface, &clock));
        assert!(mgr.deactivate("p1"));
        assert_eq!(mgr.state("p1"), Some(PluginState::Inactive));
        mgr.redraw("p1", &mut ctx(&mut surface, &clock));
        assert_eq!(log.events(), vec!["p1:load", "p1:activate", "p1:redraw", "p1:deactivate"]);
    }

    #[test]
    fn deactivate_inactive_is_noop() {
        let log = ProbeLog::default();
        let catalog = probe_catalog(&log, &["p1"]);
        let mut mgr = PluginManager::new();
        mgr.load(&catalog, "p1", None).unwrap();
        assert!(!mgr.deactivate("p1"));
        assert!(!mgr.deactivate("p1"));
        assert!(!mgr.deactivate("missing"));
        assert_eq!(log.count("p1:deactivate"), 0);
    }

    #[test]
    fn unload_active_deactivates_first() {
        let log = ProbeLog::default();
        let catalog = probe_catalog(&log, &["p1"]);
        let mut mgr = PluginManager::new();
        let mut surface = MemorySurface::new();
        let clock = FixedClock::default();
        mgr.load(&catalog, "p1", None).unwrap();
        mgr.activate("p1", &mut ctx(&mut surface, &clock));
        mgr.unload("p1").unwrap();
        assert!(!mgr.contains("p1"));
        assert_eq!(
            log.events(),
            vec!["p1:load", "p1:activate", "p1:deactivate", "p1:unload"]
        );
        assert!(mgr.unload("p1").is_err());
    }

    #[test]
    fn reload_constructs_fresh_instance() {
        let log = ProbeLog::default();
        let catalog = probe_catalog(&log, &["p1"]);
        let mut mgr = PluginManager::new();
        mgr.load(&catalog, "p1", None).unwrap();
        mgr.reload(&catalog, "p1", None).unwrap();
        assert_eq!(log.events(), vec!["p1:load", "p1:unload", "p1:load"]);
        assert_eq!(mgr.state("p1"), Some(PluginState::Loaded));
    }

    #[test]
    fn buttons_reach_only_active_plugin() {
        let log = ProbeLog::default();
        let catalog = probe_catalog(&log, &["p1"]);
        let mut mgr = PluginManager::new();
        let mut surface = MemorySurface::new();
        let clock = FixedClock::default();
        mgr.load(&catalog, "p1", None).unwrap();
        mgr.button("p1", LcdButton::Lcd2, &mut ctx(&mut surface, &clock));
        assert_eq!(log.count("p1:button2"), 0);
        mgr.activate("p1", &mut ctx(&mut surface, &clock));
        mgr.button("p1", LcdButton::Lcd2, &mut ctx(&mut surface, &clock));
        assert_eq!(log.count("p1:button2"), 1);
    }

    #[test]
    fn poll_focus_skips_active() {
        let log = ProbeLog::default();
        let catalog = probe_catalog(&log, &["p1", "p2"]);
        let mut mgr = PluginManager::new();
        let mut surface = MemorySurface::new();
        let clock = FixedClock::default();
        mgr.load(&catalog, "p1", None).unwrap();
        mgr.load(&catalog, "p2", None).unwrap();
        log.want_focus("p1", 5);
        log.want_focus("p2", 7);
        mgr.activate("p2", &mut ctx(&mut surface, &clock));
        assert_eq!(mgr.poll_focus(), vec![("p1".to_string(), 5)]);
    }

    #[test]
    fn screen_changed_reaches_everyone() {
        let log = ProbeLog::default();
        let catalog = probe_catalog(&log, &["p1", "p2"]);
        let mut mgr = PluginManager::new();
        mgr.load(&catalog, "p1", None).unwrap();
        mgr.load(&catalog, "p2", None).unwrap();
        mgr.screen_changed(&MemorySurface::new());
        assert_eq!(log.count("p1:screen_changed"), 1);
        assert_eq!(log.count("p2:screen_changed"), 1);
    }

    #[test]
    fn unload_all_empties() {
        let log = ProbeLog::default();
        let catalog = probe_catalog(&log, &["p1", "p2"]);
        let mut mgr = PluginManager::new();
        mgr.load(&catalog, "p1", None).unwrap();
        mgr.load(&catalog, "p2", None).unwrap();
        mgr.unload_all();
        assert!(mgr.is_empty());
        assert_eq!(log.count("p1:unload") + log.count("p2:unload"), 2);
    }
}
