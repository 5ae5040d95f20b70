//! The controller: the single owner of screen, menu and binding state.
//!
//! Every mutation happens on the control thread. The controller is either on
//! the built-in home screen (optionally with the menu overlay open) or has
//! handed the screen to one plugin.

use std::thread;
use std::time::Duration;

use g15_platform::process::split_args;
use g15_types::config::{ActionKind, ButtonAction, ControlConfig};
use g15_types::error::Result;
use g15_types::geometry::{Alignment, FontSize, Indicator, Point};
use g15_types::input::{ButtonEvent, LcdButton, MKey};
use g15_types::surface::DrawingSurface;

use crate::context::AppContext;
use crate::home;
use crate::menu::{MenuAction, MenuModel};
use crate::plugin::{PluginContext, PluginManager};


/// Name of the top-level menu.
pub const MAIN_MENU: &str = "Main";

const MODE_MESSAGE_TICKS: i32 = 6;
const EXEC_MESSAGE_TICKS: i32 = 6;
const STATUS_TICKS: i32 = 2;

/// Brightness levels stepped through by [`Controller::flash`].
const FLASH_SEQUENCE: [u8; 6] = [2, 2, 0, 2, 0, 2];

/// Which binding layer the custom buttons use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MMode {
    Disabled,
    Active(MKey),
}

impl MMode {
    /// Layer number, -1 when disabled.
    pub fn number(self) -> i32 {
        match self {
            Self::Disabled => -1,
            Self::Active(key) => i32::from(key.number()),
        }
    }

    pub fn key(self) -> Option<MKey> {
        match self {
            Self::Disabled => None,
            Self::Active(key) => Some(key),
        }
    }
}

/// Whether the control loop should keep going after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputResult {
    Continue,
    Quit,
}

/// Mode and title saved while the menu overlay is open.
#[derive(Debug, Clone)]
struct SavedView {
    mode: MMode,
    title: String,
}

/// Controller state over a drawing surface.
pub struct Controller<S: DrawingSurface> {
    surface: S,
    ctx: AppContext,
    plugins: PluginManager,
    /// Loaded plugin handles in cycling order.
    screens: Vec<String>,
    /// Index into `screens` of the plugin last cycled to; `None` on home.
    current: Option<usize>,
    mode: MMode,
    /// `Some` while the overlay is open.
    menu: Option<MenuModel>,
    saved: Option<SavedView>,
    /// Ticks until transient text is cleared; -1 when idle.
    countdown: i32,
    screen_priority: u32,
    title: String,
    main_text: String,
    status_text: Option<String>,
    quit: bool,
}

impl<S: DrawingSurface> Controller<S> {
    pub fn new(surface: S, ctx: AppContext) -> Self {
        let title = ctx.config.title.clone();
        let mode = MMode::Active(ctx.config.default_m_key());
        Self {
            surface,
            ctx,
            plugins: PluginManager::new(),
            screens: Vec::new(),
            current: None,
            mode,
            menu: None,
            saved: None,
            countdown: -1,
            screen_priority: 0,
            title,
            main_text: String::new(),
            status_text: None,
            quit: false,
        }
    }

    /// Show the splash, load the configured plugins and bring up the first
    /// screen.
    pub fn start(&mut self) {
        self.surface.clear(false);
        home::draw_frame(&mut self.surface);
        home::draw_main_text(&mut self.surface, FontSize::Large, &self.ctx.config.title);
        self.surface.draw_text(
            FontSize::Small,
            Point::new(0, 27),
            Alignment::Center,
            &format!("v{}", env!("CARGO_PKG_VERSION")),
        );
        home::draw_splash(&mut self.surface, "Loading..");
        self.surface.commit_silently();

        self.surface.set_indicator_light(Indicator::All, false);
        self.apply_mode_light();

        let default = self.load_configured_plugins();
        home::draw_splash(&mut self.surface, "Loaded!");
        self.surface.commit_silently();
        let hold = Duration::from_millis(self.ctx.config.splash_hold_ms);
        if !hold.is_zero() {
            thread::sleep(hold);
        }

        match default.and_then(|h| self.screen_index(&h)) {
            Some(idx) => self.activate_screen(idx),
            None => self.draw_home(true),
        }
        log::info!("started with {} plugin(s)", self.screens.len());
    }

    /// Load every plugin listed in the config. Returns the handle marked
    /// as default, if it loaded.
    fn load_configured_plugins(&mut self) -> Option<String> {
        let entries = self.ctx.config.plugins.clone();
        let mut default = None;
        for entry in &entries {
            let settings = self.ctx.config.plugin_settings(&entry.name);
            match self.plugins.load(&self.ctx.catalog, &entry.name, settings) {
                Ok(handle) => {
                    if entry.default && default.is_none() {
                        default = Some(handle.clone());
                    }
                    self.screens.push(handle);
                },
                Err(e) => {
                    log::warn!("{e}");
                    home::draw_splash(&mut self.surface, &format!("Failed: {}", entry.name));
                    self.surface.commit_silently();
                },
            }
        }
        default
    }

    /// Load one more plugin and append it to the cycle.
    pub fn load_plugin(&mut self, name: &str) -> Result<String> {
        let settings = self.ctx.config.plugin_settings(name);
        let handle = self.plugins.load(&self.ctx.catalog, name, settings)?;
        self.screens.push(handle.clone());
        Ok(handle)
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    pub fn handle_event(&mut self, event: ButtonEvent) -> InputResult {
        match event {
            ButtonEvent::Mode(key) => self.toggle_m_mode(key),
            ButtonEvent::ChangeScreen => self.change_screen(),
            ButtonEvent::Lcd(button) => return self.lcd_button(button),
            ButtonEvent::Custom(name) => self.custom_button(&name),
        }
        InputResult::Continue
    }

    /// Select binding layer `key`, or disable bindings if it is already
    /// selected. Ignored while the menu is open.
    pub fn toggle_m_mode(&mut self, key: MKey) {
        if self.menu.is_some() {
            log::debug!("{key} ignored while the menu is open");
            return;
        }
        match self.mode {
            MMode::Active(current) if current == key => {
                self.surface.set_indicator_light(key.indicator(), false);
                self.mode = MMode::Disabled;
                self.show_transient("'M' Buttons Disabled.", MODE_MESSAGE_TICKS);
            },
            previous => {
                if let MMode::Active(old) = previous {
                    self.surface.set_indicator_light(old.indicator(), false);
                }
                self.surface.set_indicator_light(key.indicator(), true);
                self.mode = MMode::Active(key);
                if previous == MMode::Disabled {
                    let text = format!("'M' Buttons Enabled ({}).", key.number());
                    self.show_transient(&text, MODE_MESSAGE_TICKS);
                }
            },
        }
    }

    /// Advance to the next plugin, wrapping through home.
    pub fn change_screen(&mut self) {
        if self.menu.is_some() {
            self.close_menu();
        }
        if self.screens.is_empty() {
            self.main_text = "No plugins loaded".into();
            self.draw_home(false);
            return;
        }
        self.screen_priority = 0;
        if let Some(active) = self.active_handle() {
            self.plugins.deactivate(&active);
        }
        let next = self.current.map_or(0, |i| i + 1);
        if next < self.screens.len() {
            self.activate_screen(next);
        } else {
            self.current = None;
            self.draw_home(true);
        }
    }

    /// Soft buttons go to the active plugin, else drive the menu.
    pub fn lcd_button(&mut self, button: LcdButton) -> InputResult {
        if let Some(handle) = self.active_handle() {
            self.with_plugin(|pm, c| pm.button(&handle, button, c));
            return InputResult::Continue;
        }
        match (button, self.menu.is_some()) {
            (LcdButton::Lcd1, _) => self.toggle_menu(),
            (LcdButton::Lcd2, true) => return self.execute_menu_action(),
            (LcdButton::Lcd3, true) => self.move_cursor(MenuModel::previous),
            (LcdButton::Lcd4, true) => self.move_cursor(MenuModel::next),
            _ => {},
        }
        InputResult::Continue
    }

    /// Run the bindings of `name` in the current layer.
    pub fn custom_button(&mut self, name: &str) {
        if self.menu.is_some() {
            return;
        }
        let MMode::Active(key) = self.mode else {
            log::debug!("{name} ignored, 'M' buttons are disabled");
            return;
        };
        let actions = self.ctx.config.actions_for(key, name).to_vec();
        if actions.is_empty() {
            self.show_status(format!("{key}-{name} Not Assigned"), STATUS_TICKS);
            return;
        }
        for action in &actions {
            self.run_action(key, name, action);
        }
    }

    fn run_action(&mut self, key: MKey, name: &str, action: &ButtonAction) {
        match action.action_kind() {
            ActionKind::Text => {
                if let Some(value) = &action.value {
                    self.set_main_text(value.clone());
                }
            },
            ActionKind::Title => {
                if let Some(value) = &action.value {
                    self.title = value.clone();
                    self.refresh_home();
                }
            },
            ActionKind::Status => {
                if let Some(value) = &action.value {
                    self.show_status(value.clone(), STATUS_TICKS);
                }
            },
            ActionKind::Timeout => match action.value.as_deref().map(|v| v.trim().parse::<i32>()) {
                Some(Ok(ticks)) => self.countdown = ticks.max(-1),
                _ => log::warn!("{key}-{name}: timeout needs an integer value"),
            },
            ActionKind::Exec => self.exec(action),
            ActionKind::Unknown(kind) => log::warn!("{key}-{name}: unknown action type {kind:?}"),
        }
    }

    fn exec(&mut self, action: &ButtonAction) {
        let Some(command) = action.exec_command() else {
            log::debug!("exec action without a command");
            return;
        };
        let mut args = split_args(command);
        if args.is_empty() {
            return;
        }
        let program = args.remove(0);
        if let Some(extra) = &action.arguments {
            args.extend(split_args(extra));
        }
        self.show_transient(&format!("Executing: {command}"), EXEC_MESSAGE_TICKS);
        match self.ctx.launcher.launch(&program, &args) {
            Ok(handle) => log::info!("started {handle}"),
            Err(e) => {
                log::warn!("exec {program} failed: {e}");
                self.set_main_text("Exec Command Failed");
                self.flash();
            },
        }
    }

    // -----------------------------------------------------------------------
    // Menu
    // -----------------------------------------------------------------------

    fn main_menu(&self) -> MenuModel {
        let mut menu = MenuModel::new(MAIN_MENU)
            .with_item("Reload Config", MenuAction::ReloadConfig)
            .with_item("Unload Plugin", MenuAction::UnloadMenu)
            .with_item("Reload Plugin", MenuAction::ReloadMenu);
        if !self.ctx.config.no_exit {
            menu.add_item("Exit G15 Control", MenuAction::Quit);
        }
        menu.add_item("Exit Menu", MenuAction::CloseMenu);
        menu
    }

    fn plugin_menu(&self, name: &str, action: fn(String) -> MenuAction) -> MenuModel {
        let mut menu = MenuModel::new(name);
        for handle in self.plugins.handles() {
            menu.add_item(handle.clone(), action(handle));
        }
        menu.add_item("Back to Main Menu", MenuAction::BackToMain);
        menu
    }

    fn toggle_menu(&mut self) {
        if self.menu.is_some() {
            self.close_menu();
        } else {
            self.open_menu();
        }
        self.draw_home(true);
    }

    fn open_menu(&mut self) {
        self.saved = Some(SavedView {
            mode: self.mode,
            title: self.title.clone(),
        });
        if let MMode::Active(key) = self.mode {
            self.surface.set_indicator_light(key.indicator(), false);
        }
        self.mode = MMode::Disabled;
        self.menu = Some(self.main_menu());
    }

    fn close_menu(&mut self) {
        self.menu = None;
        self.main_text.clear();
        if let Some(saved) = self.saved.take() {
            self.mode = saved.mode;
            self.title = saved.title;
            self.apply_mode_light();
        }
    }

    fn move_cursor(&mut self, step: fn(&mut MenuModel)) {
        if let Some(menu) = self.menu.as_mut() {
            step(menu);
        }
        self.draw_home(false);
    }

    /// Run the entry under the menu cursor.
    pub fn execute_menu_action(&mut self) -> InputResult {
        let Some(action) = self.menu.as_ref().and_then(|m| m.current_action()).cloned() else {
            return InputResult::Continue;
        };
        log::debug!("menu action {action:?}");
        match action {
            MenuAction::ReloadConfig => self.reload_config(),
            MenuAction::UnloadMenu => {
                self.menu = Some(self.plugin_menu("Unload Plugin", MenuAction::Unload));
                self.draw_home(false);
            },
            MenuAction::ReloadMenu => {
                self.menu = Some(self.plugin_menu("Reload Plugin", MenuAction::Reload));
                self.draw_home(false);
            },
            MenuAction::BackToMain => {
                self.menu = Some(self.main_menu());
                self.draw_home(false);
            },
            MenuAction::Unload(handle) => {
                self.close_menu();
                let status = match self.unload_plugin(&handle) {
                    Ok(()) => format!("Unloaded {handle}"),
                    Err(e) => {
                        log::warn!("{e}");
                        format!("Unload failed: {handle}")
                    },
                };
                self.status_text = Some(status);
                self.countdown = MODE_MESSAGE_TICKS;
                self.draw_home(true);
            },
            MenuAction::Reload(handle) => {
                self.close_menu();
                let status = match self.reload_plugin(&handle) {
                    Ok(()) => format!("Reloaded {handle}"),
                    Err(e) => {
                        log::warn!("{e}");
                        format!("Reload failed: {handle}")
                    },
                };
                self.status_text = Some(status);
                self.countdown = MODE_MESSAGE_TICKS;
                self.draw_home(true);
            },
            MenuAction::CloseMenu => {
                self.close_menu();
                self.draw_home(true);
            },
            MenuAction::Quit => {
                self.close_menu();
                self.shutdown();
                return InputResult::Quit;
            },
        }
        InputResult::Continue
    }

    /// Re-read the config file and reload every plugin.
    pub fn reload_config(&mut self) {
        self.close_menu();
        self.set_main_text("Reloading Config...");
        let mut reloaded = true;
        if let Some(path) = self.ctx.config_path.clone() {
            match ControlConfig::load(&path) {
                Ok(config) => self.ctx.config = config,
                Err(e) => {
                    log::warn!("config reload failed, keeping the old one: {e}");
                    reloaded = false;
                },
            }
        }

        self.set_main_text("Loading Plugins...");
        if let Some(active) = self.active_handle() {
            self.plugins.deactivate(&active);
        }
        self.plugins.unload_all();
        self.screens.clear();
        self.current = None;
        self.load_configured_plugins();

        self.main_text.clear();
        let status = if reloaded {
            "Config reloaded"
        } else {
            "Config reload failed"
        };
        self.status_text = Some(status.into());
        self.countdown = MODE_MESSAGE_TICKS;
        self.draw_home(true);
    }

    /// Unload a plugin and drop it from the cycle.
    pub fn unload_plugin(&mut self, handle: &str) -> Result<()> {
        let was_active = self.is_active(handle);
        self.drop_screen(handle);
        let result = self.plugins.unload(handle);
        if was_active {
            self.draw_home(true);
        }
        result
    }

    /// Replace a plugin with a fresh instance. On failure it leaves the
    /// cycle.
    pub fn reload_plugin(&mut self, handle: &str) -> Result<()> {
        let was_active = self.is_active(handle);
        let settings = self.ctx.config.plugin_settings(handle);
        match self.plugins.reload(&self.ctx.catalog, handle, settings) {
            Ok(_) => {
                if let Some(idx) = self.screen_index(handle).filter(|_| was_active) {
                    self.activate_screen(idx);
                }
                Ok(())
            },
            Err(e) => {
                self.drop_screen(handle);
                if was_active {
                    self.draw_home(true);
                }
                Err(e)
            },
        }
    }

    fn drop_screen(&mut self, handle: &str) {
        let Some(idx) = self.screen_index(handle) else {
            return;
        };
        self.screens.remove(idx);
        self.current = match self.current {
            Some(c) if c == idx => None,
            Some(c) if c > idx => Some(c - 1),
            other => other,
        };
    }

    // -----------------------------------------------------------------------
    // Ticks and focus
    // -----------------------------------------------------------------------

    /// One scheduler tick: decay priority, run the countdown, honour focus
    /// requests, then redraw whoever owns the screen.
    pub fn tick(&mut self) {
        self.screen_priority = self.screen_priority.saturating_sub(1);

        let expired = self.countdown == 0;
        if self.countdown >= 0 {
            self.countdown -= 1;
        }
        if expired {
            self.main_text.clear();
            self.status_text = None;
            self.title = self.ctx.config.title.clone();
        }

        for (handle, priority) in self.plugins.poll_focus() {
            self.request_focus(&handle, priority);
        }

        match self.active_handle() {
            Some(handle) => self.with_plugin(|pm, c| pm.redraw(&handle, c)),
            None if expired && self.menu.is_none() => self.draw_home(false),
            None => {
                self.draw_strip();
                self.surface.commit_silently();
            },
        }
    }

    /// Bring `handle` to the front if `priority` beats the current screen
    /// priority.
    pub fn request_focus(&mut self, handle: &str, priority: u32) -> bool {
        if priority <= self.screen_priority {
            return false;
        }
        let Some(idx) = self.screen_index(handle) else {
            log::debug!("focus request from unknown plugin {handle}");
            return false;
        };
        self.screen_priority = priority;
        if self.menu.is_some() {
            self.close_menu();
        }
        if !self.is_active(handle) {
            if let Some(active) = self.active_handle() {
                self.plugins.deactivate(&active);
            }
            self.activate_screen(idx);
        }
        log::debug!("{handle} took focus at priority {priority}");
        self.flash();
        true
    }

    /// Alert pattern on the backlight. Blocks for the whole sequence.
    pub fn flash(&mut self) {
        let step = Duration::from_millis(self.ctx.config.flash_step_ms);
        for level in FLASH_SEQUENCE {
            self.surface.set_brightness(level);
            if !step.is_zero() {
                thread::sleep(step);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Backend changes and shutdown
    // -----------------------------------------------------------------------

    /// Swap in a new surface, tell every plugin, and redraw from scratch.
    /// Returns the old surface.
    pub fn replace_surface(&mut self, surface: S) -> S {
        let old = std::mem::replace(&mut self.surface, surface);
        log::info!("surface replaced by {}", self.surface.backend_name());
        self.plugins.screen_changed(&self.surface);
        self.surface.set_indicator_light(Indicator::All, false);
        self.apply_mode_light();
        self.redraw_all();
        old
    }

    /// Full redraw of whatever owns the screen.
    pub fn redraw_all(&mut self) {
        match self.active_handle() {
            Some(handle) => {
                self.plugins.deactivate(&handle);
                if let Some(idx) = self.screen_index(&handle) {
                    self.activate_screen(idx);
                }
            },
            None => self.draw_home(true),
        }
    }

    /// Unload everything and leave the exit screen up.
    pub fn shutdown(&mut self) {
        if self.quit {
            return;
        }
        self.quit = true;
        if let Some(active) = self.active_handle() {
            self.plugins.deactivate(&active);
        }
        self.plugins.unload_all();
        self.screens.clear();
        self.current = None;
        let time = self.now_string();
        home::draw_exit_screen(&mut self.surface, &self.ctx.config.title, &time);
        log::info!("ended at {time}");
    }

    // -----------------------------------------------------------------------
    // Drawing
    // -----------------------------------------------------------------------

    fn with_plugin<R>(
        &mut self,
        f: impl FnOnce(&mut PluginManager, &mut PluginContext<'_>) -> R,
    ) -> R {
        let mut ctx = PluginContext::new(&mut self.surface, &*self.ctx.clock);
        f(&mut self.plugins, &mut ctx)
    }

    fn activate_screen(&mut self, idx: usize) {
        let Some(handle) = self.screens.get(idx).cloned() else {
            return;
        };
        self.current = Some(idx);
        self.surface.clear(false);
        self.with_plugin(|pm, c| pm.activate(&handle, c));
    }

    fn apply_mode_light(&mut self) {
        if let MMode::Active(key) = self.mode {
            self.surface.set_indicator_light(key.indicator(), true);
        }
    }

    /// Set the main text and countdown together.
    fn show_transient(&mut self, text: &str, ticks: i32) {
        self.countdown = ticks;
        self.set_main_text(text);
    }

    /// Show a status line in the menu bar for `ticks` ticks.
    pub fn show_status(&mut self, text: impl Into<String>, ticks: i32) {
        self.status_text = Some(text.into());
        self.countdown = ticks;
        self.refresh_home();
    }

    pub fn set_main_text(&mut self, text: impl Into<String>) {
        self.main_text = text.into();
        self.refresh_home();
    }

    fn refresh_home(&mut self) {
        if self.active_handle().is_none() {
            self.draw_home(false);
        }
    }

    fn draw_home(&mut self, full: bool) {
        if full {
            self.surface.clear(false);
            home::draw_frame(&mut self.surface);
            home::draw_layout(&mut self.surface);
        }
        match &self.menu {
            Some(menu) => {
                let indicator = menu.indicator();
                self.main_text = menu.current_label().to_string();
                home::draw_menu_bar(&mut self.surface, &home::OVERLAY_LABELS, Some(&indicator));
            },
            None => {
                home::draw_menu_bar(&mut self.surface, &home::HOME_LABELS, None);
                if let Some(status) = &self.status_text {
                    home::draw_status_text(&mut self.surface, status);
                }
            },
        }
        home::draw_main_text(&mut self.surface, FontSize::Medium, &self.main_text);
        self.draw_strip();
        self.surface.commit_silently();
    }

    fn draw_strip(&mut self) {
        let title = self.screen_title();
        let time = self.now_string();
        home::draw_title_strip(&mut self.surface, &title, &time);
    }

    fn now_string(&self) -> String {
        self.ctx.clock.now().unwrap_or_default().to_string()
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    fn screen_index(&self, handle: &str) -> Option<usize> {
        self.screens.iter().position(|s| s.eq_ignore_ascii_case(handle))
    }

    fn is_active(&self, handle: &str) -> bool {
        self.plugins
            .active()
            .is_some_and(|a| a.eq_ignore_ascii_case(handle))
    }

    fn active_handle(&self) -> Option<String> {
        self.plugins.active().map(str::to_string)
    }

    /// Title as shown in the strip: the menu name while the overlay is open.
    pub fn screen_title(&self) -> String {
        match &self.menu {
            Some(menu) => format!("Menu :: {}", menu.name()),
            None => self.title.clone(),
        }
    }

    pub fn active_plugin(&self) -> Option<&str> {
        self.plugins.active()
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    /// Loaded plugins in cycling order.
    pub fn screens(&self) -> &[String] {
        &self.screens
    }

    pub fn mode(&self) -> MMode {
        self.mode
    }

    pub fn menu(&self) -> Option<&MenuModel> {
        self.menu.as_ref()
    }

    pub fn menu_open(&self) -> bool {
        self.menu.is_some()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn main_text(&self) -> &str {
        &self.main_text
    }

    pub fn status_text(&self) -> Option<&str> {
        self.status_text.as_deref()
    }

    pub fn countdown(&self) -> i32 {
        self.countdown
    }

    pub fn set_countdown(&mut self, ticks: i32) {
        self.countdown = ticks.max(-1);
    }

    pub fn screen_priority(&self) -> u32 {
        self.screen_priority
    }

    pub fn is_quitting(&self) -> bool {
        self.quit
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}
