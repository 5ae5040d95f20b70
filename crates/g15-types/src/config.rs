//! Configuration loading (TOML).
//!
//! The whole file is optional field-by-field: anything missing falls back to
//! a default, so a minimal config only needs the parts a user cares about.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{G15Error, Result};
use crate::input::MKey;

/// File name looked up in the user's home directory.
pub const DEFAULT_CONFIG_FILE: &str = ".g15control.toml";

/// Default port of the remote command listener.
pub const DEFAULT_REMOTE_PORT: u16 = 33523;

/// Default port of the LCD daemon.
pub const DEFAULT_DAEMON_PORT: u16 = 15550;

/// Template written when no config file exists yet.
pub const DEFAULT_TEMPLATE: &str = r#"# g15control configuration

title = "G15Control"
default_m_mode = 1
debug = false
no_exit = false

# Talk to the LCD daemon directly over its socket.
[backend]
kind = "daemon"
host = "127.0.0.1"
port = 15550

# Or drive an external composer through a named pipe:
# [backend]
# kind = "composer"
# pipe = "/tmp/g15composer"
# exec = "g15composer /tmp/g15composer"
# type3_workaround = false

[remote]
enabled = true
bind = "127.0.0.1"
port = 33523

[[plugins]]
name = "clock"
default = true

[[plugins]]
name = "stats"

[plugin_settings.clock]
mode = 0
seconds = true

# Per M-key, per button action lists. Types: text, title, status, timeout, exec.
[[buttons.M1.G1]]
type = "exec"
command = "xterm"
arguments = "-title \"g15 shell\""

[[buttons.M1.G2]]
type = "text"
value = "Hello"

[[buttons.M1.G2]]
type = "timeout"
value = "4"
"#;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Default screen title shown in the clock strip.
    pub title: String,
    /// Binding layer selected at startup (1-3).
    pub default_m_mode: u8,
    /// Verbose logging and ASCII frame dumps.
    pub debug: bool,
    /// Hide the "exit" entry from the built-in menu.
    pub no_exit: bool,
    /// Redraw interval.
    pub tick_interval_ms: u64,
    /// Pause between steps of the alert flash.
    pub flash_step_ms: u64,
    /// How long the startup splash stays up.
    pub splash_hold_ms: u64,
    pub backend: BackendConfig,
    pub remote: RemoteConfig,
    /// Plugins to load, in screen-cycling order.
    pub plugins: Vec<PluginEntry>,
    /// Free-form per-plugin tables, keyed by plugin name.
    pub plugin_settings: BTreeMap<String, toml::Table>,
    /// `buttons.M1.G5 = [ ... ]`
    pub buttons: BTreeMap<String, BTreeMap<String, Vec<ButtonAction>>>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            title: "G15Control".into(),
            default_m_mode: 1,
            debug: false,
            no_exit: false,
            tick_interval_ms: 500,
            flash_step_ms: 100,
            splash_hold_ms: 1000,
            backend: BackendConfig::default(),
            remote: RemoteConfig::default(),
            plugins: Vec::new(),
            plugin_settings: BTreeMap::new(),
            buttons: BTreeMap::new(),
        }
    }
}

impl ControlConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        config.validate()?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write [`DEFAULT_TEMPLATE`] to `path`, creating parent directories.
    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, DEFAULT_TEMPLATE)?;
        Ok(())
    }

    /// Reject settings the application cannot start with.
    pub fn validate(&self) -> Result<()> {
        match &self.backend {
            BackendConfig::Composer { pipe, .. } if pipe.as_os_str().is_empty() => {
                return Err(G15Error::Config("composer backend needs a pipe path".into()));
            },
            BackendConfig::Daemon { port: 0, .. } => {
                return Err(G15Error::Config("daemon backend needs a port".into()));
            },
            _ => {},
        }
        if self.tick_interval_ms == 0 {
            return Err(G15Error::Config("tick_interval_ms must be positive".into()));
        }
        for entry in &self.plugins {
            if entry.name.trim().is_empty() {
                return Err(G15Error::Config("plugin entry without a name".into()));
            }
        }
        Ok(())
    }

    /// The startup binding layer. Out-of-range values fall back to M1.
    pub fn default_m_key(&self) -> MKey {
        MKey::from_number(self.default_m_mode).unwrap_or(MKey::M1)
    }

    /// Actions bound to `button` in layer `key`. Empty if none.
    pub fn actions_for(&self, key: MKey, button: &str) -> &[ButtonAction] {
        self.buttons
            .get(&key.to_string())
            .and_then(|layer| layer.get(button))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Settings table for a plugin, if configured.
    pub fn plugin_settings(&self, name: &str) -> Option<&toml::Table> {
        self.plugin_settings
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}

/// Default config path: `$HOME/.g15control.toml`.
pub fn default_config_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(DEFAULT_CONFIG_FILE)
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Which rendering backend to drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Line protocol written to a composer's named pipe.
    Composer {
        pipe: PathBuf,
        /// Command line that starts the composer, if we own it.
        #[serde(default)]
        exec: Option<String>,
        /// Draw a style-1 bar before every style-3 bar.
        #[serde(default)]
        type3_workaround: bool,
    },
    /// Raw pixel stream straight to the LCD daemon.
    Daemon {
        #[serde(default = "default_daemon_host")]
        host: String,
        #[serde(default = "default_daemon_port")]
        port: u16,
    },
    /// No hardware: an in-memory surface.
    Headless,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Daemon {
            host: default_daemon_host(),
            port: default_daemon_port(),
        }
    }
}

fn default_daemon_host() -> String {
    "127.0.0.1".into()
}

fn default_daemon_port() -> u16 {
    DEFAULT_DAEMON_PORT
}

/// Remote command listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "127.0.0.1".into(),
            port: DEFAULT_REMOTE_PORT,
        }
    }
}

/// One plugin to load at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginEntry {
    pub name: String,
    /// Activate this plugin right after startup.
    #[serde(default)]
    pub default: bool,
}

/// One entry in a button's action list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonAction {
    /// Action type; missing means `exec`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// Decoded action type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Text,
    Title,
    Status,
    Timeout,
    Exec,
    Unknown(String),
}

impl ButtonAction {
    pub fn action_kind(&self) -> ActionKind {
        match self.kind.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("exec") => ActionKind::Exec,
            Some("text") => ActionKind::Text,
            Some("title") => ActionKind::Title,
            Some("status") => ActionKind::Status,
            Some("timeout") => ActionKind::Timeout,
            Some(other) => ActionKind::Unknown(other.to_string()),
        }
    }

    /// The program an `exec` action runs: the nested command, else the value.
    pub fn exec_command(&self) -> Option<&str> {
        self.command
            .as_deref()
            .or(self.value.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}
