//! Built-in screen plugins and the catalog the binary starts from.

pub mod clock;
pub mod stats;

use g15_core::plugin::PluginCatalog;

pub use clock::ClockPlugin;
pub use stats::StatsPlugin;

/// Catalog with every built-in plugin.
pub fn builtin_catalog() -> PluginCatalog {
    let mut catalog = PluginCatalog::new();
    catalog.register(clock::NAME, || Box::new(ClockPlugin::new()));
    catalog.register(stats::NAME, || Box::new(StatsPlugin::default()));
    catalog
}
