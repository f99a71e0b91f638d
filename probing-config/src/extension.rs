use probing_catalog::Registry;
use probing_core::{ProbingError, Result};

/// A named module with `init()`/`deinit()` lifecycle callbacks, loaded via
/// `SET probing.python.enabled = '<ext.path>'`. This
/// generalises the original's Python `init()`/`deinit()` module callbacks
/// into a Rust trait-object registry.
pub trait Extension: Send + Sync {
    /// Runs the extension's setup against the shared table registry,
    /// returning the names of any tables it registered so `deinit` can
    /// clean them up symmetrically.
    fn init(&self, registry: &Registry) -> Result<Vec<String>>;

    /// Tears the extension down. Must not panic; best-effort cleanup only.
    fn deinit(&self, registry: &Registry);
}

/// Resolves an extension path (e.g. `"probing.ext.example"`) to a loaded
/// `Extension`. `probing-config` never embeds a module loader itself — the
/// top-level `probing` crate supplies a pyo3-backed implementation that
/// imports the named Python module; tests use a fixture loader.
pub trait ExtensionLoader: Send + Sync {
    fn load(&self, path: &str) -> Result<std::sync::Arc<dyn Extension>, ProbingError>;
}
