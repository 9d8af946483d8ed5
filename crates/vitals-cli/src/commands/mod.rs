pub mod apps;
pub mod collect;
pub mod completion;
pub mod summary;
pub mod urls;

use anyhow::Result;
use std::path::Path;
use vitals_core::AppRegistry;

/// Built-in registry or the one in `apps_file`, narrowed to `keys` when any are given
pub fn load_registry(apps_file: Option<&Path>, keys: &[String]) -> Result<AppRegistry> {
    let registry = match apps_file {
        Some(path) => AppRegistry::from_file(path)?,
        None => AppRegistry::builtin(),
    };

    if keys.is_empty() {
        Ok(registry)
    } else {
        Ok(registry.select(keys)?)
    }
}
