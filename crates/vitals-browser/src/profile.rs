use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Chrome profile directory. The persistent one keeps the console login between runs.
pub struct ProfileManager {
    path: PathBuf,
    is_temporary: bool,
}

impl ProfileManager {
    /// `~/.app-vitals/profiles/default`
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Browser("Could not determine home directory".to_string()))?;
        Ok(home.join(".app-vitals").join("profiles").join("default"))
    }

    /// Throwaway profile, removed on drop. Every run starts logged out.
    pub fn temporary() -> Result<Self> {
        let path = tempfile::Builder::new()
            .prefix("app-vitals-profile-")
            .tempdir()?
            .keep();

        Ok(Self {
            path,
            is_temporary: true,
        })
    }

    pub fn persistent(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            tracing::info!("Creating browser profile at {}", path.display());
            std::fs::create_dir_all(&path)?;
        }

        Ok(Self {
            path,
            is_temporary: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.is_temporary
    }
}

impl Drop for ProfileManager {
    fn drop(&mut self) {
        if self.is_temporary && self.path.exists() {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}
