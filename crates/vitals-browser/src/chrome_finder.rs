use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Binary names looked up on `PATH` when no install location matches
const PATH_NAMES: [&str; 3] = ["google-chrome", "chromium", "chromium-browser"];

/// Locates the Chrome binary that hosts the console session
pub struct ChromeFinder {
    custom_path: Option<PathBuf>,
}

impl ChromeFinder {
    pub fn new(custom_path: Option<PathBuf>) -> Self {
        Self { custom_path }
    }

    /// Custom path first, then the platform install locations, then `PATH`
    pub fn find(&self) -> Result<PathBuf> {
        if let Some(path) = &self.custom_path {
            return executable(path);
        }

        let installs = install_locations();
        if let Some(found) = installs.iter().find_map(|path| executable(path).ok()) {
            return Ok(found);
        }

        if let Some(found) = PATH_NAMES.iter().find_map(|name| which::which(name).ok()) {
            tracing::debug!("Found Chrome on PATH: {}", found.display());
            return Ok(found);
        }

        Err(Error::Browser(format!(
            "Chrome not found. Checked: {}. Use --chrome-path to point at a Chrome or Chromium binary.",
            installs
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }
}

fn install_locations() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    return vec![
        PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
        PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
    ];

    #[cfg(target_os = "linux")]
    return vec![
        PathBuf::from("/usr/bin/google-chrome"),
        PathBuf::from("/usr/bin/google-chrome-stable"),
        PathBuf::from("/usr/bin/chromium"),
        PathBuf::from("/usr/bin/chromium-browser"),
    ];

    #[cfg(target_os = "windows")]
    return vec![
        PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
        PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
    ];

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    return vec![];
}

fn executable(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(Error::Browser(format!("Chrome not found at: {}", path.display())));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(path)?.permissions().mode();
        if mode & 0o111 == 0 {
            return Err(Error::Browser(format!(
                "Chrome binary not executable: {}",
                path.display()
            )));
        }
    }

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_path_wins() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let path = temp.path();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let found = ChromeFinder::new(Some(path.to_path_buf())).find().unwrap();
        assert_eq!(found, path);
    }

    #[test]
    #[cfg(unix)]
    fn test_non_executable_custom_path_is_rejected() {
        let temp = tempfile::NamedTempFile::new().unwrap();

        let err = ChromeFinder::new(Some(temp.path().to_path_buf()))
            .find()
            .unwrap_err();
        assert!(err.to_string().contains("not executable"));
    }

    #[test]
    fn test_missing_custom_path_is_not_replaced_by_defaults() {
        let err = ChromeFinder::new(Some(PathBuf::from("/nonexistent/chrome")))
            .find()
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/chrome"));
    }
}
