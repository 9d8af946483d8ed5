use crate::{Error, Result};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

pub const DEFAULT_DEBUGGING_PORT: u16 = 9222;

/// Builds the Chrome command line for a console session
pub struct ChromeLauncher {
    chrome_path: PathBuf,
    profile_path: PathBuf,
    debugging_port: u16,
    headless: bool,
}

impl ChromeLauncher {
    pub fn new(chrome_path: PathBuf, profile_path: PathBuf) -> Self {
        Self {
            chrome_path,
            profile_path,
            debugging_port: DEFAULT_DEBUGGING_PORT,
            headless: false,
        }
    }

    pub fn with_debugging_port(mut self, port: u16) -> Self {
        self.debugging_port = port;
        self
    }

    /// Headless only works once the profile already holds a console login
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn launch(&self) -> Result<ChromeProcess> {
        tracing::debug!(
            "Launching {} with profile {}",
            self.chrome_path.display(),
            self.profile_path.display()
        );

        let child = Command::new(&self.chrome_path)
            .args(self.build_args())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Browser(format!("Failed to launch Chrome: {}", e)))?;

        Ok(ChromeProcess { child })
    }

    fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-port={}", self.debugging_port),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            format!("--user-data-dir={}", self.profile_path.display()),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }
        args.push("about:blank".to_string());
        args
    }

    pub fn debugging_port(&self) -> u16 {
        self.debugging_port
    }
}

/// Running Chrome, killed when dropped
pub struct ChromeProcess {
    child: Child,
}

impl ChromeProcess {
    pub fn kill(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            tracing::debug!("Stopping Chrome (pid {})", self.child.id());
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

impl Drop for ChromeProcess {
    fn drop(&mut self) {
        self.kill();
    }
}
