use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tokio::sync::Mutex;

const REPORTING_SCOPE: &str = "https://www.googleapis.com/auth/playdeveloperreporting";

/// Source of bearer tokens for the reporting API
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Fixed token, for tests and for tokens minted outside the tool
pub struct StaticTokenProvider(String);

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Mints application-default tokens for a service account through the `gcloud` CLI.
///
/// The token is fetched on first use and reused for the rest of the run.
pub struct GcloudTokenProvider {
    credentials: PathBuf,
    gcloud: PathBuf,
    cached: Mutex<Option<String>>,
}

impl GcloudTokenProvider {
    pub fn new(credentials: &Path) -> Result<Self> {
        if !credentials.exists() {
            return Err(Error::ConfigMissing(credentials.to_path_buf()));
        }

        let gcloud = which::which("gcloud")
            .map_err(|e| Error::Token(format!("gcloud CLI not found: {}", e)))?;

        tracing::debug!("Using gcloud at {}", gcloud.display());
        Ok(Self {
            credentials: credentials.to_path_buf(),
            gcloud,
            cached: Mutex::new(None),
        })
    }

    async fn mint(&self) -> Result<String> {
        let scopes = format!("--scopes={}", REPORTING_SCOPE);
        let output = Command::new(&self.gcloud)
            .args(["auth", "application-default", "print-access-token", scopes.as_str()])
            .env("GOOGLE_APPLICATION_CREDENTIALS", &self.credentials)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Token(stderr.trim().to_string()));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(Error::Token("gcloud returned an empty token".to_string()));
        }
        Ok(token)
    }
}

#[async_trait]
impl TokenProvider for GcloudTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let token = self.mint().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}
