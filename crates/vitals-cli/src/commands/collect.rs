use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use vitals_browser::{ChromeConsoleSession, LaunchOptions, ProfileManager};
use vitals_core::result::ResultWriter;
use vitals_core::{AppRegistry, ReportWindow};
use vitals_engine::{BatchOptions, Orchestrator, SupervisorConfig};
use vitals_play::{GcloudTokenProvider, PlayVitalsClient, VitalsSource};

/// Everything `collect` needs, as parsed from the command line
#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub window: ReportWindow,
    pub apps: Vec<String>,
    pub apps_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub chrome_path: Option<PathBuf>,
    pub profile: Option<String>,
    pub temp_profile: bool,
    pub headless: bool,
    pub port: u16,
    pub service_account: PathBuf,
    pub no_play_vitals: bool,
    pub android_deadline: Option<u64>,
    pub phase_deadline: u64,
}

impl CollectOptions {
    fn supervisor(&self) -> SupervisorConfig {
        SupervisorConfig {
            flaky_deadline: Duration::from_secs(self.phase_deadline),
            android_deadline: self.android_deadline.map(Duration::from_secs),
            ..Default::default()
        }
    }

    /// `None` means a throwaway profile
    fn profile_path(&self) -> Result<Option<PathBuf>> {
        if self.temp_profile {
            return Ok(None);
        }
        let default = ProfileManager::default_path()?;
        Ok(Some(match &self.profile {
            Some(name) => default.with_file_name(name),
            None => default,
        }))
    }

    fn launch_options(&self) -> Result<LaunchOptions> {
        Ok(LaunchOptions {
            chrome_path: self.chrome_path.clone(),
            profile: self.profile_path()?,
            headless: self.headless,
            debugging_port: self.port,
            ..Default::default()
        })
    }
}

/// Play reporting client, or `None` when vitals are off or cannot be authenticated
fn play_vitals(options: &CollectOptions) -> Option<Arc<dyn VitalsSource>> {
    if options.no_play_vitals {
        return None;
    }

    match GcloudTokenProvider::new(&options.service_account) {
        Ok(tokens) => Some(Arc::new(PlayVitalsClient::new(Arc::new(tokens)))),
        Err(e) => {
            tracing::warn!("⚠️  {}, Google Play vitals disabled", e);
            None
        }
    }
}

pub fn execute(options: CollectOptions) -> Result<()> {
    // Registry problems surface before a browser is started
    let registry = super::load_registry(options.apps_file.as_deref(), &options.apps)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(&options, &registry))
}

async fn run(options: &CollectOptions, registry: &AppRegistry) -> Result<()> {
    let launch = options.launch_options()?;
    let batch_options = BatchOptions {
        window: options.window,
        supervisor: options.supervisor(),
        ..Default::default()
    };

    let mut orchestrator = Orchestrator::new(registry, batch_options);
    if let Some(vitals) = play_vitals(options) {
        orchestrator = orchestrator.with_vitals(vitals);
    }

    println!("🚀 Launching Chrome...");
    let mut session = ChromeConsoleSession::launch(&launch)
        .await
        .context("Failed to start the browser session")?;

    let batch = orchestrator.run_until_interrupted(&mut session).await?;

    let path = ResultWriter::to_dir(&batch, &options.output_dir)?;
    print!("{}", super::summary::render(&batch));
    println!("\n💾 Results saved to {}", path.display());
    Ok(())
}
