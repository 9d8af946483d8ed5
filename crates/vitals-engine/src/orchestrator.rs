use crate::{ConsoleSession, Error, Result, SupervisorConfig, collect_app, discard_for};
use chrono::{Local, NaiveDate, NaiveDateTime};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use vitals_core::{AppRegistry, BatchResult, ReportWindow};
use vitals_play::VitalsSource;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub window: ReportWindow,
    pub supervisor: SupervisorConfig,
    /// Quiet period between two apps
    pub app_pause: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            window: ReportWindow::default(),
            supervisor: SupervisorConfig::default(),
            app_pause: Duration::from_secs(2),
        }
    }
}

/// Source of the local wall-clock time
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Runs the registry, in order, through one shared session
pub struct Orchestrator<'a> {
    registry: &'a AppRegistry,
    options: BatchOptions,
    vitals: Option<Arc<dyn VitalsSource>>,
    clock: Clock,
}

impl<'a> Orchestrator<'a> {
    pub fn new(registry: &'a AppRegistry, options: BatchOptions) -> Self {
        Self {
            registry,
            options,
            vitals: None,
            clock: Arc::new(|| Local::now().naive_local()),
        }
    }

    /// Attach Play vitals to every Android app once the harvest is done
    pub fn with_vitals(mut self, vitals: Arc<dyn VitalsSource>) -> Self {
        self.vitals = Some(vitals);
        self
    }

    /// Pin the run's clock instead of reading the local time
    pub fn with_session_time(self, now: NaiveDateTime) -> Self {
        self.with_clock(Arc::new(move || now))
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    /// Harvest every app. One app failing is logged and skipped, a session failure ends the run.
    pub async fn run<S: ConsoleSession + ?Sized>(&self, session: &mut S) -> Result<BatchResult> {
        let now = self.now();
        let window = self.options.window;
        let mut batch = BatchResult::new(now, window.days());

        tracing::info!("Collecting {} data for {} app(s)", window, self.registry.len());

        for (idx, app) in self.registry.iter().enumerate() {
            if idx > 0 {
                discard_for(session, self.options.app_pause).await?;
            }

            // the console's report windows roll over at local midnight
            let today = self.now().date();
            tracing::info!("📱 Collecting data for {} ({})", app.name, app.key);
            match collect_app(session, app, window, &self.options.supervisor, today).await {
                Ok(result) => {
                    tracing::info!("✅ Data collection complete for {}", app.name);
                    batch.insert(result);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::error!("❌ Error collecting data for {}: {}", app.name, e),
            }
        }

        self.enrich(&mut batch, self.now().date()).await;
        Ok(batch)
    }

    async fn enrich(&self, batch: &mut BatchResult, today: NaiveDate) {
        let Some(vitals) = &self.vitals else {
            return;
        };

        for app in self.registry.iter() {
            let Some(result) = batch.apps.get_mut(&app.key) else {
                continue;
            };

            tracing::info!("📊 Fetching Google Play vitals for {}", app.android.package_name);
            match vitals
                .snapshot(&app.android.package_name, self.options.window, today)
                .await
            {
                Ok(snapshot) => result.google_play_vitals = Some(snapshot),
                Err(e) => tracing::warn!("⚠️  Google Play vitals unavailable for {}: {}", app.key, e),
            }
        }
    }

    /// [`run`](Self::run) until `shutdown` resolves, then close the session whatever happened
    pub async fn run_until<S, F>(&self, session: &mut S, shutdown: F) -> Result<BatchResult>
    where
        S: ConsoleSession + ?Sized,
        F: Future<Output = ()>,
    {
        let outcome = tokio::select! {
            result = self.run(session) => result,
            _ = shutdown => {
                tracing::warn!("Interrupted, tearing down the browser session");
                Err(Error::Interrupted)
            }
        };

        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close browser session cleanly: {}", e);
        }
        outcome
    }

    /// Like [`run_until`](Self::run_until), stopping on Ctrl-C
    pub async fn run_until_interrupted<S: ConsoleSession + ?Sized>(
        &self,
        session: &mut S,
    ) -> Result<BatchResult> {
        self.run_until(session, async {
            // without a signal handler the run is not interruptible
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}
