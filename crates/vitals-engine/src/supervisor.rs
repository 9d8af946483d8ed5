use crate::{ConsoleSession, Error, Result};
use chrono::NaiveDate;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use vitals_core::{
    AppConfig, Collection, ObservedResponse, Outcome, Phase, ReportWindow, ResponseClassifier,
};

/// Timing knobs of the completion wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub poll_interval: Duration,
    pub progress_interval: Duration,
    /// Bound for phases whose traffic is known to be unreliable
    pub flaky_deadline: Duration,
    /// Bound for the first four Android phases. Unbounded when `None`.
    pub android_deadline: Option<Duration>,
    /// How long the ANR list phase waits for its list before moving on
    pub grace: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            progress_interval: Duration::from_secs(10),
            flaky_deadline: Duration::from_secs(120),
            android_deadline: None,
            grace: Duration::from_secs(3),
        }
    }
}

/// How long a phase may wait for its completion flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    Unbounded,
    /// Force completion with a warning once elapsed
    Deadline(Duration),
    /// Force completion quietly once elapsed
    Grace(Duration),
}

impl SupervisorConfig {
    pub fn policy_for(&self, phase: Phase) -> WaitPolicy {
        match phase {
            Phase::Metrics | Phase::Crashes | Phase::NonFatals | Phase::AnrMetrics => self
                .android_deadline
                .map(WaitPolicy::Deadline)
                .unwrap_or(WaitPolicy::Unbounded),
            Phase::Anrs => WaitPolicy::Grace(self.grace),
            _ => WaitPolicy::Deadline(self.flaky_deadline),
        }
    }
}

/// How a phase wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Captured,
    TimedOut,
    GraceExpired,
}

/// Owns one app's collection while its phases run, feeding every response the
/// session produces through the classifier.
pub struct Supervisor<'a, S: ConsoleSession + ?Sized> {
    session: &'a mut S,
    classifier: ResponseClassifier,
    collection: Collection,
    config: &'a SupervisorConfig,
    today: NaiveDate,
}

impl<'a, S: ConsoleSession + ?Sized> Supervisor<'a, S> {
    pub fn new(
        session: &'a mut S,
        app: &AppConfig,
        window: ReportWindow,
        config: &'a SupervisorConfig,
        today: NaiveDate,
    ) -> Self {
        Self {
            session,
            classifier: ResponseClassifier::new(app, window),
            collection: Collection::new(app),
            config,
            today,
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn collection_mut(&mut self) -> &mut Collection {
        &mut self.collection
    }

    pub fn into_collection(self) -> Collection {
        self.collection
    }

    pub fn session(&mut self) -> &mut S {
        &mut *self.session
    }

    fn handle(&mut self, response: ObservedResponse) {
        let outcome = self
            .classifier
            .classify(&mut self.collection, &response, self.today);

        match &outcome {
            Outcome::Unmatched | Outcome::OutOfPhase(_) | Outcome::AlreadyCaptured(_) => {}
            Outcome::Accepted(phase) => tracing::info!("✅ Captured {} data", phase),
            Outcome::Rejected { phase, error } => {
                tracing::warn!("Could not parse {} response: {}", phase, error)
            }
            Outcome::DateRangeMismatch(_) | Outcome::Deferred(_) | Outcome::NoValue(_) => {
                tracing::debug!("Skipping response from {}: {}", response.url, outcome)
            }
        }
    }

    async fn next_event(&mut self, ticker: &mut tokio::time::Interval) -> Result<()> {
        let event = tokio::select! {
            response = self.session.next_response() => Some(response),
            _ = ticker.tick() => None,
        };

        match event {
            Some(Some(response)) => {
                self.handle(response);
                Ok(())
            }
            Some(None) => Err(Error::Session("browser session closed".to_string())),
            None => Ok(()),
        }
    }

    /// Let `duration` pass while still classifying whatever arrives
    pub async fn idle(&mut self, duration: Duration) -> Result<()> {
        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);

        loop {
            let event = tokio::select! {
                _ = &mut sleep => None,
                response = self.session.next_response() => Some(response),
            };

            match event {
                None => return Ok(()),
                Some(Some(response)) => self.handle(response),
                Some(None) => return Err(Error::Session("browser session closed".to_string())),
            }
        }
    }

    /// Wait for `phase` to complete under its policy, forcing completion on expiry
    pub async fn await_phase(&mut self, phase: Phase) -> Result<WaitOutcome> {
        let policy = self.config.policy_for(phase);
        let started = Instant::now();
        let mut next_progress = self.config.progress_interval;

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.collection.phases().is_complete(phase) {
                return Ok(WaitOutcome::Captured);
            }

            let elapsed = started.elapsed();
            match policy {
                WaitPolicy::Deadline(limit) if elapsed >= limit => {
                    tracing::warn!(
                        "⚠️  Timeout waiting for {} after {}s, continuing with partial data",
                        phase,
                        limit.as_secs()
                    );
                    self.collection.phases_mut().force_complete(phase);
                    return Ok(WaitOutcome::TimedOut);
                }
                WaitPolicy::Grace(limit) if elapsed >= limit => {
                    tracing::debug!("No {} data within {}s", phase, limit.as_secs());
                    self.collection.phases_mut().force_complete(phase);
                    return Ok(WaitOutcome::GraceExpired);
                }
                _ => {}
            }

            if elapsed >= next_progress {
                tracing::info!("Still waiting for {}... ({}s)", phase, elapsed.as_secs());
                next_progress += self.config.progress_interval;
            }

            self.next_event(&mut ticker).await?;
        }
    }
}

/// Drop every response for `duration`. Used between apps so the next app
/// starts without the previous app's late traffic.
pub async fn discard_for<S: ConsoleSession + ?Sized>(session: &mut S, duration: Duration) -> Result<()> {
    let sleep = tokio::time::sleep(duration);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return Ok(()),
            response = session.next_response() => {
                if response.is_none() {
                    return Err(Error::Session("browser session closed".to_string()));
                }
            }
        }
    }
}
