#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use vitals_core::{AppConfig, ObservedResponse};
use vitals_engine::{ConsoleSession, Error, Result};

pub const METRICS_URL: &str =
    "https://firebasecrashlytics-pa.clients6.google.com/v1/projects/p/apps/a/metrics:getMetricsReport";
pub const ISSUES_URL: &str =
    "https://firebasecrashlytics-pa.clients6.google.com/v1/projects/p/apps/a/metrics:listFirebaseTopOpenIssues";
pub const TIMELINE_URL: &str =
    "https://firebaseperformance-pa.clients6.google.com/v1/projects/p/traces/_as:listTimelines";
pub const VENUS_URL: &str =
    "https://analytics.google.com/analytics/app/data/v2/venus?reportId=explorer";
pub const UP_ANR_QUERY: &str = r#"{"2":[3],"19":2}"#;

/// Helper to read a payload fixture from the workspace
pub fn fixture(filename: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(filename);
    std::fs::read(path).unwrap()
}

pub fn response(url: &str, fixture_name: &str) -> ObservedResponse {
    ObservedResponse::new(url, fixture(fixture_name))
}

pub fn play_clusters(app: &AppConfig) -> ObservedResponse {
    let url = format!(
        "https://playconsolehealth-pa.clients6.google.com/v1/developers/{}/apps/{}/errorClusters:query",
        app.android.play_console.developer_id, app.android.play_console.app_id
    );
    ObservedResponse::new(url, fixture("play_anr_clusters.json")).with_request_body(UP_ANR_QUERY)
}

/// In-memory session that replays scripted responses when pages are opened
#[derive(Default)]
pub struct ScriptedSession {
    on_navigate: Vec<(String, Duration, ObservedResponse)>,
    on_hard_reload: Vec<(Duration, ObservedResponse)>,
    failing: Vec<String>,
    dying: Vec<String>,
    reload_error: Option<String>,
    pending: VecDeque<(Instant, ObservedResponse)>,
    dead: bool,
    pub navigations: Vec<String>,
    pub reloads: usize,
    pub hard_reloads: usize,
    pub closed: bool,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `response` `delay_secs` after `url` is opened
    pub fn on_navigate(mut self, url: &str, delay_secs: u64, response: ObservedResponse) -> Self {
        self.on_navigate
            .push((url.to_string(), Duration::from_secs(delay_secs), response));
        self
    }

    pub fn on_hard_reload(mut self, delay_secs: u64, response: ObservedResponse) -> Self {
        self.on_hard_reload
            .push((Duration::from_secs(delay_secs), response));
        self
    }

    pub fn failing_navigation(mut self, url: &str) -> Self {
        self.failing.push(url.to_string());
        self
    }

    /// Every reload fails with a CDP error
    pub fn failing_reload(mut self, reason: &str) -> Self {
        self.reload_error = Some(reason.to_string());
        self
    }

    /// The session disappears once `url` is opened
    pub fn dying_on(mut self, url: &str) -> Self {
        self.dying.push(url.to_string());
        self
    }

    fn schedule(&mut self, delay: Duration, response: ObservedResponse) {
        let due = Instant::now() + delay;
        let pos = self
            .pending
            .iter()
            .position(|(at, _)| *at > due)
            .unwrap_or(self.pending.len());
        self.pending.insert(pos, (due, response));
    }
}

#[async_trait]
impl ConsoleSession for ScriptedSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.navigations.push(url.to_string());

        if self.failing.iter().any(|u| u == url) {
            return Err(Error::Navigation {
                url: url.to_string(),
                reason: "net::ERR_TIMED_OUT".to_string(),
            });
        }
        if self.dying.iter().any(|u| u == url) {
            self.dead = true;
            return Ok(());
        }

        let scripted: Vec<(Duration, ObservedResponse)> = self
            .on_navigate
            .iter()
            .filter(|(u, _, _)| u == url)
            .map(|(_, delay, response)| (*delay, response.clone()))
            .collect();
        for (delay, response) in scripted {
            self.schedule(delay, response);
        }
        Ok(())
    }

    async fn reload(&mut self) -> Result<()> {
        self.reloads += 1;
        match &self.reload_error {
            Some(reason) => Err(Error::Session(reason.clone())),
            None => Ok(()),
        }
    }

    async fn hard_reload(&mut self) -> Result<()> {
        self.hard_reloads += 1;
        let scripted = self.on_hard_reload.clone();
        for (delay, response) in scripted {
            self.schedule(delay, response);
        }
        Ok(())
    }

    async fn next_response(&mut self) -> Option<ObservedResponse> {
        if self.dead {
            return None;
        }
        let Some(due) = self.pending.front().map(|(due, _)| *due) else {
            return std::future::pending().await;
        };
        tokio::time::sleep_until(due).await;
        self.pending.pop_front().map(|(_, response)| response)
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
