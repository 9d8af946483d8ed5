use crate::launcher::{ChromeProcess, DEFAULT_DEBUGGING_PORT};
use crate::{ChromeFinder, ChromeLauncher, Error, ProfileManager, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chromiumoxide::Page;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
    EventResponseReceived, GetRequestPostDataParams, GetResponseBodyParams,
};
use chromiumoxide::cdp::browser_protocol::page::ReloadParams;
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use vitals_core::{ObservedResponse, is_candidate_url};
use vitals_engine::ConsoleSession;

const CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// How the browser for a run is started
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub chrome_path: Option<PathBuf>,
    /// Persistent profile directory, or a throwaway one when `None`
    pub profile: Option<PathBuf>,
    pub headless: bool,
    pub debugging_port: u16,
    pub navigation_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            chrome_path: None,
            profile: ProfileManager::default_path().ok(),
            headless: false,
            debugging_port: DEFAULT_DEBUGGING_PORT,
            navigation_timeout: Duration::from_secs(60),
        }
    }
}

/// Console traffic seen so far for one request id
#[derive(Debug, Default)]
struct InFlight {
    url: String,
    status: u16,
    post_data: Option<String>,
}

/// Candidate requests that have been sent but not yet finished or failed
#[derive(Debug, Default)]
struct InFlightRequests {
    requests: HashMap<String, InFlight>,
}

impl InFlightRequests {
    fn track(&mut self, request_id: &str, request: InFlight) {
        self.requests.insert(request_id.to_string(), request);
    }

    fn set_status(&mut self, request_id: &str, status: i64) {
        if let Some(request) = self.requests.get_mut(request_id) {
            request.status = u16::try_from(status).unwrap_or_default();
        }
    }

    fn finish(&mut self, request_id: &str) -> Option<InFlight> {
        self.requests.remove(request_id)
    }

    /// Failed and cancelled requests never produce a body
    fn fail(&mut self, request_id: &str, reason: &str) {
        if let Some(request) = self.requests.remove(request_id) {
            tracing::debug!("Request to {} failed: {}", request.url, reason);
        }
    }

    fn len(&self) -> usize {
        self.requests.len()
    }
}

/// One Chrome tab whose console API traffic is forwarded to the engine
pub struct ChromeConsoleSession {
    browser: Browser,
    page: Page,
    responses: mpsc::UnboundedReceiver<ObservedResponse>,
    handler_task: JoinHandle<()>,
    listener_task: JoinHandle<()>,
    navigation_timeout: Duration,
    current_url: String,
    chrome: Option<ChromeProcess>,
    _profile: Option<ProfileManager>,
}

impl ChromeConsoleSession {
    /// Start Chrome with `options` and attach to it
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let chrome_path = ChromeFinder::new(options.chrome_path.clone()).find()?;
        let profile = match &options.profile {
            Some(path) => ProfileManager::persistent(path.clone())?,
            None => ProfileManager::temporary()?,
        };

        let launcher = ChromeLauncher::new(chrome_path, profile.path().to_path_buf())
            .with_debugging_port(options.debugging_port)
            .with_headless(options.headless);
        let chrome = launcher.launch()?;

        let mut session = Self::connect(launcher.debugging_port()).await?;
        session.navigation_timeout = options.navigation_timeout;
        session.chrome = Some(chrome);
        session._profile = Some(profile);
        Ok(session)
    }

    /// Attach to a Chrome that is already listening on `debugging_port`
    pub async fn connect(debugging_port: u16) -> Result<Self> {
        let endpoint = format!("http://localhost:{}", debugging_port);
        tracing::debug!("Connecting to Chrome on {}", endpoint);

        // Chrome needs a moment before the debugging port answers
        let mut attempts = 0;
        let (browser, mut handler) = loop {
            attempts += 1;
            match Browser::connect(&endpoint).await {
                Ok(connected) => break connected,
                Err(e) if attempts >= CONNECT_ATTEMPTS => {
                    return Err(Error::Cdp(format!(
                        "Failed to connect to Chrome after {} attempts: {}",
                        CONNECT_ATTEMPTS, e
                    )));
                }
                Err(e) => {
                    tracing::debug!("CDP connection attempt {} failed: {}", attempts, e);
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
            }
        };

        // Must run for any command on the browser to make progress
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("CDP handler event error: {}", e);
                }
            }
        });

        tokio::time::sleep(CONNECT_RETRY_DELAY).await;
        let page = match browser.pages().await?.into_iter().next() {
            Some(page) => page,
            None => browser.new_page("about:blank").await?,
        };

        page.execute(EnableParams::default()).await?;
        let (tx, responses) = mpsc::unbounded_channel();
        let listener_task = spawn_listener(page.clone(), tx).await?;

        tracing::info!("🌐 Browser session ready");
        Ok(Self {
            browser,
            page,
            responses,
            handler_task,
            listener_task,
            navigation_timeout: LaunchOptions::default().navigation_timeout,
            current_url: String::from("about:blank"),
            chrome: None,
            _profile: None,
        })
    }
}

/// Forwards every finished console API response on `page` into `tx`
async fn spawn_listener(
    page: Page,
    tx: mpsc::UnboundedSender<ObservedResponse>,
) -> Result<JoinHandle<()>> {
    let mut request_events = page.event_listener::<EventRequestWillBeSent>().await?;
    let mut response_events = page.event_listener::<EventResponseReceived>().await?;
    let mut finished_events = page.event_listener::<EventLoadingFinished>().await?;
    let mut failed_events = page.event_listener::<EventLoadingFailed>().await?;

    Ok(tokio::spawn(async move {
        let mut in_flight = InFlightRequests::default();

        loop {
            tokio::select! {
                Some(event) = request_events.next() => {
                    if !is_candidate_url(&event.request.url) {
                        continue;
                    }
                    let mut request = InFlight {
                        url: event.request.url.clone(),
                        ..Default::default()
                    };
                    if event.request.has_post_data == Some(true) {
                        let params = GetRequestPostDataParams::new(event.request_id.clone());
                        match page.execute(params).await {
                            Ok(data) => request.post_data = Some(data.post_data.clone()),
                            Err(e) => tracing::trace!("No post data for {}: {}", request.url, e),
                        }
                    }
                    in_flight.track(event.request_id.inner(), request);
                }
                Some(event) = response_events.next() => {
                    in_flight.set_status(event.request_id.inner(), event.response.status);
                }
                Some(event) = failed_events.next() => {
                    in_flight.fail(event.request_id.inner(), &event.error_text);
                }
                Some(event) = finished_events.next() => {
                    let Some(request) = in_flight.finish(event.request_id.inner()) else {
                        continue;
                    };

                    let params = GetResponseBodyParams::new(event.request_id.clone());
                    let body = match page.execute(params).await {
                        Ok(returns) => decode_body(&returns.body, returns.base64_encoded),
                        Err(e) => {
                            tracing::debug!("Could not read body of {}: {}", request.url, e);
                            continue;
                        }
                    };

                    let mut observed = ObservedResponse::new(request.url, body).with_status(request.status);
                    if let Some(post_data) = request.post_data {
                        observed = observed.with_request_body(post_data);
                    }
                    if tx.send(observed).is_err() {
                        break;
                    }
                }
                else => break,
            }
        }
        tracing::debug!("Network listener stopped with {} requests in flight", in_flight.len());
    }))
}

/// Response bodies arrive either as text or base64
fn decode_body(body: &str, base64_encoded: bool) -> Vec<u8> {
    if !base64_encoded {
        return body.as_bytes().to_vec();
    }
    STANDARD.decode(body).unwrap_or_else(|e| {
        tracing::debug!("Invalid base64 body: {}", e);
        Vec::new()
    })
}

/// A page load that failed or timed out only costs the current app
fn page_load_outcome<T>(
    url: &str,
    timeout: Duration,
    outcome: std::result::Result<std::result::Result<T, CdpError>, tokio::time::error::Elapsed>,
) -> vitals_engine::Result<()> {
    match outcome {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(vitals_engine::Error::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Err(vitals_engine::Error::Navigation {
            url: url.to_string(),
            reason: format!("timed out after {}s", timeout.as_secs()),
        }),
    }
}

#[async_trait]
impl ConsoleSession for ChromeConsoleSession {
    async fn navigate(&mut self, url: &str) -> vitals_engine::Result<()> {
        self.current_url = url.to_string();
        let outcome = tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await;
        page_load_outcome(url, self.navigation_timeout, outcome)
    }

    async fn reload(&mut self) -> vitals_engine::Result<()> {
        let outcome = tokio::time::timeout(self.navigation_timeout, self.page.reload()).await;
        page_load_outcome(&self.current_url, self.navigation_timeout, outcome)
    }

    async fn hard_reload(&mut self) -> vitals_engine::Result<()> {
        let params = ReloadParams::builder().ignore_cache(true).build();
        let outcome = tokio::time::timeout(self.navigation_timeout, self.page.execute(params)).await;
        page_load_outcome(&self.current_url, self.navigation_timeout, outcome)
    }

    async fn next_response(&mut self) -> Option<ObservedResponse> {
        self.responses.recv().await
    }

    async fn close(&mut self) -> vitals_engine::Result<()> {
        let closed = self.browser.close().await;
        self.listener_task.abort();
        self.handler_task.abort();
        if let Some(mut chrome) = self.chrome.take() {
            chrome.kill();
        }
        closed.map_err(Error::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_body_is_passed_through() {
        assert_eq!(decode_body(r#"{"a":1}"#, false), br#"{"a":1}"#.to_vec());
    }

    #[test]
    fn test_base64_body_is_decoded() {
        assert_eq!(decode_body("eyJhIjoxfQ==", true), br#"{"a":1}"#.to_vec());
    }

    #[test]
    fn test_invalid_base64_body_is_empty() {
        assert!(decode_body("not base64!", true).is_empty());
    }

    #[test]
    fn test_default_launch_options() {
        let options = LaunchOptions::default();
        assert!(!options.headless);
        assert_eq!(options.debugging_port, 9222);
        assert_eq!(options.navigation_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_failed_reload_is_a_navigation_error() {
        let outcome: std::result::Result<std::result::Result<(), CdpError>, _> = Ok(Err(CdpError::Timeout));
        let err = page_load_outcome("https://console.example/ios", Duration::from_secs(60), outcome).unwrap_err();

        assert!(!err.is_fatal());
        assert!(matches!(
            err,
            vitals_engine::Error::Navigation { ref url, .. } if url == "https://console.example/ios"
        ));
    }

    #[tokio::test]
    async fn test_slow_reload_times_out_as_navigation_error() {
        let outcome = tokio::time::timeout(
            Duration::from_millis(1),
            std::future::pending::<std::result::Result<(), CdpError>>(),
        )
        .await;
        let err = page_load_outcome("https://console.example/ios", Duration::from_secs(60), outcome).unwrap_err();

        assert!(!err.is_fatal());
        assert!(err.to_string().contains("timed out after 60s"));
    }

    #[test]
    fn test_failed_request_leaves_nothing_in_flight() {
        let mut in_flight = InFlightRequests::default();
        in_flight.track("1", InFlight { url: "https://console.example/a".into(), ..Default::default() });
        in_flight.track("2", InFlight { url: "https://console.example/b".into(), ..Default::default() });
        in_flight.set_status("2", 200);

        in_flight.fail("1", "net::ERR_ABORTED");
        assert_eq!(in_flight.len(), 1);
        assert!(in_flight.finish("1").is_none());

        let finished = in_flight.finish("2").unwrap();
        assert_eq!(finished.status, 200);
        assert_eq!(in_flight.len(), 0);
    }

    #[test]
    fn test_unknown_request_events_are_ignored() {
        let mut in_flight = InFlightRequests::default();
        in_flight.set_status("9", 500);
        in_flight.fail("9", "net::ERR_FAILED");
        assert_eq!(in_flight.len(), 0);
    }

    // Sessions against a real console need a logged-in Chrome profile
}
