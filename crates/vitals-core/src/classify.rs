//! Response classification.
//!
//! Every network response observed while a console page is open goes through
//! [`ResponseClassifier::classify`]. A response is matched against an ordered
//! rule table by URL signature, dropped unless the active phase is one the rule
//! serves, then handed to the rule's extraction, which decides whether the
//! response is accepted, deferred or discarded.

use crate::aggregate::GroupKey;
use crate::extract::metrics_report::{Fatality, MetricsReport};
use crate::extract::{ExtractError, dominant_release, issues, launch_time, play_anrs};
use crate::phase::{Phase, PhaseState};
use crate::registry::AppConfig;
use crate::result::AppResult;
use crate::window::ReportWindow;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use url::Url;

const PLAY_HEALTH_HOST: &str = "playconsolehealth-pa.clients6.google.com";

lazy_static! {
    static ref METRICS_REPORT: Regex = Regex::new(r"metrics:getMetricsReport").unwrap();
    static ref TOP_ISSUES: Regex = Regex::new(r"metrics:listFirebaseTopOpenIssues").unwrap();
    static ref LAUNCH_TIMELINES: Regex = Regex::new(r"traces/_as:listTimelines").unwrap();
    static ref VERSION_FILTERED: Regex = Regex::new(r"filter\.appVersionValues").unwrap();
    static ref ANALYTICS_DATA: Regex =
        Regex::new(r"analytics\.google\.com/analytics/app/data/v2/venus\?.*reportId").unwrap();
}

/// A finished network response as seen by the browsing session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedResponse {
    pub url: String,
    pub status: u16,
    /// POST body of the request that produced this response, if any
    pub request_body: Option<String>,
    pub body: Vec<u8>,
}

impl ObservedResponse {
    pub fn new(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status: 200,
            request_body: None,
            body: body.into(),
        }
    }

    pub fn with_request_body(mut self, body: impl Into<String>) -> Self {
        self.request_body = Some(body.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn host(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

/// URL shapes of the console endpoints the harvester reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    LaunchTimeline,
    DominantRelease,
    PlayConsoleClusters,
    MetricsReport,
    TopIssues,
}

impl Signature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signature::LaunchTimeline => "launch timeline",
            Signature::DominantRelease => "analytics release report",
            Signature::PlayConsoleClusters => "play console clusters",
            Signature::MetricsReport => "metrics report",
            Signature::TopIssues => "top issues",
        }
    }

    /// App-independent URL test. Play console clusters additionally need the
    /// app id and the request body, see [`ResponseClassifier`].
    pub fn url_matches(&self, url: &str) -> bool {
        match self {
            Signature::LaunchTimeline => {
                LAUNCH_TIMELINES.is_match(url) && !VERSION_FILTERED.is_match(url)
            }
            Signature::DominantRelease => ANALYTICS_DATA.is_match(url),
            Signature::PlayConsoleClusters => {
                url.contains("errorClusters")
                    && Url::parse(url)
                        .ok()
                        .is_some_and(|u| u.host_str() == Some(PLAY_HEALTH_HOST))
            }
            Signature::MetricsReport => METRICS_REPORT.is_match(url),
            Signature::TopIssues => TOP_ISSUES.is_match(url),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a response body is worth fetching at all
pub fn is_candidate_url(url: &str) -> bool {
    RULES.iter().any(|rule| rule.signature.url_matches(url))
}

/// What the classifier did with one response
#[derive(Debug)]
pub enum Outcome {
    /// No rule recognises the URL
    Unmatched,
    /// A rule matched but the active phase is not one it serves
    OutOfPhase(Signature),
    /// The phase already took its value
    AlreadyCaptured(Phase),
    /// A prerequisite of the phase is still missing
    Deferred(Phase),
    /// Rate payload for a window other than the configured one
    DateRangeMismatch(Phase),
    /// Well-formed payload without the value the phase wants
    NoValue(Phase),
    Accepted(Phase),
    Rejected { phase: Phase, error: ExtractError },
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Unmatched => write!(f, "unmatched"),
            Outcome::OutOfPhase(sig) => write!(f, "{} response outside its phase", sig),
            Outcome::AlreadyCaptured(phase) => write!(f, "{} already captured", phase),
            Outcome::Deferred(phase) => write!(f, "{} waiting on install counts", phase),
            Outcome::DateRangeMismatch(phase) => write!(f, "{} report for another window", phase),
            Outcome::NoValue(phase) => write!(f, "{} response carried no value", phase),
            Outcome::Accepted(phase) => write!(f, "{} accepted", phase),
            Outcome::Rejected { phase, error } => write!(f, "{} rejected: {}", phase, error),
        }
    }
}

/// Install counts seen so far, the denominators of issue impact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallCounts {
    pub fatal: u64,
    pub non_fatal: u64,
    pub anr: u64,
    pub ios_fatal: u64,
    pub ios_non_fatal: u64,
}

/// Everything one app's collection accumulates, owned by the sequencer
#[derive(Debug, Clone)]
pub struct Collection {
    phases: PhaseState,
    installs: InstallCounts,
    result: AppResult,
    ios_issues_before_installs: bool,
}

impl Collection {
    pub fn new(app: &AppConfig) -> Self {
        Self {
            phases: PhaseState::new(),
            installs: InstallCounts::default(),
            result: AppResult::new(&app.key, &app.name),
            ios_issues_before_installs: false,
        }
    }

    pub fn phases(&self) -> &PhaseState {
        &self.phases
    }

    pub fn phases_mut(&mut self) -> &mut PhaseState {
        &mut self.phases
    }

    pub fn installs(&self) -> InstallCounts {
        self.installs
    }

    pub fn result(&self) -> &AppResult {
        &self.result
    }

    pub fn into_result(self) -> AppResult {
        self.result
    }

    /// Set when an iOS non-fatal list arrived before the iOS install counts.
    /// The list is not replayed once the counts show up.
    pub fn ios_issues_before_installs(&self) -> bool {
        self.ios_issues_before_installs
    }

    fn accept_android_rates(&mut self, report: &MetricsReport) -> Outcome {
        let android = &mut self.result.android;

        if let Some(row) = report.row(Fatality::Fatal) {
            self.installs.fatal = row.installs;
            android.crash_free_rates.fatal = Some(row.crash_free_rate());
            android.total_installs.fatal = Some(row.installs);
        }
        if let Some(row) = report.row(Fatality::NonFatal) {
            self.installs.non_fatal = row.installs;
            android.crash_free_rates.non_fatal = Some(row.crash_free_rate());
            android.total_installs.non_fatal = Some(row.installs);
        }

        self.phases.complete(Phase::Metrics);
        Outcome::Accepted(Phase::Metrics)
    }

    fn accept_anr_installs(&mut self, report: &MetricsReport) -> Outcome {
        let Some(row) = report.row(Fatality::Anr) else {
            return Outcome::NoValue(Phase::AnrMetrics);
        };

        self.installs.anr = row.installs;
        self.phases.complete(Phase::AnrMetrics);
        Outcome::Accepted(Phase::AnrMetrics)
    }

    /// iOS reports show up on all three iOS pages. Install counts follow the
    /// latest report, each rate is taken once from the first page that owns it.
    fn accept_ios_rates(&mut self, phase: Phase, report: &MetricsReport) -> Outcome {
        let ios = &mut self.result.ios;

        if let Some(row) = report.row(Fatality::Fatal) {
            self.installs.ios_fatal = row.installs;
            if matches!(phase, Phase::IosMetrics | Phase::IosCrashes)
                && ios.crash_free_rates.fatal.is_none()
            {
                ios.crash_free_rates.fatal = Some(row.crash_free_rate());
                ios.total_installs.fatal = Some(row.installs);
            }
        }
        if let Some(row) = report.row(Fatality::NonFatal) {
            self.installs.ios_non_fatal = row.installs;
            if matches!(phase, Phase::IosMetrics | Phase::IosNonFatals)
                && ios.crash_free_rates.non_fatal.is_none()
            {
                ios.crash_free_rates.non_fatal = Some(row.crash_free_rate());
                ios.total_installs.non_fatal = Some(row.installs);
            }
        }

        if matches!(phase, Phase::IosMetrics | Phase::IosNonFatals) {
            if phase == Phase::IosNonFatals && self.ios_issues_before_installs {
                tracing::debug!("iOS non-fatal issues arrived before install counts, not reprocessed");
            }
            self.phases.complete(Phase::IosMetrics);
        }

        Outcome::Accepted(phase)
    }
}

type Handler = fn(&ResponseClassifier, &mut Collection, Phase, &ObservedResponse, NaiveDate) -> Outcome;

struct Rule {
    signature: Signature,
    phases: &'static [Phase],
    handler: Handler,
}

/// Evaluated top to bottom, first URL match wins
const RULES: &[Rule] = &[
    Rule {
        signature: Signature::LaunchTimeline,
        phases: &[Phase::AndroidP90Launch],
        handler: handle_launch_timeline,
    },
    Rule {
        signature: Signature::DominantRelease,
        phases: &[Phase::IosDominantRelease, Phase::AndroidDominantRelease],
        handler: handle_dominant_release,
    },
    Rule {
        signature: Signature::PlayConsoleClusters,
        phases: &[Phase::PlayConsoleAnrs],
        handler: handle_play_clusters,
    },
    Rule {
        signature: Signature::MetricsReport,
        phases: &[
            Phase::Metrics,
            Phase::AnrMetrics,
            Phase::IosMetrics,
            Phase::IosCrashes,
            Phase::IosNonFatals,
        ],
        handler: handle_metrics_report,
    },
    Rule {
        signature: Signature::TopIssues,
        phases: &[
            Phase::Crashes,
            Phase::NonFatals,
            Phase::Anrs,
            Phase::IosCrashes,
            Phase::IosNonFatals,
        ],
        handler: handle_top_issues,
    },
];

/// Routes observed responses for one app into its [`Collection`]
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    play_app_id: String,
    window: ReportWindow,
}

impl ResponseClassifier {
    pub fn new(app: &AppConfig, window: ReportWindow) -> Self {
        Self {
            play_app_id: app.android.play_console.app_id.clone(),
            window,
        }
    }

    pub fn window(&self) -> ReportWindow {
        self.window
    }

    fn matches(&self, signature: Signature, response: &ObservedResponse) -> bool {
        if !signature.url_matches(&response.url) {
            return false;
        }
        match signature {
            // Other apps' clusters and other query kinds share the endpoint
            Signature::PlayConsoleClusters => {
                response.url.contains(&self.play_app_id)
                    && play_anrs::is_user_perceived_anr_query(response.request_body.as_deref())
            }
            _ => true,
        }
    }

    pub fn classify(
        &self,
        collection: &mut Collection,
        response: &ObservedResponse,
        today: NaiveDate,
    ) -> Outcome {
        let Some(rule) = RULES
            .iter()
            .find(|rule| self.matches(rule.signature, response))
        else {
            return Outcome::Unmatched;
        };

        let Some(phase) = collection
            .phases
            .active()
            .filter(|active| rule.phases.contains(active))
        else {
            return Outcome::OutOfPhase(rule.signature);
        };

        (rule.handler)(self, collection, phase, response, today)
    }
}

fn handle_metrics_report(
    classifier: &ResponseClassifier,
    collection: &mut Collection,
    phase: Phase,
    response: &ObservedResponse,
    today: NaiveDate,
) -> Outcome {
    if matches!(phase, Phase::Metrics | Phase::AnrMetrics) && collection.phases.is_complete(phase) {
        return Outcome::AlreadyCaptured(phase);
    }

    let report = match MetricsReport::parse(&response.body) {
        Ok(report) => report,
        Err(error) => return Outcome::Rejected { phase, error },
    };

    if !report.covers(classifier.window, today) {
        return Outcome::DateRangeMismatch(phase);
    }

    match phase {
        Phase::Metrics => collection.accept_android_rates(&report),
        Phase::AnrMetrics => collection.accept_anr_installs(&report),
        _ => collection.accept_ios_rates(phase, &report),
    }
}

fn handle_top_issues(
    _classifier: &ResponseClassifier,
    collection: &mut Collection,
    phase: Phase,
    response: &ObservedResponse,
    _today: NaiveDate,
) -> Outcome {
    let installs = collection.installs;
    let (total_installs, key) = match phase {
        Phase::Crashes | Phase::NonFatals if collection.phases.is_complete(phase) => {
            return Outcome::AlreadyCaptured(phase);
        }
        Phase::Crashes => (installs.fatal, GroupKey::Subtitle),
        Phase::NonFatals => (installs.non_fatal, GroupKey::Subtitle),
        Phase::Anrs if !collection.phases.is_complete(Phase::AnrMetrics) => {
            return Outcome::Deferred(phase);
        }
        Phase::Anrs => (installs.anr, GroupKey::Title),
        Phase::IosCrashes | Phase::IosNonFatals
            if !collection.phases.is_complete(Phase::IosMetrics) =>
        {
            if phase == Phase::IosNonFatals {
                collection.ios_issues_before_installs = true;
            }
            return Outcome::Deferred(phase);
        }
        Phase::IosCrashes => (installs.ios_fatal, GroupKey::Title),
        Phase::IosNonFatals => (installs.ios_non_fatal, GroupKey::Title),
        _ => return Outcome::OutOfPhase(Signature::TopIssues),
    };

    let rows = match issues::parse(&response.body) {
        Ok(rows) => rows,
        Err(error) => return Outcome::Rejected { phase, error },
    };
    let ranked = issues::rank(&rows, key, total_installs);

    let result = &mut collection.result;
    match phase {
        Phase::Crashes => result.android.top_crashes = ranked,
        Phase::NonFatals => result.android.top_non_fatals = ranked,
        Phase::Anrs => result.android.all_anrs = ranked,
        Phase::IosCrashes => result.ios.top_crashes = ranked,
        _ => result.ios.top_non_fatals = ranked,
    }

    collection.phases.complete(phase);
    Outcome::Accepted(phase)
}

fn handle_play_clusters(
    _classifier: &ResponseClassifier,
    collection: &mut Collection,
    phase: Phase,
    response: &ObservedResponse,
    _today: NaiveDate,
) -> Outcome {
    match play_anrs::parse(&response.body) {
        Ok(clusters) => {
            collection.result.android.up_anrs = play_anrs::rank(clusters);
            collection.phases.complete(phase);
            Outcome::Accepted(phase)
        }
        Err(error) => Outcome::Rejected { phase, error },
    }
}

fn handle_dominant_release(
    _classifier: &ResponseClassifier,
    collection: &mut Collection,
    phase: Phase,
    response: &ObservedResponse,
    _today: NaiveDate,
) -> Outcome {
    if collection.phases.is_complete(phase) {
        return Outcome::AlreadyCaptured(phase);
    }

    match dominant_release::parse(&response.body) {
        Ok(Some(version)) => {
            if phase == Phase::IosDominantRelease {
                collection.result.ios.dominant_release = Some(version);
            } else {
                collection.result.android.dominant_release = Some(version);
            }
            collection.phases.complete(phase);
            Outcome::Accepted(phase)
        }
        Ok(None) => Outcome::NoValue(phase),
        Err(error) => Outcome::Rejected { phase, error },
    }
}

fn handle_launch_timeline(
    _classifier: &ResponseClassifier,
    collection: &mut Collection,
    phase: Phase,
    response: &ObservedResponse,
    today: NaiveDate,
) -> Outcome {
    if collection.phases.is_complete(phase) {
        return Outcome::AlreadyCaptured(phase);
    }

    match launch_time::parse(&response.body, today) {
        Ok(Some(seconds)) => {
            collection.result.android.p90_launch_time_seconds = Some(seconds);
            collection.phases.complete(phase);
            Outcome::Accepted(phase)
        }
        Ok(None) => Outcome::NoValue(phase),
        Err(error) => Outcome::Rejected { phase, error },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AppRegistry;
    use crate::result::RankedIssue;
    use std::path::PathBuf;

    const METRICS_URL: &str = "https://firebasecrashlytics-pa.clients6.google.com/v1/projects/p/apps/a/metrics:getMetricsReport?alt=json";
    const ISSUES_URL: &str = "https://firebasecrashlytics-pa.clients6.google.com/v1/projects/p/apps/a/metrics:listFirebaseTopOpenIssues?alt=json";
    const TIMELINE_URL: &str = "https://firebaseperformance-pa.clients6.google.com/v1/projects/p/traces/_as:listTimelines?alt=json";
    const VENUS_URL: &str = "https://analytics.google.com/analytics/app/data/v2/venus?reportId=explorer&hl=en";
    const UP_ANR_BODY: &str = r#"{"2":[3],"19":2,"5":7}"#;

    fn fixture(filename: &str) -> Vec<u8> {
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

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn setup(key: &str) -> (AppConfig, ResponseClassifier, Collection) {
        let app = AppRegistry::builtin().get(key).unwrap().clone();
        let classifier = ResponseClassifier::new(&app, ReportWindow::SevenDays);
        let collection = Collection::new(&app);
        (app, classifier, collection)
    }

    fn play_url(app: &AppConfig) -> String {
        format!(
            "https://playconsolehealth-pa.clients6.google.com/v1/developers/{}/apps/{}/errorClusters:query",
            app.android.play_console.developer_id, app.android.play_console.app_id
        )
    }

    #[test]
    fn test_metrics_report_sets_android_rates() {
        let (_, classifier, mut collection) = setup("partner");
        collection.phases_mut().enter(Phase::Metrics).unwrap();

        let response = ObservedResponse::new(METRICS_URL, fixture("metrics_report.json"));
        let outcome = classifier.classify(&mut collection, &response, today());

        assert!(outcome.is_accepted());
        let android = &collection.result().android;
        assert_eq!(android.crash_free_rates.fatal, Some(97.0));
        assert_eq!(android.crash_free_rates.non_fatal, Some(95.0));
        assert_eq!(android.total_installs.fatal, Some(1000));
        assert_eq!(android.total_installs.non_fatal, Some(1000));
        assert!(collection.phases().is_complete(Phase::Metrics));
    }

    #[test]
    fn test_metrics_report_for_other_window_is_discarded() {
        let (_, classifier, mut collection) = setup("partner");
        collection.phases_mut().enter(Phase::Metrics).unwrap();

        let stale = ObservedResponse::new(METRICS_URL, fixture("metrics_report_default_window.json"));
        let outcome = classifier.classify(&mut collection, &stale, today());

        assert!(matches!(outcome, Outcome::DateRangeMismatch(Phase::Metrics)));
        assert_eq!(collection.result().android.crash_free_rates.fatal, None);
        assert!(!collection.phases().is_complete(Phase::Metrics));

        // the right span, but it ended yesterday
        let tomorrow = today().succ_opt().unwrap();
        let response = ObservedResponse::new(METRICS_URL, fixture("metrics_report.json"));
        let outcome = classifier.classify(&mut collection, &response, tomorrow);
        assert!(matches!(outcome, Outcome::DateRangeMismatch(_)));
    }

    #[test]
    fn test_rates_are_captured_at_most_once() {
        let (_, classifier, mut collection) = setup("partner");
        collection.phases_mut().enter(Phase::Metrics).unwrap();
        let response = ObservedResponse::new(METRICS_URL, fixture("metrics_report.json"));

        assert!(classifier.classify(&mut collection, &response, today()).is_accepted());
        let outcome = classifier.classify(&mut collection, &response, today());
        assert!(matches!(outcome, Outcome::AlreadyCaptured(Phase::Metrics)));
    }

    #[test]
    fn test_responses_outside_their_phase_change_nothing() {
        let (_, classifier, mut collection) = setup("partner");
        collection.phases_mut().enter(Phase::Crashes).unwrap();

        let response = ObservedResponse::new(METRICS_URL, fixture("metrics_report.json"));
        let outcome = classifier.classify(&mut collection, &response, today());

        assert!(matches!(outcome, Outcome::OutOfPhase(Signature::MetricsReport)));
        assert_eq!(collection.result().android.crash_free_rates.fatal, None);
    }

    #[test]
    fn test_nothing_is_accepted_before_the_first_phase() {
        let (_, classifier, mut collection) = setup("partner");
        let response = ObservedResponse::new(METRICS_URL, fixture("metrics_report.json"));

        let outcome = classifier.classify(&mut collection, &response, today());
        assert!(matches!(outcome, Outcome::OutOfPhase(_)));
    }

    #[test]
    fn test_crash_list_groups_by_subtitle() {
        let (_, classifier, mut collection) = setup("partner");
        collection.phases_mut().enter(Phase::Metrics).unwrap();
        let metrics = ObservedResponse::new(METRICS_URL, fixture("metrics_report.json"));
        classifier.classify(&mut collection, &metrics, today());

        collection.phases_mut().enter(Phase::Crashes).unwrap();
        let issues = ObservedResponse::new(ISSUES_URL, fixture("top_issues.json"));
        let outcome = classifier.classify(&mut collection, &issues, today());

        assert!(outcome.is_accepted());
        assert_eq!(
            collection.result().android.top_crashes,
            vec![RankedIssue {
                rank: 1,
                name: "NullPointerException".to_string(),
                impact_percentage: 1,
                impacted_devices: 15,
                events: 70,
            }]
        );

        let again = classifier.classify(&mut collection, &issues, today());
        assert!(matches!(again, Outcome::AlreadyCaptured(Phase::Crashes)));
        assert_eq!(collection.result().android.top_crashes.len(), 1);
    }

    #[test]
    fn test_anr_list_waits_for_anr_installs() {
        let (_, classifier, mut collection) = setup("partner");
        collection.phases_mut().enter(Phase::AnrMetrics).unwrap();
        collection.phases_mut().enter(Phase::Anrs).unwrap();

        let issues = ObservedResponse::new(ISSUES_URL, fixture("top_issues.json"));
        let outcome = classifier.classify(&mut collection, &issues, today());
        assert!(matches!(outcome, Outcome::Deferred(Phase::Anrs)));
        assert!(collection.result().android.all_anrs.is_empty());
    }

    #[test]
    fn test_anr_list_uses_anr_installs_and_title() {
        let (_, classifier, mut collection) = setup("partner");
        collection.phases_mut().enter(Phase::AnrMetrics).unwrap();
        let metrics = ObservedResponse::new(METRICS_URL, fixture("metrics_report.json"));
        assert!(classifier.classify(&mut collection, &metrics, today()).is_accepted());
        assert_eq!(collection.installs().anr, 800);

        collection.phases_mut().enter(Phase::Anrs).unwrap();
        let issues = ObservedResponse::new(ISSUES_URL, fixture("top_issues.json"));
        assert!(classifier.classify(&mut collection, &issues, today()).is_accepted());

        let anrs = &collection.result().android.all_anrs;
        assert_eq!(anrs.len(), 2);
        assert_eq!(anrs[0].name, "MainActivity.kt line 42");
        assert_eq!(anrs[0].impact_percentage, 1);
    }

    #[test]
    fn test_ios_rates_taken_once_installs_refreshed() {
        let (_, classifier, mut collection) = setup("customer");
        collection.phases_mut().enter(Phase::IosMetrics).unwrap();
        let metrics = ObservedResponse::new(METRICS_URL, fixture("metrics_report.json"));
        assert!(classifier.classify(&mut collection, &metrics, today()).is_accepted());

        assert!(collection.phases().is_complete(Phase::IosMetrics));
        assert_eq!(collection.result().ios.crash_free_rates.fatal, Some(97.0));
        assert_eq!(collection.result().ios.crash_free_rates.non_fatal, Some(95.0));
        assert_eq!(collection.result().android.crash_free_rates.fatal, None);

        collection.phases_mut().enter(Phase::IosCrashes).unwrap();
        let bigger = String::from_utf8(fixture("metrics_report.json"))
            .unwrap()
            .replace("\"1000\"", "\"2000\"")
            .replace("0.97", "0.5");
        let refreshed = ObservedResponse::new(METRICS_URL, bigger);
        assert!(classifier.classify(&mut collection, &refreshed, today()).is_accepted());

        assert_eq!(collection.installs().ios_fatal, 2000);
        assert_eq!(collection.result().ios.crash_free_rates.fatal, Some(97.0));
        assert_eq!(collection.result().ios.total_installs.fatal, Some(1000));
    }

    #[test]
    fn test_ios_non_fatal_list_before_installs_is_flagged() {
        let (_, classifier, mut collection) = setup("customer");
        collection.phases_mut().enter(Phase::IosNonFatals).unwrap();

        let issues = ObservedResponse::new(ISSUES_URL, fixture("top_issues.json"));
        let outcome = classifier.classify(&mut collection, &issues, today());
        assert!(matches!(outcome, Outcome::Deferred(Phase::IosNonFatals)));
        assert!(collection.ios_issues_before_installs());

        let metrics = ObservedResponse::new(METRICS_URL, fixture("metrics_report.json"));
        assert!(classifier.classify(&mut collection, &metrics, today()).is_accepted());
        assert!(collection.phases().is_complete(Phase::IosMetrics));
        // not replayed
        assert!(collection.result().ios.top_non_fatals.is_empty());
    }

    #[test]
    fn test_ios_crash_list_groups_by_title() {
        let (_, classifier, mut collection) = setup("customer");
        collection.phases_mut().enter(Phase::IosMetrics).unwrap();
        let metrics = ObservedResponse::new(METRICS_URL, fixture("metrics_report.json"));
        classifier.classify(&mut collection, &metrics, today());

        collection.phases_mut().enter(Phase::IosCrashes).unwrap();
        let issues = ObservedResponse::new(ISSUES_URL, fixture("top_issues.json"));
        assert!(classifier.classify(&mut collection, &issues, today()).is_accepted());

        let crashes = &collection.result().ios.top_crashes;
        assert_eq!(crashes.len(), 2);
        assert_eq!(crashes[0].rank, 1);
        assert_eq!(crashes[0].impacted_devices, 10);
    }

    #[test]
    fn test_play_clusters_need_app_id_and_user_perceived_query() {
        let (app, classifier, mut collection) = setup("partner");
        collection.phases_mut().enter(Phase::PlayConsoleAnrs).unwrap();
        let url = play_url(&app);

        let all_anrs = ObservedResponse::new(url.as_str(), fixture("play_anr_clusters.json"))
            .with_request_body(r#"{"2":[3],"19":1}"#);
        assert!(matches!(
            classifier.classify(&mut collection, &all_anrs, today()),
            Outcome::Unmatched
        ));

        let other_app = ObservedResponse::new(
            url.replace(&app.android.play_console.app_id, "1"),
            fixture("play_anr_clusters.json"),
        )
        .with_request_body(UP_ANR_BODY);
        assert!(matches!(
            classifier.classify(&mut collection, &other_app, today()),
            Outcome::Unmatched
        ));

        let wanted = ObservedResponse::new(url.as_str(), fixture("play_anr_clusters.json"))
            .with_request_body(UP_ANR_BODY);
        assert!(classifier.classify(&mut collection, &wanted, today()).is_accepted());

        let up_anrs = &collection.result().android.up_anrs;
        assert_eq!(up_anrs.len(), 3);
        assert_eq!(up_anrs[0].name, "Input dispatching timed out");
        assert_eq!(up_anrs[0].impact_percentage, 0.35);
        assert_eq!(up_anrs[0].affected_users, 42);
    }

    #[test]
    fn test_dominant_release_per_platform() {
        let (_, classifier, mut collection) = setup("customer");
        let response = ObservedResponse::new(VENUS_URL, fixture("dominant_release.txt"));

        collection.phases_mut().enter(Phase::IosDominantRelease).unwrap();
        assert!(classifier.classify(&mut collection, &response, today()).is_accepted());
        collection.phases_mut().enter(Phase::AndroidDominantRelease).unwrap();
        assert!(classifier.classify(&mut collection, &response, today()).is_accepted());

        assert_eq!(collection.result().ios.dominant_release.as_deref(), Some("5.2.1"));
        assert_eq!(collection.result().android.dominant_release.as_deref(), Some("5.2.1"));
    }

    #[test]
    fn test_release_payload_without_rows_keeps_waiting() {
        let (_, classifier, mut collection) = setup("partner");
        collection.phases_mut().enter(Phase::AndroidDominantRelease).unwrap();

        let empty = ObservedResponse::new(VENUS_URL, r#")]}',{"default":{"responses":[]}}"#);
        let outcome = classifier.classify(&mut collection, &empty, today());
        assert!(matches!(outcome, Outcome::NoValue(Phase::AndroidDominantRelease)));
        assert!(!collection.phases().is_complete(Phase::AndroidDominantRelease));
    }

    #[test]
    fn test_launch_timeline() {
        let (_, classifier, mut collection) = setup("partner");
        collection.phases_mut().enter(Phase::AndroidP90Launch).unwrap();

        let filtered = ObservedResponse::new(
            format!("{}&filter.appVersionValues=5.2.1", TIMELINE_URL),
            fixture("launch_timelines.json"),
        );
        assert!(matches!(
            classifier.classify(&mut collection, &filtered, today()),
            Outcome::Unmatched
        ));

        let response = ObservedResponse::new(TIMELINE_URL, fixture("launch_timelines.json"));
        assert!(classifier.classify(&mut collection, &response, today()).is_accepted());
        assert_eq!(collection.result().android.p90_launch_time_seconds, Some(1.93));
    }

    #[test]
    fn test_malformed_payload_is_rejected_and_phase_stays_open() {
        let (_, classifier, mut collection) = setup("partner");
        collection.phases_mut().enter(Phase::Metrics).unwrap();

        let response = ObservedResponse::new(METRICS_URL, "<html>sign in</html>");
        let outcome = classifier.classify(&mut collection, &response, today());

        assert!(matches!(outcome, Outcome::Rejected { phase: Phase::Metrics, .. }));
        assert!(!collection.phases().is_complete(Phase::Metrics));
    }

    #[test]
    fn test_android_only_app_never_populates_ios() {
        let (app, classifier, mut collection) = setup("partner");
        assert!(!app.has_ios());

        for phase in Phase::plan(&app) {
            collection.phases_mut().enter(phase).unwrap();
            for (url, name) in [
                (METRICS_URL, "metrics_report.json"),
                (ISSUES_URL, "top_issues.json"),
                (VENUS_URL, "dominant_release.txt"),
            ] {
                let response = ObservedResponse::new(url, fixture(name));
                classifier.classify(&mut collection, &response, today());
            }
        }

        assert!(collection.result().ios.is_empty());
        assert!(collection.result().android.dominant_release.is_some());
    }

    #[test]
    fn test_candidate_urls() {
        assert!(is_candidate_url(METRICS_URL));
        assert!(is_candidate_url(VENUS_URL));
        assert!(is_candidate_url(
            "https://playconsolehealth-pa.clients6.google.com/v1/x/errorClusters:query"
        ));
        assert!(!is_candidate_url("https://play.google.com/errorClusters"));
        assert!(!is_candidate_url("https://console.firebase.google.com/u/0/"));
    }
}
