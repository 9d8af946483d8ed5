use crate::phase::Phase;
use crate::registry::AppConfig;
use crate::window::ReportWindow;

const CONSOLE_BASE: &str = "https://console.firebase.google.com/u/0/project";
const PLAY_CONSOLE_BASE: &str = "https://play.google.com/console/u/0/developers";

// Analytics explorer report: active users by app version. The parameters are
// double-encoded because the console keeps them inside the URL fragment.
const EXPLORER_REPORT: &str = "reports~2Fexplorer%3Fparams%3D_r.explorerCard..selmet%253D%255B%2522activeUsers%2522%255D%2526_r.explorerCard..seldim%253D%255B%2522appVersion%2522%255D";
const ONLY_IOS_FILTER: &str = "%2526_r..dataFilters%253D%255B%257B%2522type%2522%253A1%252C%2522fieldName%2522%253A%2522operatingSystem%2522%252C%2522evaluationType%2522%253A4%252C%2522expressionList%2522%253A%255B%2522iOS%2522%255D%252C%2522complement%2522%253Afalse%252C%2522isCaseSensitive%2522%253Atrue%252C%2522expression%2522%253A%2522%2522%257D%255D";
const EXCLUDE_IOS_FILTER: &str = "%2526_r..dataFilters%253D%255B%257B%2522type%2522%253A1%252C%2522fieldName%2522%253A%2522operatingSystem%2522%252C%2522evaluationType%2522%253A3%252C%2522expressionList%2522%253A%255B%2522iOS%2522%255D%252C%2522complement%2522%253Atrue%252C%2522isCaseSensitive%2522%253Atrue%252C%2522expression%2522%253A%2522%2522%257D%255D";
const EDIT_IOS_FILTER: &str = "%2526_r.copa-filter-builder..filter-to-edit%253D%255B%257B%2522type%2522%253A1%252C%2522fieldName%2522%253A%2522operatingSystem%2522%252C%2522evaluationType%2522%253A4%252C%2522expressionList%2522%253A%255B%2522iOS%2522%255D%252C%2522complement%2522%253Afalse%252C%2522isCaseSensitive%2522%253Atrue%252C%2522expression%2522%253A%2522%2522%257D%255D";

/// Every console page the sequencer may visit for one app and window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleUrls {
    pub metrics: String,
    pub crashes: String,
    pub non_fatals: String,
    pub anrs: String,
    pub play_console_anrs: String,
    pub ios_crashes: Option<String>,
    pub ios_non_fatals: Option<String>,
    pub ios_dominant_release: Option<String>,
    pub android_dominant_release: String,
    pub android_p90_launch: Option<String>,
}

impl ConsoleUrls {
    pub fn build(window: ReportWindow, app: &AppConfig) -> Self {
        let time = window.crashlytics_time();
        let crashlytics = format!("{}/{}/crashlytics/app", CONSOLE_BASE, app.console_project);
        let android_app = &app.android.app_id;

        let android_issues = |types: &str| {
            format!(
                "{}/{}/issues?state=open&time={}&tag=all&sort=userCount&types={}",
                crashlytics, android_app, time, types
            )
        };

        let play = &app.android.play_console;
        let play_console_anrs = format!(
            "{}/{}/app/{}/vitals/crashes?days={}&isUserPerceived=true&errorType=ANR",
            PLAY_CONSOLE_BASE,
            play.developer_id,
            play.app_id,
            window.play_console_days()
        );

        let android_p90_launch = app.has_startup_latency_trace.then(|| {
            format!(
                "{}/{}/performance/app/{}/trends?time={}",
                CONSOLE_BASE,
                app.console_project,
                android_app,
                window.performance_time()
            )
        });

        let date_option = window.analytics_date_option();
        let (ios_crashes, ios_non_fatals, ios_dominant_release, android_dominant_release) =
            match app.ios_target() {
                Some(ios) => (
                    Some(format!(
                        "{}/{}/issues?state=open&time={}&types=crash&tag=all&sort=userCount",
                        crashlytics, ios.app_id, time
                    )),
                    Some(format!(
                        "{}/{}/issues?state=open&time={}&types=error&tag=all&sort=eventCount",
                        crashlytics, ios.app_id, time
                    )),
                    Some(ios_explorer(app, &ios.app_id, date_option)),
                    // the analytics property is shared, so Android is the iOS stream with the filter inverted
                    android_explorer(app, &ios.app_id, date_option),
                ),
                None => (None, None, None, android_explorer(app, android_app, date_option)),
            };

        Self {
            metrics: android_issues("crash%2Cerror"),
            crashes: android_issues("crash"),
            non_fatals: android_issues("error"),
            anrs: android_issues("ANR"),
            play_console_anrs,
            ios_crashes,
            ios_non_fatals,
            ios_dominant_release,
            android_dominant_release,
            android_p90_launch,
        }
    }

    /// Page to navigate to when `phase` is entered, if the phase navigates at all.
    ///
    /// `Anrs` and `IosCrashes` stay on the page loaded by the preceding phase.
    pub fn for_phase(&self, phase: Phase) -> Option<&str> {
        match phase {
            Phase::Metrics => Some(&self.metrics),
            Phase::Crashes => Some(&self.crashes),
            Phase::NonFatals => Some(&self.non_fatals),
            Phase::AnrMetrics => Some(&self.anrs),
            Phase::Anrs => None,
            Phase::IosMetrics => self.ios_crashes.as_deref(),
            Phase::IosCrashes => None,
            Phase::IosNonFatals => self.ios_non_fatals.as_deref(),
            Phase::PlayConsoleAnrs => Some(&self.play_console_anrs),
            Phase::IosDominantRelease => self.ios_dominant_release.as_deref(),
            Phase::AndroidDominantRelease => Some(&self.android_dominant_release),
            Phase::AndroidP90Launch => self.android_p90_launch.as_deref(),
        }
    }

    /// Labelled list of every URL that is present
    pub fn labelled(&self) -> Vec<(&'static str, &str)> {
        let mut urls = vec![
            ("metrics", self.metrics.as_str()),
            ("crashes", self.crashes.as_str()),
            ("non_fatals", self.non_fatals.as_str()),
            ("anrs", self.anrs.as_str()),
        ];
        if let Some(url) = &self.ios_crashes {
            urls.push(("ios_crashes", url));
        }
        if let Some(url) = &self.ios_non_fatals {
            urls.push(("ios_non_fatals", url));
        }
        urls.push(("play_console_anrs", &self.play_console_anrs));
        if let Some(url) = &self.ios_dominant_release {
            urls.push(("ios_dominant_release", url));
        }
        urls.push(("android_dominant_release", &self.android_dominant_release));
        if let Some(url) = &self.android_p90_launch {
            urls.push(("android_p90_launch", url));
        }
        urls
    }
}

fn explorer_base(app: &AppConfig, analytics_app_id: &str) -> String {
    format!(
        "{}/{}/analytics/app/{}/overview/{}",
        CONSOLE_BASE, app.console_project, analytics_app_id, EXPLORER_REPORT
    )
}

fn ios_explorer(app: &AppConfig, analytics_app_id: &str, date_option: &str) -> String {
    format!(
        "{}{}%2526_u.dateOption%253D{}%2526_u.comparisonOption%253Ddisabled&r%3Duser-technology-detail&fpn%3D{}",
        explorer_base(app, analytics_app_id),
        ONLY_IOS_FILTER,
        date_option,
        app.analytics_property
    )
}

fn android_explorer(app: &AppConfig, analytics_app_id: &str, date_option: &str) -> String {
    format!(
        "{}{}{}%2526_u.comparisonOption%253Ddisabled%2526_u.dateOption%253D{}&r%3Duser-technology-detail&fpn%3D{}",
        explorer_base(app, analytics_app_id),
        EXCLUDE_IOS_FILTER,
        EDIT_IOS_FILTER,
        date_option,
        app.analytics_property
    )
}
