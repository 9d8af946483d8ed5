use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One run over every selected app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub timestamp: NaiveDateTime,
    pub date_range_days: u32,
    pub apps: BTreeMap<String, AppResult>,
}

impl BatchResult {
    pub fn new(timestamp: NaiveDateTime, date_range_days: u32) -> Self {
        Self {
            timestamp,
            date_range_days,
            apps: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, result: AppResult) {
        self.apps.insert(result.app_key.clone(), result);
    }
}

/// Everything harvested for one app. Uncapturable fields stay empty or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppResult {
    pub app_key: String,
    pub app_name: String,
    pub android: AndroidVitals,
    pub ios: IosVitals,
    pub google_play_vitals: Option<VitalsSnapshot>,
}

impl AppResult {
    pub fn new(app_key: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            app_name: app_name.into(),
            android: AndroidVitals::default(),
            ios: IosVitals::default(),
            google_play_vitals: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrashFreeRates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_fatal: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalInstalls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_fatal: Option<u64>,
}

/// Ranked issue cluster whose impact is a whole percentage of installs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedIssue {
    pub rank: usize,
    pub name: String,
    pub impact_percentage: u64,
    pub impacted_devices: u64,
    pub events: u64,
}

/// Ranked Play console ANR cluster with the vendor's own impact ratio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayConsoleAnr {
    pub rank: usize,
    pub name: String,
    pub impact_percentage: f64,
    pub affected_users: u64,
    pub events: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AndroidVitals {
    pub crash_free_rates: CrashFreeRates,
    pub total_installs: TotalInstalls,
    pub top_crashes: Vec<RankedIssue>,
    pub top_non_fatals: Vec<RankedIssue>,
    pub all_anrs: Vec<RankedIssue>,
    pub up_anrs: Vec<PlayConsoleAnr>,
    pub p90_launch_time_seconds: Option<f64>,
    pub dominant_release: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IosVitals {
    pub crash_free_rates: CrashFreeRates,
    pub total_installs: TotalInstalls,
    pub top_crashes: Vec<RankedIssue>,
    pub top_non_fatals: Vec<RankedIssue>,
    pub dominant_release: Option<String>,
}

impl IosVitals {
    pub fn is_empty(&self) -> bool {
        *self == IosVitals::default()
    }
}

/// Authoritative rates from the Play reporting API for the latest day with data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalsSnapshot {
    pub date: NaiveDate,
    pub metrics: Vec<VitalsMetric>,
}

impl VitalsSnapshot {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics.iter().find(|m| m.name == name).map(|m| m.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalsMetric {
    pub name: String,
    pub value: f64,
}
