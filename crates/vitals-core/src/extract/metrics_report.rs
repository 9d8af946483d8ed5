use super::{ExtractResult, count, timestamp_date};
use crate::aggregate::round2;
use crate::window::ReportWindow;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

/// Fatality discriminator on a metrics-report row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fatality {
    Fatal,
    NonFatal,
    Anr,
}

impl Fatality {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "FATAL" => Some(Fatality::Fatal),
            "NON_FATAL" => Some(Fatality::NonFatal),
            "ANR" => Some(Fatality::Anr),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReport {
    #[serde(default)]
    grouped_metrics: Vec<RawGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGroup {
    fatality: Option<String>,
    #[serde(default)]
    interval_metrics: Vec<RawInterval>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInterval {
    start_time: Option<String>,
    end_time: Option<String>,
    crashlytics_event_free_users_combined: Option<RawRatio>,
    total_crashlytics_installs: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawRatio {
    ratio: Option<f64>,
}

/// One fatality class of a metrics report
#[derive(Debug, Clone, PartialEq)]
pub struct FatalityRow {
    pub fatality: Fatality,
    /// Share of users free of this event class, 0..=1
    pub event_free_ratio: f64,
    pub installs: u64,
}

impl FatalityRow {
    /// Crash-free percentage, two decimals
    pub fn crash_free_rate(&self) -> f64 {
        round2(self.event_free_ratio * 100.0)
    }
}

/// Decoded `metrics:getMetricsReport` payload
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReport {
    /// Reporting window embedded in the first interval, if both ends parse
    pub range: Option<(NaiveDate, NaiveDate)>,
    pub rows: Vec<FatalityRow>,
}

impl MetricsReport {
    pub fn parse(body: &[u8]) -> ExtractResult<Self> {
        let raw: RawReport = serde_json::from_slice(body)?;

        let range = raw
            .grouped_metrics
            .first()
            .and_then(|group| group.interval_metrics.first())
            .and_then(|interval| {
                let start = interval.start_time.as_deref().and_then(timestamp_date)?;
                let end = interval.end_time.as_deref().and_then(timestamp_date)?;
                Some((start, end))
            });

        let mut rows = Vec::new();
        for group in &raw.grouped_metrics {
            let Some(fatality) = group.fatality.as_deref().and_then(Fatality::parse) else {
                continue;
            };
            let Some(interval) = group.interval_metrics.first() else {
                continue;
            };
            rows.push(FatalityRow {
                fatality,
                event_free_ratio: interval
                    .crashlytics_event_free_users_combined
                    .as_ref()
                    .and_then(|r| r.ratio)
                    .unwrap_or(0.0),
                installs: count(
                    interval.total_crashlytics_installs.as_ref(),
                    "totalCrashlyticsInstalls",
                )?,
            });
        }

        Ok(Self { range, rows })
    }

    /// True when the embedded range is exactly `window` ending on `today`.
    /// Reports without a readable range never match.
    pub fn covers(&self, window: ReportWindow, today: NaiveDate) -> bool {
        self.range
            .map(|(start, end)| window.covers(start, end, today))
            .unwrap_or(false)
    }

    pub fn row(&self, fatality: Fatality) -> Option<&FatalityRow> {
        self.rows.iter().find(|row| row.fatality == fatality)
    }
}
