use chrono::{Datelike, Days, NaiveDate};
use serde::Deserialize;
use serde_json::{Value, json};
use vitals_core::ReportWindow;
use vitals_core::aggregate::round3;

/// Reporting API metric sets, one `:query` endpoint each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricSet {
    AnrRate,
    CrashRate,
    SlowStartRate,
    LmkRate,
    ExcessiveWakeupRate,
    StuckBackgroundWakelockRate,
}

impl MetricSet {
    pub fn endpoint(&self) -> &'static str {
        match self {
            MetricSet::AnrRate => "anrRateMetricSet",
            MetricSet::CrashRate => "crashRateMetricSet",
            MetricSet::SlowStartRate => "slowStartRateMetricSet",
            MetricSet::LmkRate => "lmkRateMetricSet",
            MetricSet::ExcessiveWakeupRate => "excessiveWakeupRateMetricSet",
            MetricSet::StuckBackgroundWakelockRate => "stuckBackgroundWakelockRateMetricSet",
        }
    }
}

/// One metric we report, with its API name prefix and output name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDef {
    pub api_prefix: &'static str,
    pub output_name: &'static str,
    pub set: MetricSet,
}

impl MetricDef {
    /// Full API name for the window, e.g. `anrRate7dUserWeighted`
    pub fn api_name(&self, window: ReportWindow) -> String {
        format!("{}{}", self.api_prefix, window.vitals_metric_suffix())
    }
}

pub const METRICS: [MetricDef; 8] = [
    MetricDef { api_prefix: "anrRate", output_name: "anr_rate", set: MetricSet::AnrRate },
    MetricDef {
        api_prefix: "userPerceivedAnrRate",
        output_name: "user_perceived_anr_rate",
        set: MetricSet::AnrRate,
    },
    MetricDef { api_prefix: "crashRate", output_name: "crash_rate", set: MetricSet::CrashRate },
    MetricDef {
        api_prefix: "userPerceivedCrashRate",
        output_name: "user_perceived_crash_rate",
        set: MetricSet::CrashRate,
    },
    MetricDef {
        api_prefix: "slowStartRate",
        output_name: "slow_start_rate",
        set: MetricSet::SlowStartRate,
    },
    MetricDef {
        api_prefix: "excessiveWakeupRate",
        output_name: "excessive_wakeup_rate",
        set: MetricSet::ExcessiveWakeupRate,
    },
    MetricDef {
        api_prefix: "stuckBgWakelockRate",
        output_name: "stuck_wakelock_rate",
        set: MetricSet::StuckBackgroundWakelockRate,
    },
    MetricDef {
        api_prefix: "userPerceivedLmkRate",
        output_name: "user_perceived_lmk_rate",
        set: MetricSet::LmkRate,
    },
];

/// The metric used to probe whether a day has data yet
pub(crate) const PROBE: MetricDef = METRICS[0];

/// Group metric definitions by set, keeping first-seen set order
pub(crate) fn group_by_set(defs: &[MetricDef]) -> Vec<(MetricSet, Vec<MetricDef>)> {
    let mut groups: Vec<(MetricSet, Vec<MetricDef>)> = Vec::new();
    for def in defs {
        match groups.iter_mut().find(|(set, _)| *set == def.set) {
            Some((_, members)) => members.push(*def),
            None => groups.push((def.set, vec![*def])),
        }
    }
    groups
}

fn api_date(date: NaiveDate) -> Value {
    json!({ "year": date.year(), "month": date.month(), "day": date.day() })
}

/// Daily query body covering exactly `date`
pub(crate) fn query_body(set: MetricSet, metrics: &[String], date: NaiveDate) -> Value {
    let end = date.checked_add_days(Days::new(1)).unwrap_or(date);
    let mut body = json!({
        "metrics": metrics,
        "timelineSpec": {
            "aggregationPeriod": "DAILY",
            "startTime": api_date(date),
            "endTime": api_date(end),
        }
    });

    if set == MetricSet::SlowStartRate {
        body["dimensions"] = json!(["startType"]);
    }
    body
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Row {
    #[serde(default)]
    pub metrics: Vec<MetricValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MetricValue {
    pub metric: String,
    pub decimal_value: Option<DecimalValue>,
    pub int_value: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecimalValue {
    pub value: String,
}

impl MetricValue {
    /// Decimal rates become percentages with three decimals, integers pass through
    pub fn value(&self) -> Option<f64> {
        if let Some(decimal) = &self.decimal_value {
            let raw: f64 = decimal.value.parse().ok()?;
            let scaled = if self.metric.contains("Rate") { raw * 100.0 } else { raw };
            return Some(round3(scaled));
        }

        match self.int_value.as_ref()? {
            Value::Number(n) => n.as_i64().map(|v| v as f64),
            Value::String(s) => s.parse::<i64>().ok().map(|v| v as f64),
            _ => None,
        }
    }
}

impl QueryResponse {
    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Flatten every row into `(api name, value)`; later rows overwrite earlier ones
    pub fn values(&self) -> Vec<(String, f64)> {
        let mut values: Vec<(String, f64)> = Vec::new();
        for metric in self.rows.iter().flat_map(|row| row.metrics.iter()) {
            let Some(value) = metric.value() else {
                continue;
            };
            match values.iter_mut().find(|(name, _)| *name == metric.metric) {
                Some(existing) => existing.1 = value,
                None => values.push((metric.metric.clone(), value)),
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_names_follow_window() {
        assert_eq!(PROBE.api_name(ReportWindow::SevenDays), "anrRate7dUserWeighted");
        assert_eq!(
            METRICS[6].api_name(ReportWindow::ThirtyDays),
            "stuckBgWakelockRate28dUserWeighted"
        );
    }

    #[test]
    fn test_groups_keep_set_order() {
        let groups = group_by_set(&METRICS);
        let sets: Vec<MetricSet> = groups.iter().map(|(set, _)| *set).collect();

        assert_eq!(
            sets,
            vec![
                MetricSet::AnrRate,
                MetricSet::CrashRate,
                MetricSet::SlowStartRate,
                MetricSet::ExcessiveWakeupRate,
                MetricSet::StuckBackgroundWakelockRate,
                MetricSet::LmkRate,
            ]
        );
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn test_query_body_spans_one_day() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let body = query_body(MetricSet::AnrRate, &["anrRate7dUserWeighted".to_string()], date);

        assert_eq!(body["timelineSpec"]["startTime"], json!({"year": 2024, "month": 2, "day": 29}));
        assert_eq!(body["timelineSpec"]["endTime"], json!({"year": 2024, "month": 3, "day": 1}));
        assert!(body.get("dimensions").is_none());

        let slow = query_body(MetricSet::SlowStartRate, &[], date);
        assert_eq!(slow["dimensions"], json!(["startType"]));
    }

    #[test]
    fn test_values_scale_rates_and_keep_ints() {
        let response: QueryResponse = serde_json::from_value(json!({
            "rows": [{"metrics": [
                {"metric": "anrRate7dUserWeighted", "decimalValue": {"value": "0.0041234"}},
                {"metric": "distinctUsers", "intValue": "52310"},
                {"metric": "broken", "decimalValue": {"value": "n/a"}}
            ]}]
        }))
        .unwrap();

        let values = response.values();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], ("anrRate7dUserWeighted".to_string(), 0.412));
        assert_eq!(values[1], ("distinctUsers".to_string(), 52310.0));
    }

    #[test]
    fn test_later_rows_overwrite() {
        let response: QueryResponse = serde_json::from_value(json!({
            "rows": [
                {"metrics": [{"metric": "slowStartRate7dUserWeighted", "decimalValue": {"value": "0.05"}}]},
                {"metrics": [{"metric": "slowStartRate7dUserWeighted", "decimalValue": {"value": "0.02"}}]}
            ]
        }))
        .unwrap();

        assert_eq!(response.values(), vec![("slowStartRate7dUserWeighted".to_string(), 2.0)]);
    }
}
