use crate::OutputFormat;
use anyhow::Result;
use console::style;
use std::fmt::Write;
use std::path::Path;
use vitals_core::result::{
    CrashFreeRates, PlayConsoleAnr, RankedIssue, ResultReader, ResultWriter, TotalInstalls,
    VitalsSnapshot,
};
use vitals_core::{AppResult, BatchResult};

/// How many entries of each ranked list are shown
const LIST_LIMIT: usize = 5;

pub fn execute(file: &Path, format: OutputFormat) -> Result<()> {
    let batch = ResultReader::from_file(file)?;
    ResultReader::validate(&batch)?;

    match format {
        OutputFormat::Json => println!("{}", ResultWriter::to_string(&batch)?),
        OutputFormat::Pretty => print!("{}", render(&batch)),
    }
    Ok(())
}

/// Human-readable summary of a batch, as printed after a run
pub fn render(batch: &BatchResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n{}",
        style(format!(
            "📊 App vitals, last {} days (collected {})",
            batch.date_range_days,
            batch.timestamp.format("%Y-%m-%d %H:%M:%S")
        ))
        .bold()
        .cyan()
    );

    if batch.apps.is_empty() {
        let _ = writeln!(out, "\n  No app data was collected");
        return out;
    }

    for app in batch.apps.values() {
        render_app(&mut out, app);
    }
    out
}

fn render_app(out: &mut String, app: &AppResult) {
    let _ = writeln!(
        out,
        "\n{} {}",
        style(&app.app_name).bold(),
        style(format!("({})", app.app_key)).dim()
    );

    let android = &app.android;
    let _ = writeln!(out, "  {}", style("Android").bold());
    render_rates(out, &android.crash_free_rates, &android.total_installs);
    if let Some(seconds) = android.p90_launch_time_seconds {
        let _ = writeln!(out, "    P90 launch time:   {:.2}s", seconds);
    }
    if let Some(release) = &android.dominant_release {
        let _ = writeln!(out, "    Dominant release:  {}", release);
    }
    render_issues(out, "Top crashes", &android.top_crashes);
    render_issues(out, "Top non-fatals", &android.top_non_fatals);
    render_issues(out, "All ANRs", &android.all_anrs);
    render_play_anrs(out, &android.up_anrs);

    if !app.ios.is_empty() {
        let ios = &app.ios;
        let _ = writeln!(out, "  {}", style("iOS").bold());
        render_rates(out, &ios.crash_free_rates, &ios.total_installs);
        if let Some(release) = &ios.dominant_release {
            let _ = writeln!(out, "    Dominant release:  {}", release);
        }
        render_issues(out, "Top crashes", &ios.top_crashes);
        render_issues(out, "Top non-fatals", &ios.top_non_fatals);
    }

    if let Some(snapshot) = &app.google_play_vitals {
        render_snapshot(out, snapshot);
    }
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{}%", v))
}

fn count(value: Option<u64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

fn render_rates(out: &mut String, rates: &CrashFreeRates, installs: &TotalInstalls) {
    let _ = writeln!(
        out,
        "    Crash-free users:  {} fatal, {} non-fatal",
        percent(rates.fatal),
        percent(rates.non_fatal)
    );
    let _ = writeln!(
        out,
        "    Installs:          {} fatal, {} non-fatal",
        count(installs.fatal),
        count(installs.non_fatal)
    );
}

fn render_issues(out: &mut String, title: &str, issues: &[RankedIssue]) {
    if issues.is_empty() {
        return;
    }
    let _ = writeln!(out, "    {}:", title);
    for issue in issues.iter().take(LIST_LIMIT) {
        let _ = writeln!(
            out,
            "      {}. {} ({}% of installs, {} devices, {} events)",
            issue.rank, issue.name, issue.impact_percentage, issue.impacted_devices, issue.events
        );
    }
}

fn render_play_anrs(out: &mut String, anrs: &[PlayConsoleAnr]) {
    if anrs.is_empty() {
        return;
    }
    let _ = writeln!(out, "    User-perceived ANRs:");
    for anr in anrs.iter().take(LIST_LIMIT) {
        let _ = writeln!(
            out,
            "      {}. {} ({:.2}% of users, {} users, {} events)",
            anr.rank, anr.name, anr.impact_percentage, anr.affected_users, anr.events
        );
    }
}

fn render_snapshot(out: &mut String, snapshot: &VitalsSnapshot) {
    let _ = writeln!(
        out,
        "  {} {}",
        style("Google Play vitals").bold(),
        style(format!("({})", snapshot.date)).dim()
    );
    for metric in &snapshot.metrics {
        let _ = writeln!(out, "    {:<26} {}", metric.name, metric.value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use vitals_core::result::VitalsMetric;

    fn batch() -> BatchResult {
        let timestamp = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let mut batch = BatchResult::new(timestamp, 7);

        let mut app = AppResult::new("customer", "Customer App");
        app.android.crash_free_rates.fatal = Some(99.12);
        app.android.total_installs.fatal = Some(1000);
        app.android.p90_launch_time_seconds = Some(1.93);
        app.android.top_crashes = vec![RankedIssue {
            rank: 1,
            name: "java.lang.NullPointerException".to_string(),
            impact_percentage: 2,
            impacted_devices: 15,
            events: 70,
        }];
        app.google_play_vitals = Some(VitalsSnapshot {
            date: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            metrics: vec![VitalsMetric {
                name: "anr_rate".to_string(),
                value: 0.41,
            }],
        });
        batch.insert(app);
        batch
    }

    #[test]
    fn test_render_lists_captured_values() {
        let text = render(&batch());

        assert!(text.contains("Customer App"));
        assert!(text.contains("99.12% fatal, n/a non-fatal"));
        assert!(text.contains("P90 launch time:   1.93s"));
        assert!(text.contains("1. java.lang.NullPointerException (2% of installs, 15 devices, 70 events)"));
        assert!(text.contains("2024-03-08"));
        assert!(text.contains("anr_rate"));
    }

    #[test]
    fn test_render_skips_empty_ios() {
        let text = render(&batch());
        assert!(!text.contains("iOS"));
    }

    #[test]
    fn test_render_empty_batch() {
        let timestamp = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let text = render(&BatchResult::new(timestamp, 30));
        assert!(text.contains("last 30 days"));
        assert!(text.contains("No app data was collected"));
    }
}
