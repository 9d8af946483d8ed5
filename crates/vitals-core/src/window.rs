use crate::{Error, Result};
use chrono::{Duration, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Trailing reporting window a run is configured for.
///
/// The window is chosen once per process and threaded through URL building,
/// date-range validation and the Play reporting queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReportWindow {
    #[default]
    SevenDays,
    ThirtyDays,
}

impl ReportWindow {
    pub fn from_days(days: u32) -> Result<Self> {
        match days {
            7 => Ok(ReportWindow::SevenDays),
            30 => Ok(ReportWindow::ThirtyDays),
            other => Err(Error::UnsupportedWindow(other)),
        }
    }

    pub fn days(&self) -> u32 {
        match self {
            ReportWindow::SevenDays => 7,
            ReportWindow::ThirtyDays => 30,
        }
    }

    /// `time` query value on Crashlytics issue pages
    pub fn crashlytics_time(&self) -> &'static str {
        match self {
            ReportWindow::SevenDays => "last-seven-days",
            ReportWindow::ThirtyDays => "last-thirty-days",
        }
    }

    /// Analytics explorer date option. Analytics has no 30-day preset, 28 days is the closest.
    pub fn analytics_date_option(&self) -> &'static str {
        match self {
            ReportWindow::SevenDays => "last7Days",
            ReportWindow::ThirtyDays => "last28Days",
        }
    }

    pub fn play_console_days(&self) -> u32 {
        self.days()
    }

    /// `time` query value on the performance trends page
    pub fn performance_time(&self) -> &'static str {
        match self {
            ReportWindow::SevenDays => "7d",
            ReportWindow::ThirtyDays => "30d",
        }
    }

    /// Suffix of the user-weighted metric names in the Play reporting API
    pub fn vitals_metric_suffix(&self) -> &'static str {
        match self {
            ReportWindow::SevenDays => "7dUserWeighted",
            ReportWindow::ThirtyDays => "28dUserWeighted",
        }
    }

    /// How many days back the Play reporting probe walks (exclusive upper bound)
    pub fn vitals_lookback_days(&self) -> u32 {
        match self {
            ReportWindow::SevenDays => 8,
            ReportWindow::ThirtyDays => 31,
        }
    }

    /// First day of the window that ends on `today`, inclusive on both ends.
    pub fn expected_start(&self, today: NaiveDate) -> NaiveDate {
        today - Duration::days(i64::from(self.days()) - 1)
    }

    /// True when `[start, end]` is exactly this window ending on `today`.
    pub fn covers(&self, start: NaiveDate, end: NaiveDate, today: NaiveDate) -> bool {
        end == today && start == self.expected_start(today)
    }
}

impl fmt::Display for ReportWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-day", self.days())
    }
}

impl FromStr for ReportWindow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let days = s
            .trim()
            .parse::<u32>()
            .map_err(|_| Error::InvalidWindow(s.trim().to_string()))?;
        Self::from_days(days)
    }
}
