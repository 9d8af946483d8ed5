use clap::ValueEnum;
use vitals_core::ReportWindow;

pub mod commands;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Pretty => "pretty",
            OutputFormat::Json => "json",
        }
    }
}

/// clap value parser for the `7` / `30` day window
pub fn parse_window(value: &str) -> Result<ReportWindow, String> {
    value
        .parse::<ReportWindow>()
        .map_err(|_| format!("'{}' is not a supported window, expected 7 or 30", value))
}
