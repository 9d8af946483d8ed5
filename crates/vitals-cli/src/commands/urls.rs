use anyhow::Result;
use console::style;
use std::path::Path;
use vitals_core::{ConsoleUrls, ReportWindow};

/// Print every page the collector opens for `app_key`, in visiting order
pub fn execute(app_key: &str, window: ReportWindow, apps_file: Option<&Path>) -> Result<()> {
    let registry = super::load_registry(apps_file, &[])?;
    let app = registry.get(app_key)?;
    let urls = ConsoleUrls::build(window, app);

    println!(
        "{}",
        style(format!("🔗 {} ({}), {} window", app.name, app.key, window)).bold()
    );
    for (label, url) in urls.labelled() {
        println!("  {} {}", style(format!("{:<26}", label)).cyan(), url);
    }
    Ok(())
}
