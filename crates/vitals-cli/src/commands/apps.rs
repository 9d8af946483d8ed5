use crate::OutputFormat;
use anyhow::Result;
use console::style;
use std::path::Path;
use vitals_core::{AppConfig, AppRegistry};

pub fn execute(apps_file: Option<&Path>, format: OutputFormat) -> Result<()> {
    let registry = super::load_registry(apps_file, &[])?;

    match format {
        OutputFormat::Json => {
            let apps: Vec<&AppConfig> = registry.iter().collect();
            println!("{}", serde_json::to_string_pretty(&apps)?);
        }
        OutputFormat::Pretty => print_registry(&registry),
    }
    Ok(())
}

fn capabilities(app: &AppConfig) -> String {
    let mut caps = vec!["android"];
    if app.has_ios() {
        caps.push("ios");
    }
    if app.has_startup_latency_trace {
        caps.push("launch-time");
    }
    caps.join(", ")
}

fn print_registry(registry: &AppRegistry) {
    println!("{}", style(format!("📱 {} apps", registry.len())).bold());
    for app in registry.iter() {
        println!();
        println!("  {} {}", style(&app.key).cyan().bold(), style(&app.name).dim());
        println!("    Project:  {}", app.console_project);
        println!("    Android:  {}", app.android.package_name);
        if let Some(ios) = app.ios_target() {
            println!("    iOS:      {}", ios.bundle_id);
        }
        println!("    Collects: {}", capabilities(app));
    }
}
