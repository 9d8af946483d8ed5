use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Play console numeric identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayConsoleIds {
    pub developer_id: String,
    pub app_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidTarget {
    /// Console app id, e.g. `android:com.example.app`
    pub app_id: String,
    pub package_name: String,
    pub play_console: PlayConsoleIds,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IosTarget {
    /// Console app id, e.g. `ios:com.example.app`
    pub app_id: String,
    pub bundle_id: String,
}

/// Static configuration of one monitored application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub key: String,
    pub name: String,
    pub console_project: String,
    pub android: AndroidTarget,
    #[serde(default)]
    pub ios: Option<IosTarget>,
    #[serde(default)]
    pub has_ios: bool,
    #[serde(default = "default_true")]
    pub has_startup_latency_trace: bool,
    /// Analytics property number used by the explorer deep links (`fpn`)
    #[serde(default = "default_analytics_property")]
    pub analytics_property: String,
}

fn default_true() -> bool {
    true
}

fn default_analytics_property() -> String {
    DEFAULT_ANALYTICS_PROPERTY.to_string()
}

pub const DEFAULT_ANALYTICS_PROPERTY: &str = "324301932190";

impl AppConfig {
    /// iOS target, only when the capability flag allows it
    pub fn ios_target(&self) -> Option<&IosTarget> {
        if self.has_ios { self.ios.as_ref() } else { None }
    }

    pub fn has_ios(&self) -> bool {
        self.ios_target().is_some()
    }
}

/// Ordered set of monitored applications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRegistry {
    apps: Vec<AppConfig>,
}

impl AppRegistry {
    pub fn new(apps: Vec<AppConfig>) -> Result<Self> {
        let registry = Self { apps };
        registry.validate()?;
        Ok(registry)
    }

    /// The apps harvested when no registry file is given
    pub fn builtin() -> Self {
        const DEVELOPER_ID: &str = "4707055851875633325";

        let android = |package: &str, play_app_id: &str| AndroidTarget {
            app_id: format!("android:{}", package),
            package_name: package.to_string(),
            play_console: PlayConsoleIds {
                developer_id: DEVELOPER_ID.to_string(),
                app_id: play_app_id.to_string(),
            },
        };
        let ios = |bundle: &str| IosTarget {
            app_id: format!("ios:{}", bundle),
            bundle_id: bundle.to_string(),
        };

        Self {
            apps: vec![
                AppConfig {
                    key: "partner".to_string(),
                    name: "Partner App".to_string(),
                    console_project: "driverapp-f56a2".to_string(),
                    android: android("com.theporter.android.driverapp", "4972278085731896191"),
                    ios: None,
                    has_ios: false,
                    has_startup_latency_trace: true,
                    analytics_property: default_analytics_property(),
                },
                AppConfig {
                    key: "customer".to_string(),
                    name: "Customer App".to_string(),
                    console_project: "portercustomerapp".to_string(),
                    android: android("com.theporter.android.customerapp", "4975635893417729870"),
                    ios: Some(ios("in.theporter.customerapp")),
                    has_ios: true,
                    has_startup_latency_trace: true,
                    analytics_property: default_analytics_property(),
                },
                AppConfig {
                    key: "vendor".to_string(),
                    name: "Vendor App".to_string(),
                    console_project: "pnmvendorapp".to_string(),
                    android: android("in.porter.pnm.vendor.app", "4975591217808574162"),
                    ios: None,
                    has_ios: false,
                    has_startup_latency_trace: true,
                    analytics_property: default_analytics_property(),
                },
                AppConfig {
                    key: "owner".to_string(),
                    name: "Owner App".to_string(),
                    console_project: "owner-app-29e1d".to_string(),
                    android: android("com.porter.android.partnerownerapp", "4974844181868761677"),
                    ios: Some(ios("com.porter.partnerownerapp")),
                    has_ios: true,
                    has_startup_latency_trace: false,
                    analytics_property: default_analytics_property(),
                },
            ],
        }
    }

    /// Load a registry from a JSON array of app configurations
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Reading app registry from: {}", path.display());

        let file = File::open(path)?;
        let apps: Vec<AppConfig> = serde_json::from_reader(BufReader::new(file))?;

        tracing::info!("Loaded {} apps from {}", apps.len(), path.display());
        Self::new(apps)
    }

    pub fn from_str(content: &str) -> Result<Self> {
        let apps: Vec<AppConfig> = serde_json::from_str(content)?;
        Self::new(apps)
    }

    fn validate(&self) -> Result<()> {
        if self.apps.is_empty() {
            return Err(Error::InvalidRegistry("no apps configured".to_string()));
        }

        for (idx, app) in self.apps.iter().enumerate() {
            if app.key.is_empty() {
                return Err(Error::InvalidRegistry(format!("app {} has an empty key", idx)));
            }
            if self.apps[..idx].iter().any(|other| other.key == app.key) {
                return Err(Error::InvalidRegistry(format!("duplicate app key '{}'", app.key)));
            }
            if app.has_ios && app.ios.is_none() {
                return Err(Error::InvalidRegistry(format!(
                    "app '{}' sets has_ios but has no ios target",
                    app.key
                )));
            }
        }

        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<&AppConfig> {
        self.apps
            .iter()
            .find(|app| app.key == key)
            .ok_or_else(|| Error::UnknownApp(key.to_string()))
    }

    /// Keep only `keys`, preserving registry order
    pub fn select(&self, keys: &[String]) -> Result<Self> {
        for key in keys {
            self.get(key)?;
        }

        Ok(Self {
            apps: self
                .apps
                .iter()
                .filter(|app| keys.contains(&app.key))
                .cloned()
                .collect(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &AppConfig> {
        self.apps.iter()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

impl Default for AppRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
