use crate::metrics::{self, METRICS, MetricDef, PROBE, QueryResponse};
use crate::{Error, Result, TokenProvider};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use vitals_core::ReportWindow;
use vitals_core::result::{VitalsMetric, VitalsSnapshot};

pub const DEFAULT_BASE_URL: &str = "https://playdeveloperreporting.googleapis.com/v1beta1";

/// Pause between metric-set requests
const SET_PAUSE: Duration = Duration::from_millis(100);

/// Anything that can produce a vitals snapshot for an Android package
#[async_trait]
pub trait VitalsSource: Send + Sync {
    async fn snapshot(
        &self,
        package: &str,
        window: ReportWindow,
        today: NaiveDate,
    ) -> Result<VitalsSnapshot>;
}

pub struct PlayVitalsClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
    pause: Duration,
}

impl PlayVitalsClient {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            tokens,
            pause: SET_PAUSE,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    async fn query(
        &self,
        package: &str,
        set: metrics::MetricSet,
        names: &[String],
        date: NaiveDate,
        token: &str,
    ) -> Result<QueryResponse> {
        let url = format!("{}/apps/{}/{}:query", self.base_url, package, set.endpoint());
        let body = metrics::query_body(set, names, date);

        tracing::debug!("POST {} for {}", url, date);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<QueryResponse>().await?)
    }

    /// Fetch `defs` for one day, one request per metric set.
    /// A set that fails is logged and left out.
    pub async fn fetch_for_date(
        &self,
        package: &str,
        defs: &[MetricDef],
        window: ReportWindow,
        date: NaiveDate,
    ) -> Result<Vec<(String, f64)>> {
        let token = self.tokens.access_token().await?;
        let mut values = Vec::new();

        for (set, members) in metrics::group_by_set(defs) {
            let names: Vec<String> = members.iter().map(|def| def.api_name(window)).collect();
            match self.query(package, set, &names, date, &token).await {
                Ok(response) if response.has_rows() => values.extend(response.values()),
                Ok(_) => tracing::debug!("{} returned no rows for {}", set.endpoint(), date),
                Err(e) => tracing::debug!("{} failed for {}: {}", set.endpoint(), date, e),
            }
            tokio::time::sleep(self.pause).await;
        }

        Ok(values)
    }

    /// Most recent day, counting back from yesterday, for which the probe metric has data
    pub async fn latest_date(
        &self,
        package: &str,
        window: ReportWindow,
        today: NaiveDate,
    ) -> Result<Option<NaiveDate>> {
        for days_back in 1..window.vitals_lookback_days() {
            let Some(date) = today.checked_sub_days(Days::new(u64::from(days_back))) else {
                break;
            };
            let probe = self.fetch_for_date(package, &[PROBE], window, date).await?;
            if !probe.is_empty() {
                return Ok(Some(date));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl VitalsSource for PlayVitalsClient {
    async fn snapshot(
        &self,
        package: &str,
        window: ReportWindow,
        today: NaiveDate,
    ) -> Result<VitalsSnapshot> {
        let Some(date) = self.latest_date(package, window, today).await? else {
            return Err(Error::NoData {
                days: window.days(),
            });
        };

        let values = self.fetch_for_date(package, &METRICS, window, date).await?;
        if values.is_empty() {
            return Err(Error::NoData {
                days: window.days(),
            });
        }

        let metrics = METRICS
            .iter()
            .filter_map(|def| {
                let api_name = def.api_name(window);
                values
                    .iter()
                    .find(|(name, _)| *name == api_name)
                    .map(|(_, value)| VitalsMetric {
                        name: def.output_name.to_string(),
                        value: *value,
                    })
            })
            .collect();

        Ok(VitalsSnapshot { date, metrics })
    }
}
