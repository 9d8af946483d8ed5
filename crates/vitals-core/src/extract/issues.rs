use super::{ExtractResult, count};
use crate::aggregate::{GroupKey, IssueCluster, RankBy, device_impact_percentage, rank_clusters};
use crate::result::RankedIssue;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIssueList {
    #[serde(default)]
    top_issues: Vec<RawIssue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIssue {
    #[serde(default)]
    caption: RawCaption,
    impacted_devices_count: Option<Value>,
    events_count: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCaption {
    title: Option<String>,
    subtitle: Option<String>,
}

/// One row of a `metrics:listFirebaseTopOpenIssues` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRow {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub impacted_devices: u64,
    pub events: u64,
}

pub fn parse(body: &[u8]) -> ExtractResult<Vec<IssueRow>> {
    let raw: RawIssueList = serde_json::from_slice(body)?;

    raw.top_issues
        .into_iter()
        .map(|issue| {
            Ok(IssueRow {
                title: issue.caption.title,
                subtitle: issue.caption.subtitle,
                impacted_devices: count(issue.impacted_devices_count.as_ref(), "impactedDevicesCount")?,
                events: count(issue.events_count.as_ref(), "eventsCount")?,
            })
        })
        .collect()
}

/// Group rows by `key`, keep the top clusters by impacted devices and express
/// their impact as a whole percentage of `total_installs`.
pub fn rank(rows: &[IssueRow], key: GroupKey, total_installs: u64) -> Vec<RankedIssue> {
    let clusters = rows.iter().map(|row| {
        IssueCluster::new(
            key.key_for(row.title.as_deref(), row.subtitle.as_deref()),
            row.impacted_devices,
            row.events,
        )
    });

    rank_clusters(clusters, RankBy::ImpactedDevices)
        .into_iter()
        .enumerate()
        .map(|(idx, cluster)| RankedIssue {
            rank: idx + 1,
            impact_percentage: device_impact_percentage(cluster.impacted_devices, total_installs),
            name: cluster.name,
            impacted_devices: cluster.impacted_devices,
            events: cluster.events,
        })
        .collect()
}
