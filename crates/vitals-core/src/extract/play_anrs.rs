//! Play console error clusters.
//!
//! The endpoint speaks protobuf-over-JSON, so fields are numbered rather than named:
//! `"1"` is the cluster list, `"2"."1"` the cluster name, `"6"` affected users,
//! `"7"` events and `"11"` the console's own impact ratio.

use super::{ExtractError, ExtractResult, count, float};
use crate::aggregate::{IssueCluster, RankBy, rank_clusters, round2};
use crate::result::PlayConsoleAnr;
use serde_json::Value;

/// Request body markers of the user-perceived ANR query. The same endpoint also
/// serves crash and all-ANR queries on the same page.
const USER_PERCEIVED_MARKER: &str = r#""19":2"#;
const ANR_TYPE_MARKER: &str = r#""2":[3]"#;

/// Whether the request that produced a clusters response asked for user-perceived ANRs
pub fn is_user_perceived_anr_query(request_body: Option<&str>) -> bool {
    request_body
        .map(|body| body.contains(USER_PERCEIVED_MARKER) && body.contains(ANR_TYPE_MARKER))
        .unwrap_or(false)
}

pub fn parse(body: &[u8]) -> ExtractResult<Vec<IssueCluster>> {
    let root: Value = serde_json::from_slice(body)?;

    let clusters = match root.get("1") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(clusters)) => clusters,
        Some(other) => {
            return Err(ExtractError::InvalidValue {
                field: "clusters",
                value: other.to_string(),
            });
        }
    };

    clusters
        .iter()
        .map(|cluster| {
            let name = cluster
                .get("2")
                .and_then(|c| c.get("1"))
                .and_then(Value::as_str)
                .unwrap_or("Unknown");

            Ok(IssueCluster::new(
                name,
                count(cluster.get("6"), "affectedUsers")?,
                count(cluster.get("7"), "eventCount")?,
            )
            .with_ratio(float(cluster.get("11"), "impactRatio")?))
        })
        .collect()
}

/// Rank clusters by the console's impact ratio, summed over duplicate names
pub fn rank(clusters: Vec<IssueCluster>) -> Vec<PlayConsoleAnr> {
    rank_clusters(clusters, RankBy::Ratio)
        .into_iter()
        .enumerate()
        .map(|(idx, cluster)| PlayConsoleAnr {
            rank: idx + 1,
            impact_percentage: round2(cluster.ratio * 100.0),
            name: cluster.name,
            affected_users: cluster.impacted_devices,
            events: cluster.events,
        })
        .collect()
}
