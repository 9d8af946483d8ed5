//! Grouping and ranking shared by every issue-cluster extraction.
//!
//! Android, iOS and ANR lists all go through [`rank_clusters`] so that
//! tie-breaking and rounding stay identical across them.

use std::cmp::Ordering;
use std::collections::HashMap;

/// How many clusters a ranked list keeps
pub const TOP_N: usize = 3;

const UNKNOWN: &str = "Unknown";

/// Which caption field identifies a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    /// Android and Play console lists: subtitle, falling back to the title when absent
    Subtitle,
    /// ANR and iOS lists
    Title,
}

impl GroupKey {
    pub fn key_for(&self, title: Option<&str>, subtitle: Option<&str>) -> String {
        match self {
            GroupKey::Subtitle => non_empty(subtitle).or(non_empty(title)),
            GroupKey::Title => non_empty(title),
        }
        .unwrap_or(UNKNOWN)
        .to_string()
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}

/// Metric a ranked list is sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBy {
    ImpactedDevices,
    /// Vendor-supplied impact ratio (Play console clusters)
    Ratio,
}

/// Aggregated issue signature
#[derive(Debug, Clone, PartialEq)]
pub struct IssueCluster {
    pub name: String,
    pub impacted_devices: u64,
    pub events: u64,
    /// Pre-computed impact ratio as reported by the vendor, 0 when not supplied
    pub ratio: f64,
}

impl IssueCluster {
    pub fn new(name: impl Into<String>, impacted_devices: u64, events: u64) -> Self {
        Self {
            name: name.into(),
            impacted_devices,
            events,
            ratio: 0.0,
        }
    }

    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = ratio;
        self
    }

    /// Sum counts of a cluster with the same key
    pub fn absorb(&mut self, other: &IssueCluster) {
        self.impacted_devices += other.impacted_devices;
        self.events += other.events;
        self.ratio += other.ratio;
    }

    fn rank_value(&self, by: RankBy) -> f64 {
        match by {
            RankBy::ImpactedDevices => self.impacted_devices as f64,
            RankBy::Ratio => self.ratio,
        }
    }
}

/// Merge clusters sharing a name. Output keeps first-seen order.
pub fn group_clusters(rows: impl IntoIterator<Item = IssueCluster>) -> Vec<IssueCluster> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut grouped: Vec<IssueCluster> = Vec::new();

    for row in rows {
        match index.get(&row.name) {
            Some(&pos) => grouped[pos].absorb(&row),
            None => {
                index.insert(row.name.clone(), grouped.len());
                grouped.push(row);
            }
        }
    }

    grouped
}

/// Sort descending by `by` and keep the first `n`. The sort is stable so ties keep first-seen order.
pub fn top_clusters(mut clusters: Vec<IssueCluster>, by: RankBy, n: usize) -> Vec<IssueCluster> {
    clusters.sort_by(|a, b| {
        b.rank_value(by)
            .partial_cmp(&a.rank_value(by))
            .unwrap_or(Ordering::Equal)
    });
    clusters.truncate(n);
    clusters
}

/// Group then rank, the one path every cluster extraction takes
pub fn rank_clusters(rows: impl IntoIterator<Item = IssueCluster>, by: RankBy) -> Vec<IssueCluster> {
    top_clusters(group_clusters(rows), by, TOP_N)
}

/// Whole-percent share of installs affected, rounded down. Zero installs yields zero.
pub fn device_impact_percentage(impacted_devices: u64, total_installs: u64) -> u64 {
    if total_installs == 0 {
        return 0;
    }
    impacted_devices * 100 / total_installs
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
