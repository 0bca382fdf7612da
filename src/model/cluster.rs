use crate::model::metrics::MetricData;
use crate::model::node::Node;
use crate::model::table::Keyspace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Search metadata attached to a log histogram.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogHistogramMetadata {
    #[serde(rename = "_count", default)]
    pub count: u64,
}

/// Bucketed log-match counts for one search.
///
/// `histogram` holds `[timestamp_ms, count]` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogHistogram {
    #[serde(default)]
    pub metadata: LogHistogramMetadata,
    #[serde(default)]
    pub histogram: Vec<(i64, u64)>,
}

impl LogHistogram {
    pub fn new(count: u64, histogram: Vec<(i64, u64)>) -> Self {
        Self {
            metadata: LogHistogramMetadata { count },
            histogram,
        }
    }

    pub fn total_count(&self) -> u64 {
        self.metadata.count
    }

    /// Hours covered by the buckets, never less than one.
    pub fn span_hours(&self) -> f64 {
        let min = self.histogram.iter().map(|(ts, _)| *ts).min();
        let max = self.histogram.iter().map(|(ts, _)| *ts).max();
        match (min, max) {
            (Some(min), Some(max)) => (max.abs_diff(min) as f64 / 3_600_000.0).max(1.0),
            _ => 1.0,
        }
    }

    pub fn hourly_rate(&self) -> f64 {
        self.total_count() as f64 / self.span_hours()
    }

    pub fn peak_count(&self) -> u64 {
        self.histogram.iter().map(|(_, c)| *c).max().unwrap_or(0)
    }

    /// Decodes the API body leniently, dropping malformed buckets.
    pub fn from_value(value: &Value) -> Self {
        let count = value
            .get("metadata")
            .and_then(|m| m.get("_count"))
            .and_then(|c| c.as_u64().or_else(|| c.as_f64().map(|f| f.max(0.0) as u64)))
            .unwrap_or(0);
        let histogram = value
            .get("histogram")
            .and_then(Value::as_array)
            .map(|buckets| {
                buckets
                    .iter()
                    .filter_map(|b| {
                        let pair = b.as_array()?;
                        let ts = pair.first()?.as_i64()?;
                        let c = pair.get(1)?;
                        let c = c.as_u64().or_else(|| c.as_f64().map(|f| f.max(0.0) as u64))?;
                        Some((ts, c))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self::new(count, histogram)
    }
}

/// Everything collected for one analysis run.
///
/// Built once by the collector and only read afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterState {
    pub name: String,
    pub cluster_type: String,
    pub nodes: BTreeMap<String, Node>,
    pub keyspaces: BTreeMap<String, Keyspace>,
    pub metrics: BTreeMap<String, Vec<MetricData>>,
    pub log_events: BTreeMap<String, LogHistogram>,
    pub collection_time: DateTime<Utc>,
    pub collection_duration_seconds: Option<f64>,
}

impl ClusterState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cluster_type: "cassandra".to_string(),
            nodes: BTreeMap::new(),
            keyspaces: BTreeMap::new(),
            metrics: BTreeMap::new(),
            log_events: BTreeMap::new(),
            collection_time: Utc::now(),
            collection_duration_seconds: None,
        }
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.insert(node.host_id.clone(), node);
        self
    }

    pub fn with_keyspace(mut self, keyspace: Keyspace) -> Self {
        self.keyspaces.insert(keyspace.name.clone(), keyspace);
        self
    }

    pub fn with_metric(mut self, key: impl Into<String>, series: Vec<MetricData>) -> Self {
        self.metrics.insert(key.into(), series);
        self
    }

    pub fn with_log_events(mut self, key: impl Into<String>, histogram: LogHistogram) -> Self {
        self.log_events.insert(key.into(), histogram);
        self
    }

    /// Series for `key`, empty when the metric was not collected.
    pub fn metric(&self, key: &str) -> &[MetricData] {
        self.metrics.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sorted, de-duplicated, non-empty datacenter names.
    pub fn datacenters(&self) -> Vec<String> {
        let mut dcs: Vec<String> = self
            .nodes
            .values()
            .filter(|n| !n.dc.is_empty())
            .map(|n| n.dc.clone())
            .collect();
        dcs.sort();
        dcs.dedup();
        dcs
    }

    /// Nodes grouped by datacenter. Nodes without one land under `unknown`.
    pub fn nodes_by_dc(&self) -> BTreeMap<String, Vec<&Node>> {
        let mut by_dc: BTreeMap<String, Vec<&Node>> = BTreeMap::new();
        for node in self.nodes.values() {
            let dc = if node.dc.is_empty() {
                "unknown".to_string()
            } else {
                node.dc.clone()
            };
            by_dc.entry(dc).or_default().push(node);
        }
        by_dc
    }

    pub fn total_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn active_nodes(&self) -> usize {
        self.nodes.values().filter(|n| n.is_active()).count()
    }

    pub fn total_tables(&self) -> usize {
        self.keyspaces.values().map(|k| k.tables.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::NodeDetails;
    use serde_json::json;

    fn node(id: &str, dc: &str, active: bool) -> Node {
        let details = if active {
            NodeDetails::new().with("host_uptime", "1d")
        } else {
            NodeDetails::new()
        };
        Node::new(id, dc, details)
    }

    #[test]
    fn test_datacenters_sorted_unique() {
        let state = ClusterState::new("c")
            .with_node(node("a", "dc2", true))
            .with_node(node("b", "dc1", true))
            .with_node(node("c", "dc2", false))
            .with_node(node("d", "", true));

        assert_eq!(state.datacenters(), vec!["dc1".to_string(), "dc2".to_string()]);
        let by_dc = state.nodes_by_dc();
        assert_eq!(by_dc["dc2"].len(), 2);
        assert_eq!(by_dc["unknown"].len(), 1);
        assert_eq!(state.total_nodes(), 4);
        assert_eq!(state.active_nodes(), 3);
    }

    #[test]
    fn test_histogram_rates() {
        let hist = LogHistogram::new(
            120,
            vec![(0, 10), (3_600_000, 50), (7_200_000, 60)],
        );
        assert_eq!(hist.span_hours(), 2.0);
        assert_eq!(hist.hourly_rate(), 60.0);
        assert_eq!(hist.peak_count(), 60);

        let short = LogHistogram::new(30, vec![(0, 30)]);
        assert_eq!(short.span_hours(), 1.0);
        assert_eq!(short.hourly_rate(), 30.0);

        let skewed = LogHistogram::new(5, vec![(i64::MIN, 2), (i64::MAX, 3)]);
        assert_eq!(skewed.span_hours(), u64::MAX as f64 / 3_600_000.0);
        assert!(skewed.hourly_rate() >= 0.0);
    }

    #[test]
    fn test_histogram_from_value_skips_bad_buckets() {
        let hist = LogHistogram::from_value(&json!({
            "metadata": {"_count": 7},
            "histogram": [[1000, 3], ["bad", 1], [2000], [3000, 4]]
        }));
        assert_eq!(hist.total_count(), 7);
        assert_eq!(hist.histogram, vec![(1000, 3), (3000, 4)]);

        let empty = LogHistogram::from_value(&json!({}));
        assert_eq!(empty.total_count(), 0);
        assert!(empty.histogram.is_empty());
    }

    #[test]
    fn test_missing_metric_is_empty() {
        let state = ClusterState::new("c");
        assert!(state.metric("cpu_usage").is_empty());
    }
}
