//! Lenient decoding of monitoring API payloads into the cluster model.
//!
//! Missing or mistyped fields fall back to defaults; nothing here fails.

use crate::config::ClusterConfig;
use crate::model::table::DEFAULT_GC_GRACE_SECONDS;
use crate::model::{Keyspace, MetricData, MetricPoint, Node, NodeDetails, Table};
use chrono::{TimeZone, Utc};
use serde_json::Value;

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Decodes one entry of the `nodes-full` listing.
pub fn decode_node(value: &Value, cluster: &ClusterConfig) -> Node {
    let mut details = NodeDetails::new();
    if let Some(map) = value.get("Details").and_then(Value::as_object) {
        for (key, v) in map {
            details.insert(key.clone(), v.clone());
        }
    }

    let mut node = Node::new(
        str_field(value, "host_id").unwrap_or_default(),
        str_field(value, "DC").unwrap_or_default(),
        details,
    );
    node.org = str_field(value, "org").unwrap_or(&cluster.org).to_string();
    node.cluster = str_field(value, "cluster")
        .unwrap_or(&cluster.cluster)
        .to_string();
    node
}

/// Class name of a strategy reported as `org.apache...SimpleStrategy@1a2b3c`.
pub fn replication_strategy_name(raw: &str) -> &str {
    let class = raw.split('@').next().unwrap_or(raw);
    class.rsplit('.').next().unwrap_or(class)
}

/// Options of `ReplicationParams{class=..., dc1=3, dc2=2}`, without `class`.
pub fn replication_params(raw: &str) -> Vec<(String, String)> {
    if !raw.contains("ReplicationParams{") {
        return Vec::new();
    }
    let (Some(open), Some(close)) = (raw.find('{'), raw.rfind('}')) else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }

    raw[open + 1..close]
        .split(", ")
        .filter_map(|pair| pair.split_once('='))
        .filter(|(key, _)| *key != "class")
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn decode_table(value: &Value, keyspace: &str) -> Table {
    let mut table = Table::new(
        str_field(value, "Keyspace")
            .filter(|k| !k.is_empty())
            .unwrap_or(keyspace),
        str_field(value, "Name").unwrap_or_default(),
        str_field(value, "CQL").unwrap_or_default(),
    )
    .with_gc_grace(
        value
            .get("GCGrace")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_GC_GRACE_SECONDS),
    )
    .with_compaction_strategy(str_field(value, "CompactionStrategy").unwrap_or_default());
    table.id = str_field(value, "ID").unwrap_or_default().to_string();
    table
}

/// Decodes one entry of the keyspace listing including its tables.
pub fn decode_keyspace(value: &Value) -> Keyspace {
    let name = str_field(value, "Name").unwrap_or_default();
    let strategy = replication_strategy_name(str_field(value, "ReplicationStrategy").unwrap_or_default());

    let mut keyspace = Keyspace::new(name, strategy);
    for (key, option) in replication_params(str_field(value, "ReplicationParams").unwrap_or_default()) {
        keyspace = keyspace.with_option(key, option);
    }
    if let Some(tables) = value.get("Tables").and_then(Value::as_array) {
        for table in tables {
            keyspace = keyspace.with_table(decode_table(table, name));
        }
    }
    keyspace
}

fn sample_value(raw: &Value) -> Option<f64> {
    match raw {
        Value::String(s) => s.parse().ok(),
        other => other.as_f64(),
    }
}

fn decode_series(series: &Value) -> Option<MetricData> {
    let labels = series.get("metric").and_then(Value::as_object);
    let name = labels
        .and_then(|l| l.get("__name__"))
        .and_then(Value::as_str)
        .unwrap_or("unknown");

    let mut data = MetricData::new(name);
    for (key, label) in labels.into_iter().flatten() {
        if let Some(label) = label.as_str() {
            data = data.with_label(key.clone(), label);
        }
    }

    data.data_points = series
        .get("values")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|pair| {
            let pair = pair.as_array()?;
            let ts = pair.first()?.as_f64()?;
            let value = sample_value(pair.get(1)?)?;
            let timestamp = Utc.timestamp_millis_opt((ts * 1000.0) as i64).single()?;
            Some(MetricPoint { timestamp, value })
        })
        .collect();

    (!data.data_points.is_empty()).then_some(data)
}

/// Decodes a Prometheus range query response.
///
/// Only successful `matrix` results are read. Samples that do not parse are
/// skipped and series left without samples are dropped.
pub fn decode_matrix(response: &Value) -> Vec<MetricData> {
    if str_field(response, "status") != Some("success") {
        return Vec::new();
    }
    let Some(data) = response.get("data") else {
        return Vec::new();
    };
    if str_field(data, "resultType") != Some("matrix") {
        return Vec::new();
    }

    data.get("result")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(decode_series)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cluster() -> ClusterConfig {
        ClusterConfig {
            org: "acme".to_string(),
            cluster: "prod".to_string(),
            cluster_type: "cassandra".to_string(),
        }
    }

    #[test]
    fn test_decode_node() {
        let node = decode_node(
            &json!({
                "host_id": "n1",
                "DC": "dc1",
                "Details": {"host_Hostname": "cass-1", "comp_num_tokens": 16}
            }),
            &cluster(),
        );
        assert_eq!(node.host_id, "n1");
        assert_eq!(node.dc, "dc1");
        assert_eq!(node.org, "acme");
        assert_eq!(node.cluster, "prod");
        assert_eq!(node.details.get_i64("comp_num_tokens"), Some(16));
        assert_eq!(node.hostname().as_deref(), Some("cass-1"));
    }

    #[test]
    fn test_replication_parsing() {
        assert_eq!(
            replication_strategy_name("org.apache.cassandra.locator.NetworkTopologyStrategy@6f2b"),
            "NetworkTopologyStrategy"
        );
        assert_eq!(replication_strategy_name("SimpleStrategy"), "SimpleStrategy");
        assert_eq!(
            replication_params(
                "ReplicationParams{class=org.apache.cassandra.locator.NetworkTopologyStrategy, dc1=3, dc2=2}"
            ),
            vec![
                ("dc1".to_string(), "3".to_string()),
                ("dc2".to_string(), "2".to_string())
            ]
        );
        assert!(replication_params("{dc1=3}").is_empty());
    }

    #[test]
    fn test_decode_keyspace() {
        let ks = decode_keyspace(&json!({
            "Name": "app",
            "ReplicationStrategy": "org.apache.cassandra.locator.NetworkTopologyStrategy@1",
            "ReplicationParams": "ReplicationParams{class=org.apache.cassandra.locator.NetworkTopologyStrategy, dc1=3, dc2=2}",
            "Tables": [
                {"Name": "users", "CQL": "CREATE TABLE app.users (id int PRIMARY KEY)", "ID": "abc"},
                {"Name": "events", "Keyspace": "app", "GCGrace": 3600, "CompactionStrategy": "TimeWindowCompactionStrategy"}
            ]
        }));
        assert_eq!(ks.replication_strategy, "NetworkTopologyStrategy");
        assert_eq!(ks.replication_factor(), 2);
        assert_eq!(ks.tables.len(), 2);

        let users = ks.table("users").unwrap();
        assert_eq!(users.keyspace, "app");
        assert_eq!(users.gc_grace, DEFAULT_GC_GRACE_SECONDS);
        assert_eq!(users.id, "abc");
        assert_eq!(ks.table("events").unwrap().gc_grace, 3600);
    }

    #[test]
    fn test_decode_matrix() {
        let response = json!({
            "status": "success",
            "data": {
                "resultType": "matrix",
                "result": [
                    {
                        "metric": {"__name__": "cas_Compaction_PendingTasks", "host_id": "n1"},
                        "values": [[1700000000, "5"], [1700000060, "NaN-ish"], [1700000120, "7"]]
                    },
                    {"metric": {"host_id": "n2"}, "values": [[1700000000, "bad"]]},
                    {"metric": {}, "values": [[1700000000.5, "1.5"]]}
                ]
            }
        });
        let series = decode_matrix(&response);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].metric_name, "cas_Compaction_PendingTasks");
        assert_eq!(series[0].label("host_id"), Some("n1"));
        assert_eq!(series[0].data_points.len(), 2);
        assert_eq!(series[0].average(), Some(6.0));
        assert_eq!(series[1].metric_name, "unknown");
    }

    #[test]
    fn test_decode_matrix_rejects_other_shapes() {
        assert!(decode_matrix(&json!({"status": "error"})).is_empty());
        assert!(decode_matrix(&json!({"status": "success", "data": {"resultType": "vector", "result": []}})).is_empty());
        assert!(decode_matrix(&json!({"status": "success", "data": null})).is_empty());
        assert!(decode_matrix(&json!({})).is_empty());
    }
}
