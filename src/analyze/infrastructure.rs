//! Hardware, operating system and topology checks.

use crate::analyze::analyzer::{AnalysisOutcome, AnalysisResult, SectionAnalyzer};
use crate::analyze::common::{
    format_counts, group_nodes, BYTES_PER_MB, CATEGORY_INFRASTRUCTURE, DEFAULT_TYPICAL_RF,
    MIN_MAX_MAP_COUNT, MIN_PRODUCTION_NODES, SECTION_INFRASTRUCTURE, SYSCTL_LOCATION,
    VNODES_CRITICAL, VNODES_WARNING,
};
use crate::config::Thresholds;
use crate::model::metrics::{series_average, series_max};
use crate::model::node::keys;
use crate::model::{ClusterState, Node, Recommendation, Severity};
use serde_json::{json, Value};
use std::collections::BTreeMap;

const DATA_FSTYPE: &str = "host_disk_/srv/cassandra_fstype";
const ROOT_DISK_TOTAL: &str = "host_disk_/_Total";
const ROOT_DISK_USED: &str = "host_disk_/_Used";
const DATA_DISK_TOTAL: &str = "host_disk_/srv/cassandra_Total";
const DATA_DISK_USED: &str = "host_disk_/srv/cassandra_Used";
const SWAPPINESS: &str = "host_sysctl_vm.swappiness";
const MAX_MAP_COUNT: &str = "host_sysctl_vm.max_map_count";
const RACKDC_PROPERTIES: &str = "cassandra-rackdc.properties";

/// Kernel tunables checked against a floor: (name, minimum, what it sizes, component).
const NETWORK_SYSCTLS: [(&str, i64, &str, &str); 3] = [
    ("net.core.rmem_max", 16_777_216, "socket receive buffer", "Network"),
    ("net.core.wmem_max", 16_777_216, "socket send buffer", "Network"),
    ("net.core.netdev_max_backlog", 5000, "network device backlog", "Network"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct InfrastructureAnalyzer;

impl SectionAnalyzer for InfrastructureAnalyzer {
    fn section(&self) -> &'static str {
        SECTION_INFRASTRUCTURE
    }

    fn analyze(&self, state: &ClusterState, thresholds: &Thresholds) -> AnalysisOutcome {
        let mut recommendations = Vec::new();
        recommendations.extend(analyze_nodes(state));
        recommendations.extend(analyze_resource_usage(state, thresholds));
        recommendations.extend(analyze_topology(state));
        recommendations.extend(analyze_storage(state));
        recommendations.extend(analyze_vnodes(state));
        recommendations.extend(analyze_swap(state));
        recommendations.extend(analyze_sysctl(state));

        let count = recommendations.len();
        Ok(AnalysisResult::new(recommendations)
            .with_summary("total_nodes", state.total_nodes())
            .with_summary("active_nodes", state.active_nodes())
            .with_summary("datacenters", state.datacenters())
            .with_summary("recommendations_count", count))
    }
}

fn infra(
    title: impl Into<String>,
    description: impl Into<String>,
    severity: Severity,
) -> Recommendation {
    Recommendation::new(title, description, severity, CATEGORY_INFRASTRUCTURE)
}

fn analyze_nodes(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    let total = state.total_nodes();

    if total < MIN_PRODUCTION_NODES {
        recommendations.push(
            infra(
                "Insufficient Node Count",
                format!(
                    "Cluster has only {} nodes. For production workloads, a minimum of 3 nodes is recommended.",
                    total
                ),
                Severity::Warning,
            )
            .with_impact("Reduced availability and potential data loss risk")
            .with_recommendation("Add additional nodes to achieve at least 3 nodes per datacenter")
            .with_context("total_nodes", total)
            .with_component("Cluster Topology"),
        );
    }

    let active = state.active_nodes();
    if active < total {
        let down = total - active;
        recommendations.push(
            infra(
                "Nodes Down",
                format!("{} out of {} nodes are down", down, total),
                Severity::Critical,
            )
            .with_impact("Reduced cluster capacity and availability")
            .with_recommendation("Investigate and restore down nodes")
            .with_context("down_nodes", down)
            .with_context("total_nodes", total)
            .with_component("Cluster Health"),
        );
    }

    recommendations
}

fn analyze_resource_usage(state: &ClusterState, thresholds: &Thresholds) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let avg_cpu = series_average(state.metric("cpu_usage"));
    if avg_cpu > thresholds.cpu_usage_warn {
        let severity = if avg_cpu > 90.0 {
            Severity::Critical
        } else {
            Severity::Warning
        };
        recommendations.push(
            infra("High CPU Usage", format!("Average CPU usage is {:.1}%", avg_cpu), severity)
                .with_impact("Performance degradation and increased latency")
                .with_recommendation("Scale cluster or optimize workload")
                .with_context("cpu_usage", avg_cpu)
                .with_component("CPU"),
        );
    }

    let avg_memory = series_average(state.metric("memory_usage_percent"));
    if avg_memory > thresholds.memory_usage_warn {
        recommendations.push(
            infra(
                "High Memory Usage",
                format!("Memory usage is {:.1}%", avg_memory),
                Severity::Warning,
            )
            .with_impact("Risk of OOM errors and node failures")
            .with_recommendation("Monitor memory usage and consider adding more memory")
            .with_context("memory_usage_percent", avg_memory)
            .with_component("Memory"),
        );
    }

    let max_disk = series_max(state.metric("disk_usage_percent"));
    if max_disk > thresholds.disk_usage_warn {
        let severity = if max_disk > 90.0 {
            Severity::Critical
        } else {
            Severity::Warning
        };
        recommendations.push(
            infra("High Disk Usage", format!("Disk usage is {:.1}%", max_disk), severity)
                .with_impact("Risk of running out of disk space")
                .with_recommendation("Add disk space or clean up data")
                .with_context("disk_usage_percent", max_disk)
                .with_component("Storage"),
        );
    }

    recommendations
}

/// Nodes per rack within each datacenter. Missing DC or rack names become `default`.
fn racks_by_dc<'a>(nodes: impl Iterator<Item = &'a Node>) -> BTreeMap<String, BTreeMap<String, usize>> {
    let mut out: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for node in nodes {
        let dc = if node.dc.is_empty() {
            "default".to_string()
        } else {
            node.dc.clone()
        };
        let rack = node
            .rack()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "default".to_string());
        *out.entry(dc).or_default().entry(rack).or_default() += 1;
    }
    out
}

fn spread(counts: impl Iterator<Item = usize>) -> (usize, usize) {
    counts.fold((usize::MAX, 0), |(lo, hi), c| (lo.min(c), hi.max(c)))
}

/// Replication factor of the first user keyspace that states one for `dc`.
fn typical_rf(state: &ClusterState, dc: &str) -> i64 {
    state
        .keyspaces
        .values()
        .filter(|ks| !ks.name.starts_with("system"))
        .find_map(|ks| {
            let opts = &ks.replication_options;
            let raw = opts.get("replication_factor").or_else(|| opts.get(dc))?;
            raw.trim().parse::<i64>().ok()
        })
        .unwrap_or(DEFAULT_TYPICAL_RF)
}

fn counts_object(counts: &BTreeMap<String, usize>) -> Value {
    Value::Object(counts.iter().map(|(k, v)| (k.clone(), json!(v))).collect())
}

fn analyze_topology(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    let datacenters = state.datacenters();

    if datacenters.len() == 1 {
        recommendations.push(
            infra(
                "Single Datacenter Deployment",
                "Cluster is deployed in a single datacenter",
                Severity::Info,
            )
            .with_impact("No protection against datacenter-level failures")
            .with_recommendation("Consider multi-datacenter deployment for high availability")
            .with_context("datacenters", datacenters.clone())
            .with_component("Datacenter Topology"),
        );
    } else {
        let by_dc = state.nodes_by_dc();
        let (min_nodes, max_nodes) = spread(by_dc.values().map(Vec::len));
        if !by_dc.is_empty() && (max_nodes > min_nodes * 2 || max_nodes - min_nodes > 10) {
            let distribution: BTreeMap<String, usize> =
                by_dc.iter().map(|(dc, nodes)| (dc.clone(), nodes.len())).collect();
            let rack_info: Vec<String> = by_dc
                .iter()
                .map(|(dc, nodes)| {
                    let racks = racks_by_dc(nodes.iter().copied())
                        .into_values()
                        .next()
                        .unwrap_or_default();
                    let (lo, hi) = spread(racks.values().copied());
                    let balance = if hi - lo <= 1 { "balanced" } else { "unbalanced" };
                    format!("{}: {} racks ({})", dc, racks.len(), balance)
                })
                .collect();

            recommendations.push(
                infra(
                    "Unbalanced Datacenter Distribution",
                    format!(
                        "Significant variance in node count across datacenters (min: {}, max: {})",
                        min_nodes, max_nodes
                    ),
                    Severity::Warning,
                )
                .with_impact("May lead to uneven workload distribution and potential data availability issues")
                .with_recommendation(
                    "Consider the replication factor and rack topology when planning node distribution. \
                     Each DC should have nodes as multiples of its rack count",
                )
                .with_current_value(format!("DC distribution: {{{}}}", format_counts(&distribution)))
                .with_context("datacenter_distribution", counts_object(&distribution))
                .with_context("rack_distribution", rack_info.join("; "))
                .with_context("min_nodes", min_nodes)
                .with_context("max_nodes", max_nodes)
                .with_component("Datacenter Topology")
                .with_recommended_value("Balanced distribution based on RF and rack topology"),
            );
        }
    }

    for (dc, racks) in racks_by_dc(state.nodes.values()) {
        let num_racks = racks.len();
        let nodes_in_dc: usize = racks.values().sum();
        let rf = typical_rf(state, &dc);

        if num_racks == 1 {
            if nodes_in_dc as i64 >= rf {
                recommendations.push(
                    infra(
                        format!("No Rack Configuration in {}", dc),
                        format!("Datacenter {} has {} nodes but no rack configuration", dc, nodes_in_dc),
                        Severity::Warning,
                    )
                    .with_impact(
                        "Cannot perform rack-aware maintenance. Entire datacenter must be considered a failure domain",
                    )
                    .with_recommendation(format!(
                        "Configure {} racks (equal to RF={}) to allow maintenance of entire racks",
                        rf, rf
                    ))
                    .with_current_value(format!("{} rack(s)", num_racks))
                    .with_context("datacenter", dc.clone())
                    .with_context("node_count", nodes_in_dc)
                    .with_context("typical_rf", rf)
                    .with_component("Rack Topology")
                    .with_recommended_value(format!("{} racks", rf))
                    .with_config_location(RACKDC_PROPERTIES),
                );
            }
        } else if num_racks as i64 != rf {
            let (severity, impact) = if (num_racks as i64) < rf {
                (
                    Severity::Warning,
                    "Cannot guarantee data availability when an entire rack is down for maintenance",
                )
            } else {
                (Severity::Info, "More racks than RF may lead to uneven data distribution")
            };
            recommendations.push(
                infra(
                    format!("Suboptimal Rack Count in {}", dc),
                    format!("Datacenter {} has {} racks but RF is {}", dc, num_racks, rf),
                    severity,
                )
                .with_impact(impact)
                .with_recommendation(format!(
                    "Configure exactly {} racks to match RF for optimal fault tolerance",
                    rf
                ))
                .with_current_value(format!("{} racks", num_racks))
                .with_context("datacenter", dc.clone())
                .with_context("rack_count", num_racks)
                .with_context("typical_rf", rf)
                .with_component("Rack Topology")
                .with_recommended_value(format!("{} racks", rf))
                .with_config_location(RACKDC_PROPERTIES),
            );
        }

        if num_racks > 1 {
            let (lo, hi) = spread(racks.values().copied());
            if hi - lo > 1 {
                recommendations.push(
                    infra(
                        format!("Unbalanced Rack Distribution in {}", dc),
                        format!("Datacenter {} has uneven node distribution across racks", dc),
                        Severity::Warning,
                    )
                    .with_impact("Uneven workload distribution and potential hotspots")
                    .with_recommendation("Balance nodes evenly across racks")
                    .with_current_value(format!("Rack distribution: {{{}}}", format_counts(&racks)))
                    .with_context("datacenter", dc.clone())
                    .with_context("rack_distribution", counts_object(&racks))
                    .with_context("min_nodes_per_rack", lo)
                    .with_context("max_nodes_per_rack", hi)
                    .with_component("Rack Topology")
                    .with_config_location("cassandra-topology.properties"),
                );
            }
        }
    }

    recommendations
}

/// Used / total as a percentage, when both are reported and total is non-zero.
fn usage_percent(node: &Node, used_key: &str, total_key: &str) -> Option<f64> {
    if !node.details.is_truthy(used_key) || !node.details.is_truthy(total_key) {
        return None;
    }
    let used = node.details.get_i64(used_key)?;
    let total = node.details.get_i64(total_key)?;
    (total != 0).then(|| used as f64 / total as f64 * 100.0)
}

fn disk_usage(
    node: &Node,
    pct: f64,
    title: &str,
    disk: &str,
    severity: Severity,
    impact: &str,
    recommendation: &str,
) -> Recommendation {
    infra(
        title,
        format!("Node {} {} disk is {:.1}% full", node.identifier(), disk, pct),
        severity,
    )
    .with_impact(impact)
    .with_recommendation(recommendation)
    .with_node_id(node.host_id.clone())
    .with_context("usage_percent", pct)
    .with_component("Storage")
}

fn analyze_storage(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for node in state.nodes.values() {
        if let Some(fstype) = node.details.get_str(DATA_FSTYPE) {
            if !fstype.is_empty() && fstype != "xfs" {
                recommendations.push(
                    infra(
                        format!("Suboptimal Data Filesystem: {}", fstype),
                        format!("Node {} uses {} for data directory", node.identifier(), fstype),
                        Severity::Warning,
                    )
                    .with_impact("Potential performance degradation with non-XFS filesystem")
                    .with_recommendation("Consider using XFS filesystem for Cassandra data directories")
                    .with_node_id(node.host_id.clone())
                    .with_context("current_fstype", fstype)
                    .with_component("Storage"),
                );
            }
        }

        if let Some(pct) = usage_percent(node, ROOT_DISK_USED, ROOT_DISK_TOTAL) {
            if pct > 90.0 {
                recommendations.push(disk_usage(
                    node,
                    pct,
                    "High Root Disk Usage",
                    "root",
                    Severity::Critical,
                    "Risk of system instability",
                    "Free up root disk space immediately",
                ));
            } else if pct > 80.0 {
                recommendations.push(disk_usage(
                    node,
                    pct,
                    "Moderate Root Disk Usage",
                    "root",
                    Severity::Warning,
                    "Approaching disk space limits",
                    "Monitor and clean up root disk space",
                ));
            }
        }

        if let Some(pct) = usage_percent(node, DATA_DISK_USED, DATA_DISK_TOTAL) {
            if pct > 85.0 {
                recommendations.push(disk_usage(
                    node,
                    pct,
                    "High Data Disk Usage",
                    "data",
                    Severity::Critical,
                    "Risk of write failures and compaction issues",
                    "Add disk capacity or run cleanup operations",
                ));
            } else if pct > 70.0 {
                recommendations.push(disk_usage(
                    node,
                    pct,
                    "Moderate Data Disk Usage",
                    "data",
                    Severity::Warning,
                    "Approaching storage capacity limits",
                    "Plan for additional storage capacity",
                ));
            }
        }
    }

    recommendations
}

fn analyze_vnodes(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let configs = group_nodes(
        state
            .nodes
            .values()
            .filter(|n| n.details.is_truthy(keys::NUM_TOKENS))
            .filter_map(|n| {
                n.details
                    .get_str(keys::NUM_TOKENS)
                    .map(|t| (t, n.host_id.clone()))
            }),
    );

    if configs.len() > 1 {
        let values: Vec<&str> = configs.keys().map(String::as_str).collect();
        let as_json = Value::Object(
            configs
                .iter()
                .map(|(k, v)| (k.clone(), json!(v)))
                .collect(),
        );
        recommendations.push(
            infra(
                "Inconsistent VNodes Configuration",
                format!("Different num_tokens values across cluster: [{}]", values.join(", ")),
                Severity::Critical,
            )
            .with_impact("Uneven data distribution and operational complexity")
            .with_recommendation("Ensure all nodes have the same num_tokens value")
            .with_context("vnodes_configs", as_json)
            .with_component("Virtual Nodes"),
        );
    }

    for (raw, nodes) in &configs {
        let Ok(tokens) = raw.trim().parse::<i64>() else {
            continue;
        };
        // Single-token nodes are not using vnodes at all.
        if tokens == 1 {
            continue;
        }
        let (severity, impact, recommendation) = if tokens > VNODES_CRITICAL {
            (
                Severity::Critical,
                "Excessive virtual nodes cause operational overhead and slower repairs",
                "Reduce num_tokens to 32 or less for better operational efficiency",
            )
        } else if tokens > VNODES_WARNING {
            (
                Severity::Warning,
                "High vnode count may impact repair and streaming performance",
                "Consider reducing num_tokens to 32 or less",
            )
        } else {
            continue;
        };

        recommendations.push(
            infra(
                format!("High VNodes Count: {}", tokens),
                format!("Nodes have {} virtual nodes (num_tokens)", tokens),
                severity,
            )
            .with_impact(impact)
            .with_recommendation(recommendation)
            .with_current_value(format!("{} vnodes", tokens))
            .with_context("num_tokens", tokens)
            .with_affected_nodes(nodes.clone())
            .with_component("Virtual Nodes"),
        );
    }

    recommendations
}

fn analyze_swap(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for node in state.nodes.values() {
        if node.details.is_truthy(SWAPPINESS) {
            if let Some(swappiness) = node.details.get_i64(SWAPPINESS).filter(|v| *v > 1) {
                recommendations.push(
                    infra(
                        "High VM Swappiness Setting",
                        format!("Node {} has vm.swappiness={}", node.identifier(), swappiness),
                        Severity::Warning,
                    )
                    .with_impact("Cassandra may swap to disk causing severe performance degradation")
                    .with_recommendation(
                        "Set vm.swappiness=1 in /etc/sysctl.conf or /etc/sysctl.d/ and run 'sysctl -p'",
                    )
                    .with_current_value(format!("vm.swappiness={}", swappiness))
                    .with_node_id(node.host_id.clone())
                    .with_context("current_swappiness", swappiness)
                    .with_component("Memory")
                    .with_recommended_value("vm.swappiness=1")
                    .with_config_location(SYSCTL_LOCATION),
                );
            }
        }

        if !node.details.is_truthy(keys::SWAP_TOTAL) || !node.details.is_truthy(keys::SWAP_FREE) {
            continue;
        }
        let (Some(total), Some(free)) = (
            node.details.get_i64(keys::SWAP_TOTAL),
            node.details.get_i64(keys::SWAP_FREE),
        ) else {
            continue;
        };
        if total <= 0 {
            continue;
        }

        let used_pct = (total - free) as f64 / total as f64 * 100.0;
        if used_pct > 5.0 {
            recommendations.push(
                infra(
                    "Swap Usage Detected",
                    format!("Node {} is using {:.1}% of swap space", node.identifier(), used_pct),
                    Severity::Critical,
                )
                .with_impact("Severe performance degradation when Cassandra swaps")
                .with_recommendation("Disable swap or ensure sufficient memory to avoid swapping")
                .with_node_id(node.host_id.clone())
                .with_swap_percentage(used_pct)
                .with_context("swap_usage_percent", used_pct)
                .with_component("Memory"),
            );
        }

        if total > 1024 * 1024 {
            let mb = total as f64 / BYTES_PER_MB;
            recommendations.push(
                infra(
                    "Swap Enabled",
                    format!("Node {} has {:.0}MB swap configured", node.identifier(), mb),
                    Severity::Warning,
                )
                .with_impact("Potential for performance issues if swap is used")
                .with_recommendation("Consider disabling swap entirely for Cassandra nodes")
                .with_current_value(format!("{:.0}MB swap", mb))
                .with_node_id(node.host_id.clone())
                .with_context("swap_size_mb", mb)
                .with_component("Memory")
                .with_recommended_value("0MB swap"),
            );
        }
    }

    recommendations
}

fn analyze_sysctl(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for node in state.nodes.values() {
        if node.details.is_truthy(MAX_MAP_COUNT) {
            if let Some(value) = node
                .details
                .get_i64(MAX_MAP_COUNT)
                .filter(|v| *v < MIN_MAX_MAP_COUNT)
            {
                recommendations.push(
                    infra(
                        "Low vm.max_map_count Setting",
                        format!("Node {} has vm.max_map_count={}", node.identifier(), value),
                        Severity::Critical,
                    )
                    .with_impact("Cassandra may fail to start or experience memory mapping issues")
                    .with_recommendation(
                        "Set vm.max_map_count=1048575 in /etc/sysctl.conf or /etc/sysctl.d/ and run 'sysctl -p'",
                    )
                    .with_node_id(node.host_id.clone())
                    .with_current_value(value.to_string())
                    .with_recommended_value(MIN_MAX_MAP_COUNT)
                    .with_component("Memory")
                    .with_config_location(SYSCTL_LOCATION),
                );
            }
        }

        for (name, min_value, what, component) in NETWORK_SYSCTLS {
            let key = format!("host_sysctl_{}", name);
            if !node.details.is_truthy(&key) {
                continue;
            }
            let Some(value) = node.details.get_i64(&key).filter(|v| *v < min_value) else {
                continue;
            };
            recommendations.push(
                infra(
                    format!("Low {} Setting", name),
                    format!("Node {} has {}={}", node.identifier(), name, value),
                    Severity::Warning,
                )
                .with_impact(format!("Suboptimal {} configuration", what))
                .with_recommendation(format!(
                    "Set {}={} in /etc/sysctl.conf or /etc/sysctl.d/ and run 'sysctl -p'",
                    name, min_value
                ))
                .with_node_id(node.host_id.clone())
                .with_current_value(value.to_string())
                .with_context("sysctl_value", value)
                .with_recommended_value(min_value)
                .with_component(component)
                .with_config_location(SYSCTL_LOCATION),
            );
        }
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Keyspace, MetricData, NodeDetails};

    fn node(id: &str, dc: &str, rack: &str) -> Node {
        Node::new(
            id,
            dc,
            NodeDetails::new()
                .with("host_uptime", "3d")
                .with("comp_rack", rack)
                .with("host_Hostname", format!("{}-host", id))
                .with("comp_listen_address", "10.0.0.1"),
        )
    }

    fn run(state: &ClusterState) -> AnalysisResult {
        InfrastructureAnalyzer
            .analyze(state, &Thresholds::default())
            .unwrap()
    }

    fn titles(result: &AnalysisResult) -> Vec<&str> {
        result.recommendations.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_small_cluster_with_down_node() {
        let state = ClusterState::new("c")
            .with_node(node("n1", "dc1", "r1"))
            .with_node(Node::new("n2", "dc1", NodeDetails::new()));

        let result = run(&state);
        let down = result
            .recommendations
            .iter()
            .find(|r| r.title == "Nodes Down")
            .unwrap();
        assert_eq!(down.severity, Severity::Critical);
        assert_eq!(down.description, "1 out of 2 nodes are down");
        assert!(titles(&result).contains(&"Insufficient Node Count"));
        assert_eq!(result.summary["active_nodes"], json!(1));
    }

    #[test]
    fn test_single_datacenter_without_racks() {
        let state = ClusterState::new("c")
            .with_node(node("n1", "dc1", "r1"))
            .with_node(node("n2", "dc1", "r1"))
            .with_node(node("n3", "dc1", "r1"));

        let result = run(&state);
        let single = result
            .recommendations
            .iter()
            .find(|r| r.title == "Single Datacenter Deployment")
            .unwrap();
        assert_eq!(single.severity, Severity::Info);

        let racks = result
            .recommendations
            .iter()
            .find(|r| r.title == "No Rack Configuration in dc1")
            .unwrap();
        assert_eq!(racks.context.get("typical_rf"), Some(json!(3)));
        assert_eq!(
            racks.context.config_location.as_deref(),
            Some("cassandra-rackdc.properties")
        );
    }

    #[test]
    fn test_typical_rf_from_user_keyspace() {
        let state = ClusterState::new("c")
            .with_keyspace(Keyspace::new("system_auth", "SimpleStrategy").with_option("replication_factor", "1"))
            .with_keyspace(Keyspace::new("app", "NetworkTopologyStrategy").with_option("dc1", "2"))
            .with_node(node("n1", "dc1", "r1"))
            .with_node(node("n2", "dc1", "r2"))
            .with_node(node("n3", "dc1", "r3"));

        let result = run(&state);
        let rec = result
            .recommendations
            .iter()
            .find(|r| r.title == "Suboptimal Rack Count in dc1")
            .unwrap();
        assert_eq!(rec.severity, Severity::Info);
        assert_eq!(rec.description, "Datacenter dc1 has 3 racks but RF is 2");
    }

    #[test]
    fn test_unbalanced_datacenters() {
        let mut state = ClusterState::new("c").with_node(node("a1", "dc2", "r1"));
        for i in 0..3 {
            state = state.with_node(node(&format!("b{}", i), "dc1", "r1"));
        }

        let result = run(&state);
        let rec = result
            .recommendations
            .iter()
            .find(|r| r.title == "Unbalanced Datacenter Distribution")
            .unwrap();
        assert_eq!(rec.current_value.as_deref(), Some("DC distribution: {dc1: 3, dc2: 1}"));
        assert_eq!(rec.context.get("min_nodes"), Some(json!(1)));
        assert_eq!(
            rec.context.get("rack_distribution"),
            Some(json!("dc1: 1 racks (balanced); dc2: 1 racks (balanced)"))
        );
    }

    #[test]
    fn test_swap_usage_carries_percentage() {
        let mut n = node("n1", "dc1", "r1");
        n.details.insert("host_swapmem_Total", json!(4 * 1024 * 1024 * 1024_i64));
        n.details.insert("host_swapmem_Free", json!(2 * 1024 * 1024 * 1024_i64));
        n.details.insert("host_sysctl_vm.swappiness", "60");
        let state = ClusterState::new("c").with_node(n);

        let result = run(&state);
        let usage = result
            .recommendations
            .iter()
            .find(|r| r.title == "Swap Usage Detected")
            .unwrap();
        assert_eq!(usage.context.swap_percentage, Some(50.0));
        assert_eq!(usage.context.node_id.as_deref(), Some("n1"));
        assert_eq!(usage.description, "Node n1-host/10.0.0.1 is using 50.0% of swap space");

        let enabled = result
            .recommendations
            .iter()
            .find(|r| r.title == "Swap Enabled")
            .unwrap();
        assert_eq!(enabled.current_value.as_deref(), Some("4096MB swap"));
        assert!(titles(&result).contains(&"High VM Swappiness Setting"));
    }

    #[test]
    fn test_sysctl_floors() {
        let mut n = node("n1", "dc1", "r1");
        n.details.insert("host_sysctl_vm.max_map_count", "65530");
        n.details.insert("host_sysctl_net.core.rmem_max", json!(212992));
        n.details.insert("host_sysctl_net.core.netdev_max_backlog", json!(10000));
        let state = ClusterState::new("c").with_node(n);

        let result = run(&state);
        let map_count = result
            .recommendations
            .iter()
            .find(|r| r.title == "Low vm.max_map_count Setting")
            .unwrap();
        assert_eq!(map_count.severity, Severity::Critical);
        assert_eq!(map_count.context.recommended_value, Some(json!(1_048_575)));
        assert!(titles(&result).contains(&"Low net.core.rmem_max Setting"));
        assert!(!titles(&result).contains(&"Low net.core.netdev_max_backlog Setting"));
    }

    #[test]
    fn test_vnodes() {
        let mut a = node("a", "dc1", "r1");
        a.details.insert("comp_num_tokens", "256");
        let mut b = node("b", "dc1", "r1");
        b.details.insert("comp_num_tokens", "16");
        let state = ClusterState::new("c").with_node(a).with_node(b);

        let result = run(&state);
        assert!(titles(&result).contains(&"Inconsistent VNodes Configuration"));
        let high = result
            .recommendations
            .iter()
            .find(|r| r.title == "High VNodes Count: 256")
            .unwrap();
        assert_eq!(high.severity, Severity::Critical);
        assert_eq!(high.context.affected_nodes, Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_resource_metrics() {
        let state = ClusterState::new("c")
            .with_metric("cpu_usage", vec![MetricData::new("cpu").with_values(&[95.0, 93.0])])
            .with_metric(
                "disk_usage_percent",
                vec![MetricData::new("disk").with_values(&[40.0, 85.0])],
            );

        let result = run(&state);
        let cpu = result
            .recommendations
            .iter()
            .find(|r| r.title == "High CPU Usage")
            .unwrap();
        assert_eq!(cpu.severity, Severity::Critical);
        assert_eq!(cpu.description, "Average CPU usage is 94.0%");
        let disk = result
            .recommendations
            .iter()
            .find(|r| r.title == "High Disk Usage")
            .unwrap();
        assert_eq!(disk.severity, Severity::Warning);
        assert!(!titles(&result).contains(&"High Memory Usage"));
    }
}
