//! JVM and cassandra.yaml configuration checks.

use crate::analyze::analyzer::{AnalysisOutcome, AnalysisResult, SectionAnalyzer};
use crate::analyze::common::{
    group_nodes, parse_max_heap, GcType, BYTES_PER_GB, CASSANDRA_YAML, CATEGORY_CONFIGURATION,
    JVM_FLAGS, SECTION_CONFIGURATION,
};
use crate::config::Thresholds;
use crate::model::node::{keys, value_to_string};
use crate::model::{ClusterState, Node, Recommendation, Severity};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Settings expected to match on every node. Per-node addresses and
/// interfaces are deliberately absent.
const CONSISTENT_SETTINGS: [&str; 28] = [
    "comp_concurrent_reads",
    "comp_concurrent_writes",
    "comp_concurrent_compactors",
    "comp_compaction_throughput_mb_per_sec",
    "comp_commitlog_sync",
    "comp_commitlog_sync_period_in_ms",
    "comp_commitlog_sync_batch_window_in_ms",
    "comp_endpoint_snitch",
    "comp_gc_warn_threshold_in_ms",
    "comp_authenticator",
    "comp_authorizer",
    "comp_cluster_name",
    "comp_partitioner",
    "comp_commitlog_segment_size_in_mb",
    "comp_memtable_flush_writers",
    "comp_memtable_allocation_type",
    "comp_disk_failure_policy",
    "comp_commit_failure_policy",
    "comp_key_cache_size_in_mb",
    "comp_row_cache_size_in_mb",
    "comp_num_tokens",
    "comp_hinted_handoff_enabled",
    "comp_max_hint_window_in_ms",
    "comp_request_timeout_in_ms",
    "comp_read_request_timeout_in_ms",
    "comp_write_request_timeout_in_ms",
    "comp_streaming_socket_timeout_in_ms",
    "comp_phi_convict_threshold",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigurationAnalyzer;

impl SectionAnalyzer for ConfigurationAnalyzer {
    fn section(&self) -> &'static str {
        SECTION_CONFIGURATION
    }

    fn analyze(&self, state: &ClusterState, _thresholds: &Thresholds) -> AnalysisOutcome {
        let mut recommendations = analyze_jvm(state);

        let mismatches = analyze_mismatches(state);
        debug!(count = mismatches.len(), "configuration mismatch checks done");
        recommendations.extend(mismatches);
        recommendations.extend(analyze_risky_settings(state));

        let count = recommendations.len();
        Ok(AnalysisResult::new(recommendations).with_summary("recommendations_count", count))
    }
}

fn config(
    title: impl Into<String>,
    description: impl Into<String>,
    severity: Severity,
) -> Recommendation {
    Recommendation::new(title, description, severity, CATEGORY_CONFIGURATION)
}

/// JVM facts extracted from one node's startup arguments.
struct JvmProfile {
    node_id: String,
    node: String,
    heap_label: Option<String>,
    heap_bytes: Option<i64>,
    gc: Option<GcType>,
    system_memory_bytes: Option<i64>,
}

impl JvmProfile {
    fn from_node(node: &Node) -> Self {
        let args = node.details.get_str(keys::JVM_ARGUMENTS).unwrap_or_default();
        let heap = parse_max_heap(&args);
        let gc = GcType::declared_in(&args);
        if gc == Some(GcType::Shenandoah) {
            warn!(
                node = %node.identifier(),
                "Detected ShenandoahGC, please verify this is correct"
            );
        }
        let system_memory_bytes = node
            .details
            .is_truthy(keys::VIRTUAL_MEMORY_TOTAL)
            .then(|| node.details.get_i64(keys::VIRTUAL_MEMORY_TOTAL))
            .flatten();

        Self {
            node_id: node.host_id.clone(),
            node: node.identifier(),
            heap_label: heap.as_ref().map(|h| h.label()),
            heap_bytes: heap.map(|h| h.bytes),
            gc,
            system_memory_bytes,
        }
    }

    fn gc_name(&self) -> &'static str {
        self.gc.map(|g| g.name()).unwrap_or("unknown")
    }
}

fn analyze_jvm(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    let profiles: Vec<JvmProfile> = state
        .nodes
        .values()
        .filter(|n| !n.details.is_empty())
        .map(JvmProfile::from_node)
        .collect();

    let heap_variations = group_nodes(
        profiles
            .iter()
            .filter_map(|p| p.heap_label.clone().map(|l| (l, p.node.clone()))),
    );
    let distinct_heaps: BTreeSet<i64> =
        profiles.iter().filter_map(|p| p.heap_bytes).collect();
    if distinct_heaps.len() > 1 {
        let labels: Vec<&str> = heap_variations.keys().map(String::as_str).collect();
        recommendations.push(
            config(
                "Inconsistent JVM Heap Sizes",
                format!(
                    "Found {} different heap sizes across nodes: [{}]",
                    heap_variations.len(),
                    labels.join(", ")
                ),
                Severity::Warning,
            )
            .with_impact("Unpredictable performance across nodes")
            .with_recommendation("Align JVM heap settings across all nodes for consistent behavior")
            .with_context("heap_variations", json!(heap_variations))
            .with_config_location(JVM_FLAGS),
        );
    }

    let declared: BTreeSet<GcType> = profiles.iter().filter_map(|p| p.gc).collect();
    if declared.len() > 1 {
        let gc_variations = group_nodes(profiles.iter().map(|p| (p.gc_name().to_string(), p.node.clone())));
        let summary: Vec<String> = gc_variations
            .iter()
            .map(|(gc, nodes)| format!("{}: {} nodes", gc, nodes.len()))
            .collect();
        recommendations.push(
            config(
                "Inconsistent GC Algorithms",
                format!(
                    "Found {} different GC algorithms across nodes: {}",
                    gc_variations.len(),
                    summary.join(", ")
                ),
                Severity::Warning,
            )
            .with_impact("Different performance characteristics across nodes")
            .with_recommendation("Use the same GC algorithm on all nodes")
            .with_context("gc_algorithms", json!(gc_variations.keys().collect::<Vec<_>>()))
            .with_context("gc_variations", json!(gc_variations))
            .with_config_location(JVM_FLAGS),
        );
    }

    for profile in &profiles {
        if let (Some(heap), Some(memory)) = (profile.heap_bytes, profile.system_memory_bytes) {
            if heap > 0 && memory > 0 {
                recommendations.extend(heap_recommendations(profile, heap, memory));
            }
        }
    }

    recommendations
}

/// Heap sizing advice for one node given its collector and physical memory.
fn heap_recommendations(profile: &JvmProfile, heap_bytes: i64, memory_bytes: i64) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    let node = profile.node.as_str();
    let heap_gb = heap_bytes as f64 / BYTES_PER_GB;
    let system_gb = memory_bytes as f64 / BYTES_PER_GB;
    let heap_pct = if system_gb > 0.0 {
        heap_gb / system_gb * 100.0
    } else {
        0.0
    };

    let per_node = |rec: Recommendation| {
        rec.with_node_id(profile.node_id.clone())
            .with_context("node", node)
            .with_config_location(JVM_FLAGS)
    };

    if heap_pct > 60.0 {
        recommendations.push(per_node(
            config(
                "Excessive Heap Allocation",
                format!(
                    "Node {} allocates {:.1}% of system memory ({:.1}GB of {:.1}GB) to heap",
                    node, heap_pct, heap_gb, system_gb
                ),
                Severity::Warning,
            )
            .with_impact("Insufficient memory for page cache and system operations")
            .with_recommendation("Reduce heap to 25-50% of system memory for optimal performance")
            .with_context("current_heap_gb", heap_gb)
            .with_context("system_memory_gb", system_gb)
            .with_context("heap_percentage", heap_pct),
        ));
    } else if heap_pct < 20.0 && system_gb > 32.0 {
        recommendations.push(per_node(
            config(
                "Underutilized Memory for Heap",
                format!(
                    "Node {} only uses {:.1}% of system memory ({:.1}GB of {:.1}GB) for heap",
                    node, heap_pct, heap_gb, system_gb
                ),
                Severity::Info,
            )
            .with_impact("May not be fully utilizing available memory for Cassandra")
            .with_recommendation("Consider increasing heap size if experiencing GC pressure")
            .with_context("current_heap_gb", heap_gb)
            .with_context("system_memory_gb", system_gb)
            .with_context("heap_percentage", heap_pct),
        ));
    }

    match profile.gc {
        Some(GcType::Cms) => {
            recommendations.push(per_node(
                config(
                    "Deprecated CMS Garbage Collector",
                    format!("Node {} uses CMS GC which is deprecated", node),
                    Severity::Warning,
                )
                .with_impact("CMS is deprecated and will be removed in future Java versions")
                .with_recommendation(
                    "Migrate to Shenandoah GC (requires JDK 11+) for low-latency performance, \
                     or G1GC as an alternative",
                )
                .with_context("current_gc", GcType::Cms.name()),
            ));
            if heap_gb < 8.0 && system_gb >= 30.0 {
                recommendations.push(per_node(
                    config(
                        "Small Heap Size for Available Memory (CMS)",
                        format!(
                            "Node {} has heap size {:.1}GB with {:.1}GB RAM available",
                            node, heap_gb, system_gb
                        ),
                        Severity::Warning,
                    )
                    .with_impact("Underutilized system memory")
                    .with_recommendation("Consider allocating 12-16GB heap size for CMS")
                    .with_context("current_heap_gb", heap_gb)
                    .with_context("available_memory_gb", system_gb),
                ));
            }
        }
        Some(GcType::G1) => {
            recommendations.push(per_node(
                config(
                    "Consider Shenandoah GC Instead of G1GC",
                    format!("Node {} uses G1GC", node),
                    Severity::Info,
                )
                .with_impact("G1GC can have longer pause times compared to Shenandoah")
                .with_recommendation(
                    "Consider migrating to Shenandoah GC (requires JDK 11+) for lower and more predictable latencies",
                )
                .with_context("current_gc", GcType::G1.name()),
            ));
            if heap_gb < 20.0 {
                recommendations.push(per_node(
                    config(
                        "Small Heap Size for G1GC",
                        format!(
                            "Node {} has G1GC heap of {:.1}GB but needs at least 20GB",
                            node, heap_gb
                        ),
                        Severity::Warning,
                    )
                    .with_impact("G1GC performs poorly with small heaps")
                    .with_recommendation("Increase heap size to 20-31GB or switch to Shenandoah GC (JDK 11+)")
                    .with_context("current_heap_gb", heap_gb),
                ));
            }
            if heap_gb > 32.0 {
                recommendations.push(per_node(
                    config(
                        "Heap Size Above Compressed OOPs Limit",
                        format!(
                            "Node {} has G1GC heap of {:.1}GB, above 32GB compressed OOPs limit",
                            node, heap_gb
                        ),
                        Severity::Warning,
                    )
                    .with_impact("Loss of compressed OOPs optimization, increased memory overhead")
                    .with_recommendation(
                        "Decrease heap size to 31GB, switch to Shenandoah GC (which handles large heaps better), \
                         or consider multiple smaller nodes",
                    )
                    .with_context("current_heap_gb", heap_gb),
                ));
            }
            if (20.0..=31.0).contains(&heap_gb) {
                recommendations.push(per_node(
                    config(
                        "G1GC Heap Size Optimal",
                        format!(
                            "Node {} has G1GC heap of {:.1}GB which is in the optimal range",
                            node, heap_gb
                        ),
                        Severity::Info,
                    )
                    .with_impact("Good heap size for G1GC performance")
                    .with_recommendation("Monitor GC logs to ensure pause times meet SLAs")
                    .with_context("current_heap_gb", heap_gb),
                ));
            }
        }
        Some(GcType::Shenandoah) => {
            recommendations.push(per_node(
                config(
                    "Shenandoah GC Detected (Recommended)",
                    format!("Node {} uses Shenandoah GC for low-latency performance", node),
                    Severity::Info,
                )
                .with_impact("Excellent choice for low and predictable pause times")
                .with_recommendation("Monitor GC logs to ensure pause times meet SLAs")
                .with_context("current_gc", GcType::Shenandoah.name()),
            ));
            if heap_pct > 60.0 {
                recommendations.push(per_node(
                    config(
                        "Excessive Heap Allocation with Shenandoah",
                        format!(
                            "Node {} allocates {:.1}% of system memory ({:.1}GB of {:.1}GB) to heap",
                            node, heap_pct, heap_gb, system_gb
                        ),
                        Severity::Warning,
                    )
                    .with_impact("Insufficient memory for page cache and system operations")
                    .with_recommendation("Even with Shenandoah, reduce heap to 25-50% of system memory")
                    .with_context("current_heap_gb", heap_gb)
                    .with_context("system_memory_gb", system_gb)
                    .with_context("heap_percentage", heap_pct),
                ));
            }
        }
        Some(GcType::Zgc) => {
            recommendations.push(per_node(
                config(
                    "ZGC Detected",
                    format!("Node {} uses ZGC for low-latency performance", node),
                    Severity::Info,
                )
                .with_impact(
                    "Good choice for low pause times, though Shenandoah may offer better throughput for Cassandra",
                )
                .with_recommendation(
                    "Consider Shenandoah GC as an alternative for potentially better throughput with similar low latency",
                )
                .with_context("current_gc", GcType::Zgc.name()),
            ));
        }
        Some(GcType::Parallel) | Some(GcType::Serial) => {}
        None => {
            recommendations.push(per_node(
                config(
                    "Unable to Determine GC Algorithm",
                    format!("Could not determine GC algorithm for node {}", node),
                    Severity::Info,
                )
                .with_impact("Cannot provide GC-specific recommendations")
                .with_recommendation("Verify JVM arguments are properly configured"),
            ));
        }
    }

    recommendations
}

fn analyze_mismatches(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if state.nodes.len() < 2 {
        recommendations.push(
            config(
                "Insufficient Nodes for Configuration Comparison",
                "Less than two nodes available for configuration comparison",
                Severity::Warning,
            )
            .with_impact("Unable to detect configuration inconsistencies")
            .with_recommendation("Ensure all nodes provide configuration data")
            .with_context("node_count", state.nodes.len())
            .with_config_location(CASSANDRA_YAML),
        );
        return recommendations;
    }

    // setting -> rendered value -> nodes reporting it
    let mut observed: BTreeMap<&str, BTreeMap<String, Vec<String>>> = BTreeMap::new();
    for node in state.nodes.values().filter(|n| !n.details.is_empty()) {
        for key in CONSISTENT_SETTINGS {
            if let Some(value) = node.details.get(key) {
                observed
                    .entry(key)
                    .or_default()
                    .entry(value_to_string(value))
                    .or_default()
                    .push(node.identifier());
            }
        }
    }

    let mut mismatches = Vec::new();
    for (key, values) in &observed {
        if values.len() < 2 {
            continue;
        }
        let display_key = key.trim_start_matches("comp_");
        let value_list: Vec<&str> = values.keys().map(String::as_str).collect();
        let affected: Vec<String> = values.values().flatten().cloned().collect();

        recommendations.push(
            config(
                format!("Configuration Mismatch: {}", display_key),
                format!(
                    "Nodes have different values for {}: [{}]",
                    display_key,
                    value_list.join(", ")
                ),
                Severity::Warning,
            )
            .with_impact("Inconsistent cluster behavior and unpredictable performance")
            .with_recommendation("Align this configuration setting across all nodes in cassandra.yaml")
            .with_context("config_key", display_key)
            .with_context("values", json!(value_list))
            .with_context("nodes_by_value", json!(values))
            .with_affected_nodes(affected)
            .with_config_location(CASSANDRA_YAML),
        );
        mismatches.push(json!({ "setting": display_key, "values": values }));
    }

    if !mismatches.is_empty() {
        recommendations.push(
            config(
                "Multiple Configuration Mismatches Detected",
                format!(
                    "Found {} configuration differences across cluster nodes",
                    mismatches.len()
                ),
                Severity::Warning,
            )
            .with_impact("Inconsistent performance characteristics across nodes")
            .with_recommendation("Review and align all configuration settings across nodes")
            .with_context("mismatch_count", mismatches.len())
            .with_context("mismatches", Value::Array(mismatches))
            .with_config_location(CASSANDRA_YAML),
        );
    }

    recommendations
}

fn analyze_risky_settings(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    // Authentication lives in the security section.
    for node in state.nodes.values().filter(|n| !n.details.is_empty()) {
        if node.details.get_str("comp_disk_failure_policy").as_deref() == Some("ignore") {
            recommendations.push(
                config(
                    "Risky Disk Failure Policy (disk_failure_policy)",
                    format!(
                        "Disk failure policy is set to 'ignore' on node {}",
                        node.identifier()
                    ),
                    Severity::Warning,
                )
                .with_impact("Data corruption risk if disk failures are ignored")
                .with_recommendation("Consider using 'stop' or 'best_effort' policy in cassandra.yaml")
                .with_node_id(node.host_id.clone())
                .with_context("node", node.identifier())
                .with_context("current_policy", "ignore")
                .with_config_location(CASSANDRA_YAML),
            );
        }

        if node.details.get_str("comp_commitlog_sync").as_deref() == Some("batch") {
            let window = node
                .details
                .get_f64("comp_commitlog_sync_batch_window_in_ms")
                .unwrap_or(0.0);
            if window > 10.0 {
                recommendations.push(
                    config(
                        "High Commitlog Sync Window (commitlog_sync_batch_window_in_ms)",
                        format!(
                            "Commitlog sync window is {}ms on node {}",
                            window,
                            node.identifier()
                        ),
                        Severity::Warning,
                    )
                    .with_impact("Potential data loss on failure")
                    .with_recommendation(
                        "Consider reducing sync window or using periodic sync in cassandra.yaml",
                    )
                    .with_node_id(node.host_id.clone())
                    .with_context("node", node.identifier())
                    .with_context("sync_window_ms", window)
                    .with_config_location(CASSANDRA_YAML),
                );
            }
        }
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeDetails;

    const GIB: i64 = 1024 * 1024 * 1024;

    fn jvm_node(id: &str, args: &str, memory: i64) -> Node {
        Node::new(
            id,
            "dc1",
            NodeDetails::new()
                .with("comp_jvm_input arguments", args)
                .with("host_virtualmem_Total", json!(memory))
                .with("host_Hostname", id)
                .with("comp_listen_address", "10.0.0.1"),
        )
    }

    fn run(state: &ClusterState) -> AnalysisResult {
        ConfigurationAnalyzer
            .analyze(state, &Thresholds::default())
            .unwrap()
    }

    fn find<'a>(result: &'a AnalysisResult, title: &str) -> Option<&'a Recommendation> {
        result.recommendations.iter().find(|r| r.title == title)
    }

    #[test]
    fn test_cms_small_heap() {
        let state = ClusterState::new("c").with_node(jvm_node(
            "n1",
            "-Xmx4G -XX:+UseConcMarkSweepGC",
            34359738368,
        ));

        let result = run(&state);
        let cms = find(&result, "Deprecated CMS Garbage Collector").unwrap();
        assert_eq!(cms.severity, Severity::Warning);
        let text = cms.recommendation.as_deref().unwrap();
        assert!(text.contains("Shenandoah") || text.contains("G1GC"));

        let small = find(&result, "Small Heap Size for Available Memory (CMS)").unwrap();
        assert_eq!(small.severity, Severity::Warning);
        assert_eq!(small.description, "Node n1/10.0.0.1 has heap size 4.0GB with 32.0GB RAM available");

        // 12.5% of exactly 32GB is not "more than 32GB"
        assert!(find(&result, "Underutilized Memory for Heap").is_none());
        assert!(find(&result, "Insufficient Nodes for Configuration Comparison").is_some());
    }

    #[test]
    fn test_g1_heap_bands() {
        let state = ClusterState::new("c")
            .with_node(jvm_node("small", "-Xmx8G -XX:+UseG1GC", 64 * GIB))
            .with_node(jvm_node("good", "-Xmx24G -XX:+UseG1GC", 64 * GIB));

        let result = run(&state);
        let small = find(&result, "Small Heap Size for G1GC").unwrap();
        assert_eq!(small.context.node_id.as_deref(), Some("small"));
        let optimal = find(&result, "G1GC Heap Size Optimal").unwrap();
        assert_eq!(optimal.context.node_id.as_deref(), Some("good"));
        assert!(find(&result, "Inconsistent JVM Heap Sizes").is_some());
        assert!(find(&result, "Inconsistent GC Algorithms").is_none());
        assert_eq!(
            result
                .recommendations
                .iter()
                .filter(|r| r.title == "Consider Shenandoah GC Instead of G1GC")
                .count(),
            2
        );
    }

    #[test]
    fn test_excessive_heap_and_unknown_gc() {
        let state = ClusterState::new("c")
            .with_node(jvm_node("a", "-Xmx12G", 16 * GIB))
            .with_node(jvm_node("b", "-Xmx12G -XX:+UseZGC", 16 * GIB));

        let result = run(&state);
        assert!(find(&result, "Excessive Heap Allocation").is_some());
        assert!(find(&result, "Unable to Determine GC Algorithm").is_some());
        assert!(find(&result, "ZGC Detected").is_some());
        // only one declared collector, so no inconsistency
        assert!(find(&result, "Inconsistent GC Algorithms").is_none());
    }

    #[test]
    fn test_configuration_mismatch() {
        let mut a = jvm_node("a", "", 0);
        a.details.insert("comp_concurrent_reads", json!(32));
        a.details.insert("comp_cluster_name", "prod");
        let mut b = jvm_node("b", "", 0);
        b.details.insert("comp_concurrent_reads", json!(64));
        b.details.insert("comp_cluster_name", "prod");
        let state = ClusterState::new("c").with_node(a).with_node(b);

        let result = run(&state);
        let rec = find(&result, "Configuration Mismatch: concurrent_reads").unwrap();
        assert_eq!(rec.description, "Nodes have different values for concurrent_reads: [32, 64]");
        assert_eq!(rec.context.affected_nodes.as_ref().map(Vec::len), Some(2));
        assert!(find(&result, "Configuration Mismatch: cluster_name").is_none());

        let summary = find(&result, "Multiple Configuration Mismatches Detected").unwrap();
        assert_eq!(summary.context.get("mismatch_count"), Some(json!(1)));
    }

    #[test]
    fn test_risky_settings() {
        let mut n = jvm_node("a", "", 0);
        n.details.insert("comp_disk_failure_policy", "ignore");
        n.details.insert("comp_commitlog_sync", "batch");
        n.details.insert("comp_commitlog_sync_batch_window_in_ms", json!(50));
        let state = ClusterState::new("c").with_node(n);

        let result = run(&state);
        assert!(find(&result, "Risky Disk Failure Policy (disk_failure_policy)").is_some());
        let window = find(
            &result,
            "High Commitlog Sync Window (commitlog_sync_batch_window_in_ms)",
        )
        .unwrap();
        assert_eq!(window.description, "Commitlog sync window is 50ms on node a/10.0.0.1");
    }
}
