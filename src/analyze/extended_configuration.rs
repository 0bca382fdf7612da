//! Second pass over cassandra.yaml: throughput, policies, seeds, versions,
//! thread pools and auth caches.
//!
//! Findings are filed under the configuration category but reported as their
//! own section.

use crate::analyze::analyzer::{AnalysisOutcome, AnalysisResult, SectionAnalyzer};
use crate::analyze::common::{
    group_nodes, parse_major_minor, CASSANDRA_YAML, CATEGORY_CONFIGURATION,
    DEFAULT_COMPACTION_THROUGHPUT_MB, DEFAULT_CONCURRENT_COMPACTORS, DEFAULT_CONCURRENT_READS,
    DEFAULT_STREAMING_SOCKET_TIMEOUT_MS, DEFAULT_STREAM_THROUGHPUT_MBITS,
    SECTION_EXTENDED_CONFIGURATION,
};
use crate::config::Thresholds;
use crate::model::node::keys;
use crate::model::{ClusterState, Node, Recommendation, Severity};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

static SEEDS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"seeds=([^}]+)").expect("valid regex"));

const CHECK_GROUPS: usize = 9;

const PROBLEMATIC_SNITCHES: [&str; 3] = ["SimpleSnitch", "PropertyFileSnitch", "DseSimpleSnitch"];

/// Auth cache settings with their recommended production value in ms.
const AUTH_CACHE_SETTINGS: [(&str, i64, &str); 6] = [
    ("roles_validity", 120_000, "120s"),
    ("roles_update_interval", 10_000, "10s"),
    ("permissions_validity", 60_000, "60s"),
    ("permissions_update_interval", 10_000, "10s"),
    ("credentials_validity", 120_000, "120s"),
    ("credentials_update_interval", 10_000, "10s"),
];

/// Cassandra's shipped auth cache interval.
const DEFAULT_AUTH_CACHE_MS: i64 = 2000;

#[derive(Debug, Default, Clone, Copy)]
pub struct ExtendedConfigurationAnalyzer;

impl SectionAnalyzer for ExtendedConfigurationAnalyzer {
    fn section(&self) -> &'static str {
        SECTION_EXTENDED_CONFIGURATION
    }

    fn analyze(&self, state: &ClusterState, _thresholds: &Thresholds) -> AnalysisOutcome {
        let mut recommendations = Vec::new();
        recommendations.extend(analyze_compaction(state));
        recommendations.extend(analyze_disk_failure_policy(state));
        recommendations.extend(analyze_memtables(state));
        recommendations.extend(analyze_snitch(state));
        recommendations.extend(analyze_seeds(state));
        recommendations.extend(analyze_streaming(state));
        recommendations.extend(analyze_versions(state));
        recommendations.extend(analyze_thread_pools(state));
        recommendations.extend(analyze_auth_caches(state));

        let count = recommendations.len();
        Ok(AnalysisResult::new(recommendations)
            .with_summary("recommendations_count", count)
            .with_summary("extended_checks_performed", CHECK_GROUPS))
    }
}

fn yaml_setting(
    node: &Node,
    title: impl Into<String>,
    description: impl Into<String>,
    severity: Severity,
) -> Recommendation {
    Recommendation::new(title, description, severity, CATEGORY_CONFIGURATION)
        .with_node_id(node.host_id.clone())
        .with_config_location(CASSANDRA_YAML)
}

fn cluster_setting(
    title: impl Into<String>,
    description: impl Into<String>,
    severity: Severity,
) -> Recommendation {
    Recommendation::new(title, description, severity, CATEGORY_CONFIGURATION)
        .with_config_location(CASSANDRA_YAML)
}

fn bracketed<S: AsRef<str>>(items: &[S]) -> String {
    format!(
        "[{}]",
        items.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(", ")
    )
}

fn analyze_compaction(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for node in state.nodes.values() {
        let throughput = match node.details.get("comp_compaction_throughput_mb_per_sec") {
            None => Some(DEFAULT_COMPACTION_THROUGHPUT_MB),
            Some(_) => node.details.get_i64("comp_compaction_throughput_mb_per_sec"),
        };
        let compactors = match node.details.get("comp_concurrent_compactors") {
            None => Some(DEFAULT_CONCURRENT_COMPACTORS),
            Some(_) => node.details.get_i64("comp_concurrent_compactors"),
        };
        let (Some(throughput), Some(compactors)) = (throughput, compactors) else {
            continue;
        };
        let current = format!(
            "compaction_throughput_mb_per_sec={} MB/s, concurrent_compactors={}",
            throughput, compactors
        );

        if compactors > 0 {
            let per_compactor = throughput as f64 / compactors as f64;
            let at_default = throughput == DEFAULT_COMPACTION_THROUGHPUT_MB;
            if at_default && per_compactor < 8.0 {
                recommendations.push(
                    yaml_setting(
                        node,
                        "Conservative Compaction Throughput with High Concurrency \
                         (compaction_throughput_mb_per_sec, concurrent_compactors)",
                        format!(
                            "Node {} uses default 16 MB/s throughput with {} compactors, \
                             resulting in only {:.1} MB/s per compactor",
                            node.identifier(),
                            compactors,
                            per_compactor
                        ),
                        Severity::Warning,
                    )
                    .with_impact(
                        "Default throughput spread across many compactors may cause compaction to lag behind writes",
                    )
                    .with_recommendation(
                        "Increase compaction_throughput_mb_per_sec to 64 MB/s or reduce concurrent_compactors in cassandra.yaml",
                    )
                    .with_current_value(current.clone())
                    .with_context("compaction_throughput_mb_per_sec", throughput)
                    .with_context("concurrent_compactors", compactors)
                    .with_recommended_value("64 MB/s throughput or fewer compactors"),
                );
            } else if !at_default && per_compactor < 8.0 {
                recommendations.push(
                    yaml_setting(
                        node,
                        "Low Compaction Throughput Per Compactor \
                         (compaction_throughput_mb_per_sec, concurrent_compactors)",
                        format!(
                            "Node {} has {:.1} MB/s per compactor",
                            node.identifier(),
                            per_compactor
                        ),
                        Severity::Warning,
                    )
                    .with_impact("Compaction may lag behind writes causing read performance issues")
                    .with_recommendation(
                        "Increase compaction_throughput_mb_per_sec or reduce concurrent_compactors in cassandra.yaml",
                    )
                    .with_current_value(current.clone())
                    .with_context("compaction_throughput_mb_per_sec", throughput)
                    .with_context("concurrent_compactors", compactors)
                    .with_recommended_value("≥8 MB/s per compactor"),
                );
            } else if at_default {
                recommendations.push(
                    yaml_setting(
                        node,
                        "Conservative Compaction Throughput (compaction_throughput_mb_per_sec)",
                        format!(
                            "Node {} uses default 16 MB/s compaction throughput",
                            node.identifier()
                        ),
                        Severity::Info,
                    )
                    .with_impact("May not utilize available I/O capacity for compaction")
                    .with_recommendation(
                        "Consider increasing compaction_throughput_mb_per_sec to 64 MB/s for modern hardware in cassandra.yaml",
                    )
                    .with_current_value("compaction_throughput_mb_per_sec=16 MB/s")
                    .with_context("compaction_throughput_mb_per_sec", throughput)
                    .with_recommended_value("64 MB/s"),
                );
            }
        }

        if throughput == 0 {
            recommendations.push(
                yaml_setting(
                    node,
                    "Unthrottled Compaction (compaction_throughput_mb_per_sec)",
                    format!(
                        "Node {} has unlimited compaction throughput",
                        node.identifier()
                    ),
                    Severity::Warning,
                )
                .with_impact("May overwhelm I/O and affect read/write performance")
                .with_recommendation("Set reasonable compaction throughput limit in cassandra.yaml")
                .with_current_value("compaction_throughput_mb_per_sec=0 MB/s (unlimited)")
                .with_context("compaction_throughput_mb_per_sec", throughput)
                .with_recommended_value("64-128 MB/s"),
            );
        }

        if throughput > 200 {
            recommendations.push(
                yaml_setting(
                    node,
                    "Very High Compaction Throughput (compaction_throughput_mb_per_sec)",
                    format!(
                        "Node {} has {} MB/s compaction throughput",
                        node.identifier(),
                        throughput
                    ),
                    Severity::Warning,
                )
                .with_impact("May overwhelm I/O bandwidth")
                .with_recommendation("Verify this setting is appropriate for your hardware in cassandra.yaml")
                .with_current_value(format!("compaction_throughput_mb_per_sec={} MB/s", throughput))
                .with_context("compaction_throughput_mb_per_sec", throughput),
            );
        }
    }

    recommendations
}

fn analyze_disk_failure_policy(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let policies = group_nodes(state.nodes.values().map(|n| {
        (
            n.details.get_str_or("comp_disk_failure_policy", "stop"),
            n.host_id.clone(),
        )
    }));

    for (policy, nodes) in &policies {
        if policy == "stop" || policy == "die" {
            continue;
        }
        recommendations.push(
            cluster_setting(
                format!("Suboptimal Disk Failure Policy: {} (disk_failure_policy)", policy),
                format!(
                    "Nodes using disk_failure_policy '{}': {}",
                    policy,
                    bracketed(nodes)
                ),
                Severity::Warning,
            )
            .with_impact("May not handle disk failures appropriately")
            .with_recommendation(
                "Use 'stop' with auto-restart or 'die' for better monitoring in cassandra.yaml",
            )
            .with_context("policy", policy.clone())
            .with_affected_nodes(nodes.clone()),
        );
    }

    if policies.len() > 1 {
        let names: Vec<String> = policies.keys().cloned().collect();
        recommendations.push(
            cluster_setting(
                "Inconsistent Disk Failure Policies (disk_failure_policy)",
                format!(
                    "Different disk failure policies across nodes: {}",
                    bracketed(&names)
                ),
                Severity::Warning,
            )
            .with_impact("Inconsistent failure handling behavior")
            .with_recommendation("Standardize disk failure policy across all nodes in cassandra.yaml")
            .with_context("policies", names),
        );
    }

    recommendations
}

/// offheap_objects exists from 2.1 on. Unparseable versions are assumed to support it.
fn supports_offheap_objects(version: &str) -> bool {
    match parse_major_minor(version) {
        Some(v) if version != "unknown" => v >= (2, 1),
        _ => true,
    }
}

/// Anything below 3.0 is out of support.
fn is_version_unsupported(version: &str) -> bool {
    match parse_major_minor(version) {
        Some((major, _)) if version != "unknown" => major < 3,
        _ => false,
    }
}

fn analyze_memtables(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for node in state.nodes.values() {
        let allocation = node
            .details
            .get_str_or("comp_memtable_allocation_type", "heap_buffers");
        let version = node.details.get_str_or(keys::CASSANDRA_VERSION, "");
        if allocation == "heap_buffers" && supports_offheap_objects(&version) {
            recommendations.push(
                yaml_setting(
                    node,
                    "Suboptimal Memtable Allocation Type (memtable_allocation_type)",
                    format!(
                        "Node {} uses heap_buffers instead of offheap_objects",
                        node.identifier()
                    ),
                    Severity::Info,
                )
                .with_impact("Higher GC pressure and potential performance degradation")
                .with_recommendation("Consider using offheap_objects for better performance in cassandra.yaml")
                .with_current_value("memtable_allocation_type=heap_buffers")
                .with_context("memtable_allocation_type", allocation)
                .with_recommended_value("offheap_objects"),
            );
        }

        let Some(configured) = node.details.get_i64("comp_memtable_flush_writers") else {
            continue;
        };
        // 0 lets Cassandra pick min(8, cores / 2)
        let actual = if configured == 0 {
            let cores = node.details.get_i64(keys::PROCESSOR_COUNT).unwrap_or(1);
            (cores / 2).clamp(1, 8)
        } else {
            configured
        };
        if actual < 2 {
            recommendations.push(
                yaml_setting(
                    node,
                    "Low Memtable Flush Writers (memtable_flush_writers)",
                    format!(
                        "Node {} has only {} memtable flush writer",
                        node.identifier(),
                        actual
                    ),
                    Severity::Warning,
                )
                .with_impact("May bottleneck memtable flushing")
                .with_recommendation("Consider increasing to at least 2 flush writers in cassandra.yaml")
                .with_current_value(format!(
                    "memtable_flush_writers={} (actual: {})",
                    configured, actual
                ))
                .with_context("memtable_flush_writers", actual)
                .with_recommended_value("≥2"),
            );
        }
    }

    recommendations
}

fn analyze_snitch(state: &ClusterState) -> Vec<Recommendation> {
    state
        .nodes
        .values()
        .filter_map(|node| {
            let snitch = node.details.get_str_or(keys::ENDPOINT_SNITCH, "SimpleSnitch");
            if !PROBLEMATIC_SNITCHES.contains(&snitch.as_str()) {
                return None;
            }
            Some(
                yaml_setting(
                    node,
                    format!("Problematic Endpoint Snitch: {} (endpoint_snitch)", snitch),
                    format!("Node {} uses {}", node.identifier(), snitch),
                    Severity::Warning,
                )
                .with_impact("Poor network topology awareness and performance")
                .with_recommendation(
                    "Use GossipingPropertyFileSnitch for better topology awareness in cassandra.yaml",
                )
                .with_current_value(format!("endpoint_snitch={}", snitch))
                .with_context("endpoint_snitch", snitch)
                .with_recommended_value("GossipingPropertyFileSnitch"),
            )
        })
        .collect()
}

/// Seed entries named in a seed provider string such as
/// `org.apache.cassandra.locator.SimpleSeedProvider{seeds=host1,host2}`.
pub fn parse_seeds(seed_provider: &str) -> Vec<String> {
    SEEDS_RE
        .captures(seed_provider)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default()
}

fn base_hostname(host: &str) -> &str {
    host.split('.').next().unwrap_or(host)
}

fn analyze_seeds(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let mut nodes_per_dc: BTreeMap<&str, usize> = BTreeMap::new();
    for node in state.nodes.values() {
        *nodes_per_dc.entry(node.dc.as_str()).or_default() += 1;
    }

    let seed_lists = group_nodes(
        state
            .nodes
            .values()
            .filter(|n| n.details.is_truthy(keys::SEED_PROVIDER))
            .filter_map(|n| n.details.get_str(keys::SEED_PROVIDER).map(|s| (s, n.host_id.clone()))),
    );
    if seed_lists.len() > 1 {
        recommendations.push(
            cluster_setting(
                "Inconsistent Seed Lists (seed_provider)",
                format!("Found {} different seed configurations", seed_lists.len()),
                Severity::Warning,
            )
            .with_impact("May complicate future node additions or replacements")
            .with_recommendation("Ensure all nodes have identical seed lists")
            .with_current_value(format!("{} different configurations", seed_lists.len())),
        );
    }

    let hostnames: BTreeSet<String> = state
        .nodes
        .values()
        .filter_map(|n| n.hostname())
        .filter(|h| !h.is_empty())
        .collect();

    // Every node should carry the same list, so the first parseable one is used.
    let seeds: Vec<String> = state
        .nodes
        .values()
        .filter_map(|n| n.details.get_str(keys::SEED_PROVIDER))
        .map(|provider| parse_seeds(&provider))
        .find(|seeds| !seeds.is_empty())
        .unwrap_or_default();

    let missing: Vec<String> = seeds
        .iter()
        .filter(|seed| {
            let host = seed.split(':').next().unwrap_or(seed);
            !hostnames.contains(host)
        })
        .cloned()
        .collect();
    if !missing.is_empty() {
        let shown = missing.iter().take(3).cloned().collect::<Vec<_>>().join(", ");
        let ellipsis = if missing.len() > 3 { "..." } else { "" };
        recommendations.push(
            cluster_setting(
                "Non-existent Seed Hostnames",
                format!(
                    "Found {} seed hostname(s) that don't exist in the cluster",
                    missing.len()
                ),
                Severity::Critical,
            )
            .with_impact(
                "Seeds are unreachable, preventing proper cluster formation and gossip propagation",
            )
            .with_recommendation("Update seed list to use correct hostnames that exist in the cluster")
            .with_current_value(format!("Invalid seeds: {}{}", shown, ellipsis))
            .with_context("non_existent_seeds", missing.clone()),
        );
    }

    let seed_set: BTreeSet<&str> = seeds.iter().map(String::as_str).collect();
    let mut seeds_per_dc: BTreeMap<&str, usize> = BTreeMap::new();
    for node in state.nodes.values() {
        let counter = seeds_per_dc.entry(node.dc.as_str()).or_default();
        let Some(hostname) = node.hostname().filter(|h| !h.is_empty()) else {
            continue;
        };
        // Seeds are sometimes listed with a different domain than the node reports.
        let is_seed = seed_set.contains(hostname.as_str())
            || seed_set
                .iter()
                .any(|seed| base_hostname(seed) == base_hostname(&hostname));
        if is_seed {
            *counter += 1;
        }
    }

    for (dc, node_count) in nodes_per_dc {
        let seed_count = seeds_per_dc.get(dc).copied().unwrap_or(0);
        if node_count >= 3 && seed_count < 2 {
            recommendations.push(
                cluster_setting(
                    format!("Insufficient Seeds in Datacenter {}", dc),
                    format!("Datacenter {} has only {} seed node(s)", dc, seed_count),
                    Severity::Warning,
                )
                .with_impact("Inadequate seed nodes may affect cluster discovery and gossip")
                .with_recommendation("Ensure at least 2 seeds per datacenter")
                .with_current_value(format!("{} seeds", seed_count))
                .with_context("datacenter", dc)
                .with_context("node_count", node_count)
                .with_context("seed_count", seed_count)
                .with_recommended_value("≥2 seeds"),
            );
        }
    }

    recommendations
}

fn analyze_streaming(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for node in state.nodes.values() {
        let throughput = match node.details.get("comp_stream_throughput_outbound_megabits_per_sec") {
            None => Some(DEFAULT_STREAM_THROUGHPUT_MBITS),
            Some(_) => node
                .details
                .get_i64("comp_stream_throughput_outbound_megabits_per_sec"),
        };
        let timeout = match node.details.get("comp_streaming_socket_timeout_in_ms") {
            None => Some(DEFAULT_STREAMING_SOCKET_TIMEOUT_MS),
            Some(_) => node.details.get_i64("comp_streaming_socket_timeout_in_ms"),
        };
        let (Some(throughput), Some(timeout)) = (throughput, timeout) else {
            continue;
        };

        if throughput != DEFAULT_STREAM_THROUGHPUT_MBITS {
            recommendations.push(
                yaml_setting(
                    node,
                    "Non-Default Streaming Throughput (stream_throughput_outbound_megabits_per_sec)",
                    format!(
                        "Node {} has {} Mb/s streaming throughput",
                        node.identifier(),
                        throughput
                    ),
                    Severity::Info,
                )
                .with_impact("May affect repair and bootstrap performance")
                .with_recommendation(
                    "Default 200 Mb/s is usually optimal unless network capacity differs in cassandra.yaml",
                )
                .with_current_value(format!(
                    "stream_throughput_outbound_megabits_per_sec={} Mb/s",
                    throughput
                ))
                .with_context("stream_throughput_outbound_megabits_per_sec", throughput)
                .with_recommended_value("200 Mb/s"),
            );
        }

        if timeout != DEFAULT_STREAMING_SOCKET_TIMEOUT_MS {
            let hours = timeout as f64 / 1000.0 / 60.0 / 60.0;
            recommendations.push(
                yaml_setting(
                    node,
                    "Non-Default Streaming Timeout (streaming_socket_timeout_in_ms)",
                    format!("Node {} has {:.1} hour timeout", node.identifier(), hours),
                    Severity::Info,
                )
                .with_impact("May affect long-running streaming operations")
                .with_recommendation("Default 24 hour timeout is usually appropriate in cassandra.yaml")
                .with_current_value(format!(
                    "streaming_socket_timeout_in_ms={} ms ({:.1} hours)",
                    timeout, hours
                ))
                .with_context("streaming_socket_timeout_in_ms", timeout)
                .with_recommended_value("86400000 ms (24 hours)"),
            );
        }
    }

    recommendations
}

fn analyze_versions(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let versions = group_nodes(state.nodes.values().map(|n| {
        (
            n.details.get_str_or(keys::CASSANDRA_VERSION, "unknown"),
            n.host_id.clone(),
        )
    }));

    if versions.len() > 1 {
        let names: Vec<String> = versions.keys().cloned().collect();
        recommendations.push(
            cluster_setting(
                "Inconsistent Cassandra Versions",
                format!("Multiple versions detected: {}", bracketed(&names)),
                Severity::Critical,
            )
            .with_impact("Mixed versions can cause compatibility issues")
            .with_recommendation("Upgrade all nodes to the same version")
            .with_context("versions", names),
        );
    }

    for (version, nodes) in &versions {
        if !is_version_unsupported(version) {
            continue;
        }
        recommendations.push(
            cluster_setting(
                format!("Unsupported Cassandra Version: {}", version),
                format!(
                    "Nodes running unsupported version {}: {}",
                    version,
                    bracketed(nodes)
                ),
                Severity::Critical,
            )
            .with_impact("Security vulnerabilities and lack of support")
            .with_recommendation("Upgrade to Cassandra 4.x or latest supported version")
            .with_context("version", version.clone())
            .with_affected_nodes(nodes.clone()),
        );
    }

    recommendations
}

/// Core count from the highest reported CPU id, falling back to what the JVM sees.
fn cpu_count(node: &Node) -> Option<i64> {
    node.details
        .get_i64(keys::CPU_COUNT)
        .filter(|id| *id >= 0)
        .map(|id| id + 1)
        .or_else(|| {
            node.details
                .get_i64(keys::JVM_AVAILABLE_PROCESSORS)
                .filter(|n| *n > 0)
        })
        .filter(|n| *n > 0)
}

fn concurrency_finding(
    node: &Node,
    setting: &str,
    operation: &str,
    value: i64,
    cpus: i64,
) -> Option<Recommendation> {
    let recommended = 16 * cpus;
    let label = if setting == "concurrent_reads" { "Reads" } else { "Writes" };
    let (title, description, impact) = if value == DEFAULT_CONCURRENT_READS && cpus > 2 {
        (
            format!(
                "Default Concurrent {} Not Leveraging CPU Cores ({})",
                label, setting
            ),
            format!(
                "Node {} uses default {}=32 with {} CPU cores",
                node.identifier(),
                setting,
                cpus
            ),
            format!(
                "CPU cores are not being fully leveraged for {} operations",
                operation
            ),
        )
    } else if value < recommended {
        (
            format!("Low Concurrent {} Setting ({})", label, setting),
            format!(
                "Node {} has {}={} with {} CPU cores",
                node.identifier(),
                setting,
                value,
                cpus
            ),
            format!(
                "May not fully utilize available CPU resources for {} operations",
                operation
            ),
        )
    } else {
        return None;
    };

    Some(
        yaml_setting(node, title, description, Severity::Warning)
            .with_impact(impact)
            .with_recommendation(format!(
                "Increase {} to {} (16x CPU count) in cassandra.yaml",
                setting, recommended
            ))
            .with_current_value(format!("{}={}", setting, value))
            .with_context(setting, value)
            .with_context("cpu_count", cpus)
            .with_recommended_value(format!("{} (16x CPU count)", recommended)),
    )
}

fn analyze_thread_pools(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for node in state.nodes.values() {
        let cpus = cpu_count(node);
        let reads_set = node.details.is_truthy("comp_concurrent_reads");
        let writes_set = node.details.is_truthy("comp_concurrent_writes");

        if let Some(cpus) = cpus {
            if reads_set {
                if let Some(reads) = node.details.get_i64("comp_concurrent_reads") {
                    recommendations.extend(concurrency_finding(node, "concurrent_reads", "read", reads, cpus));
                }
            }
            if writes_set {
                if let Some(writes) = node.details.get_i64("comp_concurrent_writes") {
                    recommendations.extend(concurrency_finding(node, "concurrent_writes", "write", writes, cpus));
                }
            }

            let native = node
                .details
                .is_truthy("comp_native_transport_max_threads")
                .then(|| node.details.get_i64("comp_native_transport_max_threads"))
                .flatten()
                .filter(|v| *v != -1);
            if let Some(native) = native {
                let current = |key: &str| node.details.get_i64(key).unwrap_or(32);
                // reads + writes + counter writes at 16x cores, view writes stay at 32
                let recommended = 16 * cpus * 3 + 32;
                if native < recommended {
                    recommendations.push(
                        yaml_setting(
                            node,
                            "Low Native Transport Max Threads (native_transport_max_threads)",
                            format!(
                                "Node {} has native_transport_max_threads={}, should be at least {}",
                                node.identifier(),
                                native,
                                recommended
                            ),
                            Severity::Warning,
                        )
                        .with_impact("May limit concurrent client operations and cause thread pool saturation")
                        .with_recommendation(format!(
                            "Increase native_transport_max_threads to {} (sum of concurrent_reads + concurrent_writes \
                             + concurrent_counter_writes + concurrent_materialized_view_writes) in cassandra.yaml",
                            recommended
                        ))
                        .with_current_value(format!("native_transport_max_threads={}", native))
                        .with_context("native_transport_max_threads", native)
                        .with_context("concurrent_reads", current("comp_concurrent_reads"))
                        .with_context("concurrent_writes", current("comp_concurrent_writes"))
                        .with_context(
                            "concurrent_counter_writes",
                            current("comp_concurrent_counter_writes"),
                        )
                        .with_context(
                            "concurrent_materialized_view_writes",
                            current("comp_concurrent_materialized_view_writes"),
                        )
                        .with_recommended_value(recommended.to_string()),
                    );
                }
            }
        } else if reads_set || writes_set {
            recommendations.push(
                yaml_setting(
                    node,
                    "Unable to Determine CPU Count for Thread Pool Analysis",
                    format!(
                        "Cannot analyze thread pool settings optimally for node {}",
                        node.identifier()
                    ),
                    Severity::Info,
                )
                .with_impact("Cannot provide CPU-based recommendations for thread pool sizing")
                .with_recommendation("Check that host_cpu_CPU parameter is available in node metrics"),
            );
        }
    }

    recommendations
}

fn analyze_auth_caches(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for node in state.nodes.values() {
        for (setting, recommended_ms, recommended) in AUTH_CACHE_SETTINGS {
            let Some(value) = node.details.get_i64(&format!("comp_{}", setting)) else {
                continue;
            };
            let recommended_value = format!("{} ({}ms)", recommended, recommended_ms);

            let rec = if value == DEFAULT_AUTH_CACHE_MS {
                yaml_setting(
                    node,
                    format!("Default Authentication Cache Setting ({})", setting),
                    format!(
                        "Node {} uses default {}=2s which can impact query performance",
                        node.identifier(),
                        setting
                    ),
                    Severity::Warning,
                )
                .with_impact(
                    "Frequent authentication cache refreshes can cause performance overhead and impact query latency",
                )
                .with_recommendation(format!(
                    "Increase {} to {} for production workloads in cassandra.yaml",
                    setting, recommended
                ))
                .with_current_value(format!("{}=2s (2000ms)", setting))
            } else if value < recommended_ms {
                let seconds = value as f64 / 1000.0;
                yaml_setting(
                    node,
                    format!("Low Authentication Cache Setting ({})", setting),
                    format!(
                        "Node {} has {}={}ms ({:.1}s)",
                        node.identifier(),
                        setting,
                        value,
                        seconds
                    ),
                    Severity::Warning,
                )
                .with_impact("Frequent authentication cache refreshes can cause performance overhead")
                .with_recommendation(format!(
                    "Increase {} to {} for better performance in cassandra.yaml",
                    setting, recommended
                ))
                .with_current_value(format!("{}={}ms ({:.1}s)", setting, value, seconds))
            } else if value > 3_600_000 {
                let minutes = value as f64 / 1000.0 / 60.0;
                yaml_setting(
                    node,
                    format!("High Authentication Cache Setting ({})", setting),
                    format!(
                        "Node {} has {}={}ms ({:.1} minutes)",
                        node.identifier(),
                        setting,
                        value,
                        minutes
                    ),
                    Severity::Info,
                )
                .with_impact(
                    "Long cache validity periods may delay permission/role changes from taking effect",
                )
                .with_recommendation(format!(
                    "Consider reducing {} to {} for better security/performance balance in cassandra.yaml",
                    setting, recommended
                ))
                .with_current_value(format!("{}={}ms ({:.1} minutes)", setting, value, minutes))
            } else {
                continue;
            };

            recommendations.push(
                rec.with_context(setting, value)
                    .with_recommended_value(recommended_value),
            );
        }
    }

    recommendations
}
