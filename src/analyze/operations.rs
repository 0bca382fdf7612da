// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Runtime health from collected metrics: dropped messages, GC, compaction
//! backlog, blocked tasks and hints.

use crate::analyze::analyzer::{AnalysisOutcome, AnalysisResult, SectionAnalyzer};
use crate::analyze::common::{most_common, parse_max_heap, GcType, CATEGORY_OPERATIONS, SECTION_OPERATIONS};
use crate::config::Thresholds;
use crate::model::metrics::{series_average, series_max};
use crate::model::node::keys;
use crate::model::{ClusterState, Recommendation, Severity};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Per-type dropped message rates the collector gathers.
struct DroppedKind {
    metric: &'static str,
    title: &'static str,
    impact: &'static str,
    recommendation: &'static str,
}

const DROPPED_KINDS: [DroppedKind; 5] = [
    DroppedKind {
        metric: "dropped_mutations",
        title: "Dropped Mutations",
        impact: "Write requests being dropped, potential data loss",
        recommendation: "Check for overloaded nodes, increase write capacity",
    },
    DroppedKind {
        metric: "dropped_mutation_responses",
        title: "Dropped Mutation Responses",
        impact: "Write acknowledgments being dropped, client timeouts",
        recommendation: "Check network and coordinator load",
    },
    DroppedKind {
        metric: "dropped_reads",
        title: "Dropped Read Requests",
        impact: "Read requests being dropped, query failures",
        recommendation: "Check read thread pools and increase read capacity",
    },
    DroppedKind {
        metric: "dropped_hints",
        title: "Dropped Hints",
        impact: "Hints being dropped, eventual consistency issues",
        recommendation: "Check hint storage capacity and delivery rate",
    },
    DroppedKind {
        metric: "dropped_hint_responses",
        title: "Dropped Hint Responses",
        impact: "Hint acknowledgments dropped, hint replay issues",
        recommendation: "Check hint handoff settings and network",
    },
];

/// Messages per second.
const DROPPED_CRITICAL_RATE: f64 = 100.0;
const DROPPED_WARNING_RATE: f64 = 10.0;

#[derive(Debug, Default, Clone, Copy)]
pub struct OperationsAnalyzer;

impl SectionAnalyzer for OperationsAnalyzer {
    fn section(&self) -> &'static str {
        SECTION_OPERATIONS
    }

    fn analyze(&self, state: &ClusterState, thresholds: &Thresholds) -> AnalysisOutcome {
        let mut recommendations = Vec::new();
        recommendations.extend(analyze_dropped_messages(state, thresholds));
        recommendations.extend(analyze_gc(state, thresholds));
        recommendations.extend(analyze_compactions(state, thresholds));
        recommendations.extend(analyze_thread_pools(state, thresholds));

        let result = AnalysisResult::new(recommendations);
        let counts = result.severity_counts();
        let count = result.recommendations.len();
        Ok(result
            .with_summary("recommendations_count", count)
            .with_summary("critical_issues", counts.critical)
            .with_summary("warnings", counts.warning))
    }
}

fn operations(title: impl Into<String>, description: impl Into<String>, severity: Severity) -> Recommendation {
    Recommendation::new(title, description, severity, CATEGORY_OPERATIONS)
}

fn analyze_dropped_messages(state: &ClusterState, thresholds: &Thresholds) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    let mut total_dropped = 0.0;
    let mut critical_types = Vec::new();
    let mut warning_types = Vec::new();

    for kind in &DROPPED_KINDS {
        let rate = series_average(state.metric(kind.metric));
        if rate <= 0.0 {
            continue;
        }
        total_dropped += rate;

        let severity = if rate > DROPPED_CRITICAL_RATE {
            critical_types.push(kind.title);
            Severity::Critical
        } else if rate > DROPPED_WARNING_RATE {
            warning_types.push(kind.title);
            Severity::Warning
        } else {
            continue;
        };

        recommendations.push(
            operations(
                format!("{} Detected", kind.title),
                format!("{}: {:.1} messages/sec", kind.title, rate),
                severity,
            )
            .with_impact(kind.impact)
            .with_recommendation(kind.recommendation)
            .with_context("dropped_count", rate)
            .with_context("metric_type", kind.metric),
        );
    }

    if critical_types.len() + warning_types.len() > 2 {
        let severity = if critical_types.is_empty() {
            Severity::Warning
        } else {
            Severity::Critical
        };
        recommendations.push(
            operations(
                "Multiple Message Types Being Dropped",
                format!(
                    "Total dropped messages across all types: {:.0}/sec",
                    total_dropped
                ),
                severity,
            )
            .with_impact("System is under severe stress, multiple subsystems affected")
            .with_recommendation(
                "Immediate action required: scale cluster, reduce load, or tune performance",
            )
            .with_context("total_dropped", total_dropped)
            .with_context("critical_types", critical_types)
            .with_context("warning_types", warning_types),
        );
    }

    // The cluster-wide rate only speaks when no per-type rule fired.
    let general = series_average(state.metric("dropped_messages"));
    if recommendations.is_empty() && general > thresholds.dropped_messages_critical as f64 {
        recommendations.push(
            operations(
                "Critical Dropped Messages",
                format!("High rate of dropped messages: {:.0}", general),
                Severity::Critical,
            )
            .with_impact("Data loss and client request failures")
            .with_recommendation("Investigate network issues, tune thread pools, or scale cluster")
            .with_context("dropped_messages", general),
        );
    }

    recommendations
}

fn analyze_gc(state: &ClusterState, thresholds: &Thresholds) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let reporting: Vec<_> = state.nodes.values().filter(|n| !n.details.is_empty()).collect();

    let mut node_gc: BTreeMap<String, &'static str> = BTreeMap::new();
    for node in &reporting {
        let jvm_args = node.details.get_str_or(keys::JVM_ARGUMENTS, "");
        node_gc.insert(
            node.details.get_str_or(keys::HOSTNAME, "Unknown"),
            GcType::from_jvm_args(&jvm_args).name(),
        );
    }
    let gc_types: BTreeSet<&str> = node_gc.values().copied().collect();

    if gc_types.len() > 1 {
        let node_gc_info: serde_json::Map<String, Value> = node_gc
            .iter()
            .map(|(host, gc)| (host.clone(), json!(gc)))
            .collect();
        recommendations.push(
            operations(
                "Inconsistent GC Algorithms",
                "Different GC algorithms detected across nodes",
                Severity::Warning,
            )
            .with_impact("Inconsistent performance characteristics across nodes")
            .with_recommendation("Standardize GC algorithm across all nodes")
            .with_context("gc_types", gc_types.iter().copied().collect::<Vec<_>>())
            .with_context("node_gc_info", Value::Object(node_gc_info)),
        );
    }

    let mut gc_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for gc in node_gc.values() {
        *gc_counts.entry(*gc).or_default() += 1;
    }
    // Heap advisories use the dominant collector and the first node's heap.
    let dominant = most_common(&gc_counts).and_then(|name| {
        reporting
            .iter()
            .map(|n| GcType::from_jvm_args(&n.details.get_str_or(keys::JVM_ARGUMENTS, "")))
            .find(|gc| gc.name() == name)
    });
    let first_heap = reporting
        .first()
        .and_then(|n| parse_max_heap(&n.details.get_str_or(keys::JVM_ARGUMENTS, "")));

    if let (Some(gc), Some(heap)) = (dominant, first_heap) {
        let heap_gb = heap.whole_gb();
        debug!("gc advisories for {} with {}GB heap", gc, heap_gb);
        for advisory in gc.advisories(heap_gb) {
            recommendations.push(
                operations(
                    format!("GC Configuration Advisory ({})", gc),
                    advisory,
                    Severity::Info,
                )
                .with_impact("Sub-optimal GC performance")
                .with_recommendation("Review GC configuration based on heap size and workload")
                .with_context("gc_type", gc.name())
                .with_context("heap_size_gb", heap_gb),
            );
        }
    }

    // Only young generation collection time is exposed by the agent.
    let gc_young = series_average(state.metric("gc_young_rate"));
    if gc_young > thresholds.gc_pause_critical_ms as f64 {
        recommendations.push(
            operations(
                "Critical GC Pause Times",
                format!(
                    "GC pause times are critically high: {:.1}ms average (Young Generation)",
                    gc_young
                ),
                Severity::Critical,
            )
            .with_impact("Severe performance impact and potential timeouts")
            .with_recommendation("Tune JVM heap settings, review GC algorithm, or add nodes")
            .with_context("gc_pause_ms", gc_young)
            .with_context("gc_young_ms", gc_young),
        );
    } else if gc_young > thresholds.gc_pause_warn_ms as f64 {
        recommendations.push(
            operations(
                "Elevated GC Pause Times",
                format!("GC pause times are elevated: {:.1}ms average", gc_young),
                Severity::Warning,
            )
            .with_impact("Performance degradation and increased latency")
            .with_recommendation("Review heap sizing and consider GC tuning")
            .with_context("gc_pause_ms", gc_young),
        );
    }

    recommendations
}

fn analyze_compactions(state: &ClusterState, thresholds: &Thresholds) -> Option<Recommendation> {
    let pending = series_average(state.metric("pending_compactions"));

    if pending > thresholds.pending_compactions_critical as f64 {
        Some(
            operations(
                "Critical Compaction Backlog",
                format!("High number of pending compactions: {:.0}", pending),
                Severity::Critical,
            )
            .with_impact("Read performance degradation and disk space bloat")
            .with_recommendation("Increase compaction throughput or add nodes")
            .with_context("pending_compactions", pending),
        )
    } else if pending > thresholds.pending_compactions_warn as f64 {
        Some(
            operations(
                "Elevated Compaction Backlog",
                format!("Elevated number of pending compactions: {:.0}", pending),
                Severity::Warning,
            )
            .with_impact("Potential read performance impact")
            .with_recommendation("Monitor compaction throughput and consider tuning")
            .with_context("pending_compactions", pending),
        )
    } else {
        None
    }
}

fn analyze_thread_pools(state: &ClusterState, thresholds: &Thresholds) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let blocked = series_max(state.metric("thread_pool_blocked"));
    if blocked > thresholds.blocked_tasks_warn as f64 {
        recommendations.push(
            operations(
                "Blocked Thread Pool Tasks",
                format!("Thread pools have pending/blocked tasks: {:.0}", blocked),
                Severity::Warning,
            )
            .with_impact("Request queuing and increased latency")
            .with_recommendation("Review thread pool sizing and system resources")
            .with_context("blocked_tasks", blocked),
        );
    }

    let hints = series_average(state.metric("hints_in_progress"));
    if hints > 0.0 {
        recommendations.push(
            operations(
                "Hints in Progress",
                format!("Cluster has {:.0} hints in progress", hints),
                Severity::Info,
            )
            .with_impact("Indicates nodes are catching up with missed writes")
            .with_recommendation("Monitor hint delivery and ensure nodes are healthy")
            .with_context("hints_in_progress", hints),
        );
    }

    recommendations
}
