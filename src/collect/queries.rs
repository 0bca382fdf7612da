//! What the collector asks the monitoring API for.

use crate::config::ClusterConfig;

/// Log searches backing the operations log checks, as `(category, message filter)`.
pub const LOG_SEARCHES: [(&str, &str); 9] = [
    ("prepared_statements", "\"prepared statements\""),
    ("batch_warnings", "Batch"),
    ("tombstone_warnings", "tombstone"),
    ("aggregation_queries", "Aggregation query"),
    ("gc_pauses", "GCInspector"),
    ("gossip_pauses", "FailureDetector"),
    ("large_partitions", "large partition"),
    ("commitlog_sync", "PERIODIC-COMMIT-LOG-SYNC"),
    ("repair_failures", "repair"),
];

/// `(metric key, metric name, extra label matchers)`. The cluster filter is
/// prepended to the matchers when the query is built.
const METRICS: [(&str, &str, &str); 33] = [
    // host
    ("cpu_usage", "host_CPU_Percent_Merge", r#"time="real""#),
    ("memory_usage_percent", "host_Memory_UsedPercent", ""),
    ("disk_read_rate", "host_Disk_SectorsRead", r#"axonfunction="rate""#),
    ("disk_write_rate", "host_Disk_SectorsWrite", r#"axonfunction="rate""#),
    ("disk_usage_percent", "host_Disk_UsedPercent", ""),
    // jvm
    ("heap_usage", "jvm_Memory_", r#"function="used",scope="HeapMemoryUsage""#),
    // cassandra
    ("dropped_messages", "cas_DroppedMessage_Dropped", r#"axonfunction="rate""#),
    ("dropped_mutations", "cas_DroppedMessage_Dropped", r#"axonfunction="rate",function="Count",scope="MUTATION_REQ""#),
    ("dropped_mutation_responses", "cas_DroppedMessage_Dropped", r#"axonfunction="rate",function="Count",scope="MUTATION_RSP""#),
    ("dropped_reads", "cas_DroppedMessage_Dropped", r#"axonfunction="rate",function="Count",scope="READ""#),
    ("dropped_hints", "cas_DroppedMessage_Dropped", r#"axonfunction="rate",function="Count",scope="HINT""#),
    ("dropped_hint_responses", "cas_DroppedMessage_Dropped", r#"axonfunction="rate",function="Count",scope="HINT_RSP""#),
    ("pending_compactions", "cas_Compaction_PendingTasks", ""),
    ("compaction_bytes_rate", "cas_Compaction_BytesCompacted", r#"axonfunction="rate""#),
    ("total_hints", "cas_Storage_TotalHints", r#"axonfunction="rate""#),
    ("hints_in_progress", "cas_Storage_TotalHintsInProgress", ""),
    ("thread_pool_blocked", "cas_ThreadPools_internal", r#"key="TotalBlockedTasks""#),
    ("thread_pool_active", "cas_ThreadPools_internal", r#"key="ActiveTasks""#),
    ("read_latency_p99", "cas_ClientRequest_Latency", r#"scope="Read",function="99thPercentile""#),
    ("write_latency_p99", "cas_ClientRequest_Latency", r#"scope="Write",function="99thPercentile""#),
    ("read_failures", "cas_ClientRequest_Failures", r#"axonfunction="rate",scope="Read""#),
    ("write_failures", "cas_ClientRequest_Failures", r#"axonfunction="rate",scope="Write""#),
    // tables
    ("bloom_filter_false_ratio", "cas_Table_BloomFilterFalseRatio", ""),
    ("bloom_filter_disk_space", "cas_Table_BloomFilterDiskSpaceUsed", ""),
    ("compression_ratio", "cas_Table_CompressionRatio", ""),
    ("compression_metadata_memory", "cas_Table_CompressionMetadataOffHeapMemoryUsed", ""),
    ("table_coordinator_reads", "cas_Table_CoordinatorReadLatency", r#"axonfunction="rate",function="Count""#),
    ("table_coordinator_writes", "cas_Table_CoordinatorWriteLatency", r#"axonfunction="rate",function="Count""#),
    ("table_sstable_count", "cas_Table_LiveSSTableCount", ""),
    ("table_disk_space_used", "cas_Table_LiveDiskSpaceUsed", ""),
    ("table_row_cache_hit", "cas_Table_RowCacheHit", r#"axonfunction="rate""#),
    ("table_row_cache_miss", "cas_Table_RowCacheMiss", r#"axonfunction="rate""#),
    ("key_cache_hit_rate", "cas_Cache_HitRate", r#"scope="KeyCache""#),
];

/// Label matchers selecting one cluster.
pub fn cluster_filter(cluster: &ClusterConfig) -> String {
    format!(
        r#"org="{}",cluster="{}",type="{}""#,
        cluster.org, cluster.cluster, cluster.cluster_type
    )
}

fn selector(metric: &str, filter: &str, extra: &str) -> String {
    if extra.is_empty() {
        format!("{}{{{}}}", metric, filter)
    } else {
        format!("{}{{{},{}}}", metric, filter, extra)
    }
}

/// Every range query of a run, keyed by the metric key analyzers look up.
///
/// `gc_metric` is the collector-specific young generation metric, see
/// [`crate::analyze::common::GcType::time_metric`].
pub fn metric_queries(cluster: &ClusterConfig, gc_metric: &str) -> Vec<(&'static str, String)> {
    let filter = cluster_filter(cluster);
    let mut queries: Vec<(&'static str, String)> = METRICS
        .iter()
        .map(|(key, metric, extra)| (*key, selector(metric, &filter, extra)))
        .collect();
    let gc_position = queries
        .iter()
        .position(|(key, _)| *key == "heap_usage")
        .map_or(queries.len(), |p| p + 1);
    queries.insert(
        gc_position,
        (
            "gc_young_rate",
            selector(gc_metric, &filter, r#"axonfunction="rate",function="CollectionTime""#),
        ),
    );
    queries
}
