//! Operational findings from log search histograms.
//!
//! Each log category carries a match count and, usually, time buckets. The
//! hourly rate is the count over the bucket span, never less than one hour.
//! When buckets are missing only the count-based fallback rule applies.

use crate::analyze::analyzer::{AnalysisOutcome, AnalysisResult, SectionAnalyzer};
use crate::analyze::common::{CATEGORY_OPERATIONS, SECTION_OPERATIONS_LOGS};
use crate::config::Thresholds;
use crate::model::{ClusterState, LogHistogram, Recommendation, Severity};

const BATCH_HISTOGRAM_NOTE: &str = "Note: Batch warnings detected via histogram analysis. \
     Individual log entries may not be retrievable through search API.";
const BATCH_COUNT_NOTE: &str = "Note: Batch indicators detected via histogram analysis. \
     Individual log entries may not be retrievable through search API.";

#[derive(Debug, Default, Clone, Copy)]
pub struct OperationsLogsAnalyzer;

impl SectionAnalyzer for OperationsLogsAnalyzer {
    fn section(&self) -> &'static str {
        SECTION_OPERATIONS_LOGS
    }

    fn analyze(&self, state: &ClusterState, _thresholds: &Thresholds) -> AnalysisOutcome {
        let mut recommendations = Vec::new();
        recommendations.extend(analyze_prepared_statements(state));
        recommendations.extend(analyze_batches(state));
        recommendations.extend(analyze_tombstones(state));
        recommendations.extend(analyze_aggregation_queries(state));
        recommendations.extend(analyze_gc_pauses(state));
        recommendations.extend(analyze_gossip_pauses(state));

        let count = recommendations.len();
        Ok(AnalysisResult::new(recommendations)
            .with_summary("recommendations_count", count)
            .with_summary("log_analysis_performed", true))
    }
}

/// What one log category showed over the window.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Observed {
    count: u64,
    /// Per hour, present only when buckets were returned.
    rate: Option<f64>,
    peak: u64,
}

impl Observed {
    fn from_histogram(histogram: &LogHistogram) -> Option<Self> {
        let count = histogram.total_count();
        if count == 0 {
            return None;
        }
        let rate = (!histogram.histogram.is_empty()).then(|| histogram.hourly_rate());
        Some(Self {
            count,
            rate,
            peak: histogram.peak_count(),
        })
    }
}

fn observe(state: &ClusterState, category: &str) -> Option<Observed> {
    state.log_events.get(category).and_then(Observed::from_histogram)
}

/// Context key names for one log family.
struct FamilyKeys {
    total: &'static str,
    rate: &'static str,
}

const PREPARED_KEYS: FamilyKeys = FamilyKeys {
    total: "total_discards",
    rate: "discards_per_hour",
};
const WARNING_KEYS: FamilyKeys = FamilyKeys {
    total: "total_warnings",
    rate: "warnings_per_hour",
};
const QUERY_KEYS: FamilyKeys = FamilyKeys {
    total: "total_queries",
    rate: "queries_per_hour",
};
const GC_KEYS: FamilyKeys = FamilyKeys {
    total: "total_pauses",
    rate: "pauses_per_hour",
};
const GOSSIP_KEYS: FamilyKeys = FamilyKeys {
    total: "pause_count",
    rate: "pauses_per_hour",
};

struct LogFinding<'a> {
    title: &'a str,
    severity: Severity,
    impact: &'a str,
    recommendation: &'a str,
}

impl LogFinding<'_> {
    fn build(self, description: String, observed: &Observed, keys: &FamilyKeys) -> Recommendation {
        let mut rec = Recommendation::new(self.title, description, self.severity, CATEGORY_OPERATIONS)
            .with_impact(self.impact)
            .with_recommendation(self.recommendation)
            .with_context("total_count", observed.count)
            .with_context("hourly_rate", observed.rate.unwrap_or(0.0))
            .with_context(keys.total, observed.count);
        if let Some(rate) = observed.rate {
            rec = rec.with_context(keys.rate, rate);
        }
        rec
    }
}

fn analyze_prepared_statements(state: &ClusterState) -> Option<Recommendation> {
    let observed = observe(state, "prepared_statements")?;

    let Some(rate) = observed.rate else {
        return Some(
            LogFinding {
                title: "Prepared Statement Discards Detected",
                severity: Severity::Warning,
                impact: "Potential performance impact from statement cache evictions",
                recommendation: "Review prepared statement cache configuration",
            }
            .build(
                format!("Found {} prepared statement discard warnings", observed.count),
                &observed,
                &PREPARED_KEYS,
            ),
        );
    };

    let description = format!(
        "Cluster is discarding {:.1} prepared statements per hour ({} total)",
        rate, observed.count
    );
    if rate > 100.0 {
        Some(
            LogFinding {
                title: "High Prepared Statement Discard Rate",
                severity: Severity::Critical,
                impact: "Application performance degradation due to statement re-preparation",
                recommendation: "Increase prepared_statement_cache_size_mb or optimize statement usage",
            }
            .build(description, &observed, &PREPARED_KEYS)
            .with_context("peak_count", observed.peak),
        )
    } else if rate > 50.0 {
        Some(
            LogFinding {
                title: "Moderate Prepared Statement Discards",
                severity: Severity::Warning,
                impact: "Potential performance impact from statement re-preparation",
                recommendation: "Monitor prepared statement cache usage and consider increasing cache size",
            }
            .build(description, &observed, &PREPARED_KEYS),
        )
    } else {
        None
    }
}

fn analyze_batches(state: &ClusterState) -> Option<Recommendation> {
    let observed = observe(state, "batch_warnings")?;

    let Some(rate) = observed.rate else {
        // low counts are mostly false positives from the broad search term
        if observed.count <= 100 {
            return None;
        }
        return Some(
            LogFinding {
                title: "Batch Activity Detected",
                severity: Severity::Info,
                impact: "Batch operations detected in cluster activity",
                recommendation: "Monitor batch performance metrics and consider batch size thresholds in cassandra.yaml",
            }
            .build(
                format!(
                    "Found {} batch-related indicators. {}",
                    observed.count, BATCH_COUNT_NOTE
                ),
                &observed,
                &WARNING_KEYS,
            )
            .with_context("api_note", BATCH_COUNT_NOTE),
        );
    };

    if observed.count > 1000 {
        Some(
            LogFinding {
                title: "Excessive Large Batch Usage (Detected via Histogram)",
                severity: Severity::Warning,
                impact: "Performance degradation and increased GC pressure",
                recommendation: "Review and optimize batch usage patterns in the application. \
                     Consider using batch_size_warn_threshold_in_kb and batch_size_fail_threshold_in_kb settings.",
            }
            .build(
                format!(
                    "Found {} large batch indicators ({:.1} per hour). {}",
                    observed.count, rate, BATCH_HISTOGRAM_NOTE
                ),
                &observed,
                &WARNING_KEYS,
            )
            .with_context("peak_count", observed.peak)
            .with_context("api_note", BATCH_HISTOGRAM_NOTE),
        )
    } else if observed.count > 100 {
        Some(
            LogFinding {
                title: "Batch Size Indicators Detected",
                severity: Severity::Info,
                impact: "Potential performance impact from batch operations",
                recommendation: "Monitor batch sizes using nodetool or metrics. \
                     Consider enabling batch size warnings in cassandra.yaml.",
            }
            .build(
                format!(
                    "Found {} batch-related indicators. {}",
                    observed.count, BATCH_HISTOGRAM_NOTE
                ),
                &observed,
                &WARNING_KEYS,
            )
            .with_context("api_note", BATCH_HISTOGRAM_NOTE),
        )
    } else {
        None
    }
}

fn analyze_tombstones(state: &ClusterState) -> Option<Recommendation> {
    let observed = observe(state, "tombstone_warnings")?;

    let Some(rate) = observed.rate else {
        return Some(
            LogFinding {
                title: "Tombstone Issues Detected",
                severity: Severity::Warning,
                impact: "Tombstones can degrade read performance",
                recommendation: "Review deletion patterns in your data model",
            }
            .build(
                format!("Found {} tombstone-related warnings", observed.count),
                &observed,
                &WARNING_KEYS,
            ),
        );
    };

    if observed.count > 10_000 {
        Some(
            LogFinding {
                title: "Excessive Tombstone Warnings",
                severity: Severity::Critical,
                impact: "Severe read performance degradation and potential timeouts",
                recommendation: "Review data model and deletion patterns, consider TWCS for TTL data",
            }
            .build(
                format!(
                    "Found {} tombstone warnings ({:.1} per hour)",
                    observed.count, rate
                ),
                &observed,
                &WARNING_KEYS,
            )
            .with_context("peak_count", observed.peak),
        )
    } else if observed.count > 1000 {
        Some(
            LogFinding {
                title: "High Tombstone Warning Rate",
                severity: Severity::Critical,
                impact: "Poor read performance due to tombstone scanning",
                recommendation: "Review deletion patterns and consider compaction strategy changes",
            }
            .build(
                format!("Found {} tombstone warnings", observed.count),
                &observed,
                &WARNING_KEYS,
            ),
        )
    } else if observed.count > 100 {
        Some(
            LogFinding {
                title: "Tombstone Warnings Detected",
                severity: Severity::Warning,
                impact: "Potential read performance impact",
                recommendation: "Monitor tombstone patterns and optimize data model if needed",
            }
            .build(
                format!("Found {} tombstone warnings", observed.count),
                &observed,
                &WARNING_KEYS,
            ),
        )
    } else {
        None
    }
}

fn analyze_aggregation_queries(state: &ClusterState) -> Option<Recommendation> {
    let observed = observe(state, "aggregation_queries")?;

    let Some(rate) = observed.rate else {
        return Some(
            LogFinding {
                title: "Aggregation Query Usage",
                severity: Severity::Info,
                impact: "Aggregation queries consume coordinator resources",
                recommendation: "Consider data model optimizations for aggregations",
            }
            .build(
                format!("Found {} aggregation query warnings", observed.count),
                &observed,
                &QUERY_KEYS,
            ),
        );
    };

    let with_rate = format!(
        "Found {} aggregation queries ({:.1} per hour)",
        observed.count, rate
    );
    let rec = if rate > 10.0 {
        LogFinding {
            title: "Excessive Aggregation Query Usage",
            severity: Severity::Critical,
            impact: "High coordinator CPU usage and potential timeouts",
            recommendation: "Pre-aggregate data or use analytics tools instead of aggregation queries",
        }
        .build(with_rate, &observed, &QUERY_KEYS)
        .with_context("peak_count", observed.peak)
    } else if rate > 5.0 {
        LogFinding {
            title: "Moderate Aggregation Query Usage",
            severity: Severity::Warning,
            impact: "Increased coordinator load from aggregation processing",
            recommendation: "Consider pre-aggregating frequently queried data",
        }
        .build(with_rate, &observed, &QUERY_KEYS)
    } else {
        LogFinding {
            title: "Aggregation Queries Detected",
            severity: Severity::Info,
            impact: "Aggregation queries can impact cluster performance",
            recommendation: "Monitor aggregation query patterns",
        }
        .build(
            format!("Found {} aggregation queries", observed.count),
            &observed,
            &QUERY_KEYS,
        )
    };
    Some(rec)
}

fn analyze_gc_pauses(state: &ClusterState) -> Option<Recommendation> {
    let observed = observe(state, "gc_pauses")?;

    let Some(rate) = observed.rate else {
        return Some(
            LogFinding {
                title: "GC Pause Warnings Detected",
                severity: Severity::Warning,
                impact: "GC pauses can impact node performance",
                recommendation: "Review GC logs and heap configuration",
            }
            .build(
                format!("Found {} GC-related warnings", observed.count),
                &observed,
                &GC_KEYS,
            ),
        );
    };

    // Pause durations are not in the histogram, so severity follows frequency.
    let with_rate = format!(
        "Found {} GC pause warnings ({:.1} per hour)",
        observed.count, rate
    );
    if rate > 100.0 {
        Some(
            LogFinding {
                title: "Extreme GC Pause Frequency",
                severity: Severity::Critical,
                impact: "Frequent GC pauses causing performance degradation",
                recommendation: "Review heap size and GC tuning, consider G1GC or heap reduction",
            }
            .build(with_rate, &observed, &GC_KEYS)
            .with_context("peak_count", observed.peak),
        )
    } else if rate > 50.0 {
        Some(
            LogFinding {
                title: "High GC Pause Frequency",
                severity: Severity::Critical,
                impact: "Frequent GC activity impacting performance",
                recommendation: "Optimize GC settings or reduce heap pressure",
            }
            .build(with_rate, &observed, &GC_KEYS),
        )
    } else if rate > 10.0 {
        Some(
            LogFinding {
                title: "Moderate GC Pause Activity",
                severity: Severity::Warning,
                impact: "Periodic performance impact from GC",
                recommendation: "Monitor GC behavior and tune if necessary",
            }
            .build(
                format!("Found {} GC pause warnings", observed.count),
                &observed,
                &GC_KEYS,
            ),
        )
    } else {
        None
    }
}

fn analyze_gossip_pauses(state: &ClusterState) -> Option<Recommendation> {
    let observed = observe(state, "gossip_pauses")?;

    let Some(rate) = observed.rate else {
        return Some(
            LogFinding {
                title: "Gossip Pauses Detected",
                severity: Severity::Warning,
                impact: "Gossip pauses can affect cluster stability",
                recommendation: "Review system resources and network health",
            }
            .build(
                format!("Found {} gossip-related warnings", observed.count),
                &observed,
                &GOSSIP_KEYS,
            ),
        );
    };

    if observed.count > 50 || rate > 10.0 {
        Some(
            LogFinding {
                title: "Significant Gossip Protocol Disruptions",
                severity: Severity::Critical,
                impact: "Cluster membership instability and false failure detections",
                recommendation: "Investigate network issues, GC pauses, or system resource constraints",
            }
            .build(
                format!(
                    "Found {} gossip pause warnings ({:.1} per hour)",
                    observed.count, rate
                ),
                &observed,
                &GOSSIP_KEYS,
            )
            .with_context("peak_count", observed.peak),
        )
    } else if observed.count > 10 {
        Some(
            LogFinding {
                title: "Gossip Protocol Pauses Detected",
                severity: Severity::Warning,
                impact: "Potential cluster communication delays",
                recommendation: "Monitor for network or resource issues",
            }
            .build(
                format!("Found {} gossip pause warnings", observed.count),
                &observed,
                &GOSSIP_KEYS,
            ),
        )
    } else {
        None
    }
}
