//! Per-table schema checks driven by each table's CREATE TABLE statement.
//!
//! The data model section folds these findings into its own output.

use crate::analyze::analyzer::{AnalysisOutcome, AnalysisResult, SectionAnalyzer};
use crate::analyze::common::{is_system_keyspace, CATEGORY_DATAMODEL, SECTION_TABLE};
use crate::config::Thresholds;
use crate::model::table::DEFAULT_GC_GRACE_SECONDS;
use crate::model::{ClusterState, Keyspace, Recommendation, Severity, Table};
use std::collections::BTreeMap;

const MAX_CLUSTERING_COLUMNS: usize = 5;
const DEFAULT_STCS_MAX_THRESHOLD: i64 = 32;
const SHORT_GC_GRACE_SECONDS: i64 = 7200;

/// More tables than this with one speculative retry value are reported together.
const SPECULATIVE_RETRY_GROUP_SIZE: usize = 5;

const SPECULATIVE_RETRY_IMPACT: &str =
    "Speculative retry can cause unnecessary load and is often counterproductive in modern deployments";
const SPECULATIVE_RETRY_ADVICE: &str =
    "Set speculative_retry to NEVER unless you have specific latency requirements that benefit from it";

#[derive(Debug, Default, Clone, Copy)]
pub struct TableAnalyzer;

impl SectionAnalyzer for TableAnalyzer {
    fn section(&self) -> &'static str {
        SECTION_TABLE
    }

    fn analyze(&self, state: &ClusterState, _thresholds: &Thresholds) -> AnalysisOutcome {
        let mut recommendations = Vec::new();
        for (keyspace, table) in user_tables(state) {
            recommendations.extend(check_structure(keyspace, table));
        }
        for (keyspace, table) in user_tables(state) {
            recommendations.extend(check_compaction(keyspace, table));
        }
        for (keyspace, table) in user_tables(state) {
            recommendations.extend(check_caching(keyspace, table));
        }
        for (keyspace, table) in user_tables(state) {
            recommendations.extend(check_bloom_filter(keyspace, table));
        }
        for (keyspace, table) in user_tables(state) {
            recommendations.extend(check_gc_grace(keyspace, table));
        }
        recommendations.extend(analyze_speculative_retry(state));

        let counter_tables = state
            .keyspaces
            .values()
            .flat_map(|ks| ks.tables.iter())
            .filter(|t| t.is_counter())
            .count();
        let count = recommendations.len();
        Ok(AnalysisResult::new(recommendations)
            .with_summary("total_tables", state.total_tables())
            .with_summary("counter_tables", counter_tables)
            .with_summary("keyspaces_analyzed", state.keyspaces.len())
            .with_summary("recommendations_count", count))
    }
}

/// Tables outside the system keyspaces, with their keyspace.
fn user_tables(state: &ClusterState) -> impl Iterator<Item = (&Keyspace, &Table)> {
    state
        .keyspaces
        .values()
        .filter(|ks| !is_system_keyspace(&ks.name))
        .flat_map(|ks| ks.tables.iter().map(move |t| (ks, t)))
}

fn table_finding(
    keyspace: &Keyspace,
    table: &Table,
    title: String,
    description: impl Into<String>,
    severity: Severity,
) -> Recommendation {
    Recommendation::new(title, description, severity, CATEGORY_DATAMODEL)
        .with_keyspace(keyspace.name.clone())
        .with_table(table.name.clone())
}

fn check_structure(keyspace: &Keyspace, table: &Table) -> Option<Recommendation> {
    let clustering = table.clustering_keys().len();
    (clustering > MAX_CLUSTERING_COLUMNS).then(|| {
        table_finding(
            keyspace,
            table,
            format!("Many Clustering Columns in {}.{}", keyspace.name, table.name),
            format!("Table has {} clustering columns", clustering),
            Severity::Warning,
        )
        .with_impact("Too many clustering columns can affect query performance")
        .with_recommendation("Consider if all clustering columns are necessary")
        .with_context("clustering_key_count", clustering)
    })
}

fn check_compaction(keyspace: &Keyspace, table: &Table) -> Option<Recommendation> {
    let strategy = &table.compaction_strategy;

    if strategy.contains("LeveledCompactionStrategy") {
        if !table.is_counter() {
            return None;
        }
        return Some(
            table_finding(
                keyspace,
                table,
                format!("LCS Used with Counter Table {}.{}", keyspace.name, table.name),
                "LeveledCompactionStrategy is not recommended for counter tables",
                Severity::Warning,
            )
            .with_impact("Poor performance for counter tables with LCS")
            .with_recommendation("Use SizeTieredCompactionStrategy for counter tables")
            .with_context("current_strategy", strategy.clone()),
        );
    }

    if strategy.contains("SizeTieredCompactionStrategy") {
        let max_threshold = match table.compaction_options().get("max_threshold") {
            None => DEFAULT_STCS_MAX_THRESHOLD,
            Some(v) => v.trim().parse::<i64>().ok()?,
        };
        if max_threshold > DEFAULT_STCS_MAX_THRESHOLD {
            return Some(
                table_finding(
                    keyspace,
                    table,
                    format!("High STCS Max Threshold in {}.{}", keyspace.name, table.name),
                    format!("STCS max_threshold is {}, default is 32", max_threshold),
                    Severity::Info,
                )
                .with_impact("May delay compaction and affect read performance")
                .with_recommendation("Consider if high threshold is necessary")
                .with_context("max_threshold", max_threshold),
            );
        }
    }

    None
}

fn check_caching(keyspace: &Keyspace, table: &Table) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    let caching = table.caching_options();

    let rows = caching.get("rows_per_partition").map(String::as_str).unwrap_or("NONE");
    if rows != "NONE" {
        recommendations.push(
            table_finding(
                keyspace,
                table,
                format!("Row Cache Enabled in {}.{}", keyspace.name, table.name),
                "Table has row cache enabled",
                Severity::Info,
            )
            .with_impact("Row cache can cause GC pressure in modern Cassandra versions")
            .with_recommendation("Consider disabling row cache unless specifically needed")
            .with_context("row_cache_setting", rows),
        );
    }

    if caching.get("keys").map(String::as_str) == Some("NONE") {
        recommendations.push(
            table_finding(
                keyspace,
                table,
                format!("Key Cache Disabled in {}.{}", keyspace.name, table.name),
                "Table has key cache disabled",
                Severity::Warning,
            )
            .with_impact("Disabling key cache can hurt read performance")
            .with_recommendation("Enable key cache unless there's a specific reason to disable it"),
        );
    }

    recommendations
}

fn check_bloom_filter(keyspace: &Keyspace, table: &Table) -> Option<Recommendation> {
    let fp_chance = table.bloom_filter_fp_chance();

    if fp_chance > 0.1 {
        Some(
            table_finding(
                keyspace,
                table,
                format!("High Bloom Filter FP Chance in {}.{}", keyspace.name, table.name),
                format!("Bloom filter false positive chance is {}", fp_chance),
                Severity::Warning,
            )
            .with_impact("High FP chance reduces bloom filter effectiveness")
            .with_recommendation("Consider lowering bloom_filter_fp_chance to 0.01 or 0.1")
            .with_context("current_fp_chance", fp_chance),
        )
    } else if fp_chance < 0.001 {
        Some(
            table_finding(
                keyspace,
                table,
                format!("Very Low Bloom Filter FP Chance in {}.{}", keyspace.name, table.name),
                format!("Bloom filter false positive chance is {}", fp_chance),
                Severity::Info,
            )
            .with_impact("Very low FP chance uses more memory for bloom filters")
            .with_recommendation("Consider if such low FP chance is necessary")
            .with_context("current_fp_chance", fp_chance),
        )
    } else {
        None
    }
}

fn check_gc_grace(keyspace: &Keyspace, table: &Table) -> Option<Recommendation> {
    let gc_grace = table.gc_grace;

    if gc_grace > DEFAULT_GC_GRACE_SECONDS {
        let days = gc_grace as f64 / 86_400.0;
        Some(
            table_finding(
                keyspace,
                table,
                format!("Long GC Grace Period in {}.{}", keyspace.name, table.name),
                format!("GC grace seconds is {} ({:.1} days)", gc_grace, days),
                Severity::Info,
            )
            .with_impact("Long GC grace periods delay tombstone cleanup")
            .with_recommendation("Consider if long GC grace is necessary for your repair schedule")
            .with_context("gc_grace_seconds", gc_grace)
            .with_context("gc_grace_days", days),
        )
    } else if gc_grace < SHORT_GC_GRACE_SECONDS {
        let hours = gc_grace as f64 / 3600.0;
        Some(
            table_finding(
                keyspace,
                table,
                format!("Short GC Grace Period in {}.{}", keyspace.name, table.name),
                format!("GC grace seconds is {} ({:.1} hours)", gc_grace, hours),
                Severity::Warning,
            )
            .with_impact("Short GC grace can cause zombie data if repairs don't complete in time")
            .with_recommendation("Ensure GC grace is longer than your repair interval")
            .with_context("gc_grace_seconds", gc_grace)
            .with_context("gc_grace_hours", hours),
        )
    } else {
        None
    }
}

fn speculative_retry_enabled(value: &str) -> bool {
    // NEVER from 4.0 on, NONE before
    !value.is_empty()
        && !matches!(
            value.to_uppercase().as_str(),
            "NEVER" | "NONE" | "DISABLED"
        )
}

fn analyze_speculative_retry(state: &ClusterState) -> Vec<Recommendation> {
    let mut by_setting: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (keyspace, table) in user_tables(state) {
        let retry = table.speculative_retry();
        if speculative_retry_enabled(retry) {
            by_setting
                .entry(retry.to_string())
                .or_default()
                .push(format!("{}.{}", keyspace.name, table.name));
        }
    }

    let mut recommendations = Vec::new();
    for (setting, tables) in by_setting {
        if tables.len() > SPECULATIVE_RETRY_GROUP_SIZE {
            recommendations.push(
                Recommendation::new(
                    "Speculative Retry Enabled (Multiple Tables)",
                    format!(
                        "{} tables have speculative_retry set to '{}'",
                        tables.len(),
                        setting
                    ),
                    Severity::Warning,
                    CATEGORY_DATAMODEL,
                )
                .with_impact(SPECULATIVE_RETRY_IMPACT)
                .with_recommendation(SPECULATIVE_RETRY_ADVICE)
                .with_current_value(format!("{} tables affected", tables.len()))
                .with_context("tables_affected", tables)
                .with_context("speculative_retry", setting)
                .with_recommended_value("NEVER")
                .with_context("group_summary", true)
                .with_context("appendix_details", "speculative_retry_tables"),
            );
        } else {
            for table in tables {
                recommendations.push(
                    Recommendation::new(
                        "Speculative Retry Enabled",
                        format!(
                            "Table {} has speculative_retry set to '{}'",
                            table, setting
                        ),
                        Severity::Warning,
                        CATEGORY_DATAMODEL,
                    )
                    .with_impact(SPECULATIVE_RETRY_IMPACT)
                    .with_recommendation(SPECULATIVE_RETRY_ADVICE)
                    .with_current_value(format!("speculative_retry={}", setting))
                    .with_context("speculative_retry", setting.clone())
                    .with_recommended_value("NEVER"),
                );
            }
        }
    }
    recommendations
}
