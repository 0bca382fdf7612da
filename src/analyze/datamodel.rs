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

//! Schema and data model analysis.
//!
//! Combines keyspace replication, per-table metric series (bloom filters,
//! compression, coordinator traffic) and schema text checks. Table level
//! schema rules come from [`TableAnalyzer`] and are merged into this section.
//!
//! Per-table metric series are matched on their `keyspace` and `scope` labels
//! and reduced to their average.

use crate::analyze::analyzer::{AnalysisOutcome, AnalysisResult, SectionAnalyzer};
use crate::analyze::common::{is_system_keyspace, BYTES_PER_MB, CATEGORY_DATAMODEL, SECTION_DATAMODEL};
use crate::analyze::table::TableAnalyzer;
use crate::config::Thresholds;
use crate::model::{ClusterState, MetricData, Recommendation, Severity};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

static WITH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\s+WITH\s+)").expect("valid regex"));

/// Table names that tend to accumulate unbounded collections.
const GROWING_TABLE_NAMES: [&str; 4] = ["events", "logs", "history", "timeline"];

const LARGE_BLOOM_FILTER_BYTES: f64 = 100.0 * BYTES_PER_MB;

#[derive(Debug, Default, Clone, Copy)]
pub struct DataModelAnalyzer;

impl SectionAnalyzer for DataModelAnalyzer {
    fn section(&self) -> &'static str {
        SECTION_DATAMODEL
    }

    fn analyze(&self, state: &ClusterState, thresholds: &Thresholds) -> AnalysisOutcome {
        let mut recommendations = Vec::new();
        recommendations.extend(analyze_replication(state, thresholds));
        recommendations.extend(analyze_bloom_filters(state));
        recommendations.extend(analyze_compression(state));
        recommendations.extend(analyze_compaction_strategies(state));
        recommendations.extend(analyze_secondary_indexes(state));
        recommendations.extend(analyze_collections(state));
        recommendations.extend(analyze_materialized_views(state));

        let tables = TableAnalyzer.analyze(state, thresholds)?;
        debug!(
            "merging {} table findings into the data model section",
            tables.recommendations.len()
        );
        recommendations.extend(tables.recommendations);

        recommendations.extend(analyze_unused_tables(state));

        let count = recommendations.len();
        Ok(AnalysisResult::new(recommendations)
            .with_summary("total_keyspaces", state.keyspaces.len())
            .with_summary("total_tables", state.total_tables())
            .with_summary("table_analysis", Value::Object(tables.summary))
            .with_summary("recommendations_count", count))
    }
}

fn datamodel(title: impl Into<String>, description: impl Into<String>, severity: Severity) -> Recommendation {
    Recommendation::new(title, description, severity, CATEGORY_DATAMODEL)
}

/// Per-table series outside system keyspaces, as `(keyspace, table, average)`.
fn table_series(series: &[MetricData]) -> impl Iterator<Item = (String, String, f64)> + '_ {
    series.iter().filter_map(|m| {
        let keyspace = m.label("keyspace").unwrap_or("unknown");
        if is_system_keyspace(keyspace) {
            return None;
        }
        let table = m.label("scope").unwrap_or("unknown");
        Some((keyspace.to_string(), table.to_string(), m.average()?))
    })
}

fn table_metric(state: &ClusterState, metric: &str, keyspace: &str, table: &str) -> f64 {
    state
        .metric(metric)
        .iter()
        .find(|m| m.label("keyspace") == Some(keyspace) && m.label("scope") == Some(table))
        .and_then(MetricData::average)
        .unwrap_or(0.0)
}

fn analyze_replication(state: &ClusterState, thresholds: &Thresholds) -> Vec<Recommendation> {
    let min_rf = thresholds.min_replication_factor;
    state
        .keyspaces
        .values()
        .filter(|ks| !is_system_keyspace(&ks.name))
        .filter_map(|ks| {
            let rf = ks.replication_factor();
            (rf < min_rf).then(|| {
                datamodel(
                    format!("Low Replication Factor for {}", ks.name),
                    format!("Keyspace {} has replication factor {}", ks.name, rf),
                    Severity::Warning,
                )
                .with_impact("Reduced availability and data durability")
                .with_recommendation(format!(
                    "Increase replication factor to at least {}",
                    min_rf
                ))
                .with_keyspace(ks.name.clone())
                .with_context("current_rf", rf)
                .with_context("recommended_rf", min_rf)
            })
        })
        .collect()
}

fn analyze_bloom_filters(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for (keyspace, table, ratio) in table_series(state.metric("bloom_filter_false_ratio")) {
        let (title, severity, impact, advice) = if ratio > 0.1 {
            (
                "High Bloom Filter False Positive Rate",
                Severity::Warning,
                "Unnecessary disk reads and increased latency",
                "Consider rebuilding bloom filters or adjusting bloom_filter_fp_chance",
            )
        } else if ratio > 0.05 {
            (
                "Moderate Bloom Filter False Positive Rate",
                Severity::Info,
                "Some unnecessary disk reads",
                "Monitor bloom filter performance and consider tuning",
            )
        } else {
            continue;
        };
        recommendations.push(
            datamodel(
                format!("{}: {}.{}", title, keyspace, table),
                format!(
                    "Table has {:.2}% bloom filter false positive rate",
                    ratio * 100.0
                ),
                severity,
            )
            .with_impact(impact)
            .with_recommendation(advice)
            .with_keyspace(keyspace)
            .with_table(table)
            .with_context("false_positive_rate", ratio),
        );
    }

    let large: Vec<Value> = table_series(state.metric("bloom_filter_disk_space"))
        .filter(|(_, _, bytes)| *bytes > LARGE_BLOOM_FILTER_BYTES)
        .map(|(keyspace, table, bytes)| {
            json!({
                "keyspace": keyspace,
                "table": table,
                "size_mb": bytes / BYTES_PER_MB,
            })
        })
        .collect();
    if !large.is_empty() {
        recommendations.push(
            datamodel(
                "Tables with Large Bloom Filters",
                format!("Found {} tables with bloom filters > 100MB", large.len()),
                Severity::Info,
            )
            .with_impact("Significant memory and disk usage for bloom filters")
            .with_recommendation("Consider if bloom filter settings are optimal for these large tables")
            .with_context("large_bloom_tables", large),
        );
    }

    recommendations
}

fn analyze_compression(state: &ClusterState) -> Vec<Recommendation> {
    table_series(state.metric("compression_ratio"))
        .filter_map(|(keyspace, table, ratio)| {
            let (title, severity, impact, advice) = if ratio < 0.3 {
                (
                    "Poor Compression Ratio",
                    Severity::Warning,
                    "Inefficient storage usage and increased I/O",
                    "Consider different compression algorithm or review data patterns",
                )
            } else if ratio > 0.9 {
                (
                    "Minimal Compression Benefit",
                    Severity::Info,
                    "Little storage benefit from compression",
                    "Consider disabling compression or using different algorithm",
                )
            } else {
                return None;
            };
            Some(
                datamodel(
                    format!("{}: {}.{}", title, keyspace, table),
                    format!("Table has {:.1}% compression ratio", ratio * 100.0),
                    severity,
                )
                .with_impact(impact)
                .with_recommendation(advice)
                .with_keyspace(keyspace)
                .with_table(table)
                .with_context("compression_ratio", ratio),
            )
        })
        .collect()
}

fn analyze_compaction_strategies(state: &ClusterState) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for ks in state.keyspaces.values().filter(|ks| !is_system_keyspace(&ks.name)) {
        for table in &ks.tables {
            let strategy = &table.compaction_strategy;
            if strategy.contains("SizeTieredCompactionStrategy") {
                let reads = table_metric(state, "table_coordinator_reads", &ks.name, &table.name);
                let writes = table_metric(state, "table_coordinator_writes", &ks.name, &table.name);
                if reads <= 0.0 || writes <= 0.0 {
                    continue;
                }
                let ratio = reads / writes;
                if ratio > 10.0 {
                    recommendations.push(
                        datamodel(
                            format!("Suboptimal Compaction Strategy: {}.{}", ks.name, table.name),
                            format!("Read-heavy table using STCS (R/W ratio: {:.1})", ratio),
                            Severity::Info,
                        )
                        .with_impact("Suboptimal read performance due to multiple SSTables")
                        .with_recommendation("Consider LeveledCompactionStrategy for read-heavy workloads")
                        .with_keyspace(ks.name.clone())
                        .with_table(table.name.clone())
                        .with_context("current_strategy", "SizeTieredCompactionStrategy")
                        .with_context("read_write_ratio", ratio),
                    );
                }
            } else if strategy.contains("TimeWindowCompactionStrategy") {
                recommendations.push(
                    datamodel(
                        format!("Verify TWCS Usage: {}.{}", ks.name, table.name),
                        "Table uses TimeWindowCompactionStrategy",
                        Severity::Info,
                    )
                    .with_impact("TWCS should only be used for time-series data")
                    .with_recommendation("Ensure table contains time-series data with time-based queries")
                    .with_keyspace(ks.name.clone())
                    .with_table(table.name.clone())
                    .with_context("current_strategy", "TimeWindowCompactionStrategy"),
                );
            }
        }
    }

    recommendations
}

/// User tables whose CQL, lowercased, satisfies `pred`, grouped by keyspace.
fn tables_where(state: &ClusterState, pred: impl Fn(&str) -> bool) -> BTreeMap<String, Vec<String>> {
    let mut found: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for ks in state.keyspaces.values().filter(|ks| !is_system_keyspace(&ks.name)) {
        for table in ks.tables.iter().filter(|t| !t.cql.is_empty()) {
            if pred(&table.cql.to_lowercase()) {
                found.entry(ks.name.clone()).or_default().push(table.name.clone());
            }
        }
    }
    found
}

fn analyze_secondary_indexes(state: &ClusterState) -> Option<Recommendation> {
    let indexed = tables_where(state, |cql| {
        cql.contains("create index") || cql.contains("secondary index")
    });
    let total: usize = indexed.values().map(Vec::len).sum();
    if total == 0 {
        return None;
    }

    let by_keyspace: serde_json::Map<String, Value> =
        indexed.into_iter().map(|(ks, tables)| (ks, json!(tables))).collect();
    Some(
        datamodel(
            "Secondary Indexes Detected",
            format!("Found {} tables with secondary indexes", total),
            Severity::Warning,
        )
        .with_impact("Secondary indexes can severely impact write performance and cluster stability")
        .with_recommendation("Consider denormalizing data or using application-level indexing instead")
        .with_context("total_indexes", total)
        .with_context("indexes_by_keyspace", Value::Object(by_keyspace)),
    )
}

fn analyze_collections(state: &ClusterState) -> Vec<Recommendation> {
    let mut details = Vec::new();
    let mut growing = Vec::new();

    for ks in state.keyspaces.values().filter(|ks| !is_system_keyspace(&ks.name)) {
        for table in ks.tables.iter().filter(|t| t.has_collections()) {
            let full_name = format!("{}.{}", ks.name, table.name);
            details.push(json!({
                "table": full_name,
                "frozen": table.has_frozen_collections(),
                "schema": format_cql_schema(&table.cql),
            }));
            if GROWING_TABLE_NAMES.contains(&table.name.as_str()) {
                growing.push(full_name);
            }
        }
    }

    let mut recommendations = Vec::new();
    if !growing.is_empty() {
        recommendations.push(
            datamodel(
                "Collections in Potentially Large Tables",
                format!(
                    "Found {} tables with collections that may grow large",
                    growing.len()
                ),
                Severity::Info,
            )
            .with_impact("Large collections can cause performance issues and memory pressure")
            .with_recommendation(
                "Monitor collection sizes and consider time-based partitioning or separate tables",
            )
            .with_context("tables_of_concern", growing),
        );
    }
    if !details.is_empty() {
        let names: Vec<Value> = details.iter().map(|d| d["table"].clone()).collect();
        recommendations.push(
            datamodel(
                "Collection Types Usage",
                format!("Found {} tables using collection types", details.len()),
                Severity::Info,
            )
            .with_impact("Collections are useful but should be kept reasonably sized")
            .with_recommendation("Keep collections under 100KB and monitor their growth")
            .with_context("collection_tables", names)
            .with_context("collection_table_details", details),
        );
    }
    recommendations
}

fn analyze_materialized_views(state: &ClusterState) -> Option<Recommendation> {
    let views: Vec<String> = tables_where(state, |cql| cql.contains("materialized view"))
        .into_iter()
        .flat_map(|(ks, tables)| tables.into_iter().map(move |t| format!("{}.{}", ks, t)))
        .collect();
    if views.is_empty() {
        return None;
    }
    Some(
        datamodel(
            "Materialized Views Detected",
            format!("Found {} materialized views", views.len()),
            Severity::Critical,
        )
        .with_impact("Materialized views are experimental and can cause serious performance issues")
        .with_recommendation("Consider denormalization or application-level view maintenance instead")
        .with_context("materialized_views", views),
    )
}

/// Reads and writes from coordinator metrics. Without those series nothing can
/// be said about activity, so the check stays silent.
fn analyze_unused_tables(state: &ClusterState) -> Vec<Recommendation> {
    let reads = state.metric("table_coordinator_reads");
    let writes = state.metric("table_coordinator_writes");
    if reads.is_empty() && writes.is_empty() {
        return Vec::new();
    }

    let all_tables: BTreeSet<String> = state
        .keyspaces
        .values()
        .filter(|ks| !is_system_keyspace(&ks.name))
        .flat_map(|ks| ks.tables.iter().map(move |t| format!("{}.{}", ks.name, t.name)))
        .collect();

    let mut active = BTreeSet::new();
    let mut idle_seen = BTreeSet::new();
    let mut low_activity = Vec::new();
    for (series, count_key, activity) in [(reads, "reads", "no_reads"), (writes, "writes", "no_writes")] {
        for (keyspace, table, value) in table_series(series) {
            let key = format!("{}.{}", keyspace, table);
            if value > 0.0 {
                active.insert(key);
            } else if idle_seen.insert(key.clone()) {
                low_activity.push(json!({
                    "table": key,
                    (count_key): value,
                    "activity_type": activity,
                }));
            }
        }
    }

    let unused: Vec<String> = all_tables
        .into_iter()
        .filter(|t| !active.contains(t) && !idle_seen.contains(t))
        .collect();

    let mut recommendations = Vec::new();
    if !unused.is_empty() {
        recommendations.push(
            datamodel(
                "Unused Tables Detected",
                format!("Found {} tables with no read or write activity", unused.len()),
                Severity::Warning,
            )
            .with_impact("Unused tables consume disk space and backup resources")
            .with_recommendation(
                "Consider dropping unused tables after verifying they're no longer needed",
            )
            .with_context("unused_tables", unused),
        );
    }
    if !low_activity.is_empty() {
        recommendations.push(
            datamodel(
                "Low Activity Tables",
                format!("Found {} tables with minimal activity", low_activity.len()),
                Severity::Info,
            )
            .with_impact("Low-activity tables may indicate unused or rarely used data")
            .with_recommendation("Review if these tables are still needed or can be archived")
            .with_context("low_activity_tables", low_activity),
        );
    }
    recommendations
}

fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Pretty-prints a CREATE TABLE statement for the report.
///
/// Each table option goes on its own `AND` line, duplicate options keep their
/// first occurrence and `CLUSTERING ORDER` is moved first.
pub fn format_cql_schema(cql: &str) -> String {
    let cql = unescape_html(cql);
    let Some(with) = WITH_RE.find(&cql) else {
        return cql;
    };
    let head = &cql[..with.end()];
    let tail: Vec<char> = cql[with.end()..].chars().collect();

    let mut options: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut i = 0;
    while i < tail.len() {
        let c = tail[i];
        let escaped = i > 0 && tail[i - 1] == '\\';
        match quote {
            Some(q) if c == q && !escaped => quote = None,
            Some(_) => {}
            None if (c == '\'' || c == '"') && !escaped => quote = Some(c),
            None => match c {
                '(' | '{' => depth += 1,
                ')' | '}' => depth -= 1,
                ';' if depth == 0 => break,
                _ => {}
            },
        }

        let at_and = quote.is_none()
            && depth == 0
            && c.is_whitespace()
            && tail.len() >= i + 5
            && tail[i + 1..i + 4].iter().collect::<String>().eq_ignore_ascii_case("and")
            && tail[i + 4].is_whitespace();
        if at_and {
            options.push(std::mem::take(&mut current).trim().to_string());
            i += 4;
            continue;
        }
        current.push(c);
        i += 1;
    }
    let last = current.trim();
    if !last.is_empty() {
        options.push(last.to_string());
    }

    let mut seen = BTreeSet::new();
    let mut clustering_order = None;
    let mut rest = Vec::new();
    for option in options.into_iter().filter(|o| !o.is_empty()) {
        let name = option.split('=').next().unwrap_or("").trim().to_uppercase();
        if !seen.insert(name) {
            continue;
        }
        if option.to_uppercase().contains("CLUSTERING ORDER") {
            clustering_order = Some(option);
        } else {
            rest.push(option);
        }
    }
    let ordered: Vec<String> = clustering_order.into_iter().chain(rest).collect();

    let mut out = format!("{}{}", head, ordered.join("\n    AND "));
    if !out.trim_end().ends_with(';') {
        out.push(';');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Keyspace, Table};

    fn run(state: &ClusterState) -> AnalysisResult {
        DataModelAnalyzer
            .analyze(state, &Thresholds::default())
            .unwrap()
    }

    fn find<'a>(result: &'a AnalysisResult, title: &str) -> Option<&'a Recommendation> {
        result.recommendations.iter().find(|r| r.title == title)
    }

    fn table_series_of(keyspace: &str, table: &str, values: &[f64]) -> MetricData {
        MetricData::new("m")
            .with_label("keyspace", keyspace)
            .with_label("scope", table)
            .with_values(values)
    }

    #[test]
    fn test_low_replication_factor() {
        let state = ClusterState::new("c")
            .with_keyspace(Keyspace::new("demo", "SimpleStrategy").with_option("replication_factor", "1"))
            .with_keyspace(Keyspace::new("system_auth", "SimpleStrategy").with_option("replication_factor", "1"));

        let result = run(&state);
        let rec = find(&result, "Low Replication Factor for demo").unwrap();
        assert_eq!(rec.severity, Severity::Warning);
        assert_eq!(rec.context.get("current_rf"), Some(json!(1)));
        assert_eq!(rec.recommendation.as_deref(), Some("Increase replication factor to at least 3"));
        assert!(find(&result, "Low Replication Factor for system_auth").is_none());
        assert_eq!(result.summary["total_keyspaces"], json!(2));
    }

    #[test]
    fn test_bloom_filter_and_compression_series() {
        let state = ClusterState::new("c")
            .with_metric(
                "bloom_filter_false_ratio",
                vec![
                    table_series_of("app", "users", &[0.2]),
                    table_series_of("app", "orders", &[0.06]),
                    table_series_of("system", "peers", &[0.5]),
                ],
            )
            .with_metric(
                "bloom_filter_disk_space",
                vec![table_series_of("app", "users", &[200.0 * BYTES_PER_MB])],
            )
            .with_metric("compression_ratio", vec![table_series_of("app", "blobs", &[0.95])]);

        let result = run(&state);
        let high = find(&result, "High Bloom Filter False Positive Rate: app.users").unwrap();
        assert_eq!(high.description, "Table has 20.00% bloom filter false positive rate");
        assert!(find(&result, "Moderate Bloom Filter False Positive Rate: app.orders").is_some());
        assert!(!result.recommendations.iter().any(|r| r.title.contains("system.peers")));

        let large = find(&result, "Tables with Large Bloom Filters").unwrap();
        assert_eq!(
            large.context.get("large_bloom_tables"),
            Some(json!([{"keyspace": "app", "table": "users", "size_mb": 200.0}]))
        );
        let minimal = find(&result, "Minimal Compression Benefit: app.blobs").unwrap();
        assert_eq!(minimal.description, "Table has 95.0% compression ratio");
    }

    #[test]
    fn test_schema_text_checks() {
        let ks = Keyspace::new("app", "SimpleStrategy")
            .with_option("replication_factor", "3")
            .with_table(Table::new(
                "app",
                "events",
                "CREATE TABLE app.events (id int PRIMARY KEY, tags set<text>) WITH speculative_retry = 'NONE'",
            ))
            .with_table(Table::new(
                "app",
                "by_tag",
                "CREATE MATERIALIZED VIEW app.by_tag AS SELECT * FROM app.events",
            ))
            .with_table(
                Table::new("app", "metrics", "CREATE TABLE app.metrics (id int PRIMARY KEY) WITH speculative_retry = 'NONE'")
                    .with_compaction_strategy("TimeWindowCompactionStrategy"),
            );
        let result = run(&ClusterState::new("c").with_keyspace(ks));

        let views = find(&result, "Materialized Views Detected").unwrap();
        assert_eq!(views.severity, Severity::Critical);
        assert_eq!(views.context.get("materialized_views"), Some(json!(["app.by_tag"])));
        assert!(find(&result, "Collections in Potentially Large Tables").is_some());
        let usage = find(&result, "Collection Types Usage").unwrap();
        assert_eq!(usage.context.get("collection_tables"), Some(json!(["app.events"])));
        assert!(find(&result, "Verify TWCS Usage: app.metrics").is_some());
        // no coordinator metrics, no activity verdict
        assert!(find(&result, "Unused Tables Detected").is_none());
    }

    #[test]
    fn test_collections_come_from_column_types() {
        let ks = Keyspace::new("app", "SimpleStrategy")
            .with_option("replication_factor", "3")
            .with_table(Table::new(
                "app",
                "notes",
                "CREATE TABLE app.notes (id int PRIMARY KEY, body text) WITH comment = 'was list<text> before v2' AND speculative_retry = 'NONE'",
            ))
            .with_table(Table::new(
                "app",
                "profiles",
                "CREATE TABLE app.profiles (id int PRIMARY KEY, tags frozen<set<text>>) WITH speculative_retry = 'NONE'",
            ));
        let result = run(&ClusterState::new("c").with_keyspace(ks));

        let usage = find(&result, "Collection Types Usage").unwrap();
        assert_eq!(usage.context.get("collection_tables"), Some(json!(["app.profiles"])));
        let details = usage.context.get("collection_table_details").unwrap();
        assert_eq!(details[0]["frozen"], json!(true));
    }

    #[test]
    fn test_read_heavy_stcs_and_activity() {
        let ks = Keyspace::new("app", "SimpleStrategy")
            .with_option("replication_factor", "3")
            .with_table(
                Table::new("app", "lookups", "CREATE TABLE app.lookups (id int PRIMARY KEY) WITH speculative_retry = 'NONE'")
                    .with_compaction_strategy("SizeTieredCompactionStrategy"),
            )
            .with_table(Table::new("app", "idle", "CREATE TABLE app.idle (id int PRIMARY KEY) WITH speculative_retry = 'NONE'"))
            .with_table(Table::new("app", "dead", "CREATE TABLE app.dead (id int PRIMARY KEY) WITH speculative_retry = 'NONE'"));
        let state = ClusterState::new("c")
            .with_keyspace(ks)
            .with_metric(
                "table_coordinator_reads",
                vec![
                    table_series_of("app", "lookups", &[500.0]),
                    table_series_of("app", "idle", &[0.0]),
                ],
            )
            .with_metric("table_coordinator_writes", vec![table_series_of("app", "lookups", &[20.0])]);

        let result = run(&state);
        let stcs = find(&result, "Suboptimal Compaction Strategy: app.lookups").unwrap();
        assert_eq!(stcs.description, "Read-heavy table using STCS (R/W ratio: 25.0)");

        let unused = find(&result, "Unused Tables Detected").unwrap();
        assert_eq!(unused.context.get("unused_tables"), Some(json!(["app.dead"])));
        let low = find(&result, "Low Activity Tables").unwrap();
        assert_eq!(
            low.context.get("low_activity_tables"),
            Some(json!([{"table": "app.idle", "reads": 0.0, "activity_type": "no_reads"}]))
        );
    }

    #[test]
    fn test_table_findings_are_merged() {
        let ks = Keyspace::new("app", "SimpleStrategy")
            .with_option("replication_factor", "3")
            .with_table(Table::new("app", "t", "CREATE TABLE app.t (id int PRIMARY KEY)").with_gc_grace(60));
        let result = run(&ClusterState::new("c").with_keyspace(ks));
        assert!(find(&result, "Short GC Grace Period in app.t").is_some());
        assert_eq!(result.summary["table_analysis"]["total_tables"], json!(1));
    }

    #[test]
    fn test_format_cql_schema() {
        let cql = "CREATE TABLE app.t (id int, ts timestamp, PRIMARY KEY (id, ts)) WITH comment = 'a AND b' \
                   AND gc_grace_seconds = 100 AND CLUSTERING ORDER BY (ts DESC) AND gc_grace_seconds = 200;";
        assert_eq!(
            format_cql_schema(cql),
            "CREATE TABLE app.t (id int, ts timestamp, PRIMARY KEY (id, ts)) WITH CLUSTERING ORDER BY (ts DESC)\n    \
             AND comment = 'a AND b'\n    AND gc_grace_seconds = 100;"
        );
        assert_eq!(
            format_cql_schema("CREATE TABLE app.t (m map&lt;text, text&gt; PRIMARY KEY)"),
            "CREATE TABLE app.t (m map<text, text> PRIMARY KEY)"
        );
    }
}
