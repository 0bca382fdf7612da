//! Markdown rendering of an [`AnalysisReport`].
//!
//! Per-node findings are folded with [`aggregate_recommendations`] before
//! rendering. Node lists of folded findings go to an appendix.

use crate::model::node::{keys, value_to_string};
use crate::model::{ClusterState, Node, Recommendation, Severity};
use crate::report::aggregate::{
    aggregate_recommendations, format_number, section_info, title_case, AffectedNode,
    AggregatedRecommendation, RecommendationsByPriority, SectionInfo,
};
use crate::report::report::{AnalysisReport, SectionResult};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter, Result as FmtResult};

const RULE: &str = "---";

/// Context keys that carry the per-node current value of a setting, in
/// lookup order. The concurrency keys only apply to their own findings.
const CURRENT_VALUE_KEYS: [(&str, Option<&str>); 6] = [
    ("memtable_allocation_type", None),
    ("memtable_flush_writers", None),
    ("concurrent_reads", Some("Low Concurrent Reads")),
    ("concurrent_writes", Some("Low Concurrent Writes")),
    ("native_transport_max_threads", None),
    ("sysctl_value", None),
];

struct RenderedSection<'a> {
    name: &'a str,
    info: SectionInfo,
    result: &'a SectionResult,
    aggregated: Vec<AggregatedRecommendation>,
}

/// Renders through [`Display`].
pub struct MarkdownReport<'a> {
    report: &'a AnalysisReport,
    generated: DateTime<Utc>,
    sections: Vec<RenderedSection<'a>>,
}

impl<'a> MarkdownReport<'a> {
    pub fn new(report: &'a AnalysisReport, generated: DateTime<Utc>) -> Self {
        let mut sections: Vec<RenderedSection<'a>> = report
            .analysis_results
            .iter()
            .map(|s| RenderedSection {
                name: &s.section,
                info: section_info(&s.section),
                result: &s.result,
                aggregated: aggregate_recommendations(s.result.recommendations()),
            })
            .collect();
        sections.sort_by_key(|s| s.info.order);
        Self {
            report,
            generated,
            sections,
        }
    }

    fn state(&self) -> &ClusterState {
        &self.report.state
    }

    fn write_header(&self, f: &mut Formatter<'_>) -> FmtResult {
        let info = &self.report.cluster_info;
        writeln!(f, "# Cassandra Cluster Health Assessment")?;
        writeln!(f)?;
        writeln!(f, "**Cluster:** {}  ", info.cluster_name)?;
        writeln!(f, "**Organization:** {}  ", info.organization)?;
        writeln!(f, "**Generated:** {}", self.generated.to_rfc3339())?;
        writeln!(f)?;
        writeln!(f, "{}", RULE)?;
        writeln!(f)
    }

    fn write_executive_summary(&self, f: &mut Formatter<'_>) -> FmtResult {
        let counts = self.report.severity_counts();
        let state = self.state();
        writeln!(f, "## Executive Summary")?;
        writeln!(f)?;

        if counts.critical > 0 {
            writeln!(f, "### 🔴 **Critical Issues Detected**")?;
            writeln!(f)?;
            writeln!(
                f,
                "Your cluster has **{} critical issue(s)** requiring immediate attention. Critical issues indicate:",
                counts.critical
            )?;
            writeln!(f, "- Severe misconfigurations that could lead to failures")?;
            writeln!(f, "- Resource constraints that may cause node instability")?;
            writeln!(f, "- Configuration conflicts preventing proper cluster operation")?;
            writeln!(f)?;
            writeln!(
                f,
                "**Action Required:** Review critical issues below and implement fixes as soon as possible."
            )?;
        } else if counts.warning > 0 {
            writeln!(f, "### 🟡 **Performance Optimization Needed**")?;
            writeln!(f)?;
            writeln!(
                f,
                "Your cluster has **{} warning(s)** that should be addressed for optimal performance. While not immediately critical, these can lead to:",
                counts.warning
            )?;
            writeln!(f, "- Reduced performance and higher latencies")?;
            writeln!(f, "- Increased operational costs")?;
            writeln!(f, "- Risk of escalation to critical issues")?;
            writeln!(f)?;
            writeln!(f, "**Action Required:** Plan to address these warnings within 1-2 weeks.")?;
        } else {
            writeln!(f, "### ✅ **Healthy Cluster**")?;
            writeln!(f)?;
            writeln!(
                f,
                "Excellent! No critical issues or warnings detected. Your cluster is well-configured and operating within recommended parameters."
            )?;
            writeln!(f)?;
            writeln!(
                f,
                "**Next Steps:** Review informational recommendations for further optimization opportunities."
            )?;
        }
        writeln!(f)?;

        let total = state.total_nodes();
        let active = state.active_nodes();
        let dcs = state.datacenters().len();
        writeln!(f, "### Key Metrics")?;
        writeln!(f)?;
        writeln!(f, "| Metric | Value | Status |")?;
        writeln!(f, "|--------|-------|--------|")?;
        writeln!(
            f,
            "| Total Nodes | {} | {} |",
            total,
            if total >= 3 { "✅ Good" } else { "⚠️ Review" }
        )?;
        writeln!(
            f,
            "| Active Nodes | {} | {} |",
            active,
            if active == total { "✅ All Active" } else { "🔴 Some Down" }
        )?;
        writeln!(
            f,
            "| Datacenters | {} | {} |",
            dcs,
            if dcs > 1 { "✅ Multi-DC" } else { "⚠️ Single DC" }
        )?;
        writeln!(
            f,
            "| Recommendations | {} | {} Critical, {} Warnings, {} Info |",
            counts.total(),
            counts.critical,
            counts.warning,
            counts.info
        )?;
        writeln!(f)?;
        writeln!(f, "{}", RULE)?;
        writeln!(f)
    }

    fn write_findings_summary(&self, f: &mut Formatter<'_>) -> FmtResult {
        let grouped = RecommendationsByPriority::group(
            self.sections
                .iter()
                .filter(|s| s.result.error().is_none())
                .map(|s| (s.name, s.aggregated.as_slice())),
        );

        writeln!(f, "## Summary of Findings")?;
        writeln!(f)?;
        if grouped.is_empty() {
            writeln!(f, "No findings were reported for this cluster.")?;
            writeln!(f)?;
        }

        if !grouped.immediate.is_empty() {
            writeln!(f, "### Immediate Issues")?;
            writeln!(f)?;
            writeln!(
                f,
                "These critical issues require immediate attention to prevent service disruption or data loss."
            )?;
            writeln!(f)?;
            writeln!(f, "| Issue | Section | Description | Action Required |")?;
            writeln!(f, "|-------|---------|-------------|----------------|")?;
            for item in &grouped.immediate {
                let rec = item.recommendation;
                writeln!(
                    f,
                    "| **{}** | {} | {} | {} |",
                    cell(&rec.title),
                    title_case(item.section),
                    cell(&described(rec)),
                    cell(rec.recommendation.as_deref().unwrap_or("Review immediately"))
                )?;
            }
            writeln!(f)?;
        }

        if !grouped.nearterm.is_empty() {
            writeln!(f, "### Near Term Changes")?;
            writeln!(f)?;
            writeln!(f, "These warnings should be addressed within your next maintenance window.")?;
            writeln!(f)?;
            writeln!(f, "| Issue | Section | Description | Priority |")?;
            writeln!(f, "|-------|---------|-------------|----------|")?;
            for item in &grouped.nearterm {
                let rec = item.recommendation;
                writeln!(
                    f,
                    "| **{}** | {} | {} | {} |",
                    cell(&rec.title),
                    title_case(item.section),
                    cell(&described(rec)),
                    rec.severity
                )?;
            }
            writeln!(f)?;
        }

        if !grouped.longterm.is_empty() {
            writeln!(f, "### Long Term Optimizations")?;
            writeln!(f)?;
            writeln!(f, "These informational items represent optimization opportunities.")?;
            writeln!(f)?;
            writeln!(f, "| Optimization | Section | Description | Benefit |")?;
            writeln!(f, "|--------------|---------|-------------|---------|")?;
            for item in &grouped.longterm {
                let rec = item.recommendation;
                writeln!(
                    f,
                    "| {} | {} | {} | {} |",
                    cell(&rec.title),
                    title_case(item.section),
                    cell(&described(rec)),
                    cell(rec.impact.as_deref().unwrap_or("Performance improvement"))
                )?;
            }
            writeln!(f)?;
        }

        writeln!(f, "{}", RULE)?;
        writeln!(f)
    }

    fn write_cluster_overview(&self, f: &mut Formatter<'_>) -> FmtResult {
        let state = self.state();
        writeln!(f, "## Cluster Overview")?;
        writeln!(f)?;
        writeln!(f, "### Topology Summary")?;
        writeln!(f)?;
        writeln!(
            f,
            "Your Cassandra cluster consists of {} nodes distributed across {} datacenter(s).",
            state.total_nodes(),
            state.datacenters().len()
        )?;
        writeln!(f)?;

        if !state.nodes.is_empty() {
            let seeds = seed_hosts(state);
            let mut topology: BTreeMap<String, DcTopology> = BTreeMap::new();
            for node in state.nodes.values() {
                let dc = topology.entry(dc_name(node)).or_default();
                *dc.racks.entry(rack_name(node)).or_default() += 1;
                if is_seed(node, &seeds) {
                    dc.seeds += 1;
                }
                dc.versions.insert(node_version(node));
            }

            writeln!(f, "| Datacenter | Rack Configuration | Total Nodes | Seed Nodes | Versions |")?;
            writeln!(f, "|------------|-------------------|-------------|------------|----------|")?;
            for (dc, topo) in &topology {
                let racks = if topo.racks.len() > 1 {
                    format!(
                        "{} racks ({})",
                        topo.racks.len(),
                        topo.racks
                            .iter()
                            .map(|(rack, count)| format!("{}: {}", rack, count))
                            .collect::<Vec<String>>()
                            .join(", ")
                    )
                } else {
                    topo.racks.keys().cloned().collect::<Vec<String>>().join("")
                };
                writeln!(
                    f,
                    "| {} | {} | {} | {} | {} |",
                    cell(dc),
                    cell(&racks),
                    topo.racks.values().sum::<usize>(),
                    topo.seeds,
                    cell(&topo.versions.iter().cloned().collect::<Vec<String>>().join(", "))
                )?;
            }
            writeln!(f)?;

            let down = state.total_nodes() - state.active_nodes();
            if down == 0 {
                writeln!(f, "**Cluster Health**: ✅ All nodes active")?;
            } else {
                writeln!(f, "**Cluster Health**: ⚠️ {} node(s) down", down)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "{}", RULE)?;
        writeln!(f)?;
        writeln!(
            f,
            "_**Best Practice**: Each datacenter should have at least 2 seed nodes for optimal cluster discovery and gossip propagation. Ensure seed nodes are well-distributed across racks._"
        )?;
        writeln!(f)?;
        writeln!(f, "{}", RULE)?;
        writeln!(f)?;

        writeln!(f, "### Keyspaces")?;
        writeln!(f)?;
        if !state.keyspaces.is_empty() {
            let app_keyspaces = state
                .keyspaces
                .keys()
                .filter(|name| !name.starts_with("system"))
                .count();
            writeln!(
                f,
                "Your cluster contains **{} application keyspace(s)** storing business data.",
                app_keyspaces
            )?;
            writeln!(f)?;
            writeln!(f, "| Keyspace | Tables | Type |")?;
            writeln!(f, "|----------|--------|------|")?;
            for (name, keyspace) in &state.keyspaces {
                writeln!(
                    f,
                    "| {} | {} | {} |",
                    cell(name),
                    keyspace.tables.len(),
                    if name.starts_with("system") { "System" } else { "Application" }
                )?;
            }
            writeln!(f)?;
        }
        writeln!(f, "{}", RULE)?;
        writeln!(f)
    }

    fn write_section(&self, f: &mut Formatter<'_>, section: &RenderedSection<'_>) -> FmtResult {
        let info = &section.info;
        writeln!(f, "## {} {}", info.icon, info.title)?;
        writeln!(f)?;
        writeln!(f, "{}", info.brief)?;
        writeln!(f)?;

        if let SectionResult::Failed { error } = section.result {
            writeln!(f, "⚠️ **Analysis Error:** {}", error)?;
            writeln!(f)?;
            writeln!(
                f,
                "_Unable to complete {} analysis. This may indicate missing permissions or incomplete data collection._",
                info.title
            )?;
            return writeln!(f);
        }

        if section.aggregated.is_empty() {
            writeln!(
                f,
                "✅ **No issues detected** in {} configuration.",
                info.title.to_lowercase()
            )?;
            return writeln!(f);
        }

        match section.name {
            "security" => {
                writeln!(f, "_Security settings are configured in **cassandra.yaml** unless otherwise noted._")?;
                writeln!(f)?;
                self.write_security_overview(f, section.result)?;
            }
            "extended_configuration" => {
                writeln!(
                    f,
                    "_All extended configuration settings are found in **cassandra.yaml** unless otherwise noted._"
                )?;
                writeln!(f)?;
            }
            _ => {}
        }

        writeln!(f, "| Issue | Severity | Description | Nodes Affected | Current Value | Recommendation |")?;
        writeln!(f, "|-------|----------|-------------|----------------|---------------|----------------|")?;
        for rec in &section.aggregated {
            writeln!(
                f,
                "| {} | {} {} | {} | {} | {} | {} |",
                cell(&rec.title),
                severity_icon(rec.severity),
                rec.severity.as_str().to_uppercase(),
                cell(&described(rec)),
                rec.count,
                cell(rec.current_value.as_deref().unwrap_or("N/A")),
                cell(rec.recommendation.as_deref().unwrap_or("See description"))
            )?;
        }
        writeln!(f)
    }

    fn write_security_overview(&self, f: &mut Formatter<'_>, result: &SectionResult) -> FmtResult {
        let summary = result.result().map(|r| &r.summary);
        let flag = |key: &str| {
            summary
                .and_then(|s| s.get(key))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        };
        let text = |key: &str| {
            summary
                .and_then(|s| s.get(key))
                .map(value_to_string)
                .unwrap_or_else(|| "Unknown".to_string())
        };

        writeln!(f, "### Security Configuration Overview")?;
        writeln!(f)?;
        writeln!(f, "| Security Area | Status | Configuration | Risk Level |")?;
        writeln!(f, "|---------------|--------|---------------|------------|")?;
        for (area, enabled, setting) in [
            ("Authentication", flag("auth_enabled"), text("authenticator")),
            ("Authorization", flag("authz_enabled"), text("authorizer")),
        ] {
            writeln!(
                f,
                "| {} | {} | {} | {} |",
                area,
                if enabled { "✅ Enabled" } else { "❌ Disabled" },
                cell(&setting),
                if enabled { "✅ Low" } else { "🔴 High" }
            )?;
        }
        writeln!(f, "| Encryption in Transit | ❓ Unknown | Not checked | 🟡 Medium |")?;
        writeln!(f, "| Encryption at Rest | ❓ Unknown | Not checked | 🟡 Medium |")?;
        writeln!(f)?;
        writeln!(f, "### Security Issues Detail")?;
        writeln!(f)
    }

    fn write_next_steps(&self, f: &mut Formatter<'_>) -> FmtResult {
        let counts = self.report.severity_counts();
        writeln!(f, "{}", RULE)?;
        writeln!(f)?;
        writeln!(f, "## Next Steps")?;
        writeln!(f)?;
        writeln!(
            f,
            "1. **Address Critical Issues** - Resolve any {} critical items immediately",
            counts.critical
        )?;
        writeln!(
            f,
            "2. **Plan Warning Fixes** - Schedule {} warning items for next maintenance",
            counts.warning
        )?;
        writeln!(
            f,
            "3. **Review Optimizations** - Consider {} informational recommendations",
            counts.info
        )?;
        writeln!(f, "4. **Monitor Progress** - Re-run analysis after changes to verify improvements")?;
        writeln!(f, "5. **Schedule Regular Checks** - Plan quarterly health assessments")?;
        writeln!(f)?;
        writeln!(f, "{}", RULE)?;
        writeln!(f)
    }

    fn write_node_appendix(&self, f: &mut Formatter<'_>) -> FmtResult {
        let state = self.state();
        writeln!(f, "## Appendix: Cluster Node Details")?;
        writeln!(f)?;
        writeln!(f, "This section provides a detailed view of all nodes in the cluster.")?;
        writeln!(f)?;
        if state.nodes.is_empty() {
            return Ok(());
        }

        let seeds = seed_hosts(state);
        let mut rows: Vec<(String, &Node)> = state
            .nodes
            .values()
            .map(|node| {
                let sort_address = node
                    .details
                    .get_str("listen_address")
                    .or_else(|| node.details.get_str(keys::LISTEN_ADDRESS))
                    .or_else(|| node.hostname())
                    .unwrap_or_else(|| node.host_id.clone());
                (
                    format!("{}||{}||{}", node.dc, rack_name(node), sort_address),
                    node,
                )
            })
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        writeln!(f, "| Datacenter | Rack | Node | Version | Seed | Status |")?;
        writeln!(f, "|------------|------|------|---------|------|--------|")?;
        for (_, node) in rows {
            writeln!(
                f,
                "| {} | {} | {} | {} | {} | {} |",
                cell(&dc_name(node)),
                cell(&rack_name(node)),
                cell(&node_display(state, &node.host_id)),
                cell(&node_version(node)),
                if is_seed(node, &seeds) { "✅ Yes" } else { "❌ No" },
                if node.is_active() { "✅ Active" } else { "🔴 Down" }
            )?;
        }
        writeln!(f)
    }

    fn write_issue_appendix(&self, f: &mut Formatter<'_>) -> FmtResult {
        // one entry per section and title, a later aggregate replacing an earlier one
        let mut issues: Vec<(&str, &AggregatedRecommendation)> = Vec::new();
        for section in self.sections.iter().filter(|s| s.result.error().is_none()) {
            for rec in section.aggregated.iter().filter(|r| !r.affected_nodes.is_empty()) {
                match issues
                    .iter_mut()
                    .find(|(name, existing)| *name == section.name && existing.title == rec.title)
                {
                    Some(slot) => slot.1 = rec,
                    None => issues.push((section.name, rec)),
                }
            }
        }
        if issues.is_empty() {
            return Ok(());
        }

        let state = self.state();
        writeln!(f, "## Appendix: Node-Specific Issue Details")?;
        writeln!(f)?;
        writeln!(
            f,
            "This section provides detailed information about which nodes are affected by each issue identified in the report."
        )?;
        writeln!(f)?;

        for (section, rec) in issues {
            let first = rec.affected_nodes.first().map(|n| &n.details);
            let config_location = first.and_then(|d| d.config_location.clone());
            writeln!(f, "### {}", rec.title)?;
            writeln!(f)?;
            writeln!(f, "**Section:** {}  ", title_case(section))?;
            writeln!(f, "**Affected Nodes:** {}  ", rec.affected_nodes.len())?;
            writeln!(
                f,
                "**Configuration:** `{}` - `{}`",
                config_location.as_deref().unwrap_or("cassandra.yaml"),
                parameter_name(&rec.title)
            )?;
            writeln!(f)?;

            if config_location.is_some() {
                writeln!(f, "| Node | Current Value | Recommended |")?;
                writeln!(f, "|------|---------------|-------------|")?;
                for node in &rec.affected_nodes {
                    let recommended = node
                        .details
                        .recommended_value
                        .as_ref()
                        .map(value_to_string)
                        .unwrap_or_else(|| "See recommendation".to_string());
                    writeln!(
                        f,
                        "| {} | {} | {} |",
                        cell(&node_display(state, &node.node_id)),
                        cell(&node_current_value(node, &rec.title)),
                        cell(&recommended)
                    )?;
                }
            } else {
                writeln!(f, "| Node | Details |")?;
                writeln!(f, "|------|---------|")?;
                for node in &rec.affected_nodes {
                    writeln!(
                        f,
                        "| {} | {} |",
                        cell(&node_display(state, &node.node_id)),
                        cell(&context_summary(node))
                    )?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }

    fn write_datamodel_appendix(&self, f: &mut Formatter<'_>) -> FmtResult {
        let Some(result) = self.report.section("datamodel").and_then(SectionResult::result) else {
            return Ok(());
        };
        writeln!(f, "## Appendix: Data Model Details")?;
        writeln!(f)?;

        for rec in &result.recommendations {
            match rec.title.as_str() {
                "Speculative Retry Enabled (Multiple Tables)" => write_speculative_retry(f, rec)?,
                "Unused Tables Detected" => {
                    let tables = string_list(rec.context.get("unused_tables"));
                    if tables.is_empty() {
                        continue;
                    }
                    writeln!(f, "### Unused Tables")?;
                    writeln!(f)?;
                    writeln!(
                        f,
                        "These tables have shown no read or write activity during the analysis period:"
                    )?;
                    writeln!(f)?;
                    writeln!(f, "| Table | Action |")?;
                    writeln!(f, "|-------|--------|")?;
                    for table in tables {
                        writeln!(f, "| {} | Verify if still needed before dropping |", cell(&table))?;
                    }
                    writeln!(f)?;
                }
                "Collection Types Usage" => {
                    let Some(Value::Array(details)) = rec.context.get("collection_table_details") else {
                        continue;
                    };
                    if details.is_empty() {
                        continue;
                    }
                    writeln!(f, "### Tables with Collections")?;
                    writeln!(f)?;
                    writeln!(f, "The following tables use collection types (list, set, map):")?;
                    writeln!(f)?;
                    for detail in &details {
                        let table = detail.get("table").map(value_to_string).unwrap_or_default();
                        let schema = detail.get("schema").map(value_to_string).unwrap_or_default();
                        writeln!(f, "#### {}", table)?;
                        writeln!(f)?;
                        writeln!(f, "```sql")?;
                        writeln!(f, "{}", schema)?;
                        writeln!(f, "```")?;
                        writeln!(f)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn write_configuration_appendix(&self, f: &mut Formatter<'_>) -> FmtResult {
        let Some(result) = self.report.section("configuration").and_then(SectionResult::result) else {
            return Ok(());
        };
        let mismatches: Vec<Value> = result
            .recommendations
            .iter()
            .filter(|r| r.title == "Multiple Configuration Mismatches Detected")
            .filter_map(|r| match r.context.get("mismatches") {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .flatten()
            .collect();
        if mismatches.is_empty() {
            return Ok(());
        }

        writeln!(f, "## Appendix: Configuration Details")?;
        writeln!(f)?;
        writeln!(f, "### Configuration Mismatches")?;
        writeln!(f)?;
        writeln!(
            f,
            "The following configuration parameters have different values across nodes:"
        )?;
        writeln!(f)?;
        for mismatch in &mismatches {
            let setting = mismatch.get("setting").map(value_to_string).unwrap_or_default();
            writeln!(f, "#### {}", setting)?;
            writeln!(f)?;
            writeln!(f, "| Value | Node Count | Example Nodes |")?;
            writeln!(f, "|-------|------------|---------------|")?;
            if let Some(values) = mismatch.get("values").and_then(Value::as_object) {
                for (value, nodes) in values {
                    let nodes = string_list(Some(nodes.clone()));
                    let mut examples = nodes.iter().take(3).cloned().collect::<Vec<String>>().join(", ");
                    if nodes.len() > 3 {
                        examples.push_str("...");
                    }
                    writeln!(f, "| {} | {} | {} |", cell(value), nodes.len(), cell(&examples))?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }

    fn write_footer(&self, f: &mut Formatter<'_>) -> FmtResult {
        let state = self.state();
        writeln!(f, "{}", RULE)?;
        writeln!(f)?;
        writeln!(f, "_Report generated by cassandra-pulse v{}_  ", env!("CARGO_PKG_VERSION"))?;
        let metrics_series: usize = state.metrics.values().map(Vec::len).sum();
        writeln!(
            f,
            "_Collected {} metric series and {} log events_  ",
            format_number(metrics_series as f64),
            format_number(state.log_events.values().map(|h| h.total_count()).sum::<u64>() as f64)
        )?;
        match state.collection_duration_seconds {
            Some(secs) => writeln!(f, "_Analysis completed in {:.2} seconds_", secs),
            None => writeln!(f, "_Analysis completed in N/A seconds_"),
        }
    }
}

impl Display for MarkdownReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        self.write_header(f)?;
        self.write_executive_summary(f)?;
        self.write_findings_summary(f)?;
        self.write_cluster_overview(f)?;
        for section in &self.sections {
            self.write_section(f, section)?;
        }
        self.write_next_steps(f)?;
        self.write_node_appendix(f)?;
        self.write_issue_appendix(f)?;
        self.write_datamodel_appendix(f)?;
        self.write_configuration_appendix(f)?;
        self.write_footer(f)
    }
}

#[derive(Default)]
struct DcTopology {
    racks: BTreeMap<String, usize>,
    seeds: usize,
    versions: BTreeSet<String>,
}

fn write_speculative_retry(f: &mut Formatter<'_>, rec: &Recommendation) -> FmtResult {
    let mut tables = string_list(rec.context.get("tables_affected"));
    if tables.is_empty() {
        return Ok(());
    }
    tables.sort();
    let setting = rec
        .context
        .get("speculative_retry")
        .map(|v| value_to_string(&v))
        .unwrap_or_else(|| "unknown".to_string());

    writeln!(f, "### Tables with Speculative Retry Enabled")?;
    writeln!(f)?;
    writeln!(
        f,
        "The following {} tables have speculative_retry set to '{}':",
        tables.len(),
        setting
    )?;
    writeln!(f)?;
    writeln!(f, "| Table | Current Setting | Recommended |")?;
    writeln!(f, "|-------|-----------------|-------------|")?;
    for table in &tables {
        writeln!(f, "| {} | speculative_retry={} | NEVER |", cell(table), cell(&setting))?;
    }
    writeln!(f)?;
    writeln!(
        f,
        "**Impact:** Speculative retry can cause unnecessary load and is often counterproductive in modern deployments."
    )?;
    writeln!(f)?;
    writeln!(f, "**To fix all tables in a keyspace:**")?;
    writeln!(f, "```cql")?;
    writeln!(f, "-- Example for a specific keyspace")?;
    let sample_keyspace = tables[0].split('.').next().unwrap_or_default().to_string();
    let prefix = format!("{}.", sample_keyspace);
    for table in tables.iter().take(3).filter(|t| t.starts_with(&prefix)) {
        writeln!(f, "ALTER TABLE {} WITH speculative_retry = 'NEVER';", table)?;
    }
    writeln!(f, "-- ... repeat for all affected tables")?;
    writeln!(f, "```")?;
    writeln!(f)
}

/// Markdown table cell text.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// Description with the configuration location appended when known.
fn described(rec: &AggregatedRecommendation) -> String {
    match &rec.context.config_location {
        Some(location) => format!("{} ({})", rec.description, location),
        None => rec.description.clone(),
    }
}

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "🔴",
        Severity::Warning => "🟡",
        Severity::Info => "🔵",
    }
}

fn string_list(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().map(value_to_string).collect(),
        _ => Vec::new(),
    }
}

/// Hosts listed in the first `seeds=` parameter found, without ports.
fn seed_hosts(state: &ClusterState) -> Vec<String> {
    state
        .nodes
        .values()
        .filter_map(|n| n.details.get_str(keys::SEED_PROVIDER))
        .find_map(|provider| {
            let (_, seeds) = provider.split_once("seeds=")?;
            let seeds = seeds.split('}').next().unwrap_or_default();
            Some(
                seeds
                    .split(',')
                    .map(|s| s.trim().split(':').next().unwrap_or_default().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<String>>(),
            )
        })
        .unwrap_or_default()
}

/// Matches the node hostname against the seeds, ignoring domains.
fn is_seed(node: &Node, seeds: &[String]) -> bool {
    let Some(hostname) = node.hostname().filter(|h| !h.is_empty()) else {
        return false;
    };
    let base = |host: &str| host.split('.').next().unwrap_or(host).to_string();
    seeds.iter().any(|seed| *seed == hostname) || seeds.iter().any(|seed| base(seed) == base(&hostname))
}

fn dc_name(node: &Node) -> String {
    if node.dc.is_empty() {
        "Unknown".to_string()
    } else {
        node.dc.clone()
    }
}

fn rack_name(node: &Node) -> String {
    node.rack()
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "default".to_string())
}

fn node_version(node: &Node) -> String {
    node.cassandra_version()
        .unwrap_or_else(|| "Unknown".to_string())
}

fn short_id(host_id: &str) -> String {
    format!("{}...", host_id.chars().take(8).collect::<String>())
}

/// `hostname/address` of a node, falling back to a shortened host id.
fn node_display(state: &ClusterState, host_id: &str) -> String {
    match state.nodes.get(host_id) {
        Some(node) => {
            let address = node
                .details
                .get_str("listen_address")
                .or_else(|| node.details.get_str(keys::LISTEN_ADDRESS))
                .unwrap_or_else(|| short_id(host_id));
            format!(
                "{}/{}",
                node.hostname().unwrap_or_else(|| "unknown".to_string()),
                address
            )
        }
        None => format!("unknown/{}", short_id(host_id)),
    }
}

fn node_current_value(node: &AffectedNode, title: &str) -> String {
    CURRENT_VALUE_KEYS
        .iter()
        .filter(|(_, only_for)| only_for.map_or(true, |t| title.contains(t)))
        .find_map(|(key, _)| node.details.get(key))
        .or_else(|| node.details.get("current_value"))
        .map(|v| value_to_string(&v))
        .unwrap_or_else(|| "N/A".to_string())
}

/// `key: value` pairs of a finding's context, without identifiers.
fn context_summary(node: &AffectedNode) -> String {
    let Ok(Value::Object(map)) = serde_json::to_value(&node.details) else {
        return String::new();
    };
    map.iter()
        .filter(|(key, _)| !matches!(key.as_str(), "node_id" | "component"))
        .filter(|(_, value)| is_present(value))
        .map(|(key, value)| format!("{}: {}", key.replace("comp_", ""), value_to_string(value)))
        .collect::<Vec<String>>()
        .join(", ")
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
    }
}

/// Parameter named in the last parentheses of a title, or the title itself.
fn parameter_name(title: &str) -> &str {
    match (title.rfind('('), title.rfind(')')) {
        (Some(start), Some(end)) if start < end => &title[start + 1..end],
        _ => title,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::{AnalysisError, AnalysisResult};
    use crate::model::{Keyspace, NodeDetails, Table};
    use crate::report::report::{ClusterInfo, SectionReport, TimeRange};
    use serde_json::json;

    fn node(id: &str, host: &str, dc: &str, rack: &str) -> Node {
        Node::new(
            id,
            dc,
            NodeDetails::new()
                .with("host_Hostname", host)
                .with("comp_listen_address", format!("10.0.0.{}", &id[1..]))
                .with("comp_rack", rack)
                .with("comp_releaseVersion", "4.1.3")
                .with("comp_seed_provider", "{class_name=SimpleSeedProvider, seeds=cass-1.example.com:7000,cass-3}"),
        )
    }

    fn report(sections: Vec<(&str, Result<AnalysisResult, AnalysisError>)>) -> AnalysisReport {
        let state = ClusterState::new("prod")
            .with_node(node("n1", "cass-1", "dc1", "r1"))
            .with_node(node("n2", "cass-2", "dc1", "r2"))
            .with_node(node("n3", "cass-3", "dc2", "r1"))
            .with_keyspace(
                Keyspace::new("app", "NetworkTopologyStrategy")
                    .with_table(Table::new("app", "users", "CREATE TABLE app.users (id int PRIMARY KEY)")),
            )
            .with_keyspace(Keyspace::new("system_auth", "SimpleStrategy"));
        let now = Utc::now();
        AnalysisReport::new(
            ClusterInfo {
                organization: "acme".to_string(),
                cluster_type: "cassandra".to_string(),
                cluster_name: "prod".to_string(),
                analysis_time: now,
                time_range: TimeRange { start: now, end: now },
            },
            state,
            sections
                .into_iter()
                .map(|(name, outcome)| SectionReport {
                    section: name.to_string(),
                    result: outcome.into(),
                })
                .collect(),
        )
    }

    fn render(report: &AnalysisReport) -> String {
        report.to_markdown(Utc::now())
    }

    fn swap(node_id: &str, host: &str, pct: f64) -> Recommendation {
        Recommendation::new(
            "Swap Usage Detected",
            format!("Node {}/10.0.0.1 is using {:.1}% of swap space", host, pct),
            Severity::Critical,
            "infrastructure",
        )
        .with_node_id(node_id)
        .with_swap_percentage(pct)
    }

    #[test]
    fn test_healthy_cluster() {
        let md = render(&report(vec![("security", Ok(AnalysisResult::default()))]));

        assert!(md.starts_with("# Cassandra Cluster Health Assessment"));
        assert!(md.contains("**Cluster:** prod"));
        assert!(md.contains("### ✅ **Healthy Cluster**"));
        assert!(md.contains("| Total Nodes | 3 | ✅ Good |"));
        assert!(md.contains("| Datacenters | 2 | ✅ Multi-DC |"));
        assert!(md.contains("✅ **No issues detected** in security configuration."));
        assert!(md.contains("No findings were reported for this cluster."));
    }

    #[test]
    fn test_aggregated_findings_and_appendix() {
        let infra = AnalysisResult::new(vec![
            swap("n1", "cass-1", 10.0),
            swap("n2", "cass-2", 35.5),
        ]);
        let md = render(&report(vec![("infrastructure", Ok(infra))]));

        assert!(md.contains("### 🔴 **Critical Issues Detected**"));
        assert!(md.contains("**2 critical issue(s)**"));
        assert!(md.contains("Node(s) is using 10.0-35.5% of swap space (2 nodes affected)"));
        assert_eq!(md.matches("| **Swap Usage Detected** |").count(), 1);
        assert!(md.contains("## Appendix: Node-Specific Issue Details"));
        assert!(md.contains("**Affected Nodes:** 2"));
        assert!(md.contains("| cass-2/10.0.0.2 |"));
    }

    #[test]
    fn test_failed_section_marker() {
        let md = render(&report(vec![(
            "operations",
            Err(AnalysisError::Internal("metrics unavailable".to_string())),
        )]));

        assert!(md.contains("## 📊 Operations"));
        assert!(md.contains("⚠️ **Analysis Error:** Internal error: metrics unavailable"));
    }

    #[test]
    fn test_sections_follow_report_order() {
        let md = render(&report(vec![
            ("security", Ok(AnalysisResult::default())),
            ("infrastructure", Ok(AnalysisResult::default())),
            ("custom_checks", Ok(AnalysisResult::default())),
        ]));

        let infra = md.find("## 🖥️ Infrastructure").unwrap();
        let security = md.find("## 🔐 Security").unwrap();
        let custom = md.find("## 📋 Custom Checks").unwrap();
        assert!(infra < security && security < custom);
    }

    #[test]
    fn test_topology_and_seeds() {
        let md = render(&report(vec![]));

        assert!(md.contains("| dc1 | 2 racks (r1: 1, r2: 1) | 2 | 1 | 4.1.3 |"));
        assert!(md.contains("| dc2 | r1 | 1 | 1 | 4.1.3 |"));
        assert!(md.contains("| dc1 | r1 | cass-1/10.0.0.1 | 4.1.3 | ✅ Yes |"));
        assert!(md.contains("| dc1 | r2 | cass-2/10.0.0.2 | 4.1.3 | ❌ No |"));
        assert!(md.contains("| app | 1 | Application |"));
        assert!(md.contains("| system_auth | 0 | System |"));
        assert!(md.contains("**1 application keyspace(s)**"));
    }

    #[test]
    fn test_security_overview_from_summary() {
        let security = AnalysisResult::new(vec![Recommendation::new(
            "Authorization Disabled",
            "off",
            Severity::Warning,
            "security",
        )])
        .with_summary("auth_enabled", true)
        .with_summary("authenticator", "PasswordAuthenticator")
        .with_summary("authz_enabled", false);
        let md = render(&report(vec![("security", Ok(security))]));

        assert!(md.contains("| Authentication | ✅ Enabled | PasswordAuthenticator | ✅ Low |"));
        assert!(md.contains("| Authorization | ❌ Disabled | Unknown | 🔴 High |"));
        assert!(md.contains("### 🟡 **Performance Optimization Needed**"));
    }

    #[test]
    fn test_datamodel_appendix() {
        let datamodel = AnalysisResult::new(vec![
            Recommendation::new("Unused Tables Detected", "unused", Severity::Info, "datamodel")
                .with_context("unused_tables", json!(["app.dead"])),
            Recommendation::new("Collection Types Usage", "collections", Severity::Info, "datamodel")
                .with_context(
                    "collection_table_details",
                    json!([{"table": "app.tags", "schema": "CREATE TABLE app.tags (id int PRIMARY KEY, t set<text>);"}]),
                ),
        ]);
        let md = render(&report(vec![("datamodel", Ok(datamodel))]));

        assert!(md.contains("## Appendix: Data Model Details"));
        assert!(md.contains("| app.dead | Verify if still needed before dropping |"));
        assert!(md.contains("#### app.tags"));
        assert!(md.contains("```sql\nCREATE TABLE app.tags"));
    }

    #[test]
    fn test_cells_are_escaped() {
        assert_eq!(cell("a|b\nc"), "a\\|b c");
        assert_eq!(parameter_name("Low Concurrent Reads (concurrent_reads)"), "concurrent_reads");
        assert_eq!(parameter_name("Swap Enabled"), "Swap Enabled");
    }
}
