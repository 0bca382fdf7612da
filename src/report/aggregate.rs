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

//! Folding per-node findings into one entry per distinct issue.
//!
//! Large clusters emit the same finding once per node. The report shows one
//! row per `(title, generalized description)` and keeps the node list for
//! the appendix.

use crate::model::{Recommendation, RecommendationContext, Severity};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

pub const SWAP_USAGE_TITLE: &str = "Swap Usage Detected";

static NODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Node \S+ ").expect("valid regex"));
static NODES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"nodes? \S+ ").expect("valid regex"));
static SWAP_PCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"is using \d+\.\d+% of swap space").expect("valid regex"));

/// One node folded into an aggregate, with the context of its finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffectedNode {
    pub node_id: String,
    pub details: RecommendationContext,
}

/// A group of findings sharing title and generalized description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRecommendation {
    pub title: String,
    pub severity: Severity,
    pub description: String,
    pub impact: Option<String>,
    pub recommendation: Option<String>,
    pub current_value: Option<String>,
    /// Members that carried a `node_id`, in input order.
    pub affected_nodes: Vec<AffectedNode>,
    /// Context of the first member.
    pub context: RecommendationContext,
    pub count: usize,
}

impl AggregatedRecommendation {
    /// Flattens the aggregate back into a single finding.
    pub fn to_recommendation(&self, category: &str) -> Recommendation {
        let mut rec = Recommendation::new(
            self.title.clone(),
            self.description.clone(),
            self.severity,
            category,
        );
        rec.impact = self.impact.clone();
        rec.recommendation = self.recommendation.clone();
        rec.current_value = self.current_value.clone();
        rec.context = self.context.clone();
        rec
    }
}

/// Strips node identifiers (and swap percentages) so that the same issue
/// on different nodes compares equal.
pub fn generalize_description(title: &str, description: &str) -> String {
    let mut base = description.to_string();
    if base.contains("Node ") {
        base = NODE_RE.replace_all(&base, "Node(s) ").into_owned();
        base = NODES_RE.replace_all(&base, "affected node(s) ").into_owned();
    }
    if title == SWAP_USAGE_TITLE && base.contains("swap space") {
        base = SWAP_PCT_RE
            .replace_all(&base, "is using swap space")
            .into_owned();
    }
    base
}

struct Group {
    aggregate: AggregatedRecommendation,
    swap_percentages: Vec<Option<f64>>,
}

/// Groups `recommendations` by `(title, generalized description)`.
///
/// Output order follows the first occurrence of each group. Descriptions of
/// groups with more than one member get a `(N nodes affected)` suffix, or a
/// swap percentage range for swap usage findings.
pub fn aggregate_recommendations(recommendations: &[Recommendation]) -> Vec<AggregatedRecommendation> {
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for rec in recommendations {
        let base = generalize_description(&rec.title, &rec.description);
        let key = (rec.title.clone(), base.clone());
        let position = *index.entry(key).or_insert_with(|| {
            groups.push(Group {
                aggregate: AggregatedRecommendation {
                    title: rec.title.clone(),
                    severity: rec.severity,
                    description: base,
                    impact: rec.impact.clone(),
                    recommendation: rec.recommendation.clone(),
                    current_value: rec.current_value.clone(),
                    affected_nodes: Vec::new(),
                    context: rec.context.clone(),
                    count: 0,
                },
                swap_percentages: Vec::new(),
            });
            groups.len() - 1
        });

        let group = &mut groups[position];
        if let Some(node_id) = rec.context.node_id.as_ref().filter(|id| !id.is_empty()) {
            group.aggregate.affected_nodes.push(AffectedNode {
                node_id: node_id.clone(),
                details: rec.context.clone(),
            });
        }
        group.swap_percentages.push(rec.context.swap_percentage);
        group.aggregate.count += 1;
    }

    groups
        .into_iter()
        .map(|group| {
            let mut aggregate = group.aggregate;
            if aggregate.count > 1 {
                aggregate.description = describe_group(&aggregate, &group.swap_percentages);
            }
            aggregate
        })
        .collect()
}

fn describe_group(aggregate: &AggregatedRecommendation, swap_percentages: &[Option<f64>]) -> String {
    let generic = format!("{} ({} nodes affected)", aggregate.description, aggregate.count);
    if aggregate.title != SWAP_USAGE_TITLE || !aggregate.description.contains("swap space") {
        return generic;
    }

    // a range is only shown when every member reported its percentage
    let values = match swap_percentages.iter().copied().collect::<Option<Vec<f64>>>() {
        Some(values) if !values.is_empty() => values,
        _ => return generic,
    };
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));

    let range = if (max - min).abs() < f64::EPSILON {
        format!("{:.1}%", min)
    } else {
        format!("{:.1}-{:.1}%", min, max)
    };
    format!(
        "Node(s) is using {} of swap space ({} nodes affected)",
        range, aggregate.count
    )
}

/// Report priority derived from severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Immediate,
    Nearterm,
    Longterm,
}

impl From<Severity> for Priority {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Priority::Immediate,
            Severity::Warning => Priority::Nearterm,
            Severity::Info => Priority::Longterm,
        }
    }
}

/// An aggregate tagged with the section it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrioritizedRecommendation<'a> {
    pub section: &'a str,
    pub recommendation: &'a AggregatedRecommendation,
}

/// Aggregates split by priority, each list in section then input order.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RecommendationsByPriority<'a> {
    pub immediate: Vec<PrioritizedRecommendation<'a>>,
    pub nearterm: Vec<PrioritizedRecommendation<'a>>,
    pub longterm: Vec<PrioritizedRecommendation<'a>>,
}

impl<'a> RecommendationsByPriority<'a> {
    pub fn group<I>(sections: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [AggregatedRecommendation])>,
    {
        let mut grouped = Self::default();
        for (section, recommendations) in sections {
            for recommendation in recommendations {
                let entry = PrioritizedRecommendation {
                    section,
                    recommendation,
                };
                match Priority::from(recommendation.severity) {
                    Priority::Immediate => grouped.immediate.push(entry),
                    Priority::Nearterm => grouped.nearterm.push(entry),
                    Priority::Longterm => grouped.longterm.push(entry),
                }
            }
        }
        grouped
    }

    pub fn is_empty(&self) -> bool {
        self.immediate.is_empty() && self.nearterm.is_empty() && self.longterm.is_empty()
    }
}

/// Display metadata of a report section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionInfo {
    pub icon: &'static str,
    pub title: String,
    pub order: u32,
    pub brief: &'static str,
}

/// Title, icon, position and one-line brief of `section`.
///
/// Unknown sections sort last under a title-cased name.
pub fn section_info(section: &str) -> SectionInfo {
    let known = |icon, title: &str, order, brief| SectionInfo {
        icon,
        title: title.to_string(),
        order,
        brief,
    };
    match section {
        "infrastructure" => known(
            "🖥️",
            "Infrastructure",
            1,
            "Hardware and OS configuration supporting your cluster",
        ),
        "configuration" => known("⚙️", "Configuration", 2, "Cassandra settings and JVM parameters"),
        "operations" => known("📊", "Operations", 3, "Performance metrics and operational health"),
        "operations_logs" => known("📝", "Operations Logs", 4, "Log analysis and error patterns"),
        "datamodel" => known("📐", "Data Model", 5, "Schema design and table optimization"),
        "security" => known(
            "🔐",
            "Security",
            6,
            "Authentication, authorization, and encryption",
        ),
        "extended_configuration" => known(
            "🔧",
            "Extended Configuration",
            7,
            "Advanced settings and fine-tuning",
        ),
        other => SectionInfo {
            icon: "📋",
            title: title_case(other),
            order: 99,
            brief: "Additional analysis",
        },
    }
}

/// `operations_logs` becomes `Operations Logs`.
pub fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Compact count such as `1.5K` or `2.0M`.
pub fn format_number(value: f64) -> String {
    if value >= 1_000_000_000.0 {
        format!("{:.1}B", value / 1_000_000_000.0)
    } else if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{}", value.trunc() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SeverityCounts;

    fn node_rec(title: &str, description: &str, node_id: &str) -> Recommendation {
        Recommendation::new(title, description, Severity::Warning, "infrastructure")
            .with_node_id(node_id)
    }

    fn swap_rec(node: &str, pct: Option<f64>) -> Recommendation {
        let rec = Recommendation::new(
            SWAP_USAGE_TITLE,
            format!("Node {}/10.0.0.1 is using {:.1}% of swap space", node, pct.unwrap_or(1.0)),
            Severity::Critical,
            "infrastructure",
        )
        .with_node_id(node);
        match pct {
            Some(p) => rec.with_swap_percentage(p),
            None => rec,
        }
    }

    #[test]
    fn test_same_issue_on_many_nodes_collapses() {
        let recs: Vec<Recommendation> = (1..=4)
            .map(|i| {
                node_rec(
                    "Low File Descriptor Limit",
                    &format!("Node host{}/10.0.0.{} has a low file descriptor limit", i, i),
                    &format!("n{}", i),
                )
            })
            .collect();

        let aggregated = aggregate_recommendations(&recs);

        assert_eq!(aggregated.len(), 1);
        let agg = &aggregated[0];
        assert_eq!(agg.count, 4);
        assert_eq!(agg.affected_nodes.len(), 4);
        assert_eq!(agg.affected_nodes[2].node_id, "n3");
        assert_eq!(
            agg.description,
            "Node(s) has a low file descriptor limit (4 nodes affected)"
        );
    }

    #[test]
    fn test_distinct_descriptions_stay_apart() {
        let recs = vec![
            node_rec("GC Pauses", "Node a/1 has long young GC pauses", "n1"),
            node_rec("GC Pauses", "Node b/2 has long full GC pauses", "n2"),
        ];

        let aggregated = aggregate_recommendations(&recs);

        assert_eq!(aggregated.len(), 2);
        assert!(aggregated.iter().all(|a| a.count == 1));
        // single members keep the generalized description without a suffix
        assert_eq!(aggregated[0].description, "Node(s) has long young GC pauses");
    }

    #[test]
    fn test_first_seen_order_is_kept() {
        let recs = vec![
            Recommendation::new("B", "second kind", Severity::Info, "x"),
            Recommendation::new("A", "first kind", Severity::Critical, "x"),
            Recommendation::new("B", "second kind", Severity::Info, "x"),
        ];

        let titles: Vec<String> = aggregate_recommendations(&recs)
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["B", "A"]);
    }

    #[test]
    fn test_members_without_node_id_are_counted() {
        let recs = vec![
            Recommendation::new("Cluster Wide", "same", Severity::Info, "x"),
            Recommendation::new("Cluster Wide", "same", Severity::Info, "x"),
        ];
        let aggregated = aggregate_recommendations(&recs);
        assert_eq!(aggregated[0].count, 2);
        assert!(aggregated[0].affected_nodes.is_empty());
        assert_eq!(aggregated[0].description, "same (2 nodes affected)");
    }

    #[test]
    fn test_reaggregating_is_stable() {
        let recs = vec![
            node_rec("Issue", "Node a/1 is slow ", "n1"),
            node_rec("Issue", "Node b/2 is slow ", "n2"),
            node_rec("Other", "Node a/1 is odd", "n1"),
        ];
        let first = aggregate_recommendations(&recs);

        let flattened: Vec<Recommendation> = first
            .iter()
            .map(|a| a.to_recommendation("infrastructure"))
            .collect();
        let second = aggregate_recommendations(&flattened);
        assert_eq!(second.len(), first.len());

        assert_eq!(aggregate_recommendations(&recs), first);
    }

    #[test]
    fn test_swap_range() {
        let recs = vec![
            swap_rec("n1", Some(12.5)),
            swap_rec("n2", Some(40.0)),
            swap_rec("n3", Some(20.25)),
        ];

        let aggregated = aggregate_recommendations(&recs);

        assert_eq!(aggregated.len(), 1);
        assert_eq!(
            aggregated[0].description,
            "Node(s) is using 12.5-40.0% of swap space (3 nodes affected)"
        );
    }

    #[test]
    fn test_swap_single_value() {
        let recs = vec![swap_rec("n1", Some(30.0)), swap_rec("n2", Some(30.0))];
        assert_eq!(
            aggregate_recommendations(&recs)[0].description,
            "Node(s) is using 30.0% of swap space (2 nodes affected)"
        );
    }

    #[test]
    fn test_swap_without_percentage_falls_back() {
        let recs = vec![swap_rec("n1", Some(30.0)), swap_rec("n2", None)];
        assert_eq!(
            aggregate_recommendations(&recs)[0].description,
            "Node(s) is using swap space (2 nodes affected)"
        );
    }

    #[test]
    fn test_priority_grouping() {
        let recs = vec![
            Recommendation::new("i", "i", Severity::Info, "x"),
            Recommendation::new("c", "c", Severity::Critical, "x"),
            Recommendation::new("w", "w", Severity::Warning, "x"),
        ];
        let counts: SeverityCounts = recs.iter().collect();
        assert_eq!((counts.critical, counts.warning, counts.info), (1, 1, 1));

        let aggregated = aggregate_recommendations(&recs);
        let grouped = RecommendationsByPriority::group([("security", aggregated.as_slice())]);
        assert_eq!(grouped.immediate.len(), 1);
        assert_eq!(grouped.nearterm.len(), 1);
        assert_eq!(grouped.longterm.len(), 1);
        assert_eq!(grouped.immediate[0].section, "security");
        assert_eq!(grouped.immediate[0].recommendation.title, "c");
    }

    #[test]
    fn test_section_info() {
        assert_eq!(section_info("datamodel").title, "Data Model");
        assert_eq!(section_info("extended_configuration").order, 7);
        let unknown = section_info("disk_layout");
        assert_eq!(unknown.title, "Disk Layout");
        assert_eq!(unknown.order, 99);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(1_500.0), "1.5K");
        assert_eq!(format_number(2_000_000.0), "2.0M");
        assert_eq!(format_number(3_200_000_000.0), "3.2B");
    }
}
