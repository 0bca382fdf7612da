use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Finding severity, ordered `Info < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Machine-readable context attached to a recommendation.
///
/// The fields below are the vocabulary shared by the analyzers, the aggregator
/// and the report appendix. Analyzer-specific values go to `extra`, which is
/// flattened into the same JSON object on output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyspace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_nodes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_percentage: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RecommendationContext {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Looks up a context entry by its JSON name, typed fields included.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "node_id" => self.node_id.clone().map(Value::from),
            "component" => self.component.clone().map(Value::from),
            "config_location" => self.config_location.clone().map(Value::from),
            "recommended_value" => self.recommended_value.clone(),
            "keyspace" => self.keyspace.clone().map(Value::from),
            "table" => self.table.clone().map(Value::from),
            "affected_nodes" => self.affected_nodes.clone().map(Value::from),
            "swap_percentage" => self.swap_percentage.map(Value::from),
            other => self.extra.get(other).cloned(),
        }
    }
}

/// One finding emitted by an analyzer.
///
/// Built through the `with_*` methods and left untouched once handed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub category: String,
    #[serde(default)]
    pub current_value: Option<String>,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub reference_url: Option<String>,
    #[serde(default)]
    pub context: RecommendationContext,
}

impl Recommendation {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
            category: category.into(),
            current_value: None,
            impact: None,
            recommendation: None,
            reference_url: None,
            context: RecommendationContext::default(),
        }
    }

    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = Some(impact.into());
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }

    pub fn with_current_value(mut self, current_value: impl Into<String>) -> Self {
        self.current_value = Some(current_value.into());
        self
    }

    pub fn with_reference_url(mut self, url: impl Into<String>) -> Self {
        self.reference_url = Some(url.into());
        self
    }

    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.context.node_id = Some(node_id.into());
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.context.component = Some(component.into());
        self
    }

    pub fn with_config_location(mut self, location: impl Into<String>) -> Self {
        self.context.config_location = Some(location.into());
        self
    }

    pub fn with_recommended_value(mut self, value: impl Into<Value>) -> Self {
        self.context.recommended_value = Some(value.into());
        self
    }

    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.context.keyspace = Some(keyspace.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.context.table = Some(table.into());
        self
    }

    pub fn with_affected_nodes(mut self, nodes: Vec<String>) -> Self {
        self.context.affected_nodes = Some(nodes);
        self
    }

    pub fn with_swap_percentage(mut self, pct: f64) -> Self {
        self.context.swap_percentage = Some(pct);
        self
    }

    /// Adds an analyzer-specific context value.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.extra.insert(key.into(), value.into());
        self
    }

    pub fn to_markdown(&self) -> String {
        let mut md = format!("### {}\n\n", self.title);
        md.push_str(&format!(
            "**Severity:** {}\n\n",
            self.severity.as_str().to_uppercase()
        ));
        md.push_str(&format!("{}\n\n", self.description));
        if let Some(impact) = &self.impact {
            md.push_str(&format!("**Impact:** {}\n\n", impact));
        }
        if let Some(rec) = &self.recommendation {
            md.push_str(&format!("**Recommendation:** {}\n\n", rec));
        }
        if let Some(url) = &self.reference_url {
            md.push_str(&format!("**Reference:** [{}]({})\n\n", url, url));
        }
        md
    }
}

/// Per-severity totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.warning + self.info
    }

    pub fn merge(&mut self, other: SeverityCounts) {
        self.critical += other.critical;
        self.warning += other.warning;
        self.info += other.info;
    }
}

impl<'a> FromIterator<&'a Recommendation> for SeverityCounts {
    fn from_iter<I: IntoIterator<Item = &'a Recommendation>>(iter: I) -> Self {
        let mut counts = SeverityCounts::default();
        for rec in iter {
            counts.add(rec.severity);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
        assert_eq!(
            [Severity::Warning, Severity::Critical, Severity::Info]
                .iter()
                .max(),
            Some(&Severity::Critical)
        );
    }

    #[test]
    fn test_severity_counts_partition() {
        let recs = vec![
            Recommendation::new("a", "a", Severity::Info, "x"),
            Recommendation::new("b", "b", Severity::Critical, "x"),
            Recommendation::new("c", "c", Severity::Warning, "x"),
        ];
        let counts: SeverityCounts = recs.iter().collect();
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.warning, 1);
        assert_eq!(counts.info, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_context_serializes_flat() {
        let rec = Recommendation::new("t", "d", Severity::Warning, "datamodel")
            .with_keyspace("demo")
            .with_context("current_rf", 1);

        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["severity"], json!("warning"));
        assert_eq!(value["context"]["keyspace"], json!("demo"));
        assert_eq!(value["context"]["current_rf"], json!(1));
        assert!(value["context"].get("node_id").is_none());
        assert_eq!(rec.context.get("current_rf"), Some(json!(1)));
        assert_eq!(rec.context.get("keyspace"), Some(json!("demo")));
    }

    #[test]
    fn test_context_round_trips_known_keys() {
        let value = json!({
            "title": "t",
            "description": "d",
            "severity": "critical",
            "category": "infrastructure",
            "context": {"node_id": "n1/10.0.0.1", "swap_percentage": 12.5, "custom": true}
        });
        let rec: Recommendation = serde_json::from_value(value).unwrap();
        assert_eq!(rec.context.node_id.as_deref(), Some("n1/10.0.0.1"));
        assert_eq!(rec.context.swap_percentage, Some(12.5));
        assert_eq!(rec.context.extra.get("custom"), Some(&json!(true)));
    }

    #[test]
    fn test_to_markdown() {
        let md = Recommendation::new("Swap Enabled", "Node x has swap", Severity::Warning, "infrastructure")
            .with_impact("Latency")
            .with_recommendation("Disable swap")
            .to_markdown();
        assert!(md.starts_with("### Swap Enabled\n\n**Severity:** WARNING"));
        assert!(md.contains("**Impact:** Latency"));
        assert!(md.contains("**Recommendation:** Disable swap"));
        assert!(!md.contains("**Reference:**"));
    }
}
