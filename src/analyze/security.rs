//! Authentication, authorization and encryption checks.

use crate::analyze::analyzer::{AnalysisOutcome, AnalysisResult, SectionAnalyzer};
use crate::analyze::common::{group_nodes, most_common, CATEGORY_SECURITY, SECTION_SECURITY};
use crate::config::Thresholds;
use crate::model::node::keys;
use crate::model::{ClusterState, Recommendation, Severity};
use serde_json::{json, Value};
use std::collections::BTreeMap;

const ALLOW_ALL_AUTHENTICATOR: &str = "AllowAllAuthenticator";
const ALLOW_ALL_AUTHORIZER: &str = "AllowAllAuthorizer";
const PASSWORD_AUTHENTICATOR: &str = "PasswordAuthenticator";
const CASSANDRA_AUTHORIZER: &str = "CassandraAuthorizer";

#[derive(Debug, Default, Clone, Copy)]
pub struct SecurityAnalyzer;

impl SectionAnalyzer for SecurityAnalyzer {
    fn section(&self) -> &'static str {
        SECTION_SECURITY
    }

    fn analyze(&self, state: &ClusterState, _thresholds: &Thresholds) -> AnalysisOutcome {
        let mut recommendations = Vec::new();

        let (auth_recs, details) = analyze_auth(state);
        recommendations.extend(auth_recs);
        recommendations.push(encryption_reminder());

        let mut result = AnalysisResult::new(recommendations);
        let count = result.recommendations.len();
        result = result.with_summary("recommendations_count", count);
        for (k, v) in details {
            result.summary.insert(k.clone(), v.clone());
            result.details.insert(k, v);
        }
        Ok(result)
    }
}

fn analyze_auth(state: &ClusterState) -> (Vec<Recommendation>, BTreeMap<String, Value>) {
    let mut recommendations = Vec::new();

    let reporting = || state.nodes.values().filter(|n| !n.details.is_empty());
    let auth_configs = group_nodes(reporting().map(|n| {
        (
            n.details.get_str_or(keys::AUTHENTICATOR, "Unknown"),
            n.host_id.clone(),
        )
    }));
    let authz_configs = group_nodes(reporting().map(|n| {
        (
            n.details.get_str_or(keys::AUTHORIZER, "Unknown"),
            n.host_id.clone(),
        )
    }));

    if let Some(nodes) = auth_configs.get(ALLOW_ALL_AUTHENTICATOR) {
        recommendations.push(
            Recommendation::new(
                "Authentication Disabled",
                format!("Authentication is disabled on {} node(s)", nodes.len()),
                Severity::Critical,
                CATEGORY_SECURITY,
            )
            .with_impact("Anyone can connect to the database without credentials")
            .with_recommendation("Enable PasswordAuthenticator or another secure authenticator")
            .with_current_value(ALLOW_ALL_AUTHENTICATOR)
            .with_affected_nodes(nodes.clone()),
        );
    }

    if let Some(nodes) = authz_configs.get(ALLOW_ALL_AUTHORIZER) {
        recommendations.push(
            Recommendation::new(
                "Authorization Disabled",
                format!("Authorization is disabled on {} node(s)", nodes.len()),
                Severity::Critical,
                CATEGORY_SECURITY,
            )
            .with_impact("All authenticated users have full access to all data")
            .with_recommendation("Enable CassandraAuthorizer for role-based access control")
            .with_current_value(ALLOW_ALL_AUTHORIZER)
            .with_affected_nodes(nodes.clone()),
        );
    }

    if auth_configs.len() > 1 {
        recommendations.push(
            Recommendation::new(
                "Inconsistent Authentication Configuration",
                format!(
                    "Different authenticators configured across nodes: {}",
                    auth_configs.keys().cloned().collect::<Vec<_>>().join(", ")
                ),
                Severity::Critical,
                CATEGORY_SECURITY,
            )
            .with_impact("Inconsistent security policies across the cluster")
            .with_recommendation("Ensure all nodes use the same authenticator")
            .with_context("auth_configs", counts_json(&auth_configs)),
        );
    }

    if authz_configs.len() > 1 {
        recommendations.push(
            Recommendation::new(
                "Inconsistent Authorization Configuration",
                format!(
                    "Different authorizers configured across nodes: {}",
                    authz_configs.keys().cloned().collect::<Vec<_>>().join(", ")
                ),
                Severity::Critical,
                CATEGORY_SECURITY,
            )
            .with_impact("Inconsistent access control across the cluster")
            .with_recommendation("Ensure all nodes use the same authorizer")
            .with_context("authz_configs", counts_json(&authz_configs)),
        );
    }

    let authenticator = dominant(&auth_configs);
    let authorizer = dominant(&authz_configs);
    let auth_enabled = (auth_configs.contains_key(PASSWORD_AUTHENTICATOR) || auth_configs.is_empty())
        && authenticator != ALLOW_ALL_AUTHENTICATOR;
    let authz_enabled = (authz_configs.contains_key(CASSANDRA_AUTHORIZER) || authz_configs.is_empty())
        && authorizer != ALLOW_ALL_AUTHORIZER;

    let mut details = BTreeMap::new();
    details.insert("auth_enabled".to_string(), json!(auth_enabled));
    details.insert("authz_enabled".to_string(), json!(authz_enabled));
    details.insert("authenticator".to_string(), json!(authenticator));
    details.insert("authorizer".to_string(), json!(authorizer));

    (recommendations, details)
}

fn dominant(configs: &BTreeMap<String, Vec<String>>) -> String {
    let counts: BTreeMap<String, usize> =
        configs.iter().map(|(k, v)| (k.clone(), v.len())).collect();
    most_common(&counts).unwrap_or_else(|| "Unknown".to_string())
}

fn counts_json(configs: &BTreeMap<String, Vec<String>>) -> Value {
    Value::Object(
        configs
            .iter()
            .map(|(k, v)| (k.clone(), json!(v.len())))
            .collect(),
    )
}

fn encryption_reminder() -> Recommendation {
    Recommendation::new(
        "Review Encryption Configuration",
        "Verify that appropriate encryption is configured",
        Severity::Info,
        CATEGORY_SECURITY,
    )
    .with_impact("Data transmitted in clear text")
    .with_recommendation("Enable client-to-node and node-to-node encryption")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, NodeDetails};

    fn node(id: &str, authenticator: &str, authorizer: &str) -> Node {
        Node::new(
            id,
            "dc1",
            NodeDetails::new()
                .with("comp_authenticator", authenticator)
                .with("comp_authorizer", authorizer),
        )
    }

    fn run(state: &ClusterState) -> AnalysisResult {
        SecurityAnalyzer
            .analyze(state, &Thresholds::default())
            .unwrap()
    }

    #[test]
    fn test_authentication_disabled_on_all_nodes() {
        let state = ClusterState::new("c")
            .with_node(node("n1", "AllowAllAuthenticator", "CassandraAuthorizer"))
            .with_node(node("n2", "AllowAllAuthenticator", "CassandraAuthorizer"))
            .with_node(node("n3", "AllowAllAuthenticator", "CassandraAuthorizer"));

        let result = run(&state);
        let rec = result
            .recommendations
            .iter()
            .find(|r| r.title.contains("Authentication Disabled"))
            .expect("authentication finding");

        assert_eq!(rec.severity, Severity::Critical);
        assert_eq!(rec.context.affected_nodes.as_ref().map(Vec::len), Some(3));
        assert_eq!(rec.description, "Authentication is disabled on 3 node(s)");
        assert_eq!(result.details["auth_enabled"], json!(false));
        assert_eq!(result.details["authenticator"], json!("AllowAllAuthenticator"));
        assert_eq!(result.details["authz_enabled"], json!(true));
        assert!(!result
            .recommendations
            .iter()
            .any(|r| r.title.starts_with("Inconsistent")));
    }

    #[test]
    fn test_inconsistent_authenticators() {
        let state = ClusterState::new("c")
            .with_node(node("n1", "PasswordAuthenticator", "CassandraAuthorizer"))
            .with_node(node("n2", "AllowAllAuthenticator", "AllowAllAuthorizer"));

        let result = run(&state);
        let titles: Vec<&str> = result.recommendations.iter().map(|r| r.title.as_str()).collect();
        assert!(titles.contains(&"Inconsistent Authentication Configuration"));
        assert!(titles.contains(&"Inconsistent Authorization Configuration"));
        assert!(titles.contains(&"Authorization Disabled"));

        let inconsistent = result
            .recommendations
            .iter()
            .find(|r| r.title == "Inconsistent Authentication Configuration")
            .unwrap();
        assert_eq!(
            inconsistent.context.get("auth_configs"),
            Some(json!({"AllowAllAuthenticator": 1, "PasswordAuthenticator": 1}))
        );
    }

    #[test]
    fn test_secure_cluster_only_gets_encryption_reminder() {
        let state = ClusterState::new("c")
            .with_node(node("n1", "PasswordAuthenticator", "CassandraAuthorizer"))
            .with_node(node("n2", "PasswordAuthenticator", "CassandraAuthorizer"));

        let result = run(&state);
        assert_eq!(result.recommendations.len(), 1);
        assert_eq!(result.recommendations[0].severity, Severity::Info);
        assert_eq!(result.summary["auth_enabled"], json!(true));
        assert_eq!(result.summary["recommendations_count"], json!(1));
    }

    #[test]
    fn test_nodes_without_details_are_ignored() {
        let state = ClusterState::new("c").with_node(Node::new("n1", "dc1", NodeDetails::new()));
        let result = run(&state);
        assert_eq!(result.details["authenticator"], json!("Unknown"));
        assert_eq!(result.details["auth_enabled"], json!(true));
    }
}
