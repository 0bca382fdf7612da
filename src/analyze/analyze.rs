use crate::analyze::analyzer::SectionAnalyzer;
use crate::analyze::common::{
    SECTION_CONFIGURATION, SECTION_DATAMODEL, SECTION_INFRASTRUCTURE, SECTION_OPERATIONS,
    SECTION_OPERATIONS_LOGS, SECTION_SECURITY,
};
use crate::analyze::configuration::ConfigurationAnalyzer;
use crate::analyze::datamodel::DataModelAnalyzer;
use crate::analyze::extended_configuration::ExtendedConfigurationAnalyzer;
use crate::analyze::infrastructure::InfrastructureAnalyzer;
use crate::analyze::operations::OperationsAnalyzer;
use crate::analyze::operations_logs::OperationsLogsAnalyzer;
use crate::analyze::security::SecurityAnalyzer;
use crate::client::{AxonOpsClient, MonitoringApi};
use crate::collect::Collector;
use crate::config::{AnalysisConfig, AppConfig};
use crate::model::ClusterState;
use crate::report::report::{ClusterInfo, SectionReport, SectionResult, TimeRange, TimedPhases};
use crate::report::AnalysisReport;
use crate::util::util::{measure_dur, measure_dur_async, Timings};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::convert::Infallible;
use std::error::Error;
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::{error, info, info_span, warn};

/// Builder for constructing an `Analyzer` instance.
///
/// Without an explicit client, [`AnalyzerBuilder::build`] connects to the
/// AxonOps API described by the configuration.
///
/// # Examples
///
/// ```no_run
/// use cassandra_pulse::analyze::Analyzer;
/// use cassandra_pulse::config::AppConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let config = AppConfig::from_file("config.yaml")?;
/// let analyzer = Analyzer::builder(config).build().await?;
/// let report = analyzer.analyze().await?;
/// println!("{}", report);
/// # Ok(())
/// # }
/// ```
pub struct AnalyzerBuilder {
    config: AppConfig,
    client: Option<Arc<dyn MonitoringApi>>,
    analyzers: Option<Vec<Box<dyn SectionAnalyzer>>>,
}

impl AnalyzerBuilder {
    /// Creates a new `AnalyzerBuilder` with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            client: None,
            analyzers: None,
        }
    }

    /// Uses `client` instead of an [`AxonOpsClient`] built from the configuration.
    pub fn with_client(mut self, client: Arc<dyn MonitoringApi>) -> Self {
        self.client = Some(client);
        self
    }

    /// Replaces the sections enabled in the configuration.
    ///
    /// # Arguments
    ///
    /// * `analyzers` - Analyzers to run, in report order
    pub fn with_analyzers(mut self, analyzers: Vec<Box<dyn SectionAnalyzer>>) -> Self {
        self.analyzers = Some(analyzers);
        self
    }

    /// Builds the `Analyzer` instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the API client
    /// cannot be created.
    pub async fn build(self) -> Result<Analyzer, Box<dyn Error + Send + Sync>> {
        self.config.validate()?;
        let client: Arc<dyn MonitoringApi> = match self.client {
            Some(client) => client,
            None => Arc::new(AxonOpsClient::new(&self.config.axonops)?),
        };
        let analyzers = self
            .analyzers
            .unwrap_or_else(|| enabled_analyzers(&self.config.analysis));
        info!(
            "Analyzer ready, cluster={}, org={}, sections={}",
            self.config.cluster.cluster,
            self.config.cluster.org,
            analyzers
                .iter()
                .map(|a| a.section())
                .collect::<Vec<&str>>()
                .join(",")
        );
        Ok(Analyzer {
            config: self.config,
            client,
            analyzers,
        })
    }
}

/// Analyzers for the sections enabled in `analysis`, in report order.
///
/// The `configuration` flag also enables the extended configuration section.
pub fn enabled_analyzers(analysis: &AnalysisConfig) -> Vec<Box<dyn SectionAnalyzer>> {
    let mut analyzers: Vec<Box<dyn SectionAnalyzer>> = Vec::new();
    if analysis.is_section_enabled(SECTION_INFRASTRUCTURE) {
        analyzers.push(Box::new(InfrastructureAnalyzer));
    }
    if analysis.is_section_enabled(SECTION_CONFIGURATION) {
        analyzers.push(Box::new(ConfigurationAnalyzer));
        analyzers.push(Box::new(ExtendedConfigurationAnalyzer));
    }
    if analysis.is_section_enabled(SECTION_OPERATIONS) {
        analyzers.push(Box::new(OperationsAnalyzer));
    }
    if analysis.is_section_enabled(SECTION_OPERATIONS_LOGS) {
        analyzers.push(Box::new(OperationsLogsAnalyzer));
    }
    if analysis.is_section_enabled(SECTION_DATAMODEL) {
        analyzers.push(Box::new(DataModelAnalyzer));
    }
    if analysis.is_section_enabled(SECTION_SECURITY) {
        analyzers.push(Box::new(SecurityAnalyzer));
    }
    analyzers
}

/// Cluster health analysis over the monitoring API.
///
/// One run collects a [`ClusterState`] for the configured window, hands it
/// by reference to every enabled [`SectionAnalyzer`] and packages the
/// results into an [`AnalysisReport`]. A failing section is recorded as
/// [`SectionResult::Failed`] and never stops the others.
pub struct Analyzer {
    config: AppConfig,
    client: Arc<dyn MonitoringApi>,
    analyzers: Vec<Box<dyn SectionAnalyzer>>,
}

impl Analyzer {
    /// Creates a new `AnalyzerBuilder` for constructing an `Analyzer` instance.
    pub fn builder(config: AppConfig) -> AnalyzerBuilder {
        AnalyzerBuilder::new(config)
    }

    pub fn sections(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|a| a.section()).collect()
    }

    /// Analyzes the last `analysis.hours` hours.
    pub async fn analyze(&self) -> Result<AnalysisReport, Box<dyn Error + Send + Sync>> {
        let end = Utc::now();
        let start = end - ChronoDuration::hours(i64::from(self.config.analysis.hours));
        self.analyze_window(start, end).await
    }

    /// Collects and analyzes the window `[start, end]`.
    ///
    /// # Errors
    ///
    /// Collection and analyzer failures are absorbed into the report, so
    /// this only fails on errors outside the run itself.
    pub async fn analyze_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<AnalysisReport, Box<dyn Error + Send + Sync>> {
        let mut timings = Timings::new();
        let cluster = &self.config.cluster;
        info!(
            "Starting analysis, org={}, cluster={}, start={}, end={}",
            cluster.org, cluster.cluster, start, end
        );

        let health = measure_dur_async(
            "health_check_dur",
            &mut timings,
            || async { self.client.health_check().await },
            Some(|_: &()| "API reachable".to_string()),
        )
        .await;
        if let Err(e) = health {
            warn!("API health check failed, continuing with collection, error={}", e);
        }

        let collector = Collector::new(
            Arc::clone(&self.client),
            cluster.clone(),
            self.config.analysis.metrics_resolution_seconds,
        )
        .with_log_collection(self.config.analysis.is_section_enabled(SECTION_OPERATIONS_LOGS));
        let state = measure_dur_async(
            "collect_dur",
            &mut timings,
            || async { Ok::<ClusterState, Infallible>(collector.collect(start, end).await) },
            Some(|s: &ClusterState| {
                format!(
                    "Collected nodes={}, keyspaces={}, metrics={}",
                    s.nodes.len(),
                    s.keyspaces.len(),
                    s.metrics.len()
                )
            }),
        )
        .await?;

        let results = self.run_sections(&state, &mut timings);

        let info = ClusterInfo {
            organization: cluster.org.clone(),
            cluster_type: cluster.cluster_type.clone(),
            cluster_name: cluster.cluster.clone(),
            analysis_time: Utc::now(),
            time_range: TimeRange { start, end },
        };
        let mut report = AnalysisReport::new(info, state, results);
        report.timed_phases = timed_phases(&timings);
        Ok(report)
    }

    /// Runs every analyzer against `state`, one section result per analyzer.
    pub fn run_sections(&self, state: &ClusterState, timings: &mut Timings<'_>) -> Vec<SectionReport> {
        let thresholds = &self.config.analysis.thresholds;
        self.analyzers
            .iter()
            .map(|analyzer| {
                let section = analyzer.section();
                let span = info_span!("analyzer", section = section);
                let _guard = span.enter();

                let result: SectionResult = measure_dur(
                    section,
                    timings,
                    || analyzer.analyze(state, thresholds).into(),
                    Some(|r: &SectionResult| match r {
                        SectionResult::Completed(result) => {
                            format!("recommendations={}", result.recommendations.len())
                        }
                        SectionResult::Failed { .. } => "failed".to_string(),
                    }),
                );
                if let Some(e) = result.error() {
                    error!("Analyzer failed, section={}, error={}", section, e);
                }
                SectionReport {
                    section: section.to_string(),
                    result,
                }
            })
            .collect()
    }
}

fn timed_phases(timings: &Timings<'_>) -> TimedPhases {
    TimedPhases {
        duration_collection: timings
            .iter()
            .map(|(name, start, dur)| {
                (
                    name.to_string(),
                    start
                        .duration_since(UNIX_EPOCH)
                        .map(|d| d.as_millis())
                        .unwrap_or_default(),
                    dur.as_millis(),
                )
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::analyzer::{AnalysisError, AnalysisOutcome};
    use crate::client::{ApiError, ApiResult, LogSearch};
    use crate::config::{ClusterConfig, Thresholds};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Three AllowAll nodes, one low RF keyspace, an unreachable health endpoint.
    #[derive(Default)]
    struct FakeApi {
        metric_calls: AtomicUsize,
        log_calls: AtomicUsize,
    }

    fn node(id: &str) -> Value {
        json!({
            "host_id": id,
            "DC": "dc1",
            "Details": {
                "host_Hostname": format!("cass-{}", id),
                "comp_listen_address": "10.0.0.1",
                "comp_authenticator": "AllowAllAuthenticator",
                "comp_authorizer": "AllowAllAuthorizer"
            }
        })
    }

    #[async_trait]
    impl MonitoringApi for FakeApi {
        async fn health_check(&self) -> ApiResult<()> {
            Err(ApiError::Connection("refused".to_string()))
        }

        async fn get_orgs(&self) -> ApiResult<Vec<Value>> {
            Ok(Vec::new())
        }

        async fn get_cluster_settings(&self, _cluster: &ClusterConfig) -> ApiResult<Value> {
            Ok(json!({}))
        }

        async fn get_nodes(&self, _cluster: &ClusterConfig) -> ApiResult<Vec<Value>> {
            Ok(vec![node("n1"), node("n2"), node("n3")])
        }

        async fn get_keyspaces(&self, _cluster: &ClusterConfig) -> ApiResult<Vec<Value>> {
            Ok(vec![json!({
                "Name": "demo",
                "ReplicationStrategy": "org.apache.cassandra.locator.SimpleStrategy@1",
                "ReplicationParams": "ReplicationParams{class=org.apache.cassandra.locator.SimpleStrategy, replication_factor=1}",
                "Tables": []
            })])
        }

        async fn query_metrics_range(
            &self,
            _org: &str,
            _query: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
            _step_seconds: u32,
        ) -> ApiResult<Value> {
            self.metric_calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"status": "success", "data": {"resultType": "matrix", "result": []}}))
        }

        async fn query_metrics_instant(&self, _org: &str, _query: &str) -> ApiResult<Value> {
            Ok(json!({}))
        }

        async fn search_logs(
            &self,
            _cluster: &ClusterConfig,
            _search: &LogSearch,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> ApiResult<Value> {
            self.log_calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"metadata": {"_count": 0}, "histogram": []}))
        }

        async fn get_events(
            &self,
            _cluster: &ClusterConfig,
            _search: &LogSearch,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> ApiResult<Vec<Value>> {
            Ok(Vec::new())
        }

        async fn get_agent_config(&self, _cluster: &ClusterConfig) -> ApiResult<Value> {
            Ok(json!({}))
        }
    }

    struct BrokenAnalyzer;

    impl SectionAnalyzer for BrokenAnalyzer {
        fn section(&self) -> &'static str {
            "broken"
        }

        fn analyze(&self, _state: &ClusterState, _thresholds: &Thresholds) -> AnalysisOutcome {
            Err(AnalysisError::Internal("unexpected metric shape".to_string()))
        }
    }

    fn config(extra: &str) -> AppConfig {
        let yaml = format!(
            "cluster:\n  org: acme\n  cluster: prod\naxonops:\n  token: secret\n{}",
            extra
        );
        AppConfig::from_yaml_str(&yaml, None).unwrap()
    }

    #[tokio::test]
    async fn test_full_run_with_default_sections() {
        let api = Arc::new(FakeApi::default());
        let analyzer = Analyzer::builder(config(""))
            .with_client(api.clone())
            .build()
            .await
            .unwrap();

        assert_eq!(
            analyzer.sections(),
            vec![
                "infrastructure",
                "configuration",
                "extended_configuration",
                "operations",
                "operations_logs",
                "datamodel",
                "security"
            ]
        );

        let report = analyzer.analyze().await.unwrap();

        assert_eq!(report.cluster_info.cluster_name, "prod");
        assert_eq!(report.cluster_summary.total_nodes, 3);
        assert!(report.failed_sections().is_empty());
        assert!(api.metric_calls.load(Ordering::SeqCst) > 0);
        assert!(api.log_calls.load(Ordering::SeqCst) > 0);

        let security = report.section("security").unwrap().recommendations();
        let auth = security
            .iter()
            .find(|r| r.title.contains("Authentication Disabled"))
            .unwrap();
        assert_eq!(auth.context.affected_nodes.as_ref().map(Vec::len), Some(3));

        let datamodel = report.section("datamodel").unwrap().recommendations();
        let low_rf = datamodel
            .iter()
            .find(|r| r.title == "Low Replication Factor for demo")
            .unwrap();
        assert_eq!(low_rf.context.get("current_rf"), Some(json!(1)));

        let phases: Vec<&str> = report
            .timed_phases
            .duration_collection
            .iter()
            .map(|(name, _, _)| name.as_str())
            .collect();
        assert_eq!(phases[..2], ["health_check_dur", "collect_dur"]);
        assert!(phases.contains(&"security"));
    }

    #[tokio::test]
    async fn test_disabled_sections_are_skipped() {
        let analysis = "analysis:\n  enable_sections:\n    configuration: false\n    operations_logs: false\n";
        let api = Arc::new(FakeApi::default());
        let analyzer = Analyzer::builder(config(analysis))
            .with_client(api.clone())
            .build()
            .await
            .unwrap();

        let sections = analyzer.sections();
        assert!(!sections.contains(&"configuration"));
        assert!(!sections.contains(&"extended_configuration"));
        assert!(!sections.contains(&"operations_logs"));

        analyzer.analyze().await.unwrap();
        assert_eq!(api.log_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_section_is_isolated() {
        let analyzer = Analyzer::builder(config(""))
            .with_client(Arc::new(FakeApi::default()))
            .with_analyzers(vec![Box::new(BrokenAnalyzer), Box::new(SecurityAnalyzer)])
            .build()
            .await
            .unwrap();

        let report = analyzer.analyze().await.unwrap();

        assert_eq!(report.failed_sections(), vec!["broken"]);
        assert_eq!(
            report.section("broken").and_then(SectionResult::error),
            Some("Internal error: unexpected metric shape")
        );
        assert!(!report.section("security").unwrap().recommendations().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_fails_build() {
        let mut bad = config("");
        bad.cluster.org = String::new();
        let result = Analyzer::builder(bad)
            .with_client(Arc::new(FakeApi::default()))
            .build()
            .await;
        assert!(result.is_err());
    }
}
