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

use crate::analyze::{AnalysisError, AnalysisResult};
use crate::model::{ClusterState, Recommendation, SeverityCounts};
use crate::report::error::ReportResult;
use crate::report::markdown::MarkdownReport;
use crate::util::util::sanitize_file_component;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Error as JsonError;
use std::collections::LinkedList;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use tracing::info;

/// Outcome of one section of the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SectionResult {
    Completed(AnalysisResult),
    Failed { error: String },
}

impl SectionResult {
    /// Findings of a completed section, empty for a failed one.
    pub fn recommendations(&self) -> &[Recommendation] {
        match self {
            SectionResult::Completed(result) => &result.recommendations,
            SectionResult::Failed { .. } => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SectionResult::Completed(_) => None,
            SectionResult::Failed { error } => Some(error),
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            SectionResult::Completed(result) => Some(result),
            SectionResult::Failed { .. } => None,
        }
    }
}

impl From<Result<AnalysisResult, AnalysisError>> for SectionResult {
    fn from(outcome: Result<AnalysisResult, AnalysisError>) -> Self {
        match outcome {
            Ok(result) => SectionResult::Completed(result),
            Err(e) => SectionResult::Failed {
                error: e.to_string(),
            },
        }
    }
}

/// A named section result, in run order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionReport {
    pub section: String,
    pub result: SectionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterInfo {
    pub organization: String,
    pub cluster_type: String,
    pub cluster_name: String,
    pub analysis_time: DateTime<Utc>,
    pub time_range: TimeRange,
}

/// Counters describing the collected state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub total_nodes: usize,
    pub active_nodes: usize,
    pub datacenters: Vec<String>,
    pub keyspaces: usize,
    pub tables: usize,
    pub collection_time: DateTime<Utc>,
    pub collection_duration_seconds: Option<f64>,
}

impl From<&ClusterState> for ClusterSummary {
    fn from(state: &ClusterState) -> Self {
        Self {
            total_nodes: state.total_nodes(),
            active_nodes: state.active_nodes(),
            datacenters: state.datacenters(),
            keyspaces: state.keyspaces.len(),
            tables: state.total_tables(),
            collection_time: state.collection_time,
            collection_duration_seconds: state.collection_duration_seconds,
        }
    }
}

/// Phase timings as `(name, start millis since epoch, duration millis)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimedPhases {
    pub duration_collection: LinkedList<(String, u128, u128)>,
}

/// Paths of the files written by [`AnalysisReport::write_to`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFiles {
    pub markdown: PathBuf,
    pub json: PathBuf,
}

/// Everything one run produced.
///
/// The JSON form carries cluster info, the state summary and the raw
/// section results. The collected state itself is only used for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub cluster_info: ClusterInfo,
    #[serde(rename = "cluster_state")]
    pub cluster_summary: ClusterSummary,
    pub analysis_results: Vec<SectionReport>,
    pub timed_phases: TimedPhases,
    #[serde(skip)]
    pub state: ClusterState,
}

impl AnalysisReport {
    pub fn new(cluster_info: ClusterInfo, state: ClusterState, analysis_results: Vec<SectionReport>) -> Self {
        Self {
            cluster_info,
            cluster_summary: ClusterSummary::from(&state),
            analysis_results,
            timed_phases: TimedPhases::default(),
            state,
        }
    }

    pub fn section(&self, name: &str) -> Option<&SectionResult> {
        self.analysis_results
            .iter()
            .find(|s| s.section == name)
            .map(|s| &s.result)
    }

    /// Per-severity totals over the raw findings of completed sections.
    pub fn severity_counts(&self) -> SeverityCounts {
        self.analysis_results
            .iter()
            .flat_map(|s| s.result.recommendations())
            .collect()
    }

    pub fn failed_sections(&self) -> Vec<&str> {
        self.analysis_results
            .iter()
            .filter(|s| s.result.error().is_some())
            .map(|s| s.section.as_str())
            .collect()
    }

    pub fn to_json(&self) -> Result<String, JsonError> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_markdown(&self, generated: DateTime<Utc>) -> String {
        MarkdownReport::new(self, generated).to_string()
    }

    /// Base name shared by the output files of this report.
    pub fn file_stem(&self, generated: DateTime<Utc>) -> String {
        format!(
            "cassandra_analysis_{}_{}",
            sanitize_file_component(&self.cluster_info.cluster_name),
            generated.format("%Y%m%d_%H%M%S")
        )
    }

    /// Writes the Markdown and JSON reports into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or a file cannot be written, or if
    /// the report cannot be serialized.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> ReportResult<ReportFiles> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let generated = Utc::now();
        let stem = self.file_stem(generated);
        let files = ReportFiles {
            markdown: dir.join(format!("{}.md", stem)),
            json: dir.join(format!("{}.json", stem)),
        };

        std::fs::write(&files.markdown, self.to_markdown(generated))?;
        std::fs::write(&files.json, self.to_json()?)?;
        info!(
            "Reports written, markdown={}, json={}",
            files.markdown.display(),
            files.json.display()
        );
        Ok(files)
    }
}

impl Display for AnalysisReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let info = &self.cluster_info;
        let summary = &self.cluster_summary;
        let counts = self.severity_counts();

        writeln!(f, "\n{}", "━".repeat(80))?;
        writeln!(f, " {:<60} {:>18}", "Cassandra Cluster Health", info.cluster_type)?;
        writeln!(f, "{}", "━".repeat(80))?;
        writeln!(f, " {} ({})", info.cluster_name, info.organization)?;
        writeln!(
            f,
            " {} to {}",
            info.time_range.start.format("%Y-%m-%d %H:%M:%S UTC"),
            info.time_range.end.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(f, "{}", "━".repeat(80))?;

        writeln!(f)?;
        writeln!(f, " {:<41} {}", "Cluster", "Findings")?;
        writeln!(f, "{}", "━".repeat(80))?;
        writeln!(
            f,
            " {:<19} {:>8}              {:<19} {:>8}",
            "Nodes", summary.total_nodes, "Critical", counts.critical
        )?;
        writeln!(
            f,
            " {:<19} {:>8}              {:<19} {:>8}",
            "Active Nodes", summary.active_nodes, "Warning", counts.warning
        )?;
        writeln!(
            f,
            " {:<19} {:>8}              {:<19} {:>8}",
            "Datacenters",
            summary.datacenters.len(),
            "Info",
            counts.info
        )?;
        writeln!(
            f,
            " {:<19} {:>8}              {:<19} {:>8}",
            "Keyspaces",
            summary.keyspaces,
            "Total",
            counts.total()
        )?;

        writeln!(f)?;
        writeln!(f, " Sections")?;
        writeln!(f, "{}", "━".repeat(80))?;
        for section in &self.analysis_results {
            match &section.result {
                SectionResult::Completed(result) => {
                    let c = result.severity_counts();
                    writeln!(
                        f,
                        " {:<30} {:>3} critical {:>3} warning {:>3} info",
                        section.section, c.critical, c.warning, c.info
                    )?;
                }
                SectionResult::Failed { error } => {
                    writeln!(f, " {:<30} FAILED: {}", section.section, error)?;
                }
            }
        }

        if !self.timed_phases.duration_collection.is_empty() {
            writeln!(f)?;
            writeln!(f, " Timings")?;
            writeln!(f, "{}", "━".repeat(80))?;
            for (name, _, duration) in &self.timed_phases.duration_collection {
                writeln!(f, " {:<60} {:>10} ms", name, duration)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, NodeDetails, Severity};
    use serde_json::Value;

    fn sample_report() -> AnalysisReport {
        let state = ClusterState::new("prod cluster").with_node(Node::new(
            "n1",
            "dc1",
            NodeDetails::new().with("host_Hostname", "cass-1"),
        ));
        let now = Utc::now();
        let info = ClusterInfo {
            organization: "acme".to_string(),
            cluster_type: "cassandra".to_string(),
            cluster_name: "prod cluster".to_string(),
            analysis_time: now,
            time_range: TimeRange {
                start: now - chrono::Duration::hours(24),
                end: now,
            },
        };
        let security = AnalysisResult::new(vec![
            Recommendation::new("Authentication Disabled", "off", Severity::Critical, "security"),
            Recommendation::new("Review Encryption", "check", Severity::Info, "security"),
        ]);
        AnalysisReport::new(
            info,
            state,
            vec![
                SectionReport {
                    section: "security".to_string(),
                    result: SectionResult::Completed(security),
                },
                SectionReport {
                    section: "operations".to_string(),
                    result: Err(AnalysisError::Internal("boom".to_string())).into(),
                },
            ],
        )
    }

    #[test]
    fn test_section_result_from_outcome() {
        let failed: SectionResult = Err(AnalysisError::MissingData("no nodes".to_string())).into();
        assert_eq!(failed.error(), Some("Missing data: no nodes"));
        assert!(failed.recommendations().is_empty());

        let ok: SectionResult = Ok(AnalysisResult::default()).into();
        assert!(ok.error().is_none());
        assert!(ok.result().is_some());
    }

    #[test]
    fn test_counts_skip_failed_sections() {
        let report = sample_report();
        let counts = report.severity_counts();
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.info, 1);
        assert_eq!(report.failed_sections(), vec!["operations"]);
        assert_eq!(report.cluster_summary.total_nodes, 1);
    }

    #[test]
    fn test_to_json_shape() {
        let report = sample_report();
        let json: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["cluster_info"]["cluster_name"], "prod cluster");
        assert_eq!(json["cluster_state"]["total_nodes"], 1);
        assert_eq!(json["analysis_results"][0]["section"], "security");
        assert_eq!(json["analysis_results"][0]["result"]["status"], "completed");
        assert_eq!(json["analysis_results"][1]["result"]["status"], "failed");
        assert_eq!(
            json["analysis_results"][1]["result"]["error"],
            "Internal error: boom"
        );
        assert!(json.get("state").is_none());
    }

    #[test]
    fn test_display_lists_sections() {
        let text = sample_report().to_string();
        assert!(text.contains("Cassandra Cluster Health"));
        assert!(text.contains("prod cluster (acme)"));
        assert!(text.contains("FAILED: Internal error: boom"));
    }

    #[test]
    fn test_write_to_creates_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("reports");

        let files = sample_report().write_to(&out).unwrap();

        assert!(files.markdown.exists());
        assert!(files.json.exists());
        let name = files.markdown.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("cassandra_analysis_prod_cluster_"));
        assert!(name.ends_with(".md"));
        assert_eq!(files.json.with_extension("md"), files.markdown);

        let markdown = std::fs::read_to_string(&files.markdown).unwrap();
        assert!(markdown.starts_with("# Cassandra Cluster Health Assessment"));
    }
}
