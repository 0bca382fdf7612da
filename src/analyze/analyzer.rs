use crate::config::Thresholds;
use crate::model::{ClusterState, Recommendation, SeverityCounts};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that abort a whole analyzer.
///
/// Bad individual data points never produce one of these. Checks skip such
/// points and carry on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for analyzer runs
pub type AnalysisOutcome = Result<AnalysisResult, AnalysisError>;

/// Output of one analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub summary: Map<String, Value>,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl AnalysisResult {
    pub fn new(recommendations: Vec<Recommendation>) -> Self {
        Self {
            recommendations,
            summary: Map::new(),
            details: Map::new(),
        }
    }

    pub fn with_summary(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.summary.insert(key.into(), value.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        self.recommendations.iter().collect()
    }
}

/// Rule analyzer over a collected cluster state.
///
/// Every section of the report is produced by one implementation. Analyzers
/// share no state and may run in any order. Returning `Err` marks the whole
/// section as failed without affecting the other sections.
///
/// # Examples
///
/// ```
/// use cassandra_pulse::analyze::{SectionAnalyzer, SecurityAnalyzer};
/// use cassandra_pulse::config::Thresholds;
/// use cassandra_pulse::model::ClusterState;
///
/// let state = ClusterState::new("empty");
/// let result = SecurityAnalyzer.analyze(&state, &Thresholds::default()).unwrap();
/// assert_eq!(result.recommendations.len(), 1); // encryption review reminder
/// ```
pub trait SectionAnalyzer: Send + Sync {
    /// Section key used in the report, e.g. `infrastructure`.
    fn section(&self) -> &'static str;

    /// Runs every check of this section.
    ///
    /// # Arguments
    ///
    /// * `state` - The collected cluster state
    /// * `thresholds` - Configured numeric limits
    ///
    /// # Returns
    ///
    /// The recommendations plus free-form summary and detail values.
    fn analyze(&self, state: &ClusterState, thresholds: &Thresholds) -> AnalysisOutcome;
}
