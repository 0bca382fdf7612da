//! Run output: aggregation of findings, Markdown and JSON rendering.
//!
//! - [`aggregate`] - Folding per-node findings and section metadata
//! - [`markdown`] - The Markdown health assessment
//! - [`report`] - [`AnalysisReport`], its console summary and file output

pub mod aggregate;
pub mod error;
pub mod markdown;
pub mod report;

pub use aggregate::{aggregate_recommendations, AggregatedRecommendation};
pub use error::{ReportError, ReportResult};
pub use report::{AnalysisReport, ClusterInfo, ReportFiles, SectionReport, SectionResult, TimeRange};
