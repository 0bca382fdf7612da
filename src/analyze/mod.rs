pub mod analyze;
pub mod analyzer;
pub mod common;
pub mod configuration;
pub mod datamodel;
pub mod extended_configuration;
pub mod infrastructure;
pub mod operations;
pub mod operations_logs;
pub mod security;
pub mod table;

pub use analyze::{enabled_analyzers, Analyzer, AnalyzerBuilder};
pub use analyzer::{AnalysisError, AnalysisOutcome, AnalysisResult, SectionAnalyzer};
pub use configuration::ConfigurationAnalyzer;
pub use datamodel::DataModelAnalyzer;
pub use extended_configuration::ExtendedConfigurationAnalyzer;
pub use infrastructure::InfrastructureAnalyzer;
pub use operations::OperationsAnalyzer;
pub use operations_logs::OperationsLogsAnalyzer;
pub use security::SecurityAnalyzer;
pub use table::TableAnalyzer;
