//! Typed containers for collected cluster data and analyzer output.
//!
//! - [`table_parser`] - `CREATE TABLE` parsing
//! - [`table`] - Tables and keyspaces
//! - [`node`] - Nodes and their free-form details
//! - [`cluster`] - The per-run [`ClusterState`] aggregate
//! - [`metrics`] - Time-series containers
//! - [`recommendation`] - Findings emitted by analyzers

pub mod cluster;
pub mod metrics;
pub mod node;
pub mod recommendation;
pub mod table;
pub mod table_parser;

pub use cluster::{ClusterState, LogHistogram};
pub use metrics::{MetricData, MetricPoint};
pub use node::{Node, NodeDetails};
pub use recommendation::{Recommendation, RecommendationContext, Severity, SeverityCounts};
pub use table::{Keyspace, Table};
pub use table_parser::{parse_create_table, ParsedColumn, ParsedPrimaryKey, ParsedTable, ParsedTableOptions};
