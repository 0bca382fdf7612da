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

//! # Cassandra Pulse
//!
//! A Rust library for assessing the health of Apache Cassandra clusters monitored by AxonOps.
//!
//! Cassandra Pulse collects node inventory, keyspace schemas, time-series metrics and log
//! histograms for a time window, runs a set of independent section analyzers over that
//! snapshot and renders the findings as a Markdown report and a JSON document.
//!
//! ## Features
//!
//! - **Infrastructure**: CPU, memory, disk, swap and hardware consistency across nodes
//! - **Configuration**: JVM heap and GC settings, cassandra.yaml drift, seed topology
//! - **Operations**: Dropped messages, pending compactions, blocked tasks, GC pauses, log error rates
//! - **Data model**: Replication factors, table schemas, compaction strategies, unused tables
//! - **Security**: Authentication, authorization and encryption settings
//! - **Performance tracking**: Built-in timing of collection and every analysis section
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cassandra_pulse::{Analyzer, AppConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! // Cluster, API endpoint and thresholds come from YAML
//! let config = AppConfig::from_file("config.yaml")?;
//!
//! // Create analyzer
//! let analyzer = Analyzer::builder(config)
//!     .build()
//!     .await?;
//!
//! // Collect the configured window and run every enabled section
//! let report = analyzer.analyze().await?;
//!
//! // Print the console summary and write the Markdown and JSON files
//! println!("{}", report);
//! let files = report.write_to("./reports")?;
//! println!("{}", files.markdown.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`analyze`] - The orchestrator and the section analyzers
//! - [`client`] - AxonOps API access behind the [`client::MonitoringApi`] trait
//! - [`collect`] - Building a [`model::ClusterState`] from API responses
//! - [`config`] - YAML configuration and thresholds
//! - [`model`] - Cluster, node, schema, metric and recommendation types
//! - [`report`] - Aggregation and Markdown/JSON output
//! - [`util`] - Timing and retry helpers

pub mod analyze;
pub mod client;
pub mod collect;
pub mod config;
pub mod model;
pub mod report;
pub mod util;

// Re-export commonly used types
pub use analyze::Analyzer;
pub use config::AppConfig;
pub use report::AnalysisReport;
