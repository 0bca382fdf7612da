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

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::error::ApiResult;
use crate::config::ClusterConfig;

/// Default number of histogram buckets requested for log searches.
pub const DEFAULT_LOG_BUCKETS: u32 = 25;

/// Filter body for log histogram and event searches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogSearch {
    #[serde(rename = "type")]
    pub event_type: String,
    pub f1: String,
    pub f2: String,
    pub host_id: String,
    pub level: String,
    pub source: String,
    pub message: String,
    pub bucket: u32,
}

impl LogSearch {
    /// Search on message text only.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            event_type: String::new(),
            f1: String::new(),
            f2: String::new(),
            host_id: String::new(),
            level: String::new(),
            source: String::new(),
            message: message.into(),
            bucket: DEFAULT_LOG_BUCKETS,
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_host_id(mut self, host_id: impl Into<String>) -> Self {
        self.host_id = host_id.into();
        self
    }
}

/// Read-only access to a monitoring backend.
///
/// The cluster to query is named by a [`ClusterConfig`]. Implementations map
/// transport failures to [`super::ApiError`] and decide themselves whether to
/// retry.
#[async_trait]
pub trait MonitoringApi: Send + Sync {
    /// Checks that the API answers at all.
    ///
    /// # Errors
    ///
    /// Any transport or status failure.
    async fn health_check(&self) -> ApiResult<()>;

    /// Organisations visible to the token.
    async fn get_orgs(&self) -> ApiResult<Vec<Value>>;

    async fn get_cluster_settings(&self, cluster: &ClusterConfig) -> ApiResult<Value>;

    /// Every node of the cluster with its full `Details` map.
    async fn get_nodes(&self, cluster: &ClusterConfig) -> ApiResult<Vec<Value>>;

    /// Keyspaces with their tables and raw replication strings.
    async fn get_keyspaces(&self, cluster: &ClusterConfig) -> ApiResult<Vec<Value>>;

    /// Prometheus range query.
    ///
    /// # Arguments
    ///
    /// * `org` - Organisation the query is routed to
    /// * `query` - PromQL selector
    /// * `start`, `end` - Window bounds, sent as unix seconds
    /// * `step_seconds` - Resolution of the returned series
    async fn query_metrics_range(
        &self,
        org: &str,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step_seconds: u32,
    ) -> ApiResult<Value>;

    /// Prometheus instant query evaluated now.
    async fn query_metrics_instant(&self, org: &str, query: &str) -> ApiResult<Value>;

    /// Histogram of log lines matching `search` within the window.
    async fn search_logs(
        &self,
        cluster: &ClusterConfig,
        search: &LogSearch,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ApiResult<Value>;

    /// Raw cluster events within the window.
    async fn get_events(
        &self,
        cluster: &ClusterConfig,
        search: &LogSearch,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ApiResult<Vec<Value>>;

    async fn get_agent_config(&self, cluster: &ClusterConfig) -> ApiResult<Value>;
}
