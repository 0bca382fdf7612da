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

use crate::analyze::common::GcType;
use crate::client::{LogSearch, MonitoringApi};
use crate::collect::decode::{decode_keyspace, decode_matrix, decode_node};
use crate::collect::queries::{metric_queries, LOG_SEARCHES};
use crate::config::ClusterConfig;
use crate::model::node::keys;
use crate::model::{ClusterState, Keyspace, LogHistogram, MetricData, Node};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Builds a [`ClusterState`] from the monitoring API.
///
/// Calls run one after another. A failing call is logged and leaves an empty
/// entry behind so that whatever was collected can still be analyzed.
pub struct Collector {
    api: Arc<dyn MonitoringApi>,
    cluster: ClusterConfig,
    resolution_seconds: u32,
    collect_logs: bool,
}

impl Collector {
    pub fn new(api: Arc<dyn MonitoringApi>, cluster: ClusterConfig, resolution_seconds: u32) -> Self {
        Self {
            api,
            cluster,
            resolution_seconds,
            collect_logs: true,
        }
    }

    /// Skips the log histogram searches when nothing will read them.
    pub fn with_log_collection(mut self, collect_logs: bool) -> Self {
        self.collect_logs = collect_logs;
        self
    }

    /// Collects nodes, schema, metrics and log histograms for `[start, end]`.
    pub async fn collect(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> ClusterState {
        let started = Instant::now();
        let mut state = ClusterState::new(self.cluster.cluster.clone());
        state.cluster_type = self.cluster.cluster_type.clone();
        state.collection_time = Utc::now();

        info!("Collecting node information");
        let nodes = self.collect_nodes().await;
        let gc_metric = gc_metric_for(nodes.first());
        state.nodes = nodes.into_iter().map(|n| (n.host_id.clone(), n)).collect();

        info!("Collecting keyspace and table information");
        state.keyspaces = self.collect_keyspaces().await;

        info!("Collecting metrics");
        state.metrics = self.collect_metrics(start, end, gc_metric).await;

        if self.collect_logs {
            info!("Collecting log events");
            state.log_events = self.collect_log_events(start, end).await;
        }

        let elapsed = started.elapsed().as_secs_f64();
        state.collection_duration_seconds = Some(elapsed);
        info!(
            "Data collection complete, nodes={}, keyspaces={}, metrics={}, duration_seconds={:.2}",
            state.nodes.len(),
            state.keyspaces.len(),
            state.metrics.len(),
            elapsed
        );
        state
    }

    async fn collect_nodes(&self) -> Vec<Node> {
        match self.api.get_nodes(&self.cluster).await {
            Ok(values) => values
                .iter()
                .map(|v| decode_node(v, &self.cluster))
                .collect(),
            Err(e) => {
                warn!("Failed to collect nodes, error={}", e);
                Vec::new()
            }
        }
    }

    async fn collect_keyspaces(&self) -> BTreeMap<String, Keyspace> {
        match self.api.get_keyspaces(&self.cluster).await {
            Ok(values) => values
                .iter()
                .map(decode_keyspace)
                .map(|ks| (ks.name.clone(), ks))
                .collect(),
            Err(e) => {
                warn!("Failed to collect keyspaces, error={}", e);
                BTreeMap::new()
            }
        }
    }

    async fn collect_metrics(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        gc_metric: &str,
    ) -> BTreeMap<String, Vec<MetricData>> {
        let mut metrics = BTreeMap::new();
        for (key, query) in metric_queries(&self.cluster, gc_metric) {
            let series = match self
                .api
                .query_metrics_range(&self.cluster.org, &query, start, end, self.resolution_seconds)
                .await
            {
                Ok(response) => decode_matrix(&response),
                Err(e) => {
                    warn!("Failed to collect metric {}, error={}, query={}", key, e, query);
                    Vec::new()
                }
            };
            debug!("Collected metric {}, series={}", key, series.len());
            metrics.insert(key.to_string(), series);
        }
        metrics
    }

    async fn collect_log_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BTreeMap<String, LogHistogram> {
        let mut events = BTreeMap::new();
        for (category, filter) in LOG_SEARCHES {
            let search = LogSearch::message(filter);
            let histogram = match self.api.search_logs(&self.cluster, &search, start, end).await {
                Ok(response) => LogHistogram::from_value(&response),
                Err(e) => {
                    warn!(
                        "Failed to collect log histogram for {}, error={}, filter={}",
                        category, e, filter
                    );
                    LogHistogram::default()
                }
            };
            debug!(
                "Collected histogram for {}: {} total events",
                category,
                histogram.total_count()
            );
            events.insert(category.to_string(), histogram);
        }
        events
    }
}

/// Young generation metric matching the first node's collector.
fn gc_metric_for(node: Option<&Node>) -> &'static str {
    let Some(node) = node else {
        warn!("No nodes found, defaulting to G1 GC metric");
        return GcType::G1.time_metric();
    };
    let jvm_args = node.details.get_str_or(keys::JVM_ARGUMENTS, "");
    let gc = GcType::from_jvm_args(&jvm_args);
    info!("Detected GC type: {}, using metric: {}", gc.name(), gc.time_metric());
    gc.time_metric()
}
