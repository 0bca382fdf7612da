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

//! Constants shared by the section analyzers.

/// Keyspaces owned by Cassandra itself. Data model checks skip them.
pub const SYSTEM_KEYSPACES: [&str; 5] = [
    "system",
    "system_auth",
    "system_distributed",
    "system_schema",
    "system_traces",
];

/// Section keys, in report order.
pub const SECTION_INFRASTRUCTURE: &str = "infrastructure";
pub const SECTION_CONFIGURATION: &str = "configuration";
pub const SECTION_OPERATIONS: &str = "operations";
pub const SECTION_OPERATIONS_LOGS: &str = "operations_logs";
pub const SECTION_DATAMODEL: &str = "datamodel";
pub const SECTION_SECURITY: &str = "security";
pub const SECTION_EXTENDED_CONFIGURATION: &str = "extended_configuration";

/// Table checks. Their findings are reported inside the data model section.
pub const SECTION_TABLE: &str = "table";

/// Recommendation categories. Several sections share one.
pub const CATEGORY_INFRASTRUCTURE: &str = "infrastructure";
pub const CATEGORY_CONFIGURATION: &str = "configuration";
pub const CATEGORY_OPERATIONS: &str = "operations";
pub const CATEGORY_DATAMODEL: &str = "datamodel";
pub const CATEGORY_SECURITY: &str = "security";

/// Where cassandra.yaml-backed findings point the reader.
pub const CASSANDRA_YAML: &str = "cassandra.yaml";

/// Where JVM findings point the reader.
pub const JVM_FLAGS: &str = "JVM startup flags";

/// Where kernel tunables live.
pub const SYSCTL_LOCATION: &str = "/etc/sysctl.conf or /etc/sysctl.d/";

pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Minimum recommended node count for production clusters.
pub const MIN_PRODUCTION_NODES: usize = 3;

/// Replication factor assumed when no user keyspace states one.
pub const DEFAULT_TYPICAL_RF: i64 = 3;

/// Required vm.max_map_count.
pub const MIN_MAX_MAP_COUNT: i64 = 1_048_575;

/// Upper bound on vnodes before operational cost becomes severe.
pub const VNODES_CRITICAL: i64 = 48;
pub const VNODES_WARNING: i64 = 32;

/// Cassandra defaults consulted when a node does not report a setting.
pub const DEFAULT_COMPACTION_THROUGHPUT_MB: i64 = 16;
pub const DEFAULT_CONCURRENT_COMPACTORS: i64 = 2;
pub const DEFAULT_STREAM_THROUGHPUT_MBITS: i64 = 200;
pub const DEFAULT_STREAMING_SOCKET_TIMEOUT_MS: i64 = 86_400_000;
pub const DEFAULT_CONCURRENT_READS: i64 = 32;

pub fn is_system_keyspace(name: &str) -> bool {
    SYSTEM_KEYSPACES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_keyspaces() {
        assert!(is_system_keyspace("system"));
        assert!(is_system_keyspace("system_auth"));
        assert!(!is_system_keyspace("system_views"));
        assert!(!is_system_keyspace("demo"));
    }

    #[test]
    fn test_byte_constants() {
        assert_eq!(BYTES_PER_GB, 1073741824.0);
        assert_eq!(BYTES_PER_MB * 1024.0, BYTES_PER_GB);
    }
}
