use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Well-known `Details` keys reported by the AxonOps agent.
///
/// Agent keys are prefixed with `comp_` for Cassandra settings and `host_` for
/// host facts. Anything not listed here is still reachable through
/// [`NodeDetails::get`].
pub mod keys {
    pub const HOSTNAME: &str = "host_Hostname";
    pub const LISTEN_ADDRESS: &str = "comp_listen_address";
    pub const RACK: &str = "comp_rack";
    pub const RACK_FALLBACK: &str = "rack";
    pub const RELEASE_VERSION: &str = "comp_releaseVersion";
    pub const RELEASE_VERSION_FALLBACK: &str = "release_version";
    pub const CASSANDRA_VERSION: &str = "comp_cassandra_version";
    pub const ENDPOINT_SNITCH: &str = "comp_endpoint_snitch";
    pub const JVM_ARGUMENTS: &str = "comp_jvm_input arguments";
    pub const AUTHENTICATOR: &str = "comp_authenticator";
    pub const AUTHORIZER: &str = "comp_authorizer";
    pub const SEED_PROVIDER: &str = "comp_seed_provider";
    pub const NUM_TOKENS: &str = "comp_num_tokens";
    pub const VIRTUAL_MEMORY_TOTAL: &str = "host_virtualmem_Total";
    pub const SWAP_TOTAL: &str = "host_swapmem_Total";
    pub const SWAP_FREE: &str = "host_swapmem_Free";
    pub const CPU_COUNT: &str = "host_cpu_CPU";
    pub const PROCESSOR_COUNT: &str = "host_CPU_ProcessorCount";
    pub const JVM_AVAILABLE_PROCESSORS: &str = "comp_jvm_cassandra.available_processors";

    /// Keys whose truthy presence marks a node as reporting.
    pub const LIVENESS_INDICATORS: [&str; 6] = [
        "host_uptime",
        "agent_version",
        "release_version",
        "comp_listen_address",
        "host_CPU_Percent",
        "host_Memory_Total",
    ];
}

/// Free-form key/value facts attached to a node.
///
/// Values stay as JSON because the agent reports numbers both as JSON numbers
/// and as strings. The accessors coerce on read and return `None` for anything
/// that does not coerce, so one bad value never aborts a check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeDetails(BTreeMap<String, Value>);

impl NodeDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Value rendered as a string. Strings are returned as-is, scalars via their
    /// JSON text.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).map(value_to_string)
    }

    pub fn get_str_or(&self, key: &str, default: &str) -> String {
        self.get_str(key).unwrap_or_else(|| default.to_string())
    }

    /// Integer coercion. Floats truncate toward zero, strings are trimmed first.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(value_to_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(value_to_f64)
    }

    /// Truthiness: non-empty strings, non-zero numbers, `true`, and non-empty
    /// arrays or objects.
    pub fn is_truthy(&self, key: &str) -> bool {
        match self.get(key) {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
            Some(Value::Null) => false,
        }
    }
}

impl From<BTreeMap<String, Value>> for NodeDetails {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for NodeDetails {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

pub(crate) fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// A Cassandra node as reported by the monitoring API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub host_id: String,
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub cluster: String,
    #[serde(rename = "DC", default)]
    pub dc: String,
    #[serde(rename = "Details", default)]
    pub details: NodeDetails,
}

impl Node {
    pub fn new(host_id: impl Into<String>, dc: impl Into<String>, details: NodeDetails) -> Self {
        Self {
            host_id: host_id.into(),
            org: String::new(),
            cluster: String::new(),
            dc: dc.into(),
            details,
        }
    }

    pub fn datacenter(&self) -> &str {
        &self.dc
    }

    pub fn rack(&self) -> Option<String> {
        self.details
            .get_str(keys::RACK)
            .or_else(|| self.details.get_str(keys::RACK_FALLBACK))
    }

    pub fn cassandra_version(&self) -> Option<String> {
        self.details
            .get_str(keys::RELEASE_VERSION)
            .or_else(|| self.details.get_str(keys::RELEASE_VERSION_FALLBACK))
    }

    pub fn hostname(&self) -> Option<String> {
        self.details.get_str(keys::HOSTNAME)
    }

    /// `hostname/listen_address`, with `unknown` standing in for missing parts.
    pub fn identifier(&self) -> String {
        format!(
            "{}/{}",
            self.details.get_str_or(keys::HOSTNAME, "unknown"),
            self.details.get_str_or(keys::LISTEN_ADDRESS, "unknown")
        )
    }

    /// Heuristic liveness.
    ///
    /// The API exposes no explicit down signal. A node counts as active when its
    /// details are non-empty and at least one liveness indicator is truthy.
    pub fn is_active(&self) -> bool {
        if self.details.is_empty() {
            return false;
        }
        keys::LIVENESS_INDICATORS
            .iter()
            .any(|k| self.details.is_truthy(k))
    }
}
