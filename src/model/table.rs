use crate::model::table_parser::{
    parse_create_table, ParsedColumn, ParsedPrimaryKey, ParsedTable, ParsedTableOptions,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_GC_GRACE_SECONDS: i64 = 864_000;

fn default_gc_grace() -> i64 {
    DEFAULT_GC_GRACE_SECONDS
}

/// A table and its source CQL.
///
/// The CQL is parsed on first access to any derived accessor and the result is
/// kept for the lifetime of the value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Keyspace", default)]
    pub keyspace: String,
    #[serde(rename = "GCGrace", default = "default_gc_grace")]
    pub gc_grace: i64,
    #[serde(rename = "CompactionStrategy", default)]
    pub compaction_strategy: String,
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "CQL", default)]
    pub cql: String,
    #[serde(skip)]
    parsed: OnceCell<ParsedTable>,
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.keyspace == other.keyspace && self.name == other.name
    }
}

impl Table {
    pub fn new(keyspace: impl Into<String>, name: impl Into<String>, cql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keyspace: keyspace.into(),
            gc_grace: DEFAULT_GC_GRACE_SECONDS,
            compaction_strategy: String::new(),
            id: String::new(),
            cql: cql.into(),
            parsed: OnceCell::new(),
        }
    }

    pub fn with_compaction_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.compaction_strategy = strategy.into();
        self
    }

    pub fn with_gc_grace(mut self, gc_grace: i64) -> Self {
        self.gc_grace = gc_grace;
        self
    }

    /// `keyspace.table`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.keyspace, self.name)
    }

    pub fn parsed_data(&self) -> &ParsedTable {
        self.parsed.get_or_init(|| parse_create_table(&self.cql))
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed.get().is_some()
    }

    pub fn is_counter(&self) -> bool {
        self.parsed_data().is_counter
    }

    pub fn has_collections(&self) -> bool {
        self.parsed_data().has_collections
    }

    pub fn has_frozen_collections(&self) -> bool {
        self.parsed_data().has_frozen_collections
    }

    pub fn columns(&self) -> &[ParsedColumn] {
        &self.parsed_data().columns
    }

    pub fn primary_key(&self) -> &ParsedPrimaryKey {
        &self.parsed_data().primary_key
    }

    pub fn partition_keys(&self) -> &[String] {
        &self.primary_key().partition_keys
    }

    pub fn clustering_keys(&self) -> &[String] {
        &self.primary_key().clustering_keys
    }

    pub fn table_options(&self) -> &ParsedTableOptions {
        &self.parsed_data().options
    }

    pub fn compaction_options(&self) -> &BTreeMap<String, String> {
        &self.table_options().compaction
    }

    pub fn compression_options(&self) -> &BTreeMap<String, String> {
        &self.table_options().compression
    }

    pub fn caching_options(&self) -> &BTreeMap<String, String> {
        &self.table_options().caching
    }

    pub fn speculative_retry(&self) -> &str {
        &self.table_options().speculative_retry
    }

    pub fn bloom_filter_fp_chance(&self) -> f64 {
        self.table_options().bloom_filter_fp_chance
    }

    pub fn default_time_to_live(&self) -> i64 {
        self.table_options().default_time_to_live
    }
}

/// A keyspace, its tables and its replication settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyspace {
    pub name: String,
    pub tables: Vec<Table>,
    pub replication_strategy: String,
    /// Datacenter name, or `replication_factor`, to replica count.
    pub replication_options: BTreeMap<String, String>,
}

impl Keyspace {
    pub fn new(name: impl Into<String>, replication_strategy: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
            replication_strategy: replication_strategy.into(),
            replication_options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.replication_options.insert(key.into(), value.into());
        self
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Effective replication factor.
    ///
    /// `SimpleStrategy` reports its configured factor. `NetworkTopologyStrategy`
    /// reports the minimum across datacenters, since the weakest datacenter
    /// bounds durability. Anything unparseable falls back to 1.
    pub fn replication_factor(&self) -> i64 {
        match self.replication_strategy.as_str() {
            "SimpleStrategy" => self
                .replication_options
                .get("replication_factor")
                .and_then(|rf| rf.trim().parse::<i64>().ok())
                .unwrap_or(1),
            "NetworkTopologyStrategy" => self
                .replication_options
                .iter()
                .filter(|(k, _)| k.as_str() != "class")
                .filter_map(|(_, v)| v.trim().parse::<i64>().ok())
                .min()
                .unwrap_or(1),
            _ => 1,
        }
    }
}
