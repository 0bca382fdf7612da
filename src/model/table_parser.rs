//! Parser for single `CREATE TABLE` statements.
//!
//! The parser is a scanner over a constrained DDL shape rather than a CQL grammar.
//! It recovers the column list, the primary key layout and the `WITH` clause options.
//! Any option whose value cannot be coerced keeps its Cassandra default, and no input
//! causes the parser to fail.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static IF_NOT_EXISTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)IF\s+NOT\s+EXISTS\s+").expect("valid regex"));
static WITH_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\)\s*WITH\s+").expect("valid regex"));
static TABLE_BODY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)CREATE\s+TABLE\s+(?:"[^"]+"|\w+)(?:\.(?:"[^"]+"|\w+))?\s*\((.*)\)"#)
        .expect("valid regex")
});
/// `STATIC` as a keyword after the type, never as part of a column name.
static STATIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+STATIC\b").expect("valid regex"));
static COLUMN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^("[^"]+"|\w+)\s+(.+?)(?:\s+PRIMARY\s+KEY)?$"#).expect("valid regex")
});
static INLINE_PK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\sPRIMARY\s+KEY$").expect("valid regex"));
static PRIMARY_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)PRIMARY\s+KEY\s*\((.*)\)").expect("valid regex"));
static COMPOSITE_PK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(([^)]+)\)\s*(?:,\s*(.+))?").expect("valid regex"));
static OPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\w+)\s*=\s*('(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"|\{[^}]+\}|\S+)"#).expect("valid regex")
});
static DICT_PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'([^']+)'\s*:\s*'([^']+)'").expect("valid regex"));

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedColumn {
    pub name: String,
    /// Raw type text, e.g. `frozen<map<text, text>>`.
    pub data_type: String,
    pub is_static: bool,
    pub is_frozen: bool,
}

/// Partition and clustering key layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPrimaryKey {
    pub partition_keys: Vec<String>,
    pub clustering_keys: Vec<String>,
}

impl ParsedPrimaryKey {
    pub fn is_empty(&self) -> bool {
        self.partition_keys.is_empty() && self.clustering_keys.is_empty()
    }
}

/// Table options from the `WITH` clause, defaulted the way Cassandra defaults them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTableOptions {
    pub bloom_filter_fp_chance: f64,
    pub caching: BTreeMap<String, String>,
    pub comment: String,
    pub compaction: BTreeMap<String, String>,
    pub compression: BTreeMap<String, String>,
    pub gc_grace_seconds: i64,
    pub memtable_flush_period_in_ms: i64,
    pub min_index_interval: i64,
    pub max_index_interval: i64,
    pub speculative_retry: String,
    pub crc_check_chance: f64,
    pub cdc: bool,
    pub additional_write_policy: String,
    pub default_time_to_live: i64,
}

impl Default for ParsedTableOptions {
    fn default() -> Self {
        Self {
            bloom_filter_fp_chance: 0.01,
            caching: BTreeMap::new(),
            comment: String::new(),
            compaction: BTreeMap::new(),
            compression: BTreeMap::new(),
            gc_grace_seconds: 864_000,
            memtable_flush_period_in_ms: 0,
            min_index_interval: 128,
            max_index_interval: 2048,
            speculative_retry: "99p".to_string(),
            crc_check_chance: 1.0,
            cdc: false,
            additional_write_policy: "99p".to_string(),
            default_time_to_live: 0,
        }
    }
}

/// Everything recovered from one `CREATE TABLE` statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedTable {
    pub columns: Vec<ParsedColumn>,
    pub primary_key: ParsedPrimaryKey,
    pub options: ParsedTableOptions,
    pub is_counter: bool,
    pub has_collections: bool,
    pub has_frozen_collections: bool,
}

/// Parses a single `CREATE TABLE` statement.
///
/// # Arguments
///
/// * `cql` - The statement text, optionally terminated by `;` and optionally
///   containing `IF NOT EXISTS`
///
/// # Returns
///
/// The parsed table. Statements that do not match the expected shape yield
/// an empty column list and an empty primary key.
///
/// # Examples
///
/// ```
/// use cassandra_pulse::model::table_parser::parse_create_table;
///
/// let parsed = parse_create_table(
///     "CREATE TABLE ks.t (id uuid, ts timestamp, PRIMARY KEY (id, ts)) WITH gc_grace_seconds = 3600;",
/// );
/// assert_eq!(parsed.columns.len(), 2);
/// assert_eq!(parsed.primary_key.clustering_keys, vec!["ts".to_string()]);
/// assert_eq!(parsed.options.gc_grace_seconds, 3600);
/// ```
pub fn parse_create_table(cql: &str) -> ParsedTable {
    let cql = clean_cql(cql);
    let (table_def, with_clause) = split_table_and_options(&cql);
    let (columns, primary_key) = parse_table_definition(table_def);

    let is_counter = columns
        .iter()
        .any(|c| c.data_type.to_lowercase().contains("counter"));

    let mut has_collections = false;
    let mut has_frozen_collections = false;
    for col in &columns {
        if is_collection_type(&col.data_type) {
            has_collections = true;
            if col.is_frozen {
                has_frozen_collections = true;
            }
        }
    }

    let options = with_clause
        .map(parse_with_clause)
        .unwrap_or_default();

    ParsedTable {
        columns,
        primary_key,
        options,
        is_counter,
        has_collections,
        has_frozen_collections,
    }
}

/// Returns true when the type text names a `list`, `set` or `map`.
pub fn is_collection_type(data_type: &str) -> bool {
    let lower = data_type.to_lowercase();
    ["list<", "set<", "map<"].iter().any(|t| lower.contains(t))
}

fn clean_cql(cql: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(cql, " ");
    IF_NOT_EXISTS_RE
        .replace_all(&collapsed, "")
        .trim()
        .to_string()
}

fn split_table_and_options(cql: &str) -> (&str, Option<&str>) {
    match WITH_SPLIT_RE.find(cql) {
        Some(m) => {
            // Keep the closing parenthesis with the definition block
            let table_def = &cql[..m.start() + 1];
            let with_clause = cql[m.end()..].trim_end_matches(';');
            (table_def, Some(with_clause))
        }
        None => (cql.trim_end_matches(';'), None),
    }
}

fn parse_table_definition(table_def: &str) -> (Vec<ParsedColumn>, ParsedPrimaryKey) {
    let mut columns = Vec::new();
    let mut primary_key = ParsedPrimaryKey::default();

    let body = match TABLE_BODY_RE.captures(table_def).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => return (columns, primary_key),
    };

    for part in split_top_level(body) {
        if part.to_uppercase().starts_with("PRIMARY KEY") {
            primary_key = parse_primary_key(&part);
        } else if let Some((col, inline_pk)) = parse_column_definition(&part) {
            if inline_pk && primary_key.is_empty() {
                primary_key.partition_keys.push(col.name.clone());
            }
            columns.push(col);
        }
    }

    (columns, primary_key)
}

/// Splits on commas at nesting depth zero. Both `()` and `<>` count as nesting
/// so `map<text, text>` stays in one piece.
fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;

    for ch in text.chars() {
        match ch {
            '(' | '<' => depth += 1,
            ')' | '>' => depth -= 1,
            ',' if depth == 0 => {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed.to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        parts.push(trimmed.to_string());
    }
    parts
}

/// Parses `name TYPE [STATIC] [PRIMARY KEY]`. The boolean is true for an inline
/// primary key declaration.
fn parse_column_definition(col_def: &str) -> Option<(ParsedColumn, bool)> {
    let is_static = STATIC_RE.is_match(col_def);
    let without_static = STATIC_RE.replace_all(col_def, "");
    let trimmed = without_static.trim();
    let inline_pk = INLINE_PK_RE.is_match(trimmed);

    let caps = COLUMN_RE.captures(trimmed)?;
    let name = unquote(caps.get(1)?.as_str());
    let data_type = caps.get(2)?.as_str().trim().to_string();
    let is_frozen = data_type.to_lowercase().contains("frozen");

    Some((
        ParsedColumn {
            name,
            data_type,
            is_static,
            is_frozen,
        },
        inline_pk,
    ))
}

/// Strips the double quotes of a case-sensitive identifier.
fn unquote(name: &str) -> String {
    let name = name.trim();
    name.strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .unwrap_or(name)
        .to_string()
}

fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(unquote)
        .filter(|k| !k.is_empty())
        .collect()
}

fn parse_primary_key(pk_def: &str) -> ParsedPrimaryKey {
    let content = match PRIMARY_KEY_RE.captures(pk_def).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().trim(),
        None => return ParsedPrimaryKey::default(),
    };

    if content.starts_with('(') {
        return match COMPOSITE_PK_RE.captures(content) {
            Some(caps) => ParsedPrimaryKey {
                partition_keys: caps.get(1).map(|m| split_names(m.as_str())).unwrap_or_default(),
                clustering_keys: caps.get(2).map(|m| split_names(m.as_str())).unwrap_or_default(),
            },
            None => ParsedPrimaryKey::default(),
        };
    }

    // Without parentheses the first name is always the partition key
    let mut keys = split_names(content).into_iter();
    match keys.next() {
        Some(first) => ParsedPrimaryKey {
            partition_keys: vec![first],
            clustering_keys: keys.collect(),
        },
        None => ParsedPrimaryKey::default(),
    }
}

fn parse_with_clause(with_clause: &str) -> ParsedTableOptions {
    let mut options = ParsedTableOptions::default();

    for caps in OPTION_RE.captures_iter(with_clause) {
        let (Some(key), Some(raw)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let key = key.as_str().to_lowercase();
        let raw = raw.as_str();
        let value = raw
            .strip_prefix('\'')
            .and_then(|v| v.strip_suffix('\''))
            .unwrap_or(raw);

        match key.as_str() {
            "bloom_filter_fp_chance" => set_parsed(&mut options.bloom_filter_fp_chance, value),
            "gc_grace_seconds" => set_parsed(&mut options.gc_grace_seconds, value),
            "memtable_flush_period_in_ms" => {
                set_parsed(&mut options.memtable_flush_period_in_ms, value)
            }
            "min_index_interval" => set_parsed(&mut options.min_index_interval, value),
            "max_index_interval" => set_parsed(&mut options.max_index_interval, value),
            "crc_check_chance" => set_parsed(&mut options.crc_check_chance, value),
            "default_time_to_live" => set_parsed(&mut options.default_time_to_live, value),
            "cdc" => options.cdc = value.eq_ignore_ascii_case("true"),
            "speculative_retry" => options.speculative_retry = value.to_string(),
            "additional_write_policy" => options.additional_write_policy = value.to_string(),
            "comment" => options.comment = value.to_string(),
            "caching" => options.caching = parse_dict_value(value),
            "compaction" => options.compaction = parse_dict_value(value),
            "compression" => options.compression = parse_dict_value(value),
            _ => {}
        }
    }

    options
}

/// Overwrites `slot` only when `value` parses.
fn set_parsed<T: std::str::FromStr>(slot: &mut T, value: &str) {
    if let Ok(parsed) = value.trim().parse::<T>() {
        *slot = parsed;
    }
}

fn parse_dict_value(value: &str) -> BTreeMap<String, String> {
    let mut result = BTreeMap::new();
    if let Some(content) = value.strip_prefix('{').and_then(|v| v.strip_suffix('}')) {
        for caps in DICT_PAIR_RE.captures_iter(content) {
            if let (Some(k), Some(v)) = (caps.get(1), caps.get(2)) {
                result.insert(k.as_str().to_string(), v.as_str().to_string());
            }
        }
    }
    result
}
