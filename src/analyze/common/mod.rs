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

//! Common utilities shared across section analyzers.
//!
//! # Modules
//!
//! - [`constants`] - System keyspaces, section keys and Cassandra defaults
//! - [`jvm`] - Heap size parsing and garbage collector detection

pub mod constants;
pub mod jvm;

pub use constants::*;
pub use jvm::{parse_max_heap, GcType, HeapSetting};

use std::collections::BTreeMap;

/// Groups node identifiers by a per-node value, keeping value order stable.
pub fn group_nodes<K: Ord>(pairs: impl IntoIterator<Item = (K, String)>) -> BTreeMap<K, Vec<String>> {
    let mut grouped: BTreeMap<K, Vec<String>> = BTreeMap::new();
    for (key, node) in pairs {
        grouped.entry(key).or_default().push(node);
    }
    grouped
}

/// `key: value` pairs joined with `, `.
pub fn format_counts<K: std::fmt::Display, V: std::fmt::Display>(map: &BTreeMap<K, V>) -> String {
    map.iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Most frequent key, ties going to the smallest key.
pub fn most_common<K: Ord + Clone>(counts: &BTreeMap<K, usize>) -> Option<K> {
    let mut best: Option<(&K, usize)> = None;
    for (k, c) in counts {
        match best {
            Some((_, bc)) if bc >= *c => {}
            _ => best = Some((k, *c)),
        }
    }
    best.map(|(k, _)| k.clone())
}

/// `major.minor` of a version string such as `4.1.3` or `3.11.14-SNAPSHOT`.
pub fn parse_major_minor(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?.trim().parse().ok()?;
    let minor_text: String = parts
        .next()
        .unwrap_or("0")
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let minor = minor_text.parse().unwrap_or(0);
    Some((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_nodes() {
        let grouped = group_nodes(vec![
            ("stop".to_string(), "a".to_string()),
            ("ignore".to_string(), "b".to_string()),
            ("stop".to_string(), "c".to_string()),
        ]);
        assert_eq!(grouped["stop"], vec!["a".to_string(), "c".to_string()]);
        assert_eq!(grouped.len(), 2);
    }

    #[test]
    fn test_most_common_prefers_first_key_on_tie() {
        let mut counts = BTreeMap::new();
        counts.insert("b", 2);
        counts.insert("a", 2);
        counts.insert("c", 1);
        assert_eq!(most_common(&counts), Some("a"));
        assert_eq!(most_common::<&str>(&BTreeMap::new()), None);
    }

    #[test]
    fn test_parse_major_minor() {
        assert_eq!(parse_major_minor("4.1.3"), Some((4, 1)));
        assert_eq!(parse_major_minor("3.11.14-SNAPSHOT"), Some((3, 11)));
        assert_eq!(parse_major_minor("5"), Some((5, 0)));
        assert_eq!(parse_major_minor("unknown"), None);
    }

    #[test]
    fn test_format_counts() {
        let mut map = BTreeMap::new();
        map.insert("dc1", 3);
        map.insert("dc2", 1);
        assert_eq!(format_counts(&map), "dc1: 3, dc2: 1");
    }
}
