//! JVM argument inspection: heap size and garbage collector selection.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter, Result as FmtResult};

static XMX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-Xmx(\d+)([GMK])").expect("valid regex"));

/// Garbage collector families Cassandra runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GcType {
    G1,
    Cms,
    Parallel,
    Zgc,
    Shenandoah,
    Serial,
}

impl GcType {
    pub fn name(&self) -> &'static str {
        match self {
            GcType::G1 => "G1GC",
            GcType::Cms => "CMS",
            GcType::Parallel => "ParallelGC",
            GcType::Zgc => "ZGC",
            GcType::Shenandoah => "ShenandoahGC",
            GcType::Serial => "SerialGC",
        }
    }

    /// Collector the JVM will run with. JDKs default to G1 when no flag is given.
    pub fn from_jvm_args(jvm_args: &str) -> GcType {
        if jvm_args.contains("-XX:+UseG1GC") {
            GcType::G1
        } else if jvm_args.contains("-XX:+UseConcMarkSweepGC") {
            GcType::Cms
        } else if jvm_args.contains("-XX:+UseParallelGC") || jvm_args.contains("-XX:+UseParallelOldGC")
        {
            GcType::Parallel
        } else if jvm_args.contains("-XX:+UseZGC") {
            GcType::Zgc
        } else if jvm_args.contains("-XX:+UseShenandoahGC") {
            GcType::Shenandoah
        } else if jvm_args.contains("-XX:+UseSerialGC") {
            GcType::Serial
        } else {
            GcType::G1
        }
    }

    /// Collector explicitly requested on the command line, if any.
    pub fn declared_in(jvm_args: &str) -> Option<GcType> {
        if jvm_args.contains("-XX:+UseG1GC") {
            Some(GcType::G1)
        } else if jvm_args.contains("-XX:+UseConcMarkSweepGC") || jvm_args.contains("-XX:+UseCMS") {
            Some(GcType::Cms)
        } else if jvm_args.contains("-XX:+UseParallelGC") {
            Some(GcType::Parallel)
        } else if jvm_args.contains("-XX:+UseZGC") {
            Some(GcType::Zgc)
        } else if jvm_args.contains("-XX:+UseShenandoahGC") {
            Some(GcType::Shenandoah)
        } else {
            None
        }
    }

    /// Metric carrying young-generation collection time for this collector.
    pub fn time_metric(&self) -> &'static str {
        match self {
            GcType::Cms | GcType::Parallel => "jvm_GarbageCollector_ParNew",
            GcType::Zgc => "jvm_GarbageCollector_ZGC",
            GcType::Shenandoah => "jvm_GarbageCollector_Shenandoah_Cycles",
            GcType::G1 | GcType::Serial => "jvm_GarbageCollector_G1_Young_Generation",
        }
    }

    /// Heap-size advisories for this collector.
    pub fn advisories(&self, heap_size_gb: i64) -> Vec<&'static str> {
        let mut out = Vec::new();
        match self {
            GcType::G1 => {
                if heap_size_gb < 20 {
                    out.push(
                        "G1GC performs best with heap sizes >= 20GB. \
                         Consider increasing heap or using ParallelGC for smaller heaps.",
                    );
                }
                if heap_size_gb > 32 {
                    out.push(
                        "Heap size > 32GB loses compressed OOPs benefit. \
                         Consider multiple instances or ZGC for very large heaps.",
                    );
                }
            }
            GcType::Cms => out.push(
                "CMS is deprecated. Consider migrating to G1GC (20-31GB heaps) \
                 or ZGC (very large heaps).",
            ),
            GcType::Zgc => {
                if heap_size_gb < 32 {
                    out.push(
                        "ZGC is designed for very large heaps (>32GB). \
                         Consider G1GC for heaps < 32GB.",
                    );
                }
            }
            GcType::Shenandoah => {
                if heap_size_gb < 8 {
                    out.push(
                        "ShenandoahGC may have overhead for small heaps (<8GB). \
                         Consider ParallelGC or G1GC.",
                    );
                }
            }
            GcType::Parallel | GcType::Serial => {}
        }
        out
    }
}

impl Display for GcType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name())
    }
}

/// `-Xmx` setting as written and in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapSetting {
    pub size: i64,
    pub unit: char,
    pub bytes: i64,
}

impl HeapSetting {
    /// `4G`, `512M`, ...
    pub fn label(&self) -> String {
        format!("{}{}", self.size, self.unit)
    }

    /// Whole gigabytes. `M` settings are divided down, `K` settings count as 0.
    pub fn whole_gb(&self) -> i64 {
        match self.unit {
            'G' => self.size,
            'M' => self.size / 1024,
            _ => 0,
        }
    }
}

/// Extracts the first `-Xmx` setting.
pub fn parse_max_heap(jvm_args: &str) -> Option<HeapSetting> {
    let caps = XMX_RE.captures(jvm_args)?;
    let size: i64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().chars().next()?;
    let multiplier = match unit {
        'G' => 1024 * 1024 * 1024,
        'M' => 1024 * 1024,
        _ => 1024,
    };
    Some(HeapSetting {
        size,
        unit,
        bytes: size.saturating_mul(multiplier),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_defaults_to_g1() {
        assert_eq!(GcType::from_jvm_args(""), GcType::G1);
        assert_eq!(GcType::from_jvm_args("-XX:+UseConcMarkSweepGC"), GcType::Cms);
        assert_eq!(GcType::from_jvm_args("-XX:+UseParallelOldGC"), GcType::Parallel);
        assert_eq!(GcType::from_jvm_args("-XX:+UseSerialGC"), GcType::Serial);
        assert_eq!(
            GcType::from_jvm_args("-XX:+UseShenandoahGC").time_metric(),
            "jvm_GarbageCollector_Shenandoah_Cycles"
        );
    }

    #[test]
    fn test_declared_gc_is_optional() {
        assert_eq!(GcType::declared_in("-Xmx8G"), None);
        assert_eq!(GcType::declared_in("-XX:+UseCMS"), Some(GcType::Cms));
        assert_eq!(GcType::declared_in("-XX:+UseZGC"), Some(GcType::Zgc));
    }

    #[test]
    fn test_advisories() {
        assert_eq!(GcType::G1.advisories(16).len(), 1);
        assert_eq!(GcType::G1.advisories(24).len(), 0);
        assert_eq!(GcType::G1.advisories(40).len(), 1);
        assert!(GcType::Cms.advisories(12)[0].starts_with("CMS is deprecated"));
        assert!(GcType::Zgc.advisories(64).is_empty());
        assert_eq!(GcType::Shenandoah.advisories(4).len(), 1);
    }

    #[test]
    fn test_parse_max_heap() {
        let heap = parse_max_heap("-Xms4G -Xmx4G -XX:+UseConcMarkSweepGC").unwrap();
        assert_eq!(heap.label(), "4G");
        assert_eq!(heap.bytes, 4 * 1024 * 1024 * 1024);
        assert_eq!(heap.whole_gb(), 4);

        let mb = parse_max_heap("-Xmx2048M").unwrap();
        assert_eq!(mb.whole_gb(), 2);
        assert_eq!(mb.bytes, 2048 * 1024 * 1024);

        assert!(parse_max_heap("-Xms4G").is_none());
    }
}
