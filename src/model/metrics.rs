use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// One labeled time series returned by a range query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricData {
    pub metric_name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub data_points: Vec<MetricPoint>,
}

impl MetricData {
    pub fn new(metric_name: impl Into<String>) -> Self {
        Self {
            metric_name: metric_name.into(),
            labels: BTreeMap::new(),
            data_points: Vec::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Appends points at one-minute spacing from the unix epoch. Mostly useful
    /// for building fixtures.
    pub fn with_values(mut self, values: &[f64]) -> Self {
        let offset = self.data_points.len() as i64;
        for (i, v) in values.iter().enumerate() {
            let ts = DateTime::from_timestamp((offset + i as i64) * 60, 0).unwrap_or_default();
            self.data_points.push(MetricPoint {
                timestamp: ts,
                value: *v,
            });
        }
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn average(&self) -> Option<f64> {
        if self.data_points.is_empty() {
            return None;
        }
        let sum: f64 = self.data_points.iter().map(|p| p.value).sum();
        Some(sum / self.data_points.len() as f64)
    }

    pub fn max(&self) -> Option<f64> {
        self.data_points.iter().map(|p| p.value).reduce(f64::max)
    }

    pub fn min(&self) -> Option<f64> {
        self.data_points.iter().map(|p| p.value).reduce(f64::min)
    }

    /// Nearest-rank percentile over the raw points, `percentile` in 0..=100.
    pub fn percentile(&self, percentile: f64) -> Option<f64> {
        if self.data_points.is_empty() {
            return None;
        }
        let mut values: Vec<f64> = self.data_points.iter().map(|p| p.value).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        let index = (values.len() as f64 * percentile / 100.0) as usize;
        values.get(index.min(values.len() - 1)).copied()
    }
}

/// Mean over every point of every series.
pub fn series_average(series: &[MetricData]) -> f64 {
    let (total, count) = series
        .iter()
        .flat_map(|m| m.data_points.iter())
        .fold((0.0, 0usize), |(t, c), p| (t + p.value, c + 1));
    if count > 0 {
        total / count as f64
    } else {
        0.0
    }
}

/// Largest point across every series, floored at zero.
pub fn series_max(series: &[MetricData]) -> f64 {
    series
        .iter()
        .flat_map(|m| m.data_points.iter())
        .fold(0.0, |acc, p| acc.max(p.value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics() {
        let m = MetricData::new("cpu").with_values(&[10.0, 30.0, 20.0, 40.0]);
        assert_eq!(m.average(), Some(25.0));
        assert_eq!(m.max(), Some(40.0));
        assert_eq!(m.min(), Some(10.0));
        assert_eq!(m.percentile(50.0), Some(30.0));
        assert_eq!(m.percentile(100.0), Some(40.0));
        assert_eq!(m.percentile(0.0), Some(10.0));
    }

    #[test]
    fn test_empty_series() {
        let m = MetricData::new("cpu");
        assert_eq!(m.average(), None);
        assert_eq!(m.max(), None);
        assert_eq!(m.percentile(99.0), None);
        assert_eq!(series_average(&[m.clone()]), 0.0);
        assert_eq!(series_max(&[m]), 0.0);
    }

    #[test]
    fn test_series_helpers_span_all_series() {
        let series = vec![
            MetricData::new("x").with_values(&[1.0, 3.0]),
            MetricData::new("x").with_values(&[5.0]),
        ];
        assert_eq!(series_average(&series), 3.0);
        assert_eq!(series_max(&series), 5.0);
    }
}
