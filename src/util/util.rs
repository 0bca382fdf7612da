use std::collections::LinkedList;
use std::future::Future;
use std::time::{Duration, SystemTime};
use tracing::info;

/// Timings collected during one run, in the order the phases ran.
pub type Timings<'a> = LinkedList<(&'a str, SystemTime, Duration)>;

/// Wrapper function to measure duration of an async operation
pub async fn measure_dur_async<'a, F, Fut, T, E>(
    metric_name: &'a str,
    internal_metrics: &mut Timings<'a>,
    operation: F,
    trace_log_fn: Option<fn(&T) -> String>,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let start = SystemTime::now();
    let result = operation().await;
    let dur = start.elapsed().unwrap_or_else(|_| Duration::from_millis(0));
    internal_metrics.push_back((metric_name, start, dur));
    let log_line = result
        .as_ref()
        .ok()
        .and_then(|r| trace_log_fn.map(|f| f(r)))
        .unwrap_or_default();
    info!("{} | {}, took={}", metric_name, log_line, dur.as_millis());
    result
}

/// Wrapper function to measure duration of a synchronous operation that returns Result
pub fn measure_dur_with_error<'a, F, T, E>(
    metric_name: &'a str,
    internal_metrics: &mut Timings<'a>,
    operation: F,
    trace_log_fn: Option<fn(&T) -> String>,
) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    let start = SystemTime::now();
    let result = operation();
    let dur = start.elapsed().unwrap_or_else(|_| Duration::from_millis(0));
    internal_metrics.push_back((metric_name, start, dur));
    let log_line = result
        .as_ref()
        .ok()
        .and_then(|r| trace_log_fn.map(|f| f(r)))
        .unwrap_or_default();
    info!("{} | {}, took={}", metric_name, log_line, dur.as_millis());
    result
}

pub fn measure_dur<'a, F, T>(
    metric_name: &'a str,
    internal_metrics: &mut Timings<'a>,
    operation: F,
    trace_log_fn: Option<fn(&T) -> String>,
) -> T
where
    F: FnOnce() -> T,
{
    let start = SystemTime::now();
    let result = operation();
    let dur = start.elapsed().unwrap_or_else(|_| Duration::from_millis(0));
    internal_metrics.push_back((metric_name, start, dur));
    let log_line = trace_log_fn.map(|f| f(&result)).unwrap_or_default();
    info!("{} | {}, took={}", metric_name, log_line, dur.as_millis());
    result
}

/// File-name safe version of a cluster name.
pub fn sanitize_file_component(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_dur_records_phase() {
        let mut timings = Timings::new();
        let value = measure_dur("phase_a", &mut timings, || 7, Some(|v: &i32| format!("v={}", v)));
        assert_eq!(value, 7);
        assert_eq!(timings.len(), 1);
        assert_eq!(timings.front().map(|t| t.0), Some("phase_a"));
    }

    #[test]
    fn test_measure_dur_with_error_records_failures() {
        let mut timings = Timings::new();
        let result: Result<i32, String> =
            measure_dur_with_error("phase_b", &mut timings, || Err("boom".to_string()), None);
        assert!(result.is_err());
        assert_eq!(timings.len(), 1);
    }

    #[tokio::test]
    async fn test_measure_dur_async() {
        let mut timings = Timings::new();
        let result: Result<&str, ()> =
            measure_dur_async("phase_c", &mut timings, || async { Ok("done") }, None).await;
        assert_eq!(result, Ok("done"));
        assert_eq!(timings.back().map(|t| t.0), Some("phase_c"));
    }

    #[test]
    fn test_sanitize_file_component() {
        assert_eq!(sanitize_file_component("prod cluster/eu"), "prod_cluster_eu");
        assert_eq!(sanitize_file_component("prod-1_a"), "prod-1_a");
    }
}
