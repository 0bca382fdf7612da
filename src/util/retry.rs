use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Errors that know whether repeating the failed call can help.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Retries `operation` while it fails with a retryable error.
///
/// At most `max_retries + 1` attempts are made. The wait between attempts
/// doubles from 100ms and stops growing after ten doublings.
pub async fn retry_with_max_retries<F, Fut, T, E>(
    max_retries: usize,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Debug,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() || attempt >= max_retries {
                    return Err(e);
                }

                warn!(
                    "Retryable error in {} (attempt {}/{}): {:?}",
                    operation_name,
                    attempt + 1,
                    max_retries,
                    e
                );

                // 100ms, 200ms, 400ms, 800ms, 1600ms, ...
                let backoff_ms = 100 * (1u64 << attempt.min(10));
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct TestError {
        message: String,
        retryable: bool,
    }

    impl TestError {
        fn transient(message: &str) -> Self {
            Self {
                message: message.to_string(),
                retryable: true,
            }
        }

        fn permanent(message: &str) -> Self {
            Self {
                message: message.to_string(),
                retryable: false,
            }
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    #[tokio::test]
    async fn test_retry_success_on_first_attempt() {
        let result =
            retry_with_max_retries(3, "test_operation", || async { Ok::<i32, TestError>(42) })
                .await;

        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn test_retry_success_after_retries() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = retry_with_max_retries(5, "test_operation", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err(TestError::transient("503 Service Unavailable"))
                } else {
                    Ok(100)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(100));
        // 2 failures + 1 success
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_non_retryable_error() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = retry_with_max_retries(5, "test_operation", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, TestError>(TestError::permanent("401 Unauthorized"))
            }
        })
        .await;

        assert_eq!(result.unwrap_err().message, "401 Unauthorized");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_max_retries_exceeded() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = retry_with_max_retries(3, "test_operation", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, TestError>(TestError::transient("connection refused"))
            }
        })
        .await;

        assert_eq!(result.unwrap_err().message, "connection refused");
        // 0..=3 = 4 attempts
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retry_zero_max_retries() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = retry_with_max_retries(0, "test_operation", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, TestError>(TestError::transient("timed out"))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_exponential_backoff() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        let start = std::time::Instant::now();

        let result = retry_with_max_retries(2, "test_operation", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err(TestError::transient("timed out"))
                } else {
                    Ok(400)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(400));
        // 100ms + 200ms
        assert!(start.elapsed().as_millis() >= 250);
    }
}
