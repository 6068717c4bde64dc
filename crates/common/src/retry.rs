use std::time::Duration;

/// Retry a function with exponential backoff
///
/// # Arguments
/// * `f` - The function to retry
/// * `max_retries` - Maximum number of retry attempts
/// * `base_delay_ms` - Initial delay in milliseconds (doubles each retry)
/// * `operation_name` - Human-readable name for logging
pub fn retry_with_backoff<F, T, E>(
    mut f: F,
    max_retries: u32,
    base_delay_ms: u64,
    operation_name: &str,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    for attempt in 0..max_retries {
        match f() {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt < max_retries - 1 {
                    let delay_ms = base_delay_ms * 2_u64.pow(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {}ms...",
                        operation_name,
                        attempt + 1,
                        max_retries,
                        e,
                        delay_ms
                    );
                    std::thread::sleep(Duration::from_millis(delay_ms));
                } else {
                    tracing::error!(
                        "{} failed after {} attempts: {}",
                        operation_name,
                        max_retries,
                        e
                    );
                    return Err(e);
                }
            }
        }
    }
    unreachable!()
}

#[cfg(feature = "async")]
pub async fn retry_with_backoff_async<F, Fut, T, E>(
    mut f: F,
    max_retries: u32,
    base_delay_ms: u64,
    operation_name: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    for attempt in 0..max_retries {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt < max_retries - 1 {
                    let delay_ms = base_delay_ms * 2_u64.pow(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {}ms...",
                        operation_name,
                        attempt + 1,
                        max_retries,
                        e,
                        delay_ms
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                } else {
                    tracing::error!(
                        "{} failed after {} attempts: {}",
                        operation_name,
                        max_retries,
                        e
                    );
                    return Err(e);
                }
            }
        }
    }
    unreachable!()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_returns_first_success() {
        let calls = Cell::new(0u32);
        let result: Result<u32, String> = retry_with_backoff(
            || {
                calls.set(calls.get() + 1);
                Ok(42)
            },
            3,
            1,
            "immediate success",
        );

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 1, "Should not retry after a success");
    }

    #[test]
    fn test_retries_until_success() {
        let calls = Cell::new(0u32);
        let result: Result<u32, String> = retry_with_backoff(
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err("not yet".to_string())
                } else {
                    Ok(7)
                }
            },
            5,
            1,
            "eventual success",
        );

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 3, "Should succeed on the third attempt");
    }

    #[test]
    fn test_gives_up_after_max_retries() {
        let calls = Cell::new(0u32);
        let result: Result<u32, String> = retry_with_backoff(
            || {
                calls.set(calls.get() + 1);
                Err("always fails".to_string())
            },
            3,
            1,
            "never succeeds",
        );

        assert!(result.is_err(), "Should return the last error");
        assert_eq!(calls.get(), 3, "Should attempt exactly max_retries times");
    }
}
