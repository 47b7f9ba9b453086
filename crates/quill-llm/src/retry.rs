//! Retry with exponential backoff shared by the HTTP providers

use crate::LlmError;
use std::time::Duration;
use tracing::warn;

/// Default number of attempts per request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Run `attempt` up to `max_retries` times, sleeping 1s, 2s, 4s, ... between
/// transient failures. Non-transient errors are returned immediately.
pub(crate) fn with_backoff<T>(
    max_retries: u32,
    mut attempt: impl FnMut() -> Result<T, LlmError>,
) -> Result<T, LlmError> {
    let mut attempts = 0;
    let mut last_error = None;

    while attempts < max_retries.max(1) {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                attempts += 1;
                warn!(attempt = attempts, error = %e, "model request failed");
                last_error = Some(e);
                if attempts < max_retries {
                    std::thread::sleep(Duration::from_secs(2u64.pow(attempts - 1)));
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
}

/// Total time spent sleeping between `max_retries` failed attempts.
pub(crate) fn total_backoff(max_retries: u32) -> Duration {
    (1..max_retries).map(|attempt| Duration::from_secs(2u64.pow(attempt - 1))).sum()
}

/// Map a non-success HTTP status to an error.
pub(crate) fn status_error(status: reqwest::StatusCode, body: String, model: &str) -> LlmError {
    match status.as_u16() {
        404 => LlmError::ModelNotAvailable(model.to_string()),
        429 => LlmError::RateLimitExceeded,
        s if s >= 500 => LlmError::Communication(format!("HTTP {}: {}", status, body)),
        _ => LlmError::Other(format!("HTTP {}: {}", status, body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_success_first_try() {
        let calls = Cell::new(0);
        let result = with_backoff(3, || {
            calls.set(calls.get() + 1);
            Ok::<_, LlmError>(7)
        });
        assert_eq!(result, Ok(7));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_permanent_error_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_backoff(3, || {
            calls.set(calls.get() + 1);
            Err(LlmError::ModelNotAvailable("m".to_string()))
        });
        assert!(matches!(result, Err(LlmError::ModelNotAvailable(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_transient_error_exhausts_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_backoff(1, || {
            calls.set(calls.get() + 1);
            Err(LlmError::Communication("down".to_string()))
        });
        assert_eq!(result, Err(LlmError::Communication("down".to_string())));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_total_backoff() {
        assert_eq!(total_backoff(0), Duration::ZERO);
        assert_eq!(total_backoff(1), Duration::ZERO);
        assert_eq!(total_backoff(3), Duration::from_secs(3));
        assert_eq!(total_backoff(4), Duration::from_secs(7));
    }

    #[test]
    fn test_status_mapping() {
        use reqwest::StatusCode;
        assert_eq!(
            status_error(StatusCode::NOT_FOUND, String::new(), "m"),
            LlmError::ModelNotAvailable("m".to_string())
        );
        assert_eq!(
            status_error(StatusCode::TOO_MANY_REQUESTS, String::new(), "m"),
            LlmError::RateLimitExceeded
        );
        assert!(status_error(StatusCode::BAD_GATEWAY, "x".into(), "m").is_transient());
        assert!(!status_error(StatusCode::UNAUTHORIZED, "x".into(), "m").is_transient());
    }
}
