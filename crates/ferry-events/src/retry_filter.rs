//! Retried-delivery suppression based on platform retry headers.

/// Whether an inbound delivery should be processed or acknowledged as a
/// duplicate retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Proceed,
    Skip,
}

const RETRY_REASON_HTTP_TIMEOUT: &str = "http_timeout";

/// Decides whether a delivery is a duplicate retry of a slow original
/// request. Slack re-sends events when the first delivery times out;
/// processing the retry would duplicate the backend call and the posted
/// reply. A retry number that fails to parse is treated as absent.
pub fn retry_disposition(
    allow_retry: bool,
    retry_number: Option<&str>,
    retry_reason: Option<&str>,
) -> RetryDisposition {
    if allow_retry {
        return RetryDisposition::Proceed;
    }
    let retried_for_timeout = retry_reason
        .map(str::trim)
        .map(|reason| reason == RETRY_REASON_HTTP_TIMEOUT)
        .unwrap_or(false);
    let retry_count = retry_number
        .and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(0);
    if retried_for_timeout || retry_count > 0 {
        RetryDisposition::Skip
    } else {
        RetryDisposition::Proceed
    }
}
