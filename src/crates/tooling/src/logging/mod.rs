//! Timing helpers on top of `tracing`

use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Await `future`, logging its start and duration at debug level
///
/// ```rust,ignore
/// let outcome = timed("turn", graph.invoke(input, &config)).await;
/// ```
pub async fn timed<F, T>(name: &str, future: F) -> T
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    debug!(name, "started");
    let result = future.await;
    debug!(name, elapsed = %format_duration(start.elapsed()), "completed");
    result
}

/// Like [`timed`], logging the completion at info level
pub async fn timed_info<F, T>(name: &str, future: F) -> T
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let result = future.await;
    info!(name, elapsed = %format_duration(start.elapsed()), "completed");
    result
}

/// Human-readable duration: `850ms`, `2.35s`, `1m 5s`
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1_000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
        assert_eq!(format_duration(Duration::from_millis(2_350)), "2.35s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
    }

    #[tokio::test]
    async fn test_timed_returns_output() {
        assert_eq!(timed("answer", async { 42 }).await, 42);
        assert_eq!(timed_info("answer", async { "ok" }).await, "ok");
    }
}
