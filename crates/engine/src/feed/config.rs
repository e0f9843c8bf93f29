use std::time::Duration;

use tracing::warn;

pub const FEED_URL_ENV_VAR: &str = "POSERACE_FEED_URL";
pub const FEED_DISABLED_ENV_VAR: &str = "POSERACE_FEED_DISABLED";
pub const DEFAULT_FEED_URL: &str = "ws://127.0.0.1:8000/ws/pose";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub endpoint: String,
    pub connect_on_start: bool,
    pub base_reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
    pub stale_after: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_FEED_URL.to_string(),
            connect_on_start: true,
            base_reconnect_delay: Duration::from_millis(1_000),
            max_reconnect_delay: Duration::from_millis(10_000),
            max_reconnect_attempts: 5,
            stale_after: Duration::from_millis(1_000),
        }
    }
}

impl FeedConfig {
    pub fn from_env() -> Self {
        let endpoint = resolve_endpoint(std::env::var(FEED_URL_ENV_VAR).ok().as_deref());
        let connect_on_start = !matches!(
            std::env::var(FEED_DISABLED_ENV_VAR).ok().as_deref(),
            Some("1")
        );
        Self {
            endpoint,
            connect_on_start,
            ..Self::default()
        }
    }
}

fn resolve_endpoint(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(value) if value.starts_with("ws://") => value.to_string(),
        Some(value) => {
            warn!(
                value,
                fallback = DEFAULT_FEED_URL,
                "feed_invalid_url_using_default"
            );
            DEFAULT_FEED_URL.to_string()
        }
        None => DEFAULT_FEED_URL.to_string(),
    }
}

/// `base * 2^attempts`, capped at `cap`. Saturates instead of overflowing for large attempt counts.
pub fn reconnect_delay(attempts: u32, base: Duration, cap: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempts.min(31)).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(cap)
}
