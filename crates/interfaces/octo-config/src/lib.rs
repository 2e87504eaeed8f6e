//! Central configuration constants for runtime limits and defaults.

use std::time::Duration;

/// Server assumed when no base URL is given.
pub const DEFAULT_BASE_URL: &str = "http://octopi/";

/// Header carrying the OctoPrint API key.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Default number of concurrent timelapse downloads.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Minimum allowed concurrent downloads.
pub const MIN_CONCURRENCY: usize = 1;

/// TCP connect timeout for requests to the server.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Idle read timeout while streaming a response body.
pub const READ_TIMEOUT: Duration = Duration::from_secs(60);

pub const USER_AGENT: &str = concat!("octo-tools/", env!("CARGO_PKG_VERSION"));

/// Capacity of the sync progress event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Parse a concurrency value, rejecting anything below [`MIN_CONCURRENCY`].
pub fn parse_concurrency(s: &str) -> Result<usize, String> {
    let v: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("`{s}` is not a whole number"))?;
    if v < MIN_CONCURRENCY {
        return Err(format!("concurrency must be at least {MIN_CONCURRENCY}"));
    }
    Ok(v)
}
