// Stream tuning: readiness windows, read deadline, write stall budget
use crate::events;
use crate::types::WriteMode;
use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;
use tracing::warn;

// Environment variables for configuration
// DMSTREAM_POLL_TIMEOUT_MS: Wait window of one readiness poll (default: 5000)
// DMSTREAM_READ_DEADLINE_MS: Hard bound on a whole read call (default: 60000)
// DMSTREAM_MAX_WRITE_STALLS: Consecutive zero-byte writes tolerated (default: 3)
// DMSTREAM_STALL_BACKOFF_MS: Pause after a zero-byte write (default: 100)
// DMSTREAM_WRITE_MODE: auto, retry or single (default: auto)

pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_READ_DEADLINE: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_WRITE_STALLS: u32 = 3;
pub const DEFAULT_STALL_BACKOFF: Duration = Duration::from_millis(100);

static GLOBAL: Lazy<StreamConfig> = Lazy::new(StreamConfig::from_env);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    pub poll_timeout: Duration,
    pub read_deadline: Duration,
    pub max_write_stalls: u32,
    pub stall_backoff: Duration,
    pub write_mode: WriteMode,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            read_deadline: DEFAULT_READ_DEADLINE,
            max_write_stalls: DEFAULT_MAX_WRITE_STALLS,
            stall_backoff: DEFAULT_STALL_BACKOFF,
            write_mode: WriteMode::Auto,
        }
    }
}

impl StreamConfig {
    /// Process-wide configuration, read from the environment on first use.
    pub fn global() -> &'static StreamConfig {
        &GLOBAL
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = StreamConfig::default();

        if let Some(ms) = parsed::<u64, _>(&lookup, "DMSTREAM_POLL_TIMEOUT_MS") {
            config.poll_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parsed::<u64, _>(&lookup, "DMSTREAM_READ_DEADLINE_MS") {
            config.read_deadline = Duration::from_millis(ms);
        }
        if let Some(n) = parsed::<u32, _>(&lookup, "DMSTREAM_MAX_WRITE_STALLS") {
            config = config.with_max_write_stalls(n);
        }
        if let Some(ms) = parsed::<u64, _>(&lookup, "DMSTREAM_STALL_BACKOFF_MS") {
            config.stall_backoff = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup("DMSTREAM_WRITE_MODE") {
            match WriteMode::parse(&raw) {
                Some(mode) => config.write_mode = mode,
                None => warn!(event = events::CONFIG_IGNORED, key = "DMSTREAM_WRITE_MODE", value = %raw, "unknown write mode"),
            }
        }

        config
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_read_deadline(mut self, deadline: Duration) -> Self {
        self.read_deadline = deadline;
        self
    }

    /// Clamped to at least one attempt.
    pub fn with_max_write_stalls(mut self, stalls: u32) -> Self {
        self.max_write_stalls = stalls.max(1);
        self
    }

    pub fn with_stall_backoff(mut self, backoff: Duration) -> Self {
        self.stall_backoff = backoff;
        self
    }

    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }
}

fn parsed<T, F>(lookup: &F, key: &'static str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(event = events::CONFIG_IGNORED, key = key, value = %raw, "unparsable value");
            None
        }
    }
}
