//! Logging setup shared by both binaries.
//!
//! Everything goes through `tracing`; the subscriber writes to stderr so
//! stdout stays free for the CLI's own status lines. `RUST_LOG` always wins
//! over the verbosity-derived default.

use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub with_target: bool,
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            with_target: false,
            with_ansi: true,
        }
    }
}

impl LogConfig {
    /// 0 → info, 1 (`-v`) → debug, 2+ (`-vv`) → trace
    #[must_use]
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    /// Filter directive used when `RUST_LOG` is unset
    pub fn default_directive(&self) -> String {
        let level = self.level.to_string().to_ascii_lowercase();
        format!("sav2xlsx={level},tower_http={level}")
    }
}

/// Install the global subscriber.
///
/// Returns an error if one is already installed (tests, embedding callers).
pub fn init_logging(config: &LogConfig) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(config.with_target)
        .with_ansi(config.with_ansi)
        .try_init()
        .map_err(|e| format!("Failed to initialize logging: {}", e))
}
