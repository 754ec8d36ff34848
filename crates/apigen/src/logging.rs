//! Log verbosity and subscriber setup

use std::env;
use std::fmt;
use std::sync::OnceLock;

/// Environment variable consulted when `--log-level` is absent
pub const LOG_ENV: &str = "APIGEN_LOG";

/// Logging verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.trim().to_ascii_lowercase().as_str() {
            "error" | "err" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" | "verbose" => Some(Self::Trace),
            _ => None,
        }
    }

    /// Flag value wins over the environment, which wins over the default
    pub fn resolve(flag: Option<&str>) -> Self {
        let env_value = env::var(LOG_ENV).ok();
        resolve_from(flag, env_value.as_deref())
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    }
}

fn resolve_from(flag: Option<&str>, env_value: Option<&str>) -> LogLevel {
    flag.and_then(LogLevel::parse)
        .or_else(|| env_value.and_then(LogLevel::parse))
        .unwrap_or_default()
}

/// Install the global subscriber once; later calls are ignored.
///
/// Events go to stderr so generated listings on stdout stay clean.
pub fn init(level: LogLevel, ansi: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    static INITIALISED: OnceLock<()> = OnceLock::new();

    INITIALISED.get_or_init(|| {
        let filter = EnvFilter::new(format!("apigen={}", level));
        let subscriber = fmt::fmt()
            .with_env_filter(filter)
            .with_ansi(ansi)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
