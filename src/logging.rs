//! Logging setup through the `tracing` crate.
//!
//! Log output goes to stderr so stdout stays clean for the report itself.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable that overrides the level passed to [`init_logging`].
pub const LOG_ENV_VAR: &str = "DAMAGE_TRIAGE_LOG";

/// Log levels, mapping to the tracing level hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }

    /// Level for a `-v` count: 0 = warn, 1 = info, 2 = debug, 3+ = trace.
    pub fn from_verbosity(verbosity: u8) -> Self {
        match verbosity {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    fn default_filter(self) -> String {
        format!("damage_triage={}", self.to_tracing_level())
    }
}

/// Initialize logging at `level`, unless `DAMAGE_TRIAGE_LOG` holds a filter.
///
/// Call once at startup.
///
/// ```no_run
/// use damage_triage::logging::{init_logging, LogLevel};
///
/// init_logging(LogLevel::Info);
/// tracing::info!("Application starting");
/// ```
///
/// ```bash
/// DAMAGE_TRIAGE_LOG=damage_triage=debug damage-triage car.jpg
/// ```
pub fn init_logging(level: LogLevel) {
    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(level.default_filter()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(env_filter)
        .init();

    tracing::debug!("Logging initialized at level: {:?}", level);
}

/// Initialize logging with a custom filter string such as
/// `"damage_triage=debug,reqwest=info"`.
pub fn init_logging_with_filter(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| {
        eprintln!("Invalid log filter {:?}, using damage_triage=info", filter);
        EnvFilter::new("damage_triage=info")
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(env_filter)
        .init();

    tracing::debug!("Logging initialized with custom filter: {}", filter);
}
