//! Diagnostic logging for the plugin process.
//!
//! stdout carries the protoc response, so every event goes to stderr. The
//! filter comes from `NEXUS_TEMPORAL_LOG` and uses `EnvFilter` directive syntax
//! (`debug`, `nexus_temporal_codegen=trace`, ...).

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV_VAR: &str = "NEXUS_TEMPORAL_LOG";

const DEFAULT_LEVEL: &str = "warn";

/// Logging configuration for the plugin
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directives
    pub filter: String,
    /// Whether to include the event target (module path)
    pub with_target: bool,
    /// Whether to emit ANSI colors
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LEVEL.to_string(),
            with_target: false,
            ansi: false,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, with the filter taken from `NEXUS_TEMPORAL_LOG` when set.
    pub fn from_env() -> Self {
        Self::default().with_filter_opt(std::env::var(LOG_ENV_VAR).ok())
    }

    /// Set the filter directives
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    fn with_filter_opt(self, filter: Option<String>) -> Self {
        match filter.map(|f| f.trim().to_string()).filter(|f| !f.is_empty()) {
            Some(filter) => self.with_filter(filter),
            None => self,
        }
    }

    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|err| {
            eprintln!("ignoring invalid {LOG_ENV_VAR} value {:?}: {err}", self.filter);
            EnvFilter::new(DEFAULT_LEVEL)
        })
    }

    /// Install the global subscriber. Returns `false` if one was already set.
    pub fn init(&self) -> bool {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(self.env_filter())
            .with_target(self.with_target)
            .with_ansi(self.ansi)
            .try_init()
            .is_ok()
    }
}
