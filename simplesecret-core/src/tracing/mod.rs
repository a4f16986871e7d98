//! Tracing integration for structured logging
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and a fmt
//! layer, and names the spans the secret engine opens for its handshake,
//! prompt, unlock, create and delete operations.
//!
//! Secret values, master passwords and plaintexts are never recorded.

use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Global flag indicating whether tracing has been initialized
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Global tracing configuration
static TRACING_CONFIG: OnceLock<TracingConfig> = OnceLock::new();

/// Crates whose events pass the default filter
const OWN_TARGETS: [&str; 2] = ["simplesecret_core", "simplesecret"];

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to initialize tracing subscriber
    #[error("Failed to initialize tracing: {0}")]
    InitializationFailed(String),

    /// Tracing already initialized
    #[error("Tracing has already been initialized")]
    AlreadyInitialized,

    /// Failed to create log file
    #[error("Failed to create log file: {0}")]
    FileCreationFailed(String),
}

/// Result type for tracing operations
pub type TracingResult<T> = Result<T, TracingError>;

/// Tracing log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingLevel {
    /// Error level - only errors
    Error,
    /// Warn level - errors and warnings
    #[default]
    Warn,
    /// Info level - errors, warnings, and info
    Info,
    /// Debug level - all above plus debug messages
    Debug,
    /// Trace level - all messages including trace
    Trace,
}

impl TracingLevel {
    /// Converts to tracing crate's Level
    #[must_use]
    pub const fn to_tracing_level(self) -> Level {
        match self {
            Self::Error => Level::ERROR,
            Self::Warn => Level::WARN,
            Self::Info => Level::INFO,
            Self::Debug => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Level for a count of `-v` flags
    #[must_use]
    pub const fn from_verbosity(count: u8) -> Self {
        match count {
            0 => Self::Warn,
            1 => Self::Info,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }
}

impl std::str::FromStr for TracingLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for TracingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Output destination for tracing logs
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TracingOutput {
    /// Output to stdout
    Stdout,
    /// Output to stderr
    #[default]
    Stderr,
    /// Output to a file
    File {
        /// Path to the log file
        path: PathBuf,
    },
}

/// Configuration for tracing initialization
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Log level
    pub level: TracingLevel,
    /// Output destination
    pub output: TracingOutput,
    /// Whether to include thread ids, useful to follow prompt waits
    pub thread_ids: bool,
    /// Custom filter string (overrides level if set)
    pub filter: Option<String>,
}

impl TracingConfig {
    /// Creates a new tracing configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level
    #[must_use]
    pub const fn with_level(mut self, level: TracingLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the output destination
    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Enables or disables thread ids
    #[must_use]
    pub const fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.thread_ids = enabled;
        self
    }

    /// Sets a custom filter string
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Filter directives derived from the level
    #[must_use]
    pub fn default_directives(&self) -> String {
        OWN_TARGETS
            .iter()
            .map(|target| format!("{target}={}", self.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Initializes the tracing subscriber with the given configuration
///
/// Call once at startup; `RUST_LOG` is not consulted, use
/// [`TracingConfig::with_filter`] for custom directives.
///
/// # Errors
///
/// Returns an error if:
/// - Tracing has already been initialized
/// - The subscriber fails to initialize
/// - File output is configured but the file cannot be created
pub fn init_tracing(config: &TracingConfig) -> TracingResult<()> {
    if TRACING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(TracingError::AlreadyInitialized);
    }

    let _ = TRACING_CONFIG.set(config.clone());

    let filter = if let Some(ref custom_filter) = config.filter {
        EnvFilter::try_new(custom_filter)
            .map_err(|e| TracingError::InitializationFailed(e.to_string()))?
    } else {
        EnvFilter::try_new(config.default_directives()).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(config.thread_ids);

    match &config.output {
        TracingOutput::Stdout => registry.with(layer.with_writer(std::io::stdout)).try_init(),
        TracingOutput::Stderr => registry.with(layer.with_writer(std::io::stderr)).try_init(),
        TracingOutput::File { path } => {
            let file = std::fs::File::create(path)
                .map_err(|e| TracingError::FileCreationFailed(e.to_string()))?;
            registry
                .with(layer.with_ansi(false).with_writer(file))
                .try_init()
        }
    }
    .map_err(|e| TracingError::InitializationFailed(e.to_string()))?;

    tracing::debug!(level = %config.level, "Tracing initialized");
    Ok(())
}

/// Checks if tracing has been initialized
#[must_use]
pub fn is_tracing_initialized() -> bool {
    TRACING_INITIALIZED.load(Ordering::SeqCst)
}

/// Gets the current tracing configuration (if initialized)
#[must_use]
pub fn get_tracing_config() -> Option<&'static TracingConfig> {
    TRACING_CONFIG.get()
}

/// Macro for creating operation spans with standard fields
///
/// # Examples
///
/// ```ignore
/// use simplesecret_core::trace_operation;
/// use simplesecret_core::tracing::span_names;
///
/// let span = trace_operation!(span_names::COLLECTION_CREATE, label = %label);
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! trace_operation {
    ($name:expr) => {
        tracing::info_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

/// Standard span names for secret service operations
pub mod span_names {
    /// Transport handshake (key exchange and session opening)
    pub const TRANSPORT_HANDSHAKE: &str = "transport.handshake";
    /// Waiting for a prompt to complete
    pub const PROMPT_AWAIT: &str = "prompt.await";
    /// Unlock with user permission
    pub const UNLOCK: &str = "collection.unlock";
    /// Collection creation
    pub const COLLECTION_CREATE: &str = "collection.create";
    /// Item creation
    pub const ITEM_CREATE: &str = "item.create";
    /// Item or collection deletion
    pub const DELETE: &str = "object.delete";
}

/// Standard field names for tracing spans
pub mod field_names {
    /// Collection object path
    pub const COLLECTION: &str = "collection";
    /// Item object path
    pub const ITEM: &str = "item";
    /// Prompt object path
    pub const PROMPT: &str = "prompt";
    /// Session object path
    pub const SESSION: &str = "session";
    /// Transport algorithm
    pub const ALGORITHM: &str = "algorithm";
    /// Collection or item label.
    /// WARNING: May identify the site a password belongs to. Use only at debug level.
    pub const LABEL: &str = "label";
    /// Error message field
    pub const ERROR: &str = "error";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_level_from_str() {
        assert_eq!("error".parse::<TracingLevel>(), Ok(TracingLevel::Error));
        assert_eq!("WARN".parse::<TracingLevel>(), Ok(TracingLevel::Warn));
        assert_eq!("Info".parse::<TracingLevel>(), Ok(TracingLevel::Info));
        assert_eq!("debug".parse::<TracingLevel>(), Ok(TracingLevel::Debug));
        assert!("loud".parse::<TracingLevel>().is_err());
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(TracingLevel::from_verbosity(0), TracingLevel::Warn);
        assert_eq!(TracingLevel::from_verbosity(1), TracingLevel::Info);
        assert_eq!(TracingLevel::from_verbosity(2), TracingLevel::Debug);
        assert_eq!(TracingLevel::from_verbosity(9), TracingLevel::Trace);
    }

    #[test]
    fn test_default_directives() {
        let config = TracingConfig::new().with_level(TracingLevel::Debug);
        assert_eq!(
            config.default_directives(),
            "simplesecret_core=debug,simplesecret=debug"
        );
    }

    #[test]
    fn test_tracing_config_builder() {
        let config = TracingConfig::new()
            .with_output(TracingOutput::Stdout)
            .with_thread_ids(true)
            .with_filter("simplesecret_core=trace,zbus=warn");

        assert_eq!(config.output, TracingOutput::Stdout);
        assert!(config.thread_ids);
        assert_eq!(
            config.filter.as_deref(),
            Some("simplesecret_core=trace,zbus=warn")
        );
    }
}
