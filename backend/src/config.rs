//! Runtime configuration.
//!
//! Defaults live here as constants. `.env` is loaded by the binary via
//! `dotenvy` before [`Config::from_env`] reads the environment; CLI flags
//! override both.

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Maximum upload size (in bytes).
///
/// 50 MB limit.
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// MIME type of the produced file.
pub const OUTPUT_MIME_TYPE: &str = "text/csv";

/// Extension appended to output names.
pub const OUTPUT_EXTENSION: &str = "csv";

/// Characters shown in a processed file preview.
pub const PREVIEW_CHARS: usize = 200;

/// Environment variable overriding [`DEFAULT_PORT`].
pub const ENV_PORT: &str = "CSVWINDOW_PORT";

/// Environment variable overriding [`MAX_FILE_SIZE`].
pub const ENV_MAX_UPLOAD: &str = "CSVWINDOW_MAX_UPLOAD_BYTES";

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_upload_bytes: MAX_FILE_SIZE,
        }
    }
}

impl Config {
    /// Read settings from the process environment.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            port: lookup(ENV_PORT)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            max_upload_bytes: lookup(ENV_MAX_UPLOAD)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
        }
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.port = port;
        }
        self
    }
}
