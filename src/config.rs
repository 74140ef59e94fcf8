use std::{path::PathBuf, time::Duration};

use crate::ConfigError;

/// Largest leading slice, in megabytes, that a range read may buffer in memory.
pub const IN_MEMORY_BUF_MAX_SIZE: u64 = 10;
/// [`IN_MEMORY_BUF_MAX_SIZE`] in bytes.
pub const IN_MEMORY_BUF_MAX_SIZE_BYTES: u64 = IN_MEMORY_BUF_MAX_SIZE * 1024 * 1024;

/// Stream-level settings shared by every stream created from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Directory receiving full materializations.
    pub temp_dir: PathBuf,
    /// Maximum size of the in-memory peek cache, at most [`IN_MEMORY_BUF_MAX_SIZE_BYTES`].
    pub peek_limit: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            peek_limit: IN_MEMORY_BUF_MAX_SIZE_BYTES,
        }
    }
}

impl StreamConfig {
    /// Creates a config writing temp files under `temp_dir`.
    pub fn with_temp_dir(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            ..Self::default()
        }
    }

    /// Validates config invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temp_dir.as_os_str().is_empty() {
            return Err(ConfigError::new("temp_dir must not be empty"));
        }
        if self.peek_limit == 0 {
            return Err(ConfigError::new("peek_limit must be greater than zero"));
        }
        if self.peek_limit > IN_MEMORY_BUF_MAX_SIZE_BYTES {
            return Err(ConfigError::new(format!(
                "peek_limit must not exceed {IN_MEMORY_BUF_MAX_SIZE_BYTES} bytes"
            )));
        }
        Ok(())
    }
}

/// Settings for remote range readers built from a link URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpConfig {
    /// Whole-request timeout. `None` leaves timing to the stream's cancellation token.
    pub timeout: Option<Duration>,
    /// TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Custom `User-Agent` header.
    pub user_agent: Option<String>,
}

impl HttpConfig {
    /// Validates config invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::new("timeout must be greater than zero"));
        }
        if self.connect_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::new("connect_timeout must be greater than zero"));
        }
        if self.user_agent.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::new("user_agent must not be empty when set"));
        }
        Ok(())
    }

    pub(crate) fn client(&self) -> Result<reqwest::Client, crate::StreamError> {
        self.validate()?;
        let mut builder = reqwest::Client::builder().user_agent(
            self.user_agent
                .clone()
                .unwrap_or_else(|| concat!("seekstream/", env!("CARGO_PKG_VERSION")).to_owned()),
        );
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(builder.build()?)
    }
}
