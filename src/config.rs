//! Configuration for an embedded engine instance
//!
//! Centralized configuration with sensible defaults.
//!
//! There is deliberately no per-call timeout knob: a client call blocks
//! until its one operation completes or the connection fails.

use std::time::Duration;

/// Configuration for an embedded engine instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Provisioning
    // -------------------------------------------------------------------------
    /// Spaces provisioned when the engine opens. Operations against any
    /// other space complete with an unknown-space status.
    pub spaces: Vec<String>,

    // -------------------------------------------------------------------------
    // Scheduling
    // -------------------------------------------------------------------------
    /// Artificial latency injected before each completion. Useful in tests
    /// that need the event loop to actually wait.
    pub completion_delay: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spaces: Vec::new(),
            completion_delay: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Provision a space at engine open
    pub fn space(mut self, name: impl Into<String>) -> Self {
        self.config.spaces.push(name.into());
        self
    }

    /// Inject an artificial delay before each completion
    pub fn completion_delay(mut self, delay: Duration) -> Self {
        self.config.completion_delay = Some(delay);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
