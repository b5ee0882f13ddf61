use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;
use crate::DEFAULT_MODULE_TIMEOUT_MS;
use crate::DEFAULT_SCAN_TIMEOUT_MS;

/// Tunables of the child discovery service
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChildDiscoveryConfig {
    /// Upper bound for one `create_results` call, after which the caller
    /// stops waiting for the module (milliseconds)
    #[serde(default = "default_module_timeout_ms")]
    pub module_timeout_ms: u64,

    /// Minimum length of a manual scan before stale results are cleaned up
    /// (milliseconds, 0 = clean up as soon as all invocations returned).
    /// Cleanup never runs before every invocation returned or timed out, so
    /// a window shorter than `module_timeout_ms` is simply exceeded.
    #[serde(default = "default_scan_timeout_ms")]
    pub scan_timeout_ms: u64,

    /// Whether registry changes are followed outside of manual scans
    #[serde(default = "default_background_discovery")]
    pub background_discovery: bool,
}

impl Default for ChildDiscoveryConfig {
    fn default() -> Self {
        Self {
            module_timeout_ms: default_module_timeout_ms(),
            scan_timeout_ms: default_scan_timeout_ms(),
            background_discovery: default_background_discovery(),
        }
    }
}

impl ChildDiscoveryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.module_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "module_timeout_ms must be at least 1ms".into(),
            )));
        }

        Ok(())
    }

    pub fn module_timeout(&self) -> Duration {
        Duration::from_millis(self.module_timeout_ms)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }
}

fn default_module_timeout_ms() -> u64 {
    DEFAULT_MODULE_TIMEOUT_MS
}
fn default_scan_timeout_ms() -> u64 {
    DEFAULT_SCAN_TIMEOUT_MS
}
fn default_background_discovery() -> bool {
    true
}
