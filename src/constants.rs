/// Upper bound for a single `create_results` call (ms)
pub const DEFAULT_MODULE_TIMEOUT_MS: u64 = 15_000;

/// Length of a manual scan window (ms)
pub const DEFAULT_SCAN_TIMEOUT_MS: u64 = 5_000;

/// Capacity of the discovery event broadcast channel
pub const DISCOVERY_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Prefix for environment variable overrides, e.g. `DISCOVERY__CHILD__MODULE_TIMEOUT_MS`
pub const ENV_PREFIX: &str = "DISCOVERY";

/// Thread name used for isolated module invocations
pub const MODULE_THREAD_NAME: &str = "child-discovery-module";
