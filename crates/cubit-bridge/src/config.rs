//! Centralized configuration for the Cubit bridge.
//!
//! Wire-format constants shared with the remote dispatcher and defaults used
//! when launching the toolkit interpreter.

use std::time::Duration;

/// Constants that the local side and the remote dispatcher must agree on.
pub struct WireConfig;

impl WireConfig {
    /// Prefix of the first element of every handle pair.
    pub const HANDLE_PREFIX: &'static str = "cp2t3id_";
    /// Key of the object that carries a non-finite float (`{"float": "nan"}`),
    /// which plain JSON cannot express.
    pub const FLOAT_TAG: &'static str = "float";
    /// Upper bound for a single frame, in either direction.
    pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;
}

/// Defaults for spawning the toolkit interpreter.
pub struct LaunchConfig;

impl LaunchConfig {
    pub const DEFAULT_INTERPRETER: &'static str = "python3";
    /// Prefix of execnet-style interpreter specs (`popen//python=/path`).
    pub const EXECNET_PREFIX: &'static str = "popen//python=";
    /// Toolkit argument that names its log file.
    pub const LOG_DIRECTIVE: &'static str = "-log";
    pub const LOG_FILE_NAME: &'static str = "cubit.log";
    pub const TEMP_DIR_PREFIX: &'static str = "cubit-bridge-";

    // Child shutdown after the channel is closed
    pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);
    pub const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(20);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_timing_is_reasonable() {
        assert!(LaunchConfig::SHUTDOWN_POLL_INTERVAL < LaunchConfig::SHUTDOWN_TIMEOUT);
        assert!(LaunchConfig::EXECNET_PREFIX.ends_with('='));
    }
}
