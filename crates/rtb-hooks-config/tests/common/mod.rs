// crates/rtb-hooks-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for rtb-hooks-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use rtb_hooks_config::ConfigError;
use rtb_hooks_config::RtbHooksConfig;

/// Parses a TOML string into an `RtbHooksConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<RtbHooksConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Assert that a result is an error containing a specific substring.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error '{message}' did not contain '{needle}'"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
