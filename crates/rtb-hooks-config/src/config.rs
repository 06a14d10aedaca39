// crates/rtb-hooks-config/src/config.rs
// ============================================================================
// Module: RTB Hooks Configuration
// Description: Configuration loading and validation for hook execution.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: rtb-hooks-core, serde, serde_json, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The `[hooks]` table enables execution, lists module enablement, carries the
//! host and default-account execution plans, and declares AB tests. The
//! `[logging]` table selects the execution log sink.
//! Invariants:
//! - A loaded configuration has passed [`RtbHooksConfig::validate`].
//! - Every stage key in a validated plan parses as a [`Stage`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use rtb_hooks_core::AbTestConfig;
use rtb_hooks_core::ExecutionPlan;
use rtb_hooks_core::Stage;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "rtb-hooks.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "RTB_HOOKS_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Minimum group timeout in milliseconds.
pub const MIN_GROUP_TIMEOUT_MS: u64 = 1;
/// Maximum group timeout in milliseconds.
pub const MAX_GROUP_TIMEOUT_MS: u64 = 10_000;
/// Maximum AB-test rollout percentage.
pub(crate) const MAX_PERCENT_ACTIVE: u8 = 100;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// RTB hooks configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RtbHooksConfig {
    /// Hook execution configuration.
    #[serde(default)]
    pub hooks: HooksConfig,
    /// Execution log configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RtbHooksConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path argument wins, then [`CONFIG_ENV_VAR`], then
    /// `rtb-hooks.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.hooks.validate()?;
        self.logging.validate()
    }
}

/// Hook execution configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HooksConfig {
    /// Whether hook execution is enabled on the host.
    #[serde(default)]
    pub enabled: bool,
    /// Module configuration keyed by vendor, then module name.
    #[serde(default)]
    pub modules: BTreeMap<String, BTreeMap<String, ModuleConfig>>,
    /// Plan applied to every request before account plans.
    #[serde(default)]
    pub host_execution_plan: ExecutionPlan,
    /// Plan applied when the account declares no plan of its own.
    #[serde(default)]
    pub default_account_execution_plan: ExecutionPlan,
    /// Per-module AB tests.
    #[serde(default)]
    pub ab_tests: Vec<AbTestConfig>,
}

impl HooksConfig {
    /// Returns the configuration for a `vendor.module` code.
    #[must_use]
    pub fn module(&self, module_code: &str) -> Option<&ModuleConfig> {
        let (vendor, module) = module_code.split_once('.')?;
        self.modules.get(vendor)?.get(module)
    }

    /// Returns true when the module is configured and enabled.
    #[must_use]
    pub fn module_enabled(&self, module_code: &str) -> bool {
        self.module(module_code).is_some_and(|module| module.enabled)
    }

    /// Validates plans, module entries, and AB tests.
    fn validate(&self) -> Result<(), ConfigError> {
        for (vendor, modules) in &self.modules {
            if vendor.trim().is_empty() || vendor.contains('.') {
                return Err(ConfigError::Invalid(format!(
                    "hooks.modules vendor name is invalid: '{vendor}'"
                )));
            }
            for module in modules.keys() {
                if module.trim().is_empty() || module.contains('.') {
                    return Err(ConfigError::Invalid(format!(
                        "hooks.modules.{vendor} module name is invalid: '{module}'"
                    )));
                }
            }
        }
        validate_execution_plan("hooks.host_execution_plan", &self.host_execution_plan)?;
        validate_execution_plan(
            "hooks.default_account_execution_plan",
            &self.default_account_execution_plan,
        )?;
        validate_ab_tests(&self.ab_tests)
    }
}

/// Host configuration for one module.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModuleConfig {
    /// Whether the module is registered. Modules without the flag stay off.
    #[serde(default)]
    pub enabled: bool,
    /// Remaining module-specific settings.
    #[serde(flatten)]
    pub settings: BTreeMap<String, Value>,
}

/// Execution log sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard events.
    #[serde(rename = "none")]
    Discard,
}

/// Execution log configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Sink receiving execution events.
    #[serde(default)]
    pub sink: LogSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl LoggingConfig {
    /// Validates the sink selection.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (LogSinkKind::File, None) => {
                Err(ConfigError::Invalid("logging.path is required for the file sink".to_string()))
            }
            (LogSinkKind::File, Some(path)) => {
                validate_path_string("logging.path", &path.to_string_lossy())
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Plan Validation
// ============================================================================

/// Validates a declarative execution plan.
///
/// Checks endpoint paths, stage keys, group timeouts, and hook references.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] naming the offending field.
pub fn validate_execution_plan(field: &str, plan: &ExecutionPlan) -> Result<(), ConfigError> {
    for (endpoint, endpoint_plan) in &plan.endpoints {
        if !endpoint.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "{field} endpoint must begin with '/': {endpoint}"
            )));
        }
        for (stage, stage_plan) in &endpoint_plan.stages {
            stage
                .parse::<Stage>()
                .map_err(|err| ConfigError::Invalid(format!("{field}.{endpoint}: {err}")))?;
            for (index, group) in stage_plan.groups.iter().enumerate() {
                let location = format!("{field}.{endpoint}.{stage}.groups[{index}]");
                if !(MIN_GROUP_TIMEOUT_MS ..= MAX_GROUP_TIMEOUT_MS).contains(&group.timeout) {
                    return Err(ConfigError::Invalid(format!(
                        "{location}.timeout must be between {MIN_GROUP_TIMEOUT_MS} and \
                         {MAX_GROUP_TIMEOUT_MS} ms"
                    )));
                }
                for hook in &group.hook_sequence {
                    if hook.module_code.trim().is_empty() || hook.hook_impl_code.trim().is_empty() {
                        return Err(ConfigError::Invalid(format!(
                            "{location} hook codes must be non-empty"
                        )));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Validates AB-test declarations.
fn validate_ab_tests(tests: &[AbTestConfig]) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for test in tests {
        if test.module_code.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "hooks.ab_tests module_code must be non-empty".to_string(),
            ));
        }
        if test.percent_active > MAX_PERCENT_ACTIVE {
            return Err(ConfigError::Invalid(format!(
                "hooks.ab_tests.{} percent_active must be at most {MAX_PERCENT_ACTIVE}",
                test.module_code
            )));
        }
        if !seen.insert(test.module_code.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "hooks.ab_tests declares {} more than once",
                test.module_code
            )));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    validate_path(Path::new(trimmed))
        .map_err(|_| ConfigError::Invalid(format!("{field} exceeds path limits")))
}
