// crates/rtb-hooks-core/src/telemetry.rs
// ============================================================================
// Module: RTB Hooks Telemetry
// Description: Metrics interface for hook invocations.
// Purpose: Count module calls and their results without hard deps.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! This module exposes a thin metrics interface for per-module hook
//! counters. Deployments plug in their own backend by implementing
//! [`HookMetrics`]; [`NoopMetrics`] discards everything.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::identifiers::AccountId;
use crate::core::stage::Stage;

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Labels attached to every module metric.
///
/// # Invariants
/// - `module` is sanitized: `.` and `-` are replaced by `_`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLabels {
    /// Sanitized module code.
    pub module: String,
    /// Stage the hook ran at.
    pub stage: Stage,
    /// Account identifier when known.
    pub account_id: Option<AccountId>,
}

impl ModuleLabels {
    /// Creates labels for a module, sanitizing the module code.
    #[must_use]
    pub fn new(module_code: &str, stage: Stage, account_id: Option<AccountId>) -> Self {
        Self {
            module: sanitize_module_label(module_code),
            stage,
            account_id,
        }
    }
}

/// Replaces characters metric backends reject in label values.
#[must_use]
pub fn sanitize_module_label(module_code: &str) -> String {
    module_code.replace(['.', '-'], "_")
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for hook invocations.
pub trait HookMetrics: Send + Sync {
    /// Records a dispatched hook call.
    fn record_module_called(&self, labels: &ModuleLabels);
    /// Records a successful call that changed nothing.
    fn record_module_success_nooped(&self, labels: &ModuleLabels);
    /// Records a successful call that applied mutations.
    fn record_module_success_updated(&self, labels: &ModuleLabels);
    /// Records a successful call that rejected the request.
    fn record_module_success_rejected(&self, labels: &ModuleLabels);
    /// Records a module-declared failure.
    fn record_module_failed(&self, labels: &ModuleLabels);
    /// Records a timeout.
    fn record_module_timeout(&self, labels: &ModuleLabels);
    /// Records an execution failure.
    fn record_module_execution_error(&self, labels: &ModuleLabels);
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
pub struct NoopMetrics;

impl HookMetrics for NoopMetrics {
    fn record_module_called(&self, _labels: &ModuleLabels) {}

    fn record_module_success_nooped(&self, _labels: &ModuleLabels) {}

    fn record_module_success_updated(&self, _labels: &ModuleLabels) {}

    fn record_module_success_rejected(&self, _labels: &ModuleLabels) {}

    fn record_module_failed(&self, _labels: &ModuleLabels) {}

    fn record_module_timeout(&self, _labels: &ModuleLabels) {}

    fn record_module_execution_error(&self, _labels: &ModuleLabels) {}
}
