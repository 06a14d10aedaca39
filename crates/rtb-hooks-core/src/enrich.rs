// crates/rtb-hooks-core/src/enrich.rs
// ============================================================================
// Module: RTB Hooks Outcome Enrichment
// Description: Serializes recorded outcomes into the bid response extension.
// Purpose: Expose hook errors, warnings, and traces to authorized callers.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Recorded stage outcomes are exposed under `ext.prebid.modules` of the
//! bid response. Errors and warnings are keyed by module and hook code and
//! require debug mode; traces require a trace level and carry timing.
//! Invariants:
//! - Debug output is returned only when the account allows it.
//! - Basic traces omit messages, debug messages, and analytics tags.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::Action;
use crate::core::Analytics;
use crate::core::HookOutcome;
use crate::core::StageOutcome;
use crate::core::Status;
use crate::core::identifiers::Entity;
use crate::core::identifiers::HookId;
use crate::core::ortb::BidRequest;
use crate::core::ortb::BidResponse;
use crate::core::stage::Stage;
use crate::plan::Account;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors produced while enriching a bid response.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// The response extension is not a JSON object.
    #[error("invalid bid response extension: {0}")]
    InvalidExtension(String),
    /// The modules outcome could not be serialized.
    #[error("failed to serialize modules outcome: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ============================================================================
// SECTION: Debug Options
// ============================================================================

/// Trace verbosity requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceLevel {
    /// No trace.
    #[default]
    None,
    /// Timing and statuses only.
    Basic,
    /// Everything recorded.
    Verbose,
}

/// Debug and trace options derived from the request and account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugOptions {
    /// Whether errors and warnings are returned.
    pub debug: bool,
    /// Requested trace level.
    pub trace: TraceLevel,
    /// Warnings about malformed debug options.
    pub warnings: Vec<String>,
}

impl DebugOptions {
    /// Derives options from `test`, `ext.prebid.debug`, and `ext.prebid.trace`.
    #[must_use]
    pub fn from_request(request: &BidRequest, account: Option<&Account>) -> Self {
        let mut options = Self {
            debug: request.test == 1,
            ..Self::default()
        };
        let prebid = request.ext.as_ref().and_then(|ext| ext.get("prebid"));
        if let Some(trace) = prebid.and_then(|prebid| prebid.get("trace")) {
            match trace {
                Value::String(level) => {
                    options.trace = match level.as_str() {
                        "verbose" => TraceLevel::Verbose,
                        "basic" => TraceLevel::Basic,
                        _ => TraceLevel::None,
                    };
                }
                other => options.warnings.push(format!("Value is not a string: {}", raw(other))),
            }
        }
        if let Some(debug) = prebid.and_then(|prebid| prebid.get("debug")) {
            match debug {
                Value::Bool(enabled) => options.debug |= enabled,
                other => options.warnings.push(format!("Value is not a boolean: {}", raw(other))),
            }
        }
        let debug_allowed = account.is_none_or(|account| account.debug_allow);
        options.debug &= debug_allowed;
        options
    }
}

/// Renders a JSON value without string quoting.
fn raw(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// SECTION: Modules Outcome
// ============================================================================

/// Messages keyed by module code, then hook implementation code.
pub type ModuleMessages = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Hook execution summary exposed under `ext.prebid.modules`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModulesOutcome {
    /// Errors per module and hook.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: ModuleMessages,
    /// Warnings per module and hook.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub warnings: ModuleMessages,
    /// Execution trace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceOutcome>,
}

/// Execution trace across stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceOutcome {
    /// Sum of stage times.
    pub execution_time_millis: u64,
    /// Stages in lifecycle order.
    pub stages: Vec<TraceStage>,
}

/// Trace of one stage across its entities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceStage {
    /// Stage.
    pub stage: Stage,
    /// Slowest entity outcome of the stage.
    pub execution_time_millis: u64,
    /// Outcomes per entity.
    pub outcomes: Vec<TraceStageOutcome>,
}

/// Trace of one stage execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceStageOutcome {
    /// Entity the stage ran for.
    pub entity: Entity,
    /// Stage execution time.
    pub execution_time_millis: u64,
    /// Group traces.
    pub groups: Vec<TraceGroup>,
}

/// Trace of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceGroup {
    /// Group execution time.
    pub execution_time_millis: u64,
    /// Hook traces in declaration order.
    pub invocation_results: Vec<TraceHook>,
}

/// Trace of one hook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceHook {
    /// Hook identifier.
    pub hook_id: HookId,
    /// Execution status.
    pub status: Status,
    /// Effect on the request.
    pub action: Action,
    /// Module message (verbose only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Debug messages (verbose only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_messages: Option<Vec<String>>,
    /// Analytics tags (verbose only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_tags: Option<Analytics>,
    /// Hook execution time.
    pub execution_time_millis: u64,
}

/// Builds the modules outcome, or `None` when there is nothing to expose.
#[must_use]
pub fn modules_outcome(
    outcomes: &[StageOutcome],
    options: &DebugOptions,
) -> Option<ModulesOutcome> {
    let mut modules = ModulesOutcome::default();
    if options.debug {
        for hook in outcomes.iter().flat_map(StageOutcome::hook_outcomes) {
            collect_messages(&mut modules.errors, hook, &hook.errors);
            collect_messages(&mut modules.warnings, hook, &hook.warnings);
        }
    }
    if options.trace != TraceLevel::None && !outcomes.is_empty() {
        modules.trace = Some(trace_outcome(outcomes, options.trace));
    }
    if modules == ModulesOutcome::default() { None } else { Some(modules) }
}

/// Places the modules outcome under `ext.prebid.modules` of the response.
///
/// Returns the warnings produced while reading the debug options.
///
/// # Errors
///
/// Returns [`EnrichError`] when the extension is malformed or serialization fails.
pub fn enrich_bid_response(
    response: &mut BidResponse,
    outcomes: &[StageOutcome],
    request: &BidRequest,
    account: Option<&Account>,
) -> Result<Vec<String>, EnrichError> {
    let (ext, warnings) = enrich_ext_bid_response(response.ext.take(), outcomes, request, account)?;
    response.ext = ext;
    Ok(warnings)
}

/// Places the modules outcome under `prebid.modules` of a response extension.
///
/// # Errors
///
/// Returns [`EnrichError`] when the extension is malformed or serialization fails.
pub fn enrich_ext_bid_response(
    ext: Option<Value>,
    outcomes: &[StageOutcome],
    request: &BidRequest,
    account: Option<&Account>,
) -> Result<(Option<Value>, Vec<String>), EnrichError> {
    let options = DebugOptions::from_request(request, account);
    let Some(modules) = modules_outcome(outcomes, &options) else {
        return Ok((ext, options.warnings));
    };
    let mut root = match ext {
        None => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(EnrichError::InvalidExtension("expected an object".to_string())),
    };
    let prebid = root.entry("prebid").or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(prebid) = prebid else {
        return Err(EnrichError::InvalidExtension("prebid is not an object".to_string()));
    };
    prebid.insert("modules".to_string(), serde_json::to_value(modules)?);
    Ok((Some(Value::Object(root)), options.warnings))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Appends non-empty messages of a hook under its module and hook code.
fn collect_messages(target: &mut ModuleMessages, hook: &HookOutcome, messages: &[String]) {
    if messages.is_empty() {
        return;
    }
    target
        .entry(hook.hook_id.module_code.clone())
        .or_default()
        .entry(hook.hook_id.hook_impl_code.clone())
        .or_default()
        .extend(messages.iter().cloned());
}

/// Builds the trace for all recorded outcomes.
fn trace_outcome(outcomes: &[StageOutcome], level: TraceLevel) -> TraceOutcome {
    let mut by_stage: BTreeMap<Stage, Vec<&StageOutcome>> = BTreeMap::new();
    for outcome in outcomes {
        by_stage.entry(outcome.stage).or_default().push(outcome);
    }
    let stages: Vec<TraceStage> = by_stage
        .into_iter()
        .map(|(stage, outcomes)| {
            let outcomes: Vec<TraceStageOutcome> =
                outcomes.into_iter().map(|outcome| trace_stage_outcome(outcome, level)).collect();
            TraceStage {
                stage,
                execution_time_millis: outcomes
                    .iter()
                    .map(|outcome| outcome.execution_time_millis)
                    .max()
                    .unwrap_or_default(),
                outcomes,
            }
        })
        .collect();
    TraceOutcome {
        execution_time_millis: stages
            .iter()
            .fold(0_u64, |total, stage| total.saturating_add(stage.execution_time_millis)),
        stages,
    }
}

/// Builds the trace of one stage execution.
fn trace_stage_outcome(outcome: &StageOutcome, level: TraceLevel) -> TraceStageOutcome {
    TraceStageOutcome {
        entity: outcome.entity.clone(),
        execution_time_millis: millis(outcome.execution_time),
        groups: outcome
            .groups
            .iter()
            .map(|group| TraceGroup {
                execution_time_millis: millis(group.execution_time),
                invocation_results: group
                    .invocation_results
                    .iter()
                    .map(|hook| trace_hook(hook, level))
                    .collect(),
            })
            .collect(),
    }
}

/// Builds the trace of one hook.
fn trace_hook(hook: &HookOutcome, level: TraceLevel) -> TraceHook {
    let verbose = level == TraceLevel::Verbose;
    TraceHook {
        hook_id: hook.hook_id.clone(),
        status: hook.status,
        action: hook.action,
        message: (verbose && !hook.message.is_empty()).then(|| hook.message.clone()),
        debug_messages: (verbose && !hook.debug_messages.is_empty())
            .then(|| hook.debug_messages.clone()),
        analytics_tags: (verbose && !hook.analytics_tags.is_empty())
            .then(|| hook.analytics_tags.clone()),
        execution_time_millis: millis(hook.execution_time),
    }
}

/// Converts a duration to saturating milliseconds.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
