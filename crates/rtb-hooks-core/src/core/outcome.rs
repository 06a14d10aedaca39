// crates/rtb-hooks-core/src/core/outcome.rs
// ============================================================================
// Module: RTB Hooks Execution Outcomes
// Description: Stage, group, and hook outcome records.
// Purpose: Record what every dispatched hook did for debugging and analytics.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Outcomes form an append-only tree: one [`StageOutcome`] per executed
//! stage, one [`GroupOutcome`] per executed group, one [`HookOutcome`] per
//! dispatched or gated hook.
//! Invariants:
//! - Hook outcomes within a group follow hook declaration order.
//! - Group execution time is the slowest hook; stage time is the group sum.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::core::analytics::Analytics;
use crate::core::identifiers::Entity;
use crate::core::identifiers::HookId;
use crate::core::stage::Stage;

// ============================================================================
// SECTION: Status and Action
// ============================================================================

/// Execution status of one hook.
///
/// # Invariants
/// - Labels are stable for reporting and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Hook completed and its result was processed.
    Success,
    /// Hook reported a module-declared failure.
    Failure,
    /// Hook did not complete before the group deadline.
    Timeout,
    /// Hook panicked, misbehaved, or none of its mutations applied.
    ExecutionFailure,
    /// Hook was still running when a sibling rejected the request.
    Cancelled,
}

impl Status {
    /// Returns the stable status label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Timeout => "timeout",
            Self::ExecutionFailure => "execution_failure",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effect a hook had on the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// At least one mutation was applied.
    Update,
    /// The hook rejected the request.
    Reject,
    /// Nothing changed.
    NoAction,
    /// The hook was not invoked because the AB-test gate skipped it.
    NoInvocation,
}

impl Action {
    /// Returns the stable action label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Reject => "reject",
            Self::NoAction => "no_action",
            Self::NoInvocation => "no_invocation",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Outcome of one hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookOutcome {
    /// Hook identifier.
    pub hook_id: HookId,
    /// Execution status.
    pub status: Status,
    /// Effect on the request.
    pub action: Action,
    /// Module-reported message.
    #[serde(default)]
    pub message: String,
    /// Debug messages, including one per applied mutation.
    #[serde(default)]
    pub debug_messages: Vec<String>,
    /// Errors reported by the module or the engine.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Warnings reported by the module or the engine.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Analytics tags.
    #[serde(default)]
    pub analytics_tags: Analytics,
    /// Wall-clock time of the hook call.
    #[serde(rename = "execution_time_millis", with = "duration_millis")]
    pub execution_time: Duration,
}

impl HookOutcome {
    /// Creates an outcome with empty messages and zero execution time.
    #[must_use]
    pub fn new(hook_id: HookId, status: Status, action: Action) -> Self {
        Self {
            hook_id,
            status,
            action,
            message: String::new(),
            debug_messages: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            analytics_tags: Analytics::default(),
            execution_time: Duration::ZERO,
        }
    }
}

/// Outcome of one executed group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupOutcome {
    /// Group execution time (slowest hook).
    #[serde(rename = "execution_time_millis", with = "duration_millis")]
    pub execution_time: Duration,
    /// Hook outcomes in declaration order.
    pub invocation_results: Vec<HookOutcome>,
}

/// Outcome of one executed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutcome {
    /// Entity the stage ran for.
    pub entity: Entity,
    /// Stage that ran.
    pub stage: Stage,
    /// Stage execution time (sum of group times).
    #[serde(rename = "execution_time_millis", with = "duration_millis")]
    pub execution_time: Duration,
    /// Group outcomes in plan order.
    pub groups: Vec<GroupOutcome>,
}

impl StageOutcome {
    /// Creates an empty outcome for the provided stage and entity.
    #[must_use]
    pub const fn new(stage: Stage, entity: Entity) -> Self {
        Self {
            entity,
            stage,
            execution_time: Duration::ZERO,
            groups: Vec::new(),
        }
    }

    /// Iterates over every hook outcome of the stage.
    pub fn hook_outcomes(&self) -> impl Iterator<Item = &HookOutcome> {
        self.groups.iter().flat_map(|group| group.invocation_results.iter())
    }
}

// ============================================================================
// SECTION: Serde Helpers
// ============================================================================

/// Serializes durations as whole milliseconds.
mod duration_millis {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    /// Serializes a duration as saturating milliseconds.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    /// Deserializes milliseconds into a duration.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
