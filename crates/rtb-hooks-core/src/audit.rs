// crates/rtb-hooks-core/src/audit.rs
// ============================================================================
// Module: RTB Hooks Execution Logging
// Description: Structured execution log events for hook stages.
// Purpose: Emit JSON-lines execution logs without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines execution log events and sinks. The executor facade
//! emits one `hook_stage_executed` event per executed stage, one
//! `hook_invocation_failed` event per hook that did not succeed, and one
//! `hook_stage_rejected` event per rejection. Deployments route events to
//! their preferred logging pipeline by implementing [`ExecutionLogSink`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::HookOutcome;
use crate::core::RejectError;
use crate::core::StageOutcome;
use crate::core::Status;
use crate::core::identifiers::AccountId;
use crate::core::identifiers::Endpoint;
use crate::core::identifiers::Entity;
use crate::core::identifiers::HookId;
use crate::core::stage::Stage;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Event name for an executed stage.
pub const EVENT_STAGE_EXECUTED: &str = "hook_stage_executed";
/// Event name for a hook that did not succeed.
pub const EVENT_INVOCATION_FAILED: &str = "hook_invocation_failed";
/// Event name for a stage rejection.
pub const EVENT_STAGE_REJECTED: &str = "hook_stage_rejected";

/// Hook execution log event payload.
#[derive(Debug, Clone, Serialize)]
pub struct HookLogEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Endpoint the request arrived on.
    pub endpoint: Endpoint,
    /// Stage the event belongs to.
    pub stage: Stage,
    /// Entity the stage ran for.
    pub entity: Entity,
    /// Account identifier when known.
    pub account_id: Option<AccountId>,
    /// Hook identifier for hook-scoped events.
    pub hook_id: Option<HookId>,
    /// Hook status for hook-scoped events.
    pub status: Option<Status>,
    /// Execution time in milliseconds.
    pub execution_time_ms: u64,
    /// Number of executed groups for stage events.
    pub groups: Option<usize>,
    /// No-bid reason code for rejection events.
    pub nbr: Option<i32>,
    /// Errors recorded for the hook or rejection.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Stage-level inputs shared by every event of one stage execution.
#[derive(Debug, Clone)]
pub struct HookLogEventParams {
    /// Endpoint the request arrived on.
    pub endpoint: Endpoint,
    /// Stage that ran.
    pub stage: Stage,
    /// Entity the stage ran for.
    pub entity: Entity,
    /// Account identifier when known.
    pub account_id: Option<AccountId>,
}

impl HookLogEvent {
    /// Creates a stage-executed event.
    #[must_use]
    pub fn stage_executed(params: &HookLogEventParams, outcome: &StageOutcome) -> Self {
        let mut event = Self::base(EVENT_STAGE_EXECUTED, params);
        event.execution_time_ms = millis(outcome.execution_time);
        event.groups = Some(outcome.groups.len());
        event
    }

    /// Creates an invocation-failed event for a hook outcome.
    #[must_use]
    pub fn invocation_failed(params: &HookLogEventParams, outcome: &HookOutcome) -> Self {
        let mut event = Self::base(EVENT_INVOCATION_FAILED, params);
        event.hook_id = Some(outcome.hook_id.clone());
        event.status = Some(outcome.status);
        event.execution_time_ms = millis(outcome.execution_time);
        event.errors.clone_from(&outcome.errors);
        event
    }

    /// Creates a stage-rejected event.
    #[must_use]
    pub fn stage_rejected(params: &HookLogEventParams, reject: &RejectError) -> Self {
        let mut event = Self::base(EVENT_STAGE_REJECTED, params);
        event.hook_id = Some(reject.hook_id.clone());
        event.nbr = Some(reject.nbr);
        event.errors.push(reject.to_string());
        event
    }

    /// Creates an event with a consistent timestamp and empty details.
    fn base(event: &'static str, params: &HookLogEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            endpoint: params.endpoint.clone(),
            stage: params.stage,
            entity: params.entity.clone(),
            account_id: params.account_id.clone(),
            hook_id: None,
            status: None,
            execution_time_ms: 0,
            groups: None,
            nbr: None,
            errors: Vec::new(),
        }
    }
}

/// Converts a duration to saturating milliseconds.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Sink for hook execution log events.
pub trait ExecutionLogSink: Send + Sync {
    /// Record an execution log event.
    fn record(&self, event: &HookLogEvent);
}

/// Log sink that writes JSON lines to stderr.
pub struct StderrLogSink;

impl ExecutionLogSink for StderrLogSink {
    fn record(&self, event: &HookLogEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Log sink that appends JSON lines to a file.
pub struct FileLogSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileLogSink {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ExecutionLogSink for FileLogSink {
    fn record(&self, event: &HookLogEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op log sink.
pub struct NoopLogSink;

impl ExecutionLogSink for NoopLogSink {
    fn record(&self, _event: &HookLogEvent) {}
}
