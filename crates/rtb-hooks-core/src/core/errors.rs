// crates/rtb-hooks-core/src/core/errors.rs
// ============================================================================
// Module: RTB Hooks Errors
// Description: Hook failure taxonomy and the stage rejection error.
// Purpose: Separate recorded failures from the one stage-fatal condition.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`HookError`] values are recorded on hook outcomes and never propagate.
//! [`RejectError`] is the only condition that stops a stage and is surfaced
//! to the caller through [`Rejection`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::HookId;
use crate::core::outcome::Status;
use crate::core::stage::Stage;

// ============================================================================
// SECTION: Hook Errors
// ============================================================================

/// Errors produced while invoking one hook.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// Hook did not finish before the group deadline.
    #[error("Hook execution timeout")]
    Timeout,
    /// Module-declared failure.
    #[error("hook execution failed: {0}")]
    Failure(String),
    /// Unexpected handler error or panic.
    #[error("{0}")]
    Execution(String),
}

impl HookError {
    /// Returns the outcome status this error is recorded as.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::Timeout => Status::Timeout,
            Self::Failure(_) => Status::Failure,
            Self::Execution(_) => Status::ExecutionFailure,
        }
    }
}

// ============================================================================
// SECTION: Rejection
// ============================================================================

/// Stage-fatal rejection raised by a hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Module {} (hook: {}) rejected request with code {nbr} at {stage} stage",
    .hook_id.module_code,
    .hook_id.hook_impl_code
)]
pub struct RejectError {
    /// No-bid reason code.
    pub nbr: i32,
    /// Hook that rejected.
    pub hook_id: HookId,
    /// Stage the rejection happened at.
    pub stage: Stage,
}

/// Rejected stage result returned by the executor facade.
///
/// # Invariants
/// - `payload` is the payload the stage was called with, unmodified.
#[derive(Debug)]
pub struct Rejection<P> {
    /// Unmodified stage input.
    pub payload: P,
    /// Rejection details.
    pub error: RejectError,
}
