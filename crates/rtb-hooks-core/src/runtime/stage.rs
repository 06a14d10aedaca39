// crates/rtb-hooks-core/src/runtime/stage.rs
// ============================================================================
// Module: RTB Hooks Stage Executor
// Description: Sequential execution of a plan's groups.
// Purpose: Thread the payload through groups and stop on rejection.
// Dependencies: crate::runtime::group
// ============================================================================

//! ## Overview
//! Groups run strictly in plan order; each group sees the mutations of all
//! earlier groups. A rejecting group ends the stage and the payload returned
//! is the one the rejecting group started with.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::RejectError;
use crate::core::StageOutcome;
use crate::core::StagePayload;
use crate::plan::Plan;
use crate::runtime::context::StageContext;
use crate::runtime::group::execute_group;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of executing one stage.
#[derive(Debug)]
pub struct StageExecution<P> {
    /// Stage outcome with one group outcome per executed group.
    pub outcome: StageOutcome,
    /// Payload after the last executed group.
    pub payload: P,
    /// Rejection that stopped the stage.
    pub reject: Option<RejectError>,
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Executes every group of `plan` in order.
pub async fn execute_stage<P: StagePayload>(
    ctx: &StageContext,
    plan: &Plan<P>,
    mut payload: P,
) -> StageExecution<P> {
    let mut outcome = StageOutcome::new(ctx.stage, ctx.entity.clone());
    for group in plan.groups() {
        let execution = execute_group(ctx, group, payload).await;
        outcome.execution_time += execution.outcome.execution_time;
        outcome.groups.push(execution.outcome);
        payload = execution.payload;
        if let Some(reject) = execution.reject {
            return StageExecution {
                outcome,
                payload,
                reject: Some(reject),
            };
        }
    }
    StageExecution {
        outcome,
        payload,
        reject: None,
    }
}
