// crates/rtb-hooks-core/src/runtime/mutation.rs
// ============================================================================
// Module: RTB Hooks Mutation Applier
// Description: Turns collected hook responses into outcomes and a payload.
// Purpose: Apply change sets serially in hook declaration order.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Responses are processed in hook declaration order, never completion
//! order. Each mutation is applied to the payload produced by the previous
//! one; a failing mutation is reported as a warning and skipped.
//! Invariants:
//! - A failed or panicking mutation leaves the payload exactly as it was
//!   before it.
//! - Errors and timeouts never touch the payload.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;

use crate::core::Action;
use crate::core::HookError;
use crate::core::HookOutcome;
use crate::core::HookResult;
use crate::core::RejectError;
use crate::core::StagePayload;
use crate::core::Status;
use crate::core::identifiers::HookId;
use crate::runtime::context::StageContext;
use crate::runtime::invoker::HookResponse;
use crate::runtime::invoker::panic_message;
use crate::telemetry::ModuleLabels;

// ============================================================================
// SECTION: Response Processing
// ============================================================================

/// Processes responses in order, applying their mutations to `payload`.
#[must_use]
pub fn process_hook_responses<P: StagePayload>(
    ctx: &StageContext,
    responses: Vec<HookResponse<P>>,
    mut payload: P,
) -> (Vec<HookOutcome>, P) {
    let mut outcomes = Vec::with_capacity(responses.len());
    for response in responses {
        let (outcome, next) = process_hook_response(ctx, response, payload);
        outcomes.push(outcome);
        payload = next;
    }
    (outcomes, payload)
}

/// Processes responses of a rejected group without applying any mutation.
///
/// The rejecting hook is recorded with the rejection; every other hook that
/// declared mutations gets a warning that they were discarded.
#[must_use]
pub fn discard_hook_responses<P: StagePayload>(
    ctx: &StageContext,
    responses: Vec<HookResponse<P>>,
    rejected_by: &HookId,
) -> Vec<HookOutcome> {
    responses
        .into_iter()
        .map(|response| {
            let labels = ctx.labels(&response.hook_id.module_code);
            let mut outcome = outcome_for(&response);
            match response.result {
                Err(err) => record_error(ctx, &labels, &mut outcome, &err),
                Ok(result) if result.reject => record_reject(ctx, &labels, &mut outcome, &result),
                Ok(result) => {
                    let discarded = result.change_set.len();
                    copy_reports(&mut outcome, result);
                    if discarded > 0 {
                        outcome.warnings.push(format!(
                            "hook mutations discarded: request rejected by module {} (hook: {})",
                            rejected_by.module_code, rejected_by.hook_impl_code
                        ));
                    }
                    ctx.metrics.record_module_success_nooped(&labels);
                }
            }
            outcome
        })
        .collect()
}

/// Processes one response against the current payload.
fn process_hook_response<P: StagePayload>(
    ctx: &StageContext,
    response: HookResponse<P>,
    mut payload: P,
) -> (HookOutcome, P) {
    let labels = ctx.labels(&response.hook_id.module_code);
    let mut outcome = outcome_for(&response);
    let mut result = match response.result {
        Ok(result) => result,
        Err(err) => {
            record_error(ctx, &labels, &mut outcome, &err);
            return (outcome, payload);
        }
    };
    if result.reject {
        record_reject(ctx, &labels, &mut outcome, &result);
        return (outcome, payload);
    }

    let change_set = std::mem::take(&mut result.change_set);
    copy_reports(&mut outcome, result);
    let declared = change_set.len();
    let mut applied = 0_usize;
    for mutation in change_set.into_mutations() {
        let key = mutation.key_path();
        let mutation_type = mutation.mutation_type();
        let snapshot = payload.clone();
        match catch_unwind(AssertUnwindSafe(|| mutation.apply(payload))) {
            Ok(Ok(next)) => {
                payload = next;
                applied += 1;
                outcome.debug_messages.push(format!(
                    "Hook mutation successfully applied, affected key: {key}, mutation type: \
                     {mutation_type}"
                ));
            }
            Ok(Err(err)) => {
                payload = snapshot;
                outcome.warnings.push(format!("failed to apply hook mutation: {err}"));
            }
            Err(panic) => {
                payload = snapshot;
                outcome.warnings.push(format!(
                    "failed to apply hook mutation: {}",
                    panic_message(panic.as_ref())
                ));
            }
        }
    }

    if applied > 0 {
        outcome.action = Action::Update;
        ctx.metrics.record_module_success_updated(&labels);
    } else if declared > 0 {
        outcome.status = Status::ExecutionFailure;
        ctx.metrics.record_module_execution_error(&labels);
    } else {
        ctx.metrics.record_module_success_nooped(&labels);
    }
    (outcome, payload)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Creates the base outcome for a response.
fn outcome_for<P>(response: &HookResponse<P>) -> HookOutcome {
    let mut outcome = HookOutcome::new(response.hook_id.clone(), Status::Success, Action::NoAction);
    outcome.execution_time = response.execution_time;
    outcome
}

/// Records a hook error on the outcome.
fn record_error(
    ctx: &StageContext,
    labels: &ModuleLabels,
    outcome: &mut HookOutcome,
    err: &HookError,
) {
    outcome.status = err.status();
    outcome.errors.push(err.to_string());
    match outcome.status {
        Status::Timeout => ctx.metrics.record_module_timeout(labels),
        Status::Failure => ctx.metrics.record_module_failed(labels),
        _ => ctx.metrics.record_module_execution_error(labels),
    }
}

/// Records a rejection, downgrading it on stages that cannot reject.
fn record_reject<P>(
    ctx: &StageContext,
    labels: &ModuleLabels,
    outcome: &mut HookOutcome,
    result: &HookResult<P>,
) {
    outcome.message.clone_from(&result.message);
    outcome.debug_messages.extend(result.debug_messages.iter().cloned());
    outcome.errors.extend(result.errors.iter().cloned());
    outcome.warnings.extend(result.warnings.iter().cloned());
    outcome.analytics_tags = result.analytics_tags.clone();
    if ctx.stage.is_rejectable() {
        let reject = reject_error(ctx, &outcome.hook_id, result);
        outcome.action = Action::Reject;
        outcome.errors.push(reject.to_string());
        ctx.metrics.record_module_success_rejected(labels);
    } else {
        outcome.status = Status::ExecutionFailure;
        outcome.errors.push(format!(
            "Module (name: {}, hook code: {}) tried to reject request on the {} stage that does \
             not support rejection",
            outcome.hook_id.module_code, outcome.hook_id.hook_impl_code, ctx.stage
        ));
        ctx.metrics.record_module_execution_error(labels);
    }
}

/// Builds the rejection error for a rejecting result.
#[must_use]
pub fn reject_error<P>(
    ctx: &StageContext,
    hook_id: &HookId,
    result: &HookResult<P>,
) -> RejectError {
    RejectError {
        nbr: result.nbr_code.unwrap_or_default(),
        hook_id: hook_id.clone(),
        stage: ctx.stage,
    }
}

/// Copies module-reported messages and tags onto the outcome.
fn copy_reports<P>(outcome: &mut HookOutcome, result: HookResult<P>) {
    outcome.message = result.message;
    outcome.debug_messages.extend(result.debug_messages);
    outcome.errors.extend(result.errors);
    outcome.warnings.extend(result.warnings);
    outcome.analytics_tags = result.analytics_tags;
}
