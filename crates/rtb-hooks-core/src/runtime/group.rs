// crates/rtb-hooks-core/src/runtime/group.rs
// ============================================================================
// Module: RTB Hooks Group Executor
// Description: Concurrent execution of the hooks of one group.
// Purpose: Fan hooks out under one deadline and fan their results back in.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! Every hook of a group runs as its own task on a clone of the same
//! pre-group payload. Results are collected as they complete; mutations are
//! applied only after collection ends, in declaration order.
//! Invariants:
//! - All hooks share one deadline fixed when the group starts; timeouts
//!   longer than [`MAX_GROUP_DEADLINE`] are capped.
//! - The first rejection on a rejectable stage stops collection; hooks still
//!   running are reported as cancelled and no mutation of the group applies.
//! - Failures and timeouts never stop the group.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::core::Action;
use crate::core::GroupOutcome;
use crate::core::HookOutcome;
use crate::core::RejectError;
use crate::core::StagePayload;
use crate::core::Status;
use crate::core::identifiers::HookId;
use crate::plan::Group;
use crate::runtime::abtest::AbDecision;
use crate::runtime::abtest::skipped_outcome;
use crate::runtime::abtest::tag_run;
use crate::runtime::activity::restrict_payload;
use crate::runtime::context::StageContext;
use crate::runtime::invoker::HookResponse;
use crate::runtime::invoker::invoke_hook;
use crate::runtime::mutation::discard_hook_responses;
use crate::runtime::mutation::process_hook_responses;
use crate::runtime::mutation::reject_error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Longest deadline a group may run under, roughly thirty years.
pub const MAX_GROUP_DEADLINE: Duration = Duration::from_secs(86_400 * 365 * 30);

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of executing one group.
#[derive(Debug)]
pub struct GroupExecution<P> {
    /// Group outcome.
    pub outcome: GroupOutcome,
    /// Payload after the group; the input payload when rejected.
    pub payload: P,
    /// Rejection raised by a hook of the group.
    pub reject: Option<RejectError>,
}

/// Per-hook bookkeeping while a group runs.
struct Dispatch<P> {
    /// Hook identifier.
    hook_id: HookId,
    /// Synthetic outcome when the AB-test gate skipped the hook.
    skipped: Option<HookOutcome>,
    /// Whether a `run` AB-test tag is appended to the outcome.
    tag_run: bool,
    /// Collected response.
    response: Option<HookResponse<P>>,
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Executes one group of hooks against `payload`.
pub async fn execute_group<P: StagePayload>(
    ctx: &StageContext,
    group: &Group<P>,
    payload: P,
) -> GroupExecution<P> {
    let deadline = Instant::now() + group.timeout.min(MAX_GROUP_DEADLINE);
    let account_id = ctx.account_id();
    let mut dispatches: Vec<Dispatch<P>> = Vec::with_capacity(group.hooks.len());
    let mut tasks = JoinSet::new();

    for (index, hook) in group.hooks.iter().enumerate() {
        let decision = ctx.ab_tests.as_ref().map_or(AbDecision::NotApplicable, |tests| {
            tests.decide(&hook.module_code, account_id.as_ref())
        });
        if let AbDecision::Skip {
            log_analytics_tag,
        } = decision
        {
            dispatches.push(Dispatch {
                hook_id: hook.hook_id(),
                skipped: Some(skipped_outcome(hook.hook_id(), log_analytics_tag)),
                tag_run: false,
                response: None,
            });
            continue;
        }
        dispatches.push(Dispatch {
            hook_id: hook.hook_id(),
            skipped: None,
            tag_run: matches!(decision, AbDecision::Run {
                log_analytics_tag: true
            }),
            response: None,
        });
        ctx.metrics.record_module_called(&ctx.labels(&hook.module_code));
        let hook_payload =
            restrict_payload(ctx.activity_control.as_deref(), &hook.module_code, payload.clone());
        let invocation = ctx.invocation_context(&hook.module_code, deadline);
        let hook = hook.clone();
        tasks.spawn(async move { (index, invoke_hook(hook, invocation, hook_payload).await) });
    }

    let mut reject = None;
    while let Some(joined) = tasks.join_next().await {
        let Ok((index, response)) = joined else {
            continue;
        };
        if ctx.stage.is_rejectable()
            && let Ok(result) = &response.result
            && result.reject
        {
            reject = Some(reject_error(ctx, &response.hook_id, result));
        }
        if let Some(dispatch) = dispatches.get_mut(index) {
            dispatch.response = Some(response);
        }
        if reject.is_some() {
            break;
        }
    }
    drop(tasks);

    merge_module_contexts(ctx, &mut dispatches);
    let execution_time = dispatches
        .iter()
        .filter_map(|dispatch| dispatch.response.as_ref().map(|response| response.execution_time))
        .max()
        .unwrap_or(Duration::ZERO);

    let mut slots: Vec<Option<HookOutcome>> = Vec::with_capacity(dispatches.len());
    let mut positions = Vec::new();
    let mut responses = Vec::new();
    let mut tagged = Vec::new();
    for (index, dispatch) in dispatches.into_iter().enumerate() {
        if dispatch.tag_run {
            tagged.push(index);
        }
        match (dispatch.skipped, dispatch.response) {
            (Some(outcome), _) => slots.push(Some(outcome)),
            (None, Some(response)) => {
                slots.push(None);
                positions.push(index);
                responses.push(response);
            }
            (None, None) => slots.push(Some(cancelled_outcome(dispatch.hook_id))),
        }
    }

    let (processed, payload) = match &reject {
        Some(error) => (discard_hook_responses(ctx, responses, &error.hook_id), payload),
        None => process_hook_responses(ctx, responses, payload),
    };
    for (index, outcome) in positions.into_iter().zip(processed) {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(outcome);
        }
    }
    let mut invocation_results: Vec<HookOutcome> = slots.into_iter().flatten().collect();
    for index in tagged {
        if let Some(outcome) = invocation_results.get_mut(index) {
            tag_run(outcome);
        }
    }

    GroupExecution {
        outcome: GroupOutcome {
            execution_time,
            invocation_results,
        },
        payload,
        reject,
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Merges returned module contexts into the store in declaration order.
fn merge_module_contexts<P>(ctx: &StageContext, dispatches: &mut [Dispatch<P>]) {
    for dispatch in dispatches {
        if let Some(response) = dispatch.response.as_mut()
            && let Ok(result) = response.result.as_mut()
            && let Some(entries) = result.module_context.take()
        {
            ctx.module_contexts.merge(&response.hook_id.module_code, entries);
        }
    }
}

/// Builds the outcome of a hook abandoned after a sibling rejected.
fn cancelled_outcome(hook_id: HookId) -> HookOutcome {
    let mut outcome = HookOutcome::new(hook_id, Status::Cancelled, Action::NoAction);
    outcome.errors.push("hook execution cancelled: request rejected by another hook".to_string());
    outcome
}
