// crates/rtb-hooks-core/src/runtime/invoker.rs
// ============================================================================
// Module: RTB Hooks Invoker
// Description: Runs one hook against the group deadline.
// Purpose: Isolate slow or panicking module code from the group.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! The module call runs on its own task. The invoker waits for it until the
//! group deadline and then stops waiting; the hook task is detached, never
//! force-killed, and only owns its payload and context snapshots.
//! Invariants:
//! - A timed-out hook contributes no result.
//! - A panicking hook is reported as an execution failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::time::Duration;

use tokio::task::JoinError;
use tokio::time::Instant;
use tokio::time::timeout_at;

use crate::core::HookError;
use crate::core::HookResult;
use crate::core::ModuleInvocationContext;
use crate::core::StagePayload;
use crate::core::identifiers::HookId;
use crate::plan::HookWrapper;

// ============================================================================
// SECTION: Hook Response
// ============================================================================

/// Result of one hook invocation as seen by the group executor.
#[derive(Debug)]
pub struct HookResponse<P> {
    /// Hook that was invoked.
    pub hook_id: HookId,
    /// Hook result or the error it failed with.
    pub result: Result<HookResult<P>, HookError>,
    /// Wall-clock time of the hook call.
    pub execution_time: Duration,
}

impl<P> HookResponse<P> {
    /// Returns true when the hook asked to reject the request.
    #[must_use]
    pub fn rejects(&self) -> bool {
        matches!(&self.result, Ok(result) if result.reject)
    }
}

// ============================================================================
// SECTION: Invocation
// ============================================================================

/// Invokes one hook, waiting no longer than the context deadline.
pub async fn invoke_hook<P: StagePayload>(
    hook: HookWrapper<P>,
    ctx: ModuleInvocationContext,
    payload: P,
) -> HookResponse<P> {
    let hook_id = hook.hook_id();
    let deadline = ctx.deadline;
    let started = Instant::now();
    let handle = tokio::spawn(async move { hook.hook.call(ctx, payload).await });
    let result = match timeout_at(deadline, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => Err(HookError::Execution(join_error_message(err))),
        Err(_) => Err(HookError::Timeout),
    };
    HookResponse {
        hook_id,
        result,
        execution_time: started.elapsed(),
    }
}

/// Describes why a hook task did not produce a result.
fn join_error_message(err: JoinError) -> String {
    if err.is_panic() {
        format!("hook execution panicked: {}", panic_message(err.into_panic().as_ref()))
    } else {
        "hook execution was cancelled".to_string()
    }
}

/// Extracts the message of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
