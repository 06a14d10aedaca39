// crates/rtb-hooks-core/tests/stage_execution.rs
// ============================================================================
// Module: Stage Execution Tests
// Description: End-to-end stage runs through the executor facade.
// Purpose: Validate mutation application, timeouts, failures, and rejection.
// ============================================================================

//! ## Overview
//! Runs plans through [`HookExecutor`] and the stage executor under a paused
//! tokio clock and checks payloads and recorded outcomes.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::http::Method;
use axum::http::Uri;
use bytes::Bytes;
use common::FixedPlanBuilder;
use common::RecordingLogSink;
use common::RecordingMetrics;
use common::failing_hook;
use common::noop_hook;
use common::plan;
use common::rejecting_hook;
use common::scripted;
use common::stage_context;
use common::updating_hook;
use rtb_hooks_core::Action;
use rtb_hooks_core::AuctionResponsePayload;
use rtb_hooks_core::ChangeSet;
use rtb_hooks_core::EmptyPlanBuilder;
use rtb_hooks_core::Endpoint;
use rtb_hooks_core::EntrypointPayload;
use rtb_hooks_core::Group;
use rtb_hooks_core::HookExecutor;
use rtb_hooks_core::HookId;
use rtb_hooks_core::HookResult;
use rtb_hooks_core::HookWrapper;
use rtb_hooks_core::HttpRequest;
use rtb_hooks_core::MutationError;
use rtb_hooks_core::MutationType;
use rtb_hooks_core::Plan;
use rtb_hooks_core::RawAuctionRequestPayload;
use rtb_hooks_core::Stage;
use rtb_hooks_core::Status;
use rtb_hooks_core::audit::EVENT_INVOCATION_FAILED;
use rtb_hooks_core::audit::EVENT_STAGE_EXECUTED;
use rtb_hooks_core::audit::EVENT_STAGE_REJECTED;
use rtb_hooks_core::ortb::BidResponse;
use rtb_hooks_core::runtime::execute_stage;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rewrites the JSON object body of an entrypoint payload.
fn edit_body(
    mut payload: EntrypointPayload,
    edit: impl FnOnce(&mut Map<String, Value>),
) -> Result<EntrypointPayload, MutationError> {
    let mut body: Map<String, Value> =
        serde_json::from_slice(&payload.body).map_err(|err| MutationError::new(err.to_string()))?;
    edit(&mut body);
    let bytes = serde_json::to_vec(&body).map_err(|err| MutationError::new(err.to_string()))?;
    payload.body = Bytes::from(bytes);
    Ok(payload)
}

/// Builds an auction request on the auction endpoint.
fn auction_request() -> HttpRequest {
    HttpRequest::new(Method::POST, Uri::from_static("/openrtb2/auction"))
}

/// Hook replacing the raw auction body after `delay_ms`.
fn body_hook(
    module_code: &str,
    body: &'static str,
    delay_ms: u64,
) -> HookWrapper<RawAuctionRequestPayload> {
    updating_hook(
        module_code,
        "set-body",
        delay_ms,
        "body",
        move |mut payload: RawAuctionRequestPayload| {
            payload.body = Bytes::from_static(body.as_bytes());
            Ok(payload)
        },
    )
}

// ============================================================================
// SECTION: Passthrough
// ============================================================================

/// Tests an empty plan returns the payload untouched and records nothing.
#[tokio::test(start_paused = true)]
async fn empty_plan_is_passthrough() {
    let executor = HookExecutor::new(Arc::new(EmptyPlanBuilder), Endpoint::auction());
    let payload = executor
        .execute_entrypoint_stage(auction_request(), Bytes::from_static(b"{}"))
        .await
        .unwrap();
    assert_eq!(payload.body, Bytes::from_static(b"{}"));
    assert!(executor.outcomes().is_empty());
}

// ============================================================================
// SECTION: Mutations
// ============================================================================

/// Tests header, query, and body mutations across two groups.
#[tokio::test(start_paused = true)]
async fn entrypoint_mutations_apply_across_groups() {
    let add_header =
        updating_hook("acme.foobar", "add-header", 0, "header", |mut payload: EntrypointPayload| {
            payload.request.add_header("foo", "bar")?;
            Ok(payload)
        });
    let add_query =
        updating_hook("acme.foobar", "add-query", 0, "param", |mut payload: EntrypointPayload| {
            payload.request.add_query_param("foo", "baz")?;
            Ok(payload)
        });
    let rewrite_body = scripted("acme.bodies", "rewrite", 0, |_, _| {
        let mut change_set = ChangeSet::new();
        change_set
            .add_mutation(
                |payload| {
                    edit_body(payload, |body| {
                        body.remove("name");
                    })
                },
                MutationType::Delete,
                ["body", "name"],
            )
            .add_mutation(
                |payload| {
                    edit_body(payload, |body| {
                        body.insert("foo".to_string(), json!("bar"));
                    })
                },
                MutationType::Add,
                ["body", "foo"],
            );
        Ok(HookResult::with_change_set(change_set))
    });
    let builder = FixedPlanBuilder {
        entrypoint: plan(vec![(1, vec![add_header, add_query]), (1, vec![rewrite_body])]),
        ..FixedPlanBuilder::default()
    };
    let executor = HookExecutor::new(Arc::new(builder), Endpoint::auction());

    let payload = executor
        .execute_entrypoint_stage(
            auction_request(),
            Bytes::from_static(br#"{"name":"John","last_name":"Doe"}"#),
        )
        .await
        .unwrap();

    let body: Value = serde_json::from_slice(&payload.body).unwrap();
    assert_eq!(body, json!({"last_name": "Doe", "foo": "bar"}));
    assert_eq!(payload.request.headers.get("foo").unwrap(), "bar");
    assert_eq!(payload.request.query_param("foo").as_deref(), Some("baz"));

    let outcomes = executor.outcomes();
    assert_eq!(outcomes.len(), 1);
    let stage = &outcomes[0];
    assert_eq!(stage.stage, Stage::Entrypoint);
    assert_eq!(stage.groups.len(), 2);
    assert_eq!(stage.groups[0].invocation_results.len(), 2);
    for hook in &stage.groups[0].invocation_results {
        assert_eq!(hook.status, Status::Success);
        assert_eq!(hook.action, Action::Update);
    }
    let first_group = &stage.groups[0].invocation_results;
    assert_eq!(first_group[0].hook_id, HookId::new("acme.foobar", "add-header"));
    assert_eq!(first_group[1].hook_id, HookId::new("acme.foobar", "add-query"));
    let rewrite = &stage.groups[1].invocation_results;
    assert_eq!(rewrite.len(), 1);
    assert_eq!(rewrite[0].debug_messages, vec![
        "Hook mutation successfully applied, affected key: body.name, mutation type: delete"
            .to_string(),
        "Hook mutation successfully applied, affected key: body.foo, mutation type: add"
            .to_string(),
    ]);
}

/// Tests a failed mutation is skipped while later mutations still apply.
#[tokio::test(start_paused = true)]
async fn failed_mutation_is_skipped() {
    let partial = scripted("acme.partial", "mixed", 0, |_, _| {
        let mut change_set = ChangeSet::new();
        change_set
            .add_mutation(
                |_payload: RawAuctionRequestPayload| Err(MutationError::new("bad key")),
                MutationType::Update,
                ["body", "missing"],
            )
            .add_mutation(
                |mut payload: RawAuctionRequestPayload| {
                    payload.body = Bytes::from_static(b"patched");
                    Ok(payload)
                },
                MutationType::Update,
                ["body"],
            );
        Ok(HookResult::with_change_set(change_set))
    });
    let broken = scripted("acme.broken", "only-bad", 0, |_, _| {
        let mut change_set = ChangeSet::new();
        change_set.add_mutation(
            |_payload: RawAuctionRequestPayload| Err(MutationError::new("nothing to update")),
            MutationType::Update,
            ["body"],
        );
        Ok(HookResult::with_change_set(change_set))
    });
    let builder = FixedPlanBuilder {
        raw_auction: plan(vec![(10, vec![partial, broken])]),
        ..FixedPlanBuilder::default()
    };
    let executor = HookExecutor::new(Arc::new(builder), Endpoint::auction());

    let payload =
        executor.execute_raw_auction_stage(Bytes::from_static(b"original")).await.unwrap();
    assert_eq!(payload.body, Bytes::from_static(b"patched"));

    let outcomes = executor.outcomes();
    let hooks = &outcomes[0].groups[0].invocation_results;
    assert_eq!(hooks[0].status, Status::Success);
    assert_eq!(hooks[0].action, Action::Update);
    assert_eq!(hooks[0].warnings, vec!["failed to apply hook mutation: bad key".to_string()]);
    assert_eq!(hooks[1].status, Status::ExecutionFailure);
    assert_eq!(hooks[1].action, Action::NoAction);
}

/// Tests a panicking mutation becomes a warning and the payload survives.
#[tokio::test(start_paused = true)]
async fn panicking_mutation_is_skipped() {
    let exploding = scripted("acme.explodes", "mixed", 0, |_, _| {
        let mut change_set = ChangeSet::new();
        change_set
            .add_mutation(
                |_payload: RawAuctionRequestPayload| -> Result<_, MutationError> {
                    panic!("mutation boom")
                },
                MutationType::Update,
                ["body"],
            )
            .add_mutation(
                |mut payload: RawAuctionRequestPayload| {
                    payload.body = Bytes::from_static(b"patched");
                    Ok(payload)
                },
                MutationType::Update,
                ["body"],
            );
        Ok(HookResult::with_change_set(change_set))
    });
    let builder = FixedPlanBuilder {
        raw_auction: plan(vec![(10, vec![exploding])]),
        ..FixedPlanBuilder::default()
    };
    let executor = Arc::new(HookExecutor::new(Arc::new(builder), Endpoint::auction()));

    let task_executor = Arc::clone(&executor);
    let payload = tokio::spawn(async move {
        task_executor.execute_raw_auction_stage(Bytes::from_static(b"original")).await
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(payload.body, Bytes::from_static(b"patched"));

    let outcomes = executor.outcomes();
    let hook = &outcomes[0].groups[0].invocation_results[0];
    assert_eq!(hook.status, Status::Success);
    assert_eq!(hook.action, Action::Update);
    assert_eq!(hook.warnings, vec!["failed to apply hook mutation: mutation boom".to_string()]);
}

/// Tests every hook of a group sees the payload left by the previous group.
#[tokio::test(start_paused = true)]
async fn group_hooks_share_pre_group_payload() {
    let seen: Arc<Mutex<Vec<(String, Bytes)>>> = Arc::default();
    let recording = |module_code: &'static str, body: &'static str| {
        let seen = Arc::clone(&seen);
        scripted(module_code, "record", 0, move |_, payload: RawAuctionRequestPayload| {
            seen.lock().unwrap().push((module_code.to_string(), payload.body));
            let mut change_set = ChangeSet::new();
            change_set.add_mutation(
                move |mut payload: RawAuctionRequestPayload| {
                    payload.body = Bytes::from_static(body.as_bytes());
                    Ok(payload)
                },
                MutationType::Update,
                ["body"],
            );
            Ok(HookResult::with_change_set(change_set))
        })
    };
    let builder = FixedPlanBuilder {
        raw_auction: plan(vec![
            (10, vec![body_hook("acme.first", "group-one", 0)]),
            (10, vec![recording("acme.left", "left"), recording("acme.right", "right")]),
        ]),
        ..FixedPlanBuilder::default()
    };
    let executor = HookExecutor::new(Arc::new(builder), Endpoint::auction());

    let payload = executor.execute_raw_auction_stage(Bytes::from_static(b"input")).await.unwrap();
    assert_eq!(payload.body, Bytes::from_static(b"right"));

    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, vec![
        ("acme.left".to_string(), Bytes::from_static(b"group-one")),
        ("acme.right".to_string(), Bytes::from_static(b"group-one")),
    ]);
}

// ============================================================================
// SECTION: Failures
// ============================================================================

/// Tests a slow hook times out while a fast sibling's mutation applies.
#[tokio::test(start_paused = true)]
async fn slow_hook_times_out_without_blocking_group() {
    let slow = body_hook("acme.slow", "late", 50);
    let fast = body_hook("acme.fast", "fast", 0);
    let builder = FixedPlanBuilder {
        raw_auction: plan(vec![(10, vec![slow, fast])]),
        ..FixedPlanBuilder::default()
    };
    let metrics = Arc::new(RecordingMetrics::default());
    let executor =
        HookExecutor::new(Arc::new(builder), Endpoint::auction()).with_metrics(metrics.clone());

    let payload =
        executor.execute_raw_auction_stage(Bytes::from_static(b"original")).await.unwrap();
    assert_eq!(payload.body, Bytes::from_static(b"fast"));

    let outcomes = executor.outcomes();
    let group = &outcomes[0].groups[0];
    assert_eq!(group.invocation_results[0].status, Status::Timeout);
    assert_eq!(group.invocation_results[0].errors, vec!["Hook execution timeout".to_string()]);
    assert_eq!(group.invocation_results[1].action, Action::Update);
    assert!(group.execution_time >= Duration::from_millis(10));
    assert!(group.execution_time < Duration::from_millis(50));
    assert_eq!(metrics.count("timeout", "acme_slow"), 1);
    assert_eq!(metrics.count("success_updated", "acme_fast"), 1);
}

/// Tests a group timeout beyond the deadline cap still runs its hooks.
#[tokio::test(start_paused = true)]
async fn unbounded_group_timeout_is_capped() {
    let builder = FixedPlanBuilder {
        raw_auction: Plan::new(vec![Group::new(Duration::MAX, vec![body_hook(
            "acme.ok", "ok", 5,
        )])]),
        ..FixedPlanBuilder::default()
    };
    let executor = HookExecutor::new(Arc::new(builder), Endpoint::auction());

    let payload =
        executor.execute_raw_auction_stage(Bytes::from_static(b"original")).await.unwrap();
    assert_eq!(payload.body, Bytes::from_static(b"ok"));
    let outcomes = executor.outcomes();
    assert_eq!(outcomes[0].groups[0].invocation_results[0].status, Status::Success);
}

/// Tests module failures and panics are recorded without aborting the group.
#[tokio::test(start_paused = true)]
async fn failures_and_panics_are_recorded() {
    let panicking = scripted("acme.panics", "boom", 0, |_, _: RawAuctionRequestPayload| {
        panic!("boom");
    });
    let builder = FixedPlanBuilder {
        raw_auction: plan(vec![(
            10,
            vec![failing_hook("acme.fails", "fail", 0), panicking, body_hook("acme.ok", "ok", 0)],
        )]),
        ..FixedPlanBuilder::default()
    };
    let sink = Arc::new(RecordingLogSink::default());
    let executor =
        HookExecutor::new(Arc::new(builder), Endpoint::auction()).with_log_sink(sink.clone());

    let payload =
        executor.execute_raw_auction_stage(Bytes::from_static(b"original")).await.unwrap();
    assert_eq!(payload.body, Bytes::from_static(b"ok"));

    let outcomes = executor.outcomes();
    let hooks = &outcomes[0].groups[0].invocation_results;
    assert_eq!(hooks[0].status, Status::Failure);
    assert_eq!(hooks[0].errors, vec!["hook execution failed: module is unavailable".to_string()]);
    assert_eq!(hooks[1].status, Status::ExecutionFailure);
    assert_eq!(hooks[1].errors, vec!["hook execution panicked: boom".to_string()]);
    assert_eq!(hooks[2].status, Status::Success);

    assert_eq!(sink.names(), vec![
        EVENT_STAGE_EXECUTED,
        EVENT_INVOCATION_FAILED,
        EVENT_INVOCATION_FAILED
    ]);
}

// ============================================================================
// SECTION: Rejection
// ============================================================================

/// Builds a three-group plan whose second group rejects.
fn rejecting_plan(
    third_group_calls: &Arc<AtomicUsize>,
) -> Plan<RawAuctionRequestPayload> {
    let calls = Arc::clone(third_group_calls);
    let counter = scripted("acme.counter", "count", 0, move |_, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(HookResult::new())
    });
    plan(vec![
        (10, vec![body_hook("acme.first", "group-one", 0)]),
        (10, vec![
            rejecting_hook("acme.reject", "deny", 0, 123),
            body_hook("acme.second", "group-two", 0),
        ]),
        (10, vec![counter]),
    ])
}

/// Tests the stage stops at the rejecting group and keeps earlier mutations.
#[tokio::test(start_paused = true)]
async fn reject_in_second_group_stops_stage() {
    let calls = Arc::new(AtomicUsize::new(0));
    let stage_plan = rejecting_plan(&calls);
    let ctx = stage_context(Stage::RawAuctionRequest);

    let execution = execute_stage(&ctx, &stage_plan, RawAuctionRequestPayload {
        body: Bytes::from_static(b"input"),
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(execution.payload.body, Bytes::from_static(b"group-one"));
    assert_eq!(execution.outcome.groups.len(), 2);
    let reject = execution.reject.unwrap();
    assert_eq!(reject.hook_id, HookId::new("acme.reject", "deny"));
    assert_eq!(reject.stage, Stage::RawAuctionRequest);
    assert_eq!(reject.nbr, 123);

    let rejecting = execution.outcome.groups[1]
        .invocation_results
        .iter()
        .find(|hook| hook.hook_id.module_code == "acme.reject")
        .unwrap();
    assert_eq!(rejecting.action, Action::Reject);
    assert_eq!(rejecting.errors, vec![
        "Module acme.reject (hook: deny) rejected request with code 123 at raw_auction_request \
         stage"
            .to_string()
    ]);
    let sibling = execution.outcome.groups[1]
        .invocation_results
        .iter()
        .find(|hook| hook.hook_id.module_code == "acme.second")
        .unwrap();
    assert_ne!(sibling.action, Action::Update);
}

/// Tests the facade returns the unmodified input with the rejection.
#[tokio::test(start_paused = true)]
async fn facade_returns_input_on_reject() {
    let calls = Arc::new(AtomicUsize::new(0));
    let builder = FixedPlanBuilder {
        raw_auction: rejecting_plan(&calls),
        ..FixedPlanBuilder::default()
    };
    let sink = Arc::new(RecordingLogSink::default());
    let executor =
        HookExecutor::new(Arc::new(builder), Endpoint::auction()).with_log_sink(sink.clone());

    let rejection =
        executor.execute_raw_auction_stage(Bytes::from_static(b"input")).await.unwrap_err();
    assert_eq!(rejection.payload.body, Bytes::from_static(b"input"));
    assert_eq!(rejection.error.hook_id, HookId::new("acme.reject", "deny"));
    assert_eq!(rejection.error.stage, Stage::RawAuctionRequest);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(executor.outcomes().len(), 1);
    assert!(sink.names().contains(&EVENT_STAGE_REJECTED));
}

/// Tests a slow sibling of a rejecting hook is reported as cancelled.
#[tokio::test(start_paused = true)]
async fn slow_sibling_of_rejecting_hook_is_cancelled() {
    let ctx = stage_context(Stage::RawAuctionRequest);
    let stage_plan = plan(vec![(100, vec![
        noop_hook("acme.slow", "slow", 50),
        rejecting_hook("acme.reject", "deny", 1, 7),
    ])]);

    let execution = execute_stage(&ctx, &stage_plan, RawAuctionRequestPayload {
        body: Bytes::new(),
    })
    .await;

    let hooks = &execution.outcome.groups[0].invocation_results;
    assert_eq!(hooks[0].hook_id.module_code, "acme.slow");
    assert_eq!(hooks[0].status, Status::Cancelled);
    assert_eq!(hooks[1].action, Action::Reject);
    assert!(execution.outcome.execution_time < Duration::from_millis(50));
}

/// Tests a rejection on a non-rejectable stage is an execution failure.
#[tokio::test(start_paused = true)]
async fn reject_on_auction_response_is_execution_failure() {
    let mark =
        updating_hook("acme.mark", "mark", 0, "response.id", |mut payload: AuctionResponsePayload| {
            payload.response.id = "marked".to_string();
            Ok(payload)
        });
    let builder = FixedPlanBuilder {
        auction_response: plan(vec![(10, vec![rejecting_hook("acme.reject", "deny", 0, 2), mark])]),
        ..FixedPlanBuilder::default()
    };
    let executor = HookExecutor::new(Arc::new(builder), Endpoint::auction());

    let payload = executor.execute_auction_response_stage(BidResponse::default()).await;
    assert_eq!(payload.response.id, "marked");

    let outcomes = executor.outcomes();
    let rejecting = &outcomes[0].groups[0].invocation_results[0];
    assert_eq!(rejecting.status, Status::ExecutionFailure);
    assert_eq!(rejecting.action, Action::NoAction);
    assert_eq!(rejecting.errors, vec![
        "Module (name: acme.reject, hook code: deny) tried to reject request on the \
         auction_response stage that does not support rejection"
            .to_string()
    ]);
}
