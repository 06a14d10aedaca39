// crates/rtb-hooks-core/tests/ab_tests.rs
// ============================================================================
// Module: AB Test Gate Tests
// Description: Tests for per-module rollout gating of hook invocations.
// Purpose: Validate skip and run decisions, tagging, and decision caching.
// ============================================================================

//! AB-test gating tests driven by a deterministic roller.

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
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use bytes::Bytes;
use common::FixedPlanBuilder;
use common::plan;
use common::scripted;
use rtb_hooks_core::AbDecision;
use rtb_hooks_core::AbTestConfig;
use rtb_hooks_core::AbTestGate;
use rtb_hooks_core::Account;
use rtb_hooks_core::AccountId;
use rtb_hooks_core::Action;
use rtb_hooks_core::Endpoint;
use rtb_hooks_core::HookExecutor;
use rtb_hooks_core::HookOutcome;
use rtb_hooks_core::HookResult;
use rtb_hooks_core::HookWrapper;
use rtb_hooks_core::RawAuctionRequestPayload;
use rtb_hooks_core::Status;
use rtb_hooks_core::runtime::abtest::AB_TEST_ACTIVITY;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Enabled test for `acme.m1` at the provided rollout.
fn test_config(percent_active: u8) -> AbTestConfig {
    AbTestConfig {
        module_code: "acme.m1".to_string(),
        enabled: true,
        percent_active,
        accounts: Vec::new(),
        log_analytics_tag: true,
    }
}

/// Gate rolling a fixed value and counting rolls.
fn fixed_gate(tests: Vec<AbTestConfig>, roll: u8, rolls: &Arc<AtomicUsize>) -> AbTestGate {
    let rolls = Arc::clone(rolls);
    AbTestGate::new(tests).with_roller(Arc::new(move || {
        rolls.fetch_add(1, Ordering::SeqCst);
        roll
    }))
}

/// Hook counting its invocations.
fn counting_hook(calls: &Arc<AtomicUsize>) -> HookWrapper<RawAuctionRequestPayload> {
    let calls = Arc::clone(calls);
    scripted("acme.m1", "count", 0, move |_, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(HookResult::new())
    })
}

/// Returns the AB-test result status recorded on an outcome.
fn ab_status(outcome: &HookOutcome) -> Option<String> {
    outcome
        .analytics_tags
        .activities
        .iter()
        .find(|activity| activity.name == AB_TEST_ACTIVITY)
        .and_then(|activity| activity.results.first())
        .map(|result| result.status.clone())
}

/// Runs the raw auction stage twice with the provided gate.
async fn run_twice(gate: AbTestGate, calls: &Arc<AtomicUsize>) -> Vec<HookOutcome> {
    let builder = FixedPlanBuilder {
        raw_auction: plan(vec![(10, vec![counting_hook(calls)]), (10, vec![counting_hook(calls)])]),
        ..FixedPlanBuilder::default()
    };
    let executor =
        HookExecutor::new(Arc::new(builder), Endpoint::auction()).with_ab_tests(Arc::new(gate));
    executor.execute_raw_auction_stage(Bytes::new()).await.unwrap();
    executor.outcomes().iter().flat_map(|stage| stage.hook_outcomes().cloned()).collect()
}

// ============================================================================
// SECTION: Gate Decisions
// ============================================================================

/// Tests rolls below the rollout percentage run the module.
#[test]
fn gate_runs_below_percent() {
    let rolls = Arc::new(AtomicUsize::new(0));
    let gate = fixed_gate(vec![test_config(50)], 42, &rolls);
    assert_eq!(gate.decide("acme.m1", None), AbDecision::Run {
        log_analytics_tag: true
    });
    let gate = fixed_gate(vec![test_config(40)], 42, &rolls);
    assert_eq!(gate.decide("acme.m1", None), AbDecision::Skip {
        log_analytics_tag: true
    });
    assert_eq!(gate.decide("acme.other", None), AbDecision::NotApplicable);
}

/// Tests account-restricted and disabled tests do not apply.
#[test]
fn gate_ignores_disabled_and_foreign_accounts() {
    let rolls = Arc::new(AtomicUsize::new(0));
    let mut restricted = test_config(0);
    restricted.accounts = vec![AccountId::new("acct-1")];
    let gate = fixed_gate(vec![restricted], 99, &rolls);
    assert_eq!(gate.decide("acme.m1", None), AbDecision::NotApplicable);
    assert_eq!(gate.decide("acme.m1", Some(&AccountId::new("acct-2"))), AbDecision::NotApplicable);
    assert_eq!(gate.decide("acme.m1", Some(&AccountId::new("acct-1"))), AbDecision::Skip {
        log_analytics_tag: true
    });

    let mut disabled = test_config(0);
    disabled.enabled = false;
    let gate = fixed_gate(vec![disabled], 99, &rolls);
    assert_eq!(gate.decide("acme.m1", None), AbDecision::NotApplicable);
}

/// Tests configuration defaults when optional fields are omitted.
#[test]
fn config_defaults_apply() {
    let config: AbTestConfig =
        serde_json::from_value(json!({"module_code": "acme.m1", "enabled": true})).unwrap();
    assert_eq!(config.percent_active, 100);
    assert!(config.log_analytics_tag);
    assert!(config.accounts.is_empty());
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Tests a skipped module is never invoked and is tagged as skipped.
#[tokio::test(start_paused = true)]
async fn skipped_module_is_not_invoked() {
    let calls = Arc::new(AtomicUsize::new(0));
    let rolls = Arc::new(AtomicUsize::new(0));
    let outcomes = run_twice(fixed_gate(vec![test_config(0)], 0, &rolls), &calls).await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(rolls.load(Ordering::SeqCst), 1);
    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        assert_eq!(outcome.status, Status::Success);
        assert_eq!(outcome.action, Action::NoInvocation);
        assert_eq!(ab_status(outcome).as_deref(), Some("skipped"));
    }
}

/// Tests a running module is invoked, tagged, and rolled once per request.
#[tokio::test(start_paused = true)]
async fn running_module_is_tagged_once_per_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let rolls = Arc::new(AtomicUsize::new(0));
    let outcomes = run_twice(fixed_gate(vec![test_config(100)], 99, &rolls), &calls).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(rolls.load(Ordering::SeqCst), 1);
    for outcome in &outcomes {
        assert_eq!(outcome.action, Action::NoAction);
        assert_eq!(ab_status(outcome).as_deref(), Some("run"));
    }
}

/// Tests analytics tags are omitted when logging is disabled.
#[tokio::test(start_paused = true)]
async fn untagged_decision_records_no_activity() {
    let calls = Arc::new(AtomicUsize::new(0));
    let rolls = Arc::new(AtomicUsize::new(0));
    let mut config = test_config(0);
    config.log_analytics_tag = false;
    let outcomes = run_twice(fixed_gate(vec![config], 0, &rolls), &calls).await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(outcomes.iter().all(|outcome| outcome.analytics_tags.is_empty()));
}

/// Tests an account-restricted test is evaluated once the account is known.
#[tokio::test(start_paused = true)]
async fn restricted_test_waits_for_account() {
    let calls = Arc::new(AtomicUsize::new(0));
    let rolls = Arc::new(AtomicUsize::new(0));
    let mut config = test_config(0);
    config.accounts = vec![AccountId::new("acct-1")];
    let builder = FixedPlanBuilder {
        raw_auction: plan(vec![(10, vec![counting_hook(&calls)])]),
        ..FixedPlanBuilder::default()
    };
    let executor = HookExecutor::new(Arc::new(builder), Endpoint::auction())
        .with_ab_tests(Arc::new(fixed_gate(vec![config], 0, &rolls)));

    executor.execute_raw_auction_stage(Bytes::new()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    executor.set_account(Account::new("acct-1"));
    executor.execute_raw_auction_stage(Bytes::new()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(rolls.load(Ordering::SeqCst), 1);
}
