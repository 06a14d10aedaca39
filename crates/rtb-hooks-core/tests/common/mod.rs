// crates/rtb-hooks-core/tests/common/mod.rs
// ============================================================================
// Module: RTB Hooks Test Helpers
// Description: Scripted hooks, fixed plan builders, and recording sinks.
// Purpose: Share deterministic fixtures across integration tests.
// ============================================================================

//! ## Overview
//! Hooks are scripted with closures and an optional delay so tests can
//! control completion order under a paused tokio clock.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only helpers may panic on poisoned fixtures."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rtb_hooks_core::Account;
use rtb_hooks_core::AllProcessedBidResponsesPayload;
use rtb_hooks_core::AuctionResponsePayload;
use rtb_hooks_core::BidderRequestPayload;
use rtb_hooks_core::ChangeSet;
use rtb_hooks_core::Endpoint;
use rtb_hooks_core::Entity;
use rtb_hooks_core::EntrypointPayload;
use rtb_hooks_core::ExecutionLogSink;
use rtb_hooks_core::Group;
use rtb_hooks_core::HookError;
use rtb_hooks_core::HookLogEvent;
use rtb_hooks_core::HookMetrics;
use rtb_hooks_core::HookResult;
use rtb_hooks_core::HookWrapper;
use rtb_hooks_core::ModuleContextStore;
use rtb_hooks_core::ModuleInvocationContext;
use rtb_hooks_core::ModuleLabels;
use rtb_hooks_core::MutationError;
use rtb_hooks_core::MutationType;
use rtb_hooks_core::NoopMetrics;
use rtb_hooks_core::Plan;
use rtb_hooks_core::PlanBuilder;
use rtb_hooks_core::ProcessedAuctionRequestPayload;
use rtb_hooks_core::RawAuctionRequestPayload;
use rtb_hooks_core::RawBidderResponsePayload;
use rtb_hooks_core::Stage;
use rtb_hooks_core::StageHook;
use rtb_hooks_core::StagePayload;
use rtb_hooks_core::runtime::StageContext;

// ============================================================================
// SECTION: Scripted Hooks
// ============================================================================

/// Closure producing a hook result from the invocation inputs.
pub type Script<P> =
    Arc<dyn Fn(ModuleInvocationContext, P) -> Result<HookResult<P>, HookError> + Send + Sync>;

/// Hook that sleeps for `delay` and then runs its script.
pub struct ScriptedHook<P> {
    /// Simulated processing time.
    delay: Duration,
    /// Result producer.
    script: Script<P>,
}

#[async_trait]
impl<P: StagePayload> StageHook<P> for ScriptedHook<P> {
    async fn call(
        &self,
        ctx: ModuleInvocationContext,
        payload: P,
    ) -> Result<HookResult<P>, HookError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.script)(ctx, payload)
    }
}

/// Builds a wrapped hook from a delay and a script.
pub fn scripted<P, F>(
    module_code: &str,
    hook_impl_code: &str,
    delay_ms: u64,
    script: F,
) -> HookWrapper<P>
where
    P: StagePayload,
    F: Fn(ModuleInvocationContext, P) -> Result<HookResult<P>, HookError> + Send + Sync + 'static,
{
    let hook = ScriptedHook {
        delay: Duration::from_millis(delay_ms),
        script: Arc::new(script),
    };
    HookWrapper::new(module_code, hook_impl_code, Arc::new(hook))
}

/// Hook that succeeds without changes after `delay_ms`.
pub fn noop_hook<P: StagePayload>(
    module_code: &str,
    hook_impl_code: &str,
    delay_ms: u64,
) -> HookWrapper<P> {
    scripted(module_code, hook_impl_code, delay_ms, |_, _| Ok(HookResult::new()))
}

/// Hook that rejects with `nbr` after `delay_ms`.
pub fn rejecting_hook<P: StagePayload>(
    module_code: &str,
    hook_impl_code: &str,
    delay_ms: u64,
    nbr: i32,
) -> HookWrapper<P> {
    scripted(module_code, hook_impl_code, delay_ms, move |_, _| Ok(HookResult::rejected(nbr)))
}

/// Hook that fails with a module-declared error after `delay_ms`.
pub fn failing_hook<P: StagePayload>(
    module_code: &str,
    hook_impl_code: &str,
    delay_ms: u64,
) -> HookWrapper<P> {
    scripted(module_code, hook_impl_code, delay_ms, |_, _| {
        Err(HookError::Failure("module is unavailable".to_string()))
    })
}

/// Hook that applies one update mutation after `delay_ms`.
pub fn updating_hook<P, F>(
    module_code: &str,
    hook_impl_code: &str,
    delay_ms: u64,
    key: &'static str,
    apply: F,
) -> HookWrapper<P>
where
    P: StagePayload,
    F: Fn(P) -> Result<P, MutationError> + Clone + Send + Sync + 'static,
{
    scripted(module_code, hook_impl_code, delay_ms, move |_, _| {
        let mut change_set = ChangeSet::new();
        change_set.add_mutation(apply.clone(), MutationType::Update, [key]);
        Ok(HookResult::with_change_set(change_set))
    })
}

/// Builds a plan from `(timeout_ms, hooks)` pairs.
pub fn plan<P: StagePayload>(groups: Vec<(u64, Vec<HookWrapper<P>>)>) -> Plan<P> {
    Plan::new(
        groups
            .into_iter()
            .map(|(timeout_ms, hooks)| Group::new(Duration::from_millis(timeout_ms), hooks))
            .collect(),
    )
}

/// Builds a stage context with no account and no-op metrics.
pub fn stage_context(stage: Stage) -> StageContext {
    StageContext {
        endpoint: Endpoint::auction(),
        stage,
        entity: Entity::new(Entity::AUCTION_REQUEST),
        account: None,
        module_contexts: Arc::new(ModuleContextStore::new()),
        activity_control: None,
        ab_tests: None,
        metrics: Arc::new(NoopMetrics),
    }
}

// ============================================================================
// SECTION: Plan Builder
// ============================================================================

/// Plan builder returning the same plans for every endpoint and account.
#[derive(Default)]
pub struct FixedPlanBuilder {
    /// Entrypoint plan.
    pub entrypoint: Plan<EntrypointPayload>,
    /// Raw auction request plan.
    pub raw_auction: Plan<RawAuctionRequestPayload>,
    /// Processed auction request plan.
    pub processed_auction: Plan<ProcessedAuctionRequestPayload>,
    /// Bidder request plan.
    pub bidder_request: Plan<BidderRequestPayload>,
    /// Raw bidder response plan.
    pub raw_bidder_response: Plan<RawBidderResponsePayload>,
    /// All-processed-bid-responses plan.
    pub all_processed_bid_responses: Plan<AllProcessedBidResponsesPayload>,
    /// Auction response plan.
    pub auction_response: Plan<AuctionResponsePayload>,
}

impl PlanBuilder for FixedPlanBuilder {
    fn plan_for_entrypoint_stage(&self, _endpoint: &Endpoint) -> Plan<EntrypointPayload> {
        self.entrypoint.clone()
    }

    fn plan_for_raw_auction_stage(
        &self,
        _endpoint: &Endpoint,
        _account: Option<&Account>,
    ) -> Plan<RawAuctionRequestPayload> {
        self.raw_auction.clone()
    }

    fn plan_for_processed_auction_stage(
        &self,
        _endpoint: &Endpoint,
        _account: Option<&Account>,
    ) -> Plan<ProcessedAuctionRequestPayload> {
        self.processed_auction.clone()
    }

    fn plan_for_bidder_request_stage(
        &self,
        _endpoint: &Endpoint,
        _account: Option<&Account>,
    ) -> Plan<BidderRequestPayload> {
        self.bidder_request.clone()
    }

    fn plan_for_raw_bidder_response_stage(
        &self,
        _endpoint: &Endpoint,
        _account: Option<&Account>,
    ) -> Plan<RawBidderResponsePayload> {
        self.raw_bidder_response.clone()
    }

    fn plan_for_all_processed_bid_responses_stage(
        &self,
        _endpoint: &Endpoint,
        _account: Option<&Account>,
    ) -> Plan<AllProcessedBidResponsesPayload> {
        self.all_processed_bid_responses.clone()
    }

    fn plan_for_auction_response_stage(
        &self,
        _endpoint: &Endpoint,
        _account: Option<&Account>,
    ) -> Plan<AuctionResponsePayload> {
        self.auction_response.clone()
    }
}

// ============================================================================
// SECTION: Recording Sinks
// ============================================================================

/// Metrics sink recording `(metric, module label)` pairs.
#[derive(Default)]
pub struct RecordingMetrics {
    /// Recorded metrics in call order.
    pub records: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingMetrics {
    /// Returns how often `metric` was recorded for `module`.
    pub fn count(&self, metric: &str, module: &str) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, label)| *name == metric && label == module)
            .count()
    }

    /// Records one metric.
    fn push(&self, metric: &'static str, labels: &ModuleLabels) {
        self.records.lock().unwrap().push((metric, labels.module.clone()));
    }
}

impl HookMetrics for RecordingMetrics {
    fn record_module_called(&self, labels: &ModuleLabels) {
        self.push("called", labels);
    }

    fn record_module_success_nooped(&self, labels: &ModuleLabels) {
        self.push("success_nooped", labels);
    }

    fn record_module_success_updated(&self, labels: &ModuleLabels) {
        self.push("success_updated", labels);
    }

    fn record_module_success_rejected(&self, labels: &ModuleLabels) {
        self.push("success_rejected", labels);
    }

    fn record_module_failed(&self, labels: &ModuleLabels) {
        self.push("failed", labels);
    }

    fn record_module_timeout(&self, labels: &ModuleLabels) {
        self.push("timeout", labels);
    }

    fn record_module_execution_error(&self, labels: &ModuleLabels) {
        self.push("execution_error", labels);
    }
}

/// Log sink keeping every event in memory.
#[derive(Default)]
pub struct RecordingLogSink {
    /// Recorded events in emission order.
    pub events: Mutex<Vec<HookLogEvent>>,
}

impl RecordingLogSink {
    /// Returns the names of recorded events.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|event| event.event).collect()
    }
}

impl ExecutionLogSink for RecordingLogSink {
    fn record(&self, event: &HookLogEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
