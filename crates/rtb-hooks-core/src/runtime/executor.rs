// crates/rtb-hooks-core/src/runtime/executor.rs
// ============================================================================
// Module: RTB Hooks Executor Facade
// Description: Request-scoped entry point with one method per stage.
// Purpose: Wire plan building, stage execution, and outcome recording.
// Dependencies: bytes, crate::runtime
// ============================================================================

//! ## Overview
//! One [`HookExecutor`] serves one request. Each `execute_*_stage` method
//! asks the plan builder for the stage plan, runs it, records the outcome,
//! and either returns the resulting payload or a [`Rejection`] carrying the
//! unmodified input.
//! Invariants:
//! - An empty plan is a passthrough and records no outcome.
//! - Methods take `&self` and may run concurrently (for example per bidder).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::RwLock;

use bytes::Bytes;

use crate::audit::ExecutionLogSink;
use crate::audit::HookLogEvent;
use crate::audit::HookLogEventParams;
use crate::audit::NoopLogSink;
use crate::core::AllProcessedBidResponsesPayload;
use crate::core::AuctionResponsePayload;
use crate::core::BidderRequestPayload;
use crate::core::EntrypointPayload;
use crate::core::HttpRequest;
use crate::core::ModuleContext;
use crate::core::ProcessedAuctionRequestPayload;
use crate::core::RawAuctionRequestPayload;
use crate::core::RawBidderResponsePayload;
use crate::core::Rejection;
use crate::core::StageOutcome;
use crate::core::StagePayload;
use crate::core::Status;
use crate::core::identifiers::Endpoint;
use crate::core::identifiers::Entity;
use crate::core::ortb::BidRequest;
use crate::core::ortb::BidResponse;
use crate::core::ortb::TypedBid;
use crate::core::stage::Stage;
use crate::interfaces::ActivityControl;
use crate::interfaces::PlanBuilder;
use crate::plan::Account;
use crate::plan::Plan;
use crate::runtime::abtest::AbTestDecisions;
use crate::runtime::abtest::AbTestGate;
use crate::runtime::context::ModuleContextStore;
use crate::runtime::context::StageContext;
use crate::runtime::stage::StageExecution;
use crate::runtime::stage::execute_stage;
use crate::telemetry::HookMetrics;
use crate::telemetry::NoopMetrics;

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Request-scoped hook executor.
pub struct HookExecutor {
    /// Stage plan source.
    plan_builder: Arc<dyn PlanBuilder>,
    /// Endpoint the request arrived on.
    endpoint: Endpoint,
    /// Metrics sink.
    metrics: Arc<dyn HookMetrics>,
    /// Execution log sink.
    log_sink: Arc<dyn ExecutionLogSink>,
    /// Privacy activity policy.
    activity_control: Option<Arc<dyn ActivityControl>>,
    /// Request-scoped AB-test decisions.
    ab_tests: Option<Arc<AbTestDecisions>>,
    /// Account, once resolved.
    account: RwLock<Option<Arc<Account>>>,
    /// Request-scoped module contexts.
    module_contexts: Arc<ModuleContextStore>,
    /// Recorded stage outcomes in completion order.
    outcomes: Mutex<Vec<StageOutcome>>,
}

impl HookExecutor {
    /// Creates an executor with no-op metrics and logging.
    #[must_use]
    pub fn new(plan_builder: Arc<dyn PlanBuilder>, endpoint: Endpoint) -> Self {
        Self {
            plan_builder,
            endpoint,
            metrics: Arc::new(NoopMetrics),
            log_sink: Arc::new(NoopLogSink),
            activity_control: None,
            ab_tests: None,
            account: RwLock::new(None),
            module_contexts: Arc::new(ModuleContextStore::new()),
            outcomes: Mutex::new(Vec::new()),
        }
    }

    /// Sets the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn HookMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Sets the execution log sink.
    #[must_use]
    pub fn with_log_sink(mut self, log_sink: Arc<dyn ExecutionLogSink>) -> Self {
        self.log_sink = log_sink;
        self
    }

    /// Sets the privacy activity policy.
    #[must_use]
    pub fn with_activity_control(mut self, activity_control: Arc<dyn ActivityControl>) -> Self {
        self.activity_control = Some(activity_control);
        self
    }

    /// Enables AB-test gating for this request.
    #[must_use]
    pub fn with_ab_tests(mut self, gate: Arc<AbTestGate>) -> Self {
        self.ab_tests = (!gate.is_empty()).then(|| Arc::new(AbTestDecisions::new(gate)));
        self
    }

    /// Returns the endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Sets the account once it has been resolved from the request.
    pub fn set_account(&self, account: Account) {
        let mut slot = self.account.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(account));
    }

    /// Returns the account, if set.
    #[must_use]
    pub fn account(&self) -> Option<Arc<Account>> {
        self.account.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the recorded stage outcomes.
    #[must_use]
    pub fn outcomes(&self) -> Vec<StageOutcome> {
        self.outcomes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns a snapshot of every module's context.
    #[must_use]
    pub fn module_contexts(&self) -> BTreeMap<String, ModuleContext> {
        self.module_contexts.snapshot()
    }

    // ------------------------------------------------------------------------
    // Stage methods
    // ------------------------------------------------------------------------

    /// Executes the entrypoint stage.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection`] when a hook rejects the request.
    pub async fn execute_entrypoint_stage(
        &self,
        request: HttpRequest,
        body: Bytes,
    ) -> Result<EntrypointPayload, Rejection<EntrypointPayload>> {
        let plan = self.plan_builder.plan_for_entrypoint_stage(&self.endpoint);
        let payload = EntrypointPayload {
            request,
            body,
        };
        self.execute(Stage::Entrypoint, Entity::new(Entity::HTTP_REQUEST), &plan, payload).await
    }

    /// Executes the raw auction request stage.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection`] when a hook rejects the request.
    pub async fn execute_raw_auction_stage(
        &self,
        body: Bytes,
    ) -> Result<RawAuctionRequestPayload, Rejection<RawAuctionRequestPayload>> {
        let account = self.account();
        let plan = self.plan_builder.plan_for_raw_auction_stage(&self.endpoint, account.as_deref());
        let payload = RawAuctionRequestPayload {
            body,
        };
        self.execute(Stage::RawAuctionRequest, Entity::new(Entity::AUCTION_REQUEST), &plan, payload)
            .await
    }

    /// Executes the processed auction request stage.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection`] when a hook rejects the request.
    pub async fn execute_processed_auction_stage(
        &self,
        request: BidRequest,
    ) -> Result<ProcessedAuctionRequestPayload, Rejection<ProcessedAuctionRequestPayload>> {
        let account = self.account();
        let plan =
            self.plan_builder.plan_for_processed_auction_stage(&self.endpoint, account.as_deref());
        let payload = ProcessedAuctionRequestPayload {
            request,
        };
        self.execute(
            Stage::ProcessedAuctionRequest,
            Entity::new(Entity::AUCTION_REQUEST),
            &plan,
            payload,
        )
        .await
    }

    /// Executes the bidder request stage for one bidder.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection`] when a hook rejects the bidder request.
    pub async fn execute_bidder_request_stage(
        &self,
        bidder: &str,
        request: BidRequest,
    ) -> Result<BidderRequestPayload, Rejection<BidderRequestPayload>> {
        let account = self.account();
        let plan =
            self.plan_builder.plan_for_bidder_request_stage(&self.endpoint, account.as_deref());
        let payload = BidderRequestPayload {
            bidder: bidder.to_string(),
            request,
        };
        self.execute(Stage::BidderRequest, Entity::bidder(bidder), &plan, payload).await
    }

    /// Executes the raw bidder response stage for one bidder.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection`] when a hook rejects the bidder response.
    pub async fn execute_raw_bidder_response_stage(
        &self,
        bidder: &str,
        bids: Vec<TypedBid>,
    ) -> Result<RawBidderResponsePayload, Rejection<RawBidderResponsePayload>> {
        let account = self.account();
        let plan = self
            .plan_builder
            .plan_for_raw_bidder_response_stage(&self.endpoint, account.as_deref());
        let payload = RawBidderResponsePayload {
            bidder: bidder.to_string(),
            bids,
        };
        self.execute(Stage::RawBidderResponse, Entity::bidder(bidder), &plan, payload).await
    }

    /// Executes the all-processed-bid-responses stage. This stage cannot reject.
    pub async fn execute_all_processed_bid_responses_stage(
        &self,
        responses: BTreeMap<String, Vec<TypedBid>>,
    ) -> AllProcessedBidResponsesPayload {
        let account = self.account();
        let plan = self
            .plan_builder
            .plan_for_all_processed_bid_responses_stage(&self.endpoint, account.as_deref());
        let payload = AllProcessedBidResponsesPayload {
            responses,
        };
        self.execute(
            Stage::AllProcessedBidResponses,
            Entity::new(Entity::ALL_PROCESSED_BID_RESPONSES),
            &plan,
            payload,
        )
        .await
        .unwrap_or_else(|rejection| rejection.payload)
    }

    /// Executes the auction response stage. This stage cannot reject.
    pub async fn execute_auction_response_stage(
        &self,
        response: BidResponse,
    ) -> AuctionResponsePayload {
        let account = self.account();
        let plan =
            self.plan_builder.plan_for_auction_response_stage(&self.endpoint, account.as_deref());
        let payload = AuctionResponsePayload {
            response,
        };
        self.execute(Stage::AuctionResponse, Entity::new(Entity::AUCTION_RESPONSE), &plan, payload)
            .await
            .unwrap_or_else(|rejection| rejection.payload)
    }

    // ------------------------------------------------------------------------
    // Shared execution
    // ------------------------------------------------------------------------

    /// Runs a stage plan and records its outcome.
    async fn execute<P: StagePayload>(
        &self,
        stage: Stage,
        entity: Entity,
        plan: &Plan<P>,
        payload: P,
    ) -> Result<P, Rejection<P>> {
        if plan.is_empty() {
            return Ok(payload);
        }
        let ctx = self.stage_context(stage, entity);
        let input = payload.clone();
        let execution = execute_stage(&ctx, plan, payload).await;
        self.log_stage(&ctx, &execution);
        let StageExecution {
            outcome,
            payload,
            reject,
        } = execution;
        self.outcomes.lock().unwrap_or_else(PoisonError::into_inner).push(outcome);
        match reject {
            Some(error) => Err(Rejection {
                payload: input,
                error,
            }),
            None => Ok(payload),
        }
    }

    /// Builds the stage context for one stage execution.
    fn stage_context(&self, stage: Stage, entity: Entity) -> StageContext {
        StageContext {
            endpoint: self.endpoint.clone(),
            stage,
            entity,
            account: self.account(),
            module_contexts: Arc::clone(&self.module_contexts),
            activity_control: self.activity_control.clone(),
            ab_tests: self.ab_tests.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Emits execution log events for a finished stage.
    fn log_stage<P>(&self, ctx: &StageContext, execution: &StageExecution<P>) {
        let params = HookLogEventParams {
            endpoint: ctx.endpoint.clone(),
            stage: ctx.stage,
            entity: ctx.entity.clone(),
            account_id: ctx.account_id(),
        };
        self.log_sink.record(&HookLogEvent::stage_executed(&params, &execution.outcome));
        for hook in execution.outcome.hook_outcomes() {
            if hook.status != Status::Success {
                self.log_sink.record(&HookLogEvent::invocation_failed(&params, hook));
            }
        }
        if let Some(reject) = &execution.reject {
            self.log_sink.record(&HookLogEvent::stage_rejected(&params, reject));
        }
    }
}
