// crates/rtb-hooks-core/src/interfaces/mod.rs
// ============================================================================
// Module: RTB Hooks Interfaces
// Description: Module-facing hook traits and host-facing collaborator traits.
// Purpose: Define the contract surfaces used by the hook execution runtime.
// Dependencies: async-trait, crate::core, crate::plan
// ============================================================================

//! ## Overview
//! Modules implement one capability trait per stage they participate in.
//! The runtime executes the single generic [`StageHook`] trait; blanket
//! implementations bridge every stage trait onto it so the executors are
//! written once over the payload type.
//!
//! Hosts supply a [`PlanBuilder`] and, optionally, an [`ActivityControl`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;

use crate::core::AllProcessedBidResponsesPayload;
use crate::core::AuctionResponsePayload;
use crate::core::BidderRequestPayload;
use crate::core::EntrypointPayload;
use crate::core::HookError;
use crate::core::HookResult;
use crate::core::ModuleInvocationContext;
use crate::core::ProcessedAuctionRequestPayload;
use crate::core::RawAuctionRequestPayload;
use crate::core::RawBidderResponsePayload;
use crate::core::StagePayload;
use crate::core::identifiers::Endpoint;
use crate::plan::Account;
use crate::plan::Plan;

// ============================================================================
// SECTION: Generic Stage Hook
// ============================================================================

/// Hook executable by the runtime for payload type `P`.
///
/// Implemented automatically for every type implementing the stage trait
/// matching `P`.
#[async_trait]
pub trait StageHook<P: StagePayload>: Send + Sync {
    /// Invokes the hook with its own payload copy.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] when the module fails.
    async fn call(
        &self,
        ctx: ModuleInvocationContext,
        payload: P,
    ) -> Result<HookResult<P>, HookError>;
}

// ============================================================================
// SECTION: Stage Hook Traits
// ============================================================================

/// Hook invoked on the raw HTTP request.
#[async_trait]
pub trait EntrypointHook: Send + Sync {
    /// Handles the entrypoint stage.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] when the module fails.
    async fn handle_entrypoint_hook(
        &self,
        ctx: ModuleInvocationContext,
        payload: EntrypointPayload,
    ) -> Result<HookResult<EntrypointPayload>, HookError>;
}

/// Hook invoked on the raw auction request body.
#[async_trait]
pub trait RawAuctionRequestHook: Send + Sync {
    /// Handles the raw auction request stage.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] when the module fails.
    async fn handle_raw_auction_hook(
        &self,
        ctx: ModuleInvocationContext,
        payload: RawAuctionRequestPayload,
    ) -> Result<HookResult<RawAuctionRequestPayload>, HookError>;
}

/// Hook invoked on the parsed auction request.
#[async_trait]
pub trait ProcessedAuctionRequestHook: Send + Sync {
    /// Handles the processed auction request stage.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] when the module fails.
    async fn handle_processed_auction_hook(
        &self,
        ctx: ModuleInvocationContext,
        payload: ProcessedAuctionRequestPayload,
    ) -> Result<HookResult<ProcessedAuctionRequestPayload>, HookError>;
}

/// Hook invoked on each bidder request.
#[async_trait]
pub trait BidderRequestHook: Send + Sync {
    /// Handles the bidder request stage.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] when the module fails.
    async fn handle_bidder_request_hook(
        &self,
        ctx: ModuleInvocationContext,
        payload: BidderRequestPayload,
    ) -> Result<HookResult<BidderRequestPayload>, HookError>;
}

/// Hook invoked on each bidder's typed bids.
#[async_trait]
pub trait RawBidderResponseHook: Send + Sync {
    /// Handles the raw bidder response stage.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] when the module fails.
    async fn handle_raw_bidder_response_hook(
        &self,
        ctx: ModuleInvocationContext,
        payload: RawBidderResponsePayload,
    ) -> Result<HookResult<RawBidderResponsePayload>, HookError>;
}

/// Hook invoked on all processed bids before the auction closes.
#[async_trait]
pub trait AllProcessedBidResponsesHook: Send + Sync {
    /// Handles the all-processed-bid-responses stage.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] when the module fails.
    async fn handle_all_processed_bid_responses_hook(
        &self,
        ctx: ModuleInvocationContext,
        payload: AllProcessedBidResponsesPayload,
    ) -> Result<HookResult<AllProcessedBidResponsesPayload>, HookError>;
}

/// Hook invoked on the final auction response.
#[async_trait]
pub trait AuctionResponseHook: Send + Sync {
    /// Handles the auction response stage.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] when the module fails.
    async fn handle_auction_response_hook(
        &self,
        ctx: ModuleInvocationContext,
        payload: AuctionResponsePayload,
    ) -> Result<HookResult<AuctionResponsePayload>, HookError>;
}

// ============================================================================
// SECTION: Stage Hook Bridges
// ============================================================================

#[async_trait]
impl<T: EntrypointHook + ?Sized> StageHook<EntrypointPayload> for T {
    async fn call(
        &self,
        ctx: ModuleInvocationContext,
        payload: EntrypointPayload,
    ) -> Result<HookResult<EntrypointPayload>, HookError> {
        self.handle_entrypoint_hook(ctx, payload).await
    }
}

#[async_trait]
impl<T: RawAuctionRequestHook + ?Sized> StageHook<RawAuctionRequestPayload> for T {
    async fn call(
        &self,
        ctx: ModuleInvocationContext,
        payload: RawAuctionRequestPayload,
    ) -> Result<HookResult<RawAuctionRequestPayload>, HookError> {
        self.handle_raw_auction_hook(ctx, payload).await
    }
}

#[async_trait]
impl<T: ProcessedAuctionRequestHook + ?Sized> StageHook<ProcessedAuctionRequestPayload> for T {
    async fn call(
        &self,
        ctx: ModuleInvocationContext,
        payload: ProcessedAuctionRequestPayload,
    ) -> Result<HookResult<ProcessedAuctionRequestPayload>, HookError> {
        self.handle_processed_auction_hook(ctx, payload).await
    }
}

#[async_trait]
impl<T: BidderRequestHook + ?Sized> StageHook<BidderRequestPayload> for T {
    async fn call(
        &self,
        ctx: ModuleInvocationContext,
        payload: BidderRequestPayload,
    ) -> Result<HookResult<BidderRequestPayload>, HookError> {
        self.handle_bidder_request_hook(ctx, payload).await
    }
}

#[async_trait]
impl<T: RawBidderResponseHook + ?Sized> StageHook<RawBidderResponsePayload> for T {
    async fn call(
        &self,
        ctx: ModuleInvocationContext,
        payload: RawBidderResponsePayload,
    ) -> Result<HookResult<RawBidderResponsePayload>, HookError> {
        self.handle_raw_bidder_response_hook(ctx, payload).await
    }
}

#[async_trait]
impl<T: AllProcessedBidResponsesHook + ?Sized> StageHook<AllProcessedBidResponsesPayload> for T {
    async fn call(
        &self,
        ctx: ModuleInvocationContext,
        payload: AllProcessedBidResponsesPayload,
    ) -> Result<HookResult<AllProcessedBidResponsesPayload>, HookError> {
        self.handle_all_processed_bid_responses_hook(ctx, payload).await
    }
}

#[async_trait]
impl<T: AuctionResponseHook + ?Sized> StageHook<AuctionResponsePayload> for T {
    async fn call(
        &self,
        ctx: ModuleInvocationContext,
        payload: AuctionResponsePayload,
    ) -> Result<HookResult<AuctionResponsePayload>, HookError> {
        self.handle_auction_response_hook(ctx, payload).await
    }
}

// ============================================================================
// SECTION: Plan Builder
// ============================================================================

/// Produces the execution plan for each stage of a request.
///
/// # Invariants
/// - Returned plans are immutable and may be shared across concurrent stage
///   executions.
pub trait PlanBuilder: Send + Sync {
    /// Plan for the entrypoint stage. The account is not known yet.
    fn plan_for_entrypoint_stage(&self, endpoint: &Endpoint) -> Plan<EntrypointPayload>;

    /// Plan for the raw auction request stage.
    fn plan_for_raw_auction_stage(
        &self,
        endpoint: &Endpoint,
        account: Option<&Account>,
    ) -> Plan<RawAuctionRequestPayload>;

    /// Plan for the processed auction request stage.
    fn plan_for_processed_auction_stage(
        &self,
        endpoint: &Endpoint,
        account: Option<&Account>,
    ) -> Plan<ProcessedAuctionRequestPayload>;

    /// Plan for the bidder request stage.
    fn plan_for_bidder_request_stage(
        &self,
        endpoint: &Endpoint,
        account: Option<&Account>,
    ) -> Plan<BidderRequestPayload>;

    /// Plan for the raw bidder response stage.
    fn plan_for_raw_bidder_response_stage(
        &self,
        endpoint: &Endpoint,
        account: Option<&Account>,
    ) -> Plan<RawBidderResponsePayload>;

    /// Plan for the all-processed-bid-responses stage.
    fn plan_for_all_processed_bid_responses_stage(
        &self,
        endpoint: &Endpoint,
        account: Option<&Account>,
    ) -> Plan<AllProcessedBidResponsesPayload>;

    /// Plan for the auction response stage.
    fn plan_for_auction_response_stage(
        &self,
        endpoint: &Endpoint,
        account: Option<&Account>,
    ) -> Plan<AuctionResponsePayload>;
}

/// Plan builder returning empty plans for every stage.
///
/// Used when hook execution is disabled on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyPlanBuilder;

impl PlanBuilder for EmptyPlanBuilder {
    fn plan_for_entrypoint_stage(&self, _endpoint: &Endpoint) -> Plan<EntrypointPayload> {
        Plan::empty()
    }

    fn plan_for_raw_auction_stage(
        &self,
        _endpoint: &Endpoint,
        _account: Option<&Account>,
    ) -> Plan<RawAuctionRequestPayload> {
        Plan::empty()
    }

    fn plan_for_processed_auction_stage(
        &self,
        _endpoint: &Endpoint,
        _account: Option<&Account>,
    ) -> Plan<ProcessedAuctionRequestPayload> {
        Plan::empty()
    }

    fn plan_for_bidder_request_stage(
        &self,
        _endpoint: &Endpoint,
        _account: Option<&Account>,
    ) -> Plan<BidderRequestPayload> {
        Plan::empty()
    }

    fn plan_for_raw_bidder_response_stage(
        &self,
        _endpoint: &Endpoint,
        _account: Option<&Account>,
    ) -> Plan<RawBidderResponsePayload> {
        Plan::empty()
    }

    fn plan_for_all_processed_bid_responses_stage(
        &self,
        _endpoint: &Endpoint,
        _account: Option<&Account>,
    ) -> Plan<AllProcessedBidResponsesPayload> {
        Plan::empty()
    }

    fn plan_for_auction_response_stage(
        &self,
        _endpoint: &Endpoint,
        _account: Option<&Account>,
    ) -> Plan<AuctionResponsePayload> {
        Plan::empty()
    }
}

// ============================================================================
// SECTION: Activity Control
// ============================================================================

/// Privacy-sensitive activity a component may perform.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrivacyActivity {
    /// Receiving user first-party data.
    TransmitUserFpd,
}

/// Kind of component an activity check is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Bidder adapter.
    Bidder,
    /// Analytics adapter.
    Analytics,
    /// General module.
    General,
}

/// Component an activity check is made for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Component {
    /// Component kind.
    pub kind: ComponentKind,
    /// Component name.
    pub name: String,
}

impl Component {
    /// Creates the component descriptor for a hook module.
    #[must_use]
    pub fn module(module_code: &str) -> Self {
        Self {
            kind: ComponentKind::General,
            name: module_code.to_string(),
        }
    }
}

/// Privacy activity policy consulted before hooks receive user data.
///
/// Consent-string evaluation lives behind this boundary.
pub trait ActivityControl: Send + Sync {
    /// Returns true when the component may perform the activity.
    fn allow(&self, activity: PrivacyActivity, component: &Component) -> bool;
}
