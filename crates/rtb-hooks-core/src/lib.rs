// crates/rtb-hooks-core/src/lib.rs
// ============================================================================
// Module: RTB Hooks Core
// Description: Stage-based hook execution engine for an RTB auction server.
// Purpose: Let modules observe and mutate requests under strict guarantees.
// Dependencies: async-trait, axum, bytes, rand, serde, serde_json, thiserror, tokio, url
// ============================================================================

//! ## Overview
//! Modules register hooks at named stages of auction processing. For each
//! stage a plan of groups is executed: groups run sequentially, hooks in a
//! group run concurrently under one timeout, and their declared mutations are
//! applied serially in declaration order once the group has reported. Any
//! hook on a rejectable stage may reject the request with a no-bid reason.
//!
//! Invariants:
//! - Hooks in a group read the same pre-group payload snapshot.
//! - Mutation order is declaration order, never completion order.
//! - Only a rejection stops a stage; failures and timeouts are recorded.
//! - Slow hooks are abandoned at the group deadline, never force-killed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod core;
pub mod enrich;
pub mod interfaces;
pub mod plan;
pub mod runtime;
pub mod telemetry;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::ExecutionLogSink;
pub use audit::FileLogSink;
pub use audit::HookLogEvent;
pub use audit::NoopLogSink;
pub use audit::StderrLogSink;
pub use core::*;
pub use enrich::DebugOptions;
pub use enrich::EnrichError;
pub use enrich::ModulesOutcome;
pub use enrich::TraceLevel;
pub use enrich::enrich_bid_response;
pub use enrich::enrich_ext_bid_response;
pub use enrich::modules_outcome;
pub use interfaces::ActivityControl;
pub use interfaces::AllProcessedBidResponsesHook;
pub use interfaces::AuctionResponseHook;
pub use interfaces::BidderRequestHook;
pub use interfaces::Component;
pub use interfaces::ComponentKind;
pub use interfaces::EmptyPlanBuilder;
pub use interfaces::EntrypointHook;
pub use interfaces::PlanBuilder;
pub use interfaces::PrivacyActivity;
pub use interfaces::ProcessedAuctionRequestHook;
pub use interfaces::RawAuctionRequestHook;
pub use interfaces::RawBidderResponseHook;
pub use interfaces::StageHook;
pub use plan::Account;
pub use plan::EndpointPlan;
pub use plan::ExecutionPlan;
pub use plan::Group;
pub use plan::GroupPlan;
pub use plan::HookRef;
pub use plan::HookWrapper;
pub use plan::Plan;
pub use plan::StagePlan;
pub use runtime::AbDecision;
pub use runtime::AbTestConfig;
pub use runtime::AbTestGate;
pub use runtime::HookExecutor;
pub use runtime::ModuleContextStore;
pub use runtime::Roller;
pub use telemetry::HookMetrics;
pub use telemetry::ModuleLabels;
pub use telemetry::NoopMetrics;
