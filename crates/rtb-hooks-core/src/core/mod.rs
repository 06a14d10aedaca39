// crates/rtb-hooks-core/src/core/mod.rs
// ============================================================================
// Module: RTB Hooks Core Types
// Description: Data model shared by the hook execution engine.
// Purpose: Group identifiers, payloads, results, outcomes, and errors.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Core types carry no execution logic beyond pure helpers. Runtime modules
//! build on them; external crates consume them through the crate root
//! re-exports.

pub mod analytics;
pub mod changeset;
pub mod errors;
pub mod identifiers;
pub mod ortb;
pub mod outcome;
pub mod payload;
pub mod result;
pub mod stage;

pub use analytics::Activity;
pub use analytics::ActivityResult;
pub use analytics::Analytics;
pub use analytics::AppliedTo;
pub use changeset::ChangeSet;
pub use changeset::Mutation;
pub use changeset::MutationError;
pub use changeset::MutationFn;
pub use changeset::MutationType;
pub use errors::HookError;
pub use errors::RejectError;
pub use errors::Rejection;
pub use identifiers::AccountId;
pub use identifiers::Endpoint;
pub use identifiers::Entity;
pub use identifiers::HookId;
pub use outcome::Action;
pub use outcome::GroupOutcome;
pub use outcome::HookOutcome;
pub use outcome::StageOutcome;
pub use outcome::Status;
pub use payload::AllProcessedBidResponsesPayload;
pub use payload::AuctionResponsePayload;
pub use payload::BidderRequestPayload;
pub use payload::EntrypointPayload;
pub use payload::HttpRequest;
pub use payload::ProcessedAuctionRequestPayload;
pub use payload::RawAuctionRequestPayload;
pub use payload::RawBidderResponsePayload;
pub use payload::StagePayload;
pub use result::HookResult;
pub use result::ModuleContext;
pub use result::ModuleInvocationContext;
pub use stage::Stage;
pub use stage::UnknownStageError;
