// crates/rtb-hooks-core/src/core/stage.rs
// ============================================================================
// Module: RTB Hooks Stages
// Description: Named request-processing points where hooks run.
// Purpose: Provide stable stage labels and rejection capabilities.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Stage`] names one point in auction processing. Stage labels are used
//! as execution plan keys, outcome labels, and metric labels, so the wire
//! form is stable snake case.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Stage
// ============================================================================

/// Request-processing stage.
///
/// # Invariants
/// - Variants are ordered by their position in the request lifecycle.
/// - Labels returned by [`Stage::as_str`] are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Raw HTTP request received, before body parsing.
    Entrypoint,
    /// Raw auction request body, before validation.
    RawAuctionRequest,
    /// Parsed and validated auction request.
    ProcessedAuctionRequest,
    /// Per-bidder request, before the adapter builds HTTP calls.
    BidderRequest,
    /// Per-bidder typed bids, as returned by the adapter.
    RawBidderResponse,
    /// All bidders' processed bids, before the auction closes.
    AllProcessedBidResponses,
    /// Final auction response.
    AuctionResponse,
}

impl Stage {
    /// All stages in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Entrypoint,
        Self::RawAuctionRequest,
        Self::ProcessedAuctionRequest,
        Self::BidderRequest,
        Self::RawBidderResponse,
        Self::AllProcessedBidResponses,
        Self::AuctionResponse,
    ];

    /// Returns the stable stage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entrypoint => "entrypoint",
            Self::RawAuctionRequest => "raw_auction_request",
            Self::ProcessedAuctionRequest => "processed_auction_request",
            Self::BidderRequest => "bidder_request",
            Self::RawBidderResponse => "raw_bidder_response",
            Self::AllProcessedBidResponses => "all_processed_bid_responses",
            Self::AuctionResponse => "auction_response",
        }
    }

    /// Returns true when hooks may reject the request at this stage.
    ///
    /// The two stages after bid collection are not rejectable.
    #[must_use]
    pub const fn is_rejectable(self) -> bool {
        !matches!(self, Self::AllProcessedBidResponses | Self::AuctionResponse)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown stage label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hook stage: {0}")]
pub struct UnknownStageError(pub String);

impl FromStr for Stage {
    type Err = UnknownStageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == value)
            .ok_or_else(|| UnknownStageError(value.to_string()))
    }
}
