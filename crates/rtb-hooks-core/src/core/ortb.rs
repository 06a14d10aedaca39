// crates/rtb-hooks-core/src/core/ortb.rs
// ============================================================================
// Module: RTB Hooks OpenRTB Model
// Description: Minimal OpenRTB request/response model carried by stage payloads.
// Purpose: Give hooks typed access to the fields they commonly read or mutate.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Only the fields hooks and the engine itself touch are typed. Every other
//! field is preserved verbatim in the flattened `extra` maps so payloads
//! round-trip without loss.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Request
// ============================================================================

/// OpenRTB bid request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidRequest {
    /// Request identifier.
    #[serde(default)]
    pub id: String,
    /// Impressions offered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imp: Vec<Imp>,
    /// Device description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,
    /// User description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Test flag (1 = test request).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub test: u8,
    /// Request extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
    /// Untyped remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// OpenRTB impression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Imp {
    /// Impression identifier.
    #[serde(default)]
    pub id: String,
    /// Impression extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
    /// Untyped remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// OpenRTB user object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Exchange-specific user identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Buyer-specific user identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyeruid: Option<String>,
    /// Year of birth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yob: Option<i64>,
    /// Gender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Consent string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent: Option<String>,
    /// First-party data segments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
    /// Extended identifiers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eids: Option<Vec<Value>>,
    /// User extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
    /// Untyped remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// OpenRTB device object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Advertising identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifa: Option<String>,
    /// Hashed hardware identifier (MD5).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub didmd5: Option<String>,
    /// Hashed hardware identifier (SHA1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub didsha1: Option<String>,
    /// Hashed platform identifier (MD5).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpidmd5: Option<String>,
    /// Hashed platform identifier (SHA1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpidsha1: Option<String>,
    /// Untyped remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// SECTION: Response
// ============================================================================

/// OpenRTB bid response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidResponse {
    /// Identifier of the request this responds to.
    #[serde(default)]
    pub id: String,
    /// Seat bids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seatbid: Vec<SeatBid>,
    /// Bid currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cur: Option<String>,
    /// No-bid reason code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbr: Option<i32>,
    /// Response extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
    /// Untyped remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Bids from one seat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeatBid {
    /// Seat (bidder) name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat: Option<String>,
    /// Bids placed by the seat.
    #[serde(default)]
    pub bid: Vec<Bid>,
    /// Untyped remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Single bid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    /// Bid identifier.
    #[serde(default)]
    pub id: String,
    /// Impression identifier this bid targets.
    #[serde(default)]
    pub impid: String,
    /// Bid price in CPM.
    #[serde(default)]
    pub price: f64,
    /// Ad markup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adm: Option<String>,
    /// Creative identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crid: Option<String>,
    /// Advertiser domains.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adomain: Vec<String>,
    /// Bid extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
    /// Untyped remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Media type of a bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidType {
    /// Display banner.
    Banner,
    /// Video.
    Video,
    /// Audio.
    Audio,
    /// Native.
    Native,
}

/// Bid as produced by a bidder adapter, annotated with its media type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedBid {
    /// The bid itself.
    pub bid: Bid,
    /// Media type of the bid.
    pub bid_type: BidType,
    /// Deal priority, when the bid targets a deal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_priority: Option<i32>,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Serde helper skipping zero-valued flags.
#[allow(clippy::trivially_copy_pass_by_ref, reason = "Signature is fixed by serde.")]
const fn is_zero(value: &u8) -> bool {
    *value == 0
}
