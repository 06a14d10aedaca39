// crates/rtb-hooks-core/src/core/analytics.rs
// ============================================================================
// Module: RTB Hooks Analytics Tags
// Description: Structured analytics activities attached to hook outcomes.
// Purpose: Carry module-reported activity records through to reporting.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Hooks may report analytics activities alongside their result. The engine
//! passes them through untouched, except for the AB-test gate which appends
//! its own `core-module-abtests` activity.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Analytics
// ============================================================================

/// Analytics tags reported by one hook invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    /// Reported activities in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activities: Vec<Activity>,
}

impl Analytics {
    /// Returns true when no activity was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

/// One named analytics activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Activity name.
    pub name: String,
    /// Activity status label.
    pub status: String,
    /// Activity results.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<ActivityResult>,
}

/// Result entry of an analytics activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityResult {
    /// Result status label.
    pub status: String,
    /// Free-form result values.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub values: Map<String, Value>,
    /// Entities the result applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_to: Option<AppliedTo>,
}

/// Entities an activity result applies to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppliedTo {
    /// Impression identifiers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub impids: Vec<String>,
    /// Bidder names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bidders: Vec<String>,
    /// Bid identifiers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bid_ids: Vec<String>,
    /// Whether the result applies to the whole request.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub request: bool,
    /// Whether the result applies to the whole response.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub response: bool,
}
