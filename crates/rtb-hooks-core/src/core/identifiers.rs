// crates/rtb-hooks-core/src/core/identifiers.rs
// ============================================================================
// Module: RTB Hooks Identifiers
// Description: Opaque identifiers for hooks, accounts, endpoints, and entities.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers used throughout hook execution. All identifiers are opaque
//! UTF-8 strings on the wire; [`HookId`] serializes as an object with
//! `module_code` and `hook_impl_code` fields.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Hook Identifier
// ============================================================================

/// Identifies one hook implementation of one module.
///
/// # Invariants
/// - `module_code` is the fully qualified module code (`vendor.module`).
/// - Equality is field-wise; the pair is unique within a plan group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HookId {
    /// Module code owning the hook.
    pub module_code: String,
    /// Hook implementation code within the module.
    pub hook_impl_code: String,
}

impl HookId {
    /// Creates a new hook identifier.
    #[must_use]
    pub fn new(module_code: impl Into<String>, hook_impl_code: impl Into<String>) -> Self {
        Self {
            module_code: module_code.into(),
            hook_impl_code: hook_impl_code.into(),
        }
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module_code, self.hook_impl_code)
    }
}

// ============================================================================
// SECTION: Account Identifier
// ============================================================================

/// Publisher account identifier.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Creates a new account identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Endpoint
// ============================================================================

/// HTTP endpoint path a request was received on.
///
/// # Invariants
/// - Compared verbatim against execution plan endpoint keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Endpoint(String);

impl Endpoint {
    /// Auction endpoint path.
    pub const AUCTION: &'static str = "/openrtb2/auction";
    /// AMP endpoint path.
    pub const AMP: &'static str = "/openrtb2/amp";
    /// Video endpoint path.
    pub const VIDEO: &'static str = "/openrtb2/video";

    /// Creates a new endpoint.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the auction endpoint.
    #[must_use]
    pub fn auction() -> Self {
        Self::new(Self::AUCTION)
    }

    /// Returns the endpoint path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Entity
// ============================================================================

/// Entity a stage outcome was recorded for.
///
/// Request-wide stages use a fixed label; per-bidder stages use the bidder
/// name so one stage can yield several outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(String);

impl Entity {
    /// Entity for the entrypoint stage.
    pub const HTTP_REQUEST: &'static str = "http-request";
    /// Entity for auction-request stages.
    pub const AUCTION_REQUEST: &'static str = "auction-request";
    /// Entity for the all-processed-bid-responses stage.
    pub const ALL_PROCESSED_BID_RESPONSES: &'static str = "all-processed-bid-responses";
    /// Entity for the auction-response stage.
    pub const AUCTION_RESPONSE: &'static str = "auction-response";

    /// Creates an entity from an arbitrary label.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Creates the entity for a bidder-scoped stage.
    #[must_use]
    pub fn bidder(bidder: &str) -> Self {
        Self::new(bidder)
    }

    /// Returns the entity label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
