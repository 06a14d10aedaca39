// crates/rtb-hooks-core/src/core/result.rs
// ============================================================================
// Module: RTB Hooks Invocation Results
// Description: Hook invocation context and hook result types.
// Purpose: Define what a hook receives and what it hands back.
// Dependencies: serde_json, tokio
// ============================================================================

//! ## Overview
//! A hook is called with a [`ModuleInvocationContext`] and its own payload
//! copy, and returns a [`HookResult`]. Results are produced once per
//! invocation and never mutated by the hook afterwards.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use tokio::time::Instant;

use crate::core::analytics::Analytics;
use crate::core::changeset::ChangeSet;
use crate::core::identifiers::AccountId;
use crate::core::identifiers::Endpoint;

// ============================================================================
// SECTION: Module Context
// ============================================================================

/// Opaque per-module key-value context carried across stages of a request.
pub type ModuleContext = BTreeMap<String, Value>;

/// Context handed to a hook at invocation time.
///
/// # Invariants
/// - `module_context` is a snapshot; changes reach later stages only when
///   returned through [`HookResult::module_context`].
/// - `deadline` is the group deadline shared by every hook in the group.
#[derive(Debug, Clone)]
pub struct ModuleInvocationContext {
    /// Endpoint the request arrived on.
    pub endpoint: Endpoint,
    /// Account identifier, once resolved.
    pub account_id: Option<AccountId>,
    /// Account-level configuration for the invoked module, when present.
    pub account_config: Option<Value>,
    /// Module context snapshot for the invoked module.
    pub module_context: ModuleContext,
    /// Group deadline.
    pub deadline: Instant,
}

// ============================================================================
// SECTION: Hook Result
// ============================================================================

/// Result returned by one hook invocation.
#[derive(Debug)]
pub struct HookResult<P> {
    /// Requests rejection of the whole request.
    pub reject: bool,
    /// No-bid reason code attached to a rejection.
    pub nbr_code: Option<i32>,
    /// Mutations to apply to the payload.
    pub change_set: ChangeSet<P>,
    /// Free-form message reported in verbose traces.
    pub message: String,
    /// Errors reported by the module.
    pub errors: Vec<String>,
    /// Warnings reported by the module.
    pub warnings: Vec<String>,
    /// Debug messages reported by the module.
    pub debug_messages: Vec<String>,
    /// Analytics tags reported by the module.
    pub analytics_tags: Analytics,
    /// Module context entries to merge into the request-scoped store.
    pub module_context: Option<ModuleContext>,
}

impl<P> HookResult<P> {
    /// Creates an empty result that neither rejects nor mutates.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reject: false,
            nbr_code: None,
            change_set: ChangeSet::new(),
            message: String::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            debug_messages: Vec::new(),
            analytics_tags: Analytics::default(),
            module_context: None,
        }
    }

    /// Creates a rejecting result with the provided no-bid reason code.
    #[must_use]
    pub fn rejected(nbr_code: i32) -> Self {
        Self {
            reject: true,
            nbr_code: Some(nbr_code),
            ..Self::new()
        }
    }

    /// Creates a result carrying the provided change set.
    #[must_use]
    pub fn with_change_set(change_set: ChangeSet<P>) -> Self {
        Self {
            change_set,
            ..Self::new()
        }
    }
}

impl<P> Default for HookResult<P> {
    fn default() -> Self {
        Self::new()
    }
}
