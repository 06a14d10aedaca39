// crates/rtb-hooks-core/src/plan.rs
// ============================================================================
// Module: RTB Hooks Execution Plans
// Description: Executable plans, declarative plan models, and accounts.
// Purpose: Describe which hooks run, in which groups, for a stage.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Plan`] is an ordered list of [`Group`]s; each group holds the hooks
//! that run concurrently under one shared timeout. Plans are resolved by a
//! plan builder from the declarative [`ExecutionPlan`] model found in host
//! and account configuration.
//! Invariants:
//! - Plans are immutable once built and cheap to clone.
//! - Groups run strictly in plan order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::StagePayload;
use crate::core::identifiers::AccountId;
use crate::core::identifiers::HookId;
use crate::core::stage::Stage;
use crate::interfaces::StageHook;

// ============================================================================
// SECTION: Executable Plan
// ============================================================================

/// Hook bound to the module and implementation code it was registered under.
pub struct HookWrapper<P: StagePayload> {
    /// Module code (`vendor.module`).
    pub module_code: String,
    /// Hook implementation code.
    pub hook_impl_code: String,
    /// Hook implementation.
    pub hook: Arc<dyn StageHook<P>>,
}

impl<P: StagePayload> HookWrapper<P> {
    /// Creates a new hook wrapper.
    #[must_use]
    pub fn new(
        module_code: impl Into<String>,
        hook_impl_code: impl Into<String>,
        hook: Arc<dyn StageHook<P>>,
    ) -> Self {
        Self {
            module_code: module_code.into(),
            hook_impl_code: hook_impl_code.into(),
            hook,
        }
    }

    /// Returns the hook identifier.
    #[must_use]
    pub fn hook_id(&self) -> HookId {
        HookId::new(self.module_code.clone(), self.hook_impl_code.clone())
    }
}

impl<P: StagePayload> Clone for HookWrapper<P> {
    fn clone(&self) -> Self {
        Self {
            module_code: self.module_code.clone(),
            hook_impl_code: self.hook_impl_code.clone(),
            hook: Arc::clone(&self.hook),
        }
    }
}

impl<P: StagePayload> fmt::Debug for HookWrapper<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookWrapper")
            .field("module_code", &self.module_code)
            .field("hook_impl_code", &self.hook_impl_code)
            .finish_non_exhaustive()
    }
}

/// Hooks executed concurrently under one timeout.
///
/// # Invariants
/// - `timeout` bounds the whole group, not each hook.
pub struct Group<P: StagePayload> {
    /// Group timeout.
    pub timeout: Duration,
    /// Hooks in declaration order.
    pub hooks: Vec<HookWrapper<P>>,
}

impl<P: StagePayload> Group<P> {
    /// Creates a new group.
    #[must_use]
    pub const fn new(timeout: Duration, hooks: Vec<HookWrapper<P>>) -> Self {
        Self {
            timeout,
            hooks,
        }
    }
}

impl<P: StagePayload> Clone for Group<P> {
    fn clone(&self) -> Self {
        Self {
            timeout: self.timeout,
            hooks: self.hooks.clone(),
        }
    }
}

impl<P: StagePayload> fmt::Debug for Group<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group").field("timeout", &self.timeout).field("hooks", &self.hooks).finish()
    }
}

/// Ordered groups executed for one stage.
pub struct Plan<P: StagePayload> {
    /// Groups in execution order.
    groups: Vec<Group<P>>,
}

impl<P: StagePayload> Plan<P> {
    /// Creates a plan from groups in execution order.
    #[must_use]
    pub const fn new(groups: Vec<Group<P>>) -> Self {
        Self {
            groups,
        }
    }

    /// Creates a plan with no groups.
    #[must_use]
    pub const fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Returns the groups in execution order.
    #[must_use]
    pub fn groups(&self) -> &[Group<P>] {
        &self.groups
    }

    /// Returns true when the plan has no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<P: StagePayload> Clone for Plan<P> {
    fn clone(&self) -> Self {
        Self {
            groups: self.groups.clone(),
        }
    }
}

impl<P: StagePayload> Default for Plan<P> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<P: StagePayload> fmt::Debug for Plan<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.groups).finish()
    }
}

// ============================================================================
// SECTION: Declarative Plan Model
// ============================================================================

/// Declarative execution plan keyed by endpoint and stage label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionPlan {
    /// Plans per endpoint path.
    #[serde(default)]
    pub endpoints: BTreeMap<String, EndpointPlan>,
}

impl ExecutionPlan {
    /// Returns the declared groups for an endpoint and stage.
    #[must_use]
    pub fn groups_for(&self, endpoint: &str, stage: Stage) -> &[GroupPlan] {
        self.endpoints
            .get(endpoint)
            .and_then(|plan| plan.stages.get(stage.as_str()))
            .map(|plan| plan.groups.as_slice())
            .unwrap_or_default()
    }

    /// Returns true when no endpoint is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Declarative plan for one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointPlan {
    /// Plans keyed by stage label.
    #[serde(default)]
    pub stages: BTreeMap<String, StagePlan>,
}

/// Declarative plan for one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StagePlan {
    /// Groups in execution order.
    #[serde(default)]
    pub groups: Vec<GroupPlan>,
}

/// Declarative group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupPlan {
    /// Group timeout in milliseconds.
    pub timeout: u64,
    /// Hooks in declaration order.
    #[serde(default)]
    pub hook_sequence: Vec<HookRef>,
}

/// Reference to a registered hook implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookRef {
    /// Module code (`vendor.module`).
    pub module_code: String,
    /// Hook implementation code.
    pub hook_impl_code: String,
}

// ============================================================================
// SECTION: Account
// ============================================================================

/// Publisher account settings relevant to hook execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier.
    pub id: AccountId,
    /// Whether debug output may be returned to this account's callers.
    #[serde(default)]
    pub debug_allow: bool,
    /// Account-specific execution plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_plan: Option<ExecutionPlan>,
    /// Module configuration keyed by vendor, then module name.
    #[serde(default)]
    pub modules: BTreeMap<String, Value>,
}

impl Account {
    /// Creates an account with default settings.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: AccountId::new(id),
            debug_allow: false,
            execution_plan: None,
            modules: BTreeMap::new(),
        }
    }

    /// Returns the account configuration for a `vendor.module` code.
    #[must_use]
    pub fn module_config(&self, module_code: &str) -> Option<&Value> {
        let (vendor, module) = module_code.split_once('.')?;
        self.modules.get(vendor)?.get(module)
    }
}
