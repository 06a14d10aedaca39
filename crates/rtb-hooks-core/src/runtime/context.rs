// crates/rtb-hooks-core/src/runtime/context.rs
// ============================================================================
// Module: RTB Hooks Runtime Context
// Description: Request-scoped module context store and stage context.
// Purpose: Carry per-request state through stage and group execution.
// Dependencies: crate::core, tokio
// ============================================================================

//! ## Overview
//! [`ModuleContextStore`] lets a module hand data forward to its own hooks
//! in later stages of the same request. [`StageContext`] bundles everything
//! the stage and group executors need for one stage execution.
//! Invariants:
//! - A module only ever reads and writes its own context.
//! - Merges overwrite keys within a module and never touch other modules.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use tokio::time::Instant;

use crate::core::ModuleContext;
use crate::core::ModuleInvocationContext;
use crate::core::identifiers::AccountId;
use crate::core::identifiers::Endpoint;
use crate::core::identifiers::Entity;
use crate::core::stage::Stage;
use crate::interfaces::ActivityControl;
use crate::plan::Account;
use crate::runtime::abtest::AbTestDecisions;
use crate::telemetry::HookMetrics;
use crate::telemetry::ModuleLabels;

// ============================================================================
// SECTION: Module Context Store
// ============================================================================

/// Request-scoped map from module code to module context.
#[derive(Debug, Default)]
pub struct ModuleContextStore {
    /// Contexts keyed by module code.
    contexts: Mutex<BTreeMap<String, ModuleContext>>,
}

impl ModuleContextStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of a module's context, empty when none was stored.
    #[must_use]
    pub fn get(&self, module_code: &str) -> ModuleContext {
        let contexts = self.contexts.lock().unwrap_or_else(PoisonError::into_inner);
        contexts.get(module_code).cloned().unwrap_or_default()
    }

    /// Merges entries into a module's context, overwriting existing keys.
    pub fn merge(&self, module_code: &str, entries: ModuleContext) {
        let mut contexts = self.contexts.lock().unwrap_or_else(PoisonError::into_inner);
        contexts.entry(module_code.to_string()).or_default().extend(entries);
    }

    /// Returns a snapshot of every module's context.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, ModuleContext> {
        self.contexts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

// ============================================================================
// SECTION: Stage Context
// ============================================================================

/// Inputs shared by every group of one stage execution.
#[derive(Clone)]
pub struct StageContext {
    /// Endpoint the request arrived on.
    pub endpoint: Endpoint,
    /// Stage being executed.
    pub stage: Stage,
    /// Entity the stage runs for.
    pub entity: Entity,
    /// Account, once resolved.
    pub account: Option<Arc<Account>>,
    /// Request-scoped module context store.
    pub module_contexts: Arc<ModuleContextStore>,
    /// Privacy activity policy.
    pub activity_control: Option<Arc<dyn ActivityControl>>,
    /// Request-scoped AB-test decisions.
    pub ab_tests: Option<Arc<AbTestDecisions>>,
    /// Metrics sink.
    pub metrics: Arc<dyn HookMetrics>,
}

impl StageContext {
    /// Returns the account identifier when the account is known.
    #[must_use]
    pub fn account_id(&self) -> Option<AccountId> {
        self.account.as_ref().map(|account| account.id.clone())
    }

    /// Builds the invocation context handed to a hook of `module_code`.
    #[must_use]
    pub fn invocation_context(
        &self,
        module_code: &str,
        deadline: Instant,
    ) -> ModuleInvocationContext {
        ModuleInvocationContext {
            endpoint: self.endpoint.clone(),
            account_id: self.account_id(),
            account_config: self
                .account
                .as_ref()
                .and_then(|account| account.module_config(module_code))
                .cloned(),
            module_context: self.module_contexts.get(module_code),
            deadline,
        }
    }

    /// Returns the metric labels for a module at this stage.
    #[must_use]
    pub fn labels(&self, module_code: &str) -> ModuleLabels {
        ModuleLabels::new(module_code, self.stage, self.account_id())
    }
}
