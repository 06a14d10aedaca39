// crates/rtb-hooks-core/src/runtime/abtest.rs
// ============================================================================
// Module: RTB Hooks AB-Test Gate
// Description: Percentage rollout gate deciding whether a module runs.
// Purpose: Skip or run modules per request and record the decision.
// Dependencies: rand, serde, serde_json
// ============================================================================

//! ## Overview
//! The [`AbTestGate`] is process-wide and holds one [`AbTestConfig`] per
//! module. Each request owns an [`AbTestDecisions`] view that rolls once per
//! module and reuses that decision for every later stage of the request.
//! Invariants:
//! - A module without an enabled test always runs.
//! - A decision, once made for a module, holds for the rest of the request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::Action;
use crate::core::Activity;
use crate::core::ActivityResult;
use crate::core::Analytics;
use crate::core::HookOutcome;
use crate::core::Status;
use crate::core::identifiers::AccountId;
use crate::core::identifiers::HookId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Analytics activity name for AB-test decisions.
pub const AB_TEST_ACTIVITY: &str = "core-module-abtests";
/// Activity result status for a module that ran.
pub const AB_TEST_RUN: &str = "run";
/// Activity result status for a module that was skipped.
pub const AB_TEST_SKIPPED: &str = "skipped";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// AB-test configuration for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AbTestConfig {
    /// Module code (`vendor.module`).
    pub module_code: String,
    /// Whether the test is active.
    #[serde(default)]
    pub enabled: bool,
    /// Percentage of requests the module runs for (0-100).
    #[serde(default = "default_percent_active")]
    pub percent_active: u8,
    /// Accounts the test applies to; empty means every account.
    #[serde(default)]
    pub accounts: Vec<AccountId>,
    /// Whether to record the decision as an analytics activity.
    #[serde(default = "default_log_analytics_tag")]
    pub log_analytics_tag: bool,
}

/// Default rollout percentage.
const fn default_percent_active() -> u8 {
    100
}

/// Default analytics logging flag.
const fn default_log_analytics_tag() -> bool {
    true
}

impl AbTestConfig {
    /// Returns true when the test applies to the provided account.
    fn applies_to(&self, account_id: Option<&AccountId>) -> bool {
        if self.accounts.is_empty() {
            return true;
        }
        account_id.is_some_and(|id| self.accounts.contains(id))
    }
}

/// Outcome of an AB-test decision for one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbDecision {
    /// No enabled test applies; the module runs untagged.
    NotApplicable,
    /// The module runs.
    Run {
        /// Whether to record the decision.
        log_analytics_tag: bool,
    },
    /// The module is skipped.
    Skip {
        /// Whether to record the decision.
        log_analytics_tag: bool,
    },
}

/// Source of random rolls in `0..100`.
pub type Roller = Arc<dyn Fn() -> u8 + Send + Sync>;

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Process-wide AB-test gate.
pub struct AbTestGate {
    /// Tests keyed by module code.
    tests: BTreeMap<String, AbTestConfig>,
    /// Random roll source.
    roller: Roller,
}

impl AbTestGate {
    /// Creates a gate rolling with the thread-local random generator.
    #[must_use]
    pub fn new(tests: Vec<AbTestConfig>) -> Self {
        Self {
            tests: tests.into_iter().map(|test| (test.module_code.clone(), test)).collect(),
            roller: Arc::new(|| rand::thread_rng().gen_range(0..100_u8)),
        }
    }

    /// Replaces the random roll source.
    #[must_use]
    pub fn with_roller(mut self, roller: Roller) -> Self {
        self.roller = roller;
        self
    }

    /// Returns true when no test is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Decides whether a module runs for the provided account.
    #[must_use]
    pub fn decide(&self, module_code: &str, account_id: Option<&AccountId>) -> AbDecision {
        let Some(test) = self.tests.get(module_code) else {
            return AbDecision::NotApplicable;
        };
        if !test.enabled || !test.applies_to(account_id) {
            return AbDecision::NotApplicable;
        }
        let log_analytics_tag = test.log_analytics_tag;
        if (self.roller)() < test.percent_active {
            AbDecision::Run {
                log_analytics_tag,
            }
        } else {
            AbDecision::Skip {
                log_analytics_tag,
            }
        }
    }
}

impl fmt::Debug for AbTestGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbTestGate").field("tests", &self.tests).finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Request Decisions
// ============================================================================

/// Request-scoped cache of AB-test decisions.
#[derive(Debug)]
pub struct AbTestDecisions {
    /// Process-wide gate.
    gate: Arc<AbTestGate>,
    /// Decisions made so far, keyed by module code.
    decisions: Mutex<BTreeMap<String, AbDecision>>,
}

impl AbTestDecisions {
    /// Creates an empty decision cache over the gate.
    #[must_use]
    pub fn new(gate: Arc<AbTestGate>) -> Self {
        Self {
            gate,
            decisions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the decision for a module, rolling on first use.
    ///
    /// Inapplicable results are not cached so a test restricted to accounts
    /// is evaluated again once the account is known.
    #[must_use]
    pub fn decide(&self, module_code: &str, account_id: Option<&AccountId>) -> AbDecision {
        let mut decisions = self.decisions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(decision) = decisions.get(module_code) {
            return *decision;
        }
        let decision = self.gate.decide(module_code, account_id);
        if decision != AbDecision::NotApplicable {
            decisions.insert(module_code.to_string(), decision);
        }
        decision
    }
}

// ============================================================================
// SECTION: Outcome Helpers
// ============================================================================

/// Builds the synthetic outcome for a hook skipped by the gate.
#[must_use]
pub fn skipped_outcome(hook_id: HookId, log_analytics_tag: bool) -> HookOutcome {
    let mut outcome = HookOutcome::new(hook_id, Status::Success, Action::NoInvocation);
    if log_analytics_tag {
        outcome.analytics_tags = ab_test_tags(&outcome.hook_id.module_code, AB_TEST_SKIPPED);
    }
    outcome
}

/// Appends the `run` activity to a hook outcome.
pub fn tag_run(outcome: &mut HookOutcome) {
    let tags = ab_test_tags(&outcome.hook_id.module_code, AB_TEST_RUN);
    outcome.analytics_tags.activities.extend(tags.activities);
}

/// Builds the AB-test analytics activity for a module.
fn ab_test_tags(module_code: &str, status: &str) -> Analytics {
    let mut values = Map::new();
    values.insert("module".to_string(), Value::String(module_code.to_string()));
    Analytics {
        activities: vec![Activity {
            name: AB_TEST_ACTIVITY.to_string(),
            status: "success".to_string(),
            results: vec![ActivityResult {
                status: status.to_string(),
                values,
                applied_to: None,
            }],
        }],
    }
}
