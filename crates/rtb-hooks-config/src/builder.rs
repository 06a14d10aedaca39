// crates/rtb-hooks-config/src/builder.rs
// ============================================================================
// Module: RTB Hooks Plan Builder
// Description: Resolves configured execution plans into executable plans.
// Purpose: Merge host and account plans and bind them to registered hooks.
// Dependencies: rtb-hooks-core
// ============================================================================

//! ## Overview
//! [`ConfiguredPlanBuilder`] implements the runtime's plan builder over the
//! host configuration. For every stage the resolved plan is the host plan's
//! groups followed by the account's groups. An account contributes its own
//! plan when that plan declares at least one endpoint, and the
//! default-account plan otherwise. The entrypoint stage runs before the
//! account is known and always uses the default-account plan.
//! Invariants:
//! - Hook references that resolve to no registered hook are dropped.
//! - Groups left without hooks are dropped.
//! - Resolution is pure apart from recording missing hook references.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use rtb_hooks_core::AbTestGate;
use rtb_hooks_core::Account;
use rtb_hooks_core::AllProcessedBidResponsesPayload;
use rtb_hooks_core::AuctionResponsePayload;
use rtb_hooks_core::BidderRequestPayload;
use rtb_hooks_core::EmptyPlanBuilder;
use rtb_hooks_core::Endpoint;
use rtb_hooks_core::EntrypointPayload;
use rtb_hooks_core::ExecutionLogSink;
use rtb_hooks_core::ExecutionPlan;
use rtb_hooks_core::FileLogSink;
use rtb_hooks_core::Group;
use rtb_hooks_core::GroupPlan;
use rtb_hooks_core::HookId;
use rtb_hooks_core::HookWrapper;
use rtb_hooks_core::NoopLogSink;
use rtb_hooks_core::Plan;
use rtb_hooks_core::PlanBuilder;
use rtb_hooks_core::ProcessedAuctionRequestPayload;
use rtb_hooks_core::RawAuctionRequestPayload;
use rtb_hooks_core::RawBidderResponsePayload;
use rtb_hooks_core::Stage;
use rtb_hooks_core::StderrLogSink;

use crate::config::ConfigError;
use crate::config::HooksConfig;
use crate::config::LogSinkKind;
use crate::config::LoggingConfig;
use crate::repository::HookRepository;
use crate::repository::RepositoryStage;

// ============================================================================
// SECTION: Configured Plan Builder
// ============================================================================

/// Plan builder backed by host configuration and a hook repository.
#[derive(Debug)]
pub struct ConfiguredPlanBuilder {
    /// Host-level plan applied to every request.
    host_plan: ExecutionPlan,
    /// Plan used for accounts without a plan of their own.
    default_account_plan: ExecutionPlan,
    /// Registered hook implementations.
    repository: HookRepository,
    /// Plan references to modules that are neither registered nor disabled.
    missing: Mutex<BTreeSet<HookId>>,
}

impl ConfiguredPlanBuilder {
    /// Creates a builder from hook configuration and a repository.
    #[must_use]
    pub fn new(config: &HooksConfig, repository: HookRepository) -> Self {
        Self {
            host_plan: config.host_execution_plan.clone(),
            default_account_plan: config.default_account_execution_plan.clone(),
            repository,
            missing: Mutex::new(BTreeSet::new()),
        }
    }

    /// Returns the declared groups for a stage before hook binding.
    ///
    /// Host groups come first, followed by the account plan's groups when
    /// the account declares any endpoint, else the default-account groups.
    #[must_use]
    pub fn declared_groups(
        &self,
        endpoint: &Endpoint,
        stage: Stage,
        account: Option<&Account>,
    ) -> Vec<GroupPlan> {
        let account_plan = account
            .and_then(|account| account.execution_plan.as_ref())
            .filter(|plan| !plan.is_empty())
            .unwrap_or(&self.default_account_plan);
        self.host_plan
            .groups_for(endpoint.as_str(), stage)
            .iter()
            .chain(account_plan.groups_for(endpoint.as_str(), stage))
            .cloned()
            .collect()
    }

    /// Returns hook references that matched no registered or disabled module.
    #[must_use]
    pub fn missing_hooks(&self) -> Vec<HookId> {
        self.missing.lock().unwrap_or_else(PoisonError::into_inner).iter().cloned().collect()
    }

    /// Resolves and binds the plan for payload type `P`.
    fn resolve<P: RepositoryStage>(
        &self,
        endpoint: &Endpoint,
        account: Option<&Account>,
    ) -> Plan<P> {
        let groups = self
            .declared_groups(endpoint, P::STAGE, account)
            .iter()
            .filter_map(|group| self.bind_group(group))
            .collect();
        Plan::new(groups)
    }

    /// Binds a declared group to registered hooks.
    fn bind_group<P: RepositoryStage>(&self, group: &GroupPlan) -> Option<Group<P>> {
        let hooks: Vec<HookWrapper<P>> = group
            .hook_sequence
            .iter()
            .filter_map(|hook_ref| {
                if let Some(hook) = self.repository.hook::<P>(&hook_ref.module_code) {
                    return Some(HookWrapper::new(
                        hook_ref.module_code.clone(),
                        hook_ref.hook_impl_code.clone(),
                        hook,
                    ));
                }
                if !self.repository.is_disabled(&hook_ref.module_code) {
                    self.missing
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(HookId::new(&hook_ref.module_code, &hook_ref.hook_impl_code));
                }
                None
            })
            .collect();
        if hooks.is_empty() {
            return None;
        }
        Some(Group::new(Duration::from_millis(group.timeout), hooks))
    }
}

impl PlanBuilder for ConfiguredPlanBuilder {
    fn plan_for_entrypoint_stage(&self, endpoint: &Endpoint) -> Plan<EntrypointPayload> {
        self.resolve(endpoint, None)
    }

    fn plan_for_raw_auction_stage(
        &self,
        endpoint: &Endpoint,
        account: Option<&Account>,
    ) -> Plan<RawAuctionRequestPayload> {
        self.resolve(endpoint, account)
    }

    fn plan_for_processed_auction_stage(
        &self,
        endpoint: &Endpoint,
        account: Option<&Account>,
    ) -> Plan<ProcessedAuctionRequestPayload> {
        self.resolve(endpoint, account)
    }

    fn plan_for_bidder_request_stage(
        &self,
        endpoint: &Endpoint,
        account: Option<&Account>,
    ) -> Plan<BidderRequestPayload> {
        self.resolve(endpoint, account)
    }

    fn plan_for_raw_bidder_response_stage(
        &self,
        endpoint: &Endpoint,
        account: Option<&Account>,
    ) -> Plan<RawBidderResponsePayload> {
        self.resolve(endpoint, account)
    }

    fn plan_for_all_processed_bid_responses_stage(
        &self,
        endpoint: &Endpoint,
        account: Option<&Account>,
    ) -> Plan<AllProcessedBidResponsesPayload> {
        self.resolve(endpoint, account)
    }

    fn plan_for_auction_response_stage(
        &self,
        endpoint: &Endpoint,
        account: Option<&Account>,
    ) -> Plan<AuctionResponsePayload> {
        self.resolve(endpoint, account)
    }
}

// ============================================================================
// SECTION: Runtime Collaborators
// ============================================================================

/// Returns the plan builder for the configuration.
///
/// Hosts with hooks disabled get an [`EmptyPlanBuilder`].
#[must_use]
pub fn plan_builder_from_config(
    config: &HooksConfig,
    repository: HookRepository,
) -> Arc<dyn PlanBuilder> {
    if config.enabled {
        Arc::new(ConfiguredPlanBuilder::new(config, repository))
    } else {
        Arc::new(EmptyPlanBuilder)
    }
}

/// Returns the AB-test gate declared by the configuration.
#[must_use]
pub fn ab_test_gate_from_config(config: &HooksConfig) -> AbTestGate {
    AbTestGate::new(config.ab_tests.clone())
}

/// Opens the execution log sink selected by the configuration.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file sink cannot be opened.
pub fn log_sink_from_config(
    config: &LoggingConfig,
) -> Result<Arc<dyn ExecutionLogSink>, ConfigError> {
    match config.sink {
        LogSinkKind::Stderr => Ok(Arc::new(StderrLogSink)),
        LogSinkKind::Discard => Ok(Arc::new(NoopLogSink)),
        LogSinkKind::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                ConfigError::Invalid("logging.path is required for the file sink".to_string())
            })?;
            let sink = FileLogSink::new(path).map_err(|err| ConfigError::Io(err.to_string()))?;
            Ok(Arc::new(sink))
        }
    }
}
