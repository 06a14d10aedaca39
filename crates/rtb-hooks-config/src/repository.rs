// crates/rtb-hooks-config/src/repository.rs
// ============================================================================
// Module: RTB Hooks Repository
// Description: Registry of enabled module hook implementations.
// Purpose: Resolve module codes in execution plans to stage hooks.
// Dependencies: rtb-hooks-core
// ============================================================================

//! ## Overview
//! Modules are offered to the repository as candidates, each exposing one
//! optional implementation per stage through [`ModuleHooks`]. Only modules
//! whose host configuration sets `enabled = true` are registered; every other
//! candidate is reported as disabled so plan resolution can skip it quietly.
//! Invariants:
//! - A registered module exposes at least one stage hook.
//! - Lookups never fail; a missing module or stage yields `None`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use rtb_hooks_core::AllProcessedBidResponsesPayload;
use rtb_hooks_core::AuctionResponsePayload;
use rtb_hooks_core::BidderRequestPayload;
use rtb_hooks_core::EntrypointPayload;
use rtb_hooks_core::ProcessedAuctionRequestPayload;
use rtb_hooks_core::RawAuctionRequestPayload;
use rtb_hooks_core::RawBidderResponsePayload;
use rtb_hooks_core::Stage;
use rtb_hooks_core::StageHook;
use rtb_hooks_core::StagePayload;

use crate::config::ConfigError;
use crate::config::HooksConfig;

// ============================================================================
// SECTION: Module Hooks
// ============================================================================

/// Stage hook implementations exposed by one module.
#[derive(Clone, Default)]
pub struct ModuleHooks {
    /// Entrypoint hook.
    pub entrypoint: Option<Arc<dyn StageHook<EntrypointPayload>>>,
    /// Raw auction request hook.
    pub raw_auction_request: Option<Arc<dyn StageHook<RawAuctionRequestPayload>>>,
    /// Processed auction request hook.
    pub processed_auction_request: Option<Arc<dyn StageHook<ProcessedAuctionRequestPayload>>>,
    /// Bidder request hook.
    pub bidder_request: Option<Arc<dyn StageHook<BidderRequestPayload>>>,
    /// Raw bidder response hook.
    pub raw_bidder_response: Option<Arc<dyn StageHook<RawBidderResponsePayload>>>,
    /// All-processed-bid-responses hook.
    pub all_processed_bid_responses: Option<Arc<dyn StageHook<AllProcessedBidResponsesPayload>>>,
    /// Auction response hook.
    pub auction_response: Option<Arc<dyn StageHook<AuctionResponsePayload>>>,
}

impl ModuleHooks {
    /// Creates a module exposing no hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hook for the stage matching payload type `P`.
    #[must_use]
    pub fn with_hook<P: RepositoryStage>(mut self, hook: Arc<dyn StageHook<P>>) -> Self {
        *P::slot_mut(&mut self) = Some(hook);
        self
    }

    /// Returns the hook for the stage matching payload type `P`.
    #[must_use]
    pub fn hook<P: RepositoryStage>(&self) -> Option<&Arc<dyn StageHook<P>>> {
        P::slot(self).as_ref()
    }

    /// Returns the stages this module implements, in lifecycle order.
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        let implemented = [
            self.entrypoint.is_some(),
            self.raw_auction_request.is_some(),
            self.processed_auction_request.is_some(),
            self.bidder_request.is_some(),
            self.raw_bidder_response.is_some(),
            self.all_processed_bid_responses.is_some(),
            self.auction_response.is_some(),
        ];
        Stage::ALL
            .into_iter()
            .zip(implemented)
            .filter_map(|(stage, set)| set.then_some(stage))
            .collect()
    }

    /// Returns true when no stage hook is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages().is_empty()
    }
}

impl fmt::Debug for ModuleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHooks").field("stages", &self.stages()).finish()
    }
}

// ============================================================================
// SECTION: Stage Slots
// ============================================================================

/// Payload types with a hook slot in [`ModuleHooks`].
pub trait RepositoryStage: StagePayload {
    /// Stage the payload belongs to.
    const STAGE: Stage;

    /// Returns the slot holding this stage's hook.
    fn slot(hooks: &ModuleHooks) -> &Option<Arc<dyn StageHook<Self>>>;

    /// Returns the mutable slot holding this stage's hook.
    fn slot_mut(hooks: &mut ModuleHooks) -> &mut Option<Arc<dyn StageHook<Self>>>;
}

/// Implements [`RepositoryStage`] for a payload and its slot field.
macro_rules! repository_stage {
    ($payload:ty, $stage:expr, $field:ident) => {
        impl RepositoryStage for $payload {
            const STAGE: Stage = $stage;

            fn slot(hooks: &ModuleHooks) -> &Option<Arc<dyn StageHook<Self>>> {
                &hooks.$field
            }

            fn slot_mut(hooks: &mut ModuleHooks) -> &mut Option<Arc<dyn StageHook<Self>>> {
                &mut hooks.$field
            }
        }
    };
}

repository_stage!(EntrypointPayload, Stage::Entrypoint, entrypoint);
repository_stage!(RawAuctionRequestPayload, Stage::RawAuctionRequest, raw_auction_request);
repository_stage!(
    ProcessedAuctionRequestPayload,
    Stage::ProcessedAuctionRequest,
    processed_auction_request
);
repository_stage!(BidderRequestPayload, Stage::BidderRequest, bidder_request);
repository_stage!(RawBidderResponsePayload, Stage::RawBidderResponse, raw_bidder_response);
repository_stage!(
    AllProcessedBidResponsesPayload,
    Stage::AllProcessedBidResponses,
    all_processed_bid_responses
);
repository_stage!(AuctionResponsePayload, Stage::AuctionResponse, auction_response);

// ============================================================================
// SECTION: Repository
// ============================================================================

/// Enabled modules keyed by module code.
#[derive(Debug, Clone, Default)]
pub struct HookRepository {
    /// Registered modules.
    modules: BTreeMap<String, ModuleHooks>,
    /// Candidate modules left unregistered by configuration.
    disabled: BTreeSet<String>,
}

impl HookRepository {
    /// Builds the repository from candidate modules and host configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a candidate code is not of the
    /// form `vendor.module` or a candidate exposes no stage hook.
    pub fn build(
        candidates: BTreeMap<String, ModuleHooks>,
        config: &HooksConfig,
    ) -> Result<Self, ConfigError> {
        let mut repository = Self::default();
        for (module_code, hooks) in candidates {
            let valid_code = module_code
                .split_once('.')
                .is_some_and(|(vendor, module)| !vendor.is_empty() && !module.is_empty());
            if !valid_code {
                return Err(ConfigError::Invalid(format!(
                    "module code must be vendor.module: {module_code}"
                )));
            }
            if hooks.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "hook \"{module_code}\" does not implement any supported hook interface"
                )));
            }
            if config.module_enabled(&module_code) {
                repository.modules.insert(module_code, hooks);
            } else {
                repository.disabled.insert(module_code);
            }
        }
        Ok(repository)
    }

    /// Returns the hook a module registered for payload type `P`.
    #[must_use]
    pub fn hook<P: RepositoryStage>(&self, module_code: &str) -> Option<Arc<dyn StageHook<P>>> {
        self.modules.get(module_code)?.hook::<P>().cloned()
    }

    /// Returns true when the module was offered but not enabled.
    #[must_use]
    pub fn is_disabled(&self, module_code: &str) -> bool {
        self.disabled.contains(module_code)
    }

    /// Returns the codes of modules left disabled.
    #[must_use]
    pub const fn disabled_modules(&self) -> &BTreeSet<String> {
        &self.disabled
    }

    /// Returns the stages each registered module implements.
    #[must_use]
    pub fn module_stages(&self) -> BTreeMap<String, Vec<Stage>> {
        self.modules.iter().map(|(code, hooks)| (code.clone(), hooks.stages())).collect()
    }
}
