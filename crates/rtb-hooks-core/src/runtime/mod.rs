// crates/rtb-hooks-core/src/runtime/mod.rs
// ============================================================================
// Module: RTB Hooks Runtime
// Description: Stage, group, and hook execution plus the executor facade.
// Purpose: Run execution plans under timeout, ordering, and rejection rules.
// Dependencies: tokio, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The runtime is written once over [`crate::core::StagePayload`]. The
//! [`HookExecutor`] facade is the only entry point hosts need; the lower
//! executors are public for hosts that build their own facade.

pub mod abtest;
pub mod activity;
pub mod context;
pub mod executor;
pub mod group;
pub mod invoker;
pub mod mutation;
pub mod stage;

pub use abtest::AbDecision;
pub use abtest::AbTestConfig;
pub use abtest::AbTestDecisions;
pub use abtest::AbTestGate;
pub use abtest::Roller;
pub use context::ModuleContextStore;
pub use context::StageContext;
pub use executor::HookExecutor;
pub use group::GroupExecution;
pub use group::MAX_GROUP_DEADLINE;
pub use group::execute_group;
pub use invoker::HookResponse;
pub use invoker::invoke_hook;
pub use mutation::process_hook_responses;
pub use stage::StageExecution;
pub use stage::execute_stage;
