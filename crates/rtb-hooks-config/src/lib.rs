// crates/rtb-hooks-config/src/lib.rs
// ============================================================================
// Module: RTB Hooks Config Library
// Description: Canonical hooks config model, validation, and plan resolution.
// Purpose: Single source of truth for rtb-hooks.toml semantics.
// Dependencies: rtb-hooks-core, serde, serde_json, toml
// ============================================================================

//! ## Overview
//! `rtb-hooks-config` defines the host configuration for hook execution. It
//! loads and validates `rtb-hooks.toml`, registers enabled modules in a
//! [`HookRepository`], and resolves configured execution plans for the
//! runtime through [`ConfiguredPlanBuilder`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod builder;
pub mod config;
pub mod repository;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use builder::ConfiguredPlanBuilder;
pub use builder::ab_test_gate_from_config;
pub use builder::log_sink_from_config;
pub use builder::plan_builder_from_config;
pub use config::*;
pub use repository::HookRepository;
pub use repository::ModuleHooks;
pub use repository::RepositoryStage;
