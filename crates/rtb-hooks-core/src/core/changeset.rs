// crates/rtb-hooks-core/src/core/changeset.rs
// ============================================================================
// Module: RTB Hooks Change Sets
// Description: Ordered, attributable payload mutations declared by hooks.
// Purpose: Let hooks describe changes without touching the shared payload.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Hooks never mutate the payload they are handed. Instead they return a
//! [`ChangeSet`] of [`Mutation`]s which the engine applies after the whole
//! group has reported, in hook declaration order and then in the order the
//! mutations were added.
//! Invariants:
//! - A mutation only sees the payload value passed to it.
//! - A failed mutation leaves the payload as it was before that mutation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Mutation Types
// ============================================================================

/// Kind of change a mutation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationType {
    /// Adds a value that was not present.
    Add,
    /// Replaces an existing value.
    Update,
    /// Removes a value.
    Delete,
}

impl MutationType {
    /// Returns a stable label for the mutation type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for MutationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a mutation that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MutationError(String);

impl MutationError {
    /// Creates a mutation error with the provided message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

// ============================================================================
// SECTION: Mutation
// ============================================================================

/// Boxed mutation function.
pub type MutationFn<P> = Box<dyn FnOnce(P) -> Result<P, MutationError> + Send>;

/// Single payload mutation declared by a hook.
pub struct Mutation<P> {
    /// Function producing the mutated payload.
    apply: MutationFn<P>,
    /// Kind of change.
    mutation_type: MutationType,
    /// Path segments identifying the changed value.
    key: Vec<String>,
}

impl<P> Mutation<P> {
    /// Creates a new mutation.
    #[must_use]
    pub fn new<F>(apply: F, mutation_type: MutationType, key: Vec<String>) -> Self
    where
        F: FnOnce(P) -> Result<P, MutationError> + Send + 'static,
    {
        Self {
            apply: Box::new(apply),
            mutation_type,
            key,
        }
    }

    /// Returns the mutation type.
    #[must_use]
    pub const fn mutation_type(&self) -> MutationType {
        self.mutation_type
    }

    /// Returns the key path segments.
    #[must_use]
    pub fn key(&self) -> &[String] {
        &self.key
    }

    /// Returns the dotted key path.
    #[must_use]
    pub fn key_path(&self) -> String {
        self.key.join(".")
    }

    /// Applies the mutation, consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError`] when the mutation cannot be applied.
    pub fn apply(self, payload: P) -> Result<P, MutationError> {
        (self.apply)(payload)
    }
}

impl<P> fmt::Debug for Mutation<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutation")
            .field("mutation_type", &self.mutation_type)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Change Set
// ============================================================================

/// Ordered list of mutations returned by one hook invocation.
pub struct ChangeSet<P> {
    /// Mutations in declaration order.
    mutations: Vec<Mutation<P>>,
}

impl<P> ChangeSet<P> {
    /// Creates an empty change set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mutations: Vec::new(),
        }
    }

    /// Appends a mutation keyed by the provided path segments.
    pub fn add_mutation<F, I, S>(
        &mut self,
        apply: F,
        mutation_type: MutationType,
        key: I,
    ) -> &mut Self
    where
        F: FnOnce(P) -> Result<P, MutationError> + Send + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key = key.into_iter().map(Into::into).collect();
        self.mutations.push(Mutation::new(apply, mutation_type, key));
        self
    }

    /// Returns the mutations in declaration order.
    #[must_use]
    pub fn mutations(&self) -> &[Mutation<P>] {
        &self.mutations
    }

    /// Returns the number of mutations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// Returns true when the change set declares no mutations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Consumes the change set, yielding its mutations in order.
    #[must_use]
    pub fn into_mutations(self) -> Vec<Mutation<P>> {
        self.mutations
    }
}

impl<P> Default for ChangeSet<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for ChangeSet<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.mutations).finish()
    }
}
