//! Deterministic reference runtime for namespaced reducers.
//!
//! A [`Store`] runs a reducer tree on a [`NamespaceContext`](effect_namespace::NamespaceContext),
//! executes the effects it returns and cancels operations by token. Operations
//! advance only when [`Store::tick`] is called.

pub mod registry;
pub mod store;

pub use registry::OperationRegistry;
pub use store::Store;
