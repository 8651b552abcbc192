//! Namespaced identities for cancellable reducer effects.
//!
//! Reducers start long-running effects under an identity and later cancel
//! them by the same identity. When one reducer is instantiated several times
//! in a process (one per document, per tab, per row) those identities would
//! collide. This crate threads a namespace stack through every reducer call:
//! [`ReducerExt::namespaced`] and [`ReducerExt::for_each`] push a component
//! for the duration of the wrapped call, and [`Identity::read`] folds the
//! current namespace into the token it produces.

pub mod collection;
pub mod component;
pub mod config;
pub mod context;
pub mod effect;
pub mod error;
pub mod for_each;
pub mod identity;
pub mod namespace;
pub mod namespaced;
pub mod reducer;

pub use collection::{Identifiable, IdentifiedVec, KeyedCollection, KeyedVec};
pub use component::{ComponentKey, ComponentValue, NamespaceComponent};
pub use config::{load_config, NamespaceConfig, Sharding};
pub use context::NamespaceContext;
pub use effect::{Effect, Operation};
pub use error::NamespaceError;
pub use for_each::ForEach;
pub use identity::{DeclarationSite, Identity, IdentityToken};
pub use namespace::{Namespace, NamespaceGuard, NamespaceStack};
pub use namespaced::{ComponentSource, Namespaced};
pub use reducer::{Combine, Reduce, Reducer, ReducerExt, Scope};
