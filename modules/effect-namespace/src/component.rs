//! Type-erased, comparable namespace components.
//!
//! A component is whatever a caller pushes to tell two reducer instances
//! apart: a document id, a collection key, a constant label. The namespace
//! machinery only needs to compare and hash them, so they are stored behind
//! `dyn ComponentValue` and compared by concrete type first, value second.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Values that can live in a namespace or seed an identity.
///
/// Blanket-implemented for every `Eq + Hash + Debug + Send + Sync + 'static`
/// type, so callers never implement it by hand.
pub trait ComponentValue: Any + fmt::Debug + Send + Sync {
    fn dyn_eq(&self, other: &dyn ComponentValue) -> bool;
    fn dyn_hash(&self, state: &mut dyn Hasher);
    fn as_any(&self) -> &dyn Any;
}

impl<T> ComponentValue for T
where
    T: Any + fmt::Debug + Eq + Hash + Send + Sync,
{
    fn dyn_eq(&self, other: &dyn ComponentValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A [`ComponentValue`] usable as a collection key: the concrete type's own
/// `Eq`, `Hash` and `Clone` stay visible to generic code.
pub trait ComponentKey: ComponentValue + Clone + Eq + Hash {}

impl<T> ComponentKey for T where T: ComponentValue + Clone + Eq + Hash {}

/// One opaque entry of a namespace.
#[derive(Clone)]
pub struct NamespaceComponent(Arc<dyn ComponentValue>);

impl NamespaceComponent {
    /// Wrap a value. Wrapping an existing component returns a clone of it
    /// rather than nesting, so `new(new(x)) == new(x)`.
    pub fn new<T: ComponentValue>(value: T) -> Self {
        if let Some(existing) = (&value as &dyn Any).downcast_ref::<NamespaceComponent>() {
            return existing.clone();
        }
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// `TypeId` of the wrapped value (not of the wrapper).
    pub fn value_type_id(&self) -> TypeId {
        self.0.as_any().type_id()
    }
}

impl PartialEq for NamespaceComponent {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.dyn_eq(&*other.0)
    }
}

impl Eq for NamespaceComponent {}

impl Hash for NamespaceComponent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value_type_id().hash(state);
        self.0.dyn_hash(state);
    }
}

impl fmt::Debug for NamespaceComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}
