//! Namespace snapshots and the stack handle threaded through reducers.
//!
//! `NamespaceStack` is the explicit context every reducer receives. It is
//! backed either by a detached owned vector or by one of the two stacks of a
//! [`NamespaceContext`]. Mutation goes through [`NamespaceStack::enter`], which
//! returns a guard that releases the pushed component on every exit path.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::ReentrantMutexGuard;

use crate::component::{ComponentValue, NamespaceComponent};
use crate::context::{NamespaceContext, SharedStack};

// ---------------------------------------------------------------------------
// Namespace (snapshot)
// ---------------------------------------------------------------------------

/// A point-in-time copy of a namespace stack. Compared as an ordered sequence.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Namespace(Arc<[NamespaceComponent]>);

impl Namespace {
    pub fn new() -> Self {
        Self(Arc::from(Vec::new()))
    }

    pub fn components(&self) -> &[NamespaceComponent] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NamespaceComponent> {
        self.0.iter()
    }

    /// A new namespace with `component` appended. `self` is left untouched.
    pub fn child(&self, component: impl ComponentValue) -> Self {
        let mut components = self.0.to_vec();
        components.push(NamespaceComponent::new(component));
        Self(Arc::from(components))
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&[NamespaceComponent]> for Namespace {
    fn from(components: &[NamespaceComponent]) -> Self {
        Self(Arc::from(components))
    }
}

impl From<Vec<NamespaceComponent>> for Namespace {
    fn from(components: Vec<NamespaceComponent>) -> Self {
        Self(Arc::from(components))
    }
}

impl FromIterator<NamespaceComponent> for Namespace {
    fn from_iter<I: IntoIterator<Item = NamespaceComponent>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Namespace {
    type Item = &'a NamespaceComponent;
    type IntoIter = std::slice::Iter<'a, NamespaceComponent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

// ---------------------------------------------------------------------------
// NamespaceStack
// ---------------------------------------------------------------------------

enum Slot<'a> {
    Detached(Vec<NamespaceComponent>),
    /// Thread-local stack of the affinity thread. The marker keeps the handle
    /// on the thread that opened it.
    Affinity(&'a NamespaceContext, PhantomData<*const ()>),
    /// Shared stack, locked for as long as this handle lives.
    Shared(&'a NamespaceContext, ReentrantMutexGuard<'a, SharedStack>),
}

/// Mutable namespace context for one reducer step.
pub struct NamespaceStack<'a> {
    slot: Slot<'a>,
}

impl NamespaceStack<'static> {
    /// A stack owned by the caller, with no process-wide state behind it.
    pub fn detached() -> Self {
        Self {
            slot: Slot::Detached(Vec::new()),
        }
    }

    /// A detached stack starting from an existing namespace.
    pub fn detached_from(namespace: &Namespace) -> Self {
        Self {
            slot: Slot::Detached(namespace.components().to_vec()),
        }
    }
}

impl<'a> NamespaceStack<'a> {
    pub(crate) fn affinity(context: &'a NamespaceContext) -> Self {
        Self {
            slot: Slot::Affinity(context, PhantomData),
        }
    }

    pub(crate) fn shared(
        context: &'a NamespaceContext,
        guard: ReentrantMutexGuard<'a, SharedStack>,
    ) -> Self {
        Self {
            slot: Slot::Shared(context, guard),
        }
    }

    /// The context backing this stack, if any.
    pub fn context(&self) -> Option<&'a NamespaceContext> {
        match &self.slot {
            Slot::Detached(_) => None,
            Slot::Affinity(context, _) | Slot::Shared(context, _) => Some(*context),
        }
    }

    /// Push one component. Prefer [`enter`](Self::enter), which pops for you.
    pub fn push(&mut self, component: impl ComponentValue) {
        let component = NamespaceComponent::new(component);
        self.write(|components| components.push(component));
        if let Some(context) = self.context() {
            context.note_namespaced();
        }
    }

    /// Remove the most recently pushed component.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty: a pop without a matching push means the
    /// caller broke stack discipline, which is not recoverable.
    pub fn pop(&mut self) -> NamespaceComponent {
        match self.write(Vec::pop) {
            Some(component) => component,
            None => panic!("namespace stack popped without a matching push"),
        }
    }

    pub fn len(&self) -> usize {
        self.read(|components| components.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current contents. Later pushes and pops do not affect it.
    pub fn snapshot(&self) -> Namespace {
        self.read(|components| Namespace::from(components))
    }

    /// Push `component` for the lifetime of the returned guard.
    ///
    /// The guard dereferences to this stack, so nested reducers take
    /// `&mut guard`. Dropping it (including during unwinding) truncates the
    /// stack back to the depth it had before the push.
    pub fn enter(&mut self, component: impl ComponentValue) -> NamespaceGuard<'_, 'a> {
        let depth = self.len();
        self.push(component);
        NamespaceGuard { stack: self, depth }
    }

    fn truncate(&mut self, depth: usize) {
        self.write(|components| components.truncate(depth));
    }

    fn read<R>(&self, f: impl FnOnce(&[NamespaceComponent]) -> R) -> R {
        match &self.slot {
            Slot::Detached(components) => f(components),
            Slot::Affinity(context, _) => context.with_affinity_stack(|components| f(components)),
            Slot::Shared(_, guard) => f(&guard.borrow()),
        }
    }

    fn write<R>(&mut self, f: impl FnOnce(&mut Vec<NamespaceComponent>) -> R) -> R {
        match &mut self.slot {
            Slot::Detached(components) => f(components),
            Slot::Affinity(context, _) => context.with_affinity_stack(f),
            Slot::Shared(_, guard) => f(&mut guard.borrow_mut()),
        }
    }
}

impl fmt::Debug for NamespaceStack<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backing = match &self.slot {
            Slot::Detached(_) => "detached",
            Slot::Affinity(..) => "affinity",
            Slot::Shared(..) => "shared",
        };
        f.debug_struct("NamespaceStack")
            .field("backing", &backing)
            .field("components", &self.snapshot())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// NamespaceGuard
// ---------------------------------------------------------------------------

/// Scoped push onto a [`NamespaceStack`]. Released on drop.
pub struct NamespaceGuard<'s, 'a> {
    stack: &'s mut NamespaceStack<'a>,
    depth: usize,
}

impl<'a> Deref for NamespaceGuard<'_, 'a> {
    type Target = NamespaceStack<'a>;

    fn deref(&self) -> &Self::Target {
        &*self.stack
    }
}

impl DerefMut for NamespaceGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.stack
    }
}

impl Drop for NamespaceGuard<'_, '_> {
    fn drop(&mut self) {
        self.stack.truncate(self.depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn names(namespace: &Namespace) -> Vec<&'static str> {
        namespace
            .iter()
            .map(|c| *c.downcast_ref::<&str>().expect("test components are &str"))
            .collect()
    }

    #[test]
    fn guard_pushes_and_releases() {
        let mut stack = NamespaceStack::detached();
        {
            let guard = stack.enter("doc");
            assert_eq!(names(&guard.snapshot()), vec!["doc"]);
        }
        assert!(stack.is_empty());
    }

    #[test]
    fn nested_guards_accumulate_outer_to_inner() {
        let mut stack = NamespaceStack::detached();
        let mut outer = stack.enter("outer");
        let inner = outer.enter("inner");
        assert_eq!(names(&inner.snapshot()), vec!["outer", "inner"]);
    }

    #[test]
    fn guard_releases_on_unwind() {
        let mut stack = NamespaceStack::detached();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _guard = stack.enter("doomed");
            panic!("reducer blew up");
        }));
        assert!(result.is_err());
        assert!(stack.is_empty());
    }

    #[test]
    fn guard_truncates_leaked_raw_pushes() {
        let mut stack = NamespaceStack::detached();
        {
            let mut guard = stack.enter("scope");
            guard.push("leaked");
        }
        assert!(stack.is_empty());
    }

    #[test]
    #[should_panic(expected = "without a matching push")]
    fn pop_on_empty_stack_is_fatal() {
        NamespaceStack::detached().pop();
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut stack = NamespaceStack::detached();
        stack.push("a");
        let before = stack.snapshot();
        stack.push("b");
        assert_eq!(names(&before), vec!["a"]);
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn child_leaves_parent_untouched() {
        let root = Namespace::new().child("a");
        let child = root.child("b");
        assert_eq!(names(&root), vec!["a"]);
        assert_eq!(names(&child), vec!["a", "b"]);
    }

    #[test]
    fn detached_from_starts_at_the_given_namespace() {
        let base = Namespace::new().child("root");
        let mut stack = NamespaceStack::detached_from(&base);
        let guard = stack.enter("leaf");
        assert_eq!(names(&guard.snapshot()), vec!["root", "leaf"]);
    }

    #[test]
    fn namespace_equality_is_order_sensitive() {
        let xy = Namespace::new().child("x").child("y");
        let yx = Namespace::new().child("y").child("x");
        assert_ne!(xy, yx);
        assert_eq!(xy, Namespace::new().child("x").child("y"));
    }
}
