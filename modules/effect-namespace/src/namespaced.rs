//! The namespace combinator.
//!
//! Wraps a reducer so each invocation runs with one more component on the
//! namespace stack. The component can be a constant, or computed once per
//! invocation from the state (before the wrapped reducer runs) or from the
//! environment. The push happens before delegating and is released on every
//! way out, including unwinding.
//!
//! The component must stay the same for the lifetime of the instance it
//! identifies. A component that changes between the step that starts an
//! effect and the step that cancels it produces a different token, and the
//! cancel silently misses.

use std::marker::PhantomData;

use crate::component::{ComponentValue, NamespaceComponent};
use crate::effect::Effect;
use crate::namespace::NamespaceStack;
use crate::reducer::Reducer;

/// Where a [`Namespaced`] reducer gets its component from.
pub trait ComponentSource<S, E>: Send + Sync {
    fn component(&self, state: &S, env: &E) -> NamespaceComponent;
}

pub struct Constant(NamespaceComponent);

impl<S, E> ComponentSource<S, E> for Constant {
    fn component(&self, _state: &S, _env: &E) -> NamespaceComponent {
        self.0.clone()
    }
}

pub struct FromState<F, K> {
    f: F,
    _key: PhantomData<fn() -> K>,
}

impl<S, E, F, K> ComponentSource<S, E> for FromState<F, K>
where
    F: Fn(&S) -> K + Send + Sync,
    K: ComponentValue,
{
    fn component(&self, state: &S, _env: &E) -> NamespaceComponent {
        NamespaceComponent::new((self.f)(state))
    }
}

pub struct FromEnvironment<F, K> {
    f: F,
    _key: PhantomData<fn() -> K>,
}

impl<S, E, F, K> ComponentSource<S, E> for FromEnvironment<F, K>
where
    F: Fn(&E) -> K + Send + Sync,
    K: ComponentValue,
{
    fn component(&self, _state: &S, env: &E) -> NamespaceComponent {
        NamespaceComponent::new((self.f)(env))
    }
}

pub struct Namespaced<R, C> {
    inner: R,
    source: C,
}

impl<R: Reducer> Namespaced<R, Constant> {
    pub fn constant(inner: R, component: impl ComponentValue) -> Self {
        Self {
            inner,
            source: Constant(NamespaceComponent::new(component)),
        }
    }
}

impl<R: Reducer, F, K> Namespaced<R, FromState<F, K>>
where
    F: Fn(&R::State) -> K + Send + Sync,
    K: ComponentValue,
{
    pub fn from_state(inner: R, f: F) -> Self {
        Self {
            inner,
            source: FromState { f, _key: PhantomData },
        }
    }
}

impl<R: Reducer, F, K> Namespaced<R, FromEnvironment<F, K>>
where
    F: Fn(&R::Environment) -> K + Send + Sync,
    K: ComponentValue,
{
    pub fn from_environment(inner: R, f: F) -> Self {
        Self {
            inner,
            source: FromEnvironment { f, _key: PhantomData },
        }
    }
}

impl<R, C> Reducer for Namespaced<R, C>
where
    R: Reducer,
    C: ComponentSource<R::State, R::Environment>,
{
    type State = R::State;
    type Action = R::Action;
    type Environment = R::Environment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: &Self::Action,
        env: &Self::Environment,
        namespace: &mut NamespaceStack<'_>,
    ) -> Effect<Self::Action> {
        let component = self.source.component(state, env);
        let mut scope = namespace.enter(component);
        self.inner.reduce(state, action, env, &mut scope)
    }
}
