//! The reducer interface and the plain composition combinators.

use std::marker::PhantomData;

use crate::collection::KeyedCollection;
use crate::component::ComponentValue;
use crate::effect::Effect;
use crate::for_each::ForEach;
use crate::namespace::NamespaceStack;
use crate::namespaced::{Constant, FromEnvironment, FromState, Namespaced};

/// A unit of state-transition logic.
///
/// `reduce` mutates state in place and describes the effects to run. The
/// namespace stack is threaded through every call so identities read deep
/// inside nested reducers see every namespace pushed on the way down.
pub trait Reducer: Send + Sync {
    type State;
    type Action: Send + 'static;
    type Environment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: &Self::Action,
        env: &Self::Environment,
        namespace: &mut NamespaceStack<'_>,
    ) -> Effect<Self::Action>;
}

// ---------------------------------------------------------------------------
// Reduce: closure-backed reducer
// ---------------------------------------------------------------------------

pub struct Reduce<S, A, E, F> {
    f: F,
    _types: PhantomData<fn() -> (S, A, E)>,
}

impl<S, A, E, F> Reduce<S, A, E, F>
where
    A: Send + 'static,
    F: Fn(&mut S, &A, &E, &mut NamespaceStack<'_>) -> Effect<A> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _types: PhantomData,
        }
    }
}

impl<S, A, E, F> Reducer for Reduce<S, A, E, F>
where
    A: Send + 'static,
    F: Fn(&mut S, &A, &E, &mut NamespaceStack<'_>) -> Effect<A> + Send + Sync,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut S,
        action: &A,
        env: &E,
        namespace: &mut NamespaceStack<'_>,
    ) -> Effect<A> {
        (self.f)(state, action, env, namespace)
    }
}

// ---------------------------------------------------------------------------
// Combine: two reducers in sequence on the same step
// ---------------------------------------------------------------------------

pub struct Combine<R1, R2> {
    first: R1,
    second: R2,
}

impl<R1, R2> Combine<R1, R2> {
    pub fn new(first: R1, second: R2) -> Self {
        Self { first, second }
    }
}

impl<R1, R2> Reducer for Combine<R1, R2>
where
    R1: Reducer,
    R2: Reducer<State = R1::State, Action = R1::Action, Environment = R1::Environment>,
{
    type State = R1::State;
    type Action = R1::Action;
    type Environment = R1::Environment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: &Self::Action,
        env: &Self::Environment,
        namespace: &mut NamespaceStack<'_>,
    ) -> Effect<Self::Action> {
        let first = self.first.reduce(state, action, env, namespace);
        let second = self.second.reduce(state, action, env, namespace);
        first.merge(second)
    }
}

// ---------------------------------------------------------------------------
// Scope: a single child reducer embedded in a parent
// ---------------------------------------------------------------------------

/// Runs a child reducer on one slice of the parent's state.
///
/// Actions the `extract` function does not recognise are ignored. Child
/// effects are mapped back through `embed`. No namespace is pushed; wrap the
/// child with [`ReducerExt::namespaced`] when several instances coexist.
pub struct Scope<S, A, E, R, L, X, M, V> {
    child: R,
    state: L,
    extract: X,
    embed: M,
    environment: V,
    _parent: PhantomData<fn() -> (S, A, E)>,
}

impl<S, A, E, R, L, X, M, V> Scope<S, A, E, R, L, X, M, V>
where
    A: Send + 'static,
    R: Reducer,
    L: Fn(&mut S) -> &mut R::State + Send + Sync,
    X: Fn(&A) -> Option<R::Action> + Send + Sync,
    M: Fn(R::Action) -> A + Clone + Send + Sync + 'static,
    V: Fn(&E) -> R::Environment + Send + Sync,
{
    pub fn new(state: L, extract: X, embed: M, environment: V, child: R) -> Self {
        Self {
            child,
            state,
            extract,
            embed,
            environment,
            _parent: PhantomData,
        }
    }
}

impl<S, A, E, R, L, X, M, V> Reducer for Scope<S, A, E, R, L, X, M, V>
where
    A: Send + 'static,
    R: Reducer,
    L: Fn(&mut S) -> &mut R::State + Send + Sync,
    X: Fn(&A) -> Option<R::Action> + Send + Sync,
    M: Fn(R::Action) -> A + Clone + Send + Sync + 'static,
    V: Fn(&E) -> R::Environment + Send + Sync,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut S,
        action: &A,
        env: &E,
        namespace: &mut NamespaceStack<'_>,
    ) -> Effect<A> {
        let Some(child_action) = (self.extract)(action) else {
            return Effect::none();
        };
        let child_env = (self.environment)(env);
        self.child
            .reduce((self.state)(state), &child_action, &child_env, namespace)
            .map(self.embed.clone())
    }
}

// ---------------------------------------------------------------------------
// ReducerExt
// ---------------------------------------------------------------------------

pub trait ReducerExt: Reducer + Sized {
    /// Run under a fixed namespace component.
    fn namespaced(self, component: impl ComponentValue) -> Namespaced<Self, Constant> {
        Namespaced::constant(self, component)
    }

    /// Run under a component computed from the pre-invocation state.
    fn namespaced_by_state<K, F>(self, f: F) -> Namespaced<Self, FromState<F, K>>
    where
        K: ComponentValue,
        F: Fn(&Self::State) -> K + Send + Sync,
    {
        Namespaced::from_state(self, f)
    }

    /// Run under a component computed from the environment.
    fn namespaced_by_environment<K, F>(self, f: F) -> Namespaced<Self, FromEnvironment<F, K>>
    where
        K: ComponentValue,
        F: Fn(&Self::Environment) -> K + Send + Sync,
    {
        Namespaced::from_environment(self, f)
    }

    /// Run `self`, then `other`, on every step.
    fn combine<R>(self, other: R) -> Combine<Self, R>
    where
        R: Reducer<State = Self::State, Action = Self::Action, Environment = Self::Environment>,
    {
        Combine::new(self, other)
    }

    /// Run `element` on the collection entry an action is addressed to,
    /// namespaced by that entry's key, before `self` runs.
    fn for_each<R, C, L, X, M, V>(
        self,
        collection: L,
        extract: X,
        embed: M,
        environment: V,
        element: R,
    ) -> ForEach<Self, R, C, L, X, M, V>
    where
        R: Reducer,
        C: KeyedCollection<Element = R::State>,
        L: Fn(&mut Self::State) -> &mut C + Send + Sync,
        X: Fn(&Self::Action) -> Option<(C::Key, R::Action)> + Send + Sync,
        M: Fn(C::Key, R::Action) -> Self::Action + Clone + Send + Sync + 'static,
        V: Fn(&Self::Environment) -> R::Environment + Send + Sync,
    {
        ForEach::new(self, collection, extract, embed, environment, element)
    }
}

impl<R: Reducer> ReducerExt for R {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Parent {
        child: i64,
        log: Vec<&'static str>,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum ParentAction {
        Child(i64),
        Note,
    }

    fn adder() -> impl Reducer<State = i64, Action = i64, Environment = i64> {
        Reduce::new(|state: &mut i64, action: &i64, step: &i64, _: &mut NamespaceStack<'_>| {
            *state += action * step;
            Effect::none()
        })
    }

    #[test]
    fn closure_reducer_mutates_state() {
        let mut state = 1;
        let effect = adder().reduce(&mut state, &2, &10, &mut NamespaceStack::detached());
        assert_eq!(state, 21);
        assert!(effect.is_none());
    }

    #[test]
    fn combine_runs_in_order() {
        let first = Reduce::new(|s: &mut Vec<u8>, _: &(), _: &(), _: &mut NamespaceStack<'_>| {
            s.push(1);
            Effect::none()
        });
        let second = Reduce::new(|s: &mut Vec<u8>, _: &(), _: &(), _: &mut NamespaceStack<'_>| {
            s.push(2);
            Effect::none()
        });
        let mut state = Vec::new();
        first
            .combine(second)
            .reduce(&mut state, &(), &(), &mut NamespaceStack::detached());
        assert_eq!(state, vec![1, 2]);
    }

    #[test]
    fn scope_routes_matching_actions_to_child() {
        let scoped = Scope::new(
            |p: &mut Parent| &mut p.child,
            |a: &ParentAction| match a {
                ParentAction::Child(n) => Some(*n),
                ParentAction::Note => None,
            },
            ParentAction::Child,
            |_: &()| 3,
            adder(),
        );
        let note = Reduce::new(
            |p: &mut Parent, a: &ParentAction, _: &(), _: &mut NamespaceStack<'_>| {
                if *a == ParentAction::Note {
                    p.log.push("note");
                }
                Effect::none()
            },
        );
        let reducer = scoped.combine(note);

        let mut state = Parent::default();
        let mut stack = NamespaceStack::detached();
        reducer.reduce(&mut state, &ParentAction::Child(2), &(), &mut stack);
        reducer.reduce(&mut state, &ParentAction::Note, &(), &mut stack);

        assert_eq!(state.child, 6);
        assert_eq!(state.log, vec!["note"]);
    }

    #[test]
    fn scope_maps_child_effects_into_parent_actions() {
        let echo = Reduce::new(|_: &mut i64, a: &i64, _: &(), _: &mut NamespaceStack<'_>| {
            Effect::send(*a + 1)
        });
        let scoped = Scope::new(
            |p: &mut Parent| &mut p.child,
            |a: &ParentAction| match a {
                ParentAction::Child(n) => Some(*n),
                ParentAction::Note => None,
            },
            ParentAction::Child,
            |_: &()| (),
            echo,
        );
        let mut state = Parent::default();
        let effect = scoped.reduce(
            &mut state,
            &ParentAction::Child(4),
            &(),
            &mut NamespaceStack::detached(),
        );
        assert!(matches!(effect, Effect::Send(ParentAction::Child(5))));
    }
}
