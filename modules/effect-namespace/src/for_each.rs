//! The collection namespacing combinator.
//!
//! Lifts an element reducer into a parent reducer over a keyed collection.
//! Each element invocation runs namespaced by its key, so identities declared
//! in the element reducer are distinct per element without the element
//! knowing it lives in a collection.

use std::any::type_name;
use std::marker::PhantomData;

use tracing::warn;

use crate::collection::KeyedCollection;
use crate::effect::Effect;
use crate::namespace::NamespaceStack;
use crate::reducer::Reducer;

/// Built with [`ReducerExt::for_each`](crate::ReducerExt::for_each).
///
/// On each step the element reducer runs first, then the parent. A parent
/// that removes or reorders elements in response to an element action
/// therefore never hides the element from its own reducer.
pub struct ForEach<P, R, C, L, X, M, V> {
    parent: P,
    element: R,
    collection: L,
    extract: X,
    embed: M,
    environment: V,
    _collection: PhantomData<fn() -> C>,
}

impl<P, R, C, L, X, M, V> ForEach<P, R, C, L, X, M, V>
where
    P: Reducer,
    R: Reducer,
    C: KeyedCollection<Element = R::State>,
    L: Fn(&mut P::State) -> &mut C + Send + Sync,
    X: Fn(&P::Action) -> Option<(C::Key, R::Action)> + Send + Sync,
    M: Fn(C::Key, R::Action) -> P::Action + Clone + Send + Sync + 'static,
    V: Fn(&P::Environment) -> R::Environment + Send + Sync,
{
    pub fn new(parent: P, collection: L, extract: X, embed: M, environment: V, element: R) -> Self {
        Self {
            parent,
            element,
            collection,
            extract,
            embed,
            environment,
            _collection: PhantomData,
        }
    }

    fn reduce_element(
        &self,
        state: &mut P::State,
        action: &P::Action,
        env: &P::Environment,
        namespace: &mut NamespaceStack<'_>,
    ) -> Effect<P::Action> {
        let Some((key, element_action)) = (self.extract)(action) else {
            return Effect::none();
        };

        let Some(element) = (self.collection)(state).element_mut(&key) else {
            warn!(
                collection = type_name::<C>(),
                key = ?key,
                "for_each received an action for a missing element. This usually means an \
                 effect kept emitting after its element was removed (cancel it on removal), \
                 the element was removed by a reducer that ran before this one (run for_each \
                 first), or a stale action was sent for a key that no longer exists"
            );
            return Effect::none();
        };

        let element_env = (self.environment)(env);
        let effect = {
            let mut scope = namespace.enter(key.clone());
            self.element.reduce(element, &element_action, &element_env, &mut scope)
        };

        let embed = self.embed.clone();
        effect.map(move |action| embed(key.clone(), action))
    }
}

impl<P, R, C, L, X, M, V> Reducer for ForEach<P, R, C, L, X, M, V>
where
    P: Reducer,
    R: Reducer,
    C: KeyedCollection<Element = R::State>,
    L: Fn(&mut P::State) -> &mut C + Send + Sync,
    X: Fn(&P::Action) -> Option<(C::Key, R::Action)> + Send + Sync,
    M: Fn(C::Key, R::Action) -> P::Action + Clone + Send + Sync + 'static,
    V: Fn(&P::Environment) -> R::Environment + Send + Sync,
{
    type State = P::State;
    type Action = P::Action;
    type Environment = P::Environment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: &Self::Action,
        env: &Self::Environment,
        namespace: &mut NamespaceStack<'_>,
    ) -> Effect<Self::Action> {
        let element_effect = self.reduce_element(state, action, env, namespace);
        let parent_effect = self.parent.reduce(state, action, env, namespace);
        element_effect.merge(parent_effect)
    }
}
