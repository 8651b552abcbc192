//! The dispatch loop.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use effect_namespace::{Effect, IdentityToken, NamespaceContext, Reducer};
use tracing::{debug, trace};

use crate::registry::OperationRegistry;

/// Owns a reducer tree, its state and its in-flight operations.
///
/// Time only advances on [`tick`](Self::tick): every running operation is
/// stepped once and the actions it yields are dispatched. That keeps runs
/// deterministic, which is what tests of cancellation need.
pub struct Store<R: Reducer> {
    reducer: R,
    state: R::State,
    environment: R::Environment,
    context: Arc<NamespaceContext>,
    registry: OperationRegistry<R::Action>,
}

impl<R: Reducer> Store<R> {
    /// A store on the process-wide namespace context.
    pub fn new(reducer: R, state: R::State, environment: R::Environment) -> Self {
        Self::with_context(reducer, state, environment, NamespaceContext::global())
    }

    pub fn with_context(
        reducer: R,
        state: R::State,
        environment: R::Environment,
        context: Arc<NamespaceContext>,
    ) -> Self {
        Self {
            reducer,
            state,
            environment,
            context,
            registry: OperationRegistry::new(),
        }
    }

    /// Dispatch `action`, then every action fed back by `Send` effects, until
    /// the queue is empty.
    pub fn send(&mut self, action: R::Action) {
        self.dispatch(VecDeque::from([action]));
    }

    /// Step every running operation once and dispatch what they yield, in
    /// start order. Returns the number of actions yielded.
    pub fn tick(&mut self) -> usize {
        if self.registry.is_empty() {
            return 0;
        }
        let emitted = self.registry.step_all();
        let count = emitted.len();
        trace!(count, running = self.registry.len(), "Tick");
        self.dispatch(emitted.into());
        count
    }

    pub fn state(&self) -> &R::State {
        &self.state
    }

    pub fn is_running(&self, id: &IdentityToken) -> bool {
        self.registry.is_running(id)
    }

    /// Tokens of the running operations, in start order.
    pub fn running(&self) -> Vec<IdentityToken> {
        self.registry.running().cloned().collect()
    }

    pub fn running_count(&self) -> usize {
        self.registry.len()
    }

    fn dispatch(&mut self, mut queue: VecDeque<R::Action>) {
        while let Some(action) = queue.pop_front() {
            // Hold the stack only while the reducer runs.
            let effect = {
                let mut namespace = self.context.enter();
                self.reducer
                    .reduce(&mut self.state, &action, &self.environment, &mut namespace)
            };
            self.apply(effect, &mut queue);
        }
    }

    fn apply(&mut self, effect: Effect<R::Action>, queue: &mut VecDeque<R::Action>) {
        match effect {
            Effect::None => {}
            Effect::Send(action) => queue.push_back(action),
            Effect::Run {
                id,
                cancel_in_flight,
                operation,
            } => {
                if cancel_in_flight {
                    self.registry.cancel(&id);
                }
                self.registry.start(id, operation);
            }
            Effect::Cancel(id) => {
                if self.registry.cancel(&id) == 0 {
                    debug!(id = %id, "Cancel matched no running operation");
                }
            }
            Effect::Batch(effects) => {
                for effect in effects {
                    self.apply(effect, queue);
                }
            }
        }
    }
}

impl<R> fmt::Debug for Store<R>
where
    R: Reducer,
    R::State: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("running", &self.running())
            .finish_non_exhaustive()
    }
}
