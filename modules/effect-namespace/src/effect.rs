//! Effect descriptions returned by reducers.
//!
//! These only describe work. Running, ticking and cancelling operations is
//! the job of whatever runtime hosts the reducers; this crate just makes sure
//! the tokens they carry are namespaced correctly.

use std::fmt;
use std::sync::Arc;

use crate::identity::IdentityToken;

type Mapper<A, B> = Arc<dyn Fn(A) -> B + Send + Sync>;

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A long-running operation, stepped by a runtime. Each step yields the next
/// action, or `None` once the operation has finished.
pub struct Operation<A> {
    step: Box<dyn FnMut() -> Option<A> + Send>,
}

impl<A: Send + 'static> Operation<A> {
    pub fn new(step: impl FnMut() -> Option<A> + Send + 'static) -> Self {
        Self {
            step: Box::new(step),
        }
    }

    /// Timer-like operation: emits `action()` on every step, forever.
    pub fn repeating(action: impl Fn() -> A + Send + 'static) -> Self {
        Self::new(move || Some(action()))
    }

    /// Emits `action` once, then finishes.
    pub fn once(action: A) -> Self {
        let mut action = Some(action);
        Self::new(move || action.take())
    }

    pub fn step(&mut self) -> Option<A> {
        (self.step)()
    }

    pub fn map<B: Send + 'static>(
        self,
        f: impl Fn(A) -> B + Send + Sync + 'static,
    ) -> Operation<B> {
        self.map_shared(Arc::new(f))
    }

    fn map_shared<B: Send + 'static>(mut self, f: Mapper<A, B>) -> Operation<B> {
        Operation::new(move || self.step().map(|action| f(action)))
    }
}

impl<A> fmt::Debug for Operation<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Operation(..)")
    }
}

// ---------------------------------------------------------------------------
// Effect
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum Effect<A> {
    None,
    /// Feed an action straight back into the runtime.
    Send(A),
    /// Start `operation` under `id`. With `cancel_in_flight`, operations
    /// already running under an equal token are cancelled first.
    Run {
        id: IdentityToken,
        cancel_in_flight: bool,
        operation: Operation<A>,
    },
    /// Cancel every operation running under an equal token.
    Cancel(IdentityToken),
    Batch(Vec<Effect<A>>),
}

impl<A> Effect<A> {
    pub fn none() -> Self {
        Self::None
    }

    pub fn send(action: A) -> Self {
        Self::Send(action)
    }

    pub fn run(id: IdentityToken, operation: Operation<A>) -> Self {
        Self::Run {
            id,
            cancel_in_flight: false,
            operation,
        }
    }

    pub fn cancel(id: IdentityToken) -> Self {
        Self::Cancel(id)
    }

    /// Mark a `Run` (or every `Run` in a batch) as cancelling in-flight work
    /// under the same token.
    pub fn cancel_in_flight(self) -> Self {
        match self {
            Self::Run { id, operation, .. } => Self::Run {
                id,
                cancel_in_flight: true,
                operation,
            },
            Self::Batch(effects) => {
                Self::Batch(effects.into_iter().map(Self::cancel_in_flight).collect())
            }
            other => other,
        }
    }

    pub fn batch(effects: impl IntoIterator<Item = Effect<A>>) -> Self {
        let effects: Vec<_> = effects.into_iter().filter(|e| !e.is_none()).collect();
        match effects.len() {
            0 => Self::None,
            1 => effects.into_iter().next().unwrap_or(Self::None),
            _ => Self::Batch(effects),
        }
    }

    /// Both effects, `self` first.
    pub fn merge(self, other: Effect<A>) -> Self {
        match (self, other) {
            (Self::None, other) => other,
            (this, Self::None) => this,
            (Self::Batch(mut effects), Self::Batch(more)) => {
                effects.extend(more);
                Self::Batch(effects)
            }
            (Self::Batch(mut effects), other) => {
                effects.push(other);
                Self::Batch(effects)
            }
            (this, other) => Self::Batch(vec![this, other]),
        }
    }

    pub fn is_none(&self) -> bool {
        match self {
            Self::None => true,
            Self::Batch(effects) => effects.iter().all(Self::is_none),
            _ => false,
        }
    }

    /// Tokens this effect starts or cancels, in order.
    pub fn ids(&self) -> Vec<&IdentityToken> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids<'e>(&'e self, ids: &mut Vec<&'e IdentityToken>) {
        match self {
            Self::Run { id, .. } | Self::Cancel(id) => ids.push(id),
            Self::Batch(effects) => effects.iter().for_each(|e| e.collect_ids(ids)),
            Self::None | Self::Send(_) => {}
        }
    }
}

impl<A: Send + 'static> Effect<A> {
    /// Re-embed actions into another action type, e.g. a child's actions
    /// into its parent's.
    pub fn map<B: Send + 'static>(self, f: impl Fn(A) -> B + Send + Sync + 'static) -> Effect<B> {
        self.map_shared(&(Arc::new(f) as Mapper<A, B>))
    }

    fn map_shared<B: Send + 'static>(self, f: &Mapper<A, B>) -> Effect<B> {
        match self {
            Self::None => Effect::None,
            Self::Send(action) => Effect::Send(f(action)),
            Self::Run {
                id,
                cancel_in_flight,
                operation,
            } => Effect::Run {
                id,
                cancel_in_flight,
                operation: operation.map_shared(f.clone()),
            },
            Self::Cancel(id) => Effect::Cancel(id),
            Self::Batch(effects) => {
                Effect::Batch(effects.into_iter().map(|e| e.map_shared(f)).collect())
            }
        }
    }
}

impl<A> Default for Effect<A> {
    fn default() -> Self {
        Self::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::namespace::Namespace;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum Site {
        Poll,
    }

    fn token(ns: &str) -> IdentityToken {
        Identity::new(Site::Poll).read_in(&Namespace::new().child(ns.to_string()))
    }

    #[test]
    fn repeating_operation_never_finishes() {
        let mut op = Operation::repeating(|| 1u8);
        for _ in 0..5 {
            assert_eq!(op.step(), Some(1));
        }
    }

    #[test]
    fn once_operation_finishes_after_one_step() {
        let mut op = Operation::once("done");
        assert_eq!(op.step(), Some("done"));
        assert_eq!(op.step(), None);
    }

    #[test]
    fn map_re_embeds_sent_and_operation_actions() {
        let effect = Effect::batch([
            Effect::send(1u32),
            Effect::run(token("a"), Operation::once(2u32)),
        ])
        .map(|n| format!("child:{n}"));

        let Effect::Batch(mut effects) = effect else {
            panic!("expected a batch");
        };
        let Effect::Run { mut operation, .. } = effects.pop().unwrap() else {
            panic!("expected a run");
        };
        assert_eq!(operation.step().as_deref(), Some("child:2"));
        assert!(matches!(effects.pop(), Some(Effect::Send(s)) if s == "child:1"));
    }

    #[test]
    fn merge_flattens_and_drops_none() {
        let merged = Effect::<u8>::none()
            .merge(Effect::cancel(token("a")))
            .merge(Effect::none())
            .merge(Effect::cancel(token("b")));
        assert_eq!(merged.ids(), vec![&token("a"), &token("b")]);
        assert!(matches!(merged, Effect::Batch(ref e) if e.len() == 2));
    }

    #[test]
    fn batch_of_nothing_is_none() {
        assert!(Effect::<u8>::batch([Effect::none(), Effect::none()]).is_none());
        assert!(matches!(Effect::batch([Effect::send(1u8)]), Effect::Send(1)));
    }

    #[test]
    fn cancel_in_flight_marks_runs_inside_batches() {
        let effect = Effect::batch([
            Effect::run(token("a"), Operation::once(1u8)),
            Effect::cancel(token("b")),
        ])
        .cancel_in_flight();
        let Effect::Batch(effects) = effect else {
            panic!("expected a batch");
        };
        assert!(matches!(effects[0], Effect::Run { cancel_in_flight: true, .. }));
        assert!(matches!(effects[1], Effect::Cancel(_)));
    }
}
