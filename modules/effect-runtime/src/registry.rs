//! In-flight operation table.

use effect_namespace::{IdentityToken, Operation};
use tracing::debug;

struct InFlight<A> {
    id: IdentityToken,
    operation: Operation<A>,
}

/// Operations currently running, in start order.
///
/// Several operations may share a token; a cancel removes all of them.
pub struct OperationRegistry<A> {
    in_flight: Vec<InFlight<A>>,
}

impl<A: Send + 'static> OperationRegistry<A> {
    pub fn new() -> Self {
        Self { in_flight: Vec::new() }
    }

    pub fn start(&mut self, id: IdentityToken, operation: Operation<A>) {
        debug!(id = %id, "Operation started");
        self.in_flight.push(InFlight { id, operation });
    }

    /// Remove every operation running under a token equal to `id`.
    /// Returns how many were removed.
    pub fn cancel(&mut self, id: &IdentityToken) -> usize {
        let before = self.in_flight.len();
        self.in_flight.retain(|entry| entry.id != *id);
        let cancelled = before - self.in_flight.len();
        if cancelled > 0 {
            debug!(id = %id, cancelled, "Operation cancelled");
        }
        cancelled
    }

    /// Step every operation once, in start order. Finished operations are
    /// dropped. Returns the emitted actions in the same order.
    pub fn step_all(&mut self) -> Vec<A> {
        let mut emitted = Vec::new();
        self.in_flight.retain_mut(|entry| match entry.operation.step() {
            Some(action) => {
                emitted.push(action);
                true
            }
            None => {
                debug!(id = %entry.id, "Operation finished");
                false
            }
        });
        emitted
    }

    pub fn is_running(&self, id: &IdentityToken) -> bool {
        self.in_flight.iter().any(|entry| entry.id == *id)
    }

    /// Tokens of the running operations, in start order.
    pub fn running(&self) -> impl Iterator<Item = &IdentityToken> {
        self.in_flight.iter().map(|entry| &entry.id)
    }

    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

impl<A: Send + 'static> Default for OperationRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use effect_namespace::{Identity, Namespace};

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum Site {
        Timer,
    }

    fn token(ns: &'static str) -> IdentityToken {
        Identity::new(Site::Timer).read_in(&Namespace::new().child(ns))
    }

    #[test]
    fn cancel_removes_every_equal_token() {
        let mut registry = OperationRegistry::new();
        registry.start(token("a"), Operation::repeating(|| 1));
        registry.start(token("a"), Operation::repeating(|| 2));
        registry.start(token("b"), Operation::repeating(|| 3));

        assert_eq!(registry.cancel(&token("a")), 2);
        assert!(!registry.is_running(&token("a")));
        assert!(registry.is_running(&token("b")));
        assert_eq!(registry.cancel(&token("a")), 0);
    }

    #[test]
    fn step_all_preserves_start_order_and_drops_finished() {
        let mut registry = OperationRegistry::new();
        registry.start(token("a"), Operation::once(1));
        registry.start(token("b"), Operation::repeating(|| 2));

        assert_eq!(registry.step_all(), vec![1, 2]);
        assert_eq!(registry.step_all(), vec![2]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.running().collect::<Vec<_>>(), vec![&token("b")]);
    }

    #[test]
    fn registry_drains_once_every_operation_finishes() {
        let mut registry = OperationRegistry::new();
        assert!(registry.is_empty());

        registry.start(token("a"), Operation::once(1));
        assert!(!registry.is_empty());
        assert_eq!(registry.step_all(), vec![1]);
        assert!(registry.is_empty());
    }
}
