//! Identity declarations and the tokens read from them.
//!
//! An [`Identity`] names one place in a reducer that starts or cancels a
//! long-running effect. Reading it yields an [`IdentityToken`] that also
//! carries the namespace active at the time of the read, so the same
//! declaration in two reducer instances produces two different tokens.
//!
//! ```
//! use effect_namespace::{Identity, NamespaceStack};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum TimerId {
//!     Tick,
//! }
//!
//! const TIMER: Identity<TimerId> = Identity::new(TimerId::Tick);
//!
//! let mut stack = NamespaceStack::detached();
//! let in_a = TIMER.read(&stack.enter("A"));
//! let in_b = TIMER.read(&stack.enter("B"));
//! assert_ne!(in_a, in_b);
//! ```

use std::fmt;
use std::hash::Hash;

use crate::component::{ComponentValue, NamespaceComponent};
use crate::namespace::{Namespace, NamespaceStack};

/// A stable key for one declaration. Typically a variant of an enum the
/// reducer author defines, one variant per identity declared in the reducer.
pub trait DeclarationSite: Clone + fmt::Debug + Eq + Hash + Send + Sync + 'static {}

impl<T> DeclarationSite for T where T: Clone + fmt::Debug + Eq + Hash + Send + Sync + 'static {}

/// An identity declaration: a declaration site plus an optional seed.
///
/// Constructing one touches no namespace state; only [`read`](Self::read)
/// does.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Identity<D> {
    site: D,
    seed: Option<NamespaceComponent>,
}

impl<D: DeclarationSite> Identity<D> {
    pub const fn new(site: D) -> Self {
        Self { site, seed: None }
    }

    /// A declaration parameterized by instance data, e.g. a row's own key.
    pub fn seeded(site: D, seed: impl ComponentValue) -> Self {
        Self {
            site,
            seed: Some(NamespaceComponent::new(seed)),
        }
    }

    pub fn site(&self) -> &D {
        &self.site
    }

    pub fn seed(&self) -> Option<&NamespaceComponent> {
        self.seed.as_ref()
    }

    /// Produce a token for the namespace currently on `stack`.
    ///
    /// An empty namespace is allowed. If the stack belongs to a context that
    /// has seen namespacing elsewhere, the context logs a one-time warning for
    /// this site; the token is returned either way.
    pub fn read(&self, stack: &NamespaceStack<'_>) -> IdentityToken {
        let token = self.read_in(&stack.snapshot());
        if let Some(context) = stack.context() {
            context.observe_read(&token.site, &token.namespace);
        }
        token
    }

    /// Produce a token for an explicit namespace snapshot.
    pub fn read_in(&self, namespace: &Namespace) -> IdentityToken {
        IdentityToken {
            site: NamespaceComponent::new(self.site.clone()),
            seed: self.seed.clone(),
            namespace: namespace.clone(),
        }
    }
}

impl<D: fmt::Debug> fmt::Debug for Identity<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Identity");
        s.field("site", &self.site);
        if let Some(seed) = &self.seed {
            s.field("seed", seed);
        }
        s.finish()
    }
}

/// The value effects are started and cancelled under.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct IdentityToken {
    site: NamespaceComponent,
    seed: Option<NamespaceComponent>,
    namespace: Namespace,
}

impl IdentityToken {
    pub fn site(&self) -> &NamespaceComponent {
        &self.site
    }

    pub fn seed(&self) -> Option<&NamespaceComponent> {
        self.seed.as_ref()
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }
}

impl fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityToken")
            .field("site", &self.site)
            .field("seed", &self.seed)
            .field("namespace", &self.namespace)
            .finish()
    }
}

/// `Site(seed)@[ns, ...]`, for log lines.
impl fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.site)?;
        if let Some(seed) = &self.seed {
            write!(f, "({seed:?})")?;
        }
        write!(f, "@{:?}", self.namespace)
    }
}
