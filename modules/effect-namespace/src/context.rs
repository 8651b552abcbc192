//! Process-level home of the namespace stacks.
//!
//! Two stacks per context: an unsynchronized one for the designated affinity
//! thread (the UI-driving thread, typically) and a shared one for everybody
//! else, guarded by a reentrant lock. A reducer step opens one of them with
//! [`NamespaceContext::enter`]. On the shared path the lock is held until the
//! returned stack is dropped, so whole push+invoke+pop sequences from
//! different threads never interleave, while nested steps on the same thread
//! re-enter freely.
//!
//! Sharding is an optimization only. With [`Sharding::Shared`] every thread
//! takes the locked path and the observable contract is the same.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, warn};

use crate::component::NamespaceComponent;
use crate::config::{NamespaceConfig, Sharding};
use crate::error::NamespaceError;
use crate::namespace::{Namespace, NamespaceStack};

pub(crate) type SharedStack = RefCell<Vec<NamespaceComponent>>;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);
static GLOBAL: OnceLock<Arc<NamespaceContext>> = OnceLock::new();

thread_local! {
    /// Affinity stacks, keyed by context id. Only the affinity thread of a
    /// context ever touches its entry.
    static AFFINITY_STACKS: RefCell<HashMap<u64, Vec<NamespaceComponent>>> =
        RefCell::new(HashMap::new());
}

// ---------------------------------------------------------------------------
// NamespaceContext
// ---------------------------------------------------------------------------

pub struct NamespaceContext {
    id: u64,
    sharding: Sharding,
    affinity: OnceLock<ThreadId>,
    shared: ReentrantMutex<SharedStack>,
    diagnostics: ReadDiagnostics,
}

impl NamespaceContext {
    pub fn new(config: &NamespaceConfig) -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            sharding: config.sharding,
            affinity: OnceLock::new(),
            shared: ReentrantMutex::new(RefCell::new(Vec::new())),
            diagnostics: ReadDiagnostics::new(config.warn_unnamespaced_reads),
        }
    }

    /// The process-wide context. Built from the environment on first use
    /// unless [`install_global`](Self::install_global) ran first.
    pub fn global() -> Arc<NamespaceContext> {
        GLOBAL
            .get_or_init(|| {
                let config = NamespaceConfig::from_env().unwrap_or_else(|e| {
                    warn!(error = %e, "Invalid namespace configuration, using defaults");
                    NamespaceConfig::default()
                });
                Arc::new(Self::new(&config))
            })
            .clone()
    }

    /// Install the process-wide context with an explicit configuration.
    /// Fails if [`global`](Self::global) already ran.
    pub fn install_global(
        config: &NamespaceConfig,
    ) -> Result<Arc<NamespaceContext>, NamespaceError> {
        let context = Arc::new(Self::new(config));
        GLOBAL
            .set(context.clone())
            .map_err(|_| NamespaceError::GlobalAlreadyInitialized)?;
        Ok(context)
    }

    pub fn sharding(&self) -> Sharding {
        self.sharding
    }

    /// Mark the calling thread as this context's affinity thread.
    ///
    /// Repeating the call from the same thread is a no-op. Calling it from a
    /// different thread once one is designated is an error.
    pub fn designate_affinity_thread(&self) -> Result<(), NamespaceError> {
        let current = thread::current().id();
        let designated = *self.affinity.get_or_init(|| current);
        if designated != current {
            return Err(NamespaceError::AffinityConflict {
                existing: format!("{designated:?}"),
                requested: format!("{current:?}"),
            });
        }
        if self.sharding == Sharding::Shared {
            debug!(thread = ?current, "Affinity thread designated but sharding is disabled");
        }
        Ok(())
    }

    /// Whether the calling thread uses the unlocked affinity stack.
    pub fn is_affinity_thread(&self) -> bool {
        self.sharding == Sharding::Affinity
            && self.affinity.get() == Some(&thread::current().id())
    }

    /// Open the calling thread's stack for one reducer step.
    ///
    /// Off the affinity thread this blocks until no other thread holds the
    /// shared stack, and keeps it until the returned handle is dropped.
    pub fn enter(&self) -> NamespaceStack<'_> {
        if self.is_affinity_thread() {
            NamespaceStack::affinity(self)
        } else {
            NamespaceStack::shared(self, self.shared.lock())
        }
    }

    /// Push onto the stack selected for the calling thread.
    ///
    /// Left on the stack until a matching [`pop`](Self::pop). Scoped code
    /// should use [`NamespaceStack::enter`] instead.
    pub fn push(&self, component: NamespaceComponent) {
        self.enter().push(component);
    }

    /// Pop from the stack selected for the calling thread.
    ///
    /// # Panics
    ///
    /// Panics if that stack is empty.
    pub fn pop(&self) -> NamespaceComponent {
        self.enter().pop()
    }

    /// Copy of the calling thread's stack.
    pub fn current_snapshot(&self) -> Namespace {
        self.enter().snapshot()
    }

    pub(crate) fn with_affinity_stack<R>(
        &self,
        f: impl FnOnce(&mut Vec<NamespaceComponent>) -> R,
    ) -> R {
        AFFINITY_STACKS.with(|stacks| {
            let mut stacks = stacks.borrow_mut();
            let stack = stacks.entry(self.id).or_default();
            let result = f(stack);
            if stack.is_empty() {
                stacks.remove(&self.id);
            }
            result
        })
    }

    pub(crate) fn note_namespaced(&self) {
        self.diagnostics.namespacing_observed.store(true, Ordering::Relaxed);
    }

    /// Called on every identity read against a stack of this context.
    pub(crate) fn observe_read(&self, site: &NamespaceComponent, namespace: &Namespace) {
        if !namespace.is_empty() {
            self.note_namespaced();
            return;
        }
        self.diagnostics.unnamespaced_read(site);
    }
}

impl fmt::Debug for NamespaceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceContext")
            .field("id", &self.id)
            .field("sharding", &self.sharding)
            .field("affinity", &self.affinity.get())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Read diagnostics
// ---------------------------------------------------------------------------

struct ReadDiagnostics {
    enabled: bool,
    namespacing_observed: AtomicBool,
    warned_sites: Mutex<HashSet<NamespaceComponent>>,
}

impl ReadDiagnostics {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            namespacing_observed: AtomicBool::new(false),
            warned_sites: Mutex::new(HashSet::new()),
        }
    }

    fn unnamespaced_read(&self, site: &NamespaceComponent) {
        if !self.enabled || !self.namespacing_observed.load(Ordering::Relaxed) {
            return;
        }
        if !self.warned_sites.lock().insert(site.clone()) {
            return;
        }
        warn!(
            site = ?site,
            "Identity read with an empty namespace while other reducers are namespaced. \
             It was probably read outside a namespaced reducer, and its effects can collide \
             with the same declaration in other instances"
        );
    }
}
