//! Context-backed stacks under concurrency.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use effect_namespace::{
    Effect, Identity, IdentityToken, Namespace, NamespaceComponent, NamespaceConfig,
    NamespaceContext, NamespaceStack, Operation, Reduce, Reducer, ReducerExt, Sharding,
};
use tracing_test::traced_test;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Site {
    Poll,
}

const POLL: Identity<Site> = Identity::new(Site::Poll);

fn context(sharding: Sharding) -> Arc<NamespaceContext> {
    Arc::new(NamespaceContext::new(&NamespaceConfig {
        sharding,
        warn_unnamespaced_reads: true,
    }))
}

fn poller() -> impl Reducer<State = (), Action = (), Environment = ()> {
    Reduce::new(|_: &mut (), _: &(), _: &(), namespace: &mut NamespaceStack<'_>| {
        // Widen the window in which another thread could interleave a push.
        thread::sleep(Duration::from_millis(2));
        Effect::run(POLL.read(namespace), Operation::once(()))
    })
}

fn first_token(effect: &Effect<()>) -> IdentityToken {
    effect.ids()[0].clone()
}

#[test]
fn concurrent_steps_on_the_shared_stack_never_interleave() {
    let context = context(Sharding::Shared);
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8u32)
        .map(|worker| {
            let context = context.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let reducer = poller().namespaced(worker);
                barrier.wait();
                (0..10)
                    .map(|_| {
                        let mut stack = context.enter();
                        first_token(&reducer.reduce(&mut (), &(), &(), &mut stack))
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for (worker, handle) in handles.into_iter().enumerate() {
        let expected = Namespace::new().child(worker as u32);
        for token in handle.join().unwrap() {
            assert_eq!(token.namespace(), &expected);
        }
    }
    assert!(context.current_snapshot().is_empty());
}

#[test]
fn affinity_thread_is_isolated_from_shared_traffic() {
    let context = context(Sharding::Affinity);

    let affinity = {
        let context = context.clone();
        thread::spawn(move || {
            context.designate_affinity_thread().unwrap();
            assert!(context.is_affinity_thread());
            let reducer = poller().namespaced("ui");
            (0..10)
                .map(|_| {
                    let mut stack = context.enter();
                    first_token(&reducer.reduce(&mut (), &(), &(), &mut stack))
                })
                .collect::<Vec<_>>()
        })
    };

    let background = {
        let context = context.clone();
        thread::spawn(move || {
            let reducer = poller().namespaced("worker");
            (0..10)
                .map(|_| {
                    let mut stack = context.enter();
                    first_token(&reducer.reduce(&mut (), &(), &(), &mut stack))
                })
                .collect::<Vec<_>>()
        })
    };

    for token in affinity.join().unwrap() {
        assert_eq!(token.namespace(), &Namespace::new().child("ui"));
    }
    for token in background.join().unwrap() {
        assert_eq!(token.namespace(), &Namespace::new().child("worker"));
    }
}

#[test]
#[traced_test]
fn namespacing_on_a_worker_arms_the_warning_on_the_affinity_thread() {
    let context = context(Sharding::Affinity);
    context.designate_affinity_thread().unwrap();

    let worker = {
        let context = context.clone();
        thread::spawn(move || {
            let mut stack = context.enter();
            let scope = stack.enter("worker");
            POLL.read(&scope)
        })
    };
    assert_eq!(worker.join().unwrap().namespace(), &Namespace::new().child("worker"));

    let stack = context.enter();
    assert!(context.is_affinity_thread());
    assert!(POLL.read(&stack).namespace().is_empty());
    assert!(logs_contain("empty namespace"));
}

#[test]
fn both_sharding_modes_give_the_same_tokens() {
    let tokens = [Sharding::Affinity, Sharding::Shared].map(|sharding| {
        let context = context(sharding);
        context.designate_affinity_thread().unwrap();
        let reducer = poller().namespaced("doc").namespaced("window");
        let mut stack = context.enter();
        first_token(&reducer.reduce(&mut (), &(), &(), &mut stack))
    });
    assert_eq!(tokens[0], tokens[1]);
}

#[test]
fn raw_pushes_are_visible_to_the_next_step_on_the_same_thread() {
    let context = context(Sharding::Shared);
    context.push(NamespaceComponent::new("outer"));

    let mut stack = context.enter();
    let token = POLL.read(&stack.enter("inner"));
    drop(stack);

    assert_eq!(token.namespace(), &Namespace::new().child("outer").child("inner"));
    context.pop();
    assert!(context.current_snapshot().is_empty());
}

#[test]
fn global_context_is_installed_once() {
    let installed = NamespaceContext::install_global(&NamespaceConfig {
        sharding: Sharding::Shared,
        warn_unnamespaced_reads: false,
    })
    .unwrap();

    assert!(Arc::ptr_eq(&installed, &NamespaceContext::global()));
    assert_eq!(NamespaceContext::global().sharding(), Sharding::Shared);
    assert!(NamespaceContext::install_global(&NamespaceConfig::default()).is_err());
}
