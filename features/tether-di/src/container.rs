use std::{
    cell::RefCell,
    fmt::Debug,
    thread::{self, ThreadId},
};

use futures_channel::oneshot;
use parking_lot::Mutex;

use crate::{
    errors::InjectError,
    factories::DynFactory,
    handle::DiHandle,
    injector::Injector,
    key::Key,
    types::{Instance, TypeInfo},
};

/// A realized value and the keys consulted while producing it
#[derive(Clone, Debug)]
pub(crate) struct Container {
    pub instance: Instance,
    pub dependencies: Vec<Key>,
}

type BuildResult = Result<Container, InjectError>;
type BuildWaiter = oneshot::Sender<BuildResult>;

enum LatchState {
    Unconstructed,
    Building {
        owner: ThreadId,
        waiters: Vec<BuildWaiter>,
    },
    Constructed(BuildResult),
}

struct Latch {
    /// Bumped on every invalidation, a build only stores its result if the
    /// generation did not change in between
    generation: u64,
    state: LatchState,
}

/// Lazily constructs the value registered under a key
///
/// The factory runs at most once per generation. Concurrent callers wait for
/// the running build and all observe the same container or the same error.
pub(crate) struct ContainerProvider {
    key: Key,
    factory: Box<dyn DynFactory>,
    latch: Mutex<Latch>,
}

impl Debug for ContainerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.latch.lock().state {
            LatchState::Unconstructed => "unconstructed",
            LatchState::Building { .. } => "building",
            LatchState::Constructed(Ok(_)) => "constructed",
            LatchState::Constructed(Err(_)) => "failed",
        };
        f.debug_struct("ContainerProvider")
            .field("key", &self.key)
            .field("supplies", &self.supplies().type_name)
            .field("state", &state)
            .finish()
    }
}

thread_local! {
    /// Keys the current thread is constructing, outermost first
    static CONSTRUCTING: RefCell<Vec<Key>> = const { RefCell::new(Vec::new()) };
}

impl ContainerProvider {
    pub(crate) fn new(key: Key, factory: Box<dyn DynFactory>) -> Self {
        Self {
            key,
            factory,
            latch: Mutex::new(Latch {
                generation: 0,
                state: LatchState::Unconstructed,
            }),
        }
    }

    pub(crate) fn supplies(&self) -> TypeInfo {
        self.factory.supplies()
    }

    /// The constructed value, if the last build succeeded
    pub(crate) fn constructed(&self) -> Option<Instance> {
        match &self.latch.lock().state {
            LatchState::Constructed(Ok(container)) => Some(container.instance.clone()),
            _ => None,
        }
    }

    /// Returns the container, constructing it on the first call
    pub(crate) fn provide_container(&self, injector: &Injector) -> BuildResult {
        let mut latch = self.latch.lock();
        match &mut latch.state {
            LatchState::Constructed(result) => return result.clone(),
            LatchState::Building { owner, waiters } => {
                if *owner == thread::current().id() {
                    return Err(InjectError::CyclicDependency {
                        key: self.key.clone(),
                        chain: construction_chain(&self.key),
                    });
                }

                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                drop(latch);

                tracing::trace!("Waiting for '{}' to be constructed", self.key);
                return futures::executor::block_on(rx)
                    .unwrap_or_else(|_| Err(InjectError::ConstructionAborted(self.key.clone())));
            }
            LatchState::Unconstructed => {}
        }

        let generation = latch.generation;
        latch.state = LatchState::Building {
            owner: thread::current().id(),
            waiters: Vec::new(),
        };
        drop(latch);

        let guard = BuildGuard {
            provider: self,
            finished: false,
        };
        let result = self.build(injector);
        guard.finish(generation, result.clone());

        result
    }

    fn build(&self, injector: &Injector) -> BuildResult {
        let _frame = ConstructionFrame::enter(&self.key);
        let handle = DiHandle::new(injector, &self.key);

        let instance = self.factory.construct(&handle)?;
        Ok(Container {
            instance,
            dependencies: handle.into_consulted(),
        })
    }

    /// Resets the latch, the next request constructs again
    ///
    /// A build in flight completes for its waiters but is not stored.
    pub(crate) fn invalidate(&self) {
        let mut latch = self.latch.lock();
        latch.generation += 1;
        if let LatchState::Constructed(_) = latch.state {
            latch.state = LatchState::Unconstructed;
        }
        tracing::debug!("Invalidated '{}'", self.key);
    }
}

/// Releases the latch if a build never finishes
struct BuildGuard<'a> {
    provider: &'a ContainerProvider,
    finished: bool,
}

impl BuildGuard<'_> {
    fn finish(mut self, generation: u64, result: BuildResult) {
        self.finished = true;

        let mut latch = self.provider.latch.lock();
        let next = if latch.generation == generation {
            LatchState::Constructed(result.clone())
        } else {
            LatchState::Unconstructed
        };
        let waiters = match std::mem::replace(&mut latch.state, next) {
            LatchState::Building { waiters, .. } => waiters,
            _ => Vec::new(),
        };
        drop(latch);

        match &result {
            Ok(container) => tracing::debug!(
                "Constructed '{}' with {} dependencies",
                self.provider.key,
                container.dependencies.len()
            ),
            Err(err) => tracing::debug!("Construction of '{}' failed: {err}", self.provider.key),
        }

        for waiter in waiters {
            // Error can be ignored as it just means the receiver was dropped
            let _ = waiter.send(result.clone());
        }
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        // Dropping the waiters wakes them with ConstructionAborted
        let mut latch = self.provider.latch.lock();
        if let LatchState::Building { .. } = latch.state {
            latch.state = LatchState::Unconstructed;
        }
        tracing::debug!("Construction of '{}' was aborted", self.provider.key);
    }
}

struct ConstructionFrame;

impl ConstructionFrame {
    fn enter(key: &Key) -> Self {
        CONSTRUCTING.with(|stack| stack.borrow_mut().push(key.clone()));
        ConstructionFrame
    }
}

impl Drop for ConstructionFrame {
    fn drop(&mut self) {
        CONSTRUCTING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Keys from the first construction of `key` on this thread up to `key` again
fn construction_chain(key: &Key) -> Vec<Key> {
    CONSTRUCTING.with(|stack| {
        let stack = stack.borrow();
        let start = stack.iter().position(|k| k == key).unwrap_or(0);
        let mut chain = stack[start..].to_vec();
        chain.push(key.clone());
        chain
    })
}

#[cfg(test)]
mod tests {
    use std::{
        panic::{self, AssertUnwindSafe},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Barrier,
        },
        thread,
        time::Duration,
    };

    use super::ContainerProvider;
    use crate::{
        errors::InjectError,
        factories::{FactoryEntry, FnFactory, ValueEntry},
        handle::DiHandle,
        injector::Injector,
        key::Key,
    };

    fn counting_provider(calls: Arc<AtomicUsize>) -> ContainerProvider {
        let factory = FnFactory::new(move |_: &DiHandle<'_>| {
            thread::sleep(Duration::from_millis(20));
            Ok::<_, InjectError>(calls.fetch_add(1, Ordering::SeqCst))
        });
        ContainerProvider::new(Key::from("count"), Box::new(FactoryEntry(factory)))
    }

    #[test]
    fn it_constructs_once() {
        let injector = Injector::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = counting_provider(calls.clone());

        let first = provider.provide_container(&injector).unwrap();
        let second = provider.provide_container(&injector).unwrap();

        assert!(first.instance.same_value(&second.instance));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(provider.constructed().is_some());
    }

    #[test]
    fn concurrent_callers_share_one_construction() {
        let injector = Injector::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = counting_provider(calls.clone());
        let barrier = Barrier::new(8);

        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        provider.provide_container(&injector).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for container in &results {
            assert!(container.instance.same_value(&results[0].instance));
        }
    }

    #[test]
    fn invalidation_constructs_again() {
        let injector = Injector::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = counting_provider(calls.clone());

        let first = provider.provide_container(&injector).unwrap();
        provider.invalidate();
        assert!(provider.constructed().is_none());
        let second = provider.provide_container(&injector).unwrap();

        assert!(!first.instance.same_value(&second.instance));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn values_keep_their_identity_across_invalidation() {
        let injector = Injector::new();
        let provider = ContainerProvider::new(
            Key::from("value"),
            Box::new(ValueEntry::new(String::from("value"))),
        );

        let first = provider.provide_container(&injector).unwrap();
        provider.invalidate();
        let second = provider.provide_container(&injector).unwrap();

        assert!(first.instance.same_value(&second.instance));
    }

    #[test]
    fn failures_are_cached_until_invalidated() {
        let injector = Injector::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let factory = FnFactory::new(move |_: &DiHandle<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<u32, _>("nope")
        });
        let provider = ContainerProvider::new(Key::from("failing"), Box::new(FactoryEntry(factory)));

        assert!(provider.provide_container(&injector).is_err());
        assert!(provider.provide_container(&injector).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        provider.invalidate();
        assert!(provider.provide_container(&injector).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_callers_share_one_failure() {
        let injector = Injector::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let factory = FnFactory::new(move |_: &DiHandle<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Err::<u32, _>("nope")
        });
        let provider = ContainerProvider::new(Key::from("failing"), Box::new(FactoryEntry(factory)));
        let barrier = Barrier::new(8);

        let errors: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        provider.provide_container(&injector).unwrap_err()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let InjectError::FactoryFailed { error: first, .. } = &errors[0] else {
            panic!("expected a factory failure, got {:?}", errors[0]);
        };
        for err in &errors {
            assert!(matches!(
                err,
                InjectError::FactoryFailed { key, error } if *key == Key::from("failing") && Arc::ptr_eq(error, first)
            ));
        }
    }

    #[test]
    fn a_panicking_build_wakes_its_waiters() {
        let injector = Injector::new();
        let started = Arc::new(Barrier::new(2));
        let building = started.clone();
        let factory = FnFactory::new(move |_: &DiHandle<'_>| -> Result<u8, InjectError> {
            building.wait();
            thread::sleep(Duration::from_millis(100));
            panic!("construction panicked");
        });
        let provider = ContainerProvider::new(Key::from("panics"), Box::new(FactoryEntry(factory)));

        thread::scope(|scope| {
            let builder = scope.spawn(|| provider.provide_container(&injector));
            started.wait();
            let waiter = scope.spawn(|| provider.provide_container(&injector));

            assert!(builder.join().is_err());
            let err = waiter.join().unwrap().unwrap_err();
            assert!(matches!(err, InjectError::ConstructionAborted(key) if key == Key::from("panics")));
        });
        assert!(provider.constructed().is_none());
    }

    #[test]
    fn a_panicking_factory_releases_the_latch() {
        let injector = Injector::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let factory = FnFactory::new(move |_: &DiHandle<'_>| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first attempt fails");
            }
            Ok::<_, InjectError>(1_u8)
        });
        let provider = ContainerProvider::new(Key::from("flaky"), Box::new(FactoryEntry(factory)));

        let panicked = panic::catch_unwind(AssertUnwindSafe(|| provider.provide_container(&injector)));
        assert!(panicked.is_err());

        let container = provider.provide_container(&injector).unwrap();
        assert_eq!(container.instance.downcast_ref::<u8>(), Some(&1));
    }
}
