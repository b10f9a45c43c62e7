use std::{any::Any, fmt::Debug, sync::Arc};

use parking_lot::{RwLock, RwLockReadGuard};

use crate::{
    component::Component,
    errors::InjectError,
    key::Key,
    mutable::{absorb_into_new, MutableValue},
    resolver::Resolver,
    types::{Injectable, Instance},
};

/// A value that can be updated in place after it was handed out
///
/// Values injected or retrieved from the injector are snapshots, re-adding a key
/// does not reach anybody who already holds the old value. A `Provider` does:
///
/// ```rust
/// use tether_di::{Injector, Provider};
///
/// let injector = Injector::new();
/// injector.add("one", Provider::new(1));
/// let one = injector.require_key::<Provider<i32>>("one").unwrap();
///
/// injector.add("one", Provider::new(2));
/// assert_eq!(one.get(), 2);
///
/// injector.add("one", 3);
/// assert_eq!(one.get(), 3);
/// ```
///
/// Clones share the same slot. Call [Provider::get] on every read instead of
/// storing its result.
pub struct Provider<T> {
    val: Arc<RwLock<T>>,
}
impl<T> Clone for Provider<T> {
    fn clone(&self) -> Self {
        Self {
            val: self.val.clone(),
        }
    }
}
impl<T: Debug> Debug for Provider<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Provider").field(&*self.val.read()).finish()
    }
}
impl<T: Default> Default for Provider<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Provider<T> {
    pub fn new(val: T) -> Self {
        Self {
            val: Arc::new(RwLock::new(val)),
        }
    }

    pub fn set(&self, val: T) {
        *self.val.write() = val;
    }

    /// Sets a new value and returns the previous one
    pub fn replace(&self, val: T) -> T {
        std::mem::replace(&mut *self.val.write(), val)
    }

    /// Read access without cloning
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.val.read()
    }

    /// True if both providers share the same slot
    pub fn same_slot(&self, other: &Provider<T>) -> bool {
        Arc::ptr_eq(&self.val, &other.val)
    }
}

impl<T: Clone> Provider<T> {
    pub fn get(&self) -> T {
        self.val.read().clone()
    }
}

/// Accepts either a `T` or another `Provider<T>`, whose current value is copied
///
/// Anything else is ignored.
impl<T: Injectable + Clone> MutableValue for Provider<T> {
    fn set_value(&self, value: &dyn Any) -> Result<(), InjectError> {
        if let Some(val) = value.downcast_ref::<T>() {
            self.set(val.clone());
        } else if let Some(other) = value.downcast_ref::<Provider<T>>() {
            if !self.same_slot(other) {
                let snapshot = other.get();
                self.set(snapshot);
            }
        } else {
            tracing::trace!(
                "Provider<{}> ignored an update of another type",
                std::any::type_name::<T>()
            );
        }
        Ok(())
    }
}

impl<T: Injectable + Clone> Component for Provider<T> {
    fn as_mutable(&self) -> Option<&dyn MutableValue> {
        Some(self)
    }
}

/// A registered provider is shared, anything else is fed to a new provider
///
/// A new provider starts out with `T::default()` and absorbs the registered
/// value, so a value that is neither `T` nor `Provider<T>` leaves it at the
/// default. By type a registered `T` is found as well.
impl<T: Injectable + Clone + Default> Resolver for Provider<T> {
    fn type_key() -> Key {
        Key::of::<Provider<T>>()
    }

    fn alternate_type_keys() -> Vec<Key> {
        vec![Key::of::<T>()]
    }

    fn resolve(key: &Key, instance: &Instance) -> Result<Self, InjectError> {
        absorb_into_new(key, instance)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::Provider;
    use crate::{key::Key, mutable::MutableValue, resolver::Resolver, types::Instance};

    #[test]
    fn it_gets_and_sets() {
        let provider = Provider::new(1);

        provider.set(2);

        assert_eq!(provider.get(), 2);
        assert_eq!(provider.replace(3), 2);
        assert_eq!(*provider.read(), 3);
    }

    #[test]
    fn clones_share_the_slot() {
        let provider = Provider::new(String::from("a"));
        let clone = provider.clone();

        clone.set(String::from("b"));

        assert_eq!(provider.get(), "b");
        assert!(provider.same_slot(&clone));
    }

    #[test]
    fn it_tolerates_values_of_other_types() {
        let provider = Provider::new(1);

        provider.set_value(&"1").unwrap();

        assert_eq!(provider.get(), 1);
    }

    #[test]
    fn it_absorbs_values_and_providers() {
        let provider = Provider::new(1);

        provider.set_value(&2).unwrap();
        assert_eq!(provider.get(), 2);

        provider.set_value(&Provider::new(5)).unwrap();
        assert_eq!(provider.get(), 5);

        provider.set_value(&provider.clone()).unwrap();
        assert_eq!(provider.get(), 5);
    }

    #[test]
    fn it_resolves_shared_or_fresh_providers() {
        let registered = Provider::new(1);
        let shared = Provider::<i32>::resolve(&Key::from("p"), &Instance::new(registered.clone())).unwrap();
        assert!(shared.same_slot(&registered));

        let fresh = Provider::<i32>::resolve(&Key::from("p"), &Instance::new(4)).unwrap();
        assert_eq!(fresh.get(), 4);

        let fallback = Provider::<i32>::resolve(&Key::from("p"), &Instance::new("4")).unwrap();
        assert_eq!(fallback.get(), 0);
        assert_eq!(Provider::<i32>::alternate_type_keys(), vec![Key::of::<i32>()]);
    }

    #[test]
    fn it_is_safe_to_update_from_many_threads() {
        let provider = Arc::new(Provider::new(0_usize));

        thread::scope(|scope| {
            for i in 1..=8 {
                let provider = provider.clone();
                scope.spawn(move || provider.set(i));
            }
        });

        assert!((1..=8).contains(&provider.get()));
    }
}
