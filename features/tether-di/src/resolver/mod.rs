use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
    hash::{BuildHasher, Hash},
    path::PathBuf,
    time::Duration,
};

use crate::{
    errors::InjectError,
    key::Key,
    types::{Injectable, Instance},
};

pub mod arc;

/// Turns a resolved instance into the value placed into a field
///
/// Shared values are resolved as `Arc<T>`, plain values are cloned out of the
/// registry and mutable values such as [Provider](crate::Provider) are
/// instantiated and fed the resolved value.
pub trait Resolver: Sized {
    /// Key used when a field is injected by type
    fn type_key() -> Key;

    /// Further type keys a matching value may be registered under, tried after
    /// [Resolver::type_key]
    fn alternate_type_keys() -> Vec<Key> {
        Vec::new()
    }

    fn resolve(key: &Key, instance: &Instance) -> Result<Self, InjectError>;
}

/// Clones the registered value
pub fn cloned<T: Injectable + Clone>(key: &Key, instance: &Instance) -> Result<T, InjectError> {
    instance
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| InjectError::invalid_type::<T>(key, instance))
}

macro_rules! cloned_resolver {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Resolver for $ty {
                fn type_key() -> Key {
                    Key::of::<$ty>()
                }

                fn resolve(key: &Key, instance: &Instance) -> Result<Self, InjectError> {
                    cloned(key, instance)
                }
            }
        )*
    };
}

cloned_resolver! {
    bool, char,
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64,
    &'static str, String, PathBuf, Duration,
}

impl<T: Injectable + Clone> Resolver for Vec<T> {
    fn type_key() -> Key {
        Key::of::<Self>()
    }

    fn resolve(key: &Key, instance: &Instance) -> Result<Self, InjectError> {
        cloned(key, instance)
    }
}

impl<T: Injectable + Clone> Resolver for VecDeque<T> {
    fn type_key() -> Key {
        Key::of::<Self>()
    }

    fn resolve(key: &Key, instance: &Instance) -> Result<Self, InjectError> {
        cloned(key, instance)
    }
}

impl<T: Injectable + Clone + Ord> Resolver for BTreeSet<T> {
    fn type_key() -> Key {
        Key::of::<Self>()
    }

    fn resolve(key: &Key, instance: &Instance) -> Result<Self, InjectError> {
        cloned(key, instance)
    }
}

impl<K: Injectable + Clone + Ord, V: Injectable + Clone> Resolver for BTreeMap<K, V> {
    fn type_key() -> Key {
        Key::of::<Self>()
    }

    fn resolve(key: &Key, instance: &Instance) -> Result<Self, InjectError> {
        cloned(key, instance)
    }
}

impl<T, S> Resolver for HashSet<T, S>
where
    T: Injectable + Clone + Eq + Hash,
    S: Injectable + Clone + BuildHasher,
{
    fn type_key() -> Key {
        Key::of::<Self>()
    }

    fn resolve(key: &Key, instance: &Instance) -> Result<Self, InjectError> {
        cloned(key, instance)
    }
}

impl<K, V, S> Resolver for HashMap<K, V, S>
where
    K: Injectable + Clone + Eq + Hash,
    V: Injectable + Clone,
    S: Injectable + Clone + BuildHasher,
{
    fn type_key() -> Key {
        Key::of::<Self>()
    }

    fn resolve(key: &Key, instance: &Instance) -> Result<Self, InjectError> {
        cloned(key, instance)
    }
}
