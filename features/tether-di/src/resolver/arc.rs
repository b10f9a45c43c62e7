use std::sync::Arc;

use crate::{errors::InjectError, key::Key, resolver::Resolver, types::Instance};

/// Shares the registered value
///
/// The value may be registered as `T` or as `Arc<T>`, the latter is how trait
/// objects are registered. By type both `Key::of::<T>()` and `Key::of::<Arc<T>>()`
/// are searched.
impl<T: ?Sized + Send + Sync + 'static> Resolver for Arc<T> {
    fn type_key() -> Key {
        Key::of::<T>()
    }

    fn alternate_type_keys() -> Vec<Key> {
        vec![Key::of::<Arc<T>>()]
    }

    fn resolve(key: &Key, instance: &Instance) -> Result<Self, InjectError> {
        instance
            .shared::<T>()
            .ok_or_else(|| InjectError::invalid_type::<T>(key, instance))
    }
}
