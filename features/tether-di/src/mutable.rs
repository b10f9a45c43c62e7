//! In place updates of values already handed out

use std::any::Any;

use crate::{errors::InjectError, key::Key, types::Instance};

/// Lets a value absorb an update instead of being replaced
///
/// When [Injector::add](crate::Injector::add) targets a key whose constructed value
/// has this capability, the existing value receives the new one through
/// [MutableValue::set_value] and everybody holding it observes the change. Only if
/// `set_value` fails is the value replaced.
///
/// The same happens for fields whose type has the capability: the field is
/// instantiated and fed the resolved value rather than assigned.
///
/// `value` may be of any type, implementations must check it.
pub trait MutableValue: Send + Sync {
    fn set_value(&self, value: &dyn Any) -> Result<(), InjectError>;
}

/// Instantiates a fresh `M` and lets it absorb the resolved instance
///
/// Used by [Resolver](crate::Resolver) implementations of mutable field types.
/// An instance that already is an `M` is shared instead.
pub fn absorb_into_new<M>(key: &Key, instance: &Instance) -> Result<M, InjectError>
where
    M: MutableValue + Default + Clone + 'static,
{
    if let Some(existing) = instance.downcast_ref::<M>() {
        return Ok(existing.clone());
    }

    let fresh = M::default();
    fresh.set_value(instance.as_any()).map_err(|err| match err {
        InjectError::InvalidType { expected, actual, .. } => InjectError::InvalidType {
            key: key.clone(),
            expected,
            actual,
        },
        err => err,
    })?;

    Ok(fresh)
}
