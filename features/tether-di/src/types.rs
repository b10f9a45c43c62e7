use std::{
    any::{Any, TypeId},
    fmt::Debug,
    sync::Arc,
};

use crate::{component::Component, errors::InjectError};

/// Error produced by a factory
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Values stored in the injector may be shared with any thread
/// So anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

type AbsorbFn = fn(&Instance, &dyn Any) -> Option<Result<(), InjectError>>;

/// Instance of a realized value
///
/// Cloning is cheap, every clone points at the same value.
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub instance: Arc<dyn Any + Send + Sync + 'static>,
    /// The same allocation as `instance`, kept as a typed `Arc<V>` behind `Any`
    handle: Arc<dyn Any + Send + Sync + 'static>,
    absorb: AbsorbFn,
}
impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}

impl Instance {
    pub(crate) fn new<V: Component>(value: V) -> Self {
        let typed = Arc::new(value);
        Instance {
            info: TypeInfo::of::<V>(),
            instance: typed.clone(),
            handle: Arc::new(typed),
            absorb: absorb_with::<V>,
        }
    }

    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.instance.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.instance.downcast_ref::<T>()
    }

    /// Returns a shared pointer to the value
    ///
    /// Succeeds when the value is a `V`, or when the value itself is an `Arc<V>`
    /// (the way trait objects are registered).
    pub fn shared<V: ?Sized + 'static>(&self) -> Option<Arc<V>> {
        self.handle
            .downcast_ref::<Arc<V>>()
            .or_else(|| self.instance.downcast_ref::<Arc<V>>())
            .cloned()
    }

    pub fn as_any(&self) -> &dyn Any {
        &*self.instance
    }

    /// Hands `value` to the instance's [MutableValue](crate::MutableValue) capability
    ///
    /// Returns None if the instance has no such capability
    pub fn absorb(&self, value: &dyn Any) -> Option<Result<(), InjectError>> {
        (self.absorb)(self, value)
    }

    /// True if both instances point at the same value
    pub fn same_value(&self, other: &Instance) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.instance), Arc::as_ptr(&other.instance))
    }
}

fn absorb_with<V: Component>(
    instance: &Instance,
    value: &dyn Any,
) -> Option<Result<(), InjectError>> {
    let mutable = instance.downcast_ref::<V>()?.as_mutable()?;
    Some(mutable.set_value(value))
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}
