use std::{marker::PhantomData, sync::Arc};

use parking_lot::Mutex;

use crate::{
    component::Component,
    errors::InjectError,
    handle::DiHandle,
    key::Key,
    types::{DynError, Instance, TypeInfo},
};

/// A Factory providing instances of a given type
///
/// Runs at most once per registration, the first time its value is requested.
pub trait InstanceFactory: Send + Sync + 'static {
    type Provides: Component;

    /// Returns the typeinfo about the factory's provided type
    fn supplies(&self) -> TypeInfo {
        TypeInfo::of::<Self::Provides>()
    }

    /// Constructs a new instance of the factory's provided type
    ///
    /// Returns the constructed instance, or an error if either Dependencies are not satisfied or the Instantiation failed
    fn construct(&self, di: &DiHandle<'_>) -> Result<Self::Provides, impl Into<DynError>>;
}

/// Adapts a closure to [InstanceFactory]
pub struct FnFactory<F, V, E> {
    f: F,
    _provides: PhantomData<fn() -> (V, E)>,
}

impl<F, V, E> FnFactory<F, V, E>
where
    F: Fn(&DiHandle<'_>) -> Result<V, E> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _provides: PhantomData,
        }
    }
}

impl<F, V, E> InstanceFactory for FnFactory<F, V, E>
where
    F: Fn(&DiHandle<'_>) -> Result<V, E> + Send + Sync + 'static,
    V: Component,
    E: Into<DynError> + 'static,
{
    type Provides = V;

    fn construct(&self, di: &DiHandle<'_>) -> Result<V, impl Into<DynError>> {
        (self.f)(di)
    }
}

/// Wrapper Trait for factories, providing instances of Any
pub(crate) trait DynFactory: Send + Sync {
    fn supplies(&self) -> TypeInfo;

    /// Constructs the value and injects its fields
    fn construct(&self, di: &DiHandle<'_>) -> Result<Instance, InjectError>;
}

pub(crate) struct FactoryEntry<F>(pub F);

impl<F: InstanceFactory> DynFactory for FactoryEntry<F> {
    fn supplies(&self) -> TypeInfo {
        self.0.supplies()
    }

    fn construct(&self, di: &DiHandle<'_>) -> Result<Instance, InjectError> {
        let mut value = self
            .0
            .construct(di)
            .map_err(|error| InjectError::FactoryFailed {
                key: di.key().clone(),
                error: Arc::new(error.into()),
            })?;

        if F::Provides::RECORD {
            di.inject_constructed(&mut value)?;
        }

        tracing::debug!("Constructed instance of {}", std::any::type_name::<F::Provides>());
        Ok(Instance::new(value))
    }
}

/// A value registered as is
///
/// The value is moved into its instance on the first build. Later builds hand out
/// the same instance again.
pub(crate) struct ValueEntry<V> {
    pending: Mutex<Option<V>>,
    realized: Mutex<Option<(Instance, Vec<Key>)>>,
}

impl<V> ValueEntry<V> {
    pub(crate) fn new(value: V) -> Self {
        Self {
            pending: Mutex::new(Some(value)),
            realized: Mutex::new(None),
        }
    }
}

impl<V: Component> DynFactory for ValueEntry<V> {
    fn supplies(&self) -> TypeInfo {
        TypeInfo::of::<V>()
    }

    fn construct(&self, di: &DiHandle<'_>) -> Result<Instance, InjectError> {
        let realized = self.realized.lock().clone();
        if let Some((instance, dependencies)) = realized {
            for dependency in dependencies {
                di.record(dependency);
            }
            return Ok(instance);
        }

        let Some(value) = self.pending.lock().take() else {
            return Err(InjectError::ConstructionAborted(di.key().clone()));
        };
        let mut pending = Pending {
            slot: &self.pending,
            value: Some(value),
        };

        if V::RECORD {
            if let Some(value) = pending.value.as_mut() {
                di.inject_constructed(value)?;
            }
        }

        let Some(value) = pending.value.take() else {
            return Err(InjectError::ConstructionAborted(di.key().clone()));
        };
        let instance = Instance::new(value);
        *self.realized.lock() = Some((instance.clone(), di.consulted()));
        Ok(instance)
    }
}

/// A value taken out of its entry, put back on drop unless taken
///
/// Keeps the value for the next attempt when injection fails or panics.
struct Pending<'a, V> {
    slot: &'a Mutex<Option<V>>,
    value: Option<V>,
}

impl<V> Drop for Pending<'_, V> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            *self.slot.lock() = Some(value);
        }
    }
}
