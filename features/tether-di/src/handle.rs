use parking_lot::Mutex;

use crate::{
    component::Component,
    errors::InjectError,
    field::{FieldInjector, InjectOptions},
    injector::Injector,
    key::Key,
    resolver::Resolver,
    types::Instance,
};

/// Handle given to factories while they construct their value
///
/// Everything requested through the handle becomes a dependency of the value
/// being constructed. The handle is only valid during construction.
pub struct DiHandle<'a> {
    injector: &'a Injector,
    key: &'a Key,
    consulted: Mutex<Vec<Key>>,
}

impl<'a> DiHandle<'a> {
    pub(crate) fn new(injector: &'a Injector, key: &'a Key) -> Self {
        Self {
            injector,
            key,
            consulted: Mutex::new(Vec::new()),
        }
    }

    /// Key of the value under construction
    pub fn key(&self) -> &Key {
        self.key
    }

    pub fn get(&self, key: impl Into<Key>) -> Result<Instance, InjectError> {
        let (canonical, instance) = self.injector.resolve_instance(&key.into())?;
        self.record(canonical);
        Ok(instance)
    }

    /// Attempts to get the requested type, see [Injector::require]
    pub fn require<T: Resolver>(&self) -> Result<T, InjectError> {
        let key = T::type_key();
        let (canonical, instance) = self
            .injector
            .resolve_instance_among(&key, &T::alternate_type_keys())?;
        self.record(canonical);
        T::resolve(&key, &instance)
    }

    pub fn require_key<T: Resolver>(&self, key: impl Into<Key>) -> Result<T, InjectError> {
        let key = key.into();
        let instance = self.get(&key)?;
        T::resolve(&key, &instance)
    }

    /// Injects the fields of a freshly constructed record
    pub(crate) fn inject_constructed<C: Component>(&self, target: &mut C) -> Result<(), InjectError> {
        let mut consulted = Vec::new();
        let mut fields = FieldInjector::new(self.injector, &mut consulted, InjectOptions::default());
        let result = target.inject_fields(&mut fields);

        self.consulted.lock().extend(consulted);
        result
    }

    pub(crate) fn record(&self, key: Key) {
        let mut consulted = self.consulted.lock();
        if !consulted.contains(&key) {
            consulted.push(key);
        }
    }

    pub(crate) fn consulted(&self) -> Vec<Key> {
        self.consulted.lock().clone()
    }

    pub(crate) fn into_consulted(self) -> Vec<Key> {
        self.consulted.into_inner()
    }
}
