use std::{fmt::Debug, sync::Arc};

use parking_lot::RwLock;

use crate::{
    component::Component,
    container::ContainerProvider,
    dependency_graph::DependencyGraph,
    errors::InjectError,
    factories::{DynFactory, FactoryEntry, FnFactory, InstanceFactory, ValueEntry},
    field::{FieldInjector, InjectOptions},
    handle::DiHandle,
    key::Key,
    resolver::Resolver,
    types::{DynError, Instance, TypeInfo},
};

/// Stores, lazily constructs and injects values
///
/// Cloning is cheap, every clone refers to the same registry.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use tether_di::{DiHandle, InjectError, Injector, Key};
///
/// struct Database {
///     url: String,
/// }
/// impl tether_di::Component for Database {}
///
/// let injector = Injector::new();
/// injector.add("url", String::from("postgres://localhost"));
/// injector.add_factory("db", |di: &DiHandle<'_>| {
///     let url = di.require_key::<String>("url")?;
///     Ok::<_, InjectError>(Database { url })
/// });
///
/// let db = injector.require_key::<Arc<Database>>("db").unwrap();
/// assert_eq!(db.url, "postgres://localhost");
/// assert_eq!(injector.dependencies("db"), vec![Key::from("url")]);
/// ```
#[derive(Clone, Default)]
pub struct Injector(Arc<InjectorInner>);

#[derive(Default)]
struct InjectorInner {
    graph: RwLock<DependencyGraph<Arc<ContainerProvider>>>,
}

impl Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let graph = self.0.graph.read();
        let mut map = f.debug_map();
        for key in graph.keys() {
            map.entry(key, &graph.dependencies(key));
        }
        map.finish()
    }
}

impl Injector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a value under `key`
    ///
    /// If the value already registered under `key` was constructed and can absorb
    /// updates (see [MutableValue](crate::MutableValue)), it absorbs `value` and
    /// stays in place. Otherwise `value` replaces it. Either way the key's own
    /// dependencies are cleared, dependents are not reconstructed.
    pub fn add<V: Component>(&self, key: impl Into<Key>, value: V) {
        let key = key.into();

        let existing = self.0.graph.read().get(&key).cloned();
        if let Some(instance) = existing.and_then(|provider| provider.constructed()) {
            match instance.absorb(&value) {
                Some(Ok(())) => {
                    tracing::debug!("'{key}' absorbed a new {}", std::any::type_name::<V>());
                    self.0.graph.write().remove_dependencies(&key);
                    return;
                }
                Some(Err(err)) => tracing::warn!("'{key}' rejected the new value, replacing it: {err}"),
                None => {}
            }
        }

        self.install(key, Box::new(ValueEntry::new(value)));
    }

    /// Registers a closure constructing the value on its first request
    pub fn add_factory<V, E, F>(&self, key: impl Into<Key>, factory: F)
    where
        V: Component,
        E: Into<DynError> + 'static,
        F: Fn(&DiHandle<'_>) -> Result<V, E> + Send + Sync + 'static,
    {
        self.add_instance_factory(key, FnFactory::new(factory));
    }

    pub fn add_instance_factory<F: InstanceFactory>(&self, key: impl Into<Key>, factory: F) {
        self.install(key.into(), Box::new(FactoryEntry(factory)));
    }

    fn install(&self, key: Key, factory: Box<dyn DynFactory>) {
        let provider = Arc::new(ContainerProvider::new(key.clone(), factory));
        let supplies = provider.supplies();

        let mut graph = self.0.graph.write();
        match graph.add(key.clone(), provider) {
            Some(previous) => {
                previous.invalidate();
                graph.remove_dependencies(&key);
                tracing::debug!("Replaced '{key}' with {supplies}");
            }
            None => tracing::debug!("Registered '{key}' as {supplies}"),
        }
    }

    /// Gets the value registered under `key`, constructing it if needed
    pub fn get(&self, key: impl Into<Key>) -> Result<Instance, InjectError> {
        self.resolve_instance(&key.into())
            .map(|(_, instance)| instance)
    }

    /// Gets and constructs the value for `key`, recording its dependencies
    ///
    /// Returns the key the value is registered under alongside it.
    pub(crate) fn resolve_instance(&self, key: &Key) -> Result<(Key, Instance), InjectError> {
        self.resolve_instance_among(key, &[])
    }

    /// Like [Injector::resolve_instance], also trying the `alternates` of a type key
    pub(crate) fn resolve_instance_among(
        &self,
        key: &Key,
        alternates: &[Key],
    ) -> Result<(Key, Instance), InjectError> {
        let (canonical, provider) = self
            .resolve(key, alternates)
            .ok_or_else(|| InjectError::NotFound(key.clone()))?;

        let container = provider.provide_container(self)?;
        self.0
            .graph
            .write()
            .add_dependencies(&canonical, &container.dependencies);

        Ok((canonical, container.instance))
    }

    /// Looks `key` and then each alternate up directly. Type keys fall back to the
    /// most recent registration supplying any of the wanted types.
    fn resolve(&self, key: &Key, alternates: &[Key]) -> Option<(Key, Arc<ContainerProvider>)> {
        let graph = self.0.graph.read();
        for candidate in std::iter::once(key).chain(alternates) {
            if let Some((registered, provider)) = graph.lookup(candidate) {
                return Some((registered.clone(), provider.clone()));
            }
        }

        let wanted: Vec<TypeInfo> = std::iter::once(key)
            .chain(alternates)
            .filter_map(Key::type_info)
            .collect();
        if wanted.is_empty() {
            return None;
        }
        let (registered, provider) = graph.find(|_, provider| {
            let supplies = provider.supplies();
            wanted.iter().any(|info| info.type_id == supplies.type_id)
        })?;
        tracing::trace!("Resolved {key} to '{registered}'");
        Some((registered.clone(), provider.clone()))
    }

    /// Attempts to get the requested type
    ///
    /// Besides `T::type_key()` the alternate type keys of `T` are searched, so
    /// `require::<Arc<T>>()` finds values registered as `T` or as `Arc<T>`.
    pub fn require<T: Resolver>(&self) -> Result<T, InjectError> {
        let key = T::type_key();
        let (_, instance) = self.resolve_instance_among(&key, &T::alternate_type_keys())?;
        T::resolve(&key, &instance)
    }

    pub fn require_key<T: Resolver>(&self, key: impl Into<Key>) -> Result<T, InjectError> {
        let key = key.into();
        let (_, instance) = self.resolve_instance(&key)?;
        T::resolve(&key, &instance)
    }

    /// Injects every annotated, empty field of `target`
    pub fn inject<C: Component>(&self, target: &mut C) -> Result<(), InjectError> {
        self.inject_with(target, InjectOptions::default())
    }

    pub fn inject_with<C: Component>(
        &self,
        target: &mut C,
        options: InjectOptions,
    ) -> Result<(), InjectError> {
        if !C::RECORD {
            return Err(InjectError::PtrToStruct(std::any::type_name::<C>()));
        }

        let mut consulted = Vec::new();
        let mut fields = FieldInjector::new(self, &mut consulted, options);
        target.inject_fields(&mut fields)?;

        tracing::debug!(
            "Injected {} field(s) of {}",
            consulted.len(),
            std::any::type_name::<C>()
        );
        Ok(())
    }

    /// Keys `key` depends on
    pub fn dependencies(&self, key: impl Into<Key>) -> Vec<Key> {
        self.0.graph.read().dependencies(&key.into())
    }

    /// Keys depending on `key`
    pub fn dependents(&self, key: impl Into<Key>) -> Vec<Key> {
        self.0.graph.read().dependents(&key.into())
    }

    pub fn contains(&self, key: impl Into<Key>) -> bool {
        self.0.graph.read().contains(&key.into())
    }

    /// Discards the constructed value of `key`, the next request constructs it again
    ///
    /// Returns false if nothing is registered under `key`.
    pub fn invalidate(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        let provider = self.0.graph.read().get(&key).cloned();
        match provider {
            Some(provider) => {
                provider.invalidate();
                true
            }
            None => false,
        }
    }

    /// All registered keys, sorted
    pub fn keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self.0.graph.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}
