//! The process wide default injector and shortcuts to it

use std::sync::LazyLock;

use crate::{
    component::Component,
    errors::InjectError,
    field::InjectOptions,
    handle::DiHandle,
    injector::Injector,
    key::Key,
    resolver::Resolver,
    types::{DynError, Instance},
};

// Created on first access
static DEFAULT: LazyLock<Injector> = LazyLock::new(Injector::new);

/// The default injector
///
/// Independent injectors are created with [Injector::new].
///
/// ```
/// tether_di::default_injector().add("greeting", "hello");
/// assert_eq!(tether_di::require_key::<&str>("greeting").unwrap(), "hello");
/// ```
pub fn default_injector() -> &'static Injector {
    &DEFAULT
}

/// [Injector::add] on the default injector
pub fn add<V: Component>(key: impl Into<Key>, value: V) {
    DEFAULT.add(key, value)
}

/// [Injector::add_factory] on the default injector
pub fn add_factory<V, E, F>(key: impl Into<Key>, factory: F)
where
    V: Component,
    E: Into<DynError> + 'static,
    F: Fn(&DiHandle<'_>) -> Result<V, E> + Send + Sync + 'static,
{
    DEFAULT.add_factory(key, factory)
}

pub fn get(key: impl Into<Key>) -> Result<Instance, InjectError> {
    DEFAULT.get(key)
}

pub fn require<T: Resolver>() -> Result<T, InjectError> {
    DEFAULT.require()
}

pub fn require_key<T: Resolver>(key: impl Into<Key>) -> Result<T, InjectError> {
    DEFAULT.require_key(key)
}

pub fn inject<C: Component>(target: &mut C) -> Result<(), InjectError> {
    DEFAULT.inject(target)
}

pub fn inject_with<C: Component>(target: &mut C, options: InjectOptions) -> Result<(), InjectError> {
    DEFAULT.inject_with(target, options)
}
