//! Lazily constructed, dependency tracked singletons
//!
//! An [Injector] maps [Key]s to values or factories. Values are constructed on
//! their first request, every key a construction consults is recorded as a
//! dependency, and records get their annotated fields injected.
//!
//! ```rust
//! use std::sync::Arc;
//! use tether_di::{Component, Injector};
//!
//! struct Database;
//! impl Component for Database {}
//!
//! #[derive(Default, Component)]
//! struct Service {
//!     #[inject("db")]
//!     db: Option<Arc<Database>>,
//!     #[inject(",type")]
//!     retries: Option<u8>,
//! }
//!
//! let injector = Injector::new();
//! injector.add("db", Database);
//! injector.add("retries", 3_u8);
//!
//! let mut service = Service::default();
//! injector.inject(&mut service).unwrap();
//! assert_eq!(service.retries, Some(3));
//! ```

mod component;
mod container;
mod dependency_graph;
mod errors;
mod factories;
mod field;
mod global;
mod handle;
mod injector;
mod key;
mod mutable;
mod provider;
mod resolver;
mod types;

pub use component::Component;
pub use dependency_graph::DependencyGraph;
pub use errors::InjectError;
pub use factories::{FnFactory, InstanceFactory};
pub use field::{FieldInjector, FieldTag, InjectField, InjectOptions, TYPE_MARKER};
pub use global::{add, add_factory, default_injector, get, inject, inject_with, require, require_key};
pub use handle::DiHandle;
pub use injector::Injector;
pub use key::Key;
pub use mutable::{absorb_into_new, MutableValue};
pub use provider::Provider;
pub use resolver::{cloned, Resolver};
pub use types::{DynError, Injectable, Instance, TypeInfo};

#[cfg(feature = "macros")]
pub use tether_macros::Component;
