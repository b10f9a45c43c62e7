use std::sync::Arc;

use thiserror::Error;

use crate::{
    key::Key,
    types::{DynError, Instance},
};

/// Errors while resolving, constructing or injecting values
///
/// Clone, so a single failed construction can be handed to every waiting caller.
#[derive(Error, Debug, Clone)]
pub enum InjectError {
    /// Nothing is registered under the key
    #[error("'{0}' not found")]
    NotFound(Key),

    /// The resolved value can not be used as the requested type
    #[error("invalid type: '{key}' is required as '{expected}' but is '{actual}'")]
    InvalidType {
        key: Key,
        expected: &'static str,
        actual: &'static str,
    },

    /// The target field can not be written
    #[error("invalid field: field '{field}' is not settable (key '{key}')")]
    InvalidField { field: &'static str, key: Key },

    /// Inject was handed something without injectable fields
    #[error("value must be a record with injectable fields, got '{0}'")]
    PtrToStruct(&'static str),

    /// The key was requested again while it was being constructed
    #[error("A Circular Dependency exists on '{key}' through {chain:?}")]
    CyclicDependency { key: Key, chain: Vec<Key> },

    /// The construction this caller waited on never finished
    #[error("construction of '{0}' was aborted")]
    ConstructionAborted(Key),

    /// A Factory failed to build
    #[error("Factory for '{key}' failed - error: {error}")]
    FactoryFailed { key: Key, error: Arc<DynError> },

    /// Injecting a single field failed
    #[error("failed to inject field '{field}' ({key}): {source}")]
    Field {
        field: &'static str,
        key: Key,
        source: Box<InjectError>,
    },
}

impl InjectError {
    pub(crate) fn invalid_type<T: ?Sized>(key: &Key, instance: &Instance) -> Self {
        InjectError::InvalidType {
            key: key.clone(),
            expected: std::any::type_name::<T>(),
            actual: instance.info.type_name,
        }
    }

    /// The innermost error, unwrapping field context
    pub fn root(&self) -> &InjectError {
        match self {
            InjectError::Field { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), InjectError::NotFound(_))
    }
}
