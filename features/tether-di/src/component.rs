//! Values that can be stored in an [Injector](crate::Injector)

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use crate::{errors::InjectError, field::FieldInjector, mutable::MutableValue, types::Injectable};

/// Anything that can be registered in the injector
///
/// Plain values keep every default. Records, structs with injectable fields, set
/// [Component::RECORD] and populate their fields in [Component::inject_fields].
/// `#[derive(Component)]` generates both.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use tether_di::{Component, FieldInjector, InjectError};
///
/// struct Database;
/// impl Component for Database {}
///
/// #[derive(Default)]
/// struct Repository {
///     db: Option<Arc<Database>>,
/// }
///
/// impl Component for Repository {
///     const RECORD: bool = true;
///
///     fn inject_fields(&mut self, fields: &mut FieldInjector<'_>) -> Result<(), InjectError> {
///         fields.field("db", "database", &mut self.db)
///     }
/// }
/// ```
pub trait Component: Injectable {
    /// Whether the value has injectable fields
    const RECORD: bool = false;

    /// Populates every annotated field through `fields`
    fn inject_fields(&mut self, fields: &mut FieldInjector<'_>) -> Result<(), InjectError> {
        let _ = fields;
        Ok(())
    }

    /// Exposes the value's [MutableValue] capability, if it has one
    fn as_mutable(&self) -> Option<&dyn MutableValue> {
        None
    }
}

macro_rules! plain_component {
    ($($ty:ty),* $(,)?) => {
        $(impl Component for $ty {})*
    };
}

plain_component! {
    (), bool, char,
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64,
    &'static str, String, PathBuf, Duration,
}

impl<T: ?Sized + Send + Sync + 'static> Component for Arc<T> {}
impl<T: ?Sized + Send + Sync + 'static> Component for Box<T> {}
impl<T: Injectable> Component for Option<T> {}
impl<T: Injectable> Component for Vec<T> {}
impl<T: Injectable> Component for VecDeque<T> {}
impl<T: Injectable> Component for BTreeSet<T> {}
impl<K: Injectable, V: Injectable> Component for BTreeMap<K, V> {}
impl<T: Injectable, S: Injectable> Component for HashSet<T, S> {}
impl<K: Injectable, V: Injectable, S: Injectable> Component for HashMap<K, V, S> {}
