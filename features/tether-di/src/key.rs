use std::{fmt, sync::Arc};

use crate::types::TypeInfo;

/// Identity of a registered value
///
/// Either a literal name or the type a value is registered as.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Named(Arc<str>),
    Type(TypeInfo),
}

impl Key {
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Key::Named(name.into())
    }

    /// Key of a type, `T` may be unsized e.g. `dyn Trait`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Key::Type(TypeInfo::of::<T>())
    }

    pub fn is_type_key(&self) -> bool {
        matches!(self, Key::Type(_))
    }

    pub fn type_info(&self) -> Option<TypeInfo> {
        match self {
            Key::Named(_) => None,
            Key::Type(info) => Some(*info),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Named(name.into())
    }
}
impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Named(name.into())
    }
}
impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}
impl From<TypeInfo> for Key {
    fn from(info: TypeInfo) -> Self {
        Key::Type(info)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Named(name) => f.write_str(name),
            Key::Type(info) => f.write_str(info.type_name),
        }
    }
}
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Key::Type(info) => f.debug_tuple("Type").field(&info.type_name).finish(),
        }
    }
}
