//! Structural injection into annotated record fields

use std::sync::OnceLock;

use crate::{errors::InjectError, injector::Injector, key::Key, resolver::Resolver};

/// Marker selecting injection by the field's declared type
pub const TYPE_MARKER: &str = "type";

/// Parsed field annotation
///
/// `"name"` injects by name, `",type"` by the field's type and `"name,type"`
/// by name. An empty annotation leaves the field alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldTag<'a> {
    pub name: &'a str,
    pub by_type: bool,
}

impl<'a> FieldTag<'a> {
    pub fn parse(tag: &'a str) -> FieldTag<'a> {
        let mut parts = tag.split(',');
        let name = parts.next().unwrap_or_default().trim();
        let by_type = parts.any(|part| part.trim() == TYPE_MARKER);

        FieldTag { name, by_type }
    }

    /// The key to resolve for a field holding `R`, None if it isn't injected
    pub fn key<R: Resolver>(&self) -> Option<Key> {
        if !self.name.is_empty() {
            Some(Key::from(self.name))
        } else if self.by_type {
            Some(R::type_key())
        } else {
            None
        }
    }
}

/// A field slot values can be injected into
///
/// Injection only happens while the slot is empty, values set by hand are kept.
pub trait InjectField {
    type Value: Resolver;

    fn is_empty(&self) -> bool;

    /// Places the value into the slot, handing it back if the slot can't be written
    fn assign(&mut self, value: Self::Value) -> Result<(), Self::Value>;
}

impl<R: Resolver> InjectField for Option<R> {
    type Value = R;

    fn is_empty(&self) -> bool {
        self.is_none()
    }

    fn assign(&mut self, value: R) -> Result<(), R> {
        *self = Some(value);
        Ok(())
    }
}

/// Write once slot, e.g. for records which are shared before injection
impl<R: Resolver> InjectField for OnceLock<R> {
    type Value = R;

    fn is_empty(&self) -> bool {
        self.get().is_none()
    }

    fn assign(&mut self, value: R) -> Result<(), R> {
        self.set(value)
    }
}

/// Options for [Injector::inject_with]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectOptions {
    /// Field errors are logged and skipped instead of aborting injection
    pub skip_field_errors: bool,
}

impl InjectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_field_errors(mut self, skip: bool) -> Self {
        self.skip_field_errors = skip;
        self
    }
}

/// Hands values to the fields of a record
///
/// Passed to [Component::inject_fields](crate::Component::inject_fields). Every
/// key a field was successfully resolved from is remembered, so the record's
/// dependencies can be recorded in the graph.
pub struct FieldInjector<'a> {
    injector: &'a Injector,
    consulted: &'a mut Vec<Key>,
    options: InjectOptions,
}

impl<'a> FieldInjector<'a> {
    pub(crate) fn new(
        injector: &'a Injector,
        consulted: &'a mut Vec<Key>,
        options: InjectOptions,
    ) -> Self {
        Self {
            injector,
            consulted,
            options,
        }
    }

    /// Injects a single field
    ///
    /// `name` is only used for error reporting, `tag` is the field's annotation.
    pub fn field<F: InjectField>(
        &mut self,
        name: &'static str,
        tag: &str,
        slot: &mut F,
    ) -> Result<(), InjectError> {
        let tag = FieldTag::parse(tag);
        let Some(key) = tag.key::<F::Value>() else {
            return Ok(());
        };
        if !slot.is_empty() {
            return Ok(());
        }
        let alternates = if tag.name.is_empty() {
            F::Value::alternate_type_keys()
        } else {
            Vec::new()
        };

        match self.inject_field(name, key, &alternates, slot) {
            Err(err) if self.options.skip_field_errors => {
                tracing::trace!("Skipped field '{name}': {err}");
                Ok(())
            }
            result => result,
        }
    }

    fn inject_field<F: InjectField>(
        &mut self,
        field: &'static str,
        key: Key,
        alternates: &[Key],
        slot: &mut F,
    ) -> Result<(), InjectError> {
        let with_context = |source: InjectError| InjectError::Field {
            field,
            key: key.clone(),
            source: Box::new(source),
        };

        let (canonical, instance) = self
            .injector
            .resolve_instance_among(&key, alternates)
            .map_err(with_context)?;
        let value = F::Value::resolve(&key, &instance).map_err(with_context)?;
        if slot.assign(value).is_err() {
            return Err(with_context(InjectError::InvalidField {
                field,
                key: key.clone(),
            }));
        }

        tracing::trace!("Injected '{canonical}' into field '{field}'");
        self.consulted.push(canonical);
        Ok(())
    }
}
