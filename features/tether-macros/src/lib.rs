//! Derive macros for tether-di
//!
//! - `#[derive(Component)]` wires a record's annotated fields into the injector

use proc_macro::TokenStream;

mod component;

/// Derive macro implementing `tether_di::Component` for a record
///
/// Every field annotated with `#[inject(...)]` is injected while it is empty.
/// The annotation takes the key: `"name"` injects by name, `",type"` by the
/// field's type, `"name,type"` by name. A bare `#[inject]` is `",type"`.
///
/// Fields must implement `tether_di::InjectField`, e.g. `Option<Arc<T>>`,
/// `Option<String>` or `OnceLock<Provider<T>>`.
///
/// `#[component(mutable)]` marks a record implementing `tether_di::MutableValue`,
/// so it absorbs re-added values instead of being replaced. It also implements
/// `tether_di::Resolver`: a field of the record's type is filled with a fresh
/// `Default` value that absorbs the resolved one, which requires `Default + Clone`.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use tether_di::Component;
///
/// #[derive(Default, Component)]
/// struct UserService {
///     #[inject("db")]
///     db: Option<Arc<Database>>,
///     #[inject]
///     config: Option<Arc<Config>>,
///     // not injected
///     cache: Vec<User>,
/// }
///
/// // Generated implementation:
/// // impl tether_di::Component for UserService {
/// //     const RECORD: bool = true;
/// //     fn inject_fields(&mut self, fields: &mut FieldInjector<'_>) -> Result<(), InjectError> {
/// //         fields.field("db", "db", &mut self.db)?;
/// //         fields.field("config", ",type", &mut self.config)?;
/// //         Ok(())
/// //     }
/// // }
/// ```
#[proc_macro_derive(Component, attributes(inject, component))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    component::derive_component_impl(input)
}
