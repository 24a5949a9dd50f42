//! Procedural macros for rabt.
//!
//! * `#[derive(Injectable)]` - dependency descriptor and constructor from
//!   struct fields

use proc_macro::TokenStream;

mod injectable;

/// Derives `rabt::Injectable` for a struct.
///
/// Every field must be either a `Handle<U>`, which becomes a dependency on
/// `U` in field order, or carry `#[inject(default)]`, which fills it with
/// `Default::default()` and adds no dependency.
///
/// ```ignore
/// #[derive(Injectable)]
/// struct Mailer {
///     config: Handle<Config>,
///     transport: Handle<Transport>,
///     #[inject(default)]
///     sent: AtomicUsize,
/// }
/// ```
///
/// Generates:
/// * `dependencies()` returning `[TypeKey::of::<Config>(), TypeKey::of::<Transport>()]`
/// * `construct()` pulling both handles in that order
///
/// # Attributes
///
/// - `#[inject(default)]` - field-level, build the field with `Default`
/// - `#[injectable(crate = "path")]` - struct-level, path to the `rabt`
///   crate when it is re-exported or renamed (default `::rabt`)
#[proc_macro_derive(Injectable, attributes(inject, injectable))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    injectable::derive_injectable(input)
}
