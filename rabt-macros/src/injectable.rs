//! `Injectable` derive implementation.

use darling::ast::{Data, Style};
use darling::util::Ignored;
use darling::{FromDeriveInput, FromField};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, GenericArgument, Path, PathArguments, Type, parse_macro_input, parse_quote};

#[derive(FromDeriveInput)]
#[darling(attributes(injectable), supports(struct_any))]
struct InjectableInput {
    ident: syn::Ident,
    generics: syn::Generics,
    data: Data<Ignored, InjectField>,
    #[darling(rename = "crate", default)]
    krate: Option<Path>,
}

#[derive(FromField)]
#[darling(attributes(inject))]
struct InjectField {
    ident: Option<syn::Ident>,
    ty: Type,
    #[darling(default)]
    default: bool,
}

/// How one field gets its value.
enum FieldSource {
    Dependency(Type),
    Default,
}

pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let parsed = match InjectableInput::from_derive_input(&input) {
        Ok(parsed) => parsed,
        Err(err) => return err.write_errors().into(),
    };

    match expand(parsed) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: InjectableInput) -> syn::Result<TokenStream2> {
    let krate = input.krate.unwrap_or_else(|| parse_quote!(::rabt));
    let name = &input.ident;

    let fields = match input.data {
        Data::Struct(fields) => fields,
        Data::Enum(_) => {
            return Err(syn::Error::new_spanned(name, "Injectable can only be derived for structs"));
        }
    };

    let mut errors: Option<syn::Error> = None;
    let mut sources = Vec::with_capacity(fields.fields.len());
    for field in &fields.fields {
        match field_source(field) {
            Ok(source) => sources.push(source),
            Err(err) => match errors.as_mut() {
                Some(all) => all.combine(err),
                None => errors = Some(err),
            },
        }
    }
    if let Some(errors) = errors {
        return Err(errors);
    }

    let dependency_keys = sources.iter().filter_map(|source| match source {
        FieldSource::Dependency(inner) => Some(quote!(#krate::TypeKey::of::<#inner>())),
        FieldSource::Default => None,
    });

    let values: Vec<TokenStream2> = sources
        .iter()
        .map(|source| match source {
            FieldSource::Dependency(inner) => quote!(deps.next::<#inner>()?),
            FieldSource::Default => quote!(::core::default::Default::default()),
        })
        .collect();

    let body = match fields.style {
        Style::Struct => {
            let idents = fields.fields.iter().map(|f| &f.ident);
            quote!(Self { #(#idents: #values),* })
        }
        Style::Tuple => quote!(Self( #(#values),* )),
        Style::Unit => quote!(Self),
    };

    let mut generics = input.generics.clone();
    let type_params: Vec<syn::Ident> = generics.type_params().map(|p| p.ident.clone()).collect();
    let where_clause = generics.make_where_clause();
    for param in type_params {
        where_clause
            .predicates
            .push(parse_quote!(#param: ::core::marker::Send + ::core::marker::Sync + 'static));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #krate::Injectable for #name #ty_generics #where_clause {
            fn dependencies() -> ::std::vec::Vec<#krate::TypeKey> {
                ::std::vec![#(#dependency_keys),*]
            }

            #[allow(unused_variables)]
            fn construct(deps: &mut #krate::Dependencies) -> #krate::Result<Self> {
                ::core::result::Result::Ok(#body)
            }
        }
    })
}

fn field_source(field: &InjectField) -> syn::Result<FieldSource> {
    if field.default {
        return Ok(FieldSource::Default);
    }

    handle_target(&field.ty).map(FieldSource::Dependency).ok_or_else(|| {
        syn::Error::new_spanned(
            &field.ty,
            "field must be a `Handle<T>` or be marked #[inject(default)]",
        )
    })
}

/// `U` for a field typed `Handle<U>` (any path ending in `Handle`).
fn handle_target(ty: &Type) -> Option<Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }

    let segment = path.path.segments.last()?;
    if segment.ident != "Handle" {
        return None;
    }

    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.iter().collect::<Vec<_>>().as_slice() {
        [GenericArgument::Type(inner)] => Some(inner.clone()),
        _ => None,
    }
}
