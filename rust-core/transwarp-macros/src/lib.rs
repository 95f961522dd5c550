//! # `Transwarp` Macros
//!
//! Procedural macros for the `Transwarp` framework.
//!
//! - `#[get("/path")]` / `#[post("/path")]` turn a handler function into a route
//! - `#[interceptor("/pattern")]` turns a function into an interceptor
//! - `#[derive(Model)]` implements the ORM `Model` trait for a struct
//!
//! The attribute macros replace the function with a unit struct of the same
//! name implementing `IntoRoute` / `IntoInterceptor`, so the name can be
//! passed straight to `Application::add_url` / `add_interceptor`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{parse_macro_input, Data, DeriveInput, Fields, ItemFn, LitBool, LitStr, Path};

fn route(method: &str, attr: TokenStream, item: TokenStream) -> TokenStream {
    let path = parse_macro_input!(attr as LitStr);
    let func = parse_macro_input!(item as ItemFn);
    if !path.value().starts_with('/') {
        return syn::Error::new(path.span(), "route path must start with '/'")
            .to_compile_error()
            .into();
    }
    if let Some(asyncness) = &func.sig.asyncness {
        return syn::Error::new(asyncness.span(), "route handlers must be synchronous")
            .to_compile_error()
            .into();
    }

    let method = format_ident!("{}", method);
    let name = &func.sig.ident;
    let vis = &func.vis;
    let docs = func.attrs.iter().filter(|a| a.path().is_ident("doc"));

    quote! {
        #(#docs)*
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Copy)]
        #vis struct #name;

        impl ::transwarp::IntoRoute for #name {
            fn into_route(self) -> ::transwarp::Result<::transwarp::Route> {
                #func
                ::transwarp::Route::new(::transwarp::Method::#method, #path, #name)
            }
        }
    }
    .into()
}

/// Register a function as a `GET` route
///
/// ```ignore
/// #[get("/users/:id")]
/// fn user(ctx: &mut Context) -> Result<String, HttpError> {
///     Ok(format!("user {}", ctx.param("id").unwrap_or("")))
/// }
///
/// app.add_url(user)?;
/// ```
#[proc_macro_attribute]
pub fn get(attr: TokenStream, item: TokenStream) -> TokenStream {
    route("Get", attr, item)
}

/// Register a function as a `POST` route
#[proc_macro_attribute]
pub fn post(attr: TokenStream, item: TokenStream) -> TokenStream {
    route("Post", attr, item)
}

/// Register a function as an interceptor for paths matching the pattern
///
/// ```ignore
/// #[interceptor("/admin/")]
/// fn check_admin(ctx: &mut Context, next: Next<'_>) -> HandlerResult {
///     if ctx.request.cookie("admin").is_none() {
///         return Err(HttpError::see_other("/signin"));
///     }
///     next(ctx)
/// }
/// ```
#[proc_macro_attribute]
pub fn interceptor(attr: TokenStream, item: TokenStream) -> TokenStream {
    let pattern = parse_macro_input!(attr as LitStr);
    let func = parse_macro_input!(item as ItemFn);
    let name = &func.sig.ident;
    let label = name.to_string();
    let vis = &func.vis;
    let docs = func.attrs.iter().filter(|a| a.path().is_ident("doc"));

    quote! {
        #(#docs)*
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Copy)]
        #vis struct #name;

        impl ::transwarp::IntoInterceptor for #name {
            fn into_interceptor(self) -> ::transwarp::Result<::transwarp::Interceptor> {
                #func
                ::transwarp::Interceptor::new(#pattern, #name).map(|i| i.named(#label))
            }
        }
    }
    .into()
}

#[derive(Default)]
struct ModelAttrs {
    table: Option<LitStr>,
    pre_insert: Option<Path>,
    pre_update: Option<Path>,
    pre_delete: Option<Path>,
}

#[derive(Default)]
struct FieldAttrs {
    primary_key: bool,
    nullable: bool,
    updatable: Option<bool>,
    insertable: Option<bool>,
    ddl: Option<LitStr>,
    name: Option<LitStr>,
}

fn model_attrs(input: &DeriveInput) -> syn::Result<ModelAttrs> {
    let mut attrs = ModelAttrs::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("model")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                attrs.table = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("pre_insert") {
                attrs.pre_insert = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("pre_update") {
                attrs.pre_update = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("pre_delete") {
                attrs.pre_delete = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("unsupported model attribute"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

fn field_attrs(field: &syn::Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("field")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("primary_key") {
                attrs.primary_key = true;
            } else if meta.path.is_ident("nullable") {
                attrs.nullable = true;
            } else if meta.path.is_ident("updatable") {
                attrs.updatable = Some(meta.value()?.parse::<LitBool>()?.value);
            } else if meta.path.is_ident("insertable") {
                attrs.insertable = Some(meta.value()?.parse::<LitBool>()?.value);
            } else if meta.path.is_ident("ddl") {
                attrs.ddl = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("name") {
                attrs.name = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("unsupported field attribute"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

fn trigger(name: &str, path: Option<&Path>) -> TokenStream2 {
    let method = format_ident!("{}", name);
    path.map_or_else(TokenStream2::new, |path| {
        quote! {
            fn #method(&mut self) {
                #path(self);
            }
        }
    })
}

fn expand_model(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Model cannot be derived for generic structs",
        ));
    }
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(ident, "Model can only be derived for structs"));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(ident, "Model requires named fields"));
    };

    let model = model_attrs(input)?;
    let model_name = ident.to_string();

    let mut primary_keys = Vec::new();
    let mut builders = Vec::new();
    let mut to_row = Vec::new();
    let mut from_row = Vec::new();
    for field in &named.named {
        let attrs = field_attrs(field)?;
        let Some(member) = &field.ident else { continue };
        let ty = &field.ty;
        let attr_name = member.to_string();
        let column = attrs
            .name
            .as_ref()
            .map_or_else(|| attr_name.clone(), LitStr::value);

        let mut modifiers = Vec::new();
        if attrs.primary_key {
            primary_keys.push(member.clone());
            modifiers.push(quote!(.primary_key()));
        }
        if attrs.nullable {
            modifiers.push(quote!(.nullable()));
        }
        if let Some(updatable) = attrs.updatable {
            modifiers.push(quote!(.updatable(#updatable)));
        }
        if let Some(insertable) = attrs.insertable {
            modifiers.push(quote!(.insertable(#insertable)));
        }
        if let Some(ddl) = &attrs.ddl {
            modifiers.push(quote!(.ddl(#ddl)));
        }
        if attrs.name.is_some() {
            modifiers.push(quote!(.name(#column)));
        }

        builders.push(quote! {
            .field(#attr_name, <#ty as ::transwarp::orm::FieldType>::field() #(#modifiers)*)
        });
        to_row.push(quote! {
            row.insert(
                ::std::string::String::from(#column),
                ::transwarp::orm::DbValue::from(::std::clone::Clone::clone(&self.#member)),
            );
        });
        from_row.push(quote! {
            #member: ::transwarp::orm::read_column(mapping, row, #column)?,
        });
    }

    match primary_keys.len() {
        1 => {}
        0 => {
            return Err(syn::Error::new_spanned(
                ident,
                format!("Primary key not defined in class: {model_name}"),
            ))
        }
        _ => {
            return Err(syn::Error::new_spanned(
                &primary_keys[1],
                format!("Cannot define more than 1 primary key in class: {model_name}"),
            ))
        }
    }

    let table = model.table.as_ref().map(|t| quote!(.table(#t)));
    let pre_insert = trigger("pre_insert", model.pre_insert.as_ref());
    let pre_update = trigger("pre_update", model.pre_update.as_ref());
    let pre_delete = trigger("pre_delete", model.pre_delete.as_ref());

    Ok(quote! {
        impl ::transwarp::orm::Model for #ident {
            fn mapping() -> &'static ::transwarp::orm::Mapping {
                static MAPPING: ::std::sync::OnceLock<::transwarp::orm::Mapping> =
                    ::std::sync::OnceLock::new();
                MAPPING.get_or_init(|| {
                    ::transwarp::orm::Mapping::builder(#model_name)
                        #table
                        #(#builders)*
                        .build()
                        .unwrap_or_else(|e| panic!("{}", e))
                })
            }

            fn to_row(&self) -> ::transwarp::orm::Row {
                let mut row = ::transwarp::orm::Row::new();
                #(#to_row)*
                row
            }

            fn from_row(row: &::transwarp::orm::Row) -> ::transwarp::Result<Self> {
                let mapping = <Self as ::transwarp::orm::Model>::mapping();
                ::std::result::Result::Ok(Self {
                    #(#from_row)*
                })
            }

            #pre_insert
            #pre_update
            #pre_delete
        }
    })
}

/// Implement `transwarp::orm::Model` for a struct with named fields
///
/// ```ignore
/// #[derive(Model)]
/// #[model(table = "users", pre_insert = stamp)]
/// struct User {
///     #[field(primary_key)]
///     id: i64,
///     #[field(ddl = "varchar(50)")]
///     name: String,
///     #[field(updatable = false)]
///     created_at: f64,
///     email: Option<String>,
/// }
/// ```
///
/// Column metadata comes from the field type (`FieldType`) and the `#[field]`
/// attribute. Exactly one field must be the primary key.
#[proc_macro_derive(Model, attributes(model, field))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_model(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
