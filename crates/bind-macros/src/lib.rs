//! Derive macros for `micro-bind`.
//!
//! - `#[derive(Bind)]` declares the binding schema of a request shape from `#[bind(..)]`
//!   field attributes
//! - `#[derive(Reply)]` marks a type as a handler reply, with optional capabilities taken
//!   from a `#[reply(..)]` container attribute

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, Token, parse_macro_input};

const SOURCES: [&str; 6] = ["path", "query", "header", "cookie", "request", "default"];

/// Derives `micro_bind::Bind`.
///
/// Every field may carry one `#[bind(..)]` attribute listing its sources, each at most once:
///
/// ```rust,ignore
/// #[derive(Default, Deserialize, Bind)]
/// struct ListUsers {
///     #[bind(path = "org")]
///     org: String,
///     #[bind(query = "size", default = "100")]
///     size: u32,
///     #[bind(header = "X-Request-Id")]
///     request_id: Option<String>,
///     #[bind(cookie = "session")]
///     session: String,
///     #[bind(request = "remote-addr")]
///     peer: String,
///     #[bind(nested)]
///     filter: Filter,
///     #[bind(nested_optional)]
///     paging: Option<Paging>,
/// }
/// ```
///
/// Fields without the attribute are left to the request body. Fields are named after the
/// member serde reads them from, so `#[serde(rename = "..")]` and a container
/// `#[serde(rename_all = "..")]` apply.
#[proc_macro_derive(Bind, attributes(bind))]
pub fn derive_bind(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_bind(&input).unwrap_or_else(syn::Error::into_compile_error).into()
}

/// Derives `micro_bind::Reply`.
///
/// ```rust,ignore
/// #[derive(Serialize, Reply)]
/// #[reply(status_code, headers)]
/// struct Accepted {
///     job: u64,
/// }
/// ```
///
/// - `empty`: values never have a body
/// - `status_code`: the type implements `StatusCoder`
/// - `headers`: the type implements `Headerer`
#[proc_macro_derive(Reply, attributes(reply))]
pub fn derive_reply(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_reply(&input).unwrap_or_else(syn::Error::into_compile_error).into()
}

enum FieldBinding {
    Sources(Vec<(String, LitStr)>),
    Nested,
    NestedOptional,
}

fn parse_field_binding(field: &syn::Field) -> syn::Result<Option<FieldBinding>> {
    let mut sources: Vec<(String, LitStr)> = Vec::new();
    let mut nested = false;
    let mut nested_optional = false;
    let mut seen = false;

    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("bind")) {
        seen = true;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("nested") {
                nested = true;
                return Ok(());
            }
            if meta.path.is_ident("nested_optional") {
                nested_optional = true;
                return Ok(());
            }

            let Some(source) = SOURCES.iter().find(|source| meta.path.is_ident(source)) else {
                return Err(meta.error("unsupported bind attribute, expected one of path, query, header, cookie, request, default, nested, nested_optional"));
            };
            let key: LitStr = meta.value()?.parse()?;
            if sources.iter().any(|(existing, _)| existing == source) {
                return Err(syn::Error::new_spanned(&key, format!("duplicate `{source}` binding")));
            }
            sources.push(((*source).to_owned(), key));
            Ok(())
        })?;
    }

    if !seen {
        return Ok(None);
    }

    match (nested, nested_optional, sources.is_empty()) {
        (false, false, _) => Ok(Some(FieldBinding::Sources(sources))),
        (true, false, true) => Ok(Some(FieldBinding::Nested)),
        (false, true, true) => Ok(Some(FieldBinding::NestedOptional)),
        _ => Err(syn::Error::new_spanned(field, "`nested` and `nested_optional` cannot be combined with other bindings")),
    }
}

fn expand_bind(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(input, "Bind can only be derived for structs"));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(input, "Bind can only be derived for structs with named fields"));
    };

    let rename_all = serde_rename(&input.attrs, "rename_all");
    let mut statements = Vec::new();
    for field in &fields.named {
        let Some(binding) = parse_field_binding(field)? else {
            continue;
        };
        let Some(ident) = &field.ident else {
            continue;
        };
        let name = match (serde_rename(&field.attrs, "rename"), rename_all.as_deref()) {
            (Some(renamed), _) => renamed,
            (None, Some(rule)) => apply_rename_rule(rule, &ident.unraw().to_string()),
            (None, None) => ident.unraw().to_string(),
        };

        let statement = match binding {
            FieldBinding::Nested => quote! {
                schema.nested(#name, |target| &mut target.#ident);
            },
            FieldBinding::NestedOptional => quote! {
                schema.nested_optional(#name, |target| &mut target.#ident);
            },
            FieldBinding::Sources(sources) => {
                let calls = sources.iter().map(|(source, key)| {
                    let method = syn::Ident::new(source, key.span());
                    quote! { .#method(#key) }
                });
                quote! {
                    schema.field(#name, |target| &mut target.#ident) #(#calls)*;
                }
            }
        };
        statements.push(statement);
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let schema_param = if statements.is_empty() { quote!(_schema) } else { quote!(schema) };

    Ok(quote! {
        impl #impl_generics ::micro_bind::Bind for #ident #ty_generics #where_clause {
            fn schema(#schema_param: &mut ::micro_bind::Schema<Self>) {
                #(#statements)*
            }
        }
    })
}

/// The deserialize-side value of `#[serde(<key> = "..")]` or `#[serde(<key>(deserialize = ".."))]`.
///
/// Other serde options are skipped, and attributes this reading does not understand are left
/// for serde to report.
fn serde_rename(attrs: &[Attribute], key: &str) -> Option<String> {
    let mut renamed = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        let _ = attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident(key) {
                return skip_meta_value(&meta);
            }
            if meta.input.peek(Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                renamed = Some(value.value());
                return Ok(());
            }
            meta.parse_nested_meta(|side| {
                if side.path.is_ident("deserialize") {
                    let value: LitStr = side.value()?.parse()?;
                    renamed = Some(value.value());
                    Ok(())
                } else {
                    skip_meta_value(&side)
                }
            })
        });
    }
    renamed
}

fn skip_meta_value(meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        let _content;
        syn::parenthesized!(_content in meta.input);
    }
    Ok(())
}

/// Applies a serde `rename_all` rule to a snake_case field name.
fn apply_rename_rule(rule: &str, field: &str) -> String {
    let pascal = || {
        field
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                chars.next().map(|first| first.to_ascii_uppercase().to_string() + chars.as_str()).unwrap_or_default()
            })
            .collect::<String>()
    };

    match rule {
        "UPPERCASE" | "SCREAMING_SNAKE_CASE" => field.to_ascii_uppercase(),
        "PascalCase" => pascal(),
        "camelCase" => {
            let pascal = pascal();
            let mut chars = pascal.chars();
            chars.next().map(|first| first.to_ascii_lowercase().to_string() + chars.as_str()).unwrap_or_default()
        }
        "kebab-case" => field.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => field.to_ascii_uppercase().replace('_', "-"),
        _ => field.to_owned(),
    }
}

fn expand_reply(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let mut empty = false;
    let mut status_code = false;
    let mut headers = false;

    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("reply")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("empty") {
                empty = true;
            } else if meta.path.is_ident("status_code") {
                status_code = true;
            } else if meta.path.is_ident("headers") {
                headers = true;
            } else {
                return Err(meta.error("unsupported reply attribute, expected one of empty, status_code, headers"));
            }
            Ok(())
        })?;
    }

    let empty_items = empty.then(|| {
        quote! {
            const EMPTINESS: ::micro_bind::Emptiness = ::micro_bind::Emptiness::Marker;

            fn is_empty_value(&self) -> bool {
                true
            }
        }
    });
    let status_item = status_code.then(|| {
        quote! {
            fn status_coder(&self) -> ::core::option::Option<&dyn ::micro_bind::StatusCoder> {
                ::core::option::Option::Some(self)
            }
        }
    });
    let headers_item = headers.then(|| {
        quote! {
            fn headerer(&self) -> ::core::option::Option<&dyn ::micro_bind::Headerer> {
                ::core::option::Option::Some(self)
            }
        }
    });

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::micro_bind::Reply for #ident #ty_generics #where_clause {
            #empty_items
            #status_item
            #headers_item
        }
    })
}
