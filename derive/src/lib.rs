use proc_macro::TokenStream;
use quote::quote;
use syn::{parse::Parser, parse_macro_input, Data, DataStruct, DeriveInput, Fields, Meta};

/// 字段上的 `#[entity(...)]` 属性
#[derive(Default)]
struct FieldAttrs {
    /// 自定义查询表达式
    select: Option<String>,
    /// 不参与查询和写入，还原时使用 `Default`
    skip: bool,
    /// 数据库生成的列（如自增主键）：值为 NULL 时不写入
    auto: bool,
}

fn parse_field_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }
        let syn::Meta::List(list) = &attr.meta else {
            return Err(syn::Error::new_spanned(
                attr,
                "expected #[entity(select = \"...\")], #[entity(skip)] or #[entity(auto)]",
            ));
        };
        let parser = syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated;
        let metas = parser.parse2(list.tokens.clone())?;
        for meta in metas {
            match meta {
                Meta::Path(path) if path.is_ident("skip") => result.skip = true,
                Meta::Path(path) if path.is_ident("auto") => result.auto = true,
                Meta::NameValue(nv) if nv.path.is_ident("select") => {
                    if let syn::Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(s),
                        ..
                    }) = &nv.value
                    {
                        result.select = Some(s.value());
                    } else {
                        return Err(syn::Error::new_spanned(
                            &nv.value,
                            "select expects a string literal",
                        ));
                    }
                }
                other => {
                    return Err(syn::Error::new_spanned(other, "unknown entity attribute"));
                }
            }
        }
    }
    Ok(result)
}

/// 生成 `Entity` 和 `ToRecord` 的实现
///
/// 字段按声明顺序组成查询投影，行数据按字段名还原。
/// `select` 字段只用于读取；`auto` 字段为 NULL 时不写入；`skip` 字段完全忽略。
///
/// 使用示例：
/// ```ignore
/// #[derive(Debug, Entity)]
/// struct User {
///     #[entity(auto)]
///     id: Option<i64>,
///     name: String,
///     #[entity(select = "LOWER(email) AS email")]
///     email: String,
///     #[entity(skip)]
///     cached: Vec<String>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_entity(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_entity(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => &fields.named,
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Entity can only be derived for structs with named fields",
            ))
        }
    };

    let mut metas = Vec::new();
    let mut decode = Vec::new();
    let mut encode = Vec::new();

    for field in fields {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "field must be named"))?;
        let column = ident.to_string();
        let column = column.strip_prefix("r#").unwrap_or(&column).to_string();
        let attrs = parse_field_attrs(&field.attrs)?;

        if attrs.skip {
            decode.push(quote! { #ident: ::core::default::Default::default() });
            continue;
        }

        let selection = match &attrs.select {
            Some(expr) => quote! { ::core::option::Option::Some(#expr) },
            None => quote! { ::core::option::Option::None },
        };
        metas.push(quote! {
            ::sqlxrepo::FieldMeta { name: #column, selection: #selection }
        });
        decode.push(quote! { #ident: record.take_as(#column)? });

        // 带查询表达式的字段只读，不参与写入
        if attrs.select.is_some() {
            continue;
        }
        let value = quote! {
            ::sqlxrepo::BindValue::from(::core::clone::Clone::clone(&self.#ident))
        };
        if attrs.auto {
            encode.push(quote! {
                let value = #value;
                if !value.is_null() {
                    record.push(#column, value);
                }
            });
        } else {
            encode.push(quote! { record.push(#column, #value); });
        }
    }

    Ok(quote! {
        impl #impl_generics ::sqlxrepo::Entity for #name #ty_generics #where_clause {
            fn meta() -> &'static ::sqlxrepo::EntityMeta {
                static META: ::sqlxrepo::EntityMeta = ::sqlxrepo::EntityMeta {
                    name: #name_str,
                    fields: &[#(#metas),*],
                    untyped: false,
                };
                &META
            }

            fn from_record(mut record: ::sqlxrepo::Record) -> ::sqlxrepo::Result<Self> {
                ::core::result::Result::Ok(Self {
                    #(#decode),*
                })
            }
        }

        impl #impl_generics ::sqlxrepo::ToRecord for #name #ty_generics #where_clause {
            fn to_record(&self) -> ::sqlxrepo::Record {
                let mut record = ::sqlxrepo::Record::new();
                #(#encode)*
                record
            }
        }
    })
}
