//! Derive macros for robomodel record types
//!
//! `#[derive(Model)]` builds the static attribute descriptor table of a
//! struct, `#[derive(ModelEnum)]` stores a fieldless enum by variant name.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{
    Data, DeriveInput, Fields, Ident, LitStr, Type, Visibility, parse_macro_input,
    spanned::Spanned,
};

#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_model(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[proc_macro_derive(ModelEnum, attributes(model))]
pub fn derive_model_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_model_enum(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct ModelOptions {
    table: Option<String>,
    database: Option<String>,
    exclude_by_default: bool,
}

#[derive(Default)]
struct FieldOptions {
    save: bool,
    exclude: bool,
    json: bool,
    column: Option<String>,
}

struct ModelField {
    ident: Ident,
    ty: Type,
    column: String,
    public: bool,
    options: FieldOptions,
}

impl ModelField {
    fn is_persistable(&self, exclude_by_default: bool) -> bool {
        (self.options.save || (!exclude_by_default && self.public)) && !self.options.exclude
    }
}

fn expand_model(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.generics,
            "Model does not support generic structs",
        ));
    }

    let options = parse_model_options(&input.attrs)?;

    let data_struct = match input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Model can only be derived for structs",
            ));
        }
    };

    let named_fields: Vec<syn::Field> = match data_struct.fields {
        Fields::Named(fields) => fields.named.into_iter().collect(),
        Fields::Unit => Vec::new(),
        Fields::Unnamed(_) => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Model requires named fields",
            ));
        }
    };

    let mut fields = Vec::<ModelField>::new();
    for field in named_fields {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "Model requires named fields"))?;
        let field_options = parse_field_options(&field.attrs)?;
        let column = field_options
            .column
            .clone()
            .unwrap_or_else(|| ident.unraw().to_string());
        fields.push(ModelField {
            ident,
            ty: field.ty,
            column,
            public: matches!(field.vis, Visibility::Public(_)),
            options: field_options,
        });
    }

    let type_name = struct_name.to_string();
    let table = options.table.clone().unwrap_or_else(|| type_name.clone());
    if table.trim().is_empty() {
        return Err(syn::Error::new(
            struct_name.span(),
            "#[model(table = \"...\")] must not be empty",
        ));
    }
    let database = match &options.database {
        Some(database) => quote! { ::core::option::Option::Some(#database) },
        None => quote! { ::core::option::Option::None },
    };
    let exclude_by_default = options.exclude_by_default;

    let mut accessors = Vec::<TokenStream2>::new();
    let mut descriptors = Vec::<TokenStream2>::new();
    for field in &fields {
        let ident = &field.ident;
        let ty = &field.ty;
        let column = &field.column;
        let suffix = ident.unraw().to_string();

        let storage = if field.options.json || !field.is_persistable(exclude_by_default) {
            quote! { ::robomodel::StorageType::Text }
        } else {
            quote! { <#ty as ::robomodel::FieldCodec>::STORAGE }
        };

        let mut meta = quote! {
            ::robomodel::FieldMeta::new(#column, ::core::any::type_name::<#ty>(), #storage)
        };
        if field.public {
            meta = quote! { #meta.public() };
        }
        if field.options.save {
            meta = quote! { #meta.save() };
        }
        if field.options.exclude {
            meta = quote! { #meta.exclude() };
        }

        if !field.is_persistable(exclude_by_default) {
            descriptors.push(quote! { ::robomodel::Field::skipped(#meta) });
            continue;
        }

        let encode_fn = format_ident!("__robomodel_encode_{}", suffix);
        let decode_fn = format_ident!("__robomodel_decode_{}", suffix);
        let (encode_body, decode_body) = if field.options.json {
            (
                quote! { ::robomodel::codec::encode_json(&record.#ident) },
                quote! { record.#ident = ::robomodel::codec::decode_json(value)?; },
            )
        } else {
            (
                quote! { ::robomodel::FieldCodec::encode(&record.#ident) },
                quote! { record.#ident = <#ty as ::robomodel::FieldCodec>::decode(value)?; },
            )
        };

        accessors.push(quote! {
            fn #encode_fn(
                record: &#struct_name,
            ) -> ::core::result::Result<
                ::core::option::Option<::robomodel::codec::Value>,
                ::robomodel::Reject,
            > {
                #encode_body
            }

            fn #decode_fn(
                record: &mut #struct_name,
                value: ::robomodel::codec::ValueRef<'_>,
            ) -> ::core::result::Result<(), ::robomodel::Reject> {
                #decode_body
                ::core::result::Result::Ok(())
            }
        });
        descriptors.push(quote! { ::robomodel::Field::new(#meta, #encode_fn, #decode_fn) });
    }

    Ok(quote! {
        impl ::robomodel::Model for #struct_name {
            #[allow(non_snake_case)]
            fn schema() -> ::robomodel::Result<&'static ::robomodel::Schema<Self>> {
                static SCHEMA: ::robomodel::SchemaCell<#struct_name> = ::robomodel::SchemaCell::new();

                #(#accessors)*

                SCHEMA.get_or_build(|| {
                    ::robomodel::Schema::build(
                        ::robomodel::ModelMeta {
                            type_name: #type_name,
                            table: #table,
                            database: #database,
                            exclude_by_default: #exclude_by_default,
                        },
                        vec![#(#descriptors),*],
                    )
                })
            }
        }
    })
}

fn expand_model_enum(input: DeriveInput) -> syn::Result<TokenStream2> {
    let enum_name = input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.generics,
            "ModelEnum does not support generic enums",
        ));
    }

    let data_enum = match input.data {
        Data::Enum(data) => data,
        _ => {
            return Err(syn::Error::new(
                enum_name.span(),
                "ModelEnum can only be derived for enums",
            ));
        }
    };

    if data_enum.variants.is_empty() {
        return Err(syn::Error::new(
            enum_name.span(),
            "ModelEnum requires at least one variant",
        ));
    }

    let mut variants = Vec::<Ident>::new();
    let mut names = Vec::<String>::new();
    for variant in data_enum.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new(
                variant.span(),
                "ModelEnum variants cannot carry data",
            ));
        }
        let name = parse_variant_rename(&variant.attrs)?
            .unwrap_or_else(|| variant.ident.unraw().to_string());
        if names.contains(&name) {
            return Err(syn::Error::new(
                variant.span(),
                format!("Duplicate stored name `{name}`"),
            ));
        }
        variants.push(variant.ident);
        names.push(name);
    }

    Ok(quote! {
        impl ::robomodel::EnumField for #enum_name {
            fn name(&self) -> &'static str {
                match self {
                    #(#enum_name::#variants => #names,)*
                }
            }

            fn from_name(name: &str) -> ::core::option::Option<Self> {
                match name {
                    #(#names => ::core::option::Option::Some(#enum_name::#variants),)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl ::robomodel::FieldCodec for #enum_name {
            const STORAGE: ::robomodel::StorageType = ::robomodel::StorageType::Text;

            fn encode(
                &self,
            ) -> ::robomodel::codec::CodecResult<::core::option::Option<::robomodel::codec::Value>> {
                ::robomodel::codec::encode_enum(self)
            }

            fn decode(value: ::robomodel::codec::ValueRef<'_>) -> ::robomodel::codec::CodecResult<Self> {
                ::core::result::Result::Ok(
                    ::robomodel::codec::decode_enum(value)?.unwrap_or_default(),
                )
            }

            fn decode_optional(
                value: ::robomodel::codec::ValueRef<'_>,
            ) -> ::robomodel::codec::CodecResult<::core::option::Option<Self>> {
                ::robomodel::codec::decode_enum(value)
            }

            fn encode_none() -> ::core::option::Option<::robomodel::codec::Value> {
                ::core::option::Option::None
            }
        }
    })
}

fn parse_model_options(attrs: &[syn::Attribute]) -> syn::Result<ModelOptions> {
    let mut options = ModelOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("model") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let lit: LitStr = meta.value()?.parse()?;
                options.table = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("database") {
                let lit: LitStr = meta.value()?.parse()?;
                options.database = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("exclude_by_default") {
                options.exclude_by_default = true;
                return Ok(());
            }

            Err(meta.error(
                "Unsupported model attribute. Supported: table = \"...\", database = \"...\", exclude_by_default",
            ))
        })?;
    }

    Ok(options)
}

fn parse_field_options(attrs: &[syn::Attribute]) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("model") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("save") {
                options.save = true;
                return Ok(());
            }

            if meta.path.is_ident("exclude") {
                options.exclude = true;
                return Ok(());
            }

            if meta.path.is_ident("json") {
                options.json = true;
                return Ok(());
            }

            if meta.path.is_ident("column") {
                let lit: LitStr = meta.value()?.parse()?;
                if lit.value().trim().is_empty() {
                    return Err(meta.error("column name must not be empty"));
                }
                options.column = Some(lit.value());
                return Ok(());
            }

            Err(meta.error(
                "Unsupported #[model(...)] field option. Supported: save, exclude, json, column = \"...\"",
            ))
        })?;
    }

    Ok(options)
}

fn parse_variant_rename(attrs: &[syn::Attribute]) -> syn::Result<Option<String>> {
    let mut rename = None;

    for attr in attrs {
        if !attr.path().is_ident("model") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                rename = Some(lit.value());
                return Ok(());
            }

            Err(meta.error("Unsupported #[model(...)] variant option. Supported: rename = \"...\""))
        })?;
    }

    Ok(rename)
}
