use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    ext::IdentExt as _,
    parse::{Parse, ParseStream},
    Data, DataStruct, DeriveInput, Error, Fields, LitStr, Token,
};

use crate::attr_parsing::{combine_attribute, parse_assignment_attribute, parse_attrs, Combine};

mod kw {
    syn::custom_keyword!(name);
}

#[derive(Default)]
struct FieldAttrs {
    name: Option<(kw::name, LitStr)>,
}

impl Parse for FieldAttrs {
    fn parse(input: ParseStream<'_>) -> syn::Result<Self> {
        let mut name = None;

        while !input.is_empty() {
            let lookahead = input.lookahead1();
            if lookahead.peek(kw::name) {
                parse_assignment_attribute(input, &mut name)?;
            } else {
                return Err(lookahead.error());
            }

            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(Self { name })
    }
}

impl Combine for FieldAttrs {
    fn combine(mut self, other: Self) -> syn::Result<Self> {
        combine_attribute(&mut self.name, other.name)?;
        Ok(self)
    }
}

pub(crate) fn expand(input: DeriveInput) -> syn::Result<TokenStream> {
    let fields = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => &fields.named,
        Data::Struct(_) => {
            return Err(Error::new_spanned(
                &input.ident,
                "`AutoWire` can only be derived for structs with named fields",
            ))
        }
        Data::Enum(data) => return Err(Error::new_spanned(data.enum_token, "`AutoWire` can't be derived for enums")),
        Data::Union(data) => return Err(Error::new_spanned(data.union_token, "`AutoWire` can't be derived for unions")),
    };

    let mut resolves = Vec::new();
    let mut assignments = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        let Some(attrs) = parse_attrs::<FieldAttrs>("autowired", &field.attrs) else {
            continue;
        };
        let FieldAttrs { name } = attrs?;
        let Some(ident) = &field.ident else {
            continue;
        };

        let ty = &field.ty;
        let field_name = ident.unraw().to_string();
        let name = match name {
            Some((_, name)) => quote! { ::core::option::Option::Some(#name) },
            None => quote! { ::core::option::Option::None },
        };
        let local = format_ident!("__wirebox_field_{}", index);

        resolves.push(quote! {
            let #local = <#ty as ::wirebox::AutoWireField>::wire(resolver, #name)
                .map_err(|source| ::wirebox::AutoWireErrorKind::Field { field: #field_name, source })?;
        });
        assignments.push(quote! {
            self.#ident = #local;
        });
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::wirebox::AutoWire for #ident #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn auto_wire(
                &mut self,
                resolver: &::wirebox::Resolver,
            ) -> ::core::result::Result<(), ::wirebox::AutoWireErrorKind> {
                #(#resolves)*
                #(#assignments)*
                ::core::result::Result::Ok(())
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::expand;

    #[test]
    fn test_expand_tagged_fields_only() {
        let tokens = expand(parse_quote! {
            struct Handler {
                #[autowired]
                db: Arc<Db>,
                #[autowired(name = "replica")]
                replica: Option<Arc<Db>>,
                hits: u64,
            }
        })
        .unwrap()
        .to_string();

        assert!(tokens.contains("__wirebox_field_0"));
        assert!(tokens.contains("\"replica\""));
        assert!(!tokens.contains("__wirebox_field_2"));
        assert!(!tokens.contains("self . hits"));
    }

    #[test]
    fn test_expand_rejects_tuple_structs() {
        let err = expand(parse_quote! {
            struct Handler(#[autowired] Arc<Db>);
        })
        .unwrap_err();

        assert!(err.to_string().contains("named fields"));
    }

    #[test]
    fn test_expand_rejects_repeated_name() {
        let err = expand(parse_quote! {
            struct Handler {
                #[autowired(name = "a")]
                #[autowired(name = "b")]
                db: Arc<Db>,
            }
        })
        .unwrap_err();

        assert!(err.to_string().contains("specified more than once"));
    }
}
