use core::any;
use quote::ToTokens;
use syn::{
    parse::{Parse, ParseStream},
    Meta, Token,
};

fn keyword_name<K>() -> &'static str {
    let name = any::type_name::<K>();
    name.rsplit_once("::").map_or(name, |(_, name)| name)
}

pub(crate) fn parse_assignment_attribute<K, T>(input: ParseStream<'_>, out: &mut Option<(K, T)>) -> syn::Result<()>
where
    K: Parse + ToTokens,
    T: Parse,
{
    let kw = input.parse()?;
    input.parse::<Token![=]>()?;
    let inner = input.parse()?;

    if out.is_some() {
        let msg = "` specified more than once";
        return Err(syn::Error::new_spanned(kw, ["`", keyword_name::<K>(), msg].concat()));
    }

    *out = Some((kw, inner));

    Ok(())
}

pub(crate) trait Combine: Sized {
    fn combine(self, other: Self) -> syn::Result<Self>;
}

/// Parses and combines all `#[ident(...)]` attributes. A bare `#[ident]` parses as the default.
pub(crate) fn parse_attrs<T>(ident: &str, attrs: &[syn::Attribute]) -> Option<syn::Result<T>>
where
    T: Combine + Default + Parse,
{
    let mut iter = attrs
        .iter()
        .filter(|attr| attr.meta.path().is_ident(ident))
        .map(|attr| match &attr.meta {
            Meta::Path(_) => Ok(T::default()),
            Meta::List(_) | Meta::NameValue(_) => attr.parse_args::<T>(),
        });

    let first = match iter.next()? {
        Ok(first) => first,
        Err(err) => return Some(Err(err)),
    };

    Some(iter.try_fold(first, |out, next| out.combine(next?)))
}

pub(crate) fn combine_attribute<K, T>(a: &mut Option<(K, T)>, b: Option<(K, T)>) -> syn::Result<()>
where
    K: ToTokens,
{
    if let Some((kw, inner)) = b {
        if a.is_some() {
            let msg = "` specified more than once";
            return Err(syn::Error::new_spanned(kw, ["`", keyword_name::<K>(), msg].concat()));
        }
        *a = Some((kw, inner));
    }
    Ok(())
}
