use proc_macro::TokenStream;
use quote::ToTokens;
use std::env::var_os;
use syn::parse::Parse;

mod attr_parsing;
mod autowire;

/// Implements `wirebox::AutoWire` for a struct with named fields.
///
/// Fields tagged `#[autowired]` are resolved by their type, `#[autowired(name = "...")]`
/// by an explicit name. The field type must implement `wirebox::AutoWireField`,
/// e.g. `Arc<T>` or `Option<Arc<T>>`. Untagged fields are left as they are.
#[proc_macro_derive(AutoWire, attributes(autowired))]
pub fn auto_wire(item: TokenStream) -> TokenStream {
    expand_with(item, autowire::expand)
}

fn expand_with<F, I, K>(input: TokenStream, f: F) -> TokenStream
where
    F: FnOnce(I) -> syn::Result<K>,
    I: Parse,
    K: ToTokens,
{
    expand(syn::parse(input).and_then(f))
}

fn expand<T>(result: syn::Result<T>) -> TokenStream
where
    T: ToTokens,
{
    match result {
        Ok(tokens) => {
            let tokens = tokens.into_token_stream();
            if var_os("MACROS_DEBUG").is_some() {
                match syn::parse2::<syn::File>(tokens.clone()) {
                    Ok(file) => eprintln!("{}", prettyplease::unparse(&file)),
                    Err(_) => eprintln!("{tokens}"),
                }
            }
            tokens.into()
        }
        Err(err) => err.into_compile_error().into(),
    }
}
