//! `#[recast_sync]` and `#[recast_async]`.
//!
//! The attributes mark async functions, inherent impl blocks and traits for
//! the `recast-codegen` build step, which writes the wrappers. At compile time
//! the macros only validate: the annotated item goes through the generator's
//! own scanner and synthesizer, every problem becomes a `compile_error!` at the
//! offending tokens, and the item is emitted with recast annotations and
//! nullability markers removed.
//!
//! Put `#[recast_async]` above `#[async_trait]` so it still sees the
//! `async fn` signatures.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{parse_quote, Attribute, FnArg, ImplItem, Item, Signature, TraitItem, TraitItemFn};

use recast_codegen::annotation::{self, GenerationKind};
use recast_codegen::{GeneratorConfig, SourceUnit};

const PLACEMENT: &str = "recast annotations apply to async functions, inherent impl blocks and traits";

#[proc_macro_attribute]
pub fn recast_sync(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(GenerationKind::Sync, attr.into(), item.into()).into()
}

#[proc_macro_attribute]
pub fn recast_async(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(GenerationKind::Async, attr.into(), item.into()).into()
}

/// The item an attribute was placed on. Trait methods without a body do not
/// parse as items and are kept apart.
enum Annotated {
    Item(Item),
    TraitFn(TraitItemFn),
}

fn expand(kind: GenerationKind, attr: TokenStream2, item: TokenStream2) -> TokenStream2 {
    let annotated = match parse_annotated(item) {
        Ok(annotated) => annotated,
        Err(e) => return e.to_compile_error(),
    };

    let errors = check(kind, attr, &annotated)
        .err()
        .map(|e| e.to_compile_error());
    let cleaned = strip(annotated);
    quote!(#errors #cleaned)
}

fn parse_annotated(item: TokenStream2) -> syn::Result<Annotated> {
    match syn::parse2::<Item>(item.clone()) {
        Ok(Item::Verbatim(tokens)) => syn::parse2::<TraitItemFn>(item)
            .map(Annotated::TraitFn)
            .map_err(|_| syn::Error::new_spanned(tokens, PLACEMENT)),
        Ok(parsed) => Ok(Annotated::Item(parsed)),
        Err(e) => syn::parse2::<TraitItemFn>(item)
            .map(Annotated::TraitFn)
            .map_err(|_| e),
    }
}

/// Runs the generator's checks over the item as a one-item source unit.
fn check(kind: GenerationKind, attr: TokenStream2, annotated: &Annotated) -> syn::Result<()> {
    let config = GeneratorConfig::default();
    annotation::parse_options(kind, attr.clone(), &config)?;

    let name = format_ident!("{}", kind.attribute_name());
    let marker: Attribute = parse_quote!(#[#name(#attr)]);

    let item: Item = match annotated {
        Annotated::Item(Item::Fn(f)) => {
            let mut f = f.clone();
            f.attrs.insert(0, marker);
            if f.sig.receiver().is_some() {
                parse_quote!(impl __RecastSubject { #f })
            } else {
                Item::Fn(f)
            }
        }
        Annotated::Item(Item::Impl(imp)) => {
            let mut imp = imp.clone();
            imp.attrs.insert(0, marker);
            Item::Impl(imp)
        }
        Annotated::Item(Item::Trait(tr)) => {
            let mut tr = tr.clone();
            tr.attrs.insert(0, marker);
            Item::Trait(tr)
        }
        Annotated::Item(other) => return Err(syn::Error::new_spanned(other, PLACEMENT)),
        Annotated::TraitFn(f) => {
            let mut f = f.clone();
            f.attrs.insert(0, marker);
            parse_quote!(trait __RecastSubject { #f })
        }
    };

    let unit = SourceUnit::new(
        "item.rs",
        "crate",
        syn::File {
            shebang: None,
            attrs: Vec::new(),
            items: vec![item],
        },
    );
    let diagnostics = recast_codegen::diagnose(&[unit], &config)
        .map_err(|e| syn::Error::new(Span::call_site(), e.to_string()))?;

    diagnostics
        .iter()
        .map(|diagnostic| diagnostic.to_syn_error())
        .reduce(|mut combined, next| {
            combined.combine(next);
            combined
        })
        .map_or(Ok(()), Err)
}

fn strip(annotated: Annotated) -> TokenStream2 {
    match annotated {
        Annotated::Item(mut item) => {
            match &mut item {
                Item::Fn(f) => strip_fn(&mut f.attrs, &mut f.sig),
                Item::Impl(imp) => {
                    imp.attrs.retain(|a| !annotation::is_recast_attribute(a));
                    for member in &mut imp.items {
                        if let ImplItem::Fn(f) = member {
                            strip_fn(&mut f.attrs, &mut f.sig);
                        }
                    }
                }
                Item::Trait(tr) => {
                    tr.attrs.retain(|a| !annotation::is_recast_attribute(a));
                    for member in &mut tr.items {
                        if let TraitItem::Fn(f) = member {
                            strip_fn(&mut f.attrs, &mut f.sig);
                        }
                    }
                }
                _ => {}
            }
            quote!(#item)
        }
        Annotated::TraitFn(mut f) => {
            strip_fn(&mut f.attrs, &mut f.sig);
            quote!(#f)
        }
    }
}

fn strip_fn(attrs: &mut Vec<Attribute>, sig: &mut Signature) {
    attrs.retain(|a| !annotation::is_recast_attribute(a));
    for input in &mut sig.inputs {
        if let FnArg::Typed(param) = input {
            param.attrs.retain(|a| !annotation::is_nullability_marker(a));
        }
    }
}
