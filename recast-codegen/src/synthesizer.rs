//! Transform synthesizer: turns the members of a [`TransformGroup`] into
//! wrapper specs.
//!
//! For each member and each generation kind with a resolved configuration:
//!
//! - sync: `name + suffix`, mapped parameters, returns the unwrapped result
//!   and delegates to `run_blocking`;
//! - async: `name + suffix`, mapped parameters, an optional `scope`, a
//!   trailing `callback`, returns a `Job` and delegates to `run_background`.

use std::collections::BTreeSet;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::punctuated::Punctuated;
use syn::{
    parse_quote, Attribute, Block, FnArg, Generics, Ident, Path, ReturnType, Signature, Token, Type,
    Visibility, WherePredicate,
};

use crate::annotation::{Configuration, GenerationKind};
use crate::config::GeneratorConfig;
use crate::declaration::{ContainerShape, FunctionDeclaration, ReceiverKind, TransformGroup};
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::mapper::{self, Forward, MappedParameter, TypeMapper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Delegates to the blocking bridge.
    Blocking,
    /// Delegates to the background bridge; `scoped` wrappers take the scope
    /// as a parameter, the others embed the process-default scope.
    Background { scoped: bool },
}

/// One wrapper to emit.
#[derive(Debug, Clone)]
pub struct GeneratedFunctionSpec {
    pub name: Ident,
    pub kind: GenerationKind,
    pub body: BodyKind,
    /// Container of the wrapped member, as an index into the group.
    pub container: Option<usize>,
    pub attrs: Vec<Attribute>,
    pub vis: Visibility,
    pub sig: Signature,
    pub block: Block,
}

pub struct Synthesizer {
    mapper: TypeMapper,
    runtime: Path,
}

impl Synthesizer {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        Ok(Self {
            mapper: TypeMapper::new(config)?,
            runtime: config.runtime()?,
        })
    }

    /// Specs for every member of `group`, in member order (sync before async).
    /// Problems with single members are appended to `diagnostics`.
    pub fn synthesize(
        &self,
        group: &TransformGroup,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<GeneratedFunctionSpec> {
        let mut taken = group.existing_names.clone();
        let mut specs = Vec::new();

        for member in &group.members {
            let resolved = group.resolved(member);
            if resolved.is_empty() {
                continue;
            }

            let mapped: std::result::Result<Vec<_>, String> = member
                .params
                .iter()
                .map(|param| self.mapper.map_parameter(param))
                .collect();
            let mapped = match mapped {
                Ok(mapped) => mapped,
                Err(message) => {
                    diagnostics.push(Diagnostic::error(&member.source, member.span, message));
                    continue;
                }
            };
            let result = self.mapper.map_type(&member.result);

            for kind in GenerationKind::ALL {
                let Some(configuration) = resolved.get(kind) else {
                    continue;
                };
                let spec = match kind {
                    GenerationKind::Sync => self.sync_spec(group, member, &mapped, &result, configuration),
                    GenerationKind::Async => self.async_spec(group, member, &mapped, &result, configuration),
                };
                match spec.and_then(|spec| claim_name(&mut taken, member, spec)) {
                    Ok(spec) => specs.push(spec),
                    Err(message) => {
                        diagnostics.push(Diagnostic::error(&member.source, member.span, message));
                    }
                }
            }
        }

        tracing::debug!(group = %group.key, specs = specs.len(), "synthesized group");
        specs
    }

    fn sync_spec(
        &self,
        group: &TransformGroup,
        member: &FunctionDeclaration,
        mapped: &[MappedParameter],
        result: &Type,
        configuration: &Configuration,
    ) -> std::result::Result<GeneratedFunctionSpec, String> {
        let rt = &self.runtime;
        let name = wrapper_name(&member.name, &configuration.suffix);

        let needs_this = matches!(member.receiver, Some((ReceiverKind::RefMut, _)));
        if needs_this {
            check_reserved(member, mapped, &["this"])?;
        }

        let call = call_expression(group, member, mapped, needs_this);
        // A captured `&mut self` must be moved out of the thunk to be reborrowed.
        let block: Block = if needs_this {
            parse_quote!({
                #rt::run_blocking(move || {
                    let this = self;
                    #call
                })
            })
        } else {
            parse_quote!({ #rt::run_blocking(move || #call) })
        };

        let output: ReturnType = if is_unit(result) {
            ReturnType::Default
        } else {
            parse_quote!(-> #result)
        };
        let mut sig = self.signature(member, &name, mapped, Vec::new(), output);
        // Trait default bodies may only move `self` when it is sized.
        if is_trait_member(group, member) && matches!(member.receiver, Some((ReceiverKind::Value, _))) {
            sig.generics
                .make_where_clause()
                .predicates
                .push(parse_quote!(Self: ::std::marker::Sized));
        }
        let doc = format!(" Blocks the calling thread until `{}` completes.", member.name);

        Ok(GeneratedFunctionSpec {
            name,
            kind: GenerationKind::Sync,
            body: BodyKind::Blocking,
            container: member.container,
            attrs: vec![parse_quote!(#[doc = #doc])],
            vis: member.vis.clone(),
            sig,
            block,
        })
    }

    fn async_spec(
        &self,
        group: &TransformGroup,
        member: &FunctionDeclaration,
        mapped: &[MappedParameter],
        result: &Type,
        configuration: &Configuration,
    ) -> std::result::Result<GeneratedFunctionSpec, String> {
        let rt = &self.runtime;
        let name = wrapper_name(&member.name, &configuration.suffix);
        let receiver = member.receiver.as_ref().map(|(kind, _)| *kind);

        if receiver == Some(ReceiverKind::RefMut) {
            return Err(format!(
                "`{}` borrows `self` mutably and cannot run in the background",
                member.name
            ));
        }
        let container_generics = inherent_generics(group, member);
        let borrowed = mapped.iter().any(|m| mapper::borrows(&m.param.ty))
            || member.generics.lifetimes().next().is_some()
            || container_generics.is_some_and(|g| g.lifetimes().next().is_some())
            || mapper::borrows(result);
        if borrowed {
            return Err(format!(
                "`{}` has borrowed parameters or result; background wrappers need owned values",
                member.name
            ));
        }
        if mapped.iter().any(|m| matches!(m.param.ty, Type::ImplTrait(_))) {
            return Err(format!(
                "`{}` takes an `impl Trait` parameter; background wrappers need nameable types",
                member.name
            ));
        }
        let needs_this = receiver == Some(ReceiverKind::Ref);
        let mut reserved = vec!["callback"];
        if configuration.scoped {
            reserved.push("scope");
        }
        if needs_this {
            reserved.push("this");
        }
        check_reserved(member, mapped, &reserved)?;

        let call = call_expression(group, member, mapped, needs_this);
        let scope: TokenStream = if configuration.scoped {
            quote!(scope)
        } else {
            quote!(#rt::Scope::global())
        };
        let clone_self = needs_this.then(|| quote!(let this = ::std::clone::Clone::clone(self);));
        let block: Block = parse_quote!({
            #clone_self
            #rt::run_background(#scope, move || async move { #call.await }, callback)
        });

        let mut extra: Vec<FnArg> = Vec::new();
        if configuration.scoped {
            extra.push(parse_quote!(scope: #rt::Scope));
        }
        extra.push(parse_quote!(callback: impl #rt::Callback<#result>));
        let output: ReturnType = parse_quote!(-> #rt::Job);
        let mut sig = self.signature(member, &name, mapped, extra, output);

        // Generic values move into the background thunk.
        let mut predicates: Vec<WherePredicate> = member
            .generics
            .type_params()
            .chain(container_generics.into_iter().flat_map(|g| g.type_params()))
            .map(|param| {
                let ident = &param.ident;
                parse_quote!(#ident: ::std::marker::Send + 'static)
            })
            .collect();
        // So does a generic `Self`.
        if is_trait_member(group, member) {
            predicates.push(if needs_this {
                parse_quote!(Self: ::std::clone::Clone + ::std::marker::Send + ::std::marker::Sync + ::std::marker::Sized + 'static)
            } else {
                parse_quote!(Self: ::std::marker::Send + ::std::marker::Sized + 'static)
            });
        } else if container_generics.is_some_and(|g| g.type_params().next().is_some()) {
            match receiver {
                Some(ReceiverKind::Ref) => predicates.push(parse_quote!(
                    Self: ::std::clone::Clone + ::std::marker::Send + ::std::marker::Sync + 'static
                )),
                Some(ReceiverKind::Value) => {
                    predicates.push(parse_quote!(Self: ::std::marker::Send + 'static))
                }
                _ => {}
            }
        }
        if !predicates.is_empty() {
            sig.generics.make_where_clause().predicates.extend(predicates);
        }

        let doc = format!(
            " Runs `{}` in the background and hands its outcome to `callback`.",
            member.name
        );

        Ok(GeneratedFunctionSpec {
            name,
            kind: GenerationKind::Async,
            body: BodyKind::Background {
                scoped: configuration.scoped,
            },
            container: member.container,
            attrs: vec![parse_quote!(#[doc = #doc])],
            vis: member.vis.clone(),
            sig,
            block,
        })
    }

    fn signature(
        &self,
        member: &FunctionDeclaration,
        name: &Ident,
        mapped: &[MappedParameter],
        extra: Vec<FnArg>,
        output: ReturnType,
    ) -> Signature {
        let mut inputs: Punctuated<FnArg, Token![,]> = Punctuated::new();
        if let Some((_, receiver)) = &member.receiver {
            inputs.push(FnArg::Receiver(receiver.clone()));
        }
        for m in mapped {
            let attrs = &m.param.attrs;
            let ident = &m.param.name;
            let ty = &m.param.ty;
            inputs.push(parse_quote!(#(#attrs)* #ident: #ty));
        }
        inputs.extend(extra);

        let mut sig: Signature = parse_quote!(fn #name() -> ());
        sig.generics = member.generics.clone();
        sig.inputs = inputs;
        sig.output = output;
        sig
    }
}

fn wrapper_name(original: &Ident, suffix: &str) -> Ident {
    format_ident!("{}{}", original.unraw(), suffix)
}

/// Records the wrapper's name as taken. A wrapper that would shadow an
/// existing member or an earlier wrapper is rejected.
fn claim_name(
    taken: &mut BTreeSet<String>,
    member: &FunctionDeclaration,
    spec: GeneratedFunctionSpec,
) -> std::result::Result<GeneratedFunctionSpec, String> {
    if taken.insert(spec.name.to_string()) {
        return Ok(spec);
    }
    Err(format!(
        "wrapper `{}` for `{}` collides with an existing declaration; choose another suffix",
        spec.name, member.name
    ))
}

fn check_reserved(
    member: &FunctionDeclaration,
    mapped: &[MappedParameter],
    reserved: &[&str],
) -> std::result::Result<(), String> {
    match mapped.iter().find(|m| reserved.iter().any(|r| m.param.name == r)) {
        Some(m) => Err(format!(
            "parameter `{}` of `{}` clashes with a name the wrapper declares",
            m.param.name, member.name
        )),
        None => Ok(()),
    }
}

/// Generics of the inherent impl block `member` belongs to.
fn inherent_generics<'g>(group: &'g TransformGroup, member: &FunctionDeclaration) -> Option<&'g Generics> {
    match &group.containers.get(member.container?)?.shape {
        ContainerShape::Inherent { generics, .. } => Some(generics),
        ContainerShape::Trait { .. } => None,
    }
}

fn is_trait_member(group: &TransformGroup, member: &FunctionDeclaration) -> bool {
    member
        .container
        .and_then(|i| group.containers.get(i))
        .is_some_and(|c| matches!(c.shape, ContainerShape::Trait { .. }))
}

/// The invocation of the wrapped function with the wrapper's arguments.
fn call_expression(
    group: &TransformGroup,
    member: &FunctionDeclaration,
    mapped: &[MappedParameter],
    via_this: bool,
) -> TokenStream {
    let name = &member.name;
    let args = mapped.iter().map(|m| {
        let ident = &m.param.name;
        match m.forward {
            Forward::AsIs => quote!(#ident),
            Forward::WrapSome => quote!(::std::option::Option::Some(#ident)),
        }
    });

    match (member.container, &member.receiver) {
        (Some(_), Some(_)) if via_this => quote!(this.#name(#(#args),*)),
        (Some(_), Some(_)) => quote!(self.#name(#(#args),*)),
        (Some(_), None) => quote!(Self::#name(#(#args),*)),
        (None, _) => {
            let namespace = namespace_path(&group.key.namespace);
            quote!(#namespace #name(#(#args),*))
        }
    }
}

/// `crate::api` becomes the prefix `crate::api::`; the empty namespace none.
fn namespace_path(namespace: &str) -> TokenStream {
    let segments: Vec<Ident> = namespace
        .split("::")
        .filter(|s| !s.is_empty())
        .map(|s| Ident::new(s, proc_macro2::Span::call_site()))
        .collect();
    quote!(#(#segments::)*)
}

fn is_unit(ty: &Type) -> bool {
    matches!(ty, Type::Tuple(tuple) if tuple.elems.is_empty())
}
