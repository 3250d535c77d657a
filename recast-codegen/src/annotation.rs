//! Configuration annotations and parameter nullability markers.
//!
//! Two generation kinds share one option schema:
//!
//! ```ignore
//! #[recast_sync(suffix = "_blocking")]
//! #[recast_async(suffix = "_bg", scoped = true)]
//! ```
//!
//! Attributes are matched on the last path segment, so `#[recast::recast_async]`
//! and `#[recast_async]` are the same annotation.

use std::fmt;

use proc_macro2::TokenStream;
use syn::parse::Parser;
use syn::spanned::Spanned;
use syn::{Attribute, LitBool, LitStr, Meta};

use crate::config::{validate_suffix, GeneratorConfig};

pub const SYNC_ATTRIBUTE: &str = "recast_sync";
pub const ASYNC_ATTRIBUTE: &str = "recast_async";
pub const NULLABLE_MARKER: &str = "nullable";
pub const NOT_NULL_MARKER: &str = "not_null";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GenerationKind {
    /// Blocking wrapper returning the unwrapped result.
    Sync,
    /// Callback-driven wrapper returning a `Job`.
    Async,
}

impl GenerationKind {
    pub const ALL: [GenerationKind; 2] = [GenerationKind::Sync, GenerationKind::Async];

    pub fn attribute_name(self) -> &'static str {
        match self {
            GenerationKind::Sync => SYNC_ATTRIBUTE,
            GenerationKind::Async => ASYNC_ATTRIBUTE,
        }
    }

    pub fn from_attribute(attr: &Attribute) -> Option<Self> {
        let ident = &attr.path().segments.last()?.ident;
        if ident == SYNC_ATTRIBUTE {
            Some(GenerationKind::Sync)
        } else if ident == ASYNC_ATTRIBUTE {
            Some(GenerationKind::Async)
        } else {
            None
        }
    }

    fn default_suffix(self, config: &GeneratorConfig) -> &str {
        match self {
            GenerationKind::Sync => &config.sync_suffix,
            GenerationKind::Async => &config.async_suffix,
        }
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute_name())
    }
}

/// Resolved options of one annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub suffix: String,
    /// Whether the async wrapper takes an explicit `Scope`. No effect on sync.
    pub scoped: bool,
}

/// The annotations attached to one element, at most one per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationSet {
    pub sync_config: Option<Configuration>,
    pub async_config: Option<Configuration>,
}

impl AnnotationSet {
    pub fn get(&self, kind: GenerationKind) -> Option<&Configuration> {
        match kind {
            GenerationKind::Sync => self.sync_config.as_ref(),
            GenerationKind::Async => self.async_config.as_ref(),
        }
    }

    fn slot(&mut self, kind: GenerationKind) -> &mut Option<Configuration> {
        match kind {
            GenerationKind::Sync => &mut self.sync_config,
            GenerationKind::Async => &mut self.async_config,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sync_config.is_none() && self.async_config.is_none()
    }

    /// Resolves a member against its container's defaults: for each kind the
    /// member's own annotation wins, otherwise the container's applies.
    pub fn resolve(container: &AnnotationSet, member: &AnnotationSet) -> AnnotationSet {
        AnnotationSet {
            sync_config: member
                .sync_config
                .clone()
                .or_else(|| container.sync_config.clone()),
            async_config: member
                .async_config
                .clone()
                .or_else(|| container.async_config.clone()),
        }
    }

    /// Collects the recast annotations among `attrs`.
    pub fn from_attributes(attrs: &[Attribute], config: &GeneratorConfig) -> syn::Result<Self> {
        let mut set = AnnotationSet::default();
        let mut errors: Option<syn::Error> = None;

        for attr in attrs {
            let Some(kind) = GenerationKind::from_attribute(attr) else {
                continue;
            };
            let parsed = if set.get(kind).is_some() {
                Err(syn::Error::new_spanned(
                    attr,
                    format!("duplicate #[{}] annotation", kind),
                ))
            } else {
                parse_attribute(kind, attr, config)
            };
            match parsed {
                Ok(configuration) => *set.slot(kind) = Some(configuration),
                Err(e) => match errors.as_mut() {
                    Some(existing) => existing.combine(e),
                    None => errors = Some(e),
                },
            }
        }

        match errors {
            Some(e) => Err(e),
            None => Ok(set),
        }
    }
}

fn parse_attribute(
    kind: GenerationKind,
    attr: &Attribute,
    config: &GeneratorConfig,
) -> syn::Result<Configuration> {
    match &attr.meta {
        Meta::Path(_) => parse_options(kind, TokenStream::new(), config),
        Meta::List(list) => parse_options(kind, list.tokens.clone(), config),
        Meta::NameValue(nv) => Err(syn::Error::new_spanned(
            nv,
            format!("expected #[{}] or #[{}(...)]", kind, kind),
        )),
    }
}

/// Parses the option list of one annotation, e.g. `suffix = "_bg", scoped`.
///
/// Shared with the attribute macros so both paths accept the same syntax.
pub fn parse_options(
    kind: GenerationKind,
    args: TokenStream,
    config: &GeneratorConfig,
) -> syn::Result<Configuration> {
    let mut suffix: Option<LitStr> = None;
    let mut scoped: Option<bool> = None;

    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("suffix") {
            if suffix.is_some() {
                return Err(meta.error("duplicate `suffix` option"));
            }
            let lit: LitStr = meta.value()?.parse()?;
            validate_suffix("suffix", &lit.value())
                .map_err(|e| syn::Error::new(lit.span(), e.to_string()))?;
            suffix = Some(lit);
            Ok(())
        } else if meta.path.is_ident("scoped") {
            if scoped.is_some() {
                return Err(meta.error("duplicate `scoped` option"));
            }
            // A bare `scoped` means `scoped = true`.
            scoped = Some(if meta.input.peek(syn::Token![=]) {
                meta.value()?.parse::<LitBool>()?.value
            } else {
                true
            });
            Ok(())
        } else {
            Err(meta.error(format!(
                "unsupported #[{}] option; expected `suffix` or `scoped`",
                kind
            )))
        }
    });
    parser.parse2(args)?;

    Ok(Configuration {
        suffix: suffix
            .map(|lit| lit.value())
            .unwrap_or_else(|| kind.default_suffix(config).to_string()),
        scoped: scoped.unwrap_or(false),
    })
}

pub fn is_recast_attribute(attr: &Attribute) -> bool {
    GenerationKind::from_attribute(attr).is_some()
}

/// Nullability marker on a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    Unspecified,
    Nullable,
    NotNull,
}

fn marker_of(attr: &Attribute) -> Option<Nullability> {
    if attr.path().is_ident(NULLABLE_MARKER) {
        Some(Nullability::Nullable)
    } else if attr.path().is_ident(NOT_NULL_MARKER) {
        Some(Nullability::NotNull)
    } else {
        None
    }
}

pub fn is_nullability_marker(attr: &Attribute) -> bool {
    marker_of(attr).is_some()
}

/// Reads the nullability marker among a parameter's attributes.
pub fn nullability_of(attrs: &[Attribute]) -> syn::Result<Nullability> {
    let mut found = Nullability::Unspecified;
    for attr in attrs {
        let Some(marker) = marker_of(attr) else {
            continue;
        };
        if !matches!(attr.meta, Meta::Path(_)) {
            return Err(syn::Error::new(
                attr.span(),
                "nullability markers take no arguments",
            ));
        }
        if found != Nullability::Unspecified {
            return Err(syn::Error::new(
                attr.span(),
                "a parameter carries at most one nullability marker",
            ));
        }
        found = marker;
    }
    Ok(found)
}
