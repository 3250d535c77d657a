//! Type & parameter mapping.
//!
//! - detects the asynchronous shape of a signature and unwraps its true
//!   result type;
//! - rewrites host-only type paths to their portable spelling, recursively
//!   through generic arguments, references, slices, arrays and tuples;
//! - applies parameter nullability markers.

use std::collections::BTreeMap;

use syn::visit::{self, Visit};
use syn::visit_mut::{self, VisitMut};
use syn::{
    GenericArgument, Lifetime, Path, PathArguments, ReturnType, Signature, Type, TypeParamBound,
    TypePath, TypeReference,
};

use crate::annotation::Nullability;
use crate::config::GeneratorConfig;
use crate::declaration::Parameter;
use crate::error::{Error, Result};

const PRIMITIVES: &[&str] = &[
    "bool", "char", "str", "u8", "u16", "u32", "u64", "u128", "usize", "i8", "i16", "i32", "i64",
    "i128", "isize", "f32", "f64",
];

const BUILTIN_PORTABLE: &[(&str, &str)] = &[
    ("std::string::String", "String"),
    ("alloc::string::String", "String"),
    ("std::vec::Vec", "Vec"),
    ("alloc::vec::Vec", "Vec"),
    ("std::option::Option", "Option"),
    ("core::option::Option", "Option"),
    ("std::boxed::Box", "Box"),
    ("alloc::boxed::Box", "Box"),
];

/// How a wrapper forwards one argument to the wrapped function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forward {
    AsIs,
    /// The wrapper takes `T` for an `Option<T>` parameter and passes `Some(arg)`.
    WrapSome,
}

/// A parameter as it appears on a generated wrapper.
#[derive(Debug, Clone)]
pub struct MappedParameter {
    pub param: Parameter,
    pub forward: Forward,
}

#[derive(Debug, Clone)]
pub struct TypeMapper {
    portable: BTreeMap<String, Path>,
}

impl TypeMapper {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        let mut portable = BTreeMap::new();
        for (host, target) in BUILTIN_PORTABLE {
            portable.insert(host.to_string(), parse_path(target)?);
        }
        for primitive in PRIMITIVES {
            let target = parse_path(primitive)?;
            portable.insert(format!("std::primitive::{}", primitive), target.clone());
            portable.insert(format!("core::primitive::{}", primitive), target);
        }
        for (host, target) in &config.portable_types {
            portable.insert(path_key(&parse_path(host)?), parse_path(target)?);
        }
        Ok(Self { portable })
    }

    /// Maps every known host type path inside `ty` to its portable equivalent.
    pub fn map_type(&self, ty: &Type) -> Type {
        let mut mapped = ty.clone();
        PortableRewriter { mapper: self }.visit_type_mut(&mut mapped);
        mapped
    }

    /// Maps a parameter and applies its nullability marker.
    ///
    /// `#[not_null]` on `Option<T>` makes the wrapper take `T`; `#[nullable]`
    /// on anything but an `Option` is rejected because the wrapped function
    /// could not receive an absent value.
    pub fn map_parameter(&self, param: &Parameter) -> std::result::Result<MappedParameter, String> {
        let ty = self.map_type(&param.ty);
        let (ty, forward) = match (param.nullability, option_inner(&ty)) {
            (Nullability::NotNull, Some(inner)) => (inner.clone(), Forward::WrapSome),
            (Nullability::Nullable, None) => {
                return Err(format!(
                    "#[nullable] parameter `{}` must have an Option type",
                    param.name
                ))
            }
            _ => (ty, Forward::AsIs),
        };

        Ok(MappedParameter {
            param: Parameter {
                name: param.name.clone(),
                ty,
                nullability: param.nullability,
                attrs: param.attrs.clone(),
            },
            forward,
        })
    }

    fn portable_for(&self, path: &Path) -> Option<&Path> {
        self.portable.get(&path_key(path))
    }
}

struct PortableRewriter<'a> {
    mapper: &'a TypeMapper,
}

impl VisitMut for PortableRewriter<'_> {
    fn visit_type_path_mut(&mut self, node: &mut TypePath) {
        visit_mut::visit_type_path_mut(self, node);
        if node.qself.is_some() {
            return;
        }
        if let Some(portable) = self.mapper.portable_for(&node.path) {
            let arguments = node
                .path
                .segments
                .last()
                .map(|segment| segment.arguments.clone())
                .unwrap_or(PathArguments::None);
            let mut replacement = portable.clone();
            if let Some(last) = replacement.segments.last_mut() {
                last.arguments = arguments;
            }
            node.path = replacement;
        }
    }
}

fn parse_path(text: &str) -> Result<Path> {
    syn::parse_str(text).map_err(|e| Error::Config(format!("Invalid type path {:?}: {}", text, e)))
}

/// `::std::string::String` and `std::string::String<..>` share the key
/// `std::string::String`.
fn path_key(path: &Path) -> String {
    path.segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}

/// `T` for `Option<T>` (as spelled after mapping).
pub fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(TypePath { qself: None, path }) = ty else {
        return None;
    };
    if path.segments.len() != 1 && path_key(path) != "std::option::Option" && path_key(path) != "core::option::Option" {
        return None;
    }
    let last = path.segments.last()?;
    if last.ident != "Option" {
        return None;
    }
    single_type_argument(&last.arguments)
}

fn single_type_argument(arguments: &PathArguments) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = arguments else {
        return None;
    };
    let mut types = args.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    });
    let first = types.next()?;
    types.next().is_none().then_some(first)
}

/// The true result type of an asynchronous signature, or `None` if the
/// function is not asynchronous.
///
/// Recognized shapes: `async fn`, `impl Future<Output = T>`,
/// `Pin<Box<dyn Future<Output = T>>>`, `Box<dyn Future<Output = T>>`,
/// `BoxFuture<'_, T>` and `LocalBoxFuture<'_, T>`.
pub fn async_result(sig: &Signature) -> Option<Type> {
    match (&sig.asyncness, &sig.output) {
        (Some(_), ReturnType::Default) => Some(syn::parse_quote!(())),
        (Some(_), ReturnType::Type(_, ty)) => Some((**ty).clone()),
        (None, ReturnType::Type(_, ty)) => future_output(ty).cloned(),
        (None, ReturnType::Default) => None,
    }
}

fn future_output(ty: &Type) -> Option<&Type> {
    match ty {
        Type::Paren(inner) => future_output(&inner.elem),
        Type::Group(inner) => future_output(&inner.elem),
        Type::ImplTrait(bounds) => output_from_bounds(bounds.bounds.iter()),
        Type::TraitObject(bounds) => output_from_bounds(bounds.bounds.iter()),
        Type::Path(TypePath { qself: None, path }) => {
            let last = path.segments.last()?;
            let name = last.ident.to_string();
            match name.as_str() {
                "Pin" | "Box" => future_output(single_type_argument(&last.arguments)?),
                "BoxFuture" | "LocalBoxFuture" => single_type_argument(&last.arguments),
                _ => None,
            }
        }
        _ => None,
    }
}

fn output_from_bounds<'a>(mut bounds: impl Iterator<Item = &'a TypeParamBound>) -> Option<&'a Type> {
    bounds.find_map(|bound| {
        let TypeParamBound::Trait(trait_bound) = bound else {
            return None;
        };
        let last = trait_bound.path.segments.last()?;
        if last.ident != "Future" {
            return None;
        }
        let PathArguments::AngleBracketed(args) = &last.arguments else {
            return None;
        };
        args.args.iter().find_map(|arg| match arg {
            GenericArgument::AssocType(assoc) if assoc.ident == "Output" => Some(&assoc.ty),
            _ => None,
        })
    })
}

/// Whether `ty` borrows: a non-`'static` reference or lifetime anywhere in it.
pub fn borrows(ty: &Type) -> bool {
    let mut finder = BorrowFinder { found: false };
    finder.visit_type(ty);
    finder.found
}

struct BorrowFinder {
    found: bool,
}

impl<'ast> Visit<'ast> for BorrowFinder {
    fn visit_type_reference(&mut self, node: &'ast TypeReference) {
        if node.lifetime.is_none() {
            self.found = true;
        }
        visit::visit_type_reference(self, node);
    }

    fn visit_lifetime(&mut self, node: &'ast Lifetime) {
        if node.ident != "static" {
            self.found = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::ToTokens;
    use syn::parse_quote;

    fn mapper() -> TypeMapper {
        TypeMapper::new(&GeneratorConfig::default()).unwrap()
    }

    fn render(ty: &Type) -> String {
        ty.to_token_stream().to_string()
    }

    #[test]
    fn test_async_fn_result() {
        let sig: Signature = parse_quote!(async fn get_user(id: String) -> User);
        assert_eq!(render(&async_result(&sig).unwrap()), "User");

        let sig: Signature = parse_quote!(async fn refresh());
        assert_eq!(render(&async_result(&sig).unwrap()), "()");
    }

    #[test]
    fn test_future_returning_shapes() {
        let shapes: Vec<Signature> = vec![
            parse_quote!(fn a() -> impl Future<Output = u32> + Send),
            parse_quote!(fn b() -> impl std::future::Future<Output = u32>),
            parse_quote!(fn c(&self) -> Pin<Box<dyn Future<Output = u32> + Send + '_>>),
            parse_quote!(fn d() -> BoxFuture<'static, u32>),
            parse_quote!(fn e() -> futures::future::LocalBoxFuture<'static, u32>),
        ];
        for sig in &shapes {
            let result = async_result(sig).unwrap_or_else(|| panic!("{} not async", sig.ident));
            assert_eq!(render(&result), "u32");
        }
    }

    #[test]
    fn test_plain_functions_are_not_async() {
        let sig: Signature = parse_quote!(fn get(id: String) -> User);
        assert!(async_result(&sig).is_none());
        let sig: Signature = parse_quote!(fn tick());
        assert!(async_result(&sig).is_none());
    }

    #[test]
    fn test_maps_host_paths_recursively() {
        let ty: Type = parse_quote!(::std::vec::Vec<std::option::Option<std::string::String>>);
        assert_eq!(render(&mapper().map_type(&ty)), "Vec < Option < String > >");

        let ty: Type = parse_quote!((&std::primitive::str, [core::primitive::u8; 4]));
        assert_eq!(render(&mapper().map_type(&ty)), "(& str , [u8 ; 4])");
    }

    #[test]
    fn test_unknown_paths_pass_through() {
        let ty: Type = parse_quote!(crate::models::User);
        assert_eq!(render(&mapper().map_type(&ty)), "crate :: models :: User");
    }

    #[test]
    fn test_configured_portable_type() {
        let config = GeneratorConfig::builder()
            .portable_type("smol_str::SmolStr", "String")
            .build()
            .unwrap();
        let mapper = TypeMapper::new(&config).unwrap();
        let ty: Type = parse_quote!(Vec<smol_str::SmolStr>);
        assert_eq!(render(&mapper.map_type(&ty)), "Vec < String >");
    }

    fn parameter(ty: Type, nullability: Nullability) -> Parameter {
        Parameter {
            name: parse_quote!(tag),
            ty,
            nullability,
            attrs: Vec::new(),
        }
    }

    #[test]
    fn test_not_null_unwraps_option() {
        let mapped = mapper()
            .map_parameter(&parameter(parse_quote!(std::option::Option<String>), Nullability::NotNull))
            .unwrap();
        assert_eq!(render(&mapped.param.ty), "String");
        assert_eq!(mapped.forward, Forward::WrapSome);
    }

    #[test]
    fn test_not_null_on_plain_type_is_unchanged() {
        let mapped = mapper()
            .map_parameter(&parameter(parse_quote!(String), Nullability::NotNull))
            .unwrap();
        assert_eq!(render(&mapped.param.ty), "String");
        assert_eq!(mapped.forward, Forward::AsIs);
    }

    #[test]
    fn test_nullable_requires_option() {
        let err = mapper()
            .map_parameter(&parameter(parse_quote!(String), Nullability::Nullable))
            .unwrap_err();
        assert!(err.contains("must have an Option type"));

        let mapped = mapper()
            .map_parameter(&parameter(parse_quote!(Option<u8>), Nullability::Nullable))
            .unwrap();
        assert_eq!(mapped.forward, Forward::AsIs);
    }

    #[test]
    fn test_borrow_detection() {
        assert!(borrows(&parse_quote!(&str)));
        assert!(borrows(&parse_quote!(Cow<'a, str>)));
        assert!(!borrows(&parse_quote!(&'static str)));
        assert!(!borrows(&parse_quote!(Vec<String>)));
    }
}
