//! The generation-time data model.
//!
//! Everything here lives for one generation pass: the scanner builds
//! [`TransformGroup`]s from the parsed sources, the synthesizer turns them
//! into specs and the emitter renders those.

use std::collections::BTreeSet;
use std::fmt;

use proc_macro2::Span;
use syn::{Attribute, Generics, Ident, Type, Visibility};

use crate::annotation::{AnnotationSet, Nullability};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    /// Free functions of a source unit, or annotated members of an
    /// un-annotated container.
    Function,
    /// An annotated inherent `impl` block.
    Class,
    /// An annotated `trait`.
    Interface,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Function => "function",
            ElementKind::Class => "class",
            ElementKind::Interface => "interface",
        };
        f.write_str(name)
    }
}

/// Identity of a [`TransformGroup`]; one output unit per distinct key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub kind: ElementKind,
    /// Module path, e.g. `crate::api`.
    pub namespace: String,
    pub unit: String,
}

impl GroupKey {
    /// Output location relative to the output root: `crate/api/<unit>.rs`.
    pub fn output_path(&self) -> String {
        let mut path = self.namespace.replace("::", "/");
        if !path.is_empty() {
            path.push('/');
        }
        path.push_str(&self.unit);
        path.push_str(".rs");
        path
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}::{}", self.kind, self.namespace, self.unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverKind {
    /// `&self`
    Ref,
    /// `&mut self`
    RefMut,
    /// `self`, `mut self` or a typed receiver such as `self: Arc<Self>`.
    Value,
}

impl ReceiverKind {
    pub fn of(receiver: &syn::Receiver) -> Self {
        if receiver.colon_token.is_some() {
            // `self: &Self` and friends still borrow.
            return match receiver.ty.as_ref() {
                Type::Reference(r) if r.mutability.is_some() => ReceiverKind::RefMut,
                Type::Reference(_) => ReceiverKind::Ref,
                _ => ReceiverKind::Value,
            };
        }
        match &receiver.reference {
            Some(_) if receiver.mutability.is_some() => ReceiverKind::RefMut,
            Some(_) => ReceiverKind::Ref,
            None => ReceiverKind::Value,
        }
    }
}

/// A declared parameter, before mapping.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: Ident,
    pub ty: Type,
    pub nullability: Nullability,
    /// Attributes forwarded to the wrapper, markers already removed.
    pub attrs: Vec<Attribute>,
}

#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    pub name: Ident,
    pub vis: Visibility,
    pub receiver: Option<(ReceiverKind, syn::Receiver)>,
    pub generics: Generics,
    pub params: Vec<Parameter>,
    /// The unwrapped result type (`()` when an `async fn` declares none).
    pub result: Type,
    /// Index into [`TransformGroup::containers`]; `None` for free functions.
    pub container: Option<usize>,
    /// Annotations attached directly to this function.
    pub annotations: AnnotationSet,
    /// Source unit the declaration was read from.
    pub source: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ContainerShape {
    /// Inherent `impl` block; wrappers go into another `impl` of the same type.
    Inherent { self_ty: Box<Type>, generics: Generics },
    /// Trait; wrappers go into a blanket-implemented extension trait.
    Trait { ident: Ident, vis: Visibility },
}

#[derive(Debug, Clone)]
pub struct Container {
    pub name: String,
    pub shape: ContainerShape,
    /// Container-level annotations, the defaults for its members.
    pub defaults: AnnotationSet,
}

#[derive(Debug, Clone)]
pub struct TransformGroup {
    pub key: GroupKey,
    pub containers: Vec<Container>,
    pub members: Vec<FunctionDeclaration>,
    /// Names already declared in the group's scope; wrappers never shadow them.
    pub existing_names: BTreeSet<String>,
}

impl TransformGroup {
    pub fn new(key: GroupKey) -> Self {
        Self {
            key,
            containers: Vec::new(),
            members: Vec::new(),
            existing_names: BTreeSet::new(),
        }
    }

    /// The effective configuration of a member: its own annotations over its
    /// container's defaults.
    pub fn resolved(&self, member: &FunctionDeclaration) -> AnnotationSet {
        match member.container.and_then(|i| self.containers.get(i)) {
            Some(container) => AnnotationSet::resolve(&container.defaults, &member.annotations),
            None => member.annotations.clone(),
        }
    }
}
