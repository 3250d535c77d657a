//! Declaration scanner.
//!
//! Walks the items of every source unit (descending into inline modules),
//! finds elements carrying recast annotations and files them into
//! [`TransformGroup`]s:
//!
//! | element                            | group key                                   |
//! |------------------------------------|---------------------------------------------|
//! | annotated free `fn`                | (Function, module path, file stem + marker) |
//! | annotated inherent `impl`          | (Class, module path, type name)             |
//! | annotated `trait`                  | (Interface, module path, trait name)        |
//! | annotated member, plain container  | (Function, module path, container name)     |
//!
//! Members of an annotated container are only ever visited through that
//! container, so each function lands in exactly one group.

use std::collections::{BTreeSet, HashMap};

use syn::spanned::Spanned;
use syn::{Attribute, FnArg, ImplItem, Item, ItemImpl, ItemTrait, Pat, Signature, TraitItem, Type, Visibility};

use crate::annotation::{is_nullability_marker, is_recast_attribute, nullability_of, AnnotationSet};
use crate::config::GeneratorConfig;
use crate::declaration::{
    Container, ContainerShape, ElementKind, FunctionDeclaration, GroupKey, Parameter, ReceiverKind,
    TransformGroup,
};
use crate::diagnostics::Diagnostic;
use crate::mapper;
use crate::source::SourceUnit;

#[derive(Debug, Default)]
pub struct ScanOutput {
    /// Groups in order of first appearance.
    pub groups: Vec<TransformGroup>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Scanner<'a> {
    config: &'a GeneratorConfig,
    groups: Vec<TransformGroup>,
    index: HashMap<GroupKey, usize>,
    diagnostics: Vec<Diagnostic>,
}

/// The function-level pieces shared by free functions, impl and trait members.
struct FnSource<'s> {
    attrs: &'s [Attribute],
    vis: Visibility,
    sig: &'s Signature,
}

impl<'a> Scanner<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self {
            config,
            groups: Vec::new(),
            index: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn scan(mut self, units: &[SourceUnit]) -> ScanOutput {
        for unit in units {
            tracing::debug!(unit = %unit.name, namespace = %unit.namespace, "scanning source unit");
            self.scan_items(&unit.file.items, &unit.namespace, unit);
        }
        ScanOutput {
            groups: self.groups,
            diagnostics: self.diagnostics,
        }
    }

    fn scan_items(&mut self, items: &[Item], namespace: &str, unit: &SourceUnit) {
        let module_fns: BTreeSet<String> = items
            .iter()
            .filter_map(|item| match item {
                Item::Fn(f) => Some(f.sig.ident.to_string()),
                _ => None,
            })
            .collect();

        for item in items {
            match item {
                Item::Fn(f) => {
                    let source = FnSource {
                        attrs: &f.attrs,
                        vis: f.vis.clone(),
                        sig: &f.sig,
                    };
                    self.scan_free_fn(source, namespace, unit, &module_fns);
                }
                Item::Impl(imp) => self.scan_impl(imp, namespace, unit),
                Item::Trait(tr) => self.scan_trait(tr, namespace, unit),
                Item::Mod(m) => {
                    self.reject_annotations(&m.attrs, unit, "modules cannot carry recast annotations");
                    if let Some((_, content)) = &m.content {
                        let child = if namespace.is_empty() {
                            m.ident.to_string()
                        } else {
                            format!("{}::{}", namespace, m.ident)
                        };
                        self.scan_items(content, &child, unit);
                    }
                }
                other => {
                    if let Some(attrs) = item_attrs(other) {
                        self.reject_annotations(
                            attrs,
                            unit,
                            "recast annotations apply to async functions, inherent impl blocks and traits",
                        );
                    }
                }
            }
        }
    }

    fn scan_free_fn(
        &mut self,
        source: FnSource<'_>,
        namespace: &str,
        unit: &SourceUnit,
        module_fns: &BTreeSet<String>,
    ) {
        let Some(annotations) = self.annotations(source.attrs, unit) else {
            return;
        };
        if annotations.is_empty() {
            return;
        }
        let Some(declaration) = self.declare(&source, annotations, unit, true) else {
            return;
        };

        let key = GroupKey {
            kind: ElementKind::Function,
            namespace: namespace.to_string(),
            unit: self.free_function_unit(&unit.name),
        };
        let group = self.group_mut(key);
        group.existing_names.extend(module_fns.iter().cloned());
        group.members.push(declaration);
    }

    fn scan_impl(&mut self, imp: &ItemImpl, namespace: &str, unit: &SourceUnit) {
        let members: Vec<_> = imp
            .items
            .iter()
            .filter_map(|item| match item {
                ImplItem::Fn(f) => Some(FnSource {
                    attrs: &f.attrs,
                    vis: f.vis.clone(),
                    sig: &f.sig,
                }),
                _ => None,
            })
            .collect();

        if imp.trait_.is_some() {
            self.reject_annotations(
                &imp.attrs,
                unit,
                "annotate the trait declaration instead of its implementation",
            );
            for member in &members {
                self.reject_annotations(
                    member.attrs,
                    unit,
                    "members of trait implementations cannot carry recast annotations",
                );
            }
            return;
        }

        let shape = ContainerShape::Inherent {
            self_ty: imp.self_ty.clone(),
            generics: imp.generics.clone(),
        };
        match type_name(&imp.self_ty) {
            Some(name) => self.scan_container(name, shape, &imp.attrs, members, namespace, unit),
            None => {
                self.reject_annotations(&imp.attrs, unit, "cannot name the container of this impl block");
                for member in &members {
                    self.reject_annotations(member.attrs, unit, "cannot name the container of this impl block");
                }
            }
        }
    }

    fn scan_trait(&mut self, tr: &ItemTrait, namespace: &str, unit: &SourceUnit) {
        let members: Vec<_> = tr
            .items
            .iter()
            .filter_map(|item| match item {
                TraitItem::Fn(f) => Some(FnSource {
                    attrs: &f.attrs,
                    vis: Visibility::Inherited,
                    sig: &f.sig,
                }),
                _ => None,
            })
            .collect();

        let annotated = tr.attrs.iter().any(is_recast_attribute)
            || members.iter().any(|m| m.attrs.iter().any(is_recast_attribute));
        if annotated && !tr.generics.params.is_empty() {
            self.diagnostics.push(Diagnostic::error(
                &unit.name,
                tr.generics.span(),
                format!("generic trait `{}` cannot carry recast annotations", tr.ident),
            ));
            return;
        }

        let shape = ContainerShape::Trait {
            ident: tr.ident.clone(),
            vis: tr.vis.clone(),
        };
        self.scan_container(tr.ident.to_string(), shape, &tr.attrs, members, namespace, unit);
    }

    fn scan_container(
        &mut self,
        name: String,
        shape: ContainerShape,
        attrs: &[Attribute],
        members: Vec<FnSource<'_>>,
        namespace: &str,
        unit: &SourceUnit,
    ) {
        if name.ends_with(&self.config.default_impls_marker) {
            tracing::debug!(container = %name, "skipping default-implementation holder");
            return;
        }
        let Some(defaults) = self.annotations(attrs, unit) else {
            return;
        };
        let container_annotated = !defaults.is_empty();

        let mut declarations = Vec::new();
        for member in &members {
            let Some(annotations) = self.annotations(member.attrs, unit) else {
                continue;
            };
            let direct = !annotations.is_empty();
            if !container_annotated && !direct {
                continue;
            }
            // Non-async members of an annotated container are simply not wrapped.
            if let Some(declaration) = self.declare(member, annotations, unit, direct) {
                declarations.push(declaration);
            }
        }

        if !container_annotated && declarations.is_empty() {
            return;
        }

        let kind = match (&shape, container_annotated) {
            (_, false) => ElementKind::Function,
            (ContainerShape::Inherent { .. }, true) => ElementKind::Class,
            (ContainerShape::Trait { .. }, true) => ElementKind::Interface,
        };
        let key = GroupKey {
            kind,
            namespace: namespace.to_string(),
            unit: name.clone(),
        };

        let group = self.group_mut(key);
        let index = group.containers.len();
        group.containers.push(Container {
            name,
            shape,
            defaults,
        });
        group
            .existing_names
            .extend(members.iter().map(|m| m.sig.ident.to_string()));
        for mut declaration in declarations {
            declaration.container = Some(index);
            group.members.push(declaration);
        }
    }

    /// Builds the declaration of an async function, or reports why it cannot
    /// be wrapped. `direct` is set when the function itself is annotated.
    fn declare(
        &mut self,
        source: &FnSource<'_>,
        annotations: AnnotationSet,
        unit: &SourceUnit,
        direct: bool,
    ) -> Option<FunctionDeclaration> {
        let sig = source.sig;
        let Some(result) = mapper::async_result(sig) else {
            if direct {
                self.diagnostics.push(Diagnostic::error(
                    &unit.name,
                    sig.ident.span(),
                    format!(
                        "recast annotations require an async function; `{}` is not asynchronous",
                        sig.ident
                    ),
                ));
            }
            return None;
        };

        if let Some(variadic) = &sig.variadic {
            self.diagnostics.push(Diagnostic::error(
                &unit.name,
                variadic.span(),
                "variadic functions cannot be wrapped",
            ));
            return None;
        }

        let mut receiver = None;
        let mut params = Vec::new();
        for input in &sig.inputs {
            match input {
                FnArg::Receiver(r) => receiver = Some((ReceiverKind::of(r), r.clone())),
                FnArg::Typed(pat_type) => {
                    let name = match pat_type.pat.as_ref() {
                        Pat::Ident(pat) if pat.by_ref.is_none() && pat.subpat.is_none() => pat.ident.clone(),
                        other => {
                            self.diagnostics.push(Diagnostic::error(
                                &unit.name,
                                other.span(),
                                format!(
                                    "parameters of `{}` must be plain identifiers to be forwarded",
                                    sig.ident
                                ),
                            ));
                            return None;
                        }
                    };
                    let nullability = match nullability_of(&pat_type.attrs) {
                        Ok(nullability) => nullability,
                        Err(e) => {
                            self.report(unit, e);
                            return None;
                        }
                    };
                    params.push(Parameter {
                        name,
                        ty: (*pat_type.ty).clone(),
                        nullability,
                        attrs: pat_type
                            .attrs
                            .iter()
                            .filter(|attr| !is_nullability_marker(attr))
                            .cloned()
                            .collect(),
                    });
                }
            }
        }

        Some(FunctionDeclaration {
            name: sig.ident.clone(),
            vis: source.vis.clone(),
            receiver,
            generics: sig.generics.clone(),
            params,
            result,
            container: None,
            annotations,
            source: unit.name.clone(),
            span: sig.ident.span(),
        })
    }

    /// `None` when the annotations were malformed (already reported).
    fn annotations(&mut self, attrs: &[Attribute], unit: &SourceUnit) -> Option<AnnotationSet> {
        match AnnotationSet::from_attributes(attrs, self.config) {
            Ok(set) => Some(set),
            Err(e) => {
                self.report(unit, e);
                None
            }
        }
    }

    fn reject_annotations(&mut self, attrs: &[Attribute], unit: &SourceUnit, message: &str) {
        for attr in attrs.iter().filter(|attr| is_recast_attribute(attr)) {
            self.diagnostics
                .push(Diagnostic::error(&unit.name, attr.span(), message));
        }
    }

    fn report(&mut self, unit: &SourceUnit, error: syn::Error) {
        for e in error {
            self.diagnostics
                .push(Diagnostic::error(&unit.name, e.span(), e.to_string()));
        }
    }

    fn free_function_unit(&self, source_name: &str) -> String {
        let stem = source_name
            .strip_suffix(&self.config.holder_suffix)
            .unwrap_or(source_name);
        format!("{}{}", stem, self.config.unit_marker)
    }

    fn group_mut(&mut self, key: GroupKey) -> &mut TransformGroup {
        let index = match self.index.get(&key) {
            Some(&index) => index,
            None => {
                tracing::debug!(group = %key, "new transform group");
                self.groups.push(TransformGroup::new(key.clone()));
                self.index.insert(key, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }
}

/// The last path segment of an impl's self type (`Repo` for `crate::Repo<T>`).
fn type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) if path.qself.is_none() => {
            path.path.segments.last().map(|s| s.ident.to_string())
        }
        Type::Group(group) => type_name(&group.elem),
        Type::Paren(paren) => type_name(&paren.elem),
        _ => None,
    }
}

fn item_attrs(item: &Item) -> Option<&[Attribute]> {
    let attrs = match item {
        Item::Const(i) => &i.attrs,
        Item::Enum(i) => &i.attrs,
        Item::ExternCrate(i) => &i.attrs,
        Item::ForeignMod(i) => &i.attrs,
        Item::Macro(i) => &i.attrs,
        Item::Static(i) => &i.attrs,
        Item::Struct(i) => &i.attrs,
        Item::TraitAlias(i) => &i.attrs,
        Item::Type(i) => &i.attrs,
        Item::Union(i) => &i.attrs,
        Item::Use(i) => &i.attrs,
        _ => return None,
    };
    Some(attrs.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{GenerationKind, Nullability};

    fn scan(source: &str) -> ScanOutput {
        let config = GeneratorConfig::default();
        let unit = SourceUnit::parse("sample_api.rs", "crate::api", source).unwrap();
        Scanner::new(&config).scan(&[unit])
    }

    #[test]
    fn test_free_functions_group_by_source_unit() {
        let output = scan(
            r#"
            #[recast_sync]
            pub async fn get_user(id: String) -> User { todo!() }

            #[recast_async]
            pub async fn list_users() -> Vec<User> { todo!() }

            pub async fn untouched() {}
            "#,
        );

        assert!(output.diagnostics.is_empty());
        assert_eq!(output.groups.len(), 1);
        let group = &output.groups[0];
        assert_eq!(group.key.kind, ElementKind::Function);
        assert_eq!(group.key.namespace, "crate::api");
        assert_eq!(group.key.unit, "sample_api_recast");
        let names: Vec<_> = group.members.iter().map(|m| m.name.to_string()).collect();
        assert_eq!(names, ["get_user", "list_users"]);
        assert!(group.existing_names.contains("untouched"));
    }

    #[test]
    fn test_annotated_impl_is_a_class_group() {
        let output = scan(
            r#"
            #[recast_async(scoped = true)]
            impl UserRepository {
                pub async fn find(&self, id: u64) -> Option<User> { todo!() }
                pub fn cached(&self) -> usize { 0 }
                #[recast_sync(suffix = "_now")]
                pub async fn count(&self) -> usize { 0 }
            }
            "#,
        );

        assert!(output.diagnostics.is_empty());
        let group = &output.groups[0];
        assert_eq!(group.key.kind, ElementKind::Class);
        assert_eq!(group.key.unit, "UserRepository");
        assert_eq!(group.members.len(), 2);

        let count = group.resolved(&group.members[1]);
        assert_eq!(count.get(GenerationKind::Sync).unwrap().suffix, "_now");
        assert!(count.get(GenerationKind::Async).unwrap().scoped);
        assert!(group.existing_names.contains("cached"));
    }

    #[test]
    fn test_member_of_plain_container_is_function_group() {
        let output = scan(
            r#"
            pub trait Catalog {
                #[recast_async]
                async fn lookup(&self, sku: String) -> u32;
                async fn ignored(&self);
            }
            "#,
        );

        let group = &output.groups[0];
        assert_eq!(group.key.kind, ElementKind::Function);
        assert_eq!(group.key.unit, "Catalog");
        assert_eq!(group.members.len(), 1);
        assert!(matches!(group.containers[0].shape, ContainerShape::Trait { .. }));
    }

    #[test]
    fn test_nested_modules_extend_namespace() {
        let output = scan(
            r#"
            mod admin {
                #[recast_sync]
                pub async fn purge() {}
            }
            "#,
        );
        assert_eq!(output.groups[0].key.namespace, "crate::api::admin");
    }

    #[test]
    fn test_non_async_annotated_function_is_reported() {
        let output = scan(
            r#"
            #[recast_sync]
            pub fn not_async() -> u8 { 0 }

            #[recast_sync]
            pub async fn fine() {}
            "#,
        );

        assert_eq!(output.diagnostics.len(), 1);
        assert!(output.diagnostics[0].message.contains("`not_async` is not asynchronous"));
        assert_eq!(output.groups[0].members.len(), 1);
    }

    #[test]
    fn test_invalid_placements_are_reported() {
        let output = scan(
            r#"
            #[recast_async]
            pub struct Api;

            #[recast_async]
            impl Service for Api {
                #[recast_sync]
                async fn call(&self) {}
            }
            "#,
        );

        assert_eq!(output.diagnostics.len(), 3);
        assert!(output.groups.is_empty());
    }

    #[test]
    fn test_default_impls_holders_are_skipped() {
        let output = scan(
            r#"
            #[recast_async]
            impl CatalogDefaultImpls {
                pub async fn lookup(&self) -> u32 { 0 }
            }
            "#,
        );
        assert!(output.groups.is_empty());
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_markers_become_nullability() {
        let output = scan(
            r#"
            #[recast_sync]
            pub async fn tag(#[not_null] label: Option<String>, #[allow(unused)] note: String) {}
            "#,
        );

        let params = &output.groups[0].members[0].params;
        assert_eq!(params[0].nullability, Nullability::NotNull);
        assert!(params[0].attrs.is_empty());
        assert_eq!(params[1].attrs.len(), 1);
    }

    #[test]
    fn test_destructuring_parameters_are_reported() {
        let output = scan(
            r#"
            #[recast_sync]
            pub async fn sum((a, b): (u8, u8)) -> u8 { a + b }
            "#,
        );
        assert_eq!(output.diagnostics.len(), 1);
        assert!(output.groups.is_empty());
    }

    #[test]
    fn test_malformed_options_are_reported() {
        let output = scan(
            r#"
            #[recast_async(retries = 3)]
            pub async fn fetch() {}
            "#,
        );
        assert_eq!(output.diagnostics.len(), 1);
        assert!(output.groups.is_empty());
    }
}
