//! Emitter: renders one output unit per group and hands it to a
//! [`UnitWriter`].

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::PathBuf;

use quote::format_ident;
use syn::{parse_quote, ImplItem, ImplItemFn, Item, ItemFn, TraitItem, TraitItemFn};

use crate::declaration::{ContainerShape, TransformGroup};
use crate::diagnostics::UnitSummary;
use crate::error::{Error, Result};
use crate::synthesizer::GeneratedFunctionSpec;

pub const HEADER: &str = "// @generated by recast-codegen. Do not edit.\n";

/// Persists rendered units. `path` is relative to the output root and uses
/// `/` separators.
pub trait UnitWriter {
    fn write_unit(&mut self, path: &str, contents: &str) -> Result<()>;
}

/// Writes units below a root directory, leaving unchanged files untouched so
/// their modification times stay stable.
#[derive(Debug, Clone)]
pub struct FsUnitWriter {
    root: PathBuf,
}

impl FsUnitWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl UnitWriter for FsUnitWriter {
    fn write_unit(&mut self, path: &str, contents: &str) -> Result<()> {
        let target = path
            .split('/')
            .fold(self.root.clone(), |acc, segment| acc.join(segment));

        if let Ok(existing) = fs::read_to_string(&target) {
            if existing == contents {
                tracing::debug!(path = %target.display(), "unit unchanged");
                return Ok(());
            }
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::write(&target, contents).map_err(|e| Error::io(&target, e))?;
        tracing::debug!(path = %target.display(), "unit written");
        Ok(())
    }
}

/// Keeps units in memory, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryUnitWriter {
    pub units: BTreeMap<String, String>,
}

impl UnitWriter for MemoryUnitWriter {
    fn write_unit(&mut self, path: &str, contents: &str) -> Result<()> {
        self.units.insert(path.to_string(), contents.to_string());
        Ok(())
    }
}

/// Writes one unit per group that produced at least one spec.
///
/// Two groups resolving to the same output path are not an error: both are
/// written in order, so the later one replaces the earlier, and a warning is
/// logged.
pub fn emit(
    outputs: &[(TransformGroup, Vec<GeneratedFunctionSpec>)],
    writer: &mut dyn UnitWriter,
) -> Result<Vec<UnitSummary>> {
    let mut written = HashSet::new();
    let mut summaries = Vec::new();

    for (group, specs) in outputs {
        if specs.is_empty() {
            tracing::debug!(group = %group.key, "no wrappers; unit not written");
            continue;
        }
        let path = group.key.output_path();
        if !written.insert(path.clone()) {
            tracing::warn!(
                group = %group.key,
                path = %path,
                "output unit already written by another group; overwriting"
            );
        }

        let contents = render_unit(group, specs);
        writer.write_unit(&path, &contents)?;
        summaries.push(UnitSummary {
            namespace: group.key.namespace.clone(),
            unit: group.key.unit.clone(),
            path,
            functions: specs.len(),
        });
    }

    Ok(summaries)
}

/// Renders the source text of one group's unit.
pub fn render_unit(group: &TransformGroup, specs: &[GeneratedFunctionSpec]) -> String {
    let mut items: Vec<Item> = Vec::new();

    // Free functions first-come; container wrappers gathered per container in
    // order of first appearance.
    let mut order: Vec<Option<usize>> = Vec::new();
    for spec in specs {
        if spec.container.is_none() || !order.contains(&spec.container) {
            order.push(spec.container);
        }
    }

    let mut free = specs.iter().filter(|s| s.container.is_none());
    for slot in order {
        match slot {
            None => {
                if let Some(spec) = free.next() {
                    items.push(Item::Fn(free_function(spec)));
                }
            }
            Some(index) => {
                let members: Vec<&GeneratedFunctionSpec> =
                    specs.iter().filter(|s| s.container == Some(index)).collect();
                if let Some(container) = group.containers.get(index) {
                    items.extend(container_items(&container.shape, &members));
                }
            }
        }
    }

    let file = syn::File {
        shebang: None,
        attrs: Vec::new(),
        items,
    };
    format!("{}\n{}", HEADER, prettyplease::unparse(&file))
}

fn free_function(spec: &GeneratedFunctionSpec) -> ItemFn {
    ItemFn {
        attrs: spec.attrs.clone(),
        vis: spec.vis.clone(),
        sig: spec.sig.clone(),
        block: Box::new(spec.block.clone()),
    }
}

fn container_items(shape: &ContainerShape, members: &[&GeneratedFunctionSpec]) -> Vec<Item> {
    match shape {
        ContainerShape::Inherent { self_ty, generics } => {
            let (impl_generics, _, where_clause) = generics.split_for_impl();
            let methods = members.iter().map(|spec| {
                ImplItem::Fn(ImplItemFn {
                    attrs: spec.attrs.clone(),
                    vis: spec.vis.clone(),
                    defaultness: None,
                    sig: spec.sig.clone(),
                    block: spec.block.clone(),
                })
            });
            vec![parse_quote! {
                impl #impl_generics #self_ty #where_clause {
                    #(#methods)*
                }
            }]
        }
        ContainerShape::Trait { ident, vis } => {
            let extension = format_ident!("{}Recast", ident);
            let methods = members.iter().map(|spec| {
                TraitItem::Fn(TraitItemFn {
                    attrs: spec.attrs.clone(),
                    sig: spec.sig.clone(),
                    default: Some(spec.block.clone()),
                    semi_token: None,
                })
            });
            let doc = format!(" Blocking and background wrappers for [`{}`].", ident);
            vec![
                parse_quote! {
                    #[doc = #doc]
                    #vis trait #extension: #ident {
                        #(#methods)*
                    }
                },
                parse_quote! {
                    impl<T: #ident + ?Sized> #extension for T {}
                },
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::scanner::Scanner;
    use crate::source::SourceUnit;
    use crate::synthesizer::Synthesizer;
    use mockall::mock;
    use mockall::predicate::{always, eq};

    mock! {
        Writer {}

        impl UnitWriter for Writer {
            fn write_unit(&mut self, path: &str, contents: &str) -> Result<()>;
        }
    }

    fn outputs(source: &str) -> Vec<(TransformGroup, Vec<GeneratedFunctionSpec>)> {
        let config = GeneratorConfig::default();
        let unit = SourceUnit::parse("sample_api.rs", "crate::api", source).unwrap();
        let scan = Scanner::new(&config).scan(&[unit]);
        let synthesizer = Synthesizer::new(&config).unwrap();
        let mut diagnostics = scan.diagnostics;
        scan.groups
            .into_iter()
            .map(|group| {
                let specs = synthesizer.synthesize(&group, &mut diagnostics);
                (group, specs)
            })
            .collect()
    }

    #[test]
    fn test_free_functions_render_as_items() {
        let outputs = outputs(
            r#"
            #[recast_sync]
            pub async fn ping(host: String) -> u32 { 0 }
            "#,
        );
        let text = render_unit(&outputs[0].0, &outputs[0].1);

        assert!(text.starts_with(HEADER));
        assert!(text.contains("pub fn ping_sync(host: String) -> u32 {"));
        assert!(text.contains("::recast::run_blocking(move || crate::api::ping(host))"));
    }

    #[test]
    fn test_inherent_impl_keeps_generics() {
        let outputs = outputs(
            r#"
            #[recast_sync]
            impl<K: Ord + Send> Cache<K> {
                pub async fn len(&self) -> usize { 0 }
            }
            "#,
        );
        let text = render_unit(&outputs[0].0, &outputs[0].1);
        assert!(text.contains("impl<K: Ord + Send> Cache<K> {"));
        assert!(text.contains("pub fn len_sync(&self) -> usize {"));
    }

    #[test]
    fn test_trait_renders_extension_trait() {
        let outputs = outputs(
            r#"
            #[recast_sync]
            pub trait Catalog {
                async fn lookup(&self, sku: String) -> u32;
            }
            "#,
        );
        let text = render_unit(&outputs[0].0, &outputs[0].1);
        assert!(text.contains("pub trait CatalogRecast: Catalog {"));
        assert!(text.contains("fn lookup_sync(&self, sku: String) -> u32 {"));
        assert!(text.contains("impl<T: Catalog + ?Sized> CatalogRecast for T {}"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let source = r#"
            #[recast_sync]
            #[recast_async(scoped = true)]
            pub async fn get_user(id: String) -> User { todo!() }
        "#;
        let first = outputs(source);
        let second = outputs(source);
        assert_eq!(
            render_unit(&first[0].0, &first[0].1),
            render_unit(&second[0].0, &second[0].1)
        );
    }

    #[test]
    fn test_emit_skips_groups_without_specs() {
        let outputs = outputs(
            r#"
            #[recast_async]
            impl Api {
                pub fn not_async(&self) {}
            }
            "#,
        );
        assert_eq!(outputs.len(), 1);

        let mut writer = MockWriter::new();
        writer.expect_write_unit().never();
        let summaries = emit(&outputs, &mut writer).unwrap();
        assert!(summaries.is_empty());
    }

    #[test]
    fn test_emit_writes_unit_path() {
        let outputs = outputs(
            r#"
            #[recast_sync]
            pub async fn ping() {}
            "#,
        );

        let mut writer = MockWriter::new();
        writer
            .expect_write_unit()
            .with(eq("crate/api/sample_api_recast.rs"), always())
            .times(1)
            .returning(|_, _| Ok(()));
        let summaries = emit(&outputs, &mut writer).unwrap();
        assert_eq!(summaries[0].functions, 1);
    }

    #[test]
    fn test_emit_propagates_writer_errors() {
        let outputs = outputs(
            r#"
            #[recast_sync]
            pub async fn ping() {}
            "#,
        );

        let mut writer = MockWriter::new();
        writer
            .expect_write_unit()
            .returning(|path, _| {
                Err(Error::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                ))
            });
        assert!(emit(&outputs, &mut writer).is_err());
    }

    #[test]
    fn test_fs_writer_creates_namespace_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = FsUnitWriter::new(dir.path());
        writer.write_unit("crate/api/a.rs", "// one\n").unwrap();
        writer.write_unit("crate/api/a.rs", "// one\n").unwrap();

        let written = fs::read_to_string(dir.path().join("crate").join("api").join("a.rs")).unwrap();
        assert_eq!(written, "// one\n");
    }

    #[test]
    fn test_memory_writer_last_write_wins() {
        let mut writer = MemoryUnitWriter::default();
        writer.write_unit("x.rs", "first").unwrap();
        writer.write_unit("x.rs", "second").unwrap();
        assert_eq!(writer.units["x.rs"], "second");
    }
}
