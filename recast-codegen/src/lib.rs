//! Wrapper generator for recast-annotated async functions.
//!
//! A generation pass reads a fixed, ordered set of [`SourceUnit`]s and
//!
//! 1. scans them for `#[recast_sync]` / `#[recast_async]` annotations and
//!    files every eligible function into a [`TransformGroup`]
//!    ([`scanner`]);
//! 2. synthesizes wrapper specs per group, mapping types and parameters
//!    ([`synthesizer`], [`mapper`]);
//! 3. renders one unit per group and hands it to a [`UnitWriter`]
//!    ([`emitter`]).
//!
//! Element-level problems become [`Diagnostic`]s; the pass keeps going.
//! Passes are deterministic: the same input yields byte-identical units.
//!
//! ```
//! use recast_codegen::{generate, GeneratorConfig, MemoryUnitWriter, SourceUnit};
//!
//! let unit = SourceUnit::parse(
//!     "sample_api.rs",
//!     "crate::api",
//!     r#"
//!     #[recast_sync]
//!     pub async fn get_user(id: String) -> String { id }
//!     "#,
//! )
//! .unwrap();
//!
//! let mut writer = MemoryUnitWriter::default();
//! let report = generate(&[unit], &GeneratorConfig::default(), &mut writer).unwrap();
//! assert!(!report.has_errors());
//! assert!(writer.units["crate/api/sample_api_recast.rs"].contains("pub fn get_user_sync"));
//! ```
//!
//! Build scripts usually go through [`cargo::Build`] instead.

pub mod annotation;
pub mod cargo;
pub mod config;
pub mod declaration;
pub mod diagnostics;
pub mod emitter;
pub mod error;
pub mod mapper;
pub mod scanner;
pub mod source;
pub mod synthesizer;

pub use config::GeneratorConfig;
pub use declaration::{ElementKind, GroupKey, TransformGroup};
pub use diagnostics::{Diagnostic, Report, Severity};
pub use emitter::{FsUnitWriter, MemoryUnitWriter, UnitWriter};
pub use error::{Error, Result};
pub use source::SourceUnit;
pub use synthesizer::{GeneratedFunctionSpec, Synthesizer};

use scanner::Scanner;

/// Runs one generation pass and writes its units through `writer`.
pub fn generate(
    units: &[SourceUnit],
    config: &GeneratorConfig,
    writer: &mut dyn UnitWriter,
) -> Result<Report> {
    let (outputs, diagnostics) = synthesize_all(units, config)?;
    let units = emitter::emit(&outputs, writer)?;
    tracing::info!(
        units = units.len(),
        diagnostics = diagnostics.len(),
        "generation pass finished"
    );
    Ok(Report { units, diagnostics })
}

/// Runs scanning and synthesis without writing anything, returning only the
/// diagnostics. Used for compile-time validation of annotated items.
pub fn diagnose(units: &[SourceUnit], config: &GeneratorConfig) -> Result<Vec<Diagnostic>> {
    synthesize_all(units, config).map(|(_, diagnostics)| diagnostics)
}

type GroupOutputs = Vec<(TransformGroup, Vec<GeneratedFunctionSpec>)>;

fn synthesize_all(
    units: &[SourceUnit],
    config: &GeneratorConfig,
) -> Result<(GroupOutputs, Vec<Diagnostic>)> {
    config.validate()?;
    let scan = Scanner::new(config).scan(units);
    let synthesizer = Synthesizer::new(config)?;

    let mut diagnostics = scan.diagnostics;
    let outputs = scan
        .groups
        .into_iter()
        .map(|group| {
            let specs = synthesizer.synthesize(&group, &mut diagnostics);
            (group, specs)
        })
        .collect();
    Ok((outputs, diagnostics))
}
