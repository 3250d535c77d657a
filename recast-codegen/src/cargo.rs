//! Build-script integration.
//!
//! ```no_run
//! // build.rs
//! fn main() -> anyhow::Result<()> {
//!     recast_codegen::cargo::Build::new()
//!         .source("src/api.rs", "crate::api")
//!         .run()?;
//!     Ok(())
//! }
//! ```
//!
//! Each unit lands under `OUT_DIR` at `<namespace path>/<unit>.rs`; include
//! it from the module it was generated for:
//!
//! ```ignore
//! include!(concat!(env!("OUT_DIR"), "/crate/api/api_recast.rs"));
//! ```

use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use crate::config::GeneratorConfig;
use crate::diagnostics::Report;
use crate::emitter::FsUnitWriter;
use crate::source::SourceUnit;

#[derive(Debug, Default)]
pub struct Build {
    sources: Vec<(PathBuf, String)>,
    config: GeneratorConfig,
    fail_on_error: bool,
}

impl Build {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source file whose items live in module `namespace`.
    pub fn source(mut self, path: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        self.sources.push((path.into(), namespace.into()));
        self
    }

    pub fn config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Fail the build when the pass reports errors instead of only warning.
    pub fn fail_on_error(mut self, fail: bool) -> Self {
        self.fail_on_error = fail;
        self
    }

    pub fn run(self) -> anyhow::Result<Report> {
        let out_dir = match &self.config.output_dir {
            Some(dir) => dir.clone(),
            None => PathBuf::from(
                env::var("OUT_DIR")
                    .context("OUT_DIR is not set; run from a build script or configure output_dir")?,
            ),
        };
        self.run_into(&out_dir, &mut io::stdout().lock())
    }

    /// Runs the pass into `out_dir`, printing cargo directives to `directives`.
    pub fn run_into(self, out_dir: &Path, directives: &mut dyn Write) -> anyhow::Result<Report> {
        let mut units = Vec::with_capacity(self.sources.len());
        for (path, namespace) in &self.sources {
            writeln!(directives, "cargo:rerun-if-changed={}", path.display())?;
            let unit = SourceUnit::load(path, namespace.clone())
                .with_context(|| format!("failed to load recast source {}", path.display()))?;
            units.push(unit);
        }

        let mut writer = FsUnitWriter::new(out_dir);
        let report = crate::generate(&units, &self.config, &mut writer)
            .context("recast generation failed")?;

        for diagnostic in &report.diagnostics {
            writeln!(directives, "cargo:warning={}", diagnostic)?;
        }
        if self.fail_on_error && report.has_errors() {
            bail!(
                "recast generation reported {} error(s)",
                report.diagnostics.len()
            );
        }
        Ok(report)
    }
}
