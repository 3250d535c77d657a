//! # Generator Configuration
//!
//! Defaults the generator applies when an annotation leaves an option out,
//! plus the naming conventions of the produced units.
//!
//! ```
//! use recast_codegen::GeneratorConfig;
//!
//! let config = GeneratorConfig::builder()
//!     .async_suffix("_in_background")
//!     .runtime_path("::my_app::recast")
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.sync_suffix, "_sync");
//! assert_eq!(config.async_suffix, "_in_background");
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{Error, Result};

const DEFAULT_SYNC_SUFFIX: &str = "_sync";
const DEFAULT_ASYNC_SUFFIX: &str = "_async";
const DEFAULT_UNIT_MARKER: &str = "_recast";
const DEFAULT_HOLDER_SUFFIX: &str = ".rs";
const DEFAULT_IMPLS_MARKER: &str = "DefaultImpls";
const DEFAULT_RUNTIME_PATH: &str = "::recast";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Suffix of blocking wrappers when `#[recast_sync]` names none.
    pub sync_suffix: String,

    /// Suffix of background wrappers when `#[recast_async]` names none.
    pub async_suffix: String,

    /// Appended to a source file stem to name its free-function unit.
    pub unit_marker: String,

    /// Stripped from a source unit name before the marker is appended.
    pub holder_suffix: String,

    /// Containers whose name ends with this marker are forwarding holders and
    /// never wrapped.
    pub default_impls_marker: String,

    /// Path of the runtime crate as seen from generated code.
    pub runtime_path: String,

    /// Additional host-to-portable type paths, applied after the built-in map.
    pub portable_types: BTreeMap<String, String>,

    /// Root directory for written units (`None` = `OUT_DIR` in build scripts).
    pub output_dir: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sync_suffix: DEFAULT_SYNC_SUFFIX.to_string(),
            async_suffix: DEFAULT_ASYNC_SUFFIX.to_string(),
            unit_marker: DEFAULT_UNIT_MARKER.to_string(),
            holder_suffix: DEFAULT_HOLDER_SUFFIX.to_string(),
            default_impls_marker: DEFAULT_IMPLS_MARKER.to_string(),
            runtime_path: DEFAULT_RUNTIME_PATH.to_string(),
            portable_types: BTreeMap::new(),
            output_dir: None,
        }
    }
}

impl GeneratorConfig {
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        validate_suffix("sync_suffix", &self.sync_suffix)?;
        validate_suffix("async_suffix", &self.async_suffix)?;

        if self.sync_suffix == self.async_suffix {
            return Err(Error::Config(format!(
                "sync and async suffixes must differ (both are {:?})",
                self.sync_suffix
            )));
        }

        if self.unit_marker.is_empty() {
            return Err(Error::Config("Unit marker cannot be empty".to_string()));
        }
        validate_suffix("unit_marker", &self.unit_marker)?;

        if self.default_impls_marker.is_empty() {
            return Err(Error::Config(
                "Default-impls marker cannot be empty".to_string(),
            ));
        }

        syn::parse_str::<syn::Path>(&self.runtime_path).map_err(|e| {
            Error::Config(format!(
                "Runtime path {:?} is not a valid path: {}",
                self.runtime_path, e
            ))
        })?;

        for (host, portable) in &self.portable_types {
            syn::parse_str::<syn::Path>(host).map_err(|e| {
                Error::Config(format!("Portable type key {:?} is invalid: {}", host, e))
            })?;
            syn::parse_str::<syn::Path>(portable).map_err(|e| {
                Error::Config(format!(
                    "Portable type {:?} for {:?} is invalid: {}",
                    portable, host, e
                ))
            })?;
        }

        Ok(())
    }

    /// The runtime crate path. Only valid after [`GeneratorConfig::validate`].
    pub(crate) fn runtime(&self) -> Result<syn::Path> {
        syn::parse_str(&self.runtime_path)
            .map_err(|e| Error::Config(format!("Invalid runtime path: {}", e)))
    }
}

/// Suffixes are glued onto identifiers, so they may only hold identifier
/// characters.
pub(crate) fn validate_suffix(field: &str, suffix: &str) -> Result<()> {
    if suffix.chars().all(|c| c == '_' || c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{} {:?} may only contain ASCII letters, digits and underscores",
            field, suffix
        )))
    }
}

#[derive(Debug, Default)]
pub struct GeneratorConfigBuilder {
    sync_suffix: Option<String>,
    async_suffix: Option<String>,
    unit_marker: Option<String>,
    holder_suffix: Option<String>,
    default_impls_marker: Option<String>,
    runtime_path: Option<String>,
    portable_types: BTreeMap<String, String>,
    output_dir: Option<PathBuf>,
}

impl GeneratorConfigBuilder {
    pub fn sync_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.sync_suffix = Some(suffix.into());
        self
    }

    pub fn async_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.async_suffix = Some(suffix.into());
        self
    }

    pub fn unit_marker(mut self, marker: impl Into<String>) -> Self {
        self.unit_marker = Some(marker.into());
        self
    }

    pub fn holder_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.holder_suffix = Some(suffix.into());
        self
    }

    pub fn default_impls_marker(mut self, marker: impl Into<String>) -> Self {
        self.default_impls_marker = Some(marker.into());
        self
    }

    pub fn runtime_path(mut self, path: impl Into<String>) -> Self {
        self.runtime_path = Some(path.into());
        self
    }

    /// Maps the host type path `host` to `portable` in generated signatures.
    pub fn portable_type(mut self, host: impl Into<String>, portable: impl Into<String>) -> Self {
        self.portable_types.insert(host.into(), portable.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> Result<GeneratorConfig> {
        let defaults = GeneratorConfig::default();
        let config = GeneratorConfig {
            sync_suffix: self.sync_suffix.unwrap_or(defaults.sync_suffix),
            async_suffix: self.async_suffix.unwrap_or(defaults.async_suffix),
            unit_marker: self.unit_marker.unwrap_or(defaults.unit_marker),
            holder_suffix: self.holder_suffix.unwrap_or(defaults.holder_suffix),
            default_impls_marker: self
                .default_impls_marker
                .unwrap_or(defaults.default_impls_marker),
            runtime_path: self.runtime_path.unwrap_or(defaults.runtime_path),
            portable_types: self.portable_types,
            output_dir: self.output_dir,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GeneratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sync_suffix, "_sync");
        assert_eq!(config.async_suffix, "_async");
        assert_eq!(config.unit_marker, "_recast");
    }

    #[test]
    fn test_equal_suffixes_rejected() {
        let result = GeneratorConfig::builder()
            .sync_suffix("_call")
            .async_suffix("_call")
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_suffix_must_be_identifier_safe() {
        let err = GeneratorConfig::builder()
            .sync_suffix("-sync")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("sync_suffix"));
    }

    #[test]
    fn test_runtime_path_must_parse() {
        let result = GeneratorConfig::builder().runtime_path("not a path").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_portable_type_overrides() {
        let config = GeneratorConfig::builder()
            .portable_type("smol_str::SmolStr", "String")
            .output_dir("/tmp/recast")
            .build()
            .unwrap();
        assert_eq!(
            config.portable_types.get("smol_str::SmolStr").map(String::as_str),
            Some("String")
        );
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/recast")));
    }
}
