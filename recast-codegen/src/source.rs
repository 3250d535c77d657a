//! Parsed source units, the input of a generation pass.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// One parsed source file and the module path its items live in.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// File name of the unit, e.g. `sample_api.rs`.
    pub name: String,
    /// Module path of the file's items, e.g. `crate::api`.
    pub namespace: String,
    pub file: syn::File,
}

impl SourceUnit {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, file: syn::File) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            file,
        }
    }

    /// Parses `source` as the contents of the file `name`.
    pub fn parse(name: impl Into<String>, namespace: impl Into<String>, source: &str) -> Result<Self> {
        let name = name.into();
        let file = syn::parse_file(source).map_err(|e| {
            let start = e.span().start();
            Error::Parse {
                unit: name.clone(),
                message: format!("{} at {}:{}", e, start.line, start.column),
            }
        })?;
        Ok(Self::new(name, namespace, file))
    }

    /// Reads and parses a file from disk; the unit is named after the file.
    pub fn load(path: impl AsRef<Path>, namespace: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse(name, namespace, &source)
    }
}
