//! Generation-time diagnostics and the machine-readable pass report.
//!
//! Element-level problems never abort a pass: they are collected as
//! [`Diagnostic`]s, the element is skipped and unrelated groups still emit.

use std::fmt;

use proc_macro2::Span;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Source unit the element came from.
    pub unit: String,
    pub line: usize,
    pub column: usize,
    #[serde(skip)]
    pub span: Span,
}

impl Diagnostic {
    pub fn error(unit: impl Into<String>, span: Span, message: impl Into<String>) -> Self {
        let start = span.start();
        Self {
            severity: Severity::Error,
            message: message.into(),
            unit: unit.into(),
            line: start.line,
            column: start.column,
            span,
        }
    }

    /// Converts into a `syn::Error` pointing at the offending tokens.
    pub fn to_syn_error(&self) -> syn::Error {
        syn::Error::new(self.span, &self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error: {} ({}:{}:{})",
            self.message, self.unit, self.line, self.column
        )
    }
}

/// One written output unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitSummary {
    pub namespace: String,
    pub unit: String,
    /// Path relative to the output root.
    pub path: String,
    pub functions: usize,
}

/// Outcome of one generation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub units: Vec<UnitSummary>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
