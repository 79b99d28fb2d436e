//! dbsuite Error Handling - Unified Diagnostic API
//!
//! Every failure the core reports (store syntax, unknown names, malformed
//! profile expressions, reference cycles) is a [`HarnessError`]. Each context
//! that can fail implements [`ErrorReporting`] so errors carry the right source
//! text, span, and phase-scoped error code without manual construction.
//!
//! Backend and test-case failures are deliberately separate (`BackendError`,
//! `CaseFailure`): the core hands them through without classifying them.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};

use crate::syntax::Span;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// Source text an error points into: a store file, or a fallback description
/// when the value came from memory.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: Arc<str>,
}

impl SourceContext {
    /// Create a source context from real file content
    pub fn from_file(name: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Create a fallback when real source is unavailable
    pub fn fallback(context: &str) -> Self {
        Self {
            name: "fallback".to_string(),
            content: format!("; {}", context).into(),
        }
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.to_string()))
    }

    /// Clamps a span to this source so miette never renders out of range.
    fn clamp(&self, span: SourceSpan) -> SourceSpan {
        let len = self.content.len();
        let start = span.offset().min(len);
        let end = (span.offset() + span.len()).min(len);
        SourceSpan::from(start..end)
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::fallback("in-memory value")
    }
}

// ============================================================================
// ERROR TYPE
// ============================================================================

/// The single diagnostic type for the resolution and wiring core.
#[derive(Debug)]
pub struct HarnessError {
    /// What went wrong
    pub kind: ErrorKind,
    /// Where it happened
    pub source_info: SourceInfo,
    /// How to help
    pub diagnostic_info: DiagnosticInfo,
}

/// All error kinds the core can report.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Parse errors - store syntax
    MissingElement { element: String },
    MalformedConstruct { construct: String },
    InvalidLiteral { literal_type: String, value: String },

    // Resolution errors
    UnknownName { name: String, table: NameTable },
    MalformedExpression { value: String },
    CyclicReference { chain: Vec<String> },

    // Store content errors
    InvalidDescriptor { name: String, reason: String },
    InvalidStore { reason: String },

    // Environment errors
    Io { path: String, reason: String },
    Renderer { reason: String },
}

/// Which lookup table a name was missing from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameTable {
    /// The persisted profile expression table (`ref`).
    Profiles,
    /// The data-source descriptor registry (`dsn`).
    DataSources,
    /// A command-line label, tried against both tables.
    Labels,
}

impl fmt::Display for NameTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameTable::Profiles => write!(f, "profile store"),
            NameTable::DataSources => write!(f, "data-source registry"),
            NameTable::Labels => write!(f, "profile store or data-source registry"),
        }
    }
}

/// Context-specific source information
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
    pub phase: String,
}

/// Diagnostic enhancement data
#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

/// Coarse grouping used by callers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parse,
    Resolution,
    Store,
    Environment,
}

impl HarnessError {
    /// Attaches a help message.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.diagnostic_info.help = Some(help.into());
        self
    }

    /// The name that failed to resolve, if this is an `UnknownName` error.
    pub fn unknown_name(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::UnknownName { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    fn primary_label(&self) -> String {
        match &self.kind {
            ErrorKind::MissingElement { .. } => "missing here".into(),
            ErrorKind::MalformedConstruct { .. } => "malformed syntax".into(),
            ErrorKind::InvalidLiteral { .. } => "invalid literal".into(),
            ErrorKind::UnknownName { .. } => "unknown name".into(),
            ErrorKind::MalformedExpression { .. } => "not (profile ...), (ref ...) or (dsn ...)".into(),
            ErrorKind::CyclicReference { .. } => "reference cycle".into(),
            ErrorKind::InvalidDescriptor { .. } => "invalid data source".into(),
            ErrorKind::InvalidStore { .. } => "invalid store entry".into(),
            ErrorKind::Io { .. } => "i/o failure".into(),
            ErrorKind::Renderer { .. } => "renderer failure".into(),
        }
    }
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingElement { .. }
            | Self::MalformedConstruct { .. }
            | Self::InvalidLiteral { .. } => ErrorCategory::Parse,

            Self::UnknownName { .. }
            | Self::MalformedExpression { .. }
            | Self::CyclicReference { .. } => ErrorCategory::Resolution,

            Self::InvalidDescriptor { .. } | Self::InvalidStore { .. } => ErrorCategory::Store,

            Self::Io { .. } | Self::Renderer { .. } => ErrorCategory::Environment,
        }
    }

    /// Error code suffix for diagnostic codes
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::MissingElement { .. } => "missing_element",
            Self::MalformedConstruct { .. } => "malformed_construct",
            Self::InvalidLiteral { .. } => "invalid_literal",
            Self::UnknownName { .. } => "unknown_name",
            Self::MalformedExpression { .. } => "malformed_expression",
            Self::CyclicReference { .. } => "cyclic_reference",
            Self::InvalidDescriptor { .. } => "invalid_descriptor",
            Self::InvalidStore { .. } => "invalid_store",
            Self::Io { .. } => "io",
            Self::Renderer { .. } => "renderer",
        }
    }
}

impl std::error::Error for HarnessError {}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::MissingElement { element } => write!(f, "Parse error: missing {}", element),
            ErrorKind::MalformedConstruct { construct } => {
                write!(f, "Parse error: malformed {}", construct)
            }
            ErrorKind::InvalidLiteral {
                literal_type,
                value,
            } => write!(f, "Parse error: invalid {} '{}'", literal_type, value),
            ErrorKind::UnknownName { name, table } => {
                write!(f, "Unknown name '{}' (not found in {})", name, table)
            }
            ErrorKind::MalformedExpression { value } => {
                write!(f, "Malformed configuration expression: {}", value)
            }
            ErrorKind::CyclicReference { chain } => {
                write!(f, "Cyclic profile reference: {}", chain.join(" -> "))
            }
            ErrorKind::InvalidDescriptor { name, reason } => {
                write!(f, "Invalid data source '{}': {}", name, reason)
            }
            ErrorKind::InvalidStore { reason } => write!(f, "Invalid store: {}", reason),
            ErrorKind::Io { path, reason } => write!(f, "Cannot read '{}': {}", path, reason),
            ErrorKind::Renderer { reason } => write!(f, "Renderer failed: {}", reason),
        }
    }
}

impl Diagnostic for HarnessError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.primary_label()),
            self.source_info.primary_span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source_info.source)
    }
}

// ============================================================================
// CONTEXT-AWARE CONSTRUCTION
// ============================================================================

/// Context-aware error creation - each context knows its source and phase.
pub trait ErrorReporting {
    /// Create an error with context-appropriate enhancements
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> HarnessError;

    fn unknown_name(&self, name: &str, table: NameTable, span: SourceSpan) -> HarnessError {
        self.report(
            ErrorKind::UnknownName {
                name: name.into(),
                table,
            },
            span,
        )
    }

    fn malformed_expression(&self, value: &str, span: SourceSpan) -> HarnessError {
        self.report(
            ErrorKind::MalformedExpression {
                value: value.into(),
            },
            span,
        )
        .with_help("expected (profile <expr> ...), (ref <name>) or (dsn <name>)")
    }

    fn invalid_descriptor(&self, name: &str, reason: &str, span: SourceSpan) -> HarnessError {
        self.report(
            ErrorKind::InvalidDescriptor {
                name: name.into(),
                reason: reason.into(),
            },
            span,
        )
    }

    fn invalid_store(&self, reason: &str, span: SourceSpan) -> HarnessError {
        self.report(
            ErrorKind::InvalidStore {
                reason: reason.into(),
            },
            span,
        )
    }
}

/// General-purpose error context: a source plus the phase name used in the
/// error code (`dbsuite::<phase>::<kind>`).
#[derive(Debug, Clone)]
pub struct PhaseContext {
    pub source: SourceContext,
    pub phase: String,
}

impl PhaseContext {
    pub fn new(source: SourceContext, phase: impl Into<String>) -> Self {
        Self {
            source,
            phase: phase.into(),
        }
    }
}

impl ErrorReporting for PhaseContext {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> HarnessError {
        let error_code = format!("dbsuite::{}::{}", self.phase, kind.code_suffix());

        HarnessError {
            kind,
            source_info: SourceInfo {
                source: self.source.to_named_source(),
                primary_span: self.source.clamp(span),
                phase: self.phase.clone(),
            },
            diagnostic_info: DiagnosticInfo {
                help: None,
                error_code,
            },
        }
    }
}

/// Builds an `Io` error for a file that could not be read.
pub fn io_error(path: &Path, err: &std::io::Error) -> HarnessError {
    let ctx = PhaseContext::new(SourceContext::fallback("file system"), "io");
    ctx.report(
        ErrorKind::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        },
        unspanned(),
    )
}

/// Builds a `Renderer` error.
pub fn renderer_error(reason: impl Into<String>) -> HarnessError {
    let ctx = PhaseContext::new(SourceContext::fallback("renderer"), "render");
    ctx.report(
        ErrorKind::Renderer {
            reason: reason.into(),
        },
        unspanned(),
    )
}

/// Placeholder span for errors not tied to a source location.
pub fn unspanned() -> SourceSpan {
    SourceSpan::from(0..0)
}

/// Converts an AST Span to a miette SourceSpan.
pub fn to_source_span(span: Span) -> SourceSpan {
    SourceSpan::from(span.start..span.end)
}

// ============================================================================
// ERROR FORMATTING UTILITIES
// ============================================================================

/// Prints a HarnessError with full miette diagnostics on stderr.
pub fn print_error(error: HarnessError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}
