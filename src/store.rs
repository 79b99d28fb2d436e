//! Descriptor Store
//!
//! Read-only access to the two persisted tables the resolver consults:
//!
//! - the profile table (`preferences.sexp`), mapping names to raw configuration
//!   expressions, kept unparsed until resolution so a malformed entry only
//!   fails the labels that reach it;
//! - the data-source registry (`data-sources.sexp`), mapping names to
//!   [`ConnectionDescriptor`]s.
//!
//! ```text
//! (preferences
//!   (timestamp 1760000000)
//!   (profiles
//!     (all (profile (ref pg) (dsn lite)))
//!     (pg  (dsn pg-local))))
//!
//! (data-source pg-local
//!   (kind postgresql)
//!   (args (user "tester") (database "dbsuite") (port 5432))
//!   (extensions (db:test (ispg))))
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, warn};

use crate::descriptor::{
    ArgValue, BackendTag, ConnectArg, ConnectionDescriptor, DialectFlag, DialectFlags,
    ExtensionValue, TEST_FLAGS_EXTENSION,
};
use crate::errors::{io_error, to_source_span, ErrorReporting, HarnessError, PhaseContext, SourceContext};
use crate::syntax::{parser, AstNode, Expr};

// ============================================================================
// LOOKUP SEAMS
// ============================================================================

/// Name → raw configuration expression.
pub trait ExpressionTable {
    fn lookup_expression(&self, name: &str) -> Option<AstNode>;

    /// Source the stored expressions were parsed from, for diagnostics.
    fn source_context(&self) -> SourceContext {
        SourceContext::default()
    }
}

/// Name → connection descriptor.
pub trait DescriptorRegistry {
    fn lookup_descriptor(&self, name: &str) -> Option<ConnectionDescriptor>;
}

// ============================================================================
// PROFILE STORE
// ============================================================================

/// The timestamped preference record holding named profiles.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    timestamp: Option<DateTime<Utc>>,
    profiles: BTreeMap<String, AstNode>,
    source: SourceContext,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a preference record from disk.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let text = fs::read_to_string(path).map_err(|e| io_error(path, &e))?;
        let store = Self::from_source(&path.display().to_string(), &text)?;
        debug!(
            path = %path.display(),
            profiles = store.profiles.len(),
            timestamp = ?store.timestamp,
            "loaded profile store"
        );
        Ok(store)
    }

    /// Parses a preference record from text.
    pub fn from_source(name: &str, text: &str) -> Result<Self, HarnessError> {
        let source = SourceContext::from_file(name, text);
        let ctx = PhaseContext::new(source.clone(), "store");
        let nodes = parser::parse(text, source.clone())?;

        let mut store = Self {
            source,
            ..Self::default()
        };
        for node in &nodes {
            let Some("preferences") = node.value.head_symbol() else {
                return Err(ctx.invalid_store(
                    &format!("expected (preferences ...), found {}", node.value.pretty()),
                    to_source_span(node.span),
                ));
            };
            store.read_preferences(node, &ctx)?;
        }
        Ok(store)
    }

    fn read_preferences(&mut self, node: &AstNode, ctx: &PhaseContext) -> Result<(), HarnessError> {
        let items = node.value.as_list().unwrap_or_default();
        for entry in &items[1..] {
            match entry.value.head_symbol() {
                Some("timestamp") => self.timestamp = Some(read_timestamp(entry, ctx)?),
                Some("profiles") => {
                    let entries = entry.value.as_list().unwrap_or_default();
                    for profile in &entries[1..] {
                        self.read_profile(profile, ctx)?;
                    }
                }
                other => warn!(key = ?other, "ignoring unknown preference entry"),
            }
        }
        Ok(())
    }

    fn read_profile(&mut self, node: &AstNode, ctx: &PhaseContext) -> Result<(), HarnessError> {
        let span = to_source_span(node.span);
        let items = node
            .value
            .as_list()
            .filter(|items| items.len() == 2)
            .ok_or_else(|| ctx.invalid_store("profile entry must be (<name> <expression>)", span))?;
        let name = items[0]
            .value
            .as_name()
            .ok_or_else(|| ctx.invalid_store("profile name must be a symbol", span))?;
        if self.profiles.contains_key(name) {
            return Err(ctx.invalid_store(&format!("duplicate profile '{}'", name), span));
        }
        self.profiles.insert(name.to_string(), items[1].clone());
        Ok(())
    }

    /// Adds or replaces a profile. Used to build stores in memory.
    pub fn insert(&mut self, name: impl Into<String>, expression: AstNode) {
        self.profiles.insert(name.into(), expression);
    }

    /// When the record was last written, if it says.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl ExpressionTable for ProfileStore {
    fn lookup_expression(&self, name: &str) -> Option<AstNode> {
        self.profiles.get(name).cloned()
    }

    fn source_context(&self) -> SourceContext {
        self.source.clone()
    }
}

fn read_timestamp(node: &AstNode, ctx: &PhaseContext) -> Result<DateTime<Utc>, HarnessError> {
    let span = to_source_span(node.span);
    let secs = match node.value.as_list() {
        Some([_, value]) => match &*value.value {
            Expr::Number(n, _) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        },
        _ => None,
    };
    secs.and_then(|s| Utc.timestamp_opt(s, 0).single())
        .ok_or_else(|| ctx.invalid_store("timestamp must be (timestamp <unix-seconds>)", span))
}

// ============================================================================
// DATA-SOURCE REGISTRY
// ============================================================================

/// Pre-populated name → descriptor registry.
#[derive(Debug, Clone, Default)]
pub struct DataSourceRegistry {
    sources: BTreeMap<String, ConnectionDescriptor>,
}

impl DataSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `(data-source ...)` forms from disk.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let text = fs::read_to_string(path).map_err(|e| io_error(path, &e))?;
        let registry = Self::from_source(&path.display().to_string(), &text)?;
        debug!(path = %path.display(), sources = registry.sources.len(), "loaded data-source registry");
        Ok(registry)
    }

    pub fn from_source(name: &str, text: &str) -> Result<Self, HarnessError> {
        let source = SourceContext::from_file(name, text);
        let ctx = PhaseContext::new(source.clone(), "store");
        let mut registry = Self::default();

        for node in parser::parse(text, source)? {
            let span = to_source_span(node.span);
            let Some("data-source") = node.value.head_symbol() else {
                return Err(ctx.invalid_store(
                    &format!("expected (data-source ...), found {}", node.value.pretty()),
                    span,
                ));
            };
            let (name, descriptor) = read_data_source(&node, &ctx)?;
            if registry.sources.contains_key(&name) {
                return Err(ctx.invalid_store(&format!("duplicate data source '{}'", name), span));
            }
            registry.sources.insert(name, descriptor);
        }
        Ok(registry)
    }

    /// Adds or replaces a data source. Used to build registries in memory.
    pub fn insert(&mut self, name: impl Into<String>, descriptor: ConnectionDescriptor) {
        self.sources.insert(name.into(), descriptor);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl DescriptorRegistry for DataSourceRegistry {
    fn lookup_descriptor(&self, name: &str) -> Option<ConnectionDescriptor> {
        self.sources.get(name).cloned()
    }
}

fn read_data_source(
    node: &AstNode,
    ctx: &PhaseContext,
) -> Result<(String, ConnectionDescriptor), HarnessError> {
    let span = to_source_span(node.span);
    let items = node.value.as_list().unwrap_or_default();
    let name = items
        .get(1)
        .and_then(|n| n.value.as_name())
        .ok_or_else(|| ctx.invalid_store("data source needs a name: (data-source <name> ...)", span))?
        .to_string();

    let mut kind = None;
    let mut arguments = Vec::new();
    let mut extensions = BTreeMap::new();

    for field in &items[2..] {
        let field_span = to_source_span(field.span);
        let parts = field.value.as_list().unwrap_or_default();
        match field.value.head_symbol() {
            Some("kind") => {
                let tag = parts
                    .get(1)
                    .and_then(|t| t.value.as_name())
                    .ok_or_else(|| ctx.invalid_descriptor(&name, "kind must be a symbol", field_span))?;
                kind = Some(BackendTag::new(tag));
            }
            Some("args") => {
                for arg in &parts[1..] {
                    arguments.push(read_arg(arg, &name, ctx)?);
                }
            }
            Some("extensions") => {
                for ext in &parts[1..] {
                    let (key, value) = read_extension(ext, &name, ctx)?;
                    extensions.insert(key, value);
                }
            }
            _ => {
                return Err(ctx.invalid_descriptor(
                    &name,
                    &format!("unknown field {}", field.value.pretty()),
                    field_span,
                ))
            }
        }
    }

    let kind = kind.ok_or_else(|| ctx.invalid_descriptor(&name, "missing (kind <tag>)", span))?;
    Ok((name, ConnectionDescriptor::new(kind, arguments, extensions)))
}

fn read_arg(node: &AstNode, source_name: &str, ctx: &PhaseContext) -> Result<ConnectArg, HarnessError> {
    let span = to_source_span(node.span);
    if let Some(items) = node.value.as_list() {
        let [key, value] = items else {
            return Err(ctx.invalid_descriptor(source_name, "keyword argument must be (<key> <value>)", span));
        };
        let key = key
            .value
            .as_symbol()
            .ok_or_else(|| ctx.invalid_descriptor(source_name, "argument key must be a symbol", span))?;
        let value = arg_value(value)
            .ok_or_else(|| ctx.invalid_descriptor(source_name, "argument value must be an atom", span))?;
        return Ok(ConnectArg::keyword(key, value));
    }
    let value = arg_value(node)
        .ok_or_else(|| ctx.invalid_descriptor(source_name, "argument must be an atom", span))?;
    Ok(ConnectArg::Positional(value))
}

fn arg_value(node: &AstNode) -> Option<ArgValue> {
    match &*node.value {
        Expr::String(s, _) | Expr::Symbol(s, _) => Some(ArgValue::Text(s.clone())),
        Expr::Number(n, _) => Some(ArgValue::Number(*n)),
        Expr::Bool(b, _) => Some(ArgValue::Bool(*b)),
        Expr::List(..) => None,
    }
}

fn read_extension(
    node: &AstNode,
    source_name: &str,
    ctx: &PhaseContext,
) -> Result<(String, ExtensionValue), HarnessError> {
    let span = to_source_span(node.span);
    let Some([key, value]) = node.value.as_list() else {
        return Err(ctx.invalid_descriptor(source_name, "extension must be (<key> <value>)", span));
    };
    let key = key
        .value
        .as_name()
        .ok_or_else(|| ctx.invalid_descriptor(source_name, "extension key must be a symbol", span))?;

    let names: Option<Vec<&str>> = match value.value.as_list() {
        Some(items) => items.iter().map(|i| i.value.as_name()).collect(),
        None => None,
    };

    let value = if key == TEST_FLAGS_EXTENSION {
        let names = names.ok_or_else(|| {
            ctx.invalid_descriptor(source_name, "db:test must be a list of dialect flags", span)
        })?;
        let flags = names
            .into_iter()
            .map(str::parse::<DialectFlag>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| ctx.invalid_descriptor(source_name, &reason, span))?;
        ExtensionValue::Flags(DialectFlags::new(flags))
    } else if let Some(names) = names {
        ExtensionValue::List(names.into_iter().map(String::from).collect())
    } else {
        ExtensionValue::Text(match &*value.value {
            Expr::String(s, _) => s.clone(),
            other => other.pretty(),
        })
    };
    Ok((key.to_string(), value))
}
