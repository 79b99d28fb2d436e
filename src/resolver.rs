//! Config Resolver
//!
//! Flattens a configuration expression into the ordered list of concrete
//! data sources it denotes. The language has three forms:
//!
//! - `(profile <expr> ...)` concatenates its children left to right, keeping
//!   duplicates;
//! - `(ref <name>)` resolves the expression stored under `name` in the
//!   profile table;
//! - `(dsn <name>)` is the single data source `name` from the registry.
//!
//! Resolution is depth-first and left to right. The chain of `ref` names being
//! expanded is tracked, and re-entering a name on that chain fails with
//! `CyclicReference` instead of recursing forever.

use std::fmt;

use miette::SourceSpan;
use serde::Serialize;
use tracing::trace;

use crate::descriptor::ConnectionDescriptor;
use crate::errors::{
    to_source_span, unspanned, ErrorKind, ErrorReporting, HarnessError, NameTable, PhaseContext,
    SourceContext,
};
use crate::store::{DescriptorRegistry, ExpressionTable};
use crate::syntax::{list, symbol, AstNode};

// ============================================================================
// TYPES
// ============================================================================

/// A resolved, labeled data source. Names need not be unique in a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedConfig {
    pub name: String,
    pub descriptor: ConnectionDescriptor,
}

impl NamedConfig {
    pub fn new(name: impl Into<String>, descriptor: ConnectionDescriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
        }
    }
}

/// Typed configuration expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigExpr {
    Profile(Vec<ConfigExpr>),
    Ref(String),
    Dsn(String),
}

impl ConfigExpr {
    pub fn profile(children: impl IntoIterator<Item = ConfigExpr>) -> Self {
        ConfigExpr::Profile(children.into_iter().collect())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        ConfigExpr::Ref(name.into())
    }

    pub fn dsn(name: impl Into<String>) -> Self {
        ConfigExpr::Dsn(name.into())
    }

    /// Reads a stored expression. Shapes other than the three forms are
    /// `MalformedExpression` errors naming the offending value.
    pub fn from_ast(node: &AstNode, ctx: &impl ErrorReporting) -> Result<Self, HarnessError> {
        match read_form(node, ctx)? {
            Form::Profile(children) => children
                .iter()
                .map(|child| Self::from_ast(child, ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(ConfigExpr::Profile),
            Form::Ref(name) => Ok(ConfigExpr::Ref(name.to_string())),
            Form::Dsn(name) => Ok(ConfigExpr::Dsn(name.to_string())),
        }
    }

    /// Writes the expression back as an AST node, e.g. for in-memory stores.
    pub fn to_ast(&self) -> AstNode {
        match self {
            ConfigExpr::Profile(children) => {
                let mut items = vec![symbol("profile")];
                items.extend(children.iter().map(ConfigExpr::to_ast));
                list(items)
            }
            ConfigExpr::Ref(name) => list(vec![symbol("ref"), symbol(name)]),
            ConfigExpr::Dsn(name) => list(vec![symbol("dsn"), symbol(name)]),
        }
    }
}

impl fmt::Display for ConfigExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ast().value.pretty())
    }
}

/// One stored form, borrowed from its AST node.
enum Form<'n> {
    Profile(&'n [AstNode]),
    Ref(&'n str),
    Dsn(&'n str),
}

fn read_form<'n>(node: &'n AstNode, ctx: &impl ErrorReporting) -> Result<Form<'n>, HarnessError> {
    let malformed = || ctx.malformed_expression(&node.value.pretty(), to_source_span(node.span));
    let items = node.value.as_list().ok_or_else(malformed)?;
    match node.value.head_symbol() {
        Some("profile") => Ok(Form::Profile(&items[1..])),
        Some(form @ ("ref" | "dsn")) => {
            let [_, name] = items else {
                return Err(malformed());
            };
            let name = name.value.as_name().ok_or_else(malformed)?;
            Ok(if form == "ref" { Form::Ref(name) } else { Form::Dsn(name) })
        }
        _ => Err(malformed()),
    }
}

/// Top-level resolver input: an expression, or configurations the caller
/// already holds, which bypass store lookups.
#[derive(Debug, Clone)]
pub enum ResolveInput {
    Expr(ConfigExpr),
    Resolved(Vec<NamedConfig>),
}

impl From<ConfigExpr> for ResolveInput {
    fn from(expr: ConfigExpr) -> Self {
        ResolveInput::Expr(expr)
    }
}

impl From<Vec<NamedConfig>> for ResolveInput {
    fn from(configs: Vec<NamedConfig>) -> Self {
        ResolveInput::Resolved(configs)
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Recursive-descent resolver over a profile table and a data-source registry.
pub struct Resolver<'a> {
    profiles: &'a dyn ExpressionTable,
    registry: &'a dyn DescriptorRegistry,
    ctx: PhaseContext,
}

impl<'a> Resolver<'a> {
    pub fn new(profiles: &'a dyn ExpressionTable, registry: &'a dyn DescriptorRegistry) -> Self {
        Self {
            profiles,
            registry,
            ctx: PhaseContext::new(profiles.source_context(), "resolve"),
        }
    }

    /// Resolves an input into an ordered list of named configurations.
    pub fn resolve(&self, input: impl Into<ResolveInput>) -> Result<Vec<NamedConfig>, HarnessError> {
        match input.into() {
            ResolveInput::Resolved(configs) => Ok(configs),
            ResolveInput::Expr(expr) => {
                let mut out = Vec::new();
                self.resolve_into(&expr, &mut Vec::new(), &mut out)?;
                Ok(out)
            }
        }
    }

    /// Resolves a command-line label: a stored profile if one has that name,
    /// otherwise a data source of that name.
    pub fn resolve_label(&self, label: &str) -> Result<Vec<NamedConfig>, HarnessError> {
        if self.profiles.lookup_expression(label).is_some() {
            return self.resolve(ConfigExpr::reference(label));
        }
        if self.registry.lookup_descriptor(label).is_some() {
            return self.resolve(ConfigExpr::dsn(label));
        }
        let ctx = PhaseContext::new(SourceContext::fallback(&format!("label {}", label)), "resolve");
        Err(ctx
            .unknown_name(label, NameTable::Labels, unspanned())
            .with_help("define it under (profiles ...) in the preferences file or as a (data-source ...)"))
    }

    fn resolve_into(
        &self,
        expr: &ConfigExpr,
        chain: &mut Vec<String>,
        out: &mut Vec<NamedConfig>,
    ) -> Result<(), HarnessError> {
        match expr {
            ConfigExpr::Profile(children) => {
                for child in children {
                    self.resolve_into(child, chain, out)?;
                }
                Ok(())
            }
            ConfigExpr::Ref(name) => self.expand_ref(name, unspanned(), chain, out),
            ConfigExpr::Dsn(name) => self.push_dsn(name, unspanned(), out),
        }
    }

    /// Same walk over a stored node; errors point at the offending form.
    fn resolve_stored(
        &self,
        node: &AstNode,
        chain: &mut Vec<String>,
        out: &mut Vec<NamedConfig>,
    ) -> Result<(), HarnessError> {
        let span = to_source_span(node.span);
        match read_form(node, &self.ctx)? {
            Form::Profile(children) => {
                for child in children {
                    self.resolve_stored(child, chain, out)?;
                }
                Ok(())
            }
            Form::Ref(name) => self.expand_ref(name, span, chain, out),
            Form::Dsn(name) => self.push_dsn(name, span, out),
        }
    }

    fn expand_ref(
        &self,
        name: &str,
        span: SourceSpan,
        chain: &mut Vec<String>,
        out: &mut Vec<NamedConfig>,
    ) -> Result<(), HarnessError> {
        if chain.iter().any(|seen| seen == name) {
            let mut cycle = chain.clone();
            cycle.push(name.to_string());
            return Err(self
                .ctx
                .report(ErrorKind::CyclicReference { chain: cycle }, span)
                .with_help("a profile may not refer back to itself"));
        }
        let node = self
            .profiles
            .lookup_expression(name)
            .ok_or_else(|| self.ctx.unknown_name(name, NameTable::Profiles, span))?;
        trace!(profile = %name, expr = %node.value, "expanding profile reference");

        chain.push(name.to_string());
        let result = self.resolve_stored(&node, chain, out);
        chain.pop();
        result
    }

    fn push_dsn(&self, name: &str, span: SourceSpan, out: &mut Vec<NamedConfig>) -> Result<(), HarnessError> {
        let descriptor = self
            .registry
            .lookup_descriptor(name)
            .ok_or_else(|| self.ctx.unknown_name(name, NameTable::DataSources, span))?;
        out.push(NamedConfig::new(name, descriptor));
        Ok(())
    }
}

/// Reads an expression given as text, e.g. an inline profile argument.
pub fn parse_expression(text: &str) -> Result<ConfigExpr, HarnessError> {
    let source = SourceContext::from_file("<expression>", text);
    let node = crate::syntax::parser::parse_one(text, source.clone())?;
    ConfigExpr::from_ast(&node, &PhaseContext::new(source, "resolve"))
}
