//! Syntax module for the dbsuite store files
//!
//! This module provides the spanned s-expression tree that both persisted
//! stores are written in. It is purely syntactic: profile and data-source
//! meaning is assigned later by `store` and `resolver`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod parser;

/// Represents a span in the source text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Wrapper for carrying source span information with any value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

/// Canonical AST node type with shared ownership, so store entries can be
/// handed out without copying whole trees.
pub type AstNode = Spanned<Arc<Expr>>;

/// The core AST node for store expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    List(Vec<AstNode>, Span),
    Symbol(String, Span),
    String(String, Span),
    Number(f64, Span),
    Bool(bool, Span),
}

impl Expr {
    /// Borrows the items of a list expression.
    pub fn as_list(&self) -> Option<&[AstNode]> {
        if let Expr::List(items, _) = self {
            return Some(items);
        }
        None
    }

    /// Borrows the name of a symbol expression.
    pub fn as_symbol(&self) -> Option<&str> {
        if let Expr::Symbol(name, _) = self {
            return Some(name);
        }
        None
    }

    /// Symbol or string text; store files accept either for names.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Expr::Symbol(s, _) | Expr::String(s, _) => Some(s),
            _ => None,
        }
    }

    /// Returns the head symbol of a list form such as `(profile ...)`.
    pub fn head_symbol(&self) -> Option<&str> {
        self.as_list()?.first()?.value.as_symbol()
    }

    /// Pretty-prints the expression as s-expression text.
    pub fn pretty(&self) -> String {
        use Expr::*;
        match self {
            List(exprs, _) => Self::pretty_list(exprs),
            Symbol(s, _) => s.clone(),
            String(s, _) => format!("{:?}", s),
            Number(n, _) => n.to_string(),
            Bool(b, _) => (if *b { "#t" } else { "#f" }).to_string(),
        }
    }

    fn pretty_list(exprs: &[AstNode]) -> String {
        let inner = exprs
            .iter()
            .map(|e| e.value.pretty())
            .collect::<Vec<_>>()
            .join(" ");
        format!("({})", inner)
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty())
    }
}

/// Wraps an expression in a node with the given span.
pub fn spanned(expr: Expr, span: Span) -> AstNode {
    Spanned {
        value: Arc::new(expr),
        span,
    }
}

/// Builds an unspanned symbol node. Used for in-memory stores.
pub fn symbol(name: &str) -> AstNode {
    spanned(Expr::Symbol(name.to_string(), Span::default()), Span::default())
}

/// Builds an unspanned list node. Used for in-memory stores.
pub fn list(items: Vec<AstNode>) -> AstNode {
    spanned(Expr::List(items, Span::default()), Span::default())
}
