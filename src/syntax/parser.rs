//! Store Parser
//!
//! Converts store source text into spanned AST nodes. This parser is purely
//! syntactic: it does not know what a profile or a data source is.

use pest::{error::Error, iterators::Pair, Parser};
use pest_derive::Parser;

use crate::errors::{to_source_span, ErrorKind, ErrorReporting, HarnessError, PhaseContext, SourceContext};
use crate::syntax::{spanned, AstNode, Expr, Span};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct StoreParser;

/// Deepest list nesting a store file may use. Deeper input is rejected
/// before parsing so it cannot exhaust the stack.
pub const MAX_NESTING_DEPTH: usize = 256;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse store source text into top-level AST nodes.
pub fn parse(source_text: &str, source: SourceContext) -> Result<Vec<AstNode>, HarnessError> {
    let ctx = PhaseContext::new(source, "parse");
    if source_text.trim().is_empty() {
        return Ok(vec![]);
    }

    check_nesting(source_text, &ctx)?;

    let mut pairs = StoreParser::parse(Rule::program, source_text)
        .map_err(|e| convert_parse_error(e, &ctx))?;

    let Some(program) = pairs.next() else {
        return Ok(vec![]);
    };

    program
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(|p| build_ast_node(p, &ctx))
        .collect()
}

/// Parses a single expression, e.g. a profile given on the command line.
pub fn parse_one(source_text: &str, source: SourceContext) -> Result<AstNode, HarnessError> {
    let ctx = PhaseContext::new(source.clone(), "parse");
    let mut nodes = parse(source_text, source)?;
    match nodes.len() {
        1 => Ok(nodes.remove(0)),
        0 => Err(ctx.report(
            ErrorKind::MissingElement {
                element: "expression".into(),
            },
            to_source_span(Span {
                start: 0,
                end: source_text.len(),
            }),
        )),
        _ => Err(ctx.report(
            ErrorKind::MalformedConstruct {
                construct: "input: expected exactly one expression".into(),
            },
            to_source_span(nodes[1].span),
        )),
    }
}

// ============================================================================
// AST BUILDERS
// ============================================================================

fn build_ast_node(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<AstNode, HarnessError> {
    let span = get_span(&pair);

    match pair.as_rule() {
        Rule::number => {
            let text = pair.as_str();
            let value = text.parse::<f64>().map_err(|_| {
                ctx.report(
                    ErrorKind::InvalidLiteral {
                        literal_type: "number".into(),
                        value: text.into(),
                    },
                    to_source_span(span),
                )
            })?;
            Ok(spanned(Expr::Number(value, span), span))
        }

        Rule::boolean => {
            let value = matches!(pair.as_str(), "#t" | "true");
            Ok(spanned(Expr::Bool(value, span), span))
        }

        Rule::string => {
            let content = unescape_string(pair.as_str());
            Ok(spanned(Expr::String(content, span), span))
        }

        Rule::symbol => Ok(spanned(Expr::Symbol(pair.as_str().to_string(), span), span)),

        Rule::list => {
            let children = pair
                .into_inner()
                .map(|p| build_ast_node(p, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(spanned(Expr::List(children, span), span))
        }

        rule => Err(ctx.report(
            ErrorKind::MalformedConstruct {
                construct: format!("unsupported rule: {:?}", rule),
            },
            to_source_span(span),
        )),
    }
}

// ============================================================================
// UTILITIES
// ============================================================================

fn get_span(pair: &Pair<Rule>) -> Span {
    Span {
        start: pair.as_span().start(),
        end: pair.as_span().end(),
    }
}

/// Scans list depth, skipping strings and comments.
fn check_nesting(text: &str, ctx: &PhaseContext) -> Result<(), HarnessError> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut in_comment = false;
    let mut escaped = false;

    for (at, ch) in text.char_indices() {
        if in_comment {
            in_comment = ch != '\n';
            continue;
        }
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            ';' => in_comment = true,
            '"' => in_string = true,
            '(' => {
                depth += 1;
                if depth > MAX_NESTING_DEPTH {
                    return Err(ctx
                        .report(
                            ErrorKind::MalformedConstruct {
                                construct: format!("list: nested deeper than {} levels", MAX_NESTING_DEPTH),
                            },
                            to_source_span(Span { start: at, end: at + 1 }),
                        )
                        .with_help("flatten the expression or split it into named profiles joined with (ref ...)"));
                }
            }
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn unescape_string(text: &str) -> String {
    // Remove surrounding quotes
    let inner = &text[1..text.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    result
}

fn convert_parse_error(error: Error<Rule>, ctx: &PhaseContext) -> HarnessError {
    let span = match error.location {
        pest::error::InputLocation::Pos(pos) => Span {
            start: pos,
            end: pos,
        },
        pest::error::InputLocation::Span((start, end)) => Span { start, end },
    };

    let rendered = error.to_string();
    let message = if rendered.contains("expected list") || rendered.contains("\")\"") {
        "list: missing closing parenthesis"
    } else if rendered.contains("string") {
        "string: missing closing quote"
    } else {
        "syntax"
    };

    ctx.report(
        ErrorKind::MalformedConstruct {
            construct: message.to_string(),
        },
        to_source_span(span),
    )
}
