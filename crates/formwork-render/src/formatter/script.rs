//! A small line-oriented script language whose printed output is the
//! rendered text.
//!
//! ```text
//! # comments and blank lines are skipped
//! greeting = 'Hello'
//! print(f'{greeting} {model.name}!')
//! print(model.items | join(', '), end='')
//! ```
//!
//! Statements are `name = <expression>` and `print(<arg>, ...)` with the
//! optional keywords `sep=` and `end=`. An argument is an f-string literal
//! (`f'...'`, `f"..."` or triple quoted) or an expression in the
//! delimited-block engine's expression language. Scripts cannot touch
//! files, processes or the network.

use std::collections::BTreeMap;
use std::path::Path;

use minijinja::Value;

use super::interpolation::{evaluate, interpolate};
use super::{expression_env, not_initialized, read_template, FormatKind, TemplateFormatter};
use crate::context::Commons;
use crate::encoding::Encoding;
use crate::error::{FormworkError, Result};
use crate::functions::FunctionRegistry;
use crate::syntax::TemplateSyntax;
use crate::value::ValueNode;

/// Runs a script and returns everything it printed.
#[derive(Debug, Default)]
pub struct ScriptFormatter {
    statements: Option<Vec<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
enum Statement {
    Assign {
        line: usize,
        name: String,
        expression: String,
    },
    Print {
        line: usize,
        args: Vec<Arg>,
        sep: Option<Arg>,
        end: Option<Arg>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Arg {
    FString(String),
    Expression(String),
}

impl ScriptFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplateFormatter for ScriptFormatter {
    fn init_string(&mut self, source: &str, _syntax: &TemplateSyntax) -> Result<()> {
        self.statements = None;
        self.statements = Some(parse(source)?);
        Ok(())
    }

    fn init_file(
        &mut self,
        path: &Path,
        encoding: Encoding,
        syntax: &TemplateSyntax,
    ) -> Result<()> {
        let source = read_template(path, encoding)?;
        self.init_string(&source, syntax)
    }

    fn render(
        &self,
        values: &ValueNode,
        commons: &Commons,
        functions: &FunctionRegistry,
    ) -> Result<String> {
        let statements = self
            .statements
            .as_ref()
            .ok_or_else(|| not_initialized(self.kind()))?;
        let env = expression_env(values, commons, functions);
        let mut locals: BTreeMap<String, Value> = BTreeMap::new();
        let mut out = String::new();

        for statement in statements {
            match statement {
                Statement::Assign {
                    line,
                    name,
                    expression,
                } => {
                    let value = evaluate(&env, expression, &locals).map_err(|e| at_line(*line, e))?;
                    locals.insert(name.clone(), value);
                }
                Statement::Print {
                    line,
                    args,
                    sep,
                    end,
                } => {
                    let text = |arg: &Arg| -> Result<String> {
                        match arg {
                            Arg::FString(body) => interpolate(&env, body, &locals),
                            Arg::Expression(expr) => {
                                let value = evaluate(&env, expr, &locals)?;
                                Ok(if value.is_none() {
                                    "None".to_string()
                                } else {
                                    value.to_string()
                                })
                            }
                        }
                    };
                    let sep = sep.as_ref().map(&text).transpose().map_err(|e| at_line(*line, e))?;
                    let end = end.as_ref().map(&text).transpose().map_err(|e| at_line(*line, e))?;
                    let parts = args
                        .iter()
                        .map(&text)
                        .collect::<Result<Vec<_>>>()
                        .map_err(|e| at_line(*line, e))?;
                    out.push_str(&parts.join(sep.as_deref().unwrap_or(" ")));
                    out.push_str(end.as_deref().unwrap_or("\n"));
                }
            }
        }
        Ok(out)
    }

    fn reset(&mut self) {
        self.statements = None;
    }

    fn kind(&self) -> FormatKind {
        FormatKind::Script
    }
}

fn at_line(line: usize, err: FormworkError) -> FormworkError {
    match err {
        FormworkError::Render(message) => FormworkError::Render(format!("line {line}: {message}")),
        other => other,
    }
}

fn syntax_error(line: usize, message: impl std::fmt::Display) -> FormworkError {
    FormworkError::render(format!("line {line}: {message}"))
}

fn parse(source: &str) -> Result<Vec<Statement>> {
    logical_lines(source)?
        .into_iter()
        .map(|(line, text)| parse_statement(line, &text))
        .collect()
}

/// Splits the source into statements: newlines inside quotes or brackets do
/// not end a statement, and `#` outside quotes starts a comment.
fn logical_lines(source: &str) -> Result<Vec<(usize, String)>> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut start_line = 1;
    let mut line = 1;
    let mut depth = 0usize;
    let mut quote: Option<&str> = None;
    let mut in_comment = false;
    let mut rest = source;

    while let Some(ch) = rest.chars().next() {
        if ch == '\n' {
            line += 1;
            in_comment = false;
            if quote.is_none() && depth == 0 {
                push_line(&mut lines, &mut current, start_line);
                start_line = line;
                rest = &rest[1..];
                continue;
            }
        }
        if in_comment {
            rest = &rest[ch.len_utf8()..];
            continue;
        }

        match quote {
            Some(q) => {
                if ch == '\\' {
                    let escaped: String = rest.chars().take(2).collect();
                    current.push_str(&escaped);
                    rest = &rest[escaped.len()..];
                    continue;
                }
                if rest.starts_with(q) {
                    current.push_str(q);
                    rest = &rest[q.len()..];
                    quote = None;
                    continue;
                }
            }
            None => match ch {
                '#' => {
                    in_comment = true;
                    rest = &rest[1..];
                    continue;
                }
                '\'' | '"' => {
                    let q = ["'''", "\"\"\"", "'", "\""]
                        .into_iter()
                        .find(|q| rest.starts_with(q))
                        .unwrap_or("'");
                    current.push_str(q);
                    rest = &rest[q.len()..];
                    quote = Some(q);
                    continue;
                }
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| syntax_error(line, format!("unmatched `{ch}`")))?;
                }
                _ => {}
            },
        }
        current.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    if quote.is_some() {
        return Err(syntax_error(start_line, "unterminated string literal"));
    }
    if depth > 0 {
        return Err(syntax_error(start_line, "unclosed bracket"));
    }
    push_line(&mut lines, &mut current, start_line);
    Ok(lines)
}

fn push_line(lines: &mut Vec<(usize, String)>, current: &mut String, line: usize) {
    let text = std::mem::take(current);
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        lines.push((line, trimmed.to_string()));
    }
}

fn parse_statement(line: usize, text: &str) -> Result<Statement> {
    if let Some(inner) = text
        .strip_prefix("print")
        .map(str::trim_start)
        .and_then(|t| t.strip_prefix('('))
        .and_then(|t| t.strip_suffix(')'))
    {
        return parse_print(line, inner);
    }
    if let Some((name, expression)) = split_assignment(text) {
        return Ok(Statement::Assign {
            line,
            name: name.to_string(),
            expression: expression.to_string(),
        });
    }
    Err(syntax_error(
        line,
        format!("unsupported statement `{text}` (expected `name = expression` or `print(...)`)"),
    ))
}

fn split_assignment(text: &str) -> Option<(&str, &str)> {
    let eq = text.find('=')?;
    let (name, rest) = (text[..eq].trim(), &text[eq + 1..]);
    if rest.starts_with('=') || !is_identifier(name) || rest.trim().is_empty() {
        return None;
    }
    Some((name, rest.trim()))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_print(line: usize, inner: &str) -> Result<Statement> {
    let mut args = Vec::new();
    let mut sep = None;
    let mut end = None;
    for raw in split_arguments(inner) {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(syntax_error(line, "empty argument in print(...)"));
        }
        match split_assignment(raw) {
            Some(("sep", value)) => sep = Some(parse_arg(line, value)?),
            Some(("end", value)) => end = Some(parse_arg(line, value)?),
            Some((keyword, _)) => {
                return Err(syntax_error(line, format!("unknown print() keyword `{keyword}`")))
            }
            None if sep.is_some() || end.is_some() => {
                return Err(syntax_error(line, "positional argument after keyword argument"))
            }
            None => args.push(parse_arg(line, raw)?),
        }
    }
    Ok(Statement::Print { line, args, sep, end })
}

fn parse_arg(line: usize, text: &str) -> Result<Arg> {
    let Some(literal) = text.strip_prefix(['f', 'F']) else {
        return Ok(Arg::Expression(text.to_string()));
    };
    let Some(q) = ["'''", "\"\"\"", "'", "\""]
        .into_iter()
        .find(|q| literal.starts_with(q))
    else {
        return Ok(Arg::Expression(text.to_string()));
    };
    literal
        .strip_prefix(q)
        .and_then(|l| l.strip_suffix(q))
        .filter(|_| literal.len() >= 2 * q.len())
        .map(|body| Arg::FString(body.to_string()))
        .ok_or_else(|| syntax_error(line, format!("malformed f-string `{text}`")))
}

/// Splits at top-level commas, skipping quoted text and brackets.
fn split_arguments(inner: &str) -> Vec<&str> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    let bytes = inner.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth = depth.saturating_sub(1),
                b',' if depth == 0 => {
                    parts.push(&inner[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
        i += 1;
    }
    parts.push(&inner[start..]);
    parts
}
