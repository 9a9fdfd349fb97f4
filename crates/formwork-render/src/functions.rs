//! Named callables available to templates.
//!
//! The registry always starts with a set of general-purpose helpers
//! (see [`FunctionRegistry::with_builtins`]). Callers may add native Rust
//! closures with [`FunctionRegistry::register`] or closure-style sources
//! such as `|name| name | upper` with [`FunctionRegistry::define`].

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};
use minijinja::value::{FunctionArgs, FunctionResult, Rest};
use minijinja::{Environment, Error, ErrorKind, State, UndefinedBehavior, Value};

use crate::error::{FormworkError, Result};
use crate::format_spec;

/// A name → callable mapping shared by every formatter variant.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Value>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in helpers:
    ///
    /// - `len(x)`, `enumerate(seq, start=0)`, `map(f, seq)`, `filter(f, seq)`
    /// - `math` namespace: `pi`, `e`, `sqrt`, `pow`, `floor`, `ceil`, `abs`,
    ///   `min`, `max`, `round`
    /// - `now(fmt?)`, `utcnow(fmt?)`, `strftime(timestamp, fmt)`
    /// - `format(value, spec)` using the format-spec mini-language
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("len", len);
        registry.register("enumerate", enumerate);
        registry.register("map", map);
        registry.register("filter", filter);
        registry.insert("math", math_namespace());
        registry.register("now", |fmt: Option<String>| format_time(Local::now(), fmt));
        registry.register("utcnow", |fmt: Option<String>| format_time(Utc::now(), fmt));
        registry.register("strftime", strftime);
        registry.register("format", format);
        registry
    }

    /// Registers a native function.
    pub fn register<F, Rv, Args>(&mut self, name: impl Into<String>, f: F)
    where
        F: minijinja::functions::Function<Rv, Args>
            + for<'a> minijinja::functions::Function<Rv, <Args as FunctionArgs<'a>>::Output>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.functions.insert(name.into(), Value::from_function::<F, Rv, Args>(f));
    }

    /// Registers an arbitrary value (usually a callable or a namespace of
    /// callables).
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.functions.insert(name.into(), value);
    }

    /// Turns a closure-style source into a callable registered as `name`.
    ///
    /// The source is `|a, b| <expression>`; the expression uses the
    /// delimited-block engine's expression language. It runs in an
    /// environment of its own that holds the parameters (bound by position)
    /// and the builtin helpers, never the render globals or other user
    /// functions, so it behaves the same under every formatter and cannot
    /// call itself. The body is checked for syntax errors here, once.
    pub fn define(&mut self, name: &str, source: &str) -> Result<()> {
        let definition = |message: String| FormworkError::FunctionDefinition {
            name: name.to_string(),
            message,
        };

        let source = source.trim();
        let rest = source
            .strip_prefix('|')
            .ok_or_else(|| definition("expected `|params| expression`".into()))?;
        let (params, body) = rest
            .split_once('|')
            .ok_or_else(|| definition("unterminated parameter list".into()))?;
        let params: Vec<String> = params
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        if let Some(bad) = params.iter().find(|p| !is_identifier(p)) {
            return Err(definition(format!("`{bad}` is not a valid parameter name")));
        }
        let body = body.trim().to_string();
        if body.is_empty() {
            return Err(definition("empty function body".into()));
        }
        let env = definition_env();
        env.compile_expression(&body).map_err(|e| definition(e.to_string()))?;

        let fn_name = name.to_string();
        let callable = Value::from_function(move |args: Rest<Value>| {
            if args.len() != params.len() {
                return Err(invalid(format!(
                    "{fn_name}() takes {} argument(s) but {} were given",
                    params.len(),
                    args.len()
                )));
            }
            let scope: BTreeMap<&str, Value> = params
                .iter()
                .map(String::as_str)
                .zip(args.iter().cloned())
                .collect();
            // `Expression` borrows its environment, so the body is compiled
            // again on each call.
            let value = env.compile_expression_owned(body.clone())?.eval(scope)?;
            if value.is_undefined() {
                return Err(Error::new(
                    ErrorKind::UndefinedError,
                    format!("{fn_name}() evaluated to an undefined value"),
                ));
            }
            Ok(value)
        });
        self.functions.insert(name.to_string(), callable);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.functions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// The whole registry as one map value, exposed to templates as
    /// `functions`.
    pub fn namespace(&self) -> Value {
        Value::from_iter(self.functions.iter().map(|(k, v)| (k.clone(), v.clone())))
    }
}

/// Strict environment that user function bodies run in: minijinja's own
/// filters and tests plus the builtin helpers.
fn definition_env() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    for (name, value) in FunctionRegistry::with_builtins().iter() {
        env.add_global(name.to_string(), value.clone());
    }
    env
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn invalid(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidOperation, message.into())
}

fn len(value: Value) -> std::result::Result<usize, Error> {
    value
        .len()
        .ok_or_else(|| invalid(format!("object of type {} has no len()", value.kind())))
}

fn enumerate(seq: Value, start: Option<i64>) -> std::result::Result<Value, Error> {
    let start = start.unwrap_or(0);
    let pairs: Vec<Value> = seq
        .try_iter()?
        .zip(start..)
        .map(|(item, index)| Value::from(vec![Value::from(index), item]))
        .collect();
    Ok(Value::from(pairs))
}

fn map(state: &State, f: Value, seq: Value) -> std::result::Result<Value, Error> {
    let mapped = seq
        .try_iter()?
        .map(|item| f.call(state, &[item]))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Value::from(mapped))
}

fn filter(state: &State, f: Value, seq: Value) -> std::result::Result<Value, Error> {
    let mut kept = Vec::new();
    for item in seq.try_iter()? {
        if f.call(state, &[item.clone()])?.is_true() {
            kept.push(item);
        }
    }
    Ok(Value::from(kept))
}

fn math_namespace() -> Value {
    fn fold(values: &[f64], pick: fn(f64, f64) -> f64) -> std::result::Result<f64, Error> {
        let (first, rest) = values
            .split_first()
            .ok_or_else(|| invalid("expected at least one argument"))?;
        Ok(rest.iter().copied().fold(*first, pick))
    }

    Value::from_iter([
        ("pi", Value::from(std::f64::consts::PI)),
        ("e", Value::from(std::f64::consts::E)),
        ("sqrt", Value::from_function(|x: f64| x.sqrt())),
        ("pow", Value::from_function(|x: f64, y: f64| x.powf(y))),
        ("floor", Value::from_function(|x: f64| x.floor() as i64)),
        ("ceil", Value::from_function(|x: f64| x.ceil() as i64)),
        ("abs", Value::from_function(|x: f64| x.abs())),
        ("min", Value::from_function(|values: Rest<f64>| fold(&values, f64::min))),
        ("max", Value::from_function(|values: Rest<f64>| fold(&values, f64::max))),
        (
            "round",
            Value::from_function(|x: f64, digits: Option<i32>| {
                let factor = 10f64.powi(digits.unwrap_or(0));
                (x * factor).round() / factor
            }),
        ),
    ])
}

fn format_time<Tz>(time: DateTime<Tz>, fmt: Option<String>) -> std::result::Result<String, Error>
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match fmt {
        None => Ok(time.to_rfc3339()),
        Some(fmt) => {
            let mut out = String::new();
            write!(out, "{}", time.format(&fmt))
                .map_err(|_| invalid(format!("invalid time format `{fmt}`")))?;
            Ok(out)
        }
    }
}

fn strftime(timestamp: String, fmt: String) -> std::result::Result<String, Error> {
    let time = DateTime::parse_from_rfc3339(&timestamp)
        .map_err(|e| invalid(format!("`{timestamp}` is not an RFC 3339 timestamp: {e}")))?;
    format_time(time, Some(fmt))
}

fn format(value: Value, spec: String) -> std::result::Result<String, Error> {
    let json = serde_json::to_value(&value)
        .map_err(|e| invalid(format!("cannot format value: {e}")))?;
    format_spec::format_value(&json, None, &spec).map_err(|e| invalid(e.to_string()))
}
