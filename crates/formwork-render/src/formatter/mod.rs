//! Interchangeable template formatters.
//!
//! Every formatter implements [`TemplateFormatter`]: it is initialized with
//! a template (from a string or a file), rendered against the value tree,
//! commons and functions, and reset before being reused for an unrelated
//! template. Callers only ever hold a `dyn TemplateFormatter`; which variant
//! is used is decided by [`FormatKind`].
//!
//! | Kind | Format name | Syntax |
//! |------|-------------|--------|
//! | [`FormatKind::Jinja`] | `jinja2` | `{{ model.x }}`, `{% for %}`, configurable delimiters |
//! | [`FormatKind::FormatSpec`] | `format` | `{model.x:>8}` |
//! | [`FormatKind::Interpolation`] | `fstring` | `'Hello {model.x | upper}!'` |
//! | [`FormatKind::Script`] | `python` | `print(f'Hello {model.x}')` |
//!
//! ```rust
//! use formwork_render::{FormatKind, RenderContext, TemplateSyntax};
//!
//! let mut ctx = RenderContext::new("1.0.0");
//! ctx.assign("name", "Pluto")?;
//!
//! let mut formatter = FormatKind::Jinja.create();
//! formatter.init_string("Hello {{ model.name }}!", &TemplateSyntax::default())?;
//! assert_eq!(ctx.render(formatter.as_ref())?, "Hello Pluto!");
//! # Ok::<(), formwork_render::FormworkError>(())
//! ```

mod format;
mod interpolation;
mod jinja;
mod script;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use minijinja::{Environment, UndefinedBehavior, Value};

use crate::context::Commons;
use crate::encoding::Encoding;
use crate::error::{FormworkError, Result};
use crate::functions::FunctionRegistry;
use crate::syntax::TemplateSyntax;
use crate::value::ValueNode;

pub use format::FormatSpecFormatter;
pub use interpolation::InterpolationFormatter;
pub use jinja::JinjaFormatter;
pub use script::ScriptFormatter;

/// A template rendering strategy.
///
/// The lifecycle is `init_*` → `render` (any number of times) → `reset`.
/// Initializing again without a reset replaces the prepared template.
pub trait TemplateFormatter {
    /// Prepares `source` as the template body.
    fn init_string(&mut self, source: &str, syntax: &TemplateSyntax) -> Result<()>;

    /// Reads the file at `path` (trimming surrounding whitespace) and
    /// prepares it as the template body.
    fn init_file(&mut self, path: &Path, encoding: Encoding, syntax: &TemplateSyntax) -> Result<()>;

    /// Renders the prepared template.
    fn render(
        &self,
        values: &ValueNode,
        commons: &Commons,
        functions: &FunctionRegistry,
    ) -> Result<String>;

    /// Drops the prepared template. Calling it twice is harmless.
    fn reset(&mut self);

    /// The variant this formatter implements.
    fn kind(&self) -> FormatKind;
}

/// The available formatter variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// Delimited blocks, expressions and comments.
    #[default]
    Jinja,
    /// Brace-style fields with format specs.
    FormatSpec,
    /// A quoted string literal with embedded `{expression}`s.
    Interpolation,
    /// A line-oriented script whose printed output is the result.
    Script,
}

impl FormatKind {
    pub const ALL: [FormatKind; 4] = [
        FormatKind::Jinja,
        FormatKind::FormatSpec,
        FormatKind::Interpolation,
        FormatKind::Script,
    ];

    /// The canonical format name.
    pub fn name(self) -> &'static str {
        match self {
            FormatKind::Jinja => "jinja2",
            FormatKind::FormatSpec => "format",
            FormatKind::Interpolation => "fstring",
            FormatKind::Script => "python",
        }
    }

    /// Creates a fresh, uninitialized formatter of this kind.
    pub fn create(self) -> Box<dyn TemplateFormatter> {
        match self {
            FormatKind::Jinja => Box::new(JinjaFormatter::new()),
            FormatKind::FormatSpec => Box::new(FormatSpecFormatter::new()),
            FormatKind::Interpolation => Box::new(InterpolationFormatter::new()),
            FormatKind::Script => Box::new(ScriptFormatter::new()),
        }
    }
}

impl FromStr for FormatKind {
    type Err = FormworkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jinja2" | "jinja" => Ok(FormatKind::Jinja),
            "format" | "python-format" => Ok(FormatKind::FormatSpec),
            "fstring" | "interpolation" => Ok(FormatKind::Interpolation),
            "python" | "script" => Ok(FormatKind::Script),
            _ => Err(FormworkError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reads a template file and trims surrounding whitespace.
pub(crate) fn read_template(path: &Path, encoding: Encoding) -> Result<String> {
    if !path.exists() {
        return Err(FormworkError::TemplateNotFound(path.to_path_buf()));
    }
    Ok(encoding.read_file(path)?.trim().to_string())
}

pub(crate) fn not_initialized(kind: FormatKind) -> FormworkError {
    FormworkError::render(format!(
        "{kind} formatter has no template; call init_string or init_file first"
    ))
}

/// The names a template sees: every function under its own name, then
/// `model`, `commons` and `functions`, which win on a clash.
pub(crate) fn globals(
    values: &ValueNode,
    commons: &Commons,
    functions: &FunctionRegistry,
) -> BTreeMap<String, Value> {
    let mut globals: BTreeMap<String, Value> = functions
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    globals.insert("model".into(), Value::from_serialize(values));
    globals.insert("commons".into(), Value::from_serialize(commons));
    globals.insert("functions".into(), functions.namespace());
    globals
}

/// An expression environment with strict undefined handling and the
/// template globals installed.
pub(crate) fn expression_env(
    values: &ValueNode,
    commons: &Commons,
    functions: &FunctionRegistry,
) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    for (name, value) in globals(values, commons, functions) {
        env.add_global(name, value);
    }
    env
}
