//! String-interpolation templates: a quoted literal with `{expression}`
//! fields.

use std::collections::BTreeMap;
use std::path::Path;

use minijinja::{Environment, Value};

use super::{expression_env, not_initialized, read_template, FormatKind, TemplateFormatter};
use crate::context::Commons;
use crate::encoding::Encoding;
use crate::error::{FormworkError, Result};
use crate::format_spec::{format_value, segments, Conversion, Field, Segment};
use crate::functions::FunctionRegistry;
use crate::syntax::TemplateSyntax;
use crate::value::ValueNode;

/// Evaluates `{expression[!s|!r][:spec]}` fields in a quoted literal such
/// as `'Hello {model.name | upper}!'`.
///
/// Expressions see `model`, `commons`, `functions` and every function under
/// its own name. Quote characters at either end of the result are removed,
/// so single, double and triple quoted bodies all render to their content.
#[derive(Debug, Default)]
pub struct InterpolationFormatter {
    template: Option<String>,
}

impl InterpolationFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplateFormatter for InterpolationFormatter {
    fn init_string(&mut self, source: &str, _syntax: &TemplateSyntax) -> Result<()> {
        self.template = Some(source.to_string());
        Ok(())
    }

    fn init_file(
        &mut self,
        path: &Path,
        encoding: Encoding,
        _syntax: &TemplateSyntax,
    ) -> Result<()> {
        self.template = Some(read_template(path, encoding)?);
        Ok(())
    }

    fn render(
        &self,
        values: &ValueNode,
        commons: &Commons,
        functions: &FunctionRegistry,
    ) -> Result<String> {
        let template = self
            .template
            .as_deref()
            .ok_or_else(|| not_initialized(self.kind()))?;
        let env = expression_env(values, commons, functions);
        let rendered = interpolate(&env, template, &BTreeMap::new())?;
        Ok(rendered.trim_matches(['\'', '"']).to_string())
    }

    fn reset(&mut self) {
        self.template = None;
    }

    fn kind(&self) -> FormatKind {
        FormatKind::Interpolation
    }
}

/// Replaces every field of `template` with its evaluated, formatted value.
/// `locals` shadow the environment globals.
pub(crate) fn interpolate(
    env: &Environment<'_>,
    template: &str,
    locals: &BTreeMap<String, Value>,
) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    for segment in segments(template)? {
        match segment {
            Segment::Literal(text) => out.push_str(&text),
            Segment::Field(body) => {
                let field = Field::split(body)?;
                let value = evaluate(env, field.expression, locals)?;
                out.push_str(&field_text(&value, field.conversion, field.spec)?);
            }
        }
    }
    Ok(out)
}

/// Compiles and evaluates one expression against `locals`.
pub(crate) fn evaluate(
    env: &Environment<'_>,
    expression: &str,
    locals: &BTreeMap<String, Value>,
) -> Result<Value> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(FormworkError::render("empty expression"));
    }
    let value = env
        .compile_expression_owned(expression.to_string())?
        .eval(locals)?;
    if value.is_undefined() {
        return Err(FormworkError::render(format!("`{expression}` is undefined")));
    }
    Ok(value)
}

/// Text of an evaluated value. Without a conversion or spec the engine's
/// own rendering is used (`none` renders empty); otherwise the value goes
/// through the format-spec mini-language.
pub(crate) fn field_text(
    value: &Value,
    conversion: Option<Conversion>,
    spec: &str,
) -> Result<String> {
    if conversion.is_none() && spec.is_empty() {
        return Ok(if value.is_none() {
            String::new()
        } else {
            value.to_string()
        });
    }
    let json = serde_json::to_value(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    format_value(&json, conversion, spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RenderContext;

    fn context() -> RenderContext {
        let mut ctx = RenderContext::new("3.1.0");
        ctx.assign("name", "Pluto").unwrap();
        ctx.assign("price", 3.5).unwrap();
        ctx.functions.define("replace_with_a", "|x| 'a'").unwrap();
        ctx
    }

    fn render(source: &str) -> Result<String> {
        let mut formatter = InterpolationFormatter::new();
        formatter.init_string(source, &TemplateSyntax::default())?;
        context().render(&formatter)
    }

    #[test]
    fn test_quoted_literal() {
        assert_eq!(render("'Hello {model.name}!'").unwrap(), "Hello Pluto!");
        assert_eq!(render("\"\"\"Hello {model.name}!\"\"\"").unwrap(), "Hello Pluto!");
    }

    #[test]
    fn test_flattened_function() {
        assert_eq!(render("'Hello {replace_with_a(model.name)}!'").unwrap(), "Hello a!");
        assert_eq!(render("'{functions.replace_with_a(1)}'").unwrap(), "a");
    }

    #[test]
    fn test_expressions_filters_and_specs() {
        assert_eq!(render("'{model.name | upper}'").unwrap(), "PLUTO");
        assert_eq!(render("'{model.price:.2f}|{model.name!r}'").unwrap(), "3.50|'Pluto'");
        assert_eq!(render("'{1 + 2 != 4}'").unwrap(), "true");
    }

    #[test]
    fn test_unquoted_body_still_interpolates() {
        assert_eq!(render("v{commons.program_version}").unwrap(), "v3.1.0");
    }

    #[test]
    fn test_literal_braces() {
        assert_eq!(render("'{{x}} {model.name}'").unwrap(), "{x} Pluto");
    }

    #[test]
    fn test_undefined_name_fails() {
        let err = render("'{nobody}'").unwrap_err();
        assert!(matches!(err, FormworkError::Render(_)));
    }
}
