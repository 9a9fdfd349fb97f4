//! Delimited-block templates backed by MiniJinja.

use std::path::Path;

use minijinja::{AutoEscape, Environment, UndefinedBehavior};

use super::{globals, not_initialized, read_template, FormatKind, TemplateFormatter};
use crate::context::Commons;
use crate::encoding::Encoding;
use crate::error::Result;
use crate::functions::FunctionRegistry;
use crate::syntax::TemplateSyntax;
use crate::value::ValueNode;

const STRING_TEMPLATE: &str = "<string>";

/// Renders `{{ expression }}`, `{% block %}` and `{# comment #}` templates.
///
/// Delimiters come from [`TemplateSyntax`]. Referencing anything that is not
/// defined is an error rather than an empty string. Templates initialized
/// from a file may include or extend siblings from the same directory.
#[derive(Debug, Default)]
pub struct JinjaFormatter {
    prepared: Option<Prepared>,
}

#[derive(Debug)]
struct Prepared {
    env: Environment<'static>,
    name: String,
}

impl JinjaFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    fn environment(syntax: &TemplateSyntax) -> Result<Environment<'static>> {
        let mut env = Environment::new();
        env.set_syntax(syntax.to_config()?);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        Ok(env)
    }

    fn prepare(
        &mut self,
        mut env: Environment<'static>,
        name: String,
        source: String,
    ) -> Result<()> {
        self.prepared = None;
        env.add_template_owned(name.clone(), source)?;
        self.prepared = Some(Prepared { env, name });
        Ok(())
    }
}

impl TemplateFormatter for JinjaFormatter {
    fn init_string(&mut self, source: &str, syntax: &TemplateSyntax) -> Result<()> {
        let env = Self::environment(syntax)?;
        self.prepare(env, STRING_TEMPLATE.to_string(), source.to_string())
    }

    fn init_file(
        &mut self,
        path: &Path,
        encoding: Encoding,
        syntax: &TemplateSyntax,
    ) -> Result<()> {
        let source = read_template(path, encoding)?;
        let mut env = Self::environment(syntax)?;
        if let Some(dir) = path.parent() {
            env.set_loader(minijinja::path_loader(dir));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| STRING_TEMPLATE.to_string());
        self.prepare(env, name, source)
    }

    fn render(
        &self,
        values: &ValueNode,
        commons: &Commons,
        functions: &FunctionRegistry,
    ) -> Result<String> {
        let prepared = self
            .prepared
            .as_ref()
            .ok_or_else(|| not_initialized(self.kind()))?;
        let template = prepared.env.get_template(&prepared.name)?;
        Ok(template.render(globals(values, commons, functions))?)
    }

    fn reset(&mut self) {
        self.prepared = None;
    }

    fn kind(&self) -> FormatKind {
        FormatKind::Jinja
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RenderContext;
    use crate::error::FormworkError;
    use std::fs;

    fn context() -> RenderContext {
        let mut ctx = RenderContext::new("1.0.0");
        ctx.assign("name", "Pluto").unwrap();
        ctx.assign("persons[0].name", "Ann").unwrap();
        ctx.assign("persons[1].name", "Bob").unwrap();
        ctx
    }

    fn render(source: &str, syntax: &TemplateSyntax) -> Result<String> {
        let mut formatter = JinjaFormatter::new();
        formatter.init_string(source, syntax)?;
        context().render(&formatter)
    }

    #[test]
    fn test_renders_model_values() {
        let out = render("Hello {{ model.name }}!", &TemplateSyntax::default()).unwrap();
        assert_eq!(out, "Hello Pluto!");
    }

    #[test]
    fn test_loops_and_comments() {
        let out = render(
            "{# people #}{% for p in model.persons %}{{ p.name }};{% endfor %}",
            &TemplateSyntax::default(),
        )
        .unwrap();
        assert_eq!(out, "Ann;Bob;");
    }

    #[test]
    fn test_functions_flattened_and_namespaced() {
        let out = render(
            "{{ len(model.persons) }} {{ functions.len(model.name) }}",
            &TemplateSyntax::default(),
        )
        .unwrap();
        assert_eq!(out, "2 5");
    }

    #[test]
    fn test_commons_visible() {
        let out = render("{{ commons.program_version }}", &TemplateSyntax::default()).unwrap();
        assert_eq!(out, "1.0.0");
    }

    #[test]
    fn test_undefined_is_an_error() {
        let err = render("{{ model.missing }}", &TemplateSyntax::default()).unwrap_err();
        assert!(matches!(err, FormworkError::Render(_)));
    }

    #[test]
    fn test_custom_delimiters() {
        let syntax = TemplateSyntax {
            block_start: "<%".into(),
            block_end: "%>".into(),
            expression_start: "<<".into(),
            expression_end: ">>".into(),
            comment_start: "<#".into(),
            comment_end: "#>".into(),
            line_statement_prefix: None,
        };
        let out = render(
            "<# x #><% if true %>{{ raw }} << model.name >><% endif %>",
            &syntax,
        )
        .unwrap();
        assert_eq!(out, "{{ raw }} Pluto");
    }

    #[test]
    fn test_line_statement_prefix() {
        let syntax = TemplateSyntax {
            line_statement_prefix: Some("%%".into()),
            ..TemplateSyntax::default()
        };
        let out = render("%% for p in model.persons\n{{ p.name }}\n%% endfor", &syntax).unwrap();
        assert_eq!(out.split_whitespace().collect::<Vec<_>>(), ["Ann", "Bob"]);
    }

    #[test]
    fn test_no_html_escaping() {
        let mut ctx = RenderContext::new("1.0.0");
        ctx.assign("tag", "<b>&</b>").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, "{{ model.tag }}").unwrap();
        let mut formatter = JinjaFormatter::new();
        formatter
            .init_file(&path, Encoding::Utf8, &TemplateSyntax::default())
            .unwrap();
        assert_eq!(ctx.render(&formatter).unwrap(), "<b>&</b>");
    }

    #[test]
    fn test_file_template_includes_sibling() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("header.txt"), "== {{ model.name }} ==").unwrap();
        let main = dir.path().join("main.txt");
        fs::write(&main, "\n{% include 'header.txt' %}\nbody\n\n").unwrap();

        let mut formatter = JinjaFormatter::new();
        formatter
            .init_file(&main, Encoding::Utf8, &TemplateSyntax::default())
            .unwrap();
        assert_eq!(context().render(&formatter).unwrap(), "== Pluto ==\nbody");
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut formatter = JinjaFormatter::new();
        formatter
            .init_string("x", &TemplateSyntax::default())
            .unwrap();
        formatter.reset();
        formatter.reset();
        assert!(context().render(&formatter).is_err());
    }
}
