//! Brace-field templates with format specs, e.g. `{model.total:>10,.2f}`.

use std::path::Path;

use serde_json::json;

use super::{not_initialized, read_template, FormatKind, TemplateFormatter};
use crate::context::Commons;
use crate::encoding::Encoding;
use crate::error::Result;
use crate::format_spec::format_fields;
use crate::functions::FunctionRegistry;
use crate::syntax::TemplateSyntax;
use crate::value::ValueNode;

/// Substitutes `{reference[!conversion][:spec]}` fields.
///
/// References start at `model` or `commons` and continue with `.attr`,
/// `[index]` or `[key]`. Functions are not callable from this variant.
/// `{{` and `}}` produce literal braces.
#[derive(Debug, Default)]
pub struct FormatSpecFormatter {
    template: Option<String>,
}

impl FormatSpecFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplateFormatter for FormatSpecFormatter {
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
        _functions: &FunctionRegistry,
    ) -> Result<String> {
        let template = self
            .template
            .as_deref()
            .ok_or_else(|| not_initialized(self.kind()))?;
        let root = json!({
            "model": values.to_json(),
            "commons": commons.to_json(),
        });
        format_fields(template, &root)
    }

    fn reset(&mut self) {
        self.template = None;
    }

    fn kind(&self) -> FormatKind {
        FormatKind::FormatSpec
    }
}
