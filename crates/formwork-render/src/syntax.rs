//! Delimiter configuration for the delimited-block formatter.

use minijinja::syntax::SyntaxConfig;

use crate::error::{FormworkError, Result};

/// The delimiter strings a delimited-block template is written with.
///
/// Defaults are the usual `{% %}`, `{{ }}` and `{# #}` with no line
/// statement prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSyntax {
    pub block_start: String,
    pub block_end: String,
    pub comment_start: String,
    pub comment_end: String,
    pub expression_start: String,
    pub expression_end: String,
    /// A prefix that turns a whole line into a block statement, e.g. `#`.
    pub line_statement_prefix: Option<String>,
}

impl Default for TemplateSyntax {
    fn default() -> Self {
        Self {
            block_start: "{%".into(),
            block_end: "%}".into(),
            comment_start: "{#".into(),
            comment_end: "#}".into(),
            expression_start: "{{".into(),
            expression_end: "}}".into(),
            line_statement_prefix: None,
        }
    }
}

impl TemplateSyntax {
    /// Builds the engine-level syntax configuration.
    ///
    /// Fails when a delimiter is empty or the delimiters are ambiguous.
    pub fn to_config(&self) -> Result<SyntaxConfig> {
        let delimiters = [
            ("block start", &self.block_start),
            ("block end", &self.block_end),
            ("comment start", &self.comment_start),
            ("comment end", &self.comment_end),
            ("expression start", &self.expression_start),
            ("expression end", &self.expression_end),
        ];
        if let Some((what, _)) = delimiters.iter().find(|(_, value)| value.is_empty()) {
            return Err(FormworkError::InvalidInput(format!("{what} delimiter is empty")));
        }

        let mut builder = SyntaxConfig::builder();
        builder
            .block_delimiters(self.block_start.clone(), self.block_end.clone())
            .variable_delimiters(self.expression_start.clone(), self.expression_end.clone())
            .comment_delimiters(self.comment_start.clone(), self.comment_end.clone());
        if let Some(prefix) = self.line_statement_prefix.as_ref().filter(|p| !p.is_empty()) {
            builder.line_statement_prefix(prefix.clone());
        }
        builder
            .build()
            .map_err(|e| FormworkError::InvalidInput(format!("invalid template delimiters: {e}")))
    }
}
