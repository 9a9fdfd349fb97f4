//! The data a render call sees.
//!
//! A [`RenderContext`] bundles the value tree (`model` in templates), the
//! read-only [`Commons`] (`commons`) and the [`FunctionRegistry`]
//! (`functions`, plus each function under its own name where the variant
//! supports it). One context is built per run; formatters only borrow it
//! for the duration of a render call.

use std::collections::BTreeMap;

use chrono::{Local, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::formatter::TemplateFormatter;
use crate::functions::FunctionRegistry;
use crate::path::ValuePath;
use crate::value::ValueNode;

/// Read-only ambient values injected into every render.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Commons {
    entries: BTreeMap<String, serde_json::Value>,
}

impl Commons {
    pub fn new() -> Self {
        Self::default()
    }

    /// `now` and `utc_now` (RFC 3339 timestamps taken at construction) and
    /// `program_version`.
    pub fn standard(program_version: &str) -> Self {
        let mut commons = Self::new();
        commons.insert("now", Local::now().to_rfc3339());
        commons.insert("utc_now", Utc::now().to_rfc3339());
        commons.insert("program_version", program_version);
        commons
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// Everything a template can reference.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub values: ValueNode,
    pub commons: Commons,
    pub functions: FunctionRegistry,
}

impl RenderContext {
    /// A context with an empty value tree, the standard commons and the
    /// built-in functions.
    pub fn new(program_version: &str) -> Self {
        Self {
            values: ValueNode::new(),
            commons: Commons::standard(program_version),
            functions: FunctionRegistry::with_builtins(),
        }
    }

    /// Assigns `value` at a dotted/indexed `path` of the value tree.
    pub fn assign(&mut self, path: &str, value: impl Into<serde_json::Value>) -> Result<()> {
        ValuePath::parse(path)?.assign(&mut self.values, value.into())
    }

    /// Applies `(path, value)` pairs in order; later pairs win.
    pub fn assign_all<I, P, V>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (P, V)>,
        P: AsRef<str>,
        V: Into<serde_json::Value>,
    {
        for (path, value) in pairs {
            self.assign(path.as_ref(), value)?;
        }
        Ok(())
    }

    /// Renders whatever `formatter` was initialized with against this
    /// context.
    pub fn render(&self, formatter: &dyn TemplateFormatter) -> Result<String> {
        formatter.render(&self.values, &self.commons, &self.functions)
    }
}
