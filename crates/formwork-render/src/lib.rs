//! # Formwork Render - Value Trees and Pluggable Template Formatters
//!
//! `formwork-render` turns loosely structured values into generated text,
//! one string, one file or a whole directory tree at a time.
//!
//! This crate is the engine behind the `formwork` command line tool, but can
//! be used on its own by anything that needs to fill templates from
//! `key.path = value` pairs.
//!
//! ## Core Concepts
//!
//! - [`ValueNode`]: a node of the value tree; unset until first written, then
//!   a map, a list or a scalar
//! - [`ValuePath`] / [`assign`]: `persons[0].surname`-style paths that build
//!   the tree as they are assigned
//! - [`RenderContext`]: the value tree plus [`Commons`] and a
//!   [`FunctionRegistry`]
//! - [`TemplateFormatter`]: the common contract of the four formatter
//!   variants, selected through [`FormatKind`]
//! - [`DirectoryTemplater`]: renders marked names and files of a directory
//!   tree and copies everything else
//!
//! ## Quick Start
//!
//! ```rust
//! use formwork_render::{FormatKind, RenderContext, TemplateSyntax};
//!
//! let mut ctx = RenderContext::new(env!("CARGO_PKG_VERSION"));
//! ctx.assign("persons[0].surname", "Mario")?;
//! ctx.assign("persons[1].surname", "Paolo")?;
//!
//! let mut formatter = FormatKind::Jinja.create();
//! formatter.init_string(
//!     "Hello {% for p in model.persons %} {{ p.surname }} and {%endfor %}!",
//!     &TemplateSyntax::default(),
//! )?;
//! assert_eq!(ctx.render(formatter.as_ref())?, "Hello  Mario and  Paolo and !");
//! # Ok::<(), formwork_render::FormworkError>(())
//! ```
//!
//! ## Building Value Trees
//!
//! The first access decides a node's role: a name makes it a map, an index
//! makes it a list. Indexing past the end pads the list with unset nodes and
//! `[]` appends. Assigning to a path that already holds a value replaces it.
//!
//! ```rust
//! use formwork_render::{assign, FormworkError, ValueNode};
//! use serde_json::json;
//!
//! let mut root = ValueNode::new();
//! assign(&mut root, "persons[2].surname", json!("X"))?;
//! assert_eq!(root.get("persons").map(ValueNode::len), Some(3));
//!
//! // `persons` is a list now, so naming a child is a shape conflict.
//! let err = assign(&mut root, "persons.first", json!(1)).unwrap_err();
//! assert!(matches!(err, FormworkError::ShapeConflict { .. }));
//! # Ok::<(), FormworkError>(())
//! ```
//!
//! ## Format Specs
//!
//! The `format` variant and the `{expr:spec}` fields of the interpolation
//! and script variants share one format-spec mini-language:
//!
//! ```rust
//! use formwork_render::format_spec::format_fields;
//! use serde_json::json;
//!
//! let root = json!({"model": {"name": "Pluto", "age": 42}});
//! let out = format_fields("Hello {model.name} {model.age:03}!", &root)?;
//! assert_eq!(out, "Hello Pluto 042!");
//! # Ok::<(), formwork_render::FormworkError>(())
//! ```

pub mod context;
pub mod directory;
pub mod encoding;
mod error;
pub mod format_spec;
pub mod formatter;
pub mod functions;
pub mod path;
pub mod syntax;
pub mod value;

pub use error::{FormworkError, Result};

pub use context::{Commons, RenderContext};
pub use directory::{
    template_directory, DirectoryOptions, DirectoryTemplater, WalkSummary, DEFAULT_NAME_MARKER,
};
pub use encoding::Encoding;
pub use formatter::{
    FormatKind, FormatSpecFormatter, InterpolationFormatter, JinjaFormatter, ScriptFormatter,
    TemplateFormatter,
};
pub use functions::FunctionRegistry;
pub use path::{assign, PathStep, ValuePath};
pub use syntax::TemplateSyntax;
pub use value::{NodeRole, ValueNode};
