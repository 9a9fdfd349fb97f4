//! Dotted/indexed value paths such as `persons[1].surname`.
//!
//! A path is a `.`-separated list of names, each optionally followed by any
//! number of `[index]` or `[]` suffixes. `[]` appends a new element to the
//! list instead of addressing an existing one.
//!
//! Assigning through a path creates every missing map and list on the way:
//!
//! ```rust
//! use formwork_render::{assign, ValueNode};
//! use serde_json::json;
//!
//! let mut root = ValueNode::new();
//! assign(&mut root, "persons[0].surname", json!("Mario"))?;
//! assign(&mut root, "persons[1].surname", json!("Paolo"))?;
//!
//! assert_eq!(
//!     root.to_json(),
//!     json!({"persons": [{"surname": "Mario"}, {"surname": "Paolo"}]}),
//! );
//! # Ok::<(), formwork_render::FormworkError>(())
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{FormworkError, Result};
use crate::value::ValueNode;

/// One navigation step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// Navigate to a named child.
    Key(String),
    /// Navigate to a list element, padding as needed.
    Index(usize),
    /// Append a new list element and navigate to it.
    Append,
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Key(name) => f.write_str(name),
            PathStep::Index(index) => write!(f, "[{index}]"),
            PathStep::Append => f.write_str("[]"),
        }
    }
}

/// A parsed value path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuePath {
    raw: String,
    steps: Vec<PathStep>,
}

impl ValuePath {
    /// Parses `raw`, reporting the byte offset of the first malformed
    /// character.
    pub fn parse(raw: &str) -> Result<Self> {
        let steps = Parser::new(raw).parse()?;
        Ok(Self {
            raw: raw.to_string(),
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Navigates from `root` to the node this path names, creating maps and
    /// lists along the way.
    ///
    /// Navigating the same path twice yields the same node, except that each
    /// `[]` step appends a fresh element.
    pub fn navigate<'a>(&self, root: &'a mut ValueNode) -> Result<&'a mut ValueNode> {
        let mut current = root;
        for (position, step) in self.steps.iter().enumerate() {
            let next = match step {
                PathStep::Key(name) => current.child_mut(name),
                PathStep::Index(index) => current.element_mut(*index),
                PathStep::Append => current.push_mut(),
            };
            current = next.map_err(|err| self.locate_conflict(err, position))?;
        }
        Ok(current)
    }

    /// Sets the node this path names to `value`, replacing whatever it held.
    pub fn assign(&self, root: &mut ValueNode, value: serde_json::Value) -> Result<()> {
        self.navigate(root)?.set(value);
        Ok(())
    }

    /// Looks up the node this path names without creating anything.
    ///
    /// `[]` steps never match.
    pub fn lookup<'a>(&self, root: &'a ValueNode) -> Option<&'a ValueNode> {
        let mut current = root;
        for step in &self.steps {
            current = match step {
                PathStep::Key(name) => current.get(name)?,
                PathStep::Index(index) => current.get_index(*index)?,
                PathStep::Append => return None,
            };
        }
        Some(current)
    }

    fn locate_conflict(&self, err: FormworkError, position: usize) -> FormworkError {
        match err {
            FormworkError::ShapeConflict {
                expected, found, ..
            } => FormworkError::ShapeConflict {
                path: render_steps(&self.steps[..=position]),
                expected,
                found,
            },
            other => other,
        }
    }
}

impl FromStr for ValuePath {
    type Err = FormworkError;

    fn from_str(s: &str) -> Result<Self> {
        ValuePath::parse(s)
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parses `path` and assigns `value` at it.
pub fn assign(root: &mut ValueNode, path: &str, value: serde_json::Value) -> Result<()> {
    ValuePath::parse(path)?.assign(root, value)
}

fn render_steps(steps: &[PathStep]) -> String {
    let mut out = String::new();
    for step in steps {
        if matches!(step, PathStep::Key(_)) && !out.is_empty() {
            out.push('.');
        }
        out.push_str(&step.to_string());
    }
    out
}

struct Parser<'a> {
    raw: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    steps: Vec<PathStep>,
}

impl<'a> Parser<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            raw,
            chars: raw.char_indices().peekable(),
            steps: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<PathStep>> {
        if self.raw.is_empty() {
            return Err(self.error(0, "path is empty"));
        }
        loop {
            self.parse_name()?;
            self.parse_suffixes()?;
            match self.chars.next() {
                None => return Ok(self.steps),
                Some((_, '.')) => continue,
                Some((offset, ch)) => {
                    return Err(
                        self.error(offset, format!("unexpected `{ch}`, expected `.` or `[`"))
                    )
                }
            }
        }
    }

    fn parse_name(&mut self) -> Result<()> {
        let start = self.offset();
        let mut name = String::new();
        while let Some(&(offset, ch)) = self.chars.peek() {
            match ch {
                '.' | '[' => break,
                ']' => return Err(self.error(offset, "unbalanced `]`")),
                _ => {
                    name.push(ch);
                    self.chars.next();
                }
            }
        }
        if name.is_empty() {
            return Err(self.error(start, "expected a name"));
        }
        self.steps.push(PathStep::Key(name));
        Ok(())
    }

    fn parse_suffixes(&mut self) -> Result<()> {
        while let Some(&(open, '[')) = self.chars.peek() {
            self.chars.next();
            let mut digits = String::new();
            loop {
                match self.chars.next() {
                    Some((_, ']')) => break,
                    Some((_, ch)) if ch.is_ascii_digit() => digits.push(ch),
                    Some((offset, ch)) => {
                        return Err(self.error(
                            offset,
                            format!("unexpected `{ch}` inside brackets, expected a digit or `]`"),
                        ))
                    }
                    None => return Err(self.error(open, "unbalanced `[`")),
                }
            }
            if digits.is_empty() {
                self.steps.push(PathStep::Append);
            } else {
                let index = digits
                    .parse::<usize>()
                    .map_err(|_| self.error(open + 1, "index out of range"))?;
                self.steps.push(PathStep::Index(index));
            }
        }
        Ok(())
    }

    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|&(offset, _)| offset)
            .unwrap_or(self.raw.len())
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> FormworkError {
        FormworkError::PathSyntax {
            path: self.raw.to_string(),
            offset,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn steps(raw: &str) -> Vec<PathStep> {
        ValuePath::parse(raw).unwrap().steps().to_vec()
    }

    fn syntax_offset(raw: &str) -> usize {
        match ValuePath::parse(raw).unwrap_err() {
            FormworkError::PathSyntax { offset, .. } => offset,
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_plain_name() {
        assert_eq!(steps("surname"), vec![PathStep::Key("surname".into())]);
    }

    #[test]
    fn test_parse_dotted() {
        assert_eq!(
            steps("a.b.c"),
            vec![
                PathStep::Key("a".into()),
                PathStep::Key("b".into()),
                PathStep::Key("c".into())
            ]
        );
    }

    #[test]
    fn test_parse_indices_and_append() {
        assert_eq!(
            steps("a[0][12].b[]"),
            vec![
                PathStep::Key("a".into()),
                PathStep::Index(0),
                PathStep::Index(12),
                PathStep::Key("b".into()),
                PathStep::Append,
            ]
        );
    }

    #[test]
    fn test_parse_errors_report_offsets() {
        assert_eq!(syntax_offset(""), 0);
        assert_eq!(syntax_offset("a..b"), 2);
        assert_eq!(syntax_offset(".a"), 0);
        assert_eq!(syntax_offset("a."), 2);
        assert_eq!(syntax_offset("a[x]"), 2);
        assert_eq!(syntax_offset("a[1"), 1);
        assert_eq!(syntax_offset("a]"), 1);
        assert_eq!(syntax_offset("a[0]b"), 4);
        assert_eq!(syntax_offset("[0]"), 0);
    }

    #[test]
    fn test_display_roundtrips_raw() {
        let path = ValuePath::parse("persons[1].surname").unwrap();
        assert_eq!(path.to_string(), "persons[1].surname");
    }

    #[test]
    fn test_assign_nested_maps() {
        let mut root = ValueNode::new();
        assign(&mut root, "a.b.c", json!(5)).unwrap();
        assert_eq!(root.to_json(), json!({"a": {"b": {"c": 5}}}));
    }

    #[test]
    fn test_last_write_wins() {
        let mut root = ValueNode::new();
        assign(&mut root, "a.b", json!(1)).unwrap();
        assign(&mut root, "a.b", json!(2)).unwrap();
        assert_eq!(root.to_json(), json!({"a": {"b": 2}}));
    }

    #[test]
    fn test_list_padding() {
        let mut root = ValueNode::new();
        assign(&mut root, "persons[2].surname", json!("X")).unwrap();
        let persons = root.get("persons").unwrap();
        assert_eq!(persons.len(), 3);
        assert!(persons.get_index(0).unwrap().is_unset());
        assert!(persons.get_index(1).unwrap().is_unset());
        assert_eq!(
            persons.get_index(2).unwrap().get("surname").unwrap().as_scalar(),
            Some(&json!("X"))
        );
    }

    #[test]
    fn test_nested_indices() {
        let mut root = ValueNode::new();
        assign(&mut root, "grid[1][0]", json!("x")).unwrap();
        assert_eq!(root.to_json(), json!({"grid": [null, ["x"]]}));
    }

    #[test]
    fn test_append_creates_new_elements() {
        let mut root = ValueNode::new();
        assign(&mut root, "tags[]", json!("a")).unwrap();
        assign(&mut root, "tags[]", json!("b")).unwrap();
        assert_eq!(root.to_json(), json!({"tags": ["a", "b"]}));
    }

    #[test]
    fn test_shape_conflict_names_prefix() {
        let mut root = ValueNode::new();
        assign(&mut root, "a[0]", json!(1)).unwrap();
        match assign(&mut root, "a.b", json!(2)).unwrap_err() {
            FormworkError::ShapeConflict { path, expected, found } => {
                assert_eq!(path, "a.b");
                assert_eq!(expected, "map");
                assert_eq!(found, "list");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_descending_into_scalar_conflicts() {
        let mut root = ValueNode::new();
        assign(&mut root, "a", json!("flat")).unwrap();
        assert!(matches!(
            assign(&mut root, "a.b", json!(1)),
            Err(FormworkError::ShapeConflict { .. })
        ));
    }

    #[test]
    fn test_lookup_does_not_create() {
        let mut root = ValueNode::new();
        assign(&mut root, "a.b", json!(1)).unwrap();
        let path = ValuePath::parse("a.c").unwrap();
        assert!(path.lookup(&root).is_none());
        assert_eq!(root.to_json(), json!({"a": {"b": 1}}));

        let path = ValuePath::parse("a.b").unwrap();
        assert_eq!(path.lookup(&root).unwrap().as_scalar(), Some(&json!(1)));
    }
}
