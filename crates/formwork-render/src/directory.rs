//! Rendering a whole directory tree.
//!
//! Entries whose name ends with the marker suffix (`.template` by default)
//! are templates: the marker is stripped, the remaining name is rendered as
//! a string template and, for files, the content is rendered as a file
//! template. Every other entry is copied byte-for-byte.
//!
//! ```text
//! src/                                  dst/
//! ├── {{ model.name }}.template/        ├── Pluto/
//! │   └── readme.md.template      ─▶    │   └── readme.md    (rendered)
//! └── logo.png                          └── logo.png         (copied)
//! ```
//!
//! The first failure aborts the walk with [`FormworkError::WalkAborted`].
//! Whatever was written before the failure stays on disk.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::context::RenderContext;
use crate::encoding::Encoding;
use crate::error::{FormworkError, Result};
use crate::formatter::TemplateFormatter;
use crate::syntax::TemplateSyntax;

/// The suffix that marks template entries unless configured otherwise.
pub const DEFAULT_NAME_MARKER: &str = ".template";

/// How a directory walk treats names and file contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryOptions {
    pub name_marker: String,
    pub syntax: TemplateSyntax,
    pub input_encoding: Encoding,
    pub output_encoding: Encoding,
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            name_marker: DEFAULT_NAME_MARKER.to_string(),
            syntax: TemplateSyntax::default(),
            input_encoding: Encoding::default(),
            output_encoding: Encoding::default(),
        }
    }
}

/// What a completed walk produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Destination directories created (or found already present).
    pub directories: usize,
    /// Files whose content was rendered.
    pub rendered: usize,
    /// Files copied unchanged.
    pub copied: usize,
}

/// Walks a source tree and writes its rendered counterpart.
#[derive(Debug)]
pub struct DirectoryTemplater<'a> {
    context: &'a RenderContext,
    options: DirectoryOptions,
}

impl<'a> DirectoryTemplater<'a> {
    pub fn new(context: &'a RenderContext, options: DirectoryOptions) -> Self {
        Self { context, options }
    }

    pub fn options(&self) -> &DirectoryOptions {
        &self.options
    }

    /// Renders `source` into `destination` using `formatter` for every
    /// template name and file. The formatter is reset before and after each
    /// render.
    pub fn run(
        &self,
        source: &Path,
        destination: &Path,
        formatter: &mut dyn TemplateFormatter,
    ) -> Result<WalkSummary> {
        if !source.is_dir() {
            return Err(FormworkError::InvalidInput(format!(
                "source {} is not a directory",
                source.display()
            )));
        }
        if self.options.name_marker.is_empty() {
            return Err(FormworkError::InvalidInput("name marker is empty".into()));
        }
        reject_nested(source, destination)?;

        info!(
            "rendering {} into {} ({} formatter)",
            source.display(),
            destination.display(),
            formatter.kind()
        );
        fs::create_dir_all(destination).map_err(|e| FormworkError::io(destination, e))?;

        let mut summary = WalkSummary::default();
        self.walk(source, destination, formatter, &mut summary)?;
        formatter.reset();
        Ok(summary)
    }

    fn walk(
        &self,
        source: &Path,
        destination: &Path,
        formatter: &mut dyn TemplateFormatter,
        summary: &mut WalkSummary,
    ) -> Result<()> {
        let mut entries = fs::read_dir(source)
            .and_then(|entries| entries.collect::<std::io::Result<Vec<_>>>())
            .map_err(|e| aborted(source, FormworkError::io(source, e)))?;
        entries.sort_by_key(|entry| entry.file_name());

        // `file_type` does not follow symlinks; a linked directory is
        // created but never descended into.
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| aborted(&path, FormworkError::io(&path, e)))?;
            if file_type.is_dir() {
                dirs.push((path, true));
            } else if file_type.is_symlink() && path.is_dir() {
                dirs.push((path, false));
            } else {
                files.push(path);
            }
        }

        let mut subdirs = Vec::with_capacity(dirs.len());
        for (dir, descend) in dirs {
            let target = self
                .create_directory(&dir, destination, formatter)
                .map_err(|e| aborted(&dir, e))?;
            summary.directories += 1;
            if descend {
                subdirs.push((dir, target));
            } else {
                warn!("not descending into symlinked directory {}", dir.display());
            }
        }

        for file in files {
            let rendered = self
                .process_file(&file, destination, formatter)
                .map_err(|e| aborted(&file, e))?;
            if rendered {
                summary.rendered += 1;
            } else {
                summary.copied += 1;
            }
        }

        for (dir, target) in subdirs {
            self.walk(&dir, &target, formatter, summary)?;
        }
        Ok(())
    }

    fn create_directory(
        &self,
        dir: &Path,
        destination: &Path,
        formatter: &mut dyn TemplateFormatter,
    ) -> Result<PathBuf> {
        let name = match self.template_stem(dir) {
            Some(stem) => OsString::from(self.render_name(&stem, formatter)?),
            None => file_name(dir),
        };
        let target = destination.join(name);
        debug!("directory {} -> {}", dir.display(), target.display());
        fs::create_dir_all(&target).map_err(|e| FormworkError::io(&target, e))?;
        Ok(target)
    }

    /// Returns whether the file was rendered (`true`) or copied.
    fn process_file(
        &self,
        file: &Path,
        destination: &Path,
        formatter: &mut dyn TemplateFormatter,
    ) -> Result<bool> {
        let Some(stem) = self.template_stem(file) else {
            let target = destination.join(file_name(file));
            debug!("copy {} -> {}", file.display(), target.display());
            fs::copy(file, &target).map_err(|e| FormworkError::io(&target, e))?;
            return Ok(false);
        };

        let target = destination.join(self.render_name(&stem, formatter)?);
        debug!("render {} -> {}", file.display(), target.display());
        formatter.reset();
        formatter.init_file(file, self.options.input_encoding, &self.options.syntax)?;
        let content = self.context.render(formatter);
        formatter.reset();
        self.options.output_encoding.write_file(&target, &content?)?;
        Ok(true)
    }

    fn render_name(&self, stem: &str, formatter: &mut dyn TemplateFormatter) -> Result<String> {
        formatter.reset();
        formatter.init_string(stem, &self.options.syntax)?;
        let name = self.context.render(formatter);
        formatter.reset();
        let name = name?;
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(FormworkError::render(format!(
                "template name `{stem}` rendered to `{name}`, which is not a valid file name"
            )));
        }
        Ok(name)
    }

    /// The name without its marker, if `path` is a template entry. Names
    /// that are not valid UTF-8 are never templates.
    fn template_stem(&self, path: &Path) -> Option<String> {
        let name = path.file_name()?.to_str()?;
        name.strip_suffix(self.options.name_marker.as_str())
            .filter(|stem| !stem.is_empty())
            .map(str::to_string)
    }
}

/// Renders `source` into `destination` with default options and the given
/// marker suffix.
pub fn template_directory(
    source: &Path,
    destination: &Path,
    formatter: &mut dyn TemplateFormatter,
    context: &RenderContext,
    name_marker: &str,
) -> Result<WalkSummary> {
    let options = DirectoryOptions {
        name_marker: name_marker.to_string(),
        ..DirectoryOptions::default()
    };
    DirectoryTemplater::new(context, options).run(source, destination, formatter)
}

fn file_name(path: &Path) -> OsString {
    path.file_name().map(OsString::from).unwrap_or_default()
}

fn aborted(path: &Path, err: FormworkError) -> FormworkError {
    match err {
        FormworkError::WalkAborted { .. } => err,
        other => FormworkError::WalkAborted {
            path: path.to_path_buf(),
            source: Box::new(other),
        },
    }
}

/// Fails when `destination` is `source` or lies inside it.
fn reject_nested(source: &Path, destination: &Path) -> Result<()> {
    let source = source
        .canonicalize()
        .map_err(|e| FormworkError::io(source, e))?;
    let destination = resolve_existing_prefix(destination)?;
    if destination.starts_with(&source) {
        return Err(FormworkError::InvalidInput(format!(
            "destination {} lies inside source {}",
            destination.display(),
            source.display()
        )));
    }
    Ok(())
}

/// Canonicalizes the longest existing ancestor of `path` and appends the
/// remaining components.
fn resolve_existing_prefix(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| FormworkError::io(path, e))?;
    let mut missing = Vec::new();
    let mut current = absolute.as_path();
    loop {
        if let Ok(resolved) = current.canonicalize() {
            return Ok(missing.iter().rev().fold(resolved, |acc, part| acc.join(part)));
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                current = parent;
            }
            _ => return Ok(absolute),
        }
    }
}
