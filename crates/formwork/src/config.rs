//! Configuration files and settings resolution.
//!
//! Settings are layered: built-in defaults, then the config file, then the
//! command line. A config file has three sections:
//!
//! ```toml
//! [general]
//! input_file = "README.md.j2"       # relative to this file
//! format = "jinja2"
//! line_statement_prefix = "%%"
//!
//! [values]
//! name = "Pluto"
//! "persons[0].surname" = "Mario"
//! address = { city = "Rome" }
//!
//! [functions]
//! greet = "|who| 'Hello ' ~ who"
//! ```
//!
//! Files ending in `.yaml`/`.yml` or `.json` are read with the same layout.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use formwork_render::format_spec::format_fields;
use formwork_render::{
    DirectoryOptions, Encoding, FormatKind, FormworkError, RenderContext, TemplateSyntax,
    DEFAULT_NAME_MARKER,
};
use log::LevelFilter;
use serde::Deserialize;

use crate::cli::Cli;
use crate::logging;

pub const DEFAULT_INPUT_FILE: &str = "input.jinja2";
pub const DEFAULT_OUTPUT_FILE_FORMAT: &str = "{filename}{ext}.out";

/// Errors raised while loading or resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid `{key}` setting: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("--input-directory requires --output-directory")]
    MissingOutputDirectory,

    #[error(transparent)]
    Render(#[from] FormworkError),
}

/// The on-disk config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub general: GeneralSection,
    pub values: BTreeMap<String, serde_json::Value>,
    pub functions: BTreeMap<String, String>,
}

/// `[general]`: every key is optional; unset keys fall through to the
/// built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeneralSection {
    pub input_file: Option<PathBuf>,
    pub input_directory: Option<PathBuf>,
    pub output_directory: Option<PathBuf>,
    pub template_suffix: Option<String>,
    pub output_file_format: Option<String>,
    pub log_level: Option<String>,
    pub block_start_string: Option<String>,
    pub block_end_string: Option<String>,
    pub comment_start_string: Option<String>,
    pub comment_end_string: Option<String>,
    pub expression_start_string: Option<String>,
    pub expression_end_string: Option<String>,
    pub line_statement_prefix: Option<String>,
    pub input_file_encoding: Option<String>,
    pub output_file_encoding: Option<String>,
    pub write_on_stdout: Option<bool>,
    pub template_string: Option<String>,
    pub format: Option<String>,
}

impl ConfigFile {
    /// Reads and parses `path`, choosing the parser by extension (TOML
    /// unless `.yaml`, `.yml` or `.json`). Relative paths in `[general]` are
    /// resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let mut config = match extension.as_deref() {
            Some("yaml") | Some("yml") => Self::parse_yaml(&text),
            Some("json") => Self::parse_json(&text),
            _ => Self::parse_toml(&text),
        }
        .map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.general.rebase(base);
        Ok(config)
    }

    pub fn parse_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    pub fn parse_yaml(text: &str) -> Result<Self, String> {
        // An empty YAML document is `null`, not an empty mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| e.to_string())
    }

    pub fn parse_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| e.to_string())
    }
}

impl GeneralSection {
    fn rebase(&mut self, base: &Path) {
        for path in [
            &mut self.input_file,
            &mut self.input_directory,
            &mut self.output_directory,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub format: FormatKind,
    pub syntax: TemplateSyntax,
    pub input_encoding: Encoding,
    pub output_encoding: Encoding,
    pub input_file: PathBuf,
    pub output_file_format: String,
    pub input_directory: Option<PathBuf>,
    pub output_directory: Option<PathBuf>,
    pub template_suffix: String,
    pub log_level: LevelFilter,
    pub write_on_stdout: bool,
    pub template_string: Option<String>,
    /// Config values first, then command line values.
    pub values: Vec<(String, serde_json::Value)>,
    pub functions: Vec<(String, String)>,
}

impl Settings {
    /// Loads the config file named by `cli` (if any) and layers the command
    /// line on top.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let config = match &cli.config_file {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        Self::layer(config, cli)
    }

    /// Combines defaults, `config` and `cli`, later layers winning.
    pub fn layer(config: ConfigFile, cli: &Cli) -> Result<Self, ConfigError> {
        let ConfigFile {
            general,
            values,
            functions,
        } = config;
        let defaults = TemplateSyntax::default();

        let format = match (cli.format, general.format.as_deref()) {
            (Some(format), _) => format,
            (None, Some(name)) => name.parse().map_err(|e| invalid("format", e))?,
            (None, None) => FormatKind::default(),
        };
        let input_encoding = pick_encoding(
            "input_file_encoding",
            cli.input_file_encoding,
            general.input_file_encoding.as_deref(),
        )?;
        let output_encoding = pick_encoding(
            "output_file_encoding",
            cli.output_file_encoding,
            general.output_file_encoding.as_deref(),
        )?;
        let log_level = match cli.log_level.as_deref().or(general.log_level.as_deref()) {
            Some(name) => logging::parse_level(name)?,
            None => LevelFilter::Error,
        };

        let syntax = TemplateSyntax {
            block_start: pick(
                &cli.block_start_string,
                general.block_start_string,
                defaults.block_start,
            ),
            block_end: pick(&cli.block_end_string, general.block_end_string, defaults.block_end),
            comment_start: pick(
                &cli.comment_start_string,
                general.comment_start_string,
                defaults.comment_start,
            ),
            comment_end: pick(
                &cli.comment_end_string,
                general.comment_end_string,
                defaults.comment_end,
            ),
            expression_start: pick(
                &cli.expression_start_string,
                general.expression_start_string,
                defaults.expression_start,
            ),
            expression_end: pick(
                &cli.expression_end_string,
                general.expression_end_string,
                defaults.expression_end,
            ),
            line_statement_prefix: cli
                .line_statement_prefix
                .clone()
                .or(general.line_statement_prefix)
                .filter(|prefix| !prefix.is_empty()),
        };

        let mut all_values: Vec<(String, serde_json::Value)> = values.into_iter().collect();
        all_values.extend(cli.value_pairs().map(|(path, value)| {
            (path.to_string(), serde_json::Value::String(value.to_string()))
        }));

        Ok(Self {
            format,
            syntax,
            input_encoding,
            output_encoding,
            input_file: cli
                .input_file
                .clone()
                .or(general.input_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_FILE)),
            output_file_format: pick(
                &cli.output_file,
                general.output_file_format,
                DEFAULT_OUTPUT_FILE_FORMAT.to_string(),
            ),
            input_directory: cli.input_directory.clone().or(general.input_directory),
            output_directory: cli.output_directory.clone().or(general.output_directory),
            template_suffix: pick(
                &cli.template_suffix,
                general.template_suffix,
                DEFAULT_NAME_MARKER.to_string(),
            ),
            log_level,
            write_on_stdout: cli.write_on_stdout || general.write_on_stdout.unwrap_or(false),
            template_string: cli.template_string.clone().or(general.template_string),
            values: all_values,
            functions: functions.into_iter().collect(),
        })
    }

    /// Builds the render context: standard commons and builtins, the
    /// configured functions, then every value in order.
    pub fn build_context(&self, program_version: &str) -> Result<RenderContext, ConfigError> {
        let mut ctx = RenderContext::new(program_version);
        for (name, source) in &self.functions {
            ctx.functions.define(name, source)?;
        }
        for (path, value) in &self.values {
            ctx.assign(path, value.clone())?;
        }
        Ok(ctx)
    }

    /// The output file for single-template mode: `output_file_format` with
    /// `{filename}`, `{ext}`, `{basename}` and `{basedir}` filled in from
    /// the input file.
    pub fn output_path(&self) -> Result<PathBuf, ConfigError> {
        let input = std::path::absolute(&self.input_file).map_err(|e| invalid("input_file", e))?;
        let ext = input
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let placeholders = serde_json::json!({
            "filename": input.with_extension("").to_string_lossy(),
            "ext": ext,
            "basename": input.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
            "basedir": input.parent().map(|p| p.to_string_lossy()).unwrap_or_default(),
        });
        let rendered = format_fields(&self.output_file_format, &placeholders)
            .map_err(|e| invalid("output_file_format", e))?;
        std::path::absolute(rendered).map_err(|e| invalid("output_file_format", e))
    }

    pub fn directory_options(&self) -> DirectoryOptions {
        DirectoryOptions {
            name_marker: self.template_suffix.clone(),
            syntax: self.syntax.clone(),
            input_encoding: self.input_encoding,
            output_encoding: self.output_encoding,
        }
    }
}

fn pick(cli: &Option<String>, config: Option<String>, default: String) -> String {
    cli.clone().or(config).unwrap_or(default)
}

fn pick_encoding(
    key: &'static str,
    cli: Option<Encoding>,
    config: Option<&str>,
) -> Result<Encoding, ConfigError> {
    match (cli, config) {
        (Some(encoding), _) => Ok(encoding),
        (None, Some(name)) => name.parse().map_err(|e| invalid(key, e)),
        (None, None) => Ok(Encoding::default()),
    }
}

pub(crate) fn invalid(key: &'static str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: err.to_string(),
    }
}
