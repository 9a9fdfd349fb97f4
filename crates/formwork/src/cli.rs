//! Command line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use formwork_render::{Encoding, FormatKind};

/// Render a template (or a whole template directory) from config values and
/// `--value` overrides.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "formwork", disable_version_flag = true)]
pub struct Cli {
    /// Template given inline; takes precedence over --input-file.
    #[arg(value_name = "TEMPLATE_STRING")]
    pub template_string: Option<String>,

    /// Template format: jinja2, format, fstring or python.
    #[arg(short = 'f', long)]
    pub format: Option<FormatKind>,

    /// TOML (or .yaml/.json) file with [general], [values] and [functions].
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Template file to render.
    #[arg(long, value_name = "PATH")]
    pub input_file: Option<PathBuf>,

    /// Output path; may use {filename}, {ext}, {basename} and {basedir}.
    #[arg(long, value_name = "FORMAT")]
    pub output_file: Option<String>,

    /// Render a whole directory tree instead of a single template.
    #[arg(long, value_name = "DIR")]
    pub input_directory: Option<PathBuf>,

    /// Where the rendered directory tree is written.
    #[arg(long, value_name = "DIR")]
    pub output_directory: Option<PathBuf>,

    /// Suffix marking directory entries as templates [default: .template].
    #[arg(long, value_name = "SUFFIX")]
    pub template_suffix: Option<String>,

    /// Print the result instead of writing the output file.
    #[arg(long)]
    pub write_on_stdout: bool,

    /// Print the program version and exit.
    #[arg(short = 'v', long)]
    pub version: bool,

    #[arg(short = 'i', long, value_name = "ENCODING")]
    pub input_file_encoding: Option<Encoding>,

    #[arg(short = 'o', long, value_name = "ENCODING")]
    pub output_file_encoding: Option<Encoding>,

    /// off, error, warn, info, debug or trace.
    #[arg(short = 'l', long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[arg(short = 'b', long, value_name = "STRING", allow_hyphen_values = true)]
    pub block_start_string: Option<String>,

    #[arg(short = 'B', long, value_name = "STRING", allow_hyphen_values = true)]
    pub block_end_string: Option<String>,

    #[arg(short = 'c', long, value_name = "STRING", allow_hyphen_values = true)]
    pub comment_start_string: Option<String>,

    #[arg(short = 'C', long, value_name = "STRING", allow_hyphen_values = true)]
    pub comment_end_string: Option<String>,

    #[arg(short = 'e', long, value_name = "STRING", allow_hyphen_values = true)]
    pub expression_start_string: Option<String>,

    #[arg(short = 'E', long, value_name = "STRING", allow_hyphen_values = true)]
    pub expression_end_string: Option<String>,

    #[arg(short = 'L', long, value_name = "STRING", allow_hyphen_values = true)]
    pub line_statement_prefix: Option<String>,

    /// Set a value, e.g. `-V persons[0].surname Mario`. Repeatable; later
    /// values win.
    #[arg(
        short = 'V',
        long = "value",
        num_args = 2,
        value_names = ["PATH", "VALUE"],
        action = ArgAction::Append,
        allow_hyphen_values = true
    )]
    pub values: Vec<String>,
}

impl Cli {
    /// The `--value` pairs in the order they were given.
    pub fn value_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .chunks_exact(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
    }
}
