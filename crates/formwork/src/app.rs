//! The run pipeline: resolve settings, build the context, render.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context as _;
use formwork_render::{DirectoryTemplater, WalkSummary};
use log::{debug, info};

use crate::cli::Cli;
use crate::config::{ConfigError, Settings};
use crate::logging;

/// Version reported by `--version` and exposed as `commons.program_version`.
pub const PROGRAM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `--version` was printed.
    Version,
    /// The rendered text was written to `out`.
    Printed,
    /// The rendered text was written to this file.
    Written(PathBuf),
    /// A directory tree was rendered.
    Directory(WalkSummary),
}

/// Runs the command described by `cli`, printing to `out`.
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> anyhow::Result<Outcome> {
    if cli.version {
        writeln!(out, "{PROGRAM_VERSION}")?;
        return Ok(Outcome::Version);
    }

    let settings = Settings::resolve(cli)?;
    logging::init(settings.log_level);
    execute(&settings, out)
}

/// Renders according to already resolved `settings`.
pub fn execute<W: Write>(settings: &Settings, out: &mut W) -> anyhow::Result<Outcome> {
    debug!("format = {}", settings.format);
    debug!("syntax = {:?}", settings.syntax);
    debug!(
        "encodings = {} -> {}",
        settings.input_encoding, settings.output_encoding
    );

    let ctx = settings.build_context(PROGRAM_VERSION)?;
    debug!("values = {}", ctx.values.to_json());
    let mut formatter = settings.format.create();

    if let Some(source) = &settings.input_directory {
        let destination = settings
            .output_directory
            .as_ref()
            .ok_or(ConfigError::MissingOutputDirectory)?;
        let summary = DirectoryTemplater::new(&ctx, settings.directory_options())
            .run(source, destination, formatter.as_mut())
            .with_context(|| format!("failed to render directory {}", source.display()))?;
        info!(
            "{} directories, {} files rendered, {} files copied",
            summary.directories, summary.rendered, summary.copied
        );
        return Ok(Outcome::Directory(summary));
    }

    match &settings.template_string {
        Some(source) => {
            debug!("template string = {source}");
            formatter.init_string(source, &settings.syntax)?;
        }
        None => {
            info!("loading template file {}", settings.input_file.display());
            formatter.init_file(&settings.input_file, settings.input_encoding, &settings.syntax)?;
        }
    }
    let text = ctx.render(formatter.as_ref())?;
    formatter.reset();

    if settings.write_on_stdout {
        writeln!(out, "{text}")?;
        return Ok(Outcome::Printed);
    }

    let path = settings.output_path()?;
    info!("writing {}", path.display());
    settings
        .output_encoding
        .write_file(&path, &text)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(Outcome::Written(path))
}
