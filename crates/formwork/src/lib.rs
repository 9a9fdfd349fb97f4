//! # Formwork
//!
//! The `formwork` command line tool as a library: argument parsing
//! ([`cli::Cli`]), layered configuration ([`config::Settings`]), logger
//! setup and the run pipeline ([`app::run`]).
//!
//! ```rust,no_run
//! use clap::Parser;
//! use formwork::{app, cli::Cli};
//!
//! let cli = Cli::parse_from([
//!     "formwork",
//!     "--config-file",
//!     "config.toml",
//!     "--write-on-stdout",
//!     "Hello {{ model.name }}!",
//! ]);
//! app::run(&cli, &mut std::io::stdout())?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Rendering itself lives in [`formwork_render`].

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;

pub use app::{run, Outcome, PROGRAM_VERSION};
pub use cli::Cli;
pub use config::{ConfigError, ConfigFile, Settings};
