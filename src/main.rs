//! Mechanical remediation of hard-coded color literals reported by the site linter.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

mod cli;
mod remedy;

mod prelude {
	pub use color_eyre::{Result, eyre};
}

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

const DEFAULT_LOG_FILTER: &str = "warn";

fn init_tracing() {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> ExitCode {
	if let Err(err) = color_eyre::install() {
		eprintln!("Failed to initialize error reporter: {err}.");

		return ExitCode::FAILURE;
	}

	init_tracing();

	match Cli::parse().run() {
		Ok(code) => code,
		Err(err) => {
			eprintln!("{err:?}");

			ExitCode::FAILURE
		},
	}
}
