// crates.io
use clap::{
	Parser, Subcommand,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};

// std
use std::{
	fs,
	io::{self, Read},
	path::{Path, PathBuf},
	process::ExitCode,
};

// self
use crate::{
	prelude::*,
	remedy::{self, Report, RunOptions, Tables},
};

/// Command-line interface for the token remediation tool.
#[derive(Debug, Parser)]
#[command(
	version = concat!(
		env!("CARGO_PKG_VERSION"),
		"-",
		env!("VERGEN_GIT_SHA"),
		"-",
		env!("VERGEN_CARGO_TARGET_TRIPLE"),
	),
	rename_all = "kebab",
	styles = styles(),
)]
pub(crate) struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Fix the violations listed in a linter feed. Dry-run unless `--apply` is given.
	Fix {
		/// Violation feed, one `<file>:<line> <rule> <message>` record per line. `-` reads stdin.
		#[arg(default_value = "-")]
		feed: PathBuf,
		/// Write changed files back to disk.
		#[arg(long)]
		apply: bool,
		/// Directory the feed's file paths are relative to.
		#[arg(long, default_value = ".")]
		root: PathBuf,
		/// TOML mapping tables replacing the built-in palette.
		#[arg(long)]
		tables: Option<PathBuf>,
	},
	/// Print the effective mapping tables.
	Tables {
		/// TOML mapping tables replacing the built-in palette.
		#[arg(long)]
		tables: Option<PathBuf>,
	},
}

impl Cli {
	pub(crate) fn run(&self) -> Result<ExitCode> {
		match &self.command {
			Command::Fix { feed, apply, root, tables } => {
				let tables = Tables::load(tables.as_deref())?;
				let feed_text = read_feed(feed)?;
				let options = RunOptions { apply: *apply, root: root.clone() };
				let report = remedy::run_feed(&feed_text, &tables, &options)?;

				print_report(&report, *apply);
			},
			Command::Tables { tables } => remedy::print_tables(&Tables::load(tables.as_deref())?),
		}

		// Manual items are an expected outcome, not a failure.
		Ok(ExitCode::SUCCESS)
	}
}

fn read_feed(path: &Path) -> Result<String> {
	if path == Path::new("-") {
		let mut text = String::new();

		io::stdin()
			.read_to_string(&mut text)
			.map_err(|err| eyre::eyre!("Failed to read the violation feed from stdin: {err}."))?;

		return Ok(text);
	}

	fs::read_to_string(path)
		.map_err(|err| eyre::eyre!("Failed to read the violation feed {}: {err}.", path.display()))
}

fn print_report(report: &Report, apply: bool) {
	for item in &report.manual_items {
		tracing::debug!(
			file = %item.file.display(),
			line = item.line,
			reason = %item.reason,
			"Left a violation for manual remediation."
		);
	}

	tracing::info!(
		fixed = report.total_fixed,
		manual = report.total_manual,
		written = report.written_files,
		"Finished the remediation run."
	);

	for line in report.render(apply) {
		println!("{line}");
	}
}

fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}
