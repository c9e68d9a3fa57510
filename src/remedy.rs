mod feed;
mod helper;
mod report;
mod session;
mod strategy;
mod tables;

pub(crate) use report::Report;
pub(crate) use tables::Tables;

use std::{
	fs,
	path::{Path, PathBuf},
};

use rayon::prelude::*;

use crate::prelude::*;
use feed::Violation;
use report::{FileResult, ManualItem, ManualReason, Persistence};
use session::FileEditSession;
use strategy::StrategyLibrary;

const FILE_BATCH_SIZE: usize = 64;

#[derive(Debug, Clone)]
pub(crate) struct RunOptions {
	/// Write changed files back; otherwise only report.
	pub(crate) apply: bool,
	/// Directory the feed's file paths are relative to.
	pub(crate) root: PathBuf,
}

/// Remediates every file named in `feed_text` and returns the aggregated report.
pub(crate) fn run_feed(feed_text: &str, tables: &Tables, options: &RunOptions) -> Result<Report> {
	let parsed = feed::parse_feed(feed_text);

	if parsed.dropped > 0 {
		tracing::warn!(dropped = parsed.dropped, "Some feed records were malformed and skipped.");
	}

	let library = StrategyLibrary::new(tables)?;
	let groups = feed::group_by_file(parsed.violations).into_iter().collect::<Vec<_>>();
	let mut results = Vec::with_capacity(groups.len());

	for batch in groups.chunks(FILE_BATCH_SIZE) {
		let outcomes = batch
			.par_iter()
			.map(|(path, violations)| {
				remediate_file(path, violations.clone(), &library, tables, options)
			})
			.collect::<Vec<_>>();

		results.extend(outcomes);
	}

	Ok(Report::aggregate(results))
}

pub(crate) fn print_tables(tables: &Tables) {
	for line in tables.listing() {
		println!("{line}");
	}
}

fn remediate_file(
	path: &Path,
	violations: Vec<Violation>,
	library: &StrategyLibrary,
	tables: &Tables,
	options: &RunOptions,
) -> FileResult {
	let target = options.root.join(path);
	let original = match fs::read_to_string(&target) {
		Ok(text) => text,
		Err(err) => {
			tracing::warn!(file = %target.display(), error = %err, "Could not read a target file.");

			let reason = ManualReason::FileRead(err.to_string());

			return FileResult {
				path: path.to_path_buf(),
				fixed_count: 0,
				manual_items: violations
					.iter()
					.map(|violation| ManualItem::new(violation, reason.clone()))
					.collect(),
				persistence: Persistence::Unchanged,
			};
		},
	};
	let outcome = FileEditSession::new(path.to_path_buf(), &original, violations).run(library, tables);
	let final_text = if outcome.needs_helper {
		helper::ensure_helper(&outcome.mutated_text, tables)
	} else {
		outcome.mutated_text
	};

	FileResult {
		path: outcome.path,
		fixed_count: outcome.fixed_count,
		manual_items: outcome.manual_items,
		persistence: report::persist(&target, &original, &final_text, options.apply),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const PAGE: &str = "'use strict';\n\nconst palette = {\n  good: '#10b981',\n  odd: '#000abc',\n};\n";

	fn setup() -> (tempfile::TempDir, RunOptions) {
		let dir = tempfile::tempdir().expect("tempdir");

		fs::write(dir.path().join("page.js"), PAGE).expect("seed page");

		let options = RunOptions { apply: true, root: dir.path().to_path_buf() };

		(dir, options)
	}

	fn feed() -> &'static str {
		"page.js:4 no-hardcoded-color Use a token.\npage.js:5 no-hardcoded-color Use a token.\n"
	}

	#[test]
	fn apply_rewrites_file_and_injects_helper() {
		let (dir, options) = setup();
		let tables = Tables::builtin().expect("tables");
		let report = run_feed(feed(), &tables, &options).expect("run");
		let written = fs::read_to_string(dir.path().join("page.js")).expect("read back");

		assert_eq!(report.total_fixed, 1);
		assert_eq!(report.total_manual, 1);
		assert_eq!(report.manual_items[0].line, 5);
		assert!(written.contains("  good: tokenColor('TONE_A', '#10b981'),"));
		assert!(written.contains("  odd: '#000abc',"));
		assert_eq!(written.matches("const tokenColor =").count(), 1);
		assert!(written.starts_with("'use strict';\n\nconst tokenColor ="));
	}

	#[test]
	fn dry_run_reports_without_writing() {
		let (dir, mut options) = setup();
		let tables = Tables::builtin().expect("tables");

		options.apply = false;

		let report = run_feed(feed(), &tables, &options).expect("run");

		assert_eq!(report.total_fixed, 1);
		assert_eq!(report.written_files, 0);
		assert_eq!(fs::read_to_string(dir.path().join("page.js")).expect("read back"), PAGE);
	}

	#[test]
	fn second_run_converges() {
		let (dir, options) = setup();
		let tables = Tables::builtin().expect("tables");

		run_feed(feed(), &tables, &options).expect("first run");

		let first = fs::read_to_string(dir.path().join("page.js")).expect("read back");
		let report = run_feed(feed(), &tables, &options).expect("second run");
		let second = fs::read_to_string(dir.path().join("page.js")).expect("read back");

		assert_eq!(report.total_fixed, 0);
		assert_eq!(report.written_files, 0);
		assert_eq!(first, second);
	}

	#[test]
	fn missing_file_becomes_manual_items() {
		let (_dir, options) = setup();
		let tables = Tables::builtin().expect("tables");
		let report =
			run_feed("gone.js:1 no-hardcoded-color x\ngone.js:2 no-hardcoded-color y\n", &tables, &options)
				.expect("run");

		assert_eq!(report.total_manual, 2);
		assert!(
			report
				.manual_items
				.iter()
				.all(|item| matches!(item.reason, ManualReason::FileRead(_)))
		);
	}
}
