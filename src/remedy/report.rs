use std::{
	collections::BTreeMap,
	fmt::{self, Display, Formatter},
	fs,
	io::{self, Write},
	path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use super::feed::{RuleId, Violation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ManualReason {
	UnresolvedToken,
	NoStrategyMatch,
	LineOutOfRange,
	FileRead(String),
}
impl Display for ManualReason {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::UnresolvedToken => f.write_str("no table entry for the literal or token"),
			Self::NoStrategyMatch => f.write_str("no strategy matched the line"),
			Self::LineOutOfRange => f.write_str("line is past the end of the file"),
			Self::FileRead(err) => write!(f, "file could not be read: {err}"),
		}
	}
}

/// A violation left for a human, carried through to the report unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ManualItem {
	pub(crate) file: PathBuf,
	pub(crate) line: usize,
	pub(crate) rule: RuleId,
	pub(crate) message: String,
	pub(crate) reason: ManualReason,
}
impl ManualItem {
	pub(crate) fn new(violation: &Violation, reason: ManualReason) -> Self {
		Self {
			file: violation.file.clone(),
			line: violation.line,
			rule: violation.rule.clone(),
			message: violation.message.clone(),
			reason,
		}
	}

	pub(crate) fn format(&self) -> String {
		format!("{}:{}  {}  {}", self.file.display(), self.line, self.rule, self.message)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Persistence {
	Unchanged,
	DryRun,
	Written,
	Failed(String),
}

/// Everything one file contributes to the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FileResult {
	pub(crate) path: PathBuf,
	pub(crate) fixed_count: usize,
	pub(crate) manual_items: Vec<ManualItem>,
	pub(crate) persistence: Persistence,
}

/// Fixes that were computed but could not be written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Unpersisted {
	pub(crate) path: PathBuf,
	pub(crate) fixed_count: usize,
	pub(crate) error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Report {
	pub(crate) total_fixed: usize,
	pub(crate) total_manual: usize,
	pub(crate) manual_items: Vec<ManualItem>,
	pub(crate) per_file_fixed: BTreeMap<PathBuf, usize>,
	pub(crate) unpersisted: Vec<Unpersisted>,
	pub(crate) written_files: usize,
}
impl Report {
	/// Order-independent reduction over finished files.
	pub(crate) fn aggregate(results: impl IntoIterator<Item = FileResult>) -> Self {
		let mut report = Self::default();

		for result in results {
			report.total_fixed += result.fixed_count;
			report.total_manual += result.manual_items.len();

			if result.fixed_count > 0 {
				*report.per_file_fixed.entry(result.path.clone()).or_default() +=
					result.fixed_count;
			}

			match result.persistence {
				Persistence::Written => report.written_files += 1,
				Persistence::Failed(error) => report.unpersisted.push(Unpersisted {
					path: result.path.clone(),
					fixed_count: result.fixed_count,
					error,
				}),
				Persistence::Unchanged | Persistence::DryRun => {},
			}

			report.manual_items.extend(result.manual_items);
		}

		report.manual_items.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));
		report.unpersisted.sort_by(|a, b| a.path.cmp(&b.path));

		report
	}

	pub(crate) fn render(&self, apply: bool) -> Vec<String> {
		let mut out = Vec::new();

		for (path, fixed) in &self.per_file_fixed {
			out.push(format!("{}: fixed {fixed}", path.display()));
		}

		out.push(format!("Fixed: {}", self.total_fixed));
		out.push(format!("Manual: {}", self.total_manual));
		out.extend(self.manual_items.iter().map(ManualItem::format));

		for entry in &self.unpersisted {
			out.push(format!(
				"Not persisted: {} ({} fix(es)): {}",
				entry.path.display(),
				entry.fixed_count,
				entry.error
			));
		}

		if !apply {
			out.push("Dry run; no files were written.".to_owned());
		}

		out
	}
}

/// Writes `updated` over `path` when applying and the content actually changed.
pub(crate) fn persist(path: &Path, original: &str, updated: &str, apply: bool) -> Persistence {
	if original == updated {
		return Persistence::Unchanged;
	}
	if !apply {
		return Persistence::DryRun;
	}

	match write_atomic(path, updated) {
		Ok(()) => {
			tracing::info!(file = %path.display(), "Wrote the remediated file.");

			Persistence::Written
		},
		Err(err) => {
			tracing::warn!(file = %path.display(), error = %err, "Failed to write the remediated file.");

			Persistence::Failed(err.to_string())
		},
	}
}

/// Replaces `path` in one rename; on any failure the original file is untouched.
fn write_atomic(path: &Path, text: &str) -> io::Result<()> {
	let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
	let mut tmp = NamedTempFile::new_in(dir)?;

	tmp.write_all(text.as_bytes())?;
	tmp.as_file().sync_all()?;

	if let Ok(metadata) = fs::metadata(path) {
		tmp.as_file().set_permissions(metadata.permissions())?;
	}

	tmp.persist(path).map_err(|err| err.error)?;

	Ok(())
}
