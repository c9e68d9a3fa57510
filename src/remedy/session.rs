use std::{cmp::Reverse, path::PathBuf};

use super::{
	feed::Violation,
	helper,
	report::{ManualItem, ManualReason},
	strategy::{StrategyLibrary, Unfixable},
	tables::Tables,
};

/// Exclusive owner of one file's line buffer for the duration of a run.
///
/// Fixes are same-line substitutions, so the buffer length never changes.
#[derive(Debug)]
pub(crate) struct FileEditSession {
	path: PathBuf,
	lines: Vec<String>,
	pending: Vec<Violation>,
	needs_helper: bool,
	fixed_count: usize,
	manual_items: Vec<ManualItem>,
}
impl FileEditSession {
	pub(crate) fn new(path: PathBuf, text: &str, mut violations: Vec<Violation>) -> Self {
		violations.sort_by_key(|violation| Reverse(violation.line));

		Self {
			path,
			lines: text.split('\n').map(ToOwned::to_owned).collect(),
			pending: violations,
			needs_helper: false,
			fixed_count: 0,
			manual_items: Vec::new(),
		}
	}

	/// Order in which violations will be visited: bottom of the file first.
	#[cfg(test)]
	pub(crate) fn processing_order(&self) -> Vec<usize> {
		self.pending.iter().map(|violation| violation.line).collect()
	}

	pub(crate) fn run(mut self, library: &StrategyLibrary, tables: &Tables) -> SessionOutcome {
		let line_count = self.line_count();

		for violation in std::mem::take(&mut self.pending) {
			if violation.line > line_count {
				self.manual_items.push(ManualItem::new(&violation, ManualReason::LineOutOfRange));

				continue;
			}

			let idx = violation.line - 1;

			match library.attempt_fix(&self.lines[idx], &violation, tables) {
				Ok(rewritten) => {
					self.lines[idx] = rewritten;
					self.fixed_count += 1;
				},
				Err(Unfixable::UnresolvedToken) => self
					.manual_items
					.push(ManualItem::new(&violation, ManualReason::UnresolvedToken)),
				Err(Unfixable::NoStrategyMatch) => self
					.manual_items
					.push(ManualItem::new(&violation, ManualReason::NoStrategyMatch)),
			}
		}

		let mutated_text = self.lines.join("\n");

		self.needs_helper =
			self.fixed_count > 0 && !helper::declares_helper(&mutated_text, &tables.resolver);

		tracing::debug!(
			file = %self.path.display(),
			fixed = self.fixed_count,
			manual = self.manual_items.len(),
			needs_helper = self.needs_helper,
			"Finished the edit session."
		);

		SessionOutcome {
			path: self.path,
			fixed_count: self.fixed_count,
			manual_items: self.manual_items,
			mutated_text,
			needs_helper: self.needs_helper,
		}
	}

	/// Lines as an editor numbers them; a trailing newline does not open another line.
	fn line_count(&self) -> usize {
		match self.lines.last() {
			Some(last) if last.is_empty() => self.lines.len() - 1,
			_ => self.lines.len(),
		}
	}
}

#[derive(Debug)]
pub(crate) struct SessionOutcome {
	pub(crate) path: PathBuf,
	pub(crate) fixed_count: usize,
	pub(crate) manual_items: Vec<ManualItem>,
	pub(crate) mutated_text: String,
	pub(crate) needs_helper: bool,
}
