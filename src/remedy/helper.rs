use once_cell::sync::Lazy;
use regex::Regex;

use super::tables::{HelperSettings, Tables};

/// Top of the file, used when no insertion rule applies.
const FALLBACK_LINE: usize = 0;

static DIRECTIVE_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r#"^\s*(?:'use strict'|"use strict")\s*;?\s*$"#)
		.expect("Expected operation to succeed.")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Insertion {
	/// 0-based index the declaration is inserted before.
	pub(crate) line: usize,
	pub(crate) indent: String,
	/// Separate the declaration from the code that follows with a blank line.
	pub(crate) pad_after: bool,
}

type InsertionRule = fn(&[&str], &HelperSettings) -> Option<Insertion>;

/// Tried in order; the first rule that returns a position wins.
const INSERTION_RULES: [(&str, InsertionRule); 2] =
	[("init-scope", after_init_marker), ("directive", after_directive)];

pub(crate) fn declares_helper(text: &str, resolver: &str) -> bool {
	let name = regex::escape(resolver);
	let pattern = format!(r"\bfunction\s+{name}\s*\(|\b(?:const|let|var)\s+{name}\s*=");

	match Regex::new(&pattern) {
		Ok(re) => re.is_match(text),
		Err(err) => {
			tracing::warn!(resolver, error = %err, "Could not build the helper pattern.");

			false
		},
	}
}

/// Returns `text` with the helper declared exactly once.
///
/// A text that already declares the helper comes back unchanged.
pub(crate) fn ensure_helper(text: &str, tables: &Tables) -> String {
	if declares_helper(text, &tables.resolver) {
		return text.to_owned();
	}

	let mut lines = text.split('\n').map(ToOwned::to_owned).collect::<Vec<_>>();
	let insertion = {
		let view = lines.iter().map(String::as_str).collect::<Vec<_>>();

		insertion_point(&view, &tables.helper)
	};
	let at = insertion.line.min(lines.len());
	let terminator = line_terminator(&lines, at);
	let mut block = tables
		.helper
		.declaration
		.lines()
		.map(|line| {
			if line.is_empty() {
				terminator.to_owned()
			} else {
				format!("{}{line}{terminator}", insertion.indent)
			}
		})
		.collect::<Vec<_>>();

	if insertion.pad_after {
		block.push(terminator.to_owned());
	}

	let tail = lines.split_off(at);

	lines.extend(block);
	lines.extend(tail);

	lines.join("\n")
}

pub(crate) fn insertion_point(lines: &[&str], settings: &HelperSettings) -> Insertion {
	for (name, rule) in INSERTION_RULES {
		if let Some(insertion) = rule(lines, settings) {
			tracing::debug!(rule = name, line = insertion.line, "Chose the helper insertion point.");

			return insertion;
		}
	}

	Insertion { line: FALLBACK_LINE, indent: String::new(), pad_after: true }
}

/// `"\r"` when the lines around the insertion point are CRLF-terminated.
fn line_terminator(lines: &[String], at: usize) -> &'static str {
	let neighbour = at.checked_sub(1).and_then(|idx| lines.get(idx)).or_else(|| lines.get(at));

	if neighbour.is_some_and(|line| line.ends_with('\r')) { "\r" } else { "" }
}

/// Just inside the first initialization scope, one level deeper than its opening line.
///
/// Only a line that mentions the marker and opens a block counts; one-line registrations such as
/// `addEventListener('DOMContentLoaded', init);` and comments do not.
fn after_init_marker(lines: &[&str], settings: &HelperSettings) -> Option<Insertion> {
	if settings.init_marker.is_empty() {
		return None;
	}

	let idx = lines.iter().position(|line| opens_init_scope(line, &settings.init_marker))?;
	let outer = leading_whitespace(lines[idx]);
	let inner = lines[idx + 1..]
		.iter()
		.find(|line| !line.trim().is_empty())
		.map(|line| leading_whitespace(line))
		.filter(|indent| indent.len() > outer.len())
		.map(ToOwned::to_owned)
		.unwrap_or_else(|| {
			let unit = if outer.contains('\t') { "\t" } else { "  " };

			format!("{outer}{unit}")
		});

	Some(Insertion { line: idx + 1, indent: inner, pad_after: false })
}

/// Below a leading `'use strict';` and the blank lines after it.
fn after_directive(lines: &[&str], _settings: &HelperSettings) -> Option<Insertion> {
	let idx = lines.iter().position(|line| !line.trim().is_empty())?;

	if !DIRECTIVE_RE.is_match(lines[idx]) {
		return None;
	}

	let mut at = idx + 1;

	while at < lines.len() && lines[at].trim().is_empty() && at + 1 < lines.len() {
		at += 1;
	}

	Some(Insertion {
		line: at,
		indent: leading_whitespace(lines[idx]).to_owned(),
		pad_after: true,
	})
}

fn opens_init_scope(line: &str, marker: &str) -> bool {
	let trimmed = line.trim();

	trimmed.contains(marker)
		&& trimmed.ends_with('{')
		&& !trimmed.starts_with("//")
		&& !trimmed.starts_with("/*")
		&& !trimmed.starts_with('*')
}

fn leading_whitespace(line: &str) -> &str {
	&line[..line.len() - line.trim_start().len()]
}
