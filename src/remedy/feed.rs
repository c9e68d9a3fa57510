use std::{
	collections::BTreeMap,
	fmt::{self, Display, Formatter},
	path::PathBuf,
};

/// Linter category a violation belongs to; decides which strategies may fix it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum RuleId {
	HardcodedColor,
	TokenWithoutFallback,
	Other(String),
}
impl RuleId {
	pub(crate) fn parse(raw: &str) -> Self {
		match raw {
			"no-hardcoded-color" => Self::HardcodedColor,
			"token-without-fallback" => Self::TokenWithoutFallback,
			other => Self::Other(other.to_owned()),
		}
	}

	pub(crate) fn as_str(&self) -> &str {
		match self {
			Self::HardcodedColor => "no-hardcoded-color",
			Self::TokenWithoutFallback => "token-without-fallback",
			Self::Other(raw) => raw,
		}
	}
}
impl Display for RuleId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Violation {
	pub(crate) file: PathBuf,
	/// 1-based.
	pub(crate) line: usize,
	pub(crate) rule: RuleId,
	pub(crate) message: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum FeedError {
	#[error("missing `<file>:<line>` location")]
	MissingLocation,
	#[error("line number {0:?} is not a positive integer")]
	BadLineNumber(String),
	#[error("missing rule id")]
	MissingRule,
}

#[derive(Debug, Default)]
pub(crate) struct ParsedFeed {
	pub(crate) violations: Vec<Violation>,
	pub(crate) dropped: usize,
}

/// Parses `<file>:<line> <rule> <message...>` records, one per line.
///
/// Blank lines are skipped silently; malformed records are dropped with a warning.
pub(crate) fn parse_feed(text: &str) -> ParsedFeed {
	let mut parsed = ParsedFeed::default();

	for (idx, raw) in text.lines().enumerate() {
		if raw.trim().is_empty() {
			continue;
		}

		match parse_record(raw) {
			Ok(violation) => parsed.violations.push(violation),
			Err(err) => {
				tracing::warn!(
					feed_line = idx + 1,
					reason = %err,
					record = raw,
					"Dropped a malformed violation record."
				);

				parsed.dropped += 1;
			},
		}
	}

	parsed
}

pub(crate) fn parse_record(raw: &str) -> Result<Violation, FeedError> {
	let trimmed = raw.trim();
	let (location, rest) = split_field(trimmed);
	let Some((file, line)) = location.rsplit_once(':') else {
		return Err(FeedError::MissingLocation);
	};

	if file.is_empty() {
		return Err(FeedError::MissingLocation);
	}

	let line = match line.parse::<usize>() {
		Ok(line) if line > 0 => line,
		_ => return Err(FeedError::BadLineNumber(line.to_owned())),
	};
	let (rule, message) = split_field(rest);

	if rule.is_empty() {
		return Err(FeedError::MissingRule);
	}

	Ok(Violation {
		file: PathBuf::from(file),
		line,
		rule: RuleId::parse(rule),
		message: message.to_owned(),
	})
}

/// Groups violations by target file; each group keeps feed order.
pub(crate) fn group_by_file(violations: Vec<Violation>) -> BTreeMap<PathBuf, Vec<Violation>> {
	let mut grouped: BTreeMap<PathBuf, Vec<Violation>> = BTreeMap::new();

	for violation in violations {
		grouped.entry(violation.file.clone()).or_default().push(violation);
	}

	grouped
}

fn split_field(text: &str) -> (&str, &str) {
	match text.split_once(char::is_whitespace) {
		Some((head, tail)) => (head, tail.trim_start()),
		None => (text, ""),
	}
}
