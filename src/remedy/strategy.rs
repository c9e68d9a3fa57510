use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{
	feed::{RuleId, Violation},
	tables::{Tables, normalize_literal},
};
use crate::prelude::*;

static COLOR_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"(?i)#[0-9a-f]{3,8}\b|\brgba?\([^()]*\)").expect("Expected operation to succeed.")
});
static ATTR_TAIL_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(
		r#"(?i)(?:^|[^A-Za-z0-9_-])(?:color|background(?:-color)?|fill|stroke|stop-color|border(?:-[a-z]+)?(?:-color)?|outline(?:-color)?)\s*[:=]\s*["']?(?:[^;:"'`{}<>=]*\s)?$"#,
	)
	.expect("Expected operation to succeed.")
});

/// Why a violation could not be fixed mechanically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Unfixable {
	/// The line names a literal or token the tables do not cover.
	UnresolvedToken,
	/// Nothing in the line matched a strategy for the violation's rule.
	NoStrategyMatch,
}

/// A resolvable span of a line: the text at `range` becomes a resolver call for `token`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Site {
	pub(crate) range: Range<usize>,
	pub(crate) token: String,
	pub(crate) fallback: String,
}

/// One pattern-to-replacement rewrite.
///
/// Returns `None` when the pattern does not apply to `site`; never rewrites outside the site and
/// its immediate delimiters.
pub(crate) trait FixStrategy: Send + Sync {
	fn name(&self) -> &'static str;

	fn attempt(&self, line: &str, site: &Site, tables: &Tables) -> Option<String>;
}

/// `color: '#10b981'` -> `color: tokenColor('TONE_A', '#10b981')`.
#[derive(Debug)]
pub(crate) struct QuotedValue;
impl FixStrategy for QuotedValue {
	fn name(&self) -> &'static str {
		"quoted-value"
	}

	fn attempt(&self, line: &str, site: &Site, tables: &Tables) -> Option<String> {
		let Range { start, end } = site.range;
		let quote = line[..start].chars().next_back()?;

		if !matches!(quote, '\'' | '"') || line[end..].chars().next()? != quote {
			return None;
		}
		if lexical_context(line, start - 1) != Lexical::Code {
			return None;
		}

		let lead = line[..start - 1].trim_end();

		if lead.ends_with("==") || lead.ends_with("!=") {
			return None;
		}
		if !matches!(lead.chars().next_back()?, ':' | '=' | ',' | '(' | '[' | '?') {
			return None;
		}

		Some(splice(line, start - 1..end + 1, &tables.resolver_call(&site.token, &site.fallback)))
	}
}

/// `` `fill="#10b981"` `` -> `` `fill="${tokenColor('TONE_A', '#10b981')}"` ``.
#[derive(Debug)]
pub(crate) struct InterpolatedAttribute;
impl FixStrategy for InterpolatedAttribute {
	fn name(&self) -> &'static str {
		"interpolated-attribute"
	}

	fn attempt(&self, line: &str, site: &Site, tables: &Tables) -> Option<String> {
		if lexical_context(line, site.range.start) != Lexical::Template
			|| !ATTR_TAIL_RE.is_match(&line[..site.range.start])
		{
			return None;
		}

		Some(splice(line, site.range.clone(), &interpolated(tables, site)))
	}
}

/// A literal in template text on a line that already uses `${...}` becomes an interpolated
/// resolver call.
#[derive(Debug)]
pub(crate) struct ComposedInterpolation;
impl FixStrategy for ComposedInterpolation {
	fn name(&self) -> &'static str {
		"composed-interpolation"
	}

	fn attempt(&self, line: &str, site: &Site, tables: &Tables) -> Option<String> {
		if !line.contains("${") || lexical_context(line, site.range.start) != Lexical::Template {
			return None;
		}

		Some(splice(line, site.range.clone(), &interpolated(tables, site)))
	}
}

/// `tokens.TONE_A` -> `tokenColor('TONE_A', '#10b981')`.
#[derive(Debug)]
pub(crate) struct RawTokenReference;
impl FixStrategy for RawTokenReference {
	fn name(&self) -> &'static str {
		"raw-token-reference"
	}

	fn attempt(&self, line: &str, site: &Site, tables: &Tables) -> Option<String> {
		Some(splice(line, site.range.clone(), &tables.resolver_call(&site.token, &site.fallback)))
	}
}

/// Ordered strategies per rule; the first one that changes the line wins.
pub(crate) struct StrategyLibrary {
	literal: Vec<Box<dyn FixStrategy>>,
	token: Vec<Box<dyn FixStrategy>>,
	token_re: Regex,
}
impl StrategyLibrary {
	pub(crate) fn new(tables: &Tables) -> Result<Self> {
		let token_re = Regex::new(&format!(
			r"(?:^|[^A-Za-z0-9_$.])(?P<reference>{}\.(?P<token>[A-Za-z_$][A-Za-z0-9_$]*))",
			regex::escape(&tables.token_namespace)
		))?;

		Ok(Self {
			literal: vec![
				Box::new(QuotedValue),
				Box::new(InterpolatedAttribute),
				Box::new(ComposedInterpolation),
			],
			token: vec![Box::new(RawTokenReference)],
			token_re,
		})
	}

	pub(crate) fn attempt_fix(
		&self,
		line: &str,
		violation: &Violation,
		tables: &Tables,
	) -> Result<String, Unfixable> {
		let (strategies, sites) = match violation.rule {
			RuleId::HardcodedColor => (&self.literal, color_sites(line, violation, tables)),
			RuleId::TokenWithoutFallback => (&self.token, self.token_sites(line, tables)),
			RuleId::Other(_) => return Err(Unfixable::NoStrategyMatch),
		};
		let mut resolved_any = false;

		for site in sites.iter().flatten() {
			resolved_any = true;

			for strategy in strategies {
				let Some(rewritten) = strategy.attempt(line, site, tables) else {
					continue;
				};

				if rewritten != line {
					tracing::trace!(strategy = strategy.name(), token = %site.token, "Strategy rewrote the line.");

					return Ok(rewritten);
				}
			}
		}

		if !sites.is_empty() && !resolved_any {
			Err(Unfixable::UnresolvedToken)
		} else {
			Err(Unfixable::NoStrategyMatch)
		}
	}

	/// Raw token references outside resolver calls; `None` marks a token with no fallback entry.
	fn token_sites(&self, line: &str, tables: &Tables) -> Vec<Option<Site>> {
		let guarded = resolver_spans(line, &tables.resolver);

		self.token_re
			.captures_iter(line)
			.filter_map(|caps| {
				let reference = caps.name("reference")?;
				let token = caps.name("token")?.as_str();

				if within(&guarded, reference.start()) {
					return None;
				}

				Some(tables.fallback_for(token).map(|fallback| Site {
					range: reference.range(),
					token: token.to_owned(),
					fallback: fallback.to_owned(),
				}))
			})
			.collect()
	}
}

/// Color literals outside resolver calls, narrowed to the literal the message names, if any.
fn color_sites(line: &str, violation: &Violation, tables: &Tables) -> Vec<Option<Site>> {
	let guarded = resolver_spans(line, &tables.resolver);
	let named = COLOR_RE.find(&violation.message).map(|found| normalize_literal(found.as_str()));

	COLOR_RE
		.find_iter(line)
		.filter(|found| !within(&guarded, found.start()))
		.filter(|found| {
			named.as_ref().is_none_or(|named| *named == normalize_literal(found.as_str()))
		})
		.map(|found| {
			tables.resolve_token(found.as_str()).map(|token| Site {
				range: found.range(),
				token: token.to_owned(),
				fallback: found.as_str().to_owned(),
			})
		})
		.collect()
}

/// Byte spans of existing `<resolver>(...)` calls, so already-fixed text is never touched again.
pub(crate) fn resolver_spans(line: &str, resolver: &str) -> Vec<Range<usize>> {
	let needle = format!("{resolver}(");
	let bytes = line.as_bytes();
	let mut spans = Vec::new();
	let mut from = 0_usize;

	while let Some(offset) = line[from..].find(&needle) {
		let start = from + offset;
		let open = start + needle.len() - 1;

		from = open + 1;

		if start > 0 && is_ident_byte(bytes[start - 1]) {
			continue;
		}

		let end = matching_paren(bytes, open).map_or(line.len(), |close| close + 1);

		spans.push(start..end);

		from = end.max(from);
	}

	spans
}

fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
	let mut depth = 0_i32;
	let mut quote = None;

	for (idx, &byte) in bytes.iter().enumerate().skip(open) {
		if let Some(q) = quote {
			if byte == q && bytes[idx - 1] != b'\\' {
				quote = None;
			}

			continue;
		}

		match byte {
			b'\'' | b'"' | b'`' => quote = Some(byte),
			b'(' => depth += 1,
			b')' => {
				depth -= 1;

				if depth == 0 {
					return Some(idx);
				}
			},
			_ => {},
		}
	}

	None
}

fn is_ident_byte(byte: u8) -> bool {
	byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'$' | b'.')
}

fn within(spans: &[Range<usize>], offset: usize) -> bool {
	spans.iter().any(|span| span.contains(&offset))
}

/// What kind of text the byte at `offset` belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lexical {
	Code,
	Quoted,
	Template,
	Comment,
}

#[derive(Debug, Clone, Copy)]
enum Frame {
	/// Plain code, or the inside of a `${ }` placeholder; `depth` counts open braces.
	Code { depth: usize },
	Template,
}

/// Single-line scan tracking quotes, template literals and `${ }` nesting.
pub(crate) fn lexical_context(line: &str, offset: usize) -> Lexical {
	let bytes = line.as_bytes();
	let mut frames = vec![Frame::Code { depth: 0 }];
	let mut quote = None;
	let mut idx = 0_usize;

	while idx < offset.min(bytes.len()) {
		let byte = bytes[idx];

		if let Some(open) = quote {
			if byte == b'\\' {
				idx += 2;

				continue;
			}
			if byte == open {
				quote = None;
			}

			idx += 1;

			continue;
		}

		match frames.last().copied() {
			Some(Frame::Template) => match byte {
				b'\\' => {
					idx += 2;

					continue;
				},
				b'`' => {
					frames.pop();
				},
				b'$' if bytes.get(idx + 1) == Some(&b'{') => {
					frames.push(Frame::Code { depth: 0 });

					idx += 2;

					continue;
				},
				_ => {},
			},
			Some(Frame::Code { depth }) => match byte {
				b'\'' | b'"' => quote = Some(byte),
				b'`' => frames.push(Frame::Template),
				b'/' if bytes.get(idx + 1) == Some(&b'/') => return Lexical::Comment,
				b'{' => set_depth(&mut frames, depth + 1),
				b'}' if depth > 0 => set_depth(&mut frames, depth - 1),
				// Closes a `${` placeholder; a stray brace in the outermost code is ignored.
				b'}' if frames.len() > 1 => {
					frames.pop();
				},
				_ => {},
			},
			None => break,
		}

		idx += 1;
	}

	if quote.is_some() {
		return Lexical::Quoted;
	}

	match frames.last() {
		Some(Frame::Template) => Lexical::Template,
		_ => Lexical::Code,
	}
}

fn set_depth(frames: &mut [Frame], depth: usize) {
	if let Some(top) = frames.last_mut() {
		*top = Frame::Code { depth };
	}
}

fn interpolated(tables: &Tables, site: &Site) -> String {
	format!("${{{}}}", tables.resolver_call(&site.token, &site.fallback))
}

fn splice(line: &str, range: Range<usize>, replacement: &str) -> String {
	let mut out = String::with_capacity(line.len() + replacement.len());

	out.push_str(&line[..range.start]);
	out.push_str(replacement);
	out.push_str(&line[range.end..]);

	out
}
