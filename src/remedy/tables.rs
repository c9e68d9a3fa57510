use std::{collections::BTreeMap, fs, path::Path};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::prelude::*;

const DEFAULT_TABLES: &str = include_str!("default_tables.toml");

static IDENT_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("Expected operation to succeed.")
});

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TablesFile {
	resolver: String,
	token_namespace: String,
	#[serde(default)]
	colors: BTreeMap<String, String>,
	#[serde(default)]
	alternates: BTreeMap<String, String>,
	#[serde(default)]
	fallbacks: BTreeMap<String, String>,
	helper: HelperFile,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HelperFile {
	declaration: String,
	init_marker: String,
}

/// Immutable lookup data shared by every session of a run.
///
/// Literal keys are stored normalized (see [`normalize_literal`]); tokens and fallback literals are
/// stored verbatim.
#[derive(Debug, Clone)]
pub(crate) struct Tables {
	colors: BTreeMap<String, String>,
	alternates: BTreeMap<String, String>,
	fallbacks: BTreeMap<String, String>,
	pub(crate) resolver: String,
	pub(crate) token_namespace: String,
	pub(crate) helper: HelperSettings,
}
impl Tables {
	pub(crate) fn builtin() -> Result<Self> {
		Self::from_toml(DEFAULT_TABLES)
			.map_err(|err| eyre::eyre!("Built-in tables are invalid: {err}"))
	}

	pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
		let Some(path) = path else {
			return Self::builtin();
		};
		let text = fs::read_to_string(path)
			.map_err(|err| eyre::eyre!("Failed to read tables {}: {err}.", path.display()))?;

		Self::from_toml(&text).map_err(|err| eyre::eyre!("Invalid tables {}: {err}", path.display()))
	}

	pub(crate) fn from_toml(text: &str) -> Result<Self> {
		let file = toml::from_str::<TablesFile>(text)?;

		if !IDENT_RE.is_match(&file.resolver) {
			return Err(eyre::eyre!("Resolver name {:?} is not an identifier.", file.resolver));
		}
		if !IDENT_RE.is_match(&file.token_namespace) {
			return Err(eyre::eyre!(
				"Token namespace {:?} is not an identifier.",
				file.token_namespace
			));
		}
		if file.helper.declaration.trim().is_empty() {
			return Err(eyre::eyre!("Helper declaration must not be empty."));
		}

		let mut colors = BTreeMap::new();

		for (literal, token) in file.colors {
			check_token(&token)?;
			check_fallback(&literal)?;

			let key = normalize_literal(&literal);

			if colors.insert(key, token).is_some() {
				return Err(eyre::eyre!("Color literal {literal:?} is declared twice."));
			}
		}

		let mut alternates = BTreeMap::new();

		for (alternate, primary) in file.alternates {
			let primary_key = normalize_literal(&primary);

			if !colors.contains_key(&primary_key) {
				return Err(eyre::eyre!(
					"Alternate {alternate:?} translates to {primary:?}, which has no color entry."
				));
			}
			if alternates.insert(normalize_literal(&alternate), primary_key).is_some() {
				return Err(eyre::eyre!("Alternate literal {alternate:?} is declared twice."));
			}
		}

		for (token, fallback) in &file.fallbacks {
			check_token(token)?;
			check_fallback(fallback)?;
		}

		Ok(Self {
			colors,
			alternates,
			fallbacks: file.fallbacks,
			resolver: file.resolver,
			token_namespace: file.token_namespace,
			helper: HelperSettings {
				declaration: file.helper.declaration,
				init_marker: file.helper.init_marker,
			},
		})
	}

	/// Maps a literal from either family to its token.
	///
	/// Alternate literals only resolve through an exact entry in the alternates table.
	pub(crate) fn resolve_token(&self, literal: &str) -> Option<&str> {
		let key = normalize_literal(literal);

		if let Some(token) = self.colors.get(&key) {
			return Some(token);
		}

		self.alternates.get(&key).and_then(|primary| self.colors.get(primary)).map(String::as_str)
	}

	pub(crate) fn fallback_for(&self, token: &str) -> Option<&str> {
		self.fallbacks.get(token).map(String::as_str)
	}

	pub(crate) fn resolver_call(&self, token: &str, fallback: &str) -> String {
		format!("{}('{token}', '{fallback}')", self.resolver)
	}

	pub(crate) fn listing(&self) -> Vec<String> {
		let mut out = Vec::new();

		out.push(format!("resolver\t{}", self.resolver));
		out.push(format!("namespace\t{}", self.token_namespace));

		for (literal, token) in &self.colors {
			out.push(format!("color\t{literal}\t{token}"));
		}
		for (alternate, primary) in &self.alternates {
			out.push(format!("alternate\t{alternate}\t{primary}"));
		}
		for (token, fallback) in &self.fallbacks {
			out.push(format!("fallback\t{token}\t{fallback}"));
		}

		out
	}
}

#[derive(Debug, Clone)]
pub(crate) struct HelperSettings {
	pub(crate) declaration: String,
	pub(crate) init_marker: String,
}

/// Lower-cases and strips whitespace so `rgb(16, 185, 129)` and `RGB(16,185,129)` share a key.
pub(crate) fn normalize_literal(literal: &str) -> String {
	literal.chars().filter(|ch| !ch.is_whitespace()).flat_map(char::to_lowercase).collect()
}

fn check_token(token: &str) -> Result<()> {
	if IDENT_RE.is_match(token) {
		Ok(())
	} else {
		Err(eyre::eyre!("Token {token:?} is not an identifier."))
	}
}

fn check_fallback(literal: &str) -> Result<()> {
	if literal.is_empty() || literal.contains(['\'', '"', '`', '\\', '\n']) {
		Err(eyre::eyre!("Literal {literal:?} cannot be embedded in a resolver call."))
	} else {
		Ok(())
	}
}

#[cfg(test)]
pub(crate) fn sample_tables() -> Tables {
	Tables::from_toml(
		r##"
resolver = "tokenColor"
token_namespace = "tokens"

[colors]
"#10b981" = "TONE_A"
"#3b82f6" = "TONE_B"

[alternates]
"rgb(16, 185, 129)" = "#10b981"

[fallbacks]
TONE_A = "#10b981"
TONE_B = "#3b82f6"

[helper]
declaration = "const tokenColor = (name, fallback) => fallback;"
init_marker = "DOMContentLoaded"
"##,
	)
	.expect("sample tables")
}
