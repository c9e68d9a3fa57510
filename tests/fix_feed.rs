use std::{
	fs,
	io::Write,
	path::{Path, PathBuf},
	process::{Command, Output, Stdio},
	time::{SystemTime, UNIX_EPOCH},
};

const CHART: &str = r#"'use strict';

document.addEventListener('DOMContentLoaded', () => {
	const series = { color: '#10b981', width: 2 };
	const legend = `<span style="color: #3b82f6">${label}</span>`;
	const odd = '#000abc';
	bar.style.background = tokens.TONE_D;
});
"#;

const FEED: &str = "\
chart.js:4 no-hardcoded-color Literal #10b981 should be a token.
chart.js:5 no-hardcoded-color Literal #3b82f6 should be a token.
chart.js:6 no-hardcoded-color Literal #000abc should be a token.
chart.js:7 token-without-fallback Token reference needs a fallback.
this line is not a record
missing.js:3 no-hardcoded-color Literal #10b981 should be a token.
";

fn create_site_root(tag: &str) -> PathBuf {
	let stamp = SystemTime::now().duration_since(UNIX_EPOCH).expect("Clock.").as_nanos();
	let root = std::env::temp_dir().join(format!("token-remedy-{tag}-{stamp}"));
	let _ = fs::remove_dir_all(&root);

	fs::create_dir_all(&root).expect("Create root.");
	fs::write(root.join("chart.js"), CHART).expect("Write chart.");
	fs::write(root.join("lint.txt"), FEED).expect("Write feed.");

	root
}

fn run_fix(root: &Path, apply: bool) -> Output {
	let mut cmd = Command::new(env!("CARGO_BIN_EXE_token-remedy"));

	cmd.current_dir(root).args(["fix", "lint.txt"]);

	if apply {
		cmd.arg("--apply");
	}

	cmd.output().expect("run token-remedy")
}

#[test]
fn apply_rewrites_fixable_lines_and_reports_the_rest() {
	let root = create_site_root("apply");
	let output = run_fix(&root, true);
	let stdout = String::from_utf8_lossy(&output.stdout);
	let rewritten = fs::read_to_string(root.join("chart.js")).expect("read chart");

	assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
	assert!(stdout.contains("chart.js: fixed 3"));
	assert!(stdout.contains("Fixed: 3"));
	assert!(stdout.contains("Manual: 2"));
	assert!(stdout.contains("chart.js:6  no-hardcoded-color  Literal #000abc should be a token."));
	assert!(stdout.contains("missing.js:3  no-hardcoded-color  Literal #10b981 should be a token."));
	assert!(!stdout.contains("Dry run"));

	assert!(rewritten.contains("const series = { color: tokenColor('TONE_A', '#10b981'), width: 2 };"));
	assert!(rewritten.contains(
		"const legend = `<span style=\"color: ${tokenColor('TONE_B', '#3b82f6')}\">${label}</span>`;"
	));
	assert!(rewritten.contains("const odd = '#000abc';"));
	assert!(rewritten.contains("bar.style.background = tokenColor('TONE_D', '#f59e0b');"));
	assert!(rewritten.contains(
		"document.addEventListener('DOMContentLoaded', () => {\n\tconst tokenColor = (name, fallback) =>"
	));
	assert_eq!(rewritten.matches("const tokenColor =").count(), 1);
	assert_eq!(rewritten.lines().count(), CHART.lines().count() + 1);

	let _ = fs::remove_dir_all(&root);
}

#[test]
fn dry_run_leaves_files_untouched() {
	let root = create_site_root("dry-run");
	let output = run_fix(&root, false);
	let stdout = String::from_utf8_lossy(&output.stdout);

	assert!(output.status.success());
	assert!(stdout.contains("Fixed: 3"));
	assert!(stdout.contains("Dry run; no files were written."));
	assert_eq!(fs::read_to_string(root.join("chart.js")).expect("read chart"), CHART);

	let _ = fs::remove_dir_all(&root);
}

#[test]
fn second_apply_converges() {
	let root = create_site_root("converge");

	assert!(run_fix(&root, true).status.success());

	let first = fs::read_to_string(root.join("chart.js")).expect("read chart");
	let output = run_fix(&root, true);
	let second = fs::read_to_string(root.join("chart.js")).expect("read chart");

	assert!(output.status.success());
	assert!(String::from_utf8_lossy(&output.stdout).contains("Fixed: 0"));
	assert_eq!(first, second);

	let _ = fs::remove_dir_all(&root);
}

#[test]
fn feed_from_stdin_is_accepted() {
	let root = create_site_root("stdin");
	let mut child = Command::new(env!("CARGO_BIN_EXE_token-remedy"))
		.current_dir(&root)
		.arg("fix")
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.spawn()
		.expect("spawn token-remedy");

	child
		.stdin
		.take()
		.expect("stdin")
		.write_all(b"chart.js:4 no-hardcoded-color Literal #10b981.\n")
		.expect("write feed");

	let output = child.wait_with_output().expect("wait");
	let stdout = String::from_utf8_lossy(&output.stdout);

	assert!(output.status.success());
	assert!(stdout.contains("Fixed: 1"));
	assert!(stdout.contains("Manual: 0"));

	let _ = fs::remove_dir_all(&root);
}

#[test]
fn unreadable_feed_fails_the_run() {
	let root = create_site_root("no-feed");
	let output = Command::new(env!("CARGO_BIN_EXE_token-remedy"))
		.current_dir(&root)
		.args(["fix", "absent.txt", "--apply"])
		.output()
		.expect("run token-remedy");

	assert!(!output.status.success());
	assert_eq!(fs::read_to_string(root.join("chart.js")).expect("read chart"), CHART);

	let _ = fs::remove_dir_all(&root);
}

#[test]
fn custom_tables_replace_the_builtin_palette() {
	let root = create_site_root("tables");

	fs::write(
		root.join("palette.toml"),
		r##"
resolver = "themeColor"
token_namespace = "palette"

[colors]
"#000abc" = "DEEP"

[helper]
declaration = "function themeColor(name, fallback) { return fallback; }"
init_marker = "DOMContentLoaded"
"##,
	)
	.expect("Write palette.");

	let output = Command::new(env!("CARGO_BIN_EXE_token-remedy"))
		.current_dir(&root)
		.args(["fix", "lint.txt", "--apply", "--tables", "palette.toml"])
		.output()
		.expect("run token-remedy");
	let rewritten = fs::read_to_string(root.join("chart.js")).expect("read chart");

	assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
	assert!(rewritten.contains("const odd = themeColor('DEEP', '#000abc');"));
	assert!(rewritten.contains("const series = { color: '#10b981', width: 2 };"));
	assert!(rewritten.contains("\tfunction themeColor(name, fallback) { return fallback; }"));

	let _ = fs::remove_dir_all(&root);
}

#[test]
fn tables_subcommand_lists_entries() {
	let output = Command::new(env!("CARGO_BIN_EXE_token-remedy"))
		.arg("tables")
		.output()
		.expect("run token-remedy");
	let stdout = String::from_utf8_lossy(&output.stdout);

	assert!(output.status.success());
	assert!(stdout.contains("color\t#10b981\tTONE_A"));
	assert!(stdout.contains("alternate\trgb(16,185,129)\t#10b981"));
	assert!(stdout.contains("fallback\tTONE_A\t#10b981"));
}
