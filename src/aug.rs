//! Ingest: drive one `augtool` subprocess and parse its `print` output into
//! the flat (path, value) list the pipeline consumes.
//!
//! When a lens is named, augtool is started with `--noautoload` plus a
//! `--transform` for just that file; otherwise the stock autoload picks a
//! lens by filename. An optional `mv` renames the subtree before it is
//! printed, so emitted paths carry the caller's target prefix.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::Context;
use regex::Regex;

use crate::config::Options;

/// One (path, value) pair from the parser, in tree order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub value: Option<String>,
}

impl TreeEntry {
    pub fn new(path: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            path: path.into(),
            value: value.map(str::to_string),
        }
    }
}

/// Load `file` through augtool and return its subtree as entries.
///
/// # Errors
///
/// Returns an error when the file cannot be resolved, augtool cannot be
/// spawned or fails, or no lens produced any entries for the file.
pub fn read_tree(file: &Path, opts: &Options) -> anyhow::Result<Vec<TreeEntry>> {
    let file = std::fs::canonicalize(file)
        .with_context(|| format!("cannot read input file: {}", file.display()))?;
    let source = format!("/files{}", file.display());
    let root = opts.target.clone().unwrap_or_else(|| source.clone());

    let mut cmd = Command::new("augtool");
    for dir in &opts.lens_dirs {
        cmd.arg("--include").arg(dir);
    }
    if let Some(lens) = &opts.lens {
        cmd.arg("--noautoload");
        cmd.arg("--transform")
            .arg(format!("{lens} incl {}", file.display()));
    }
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut script = String::new();
    if opts.target.is_some() {
        script.push_str(&format!("mv {source} {root}\n"));
    }
    script.push_str(&format!("print {root}\n"));

    if opts.verbose {
        eprintln!("[augscript] reading {} via augtool", file.display());
        if let Some(lens) = &opts.lens {
            eprintln!("[augscript] using lens {lens}");
        }
    }

    let mut child = cmd
        .spawn()
        .context("failed to run augtool (is Augeas installed?)")?;
    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(script.as_bytes())
            .context("failed to send commands to augtool")?;
    }
    let output = child
        .wait_with_output()
        .context("failed to read augtool output")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("augtool failed: {}", stderr.trim());
    }

    let entries = parse_print_output(&String::from_utf8_lossy(&output.stdout), &root);
    if entries.is_empty() {
        anyhow::bail!(
            "no entries found under {root}; does any lens apply to {}?",
            file.display()
        );
    }
    Ok(entries)
}

/// Parse `print` output: one line per node, `PATH = "VALUE"` or a bare
/// `PATH` for null-valued nodes. Lines outside `root` are ignored.
///
/// Paths containing spaces are not resolvable from this format; config
/// trees do not produce them.
pub fn parse_print_output(output: &str, root: &str) -> Vec<TreeEntry> {
    let Ok(valued) = Regex::new(r#"^(/\S+) = "(.*)"$"#) else {
        return Vec::new();
    };
    let mut entries = Vec::new();
    for line in output.lines() {
        if !line.starts_with('/') {
            continue;
        }
        let entry = if let Some(caps) = valued.captures(line) {
            TreeEntry {
                path: caps[1].to_string(),
                value: Some(unescape(&caps[2])),
            }
        } else {
            TreeEntry {
                path: line.trim_end().to_string(),
                value: None,
            }
        };
        if entry.path == root || is_under(&entry.path, root) {
            entries.push(entry);
        }
    }
    entries
}

fn is_under(path: &str, root: &str) -> bool {
    path.len() > root.len() && path.starts_with(root) && path.as_bytes()[root.len()] == b'/'
}

/// Undo augtool's print escaping: `\"`, `\\`, `\n`, `\t`.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
