//! Diff rendering, reused in two places: the driver's `--verbose`
//! per-pass trace (§4.F) and the CLI's file-level change summary
//! (§4.J/§6).

use similar::{ChangeTag, TextDiff};
use std::fmt::Write;
use std::path::Path;

/// Unified diff between two strings, with no file header — used for
/// the driver's per-pass trace where there's no path to attach.
pub fn unified_diff_fragment(original: &str, modified: &str) -> String {
    let diff = TextDiff::from_lines(original, modified);
    let mut output = String::new();

    for (idx, group) in diff.grouped_ops(3).iter().enumerate() {
        if idx > 0 {
            writeln!(&mut output).unwrap();
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => "-",
                    ChangeTag::Insert => "+",
                    ChangeTag::Equal => " ",
                };
                write!(&mut output, "{}{}", sign, change.value()).unwrap();
            }
        }
    }

    output
}

/// Unified diff between two strings with `a/path` / `b/path` headers,
/// for the CLI's `--verbose` output.
pub fn unified_diff(original: &str, modified: &str, path: &Path) -> String {
    let mut output = format!("--- a/{}\n+++ b/{}\n", path.display(), path.display());
    output.push_str(&unified_diff_fragment(original, modified));
    output
}

/// Summary of insertions/deletions between two strings.
#[derive(Debug, Default)]
pub struct DiffSummary {
    pub insertions: usize,
    pub deletions: usize,
}

impl DiffSummary {
    pub fn from_diff(original: &str, modified: &str) -> Self {
        let diff = TextDiff::from_lines(original, modified);
        let mut insertions = 0;
        let mut deletions = 0;

        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => insertions += 1,
                ChangeTag::Delete => deletions += 1,
                ChangeTag::Equal => {}
            }
        }

        Self { insertions, deletions }
    }
}

impl std::fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} insertion(s), {} deletion(s)", self.insertions, self.deletions)
    }
}
