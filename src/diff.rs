//! Line-level diff between a cached head file and the working tree
//!
//! Computes unified-style hunks from a longest-common-subsequence alignment
//! of the two line sequences. This path is independent of the binary
//! fingerprinting used for change detection: it exists so `relic diff <file>`
//! can show *what* changed, and it is only meaningful while the previous
//! content is still physically cached under the metadata directory — past
//! content is not reconstructible from the commit history.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Options controlling hunk generation
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Unchanged lines shown around each change
    pub context_lines: usize,
    /// Compare lines with surrounding whitespace trimmed
    pub ignore_whitespace: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        DiffOptions {
            context_lines: 3,
            ignore_whitespace: false,
        }
    }
}

/// A single line within a hunk
///
/// Line numbers are 1-based; context and removed lines carry the old-file
/// number, added lines the new-file number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineChange {
    /// Unchanged line shown for context
    Context(usize, String),
    /// Line present only in the old content
    Removed(usize, String),
    /// Line present only in the new content
    Added(usize, String),
}

/// A contiguous group of changes with surrounding context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffHunk {
    /// First old-file line covered (1-based)
    pub old_start: usize,
    /// Old-file lines covered
    pub old_count: usize,
    /// First new-file line covered (1-based)
    pub new_start: usize,
    /// New-file lines covered
    pub new_count: usize,
    /// Lines in the hunk, in order
    pub changes: Vec<LineChange>,
}

/// Line-level diff of one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiff {
    /// Tracked path the diff describes
    pub path: String,
    /// Whether either side looked binary (hunks suppressed)
    pub is_binary: bool,
    /// Hunks, empty when the contents are identical
    pub hunks: Vec<DiffHunk>,
    /// Total added lines across hunks
    pub lines_added: usize,
    /// Total removed lines across hunks
    pub lines_removed: usize,
}

impl FileDiff {
    /// Whether the two contents differ at all
    pub fn has_changes(&self) -> bool {
        self.is_binary || !self.hunks.is_empty()
    }

    /// Render the diff in unified format (`@@ -a,b +c,d @@` headers)
    pub fn to_unified(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "--- a/{}", self.path);
        let _ = writeln!(out, "+++ b/{}", self.path);
        if self.is_binary {
            let _ = writeln!(out, "Binary files differ");
            return out;
        }
        for hunk in &self.hunks {
            let _ = writeln!(
                out,
                "@@ -{},{} +{},{} @@",
                hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
            );
            for change in &hunk.changes {
                match change {
                    LineChange::Context(_, text) => {
                        let _ = writeln!(out, " {}", text);
                    }
                    LineChange::Removed(_, text) => {
                        let _ = writeln!(out, "-{}", text);
                    }
                    LineChange::Added(_, text) => {
                        let _ = writeln!(out, "+{}", text);
                    }
                }
            }
        }
        out
    }
}

/// One step of the line alignment
#[derive(Debug, Clone, Copy)]
enum LineOp {
    /// Same line on both sides: (old index, new index)
    Equal(usize, usize),
    /// Line removed from the old side
    Remove(usize),
    /// Line inserted on the new side
    Insert(usize),
}

/// Heuristic binary check: a NUL byte in the first 8KB
pub fn is_binary(content: &[u8]) -> bool {
    let probe = content.len().min(8192);
    content[..probe].contains(&0)
}

/// Build the line-level diff of one file's old and new content
pub fn file_diff(path: &str, old_content: &[u8], new_content: &[u8], options: &DiffOptions) -> FileDiff {
    if is_binary(old_content) || is_binary(new_content) {
        let differ = old_content != new_content;
        return FileDiff {
            path: path.to_string(),
            is_binary: differ,
            hunks: Vec::new(),
            lines_added: 0,
            lines_removed: 0,
        };
    }

    let hunks = compute_line_diff(old_content, new_content, options);
    let (mut added, mut removed) = (0, 0);
    for hunk in &hunks {
        for change in &hunk.changes {
            match change {
                LineChange::Added(_, _) => added += 1,
                LineChange::Removed(_, _) => removed += 1,
                LineChange::Context(_, _) => {}
            }
        }
    }

    FileDiff {
        path: path.to_string(),
        is_binary: false,
        hunks,
        lines_added: added,
        lines_removed: removed,
    }
}

/// Compute unified-style hunks between two text contents
pub fn compute_line_diff(old_content: &[u8], new_content: &[u8], options: &DiffOptions) -> Vec<DiffHunk> {
    let old_text = String::from_utf8_lossy(old_content);
    let new_text = String::from_utf8_lossy(new_content);
    let old_lines: Vec<&str> = old_text.lines().collect();
    let new_lines: Vec<&str> = new_text.lines().collect();

    let ops = align_lines(&old_lines, &new_lines, options.ignore_whitespace);
    build_hunks(&ops, &old_lines, &new_lines, options.context_lines)
}

fn lines_equal(a: &str, b: &str, ignore_whitespace: bool) -> bool {
    if ignore_whitespace {
        a.trim() == b.trim()
    } else {
        a == b
    }
}

/// Align two line sequences via an LCS table
fn align_lines(old_lines: &[&str], new_lines: &[&str], ignore_whitespace: bool) -> Vec<LineOp> {
    let m = old_lines.len();
    let n = new_lines.len();

    let mut table = vec![vec![0usize; n + 1]; m + 1];
    for i in (0..m).rev() {
        for j in (0..n).rev() {
            table[i][j] = if lines_equal(old_lines[i], new_lines[j], ignore_whitespace) {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(m.max(n));
    let (mut i, mut j) = (0, 0);
    while i < m && j < n {
        if lines_equal(old_lines[i], new_lines[j], ignore_whitespace) {
            ops.push(LineOp::Equal(i, j));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            ops.push(LineOp::Remove(i));
            i += 1;
        } else {
            ops.push(LineOp::Insert(j));
            j += 1;
        }
    }
    while i < m {
        ops.push(LineOp::Remove(i));
        i += 1;
    }
    while j < n {
        ops.push(LineOp::Insert(j));
        j += 1;
    }

    ops
}

/// Group alignment ops into hunks with `context` unchanged lines around each
fn build_hunks(
    ops: &[LineOp],
    old_lines: &[&str],
    new_lines: &[&str],
    context: usize,
) -> Vec<DiffHunk> {
    let change_indices: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| !matches!(op, LineOp::Equal(_, _)))
        .map(|(idx, _)| idx)
        .collect();

    if change_indices.is_empty() {
        return Vec::new();
    }

    // Positions of old/new cursors before each op, so a hunk starting at an
    // arbitrary op index knows its line numbers.
    let mut old_pos = Vec::with_capacity(ops.len() + 1);
    let mut new_pos = Vec::with_capacity(ops.len() + 1);
    let (mut oi, mut ni) = (0usize, 0usize);
    for op in ops {
        old_pos.push(oi);
        new_pos.push(ni);
        match op {
            LineOp::Equal(_, _) => {
                oi += 1;
                ni += 1;
            }
            LineOp::Remove(_) => oi += 1,
            LineOp::Insert(_) => ni += 1,
        }
    }
    old_pos.push(oi);
    new_pos.push(ni);

    // Merge change runs whose context windows touch or overlap.
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for &idx in &change_indices {
        let start = idx.saturating_sub(context);
        let end = (idx + context + 1).min(ops.len());
        match ranges.last_mut() {
            Some((_, prev_end)) if start <= *prev_end => *prev_end = end.max(*prev_end),
            _ => ranges.push((start, end)),
        }
    }

    let mut hunks = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        let mut changes = Vec::with_capacity(end - start);
        for op in &ops[start..end] {
            match op {
                LineOp::Equal(o, _) => {
                    changes.push(LineChange::Context(o + 1, old_lines[*o].to_string()));
                }
                LineOp::Remove(o) => {
                    changes.push(LineChange::Removed(o + 1, old_lines[*o].to_string()));
                }
                LineOp::Insert(n) => {
                    changes.push(LineChange::Added(n + 1, new_lines[*n].to_string()));
                }
            }
        }

        hunks.push(DiffHunk {
            old_start: old_pos[start] + 1,
            old_count: old_pos[end] - old_pos[start],
            new_start: new_pos[start] + 1,
            new_count: new_pos[end] - new_pos[start],
            changes,
        });
    }

    hunks
}
