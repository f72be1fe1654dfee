//! Ignore rules deciding which paths are tracked
//!
//! A path is excluded from tracking when it matches any rule. Rules come from
//! two sources: the built-in defaults below (version-control metadata, OS and
//! IDE artifacts, common dependency/build directories, and Relic's own
//! metadata), and the repository-local `.relicignore` file, whose rules are
//! appended after the defaults.
//!
//! Rules are purely exclusionary: there is no negation syntax, so a path
//! matching *any* pattern is ignored and rule ordering can never change the
//! outcome. A pattern with invalid glob syntax degrades to a literal match on
//! the normalized relative path; it is never a fatal error.
//!
//! Pattern semantics:
//! - `dir/` matches the directory and everything beneath it (the scanner
//!   prunes the whole subtree without descending)
//! - a bare name (no `/`) matches at any depth (`.DS_Store` matches
//!   `sub/.DS_Store`)
//! - a pattern containing `/` is anchored at the repository root

use crate::error::{Result, RelicError};
use crate::utils;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Name of the repository-local ignore file
pub const IGNORE_FILE: &str = ".relicignore";

/// Built-in rules that always apply, before any user rules
pub const DEFAULT_IGNORES: &[&str] = &[
    // Version control metadata
    ".git/",
    ".hg/",
    ".svn/",
    ".gitignore",
    ".gitmodules",
    // Relic internals
    ".relic/",
    ".relicignore",
    // Node / frontend build output
    "node_modules/",
    "dist/",
    "build/",
    "out/",
    ".next/",
    ".cache/",
    // Python
    "__pycache__/",
    "*.pyc",
    "*.pyo",
    ".venv/",
    "venv/",
    ".pytest_cache/",
    ".mypy_cache/",
    // JVM
    "target/",
    ".gradle/",
    "*.class",
    // Native build artifacts
    "*.o",
    "*.so",
    "*.dylib",
    "*.dll",
    "*.exe",
    "bin/",
    "obj/",
    // Secrets
    ".env",
    "*.pem",
    "*.key",
    // Logs and temp files
    "*.log",
    "logs/",
    "tmp/",
    "temp/",
    // Databases
    "*.db",
    "*.sqlite",
    "*.sqlite3",
    // IDEs and editors
    ".idea/",
    ".vscode/",
    "*.swp",
    "*.swo",
    "*.bak",
    // OS junk
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
    // Coverage output
    "coverage/",
    "htmlcov/",
];

/// Load user rules from the repository-local ignore file
///
/// Missing file means no user rules. Blank lines and `#` comments are
/// skipped; everything else is taken verbatim as a pattern.
pub fn load_user_rules(root: &Path) -> Result<Vec<String>> {
    let path = root.join(IGNORE_FILE);
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(&path).map_err(|e| RelicError::io(&path, e))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Compiled ignore rule set
///
/// Built once per operation from defaults plus user rules; matching is a pure
/// function of the normalized relative path.
#[derive(Debug)]
pub struct IgnoreMatcher {
    globs: GlobSet,
    /// Patterns whose glob syntax failed to parse, matched literally instead
    literals: Vec<String>,
}

impl IgnoreMatcher {
    /// Compile a matcher from an ordered rule list (defaults first)
    pub fn new(rules: &[String]) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut literals = Vec::new();

        for rule in rules {
            let normalized = utils::normalize_rel_str(rule);
            if normalized.is_empty() {
                continue;
            }
            let is_dir_rule = rule.trim_end().ends_with('/');

            // Bare names match at any depth; patterns with a separator are
            // anchored at the root.
            let mut candidates = vec![normalized.clone()];
            if !normalized.contains('/') {
                candidates.push(format!("**/{}", normalized));
            }
            if is_dir_rule {
                for candidate in candidates.clone() {
                    candidates.push(format!("{}/**", candidate));
                }
            }

            let mut parsed_all = true;
            let mut globs = Vec::with_capacity(candidates.len());
            for candidate in &candidates {
                match Glob::new(candidate) {
                    Ok(glob) => globs.push(glob),
                    Err(e) => {
                        parsed_all = false;
                        warn!("invalid ignore pattern '{}' ({}); matching literally", rule, e);
                        break;
                    }
                }
            }

            if parsed_all {
                for glob in globs {
                    builder.add(glob);
                }
            } else {
                literals.push(normalized);
            }
        }

        let globs = builder.build().unwrap_or_else(|e| {
            // A set of individually valid globs failing to combine means none
            // of them can be honored; fall back to an empty set.
            warn!("failed to compile ignore rules ({}); only literals apply", e);
            GlobSet::empty()
        });

        debug!(
            "compiled ignore matcher: {} globs, {} literal fallbacks",
            globs.len(),
            literals.len()
        );
        IgnoreMatcher { globs, literals }
    }

    /// Compile the default rules merged with the user rules for `root`
    pub fn for_repository(root: &Path) -> Result<Self> {
        let mut rules: Vec<String> = DEFAULT_IGNORES.iter().map(|s| s.to_string()).collect();
        rules.extend(load_user_rules(root)?);
        Ok(Self::new(&rules))
    }

    /// Check whether a normalized relative path is excluded from tracking
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        if rel_path.is_empty() {
            return false;
        }
        if self.globs.is_match(rel_path) {
            return true;
        }
        self.literals.iter().any(|lit| lit == rel_path)
    }
}
