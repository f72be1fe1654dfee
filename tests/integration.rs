//! End-to-end tests for the relic workflow
//!
//! Each test builds a throwaway repository with real files, drives the
//! public `Repository` API, and asserts on both the returned reports and the
//! resulting on-disk tree.

use relic::{RelicError, Repository};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Collect the working tree as relative path -> content, skipping metadata
fn tree_contents(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut contents = BTreeMap::new();
    collect_into(root, root, &mut contents);
    contents
}

fn collect_into(root: &Path, dir: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
    for entry in fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if dir == root && (name == ".relic" || name == ".relicignore") {
            continue;
        }
        if path.is_dir() {
            collect_into(root, &path, out);
        } else {
            let rel = path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            out.insert(rel, fs::read(&path).unwrap());
        }
    }
}

#[test]
fn full_workflow_status_commit_log() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("a.txt"), "alpha").unwrap();
    fs::create_dir(root.join("src")).unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();

    let mut repo = Repository::init(root).unwrap();
    assert!(repo.status().unwrap().is_clean());

    // Modify, add, delete
    fs::write(root.join("a.txt"), "alpha2").unwrap();
    fs::write(root.join("new.txt"), "fresh").unwrap();
    fs::remove_file(root.join("src/main.rs")).unwrap();

    let status = repo.status().unwrap();
    assert_eq!(status.changes.modified, vec!["a.txt"]);
    assert_eq!(status.changes.added, vec!["new.txt"]);
    assert_eq!(status.changes.deleted, vec!["src/main.rs"]);

    let c1 = repo.commit(Some("first")).unwrap();
    assert_eq!(c1.id, 1);
    assert_eq!(c1.label(), "c1");
    assert_eq!(repo.log().len(), 1);

    // Clean after commit; committing again is rejected
    assert!(repo.status().unwrap().is_clean());
    assert!(matches!(
        repo.commit(None).unwrap_err(),
        RelicError::NothingToCommit
    ));
    assert_eq!(repo.log().len(), 1);

    // Ids stay sequential and gap-free across commits
    fs::write(root.join("b.txt"), "beta").unwrap();
    let c2 = repo.commit(Some("second")).unwrap();
    assert_eq!(c2.id, 2);
    let ids: Vec<u64> = repo.log().iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2]);

    // Reopening sees the same log
    drop(repo);
    let reopened = Repository::open(root).unwrap();
    assert_eq!(reopened.log().len(), 2);
    assert_eq!(reopened.log()[0].message, "first");
}

#[test]
fn scenario_modify_then_delete_then_restore() {
    // a.txt present at init, modified (c1), deleted (c2); restore(c1)
    // resurrects it from the base snapshot.
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("a.txt"), "hello").unwrap();

    let mut repo = Repository::init(root).unwrap();

    fs::write(root.join("a.txt"), "hello!").unwrap();
    let status = repo.status().unwrap();
    assert_eq!(status.changes.modified, vec!["a.txt"]);
    assert!(status.changes.added.is_empty());

    let c1 = repo.commit(None).unwrap();
    assert_eq!(c1.changes.modified, vec!["a.txt"]);

    fs::remove_file(root.join("a.txt")).unwrap();
    let c2 = repo.commit(None).unwrap();
    assert_eq!(c2.changes.deleted, vec!["a.txt"]);

    let report = repo.restore("c1").unwrap();
    assert_eq!(report.files_kept, 1);
    assert_eq!(report.resurrected, 1);
    assert!(report.unreconstructable.is_empty());

    // Back from the base cache, with base-time content ("hello", not
    // "hello!") — restore does not store per-commit content.
    assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "hello");
    assert_eq!(report.not_reverted, vec!["a.txt"]);

    // The log itself is never rewritten by restore
    assert_eq!(repo.log().len(), 2);
}

#[test]
fn scenario_added_file_is_unreconstructable() {
    // b.txt added after init (c1), deleted (c2); restore(c1) cannot bring
    // it back and must say so.
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("keep.txt"), "kept").unwrap();

    let mut repo = Repository::init(root).unwrap();

    fs::write(root.join("b.txt"), "transient").unwrap();
    let c1 = repo.commit(None).unwrap();
    assert_eq!(c1.changes.added, vec!["b.txt"]);

    fs::remove_file(root.join("b.txt")).unwrap();
    repo.commit(None).unwrap();

    let report = repo.restore("c1").unwrap();
    assert_eq!(report.unreconstructable, vec!["b.txt"]);
    assert!(!root.join("b.txt").exists());
    assert_eq!(report.files_kept, 1); // keep.txt
}

#[test]
fn restore_trims_to_base_minus_deletions() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("one.txt"), "1").unwrap();
    fs::write(root.join("two.txt"), "2").unwrap();
    fs::write(root.join("three.txt"), "3").unwrap();

    let mut repo = Repository::init(root).unwrap();

    // c1 deletes one.txt
    fs::remove_file(root.join("one.txt")).unwrap();
    repo.commit(None).unwrap();

    // c2 deletes two.txt and adds late.txt
    fs::remove_file(root.join("two.txt")).unwrap();
    fs::write(root.join("late.txt"), "late").unwrap();
    repo.commit(None).unwrap();

    // Restoring c1 replays only c1's deletion over the base set
    let report = repo.restore("c1").unwrap();
    let tree = tree_contents(root);
    let tracked: Vec<&str> = tree.keys().map(String::as_str).collect();
    assert_eq!(tracked, vec!["three.txt", "two.txt"]);
    assert!(report.files_removed >= 1); // late.txt trimmed away

    // Status is clean immediately after a restore
    assert!(repo.status().unwrap().is_clean());
}

#[test]
fn restore_is_deterministic() {
    // Build the same scenario twice and compare trees and reports.
    let build = |root: &Path| -> relic::RestoreReport {
        fs::write(root.join("a.txt"), "aaa").unwrap();
        fs::write(root.join("b.txt"), "bbb").unwrap();
        let mut repo = Repository::init(root).unwrap();

        fs::write(root.join("a.txt"), "aaa-edited").unwrap();
        repo.commit(None).unwrap();

        fs::remove_file(root.join("b.txt")).unwrap();
        fs::write(root.join("c.txt"), "ccc").unwrap();
        repo.commit(None).unwrap();

        repo.restore("c1").unwrap()
    };

    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let report_a = build(dir_a.path());
    let report_b = build(dir_b.path());

    assert_eq!(report_a.files_kept, report_b.files_kept);
    assert_eq!(report_a.files_removed, report_b.files_removed);
    assert_eq!(report_a.resurrected, report_b.resurrected);
    assert_eq!(report_a.unreconstructable, report_b.unreconstructable);
    assert_eq!(report_a.not_reverted, report_b.not_reverted);
    assert_eq!(tree_contents(dir_a.path()), tree_contents(dir_b.path()));
}

#[test]
fn restore_keeps_latest_content_of_surviving_files() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("doc.txt"), "v1").unwrap();

    let mut repo = Repository::init(root).unwrap();

    fs::write(root.join("doc.txt"), "v2").unwrap();
    repo.commit(None).unwrap(); // c1 records v2

    fs::write(root.join("doc.txt"), "v3").unwrap();
    repo.commit(None).unwrap(); // c2 records v3

    let report = repo.restore("c1").unwrap();
    // No version store: the file stays at its latest content and the report
    // surfaces that it was not reverted to what c1 recorded.
    assert_eq!(fs::read_to_string(root.join("doc.txt")).unwrap(), "v3");
    assert_eq!(report.not_reverted, vec!["doc.txt"]);
}

#[test]
fn restore_unknown_commit_fails() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.txt"), "x").unwrap();
    let mut repo = Repository::init(temp_dir.path()).unwrap();

    for bad in ["c5", "5", "c0", "abc"] {
        let err = repo.restore(bad).unwrap_err();
        assert!(matches!(err, RelicError::UnknownCommit { .. }), "{bad}");
        assert!(err.is_user_error());
    }
    // Nothing was touched
    assert!(temp_dir.path().join("a.txt").exists());
}

#[test]
fn ignored_paths_never_enter_snapshots() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("app.rs"), "code").unwrap();
    fs::write(root.join("debug.log"), "noise").unwrap();
    fs::create_dir_all(root.join(".git")).unwrap();
    fs::write(root.join(".git/config"), "[core]").unwrap();
    fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
    fs::write(root.join("node_modules/pkg/i.js"), "js").unwrap();

    let mut repo = Repository::init(root).unwrap();
    let snapshot = repo.scan().unwrap().snapshot;
    assert_eq!(snapshot.paths().collect::<Vec<_>>(), vec!["app.rs"]);

    // Changing ignored content produces no status entry and no commit
    fs::write(root.join("debug.log"), "more noise").unwrap();
    assert!(repo.status().unwrap().is_clean());
    assert!(matches!(
        repo.commit(None).unwrap_err(),
        RelicError::NothingToCommit
    ));
}

#[test]
fn user_ignore_rules_apply_on_top_of_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("a.txt"), "a").unwrap();
    fs::write(root.join("secret.conf"), "s").unwrap();
    fs::write(root.join(".relicignore"), "*.conf\n").unwrap();

    let repo = Repository::init(root).unwrap();
    let snapshot = repo.scan().unwrap().snapshot;
    assert!(snapshot.contains("a.txt"));
    assert!(!snapshot.contains("secret.conf"));
}

#[test]
fn diff_file_shows_line_changes_against_head() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("notes.txt"), "one\ntwo\nthree\n").unwrap();

    let mut repo = Repository::init(root).unwrap();

    fs::write(root.join("notes.txt"), "one\nTWO\nthree\n").unwrap();
    let diff = repo.diff_file("notes.txt").unwrap();
    assert!(diff.has_changes());
    assert_eq!(diff.lines_added, 1);
    assert_eq!(diff.lines_removed, 1);

    // After committing, the head cache catches up and the diff is empty
    repo.commit(None).unwrap();
    assert!(!repo.diff_file("notes.txt").unwrap().has_changes());

    // A brand-new file diffs entirely as additions
    fs::write(root.join("fresh.txt"), "a\nb\n").unwrap();
    let fresh = repo.diff_file("fresh.txt").unwrap();
    assert_eq!(fresh.lines_added, 2);
    assert_eq!(fresh.lines_removed, 0);

    // A deleted file diffs entirely as removals
    fs::remove_file(root.join("notes.txt")).unwrap();
    let gone = repo.diff_file("notes.txt").unwrap();
    assert_eq!(gone.lines_added, 0);
    assert_eq!(gone.lines_removed, 3);

    // Unknown everywhere: user error with a NotFound cause
    assert!(repo.diff_file("never-existed.txt").is_err());
}

#[test]
fn operations_fail_before_init_and_after_destroy() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("a.txt"), "x").unwrap();

    assert!(matches!(
        Repository::open(root).unwrap_err(),
        RelicError::NotInitialized { .. }
    ));

    Repository::init(root).unwrap();
    Repository::destroy(root).unwrap();

    assert!(matches!(
        Repository::open(root).unwrap_err(),
        RelicError::NotInitialized { .. }
    ));
    assert!(root.join("a.txt").exists());
}

#[test]
fn concurrent_mutation_is_rejected_by_the_lock() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("a.txt"), "x").unwrap();
    let mut repo = Repository::init(root).unwrap();

    // Simulate another process holding the lock
    fs::write(root.join(".relic/lock"), "").unwrap();

    fs::write(root.join("a.txt"), "y").unwrap();
    assert!(matches!(
        repo.commit(None).unwrap_err(),
        RelicError::Locked { .. }
    ));

    fs::remove_file(root.join(".relic/lock")).unwrap();
    assert!(repo.commit(None).is_ok());
}

#[test]
fn corrupt_log_fails_loudly_on_open() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("a.txt"), "x").unwrap();
    Repository::init(root).unwrap();

    fs::write(root.join(".relic/log.json"), "{\"definitely\": \"not a log\"}").unwrap();
    let err = Repository::open(root).unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn empty_directories_are_pruned_after_restore_removals() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("top.txt"), "t").unwrap();

    let mut repo = Repository::init(root).unwrap();

    fs::create_dir_all(root.join("deep/nested")).unwrap();
    fs::write(root.join("deep/nested/file.txt"), "f").unwrap();
    repo.commit(None).unwrap(); // c1 adds deep/nested/file.txt

    fs::write(root.join("deep/nested/file.txt"), "f2").unwrap();
    repo.commit(None).unwrap(); // c2

    repo.restore("c1").unwrap();
    // file.txt was added after init: trimmed away, and its emptied parents
    // must not linger
    assert!(!root.join("deep").exists());
    assert!(root.join("top.txt").exists());
}
