//! Common assertion helpers for test output validation

#![allow(dead_code)]

use predicates::prelude::*;

pub fn not_in_git_repo() -> impl Predicate<str> {
    predicates::str::contains("Not in a git repository")
}

pub fn up_to_date() -> impl Predicate<str> {
    predicates::str::contains("already up to date")
}

pub fn has_section(header: &str) -> impl Predicate<str> {
    predicates::str::contains(format!("{header}:"))
}

/// A status line for `path` labelled `label`, e.g. `modified` or `untracked`.
pub fn has_record(label: &str, path: &str) -> impl Predicate<str> {
    predicates::str::is_match(format!(r"{label}\s+{}", regex_escape(path)))
        .expect("valid record pattern")
}

fn regex_escape(text: &str) -> String {
    text.chars()
        .flat_map(|c| {
            let escape = r"\.+*?()|[]{}^$".contains(c);
            escape.then_some('\\').into_iter().chain(std::iter::once(c))
        })
        .collect()
}

/// Content left in a file by a merge conflict between two versions.
pub fn assert_conflict_markers(content: &str, ours: &str, theirs: &str) {
    assert!(content.contains("<<<<<<<"), "no conflict start in:\n{content}");
    assert!(content.contains("======="), "no conflict separator in:\n{content}");
    assert!(content.contains(">>>>>>>"), "no conflict end in:\n{content}");
    assert!(content.contains(ours), "'{ours}' missing from:\n{content}");
    assert!(content.contains(theirs), "'{theirs}' missing from:\n{content}");
}
