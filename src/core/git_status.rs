//! Porcelain status parsing.
//!
//! `git status --porcelain` prints one line per changed path: two flag
//! characters (index, work tree), a separator and the path, or `old -> new`
//! for renames and copies. [`parse_porcelain`] turns that text into
//! [`StatusRecord`]s.
//!
//! One line may produce several records. A path changed both in the index and
//! in the work tree yields a `Staged` and an `Unstaged` record, because staging
//! and unstaging each act on one side of the index only.

use crate::core::{
    error::Result,
    repository::Repository,
};
use serde::{Serialize, Serializer};
use std::fmt;

/// Which side of the index a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Staged,
    Unstaged,
    Untracked,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Staged => "staged",
            FileStatus::Unstaged => "unstaged",
            FileStatus::Untracked => "untracked",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The seven unmerged flag pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conflict {
    /// DD
    BothDeleted,
    /// AU
    AddedByUs,
    /// UD
    DeletedByThem,
    /// UA
    AddedByThem,
    /// DU
    DeletedByUs,
    /// AA
    BothAdded,
    /// UU
    BothModified,
}

impl Conflict {
    pub fn from_flags(flags: &str) -> Option<Conflict> {
        match flags {
            "DD" => Some(Conflict::BothDeleted),
            "AU" => Some(Conflict::AddedByUs),
            "UD" => Some(Conflict::DeletedByThem),
            "UA" => Some(Conflict::AddedByThem),
            "DU" => Some(Conflict::DeletedByUs),
            "AA" => Some(Conflict::BothAdded),
            "UU" => Some(Conflict::BothModified),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Conflict::BothDeleted => "unmerged, deleted locally and remotely",
            Conflict::AddedByUs => "unmerged, added locally and modified remotely",
            Conflict::DeletedByThem => "unmerged, modified locally and deleted remotely",
            Conflict::AddedByThem => "unmerged, modified locally and added remotely",
            Conflict::DeletedByUs => "unmerged, deleted locally and modified remotely",
            Conflict::BothAdded => "unmerged, added locally and remotely",
            Conflict::BothModified => "unmerged, modified locally and remotely",
        }
    }
}

/// Human readable kind of change derived from the flag pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    Unmerged(Conflict),
}

impl Change {
    fn from_flag(flag: char) -> Option<Change> {
        match flag {
            'M' => Some(Change::Modified),
            'R' => Some(Change::Renamed),
            'C' => Some(Change::Copied),
            'A' => Some(Change::Added),
            'D' => Some(Change::Deleted),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Change::Modified => "modified",
            Change::Added => "added",
            Change::Deleted => "deleted",
            Change::Renamed => "renamed",
            Change::Copied => "copied",
            Change::Unmerged(conflict) => conflict.label(),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Change {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// One changed path as seen from one side of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub status: FileStatus,
    /// The porcelain line with trailing whitespace removed.
    pub status_string: String,
    /// `None` when no rule matches (untracked entries, for instance).
    pub change: Option<Change>,
    /// Path without the flags; the destination for renames and copies.
    pub file_name: String,
}

impl StatusRecord {
    pub fn new(status: FileStatus, status_string: impl Into<String>) -> Self {
        let status_string = status_string.into();
        let change = derive_change(status, &status_string);
        let file_name = derive_file_name(change, &status_string);
        Self {
            status,
            status_string,
            change,
            file_name,
        }
    }

    pub fn change_label(&self) -> &'static str {
        self.change.map(|c| c.label()).unwrap_or("")
    }
}

fn flag_pair(line: &str) -> (Option<char>, Option<char>) {
    let mut chars = line.chars();
    (chars.next(), chars.next())
}

fn derive_change(status: FileStatus, line: &str) -> Option<Change> {
    if let Some(conflict) = line.get(..2).and_then(Conflict::from_flags) {
        return Some(Change::Unmerged(conflict));
    }
    let (index, work_tree) = flag_pair(line);
    let flag = match status {
        FileStatus::Unstaged => work_tree,
        FileStatus::Staged | FileStatus::Untracked => index,
    };
    flag.and_then(Change::from_flag)
}

fn derive_file_name(change: Option<Change>, line: &str) -> String {
    let path = line.get(3..).unwrap_or("");
    let path = match change {
        Some(Change::Renamed | Change::Copied) => path
            .rsplit_once("->")
            .map_or(path, |(_, destination)| destination)
            .trim(),
        _ => path,
    };
    unquote_path(path)
}

/// Undo git's C-style quoting of unusual path names (`"a b.txt"`, `"caf\303\251"`).
fn unquote_path(path: &str) -> String {
    let inner = match path
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) => inner,
        None => return path.to_string(),
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => bytes.push(b'\n'),
            Some('t') => bytes.push(b'\t'),
            Some('"') => bytes.push(b'"'),
            Some('\\') => bytes.push(b'\\'),
            Some(d @ '0'..='7') => {
                let mut value = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                bytes.push(value as u8);
            }
            Some(other) => {
                bytes.push(b'\\');
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn is_change_letter(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_ascii_uppercase())
}

/// Record kinds a single porcelain line produces, in emission order.
fn classify(line: &str) -> Vec<FileStatus> {
    let (index, work_tree) = flag_pair(line);
    let mut kinds = Vec::with_capacity(2);

    let index_blank = index.is_some_and(char::is_whitespace);
    if (index_blank || is_change_letter(index)) && is_change_letter(work_tree) {
        kinds.push(FileStatus::Unstaged);
    }
    if is_change_letter(index) {
        kinds.push(FileStatus::Staged);
    }
    if line.trim_start().starts_with("??") {
        kinds.push(FileStatus::Untracked);
    }
    kinds
}

/// Parse porcelain v1 status text. Output order follows the input lines.
pub fn parse_porcelain(output: &str) -> Vec<StatusRecord> {
    output
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .flat_map(|line| {
            classify(line)
                .into_iter()
                .map(move |status| StatusRecord::new(status, line))
        })
        .collect()
}

impl Repository {
    /// Parsed `git status --porcelain` for the working copy.
    pub async fn file_status(&self) -> Result<Vec<StatusRecord>> {
        let output = self
            .cmd(self.git(["status", "--porcelain"]))
            .await?
            .into_result("status")?;
        let records = parse_porcelain(&output);
        log::debug!("Parsed {} status records", records.len());
        Ok(records)
    }
}
