//! Terminal output helpers shared by the commands.
//!
//! Errors are red, successes green, headers white. Status records are
//! coloured by their kind of change so the same change looks the same in
//! every listing.

use crate::core::git_status::{Change, FileStatus, StatusRecord};
use colored::*;

/// Prints `✕ Error: <message>` surrounded by blank lines.
pub fn print_error(message: &str) {
    println!("\n{} {}\n", "✕ Error:".red(), message.white());
}

pub fn print_success(message: &str) {
    println!("\n{} {}", "✓".green(), message.white());
}

pub fn print_info(message: &str) {
    println!("\n{}\n", message.white());
}

/// Prints `<header>:` followed by a blank line.
pub fn print_section_header(header: &str) {
    println!("\n{}:\n", header.white());
}

/// Colour for a record: the kind of change decides, untracked files are cyan.
pub fn get_status_color_style(record: &StatusRecord) -> Box<dyn Fn(&str) -> ColoredString> {
    match (record.status, record.change) {
        (FileStatus::Untracked, _) => Box::new(|text: &str| text.cyan()),
        (_, Some(Change::Modified)) => Box::new(|text: &str| text.yellow()),
        (_, Some(Change::Added)) => Box::new(|text: &str| text.green()),
        (_, Some(Change::Deleted)) => Box::new(|text: &str| text.red()),
        (_, Some(Change::Renamed | Change::Copied)) => Box::new(|text: &str| text.blue()),
        (_, Some(Change::Unmerged(_))) => Box::new(|text: &str| text.red().bold()),
        (_, None) => Box::new(|text: &str| text.normal()),
    }
}

/// `  <change label padded>  <path>` with the record's colour.
pub fn format_record(record: &StatusRecord) -> String {
    let color_fn = get_status_color_style(record);
    let label = match record.status {
        FileStatus::Untracked => "untracked",
        _ => record.change_label(),
    };
    format!(
        "  {}  {}",
        color_fn(&format!("{label:<16}")),
        color_fn(&record.file_name)
    )
}

/// Records grouped under `Staged`, `Unstaged` and `Untracked` headers. Empty
/// groups are left out.
pub fn print_status_records(records: &[StatusRecord]) {
    if records.is_empty() {
        print_info("Working tree clean");
        return;
    }

    for (status, header) in [
        (FileStatus::Staged, "Staged"),
        (FileStatus::Unstaged, "Unstaged"),
        (FileStatus::Untracked, "Untracked"),
    ] {
        let group: Vec<_> = records.iter().filter(|r| r.status == status).collect();
        if group.is_empty() {
            continue;
        }
        print_section_header(header);
        for record in group {
            println!("{}", format_record(record));
        }
    }
    println!();
}
