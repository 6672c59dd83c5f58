use crate::commands::status::execute_status;
use crate::core::{
    dispatch::{ChangeAction, CommandGroups},
    error::{Result, SyncError},
    git_status::StatusRecord,
    print_info, print_success,
    repository::Repository,
};

/// Records whose path is one of `paths`, or all of them when `paths` is empty.
pub fn select_records(records: Vec<StatusRecord>, paths: &[String]) -> Result<Vec<StatusRecord>> {
    if paths.is_empty() {
        return Ok(records);
    }
    let selected: Vec<_> = records
        .into_iter()
        .filter(|r| paths.iter().any(|p| p.trim_end_matches('/') == r.file_name))
        .collect();
    if selected.is_empty() {
        return Err(SyncError::NoMatchingFiles);
    }
    Ok(selected)
}

pub async fn execute_change_action(
    repo: &Repository,
    action: ChangeAction,
    paths: Vec<String>,
) -> Result<()> {
    let records = select_records(repo.file_status().await?, &paths)?;

    let groups = CommandGroups::plan(action, &records);
    if groups.is_empty() {
        print_info(&format!("Nothing to {action}"));
        return Ok(());
    }

    repo.apply_action(action, &records).await?;

    let count = records.iter().filter(|r| action.applies_to(r)).count();
    if repo.is_dry_run() {
        print_info(&format!("Would {action} {count} file(s):"));
        print!("{}", repo.log());
        return Ok(());
    }

    print_success(&format!("{} {count} file(s)", past_tense(action)));
    execute_status(repo, false).await
}

fn past_tense(action: ChangeAction) -> &'static str {
    match action {
        ChangeAction::Stage => "Staged",
        ChangeAction::Unstage => "Unstaged",
        ChangeAction::Discard => "Discarded",
    }
}
