use crate::commands::update::UpdateArgs;
use crate::core::{
    config::SyncConfig, error::Result, print_section_header, repository::Repository,
};
use colored::*;

fn or_none(value: Option<&str>) -> ColoredString {
    match value {
        Some(v) if !v.is_empty() => v.white(),
        _ => "-none-".bright_black(),
    }
}

/// Branch, tracking remote and head commits, local and remote.
pub async fn execute_info(repo: &Repository, args: &UpdateArgs, config: &SyncConfig) -> Result<()> {
    let info = repo.local_branch_info().await?;
    let (branch, _) = args.resolve(info.branch.as_deref(), config);
    let branch = branch.to_string();
    let remote = match args.remote.as_deref() {
        Some(remote) => remote.to_string(),
        None => repo
            .remote_of_branch(&branch)
            .await?
            .unwrap_or_else(|| config.default_remote.clone()),
    };

    print_section_header("Working copy");
    println!("  directory  {}", repo.directory().display());
    println!("  branch     {}", or_none(info.branch.as_deref()));
    println!("  tracking   {}", or_none(info.remote.as_deref()));
    println!("  HEAD       {}", or_none(Some(info.head_hash.as_str())));

    let heads = repo.get_remote_and_local_head_ref(&branch, &remote).await?;
    print_section_header(&format!("{remote}/{branch}"));
    println!("  local      {}", or_none(Some(heads.local.as_str())));
    println!("  remote     {}", or_none(Some(heads.remote.as_str())));
    let state = if heads.differs() {
        "remote changes".yellow()
    } else {
        "up to date".green()
    };
    println!("  state      {state}\n");
    Ok(())
}
