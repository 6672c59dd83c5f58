use crate::core::{error::Result, print_status_records, repository::Repository};
use colored::*;

pub async fn execute_status(repo: &Repository, json: bool) -> Result<()> {
    let records = repo.file_status().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let branch = repo
        .current_branch()
        .await?
        .unwrap_or_else(|| "-none-".to_string());
    println!("\n{} {}", "On branch".bright_black(), branch.white());
    print_status_records(&records);
    Ok(())
}
