use crate::core::{error::Result, print_info, repository::Repository};
use colored::*;

pub async fn execute_remotes(repo: &Repository) -> Result<()> {
    let remotes = repo.get_list_of_remotes().await?;
    if remotes.is_empty() {
        print_info("No remotes configured");
        return Ok(());
    }

    println!();
    for remote in remotes {
        println!("{}\t{}", remote.name.green(), remote.url);
    }
    println!();
    Ok(())
}
