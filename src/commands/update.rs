use crate::core::{
    config::SyncConfig, error::Result, print_info, print_section_header, print_success,
    repository::Repository, update::UpdateOutcome,
};
use clap::Args;

#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    /// Branch to update (defaults to the checked-out branch, then the configured default)
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Remote to pull from when the branch tracks none
    #[arg(short, long)]
    pub remote: Option<String>,
}

impl UpdateArgs {
    /// Explicit flags first, then the checked-out branch, then the configuration.
    pub fn resolve<'a>(
        &'a self,
        current: Option<&'a str>,
        config: &'a SyncConfig,
    ) -> (&'a str, &'a str) {
        (
            self.branch
                .as_deref()
                .or(current.filter(|b| !b.is_empty()))
                .unwrap_or(&config.default_branch),
            self.remote.as_deref().unwrap_or(&config.default_remote),
        )
    }
}

pub async fn execute_update(repo: &Repository, args: &UpdateArgs, config: &SyncConfig) -> Result<()> {
    let current = repo.local_branch_info().await?.branch;
    let (branch, remote) = args.resolve(current.as_deref(), config);

    match repo.interactively_update(branch, remote).await? {
        UpdateOutcome::UpToDate => print_info(&format!("{branch} is already up to date")),
        UpdateOutcome::Updated { output } => {
            print_success(&format!("Updated {branch}"));
            if !output.trim().is_empty() {
                println!("\n{}", output.trim_end());
            }
        }
    }

    if repo.is_dry_run() {
        print_section_header("Commands");
        print!("{}", repo.log());
    }
    Ok(())
}
