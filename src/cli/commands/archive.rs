use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_archive(config: Config) -> anyhow::Result<()> {
    let state = SharedState::new(config).await?;

    let report = state.archival_job.run().await?;

    println!("Archival finished");
    println!("  Examined: {}", report.examined);
    println!("  Archived: {}", report.archived);
    println!("  Deleted:  {}", report.deleted);
    if report.skipped > 0 {
        println!("  Skipped:  {} (kept for the next run)", report.skipped);
    }

    Ok(())
}
