use anyhow::Result;
use tracing::error;
use worktick::cli::run_cli;

#[tokio::main]
async fn main() -> Result<()> {
    run_cli().await.inspect_err(|e| {
        error!("Command failed {e:?}");
    })?;
    Ok(())
}
