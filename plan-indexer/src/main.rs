use plan_indexer::observability::init_logging;
use plan_indexer::{Dependencies, IndexerError, Settings};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), IndexerError> {
    dotenv::dotenv().ok();

    let settings = Settings::from_env()?;
    init_logging(settings.log_format);

    let dependencies = match Dependencies::new(&settings).await {
        Ok(dependencies) => dependencies,
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let stats = dependencies.orchestrator.run().await?;
    info!(acked = stats.acked, discarded = stats.discarded, "Plan indexer stopped");

    Ok(())
}
