use anyhow::Result;
use contrak_core::{ContrakConfig, logging};
use tracing::error;

const DEFAULT_FILTER: &str = "info,contrak_web=debug,contrak_core=debug";

#[tokio::main]
async fn main() -> Result<()> {
    let config = ContrakConfig::from_env()?;

    // Keep the file writer alive for the whole process.
    let _guard = match &config.log_dir {
        Some(dir) => Some(logging::init_logging_to_dir(dir, DEFAULT_FILTER)?),
        None => {
            logging::init_logging(DEFAULT_FILTER)?;
            None
        }
    };

    if let Err(e) = contrak_web::serve(&config).await {
        error!("{e:#}");
        return Err(e);
    }
    Ok(())
}
