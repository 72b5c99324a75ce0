use anyhow::Result;

use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{Config, OutputFormat};
use crate::services::HttpEmbeddingClient;

pub async fn handle_status(format: OutputFormat) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let client = HttpEmbeddingClient::new(&config.embedding)?;
    let (healthy, model_id, error) = match client.health_check().await {
        Ok(health) => (true, health.model_id, None),
        Err(e) => (false, None, Some(e.to_string())),
    };

    let status = StatusInfo {
        embedding_url: client.base_url().to_string(),
        healthy,
        model_id,
        concurrency_limit: config.embedding.concurrency_limit,
        batch_size: config.pipeline.batch_size,
        error,
    };

    print!("{}", formatter.format_status(&status));

    if !healthy {
        eprintln!();
        eprintln!(
            "Hint: start an embedding server at {} or change it with: vstream config set embedding.url <URL>",
            status.embedding_url
        );
    }

    Ok(())
}
