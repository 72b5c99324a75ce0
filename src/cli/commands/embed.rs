//! Embed command implementation.

use anyhow::{Context, Result};
use clap::Args;
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::cli::output::{RunStats, get_formatter};
use crate::error::PipelineError;
use crate::models::{Config, EmbedOutcome, EmbeddingStage, OutputFormat, ProcessingMode};
use crate::services::{
    BatchProcessor, HttpEmbeddingClient, PerItemProcessor, ResultStreamer, VectorizationClient,
};
use crate::utils::read_units;

/// Arguments for the embed command.
#[derive(Debug, Args)]
pub struct EmbedArgs {
    /// Path to a JSON or JSONL file of content units (use - for stdin)
    #[arg()]
    pub input: Option<PathBuf>,

    /// Write JSONL results here instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Content units per provider call
    #[arg(long, short = 'b')]
    pub batch_size: Option<usize>,

    /// Maximum batches in flight
    #[arg(long, short = 'c')]
    pub concurrency: Option<usize>,

    /// Report failures per unit instead of aborting the run
    #[arg(long)]
    pub per_item: bool,

    /// Embedding stage: index or query
    #[arg(long)]
    pub stage: Option<EmbeddingStage>,
}

impl EmbedArgs {
    /// Overlay command-line flags on the loaded configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(batch_size) = self.batch_size {
            config.pipeline.batch_size = batch_size;
        }
        if let Some(concurrency) = self.concurrency {
            config.embedding.concurrency_limit = concurrency;
        }
        if self.per_item {
            config.pipeline.mode = ProcessingMode::PerItem;
        }
        if let Some(stage) = self.stage {
            config.pipeline.stage = stage;
        }
    }
}

pub async fn handle_embed(
    args: EmbedArgs,
    format: OutputFormat,
    cancel: CancellationToken,
) -> Result<()> {
    let mut config = Config::load()?;
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let formatter = get_formatter(format);
    let units = read_units(args.input.as_deref()).context("failed to read content units")?;

    let client: Arc<dyn VectorizationClient> = Arc::new(
        HttpEmbeddingClient::new(&config.embedding).context("failed to create embedding client")?,
    );
    let batch_size = config.pipeline.batch_size;
    let concurrency_limit = client.concurrency_limit();

    let mut stats = RunStats {
        units_read: units.len() as u64,
        batch_size,
        concurrency_limit,
        mode: match config.pipeline.mode {
            ProcessingMode::Batch => "batch".to_string(),
            ProcessingMode::PerItem => "per_item".to_string(),
        },
        ..Default::default()
    };

    let mut sink = open_sink(args.output.as_deref())?;
    let start_time = Instant::now();
    let input = futures::stream::iter(units);
    let processor = BatchProcessor::new(client, config.pipeline.stage);

    let result = match config.pipeline.mode {
        ProcessingMode::Batch => {
            let streamer = ResultStreamer::new(processor, batch_size, concurrency_limit)?
                .with_cancellation(cancel);
            write_results(streamer.run(input), &mut sink, &mut stats, |_| false).await
        }
        ProcessingMode::PerItem => {
            let streamer = ResultStreamer::new(
                PerItemProcessor::new(processor),
                batch_size,
                concurrency_limit,
            )?
            .with_cancellation(cancel);
            write_results(streamer.run(input), &mut sink, &mut stats, |outcome| {
                !outcome.is_record()
            })
            .await
        }
    };

    stats.duration_ms = start_time.elapsed().as_millis() as u64;
    if let Err(ref e) = result {
        stats.error = Some(e.to_string());
    }
    eprint!("{}", formatter.format_run_stats(&stats));

    result
}

fn open_sink(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) if path.to_string_lossy() != "-" => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        _ => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

/// Writes each result as one JSON line as soon as it arrives.
async fn write_results<T, S>(
    stream: S,
    sink: &mut dyn Write,
    stats: &mut RunStats,
    is_failure: impl Fn(&T) -> bool,
) -> Result<()>
where
    T: Serialize,
    S: Stream<Item = Result<T, PipelineError>>,
{
    let mut stream = std::pin::pin!(stream);
    while let Some(item) = stream.next().await {
        let item = item?;
        if is_failure(&item) {
            stats.failures += 1;
        } else {
            stats.records += 1;
        }
        serde_json::to_writer(&mut *sink, &item).context("failed to encode result")?;
        writeln!(sink).context("failed to write result")?;
        sink.flush().context("failed to flush output")?;
    }
    Ok(())
}
