//! Run command - score geometries and write metadata.

use std::io::IsTerminal;
use std::path::Path;

use clap::Args;
use console::style;
use tracing::info;
use waymeta::config::ConfigFile;
use waymeta::pipeline::{MetadataPipeline, PipelineOptions, RunSummary};
use waymeta::source::DataSource;
use waymeta::store::PgStore;

use super::common::{load_config, resolve_sources, source_parser, RunProgress};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Data source to process; repeat for several (default: popularity, greenery)
    #[arg(long = "source", value_name = "NAME", value_parser = source_parser())]
    pub sources: Vec<String>,

    /// PostgreSQL connection URL (overrides [database] url)
    #[arg(long, value_name = "URL")]
    pub database_url: Option<String>,

    /// Score geometries without writing results
    #[arg(long)]
    pub dry_run: bool,

    /// Do not show a progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Run the run command.
pub fn run(args: RunArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let sources = resolve_sources(&args.sources, &config)?;

    let database_url = args
        .database_url
        .clone()
        .or_else(|| config.database.url.clone())
        .ok_or_else(|| {
            CliError::Config(
                "No database URL. Set url in the [database] section or pass --database-url"
                    .to_string(),
            )
        })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let summaries = runtime.block_on(run_sources(&args, &config, &database_url, sources))?;

    println!();
    for summary in &summaries {
        print_summary(summary);
    }
    Ok(())
}

async fn run_sources(
    args: &RunArgs,
    config: &ConfigFile,
    database_url: &str,
    sources: Vec<DataSource>,
) -> Result<Vec<RunSummary>, CliError> {
    let store = PgStore::connect(database_url, config.store_config()?).await?;
    let options = PipelineOptions::from_config(config).with_dry_run(args.dry_run);
    let show_progress = !args.no_progress && std::io::stderr().is_terminal();

    let mut summaries = Vec::with_capacity(sources.len());
    for source in sources {
        let name = source.name.clone();
        let client = config.http_client(&source)?;
        let pipeline = MetadataPipeline::new(source, client, options.clone());

        let progress = RunProgress::start(&name, pipeline.metrics(), show_progress);
        let result = pipeline.run(&store).await;
        progress.finish();

        let summary = result.map_err(|e| CliError::run(&name, e))?;
        info!(source = %name, records = summary.records_written, "Source complete");
        summaries.push(summary);
    }
    Ok(summaries)
}

fn print_summary(summary: &RunSummary) {
    let status = if summary.dry_run {
        style("dry run").yellow()
    } else {
        style("done").green()
    };
    println!("{} {}", style(&summary.source).bold(), status);
    println!(
        "  Geometries: {} read, {} scored, {} without data",
        summary.geometries_read, summary.geometries_scored, summary.geometries_skipped
    );
    println!(
        "  Tiles:      {} fetched, {} failed, {:.1}% cache hits",
        summary.telemetry.tiles_fetched,
        summary.telemetry.tile_failures(),
        summary.telemetry.cache_hit_rate() * 100.0
    );
    if !summary.dry_run {
        println!(
            "  Written:    {} records to column {}",
            summary.records_written, summary.metric
        );
    }
    println!(
        "  Elapsed:    {:.1}s",
        summary.telemetry.elapsed.as_secs_f64()
    );
}
