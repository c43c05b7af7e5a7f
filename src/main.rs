use anyhow::{Context, Result};
use clap::Parser;
use top_colors::cli::Cli;
use top_colors::core_modules::outcome_sink::{LineSink, OutcomeSink};
use top_colors::core_modules::reference_source::{DelimitedSource, ListSource, ReferenceSource};
use top_colors::pipeline::Pipeline;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.pipeline_config()?;
    let failures = config.failure_rendering;
    let pipeline = Pipeline::from_config(config)?;

    // The input is opened before the output is created, so a bad input path
    // leaves an existing output file untouched.
    let source: Box<dyn ReferenceSource> = match &cli.input {
        Some(path) => Box::new(DelimitedSource::open(path).await?),
        None => Box::new(ListSource::new(cli.references)),
    };
    let mut sink: Box<dyn OutcomeSink> = match &cli.output {
        Some(path) => Box::new(
            LineSink::create(path, failures)
                .with_context(|| format!("failed to open output file {}", path.display()))?,
        ),
        None => Box::new(LineSink::console(failures)),
    };

    let summary = pipeline.run(source, &mut sink).await?;
    tracing::debug!(?summary, "done");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "top_colors=debug" } else { "top_colors=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
