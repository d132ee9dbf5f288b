use anyhow::Result;
use clap::Parser;
use cohortstat::cli::{Cli, OutputFormat, Stage};
use cohortstat::pipeline;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; logs go to stderr so stdout carries the report
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = args.resolve_config()?;

    if matches!(args.stage, Stage::Combine | Stage::Run) {
        let (cohorts, stats) = pipeline::combine_with_stats(&config)?;
        if args.stage == Stage::Combine {
            println!(
                "Combined {} subjects into 4 cohort tables ({} considered, {} without attributes, {} without data)",
                cohorts.total(),
                stats.considered,
                stats.missing_attributes,
                stats.missing_data
            );
        }
    }

    if matches!(args.stage, Stage::Analyze | Stage::Run) {
        let report = pipeline::analyze(&config)?;
        match args.format {
            OutputFormat::Text => print!("{}", report.to_report_string()),
            OutputFormat::Json => println!("{}", report.to_json()?),
        }
    }

    Ok(())
}
