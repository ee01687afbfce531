//! mt-response: evaluate and export magnetotelluric channel responses.
//!
//! Reads a survey filter file (JSON or TOML) whose channels reference
//! shared filters by name, and reports composite responses, pass bands,
//! sensitivities and StationXML-style response stages.

mod analysis;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lib_metadata::{parse_fap_file, SurveyFilters};
use lib_types::units::Hertz;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "mt-response")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Analysis configuration file (TOML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// List the filters and channels of a survey
    Inspect {
        /// Path to the survey filter file
        survey: PathBuf,

        /// Show the summary of a single channel
        #[arg(long)]
        channel: Option<String>,
    },

    /// Evaluate the composite response of a channel
    Response {
        /// Path to the survey filter file
        survey: PathBuf,

        /// Channel name
        #[arg(long)]
        channel: String,

        /// Divide by the peak amplitude
        #[arg(long)]
        normalize: bool,

        /// Include time-delay stages
        #[arg(long)]
        include_delay: bool,

        /// Leave out decimation stages
        #[arg(long)]
        exclude_decimation: bool,

        /// Lowest grid frequency as a power of ten
        #[arg(long, allow_hyphen_values = true)]
        start_exp: Option<f64>,

        /// Highest grid frequency as a power of ten
        #[arg(long, allow_hyphen_values = true)]
        stop_exp: Option<f64>,

        /// Number of grid points
        #[arg(long)]
        points: Option<usize>,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute the instrument sensitivity of a channel
    Sensitivity {
        /// Path to the survey filter file
        survey: PathBuf,

        /// Channel name
        #[arg(long)]
        channel: String,

        /// Normalization frequency (Hz); derived from the pass band if omitted
        #[arg(long)]
        frequency: Option<f64>,
    },

    /// Check that stage units chain correctly
    CheckUnits {
        /// Path to the survey filter file
        survey: PathBuf,

        /// Channel name; all channels if omitted
        #[arg(long)]
        channel: Option<String>,
    },

    /// Export a channel as sensitivity plus response stages (JSON)
    Export {
        /// Path to the survey filter file
        survey: PathBuf,

        /// Channel name
        #[arg(long)]
        channel: String,

        /// Sample rate recorded on the stages (Hz)
        #[arg(long)]
        sample_rate: Option<f64>,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse and validate a FAP calibration table
    ParseFap {
        /// Path to the table
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let mut analysis_config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::AnalysisConfig::default(),
    };

    match cli.command {
        Commands::Inspect { survey, channel } => {
            let analyzer = analyzer(&survey, analysis_config)?;
            inspect(&analyzer, channel.as_deref(), cli.format)?;
        }
        Commands::Response {
            survey,
            channel,
            normalize,
            include_delay,
            exclude_decimation,
            start_exp,
            stop_exp,
            points,
            output,
        } => {
            let grid = &mut analysis_config.grid;
            grid.start_exp = start_exp.unwrap_or(grid.start_exp);
            grid.stop_exp = stop_exp.unwrap_or(grid.stop_exp);
            grid.num_points = points.unwrap_or(grid.num_points);
            let flags = &mut analysis_config.response;
            flags.normalize |= normalize;
            flags.include_delay |= include_delay;
            flags.include_decimation &= !exclude_decimation;
            config::validate_config(&analysis_config)?;

            let analyzer = analyzer(&survey, analysis_config)?;
            let curve = analyzer.response_curve(&channel)?;
            let mut w = output::open_output(output.as_deref())?;
            output::write_curve(&curve, &mut *w, cli.format)?;
        }
        Commands::Sensitivity { survey, channel, frequency } => {
            let analyzer = analyzer(&survey, analysis_config)?;
            let (at, value) = analyzer.sensitivity(&channel, frequency.map(Hertz))?;
            match cli.format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({"channel": channel, "frequency": at.0, "sensitivity": value})
                ),
                OutputFormat::Csv => println!("channel,frequency,sensitivity\n{},{},{}", channel, at.0, value),
                OutputFormat::Text => println!("{}: {} at {} Hz", channel, value, at.0),
            }
        }
        Commands::CheckUnits { survey, channel } => {
            let analyzer = analyzer(&survey, analysis_config)?;
            let checks = analyzer.check_units(channel.as_deref())?;
            output::write_unit_checks(&checks, &mut std::io::stdout(), cli.format)?;
            if let Some(failed) = checks.iter().find(|c| !c.consistent) {
                anyhow::bail!("Unit check failed for channel '{}'", failed.channel);
            }
        }
        Commands::Export { survey, channel, sample_rate, output } => {
            let analyzer = analyzer(&survey, analysis_config)?;
            let response = analyzer.export(&channel, sample_rate.map(Hertz))?;
            let mut w = output::open_output(output.as_deref())?;
            output::write_export(&response, &mut *w)?;
        }
        Commands::ParseFap { file } => {
            tracing::info!("Parsing FAP table: {:?}", file);
            let table = parse_fap_file(&file)
                .with_context(|| format!("Failed to parse FAP table {:?}", file))?;
            output::write_fap(&table, &mut std::io::stdout(), cli.format)?;
        }
    }

    Ok(())
}

fn analyzer(survey_path: &Path, config: config::AnalysisConfig) -> Result<analysis::Analyzer> {
    tracing::info!("Loading survey from {:?}", survey_path);
    let survey = SurveyFilters::load(survey_path)
        .with_context(|| format!("Failed to load survey file {:?}", survey_path))?;
    Ok(analysis::Analyzer::new(survey, config))
}

fn inspect(analyzer: &analysis::Analyzer, channel: Option<&str>, format: OutputFormat) -> Result<()> {
    let survey = analyzer.survey();

    if let Some(name) = channel {
        let summary = analyzer.summary(name)?;
        return output::write_summary(&summary, &mut std::io::stdout(), format);
    }

    match format {
        OutputFormat::Json => {
            let summaries = survey
                .channels
                .iter()
                .map(|c| analyzer.summary(&c.name))
                .collect::<Result<Vec<_>>>()?;
            let filters: Vec<_> = survey.registry.iter().collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "filters": filters,
                    "channels": summaries,
                }))?
            );
        }
        OutputFormat::Text | OutputFormat::Csv => {
            println!("Filters: {}", survey.registry.len());
            for name in survey.registry.names() {
                println!("  {}", name);
            }
            println!("\nChannels: {}", survey.channels.len());
            for channel in &survey.channels {
                let mut response = analyzer.channel(&channel.name)?;
                println!("\n  Channel: {} ({} Hz)", channel.name, channel.sample_rate.0);
                match response.compute_instrument_sensitivity(None) {
                    Ok(s) => println!("    Sensitivity: {}", s),
                    Err(e) => println!("    Sensitivity: unavailable ({})", e),
                }
                print!("{}", response);
            }
        }
    }

    Ok(())
}
