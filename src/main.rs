use anyhow::Context;
use clap::{Parser, Subcommand};
use social_pulse::{
    csv_parser, logging, Aggregator, AnalyticsData, Config, CsvParser, CsvSource, ReportFormat,
    Reporter, RowIssue, SampleGenerator, TimeBucket,
};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "social-pulse")]
#[command(about = "Sentiment and engagement analytics for social-media post exports")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one or more CSV exports
    Analyze {
        /// CSV files to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory for reports
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Generate only a specific report format
        #[arg(long, value_enum)]
        format: Option<ReportFormat>,

        /// Number of brands and topics to rank
        #[arg(long)]
        top: Option<usize>,

        /// Time-series granularity
        #[arg(long, value_enum)]
        bucket: Option<TimeBucket>,

        /// Print the summary without writing report files
        #[arg(long)]
        no_export: bool,
    },
    /// Write generated sample posts as CSV
    Sample {
        /// Number of posts to generate
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Destination file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Analyze generated sample data
    Demo {
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory for reports
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Generate only a specific report format
        #[arg(long, value_enum)]
        format: Option<ReportFormat>,

        /// Print the summary without writing report files
        #[arg(long)]
        no_export: bool,
    },
    /// Generate a default configuration file
    Config {
        /// Output path for the config file (defaults to ~/.social-pulse.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(if cli.verbose { "debug" } else { "info" });

    match cli.command {
        Commands::Analyze {
            files,
            config,
            output,
            format,
            top,
            bucket,
            no_export,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(top) = top {
                anyhow::ensure!(top > 0, "--top must be at least 1");
                config.analytics.top_n = top;
            }
            if let Some(bucket) = bucket {
                config.analytics.bucket = bucket;
            }
            apply_output_overrides(&mut config, output, format);
            analyze_files(&files, &config, no_export).await?;
        }
        Commands::Sample {
            count,
            seed,
            output,
            config,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(count) = count {
                config.sample.count = count;
            }
            if seed.is_some() {
                config.sample.seed = seed;
            }
            write_sample(&config, output.as_deref())?;
        }
        Commands::Demo {
            seed,
            config,
            output,
            format,
            no_export,
        } => {
            let mut config = load_config(config.as_deref())?;
            if seed.is_some() {
                config.sample.seed = seed;
            }
            apply_output_overrides(&mut config, output, format);
            run_demo(&config, no_export)?;
        }
        Commands::Config { output } => {
            generate_config(output)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load()?,
    };
    Ok(config)
}

fn apply_output_overrides(
    config: &mut Config,
    output: Option<PathBuf>,
    format: Option<ReportFormat>,
) {
    if let Some(output) = output {
        config.output.directory = output;
    }
    if let Some(format) = format {
        config.output.format = format;
    }
}

async fn analyze_files(files: &[PathBuf], config: &Config, no_export: bool) -> anyhow::Result<()> {
    println!("🚀 Starting Social Pulse Analysis");
    println!("=================================");

    let start_time = Instant::now();

    println!("📥 Reading {} file(s)...", files.len());
    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        sources.push(CsvSource::new(path.display().to_string(), content));
    }

    println!("\n📝 Parsing posts...");
    let parser = CsvParser::new(&config.csv)?;
    let outcome = parser.parse_sources(&sources)?;
    for status in &outcome.sources {
        match &status.error {
            None => println!("  ✓ {} ({} posts)", status.name, status.posts),
            Some(error) => eprintln!("  ✗ {}: {}", status.name, error),
        }
    }
    if !outcome.skipped.is_empty() {
        println!("  ⚠️  Skipped {} malformed row(s)", outcome.skipped.len());
    }

    let source_name = files
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let analytics = Aggregator::new((&config.analytics).into()).aggregate(&outcome.posts);
    finish(&analytics, &outcome.skipped, &source_name, start_time, config, no_export)
}

fn run_demo(config: &Config, no_export: bool) -> anyhow::Result<()> {
    println!("🚀 Starting Social Pulse Demo");
    println!("=============================");

    let start_time = Instant::now();

    println!("🎲 Generating {} sample posts...", config.sample.count);
    let posts = SampleGenerator::new(&config.sample).generate(chrono::Utc::now());

    let analytics = Aggregator::new((&config.analytics).into()).aggregate(&posts);
    finish(&analytics, &[], "sample data", start_time, config, no_export)
}

fn finish(
    analytics: &AnalyticsData,
    skipped: &[RowIssue],
    source: &str,
    start_time: Instant,
    config: &Config,
    no_export: bool,
) -> anyhow::Result<()> {
    let duration = start_time.elapsed();

    println!();
    analytics.print_summary();

    if no_export {
        println!("\n✅ Analysis completed in {:.2}s", duration.as_secs_f64());
        return Ok(());
    }

    println!("\n📊 Generating reports...");
    let reporter = Reporter::new();
    let report = reporter.generate_report(analytics, skipped, source, duration.as_millis());
    let exported_files =
        reporter.export_report(&report, &config.output.directory, config.output.format)?;

    println!("\n✅ Analysis completed in {:.2}s", duration.as_secs_f64());
    println!("📁 Reports exported to:");
    for file in exported_files {
        println!("   - {}", file.display());
    }

    Ok(())
}

fn write_sample(config: &Config, output: Option<&Path>) -> anyhow::Result<()> {
    let posts = SampleGenerator::new(&config.sample).generate(chrono::Utc::now());

    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            csv_parser::write_posts(&posts, file)?;
            eprintln!("✅ Wrote {} sample posts to {}", posts.len(), path.display());
        }
        None => {
            csv_parser::write_posts(&posts, std::io::stdout().lock())?;
        }
    }

    Ok(())
}

fn generate_config(output_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config_path = match output_path {
        Some(path) => path,
        None => Config::default_config_path()?,
    };

    println!("📝 Generating configuration file: {}", config_path.display());

    std::fs::write(&config_path, Config::create_documented_config())
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("✅ Configuration file created successfully!");
    println!("💡 Edit the file to customize your analysis settings.");
    println!();
    println!("🔧 Key configuration areas:");
    println!("  • CSV delimiter and trimming");
    println!("  • Ranking size and time-series granularity");
    println!("  • Sample data size and seed");
    println!("  • Report output directory and format");

    Ok(())
}
