//! Hierarchical Sample Simulation CLI
//!
//! Command-line interface for generating, summarizing and charting nested
//! random-effects samples.

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use nested_sim::{
    analytics::{
        grouping::{group_by, unique_count, GroupKey},
        logger::{format_group_table, print_summary, SimulationLogger},
        report::generate_report,
    },
    config::{CountRange, NestingMode, SimulationConfig},
    simulation::{generate, SimulationResults},
};

#[derive(Parser)]
#[command(name = "nested-sim")]
#[command(author = "Nested Sim Team")]
#[command(version = "0.1.0")]
#[command(about = "Hierarchical random-effects sample simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a sample, save it and render the report
    Run(RunArgs),

    /// Generate a small seeded sample and print its summary
    Quick {
        /// RNG seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },

    /// Generate report from existing simulation results
    Report {
        /// Input JSON file with simulation results
        #[arg(short, long)]
        input: PathBuf,

        /// Output HTML file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print grouped statistics of existing simulation results
    Summarize {
        /// Input JSON file with simulation results
        #[arg(short, long)]
        input: PathBuf,

        /// Columns to group by
        #[arg(short, long, value_enum, value_delimiter = ',', default_value = "mountain")]
        by: Vec<GroupKey>,

        /// Also count distinct values of this column per first grouping column
        #[arg(short, long, value_enum)]
        unique: Option<GroupKey>,
    },

    /// Print model information
    Info,
}

#[derive(Args)]
struct RunArgs {
    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of mountains
    #[arg(short, long)]
    mountains: Option<u32>,

    /// Number of genera
    #[arg(short, long)]
    genera: Option<u32>,

    /// Minimum observations per mountain
    #[arg(long)]
    min_obs: Option<u32>,

    /// Maximum observations per mountain
    #[arg(long)]
    max_obs: Option<u32>,

    /// Minimum species per genus
    #[arg(long)]
    min_species: Option<u32>,

    /// Maximum species per genus
    #[arg(long)]
    max_species: Option<u32>,

    /// Fixed intercept
    #[arg(long, allow_hyphen_values = true)]
    intercept: Option<f64>,

    /// Fixed slope
    #[arg(long, allow_hyphen_values = true)]
    slope: Option<f64>,

    /// Species-level intercept and slope sd, e.g. `3.0,0.5`
    #[arg(long, value_delimiter = ',')]
    species_sd: Option<Vec<f64>>,

    /// Genus-level intercept and slope sd
    #[arg(long, value_delimiter = ',')]
    genus_sd: Option<Vec<f64>>,

    /// Mountain-level intercept and slope sd
    #[arg(long, value_delimiter = ',')]
    mountain_sd: Option<Vec<f64>>,

    /// How genus and species labels are drawn
    #[arg(long, value_enum)]
    nesting: Option<NestingMode>,

    /// RNG seed for a reproducible run
    #[arg(short, long)]
    seed: Option<u64>,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<String>,

    /// Skip HTML report generation
    #[arg(long)]
    no_report: bool,
}

impl RunArgs {
    fn to_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_json_file(path)?,
            None => SimulationConfig::default(),
        };

        if let Some(v) = self.mountains {
            config.num_mountains = v;
        }
        if let Some(v) = self.genera {
            config.num_genera = v;
        }
        config.obs_per_mountain = CountRange::new(
            self.min_obs.unwrap_or(config.obs_per_mountain.min),
            self.max_obs.unwrap_or(config.obs_per_mountain.max),
        );
        config.species_per_genus = CountRange::new(
            self.min_species.unwrap_or(config.species_per_genus.min),
            self.max_species.unwrap_or(config.species_per_genus.max),
        );
        if let Some(v) = self.intercept {
            config.fixed_intercept = v;
        }
        if let Some(v) = self.slope {
            config.fixed_slope = v;
        }
        for (flag, level) in [
            (&self.species_sd, &mut config.sds.species),
            (&self.genus_sd, &mut config.sds.genus),
            (&self.mountain_sd, &mut config.sds.mountain),
        ] {
            match flag.as_deref() {
                None => {}
                Some([intercept, slope]) => {
                    level.intercept = *intercept;
                    level.slope = *slope;
                }
                Some(other) => bail!("expected `intercept,slope`, got {} values", other.len()),
            }
        }
        if let Some(v) = self.nesting {
            config.nesting = v;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(v) = &self.output {
            config.output_dir = v.clone();
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG overrides the verbosity flag
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Commands::Run(args) => {
            let config = args.to_config()?;
            run_simulation(config, !args.no_report)?;
        }

        Commands::Quick { seed } => {
            run_quick_simulation(seed)?;
        }

        Commands::Report { input, output } => {
            generate_report_from_file(&input, output.as_deref())?;
        }

        Commands::Summarize { input, by, unique } => {
            summarize_file(&input, &by, unique)?;
        }

        Commands::Info => {
            print_info();
        }
    }

    Ok(())
}

fn run_simulation(config: SimulationConfig, generate_html: bool) -> Result<()> {
    println!();
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║       Hierarchical Sample Simulation                     ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();

    info!("Configuration:");
    info!("  Mountains:           {}", config.num_mountains);
    info!("  Genera:              {}", config.num_genera);
    info!("  Obs per Mountain:    {} - {}", config.obs_per_mountain.min, config.obs_per_mountain.max);
    info!("  Species per Genus:   {} - {}", config.species_per_genus.min, config.species_per_genus.max);
    info!("  Fixed Effects:       {:.3} + {:.3} x elevation", config.fixed_intercept, config.fixed_slope);
    info!("  Nesting:             {:?}", config.nesting);
    println!();

    let output_dir = config.output_dir.clone();
    let results = generate(config)?;

    print_summary(&results);

    // Save results
    let logger = SimulationLogger::new(&output_dir);
    let json_path = logger.save_results(&results)?;
    logger.save_table_csv(&results)?;
    logger.save_summary(&results)?;

    // Generate HTML report
    if generate_html {
        let report_path = format!("{}/reports/report.html", output_dir);
        generate_report(&results, &report_path)?;

        println!();
        println!("📊 Report generated: {}", report_path);
        println!("   Open in browser to view interactive charts");
    }

    println!();
    println!("📁 Results saved to: {}", json_path);
    println!();

    Ok(())
}

fn generate_report_from_file(input: &Path, output: Option<&Path>) -> Result<()> {
    info!("Loading results from: {:?}", input);

    let results = SimulationLogger::load_results(input)?;

    let output_path = output
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "output/reports/report.html".to_string());

    generate_report(&results, &output_path)?;

    println!("📊 Report generated: {}", output_path);

    Ok(())
}

fn summarize_file(input: &Path, by: &[GroupKey], unique: Option<GroupKey>) -> Result<()> {
    let results = SimulationLogger::load_results(input)?;
    print_grouped(&results, by, unique);
    Ok(())
}

fn print_grouped(results: &SimulationResults, by: &[GroupKey], unique: Option<GroupKey>) {
    let rows = results.table.rows();

    println!();
    println!("{}", format_group_table(&group_by(rows, by)));

    if let (Some(counted), Some(&first)) = (unique, by.first()) {
        println!("Unique {} per {}:", counted, first);
        for (group, count) in unique_count(rows, first, counted) {
            println!("  {}={:<6} {}", first, group, count);
        }
        println!();
    }
}

fn run_quick_simulation(seed: u64) -> Result<()> {
    println!();
    println!("🚀 Running quick simulation (seed {})...", seed);
    println!();

    let config = SimulationConfig {
        seed: Some(seed),
        ..SimulationConfig::quick_test()
    };

    let results = generate(config)?;

    print_summary(&results);
    print_grouped(&results, &[GroupKey::Mountain], Some(GroupKey::Species));

    Ok(())
}

fn print_info() {
    println!();
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║       Hierarchical Sample Simulation - Info              ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();
    println!("Simulates body weight against standardized elevation for");
    println!("individuals nested in species, genera and mountains:");
    println!();
    println!("  weight = (b0 + a_species + a_genus + a_mountain)");
    println!("         + (b1 + s_species + s_genus + s_mountain) * elevation");
    println!();
    println!("Every offset is drawn from Normal(0, sd) with a level-specific sd.");
    println!();
    println!("COMPONENTS:");
    println!("  • Generator      - Samples the design, effects and table");
    println!("  • Grouping       - Group-by counts, means and sds");
    println!("  • Metrics        - Box-plot stats, fits, histograms");
    println!("  • Report         - HTML report with Chart.js charts");
    println!();
    println!("USAGE:");
    println!("  nested-sim run --seed 7                     # Full run with report");
    println!("  nested-sim quick                            # Small seeded run");
    println!("  nested-sim report -i results.json           # Re-render report");
    println!("  nested-sim summarize -i results.json --by mountain,genus");
    println!();
}
