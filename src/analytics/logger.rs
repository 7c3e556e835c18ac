//! Structured logging for simulation results

use crate::analytics::grouping::{unique_count, GroupKey, GroupSummary};
use crate::simulation::SimulationResults;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Handles logging of simulation results to files
pub struct SimulationLogger {
    output_dir: String,
}

impl SimulationLogger {
    /// Create a new logger with the specified output directory
    pub fn new(output_dir: &str) -> Self {
        Self {
            output_dir: output_dir.to_string(),
        }
    }

    /// Ensure output directories exist
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(format!("{}/logs", self.output_dir))
            .context("Failed to create logs directory")?;
        fs::create_dir_all(format!("{}/reports", self.output_dir))
            .context("Failed to create reports directory")?;
        Ok(())
    }

    fn write_log(&self, stem: &str, ext: &str, contents: &str) -> Result<String> {
        self.ensure_dirs()?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let filename = format!("{}/logs/{}_{}.{}", self.output_dir, stem, timestamp, ext);

        let mut file = File::create(&filename)
            .with_context(|| format!("Failed to create {}", filename))?;

        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write {}", filename))?;

        info!("Saved: {}", filename);
        Ok(filename)
    }

    /// Save simulation results to JSON file
    pub fn save_results(&self, results: &SimulationResults) -> Result<String> {
        let json = serde_json::to_string_pretty(results)
            .context("Failed to serialize results")?;
        self.write_log("simulation", "json", &json)
    }

    /// Save the observation table as CSV
    pub fn save_table_csv(&self, results: &SimulationResults) -> Result<String> {
        self.write_log("observations", "csv", &results.table.to_csv())
    }

    /// Save a summary text file
    pub fn save_summary(&self, results: &SimulationResults) -> Result<String> {
        self.write_log("summary", "txt", &format_summary(results))
    }

    /// Load results from a JSON file
    pub fn load_results(path: &Path) -> Result<SimulationResults> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read results file {}", path.display()))?;

        serde_json::from_str(&contents)
            .context("Failed to parse results file")
    }
}

/// Format results as a text summary
pub fn format_summary(results: &SimulationResults) -> String {
    let s = &results.summary;
    let c = &results.config;
    let rows = results.table.rows();
    let species_per_mountain = unique_count(rows, GroupKey::Mountain, GroupKey::Species);

    let mut mountains = String::new();
    for (idx, count) in results.design.obs_per_mountain.iter().enumerate() {
        let mountain = idx as u32 + 1;
        mountains.push_str(&format!(
            "║  Mountain {:>3}:  {:>6} obs   {:>4} species                        ║\n",
            mountain,
            count,
            species_per_mountain.get(&mountain).copied().unwrap_or(0),
        ));
    }

    format!(
        r#"
╔══════════════════════════════════════════════════════════════════╗
║            HIERARCHICAL SAMPLE RESULTS                           ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  CONFIGURATION                                                   ║
║  ─────────────                                                   ║
║  Mountains:             {:>10}                               ║
║  Genera:                {:>10}                               ║
║  Obs per Mountain:      {:>4} - {:<4}                              ║
║  Species per Genus:     {:>4} - {:<4}                              ║
║  Fixed Intercept:       {:>10.3}                               ║
║  Fixed Slope:           {:>10.3}                               ║
║  Nesting:               {:>10}                               ║
║  Seed:                  {:>20}                     ║
║                                                                  ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  DESIGN                                                          ║
║  ──────                                                          ║
║  Total Observations:    {:>10}                               ║
║  Total Species:         {:>10}                               ║
║  Nesting Violations:    {:>10}                               ║
║                                                                  ║
{}║                                                                  ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  WEIGHT                                                          ║
║  ──────                                                          ║
║  Mean:                  {:>10.3}                               ║
║  Std Dev:               {:>10.3}                               ║
║  Range:                 {:>10.3} - {:<10.3}                    ║
║  Mean Elevation:        {:>10.3}                               ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝

Digest:    {}
Generated: {}
"#,
        // Configuration
        c.num_mountains,
        c.num_genera,
        c.obs_per_mountain.min,
        c.obs_per_mountain.max,
        c.species_per_genus.min,
        c.species_per_genus.max,
        c.fixed_intercept,
        c.fixed_slope,
        format!("{:?}", c.nesting).to_lowercase(),
        c.seed.map(|seed| seed.to_string()).unwrap_or_else(|| "-".to_string()),
        // Design
        s.total_observations,
        s.total_species,
        s.nesting_violations,
        mountains,
        // Weight
        s.mean_weight,
        s.sd_weight,
        s.min_weight,
        s.max_weight,
        s.mean_elevation,
        s.digest,
        results.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

/// Format grouped summaries as an aligned text table
pub fn format_group_table(summaries: &[GroupSummary]) -> String {
    let fmt_opt = |v: Option<f64>| v.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string());

    let mut out = format!(
        "{:<32} {:>7} {:>10} {:>10} {:>10} {:>10}\n",
        "group", "n", "elev_mean", "elev_sd", "wt_mean", "wt_sd"
    );
    for summary in summaries {
        out.push_str(&format!(
            "{:<32} {:>7} {:>10} {:>10} {:>10} {:>10}\n",
            summary.label(),
            summary.count,
            fmt_opt(summary.elevation.map(|m| m.mean)),
            fmt_opt(summary.elevation.and_then(|m| m.sd)),
            fmt_opt(summary.weight.map(|m| m.mean)),
            fmt_opt(summary.weight.and_then(|m| m.sd)),
        ));
    }
    out
}

/// Print summary to terminal
pub fn print_summary(results: &SimulationResults) {
    println!("{}", format_summary(results));
}
