use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use fm_app::{AppResult, Config, ConfigProp, duplicate_flows_message, viewport_for_locations};
use fm_core::Real;
use fm_data::{
    Dataset, DatasetBuilder, DedupeOptions, FlowRecord, MissingLocationPolicy, RawFlow,
    RawLocation, ValidationPolicy, calc_flow_totals, calc_location_totals, dedupe_flows_with,
};
use fm_layers::{FlowMapColors, LayersData, prepare_layers_data};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fm-cli")]
#[command(about = "Flowmap CLI - origin/destination flow layers tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build layers data and print buffer sizes
    Layers {
        /// Path to the dataset JSON file
        dataset_path: PathBuf,
        /// Use the diverging palette for signed differences
        #[arg(long)]
        diff: bool,
        /// Fail instead of dropping flows with unknown endpoints
        #[arg(long)]
        strict: bool,
        /// Write the layers data as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sum duplicate flows and report them
    Dedupe {
        /// Path to the dataset JSON file
        dataset_path: PathBuf,
    },
    /// Print dataset totals and the busiest locations
    Totals {
        /// Path to the dataset JSON file
        dataset_path: PathBuf,
        /// Number of locations to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Time the pipeline on a synthetic dataset
    Bench {
        #[arg(long, default_value_t = 1000)]
        locations: usize,
        #[arg(long, default_value_t = 100_000)]
        flows: usize,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Input file: the three sheets of a flow map.
#[derive(Debug, Default, Deserialize)]
struct DatasetFile {
    #[serde(default)]
    properties: Vec<ConfigProp>,
    #[serde(default)]
    locations: Vec<RawLocation>,
    #[serde(default)]
    flows: Vec<RawFlow>,
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Layers {
            dataset_path,
            diff,
            strict,
            output,
        } => cmd_layers(&dataset_path, diff, strict, output.as_deref()),
        Commands::Dedupe { dataset_path } => cmd_dedupe(&dataset_path),
        Commands::Totals { dataset_path, top } => cmd_totals(&dataset_path, top),
        Commands::Bench {
            locations,
            flows,
            json,
        } => cmd_bench(locations, flows, json),
    }
}

fn load_file(path: &Path) -> AppResult<DatasetFile> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn build_dataset(file: &DatasetFile, config: &Config, strict: bool) -> AppResult<Dataset> {
    let policy = ValidationPolicy {
        missing_location: if strict {
            MissingLocationPolicy::Error
        } else {
            MissingLocationPolicy::Drop
        },
        report_duplicates: !config.ignore_errors(),
    };
    Ok(Dataset::from_rows(&file.locations, &file.flows, policy)?)
}

fn cmd_layers(path: &Path, diff: bool, strict: bool, output: Option<&Path>) -> AppResult<()> {
    let file = load_file(path)?;
    let config = Config::from_props(&file.properties);
    if let Some(title) = config.title() {
        println!("{}", title);
    }

    let dataset = build_dataset(&file, &config, strict)?;
    if let Some(message) = duplicate_flows_message(dataset.duplicates(), &config) {
        println!("⚠ {}", message);
    }
    if !dataset.dropped_flows().is_empty() {
        println!(
            "⚠ Dropped {} flows with unknown locations",
            dataset.dropped_flows().len()
        );
    }

    let colors = if diff {
        FlowMapColors::default_diff()
    } else {
        FlowMapColors::default()
    };
    let start = Instant::now();
    let layers = prepare_layers_data(dataset.locations(), dataset.flows(), &colors)?;
    let elapsed = start.elapsed();

    print_layers_summary(&layers);
    println!("  Prepared in {:.3} ms", elapsed.as_secs_f64() * 1e3);

    if let Some(vp) = viewport_for_locations(dataset.locations(), (1280, 800)) {
        println!(
            "  Viewport: lon {:.4}, lat {:.4}, zoom {:.2}",
            vp.longitude, vp.latitude, vp.zoom
        );
    }

    if let Some(output) = output {
        fs::write(output, serde_json::to_string(&layers)?)?;
        println!("✓ Wrote {}", output.display());
    }
    Ok(())
}

fn print_layers_summary(layers: &LayersData) {
    let circles = layers.circle_attributes();
    let lines = layers.line_attributes();
    println!("Circles: {}", circles.length());
    println!("  position: {} values", circles.position().value().len());
    println!("  color: {} values", circles.color().value().len());
    println!("  radius: {} values", circles.radius().value().len());
    println!("Lines: {}", lines.length());
    println!("  source position: {} values", lines.source_position().value().len());
    println!("  target position: {} values", lines.target_position().value().len());
    println!("  thickness: {} values", lines.thickness().value().len());
    println!("  color: {} values", lines.color().value().len());
    println!("  endpoint offsets: {} values", lines.endpoint_offsets().value().len());
}

fn cmd_dedupe(path: &Path) -> AppResult<()> {
    let file = load_file(path)?;
    let config = Config::from_props(&file.properties);
    let outcome = dedupe_flows_with(
        &file.flows,
        DedupeOptions {
            report_duplicates: !config.ignore_errors(),
        },
    );

    println!("Rows: {}", file.flows.len());
    println!("Unique flows: {}", outcome.flows.len());
    if outcome.incomplete_rows > 0 {
        println!("Skipped rows without origin or dest: {}", outcome.incomplete_rows);
    }
    match duplicate_flows_message(&outcome.duplicates, &config) {
        Some(message) => println!("⚠ {}", message),
        None => println!("✓ No duplicate flows reported"),
    }
    Ok(())
}

fn cmd_totals(path: &Path, top: usize) -> AppResult<()> {
    let file = load_file(path)?;
    let config = Config::from_props(&file.properties);
    let dataset = build_dataset(&file, &config, false)?;

    let totals = calc_flow_totals(dataset.flows());
    println!("Flows: {}", dataset.flows().len());
    println!("  Between locations: {}", totals.outgoing_count);
    println!("  Within locations: {}", totals.internal_count);

    let per_location = calc_location_totals(dataset.locations(), dataset.flows());
    let mut ranked: Vec<(&str, Real)> = dataset
        .locations()
        .iter()
        .map(|loc| (loc.name.as_str(), per_location.max_abs_total(loc.id.as_str())))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    if !ranked.is_empty() {
        println!("Top locations:");
        for (name, total) in ranked.into_iter().take(top) {
            println!("  {} - {}", name, total);
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct BenchResult {
    locations: usize,
    flows: usize,
    lines: usize,
    build_ms: f64,
    layers_ms: f64,
}

fn cmd_bench(locations: usize, flows: usize, json: bool) -> AppResult<()> {
    let start = Instant::now();
    let dataset = synthetic_dataset(locations, flows)?;
    let build_ms = start.elapsed().as_secs_f64() * 1e3;

    let start = Instant::now();
    let layers = prepare_layers_data(dataset.locations(), dataset.flows(), &FlowMapColors::default())?;
    let layers_ms = start.elapsed().as_secs_f64() * 1e3;

    let result = BenchResult {
        locations: dataset.locations().len(),
        flows: dataset.flows().len(),
        lines: layers.line_attributes().length(),
        build_ms,
        layers_ms,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "{} locations, {} flows ({} lines)",
            result.locations, result.flows, result.lines
        );
        println!("  Dataset build: {:.3} ms", result.build_ms);
        println!("  Layers data:   {:.3} ms", result.layers_ms);
    }
    Ok(())
}

/// Deterministic pseudo-random dataset on a lon/lat grid.
fn synthetic_dataset(locations: usize, flows: usize) -> AppResult<Dataset> {
    let mut builder = DatasetBuilder::new();
    let side = (locations as f64).sqrt().ceil().max(1.0) as usize;
    for i in 0..locations {
        let lon = -170.0 + 340.0 * (i % side) as Real / side as Real;
        let lat = -80.0 + 160.0 * (i / side) as Real / side as Real;
        builder.add_location(format!("L{i}"), format!("Location {i}"), lon, lat);
    }

    let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    if locations > 0 {
        for _ in 0..flows {
            let origin = next() as usize % locations;
            let dest = next() as usize % locations;
            let count = (next() % 10_000) as Real;
            builder.add_flow(format!("L{origin}"), format!("L{dest}"), count);
        }
    }
    let dataset = builder.build()?;
    tracing::debug!(
        internal = dataset.flows().iter().filter(|f| f.is_internal()).count(),
        "synthetic dataset ready"
    );
    Ok(dataset)
}
