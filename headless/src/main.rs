use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use well_capture_core::flow::{self, FlowFieldTimeSeries};
use well_capture_core::reconcile::ReconciledRow;
use well_capture_core::tracking::RecordedRunner;
use well_capture_core::{
    Mp7Adapter, PipelineError, PrtAdapter, Scenario, ScenarioConfig, TrackingDirection,
    TrajectoryReconciler, Vec2,
};

/// Well capture-zone delineation by backward particle tracking
#[derive(Parser, Debug)]
#[command(name = "well-capture")]
#[command(about = "Well capture-zone delineation on a quadtree-refined grid", long_about = None)]
struct Args {
    /// Scenario configuration (JSON); the built-in quadpatch scenario when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the built-in scenario configuration as JSON
    Config {
        /// Output file
        output: PathBuf,
    },

    /// Refine the grid and report its structure
    Grid {
        /// Write the DISV description as JSON
        #[arg(long)]
        disv: Option<PathBuf>,
    },

    /// Write release-package rows for every release group as CSV
    Releases {
        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Reverse a flow-field series file
    Reverse {
        /// Series JSON to reverse
        input: PathBuf,
        /// Reversed series JSON
        output: PathBuf,
    },

    /// Reconcile recorded PRT and MP7 output into one record set
    Reconcile {
        /// PRT track CSV
        #[arg(long)]
        prt_tracks: PathBuf,

        /// MP7 pathline table (CSV)
        #[arg(long)]
        mp7_pathlines: PathBuf,

        /// MP7 endpoint table (CSV)
        #[arg(long)]
        mp7_endpoints: PathBuf,

        /// Flow-field series the runs used (steady field from the config's time axis otherwise)
        #[arg(long)]
        series: Option<PathBuf>,

        /// x offset added to MP7 coordinates
        #[arg(long, default_value_t = 0.0)]
        mp7_xorigin: f64,

        /// y offset added to MP7 coordinates
        #[arg(long, default_value_t = 0.0)]
        mp7_yorigin: f64,

        /// Largest termination-time difference reported as consistent
        #[arg(short, long, default_value_t = 1.0)]
        tolerance: f64,

        /// Write reconciled records as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), PipelineError> {
    let config = match &args.config {
        Some(path) => ScenarioConfig::load(path)?,
        None => ScenarioConfig::default(),
    };

    match &args.command {
        Command::Config { output } => {
            config.save(output)?;
            info!("Wrote scenario '{}' to {}", config.name, output.display());
        }
        Command::Grid { disv } => grid(&config, disv.as_deref())?,
        Command::Releases { output } => releases(&config, output)?,
        Command::Reverse { input, output } => {
            let reversed = flow::reverse_file(input, output)?;
            println!(
                "Reversed {} frames over {:.1} time units -> {}",
                reversed.len(),
                reversed.total_duration(),
                output.display()
            );
        }
        Command::Reconcile {
            prt_tracks,
            mp7_pathlines,
            mp7_endpoints,
            series,
            mp7_xorigin,
            mp7_yorigin,
            tolerance,
            output,
        } => {
            let model = Scenario::assemble(&config)?;
            let field = match series {
                Some(path) => flow::read_series(path)?,
                None => {
                    let nnodes = model.grid.nnodes();
                    FlowFieldTimeSeries::steady(&config.tdis, &vec![0.0; nnodes], &vec![Vec::new(); nnodes])?
                }
            };

            let mut prt = PrtAdapter::with_settings(
                RecordedRunner::from_files(prt_tracks, None)?,
                TrackingDirection::Backward,
                config.prt_settings(),
            );
            let mut mp7 = Mp7Adapter::with_settings(
                RecordedRunner::from_files(mp7_pathlines, Some(mp7_endpoints.as_path()))?,
                TrackingDirection::Backward,
                config.mp7_settings(),
            )
            .with_origin(Vec2::new(*mp7_xorigin, *mp7_yorigin));

            let reconciler = TrajectoryReconciler::new(config.release_tolerance);
            let analysis = Scenario::analyze(&model, &field, &mut prt, &mut mp7, &reconciler)?;

            println!("=== Capture Zone ===");
            for (group, records) in &analysis.capture_zone.groups {
                println!("Group {group}: {} boundary exits", records.len());
            }

            let report = &analysis.consistency;
            println!("\n=== {} vs {} ===", report.first, report.second);
            println!("Shared particles: {}", report.comparisons.len());
            println!(
                "Only {}: {}, only {}: {}",
                report.first,
                report.only_first.len(),
                report.second,
                report.only_second.len()
            );
            if let (Some(max), Some(mean)) = (report.max_time_difference(), report.mean_time_difference()) {
                println!("Termination time difference: max {max:.3}, mean {mean:.3}");
            }
            println!(
                "Reason mismatches: {}, layer mismatches: {}",
                report.reason_mismatches(),
                report.layer_mismatches()
            );
            println!(
                "Consistent within {tolerance}: {}",
                if report.within(*tolerance) { "yes" } else { "no" }
            );

            if let Some(path) = output {
                let rows: Vec<ReconciledRow> = analysis.records.iter().map(|r| r.row()).collect();
                write_csv(path, &rows)?;
                info!("Wrote {} records to {}", rows.len(), path.display());
            }
        }
    }
    Ok(())
}

fn grid(config: &ScenarioConfig, disv: Option<&Path>) -> Result<(), PipelineError> {
    let model = Scenario::assemble(config)?;
    let grid = &model.grid;

    println!("=== Refined Grid ===");
    println!(
        "{} layers, {} cells per layer, {} vertices, {} nodes",
        grid.nlay(),
        grid.ncpl(),
        grid.vertices().len(),
        grid.nnodes()
    );
    for (level, count) in grid.level_histogram().iter().enumerate() {
        println!("  level {level}: {count} cells");
    }
    for well in &model.wells {
        println!("Well '{}': nodes {:?}", well.name, well.nodes());
    }
    for river in &model.rivers {
        println!("River '{}': {} cells", river.name, river.cells.len());
    }

    if let Some(path) = disv {
        let file = std::fs::File::create(path).map_err(|e| output_error(path, &e))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &grid.disv())
            .map_err(|e| output_error(path, &e))?;
        info!("Wrote DISV to {}", path.display());
    }
    Ok(())
}

#[derive(Serialize)]
struct ReleaseRow {
    group: u32,
    irpt: u32,
    k: usize,
    icpl: usize,
    x: f64,
    y: f64,
    z: f64,
}

fn releases(config: &ScenarioConfig, output: &Path) -> Result<(), PipelineError> {
    let model = Scenario::assemble(config)?;
    let mut rows = Vec::new();
    for (group, records) in model.prp_records()? {
        println!("Group {}: {} release points ({})", group.group, records.len(), group.scheme.name());
        rows.extend(records.into_iter().map(|r| ReleaseRow {
            group: group.group.0,
            irpt: r.irpt,
            k: r.k,
            icpl: r.icpl,
            x: r.x,
            y: r.y,
            z: r.z,
        }));
    }
    write_csv(output, &rows)?;
    info!("Wrote {} release rows to {}", rows.len(), output.display());
    Ok(())
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| output_error(path, &e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| output_error(path, &e))?;
    }
    writer.flush().map_err(|e| output_error(path, &e))
}

fn output_error(path: &Path, e: &dyn std::fmt::Display) -> PipelineError {
    PipelineError::Output(format!("{}: {e}", path.display()))
}
