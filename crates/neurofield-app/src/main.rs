//! Neurofield Application
//!
//! Command-line entry point for the field-augmented mesh assembly pipeline.
//! Loads a subject head mesh, merges precomputed electric-field results for
//! a stimulation parameter selection, and reports per-tissue statistics.
//!
//! # Usage
//!
//! ```bash
//! # TMS session: merge the C3 / Deymed 70BF result set
//! neurofield tms --subject /data/sub-01 --coil bf70 --target C3 --intensity 1e6
//!
//! # tES session
//! neurofield tes --subject /data/sub-01 --montage C4-AF3 --thickness 4mm --intensity 1e6
//!
//! # Statistics only, straight from a result directory
//! neurofield report --tissue-dir /data/sub-01/Deymed_70BF/C3/npy_outputs
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use neurofield_pipeline::{
    CoilModel, ElectrodeThickness, FieldOverlayMerger, FieldReport, FlatFieldDecoder,
    FlatMeshDecoder, LoadPipeline, LoadRequest, PipelineEvent, SessionParams, StimIntensity,
    StimTarget, TesMontage,
};

/// Neurofield field-visualization pipeline
#[derive(Parser, Debug)]
#[command(name = "neurofield")]
#[command(author, version, about = "Electric-field mesh assembly for stimulation planning", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble the field-augmented grid for a TMS parameter selection
    Tms {
        /// Subject root directory (contains sub-control.msh)
        #[arg(short, long)]
        subject: PathBuf,

        /// Coil model: bf70, bf50, cb70, or cb60
        #[arg(long)]
        coil: CoilModel,

        /// Stimulation target: C3, C4, F3, or F4
        #[arg(long)]
        target: StimTarget,

        /// Coil dI/dt: 1e6, 5e6, or 10e6
        #[arg(long, default_value = "1e6")]
        intensity: StimIntensity,

        /// Write the analysis report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Assemble the field-augmented grid for a tES parameter selection
    Tes {
        /// Subject root directory (contains sub-control.msh)
        #[arg(short, long)]
        subject: PathBuf,

        /// Electrode montage: C4-AF3, F3-F4, F3-Fp2, F4-Fp1, or P3-P4
        #[arg(long)]
        montage: TesMontage,

        /// Electrode thickness: 4mm, 5mm, or 6mm
        #[arg(long, default_value = "4mm")]
        thickness: ElectrodeThickness,

        /// Stimulation intensity: 1e6, 5e6, or 10e6
        #[arg(long, default_value = "1e6")]
        intensity: StimIntensity,

        /// Write the analysis report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Report per-tissue statistics from a result directory
    Report {
        /// Directory containing the e_<tissue>.npy sample files
        #[arg(short, long)]
        tissue_dir: PathBuf,

        /// Write the report as JSON to this path instead of printing a table
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Neurofield v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Tms {
            subject,
            coil,
            target,
            intensity,
            report,
        } => {
            let params = SessionParams::Tms {
                coil,
                target,
                intensity,
            };
            run_session(&subject, params, report.as_deref())
        }
        Commands::Tes {
            subject,
            montage,
            thickness,
            intensity,
            report,
        } => {
            let params = SessionParams::Tes {
                montage,
                thickness,
                intensity,
            };
            run_session(&subject, params, report.as_deref())
        }
        Commands::Report { tissue_dir, json } => run_report(&tissue_dir, json.as_deref()),
    }
}

/// Run one load through the pipeline and print the outcome.
fn run_session(
    subject: &std::path::Path,
    params: SessionParams,
    report_path: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    info!("Session: {params}");

    let request = LoadRequest {
        mesh_path: SessionParams::mesh_path(subject),
        tissue_dir: params.result_dir(subject),
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let mut pipeline =
            LoadPipeline::new(Arc::new(FlatMeshDecoder), Arc::new(FlatFieldDecoder));
        pipeline.request_load(request);

        loop {
            match pipeline.next_event().await {
                Some(PipelineEvent::StateChanged { state, .. }) => {
                    info!("pipeline state: {state:?}");
                }
                Some(PipelineEvent::Ready(result)) => {
                    let (min, max) = result.color.domain();
                    info!(
                        "grid ready: {} points ({} overlay), color domain [{min:.3e}, {max:.3e}]",
                        result.grid.point_count(),
                        result.grid.overlay_count(),
                    );

                    let report = FieldReport {
                        params: Some(params),
                        statistics: result.statistics.clone(),
                    };
                    println!("{}", report.render_table());

                    if let Some(path) = report_path {
                        std::fs::write(path, report.to_json()?)?;
                        info!("report written to {}", path.display());
                    }
                    return Ok(());
                }
                Some(PipelineEvent::Failed { error, .. }) => {
                    anyhow::bail!("load failed: {error}");
                }
                Some(PipelineEvent::Superseded { instance }) => {
                    info!("instance {instance} superseded");
                }
                None => anyhow::bail!("pipeline channel closed unexpectedly"),
            }
        }
    })
}

/// Summarize a result directory without touching the mesh.
fn run_report(
    tissue_dir: &std::path::Path,
    json_path: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let decoder = FlatFieldDecoder;
    let merger = FieldOverlayMerger::new(&decoder);
    let samples = merger.load_all_tissues(tissue_dir);
    let statistics = neurofield_core::stats::summarize(&samples);

    let report = FieldReport {
        params: None,
        statistics,
    };

    if let Some(path) = json_path {
        std::fs::write(path, report.to_json()?)?;
        info!("report written to {}", path.display());
    } else {
        println!("{}", report.render_table());
    }

    Ok(())
}
