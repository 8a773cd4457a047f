use std::path::PathBuf;

use clap::Parser;
use common::{
    config::{ChartSettings, DEFAULT_CALIBRATION_PATH, DEFAULT_CHART_PATH, DEFAULT_RESULTS_PATH},
    logging::init_logging,
    plot::render_roofline,
};
use eyre::{Context, Result};
use tracing::info;

/// Draws a roofline chart from benchmark results and a calibration file
#[derive(Parser)]
struct Cli {
    /// Results table with variant, oi and gflops columns
    #[arg(short, long, default_value = DEFAULT_RESULTS_PATH)]
    results: PathBuf,
    /// Calibration JSON written by write-calibration
    #[arg(short, long, default_value = DEFAULT_CALIBRATION_PATH)]
    calibration: PathBuf,
    /// Output PNG
    #[arg(short, long, default_value = DEFAULT_CHART_PATH)]
    output: PathBuf,
    /// Also write the chart's series and roof coordinates as JSON
    #[arg(long)]
    metadata: Option<PathBuf>,
    #[arg(short, long)]
    log: Vec<String>,
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let _guard = init_logging("roofline", &args.log, args.log_file.as_deref())?;

    let chart = render_roofline(
        &args.results,
        &args.calibration,
        &args.output,
        ChartSettings::default(),
    )
    .await
    .wrap_err("Render roofline chart")?;
    info!(
        "Rendered {} series at {}x{} px",
        chart.series.len(),
        chart.pixel_size.0,
        chart.pixel_size.1
    );

    if let Some(metadata) = &args.metadata {
        chart
            .write_metadata(metadata)
            .await
            .wrap_err("Write chart metadata")?;
    }

    println!("Wrote {}", args.output.display());
    Ok(())
}
