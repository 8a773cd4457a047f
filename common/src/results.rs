use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tokio::fs::read_to_string;
use tracing::debug;

use crate::error::RooflineError;

pub const REQUIRED_COLUMNS: &[&str] = &["variant", "oi", "gflops"];

/// One measured benchmark sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSample {
    pub variant: String,
    /// Operational intensity in FLOPs/byte
    pub oi: f64,
    /// Measured throughput in GFLOP/s
    pub gflops: f64,
}

/// All samples of one variant, in table order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantSeries {
    pub variant: String,
    pub points: Vec<(f64, f64)>,
}

pub fn parse_results(path: &Path, data: &str) -> Result<Vec<ResultSample>, RooflineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| RooflineError::data_load(path, e))?
        .clone();
    let missing = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(RooflineError::data_load(
            path,
            format!("missing column(s) {}", missing.iter().join(", ")),
        ));
    }

    let samples = reader
        .deserialize::<ResultSample>()
        .enumerate()
        .map(|(idx, row)| {
            // +2: one for the header, one for 1-based line numbers
            row.map_err(|e| RooflineError::data_load(path, format!("row {}: {e}", idx + 2)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(samples)
}

pub async fn load_results(path: &Path) -> Result<Vec<ResultSample>, RooflineError> {
    let data = read_to_string(path)
        .await
        .map_err(|e| RooflineError::data_load(path, e))?;
    let samples = parse_results(path, &data)?;
    debug!("Loaded {} samples from {path:?}", samples.len());
    Ok(samples)
}

/// Groups samples by variant, keeping the order in which variants first appear
pub fn group_by_variant(samples: &[ResultSample]) -> Vec<VariantSeries> {
    samples
        .iter()
        .map(|sample| sample.variant.as_str())
        .unique()
        .map(|variant| VariantSeries {
            variant: variant.to_owned(),
            points: samples
                .iter()
                .filter(|sample| sample.variant == variant)
                .map(|sample| (sample.oi, sample.gflops))
                .collect(),
        })
        .collect()
}
