use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tokio::fs::read_to_string;
use tracing::{debug, info};

use crate::{
    config::{B_MEM_VAR, F_PEAK_VAR},
    error::RooflineError,
    util::{is_log_plottable, parse_number, write_atomic},
};

/// Measured hardware ceilings that parametrize the roofline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Peak memory bandwidth in GB/s
    #[serde(rename = "B_mem_GBs", deserialize_with = "number_or_string")]
    pub b_mem_gbs: f64,
    /// Peak compute throughput in GFLOP/s
    #[serde(rename = "F_peak_GFLOPs", deserialize_with = "number_or_string")]
    pub f_peak_gflops: f64,
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => parse_number(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("{text:?} is not a number"))),
    }
}

impl Calibration {
    /// Validates the raw environment values, in order: presence, then
    /// numeric parsing, then positivity.
    pub fn from_env_values(
        b_mem: Option<&str>,
        f_peak: Option<&str>,
    ) -> Result<Self, RooflineError> {
        let (b_raw, f_raw) = match (b_mem, f_peak) {
            (Some(b), Some(f)) if !b.is_empty() && !f.is_empty() => (b, f),
            _ => {
                return Err(RooflineError::MissingInput(format!(
                    "{B_MEM_VAR} or {F_PEAK_VAR}"
                )));
            }
        };

        let invalid = |reason: &'static str| RooflineError::InvalidNumber {
            reason,
            b_mem: b_raw.to_owned(),
            f_peak: f_raw.to_owned(),
        };

        let (Some(b_mem_gbs), Some(f_peak_gflops)) = (parse_number(b_raw), parse_number(f_raw))
        else {
            return Err(invalid("non-numeric values"));
        };

        let calibration = Self {
            b_mem_gbs,
            f_peak_gflops,
        };
        if !calibration.is_physical() {
            return Err(invalid("non-positive or non-finite values"));
        }
        Ok(calibration)
    }

    /// Both ceilings finite and strictly positive
    pub fn is_physical(&self) -> bool {
        is_log_plottable(self.b_mem_gbs) && is_log_plottable(self.f_peak_gflops)
    }

    /// Pretty JSON with 2-space indentation and a trailing newline
    pub fn to_json(&self) -> Result<String, RooflineError> {
        let mut json = serde_json::to_string_pretty(self).map_err(RooflineError::encode)?;
        json.push('\n');
        Ok(json)
    }

    pub fn from_json(path: &Path, data: &str) -> Result<Self, RooflineError> {
        let calibration: Self =
            serde_json::from_str(data).map_err(|e| RooflineError::data_load(path, e))?;
        if !calibration.is_physical() {
            return Err(RooflineError::data_load(
                path,
                format!(
                    "calibration values must be positive, got B_mem_GBs={} F_peak_GFLOPs={}",
                    calibration.b_mem_gbs, calibration.f_peak_gflops
                ),
            ));
        }
        Ok(calibration)
    }

    pub async fn load(path: &Path) -> Result<Self, RooflineError> {
        let data = read_to_string(path)
            .await
            .map_err(|e| RooflineError::data_load(path, e))?;
        let calibration = Self::from_json(path, &data)?;
        debug!("Loaded calibration {calibration:?} from {path:?}");
        Ok(calibration)
    }

    /// Atomically replaces `path` with this calibration, creating parent dirs
    pub async fn store(&self, path: &Path) -> Result<PathBuf, RooflineError> {
        let json = self.to_json()?;
        let path = write_atomic(path, json.as_bytes()).await?;
        info!("Stored calibration at {path:?}");
        Ok(path)
    }
}

/// Validates both environment values and only then writes the calibration file.
pub async fn write_calibration(
    b_mem: Option<&str>,
    f_peak: Option<&str>,
    path: &Path,
) -> Result<Calibration, RooflineError> {
    let calibration = Calibration::from_env_values(b_mem, f_peak)?;
    calibration.store(path).await?;
    Ok(calibration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn calibration_path(dir: &TempDir) -> PathBuf {
        dir.path().join("results").join("calibration.json")
    }

    #[tokio::test]
    async fn writes_exact_document() {
        let dir = TempDir::new().unwrap();
        let path = calibration_path(&dir);

        write_calibration(Some("18.7"), Some("104.9"), &path)
            .await
            .unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(
            written,
            "{\n  \"B_mem_GBs\": 18.7,\n  \"F_peak_GFLOPs\": 104.9\n}\n"
        );
    }

    #[tokio::test]
    async fn round_trips_through_file() {
        let dir = TempDir::new().unwrap();
        let path = calibration_path(&dir);

        for (b, f) in [("18.7", "104.9"), ("1e2", "2.5E3"), ("0.001", "7")] {
            write_calibration(Some(b), Some(f), &path).await.unwrap();
            let loaded = Calibration::load(&path).await.unwrap();
            assert_eq!(loaded.b_mem_gbs, b.parse::<f64>().unwrap());
            assert_eq!(loaded.f_peak_gflops, f.parse::<f64>().unwrap());
        }
    }

    #[tokio::test]
    async fn missing_input_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = calibration_path(&dir);

        for (b, f) in [(None, Some("10")), (Some("18.7"), None), (Some(""), Some("10"))] {
            let err = write_calibration(b, f, &path).await.unwrap_err();
            assert!(matches!(err, RooflineError::MissingInput(_)), "{err:?}");
        }
        assert!(!path.exists());
        assert!(!path.parent().unwrap().exists());
    }

    #[tokio::test]
    async fn invalid_number_leaves_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = calibration_path(&dir);
        write_calibration(Some("18.7"), Some("104.9"), &path)
            .await
            .unwrap();
        let before = tokio::fs::read(&path).await.unwrap();

        let err = write_calibration(Some("abc"), Some("10"), &path)
            .await
            .unwrap_err();
        match err {
            RooflineError::InvalidNumber { b_mem, f_peak, .. } => {
                assert_eq!(b_mem, "abc");
                assert_eq!(f_peak, "10");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(tokio::fs::read(&path).await.unwrap(), before);
    }

    #[test]
    fn rejects_non_positive_and_non_finite() {
        for (b, f) in [("0", "10"), ("18.7", "-1"), ("inf", "10"), ("NaN", "1")] {
            let err = Calibration::from_env_values(Some(b), Some(f)).unwrap_err();
            assert!(
                matches!(err, RooflineError::InvalidNumber { .. }),
                "{b} {f}: {err:?}"
            );
        }
    }

    #[test]
    fn accepts_numeric_strings_and_extra_keys() {
        let path = Path::new("calibration.json");
        let calibration = Calibration::from_json(
            path,
            r#"{"B_mem_GBs": "18.7", "F_peak_GFLOPs": 104.9, "note": "lab"}"#,
        )
        .unwrap();
        assert_eq!(calibration.b_mem_gbs, 18.7);
        assert_eq!(calibration.f_peak_gflops, 104.9);
    }

    #[test]
    fn missing_key_is_data_load_error() {
        let err = Calibration::from_json(Path::new("c.json"), r#"{"B_mem_GBs": 18.7}"#)
            .unwrap_err();
        assert!(matches!(err, RooflineError::DataLoad { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_data_load_error() {
        let dir = TempDir::new().unwrap();
        let err = Calibration::load(&dir.path().join("nope.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, RooflineError::DataLoad { .. }));
    }
}
