use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RooflineError {
    #[error("missing {0}; re-run the benchmarks or fix extraction.")]
    MissingInput(String),
    #[error("{reason}. B_MEM={b_mem:?}, F_PEAK={f_peak:?}")]
    InvalidNumber {
        reason: &'static str,
        b_mem: String,
        f_peak: String,
    },
    #[error("Failed to load {}: {reason}", path.display())]
    DataLoad { path: PathBuf, reason: String },
    #[error("Render failed: {0}")]
    Render(String),
    #[error("Encoding failed: {0}")]
    Encode(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RooflineError {
    pub fn data_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::DataLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn render(reason: impl ToString) -> Self {
        Self::Render(reason.to_string())
    }

    pub fn encode(reason: impl ToString) -> Self {
        Self::Encode(reason.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_failures_are_not_io_errors() {
        let json_err = serde_json::from_str::<f64>("not json").unwrap_err();
        let err = RooflineError::encode(json_err);
        assert!(matches!(err, RooflineError::Encode(_)));
        assert!(err.to_string().starts_with("Encoding failed: "), "{err}");
    }
}
