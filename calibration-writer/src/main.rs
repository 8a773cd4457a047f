use std::{
    env::var_os,
    io::Write,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use common::{
    calibration::write_calibration,
    config::{B_MEM_VAR, DEFAULT_CALIBRATION_PATH, F_PEAK_VAR},
    error::RooflineError,
    logging::init_logging,
};
use tracing::debug;

/// Writes the calibration file from the B_MEM and F_PEAK environment variables
#[derive(Parser)]
struct Cli {
    #[arg(short, long, default_value = DEFAULT_CALIBRATION_PATH)]
    output: PathBuf,
    #[arg(short, long)]
    log: Vec<String>,
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn env_value(name: &str) -> Option<String> {
    var_os(name).map(|value| value.to_string_lossy().into_owned())
}

const SUCCESS: u8 = 0;
const FAILURE: u8 = 1;

/// Validates and writes the calibration, reporting to `stdout`/`stderr`.
/// Any failure maps to exit code 1, missing input also prints an example.
async fn run(
    b_mem: Option<&str>,
    f_peak: Option<&str>,
    output: &Path,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> u8 {
    match write_calibration(b_mem, f_peak, output).await {
        Ok(calibration) => {
            _ = writeln!(
                stdout,
                "Wrote {} with B_mem_GBs={} and F_peak_GFLOPs={}",
                output.display(),
                calibration.b_mem_gbs,
                calibration.f_peak_gflops
            );
            SUCCESS
        }
        Err(err) => {
            debug!("{err:?}");
            _ = writeln!(stderr, "Error: {err}");
            if let RooflineError::MissingInput(_) = err {
                _ = writeln!(stderr, "Example:");
                _ = writeln!(
                    stderr,
                    "  {B_MEM_VAR}=18.7 {F_PEAK_VAR}=104.9 write-calibration"
                );
            }
            FAILURE
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Cli::parse();
    let _guard = match init_logging("write_calibration", &args.log, args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let b_mem = env_value(B_MEM_VAR);
    let f_peak = env_value(F_PEAK_VAR);
    let code = run(
        b_mem.as_deref(),
        f_peak.as_deref(),
        &args.output,
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    )
    .await;
    ExitCode::from(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn run_captured(
        b_mem: Option<&str>,
        f_peak: Option<&str>,
        output: &Path,
    ) -> (u8, String, String) {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let code = run(b_mem, f_peak, output, &mut stdout, &mut stderr).await;
        (
            code,
            String::from_utf8(stdout).unwrap(),
            String::from_utf8(stderr).unwrap(),
        )
    }

    #[tokio::test]
    async fn writes_and_confirms() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("results").join("calibration.json");

        let (code, stdout, stderr) = run_captured(Some("18.7"), Some("104.9"), &output).await;

        assert_eq!(code, SUCCESS);
        assert!(stderr.is_empty(), "{stderr}");
        assert!(stdout.contains("B_mem_GBs=18.7 and F_peak_GFLOPs=104.9"), "{stdout}");
        assert!(output.exists());
    }

    #[tokio::test]
    async fn missing_input_fails_with_example() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("calibration.json");

        for (b_mem, f_peak) in [(None, Some("104.9")), (Some("18.7"), Some(""))] {
            let (code, stdout, stderr) = run_captured(b_mem, f_peak, &output).await;
            assert_eq!(code, FAILURE);
            assert!(stdout.is_empty());
            assert!(stderr.contains("missing B_MEM or F_PEAK"), "{stderr}");
            assert!(
                stderr.contains("B_MEM=18.7 F_PEAK=104.9 write-calibration"),
                "{stderr}"
            );
        }
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn non_numeric_fails_without_example() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("calibration.json");

        let (code, _, stderr) = run_captured(Some("abc"), Some("10"), &output).await;

        assert_eq!(code, FAILURE);
        assert!(stderr.contains(r#"B_MEM="abc", F_PEAK="10""#), "{stderr}");
        assert!(!stderr.contains("Example:"));
        assert!(!output.exists());
    }
}
