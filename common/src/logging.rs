use std::path::Path;

use eyre::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const MODULES: &[&str] = &["common"];

/// Sets up the global subscriber: `RUST_LOG` (default `warn`) for `crate_name`
/// and the shared library, extra `directives` on top, stderr output and an
/// optional log file.
///
/// The returned guard must stay alive until exit so the file writer flushes.
pub fn init_logging(
    crate_name: &str,
    directives: &[String],
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let mut env_filter = EnvFilter::new(format!("{crate_name}={log_level}"));

    for directive in directives {
        env_filter = env_filter.add_directive(
            directive
                .parse()
                .wrap_err_with(|| format!("Invalid log directive {directive}"))?,
        );
    }

    for module in MODULES {
        if !directives.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("Log file {path:?} has no file name"))?;
            let file_appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (
                Some(layer().with_ansi(false).with_writer(non_blocking)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .with_writer(std::io::stderr)
                .compact(),
        )
        .with(file_layer)
        .try_init()
        .wrap_err("Install tracing subscriber")?;

    Ok(guard)
}
