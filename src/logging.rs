use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Initialise logging. The level is `debug` when `debug` is set and `info`
/// otherwise; `RUST_LOG` may only override it while debug logging is on.
/// When `log_file` is given all output is appended to that file.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    let filter = env_filter(debug);

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "sci_git.log".into());
            let appender = tracing_appender::rolling::never(dir, file_name);
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(appender)
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        }
    }
}

fn env_filter(debug: bool) -> EnvFilter {
    // Without debug logging the level is forced to `info`, so a stray
    // `RUST_LOG` in the user's environment cannot flood the output.
    if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    }
}
