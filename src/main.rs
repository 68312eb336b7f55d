//! Unity Proxy - runs Unity in batch mode and reports the build to TeamCity.

use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use unity_proxy::config::ConfigLoader;
use unity_proxy::status::{StatusEvent, StatusSink, TeamCitySink};
use unity_proxy::supervisor::{RunRequest, Supervisor};

#[derive(Parser)]
#[command(
    name = "unity-proxy",
    about = "Runs Unity in batch mode, mirrors its log and reports the build to TeamCity",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv). Diagnostics go to stderr.
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (default: $UNITY_PROXY_CONFIG, .unity-proxy.toml, then the user config dir).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file Unity should write (default: a new temporary file).
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Directory that receives a copy of the Unity log.
    #[arg(long, alias = "artifactsPath")]
    artifacts_path: Option<PathBuf>,

    /// Path to the Unity executable.
    unity_path: PathBuf,

    /// Arguments passed to Unity unchanged.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    unity_args: Vec<String>,
}

/// Accept the single-dash `-artifactsPath DIR` right after the Unity path.
fn legacy_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut args: Vec<OsString> = args.into_iter().collect();
    if args.get(2).is_some_and(|arg| arg == "-artifactsPath") {
        args[2] = OsString::from("--artifacts-path");
    }
    args
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse_from(legacy_args(std::env::args_os()));
    init_tracing(cli.verbose);

    let loader = cli
        .config
        .clone()
        .map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let mut config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("unity-proxy: {e}");
            std::process::exit(1);
        }
    };
    config.color = config.color || std::io::stdout().is_terminal();

    let sink = Arc::new(TeamCitySink::stdout(config.color));
    let supervisor = Supervisor::new(config, sink.clone());

    let mut request = RunRequest::new(cli.unity_path).args(cli.unity_args);
    if let Some(dir) = cli.artifacts_path {
        request = request.artifacts_dir(dir);
    }
    if let Some(path) = cli.log_file {
        request = request.log_file(path);
    }

    tracing::info!(
        unity = %request.unity_path.display(),
        args = ?request.unity_args,
        "Starting Unity proxy"
    );

    match supervisor.run(request).await {
        Ok(outcome) => std::process::exit(outcome.verdict.exit_code),
        Err(e) => {
            tracing::error!(error = %e, "Unity run failed");
            eprintln!("unity-proxy: {e}");
            sink.emit(StatusEvent::Finished { ok: false });
            std::process::exit(1);
        }
    }
}
