//! ysfreflectord: single-speaker UDP reflector for the System Fusion digital
//! voice protocol.
//!
//! `ysfreflectord [-v|--version] [ini-path]`. No subcommands, no flags
//! beyond `-v`: the upstream daemon this implements took a single config
//! path and nothing else, so a hand-rolled parser keeps the exact exit
//! codes and usage text rather than pulling in a general-purpose CLI
//! framework for two arguments.

mod config;
mod logging;

#[cfg(unix)]
mod daemon;

use std::process::ExitCode;

use reflector_core::{Blocklist, Callsign, Reflector, Transport};
use tokio::sync::oneshot;

use config::{Config, DEFAULT_CONFIG_PATH};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug)]
enum Args {
    Version,
    Run { config_path: String },
}

fn parse_args() -> Result<Args, String> {
    parse_args_from(std::env::args().skip(1))
}

fn parse_args_from(args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut positional = None;
    for arg in args {
        if arg == "-v" || arg == "--version" {
            return Ok(Args::Version);
        }
        if arg.starts_with('-') {
            return Err(format!("unrecognized option {arg:?}"));
        }
        if positional.replace(arg).is_some() {
            return Err("too many arguments".to_string());
        }
    }
    Ok(Args::Run {
        config_path: positional.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()),
    })
}

fn print_usage() {
    eprintln!("Usage: ysfreflectord [-v|--version] [ini-path]");
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("ysfreflectord: {message}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let config_path = match args {
        Args::Version => {
            println!("ysfreflectord {VERSION}");
            return ExitCode::SUCCESS;
        }
        Args::Run { config_path } => config_path,
    };

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ysfreflectord: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match logging::init(&config.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ysfreflectord: {e}");
            return ExitCode::FAILURE;
        }
    };

    #[cfg(unix)]
    if config.general.daemon {
        if let Err(e) = daemon::daemonize() {
            tracing::error!("daemonization failed: {e}");
            return ExitCode::FAILURE;
        }
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> reflector_core::Result<()> {
    tracing::info!(
        "YSFReflector-rs {VERSION} starting, id={}, name={}",
        config.network.id,
        config.network.name
    );

    let own_callsign = Callsign::from_str_padded(&config.network.id);
    let transport = Transport::open(config.network.port, own_callsign).await?;

    let blocklist = Blocklist::load(&config.blacklist.file, config.blacklist.reload_interval)
        .await
        .map_err(|e| {
            tracing::error!("failed to load blacklist {}: {e}", config.blacklist.file);
            e
        })?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(wait_for_shutdown_signal(shutdown_tx));

    let reflector = Reflector::new(transport, blocklist);
    reflector.run(shutdown_rx).await?;

    tracing::info!("YSFReflector-rs shutting down");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal(tx: oneshot::Sender<()>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => tracing::info!("received SIGINT"),
        _ = sigterm.recv() => tracing::info!("received SIGTERM"),
    }
    let _ = tx.send(());
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal(tx: oneshot::Sender<()>) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("received Ctrl-C");
    let _ = tx.send(());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> impl Iterator<Item = String> {
        items.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn version_flag_short_circuits() {
        assert!(matches!(parse_args_from(args(&["-v"])), Ok(Args::Version)));
        assert!(matches!(parse_args_from(args(&["--version"])), Ok(Args::Version)));
    }

    #[test]
    fn unrecognized_flag_is_rejected() {
        let err = parse_args_from(args(&["--bogus"])).unwrap_err();
        assert!(err.contains("unrecognized option"), "{err}");
    }

    #[test]
    fn positional_argument_overrides_default_path() {
        match parse_args_from(args(&["/etc/ysfreflector.ini"])) {
            Ok(Args::Run { config_path }) => assert_eq!(config_path, "/etc/ysfreflector.ini"),
            other => panic!("expected Args::Run, got {other:?}"),
        }
    }

    #[test]
    fn no_arguments_falls_back_to_default_path() {
        match parse_args_from(args(&[])) {
            Ok(Args::Run { config_path }) => assert_eq!(config_path, DEFAULT_CONFIG_PATH),
            other => panic!("expected Args::Run, got {other:?}"),
        }
    }
}
