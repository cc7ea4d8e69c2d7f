//! peerlink CLI: line chat over a peer-to-peer link.
//!
//! Reads commands and messages from stdin and prints every listener event
//! as one JSON object per line on stdout.

use anyhow::Context;
use clap::{Parser, Subcommand};
use peerlink_daemon::config::Config;
use peerlink_daemon::{setup, LinkHandle, LinkNegotiator};
use peerlink_platform::fixed::FixedPlatform;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[derive(Parser)]
#[command(
    name = "peerlink",
    about = "Discover a nearby peer and exchange text lines with it",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the link and chat on stdin.
    Run {
        /// Path to configuration file.
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Print the default configuration as TOML.
    DefaultConfig,
}

/// A line typed on stdin.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Discover,
    Stop,
    Connect(String),
    Disconnect,
    Status,
    Quit,
    Send(String),
}

impl Input {
    fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let input = match trimmed.split_once(' ') {
            Some(("/connect", name)) => Self::Connect(name.trim().to_string()),
            _ => match trimmed {
                "/discover" => Self::Discover,
                "/stop" => Self::Stop,
                "/disconnect" => Self::Disconnect,
                "/status" => Self::Status,
                "/quit" => Self::Quit,
                _ => Self::Send(line.to_string()),
            },
        };
        Some(input)
    }
}

/// Filter directive: `RUST_LOG` wins, then the configured level, then
/// `info`.
fn filter_directive(env: Option<&str>, config: Option<&Config>) -> String {
    match (env.map(str::trim), config) {
        (Some(env), _) if !env.is_empty() => env.to_string(),
        (_, Some(config)) => config.link.log_level.clone(),
        _ => "info".to_string(),
    }
}

/// Install the subscriber before anything logs. The filter is reloaded once
/// the config is known.
fn init_tracing() -> FilterHandle {
    let env = std::env::var("RUST_LOG").ok();
    let (filter, handle) =
        reload::Layer::new(EnvFilter::new(filter_directive(env.as_deref(), None)));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

fn apply_log_level(handle: &FilterHandle, config: &Config) {
    let env = std::env::var("RUST_LOG").ok();
    let directive = filter_directive(env.as_deref(), Some(config));
    if let Err(e) = handle.reload(EnvFilter::new(&directive)) {
        tracing::warn!(error = %e, "could not apply configured log level");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let filter = init_tracing();
            let config = setup::load_config(config.as_deref())?;
            apply_log_level(&filter, &config);
            run(config).await
        }
        Commands::DefaultConfig => {
            let text = toml::to_string_pretty(&Config::default())
                .context("failed to serialize default config")?;
            print!("{text}");
            Ok(())
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let mut platform = FixedPlatform::new(
        config.platform.peers.clone(),
        config.platform.group_owner,
    );
    if let Some(ip) = config.platform.local_ip {
        platform = platform.with_local_ip(ip);
    }

    tracing::info!(name = %config.identity.name, "starting peerlink");
    let mut negotiator = LinkNegotiator::new(config, Box::new(platform))?;
    let handle = negotiator.handle();

    let mut events = handle.listen();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{}", event.to_json());
        }
    });

    let link = tokio::spawn(async move { negotiator.run().await });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                let Some(input) = Input::parse(&line) else {
                    continue;
                };
                if input == Input::Quit {
                    break;
                }
                dispatch(&handle, input).await;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    handle.shutdown().await;
    handle.cancel_listener();
    link.await.context("link task panicked")??;
    let _ = printer.await;
    Ok(())
}

async fn dispatch(handle: &LinkHandle, input: Input) {
    let result = match input {
        Input::Discover => handle.start_discovery().await,
        Input::Stop => handle.stop_discovery().await,
        Input::Connect(name) => handle.connect_to_peer(name).await,
        Input::Disconnect => handle.disconnect().await,
        Input::Send(text) => handle.send_message(text).await,
        Input::Status => {
            let status = handle.status();
            eprintln!(
                "state={} role={} peers={:?} session={}",
                status.state, status.role, status.peers, status.session_active
            );
            return;
        }
        Input::Quit => return,
    };
    match result {
        Ok(message) => tracing::debug!(%message, "request done"),
        Err(e) => eprintln!("{}: {e}", e.code()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Input::parse("/discover"), Some(Input::Discover));
        assert_eq!(
            Input::parse("/connect Pixel-7"),
            Some(Input::Connect("Pixel-7".to_string()))
        );
        assert_eq!(
            Input::parse("/connect  Galaxy Tab "),
            Some(Input::Connect("Galaxy Tab".to_string()))
        );
        assert_eq!(Input::parse("  /quit "), Some(Input::Quit));
        assert_eq!(Input::parse(""), None);
    }

    #[test]
    fn other_lines_are_messages() {
        assert_eq!(
            Input::parse("hello there"),
            Some(Input::Send("hello there".to_string()))
        );
        assert_eq!(
            Input::parse("/unknown"),
            Some(Input::Send("/unknown".to_string()))
        );
    }

    #[test]
    fn log_filter_prefers_environment() {
        let mut config = Config::default();
        config.link.log_level = "debug".to_string();

        assert_eq!(filter_directive(None, None), "info");
        assert_eq!(filter_directive(None, Some(&config)), "debug");
        assert_eq!(filter_directive(Some("  "), Some(&config)), "debug");
        assert_eq!(
            filter_directive(Some("peerlink_daemon=trace"), Some(&config)),
            "peerlink_daemon=trace"
        );
    }

    #[test]
    fn cli_parses_run_with_config() {
        let cli = Cli::try_parse_from(["peerlink", "run", "--config", "link.toml"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Run { config: Some(ref path) } if path == "link.toml"
        ));
    }
}
