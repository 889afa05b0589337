// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use clap::{Parser, Subcommand};
use navgate::classifier::HttpUrlClassifier;
use navgate::config::{self, Config, ConfigSource};
use navgate::console::{parse_choice, ConsolePrompt, ConsoleSurface, SurfaceEvent};
use navgate::engine;
use navgate::interceptor::NavigationInterceptor;
use navgate::normalize::{AddressNormalizer, DefaultAddressNormalizer};
use navgate::session::{VpnSession, VpnStatus};
use navgate::surface::{NavigationRequest, RenderingSurface, TracingNotifier};

use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "navgate", about = "Classifier-backed navigation gate")]
struct Cli {
    /// Path to a navgate.yaml config file. Built-in defaults when absent.
    #[arg(long, env = "NAVGATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify one URL (or address-bar input) and print the result as JSON
    Check { url: String },
    /// Interactive console browsing session
    Browse {
        /// Start with the protective session disconnected
        #[arg(long)]
        unprotected: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let source = config::FileSource { path: path.clone() };
            match config::load_config(&source) {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(source = %source.describe(), "failed to load config: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => Config::default(),
    };
    let config = Arc::new(config);

    tracing::info!(
        version = %config.version,
        environment = %config.environment,
        classifier = %config.classifier.endpoint(),
        timeout_ms = config.classifier.timeout_ms,
        "config loaded"
    );

    match cli.command {
        Command::Check { url } => check(&config, &url).await,
        Command::Browse { unprotected } => browse(config, unprotected).await,
    }
}

async fn check(config: &Config, input: &str) {
    let url = DefaultAddressNormalizer::new(&config.address_bar).normalize(input);
    if url.is_empty() {
        tracing::error!("nothing to check");
        std::process::exit(2);
    }

    let classifier = HttpUrlClassifier::new(reqwest::Client::new(), &config.classifier);
    let out = match classifier.check(&url).await {
        Ok(verdict) => serde_json::json!({
            "url": url,
            "outcome": if verdict.is_malicious { "malicious" } else { "safe" },
            "confidence": verdict.confidence,
            "probability": verdict.probability,
        }),
        Err(e) => serde_json::json!({
            "url": url,
            "outcome": "fail_open",
            "error": e.to_string(),
        }),
    };
    println!("{out:#}");
}

const HELP: &str = "commands: go <input> | open <url> | back | vpn on|off | cache | quit";

async fn browse(config: Arc<Config>, unprotected: bool) {
    let status = if unprotected {
        VpnStatus::Disconnected
    } else {
        VpnStatus::Connected
    };
    let session = Arc::new(VpnSession::with_status(status));
    let (surface, mut events) = ConsoleSurface::new();
    let surface = Arc::new(surface);
    let prompt = Arc::new(ConsolePrompt::new());

    let engine = Arc::new(engine::build_engine(
        config.clone(),
        session.clone(),
        Arc::new(TracingNotifier),
        prompt.clone(),
    ));
    let interceptor = NavigationInterceptor::new(
        engine,
        surface.clone(),
        Arc::new(DefaultAddressNormalizer::new(&config.address_bar)),
    );

    println!("{HELP}");
    {
        let interceptor = interceptor.clone();
        tokio::spawn(async move {
            let (url, resolution) = interceptor.open_home().await;
            println!("home {url}: {}", resolution.as_str());
        });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to read stdin");
                        break;
                    }
                };
                if prompt.has_pending() {
                    prompt.answer(parse_choice(&line));
                    continue;
                }
                if !run_command(line.trim(), &interceptor, &surface, &session) {
                    break;
                }
            }
            Some(event) = events.recv() => {
                handle_event(event, &interceptor, &surface);
            }
        }
    }
}

/// Returns false when the session should end.
fn run_command(
    line: &str,
    interceptor: &NavigationInterceptor,
    surface: &ConsoleSurface,
    session: &VpnSession,
) -> bool {
    let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));
    let arg = arg.trim();
    match cmd {
        "" => {}
        "go" => {
            let interceptor = interceptor.clone();
            let input = arg.to_string();
            tokio::spawn(async move {
                let (url, resolution) = interceptor.submit_address(&input).await;
                println!("{url}: {}", resolution.as_str());
            });
        }
        "open" => load(arg, interceptor, surface),
        "back" => {
            if surface.can_go_back() {
                surface.go_back();
            } else {
                println!("no history");
            }
        }
        "vpn" => match arg {
            "on" => {
                session.connect_start();
                session.connect_success();
            }
            "off" => {
                session.disconnect_start();
                session.disconnect_success();
            }
            _ => println!("vpn: {}", session.status()),
        },
        "cache" => {
            let entries = interceptor.engine().cache().snapshot();
            if entries.is_empty() {
                println!("cache empty");
            }
            for (url, entry) in entries {
                println!(
                    "{url} malicious={} allowed={} confidence=\"{}\" probability={:.3} age={}s",
                    entry.is_malicious,
                    entry.user_allowed,
                    entry.confidence,
                    entry.probability,
                    entry.age().num_seconds()
                );
            }
        }
        "quit" | "exit" => return false,
        _ => println!("{HELP}"),
    }
    true
}

fn handle_event(event: SurfaceEvent, interceptor: &NavigationInterceptor, surface: &ConsoleSurface) {
    match event {
        SurfaceEvent::Load(url) => load(&url, interceptor, surface),
        SurfaceEvent::Back => match surface.step_back() {
            Some(url) => println!("back to {url}"),
            None => println!("no history"),
        },
        SurfaceEvent::Address(url) => println!("address {url}"),
    }
}

fn load(url: &str, interceptor: &NavigationInterceptor, surface: &ConsoleSurface) {
    if url.is_empty() {
        println!("{HELP}");
        return;
    }
    if interceptor.should_proceed(&NavigationRequest::new(url)) {
        surface.commit(url);
        println!("loaded {url}");
    } else {
        println!("held {url}");
    }
}
