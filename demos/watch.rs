//! Watch live sources on a relay server
//!
//! Run with: cargo run --example watch -- [-s ADDRESS] [-a] [SOURCE...]
//!
//! Examples:
//!   cargo run --example watch -- camera                  # watch one source
//!   cargo run --example watch -- camera sonar            # watch two sources
//!   cargo run --example watch -- -a                      # watch everything
//!   cargo run --example watch -- -s 10.0.0.5 -a          # remote server
//!
//! Opens a stream over each named source and reports frames as they arrive.
//! With `-a` the server's source directory is polled and streams are opened
//! for new sources as they appear.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use vidrelay::error::{Error, StreamError};
use vidrelay::protocol::constants::DEFAULT_PORT;
use vidrelay::{ClientConfig, RelayClient};

/// How often the source directory is polled in `-a` mode.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Frames between progress reports.
const REPORT_EVERY: u64 = 30;

/// Parse a server address from a command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:33560
/// - "10.0.0.5" -> 10.0.0.5:33560
/// - "10.0.0.5:4000" -> 10.0.0.5:4000
fn parse_server_addr(arg: &str) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid server address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: watch [-hda] [-s ADDRESS] [SOURCE...]");
    eprintln!("Relay Stream Watcher");
    eprintln!();
    eprintln!("  -h, --help               Show this help message");
    eprintln!("  -d, --debug              Enable debug logging");
    eprintln!("  -s, --server ADDRESS     Address of the relay server");
    eprintln!("  -a, --all                Watch all sources, including new ones");
}

/// Pull frames from one source until it goes away.
async fn watch_source(client: RelayClient, source_name: String) {
    let mut stream = match client.open_stream(&source_name).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("Could not open stream for '{}': {}", source_name, e);
            return;
        }
    };

    println!(
        "{}: watching as '{}' ({}, {}x{})",
        source_name,
        stream.name(),
        stream.encoding(),
        stream.properties().width,
        stream.properties().height,
    );

    let started = Instant::now();
    let mut frames = 0u64;

    loop {
        match stream.get_frame(true).await {
            Ok(Some(frame)) => {
                frames += 1;
                if frames % REPORT_EVERY == 0 {
                    let fps = frames as f64 / started.elapsed().as_secs_f64();
                    println!(
                        "{}: {} frames, {}x{}x{}, {:.1} fps",
                        source_name,
                        frames,
                        frame.width(),
                        frame.height(),
                        frame.channels(),
                        fps,
                    );
                }
            }
            Ok(None) => {}
            Err(Error::Stream(StreamError::Orphaned)) => {
                eprintln!("{}: source went away after {} frames", source_name, frames);
                return;
            }
            Err(e) => {
                eprintln!("{}: {}", source_name, e);
                return;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let mut config = ClientConfig::from_env();
    let mut watch_all = false;
    let mut debug = false;
    let mut sources: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            "-d" | "--debug" => debug = true,
            "-a" | "--all" => watch_all = true,
            "-s" | "--server" => {
                i += 1;
                let value = match args.get(i) {
                    Some(value) => value,
                    None => {
                        eprintln!("Missing argument parameter\n");
                        print_usage();
                        std::process::exit(1);
                    }
                };
                match parse_server_addr(value) {
                    Ok(addr) => config = config.server(addr),
                    Err(e) => {
                        eprintln!("Error: {}\n", e);
                        print_usage();
                        std::process::exit(1);
                    }
                }
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown switch '{}'\n", other);
                print_usage();
                std::process::exit(1);
            }
            name => sources.push(name.to_string()),
        }
        i += 1;
    }

    if !watch_all && sources.is_empty() {
        eprintln!("No source name given and --all not specified\n");
        print_usage();
        std::process::exit(1);
    }

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if debug {
        filter = filter.add_directive("vidrelay=debug".parse()?);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let client = match RelayClient::connect(config).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Could not connect to relay server: {}", e);
            std::process::exit(1);
        }
    };

    println!("Press Ctrl+C to quit.");

    if watch_all {
        // Keep polling the directory and pick up sources as they appear
        let mut watched: HashSet<String> = HashSet::new();
        let mut poll = tokio::time::interval(POLL_INTERVAL);

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    let listed = match client.list_sources().await {
                        Ok(listed) => listed,
                        Err(e) => {
                            eprintln!("Could not list sources: {}", e);
                            break;
                        }
                    };
                    for info in listed {
                        if watched.insert(info.name.clone()) {
                            tokio::spawn(watch_source(client.clone(), info.name));
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    println!("\nStopping...");
                    break;
                }
            }
        }
    } else {
        let mut tasks = Vec::new();
        for name in sources {
            tasks.push(tokio::spawn(watch_source(client.clone(), name)));
        }

        tokio::select! {
            _ = async {
                for task in tasks {
                    let _ = task.await;
                }
            } => {
                eprintln!("All streams finished");
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping...");
            }
        }
    }

    client.disconnect();

    Ok(())
}
