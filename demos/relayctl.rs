//! Relay server source administration
//!
//! Run with: cargo run --example relayctl -- [OPTIONS]
//!
//! Examples:
//!   cargo run --example relayctl -- --list-all
//!   cargo run --example relayctl -- -o cam,v4l:device=/dev/video0
//!   cargo run --example relayctl -- -c cam
//!   cargo run --example relayctl -- -s 10.0.0.5 --close-all
//!
//! Options are executed as jobs, in order, over a single connection. A
//! single invocation can open several sources and then list the result.

use std::net::SocketAddr;

use vidrelay::client::SourceKind;
use vidrelay::error::{Error, ErrorCode, SourceError};
use vidrelay::protocol::constants::DEFAULT_PORT;
use vidrelay::{ClientConfig, RelayClient};

enum Job {
    Open(String, String),
    Close(String),
    Spawn(String, String),
    CloseAll,
    ListAll,
}

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
    eprintln!("Usage: relayctl [-hd] [-s ADDRESS] [-o NAME,DESCRIPTOR] [-c NAME] [OPTIONS]");
    eprintln!("Relay Server Source Control");
    eprintln!();
    eprintln!("  -h, --help                   Show this help message");
    eprintln!("  -d, --debug                  Enable debug logging");
    eprintln!("  -s, --server ADDRESS         Address of the relay server");
    eprintln!("  -o, --open NAME,DESCRIPTOR   Open a new server source");
    eprintln!("  -c, --close NAME             Close a server source");
    eprintln!("      --spawn NAME,DESCRIPTOR  Spawn a temporary server source");
    eprintln!("      --close-all              Close all server sources");
    eprintln!("      --list-all               List all sources");
}

fn missing_argument() -> ! {
    eprintln!("Missing argument parameter\n");
    print_usage();
    std::process::exit(1);
}

/// Split the `NAME,DESCRIPTOR` form used by `--open` and `--spawn`.
fn parse_name_descriptor(switch: &str, value: &str) -> (String, String) {
    match value.split_once(',') {
        Some((name, descriptor)) if !name.is_empty() && !descriptor.is_empty() => {
            (name.to_string(), descriptor.to_string())
        }
        _ => {
            eprintln!("Invalid argument to {}\n", switch);
            print_usage();
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let mut config = ClientConfig::from_env();
    let mut debug = false;
    let mut jobs: Vec<Job> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            "-d" | "--debug" => debug = true,
            "-s" | "--server" => {
                i += 1;
                let value = match args.get(i) {
                    Some(value) => value,
                    None => missing_argument(),
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
            "-o" | "--open" => {
                i += 1;
                let value = match args.get(i) {
                    Some(value) => value,
                    None => missing_argument(),
                };
                let (name, descriptor) = parse_name_descriptor("--open", value);
                jobs.push(Job::Open(name, descriptor));
            }
            "-c" | "--close" => {
                i += 1;
                match args.get(i) {
                    Some(name) => jobs.push(Job::Close(name.to_string())),
                    None => missing_argument(),
                }
            }
            "--spawn" => {
                i += 1;
                let value = match args.get(i) {
                    Some(value) => value,
                    None => missing_argument(),
                };
                let (name, descriptor) = parse_name_descriptor("--spawn", value);
                jobs.push(Job::Spawn(name, descriptor));
            }
            "--close-all" => jobs.push(Job::CloseAll),
            "--list-all" => jobs.push(Job::ListAll),
            other => {
                eprintln!("Unknown switch '{}'\n", other);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    if jobs.is_empty() {
        print_usage();
        return Ok(());
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

    let mut failed = false;

    for job in jobs {
        match job {
            Job::Open(name, descriptor) => {
                match client.open_server_source(&name, &descriptor).await {
                    Ok(()) => {}
                    Err(Error::Source(SourceError::Rejected(code))) => {
                        match code {
                            ErrorCode::NameInUse => {
                                eprintln!("Source '{}' already exists", name)
                            }
                            ErrorCode::InvalidArgument => {
                                eprintln!("Invalid source type for '{}'", name)
                            }
                            ErrorCode::ParseError => {
                                eprintln!("Invalid source descriptor for '{}'", name)
                            }
                            _ => eprintln!("Error opening '{}': {}", name, code.reason()),
                        }
                        failed = true;
                    }
                    Err(e) => {
                        eprintln!("Error opening '{}': {}", name, e);
                        failed = true;
                    }
                }
            }

            Job::Close(name) => match client.close_server_source(&name).await {
                Ok(()) => {}
                Err(Error::Source(SourceError::Rejected(code))) => {
                    match code {
                        ErrorCode::NoSuchSource => {
                            eprintln!("Source '{}' does not exist", name)
                        }
                        ErrorCode::InvalidArgument => {
                            eprintln!("Source '{}' is not a server source", name)
                        }
                        _ => eprintln!("Error closing '{}': {}", name, code.reason()),
                    }
                    failed = true;
                }
                Err(e) => {
                    eprintln!("Error closing '{}': {}", name, e);
                    failed = true;
                }
            },

            Job::Spawn(name, descriptor) => {
                match client.spawn_source(&name, &descriptor).await {
                    Ok(()) => {}
                    Err(Error::Source(SourceError::Rejected(code))) => {
                        match code {
                            ErrorCode::NameInUse => {
                                eprintln!("Source '{}' already exists", name)
                            }
                            ErrorCode::ParseError => {
                                eprintln!("Invalid source descriptor for '{}'", name)
                            }
                            _ => eprintln!("Error spawning '{}': {}", name, code.reason()),
                        }
                        failed = true;
                    }
                    Err(e) => {
                        eprintln!("Error spawning '{}': {}", name, e);
                        failed = true;
                    }
                }
            }

            Job::CloseAll => {
                let mut sources = client.list_sources().await?;
                sources.sort_by(|a, b| a.name.cmp(&b.name));

                for info in sources {
                    if info.kind == SourceKind::Server {
                        if let Err(e) = client.close_server_source(&info.name).await {
                            eprintln!("Error closing '{}': {}", info.name, e);
                            failed = true;
                        }
                    }
                }
            }

            Job::ListAll => {
                let mut sources = client.list_sources().await?;
                sources.sort_by_key(|info| info.to_string());

                for info in &sources {
                    println!("{}", info);
                }
            }
        }
    }

    client.disconnect();

    if failed {
        std::process::exit(1);
    }

    Ok(())
}
