// CLI entry point for the Quickfire trivia coordinator.
//
// Starts a standalone coordinator that trivia clients connect to. See
// `server.rs` for the networking architecture and `session.rs` for the
// game rules.
//
// Usage:
//   quickfire [OPTIONS]
//     --port <PORT>           Listen port (default: 3000)
//     --round-seconds <N>     Round length in seconds (default: 60)
//
// Logging is controlled by RUST_LOG (e.g. RUST_LOG=quickfire_server=debug).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use quickfire_server::server::{ServerConfig, start_server};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = parse_args();

    let (handle, addr) = match start_server(config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Failed to start coordinator: {e}");
            std::process::exit(1);
        }
    };

    println!("Quickfire coordinator listening on {addr}");
    println!("Press Ctrl+C to stop.");

    let running = Arc::new(AtomicBool::new(true));
    let running_handler = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        running_handler.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Failed to install Ctrl+C handler: {e}");
        std::process::exit(1);
    }

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    println!("\nShutting down...");
    handle.stop();
}

/// Parse command-line arguments into a `ServerConfig`. Uses simple
/// `std::env::args()` matching — no clap dependency.
fn parse_args() -> ServerConfig {
    let mut config = ServerConfig::default();
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                config.port = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--port requires a valid port number");
                    std::process::exit(1);
                });
            }
            "--round-seconds" => {
                i += 1;
                let secs: u64 = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--round-seconds requires a valid number");
                    std::process::exit(1);
                });
                config.round_duration = Duration::from_secs(secs);
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config
}

fn print_usage() {
    println!("Usage: quickfire [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --port <PORT>           Listen port (default: 3000)");
    println!("  --round-seconds <N>     Round length in seconds (default: 60)");
    println!("  --help, -h              Show this help");
}
