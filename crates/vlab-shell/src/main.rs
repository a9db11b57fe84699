//! VLAB relay shell
//!
//! Invoked by the relay's connection wrapper with a single request
//! argument, either `getport` or `{boardclass}:{tunnelport}`. Validates
//! the user against the directory, leases a board (or allocates a tunnel
//! port) through the shared coordination store, and prints the result for
//! the wrapper to act on. Session bridging, board reset, and the eventual
//! release call are the wrapper's job, through the `vlab-lease` library.

mod request;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeZone};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use request::Request;
use vlab_lease::{Granted, LeaseError, LeaseManager, PortAllocator};
use vlab_store::{RedisStore, Store};

/// VLAB relay shell - brokers exclusive access to shared hardware boards
#[derive(Parser, Debug)]
#[command(name = "vlab-shell")]
#[command(about = "Lease a VLAB board or allocate an ephemeral tunnel port", long_about = None)]
struct Cli {
    /// The request: "getport" or "{boardclass}:{tunnelport}"
    request: String,

    /// Coordination store address
    #[arg(long, env = "VLAB_REDIS_URL", default_value = "redis://127.0.0.1/")]
    redis_url: String,

    /// Requesting user; defaults to the invoking system account
    #[arg(long, env = "VLAB_USER")]
    user: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    ExitCode::from(run(cli).await)
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> u8 {
    let request = match cli.request.parse::<Request>() {
        Ok(request) => request,
        Err(err) => {
            println!("{err}");
            return 1;
        }
    };

    let store: Arc<dyn Store> = match RedisStore::connect(&cli.redis_url).await {
        Ok(store) => Arc::new(store),
        Err(err) => {
            println!("Cannot reach the VLAB coordination store: {err}");
            return 2;
        }
    };

    match request {
        Request::GetPort => match PortAllocator::new(store).next_port().await {
            Ok(port) => {
                println!("VLABPORT:{port}");
                0
            }
            Err(err) => {
                println!("{err}");
                exit_code_for(&err)
            }
        },
        Request::Tunnel {
            board_class,
            tunnel_port,
        } => {
            let user = match cli.user.or_else(|| std::env::var("USER").ok()) {
                Some(user) => user,
                None => {
                    println!("Cannot determine the requesting user; set --user or $USER.");
                    return 1;
                }
            };
            debug!(user = %user, board_class = %board_class, tunnel_port, "board request");

            let manager = LeaseManager::new(store);
            match manager.acquire(&user, &board_class).await {
                Ok(granted) => {
                    print_grant(&granted, manager.max_lease());
                    0
                }
                Err(err) => {
                    println!("{err}");
                    exit_code_for(&err)
                }
            }
        }
    }
}

/// Exit-code contract with the connection wrapper: 1 means the request
/// itself was refused (bad argument, unknown user/class, no entitlement,
/// pool exhausted); 2 means the store let us down. Codes above 2 belong to
/// the wrapper's own provisioning steps.
fn exit_code_for(err: &LeaseError) -> u8 {
    match err {
        LeaseError::UnknownBoardClass { .. }
        | LeaseError::UnknownUser { .. }
        | LeaseError::PermissionDenied { .. }
        | LeaseError::NoBoardsAvailable { .. } => 1,
        LeaseError::CorruptBoardRecord { .. } | LeaseError::Store(_) => 2,
    }
}

fn print_grant(granted: &Granted, max_lease: Duration) {
    let start = format_local(granted.locked_at, "%H:%M:%S");
    let end = format_local(granted.expires_at, "%d/%m/%y at %H:%M:%S");
    println!(
        "Locked board type '{}' for user '{}' at {} for {} seconds",
        granted.board.board_class,
        granted.holder,
        start,
        max_lease.as_secs()
    );
    println!("BOARD LOCK EXPIRES: {end}");
}

fn format_local(epoch_secs: i64, format: &str) -> String {
    Local
        .timestamp_opt(epoch_secs, 0)
        .single()
        .map(|when| when.format(format).to_string())
        .unwrap_or_else(|| epoch_secs.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlab_store::StoreError;

    #[test]
    fn refusals_map_to_exit_code_one() {
        let refusals = [
            LeaseError::UnknownBoardClass {
                class: "zynq".to_string(),
            },
            LeaseError::UnknownUser {
                user: "mallory".to_string(),
            },
            LeaseError::PermissionDenied {
                user: "mallory".to_string(),
                class: "zynq".to_string(),
            },
            LeaseError::NoBoardsAvailable {
                class: "zynq".to_string(),
                max_lease: Duration::from_secs(600),
            },
        ];
        for err in refusals {
            assert_eq!(exit_code_for(&err), 1);
        }
    }

    #[test]
    fn store_failures_map_to_exit_code_two() {
        let err = LeaseError::Store(StoreError::Corrupt {
            key: "vlab:port".to_string(),
            reason: "bad counter".to_string(),
        });
        assert_eq!(exit_code_for(&err), 2);

        let err = LeaseError::CorruptBoardRecord {
            board: "b1".to_string(),
            detail: "missing server".to_string(),
        };
        assert_eq!(exit_code_for(&err), 2);
    }
}
