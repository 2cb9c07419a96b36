//! `apdu-trace`: send APDUs to a PC/SC reader and print a readable trace
//!
//! The trace goes to stdout, diagnostics to stderr (`RUST_LOG` filtered).

use std::path::PathBuf;

use apdu_trace::{LoggingTerminal, TraceConfig};
use apdu_trace_core::prelude::*;
use apdu_trace_pcsc::{PcscConfig, PcscDeviceManager, ShareMode};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod reader;

#[derive(Debug, Parser)]
#[command(version, about = "Send APDUs to a smart card and trace every exchange")]
struct Cli {
    /// Trace level diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List available readers
    List,

    /// Connect to a card, send APDUs and disconnect
    Send(SendArgs),
}

#[derive(Debug, Args)]
struct SendArgs {
    /// Reader name (defaults to the first reader with a card)
    #[arg(short, long)]
    reader: Option<String>,

    /// Protocol: *, T=0, T=1 or DIRECT
    #[arg(short, long, default_value = "*")]
    protocol: String,

    /// Append a replay dump of the session to this file
    #[arg(short, long)]
    dump: Option<PathBuf>,

    /// Send APDUs as raw buffers instead of parsed commands
    #[arg(long)]
    raw: bool,

    /// Reset the card when disconnecting
    #[arg(long)]
    reset: bool,

    /// Connect in exclusive mode
    #[arg(long)]
    exclusive: bool,

    /// APDUs in hex, e.g. 00A4040000
    #[arg(required = true, value_parser = parse_apdu)]
    apdus: Vec<Apdu>,
}

/// Command bytes given on the command line
#[derive(Debug, Clone)]
struct Apdu(Vec<u8>);

fn parse_apdu(s: &str) -> Result<Apdu, String> {
    let bytes = hex::decode(s.replace(' ', "")).map_err(|e| format!("invalid hex: {e}"))?;
    if bytes.len() < 4 {
        return Err(format!("APDU too short: {} bytes", bytes.len()));
    }
    Ok(Apdu(bytes))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::List => {
            let manager = PcscDeviceManager::new()?;
            reader::list_readers(&manager)
        }
        Commands::Send(args) => {
            let share_mode = if args.exclusive {
                ShareMode::Exclusive
            } else {
                ShareMode::Shared
            };
            let manager =
                PcscDeviceManager::with_config(PcscConfig::new().with_share_mode(share_mode))?;
            let terminal = match &args.reader {
                Some(name) => reader::find_terminal_by_name(&manager, name)?,
                None => reader::find_terminal_with_card(&manager)?,
            };
            info!("Using reader: {}", terminal.name());
            send(terminal, &args)
        }
    }
}

/// Run one traced session on `terminal`
///
/// The card is always disconnected, even when an APDU fails; the first
/// failure is reported afterwards.
fn send<T: CardTerminal>(terminal: T, args: &SendArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = TraceConfig::new();
    if let Some(path) = &args.dump {
        config = config.with_dump_file(path);
    }

    let terminal = LoggingTerminal::with_config(terminal, config);
    let card = terminal.connect(&args.protocol)?;
    let mut channel = card.basic_channel();

    let mut outcome = Ok(());
    for Apdu(bytes) in &args.apdus {
        outcome = if args.raw {
            let mut response = BytesMut::new();
            channel.transmit_buffer(bytes, &mut response).map(drop)
        } else {
            Command::from_bytes(bytes).and_then(|command| channel.transmit(&command).map(drop))
        };
        if outcome.is_err() {
            break;
        }
    }

    card.disconnect(args.reset)?;
    outcome.map_err(Into::into)
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("trace")
    } else {
        EnvFilter::from_default_env()
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_apdu() {
        assert_eq!(parse_apdu("00A40400 00").unwrap().0, vec![0x00, 0xA4, 0x04, 0x00, 0x00]);
        assert!(parse_apdu("00A4").is_err());
        assert!(parse_apdu("zz").is_err());
    }

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::try_parse_from([
            "apdu-trace",
            "send",
            "--reader",
            "Reader 0",
            "--dump",
            "session.apdu",
            "--reset",
            "00A4040000",
            "80CA9F7F00",
        ])
        .unwrap();

        let Commands::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.reader.as_deref(), Some("Reader 0"));
        assert_eq!(args.protocol, "*");
        assert_eq!(args.dump, Some(PathBuf::from("session.apdu")));
        assert!(args.reset);
        assert!(!args.raw);
        assert_eq!(args.apdus.len(), 2);
    }

    #[test]
    fn test_cli_requires_apdus() {
        assert!(Cli::try_parse_from(["apdu-trace", "send"]).is_err());
        assert!(Cli::try_parse_from(["apdu-trace", "-v", "list"]).is_ok());
    }
}
