mod ledger;
mod price;
mod transfer;
mod ui;
mod wallet;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ledger::history::{self, HISTORY_LIMIT};
use ledger::{Ledger, LedgerClient, Network};
use price::PriceClient;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::panic;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::timeout;
use ui::{run_app, App};
use wallet::KeypairWallet;

#[derive(Parser, Debug)]
#[command(name = "solterm")]
#[command(about = "Terminal wallet for the Solana ledger", long_about = None)]
struct Args {
    /// Cluster to talk to
    #[arg(short, long, value_enum, default_value_t = Network::Devnet)]
    network: Network,

    /// RPC endpoint override (defaults to the cluster's public endpoint)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Keypair file backing the wallet session
    #[arg(short, long)]
    keypair: Option<PathBuf>,

    /// Check the connection and print balance and recent transfers without
    /// starting the TUI
    #[arg(long)]
    check: bool,
}

fn cleanup_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        cleanup_terminal();
        original_hook(panic_info);
    }));

    let url = args
        .rpc_url
        .clone()
        .unwrap_or_else(|| args.network.rpc_url().to_string());

    // Probe the RPC endpoint with a timeout before doing anything else
    println!("Connecting to {}...", url);
    let client = LedgerClient::new(url.clone());
    match timeout(Duration::from_secs(5), client.probe()).await {
        Ok(Ok(version)) => {
            println!("Connected! (node version {})", version);
        }
        Ok(Err(e)) => {
            eprintln!("Failed to reach the RPC endpoint: {}", e);
            eprintln!("Check the endpoint or pass --rpc-url.");
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("Connection timed out after 5 seconds.");
            eprintln!("Check the endpoint {} or pass --rpc-url.", url);
            std::process::exit(1);
        }
    }

    let keypair_path = args.keypair.clone().or_else(wallet::default_keypair_path);
    let session = match keypair_path {
        Some(path) if path.exists() => match KeypairWallet::from_file(&path) {
            Ok(wallet) => {
                println!("Wallet: {}", wallet.address());
                Some(wallet)
            }
            Err(e) => {
                eprintln!("Could not load the keypair: {}", e);
                None
            }
        },
        _ => {
            println!("No keypair found; starting disconnected (pass --keypair to connect).");
            None
        }
    };

    // Check mode - query the ledger and exit
    if args.check {
        return run_check(&client, session.as_ref(), args.network).await;
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app and run
    let app = App::new(client, PriceClient::new(), session, args.network);
    let res = run_app(&mut terminal, app).await;

    // Restore terminal
    cleanup_terminal();
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_check(
    client: &LedgerClient,
    session: Option<&KeypairWallet>,
    network: Network,
) -> Result<()> {
    let Some(wallet) = session else {
        eprintln!("❌ No wallet session; pass --keypair to run the check.");
        std::process::exit(1);
    };
    let address = wallet.address();
    println!("Checking {} on {}...", address, network);

    match timeout(Duration::from_secs(5), client.balance(&address)).await {
        Ok(Ok(lamports)) => {
            println!("✅ Balance: {} SOL", ledger::format_sol(lamports));
        }
        Ok(Err(e)) => {
            eprintln!("❌ Balance query failed: {}", e);
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("❌ Balance query timed out after 5 seconds");
            std::process::exit(1);
        }
    }

    match history::load_recent_transfers(client, &address, HISTORY_LIMIT).await {
        Ok(records) => {
            println!("Found {} recent transfers:", records.len());
            for record in records {
                println!(
                    "  - {} | {} SOL | {} | {}",
                    ledger::short_signature(&record.signature),
                    record.amount_sol,
                    record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                    record.outcome.label()
                );
            }
        }
        Err(e) => {
            eprintln!("❌ History query failed: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
