// axlscan CLI: query an Axelar / Cosmos-SDK network from the terminal.
// Every command prints JSON to stdout; logs go to stderr (RUST_LOG).

use std::cell::{Cell, RefCell};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use log::error;
use serde::Serialize;
use serde_json::json;

use axlscan::engine::aggregators::{leaderboard, load_validators, validator_profile, BatchTracker, ProfileWindows};
use axlscan::engine::scheduler::Poller;
use axlscan::{Explorer, ExplorerConfig};
use axlscan_core::paging::{PagingMode, TxCursor};
use axlscan_core::tx::decode_value;
use axlscan_core::{ScanError, ScanResult, ValidatorRecord};

#[derive(Parser)]
#[command(name = "axlscan", version, about = "Axelar network explorer data from the command line")]
struct Cli {
    /// Config file (default: <config dir>/axlscan/config.toml)
    #[arg(long, global = true, env = "AXLSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Reference data JSON: { denoms, chains, validators }
    #[arg(long, global = true, env = "AXLSCAN_REFERENCE")]
    reference: Option<PathBuf>,

    #[arg(long, global = true)]
    lcd_url: Option<String>,

    #[arg(long, global = true)]
    search_url: Option<String>,

    #[arg(long, global = true)]
    cli_url: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Balances, delegations, unbondings and rewards of an account
    Account { address: String },
    /// Decode one transaction
    Tx { hash: String },
    /// Transactions matching LCD events, e.g. --event "message.sender='axelar1…'"
    Txs {
        #[arg(long = "event", required = true)]
        events: Vec<String>,
        /// Do not stop at the transaction cap
        #[arg(long)]
        all: bool,
    },
    /// Merged validator records
    Validators,
    /// Uptime, heartbeat, jailing and vote metrics of one validator
    Validator { operator: String },
    /// Weighted leaderboard over a snapshot block range
    Leaderboard {
        #[arg(long)]
        from: u64,
        #[arg(long)]
        to: u64,
    },
    /// Recent EVM command batches
    Batches {
        #[arg(long)]
        chain: Option<String>,
        #[arg(long, default_value_t = 25)]
        size: u64,
        /// Keep polling stale batches until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Follow live data until interrupted
    Watch {
        #[command(subcommand)]
        target: WatchTarget,
    },
    /// Print shell completions
    Completions { shell: clap_complete::Shell },
}

#[derive(Subcommand)]
enum WatchTarget {
    /// New blocks
    Blocks,
    /// New transactions matching LCD events
    Txs {
        #[arg(long = "event", required = true)]
        events: Vec<String>,
    },
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> ScanResult<()> {
    let text = if pretty { serde_json::to_string_pretty(value)? } else { serde_json::to_string(value)? };
    println!("{}", text);
    Ok(())
}

fn unavailable(what: &str) -> ScanError {
    ScanError::Unavailable(format!("{} could not be fetched", what))
}

fn explorer(cli: &Cli) -> ScanResult<Explorer> {
    let mut config = ExplorerConfig::load(cli.config.as_deref())?;
    if let Some(url) = &cli.lcd_url {
        config.lcd_url = url.clone();
    }
    if let Some(url) = &cli.search_url {
        config.search_url = url.clone();
    }
    if let Some(url) = &cli.cli_url {
        config.cli_url = Some(url.clone());
    }
    let explorer = Explorer::from_config(config)?;
    if let Some(path) = &cli.reference {
        explorer.reference.load_file(path)?;
    }
    Ok(explorer)
}

/// Poller whose token is cancelled on Ctrl-C.
fn interruptible(name: &str, secs: u64) -> Poller {
    let poller = Poller::new(name, Duration::from_secs(secs));
    let token = poller.token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    poller
}

async fn run(cli: Cli) -> ScanResult<()> {
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "axlscan", &mut io::stdout());
        return Ok(());
    }

    let ex = explorer(&cli)?;
    let reference = ex.reference.snapshot();
    let native = ex.config.native_denom.clone();
    let pretty = cli.pretty;

    match &cli.command {
        Commands::Account { address } => {
            let overview = ex.fetchers.account_overview(address).await;
            let rows = overview.balance_rows(&reference.denoms);
            print_json(&json!({ "balances_display": rows, "account": overview }), pretty)
        }
        Commands::Tx { hash } => {
            let raw = ex.fetchers.tx(hash).await.ok_or_else(|| unavailable("transaction"))?;
            print_json(&decode_value(&raw, &reference.denoms, &native), pretty)
        }
        Commands::Txs { events, all } => {
            let set = ex
                .fetchers
                .transactions_by_events(events, Vec::new(), *all)
                .await?
                .ok_or_else(|| unavailable("transactions"))?;
            let decoded: Vec<_> = set.items.iter().map(|tx| decode_value(tx, &reference.denoms, &native)).collect();
            print_json(&json!({ "total": set.total, "complete": set.complete, "txs": decoded }), pretty)
        }
        Commands::Validators => {
            let records = load_validators(&ex.fetchers, ex.cli(), &reference, &native)
                .await?
                .ok_or_else(|| unavailable("validators"))?;
            print_json(&records, pretty)
        }
        Commands::Validator { operator } => {
            let records = load_validators(&ex.fetchers, ex.cli(), &reference, &native).await?.unwrap_or_default();
            let record = records
                .into_iter()
                .find(|r| r.operator_address.eq_ignore_ascii_case(operator))
                .unwrap_or_else(|| ValidatorRecord { operator_address: operator.clone(), ..Default::default() });
            let windows = ProfileWindows::from(&ex.config);
            let metrics = validator_profile(ex.search.as_ref(), &ex.fetchers, &windows, &record).await;
            print_json(&json!({ "validator": record, "metrics": metrics }), pretty)
        }
        Commands::Leaderboard { from, to } => {
            let rows = leaderboard(ex.search.as_ref(), *from, *to).await?.ok_or_else(|| unavailable("snapshots"))?;
            print_json(&rows, pretty)
        }
        Commands::Batches { chain, size, watch } => {
            let mut tracker = BatchTracker::new();
            tracker
                .load_recent(ex.search.as_ref(), chain.as_deref(), *size)
                .await
                .ok_or_else(|| unavailable("batches"))?;
            print_json(&tracker.batches().collect::<Vec<_>>(), pretty)?;
            if !*watch {
                return Ok(());
            }
            if tracker.stale().is_empty() {
                return Ok(());
            }
            let poller = interruptible("batches", ex.config.poll_secs);
            let token = poller.token();
            let tracker = RefCell::new(tracker);
            poller
                .run(
                    || {
                        let (tracker, search, fetchers) = (&tracker, ex.search.as_ref(), &ex.fetchers);
                        async move {
                            let mut current = tracker.take();
                            let report = current.poll(search, Some(fetchers)).await;
                            tracker.replace(current);
                            Some(report)
                        }
                    },
                    |report| {
                        let tracker = tracker.borrow();
                        if report.updated > 0 {
                            if let Err(e) = print_json(&tracker.batches().collect::<Vec<_>>(), pretty) {
                                error!("{}", e);
                            }
                        }
                        if tracker.stale().is_empty() {
                            token.cancel();
                        }
                    },
                )
                .await;
            Ok(())
        }
        Commands::Watch { target: WatchTarget::Blocks } => {
            let poller = interruptible("blocks", ex.config.poll_secs);
            let last = Cell::new(None);
            poller
                .run(
                    || ex.fetchers.latest_block(),
                    |block| {
                        if last.get() != Some(block.height) {
                            last.set(Some(block.height));
                            if let Err(e) = print_json(&block, pretty) {
                                error!("{}", e);
                            }
                        }
                    },
                )
                .await;
            Ok(())
        }
        Commands::Watch { target: WatchTarget::Txs { events } } => {
            let poller = interruptible("txs", ex.config.poll_secs);
            let cursor: Cell<Option<TxCursor>> = Cell::new(None);
            poller
                .run(
                    || {
                        let current = cursor.get();
                        let mode = if current.is_some() { PagingMode::Refresh } else { PagingMode::Latest };
                        let fetchers = &ex.fetchers;
                        async move { fetchers.transactions_by_events_paging(events, current, mode).await.ok().flatten() }
                    },
                    |page| {
                        cursor.set(Some(page.cursor));
                        for tx in &page.txs {
                            if let Err(e) = print_json(&decode_value(tx, &reference.denoms, &native), pretty) {
                                error!("{}", e);
                            }
                        }
                    },
                )
                .await;
            Ok(())
        }
        Commands::Completions { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
