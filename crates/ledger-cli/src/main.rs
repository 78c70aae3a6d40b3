use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ledger_core::{
    constants::DEFAULT_DIFFICULTY, tamper::TransactionPatch, Ledger, LedgerConfig,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod report;

use report::Report;

/// Exit status when the session ends with a chain that fails validation.
const EXIT_INVALID_CHAIN: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "Run a scripted session against an in-process hash-linked ledger")]
struct Cli {
    /// Leading zero hex digits required of every mined hash
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: u32,

    /// Search nonces on all cores
    #[arg(long)]
    parallel: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add A->B 10, mine it, then tamper with block 1 and re-validate
    Demo,
    /// Queue transactions, mine blocks and optionally tamper before validating
    Run {
        /// Transaction as FROM:TO:AMOUNT; repeatable, all land in the first block
        #[arg(long = "tx", value_parser = parse_tx)]
        txs: Vec<TxArg>,
        /// Number of blocks to mine
        #[arg(long, default_value_t = 1)]
        blocks: u32,
        /// Overwrite the first transaction amount of a block as INDEX:AMOUNT
        #[arg(long, value_parser = parse_tamper)]
        tamper: Option<TamperArg>,
    },
}

#[derive(Clone, Debug, PartialEq)]
struct TxArg {
    from: String,
    to: String,
    amount: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct TamperArg {
    index: usize,
    amount: f64,
}

fn parse_tx(s: &str) -> Result<TxArg> {
    let mut parts = s.splitn(3, ':');
    let (Some(from), Some(to), Some(amount)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("expected FROM:TO:AMOUNT, got `{s}`");
    };
    let amount = amount
        .parse::<f64>()
        .with_context(|| format!("invalid amount `{amount}`"))?;
    Ok(TxArg {
        from: from.to_string(),
        to: to.to_string(),
        amount,
    })
}

fn parse_tamper(s: &str) -> Result<TamperArg> {
    let Some((index, amount)) = s.split_once(':') else {
        bail!("expected INDEX:AMOUNT, got `{s}`");
    };
    Ok(TamperArg {
        index: index
            .parse()
            .with_context(|| format!("invalid block index `{index}`"))?,
        amount: amount
            .parse()
            .with_context(|| format!("invalid amount `{amount}`"))?,
    })
}

fn main() -> Result<ExitCode> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = LedgerConfig {
        difficulty: cli.difficulty,
        parallel: cli.parallel,
    };
    let mut ledger = Ledger::with_config(config).context("invalid ledger configuration")?;

    let (txs, blocks, tamper) = match cli.cmd {
        Command::Demo => (
            vec![TxArg {
                from: "A".into(),
                to: "B".into(),
                amount: 10.0,
            }],
            1,
            Some(TamperArg {
                index: 1,
                amount: 999_999.0,
            }),
        ),
        Command::Run {
            txs,
            blocks,
            tamper,
        } => (txs, blocks, tamper),
    };

    for tx in txs {
        ledger.add_transaction(tx.from, tx.to, tx.amount);
    }
    for _ in 0..blocks {
        ledger
            .mine_pending_transactions()
            .context("mining failed")?;
    }
    let valid_before_tamper = ledger.is_chain_valid();

    let tampered = match tamper {
        Some(TamperArg { index, amount }) => ledger
            .tamper()
            .tamper_with_block(index, TransactionPatch::amount(amount)),
        None => false,
    };
    info!(tampered, valid_before_tamper, "session finished");

    let report = Report::new(&ledger, valid_before_tamper, tampered);
    match cli.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => print!("{report}"),
    }

    Ok(if report.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_INVALID_CHAIN)
    })
}
