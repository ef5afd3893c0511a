use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use rustyline::{error::ReadlineError, Editor};
use structopt::StructOpt;
use tracing::debug;

use saleql::{config::AppConfig, telemetry, Ledger, SqliteStorage};

#[derive(Debug, StructOpt)]
#[structopt(name = "saleql", about = "A sales ledger driven by JSON request batches")]
struct Opt {
    /// SQLite database file, overriding SALEQL_DATABASE
    #[structopt(short, long, parse(from_os_str))]
    database: Option<PathBuf>,

    /// Logs more of saleql's own work; repeat for trace
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,

    #[structopt(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, StructOpt)]
enum Cmd {
    /// Runs one request body, read from a file or from stdin
    Batch {
        #[structopt(parse(from_os_str))]
        input: Option<PathBuf>,
    },
    /// Reads one request body per line until EOF
    Repl {
        /// History file, overriding SALEQL_HISTORY
        #[structopt(long, parse(from_os_str))]
        history: Option<PathBuf>,
    },
    /// Creates an account that may submit requests
    AddAccount { username: String, password: String },
    /// Creates a product; prices are in cents
    AddProduct { name: String, unit_value_cents: i64 },
}

fn render(responses: &[serde_json::Value]) -> Result<String> {
    serde_json::to_string_pretty(responses).context("failed to render responses")
}

fn run_batch(ledger: &mut Ledger<SqliteStorage>, input: Option<&Path>) -> Result<()> {
    let body = match input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut body = String::new();
            io::stdin()
                .read_to_string(&mut body)
                .context("failed to read stdin")?;
            body
        }
    };
    let responses = ledger.handle_str(&body)?;
    println!("{}", render(&responses)?);
    Ok(())
}

fn run_repl(ledger: &mut Ledger<SqliteStorage>, history: &Path) -> Result<()> {
    let mut editor = Editor::<()>::new();
    if let Err(err) = editor.load_history(history) {
        debug!(error = %err, "no history loaded");
    }

    loop {
        let readline = editor.readline("> ");
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                editor.add_history_entry(line.as_str());

                match ledger.handle_str(&line).map_err(anyhow::Error::from).and_then(|r| render(&r)) {
                    Ok(rendered) => {
                        println!("{}", rendered);
                    }
                    Err(e) => {
                        println!("Error: {}", e);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {}", err);
                break;
            }
        }
    }

    editor
        .save_history(history)
        .with_context(|| format!("failed to save history to {}", history.display()))
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    let history = match &opt.cmd {
        Cmd::Repl { history } => history.clone(),
        _ => None,
    };
    let config = AppConfig::from_env()?.with_overrides(opt.database, history);
    let filter = telemetry::log_filter(config.log.as_deref(), opt.verbose)
        .context("invalid log directives")?;
    telemetry::init(filter);

    let storage = SqliteStorage::open(&config.database)
        .with_context(|| format!("failed to open {}", config.database.display()))?;
    let mut ledger = Ledger::new(storage);

    match opt.cmd {
        Cmd::Batch { input } => run_batch(&mut ledger, input.as_deref()),
        Cmd::Repl { .. } => run_repl(&mut ledger, &config.history),
        Cmd::AddAccount { username, password } => {
            ledger.add_account(&username, &password)?;
            Ok(())
        }
        Cmd::AddProduct {
            name,
            unit_value_cents,
        } => {
            ledger.add_product(&name, unit_value_cents)?;
            Ok(())
        }
    }
}
