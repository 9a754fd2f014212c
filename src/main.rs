use cardvault::application::engine::CardEngine;
use cardvault::config::{
    DEFAULT_MAX_GENERATION_ATTEMPTS, DEFAULT_MAX_TRANSFER_RETRIES, EngineConfig,
};
use cardvault::crypto::CardCipher;
use cardvault::domain::ports::CardRepositoryBox;
use cardvault::infrastructure::in_memory::InMemoryCardRepository;
use cardvault::interfaces::csv::card_writer::CardWriter;
use cardvault::interfaces::csv::command_reader::CommandReader;
use cardvault::interfaces::csv::command_runner::CommandRunner;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// AES-256 key used to seal card numbers at rest (exactly 32 bytes)
    #[arg(long, env = "CARD_ENCRYPTION_KEY", hide_env_values = true)]
    encryption_key: String,

    /// Attempts before card number generation gives up
    #[arg(long, default_value_t = DEFAULT_MAX_GENERATION_ATTEMPTS)]
    max_generation_attempts: usize,

    /// Retries of a transfer that lost a concurrent update
    #[arg(long, default_value_t = DEFAULT_MAX_TRANSFER_RETRIES)]
    max_transfer_retries: usize,
}

fn init_logging() {
    // Logs go to stderr; stdout carries the CSV report.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

#[cfg(feature = "storage-rocksdb")]
fn open_repository(db_path: Option<PathBuf>, cipher: Arc<CardCipher>) -> Result<CardRepositoryBox> {
    use cardvault::infrastructure::rocksdb::RocksDBCardRepository;

    Ok(match db_path {
        Some(path) => Box::new(RocksDBCardRepository::open(path, cipher).into_diagnostic()?),
        None => Box::new(InMemoryCardRepository::new(cipher)),
    })
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_repository(db_path: Option<PathBuf>, cipher: Arc<CardCipher>) -> Result<CardRepositoryBox> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Box::new(InMemoryCardRepository::new(cipher)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let cipher = Arc::new(CardCipher::new(cli.encryption_key.as_bytes()).into_diagnostic()?);
    let config = EngineConfig::default()
        .with_max_generation_attempts(cli.max_generation_attempts)
        .with_max_transfer_retries(cli.max_transfer_retries);

    let repository = open_repository(cli.db_path, cipher.clone())?;
    let engine = CardEngine::new(repository, cipher, config).into_diagnostic()?;

    // Process commands
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    let mut runner = CommandRunner::new(&engine);
    for command in reader.commands() {
        match command {
            Ok(command) => {
                if let Err(e) = runner.apply(command).await {
                    eprintln!("Error processing command: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading command: {}", e);
            }
        }
    }

    // Output final state
    let rows = runner.report().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = CardWriter::new(stdout.lock());
    writer.write_cards(rows).into_diagnostic()?;

    Ok(())
}
