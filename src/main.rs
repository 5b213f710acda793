//! stm-enc CLI: record the elevation-encoder stream to rotating files, or
//! capture a fixed number of records to one file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stm_enc::config::{
    DEFAULT_CHUNK_SIZE, DEFAULT_FILE_LENGTH, DEFAULT_HOST, DEFAULT_LOCK_PATH, DEFAULT_PORT,
};
use stm_enc::storage::paths::DEFAULT_PREFIX;
use stm_enc::{CaptureConfig, Recorder, TcpSource, UpdateRate, bulk_capture};

#[derive(Parser, Debug)]
#[command(name = "stm-enc", version, about = "Elevation-encoder stream recorder")]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record continuously into rotating dated files
    Record(RecordArgs),
    /// Capture an exact number of records into one file
    Capture(CaptureArgs),
}

#[derive(Args, Debug)]
struct PeerArgs {
    /// Encoder controller address
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Maximum bytes per read
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
}

#[derive(Args, Debug)]
struct RecordArgs {
    #[command(flatten)]
    peer: PeerArgs,

    /// Records per file before rotating
    #[arg(long, default_value_t = DEFAULT_FILE_LENGTH)]
    file_length: u64,

    /// Root of the YYYY/MM/DD tree
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_LOCK_PATH)]
    lock_path: PathBuf,

    /// Run without a lock file
    #[arg(long)]
    no_lock: bool,

    /// File name prefix
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Status log rate in Hz; 0 logs every update
    #[arg(long, default_value_t = 1)]
    sample_hz: u32,
}

#[derive(Args, Debug)]
struct CaptureArgs {
    #[command(flatten)]
    peer: PeerArgs,

    /// Number of records to capture
    #[arg(long)]
    records: u64,

    /// Output file; must not exist
    #[arg(long)]
    output: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Record(args) => run_record(args).await,
        Commands::Capture(args) => run_capture(args).await,
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("invalid log level '{level}'"))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// Record until the controller closes the stream or Ctrl-C.
async fn run_record(args: RecordArgs) -> Result<()> {
    let config = CaptureConfig::default()
        .with_peer(args.peer.host, args.peer.port)
        .with_chunk_size(args.peer.chunk_size)
        .with_file_length(args.file_length)
        .with_base_dir(args.base_dir)
        .with_lock_path((!args.no_lock).then_some(args.lock_path))
        .with_file_prefix(args.prefix);

    let recorder = Recorder::start(config).await.context("failed to start recorder")?;
    let mut updates = recorder.subscribe(UpdateRate::Max(args.sample_hz));

    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Interrupted, closing the active file");
                recorder.stop();
                break;
            }
            update = updates.next() => match update {
                Some(state) => info!(timestamp = state.timestamp, state = state.state, "Encoder"),
                None => break,
            },
        }
    }

    let summary = recorder.finish().await.context("recording failed")?;
    info!(
        "Stopped ({:?}): {} bytes, {} encoder / {} IRIG / {} unknown records, {} files",
        summary.stop_reason,
        summary.bytes,
        summary.counters.encoder,
        summary.counters.irig,
        summary.counters.unknown,
        summary.files_opened
    );
    if summary.trailing_bytes > 0 {
        warn!("{} bytes of an incomplete final record were not decoded", summary.trailing_bytes);
    }
    Ok(())
}

/// Capture exactly `--records` records into `--output`.
async fn run_capture(args: CaptureArgs) -> Result<()> {
    let mut source = TcpSource::new(args.peer.host, args.peer.port);
    source.connect().await.context("failed to connect")?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Interrupted, closing the output file");
            trigger.cancel();
        }
    });

    let summary = bulk_capture(&mut source, &args.output, args.records, args.peer.chunk_size, &cancel)
        .await
        .with_context(|| format!("capture to {} failed", args.output.display()))?;

    if summary.complete {
        info!("Captured {} records ({} bytes)", summary.records_requested, summary.bytes_written);
    } else {
        warn!(
            "Capture incomplete: {} of {} bytes",
            summary.bytes_written,
            summary.expected_bytes()
        );
    }
    Ok(())
}
