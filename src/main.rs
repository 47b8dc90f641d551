//! CLI for shelterfeed
//!
//! Subcommands:
//! - `broker`: run the WebSocket queue broker
//! - `produce` / `emit-samples`: publish listings or numeric samples
//! - `consume` / `consume-samples`: subscribe and settle deliveries
//! - `admin`: list, purge or delete queues

use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::builder::PossibleValuesParser;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info};

use shelterfeed::broker::{Broker, lock};
use shelterfeed::config::{Settings, load_config};
use shelterfeed::consumer::{self, Subscription, select_interest};
use shelterfeed::listing::BreedCatalog;
use shelterfeed::persistence::QueueStore;
use shelterfeed::producer::Producer;
use shelterfeed::source::{ListingSource, SAMPLE_QUEUES, SampleSource};
use shelterfeed::transport::websocket::start_websocket_server;
use shelterfeed::transport::{BrokerChannel, WsChannel};
use shelterfeed::utils::error::{ChannelError, ConsumerError, ProducerError};
use shelterfeed::utils::logging;

type AppResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "shelterfeed", version, about = "Shelter adoption listings over durable queues")]
struct Cli {
    /// Broker host, overriding the configured one
    #[arg(long, global = true)]
    host: Option<String>,

    /// Broker port, overriding the configured one
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Also append log events to this file
    #[arg(long, global = true, env = "SHELTERFEED_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the queue broker until Ctrl-C
    Broker,
    /// Publish adoption listings from a CSV feed
    Produce {
        #[arg(long)]
        source: Option<PathBuf>,
        /// Delay between records, in milliseconds
        #[arg(long)]
        pace_ms: Option<u64>,
    },
    /// Publish numeric sensor samples from a CSV feed
    EmitSamples {
        #[arg(long)]
        source: Option<PathBuf>,
        #[arg(long)]
        pace_ms: Option<u64>,
    },
    /// Choose a species and breed, then consume new listings until Ctrl-C
    Consume,
    /// Consume one numeric sample queue until Ctrl-C
    ConsumeSamples {
        #[arg(long, value_parser = PossibleValuesParser::new(SAMPLE_QUEUES))]
        queue: String,
    },
    /// Explicit queue administration
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand)]
enum AdminCommand {
    /// Show every queue with its depth and consumer count
    List,
    /// Drop all ready messages from a queue
    Purge { queue: String },
    /// Remove a queue and everything in it
    Delete { queue: String },
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("ERROR: failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(host) = cli.host.clone() {
        settings.broker.host = host;
    }
    if let Some(port) = cli.port {
        settings.broker.port = port;
    }

    let log_file = cli
        .log_file
        .clone()
        .or_else(|| settings.logging.file.as_ref().map(PathBuf::from));
    let _guard = logging::init(&settings.logging.level, log_file.as_deref());

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("ERROR: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    let outcome = runtime.block_on(dispatch(cli.command, settings));
    // a pending stdin prompt must not keep the process alive
    runtime.shutdown_background();

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_cancellation(e.as_ref()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

fn is_cancellation(error: &(dyn Error + 'static)) -> bool {
    error
        .downcast_ref::<ConsumerError>()
        .is_some_and(ConsumerError::is_cancellation)
}

async fn dispatch(command: Command, settings: Settings) -> AppResult {
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stop_tx.send(true);
        }
    });

    match command {
        Command::Broker => run_broker(&settings, stop_rx).await,
        Command::Produce { source, pace_ms } => {
            let path = source.unwrap_or_else(|| PathBuf::from(&settings.producer.source_path));
            let pace = Duration::from_millis(pace_ms.unwrap_or(settings.producer.pace_ms));
            let catalog = BreedCatalog::from(&settings.catalog);
            let records = ListingSource::open(&path, catalog).map_err(|e| source_error(&path, e))?;
            produce(&settings, stop_rx, pace, Feed::Listings(records)).await
        }
        Command::EmitSamples { source, pace_ms } => {
            let path = source.unwrap_or_else(|| PathBuf::from(&settings.producer.samples_path));
            let pace = Duration::from_millis(pace_ms.unwrap_or(settings.producer.pace_ms));
            let records = SampleSource::open(&path).map_err(|e| source_error(&path, e))?;
            produce(&settings, stop_rx, pace, Feed::Samples(records)).await
        }
        Command::Consume => {
            let catalog = BreedCatalog::from(&settings.catalog);
            let prompt = tokio::task::spawn_blocking(move || {
                let stdin = io::stdin();
                select_interest(&catalog, &mut stdin.lock(), &mut io::stdout())
            });
            let interest = tokio::select! {
                joined = prompt => joined??,
                _ = stopped(stop_rx.clone()) => return Err(ConsumerError::UserCancellation.into()),
            };
            consume(&settings, Subscription::listings(interest), stop_rx).await
        }
        Command::ConsumeSamples { queue } => {
            consume(&settings, Subscription::samples(&queue), stop_rx).await
        }
        Command::Admin(admin) => run_admin(&settings, admin, stop_rx).await,
    }
}

/// Resolves once Ctrl-C has been received.
async fn stopped(mut stop: watch::Receiver<bool>) {
    let _ = stop.wait_for(|stop| *stop).await;
}

/// Open a broker connection, or `None` if Ctrl-C arrives first.
async fn connect(
    settings: &Settings,
    stop: watch::Receiver<bool>,
) -> Result<Option<WsChannel>, ChannelError> {
    tokio::select! {
        connected = WsChannel::connect(&settings.broker.host, settings.broker.port) => connected.map(Some),
        _ = stopped(stop) => {
            info!(host = %settings.broker.host, port = settings.broker.port, "interrupted while connecting");
            Ok(None)
        }
    }
}

fn source_error(path: &Path, e: io::Error) -> ProducerError {
    ProducerError::Source {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

async fn run_broker(settings: &Settings, stop: watch::Receiver<bool>) -> AppResult {
    let store = QueueStore::open(&settings.broker.data_dir)?;
    let broker = Arc::new(Mutex::new(Broker::with_store(store)?));
    let addr = format!("{}:{}", settings.broker.host, settings.broker.port);
    info!(data_dir = %settings.broker.data_dir, queues = lock(&broker).queues.len(), "broker state restored");

    tokio::select! {
        result = start_websocket_server(&addr, broker.clone()) => {
            result?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = stopped(stop) => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    lock(&broker).flush()?;
    Ok(())
}

/// An opened feed file, ready to publish.
enum Feed {
    Listings(ListingSource<BufReader<File>>),
    Samples(SampleSource<BufReader<File>>),
}

/// Publish `feed` over one broker connection. The connection is released on
/// every path, including Ctrl-C.
async fn produce(
    settings: &Settings,
    stop: watch::Receiver<bool>,
    pace: Duration,
    feed: Feed,
) -> AppResult {
    let Some(mut channel) = connect(settings, stop.clone()).await? else {
        return Ok(());
    };
    info!(broker = %channel.address(), pace_ms = pace.as_millis() as u64, "producer connected");

    let mut producer = Producer::new(&mut channel, pace);
    let outcome = tokio::select! {
        result = async {
            match feed {
                Feed::Listings(records) => producer.run(records).await,
                Feed::Samples(records) => producer.run_samples(records).await,
            }
        } => result.map(Some),
        _ = stopped(stop) => Ok(None),
    };
    drop(producer);

    let closed = channel.close().await;
    match outcome? {
        Some(report) => info!(published = report.published, skipped = report.skipped, "producer finished"),
        None => info!("producer interrupted"),
    }
    closed?;
    Ok(())
}

async fn consume(
    settings: &Settings,
    subscription: Subscription,
    stop: watch::Receiver<bool>,
) -> AppResult {
    let report = consumer::run(
        &subscription,
        WsChannel::connect(&settings.broker.host, settings.broker.port),
        stopped(stop),
    )
    .await?;
    info!(
        acked = report.acked,
        dead_lettered = report.dead_lettered,
        matched = report.matched,
        refused = report.refused,
        "consumer finished"
    );
    Ok(())
}

async fn run_admin(
    settings: &Settings,
    command: AdminCommand,
    stop: watch::Receiver<bool>,
) -> AppResult {
    let Some(mut channel) = connect(settings, stop).await? else {
        return Ok(());
    };
    let outcome = admin(&mut channel, command).await;
    let closed = channel.close().await;
    outcome?;
    closed?;
    Ok(())
}

async fn admin<C: BrokerChannel>(channel: &mut C, command: AdminCommand) -> AppResult {
    match command {
        AdminCommand::List => {
            println!("{:<24} {:>8} {:>9}  OPTIONS", "QUEUE", "MESSAGES", "CONSUMERS");
            for queue in channel.list_queues().await? {
                println!(
                    "{:<24} {:>8} {:>9}  durable={} content_type={}",
                    queue.name,
                    queue.message_count,
                    queue.consumer_count,
                    queue.durable,
                    queue.content_type
                );
            }
        }
        AdminCommand::Purge { queue } => {
            let purged = channel.purge_queue(&queue).await?;
            println!("purged {purged} message(s) from {queue}");
        }
        AdminCommand::Delete { queue } => {
            let dropped = channel.delete_queue(&queue).await?;
            println!("deleted {queue} with {dropped} message(s)");
        }
    }
    Ok(())
}
