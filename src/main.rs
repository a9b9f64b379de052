use std::{net::SocketAddr, path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use pnet::datalink;
use prometheus_client::registry::Registry;
use tokio::signal::unix::{signal, SignalKind};

use arpwatch::{
    capture,
    config::{self, Config, LogDestination},
    logging,
    metrics::{self, Metrics},
    pipeline::Pipeline,
    privileges,
    sink::{LogNotifier, QueueBound},
    store::Store,
};

// To avoid running as root, the binary only needs raw socket capabilities:
//   setcap CAP_NET_RAW=p ./arpwatch
#[derive(Parser, Debug)]
#[command(version, about = "Listens for ARP packets to discover new hosts on the local IPv4 network")]
struct Args {
    /// (comma-separated list of) network interface(s) to listen on
    #[arg(short, long, default_value_t = format!("eth0"))]
    interfaces: String,

    /// logfile path, "-" for standard error
    #[arg(short, long, default_value_t = format!("/var/log/arpwatch.log"))]
    logfile: String,

    /// database path
    #[arg(short, long, default_value = "/var/cache/arpwatch.db")]
    database: PathBuf,

    /// how long a capture read blocks before checking for shutdown
    #[arg(long, default_value = "1s")]
    read_timeout: humantime::Duration,

    /// maximum number of pending notifications, unbounded when omitted
    #[arg(long)]
    queue_bound: Option<usize>,

    /// serve Prometheus metrics on this address
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,

    /// print the available network interfaces and exit
    #[arg(long)]
    list_interfaces: bool,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let interfaces = config::parse_interfaces(&self.interfaces).map_err(anyhow::Error::msg)?;
        Ok(Config {
            interfaces,
            log_destination: LogDestination::from_arg(&self.logfile),
            store_path: self.database,
            read_timeout: self.read_timeout.into(),
            queue_bound: self.queue_bound.map_or(QueueBound::Unbounded, QueueBound::Bounded),
            metrics_addr: self.metrics_addr,
        })
    }
}

enum Stop {
    Signal,
    WorkersGone,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.list_interfaces {
        println!("Available interfaces: ");
        for iface in datalink::interfaces() {
            println!("{}: {:?}", iface.name, iface.ips);
        }
        return ExitCode::SUCCESS;
    }

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logging::init(&config.log_destination) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    let destination = config.log_destination.clone();
    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logging::error_to_both(&destination, &format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<()> {
    log::debug!("{:?}", config);
    if let Some(excess) = privileges::check() {
        logging::warn_to_both(&config.log_destination, &excess.to_string());
    }

    let store = Store::open(&config.store_path).context("failed to open database")?;

    let (handles, open_error) = capture::open_captures(&config.interfaces, config.read_timeout);
    if let Some(e) = open_error {
        logging::error_to_both(&config.log_destination, &format!("failed to open socket(s): {}", e));
    }
    if handles.is_empty() {
        bail!("no valid interfaces found");
    }

    let metrics = Metrics::new();
    if let Some(addr) = config.metrics_addr {
        let mut registry = Registry::default();
        metrics.register(&mut registry);
        let registry = Arc::new(registry);
        tokio::spawn(async move {
            if let Err(e) = metrics::serve(registry, addr).await {
                log::error!("{:#}", e);
            }
        });
    }

    let pipeline = Pipeline::start(handles, Arc::new(store), config.queue_bound, metrics, LogNotifier)
        .context("failed to start reader threads")?;
    let stop = wait_for_stop(&pipeline).await?;

    let exits = tokio::task::spawn_blocking(move || pipeline.shutdown()).await.context("shutdown failed")?;
    for (interface, exit) in exits {
        log::debug!("reader thread for {} exited: {:?}", interface, exit);
    }

    match stop {
        Stop::Signal => Ok(()),
        Stop::WorkersGone => bail!("all reader threads terminated"),
    }
}

async fn wait_for_stop(pipeline: &Pipeline) -> Result<Stop> {
    let mut terminate = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(Duration::from_secs(10));

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                res.context("failed to listen for SIGINT")?;
                log::info!("received SIGINT");
                return Ok(Stop::Signal);
            }
            _ = terminate.recv() => {
                log::info!("received SIGTERM");
                return Ok(Stop::Signal);
            }
            _ = ticker.tick() => {
                if pipeline.workers_finished() {
                    return Ok(Stop::WorkersGone);
                }
            }
        }
    }
}
