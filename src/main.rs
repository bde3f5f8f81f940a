mod catalog;
mod cli;
mod config;
mod error;
mod input;
mod media;
mod orchestrator;
mod poll;
mod progress;
mod publish;
mod retry;
mod submit;
mod ui;
mod wavespeed;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::Semaphore;

use catalog::PresetCatalog;
use cli::{Cli, Command};
use config::Config;
use orchestrator::Orchestrator;
use poll::Poller;
use progress::ProgressStore;
use publish::{Publisher, WranglerUploader};
use retry::RetryPolicy;
use submit::Submitter;
use ui::Ui;
use wavespeed::WavespeedClient;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let ui = Ui::new(cli.verbose);

    if let Err(err) = run(cli, &ui).await {
        eprintln!("ERROR: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, ui: &Ui) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Command::Run {
            concurrency,
            delay,
            dry_run,
        } => run_batch(&config, ui, concurrency, delay, dry_run).await,
        Command::Status => {
            let counts = progress::store::read_counts(&config.progress_file)?;
            ui.counts(&counts);
            Ok(())
        }
        Command::Publish => {
            let (client, store, items) = open_run_state(&config)?;
            let publisher = make_publisher(&config, client, store, ui.clone());
            publisher.publish_completed(&items).await?;
            Ok(())
        }
    }
}

fn open_run_state(
    config: &Config,
) -> Result<(Arc<WavespeedClient>, Arc<ProgressStore>, Vec<input::Item>)> {
    let api_key = config.load_api_key()?;
    let items = input::load_items(&config.input_file)?;
    println!(
        "Loaded {} items from {}",
        items.len(),
        config.input_file.display()
    );
    let store = Arc::new(ProgressStore::open(&config.progress_file, &items)?);
    let client = Arc::new(WavespeedClient::new(
        api_key,
        config.api_base.clone(),
        Duration::from_secs(config.request_timeout_secs),
    ));
    Ok((client, store, items))
}

fn make_publisher(
    config: &Config,
    client: Arc<WavespeedClient>,
    store: Arc<ProgressStore>,
    ui: Ui,
) -> Publisher<WranglerUploader> {
    Publisher {
        client,
        store,
        uploader: WranglerUploader {
            bucket: config.bucket.clone(),
            prefix: config.upload_prefix.clone(),
        },
        generated_dir: config.generated_dir.clone(),
        feed_file: config.feed_file.clone(),
        public_base_url: config.public_base_url.clone(),
        upload_prefix: config.upload_prefix.clone(),
        classified_mirror: config
            .classified_mirror
            .clone()
            .map(|dest| (config.input_file.clone(), dest)),
        ui,
    }
}

async fn run_batch(
    config: &Config,
    ui: &Ui,
    concurrency: usize,
    delay: f64,
    dry_run: bool,
) -> Result<()> {
    let (client, store, items) = open_run_state(config)?;
    let catalog = Arc::new(PresetCatalog::load(Path::new("presets.toml"))?);

    let policy = RetryPolicy {
        max_attempts: config.max_attempts,
        base_delay: Duration::from_millis(config.retry_base_delay_ms),
    };
    let orchestrator = Orchestrator {
        store: store.clone(),
        items: items.clone(),
        submitter: Submitter {
            client: client.clone(),
            store: store.clone(),
            catalog,
            policy,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            delay: Duration::from_secs_f64(delay.max(0.0)),
            duration_secs: config.duration_secs,
            dry_run,
            ui: ui.clone(),
        },
        poller: Poller {
            client: client.clone(),
            store: store.clone(),
            interval: Duration::from_secs(config.poll_interval_secs),
            ui: ui.clone(),
        },
        dry_run,
        ui: ui.clone(),
    };

    let counts = orchestrator.run().await?;
    println!("Progress saved to {}", config.progress_file.display());

    if !dry_run && counts.completed > 0 {
        ui.phase("=== POST-GENERATION: download, upload, feed ===");
        let publisher = make_publisher(config, client, store, ui.clone());
        publisher.publish_completed(&items).await?;
    }
    Ok(())
}
