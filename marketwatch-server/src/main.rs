use marketwatch::{
    config::{MarketWatchConfig, SeedBook, load_seed_file},
    currency::{
        CurrencyConverter,
        refresh::{HttpRateProvider, spawn_rate_refresh},
    },
    exchange::{TickStream, available_tabs},
    feed::{FeedStatus, spawn_tick_feed},
    format::QuoteRow,
    record::QuoteSeed,
    tick::{TickCounters, TickNormalizer},
    worker::{TabHandle, TabRouter, spawn_tab_worker},
};
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info, warn};

const STATS_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    init_logging();

    let config = match MarketWatchConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "invalid configuration");
            return;
        }
    };

    info!(
        tabs = ?config.tabs,
        direct_ws_url = %config.direct_ws_url,
        fx_ws_url = %config.fx_ws_url,
        "starting marketwatch server"
    );

    let converter = Arc::new(CurrencyConverter::new(config.fallback_rate));
    let counters = Arc::new(TickCounters::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::<JoinHandle<()>>::new();

    tasks.push(spawn_rate_refresh(
        HttpRateProvider::new(config.rate_url.clone()).with_currency(&config.local_currency),
        Arc::clone(&converter),
        config.rate_refresh,
        shutdown_rx.clone(),
    ));

    let mut seeds = config
        .seed_file
        .as_ref()
        .map(|path| match load_seed_file(path) {
            Ok(seeds) => seeds,
            Err(error) => {
                warn!(%error, "failed to load snapshot seeds, starting with empty tabs");
                SeedBook::default()
            }
        })
        .unwrap_or_default();

    let mut router = TabRouter::new(TickNormalizer::new(
        Arc::clone(&converter),
        Arc::clone(&counters),
    ));

    for descriptor in available_tabs(config.tabs.iter().copied()) {
        let (handle, task) =
            spawn_tab_worker(descriptor.group, Arc::clone(&converter), Arc::clone(&counters));
        tasks.push(task);

        seed_tab(&handle, seeds.shift_remove(&descriptor.group).unwrap_or_default()).await;
        tasks.push(spawn_row_logger(&handle, Arc::clone(&converter)));

        info!(tab = %descriptor.group, label = descriptor.label, "tab opened");
        router.insert(handle);
    }

    let router = Arc::new(router);

    for stream in [TickStream::Direct, TickStream::OrderBook] {
        if !config.uses_stream(stream) {
            continue;
        }

        let (task, status) = spawn_tick_feed(
            config.feed(stream),
            Arc::clone(&router),
            shutdown_rx.clone(),
        );
        tasks.push(task);
        tasks.push(spawn_status_logger(stream, status));
    }

    tasks.push(spawn_stats_logger(
        Arc::clone(&counters),
        Arc::clone(&converter),
        shutdown_rx,
    ));

    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "failed to listen for shutdown signal");
    }

    info!("shutting down marketwatch server");
    shutdown_tx.send_replace(true);
    router.shutdown();

    for task in tasks {
        if let Err(error) = task.await {
            warn!(%error, "task ended abnormally");
        }
    }

    info!(counters = ?counters.snapshot(), "marketwatch server stopped");
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

async fn seed_tab(handle: &TabHandle, seeds: Vec<QuoteSeed>) {
    let tab = handle.tab();
    let total = seeds.len();
    let mut added = 0;

    for seed in seeds {
        match handle.add(seed).await {
            Ok(true) => added += 1,
            Ok(false) => {}
            Err(error) => warn!(%tab, %error, "skipping snapshot seed"),
        }
    }

    if total > 0 {
        info!(%tab, added, total, "tab seeded from snapshot");
    }
}

/// Log every published snapshot of a tab as display rows.
fn spawn_row_logger(handle: &TabHandle, converter: Arc<CurrencyConverter>) -> JoinHandle<()> {
    let tab = handle.tab();
    let mut snapshots = handle.subscribe();

    tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let records = Arc::clone(&snapshots.borrow_and_update());
            let rate = converter.rate();

            for record in records.iter() {
                let row = QuoteRow::from_record(record, rate);
                match serde_json::to_string(&row) {
                    Ok(json) => debug!(%tab, row = %json, "quote"),
                    Err(error) => warn!(%tab, %error, "failed to serialise quote row"),
                }
            }
        }
    })
}

fn spawn_status_logger(stream: TickStream, mut status: watch::Receiver<FeedStatus>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = *status.borrow_and_update();
            match current {
                FeedStatus::Connected => info!(feed = %stream, "feed connected"),
                FeedStatus::Disconnected => warn!(feed = %stream, "feed disconnected"),
                FeedStatus::Reconnecting => debug!(feed = %stream, "feed reconnecting"),
                FeedStatus::Stopped => {
                    info!(feed = %stream, "feed stopped");
                    break;
                }
            }
        }
    })
}

fn spawn_stats_logger(
    counters: Arc<TickCounters>,
    converter: Arc<CurrencyConverter>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(STATS_INTERVAL);
        timer.tick().await;

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let stats = counters.snapshot();
                    let rate = converter.snapshot();
                    info!(
                        normalised = stats.normalised,
                        dropped = stats.dropped,
                        mutated = stats.mutated,
                        suppressed = stats.suppressed,
                        rate = rate.rate,
                        rate_source = ?rate.source,
                        "tick stats"
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}
