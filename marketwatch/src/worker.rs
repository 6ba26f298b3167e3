//! Single-writer tab workers.
//!
//! Every tab is owned by one tokio task. Ticks, selection changes and snapshot
//! requests for the tab all travel through that task's queue, so `apply`,
//! `add` and `remove` are serialised without locks. After every mutation the
//! worker publishes a complete snapshot through a [`watch`] channel.

use crate::{
    currency::CurrencyConverter,
    engine::EngineState,
    error::MarketWatchError,
    exchange::ExchangeGroup,
    record::{QuoteRecord, QuoteSeed},
    tick::{NormalizedUpdate, TickCounters, TickNormalizer},
};
use chrono::Utc;
use fnv::FnvHashMap;
use smol_str::SmolStr;
use std::sync::Arc;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

/// Published view of one tab, in insertion order.
pub type TabSnapshot = Arc<[QuoteRecord]>;

#[derive(Debug)]
pub enum TabCommand {
    /// Reconcile an update. `reply` receives whether the tab was mutated.
    Tick {
        update: Arc<NormalizedUpdate>,
        reply: Option<oneshot::Sender<bool>>,
    },
    Add {
        seed: QuoteSeed,
        reply: oneshot::Sender<Result<bool, MarketWatchError>>,
    },
    Remove {
        token: SmolStr,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<TabSnapshot>,
    },
    Shutdown,
}

/// Cloneable handle to a running tab worker.
#[derive(Debug, Clone)]
pub struct TabHandle {
    tab: ExchangeGroup,
    tx: mpsc::UnboundedSender<TabCommand>,
    snapshot_rx: watch::Receiver<TabSnapshot>,
}

impl TabHandle {
    pub fn tab(&self) -> ExchangeGroup {
        self.tab
    }

    /// Queue an update without waiting for the outcome.
    pub fn apply(&self, update: Arc<NormalizedUpdate>) -> Result<(), MarketWatchError> {
        self.send(TabCommand::Tick {
            update,
            reply: None,
        })
    }

    /// Queue an update and wait for whether it mutated the tab.
    pub async fn apply_and_wait(
        &self,
        update: Arc<NormalizedUpdate>,
    ) -> Result<bool, MarketWatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(TabCommand::Tick {
            update,
            reply: Some(reply),
        })?;
        rx.await.map_err(|_| MarketWatchError::TabClosed(self.tab))
    }

    pub async fn add(&self, seed: QuoteSeed) -> Result<bool, MarketWatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(TabCommand::Add { seed, reply })?;
        rx.await.map_err(|_| MarketWatchError::TabClosed(self.tab))?
    }

    pub async fn remove(&self, token: impl Into<SmolStr>) -> Result<bool, MarketWatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(TabCommand::Remove {
            token: token.into(),
            reply,
        })?;
        rx.await.map_err(|_| MarketWatchError::TabClosed(self.tab))
    }

    /// Snapshot taken after every command queued before this one.
    pub async fn snapshot(&self) -> Result<TabSnapshot, MarketWatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(TabCommand::Snapshot { reply })?;
        rx.await.map_err(|_| MarketWatchError::TabClosed(self.tab))
    }

    /// Latest published snapshot, without queueing.
    pub fn latest(&self) -> TabSnapshot {
        Arc::clone(&self.snapshot_rx.borrow())
    }

    /// Subscribe to snapshots published after each mutation.
    pub fn subscribe(&self) -> watch::Receiver<TabSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Ask the worker to stop. Commands queued after this are never processed.
    pub fn shutdown(&self) -> Result<(), MarketWatchError> {
        self.send(TabCommand::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, command: TabCommand) -> Result<(), MarketWatchError> {
        self.tx
            .send(command)
            .map_err(|_| MarketWatchError::TabClosed(self.tab))
    }
}

/// Spawn the worker owning `tab`.
pub fn spawn_tab_worker(
    tab: ExchangeGroup,
    converter: Arc<CurrencyConverter>,
    counters: Arc<TickCounters>,
) -> (TabHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel::<TabSnapshot>(Arc::from(Vec::new()));

    let mut state = EngineState::new(converter);
    state.open_tab(tab);

    let task = tokio::spawn(async move {
        info!(%tab, "tab worker started");

        while let Some(command) = rx.recv().await {
            match command {
                TabCommand::Tick { update, reply } => {
                    let changed = match state.apply(tab, &update) {
                        Ok(changed) => {
                            counters.record_applied(changed);
                            changed
                        }
                        Err(error) => {
                            counters.record_dropped();
                            debug!(%tab, %error, "dropping update");
                            false
                        }
                    };

                    if changed {
                        snapshot_tx.send_replace(state.records(tab));
                    }
                    if let Some(reply) = reply {
                        let _ = reply.send(changed);
                    }
                }
                TabCommand::Add { seed, reply } => {
                    let result = state.add(tab, seed, Utc::now());
                    match &result {
                        Ok(true) => {
                            snapshot_tx.send_replace(state.records(tab));
                        }
                        Ok(false) => {}
                        Err(error) => warn!(%tab, %error, "failed to add instrument"),
                    }
                    let _ = reply.send(result);
                }
                TabCommand::Remove { token, reply } => {
                    let removed = state.remove(tab, &token);
                    if removed {
                        snapshot_tx.send_replace(state.records(tab));
                    }
                    let _ = reply.send(removed);
                }
                TabCommand::Snapshot { reply } => {
                    let _ = reply.send(state.records(tab));
                }
                TabCommand::Shutdown => break,
            }
        }

        state.close_tab(tab);
        snapshot_tx.send_replace(Arc::from(Vec::new()));
        info!(%tab, "tab worker stopped");
    });

    (
        TabHandle {
            tab,
            tx,
            snapshot_rx,
        },
        task,
    )
}

/// Fans normalised feed messages out to every open tab fed by the message's stream.
#[derive(Debug, Clone)]
pub struct TabRouter {
    normalizer: TickNormalizer,
    tabs: FnvHashMap<ExchangeGroup, TabHandle>,
}

impl TabRouter {
    pub fn new(normalizer: TickNormalizer) -> Self {
        Self {
            normalizer,
            tabs: FnvHashMap::default(),
        }
    }

    /// Register `handle`, returning any handle it replaced for the same tab.
    pub fn insert(&mut self, handle: TabHandle) -> Option<TabHandle> {
        self.tabs.insert(handle.tab(), handle)
    }

    pub fn handle(&self, tab: ExchangeGroup) -> Option<&TabHandle> {
        self.tabs.get(&tab)
    }

    pub fn handles(&self) -> impl Iterator<Item = &TabHandle> {
        self.tabs.values()
    }

    pub fn counters(&self) -> &Arc<TickCounters> {
        self.normalizer.counters()
    }

    /// Normalise one raw text frame and route it.
    ///
    /// Returns the number of tabs the update was queued to; unrecognised
    /// frames are counted and dropped.
    pub fn route_str(&self, raw: &str) -> usize {
        match self.normalizer.normalise_str(raw) {
            Ok(update) => self.route(Arc::new(update)),
            Err(_) => 0,
        }
    }

    pub fn route(&self, update: Arc<NormalizedUpdate>) -> usize {
        let mut routed = 0;

        for handle in self
            .tabs
            .values()
            .filter(|handle| handle.tab().stream() == update.stream)
        {
            match handle.apply(Arc::clone(&update)) {
                Ok(()) => routed += 1,
                Err(error) => debug!(%error, "skipping closed tab"),
            }
        }

        routed
    }

    /// Ask every registered worker to stop.
    pub fn shutdown(&self) {
        for handle in self.tabs.values() {
            let _ = handle.shutdown();
        }
    }
}
