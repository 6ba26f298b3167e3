//! WebSocket tick feeds.
//!
//! Each feed connects to one upstream socket, hands every text frame to the
//! [`TabRouter`] and reconnects after a fixed delay when the socket closes or
//! errors. Transport failures never reach the tab workers.

use crate::{exchange::TickStream, worker::TabRouter};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Connection status of one tick feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum FeedStatus {
    Connected,
    Disconnected,
    Reconnecting,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub url: String,
    pub stream: TickStream,
    pub reconnect_delay: Duration,
}

/// Outcome of one connection attempt.
enum Session {
    Closed,
    Shutdown,
}

/// Spawn a feed for `config.stream`. Returns the task handle and a receiver of
/// the feed's [`FeedStatus`].
///
/// The feed stops once `shutdown` is set to `true` or its sender is dropped.
pub fn spawn_tick_feed(
    config: FeedConfig,
    router: Arc<TabRouter>,
    mut shutdown: watch::Receiver<bool>,
) -> (JoinHandle<()>, watch::Receiver<FeedStatus>) {
    let (status_tx, status_rx) = watch::channel(FeedStatus::Disconnected);

    let task = tokio::spawn(async move {
        let FeedConfig {
            url,
            stream,
            reconnect_delay,
        } = config;
        info!(feed = %stream, %url, "starting tick feed");

        loop {
            status_tx.send_replace(FeedStatus::Reconnecting);

            let session = tokio::select! {
                session = run_session(&url, stream, &router, &status_tx) => session,
                _ = wait_for_shutdown(&mut shutdown) => Session::Shutdown,
            };

            if matches!(session, Session::Shutdown) {
                break;
            }

            status_tx.send_replace(FeedStatus::Disconnected);
            debug!(feed = %stream, delay_secs = reconnect_delay.as_secs(), "waiting before reconnecting");

            tokio::select! {
                _ = tokio::time::sleep(reconnect_delay) => {}
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
        }

        status_tx.send_replace(FeedStatus::Stopped);
        info!(feed = %stream, "tick feed stopped");
    });

    (task, status_rx)
}

async fn run_session(
    url: &str,
    stream: TickStream,
    router: &TabRouter,
    status_tx: &watch::Sender<FeedStatus>,
) -> Session {
    let (socket, _) = match connect_async(url).await {
        Ok(connection) => connection,
        Err(error) => {
            error!(feed = %stream, %url, %error, "failed to connect tick feed");
            return Session::Closed;
        }
    };

    info!(feed = %stream, %url, "tick feed connected");
    status_tx.send_replace(FeedStatus::Connected);

    let (_, mut read) = socket.split();

    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => {
                router.route_str(text.as_str());
            }
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => {
                    router.route_str(text);
                }
                Err(error) => debug!(feed = %stream, %error, "dropping non utf8 frame"),
            },
            Ok(Message::Close(frame)) => {
                warn!(feed = %stream, ?frame, "tick feed closed by server");
                break;
            }
            Ok(_) => {}
            Err(error) => {
                error!(feed = %stream, %error, "tick feed error");
                break;
            }
        }
    }

    Session::Closed
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tick::TickNormalizer;

    #[tokio::test(start_paused = true)]
    async fn test_tick_feed_stops_on_shutdown() {
        let router = Arc::new(TabRouter::new(TickNormalizer::new(
            Arc::default(),
            Arc::default(),
        )));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let (task, mut status) = spawn_tick_feed(
            FeedConfig {
                // Unroutable port, every connection attempt fails
                url: "ws://127.0.0.1:9/ws".to_string(),
                stream: TickStream::Direct,
                reconnect_delay: Duration::from_secs(5),
            },
            router,
            shutdown_rx,
        );

        shutdown_tx.send_replace(true);
        task.await.unwrap();

        assert_eq!(*status.borrow_and_update(), FeedStatus::Stopped);
    }
}
