use crate::enricher::{Enricher, EnrichmentOutcome};
use crate::models::AssetEvent;
use std::sync::Arc;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, oneshot};
use tokio::task::{JoinHandle, JoinSet};

/// Subscribes to store change events and runs each qualifying enrichment
/// as its own background task
pub struct EnrichmentListener {
    enricher: Arc<Enricher>,
}

/// Handle to a running listener
pub struct ListenerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Stop accepting events and wait for in-flight enrichments to finish.
    /// Events already queued when this is called are still handled.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Enrichment listener task failed");
        }
    }
}

impl EnrichmentListener {
    pub fn new(enricher: Arc<Enricher>) -> Self {
        Self { enricher }
    }

    /// Start consuming `events` on the tokio runtime
    pub fn spawn(self, events: broadcast::Receiver<AssetEvent>) -> ListenerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(events, shutdown_rx));
        ListenerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    fn dispatch(&self, event: AssetEvent, tasks: &mut JoinSet<EnrichmentOutcome>) {
        if Enricher::should_enrich(&event) {
            let enricher = self.enricher.clone();
            tasks.spawn(async move { enricher.handle(&event).await });
        }
    }

    /// Start runs for everything still queued on the channel. A lagged
    /// receiver has lost the oldest events but still holds the newer ones.
    fn drain_queued(
        &self,
        events: &mut broadcast::Receiver<AssetEvent>,
        tasks: &mut JoinSet<EnrichmentOutcome>,
    ) {
        loop {
            match events.try_recv() {
                Ok(event) => self.dispatch(event, tasks),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Enrichment listener fell behind; events dropped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    async fn run(
        self,
        mut events: broadcast::Receiver<AssetEvent>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                event = events.recv() => {
                    match event {
                        Ok(event) => self.dispatch(event, &mut tasks),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Enrichment listener fell behind; events dropped");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Enrichment task panicked");
                    }
                }
                _ = &mut shutdown => break,
            }
        }

        self.drain_queued(&mut events, &mut tasks);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Enrichment task panicked");
            }
        }
    }
}
