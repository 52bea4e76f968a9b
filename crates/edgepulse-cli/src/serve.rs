//! Message loop: pull deliveries, run handlers concurrently, settle acks.

use std::future::Future;
use std::sync::Arc;

use edgepulse_core::MessageResponse;
use edgepulse_hardware::Actuate;
use edgepulse_relay::{
    Acknowledgment, MessageSink, MessageSource, RelayError, RelayPipeline, SourceError,
};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

type HandlerOutcome = (String, Result<MessageResponse, RelayError>);

/// Counts reported when the loop ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServeStats {
    pub completed: u64,
    pub rejected: u64,
    pub unreadable: u64,
}

/// Run until `shutdown` resolves or the source is exhausted.
///
/// At most `max_in_flight` handlers run at once; while that many are
/// running, deliveries stay in the source. Once shutdown or exhaustion happens no new deliveries are taken; handlers already running
/// (including a pulse in progress) finish and are acknowledged before this
/// returns.
pub async fn serve<A, K, S, F>(
    pipeline: Arc<RelayPipeline<A, K>>,
    mut source: S,
    max_in_flight: usize,
    shutdown: F,
) -> ServeStats
where
    A: Actuate + 'static,
    K: MessageSink + 'static,
    S: MessageSource,
    F: Future<Output = ()>,
{
    let mut stats = ServeStats::default();
    let mut handlers: JoinSet<HandlerOutcome> = JoinSet::new();
    let max_in_flight = max_in_flight.max(1);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                info!(in_flight = handlers.len(), "Shutdown requested, no longer accepting messages");
                break;
            }

            Some(joined) = handlers.join_next() => {
                settle(&mut source, joined, &mut stats).await;
            }

            next = source.next_message(), if handlers.len() < max_in_flight => match next {
                Ok(Some(inbound)) => {
                    let pipeline = Arc::clone(&pipeline);
                    handlers.spawn(async move {
                        let result = pipeline.on_message(&inbound).await;
                        (inbound.id, result)
                    });
                }
                Ok(None) => {
                    info!(in_flight = handlers.len(), "Source exhausted");
                    break;
                }
                Err(SourceError::Malformed(reason)) => {
                    warn!(%reason, "Skipping unreadable delivery");
                    stats.unreadable += 1;
                }
                Err(e) => {
                    error!(error = %e, "Source failed, no longer accepting messages");
                    break;
                }
            },
        }
    }

    while let Some(joined) = handlers.join_next().await {
        settle(&mut source, joined, &mut stats).await;
    }

    debug!(?stats, "Message loop finished");
    stats
}

async fn settle<S: MessageSource>(
    source: &mut S,
    joined: Result<HandlerOutcome, JoinError>,
    stats: &mut ServeStats,
) {
    match joined {
        Ok((id, result)) => {
            let ack = Acknowledgment::from(&result);
            if ack.is_completed() {
                stats.completed += 1;
            } else {
                stats.rejected += 1;
            }
            source.acknowledge(&id, ack).await;
        }
        Err(e) => error!(error = %e, "Message handler did not finish"),
    }
}
