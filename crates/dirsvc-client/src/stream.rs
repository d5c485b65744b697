//! Adapts a `tonic::Streaming<T>` into plain `mpsc` channels so callers
//! don't have to poll the gRPC stream themselves.
//!
//! One task owns the stream and forwards each decoded item to `items`
//! or each transport error to `errors`, closing both on a clean end of
//! stream or when the consumer drops its receivers. `done` resolves once
//! the task has exited, which callers can await for a clean join instead
//! of guessing how long draining takes.

use tokio::sync::{mpsc, oneshot};
use tonic::{Status, Streaming};

/// Handles returned by [`spawn_consumer`].
pub struct ConsumerHandles<T> {
    pub items: mpsc::Receiver<T>,
    pub errors: mpsc::Receiver<Status>,
    pub done: oneshot::Receiver<()>,
}

/// Spawns a task that drains `stream` into channels, decoupling stream
/// polling from whatever the caller does with each item.
pub fn spawn_consumer<T>(mut stream: Streaming<T>) -> ConsumerHandles<T>
where
    T: Send + 'static,
{
    let (items_tx, items_rx) = mpsc::channel(64);
    let (errors_tx, errors_rx) = mpsc::channel(8);
    let (done_tx, done_rx) = oneshot::channel();

    tokio::spawn(async move {
        loop {
            match stream.message().await {
                Ok(Some(item)) => {
                    if items_tx.send(item).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(status) => {
                    let _ = errors_tx.send(status).await;
                    break;
                }
            }
        }
        let _ = done_tx.send(());
    });

    ConsumerHandles {
        items: items_rx,
        errors: errors_rx,
        done: done_rx,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dirsvc_rpc::directory::v1::ListenResponse;

    // `Streaming` has no public constructor outside tonic's transport
    // machinery, so `spawn_consumer` itself is exercised end-to-end against
    // a real server in dirsvc-daemon's grpc_interop_test.rs. This test only
    // documents the channel-closing contract the task relies on.
    #[tokio::test]
    async fn dropping_the_sender_closes_the_receiver() {
        let (items_tx, mut items_rx) = mpsc::channel::<ListenResponse>(4);
        let (_errors_tx, mut errors_rx) = mpsc::channel::<Status>(4);
        drop(items_tx);
        assert!(items_rx.recv().await.is_none());
        assert!(errors_rx.try_recv().is_err());
    }
}
