//! Bounded single-message receive.
//!
//! [`BoundedReceiver`] waits for the next item on a delivery source or gives
//! up once its timeout elapses, whichever happens first. It is a single-shot
//! wait: it consumes at most one item and keeps no state between calls.

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why a bounded receive produced no item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReceiveError {
    #[error("timeout waiting for event")]
    Timeout,
    #[error("delivery source closed before an event arrived")]
    Closed,
    #[error("receive cancelled")]
    Cancelled,
}

/// What to do when the source ends before yielding anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosedSource {
    /// Report [`ReceiveError::Closed`] as soon as the source ends.
    #[default]
    Fail,
    /// Treat an ended source like a silent one and time out at the deadline.
    WaitForDeadline,
}

/// Waits for one item on a stream, bounded by a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedReceiver {
    timeout: Duration,
    on_closed: ClosedSource,
}

impl BoundedReceiver {
    /// Create a receiver with the given timeout and the default closed-source policy.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            on_closed: ClosedSource::default(),
        }
    }

    /// Set the closed-source policy.
    pub fn on_closed(mut self, policy: ClosedSource) -> Self {
        self.on_closed = policy;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn closed_policy(&self) -> ClosedSource {
        self.on_closed
    }

    /// Wait for the next item on `source`.
    ///
    /// An item that is already queued is returned even when the timeout is
    /// zero. A zero timeout on an empty source fails immediately.
    pub async fn receive<S>(&self, source: &mut S) -> Result<S::Item, ReceiveError>
    where
        S: Stream + Unpin,
    {
        self.race(source, std::future::pending()).await
    }

    /// Like [`receive`](Self::receive), but resolves to
    /// [`ReceiveError::Cancelled`] if `cancel` fires first.
    pub async fn receive_or_cancel<S>(
        &self,
        source: &mut S,
        cancel: &CancellationToken,
    ) -> Result<S::Item, ReceiveError>
    where
        S: Stream + Unpin,
    {
        self.race(source, cancel.cancelled()).await
    }

    async fn race<S, C>(&self, source: &mut S, cancelled: C) -> Result<S::Item, ReceiveError>
    where
        S: Stream + Unpin,
        C: Future<Output = ()>,
    {
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);
        tokio::pin!(cancelled);

        // Source first: a ready item must beat an expired deadline.
        let next = tokio::select! {
            biased;
            item = source.next() => item,
            _ = &mut cancelled => return Err(ReceiveError::Cancelled),
            _ = &mut deadline => return Err(ReceiveError::Timeout),
        };

        match (next, self.on_closed) {
            (Some(item), _) => Ok(item),
            (None, ClosedSource::Fail) => Err(ReceiveError::Closed),
            (None, ClosedSource::WaitForDeadline) => {
                tokio::select! {
                    biased;
                    _ = &mut cancelled => Err(ReceiveError::Cancelled),
                    _ = &mut deadline => Err(ReceiveError::Timeout),
                }
            }
        }
    }
}

/// Wait for the next item on `source` for at most `timeout`.
pub async fn receive<S>(source: &mut S, timeout: Duration) -> Result<S::Item, ReceiveError>
where
    S: Stream + Unpin,
{
    BoundedReceiver::new(timeout).receive(source).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use tokio::time::{Instant, sleep};

    #[tokio::test(start_paused = true)]
    async fn test_delivery_before_deadline() {
        let (tx, mut rx) = mpsc::unbounded::<&'static [u8]>();

        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            tx.unbounded_send(b"hello").unwrap();
        });

        let start = Instant::now();
        let payload = receive(&mut rx, Duration::from_secs(2)).await.unwrap();

        assert_eq!(payload, b"hello");
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_source_times_out_at_deadline() {
        let (_tx, mut rx) = mpsc::unbounded::<Vec<u8>>();

        let start = Instant::now();
        let err = receive(&mut rx, Duration::from_millis(100))
            .await
            .unwrap_err();

        assert_eq!(err, ReceiveError::Timeout);
        assert_eq!(err.to_string(), "timeout waiting for event");
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_item_wins_over_tiny_timeout() {
        let (tx, mut rx) = mpsc::unbounded();
        tx.unbounded_send(7u32).unwrap();

        let item = receive(&mut rx, Duration::from_nanos(1)).await.unwrap();
        assert_eq!(item, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout() {
        let (tx, mut rx) = mpsc::unbounded();

        let start = Instant::now();
        let err = receive(&mut rx, Duration::ZERO).await.unwrap_err();
        assert_eq!(err, ReceiveError::Timeout);
        assert_eq!(start.elapsed(), Duration::ZERO);

        tx.unbounded_send("ready").unwrap();
        assert_eq!(receive(&mut rx, Duration::ZERO).await.unwrap(), "ready");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_receives_keep_arrival_order() {
        let (tx, mut rx) = mpsc::unbounded();

        tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            tx.unbounded_send("first").unwrap();
            sleep(Duration::from_millis(30)).await;
            tx.unbounded_send("second").unwrap();
            // Keep the source live past the second receive.
            sleep(Duration::from_secs(10)).await;
            drop(tx);
        });

        let receiver = BoundedReceiver::new(Duration::from_secs(1));
        assert_eq!(receiver.receive(&mut rx).await.unwrap(), "first");
        assert_eq!(receiver.receive(&mut rx).await.unwrap(), "second");
        assert_eq!(
            receiver.receive(&mut rx).await.unwrap_err(),
            ReceiveError::Timeout
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_source_fails_by_default() {
        let (tx, mut rx) = mpsc::unbounded::<u8>();
        drop(tx);

        let start = Instant::now();
        let err = receive(&mut rx, Duration::from_secs(5)).await.unwrap_err();

        assert_eq!(err, ReceiveError::Closed);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_source_as_silence() {
        let (tx, mut rx) = mpsc::unbounded::<u8>();
        drop(tx);

        let receiver = BoundedReceiver::new(Duration::from_millis(250))
            .on_closed(ClosedSource::WaitForDeadline);

        let start = Instant::now();
        let err = receiver.receive(&mut rx).await.unwrap_err();

        assert_eq!(err, ReceiveError::Timeout);
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_resolves_early() {
        let (_tx, mut rx) = mpsc::unbounded::<u8>();
        let token = CancellationToken::new();

        let trigger = token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let err = BoundedReceiver::new(Duration::from_secs(60))
            .receive_or_cancel(&mut rx, &token)
            .await
            .unwrap_err();

        assert_eq!(err, ReceiveError::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_does_not_drop_queued_item() {
        let (tx, mut rx) = mpsc::unbounded();
        tx.unbounded_send(1u8).unwrap();

        let token = CancellationToken::new();
        token.cancel();

        let item = BoundedReceiver::new(Duration::from_secs(1))
            .receive_or_cancel(&mut rx, &token)
            .await
            .unwrap();
        assert_eq!(item, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_at_most_one_item_consumed() {
        let (tx, mut rx) = mpsc::unbounded();
        tx.unbounded_send(1u8).unwrap();
        tx.unbounded_send(2u8).unwrap();

        assert_eq!(receive(&mut rx, Duration::from_secs(1)).await.unwrap(), 1);
        assert_eq!(rx.next().await, Some(2));
    }

    #[test]
    fn test_builder() {
        let receiver =
            BoundedReceiver::new(Duration::from_secs(3)).on_closed(ClosedSource::WaitForDeadline);

        assert_eq!(receiver.timeout(), Duration::from_secs(3));
        assert_eq!(receiver.closed_policy(), ClosedSource::WaitForDeadline);
        assert_eq!(
            BoundedReceiver::new(Duration::ZERO).closed_policy(),
            ClosedSource::Fail
        );
    }
}
