//! Periodic sampling of a state stream

use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait adding [`Sample`] to any stream.
pub trait SampleExt: Stream {
    /// Emit at most one item per `period`, always the most recent one.
    ///
    /// Items arriving between ticks overwrite each other. A tick with nothing
    /// new emits nothing.
    fn sample(self, period: Duration) -> Sample<Self>
    where
        Self: Sized,
    {
        Sample::new(self, period)
    }
}

impl<T: Stream> SampleExt for T {}

pin_project! {
    /// Stream returned by [`SampleExt::sample`].
    pub struct Sample<S: Stream> {
        #[pin]
        inner: S,
        ticker: Interval,
        latest: Option<S::Item>,
        done: bool,
    }
}

impl<S: Stream> Sample<S> {
    pub fn new(inner: S, period: Duration) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { inner, ticker, latest: None, done: false }
    }
}

impl<S: Stream> Stream for Sample<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Pull everything that is ready so the inner stream keeps getting polled
        while !*this.done {
            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.latest = Some(item),
                Poll::Ready(None) => *this.done = true,
                Poll::Pending => break,
            }
        }

        if *this.done && this.latest.is_none() {
            return Poll::Ready(None);
        }

        loop {
            if this.ticker.poll_tick(cx).is_pending() {
                return Poll::Pending;
            }
            if let Some(item) = this.latest.take() {
                return Poll::Ready(Some(item));
            }
            if *this.done {
                return Poll::Ready(None);
            }
            // Tick with nothing new; anything arriving now waits for the next one
            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.latest = Some(item),
                Poll::Ready(None) => *this.done = true,
                Poll::Pending => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test(start_paused = true)]
    async fn keeps_only_the_latest_item_per_period() {
        let items = futures::stream::iter(1..=5);
        let sampled: Vec<i32> = items.sample(Duration::from_millis(100)).collect().await;
        assert_eq!(sampled, vec![5]);
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_items_all_pass() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let stream = tokio_stream::wrappers::UnboundedReceiverStream::new(rx);
        let mut sampled = Box::pin(stream.sample(Duration::from_millis(10)));

        tx.send(1).unwrap();
        assert_eq!(sampled.next().await, Some(1));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(2).unwrap();
        assert_eq!(sampled.next().await, Some(2));
        drop(tx);
        assert_eq!(sampled.next().await, None);
    }
}
