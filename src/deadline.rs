use core::future::Future;
use core::pin::Pin;
use std::time::Duration;

use futures_core::stream::{FusedStream, Stream, TryStream};
use futures_core::task::{Context, Poll};
use pin_project::pin_project;
use tokio::time::{sleep, Sleep};

use crate::error::TimeoutError;

/// Stream for the [`deadline`](crate::TryStreamExt::deadline) method.
///
/// The timer is armed at the first poll and runs for the whole life of the
/// underlying stream, not per item. Once it fires, a single synthetic
/// [`TimeoutError`] is yielded and the stream ends; a stream that completes
/// in time is passed through untouched.
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct Deadline<St> {
    #[pin]
    stream: St,
    limit: Duration,
    #[pin]
    sleep: Option<Sleep>,
    expired: bool,
}

impl<St> Deadline<St>
where
    St: TryStream,
    St::Error: From<TimeoutError>,
{
    pub(crate) fn new(stream: St, limit: Duration) -> Self {
        Self {
            stream,
            limit,
            sleep: None,
            expired: false,
        }
    }

    /// Acquires a reference to the underlying stream that this combinator is
    /// pulling from.
    pub fn get_ref(&self) -> &St {
        &self.stream
    }

    /// Consumes this combinator, returning the underlying stream.
    ///
    /// Note that this may discard intermediate state of this combinator, so
    /// care should be taken to avoid losing resources when this is called.
    pub fn into_inner(self) -> St {
        self.stream
    }
}

impl<St> FusedStream for Deadline<St>
where
    St: TryStream + FusedStream,
    St::Error: From<TimeoutError>,
{
    fn is_terminated(&self) -> bool {
        self.expired || self.stream.is_terminated()
    }
}

impl<St> Stream for Deadline<St>
where
    St: TryStream,
    St::Error: From<TimeoutError>,
{
    type Item = Result<St::Ok, St::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.expired {
            return Poll::Ready(None);
        }
        if this.sleep.is_none() {
            this.sleep.set(Some(sleep(*this.limit)));
        }

        match this.stream.try_poll_next(cx) {
            Poll::Ready(Some(item)) => Poll::Ready(Some(item)),
            Poll::Ready(None) => {
                *this.expired = true;
                Poll::Ready(None)
            }
            Poll::Pending => match this.sleep.as_mut().as_pin_mut() {
                Some(sleep) => match sleep.poll(cx) {
                    Poll::Ready(()) => {
                        *this.expired = true;
                        Poll::Ready(Some(Err(TimeoutError::new(*this.limit).into())))
                    }
                    Poll::Pending => Poll::Pending,
                },
                None => Poll::Pending,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recover::SkipErrors;
    use crate::seq_flat_map::TryStreamExt as _;
    use futures::stream::{iter, once, StreamExt};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum ChunkError {
        Timeout(TimeoutError),
    }

    impl From<TimeoutError> for ChunkError {
        fn from(error: TimeoutError) -> Self {
            ChunkError::Timeout(error)
        }
    }

    impl std::fmt::Display for ChunkError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                ChunkError::Timeout(error) => error.fmt(f),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_stream_passes_through() {
        let limit = Duration::from_secs(1);
        let mut stream = std::pin::pin!(iter(vec![Ok::<_, ChunkError>(1), Ok(2)]).deadline(limit));

        assert_eq!(stream.next().await, Some(Ok(1)));
        assert_eq!(stream.next().await, Some(Ok(2)));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_stream_times_out_once_then_ends() {
        let limit = Duration::from_millis(50);
        let mut stream = std::pin::pin!(
            futures::stream::pending::<Result<i32, ChunkError>>().deadline(limit)
        );

        assert_eq!(
            stream.next().await,
            Some(Err(ChunkError::Timeout(TimeoutError::new(limit)))),
        );
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_is_for_the_whole_stream() {
        // Two items each arriving after 40ms under a 50ms whole-stream
        // deadline: the first makes it, the second does not.
        let limit = Duration::from_millis(50);
        let delayed = |value: i32| {
            once(async move {
                tokio::time::sleep(Duration::from_millis(40)).await;
                Ok::<_, ChunkError>(value)
            })
        };
        let mut stream = std::pin::pin!(delayed(1).chain(delayed(2)).deadline(limit));

        assert_eq!(stream.next().await, Some(Ok(1)));
        assert!(matches!(
            stream.next().await,
            Some(Err(ChunkError::Timeout(_))),
        ));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_feeds_the_recovery_policy() {
        let limit = Duration::from_millis(10);
        let outer = iter(vec![Ok::<_, ChunkError>(0), Ok(1)]);

        // Every inner stream stalls after its chunks and only ends through
        // the deadline.
        let mut stream = std::pin::pin!(outer.seq_flat_map(
            move |item| {
                let chunks = match item {
                    0 => vec![Ok(10), Ok(11)],
                    _ => vec![Ok(20)],
                };
                iter(chunks).chain(futures::stream::pending()).deadline(limit)
            },
            SkipErrors,
        ));

        assert_eq!(stream.next().await, Some(Ok(10)));
        assert_eq!(stream.next().await, Some(Ok(11)));
        assert_eq!(stream.next().await, Some(Ok(20)));
        assert_eq!(stream.next().await, None);
    }
}
