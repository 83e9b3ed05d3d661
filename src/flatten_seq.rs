use core::pin::Pin;
use futures_core::ready;
use futures_core::stream::{FusedStream, Stream};
use futures_core::task::{Context, Poll};
use pin_project::pin_project;

impl<T: ?Sized> StreamExt for T where T: Stream {}

/// An extension trait for Streams that provides a variety of convenient combinator functions.
pub trait StreamExt: Stream {
    /// Flattens a stream of streams into one continuous stream.
    ///
    /// Each inner stream is exhausted before the next outer item is pulled,
    /// so the output preserves the nesting order exactly and at most one
    /// inner stream is live at any instant. Concatenating two streams is the
    /// two-element special case:
    ///
    /// ```
    /// use stream_flatten_seq::StreamExt as _;
    /// use futures::stream::{iter, StreamExt};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let head = iter(vec![1, 2]);
    ///     let tail = iter(vec![3, 4]);
    ///     let combined: Vec<_> = iter(vec![head, tail]).flatten_seq().collect().await;
    ///     assert_eq!(combined, vec![1, 2, 3, 4]);
    /// }
    /// ```
    fn flatten_seq(self) -> FlattenSeq<Self>
    where
        Self::Item: Stream,
        Self: Sized,
    {
        FlattenSeq::new(self)
    }
}

/// Stream for the [`flatten_seq`](StreamExt::flatten_seq) method.
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct FlattenSeq<St>
where
    St: Stream,
{
    #[pin]
    stream: St,
    #[pin]
    next: Option<St::Item>,
}

impl<St> FlattenSeq<St>
where
    St: Stream,
    St::Item: Stream,
{
    pub(crate) fn new(stream: St) -> Self {
        Self { stream, next: None }
    }

    /// Acquires a reference to the underlying stream that this combinator is
    /// pulling from.
    pub fn get_ref(&self) -> &St {
        &self.stream
    }

    /// Acquires a mutable reference to the underlying stream that this
    /// combinator is pulling from.
    ///
    /// Note that care must be taken to avoid tampering with the state of the
    /// stream which may otherwise confuse this combinator.
    pub fn get_mut(&mut self) -> &mut St {
        &mut self.stream
    }

    /// Acquires a pinned mutable reference to the underlying stream that this
    /// combinator is pulling from.
    ///
    /// Note that care must be taken to avoid tampering with the state of the
    /// stream which may otherwise confuse this combinator.
    pub fn get_pin_mut(self: Pin<&mut Self>) -> Pin<&mut St> {
        self.project().stream
    }

    /// Consumes this combinator, returning the underlying stream.
    ///
    /// Note that this may discard intermediate state of this combinator, so
    /// care should be taken to avoid losing resources when this is called.
    pub fn into_inner(self) -> St {
        self.stream
    }
}

impl<St> FusedStream for FlattenSeq<St>
where
    St: FusedStream,
    St::Item: Stream,
{
    fn is_terminated(&self) -> bool {
        self.next.is_none() && self.stream.is_terminated()
    }
}

impl<St> Stream for FlattenSeq<St>
where
    St: Stream,
    St::Item: Stream,
{
    type Item = <St::Item as Stream>::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        Poll::Ready(loop {
            if let Some(inner) = this.next.as_mut().as_pin_mut() {
                match ready!(inner.poll_next(cx)) {
                    Some(item) => break Some(item),
                    None => this.next.set(None),
                }
            } else if let Some(inner) = ready!(this.stream.as_mut().poll_next(cx)) {
                this.next.set(Some(inner));
            } else {
                break None;
            }
        })
    }
}
