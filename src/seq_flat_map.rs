use core::pin::Pin;
use futures_core::ready;
use futures_core::stream::{FusedStream, Stream, TryStream};
use futures_core::task::{Context, Poll};
use pin_project::pin_project;

#[cfg(feature = "time")]
use std::time::Duration;

use crate::recover::{RecoveryDecision, RecoveryPolicy};
use crate::reduce::Reduce;

#[cfg(feature = "time")]
use crate::deadline::Deadline;
#[cfg(feature = "time")]
use crate::error::TimeoutError;

impl<S: ?Sized + TryStream> TryStreamExt for S {}

/// An extension trait for Streams that provides a variety of convenient combinator functions.
pub trait TryStreamExt: TryStream {
    /// Maps each item of this stream to an inner stream and flattens the
    /// inner streams into one continuous stream, one at a time.
    ///
    /// Each inner stream is driven to its end before the next outer item is
    /// pulled, so the output never interleaves items from distinct inner
    /// streams. On every error, `policy` decides whether the flattened
    /// stream aborts, substitutes an item, or skips; see
    /// [`RecoveryPolicy`](crate::RecoveryPolicy). With
    /// [`AbortOnError`](crate::AbortOnError) this is a plain sequential
    /// try-flatten.
    ///
    /// ```
    /// use stream_flatten_seq::{ResumeWith, TryStreamExt as _};
    /// use futures::stream::{iter, StreamExt};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let pages = iter(vec![Ok::<_, &str>("early"), Ok("late")]);
    ///     let mut stream = pages.seq_flat_map(
    ///         |page| match page {
    ///             "early" => iter(vec![Ok(1), Err("lost chunk"), Ok(3)]),
    ///             _ => iter(vec![Ok(4), Ok(5)]),
    ///         },
    ///         ResumeWith(0),
    ///     );
    ///
    ///     assert_eq!(stream.next().await, Some(Ok(1)));
    ///     assert_eq!(stream.next().await, Some(Ok(0)));
    ///     assert_eq!(stream.next().await, Some(Ok(3)));
    ///     assert_eq!(stream.next().await, Some(Ok(4)));
    ///     assert_eq!(stream.next().await, Some(Ok(5)));
    ///     assert_eq!(stream.next().await, None);
    /// }
    /// ```
    fn seq_flat_map<U, F, P>(self, mapper: F, policy: P) -> SeqFlatMap<Self, U, F, P>
    where
        F: FnMut(Self::Ok) -> U,
        U: TryStream<Error = Self::Error>,
        P: RecoveryPolicy<U::Ok, Self::Error>,
        Self: Sized,
    {
        SeqFlatMap::new(self, mapper, policy)
    }

    /// Folds this stream into a single value by combining each item with the
    /// running accumulator, in arrival order.
    ///
    /// The first item seeds the accumulator, so the stream must produce at
    /// least one item; an empty stream fails with
    /// [`ReduceError::Empty`](crate::ReduceError::Empty). A source error at
    /// any point fails the fold with that cause and discards the partial
    /// accumulator.
    ///
    /// ```
    /// use stream_flatten_seq::TryStreamExt as _;
    /// use futures::stream::iter;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let sum = iter((1..=4).map(Ok::<_, std::convert::Infallible>))
    ///         .reduce(|acc, item| acc + item)
    ///         .await;
    ///     assert_eq!(sum, Ok(10));
    /// }
    /// ```
    fn reduce<F>(self, combine: F) -> Reduce<Self, F>
    where
        F: FnMut(Self::Ok, Self::Ok) -> Self::Ok,
        Self: Sized,
    {
        Reduce::new(self, combine)
    }

    /// Imposes a deadline on this stream, measured from its first poll.
    ///
    /// If the stream is still pending when the deadline elapses, the adapter
    /// yields a single synthetic [`TimeoutError`] and ends. Wrapping each
    /// inner stream inside a [`seq_flat_map`](TryStreamExt::seq_flat_map)
    /// mapper makes a stalled inner stream fail through the normal recovery
    /// path, exactly as if it had failed on its own.
    #[cfg(feature = "time")]
    fn deadline(self, limit: Duration) -> Deadline<Self>
    where
        Self::Error: From<TimeoutError>,
        Self: Sized,
    {
        Deadline::new(self, limit)
    }
}

/// Stream for the [`seq_flat_map`](TryStreamExt::seq_flat_map) method.
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct SeqFlatMap<St, U, F, P> {
    #[pin]
    stream: St,
    mapper: F,
    policy: P,
    #[pin]
    next: Option<U>,
    done: bool,
}

impl<St, U, F, P> SeqFlatMap<St, U, F, P>
where
    St: TryStream,
    F: FnMut(St::Ok) -> U,
    U: TryStream<Error = St::Error>,
    P: RecoveryPolicy<U::Ok, St::Error>,
{
    pub(crate) fn new(stream: St, mapper: F, policy: P) -> Self {
        Self {
            stream,
            mapper,
            policy,
            next: None,
            done: false,
        }
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

impl<St, U, F, P> FusedStream for SeqFlatMap<St, U, F, P>
where
    St: TryStream + FusedStream,
    F: FnMut(St::Ok) -> U,
    U: TryStream<Error = St::Error>,
    P: RecoveryPolicy<U::Ok, St::Error>,
{
    fn is_terminated(&self) -> bool {
        self.done || (self.next.is_none() && self.stream.is_terminated())
    }
}

impl<St, U, F, P> Stream for SeqFlatMap<St, U, F, P>
where
    St: TryStream,
    F: FnMut(St::Ok) -> U,
    U: TryStream<Error = St::Error>,
    P: RecoveryPolicy<U::Ok, St::Error>,
{
    type Item = Result<U::Ok, St::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        Poll::Ready(loop {
            if *this.done {
                break None;
            }

            if let Some(inner) = this.next.as_mut().as_pin_mut() {
                match ready!(inner.try_poll_next(cx)) {
                    Some(Ok(item)) => break Some(Ok(item)),
                    Some(Err(error)) => match this.policy.on_inner_error(error) {
                        RecoveryDecision::Abort(cause) => {
                            this.next.set(None);
                            *this.done = true;
                            break Some(Err(cause));
                        }
                        RecoveryDecision::SubstituteAndResume(item) => break Some(Ok(item)),
                        RecoveryDecision::SubstituteAndAbandon(item) => {
                            this.next.set(None);
                            break Some(Ok(item));
                        }
                        RecoveryDecision::Skip => this.next.set(None),
                    },
                    None => this.next.set(None),
                }
            } else {
                match ready!(this.stream.as_mut().try_poll_next(cx)) {
                    Some(Ok(outer)) => {
                        let inner = (this.mapper)(outer);
                        this.next.set(Some(inner));
                    }
                    Some(Err(error)) => {
                        *this.done = true;
                        match this.policy.on_outer_error(error) {
                            RecoveryDecision::Abort(cause) => break Some(Err(cause)),
                            RecoveryDecision::SubstituteAndResume(_)
                            | RecoveryDecision::SubstituteAndAbandon(_)
                            | RecoveryDecision::Skip => {
                                // An outer failure has no item to substitute
                                // for, and the policy consumed the cause.
                                tracing::error!(
                                    "recovery policy answered an outer failure with a \
                                     non-abort decision, terminating the flattened stream"
                                );
                                break None;
                            }
                        }
                    }
                    None => {
                        *this.done = true;
                        break None;
                    }
                }
            }
        })
    }
}
