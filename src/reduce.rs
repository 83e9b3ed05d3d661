use core::future::Future;
use core::pin::Pin;
use futures_core::ready;
use futures_core::stream::TryStream;
use futures_core::task::{Context, Poll};
use pin_project::pin_project;

use crate::error::ReduceError;

/// Future for the [`reduce`](crate::TryStreamExt::reduce) method.
#[pin_project]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Reduce<St, F>
where
    St: TryStream,
{
    #[pin]
    stream: St,
    combine: F,
    acc: Option<St::Ok>,
}

impl<St, F> Reduce<St, F>
where
    St: TryStream,
    F: FnMut(St::Ok, St::Ok) -> St::Ok,
{
    pub(crate) fn new(stream: St, combine: F) -> Self {
        Self {
            stream,
            combine,
            acc: None,
        }
    }
}

impl<St, F> Future for Reduce<St, F>
where
    St: TryStream,
    F: FnMut(St::Ok, St::Ok) -> St::Ok,
{
    type Output = Result<St::Ok, ReduceError<St::Error>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();
        Poll::Ready(loop {
            match ready!(this.stream.as_mut().try_poll_next(cx)) {
                Some(Ok(item)) => {
                    *this.acc = Some(match this.acc.take() {
                        Some(acc) => (this.combine)(acc, item),
                        None => item,
                    });
                }
                Some(Err(error)) => break Err(ReduceError::Source(error)),
                None => {
                    break match this.acc.take() {
                        Some(acc) => Ok(acc),
                        None => Err(ReduceError::Empty),
                    }
                }
            }
        })
    }
}
