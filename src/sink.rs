//! Driving a flattened stream into a byte sink.

use std::future::poll_fn;
use std::pin::pin;

use futures_core::stream::TryStream;

use crate::error::{DrainError, SinkError};

/// A byte-oriented output collaborator.
///
/// `append` is a buffering write and cannot fail; I/O failures surface at
/// `flush`. [`drain`] guarantees that `flush` and `close` each run exactly
/// once per sink, on the terminal transition, and that `close` runs even
/// when the stream fails or the drain future is dropped mid-way.
pub trait ByteSink {
    /// Buffers `bytes` at the end of the sink's output.
    fn append(&mut self, bytes: &[u8]);

    /// Writes buffered output through to the underlying storage.
    fn flush(&mut self) -> Result<(), SinkError>;

    /// Releases the sink. Called exactly once, after the last `append`.
    fn close(&mut self) -> Result<(), SinkError>;
}

/// Holds the sink until a terminal transition; `close` runs exactly once no
/// matter which exit path is taken, including drop of the drain future.
struct Guard<K: ByteSink> {
    sink: Option<K>,
}

impl<K: ByteSink> Guard<K> {
    fn append(&mut self, bytes: &[u8]) {
        if let Some(sink) = self.sink.as_mut() {
            sink.append(bytes);
        }
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        match self.sink.as_mut() {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> Result<(), SinkError> {
        match self.sink.take() {
            Some(mut sink) => sink.close(),
            None => Ok(()),
        }
    }
}

impl<K: ByteSink> Drop for Guard<K> {
    fn drop(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            if let Err(error) = sink.close() {
                tracing::warn!(%error, "sink close failed while cancelling a drain");
            }
        }
    }
}

/// Appends every `Ok` item of `stream` to `sink`, in order, then flushes and
/// closes it.
///
/// On a source error the sink is still flushed and closed before the error
/// is returned; flush or close failures on that path are logged rather than
/// masking the stream's own failure. If the returned future is dropped
/// before completion, the sink is closed (without a flush) exactly once.
///
/// ```
/// use stream_flatten_seq::sink::{drain, ByteSink};
/// use stream_flatten_seq::SinkError;
/// use futures::stream::iter;
///
/// #[derive(Default)]
/// struct Collect(Vec<u8>);
///
/// impl ByteSink for Collect {
///     fn append(&mut self, bytes: &[u8]) {
///         self.0.extend_from_slice(bytes);
///     }
///     fn flush(&mut self) -> Result<(), SinkError> {
///         Ok(())
///     }
///     fn close(&mut self) -> Result<(), SinkError> {
///         Ok(())
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let chunks = iter(vec![Ok::<_, &str>(b"ab".to_vec()), Ok(b"c".to_vec())]);
///     drain(chunks, Collect::default()).await.unwrap();
/// }
/// ```
pub async fn drain<St, K>(stream: St, sink: K) -> Result<(), DrainError<St::Error>>
where
    St: TryStream,
    St::Ok: AsRef<[u8]>,
    K: ByteSink,
{
    let mut stream = pin!(stream);
    let mut guard = Guard { sink: Some(sink) };

    loop {
        match poll_fn(|cx| stream.as_mut().try_poll_next(cx)).await {
            Some(Ok(item)) => guard.append(item.as_ref()),
            Some(Err(error)) => {
                if let Err(sink_error) = guard.flush() {
                    tracing::warn!(error = %sink_error, "sink flush failed after source failure");
                }
                if let Err(sink_error) = guard.close() {
                    tracing::warn!(error = %sink_error, "sink close failed after source failure");
                }
                return Err(DrainError::Source(error));
            }
            None => {
                let flushed = guard.flush();
                let closed = guard.close();
                flushed?;
                closed?;
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream::{iter, pending, StreamExt};
    use std::io;
    use std::sync::{Arc, Mutex};
    use tokio_test::{assert_pending, task};

    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    struct CustomError;

    impl std::fmt::Display for CustomError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("custom error")
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Append(Vec<u8>),
        Flush,
        Close,
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        ops: Arc<Mutex<Vec<Op>>>,
        fail_flush: bool,
        fail_close: bool,
    }

    impl RecordingSink {
        fn ops(&self) -> Vec<Op> {
            self.ops.lock().unwrap().clone()
        }

        fn closes(&self) -> usize {
            self.ops().iter().filter(|op| **op == Op::Close).count()
        }
    }

    impl ByteSink for RecordingSink {
        fn append(&mut self, bytes: &[u8]) {
            self.ops.lock().unwrap().push(Op::Append(bytes.to_vec()));
        }

        fn flush(&mut self) -> Result<(), SinkError> {
            self.ops.lock().unwrap().push(Op::Flush);
            if self.fail_flush {
                return Err(SinkError::flush(io::Error::other("disk full")));
            }
            Ok(())
        }

        fn close(&mut self) -> Result<(), SinkError> {
            self.ops.lock().unwrap().push(Op::Close);
            if self.fail_close {
                return Err(SinkError::close(io::Error::other("already gone")));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_completed_stream_appends_then_flushes_then_closes() {
        let sink = RecordingSink::default();
        let handle = sink.clone();

        let chunks = iter(vec![Ok::<_, CustomError>(b"ab".to_vec()), Ok(b"cd".to_vec())]);
        drain(chunks, sink).await.unwrap();

        assert_eq!(
            handle.ops(),
            vec![
                Op::Append(b"ab".to_vec()),
                Op::Append(b"cd".to_vec()),
                Op::Flush,
                Op::Close,
            ],
        );
    }

    #[tokio::test]
    async fn test_failed_stream_still_flushes_and_closes_once() {
        let sink = RecordingSink::default();
        let handle = sink.clone();

        let chunks = iter(vec![Ok(b"ab".to_vec()), Err(CustomError)]);
        let result = drain(chunks, sink).await;

        assert!(matches!(result, Err(DrainError::Source(CustomError))));
        assert_eq!(
            handle.ops(),
            vec![Op::Append(b"ab".to_vec()), Op::Flush, Op::Close],
        );
    }

    #[tokio::test]
    async fn test_flush_failure_still_closes_once() {
        let sink = RecordingSink {
            fail_flush: true,
            ..RecordingSink::default()
        };
        let handle = sink.clone();

        let chunks = iter(vec![Ok::<_, CustomError>(b"ab".to_vec())]);
        let result = drain(chunks, sink).await;

        match result {
            Err(DrainError::Sink(error)) => assert_eq!(error.operation(), "flush"),
            other => panic!("expected a sink error, got {:?}", other),
        }
        assert_eq!(handle.ops(), vec![Op::Append(b"ab".to_vec()), Op::Flush, Op::Close]);
    }

    #[tokio::test]
    async fn test_close_failure_is_surfaced() {
        let sink = RecordingSink {
            fail_close: true,
            ..RecordingSink::default()
        };
        let handle = sink.clone();

        let chunks = iter(Vec::<Result<Vec<u8>, CustomError>>::new());
        let result = drain(chunks, sink).await;

        match result {
            Err(DrainError::Sink(error)) => assert_eq!(error.operation(), "close"),
            other => panic!("expected a sink error, got {:?}", other),
        }
        assert_eq!(handle.closes(), 1);
    }

    #[test]
    fn test_cancelled_drain_closes_exactly_once_without_flushing() {
        let sink = RecordingSink::default();
        let handle = sink.clone();

        let chunks = iter(vec![Ok::<_, CustomError>(b"ab".to_vec())]).chain(pending());
        let mut fut = task::spawn(drain(chunks, sink));

        assert_pending!(fut.poll());
        drop(fut);

        assert_eq!(handle.ops(), vec![Op::Append(b"ab".to_vec()), Op::Close]);
    }
}
