//! Error types shared by the crate's combinators and the sink driver.

use std::io;
#[cfg(feature = "time")]
use std::time::Duration;

use thiserror::Error;

/// Error returned by [`reduce`](crate::TryStreamExt::reduce).
#[derive(Debug, PartialEq, Error)]
pub enum ReduceError<E> {
    /// The source stream ended before producing a single item.
    #[error("cannot reduce an empty stream")]
    Empty,
    /// The source stream failed before the fold completed. The partial
    /// accumulator is discarded.
    #[error("source stream failed before the fold completed")]
    Source(E),
}

/// Error raised by a [`ByteSink`](crate::ByteSink) while flushing or closing.
#[derive(Debug, Error)]
#[error("sink {op} failed")]
pub struct SinkError {
    op: &'static str,
    #[source]
    source: io::Error,
}

impl SinkError {
    /// Wraps an I/O failure observed while flushing buffered output.
    pub fn flush(source: io::Error) -> Self {
        Self { op: "flush", source }
    }

    /// Wraps an I/O failure observed while closing the sink.
    pub fn close(source: io::Error) -> Self {
        Self { op: "close", source }
    }

    /// The sink operation that failed, `"flush"` or `"close"`.
    pub fn operation(&self) -> &'static str {
        self.op
    }
}

/// Error returned by [`drain`](crate::sink::drain).
#[derive(Debug, Error)]
pub enum DrainError<E> {
    /// The source stream emitted a terminal error. The sink was still
    /// flushed and closed.
    #[error("source stream failed while draining")]
    Source(E),
    /// The sink rejected a flush or close.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Synthetic error produced by [`deadline`](crate::TryStreamExt::deadline)
/// when a stream stays pending past its limit.
#[cfg(feature = "time")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stream did not complete within {limit:?}")]
pub struct TimeoutError {
    limit: Duration,
}

#[cfg(feature = "time")]
impl TimeoutError {
    pub(crate) fn new(limit: Duration) -> Self {
        Self { limit }
    }

    /// The configured deadline that elapsed.
    pub fn limit(&self) -> Duration {
        self.limit
    }
}
