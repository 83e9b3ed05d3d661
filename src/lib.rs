//! `stream-flatten-seq` flattens a stream of streams into one continuous
//! stream, one inner stream at a time, with pluggable error recovery.
//!
//! This is useful when you have a producer that is paging through a resource
//! (like a REST endpoint with pages or a next URL) and each page expands
//! into its own stream of items that may fail part-way through. The
//! combinators here guarantee strict ordering: every item of the first inner
//! stream is delivered before the first item of the second, and exactly one
//! inner stream is live at any instant.
//!
//! The heart of the crate is [`TryStreamExt::seq_flat_map`], which maps each
//! outer item to an inner stream and flattens sequentially, consulting a
//! [`RecoveryPolicy`] whenever a source fails:
//!
//! ```
//! use stream_flatten_seq::{AbandonWith, TryStreamExt as _};
//! use futures::stream::{iter, StreamExt};
//!
//! #[tokio::main]
//! async fn main() {
//!     let pages = iter(vec![Ok::<_, &str>("first"), Ok("second")]);
//!
//!     let mut items = pages.seq_flat_map(
//!         |page| match page {
//!             "first" => iter(vec![Ok(1), Ok(2), Err("torn page"), Ok(99)]),
//!             _ => iter(vec![Ok(4), Ok(5)]),
//!         },
//!         AbandonWith(-1),
//!     );
//!
//!     // The torn page is replaced by -1 and abandoned; the next page
//!     // follows in order.
//!     assert_eq!(items.next().await, Some(Ok(1)));
//!     assert_eq!(items.next().await, Some(Ok(2)));
//!     assert_eq!(items.next().await, Some(Ok(-1)));
//!     assert_eq!(items.next().await, Some(Ok(4)));
//!     assert_eq!(items.next().await, Some(Ok(5)));
//!     assert_eq!(items.next().await, None);
//! }
//! ```
//!
//! Four policies ship with the crate: [`AbortOnError`], [`AbandonWith`],
//! [`ResumeWith`] and [`SkipErrors`]; [`RecoveryPolicy`] is a public trait,
//! so stateful custom policies slot in the same way. Recovered errors are
//! never silent: every shipped recovering policy logs the cause through
//! [`tracing`] before substituting or skipping.
//!
//! Alongside the flattener there is [`StreamExt::flatten_seq`] for infallible
//! streams of streams, [`TryStreamExt::reduce`] for seedless left folds,
//! [`sink::drain`] for driving a flattened stream into a byte sink with
//! exactly-once flush/close discipline, and (behind the `time` feature)
//! [`TryStreamExt::deadline`] for bounding how long an inner stream may
//! stall:
//!
//! ```
//! use stream_flatten_seq::TryStreamExt as _;
//! use futures::stream::iter;
//!
//! #[tokio::main]
//! async fn main() {
//!     let total = iter(vec![17, 32, 40, 32, 1, 23, -23, 43, 0, 1, 21, 33]
//!         .into_iter()
//!         .map(Ok::<_, std::convert::Infallible>))
//!     .reduce(|acc, item| acc + item)
//!     .await;
//!
//!     assert_eq!(total, Ok(220));
//! }
//! ```

#![deny(missing_docs)]

mod error;
mod flatten_seq;
mod recover;
mod reduce;
mod seq_flat_map;
pub mod sink;

#[cfg(feature = "time")]
mod deadline;

pub use error::{DrainError, ReduceError, SinkError};
pub use flatten_seq::{FlattenSeq, StreamExt};
pub use recover::{
    AbandonWith, AbortOnError, RecoveryDecision, RecoveryPolicy, ResumeWith, SkipErrors,
};
pub use reduce::Reduce;
pub use seq_flat_map::{SeqFlatMap, TryStreamExt};
pub use sink::{drain, ByteSink};

#[cfg(feature = "time")]
pub use deadline::Deadline;
#[cfg(feature = "time")]
pub use error::TimeoutError;
