//! Recovery policies consulted by [`seq_flat_map`](crate::TryStreamExt::seq_flat_map)
//! whenever the outer stream or the active inner stream fails.

use core::fmt::Display;

/// The policy's verdict on how a flattened stream proceeds after an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryDecision<T, E> {
    /// Forward `Err` downstream and terminate the flattened stream.
    Abort(E),
    /// Yield the substitute item, then keep pulling the same inner stream.
    SubstituteAndResume(T),
    /// Yield the substitute item and abandon the inner stream; its remaining
    /// items are never pulled.
    SubstituteAndAbandon(T),
    /// Abandon the inner stream without yielding anything.
    Skip,
}

/// Strategy deciding what a flattened stream does when a source fails.
///
/// `on_inner_error` is consulted when the currently active inner stream
/// yields an error; `on_outer_error` when the outer stream itself does. An
/// outer failure carries no item to substitute for, so the only meaningful
/// outer decision is [`RecoveryDecision::Abort`] and the provided default
/// returns exactly that. Policies take `&mut self`, so stateful strategies
/// (an error budget, a counter) are ordinary implementations of this trait.
pub trait RecoveryPolicy<T, E> {
    /// Decide how to proceed after the active inner stream yields an error.
    fn on_inner_error(&mut self, error: E) -> RecoveryDecision<T, E>;

    /// Decide the terminal cause after the outer stream yields an error.
    fn on_outer_error(&mut self, error: E) -> RecoveryDecision<T, E> {
        RecoveryDecision::Abort(error)
    }
}

/// Propagates every error as-is and terminates the flattened stream.
///
/// With this policy, [`seq_flat_map`](crate::TryStreamExt::seq_flat_map)
/// behaves like a plain try-flatten: the first failure anywhere is the last
/// event downstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnError;

impl<T, E> RecoveryPolicy<T, E> for AbortOnError {
    fn on_inner_error(&mut self, error: E) -> RecoveryDecision<T, E> {
        RecoveryDecision::Abort(error)
    }
}

/// Replaces a failed inner stream with one substitute item and moves on to
/// the next outer item. Remaining items of the failed stream are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbandonWith<T>(
    /// The substitute item yielded in place of each failed inner stream.
    pub T,
);

impl<T: Clone, E: Display> RecoveryPolicy<T, E> for AbandonWith<T> {
    fn on_inner_error(&mut self, error: E) -> RecoveryDecision<T, E> {
        tracing::warn!(%error, "inner stream failed, substituting and abandoning it");
        RecoveryDecision::SubstituteAndAbandon(self.0.clone())
    }
}

/// Replaces each error of an inner stream with one substitute item and keeps
/// pulling the same stream, so its later items are still delivered.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResumeWith<T>(
    /// The substitute item yielded in place of each inner stream error.
    pub T,
);

impl<T: Clone, E: Display> RecoveryPolicy<T, E> for ResumeWith<T> {
    fn on_inner_error(&mut self, error: E) -> RecoveryDecision<T, E> {
        tracing::warn!(%error, "inner stream failed, substituting and resuming it");
        RecoveryDecision::SubstituteAndResume(self.0.clone())
    }
}

/// Abandons a failed inner stream without yielding a substitute.
///
/// The error never reaches the downstream consumer; it is logged at warn
/// level instead, so skipped failures remain observable.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipErrors;

impl<T, E: Display> RecoveryPolicy<T, E> for SkipErrors {
    fn on_inner_error(&mut self, error: E) -> RecoveryDecision<T, E> {
        tracing::warn!(%error, "inner stream failed, skipping the rest of it");
        RecoveryDecision::Skip
    }
}
