//! Cancellation: abort signals, timers, and the per-call coordinator.
//!
//! # Design
//! Each call races three futures: the transport, the caller's abort signal,
//! and a timeout timer. `tokio::select!` picks exactly one winner and drops
//! the other two, which is what releases the timer and deregisters the abort
//! listener. The outcome is captured in a [`Settlement`] value before any
//! error mapping happens, so a call settles at most once.
//!
//! The transport gets its own effective signal, a fresh [`CancellationToken`].
//! It is cancelled when the timer or the caller's signal wins, and also when
//! the call future is dropped mid-flight. After a successful exchange it is
//! left untouched.

use std::fmt;
use std::future::{pending, Future};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{HttpError, TransportError};

/// Caller-side handle that can abort any call carrying its [`AbortSignal`].
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    token: CancellationToken,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal::from_token(self.token.clone())
    }

    /// Abort every call using this controller's signal. Idempotent.
    pub fn abort(&self) {
        self.token.cancel();
    }
}

/// Read side of a cancellation request.
///
/// A signal is either live (backed by a [`CancellationToken`], so listeners
/// can wait on it) or a fixed value with no listener capability.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    inner: SignalInner,
}

#[derive(Debug, Clone)]
enum SignalInner {
    Fixed(bool),
    Live(CancellationToken),
}

impl AbortSignal {
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            inner: SignalInner::Live(token),
        }
    }

    /// A signal that is already aborted. Calls given this signal never reach
    /// the transport.
    pub fn already_aborted() -> Self {
        Self {
            inner: SignalInner::Fixed(true),
        }
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        Self {
            inner: SignalInner::Fixed(false),
        }
    }

    pub fn is_aborted(&self) -> bool {
        match &self.inner {
            SignalInner::Fixed(aborted) => *aborted,
            SignalInner::Live(token) => token.is_cancelled(),
        }
    }

    /// Whether [`aborted`](Self::aborted) can ever complete after creation.
    pub fn supports_listeners(&self) -> bool {
        matches!(self.inner, SignalInner::Live(_))
    }

    /// Wait until the signal is aborted.
    ///
    /// Holding the returned future is the listener registration; dropping it
    /// removes the listener. A fixed, non-aborted signal never completes.
    pub async fn aborted(&self) {
        match &self.inner {
            SignalInner::Fixed(true) => {}
            SignalInner::Fixed(false) => pending::<()>().await,
            SignalInner::Live(token) => token.cancelled().await,
        }
    }
}

/// Source of timeout futures. Injected so tests can observe or fake timers.
pub trait Timer: Send + Sync + fmt::Debug {
    /// A future that completes once `duration` has elapsed. Dropping it
    /// cancels the timer.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// [`Timer`] backed by the tokio time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// How a coordinated call ended.
#[derive(Debug)]
enum Settlement<T> {
    Completed(Result<T, TransportError>),
    Aborted,
    TimedOut,
}

/// Runs one operation under an optional timeout and an optional caller
/// signal, and maps whichever finishes first to the call's outcome.
#[derive(Debug, Clone)]
pub struct CancellationCoordinator {
    timer: Arc<dyn Timer>,
}

impl Default for CancellationCoordinator {
    fn default() -> Self {
        Self::new(Arc::new(TokioTimer))
    }
}

impl CancellationCoordinator {
    pub fn new(timer: Arc<dyn Timer>) -> Self {
        Self { timer }
    }

    /// Run `operation` with the effective signal it should honor.
    ///
    /// `operation` is not invoked at all if `external` is already aborted.
    pub async fn run<T, F, Fut>(
        &self,
        external: Option<&AbortSignal>,
        timeout: Option<Duration>,
        operation: F,
    ) -> Result<T, HttpError>
    where
        F: FnOnce(AbortSignal) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        if external.is_some_and(AbortSignal::is_aborted) {
            debug!("abort signal already set, skipping transport");
            return Err(HttpError::Aborted);
        }

        let effective = CancellationToken::new();
        let guard = effective.clone().drop_guard();

        let operation = operation(AbortSignal::from_token(effective));
        let deadline = async {
            match timeout {
                Some(timeout) => self.timer.sleep(timeout).await,
                None => pending::<()>().await,
            }
        };
        let abort = async {
            match external {
                Some(signal) => signal.aborted().await,
                None => pending::<()>().await,
            }
        };

        let settlement = tokio::select! {
            biased;
            result = operation => Settlement::Completed(result),
            _ = abort => Settlement::Aborted,
            _ = deadline => Settlement::TimedOut,
        };

        match settlement {
            Settlement::Completed(result) => {
                guard.disarm();
                result.map_err(HttpError::Transport)
            }
            Settlement::Aborted => {
                debug!("request aborted by caller");
                drop(guard);
                Err(HttpError::Aborted)
            }
            Settlement::TimedOut => {
                let timeout_ms = timeout
                    .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX))
                    .unwrap_or_default();
                warn!(timeout_ms, "request timed out");
                drop(guard);
                Err(HttpError::Timeout { timeout_ms })
            }
        }
    }
}
