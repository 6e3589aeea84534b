//! Cooperative cancellation.
//!
//! A [`CancelToken`] is handed to every effect routine when it is scheduled.
//! Routines never poll it between commands; they observe it at their timed
//! waits via [`CancelToken::sleep`], which completes early with
//! [`Cancelled`] as soon as the token (or any ancestor) is cancelled.  Code
//! between two waits is therefore atomic with respect to cancellation.
//!
//! Tokens are `Send + Sync`: the flag is an atomic and the waker registry
//! sits behind a critical-section mutex, so a stop switch or a console thread
//! can cancel the root while the orchestrator runs on its executor.

use core::cell::RefCell;
use core::future::Future;
use core::pin::Pin;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::{Context, Poll};
use core::time::Duration;

use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::waitqueue::MultiWakerRegistration;
use futures_lite::future;

use crate::app::ports::Clock;

/// Distinct wakers a single token tracks before it flushes them early.
const MAX_WAITERS: usize = 8;

/// Marker returned by a wait that was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl core::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "cancelled")
    }
}

struct Inner {
    cancelled: AtomicBool,
    parent: Option<CancelToken>,
    waiters: Mutex<CriticalSectionRawMutex, RefCell<MultiWakerRegistration<MAX_WAITERS>>>,
}

/// Clonable handle; all clones share one flag.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<CancelToken>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                parent,
                waiters: Mutex::new(RefCell::new(MultiWakerRegistration::new())),
            }),
        }
    }

    /// A token cancelled by its own [`cancel`](Self::cancel) or by any
    /// ancestor's.  Cancelling the child leaves the parent untouched.
    pub fn child(&self) -> Self {
        Self::with_parent(Some(self.clone()))
    }

    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return true;
        }
        self.inner
            .parent
            .as_ref()
            .is_some_and(CancelToken::is_cancelled)
    }

    /// `Err(Cancelled)` once cancelled.  For the per-iteration checks.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Set the flag and wake every task parked on this token or a child.
    /// Idempotent.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.waiters.lock(|w| w.borrow_mut().wake());
    }

    /// Completes once the token is cancelled.
    pub fn cancelled(&self) -> WaitCancelled<'_> {
        WaitCancelled { token: self }
    }

    /// Wait `duration` on `clock`, or return `Err(Cancelled)` as soon as the
    /// token fires.  A token that is already cancelled returns without
    /// touching the clock; on a tie cancellation wins.
    pub async fn sleep<C: Clock>(&self, clock: &C, duration: Duration) -> Result<(), Cancelled> {
        self.check()?;
        let cancelled = async {
            self.cancelled().await;
            Err(Cancelled)
        };
        let elapsed = async {
            clock.sleep(duration).await;
            Ok(())
        };
        future::or(cancelled, elapsed).await?;
        self.check()
    }

    fn register(&self, cx: &Context<'_>) {
        self.inner
            .waiters
            .lock(|w| w.borrow_mut().register(cx.waker()));
        if let Some(parent) = &self.inner.parent {
            parent.register(cx);
        }
    }
}

/// Future returned by [`CancelToken::cancelled`].
pub struct WaitCancelled<'a> {
    token: &'a CancelToken,
}

impl Future for WaitCancelled<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.token.is_cancelled() {
            return Poll::Ready(());
        }
        self.token.register(cx);
        // A cancel racing the registration above must not be lost.
        if self.token.is_cancelled() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}
