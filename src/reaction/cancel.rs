use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crossbeam::atomic::AtomicCell;
use futures::task::AtomicWaker;

/// Returned by a derivation that stopped early because its token was
/// cancelled. Never reported as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("aborted")]
pub struct Aborted;

/// True if `err` is, or was caused by, [`Aborted`]
pub fn is_aborted(err: &anyhow::Error) -> bool {
    err.chain().any(|e| e.is::<Aborted>())
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicCell<bool>,
    waker: AtomicWaker,
}

/// A cancellation flag shared between a scheduler and the derivation
/// it started. Clones refer to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true);
        self.inner.waker.wake();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load()
    }

    /// For use with `?` at the derivation's await points
    pub fn check(&self) -> Result<(), Aborted> {
        if self.is_cancelled() {
            Err(Aborted)
        } else {
            Ok(())
        }
    }

    /// Resolves once the token is cancelled.
    ///
    /// Only the most recently polled `Cancelled` future of a token is
    /// woken; hold one per token.
    pub fn cancelled(&self) -> Cancelled {
        Cancelled {
            token: self.clone(),
        }
    }

    pub fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[derive(Debug)]
pub struct Cancelled {
    token: CancelToken,
}

impl Future for Cancelled {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.token.is_cancelled() {
            return Poll::Ready(());
        }

        self.token.inner.waker.register(cx.waker());

        // may have been cancelled before the waker was registered
        if self.token.is_cancelled() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}
