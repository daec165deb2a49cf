//! Two-phase deletion.
//!
//! A deleted entry moves `Live -> PendingDeletion -> Released`. While
//! pending it sits in a buffer with its handles intact and a cancellation
//! token; a spawned task releases it once the grace window elapses unless
//! the token is cancelled first (undo).

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::domain::LibraryEntry;

/// Where an entry is in its deletion lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryLifecycle {
    /// Visible in the list
    Live,

    /// Deleted, restorable until `deadline`
    PendingDeletion { deadline: Instant },

    /// Finalized (or never existed)
    Released,
}

/// A single deleted entry awaiting finalization
#[derive(Debug)]
pub(crate) struct PendingDeletion {
    pub entry: LibraryEntry,
    pub deadline: Instant,
    pub token: CancellationToken,
    /// Distinguishes this deletion from a later one of the same id
    pub generation: u64,
}

/// A cleared collection awaiting finalization
#[derive(Debug)]
pub(crate) struct PendingClear {
    pub entries: Vec<LibraryEntry>,
    pub deadline: Instant,
    pub token: CancellationToken,
    pub generation: u64,
}

/// Run `on_expire` after `grace` unless `token` is cancelled first
pub(crate) fn spawn_expiry<F>(grace: Duration, token: CancellationToken, on_expire: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(grace) => on_expire.await,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_expiry_fires_after_grace() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let handle = spawn_expiry(Duration::from_secs(5), CancellationToken::new(), async move {
            flag.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!fired.load(Ordering::SeqCst));

        handle.await.unwrap();
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_expiry() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let token = CancellationToken::new();

        let handle = spawn_expiry(Duration::from_secs(5), token.clone(), async move {
            flag.store(true, Ordering::SeqCst);
        });

        token.cancel();
        handle.await.unwrap();
        assert!(!fired.load(Ordering::SeqCst));
    }
}
