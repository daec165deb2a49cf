//! Session lifecycle around the library store.
//!
//! The library storage key is shared with the sign-in flow: a brand-new
//! account or a first-time sign-in wipes it so one account never sees
//! another's library. A [`Session`] owns the store between sign-in and
//! sign-out.

use std::sync::Arc;

use tracing::{info, warn};

use crate::adapters::ProcessingBackend;
use crate::blobs::BlobRegistry;
use crate::library::{KeyValueStorage, LibraryStore, StoreSettings, LIBRARY_STORAGE_KEY};

/// Identity events reported by the authentication layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityChange {
    /// A new account was just created
    AccountCreated,

    /// An identity signed in
    SignedIn { first_time: bool },

    /// The current identity signed out
    SignedOut,
}

/// Wipe the library record when the identity is new on this device.
///
/// Returns whether the key was removed.
pub fn prepare_storage(storage: &dyn KeyValueStorage, change: IdentityChange) -> bool {
    let wipe = matches!(
        change,
        IdentityChange::AccountCreated | IdentityChange::SignedIn { first_time: true }
    );
    if !wipe {
        return false;
    }

    match storage.remove_item(LIBRARY_STORAGE_KEY) {
        Ok(()) => {
            info!(?change, "Cleared library storage for new identity");
            true
        }
        Err(e) => {
            warn!(error = %e, "Failed to clear library storage");
            false
        }
    }
}

/// Owns the store for one signed-in identity
pub struct Session {
    backend: Arc<dyn ProcessingBackend>,
    storage: Arc<dyn KeyValueStorage>,
    settings: StoreSettings,
    store: Option<LibraryStore>,
}

impl Session {
    pub fn new(
        backend: Arc<dyn ProcessingBackend>,
        storage: Arc<dyn KeyValueStorage>,
        settings: StoreSettings,
    ) -> Self {
        Self {
            backend,
            storage,
            settings,
            store: None,
        }
    }

    /// Current store, if signed in
    pub fn store(&self) -> Option<&LibraryStore> {
        self.store.as_ref()
    }

    /// Handle a sign-in event and open a fresh store.
    ///
    /// Any previous store is shut down first.
    pub async fn begin(&mut self, change: IdentityChange) -> LibraryStore {
        self.end().await;
        prepare_storage(self.storage.as_ref(), change);

        let store = LibraryStore::open(
            Arc::clone(&self.backend),
            Arc::clone(&self.storage),
            BlobRegistry::new(),
            self.settings.clone(),
        );
        self.store = Some(store.clone());
        store
    }

    /// Sign out: shut the store down and release its handles
    pub async fn end(&mut self) {
        if let Some(store) = self.store.take() {
            store.shutdown().await;
        }
    }
}
