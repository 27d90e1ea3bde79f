use std::sync::Arc;

use notehub_core::auth::CredentialVerifier;
use notehub_core::relay::RelayBus;
use notehub_core::{NoteHub, SharedStore};

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    store: SharedStore,
    hub: NoteHub,
    verifier: Arc<dyn CredentialVerifier>,
    relay: RelayBus,
}

impl AppState {
    pub fn new(
        store: SharedStore,
        hub: NoteHub,
        verifier: Arc<dyn CredentialVerifier>,
        relay: RelayBus,
    ) -> Self {
        Self {
            inner: Arc::new(InnerState {
                store,
                hub,
                verifier,
                relay,
            }),
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.inner.store
    }

    pub fn hub(&self) -> &NoteHub {
        &self.inner.hub
    }

    pub fn verifier(&self) -> &dyn CredentialVerifier {
        self.inner.verifier.as_ref()
    }

    pub fn relay(&self) -> &RelayBus {
        &self.inner.relay
    }
}
