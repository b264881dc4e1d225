// Keyguard — Biometry-gated entry demo
//
// Both read paths run the availability check first: unavailable biometry
// stops before any prompt, a locked sensor is recovered with the device
// passcode.

use std::sync::Arc;

use crate::dispatch::run_blocking;
use crate::gate::{AuthenticationGate, AuthorizationOutcome, PolicyKind};
use crate::store::{AccessPolicy, CredentialStore, SecretBlob, StoreError};

use super::ACCESS_REASON;

pub const ENTRY_NAME: &str = "keychain-sample.test_entry_bio";
pub const ENTRY_CONTENTS: &str = "Hello!";

/// Outer `Err` stops before the read; inner is the read itself.
type InlineRead = Result<Result<SecretBlob, StoreError>, AuthorizationOutcome>;

const NOT_AVAILABLE: &str = "Can't read entry, biometry not available";

pub struct BiometryDemo {
    store: Arc<dyn CredentialStore>,
    gate: AuthenticationGate,
}

impl BiometryDemo {
    pub fn new(store: Arc<dyn CredentialStore>, gate: AuthenticationGate) -> Self {
        Self { store, gate }
    }

    pub fn biometry_state_label(&self) -> String {
        format!("Biometry state: {}", self.gate.check_availability())
    }

    pub fn create(&self) -> String {
        match self.store.store(
            ENTRY_NAME,
            ENTRY_CONTENTS.as_bytes(),
            &AccessPolicy::BiometryGated,
        ) {
            Ok(()) => "Entry created".to_string(),
            Err(e) => super::creation_failed(&e),
        }
    }

    /// Recover availability, then let the platform prompt during the read.
    pub async fn read_inline(&self) -> String {
        let gate = self.gate.clone();
        let store = self.store.clone();

        let result = run_blocking("biometry.read_inline", move || -> InlineRead {
            gate.recover_biometry(ACCESS_REASON)?;
            Ok(store.read_with_prompt(ENTRY_NAME, ACCESS_REASON))
        })
        .await;

        match result {
            Ok(Ok(Ok(blob))) => contents_status(&blob),
            Ok(Ok(Err(e))) => {
                tracing::info!(key = ENTRY_NAME, error = %e, "Biometry entry not loaded");
                "Couldn't read entry".to_string()
            }
            Ok(Err(outcome)) => outcome_status(outcome),
            Err(e) => format!("Can't read entry, error: {}", e),
        }
    }

    /// Authorize through the gate, then read with the handle.
    pub async fn read_with_context(&self) -> String {
        let gate = self.gate.clone();
        let store = self.store.clone();

        let result = run_blocking("biometry.read_with_context", move || {
            match gate.authorize(PolicyKind::Biometry, ACCESS_REASON) {
                AuthorizationOutcome::Authorized(handle) => Ok(store.read(ENTRY_NAME, Some(handle))),
                other => Err(other),
            }
        })
        .await;

        match result {
            Ok(Ok(read)) => read_status(read),
            Ok(Err(outcome)) => outcome_status(outcome),
            Err(e) => format!("Can't read entry, error: {}", e),
        }
    }

    pub fn remove(&self) -> String {
        self.store.remove(ENTRY_NAME);
        "Entry was removed".to_string()
    }

    /// Existence check; never prompts.
    pub fn check(&self) -> String {
        if self.store.exists(ENTRY_NAME) {
            "Entry exists".to_string()
        } else {
            "Entry doesn't exist".to_string()
        }
    }
}

fn contents_status(blob: &SecretBlob) -> String {
    format!("Keychain entry contains: {}", blob.to_string_lossy())
}

fn read_status(result: Result<SecretBlob, StoreError>) -> String {
    match result {
        Ok(blob) => contents_status(&blob),
        Err(StoreError::AuthenticationUnavailable) => NOT_AVAILABLE.to_string(),
        Err(e) => format!("Can't read entry, error: {}", e),
    }
}

fn outcome_status(outcome: AuthorizationOutcome) -> String {
    match outcome {
        AuthorizationOutcome::Unavailable => NOT_AVAILABLE.to_string(),
        other => format!("Can't read entry, error: {}", super::describe_outcome(&other)),
    }
}
